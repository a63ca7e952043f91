//! Code Generation Context
//!
//! What a builder needs to know about the file it is emitting into: the
//! current package, the imports in scope and the definitions it may look up.

use super::ast::TypeExpr;
use super::imports::PackageImportSet;
use crate::error::{GeneratorError, Result};
use crate::model::{Definition, Definitions, PackageReference, Type, TypeName};

#[derive(Debug, Clone)]
pub struct CodeGenerationContext<'a> {
    current_package: PackageReference,
    imports: PackageImportSet,
    definitions: &'a Definitions,
}

impl<'a> CodeGenerationContext<'a> {
    pub fn new(
        current_package: PackageReference,
        imports: PackageImportSet,
        definitions: &'a Definitions,
    ) -> Self {
        Self { current_package, imports, definitions }
    }

    pub fn current_package(&self) -> &PackageReference {
        &self.current_package
    }

    pub fn imports(&self) -> &PackageImportSet {
        &self.imports
    }

    /// Name to qualify references into `package` with
    pub fn get_imported_package_name(&self, package: &PackageReference) -> Result<String> {
        self.imports
            .import_for(package)
            .map(|import| import.effective_name().to_string())
            .ok_or_else(|| GeneratorError::MissingImport {
                package: package.clone(),
                current: self.current_package.clone(),
            })
    }

    pub fn get_imported_definition(&self, name: &TypeName) -> Result<&'a Definition> {
        self.definitions
            .get(name)
            .ok_or_else(|| GeneratorError::UnknownDefinition(name.clone()))
    }

    /// Is `name` the JSON marker, or a definition whose shape is JSON?
    pub fn is_json_passthrough(&self, name: &TypeName) -> bool {
        name.is_json() || self.definitions.is_json_passthrough(name)
    }

    /// Would a plain assignment of `t` alias mutable storage?
    pub fn requires_copying(&self, t: &Type) -> bool {
        t.requires_copying(self.definitions)
    }

    /// `Name` inside the current package, `alias.Name` outside it
    pub fn qualified_type(&self, name: &TypeName) -> Result<TypeExpr> {
        if name.package == self.current_package {
            return Ok(TypeExpr::named(&name.name));
        }
        let qualifier = self.get_imported_package_name(&name.package)?;
        Ok(TypeExpr::qualified(qualifier, &name.name))
    }

    /// Written form of `t`. Inline objects, enums and resources have no
    /// written form and yield `None`.
    pub fn type_expr(&self, t: &Type) -> Result<Option<TypeExpr>> {
        let expr = match t {
            Type::Primitive(p) => TypeExpr::named(p.go_name()),
            Type::TypeName(name) => self.qualified_type(name)?,
            Type::Json => self.qualified_type(&TypeName::json())?,
            Type::Optional(element) => match self.type_expr(element)? {
                Some(e) => TypeExpr::pointer(e),
                None => return Ok(None),
            },
            Type::Array(element) => match self.type_expr(element)? {
                Some(e) => TypeExpr::Slice(Box::new(e)),
                None => return Ok(None),
            },
            Type::Map { key, value } => match (self.type_expr(key)?, self.type_expr(value)?) {
                (Some(k), Some(v)) => TypeExpr::Map { key: Box::new(k), value: Box::new(v) },
                _ => return Ok(None),
            },
            Type::Validated { element, .. } => return self.type_expr(element),
            Type::Object(_) | Type::Enum(_) | Type::Resource(_) => return Ok(None),
        };
        Ok(Some(expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::imports::PackageImport;
    use crate::model::PrimitiveType;

    fn package() -> PackageReference {
        PackageReference::local("microsoft.resources", "v20200601")
    }

    #[test]
    fn test_local_types_are_unqualified() {
        let defs = Definitions::new();
        let ctx = CodeGenerationContext::new(package(), PackageImportSet::new(), &defs);
        let name = TypeName::new(package(), "Sku");
        assert_eq!(ctx.qualified_type(&name).unwrap(), TypeExpr::named("Sku"));
    }

    #[test]
    fn test_foreign_types_need_an_import() {
        let defs = Definitions::new();
        let other = PackageReference::local("microsoft.storage", "v1");
        let name = TypeName::new(other.clone(), "Sku");

        let ctx = CodeGenerationContext::new(package(), PackageImportSet::new(), &defs);
        assert!(matches!(ctx.qualified_type(&name), Err(GeneratorError::MissingImport { .. })));

        let mut imports = PackageImportSet::new();
        imports.add_import(PackageImport::new(other).with_name("storage"));
        let ctx = CodeGenerationContext::new(package(), imports, &defs);
        assert_eq!(ctx.qualified_type(&name).unwrap().to_string(), "storage.Sku");
    }

    #[test]
    fn test_type_expr_shapes() {
        let defs = Definitions::new();
        let mut imports = PackageImportSet::new();
        imports.add_reference(PackageReference::json());
        let ctx = CodeGenerationContext::new(package(), imports, &defs);

        let t = Type::map(
            Type::Primitive(PrimitiveType::String),
            Type::optional(Type::array(Type::Primitive(PrimitiveType::Int))),
        );
        assert_eq!(ctx.type_expr(&t).unwrap().unwrap().to_string(), "map[string]*[]int");
        assert_eq!(ctx.type_expr(&Type::Json).unwrap().unwrap().to_string(), "v1.JSON");
        assert!(ctx.type_expr(&Type::array(Type::Object(Default::default()))).unwrap().is_none());
    }

    #[test]
    fn test_unknown_definition() {
        let defs = Definitions::new();
        let ctx = CodeGenerationContext::new(package(), PackageImportSet::new(), &defs);
        let missing = TypeName::new(package(), "Missing");
        assert!(matches!(
            ctx.get_imported_definition(&missing),
            Err(GeneratorError::UnknownDefinition(_))
        ));
    }
}
