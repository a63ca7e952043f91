//! ARM Conversion Builder
//!
//! Builds the `ToArm` method for a kube-side object: a function that
//! allocates the ARM counterpart and fills each of its properties from the
//! receiver. Properties are matched by a fixed-priority list of handlers;
//! anything reference-like is copied through a recursive conversion so the
//! two objects never share mutable storage.

use std::collections::BTreeSet;

use super::ast::{
    append_list, check_error_and_return, insert_map, local_variable_declaration, return_if_nil,
    AssignOp, Expr, FuncDecl, Stmt, TypeExpr,
};
use super::context::CodeGenerationContext;
use crate::config::NamingConfig;
use crate::error::{GeneratorError, Result};
use crate::model::names::enum_value_id;
use crate::model::{
    IdentifierFactory, ObjectType, PackageReference, PropertyDefinition, Type, TypeName, Visibility,
};

const ITEM_IDENT: &str = "item";
const KEY_IDENT: &str = "key";
const VALUE_IDENT: &str = "value";
const ELEMENT_HINT: &str = "elem";
const ELEMENT_TEMP: &str = "elemTyped";
const ERROR_IDENT: &str = "err";

// =============================================================================
// Nesting Context
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingLevel {
    Optional,
    Array,
    Map,
}

/// Collections and optionals enclosing the conversion being emitted.
///
/// Extending returns a new context, so sibling branches never observe each
/// other's levels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NestingContext {
    levels: Vec<NestingLevel>,
}

impl NestingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&self, level: NestingLevel) -> Self {
        let mut levels = self.levels.clone();
        levels.push(level);
        Self { levels }
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[NestingLevel] {
        &self.levels
    }

    /// `base` at the top level, `base{depth}` below it
    pub fn temp_name(&self, base: &str) -> String {
        match self.depth() {
            0 => base.to_string(),
            depth => format!("{}{}", base, depth),
        }
    }
}

// =============================================================================
// Conversion Function
// =============================================================================

/// A `ToArm` method to attach to a kube-side object
#[derive(Debug, Clone, PartialEq)]
pub struct ArmConversionFunction {
    pub method_name: String,
    pub arm_type_name: TypeName,
    pub arm_type: ObjectType,
    /// The receiver is some resource's spec; enables the name and type handlers
    pub is_spec_type: bool,
}

impl ArmConversionFunction {
    pub fn new(
        method_name: impl Into<String>,
        arm_type_name: TypeName,
        arm_type: ObjectType,
        is_spec_type: bool,
    ) -> Self {
        Self {
            method_name: method_name.into(),
            arm_type_name,
            arm_type,
            is_spec_type,
        }
    }

    /// Packages the generated body refers to
    pub fn required_packages(&self) -> BTreeSet<PackageReference> {
        let mut packages = BTreeSet::new();
        packages.insert(self.arm_type_name.package.clone());
        for prop in self.arm_type.properties() {
            packages.extend(prop.property_type.required_packages());
        }
        packages
    }

    /// ARM properties none of the handlers will fill
    pub fn unconverted_properties<'p>(
        &'p self,
        kube_type: &ObjectType,
        naming: &NamingConfig,
    ) -> Vec<&'p str> {
        self.arm_type
            .properties()
            .filter(|p| {
                let special = self.is_spec_type
                    && (p.name == naming.name_property || p.name == naming.type_property);
                !special && kube_type.property(&p.name).is_none()
            })
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Build the method declaration for `receiver`
    pub fn as_func(
        &self,
        ctx: &CodeGenerationContext<'_>,
        receiver: &TypeName,
        naming: &NamingConfig,
    ) -> Result<FuncDecl> {
        let definition = ctx.get_imported_definition(receiver)?;
        let Type::Object(kube_type) = &definition.definition_type else {
            return Err(GeneratorError::UnsupportedConversion {
                definition: receiver.clone(),
                property: "*".to_string(),
                shape: definition.definition_type.kind_name(),
            });
        };

        let id_factory = naming.identifier_factory();
        let receiver_ident = receiver_identifier(&id_factory, receiver, naming);
        let builder = ConvertToArmBuilder {
            function: self,
            ctx,
            naming,
            id_factory,
            receiver,
            receiver_ident,
            kube_type,
        };
        builder.function_declaration()
    }
}

/// Lower-cased receiver name, suffixed when it would collide with a name the
/// body declares
fn receiver_identifier(
    id_factory: &IdentifierFactory,
    receiver: &TypeName,
    naming: &NamingConfig,
) -> String {
    let ident = id_factory.create_identifier(&receiver.name, Visibility::NotExported);
    let taken = [
        naming.result_ident.as_str(),
        naming.name_parameter.as_str(),
        ERROR_IDENT,
        ITEM_IDENT,
        KEY_IDENT,
        VALUE_IDENT,
    ];
    if taken.contains(&ident.as_str()) {
        format!("{}Receiver", ident)
    } else {
        ident
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Parameters of one recursive conversion step
#[derive(Debug, Clone)]
struct ComplexConversion<'t> {
    source: Expr,
    destination: Expr,
    destination_type: &'t Type,
    name_hint: String,
    context: NestingContext,
    assignment: AssignOp,
    same_types: bool,
    /// Top-level property being converted, for error reporting
    property: &'t str,
}

type PropertyHandler<'a> =
    fn(&ConvertToArmBuilder<'a>, &PropertyDefinition, &ObjectType) -> Result<Option<Vec<Stmt>>>;

struct ConvertToArmBuilder<'a> {
    function: &'a ArmConversionFunction,
    ctx: &'a CodeGenerationContext<'a>,
    naming: &'a NamingConfig,
    id_factory: IdentifierFactory,
    receiver: &'a TypeName,
    receiver_ident: String,
    kube_type: &'a ObjectType,
}

impl<'a> ConvertToArmBuilder<'a> {
    fn function_declaration(&self) -> Result<FuncDecl> {
        let mut func = FuncDecl::method(
            &self.function.method_name,
            &self.receiver_ident,
            TypeExpr::pointer(TypeExpr::named(&self.receiver.name)),
        );
        func.add_parameter(&self.naming.name_parameter, TypeExpr::named("string"));
        func.add_returns([TypeExpr::Any, TypeExpr::named("error")]);
        func.add_comments("converts from a Kubernetes CRD object to an ARM object");
        func.body = self.function_body_statements()?;
        Ok(func)
    }

    fn function_body_statements(&self) -> Result<Vec<Stmt>> {
        let result_ident = Expr::ident(&self.naming.result_ident);
        let arm_type = self.ctx.qualified_type(&self.function.arm_type_name)?;

        let mut body = vec![
            return_if_nil(Expr::ident(&self.receiver_ident), vec![Expr::Nil, Expr::Nil]),
            local_variable_declaration(result_ident.clone(), arm_type),
        ];

        for to_prop in self.function.arm_type.properties() {
            match self.property_conversion(to_prop, self.kube_type)? {
                Some(stmts) => body.extend(stmts),
                None => tracing::debug!(
                    receiver = %self.receiver,
                    property = %to_prop.name,
                    "No conversion found for ARM property"
                ),
            }
        }

        body.push(Stmt::Return(vec![result_ident, Expr::Nil]));
        Ok(body)
    }

    /// First handler that claims the property wins
    fn property_conversion(
        &self,
        to_prop: &PropertyDefinition,
        from_type: &ObjectType,
    ) -> Result<Option<Vec<Stmt>>> {
        let handlers: [PropertyHandler<'a>; 4] = [
            Self::name_property_handler,
            Self::type_property_handler,
            Self::same_name_and_type_handler,
            Self::same_name_different_type_handler,
        ];

        for handler in handlers {
            if let Some(stmts) = handler(self, to_prop, from_type)? {
                return Ok(Some(stmts));
            }
        }
        Ok(None)
    }

    fn destination(&self, to_prop: &PropertyDefinition) -> Expr {
        Expr::selector(Expr::ident(&self.naming.result_ident), &to_prop.name)
    }

    fn source(&self, from_prop: &PropertyDefinition) -> Expr {
        Expr::selector(Expr::ident(&self.receiver_ident), &from_prop.name)
    }

    // -------------------------------------------------------------------------
    // Handlers
    // -------------------------------------------------------------------------

    /// `result.Name = name`
    fn name_property_handler(
        &self,
        to_prop: &PropertyDefinition,
        _from_type: &ObjectType,
    ) -> Result<Option<Vec<Stmt>>> {
        if to_prop.name != self.naming.name_property || !self.function.is_spec_type {
            return Ok(None);
        }

        Ok(Some(vec![Stmt::assign(
            self.destination(to_prop),
            AssignOp::Assign,
            Expr::ident(&self.naming.name_parameter),
        )]))
    }

    /// `result.Type = {Enum}{FirstOption}`
    fn type_property_handler(
        &self,
        to_prop: &PropertyDefinition,
        _from_type: &ObjectType,
    ) -> Result<Option<Vec<Stmt>>> {
        if to_prop.name != self.naming.type_property || !self.function.is_spec_type {
            return Ok(None);
        }

        let invalid = |reason: String| GeneratorError::InvalidDiscriminator {
            definition: self.function.arm_type_name.clone(),
            property: to_prop.name.clone(),
            reason,
        };

        let property_type = to_prop.property_type.without_optional();
        let Type::TypeName(enum_name) = property_type else {
            return Err(invalid(format!("expected an enum, found {}", property_type)));
        };

        let definition = self.ctx.get_imported_definition(enum_name)?;
        let Type::Enum(enum_type) = &definition.definition_type else {
            return Err(invalid(format!(
                "{} is {}, not an enum",
                enum_name,
                definition.definition_type.kind_name()
            )));
        };
        let Some(first) = enum_type.options.first() else {
            return Err(invalid(format!("enum {} has no options", enum_name)));
        };

        let option_id = enum_value_id(&definition.name.name, first);
        let value = if enum_name.package == *self.ctx.current_package() {
            Expr::ident(option_id)
        } else {
            let qualifier = self.ctx.get_imported_package_name(&enum_name.package)?;
            Expr::selector(Expr::ident(qualifier), option_id)
        };

        Ok(Some(vec![Stmt::assign(self.destination(to_prop), AssignOp::Assign, value)]))
    }

    fn same_name_and_type_handler(
        &self,
        to_prop: &PropertyDefinition,
        from_type: &ObjectType,
    ) -> Result<Option<Vec<Stmt>>> {
        let Some(from_prop) = from_type.property(&to_prop.name) else {
            return Ok(None);
        };
        if to_prop.property_type != from_prop.property_type {
            return Ok(None);
        }

        if !self.ctx.requires_copying(&to_prop.property_type) {
            return Ok(Some(vec![Stmt::assign(
                self.destination(to_prop),
                AssignOp::Assign,
                self.source(from_prop),
            )]));
        }

        self.top_level_conversion(to_prop, from_prop, true).map(Some)
    }

    fn same_name_different_type_handler(
        &self,
        to_prop: &PropertyDefinition,
        from_type: &ObjectType,
    ) -> Result<Option<Vec<Stmt>>> {
        let Some(from_prop) = from_type.property(&to_prop.name) else {
            return Ok(None);
        };
        if to_prop.property_type == from_prop.property_type {
            return Ok(None);
        }

        self.top_level_conversion(to_prop, from_prop, false).map(Some)
    }

    fn top_level_conversion(
        &self,
        to_prop: &PropertyDefinition,
        from_prop: &PropertyDefinition,
        same_types: bool,
    ) -> Result<Vec<Stmt>> {
        self.complex_property_conversion(&ComplexConversion {
            source: self.source(from_prop),
            destination: self.destination(to_prop),
            destination_type: &to_prop.property_type,
            name_hint: to_prop.name.clone(),
            context: NestingContext::new(),
            assignment: AssignOp::Assign,
            same_types,
            property: &to_prop.name,
        })
    }

    // -------------------------------------------------------------------------
    // Recursive conversion
    // -------------------------------------------------------------------------

    fn complex_property_conversion(&self, params: &ComplexConversion<'_>) -> Result<Vec<Stmt>> {
        match params.destination_type {
            Type::Optional(element) => self.convert_complex_optional_property(params, element),
            Type::Array(element) => self.convert_complex_array_property(params, element),
            Type::Map { key, value } => self.convert_complex_map_property(params, key, value),
            Type::TypeName(name) => {
                if !params.same_types {
                    self.convert_complex_type_name_property(params, name)
                } else if self.ctx.is_json_passthrough(name) {
                    Ok(self.deep_copy_json(params))
                } else {
                    Ok(self.assign_directly(params))
                }
            }
            Type::Json => Ok(self.deep_copy_json(params)),
            Type::Primitive(_) => Ok(self.assign_directly(params)),
            Type::Validated { element, .. } => self.complex_property_conversion(&ComplexConversion {
                destination_type: element,
                ..params.clone()
            }),
            Type::Object(_) | Type::Enum(_) | Type::Resource(_) => {
                Err(self.unsupported(params, params.destination_type))
            }
        }
    }

    /// ```text
    /// var dest *T              // only when defining
    /// if src != nil {
    ///     <convert *src into hintTyped>
    ///     dest = &hintTyped
    /// }
    /// ```
    fn convert_complex_optional_property(
        &self,
        params: &ComplexConversion<'_>,
        element: &Type,
    ) -> Result<Vec<Stmt>> {
        let mut result = Vec::new();
        if params.assignment == AssignOp::Define {
            let element_type = self.type_expr(element, params)?;
            result.push(local_variable_declaration(
                params.destination.clone(),
                TypeExpr::pointer(element_type),
            ));
        }

        let hint = self
            .id_factory
            .create_identifier(&format!("{}Typed", params.name_hint), Visibility::NotExported);
        let temp = params.context.temp_name(&hint);

        let mut inner = self.complex_property_conversion(&ComplexConversion {
            source: Expr::deref(params.source.clone()),
            destination: Expr::ident(&temp),
            destination_type: element,
            context: params.context.extend(NestingLevel::Optional),
            assignment: AssignOp::Define,
            ..params.clone()
        })?;
        inner.push(Stmt::assign(
            params.destination.clone(),
            AssignOp::Assign,
            Expr::address_of(Expr::ident(temp)),
        ));

        result.push(Stmt::If {
            condition: Expr::not_nil(params.source.clone()),
            body: inner,
        });
        Ok(result)
    }

    /// ```text
    /// dest = make([]T, 0, len(src))
    /// for _, item := range src {
    ///     <convert item into elemTyped>
    ///     dest = append(dest, elemTyped)
    /// }
    /// ```
    fn convert_complex_array_property(
        &self,
        params: &ComplexConversion<'_>,
        element: &Type,
    ) -> Result<Vec<Stmt>> {
        let element_type = self.type_expr(element, params)?;
        let temp = params.context.temp_name(ELEMENT_TEMP);

        let make = Stmt::assign(
            params.destination.clone(),
            params.assignment,
            Expr::MakeSlice {
                element: element_type,
                capacity: Box::new(Expr::Call {
                    function: "len".to_string(),
                    args: vec![params.source.clone()],
                }),
            },
        );

        let mut inner = self.complex_property_conversion(&ComplexConversion {
            source: Expr::ident(ITEM_IDENT),
            destination: Expr::ident(&temp),
            destination_type: element,
            name_hint: ELEMENT_HINT.to_string(),
            context: params.context.extend(NestingLevel::Array),
            assignment: AssignOp::Define,
            ..params.clone()
        })?;
        inner.push(append_list(params.destination.clone(), Expr::ident(temp)));

        Ok(vec![
            make,
            Stmt::Range {
                key: None,
                value: ITEM_IDENT.to_string(),
                source: params.source.clone(),
                body: inner,
            },
        ])
    }

    /// ```text
    /// dest = make(map[K]V)
    /// for key, value := range src {
    ///     <convert value into elemTyped>
    ///     dest[key] = elemTyped
    /// }
    /// ```
    fn convert_complex_map_property(
        &self,
        params: &ComplexConversion<'_>,
        key: &Type,
        value: &Type,
    ) -> Result<Vec<Stmt>> {
        if !matches!(key, Type::Primitive(_)) {
            return Err(GeneratorError::NonPrimitiveMapKey {
                definition: self.receiver.clone(),
                property: params.property.to_string(),
                key: key.to_string(),
            });
        }

        let key_type = self.type_expr(key, params)?;
        let value_type = self.type_expr(value, params)?;
        let temp = params.context.temp_name(ELEMENT_TEMP);

        let make = Stmt::assign(
            params.destination.clone(),
            params.assignment,
            Expr::MakeMap { key: key_type, value: value_type },
        );

        let mut inner = self.complex_property_conversion(&ComplexConversion {
            source: Expr::ident(VALUE_IDENT),
            destination: Expr::ident(&temp),
            destination_type: value,
            name_hint: ELEMENT_HINT.to_string(),
            context: params.context.extend(NestingLevel::Map),
            assignment: AssignOp::Define,
            ..params.clone()
        })?;
        inner.push(insert_map(
            params.destination.clone(),
            Expr::ident(KEY_IDENT),
            Expr::ident(temp),
        ));

        Ok(vec![
            make,
            Stmt::Range {
                key: Some(KEY_IDENT.to_string()),
                value: VALUE_IDENT.to_string(),
                source: params.source.clone(),
                body: inner,
            },
        ])
    }

    /// ```text
    /// hintArmN, err := src.ToArm(name)
    /// if err != nil { return nil, err }
    /// dest = hintArmN.(T)
    /// ```
    fn convert_complex_type_name_property(
        &self,
        params: &ComplexConversion<'_>,
        name: &TypeName,
    ) -> Result<Vec<Stmt>> {
        let hint = self
            .id_factory
            .create_identifier(&format!("{}Arm", params.name_hint), Visibility::NotExported);
        let local = params.context.temp_name(&hint);

        let call = Expr::method_call(
            params.source.clone(),
            &self.function.method_name,
            vec![Expr::ident(&self.naming.name_parameter)],
        );

        Ok(vec![
            Stmt::AssignWithError { value: Expr::ident(&local), call },
            check_error_and_return(vec![Expr::Nil]),
            Stmt::assign(
                params.destination.clone(),
                params.assignment,
                Expr::TypeAssert {
                    value: Box::new(Expr::ident(local)),
                    target: self.ctx.qualified_type(name)?,
                },
            ),
        ])
    }

    /// `dest = *src.DeepCopy()`
    fn deep_copy_json(&self, params: &ComplexConversion<'_>) -> Vec<Stmt> {
        vec![Stmt::assign(
            params.destination.clone(),
            params.assignment,
            Expr::deref(Expr::method_call(params.source.clone(), "DeepCopy", Vec::new())),
        )]
    }

    fn assign_directly(&self, params: &ComplexConversion<'_>) -> Vec<Stmt> {
        vec![Stmt::assign(params.destination.clone(), params.assignment, params.source.clone())]
    }

    fn type_expr(&self, t: &Type, params: &ComplexConversion<'_>) -> Result<TypeExpr> {
        self.ctx.type_expr(t)?.ok_or_else(|| self.unsupported(params, t))
    }

    fn unsupported(&self, params: &ComplexConversion<'_>, t: &Type) -> GeneratorError {
        GeneratorError::UnsupportedConversion {
            definition: self.receiver.clone(),
            property: params.property.to_string(),
            shape: t.kind_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::imports::{PackageImport, PackageImportSet};
    use crate::model::{Definition, Definitions, EnumType, EnumValue, PrimitiveType, ResourceType};

    fn pkg() -> PackageReference {
        PackageReference::local("microsoft.resources", "v20200601")
    }

    fn name(n: &str) -> TypeName {
        TypeName::new(pkg(), n)
    }

    fn string() -> Type {
        Type::Primitive(PrimitiveType::String)
    }

    fn prop(n: &str, t: Type) -> PropertyDefinition {
        PropertyDefinition::new(n, n.to_lowercase(), t)
    }

    fn object(props: Vec<PropertyDefinition>) -> Type {
        Type::Object(ObjectType::new(props))
    }

    /// Registry with a kube/ARM pair plus the resource-type enum
    fn definitions(kube: Vec<PropertyDefinition>, arm: Vec<PropertyDefinition>) -> Definitions {
        let mut defs = Definitions::new();
        defs.add(Definition::new(name("ResourceGroupSpec"), object(kube)));
        defs.add(Definition::new(name("ResourceGroupSpecArm"), object(arm)));
        defs.add(Definition::new(
            name("ResourceGroupsSpecType"),
            Type::Enum(EnumType {
                base: PrimitiveType::String,
                options: vec![EnumValue::new(
                    "MicrosoftResourcesResourceGroups",
                    "Microsoft.Resources/resourceGroups",
                )],
            }),
        ));
        defs
    }

    fn build(defs: &Definitions, is_spec: bool) -> Result<FuncDecl> {
        let naming = NamingConfig::default();
        let arm_name = name("ResourceGroupSpecArm");
        let Some(Type::Object(arm_type)) = defs.get(&arm_name).map(|d| d.definition_type.clone())
        else {
            panic!("ARM type missing");
        };
        let function = ArmConversionFunction::new("ToArm", arm_name, arm_type, is_spec);

        let mut imports = PackageImportSet::new();
        imports.add_reference(PackageReference::json());
        let storage = PackageReference::local("microsoft.storage", "v1");
        imports.add_import(PackageImport::new(storage).with_name("storage"));
        let ctx = CodeGenerationContext::new(pkg(), imports, defs);
        function.as_func(&ctx, &name("ResourceGroupSpec"), &naming)
    }

    fn rendered(stmts: &[&Stmt]) -> Vec<String> {
        stmts
            .iter()
            .filter_map(|s| match s {
                Stmt::Assign { lhs, op, rhs } => Some(format!("{} {} {}", lhs, op, rhs)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_resource_group_spec() {
        let tags = Type::optional(Type::map(string(), string()));
        let defs = definitions(
            vec![prop("Location", string()), prop("Tags", tags.clone())],
            vec![
                prop("Name", string()),
                prop("Type", Type::TypeName(name("ResourceGroupsSpecType"))),
                prop("Location", string()),
                prop("Tags", tags),
            ],
        );

        let func = build(&defs, true).unwrap();
        assert_eq!(func.name, "ToArm");
        assert_eq!(func.receiver_ident(), Some("resourceGroupSpec"));
        let receiver_type = func.receiver.as_ref().map(|r| r.type_expr.to_string());
        assert_eq!(receiver_type.as_deref(), Some("*ResourceGroupSpec"));
        assert_eq!(func.parameters[0].name, "name");
        assert_eq!(func.returns, vec![TypeExpr::Any, TypeExpr::named("error")]);
        assert_eq!(func.comments, vec!["converts from a Kubernetes CRD object to an ARM object"]);

        assert!(matches!(&func.body[0], Stmt::ReturnIfNil { results, .. }
            if results == &vec![Expr::Nil, Expr::Nil]));
        assert!(matches!(&func.body[1], Stmt::VarDecl { type_expr, .. }
            if type_expr.to_string() == "ResourceGroupSpecArm"));
        assert_eq!(func.body.last(), Some(&Stmt::Return(vec![Expr::ident("result"), Expr::Nil])));

        let assigns = rendered(&func.statements());
        assert_eq!(assigns[0], "result.Name = name");
        assert_eq!(
            assigns[1],
            "result.Type = ResourceGroupsSpecTypeMicrosoftResourcesResourceGroups"
        );
        assert_eq!(assigns[2], "result.Location = resourceGroupSpec.Location");
        // Tags are reference-like: copied, never aliased
        assert!(!assigns.contains(&"result.Tags = resourceGroupSpec.Tags".to_string()));
        assert!(func
            .statements()
            .iter()
            .any(|s| matches!(s, Stmt::MapInsert { map, .. } if map.to_string() == "tagsTyped")));
    }

    #[test]
    fn test_optional_type_name_calls_nested_conversion() {
        let defs = definitions(
            vec![prop("Sku", Type::optional(Type::TypeName(name("Sku"))))],
            vec![prop("Sku", Type::optional(Type::TypeName(name("SkuArm"))))],
        );

        let func = build(&defs, false).unwrap();
        // Only the guard sits at top level between the prologue and the return
        assert_eq!(func.body.len(), 4);
        let Stmt::If { condition, body } = &func.body[2] else {
            panic!("expected nil guard, got {:?}", func.body[2]);
        };
        assert_eq!(condition.to_string(), "resourceGroupSpec.Sku != nil");

        assert!(matches!(&body[0], Stmt::AssignWithError { value, call }
            if value.to_string() == "skuArm1"
                && call.to_string() == "(*resourceGroupSpec.Sku).ToArm(name)"));
        assert_eq!(body[1], Stmt::ReturnIfError { results: vec![Expr::Nil] });
        assert_eq!(rendered(&body.iter().collect::<Vec<_>>()), vec![
            "skuTyped := skuArm1.(SkuArm)".to_string(),
            "result.Sku = &skuTyped".to_string(),
        ]);
    }

    #[test]
    fn test_value_like_properties_assign_directly() {
        let props = vec![
            prop("Location", string()),
            prop("Count", Type::Primitive(PrimitiveType::Int)),
            prop("Kind", Type::TypeName(name("Kind"))),
        ];
        let defs = definitions(props.clone(), props);

        let func = build(&defs, false).unwrap();
        let middle = &func.body[2..func.body.len() - 1];
        assert_eq!(middle.len(), 3);
        assert!(middle.iter().all(|s| matches!(s, Stmt::Assign { op: AssignOp::Assign, .. })));
        assert!(!middle
            .iter()
            .any(|s| matches!(s, Stmt::Assign { rhs, .. } if rhs.calls_method("ToArm"))));
    }

    #[test]
    fn test_array_is_allocated_before_the_loop() {
        let defs = definitions(
            vec![prop("Rules", Type::array(Type::TypeName(name("Rule"))))],
            vec![prop("Rules", Type::array(Type::TypeName(name("RuleArm"))))],
        );

        let func = build(&defs, false).unwrap();
        assert_eq!(
            rendered(&[&func.body[2]]),
            vec!["result.Rules = make([]RuleArm, 0, len(resourceGroupSpec.Rules))"]
        );
        let Stmt::Range { key, value, body, .. } = &func.body[3] else {
            panic!("expected range");
        };
        assert_eq!(key, &None);
        assert_eq!(value, "item");
        assert!(matches!(&body[0], Stmt::AssignWithError { value, .. }
            if value.to_string() == "elemArm1"));
        assert!(matches!(body.last(), Some(Stmt::Append { item, .. })
            if item.to_string() == "elemTyped"));
    }

    #[test]
    fn test_map_is_allocated_outside_any_guard() {
        let map = Type::map(string(), Type::Json);
        let defs = definitions(vec![prop("Extra", map.clone())], vec![prop("Extra", map)]);

        let func = build(&defs, false).unwrap();
        assert_eq!(rendered(&[&func.body[2]]), vec!["result.Extra = make(map[string]v1.JSON)"]);
        let Stmt::Range { key, body, .. } = &func.body[3] else {
            panic!("expected range");
        };
        assert_eq!(key.as_deref(), Some("key"));
        assert_eq!(
            rendered(&body.iter().collect::<Vec<_>>()),
            vec!["elemTyped := *value.DeepCopy()"]
        );
    }

    #[test]
    fn test_nested_temporaries_do_not_collide() {
        let nested =
            |inner: &str| Type::array(Type::optional(Type::array(Type::TypeName(name(inner)))));
        let defs =
            definitions(vec![prop("Grid", nested("Cell"))], vec![prop("Grid", nested("CellArm"))]);

        let func = build(&defs, false).unwrap();
        let mut defined = Vec::new();
        for stmt in func.statements() {
            match stmt {
                Stmt::Assign { lhs, op: AssignOp::Define, .. } => defined.push(lhs.to_string()),
                Stmt::VarDecl { name, .. } => defined.push(name.to_string()),
                Stmt::AssignWithError { value, .. } => defined.push(value.to_string()),
                _ => {}
            }
        }

        let unique: BTreeSet<&String> = defined.iter().collect();
        assert_eq!(unique.len(), defined.len(), "duplicate locals: {:?}", defined);
        assert!(defined.contains(&"elemTyped".to_string()));
        assert!(defined.contains(&"elemTyped1".to_string()));
        assert!(defined.contains(&"elemTyped2".to_string()));
    }

    #[test]
    fn test_optional_inside_array_declares_its_destination() {
        let list = |inner: &str| Type::array(Type::optional(Type::TypeName(name(inner))));
        let defs =
            definitions(vec![prop("Items", list("Item"))], vec![prop("Items", list("ItemArm"))]);

        let func = build(&defs, false).unwrap();
        let Stmt::Range { body, .. } = &func.body[3] else {
            panic!("expected range");
        };
        assert!(matches!(&body[0], Stmt::VarDecl { name, type_expr }
            if name.to_string() == "elemTyped" && type_expr.to_string() == "*ItemArm"));
        assert!(matches!(&body[1], Stmt::If { .. }));
    }

    #[test]
    fn test_receiver_never_shadows_function_locals() {
        let naming = NamingConfig::default();
        for kube in ["Result", "Name", "Item", "Err"] {
            let arm_name = name(&format!("{}Arm", kube));
            let arm = ObjectType::new(vec![prop("Location", string())]);
            let mut defs = Definitions::new();
            defs.add(Definition::new(name(kube), object(vec![prop("Location", string())])));
            defs.add(Definition::new(arm_name.clone(), Type::Object(arm.clone())));

            let function = ArmConversionFunction::new("ToArm", arm_name, arm, false);
            let ctx = CodeGenerationContext::new(pkg(), PackageImportSet::new(), &defs);
            let func = function.as_func(&ctx, &name(kube), &naming).unwrap();

            let expected = format!("{}Receiver", kube.to_lowercase());
            assert_eq!(func.receiver_ident(), Some(expected.as_str()));
            assert_eq!(
                rendered(&func.statements()),
                vec![format!("result.Location = {}.Location", expected)]
            );
        }
    }

    #[test]
    fn test_unmatched_properties_are_skipped() {
        let defs = definitions(vec![], vec![prop("Location", string()), prop("Name", string())]);
        let func = build(&defs, false).unwrap();
        assert_eq!(func.body.len(), 3);

        let naming = NamingConfig::default();
        let arm_name = name("ResourceGroupSpecArm");
        let Some(Type::Object(arm)) = defs.get(&arm_name).map(|d| d.definition_type.clone()) else {
            panic!("ARM type missing");
        };
        let function = ArmConversionFunction::new("ToArm", arm_name, arm, true);
        assert_eq!(
            function.unconverted_properties(&ObjectType::default(), &naming),
            vec!["Location"]
        );
    }

    #[test]
    fn test_non_primitive_map_key_is_rejected() {
        let map = |v: &str| Type::map(Type::TypeName(name("Key")), Type::TypeName(name(v)));
        let defs =
            definitions(vec![prop("Index", map("Entry"))], vec![prop("Index", map("EntryArm"))]);
        let result = build(&defs, false);
        assert!(matches!(result, Err(GeneratorError::NonPrimitiveMapKey { property, .. })
            if property == "Index"));
    }

    #[test]
    fn test_discriminator_must_be_an_enum_with_options() {
        let defs = definitions(vec![], vec![prop("Type", string())]);
        assert!(matches!(build(&defs, true), Err(GeneratorError::InvalidDiscriminator { .. })));

        let discriminator = prop("Type", Type::TypeName(name("ResourceGroupsSpecType")));
        let mut defs = definitions(vec![], vec![discriminator]);
        defs.add(Definition::new(
            name("ResourceGroupsSpecType"),
            Type::Enum(EnumType { base: PrimitiveType::String, options: vec![] }),
        ));
        let result = build(&defs, true);
        assert!(matches!(result, Err(GeneratorError::InvalidDiscriminator { reason, .. })
            if reason.contains("no options")));

        // Not a spec: the property is matched by name like any other
        let defs = definitions(vec![], vec![prop("Type", string())]);
        assert!(build(&defs, false).is_ok());
    }

    #[test]
    fn test_inline_destination_shapes_are_errors() {
        let resource =
            Type::Resource(ResourceType { spec: name("ResourceGroupSpec"), status: None });
        let inline_shapes = [
            (object(vec![]), "object"),
            (Type::Enum(EnumType { base: PrimitiveType::String, options: vec![] }), "enum"),
            (resource, "resource"),
        ];
        for (inline, kind) in inline_shapes {
            let defs = definitions(vec![prop("Inline", string())], vec![prop("Inline", inline)]);
            let shape = match build(&defs, false) {
                Err(GeneratorError::UnsupportedConversion { shape, .. }) => shape,
                other => panic!("{} destination accepted: {:?}", kind, other.map(|f| f.name)),
            };
            assert_eq!(shape, kind);
        }
    }

    #[test]
    fn test_foreign_arm_types_are_qualified() {
        let storage = PackageReference::local("microsoft.storage", "v1");
        let defs = definitions(
            vec![prop("Account", Type::TypeName(TypeName::new(storage.clone(), "Account")))],
            vec![prop("Account", Type::TypeName(TypeName::new(storage.clone(), "AccountArm")))],
        );
        let func = build(&defs, false).unwrap();
        assert_eq!(
            rendered(&func.statements()),
            vec!["result.Account = accountArm.(storage.AccountArm)"]
        );

        let other = PackageReference::local("microsoft.network", "v1");
        let defs = definitions(
            vec![prop("Vnet", Type::TypeName(TypeName::new(other.clone(), "Vnet")))],
            vec![prop("Vnet", Type::TypeName(TypeName::new(other, "VnetArm")))],
        );
        assert!(matches!(build(&defs, false), Err(GeneratorError::MissingImport { .. })));
    }

    #[test]
    fn test_validated_and_json_destinations() {
        let validated = Type::validated(Type::Json, Default::default());
        let defs =
            definitions(vec![prop("Payload", validated.clone())], vec![prop("Payload", validated)]);
        let func = build(&defs, false).unwrap();
        assert_eq!(
            rendered(&func.statements()),
            vec!["result.Payload = *resourceGroupSpec.Payload.DeepCopy()"]
        );
    }

    #[test]
    fn test_locally_defined_json_is_deep_copied() {
        let payload = Type::TypeName(name("Payload"));
        let mut defs =
            definitions(vec![prop("Extra", payload.clone())], vec![prop("Extra", payload)]);
        defs.add(Definition::new(name("Payload"), Type::Json));

        let func = build(&defs, false).unwrap();
        let assigns = rendered(&func.statements());
        assert_eq!(assigns, vec!["result.Extra = *resourceGroupSpec.Extra.DeepCopy()"]);
        assert!(!assigns.contains(&"result.Extra = resourceGroupSpec.Extra".to_string()));
    }

    #[test]
    fn test_nesting_context_is_immutable() {
        let root = NestingContext::new();
        let array = root.extend(NestingLevel::Array);
        let both = array.extend(NestingLevel::Optional);
        assert_eq!(root.depth(), 0);
        assert_eq!(array.levels(), &[NestingLevel::Array]);
        assert_eq!(both.temp_name("elemTyped"), "elemTyped2");
        assert_eq!(root.temp_name("skuTyped"), "skuTyped");
    }
}
