//! Generated Test Cases
//!
//! Test functions emitted next to a file's definitions. Every struct-shaped
//! definition gets a JSON round trip: marshal a zero value, unmarshal it into
//! a fresh one and require the two to be deeply equal.

use std::collections::BTreeSet;

use super::ast::{local_variable_declaration, AssignOp, Expr, FuncDecl, Stmt, TypeExpr};
use super::context::CodeGenerationContext;
use crate::error::Result;
use crate::model::{Definition, PackageReference, Type, TypeName};

const JSON_PACKAGE: &str = "encoding/json";
const REFLECT_PACKAGE: &str = "reflect";
const TESTING_PACKAGE: &str = "testing";

/// A generated test for one definition
pub trait TestCase {
    /// Name of the generated test function
    fn name(&self) -> &str;

    /// Packages the generated declarations refer to
    fn required_packages(&self) -> BTreeSet<PackageReference>;

    /// Declarations testing `subject`
    fn as_funcs(
        &self,
        subject: &TypeName,
        ctx: &CodeGenerationContext<'_>,
    ) -> Result<Vec<FuncDecl>>;
}

/// Test cases for `definition`; only objects and resources have any
pub fn test_cases_for(definition: &Definition) -> Vec<Box<dyn TestCase>> {
    match &definition.definition_type {
        Type::Object(_) | Type::Resource(_) => {
            let round_trip: Box<dyn TestCase> =
                Box::new(JsonSerializationTestCase::new(&definition.name));
            vec![round_trip]
        }
        Type::Primitive(_)
        | Type::Array(_)
        | Type::Map { .. }
        | Type::Optional(_)
        | Type::Enum(_)
        | Type::TypeName(_)
        | Type::Validated { .. }
        | Type::Json => Vec::new(),
    }
}

/// `Test_{Name}_WhenSerializedToJson_DeserializesAsEqual`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonSerializationTestCase {
    name: String,
}

impl JsonSerializationTestCase {
    pub fn new(subject: &TypeName) -> Self {
        Self {
            name: format!("Test_{}_WhenSerializedToJson_DeserializesAsEqual", subject.name),
        }
    }
}

impl TestCase for JsonSerializationTestCase {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_packages(&self) -> BTreeSet<PackageReference> {
        [JSON_PACKAGE, REFLECT_PACKAGE, TESTING_PACKAGE]
            .into_iter()
            .map(PackageReference::external)
            .collect()
    }

    /// ```text
    /// subject := T{}
    /// bin, err := json.Marshal(subject)
    /// if err != nil { t.Fatal(err) }
    /// var actual T
    /// err = json.Unmarshal(bin, &actual)
    /// if err != nil { t.Fatal(err) }
    /// if !reflect.DeepEqual(subject, actual) { t.Errorf(...) }
    /// ```
    fn as_funcs(
        &self,
        subject: &TypeName,
        ctx: &CodeGenerationContext<'_>,
    ) -> Result<Vec<FuncDecl>> {
        let json = ctx.get_imported_package_name(&PackageReference::external(JSON_PACKAGE))?;
        let reflect = ctx.get_imported_package_name(&PackageReference::external(REFLECT_PACKAGE))?;
        let testing = ctx.get_imported_package_name(&PackageReference::external(TESTING_PACKAGE))?;
        let subject_type = ctx.qualified_type(subject)?;

        let t = Expr::ident("t");
        let err = Expr::ident("err");
        let value = Expr::ident("subject");
        let actual = Expr::ident("actual");
        let bin = Expr::ident("bin");
        let fatal_on_error = Stmt::If {
            condition: Expr::not_nil(err.clone()),
            body: vec![Stmt::Expr(Expr::method_call(t.clone(), "Fatal", vec![err.clone()]))],
        };

        let mut func = FuncDecl::new(&self.name);
        func.add_parameter("t", TypeExpr::pointer(TypeExpr::qualified(testing, "T")));
        func.add_comments(format!("checks that {} survives a JSON round trip", subject.name));
        func.body = vec![
            Stmt::assign(value.clone(), AssignOp::Define, Expr::Composite(subject_type.clone())),
            Stmt::AssignWithError {
                value: bin.clone(),
                call: Expr::call(format!("{}.Marshal", json), vec![value.clone()]),
            },
            fatal_on_error.clone(),
            local_variable_declaration(actual.clone(), subject_type),
            Stmt::assign(
                err,
                AssignOp::Assign,
                Expr::call(
                    format!("{}.Unmarshal", json),
                    vec![bin, Expr::address_of(actual.clone())],
                ),
            ),
            fatal_on_error,
            Stmt::If {
                condition: Expr::not(Expr::call(
                    format!("{}.DeepEqual", reflect),
                    vec![value, actual],
                )),
                body: vec![Stmt::Expr(Expr::method_call(
                    t,
                    "Errorf",
                    vec![Expr::Str(format!("{} changed in a JSON round trip", subject.name))],
                ))],
            },
        ];
        Ok(vec![func])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::imports::PackageImportSet;
    use crate::model::{Definitions, EnumType, ObjectType, PrimitiveType};

    fn pkg() -> PackageReference {
        PackageReference::local("microsoft.storage", "v20190401")
    }

    #[test]
    fn test_only_struct_shapes_get_test_cases() {
        let sku = Definition::new(TypeName::new(pkg(), "Sku"), Type::Object(ObjectType::default()));
        let tier = Definition::new(
            TypeName::new(pkg(), "SkuTier"),
            Type::Enum(EnumType { base: PrimitiveType::String, options: vec![] }),
        );

        let cases = test_cases_for(&sku);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name(), "Test_Sku_WhenSerializedToJson_DeserializesAsEqual");
        assert!(test_cases_for(&tier).is_empty());
    }

    #[test]
    fn test_json_round_trip_body() {
        let subject = TypeName::new(pkg(), "Sku");
        let defs: Definitions =
            vec![Definition::new(subject.clone(), Type::Object(ObjectType::default()))].into();
        let case = JsonSerializationTestCase::new(&subject);

        let mut imports = PackageImportSet::new();
        for package in case.required_packages() {
            imports.add_reference(package);
        }
        let ctx = CodeGenerationContext::new(pkg(), imports, &defs);
        let funcs = case.as_funcs(&subject, &ctx).unwrap();

        assert_eq!(funcs.len(), 1);
        let func = &funcs[0];
        assert_eq!(func.receiver_ident(), None);
        assert_eq!(func.parameters[0].type_expr.to_string(), "*testing.T");
        let sku = Expr::Composite(TypeExpr::named("Sku"));
        assert_eq!(func.body[0], Stmt::assign(Expr::ident("subject"), AssignOp::Define, sku));
        assert!(matches!(&func.body[1], Stmt::AssignWithError { call, .. }
            if call.to_string() == "json.Marshal(subject)"));
        assert!(matches!(&func.body[6], Stmt::If { condition, .. }
            if condition.to_string() == "!reflect.DeepEqual(subject, actual)"));
    }

    #[test]
    fn test_missing_imports_are_errors() {
        let subject = TypeName::new(pkg(), "Sku");
        let defs = Definitions::new();
        let ctx = CodeGenerationContext::new(pkg(), PackageImportSet::new(), &defs);
        assert!(JsonSerializationTestCase::new(&subject).as_funcs(&subject, &ctx).is_err());
    }
}
