//! Package and File Definitions
//!
//! A package groups the reachable definitions of one group/version. It plans
//! its files, and each file turns into a [`GeneratedFile`]: import specs,
//! member definitions and the `ToArm` functions of its convertible members.
//! A companion test file carries the generated test cases of those members.

use serde::Serialize;
use std::collections::BTreeSet;

use super::ast::{FuncDecl, ImportSpec};
use super::context::CodeGenerationContext;
use super::conversion::ArmConversionFunction;
use super::diagnostics::Diagnostics;
use super::files::{allocate_types_to_files, partition_definitions, seed_resource_files, FilePlan};
use super::imports::{ImportConflict, PackageImportSet};
use super::testcases::test_cases_for;
use crate::config::{GeneratorConfig, NamingConfig};
use crate::error::Result;
use crate::model::names::{arm_type_name, is_arm_type_name};
use crate::model::{Definition, Definitions, PackageReference, Type, TypeName};

/// Header line carried by every generated file
pub const GENERATED_HEADER: &str = "Code generated by armgen. DO NOT EDIT.";

// =============================================================================
// Package Definition
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PackageDefinition {
    pub reference: PackageReference,
    definitions: Vec<Definition>,
}

impl PackageDefinition {
    pub fn new(reference: PackageReference) -> Self {
        Self { reference, definitions: Vec::new() }
    }

    pub fn add_definition(&mut self, definition: Definition) {
        self.definitions.push(definition);
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// (resources, everything else)
    pub fn partition_definitions(&self) -> (Vec<Definition>, Vec<Definition>) {
        partition_definitions(self.definitions.clone())
    }

    /// One file per resource, then everything else by ownership
    pub fn plan_files(&self) -> FilePlan {
        let (resources, others) = self.partition_definitions();
        let mut files = seed_resource_files(resources);
        allocate_types_to_files(others, &mut files);
        files
    }

    pub fn group_version_info(&self, domain: &str) -> GroupVersionInfo {
        GroupVersionInfo::new(&self.reference, domain)
    }
}

// =============================================================================
// Group Version Info
// =============================================================================

/// Registration scaffolding for a package: the group/version the scheme
/// builder registers its types under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupVersionInfo {
    pub package_name: String,
    pub group_name: String,
    pub domain: String,
}

impl GroupVersionInfo {
    pub fn new(reference: &PackageReference, domain: &str) -> Self {
        Self {
            package_name: reference.package_name().to_string(),
            group_name: reference.group_name().unwrap_or_default().to_string(),
            domain: domain.to_string(),
        }
    }

    /// Fully qualified API group, e.g. `microsoft.resources.infra.azure.com`
    pub fn group(&self) -> String {
        format!("{}.{}", self.group_name, self.domain)
    }

    pub fn version(&self) -> &str {
        &self.package_name
    }
}

// =============================================================================
// File Definition
// =============================================================================

/// Declarations of one output file, ready for the serializer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedFile {
    pub name: String,
    pub package: PackageReference,
    pub header: Vec<String>,
    pub imports: Vec<ImportSpec>,
    pub definitions: Vec<Definition>,
    pub functions: Vec<FuncDecl>,
}

/// A conversion to attach to a member of the file
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedConversion {
    pub receiver: TypeName,
    pub function: ArmConversionFunction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileDefinition {
    pub package: PackageReference,
    pub definitions: Vec<Definition>,
}

impl FileDefinition {
    pub fn new(package: PackageReference, definitions: Vec<Definition>) -> Self {
        Self { package, definitions }
    }

    /// Members that get a `ToArm` method: objects outside storage packages
    /// whose ARM counterpart exists as an object
    pub fn conversions(&self, all: &Definitions, naming: &NamingConfig) -> Vec<PlannedConversion> {
        if self.package.is_storage() {
            return Vec::new();
        }

        let specs = spec_types(all);
        self.definitions
            .iter()
            .filter(|d| matches!(d.definition_type, Type::Object(_)))
            .filter(|d| !is_arm_type_name(&d.name, &naming.arm_suffix))
            .filter_map(|d| {
                let arm_name = arm_type_name(&d.name, &naming.arm_suffix);
                let Type::Object(arm_type) = &all.get(&arm_name)?.definition_type else {
                    return None;
                };
                Some(PlannedConversion {
                    receiver: d.name.clone(),
                    function: ArmConversionFunction::new(
                        &naming.method_name,
                        arm_name,
                        arm_type.clone(),
                        specs.contains(&d.name),
                    ),
                })
            })
            .collect()
    }

    /// Imports for the members and their conversions, with residual
    /// collisions reported back
    pub fn generate_imports(
        &self,
        conversions: &[PlannedConversion],
    ) -> (PackageImportSet, Vec<ImportConflict>) {
        let mut imports = PackageImportSet::new();
        for definition in &self.definitions {
            for package in definition.definition_type.required_packages() {
                imports.add_reference(package);
            }
        }
        for conversion in conversions {
            for package in conversion.function.required_packages() {
                imports.add_reference(package);
            }
        }

        resolve_file_imports(imports, &self.package)
    }

    pub fn generate(
        &self,
        file_name: &str,
        all: &Definitions,
        config: &GeneratorConfig,
    ) -> Result<(GeneratedFile, Diagnostics)> {
        let naming = &config.naming;
        let name = format!("{}{}", file_name, config.output.file_suffix);
        let mut diagnostics = Diagnostics::new();

        let conversions = self.conversions(all, naming);
        let (imports, conflicts) = self.generate_imports(&conversions);
        report_conflicts(&name, &conflicts, &mut diagnostics);

        let import_specs = import_specs(&imports);
        let ctx = CodeGenerationContext::new(self.package.clone(), imports, all);

        let mut functions = Vec::with_capacity(conversions.len());
        for conversion in &conversions {
            tracing::debug!(
                receiver = %conversion.receiver,
                "Building {}",
                conversion.function.method_name
            );
            functions.push(conversion.function.as_func(&ctx, &conversion.receiver, naming)?);

            if let Ok(definition) = ctx.get_imported_definition(&conversion.receiver) {
                if let Type::Object(kube_type) = &definition.definition_type {
                    for property in conversion.function.unconverted_properties(kube_type, naming) {
                        diagnostics.unconverted_property(&conversion.receiver, property);
                    }
                }
            }
        }

        let file = GeneratedFile {
            name,
            package: self.package.clone(),
            header: vec![GENERATED_HEADER.to_string()],
            imports: import_specs,
            definitions: self.definitions.clone(),
            functions,
        };
        Ok((file, diagnostics))
    }
}

// =============================================================================
// Test File Definition
// =============================================================================

/// The generated tests accompanying one planned file
#[derive(Debug, Clone, PartialEq)]
pub struct TestFileDefinition {
    pub package: PackageReference,
    pub definitions: Vec<Definition>,
}

impl TestFileDefinition {
    pub fn new(package: PackageReference, definitions: Vec<Definition>) -> Self {
        Self { package, definitions }
    }

    /// Does any member define a test case?
    pub fn has_test_cases(&self) -> bool {
        self.definitions.iter().any(|d| !test_cases_for(d).is_empty())
    }

    /// Imports every test case needs, resolved like a definition file's
    pub fn generate_imports(&self) -> (PackageImportSet, Vec<ImportConflict>) {
        let mut imports = PackageImportSet::new();
        for definition in &self.definitions {
            for case in test_cases_for(definition) {
                for package in case.required_packages() {
                    imports.add_reference(package);
                }
            }
        }
        resolve_file_imports(imports, &self.package)
    }

    pub fn generate(
        &self,
        file_name: &str,
        all: &Definitions,
        config: &GeneratorConfig,
    ) -> Result<(GeneratedFile, Diagnostics)> {
        let output = &config.output;
        let name = format!("{}{}{}", file_name, output.file_suffix, output.test_file_suffix);
        let mut diagnostics = Diagnostics::new();

        let (imports, conflicts) = self.generate_imports();
        report_conflicts(&name, &conflicts, &mut diagnostics);

        let import_specs = import_specs(&imports);
        let ctx = CodeGenerationContext::new(self.package.clone(), imports, all);

        let mut functions = Vec::new();
        for definition in &self.definitions {
            for case in test_cases_for(definition) {
                tracing::debug!(subject = %definition.name, "Building {}", case.name());
                functions.extend(case.as_funcs(&definition.name, &ctx)?);
            }
        }

        let file = GeneratedFile {
            name,
            package: self.package.clone(),
            header: vec![GENERATED_HEADER.to_string()],
            imports: import_specs,
            definitions: Vec::new(),
            functions,
        };
        Ok((file, diagnostics))
    }
}

/// Drop the self import, alias local packages by service, then widen what
/// collides. Returns whatever still collides.
fn resolve_file_imports(
    mut imports: PackageImportSet,
    package: &PackageReference,
) -> (PackageImportSet, Vec<ImportConflict>) {
    imports.remove(package);
    imports.apply_service_names();
    let conflicts = imports.resolve_conflicts();
    (imports, conflicts)
}

fn report_conflicts(file: &str, conflicts: &[ImportConflict], diagnostics: &mut Diagnostics) {
    for conflict in conflicts {
        tracing::warn!(file = %file, "{}", conflict);
        diagnostics.import_conflict(file, conflict);
    }
}

fn import_specs(imports: &PackageImportSet) -> Vec<ImportSpec> {
    imports.as_sorted_slice().into_iter().map(|i| i.as_import_spec()).collect()
}

/// Names used as some resource's spec
fn spec_types(all: &Definitions) -> BTreeSet<TypeName> {
    all.iter()
        .filter_map(|d| all.resolve_resource_type(&d.definition_type))
        .map(|r| r.spec.clone())
        .collect()
}
