//! Code Generation
//!
//! Turns a closed type model into per-file declaration trees.
//!
//! Pipeline:
//! - Reference graph: prune everything unreachable from a resource
//! - Packages: group the survivors by package
//! - File allocation: resources alone, other definitions by ownership
//! - Per file: resolve imports, then build one `ToArm` function per
//!   convertible object
//! - Per file: a companion test file with the members' test cases
//!
//! The output is data for a downstream serializer; nothing here renders
//! source text.

pub mod ast;
pub mod context;
pub mod conversion;
pub mod diagnostics;
pub mod files;
pub mod imports;
pub mod package;
pub mod testcases;

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub use ast::{AssignOp, Expr, FuncDecl, ImportSpec, Receiver, Stmt, TypeExpr};
pub use context::CodeGenerationContext;
pub use conversion::{ArmConversionFunction, NestingContext, NestingLevel};
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use files::{allocate_types_to_files, FilePlan};
pub use imports::{ImportConflict, PackageImport, PackageImportSet};
pub use package::{
    FileDefinition, GeneratedFile, GroupVersionInfo, PackageDefinition, TestFileDefinition,
};
pub use testcases::{JsonSerializationTestCase, TestCase};

use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::graph::{ReachableTypes, ReferenceGraph};
use crate::model::{Definitions, PackageReference};

/// Everything generated for one package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedPackage {
    pub reference: PackageReference,
    pub group_version: GroupVersionInfo,
    /// File holding the registration scaffolding
    pub group_version_file: String,
    pub files: Vec<GeneratedFile>,
    pub test_files: Vec<GeneratedFile>,
}

impl GeneratedPackage {
    pub fn file(&self, name: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn test_file(&self, name: &str) -> Option<&GeneratedFile> {
        self.test_files.iter().find(|f| f.name == name)
    }
}

/// Result of a generation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedOutput {
    /// Hash of the input model
    pub bundle_hash: String,
    pub reachable: ReachableTypes,
    pub packages: Vec<GeneratedPackage>,
    pub diagnostics: Diagnostics,
}

impl GeneratedOutput {
    pub fn package(&self, reference: &PackageReference) -> Option<&GeneratedPackage> {
        self.packages.iter().find(|p| p.reference == *reference)
    }

    pub fn file_count(&self) -> usize {
        self.packages.iter().map(|p| p.files.len()).sum()
    }

    pub fn function_count(&self) -> usize {
        self.packages
            .iter()
            .flat_map(|p| &p.files)
            .map(|f| f.functions.len())
            .sum()
    }

    /// Generated test functions across all test files
    pub fn test_count(&self) -> usize {
        self.packages
            .iter()
            .flat_map(|p| &p.test_files)
            .map(|f| f.functions.len())
            .sum()
    }
}

/// Reachable definitions and their depths, rooted at the resources
pub fn collect_reachable(
    definitions: &Definitions,
    config: &GeneratorConfig,
) -> Result<ReachableTypes> {
    let graph = ReferenceGraph::with_resources_as_roots(definitions, &config.naming)?;
    debug!(
        roots = graph.roots().len(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Built reference graph"
    );
    Ok(graph.connected())
}

/// Run the whole pipeline
pub fn generate(definitions: &Definitions, config: &GeneratorConfig) -> Result<GeneratedOutput> {
    info!(definitions = definitions.len(), "Generating conversions");
    let bundle_hash = definitions.bundle_hash()?;
    let mut diagnostics = Diagnostics::new();

    let reachable = collect_reachable(definitions, config)?;
    for name in definitions.names().filter(|n| !reachable.contains(n)) {
        diagnostics.pruned_definition(name);
    }
    let kept = reachable.retain_reachable(definitions);
    info!(
        reachable = kept.len(),
        pruned = definitions.len() - kept.len(),
        "Pruned unreachable definitions"
    );

    let mut packages: BTreeMap<PackageReference, PackageDefinition> = BTreeMap::new();
    for definition in kept.iter() {
        packages
            .entry(definition.name.package.clone())
            .or_insert_with(|| PackageDefinition::new(definition.name.package.clone()))
            .add_definition(definition.clone());
    }

    let mut generated = Vec::with_capacity(packages.len());
    for (reference, package) in packages {
        if !reference.is_local() {
            debug!(package = %reference, "Skipping package outside the generated tree");
            continue;
        }

        let mut files = Vec::new();
        let mut test_files = Vec::new();
        for (file_name, members) in package.plan_files() {
            debug!(
                package = %reference,
                file = %file_name,
                members = members.len(),
                "Generating file"
            );

            let tests = TestFileDefinition::new(reference.clone(), members.clone());
            if config.output.generate_tests && tests.has_test_cases() {
                let (generated_tests, test_diagnostics) =
                    tests.generate(&file_name, &kept, config)?;
                diagnostics.merge(test_diagnostics);
                test_files.push(generated_tests);
            }

            let file = FileDefinition::new(reference.clone(), members);
            let (generated_file, file_diagnostics) = file.generate(&file_name, &kept, config)?;
            diagnostics.merge(file_diagnostics);
            files.push(generated_file);
        }

        generated.push(GeneratedPackage {
            group_version: package.group_version_info(&config.output.group_domain),
            group_version_file: config.output.group_version_file.clone(),
            reference,
            files,
            test_files,
        });
    }

    let output = GeneratedOutput {
        bundle_hash,
        reachable,
        packages: generated,
        diagnostics,
    };
    info!(
        packages = output.packages.len(),
        files = output.file_count(),
        functions = output.function_count(),
        tests = output.test_count(),
        warnings = output.diagnostics.warning_count(),
        "Generation complete"
    );
    Ok(output)
}
