//! Import Resolution
//!
//! Each generated file imports the packages its members mention. Local
//! packages are aliased by service name so that several API versions named
//! `v1` can coexist; whatever still collides afterwards is reported, not fixed.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::ast::ImportSpec;
use crate::model::PackageReference;

/// A single import, optionally aliased
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageImport {
    pub package: PackageReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PackageImport {
    pub fn new(package: PackageReference) -> Self {
        Self { package, name: None }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self { package: self.package.clone(), name: Some(name.into()) }
    }

    pub fn has_explicit_name(&self) -> bool {
        self.name.is_some()
    }

    /// Name generated code uses to qualify references into this package
    pub fn effective_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.package.package_name())
    }

    pub fn as_import_spec(&self) -> ImportSpec {
        ImportSpec {
            name: self.name.clone(),
            path: self.package.import_path(),
        }
    }
}

/// Two or more packages that ended up with the same import name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportConflict {
    pub name: String,
    pub packages: Vec<PackageReference>,
}

impl fmt::Display for ImportConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let packages: Vec<String> = self.packages.iter().map(|p| p.to_string()).collect();
        write!(f, "import name '{}' is used by {}", self.name, packages.join(", "))
    }
}

/// Set of imports, at most one per package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageImportSet {
    imports: BTreeMap<PackageReference, PackageImport>,
}

impl PackageImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an import. An explicit name replaces whatever was there; an
    /// unnamed import never overrides an existing one.
    pub fn add_import(&mut self, import: PackageImport) {
        match self.imports.get(&import.package) {
            Some(existing) if existing.has_explicit_name() && !import.has_explicit_name() => {}
            _ => {
                self.imports.insert(import.package.clone(), import);
            }
        }
    }

    pub fn add_reference(&mut self, package: PackageReference) {
        self.add_import(PackageImport::new(package));
    }

    pub fn merge(&mut self, other: &PackageImportSet) {
        for import in other.imports.values() {
            self.add_import(import.clone());
        }
    }

    pub fn remove(&mut self, package: &PackageReference) {
        self.imports.remove(package);
    }

    pub fn contains(&self, package: &PackageReference) -> bool {
        self.imports.contains_key(package)
    }

    pub fn import_for(&self, package: &PackageReference) -> Option<&PackageImport> {
        self.imports.get(package)
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageImport> {
        self.imports.values()
    }

    /// Imports ordered by path
    pub fn as_sorted_slice(&self) -> Vec<&PackageImport> {
        let mut result: Vec<&PackageImport> = self.imports.values().collect();
        result.sort_by_key(|i| i.package.import_path());
        result
    }

    /// Alias for a local import, derived from its service
    pub fn service_name_for_import(&self, import: &PackageImport) -> String {
        import.package.service_name()
    }

    /// Give every local import lacking a name an alias based on its service
    pub fn apply_service_names(&mut self) {
        let unnamed: Vec<PackageImport> = self
            .imports
            .values()
            .filter(|i| i.package.is_local() && !i.has_explicit_name())
            .cloned()
            .collect();

        for import in unnamed {
            let name = self.service_name_for_import(&import);
            self.add_import(import.with_name(name));
        }
    }

    /// Widen colliding local aliases to service + version, then report what
    /// still collides. Reported conflicts are left in place.
    pub fn resolve_conflicts(&mut self) -> Vec<ImportConflict> {
        for conflict in self.find_conflicts() {
            for package in conflict.packages {
                if let PackageReference::Local { version, .. }
                | PackageReference::Storage { version, .. } = &package
                {
                    let widened = format!("{}{}", package.service_name(), sanitize(version));
                    let import = PackageImport::new(package.clone()).with_name(widened);
                    self.add_import(import);
                }
            }
        }

        self.find_conflicts()
    }

    fn find_conflicts(&self) -> Vec<ImportConflict> {
        let mut by_name: BTreeMap<&str, BTreeSet<&PackageReference>> = BTreeMap::new();
        for import in self.imports.values() {
            by_name.entry(import.effective_name()).or_default().insert(&import.package);
        }

        by_name
            .into_iter()
            .filter(|(_, packages)| packages.len() > 1)
            .map(|(name, packages)| ImportConflict {
                name: name.to_string(),
                packages: packages.into_iter().cloned().collect(),
            })
            .collect()
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}
