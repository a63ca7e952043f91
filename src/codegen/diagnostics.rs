//! Diagnostics
//!
//! Non-fatal findings collected while generating. Anything that would make
//! the output wrong is a [`crate::error::GeneratorError`] instead.

use serde::Serialize;
use std::fmt;

use super::imports::ImportConflict;
use crate::model::TypeName;

// =============================================================================
// Diagnostic Codes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    /// Two imports in one file share a name
    ImportConflict,
    /// ARM property no handler could fill; left at its zero value
    UnconvertedProperty,
    /// Definition unreachable from any resource
    PrunedDefinition,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImportConflict => "W001",
            Self::UnconvertedProperty => "I001",
            Self::PrunedDefinition => "I002",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::ImportConflict => Severity::Warning,
            Self::UnconvertedProperty | Self::PrunedDefinition => Severity::Info,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticItem {
    /// Definition or file the finding is about
    pub subject: String,
    pub code: DiagnosticCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(
        subject: impl Into<String>,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {} ({})", self.code, self.code.severity(), self.message, self.subject)?;
        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }
        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    pub fn import_conflict(&mut self, file: &str, conflict: &ImportConflict) {
        let mut item = DiagnosticItem::new(
            file,
            DiagnosticCode::ImportConflict,
            format!(
                "Import name '{}' is shared by {} packages",
                conflict.name,
                conflict.packages.len()
            ),
        );
        for package in &conflict.packages {
            item = item.with_context(package.import_path());
        }
        self.push(item);
    }

    pub fn unconverted_property(&mut self, receiver: &TypeName, property: &str) {
        self.push(DiagnosticItem::new(
            receiver.to_string(),
            DiagnosticCode::UnconvertedProperty,
            format!("No conversion found for ARM property '{}'; it is left unset", property),
        ));
    }

    pub fn pruned_definition(&mut self, name: &TypeName) {
        self.push(DiagnosticItem::new(
            name.to_string(),
            DiagnosticCode::PrunedDefinition,
            "Not reachable from any resource; omitted from output",
        ));
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn count_of(&self, code: DiagnosticCode) -> usize {
        self.items.iter().filter(|i| i.code == code).count()
    }

    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn format_all(&self) -> String {
        let mut output = String::new();
        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }
        if !self.is_empty() {
            output.push_str(&format!(
                "\n{} warning(s), {} note(s)\n",
                self.warning_count(),
                self.len() - self.warning_count()
            ));
        }
        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl IntoIterator for Diagnostics {
    type Item = DiagnosticItem;
    type IntoIter = std::vec::IntoIter<DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PackageReference;

    #[test]
    fn test_diagnostic_severity() {
        assert_eq!(DiagnosticCode::ImportConflict.severity(), Severity::Warning);
        assert_eq!(DiagnosticCode::PrunedDefinition.severity(), Severity::Info);
    }

    #[test]
    fn test_diagnostics_collection() {
        let package = PackageReference::local("microsoft.resources", "v1");
        let mut diags = Diagnostics::new();
        diags.pruned_definition(&TypeName::new(package.clone(), "Orphan"));
        diags.import_conflict(
            "resource_group_types",
            &ImportConflict {
                name: "util".to_string(),
                packages: vec![
                    PackageReference::external("example.com/a/util"),
                    PackageReference::external("example.com/b/util"),
                ],
            },
        );

        assert_eq!(diags.len(), 2);
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(diags.count_of(DiagnosticCode::PrunedDefinition), 1);
        assert!(diags.to_string().contains("example.com/b/util"));
    }
}
