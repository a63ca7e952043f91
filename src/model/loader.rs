//! Type Model Loading
//!
//! Loads definitions from JSON files produced by the schema ingestion stage
//! and checks that the resulting model is closed.

use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::{Definition, Definitions};
use crate::error::{GeneratorError, Result};

/// Load definitions from a single JSON file (an array of definitions)
pub fn load_from_file(path: &Path) -> Result<Definitions> {
    let content = fs::read_to_string(path)?;
    let definitions: Vec<Definition> = serde_json::from_str(&content)?;

    let mut result = Definitions::new();
    merge(&mut result, definitions)?;

    tracing::debug!("Loaded {} definitions from {}", result.len(), path.display());
    Ok(result)
}

/// Load every `*.json` file under a directory into one registry
pub fn load_from_directory(dir: &Path) -> Result<Definitions> {
    let mut paths: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| e.path().extension().map(|ext| ext == "json").unwrap_or(false))
        .map(|e| e.into_path())
        .collect();
    // Directory order is platform dependent
    paths.sort();

    let mut result = Definitions::new();
    for path in &paths {
        let content = fs::read_to_string(path)?;
        let definitions: Vec<Definition> = serde_json::from_str(&content)?;
        merge(&mut result, definitions)?;
    }

    tracing::info!("Loaded {} definitions from {} files", result.len(), paths.len());
    Ok(result)
}

fn merge(into: &mut Definitions, definitions: Vec<Definition>) -> Result<()> {
    for definition in definitions {
        let name = definition.name.clone();
        if into.add(definition).is_some() {
            return Err(GeneratorError::DuplicateDefinition(name));
        }
    }
    Ok(())
}

/// Every referenced name must resolve, except the JSON marker
pub fn validate_closed(definitions: &Definitions) -> Result<()> {
    for definition in definitions {
        for referenced in definition.references() {
            if !referenced.is_json() && !definitions.contains(&referenced) {
                return Err(GeneratorError::UnresolvedReference {
                    from: definition.name.clone(),
                    to: referenced,
                });
            }
        }
    }
    Ok(())
}
