//! File Allocation
//!
//! Decides which output file each definition of a package lands in. Every
//! resource gets a file of its own; other definitions join the single file
//! that references them, or get a file of their own when ownership is shared
//! or absent.

use std::collections::{BTreeMap, VecDeque};

use crate::model::names::file_name_hint;
use crate::model::{Definition, TypeName};

/// File name (without suffix) to member definitions
pub type FilePlan = BTreeMap<String, Vec<Definition>>;

/// Where a definition should go, judged from the files allocated so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    /// Exactly one file references it
    File(String),
    /// Several files reference it
    Shared,
    /// No file references it yet
    Unowned,
}

/// Split into (resources, everything else), preserving order
pub fn partition_definitions(definitions: Vec<Definition>) -> (Vec<Definition>, Vec<Definition>) {
    definitions.into_iter().partition(|d| d.is_resource())
}

/// One file per resource
pub fn seed_resource_files(resources: Vec<Definition>) -> FilePlan {
    let mut files = FilePlan::new();
    for resource in resources {
        let name = unique_file_name(&file_name_hint(&resource.name), &files);
        files.insert(name, vec![resource]);
    }
    files
}

/// Does any of `definitions` mention `name`?
pub fn any_references<'a>(
    definitions: impl IntoIterator<Item = &'a Definition>,
    name: &TypeName,
) -> bool {
    definitions
        .into_iter()
        .any(|d| d.definition_type.references_name(name))
}

pub fn allocate_type_to_file(definition: &Definition, files: &FilePlan) -> Allocation {
    let mut owner: Option<&String> = None;
    for (file_name, members) in files {
        if !any_references(members, &definition.name) {
            continue;
        }
        match owner {
            None => owner = Some(file_name),
            Some(_) => return Allocation::Shared,
        }
    }

    match owner {
        Some(file_name) => Allocation::File(file_name.clone()),
        None => Allocation::Unowned,
    }
}

/// Place every queued definition into `files`.
///
/// A definition nobody references yet is requeued while some other queued
/// definition still mentions it. A round that places nothing isolates the
/// head of the queue, so each round shrinks the queue.
pub fn allocate_types_to_files(queue: Vec<Definition>, files: &mut FilePlan) {
    let mut queue: VecDeque<Definition> = queue.into();

    while !queue.is_empty() {
        let mut placed = false;

        for _ in 0..queue.len() {
            let Some(definition) = queue.pop_front() else {
                break;
            };

            match allocate_type_to_file(&definition, files) {
                Allocation::File(file_name) => {
                    files.entry(file_name).or_default().push(definition);
                    placed = true;
                }
                Allocation::Shared => {
                    isolate(definition, files);
                    placed = true;
                }
                Allocation::Unowned => {
                    if any_references(queue.iter(), &definition.name) {
                        queue.push_back(definition);
                    } else {
                        isolate(definition, files);
                        placed = true;
                    }
                }
            }
        }

        if !placed {
            if let Some(definition) = queue.pop_front() {
                tracing::debug!(
                    definition = %definition.name,
                    "Breaking reference cycle with its own file"
                );
                isolate(definition, files);
            }
        }
    }
}

fn isolate(definition: Definition, files: &mut FilePlan) {
    let file_name = unique_file_name(&file_name_hint(&definition.name), files);
    files.insert(file_name, vec![definition]);
}

/// `hint`, or `hint_2`, `hint_3`, ... if taken
fn unique_file_name(hint: &str, files: &FilePlan) -> String {
    if !files.contains_key(hint) {
        return hint.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", hint, n))
        .find(|candidate| !files.contains_key(candidate))
        .unwrap_or_else(|| hint.to_string())
}
