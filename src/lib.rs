//! armgen
//!
//! Generates the conversion from a Kubernetes-style desired-state object
//! model to the wire model of the Azure Resource Manager API.
//!
//! ## Features
//!
//! - **Closed type model**: primitives, objects, arrays, maps, optionals,
//!   enums, named references, validated wrappers, resources and JSON payloads
//! - **Reachability pruning**: only what some resource needs is emitted
//! - **File layout**: one file per resource, shared definitions isolated
//! - **Import resolution**: service-name aliases, conflicts reported
//! - **Conversion synthesis**: `ToArm` functions as declaration trees, deep
//!   copies for anything reference-like
//!
//! ## Pipeline
//!
//! ```text
//! model/*.json ──load──▶ Definitions ──graph──▶ ReachableTypes
//!                                                   │
//!            GeneratedOutput ◀──files/imports/ToArm─┘
//! ```

pub mod codegen;
pub mod config;
pub mod error;
pub mod graph;
pub mod model;

pub use codegen::{collect_reachable, generate, GeneratedOutput, GeneratedPackage};
pub use config::GeneratorConfig;
pub use error::{GeneratorError, Result};
pub use graph::{ReachableTypes, ReferenceGraph};
pub use model::{Definition, Definitions, PackageReference, Type, TypeName};
