//! Error types for the generator
//!
//! Every variant is a generation-time defect: it halts the run and names the
//! offending definition. Errors raised by the *generated* conversion functions
//! only exist inside the declaration tree and never surface here.

use std::fmt;
use thiserror::Error;

use crate::model::{PackageReference, TypeName};

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Which half of a resource an ARM counterpart belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterpartRole {
    Spec,
    Status,
}

impl fmt::Display for CounterpartRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spec => write!(f, "spec"),
            Self::Status => write!(f, "status"),
        }
    }
}

/// Generator errors
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Couldn't find ARM {role} type {arm_name} for resource {resource}")]
    MissingArmCounterpart {
        resource: TypeName,
        role: CounterpartRole,
        arm_name: TypeName,
    },

    #[error("Map property {property} of {definition} has non-primitive key type {key}")]
    NonPrimitiveMapKey {
        definition: TypeName,
        property: String,
        key: String,
    },

    #[error("Don't know how to convert property {property} of {definition} to ARM: unsupported {shape} destination")]
    UnsupportedConversion {
        definition: TypeName,
        property: String,
        shape: &'static str,
    },

    #[error("Discriminator property {property} of {definition} is invalid: {reason}")]
    InvalidDiscriminator {
        definition: TypeName,
        property: String,
        reason: String,
    },

    #[error("Definition not found: {0}")]
    UnknownDefinition(TypeName),

    #[error("Package {package} is not imported into {current}")]
    MissingImport {
        package: PackageReference,
        current: PackageReference,
    },

    #[error("{from} references {to}, which is not defined")]
    UnresolvedReference { from: TypeName, to: TypeName },

    #[error("Definition {0} is defined more than once")]
    DuplicateDefinition(TypeName),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
