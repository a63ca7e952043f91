//! Type Model
//!
//! Closed set of type shapes plus the definition registry consumed by the
//! reference graph, file allocator and conversion builder.
//!
//! Every dispatch over [`Type`] in this crate is an exhaustive `match` with no
//! catch-all arm, so adding a shape fails to compile until each site decides
//! how to handle it.

pub mod loader;
pub mod names;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::Result;

pub use loader::{load_from_directory, load_from_file, validate_closed};
pub use names::{IdentifierFactory, Visibility};

// =============================================================================
// Package References
// =============================================================================

/// Path of the package holding the JSON passthrough marker type.
pub const JSON_PACKAGE_PATH: &str = "k8s.io/apiextensions-apiserver/pkg/apis/apiextensions/v1";

/// Identity of a generation unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageReference {
    /// A generated API package (group/version)
    Local { group: String, version: String },
    /// A storage-only package; never paired with ARM counterparts
    Storage { group: String, version: String },
    /// A package outside the generated tree
    External { path: String },
}

impl PackageReference {
    pub fn local(group: impl Into<String>, version: impl Into<String>) -> Self {
        Self::Local { group: group.into(), version: version.into() }
    }

    pub fn storage(group: impl Into<String>, version: impl Into<String>) -> Self {
        Self::Storage { group: group.into(), version: version.into() }
    }

    pub fn external(path: impl Into<String>) -> Self {
        Self::External { path: path.into() }
    }

    /// Package holding [`TypeName::json`]
    pub fn json() -> Self {
        Self::external(JSON_PACKAGE_PATH)
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// Local and storage packages are both produced by this generator
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. } | Self::Storage { .. })
    }

    /// Default (unaliased) package name used when importing
    pub fn package_name(&self) -> &str {
        match self {
            Self::Local { version, .. } | Self::Storage { version, .. } => version,
            Self::External { path } => path.rsplit('/').next().unwrap_or(path),
        }
    }

    /// API group, if this is a generated package
    pub fn group_name(&self) -> Option<&str> {
        match self {
            Self::Local { group, .. } | Self::Storage { group, .. } => Some(group),
            Self::External { .. } => None,
        }
    }

    /// Service name derived from the group: `microsoft.storage` -> `storage`
    pub fn service_name(&self) -> String {
        let source = match self {
            Self::Local { group, .. } | Self::Storage { group, .. } => group.as_str(),
            Self::External { path } => path.rsplit('/').nth(1).unwrap_or(path),
        };
        let parts: Vec<&str> = source.split('.').collect();
        let service = if parts.len() > 1 { parts[1..].concat() } else { parts.concat() };
        service
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase()
    }

    /// Path used in an import statement
    pub fn import_path(&self) -> String {
        match self {
            Self::Local { group, version } => format!("{}/{}", group, version),
            Self::Storage { group, version } => format!("{}/{}storage", group, version),
            Self::External { path } => path.clone(),
        }
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.import_path())
    }
}

// =============================================================================
// Type Names
// =============================================================================

/// Package-qualified reference to a [`Definition`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName {
    pub package: PackageReference,
    pub name: String,
}

impl TypeName {
    pub fn new(package: PackageReference, name: impl Into<String>) -> Self {
        Self { package, name: name.into() }
    }

    /// The JSON passthrough marker
    pub fn json() -> Self {
        Self::new(PackageReference::json(), "JSON")
    }

    pub fn is_json(&self) -> bool {
        *self == Self::json()
    }

    /// Same package, different name
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self::new(self.package.clone(), name)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.name)
    }
}

// =============================================================================
// Types
// =============================================================================

/// Primitive wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    Bool,
    Int,
    Int64,
    Uint32,
    Float,
    String,
}

impl PrimitiveType {
    pub fn go_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Int64 => "int64",
            Self::Uint32 => "uint32",
            Self::Float => "float64",
            Self::String => "string",
        }
    }
}

/// A named, typed property of an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: Type,
    /// Serialization tag (JSON field name)
    pub json_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>, json_name: impl Into<String>, property_type: Type) -> Self {
        Self {
            name: name.into(),
            property_type,
            json_name: json_name.into(),
            description: None,
        }
    }
}

/// Object with an ordered set of properties
#[derive(Debug, Clone, Default, Eq, Serialize, Deserialize)]
pub struct ObjectType {
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
}

impl ObjectType {
    pub fn new(properties: Vec<PropertyDefinition>) -> Self {
        Self { properties }
    }

    /// Look up a property by exact name
    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDefinition> {
        self.properties.iter()
    }
}

// Properties are a set: order does not participate in equality
impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        self.properties.len() == other.properties.len()
            && self
                .properties
                .iter()
                .all(|p| other.property(&p.name).map(|o| o == p).unwrap_or(false))
    }
}

/// One option of an enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    /// Exported identifier fragment, e.g. `ResourceGroups`
    pub identifier: String,
    /// Value on the wire, e.g. `Microsoft.Resources/resourceGroups`
    pub value: String,
}

impl EnumValue {
    pub fn new(identifier: impl Into<String>, value: impl Into<String>) -> Self {
        Self { identifier: identifier.into(), value: value.into() }
    }
}

/// Enum over a primitive base type with ordered options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    pub base: PrimitiveType,
    pub options: Vec<EnumValue>,
}

/// Validation constraints. Never affect wire shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
}

/// A resource: spec plus optional status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    pub spec: TypeName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TypeName>,
}

/// Closed set of type shapes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Primitive(PrimitiveType),
    Object(ObjectType),
    Array(Box<Type>),
    Map { key: Box<Type>, value: Box<Type> },
    Optional(Box<Type>),
    Enum(EnumType),
    TypeName(TypeName),
    Validated {
        element: Box<Type>,
        #[serde(default)]
        validations: Validations,
    },
    Resource(ResourceType),
    /// Opaque, mutable JSON payload
    Json,
}

impl Type {
    pub fn optional(element: Type) -> Self {
        Type::Optional(Box::new(element))
    }

    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map { key: Box::new(key), value: Box::new(value) }
    }

    pub fn validated(element: Type, validations: Validations) -> Self {
        Type::Validated { element: Box::new(element), validations }
    }

    /// Short shape name for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Type::Primitive(_) => "primitive",
            Type::Object(_) => "object",
            Type::Array(_) => "array",
            Type::Map { .. } => "map",
            Type::Optional(_) => "optional",
            Type::Enum(_) => "enum",
            Type::TypeName(_) => "type name",
            Type::Validated { .. } => "validated",
            Type::Resource(_) => "resource",
            Type::Json => "json",
        }
    }

    /// Definitions this type structurally mentions
    pub fn references(&self) -> BTreeSet<TypeName> {
        let mut result = BTreeSet::new();
        self.collect_references(&mut result);
        result
    }

    fn collect_references(&self, into: &mut BTreeSet<TypeName>) {
        match self {
            Type::Primitive(_) | Type::Enum(_) | Type::Json => {}
            Type::Object(object) => {
                for prop in object.properties() {
                    prop.property_type.collect_references(into);
                }
            }
            Type::Array(element) | Type::Optional(element) => element.collect_references(into),
            Type::Validated { element, .. } => element.collect_references(into),
            Type::Map { key, value } => {
                key.collect_references(into);
                value.collect_references(into);
            }
            Type::TypeName(name) => {
                into.insert(name.clone());
            }
            Type::Resource(resource) => {
                into.insert(resource.spec.clone());
                if let Some(status) = &resource.status {
                    into.insert(status.clone());
                }
            }
        }
    }

    /// Does this type mention `name` anywhere?
    pub fn references_name(&self, name: &TypeName) -> bool {
        match self {
            Type::Primitive(_) | Type::Enum(_) | Type::Json => false,
            Type::Object(object) => object
                .properties()
                .any(|p| p.property_type.references_name(name)),
            Type::Array(element) | Type::Optional(element) => element.references_name(name),
            Type::Validated { element, .. } => element.references_name(name),
            Type::Map { key, value } => key.references_name(name) || value.references_name(name),
            Type::TypeName(own) => own == name,
            Type::Resource(resource) => {
                resource.spec == *name || resource.status.as_ref() == Some(name)
            }
        }
    }

    /// Packages that must be imported to render this type
    pub fn required_packages(&self) -> BTreeSet<PackageReference> {
        let mut packages: BTreeSet<PackageReference> = self
            .references()
            .into_iter()
            .map(|name| name.package)
            .collect();
        if self.mentions_json() {
            packages.insert(PackageReference::json());
        }
        packages
    }

    fn mentions_json(&self) -> bool {
        match self {
            Type::Json => true,
            Type::Primitive(_) | Type::Enum(_) | Type::TypeName(_) | Type::Resource(_) => false,
            Type::Object(object) => object.properties().any(|p| p.property_type.mentions_json()),
            Type::Array(element) | Type::Optional(element) => element.mentions_json(),
            Type::Validated { element, .. } => element.mentions_json(),
            Type::Map { key, value } => key.mentions_json() || value.mentions_json(),
        }
    }

    /// Reference-like types carry mutable backing storage; a direct copy would alias.
    /// Names defined as JSON payloads in `definitions` count as reference-like.
    pub fn requires_copying(&self, definitions: &Definitions) -> bool {
        match self {
            Type::Optional(_) | Type::Array(_) | Type::Map { .. } | Type::Json => true,
            Type::TypeName(name) => definitions.is_json_passthrough(name),
            Type::Validated { element, .. } => element.requires_copying(definitions),
            Type::Primitive(_) | Type::Object(_) | Type::Enum(_) | Type::Resource(_) => false,
        }
    }

    /// Strip a single Optional wrapper, if present
    pub fn without_optional(&self) -> &Type {
        match self {
            Type::Optional(element) => element,
            other => other,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{}", p.go_name()),
            Type::Object(object) => write!(f, "object({} properties)", object.properties.len()),
            Type::Array(element) => write!(f, "[]{}", element),
            Type::Map { key, value } => write!(f, "map[{}]{}", key, value),
            Type::Optional(element) => write!(f, "*{}", element),
            Type::Enum(e) => write!(f, "enum({}, {} options)", e.base.go_name(), e.options.len()),
            Type::TypeName(name) => write!(f, "{}", name),
            Type::Validated { element, .. } => write!(f, "validated({})", element),
            Type::Resource(r) => write!(f, "resource({})", r.spec),
            Type::Json => write!(f, "JSON"),
        }
    }
}

// =============================================================================
// Definitions
// =============================================================================

/// A named type belonging to a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub name: TypeName,
    #[serde(rename = "type")]
    pub definition_type: Type,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Definition {
    pub fn new(name: TypeName, definition_type: Type) -> Self {
        Self { name, definition_type, description: None }
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn definition_type(&self) -> &Type {
        &self.definition_type
    }

    pub fn is_resource(&self) -> bool {
        matches!(self.definition_type, Type::Resource(_))
    }

    pub fn references(&self) -> BTreeSet<TypeName> {
        self.definition_type.references()
    }
}

/// Registry of definitions keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Definition>", into = "Vec<Definition>")]
pub struct Definitions {
    definitions: BTreeMap<TypeName, Definition>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition, returning the one it replaced
    pub fn add(&mut self, definition: Definition) -> Option<Definition> {
        self.definitions.insert(definition.name.clone(), definition)
    }

    pub fn get(&self, name: &TypeName) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions in name order
    pub fn iter(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &TypeName> {
        self.definitions.keys()
    }

    /// Keep only definitions matching the predicate
    pub fn filter(&self, mut keep: impl FnMut(&Definition) -> bool) -> Definitions {
        self.iter().filter(|d| keep(d)).cloned().collect()
    }

    /// Resolve a type to a resource, following TypeName aliases
    pub fn resolve_resource_type<'a>(&'a self, t: &'a Type) -> Option<&'a ResourceType> {
        let mut current = t;
        let mut hops = 0;
        loop {
            match current {
                Type::Resource(resource) => return Some(resource),
                Type::TypeName(name) if hops <= self.definitions.len() => {
                    current = &self.get(name)?.definition_type;
                    hops += 1;
                }
                _ => return None,
            }
        }
    }

    /// Look up an enum definition by name
    pub fn resolve_enum(&self, name: &TypeName) -> Option<&EnumType> {
        match &self.get(name)?.definition_type {
            Type::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Is `name` the JSON marker, or defined as an opaque JSON payload?
    pub fn is_json_passthrough(&self, name: &TypeName) -> bool {
        name.is_json()
            || matches!(self.get(name).map(|d| &d.definition_type), Some(Type::Json))
    }

    /// SHA-256 over the canonical JSON form of the registry
    pub fn bundle_hash(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        for definition in self.iter() {
            hasher.update(serde_json::to_vec(definition)?);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}

impl FromIterator<Definition> for Definitions {
    fn from_iter<I: IntoIterator<Item = Definition>>(iter: I) -> Self {
        let mut definitions = Definitions::new();
        for definition in iter {
            definitions.add(definition);
        }
        definitions
    }
}

impl From<Vec<Definition>> for Definitions {
    fn from(definitions: Vec<Definition>) -> Self {
        definitions.into_iter().collect()
    }
}

impl From<Definitions> for Vec<Definition> {
    fn from(definitions: Definitions) -> Self {
        definitions.definitions.into_values().collect()
    }
}

impl<'a> IntoIterator for &'a Definitions {
    type Item = &'a Definition;
    type IntoIter = std::collections::btree_map::Values<'a, TypeName, Definition>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.values()
    }
}
