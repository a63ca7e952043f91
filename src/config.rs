//! Configuration management for the generator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (armgen.toml)
//! - Environment variables (ARMGEN__*)
//!
//! ## Example config file (armgen.toml):
//! ```toml
//! [naming]
//! arm_suffix = "Arm"
//! method_name = "ToArm"
//! acronyms = ["ID", "URL", "API"]
//!
//! [output]
//! file_suffix = "_types"
//! test_file_suffix = "_test"
//! generate_tests = true
//! group_domain = "infra.azure.com"
//! format = "pretty"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::model::IdentifierFactory;

/// Main configuration for the generator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Naming conventions for generated code
    #[serde(default)]
    pub naming: NamingConfig,

    /// Output layout settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Naming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Suffix turning a kube type name into its ARM counterpart
    #[serde(default = "default_arm_suffix")]
    pub arm_suffix: String,

    /// Destination property filled from the name parameter
    #[serde(default = "default_name_property")]
    pub name_property: String,

    /// Destination property filled from the discriminator enum
    #[serde(default = "default_type_property")]
    pub type_property: String,

    /// Name of the full resource path parameter
    #[serde(default = "default_name_parameter")]
    pub name_parameter: String,

    /// Local holding the ARM value being built
    #[serde(default = "default_result_ident")]
    pub result_ident: String,

    /// Generated conversion method name
    #[serde(default = "default_method_name")]
    pub method_name: String,

    /// Acronyms kept upper case in identifiers
    #[serde(default = "default_acronyms")]
    pub acronyms: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Appended to every definition file name
    #[serde(default = "default_file_suffix")]
    pub file_suffix: String,

    /// Appended to a definition file's name for its test file
    #[serde(default = "default_test_file_suffix")]
    pub test_file_suffix: String,

    /// Emit a test file next to each definition file
    #[serde(default = "default_generate_tests")]
    pub generate_tests: bool,

    /// File holding package registration scaffolding
    #[serde(default = "default_group_version_file")]
    pub group_version_file: String,

    /// Domain appended to API group names
    #[serde(default = "default_group_domain")]
    pub group_domain: String,

    /// JSON output format
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_arm_suffix() -> String {
    "Arm".to_string()
}

fn default_name_property() -> String {
    "Name".to_string()
}

fn default_type_property() -> String {
    "Type".to_string()
}

fn default_name_parameter() -> String {
    "name".to_string()
}

fn default_result_ident() -> String {
    "result".to_string()
}

fn default_method_name() -> String {
    "ToArm".to_string()
}

fn default_acronyms() -> Vec<String> {
    ["ID", "URL", "URI", "API", "JSON", "HTTP", "IP"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_file_suffix() -> String {
    "_types".to_string()
}

fn default_test_file_suffix() -> String {
    "_test".to_string()
}

fn default_generate_tests() -> bool {
    true
}

fn default_group_version_file() -> String {
    "groupversion_info".to_string()
}

fn default_group_domain() -> String {
    "infra.azure.com".to_string()
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            arm_suffix: default_arm_suffix(),
            name_property: default_name_property(),
            type_property: default_type_property(),
            name_parameter: default_name_parameter(),
            result_ident: default_result_ident(),
            method_name: default_method_name(),
            acronyms: default_acronyms(),
        }
    }
}

impl NamingConfig {
    pub fn identifier_factory(&self) -> IdentifierFactory {
        IdentifierFactory::new(self.acronyms.iter().cloned())
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_suffix: default_file_suffix(),
            test_file_suffix: default_test_file_suffix(),
            generate_tests: default_generate_tests(),
            group_version_file: default_group_version_file(),
            group_domain: default_group_domain(),
            format: OutputFormat::Pretty,
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["armgen.toml", ".armgen.toml", "config/armgen.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "armgen", "armgen") {
            let xdg_config: PathBuf = config_dir.config_dir().join("armgen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // ARMGEN__NAMING__ARM_SUFFIX=...
        builder = builder.add_source(
            Environment::with_prefix("ARMGEN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert_eq!(config.naming.arm_suffix, "Arm");
        assert_eq!(config.naming.method_name, "ToArm");
        assert_eq!(config.output.group_version_file, "groupversion_info");
        assert_eq!(config.output.test_file_suffix, "_test");
        assert!(config.output.generate_tests);
    }

    #[test]
    fn test_serialize_config() {
        let config = GeneratorConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[naming]"));
        assert!(toml_str.contains("[output]"));
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[naming]\narm_suffix = \"ARM\"\n\n[output]\nformat = \"compact\"\n",
        )
        .unwrap();

        let config = GeneratorConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.naming.arm_suffix, "ARM");
        assert_eq!(config.naming.method_name, "ToArm");
        assert_eq!(config.output.format, OutputFormat::Compact);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = GeneratorConfig::default();
        config.output.group_domain = "example.com".to_string();
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = GeneratorConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.output.group_domain, "example.com");
    }
}
