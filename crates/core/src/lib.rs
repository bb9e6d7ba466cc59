//! qomify: rewrite legacy `DeviceInfo` declarations into `TypeInfo` + class initializer pairs.
//!
//! The engine is a line-oriented source-to-source transformer. It recognizes a small
//! set of fixed textual shapes and rewrites them. Everything else passes through
//! byte-identical, and anything that looks almost-but-not-quite right is a hard error.
//!
//! # Modules
//!
//! - [`engine`]: Block discovery, planning and the top-level [`migrate`] entry point
//! - [`block`]: Balanced sub-block reading and declaration header recognition
//! - [`fields`]: Field extraction, including inline property lists
//! - [`registration`]: Registration-site lookup and parent type resolution
//! - [`class_init`]: Class initializer merging and synthesis
//! - [`props`]: Properties array lifting
//! - [`emit`]: Output buffer and line-faithful re-emission
//! - [`types`]: Data model, config and reports
//! - [`error`]: Error taxonomy

pub mod block;
pub mod class_init;
pub mod emit;
pub mod engine;
pub mod error;
pub mod fields;
pub mod props;
pub mod registration;
pub mod types;

use std::path::Path;

use tracing::{debug, warn};

pub use engine::migrate;
pub use error::MigrateError;
pub use types::*;

// ---------------------------------------------------------------------------
// .qomify.toml config loading
// ---------------------------------------------------------------------------

/// Config file looked up in the project root.
pub const CONFIG_FILE: &str = ".qomify.toml";

/// Known keys in `.qomify.toml` for config validation.
const KNOWN_CONFIG_KEYS: &[&str] = &[
    "legacy_type",
    "descriptor_type",
    "property_type",
    "fixed_register_fn",
    "subclass_register_fn",
    "fixed_parent",
    "register_primitive",
    "alias_primitive",
    "class_type",
    "class_cast",
    "class_var",
    "entry_indent",
];

/// Simple Levenshtein edit distance for typo suggestions.
fn edit_distance(a: &str, b: &str) -> usize {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl MigrateConfig {
    /// Load an explicitly requested config file. Unlike [`load_qomify_config`],
    /// a missing or malformed file is an error.
    pub fn from_file(path: &Path) -> Result<Self, MigrateError> {
        let origin = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MigrateError::Config { path: origin.clone(), message: e.to_string() })?;
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| MigrateError::Config { path: origin.clone(), message: e.to_string() })?;
        Self::from_table(&table, &origin)
    }

    /// Overlay the keys of `table` onto the defaults. Unknown keys only warn.
    pub fn from_table(table: &toml::Table, origin: &str) -> Result<Self, MigrateError> {
        let mut config = MigrateConfig::default();
        let invalid = |key: &str, message: &str| MigrateError::Config {
            path: origin.to_string(),
            message: format!("'{key}' {message}"),
        };

        for (key, value) in table {
            let key = key.as_str();
            if !KNOWN_CONFIG_KEYS.contains(&key) {
                let suggestion = KNOWN_CONFIG_KEYS.iter().min_by_key(|k| edit_distance(key, k));
                match suggestion {
                    Some(s) if edit_distance(key, s) <= 3 => warn!(
                        key,
                        suggestion = *s,
                        "Unknown key in {origin}, did you mean '{s}'?"
                    ),
                    _ => warn!(
                        key,
                        "Unknown key in {origin} (known keys: {})",
                        KNOWN_CONFIG_KEYS.join(", ")
                    ),
                }
                continue;
            }

            if key == "entry_indent" {
                config.entry_indent = value
                    .as_integer()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| invalid(key, "must be a non-negative integer"))?;
                continue;
            }

            let text = value
                .as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| invalid(key, "must be a non-empty string"))?
                .to_string();
            // The parent is an expression; everything else is spliced in as a name.
            if key != "fixed_parent" && !is_identifier(&text) {
                return Err(invalid(key, "must be a C identifier"));
            }

            let slot = match key {
                "legacy_type" => &mut config.legacy_type,
                "descriptor_type" => &mut config.descriptor_type,
                "property_type" => &mut config.property_type,
                "fixed_register_fn" => &mut config.fixed_register_fn,
                "subclass_register_fn" => &mut config.subclass_register_fn,
                "fixed_parent" => &mut config.fixed_parent,
                "register_primitive" => &mut config.register_primitive,
                "alias_primitive" => &mut config.alias_primitive,
                "class_type" => &mut config.class_type,
                "class_cast" => &mut config.class_cast,
                _ => &mut config.class_var,
            };
            *slot = text;
        }

        Ok(config)
    }
}

/// Load the migration config from `.qomify.toml` in the given project root.
///
/// Returns defaults if the file doesn't exist. A file that can't be read or
/// parsed also yields defaults, with a warning.
pub fn load_qomify_config(project_root: &Path) -> MigrateConfig {
    let config_path = project_root.join(CONFIG_FILE);
    if !config_path.exists() {
        return MigrateConfig::default();
    }

    debug!(path = %config_path.display(), "Loading {CONFIG_FILE}");
    match MigrateConfig::from_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Ignoring {CONFIG_FILE}, using defaults");
            MigrateConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("class_var", "class_var"), 0);
        assert_eq!(edit_distance("clas_var", "class_var"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("DeviceInfo"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("a-b"));
    }

    #[test]
    fn test_from_table_overrides_defaults() {
        let table: toml::Table = "fixed_parent = \"TYPE_PCI_DEVICE\"\nentry_indent = 4\nclass_var = \"k\"\nbogus = 1"
            .parse()
            .unwrap();
        let config = MigrateConfig::from_table(&table, "test").unwrap();
        assert_eq!(config.fixed_parent, "TYPE_PCI_DEVICE");
        assert_eq!(config.entry_indent, 4);
        assert_eq!(config.class_var, "k");
        assert_eq!(config.legacy_type, "DeviceInfo");
    }

    #[test]
    fn test_from_table_rejects_bad_values() {
        for src in ["entry_indent = -1", "class_var = 3", "legacy_type = \"Device Info\"", "class_cast = \"\""] {
            let table: toml::Table = src.parse().unwrap();
            let err = MigrateConfig::from_table(&table, "test").unwrap_err();
            assert_eq!(err.kind(), "config", "{src}");
        }
    }
}
