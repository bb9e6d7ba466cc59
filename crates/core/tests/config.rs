//! `.qomify.toml` loading against real directories.

use qomify_core::{load_qomify_config, MigrateConfig, CONFIG_FILE};

#[test]
fn test_missing_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(load_qomify_config(dir.path()), MigrateConfig::default());
}

#[test]
fn test_config_file_overrides_keys() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        "legacy_type = \"PCIDeviceInfo\"\nsubclass_register_fn = \"pci_qdev_register\"\nentry_indent = 12\n",
    )
    .unwrap();

    let config = load_qomify_config(dir.path());
    assert_eq!(config.legacy_type, "PCIDeviceInfo");
    assert_eq!(config.subclass_register_fn, "pci_qdev_register");
    assert_eq!(config.entry_indent, 12);
    assert_eq!(config.descriptor_type, "TypeInfo");
}

#[test]
fn test_malformed_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE), "legacy_type = [").unwrap();
    assert_eq!(load_qomify_config(dir.path()), MigrateConfig::default());
}

#[test]
fn test_explicit_config_errors_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");

    let err = MigrateConfig::from_file(&path).unwrap_err();
    assert_eq!(err.kind(), "config");

    std::fs::write(&path, "class_var = \"not valid\"").unwrap();
    let err = MigrateConfig::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("'class_var' must be a C identifier"), "{err}");
}
