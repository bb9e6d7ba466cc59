//! Registration-site lookup: find the call that activates a declaration block
//! and work out the parent type it should be registered under.

use crate::error::{MigrateError, Result};
use crate::types::{DeclarationBlock, LegacyField, MigrateConfig, RegistrationForm, RegistrationSite};
use tracing::debug;

/// Arguments between the opening `(` at `open` and its matching `)`.
fn call_arguments(line: &str, open: usize) -> Option<&str> {
    let mut depth = 0;
    for (i, c) in line[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&line[open + 1..open + i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn call_form(trimmed: &str, config: &MigrateConfig) -> Option<RegistrationForm> {
    let called = |name: &str| {
        trimmed.strip_prefix(name).is_some_and(|rest| rest.trim_start().starts_with('('))
    };
    if called(&config.fixed_register_fn) {
        Some(RegistrationForm::Fixed)
    } else if called(&config.subclass_register_fn) {
        Some(RegistrationForm::Subclass)
    } else {
        None
    }
}

/// Scan forward from the end of `block` for the call that registers it.
///
/// Calls naming some other record are skipped. The parent is `config.fixed_parent`
/// for the single-record form and the call's second argument for the subclass form.
pub fn locate_registration(
    lines: &[String],
    block: &DeclarationBlock,
    config: &MigrateConfig,
) -> Result<RegistrationSite> {
    for (i, line) in lines.iter().enumerate().skip(block.end) {
        let trimmed = line.trim_start();
        let Some(form) = call_form(trimmed, config) else {
            continue;
        };

        let indent = &line[..line.len() - trimmed.len()];
        let open = indent.len() + trimmed.find('(').unwrap_or(0);
        let args = call_arguments(line, open)
            .ok_or_else(|| MigrateError::syntax(i, "registration call must close on one line", line))?;

        let (target, rest) = match args.split_once(',') {
            Some((target, rest)) => (target, Some(rest)),
            None => (args, None),
        };
        let target = target.trim();
        let target = target.strip_prefix('&').unwrap_or(target).trim();
        if target != block.name {
            debug!(
                line = i + 1,
                registered = target,
                block = block.name.as_str(),
                "Skipping registration of another record"
            );
            continue;
        }

        let (parent, alias) = match form {
            RegistrationForm::Fixed => (config.fixed_parent.clone(), None),
            RegistrationForm::Subclass => {
                let parent = rest.map(str::trim).filter(|p| !p.is_empty()).ok_or_else(|| {
                    MigrateError::syntax(i, "subclass registration must name a parent type", line)
                })?;
                let alias = block.fields.scalar(LegacyField::Alias).map(|a| a.to_string());
                (parent.to_string(), alias)
            }
        };

        debug!(
            block = block.name.as_str(),
            line = i + 1,
            form = form.label(),
            parent = parent.as_str(),
            "Located registration site"
        );
        return Ok(RegistrationSite { call_index: i, form, parent, indent: indent.to_string(), alias });
    }

    Err(MigrateError::RegistrationNotFound { block: block.name.clone(), line: block.start + 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, FieldValue, Fields};

    fn lines(text: &str) -> Vec<String> {
        text.split('\n').map(|l| l.to_string()).collect()
    }

    fn block(name: &str, alias: Option<&str>) -> DeclarationBlock {
        let mut fields = Fields::default();
        if let Some(a) = alias {
            fields
                .insert(Field { key: LegacyField::Alias, value: FieldValue::Scalar(a.into()), line: 1 })
                .unwrap();
        }
        DeclarationBlock { name: name.to_string(), start: 0, end: 1, fields }
    }

    #[test]
    fn test_fixed_form_uses_configured_parent() {
        let src = lines("};\nstatic void reg(void)\n{\n    isa_qdev_register(&serial_isa_info);\n}");
        let site = locate_registration(&src, &block("serial_isa_info", None), &MigrateConfig::default())
            .unwrap();
        assert_eq!(site.call_index, 3);
        assert_eq!(site.form, RegistrationForm::Fixed);
        assert_eq!(site.parent, "TYPE_ISA_DEVICE");
        assert_eq!(site.indent, "    ");
        assert_eq!(site.alias, None);
    }

    #[test]
    fn test_subclass_form_reads_parent_and_alias() {
        let src = lines("};\n    qdev_register_subclass(&virtio_net_info, TYPE_PCI_DEVICE);");
        let site = locate_registration(
            &src,
            &block("virtio_net_info", Some("\"virtio-net\"")),
            &MigrateConfig::default(),
        )
        .unwrap();
        assert_eq!(site.form, RegistrationForm::Subclass);
        assert_eq!(site.parent, "TYPE_PCI_DEVICE");
        assert_eq!(site.alias.as_deref(), Some("\"virtio-net\""));
    }

    #[test]
    fn test_skips_calls_for_other_records() {
        let src = lines(
            "};\n    qdev_register_subclass(&other_info, TYPE_X);\n    qdev_register_subclass(mine_info, type_of(1, 2));",
        );
        let site = locate_registration(&src, &block("mine_info", None), &MigrateConfig::default()).unwrap();
        assert_eq!(site.call_index, 2);
        assert_eq!(site.parent, "type_of(1, 2)");
    }

    #[test]
    fn test_not_found() {
        let src = lines("};\n    isa_qdev_register(&other_info);\n    isa_qdev_register_all();");
        let err = locate_registration(&src, &block("mine_info", None), &MigrateConfig::default())
            .unwrap_err();
        assert!(matches!(err, MigrateError::RegistrationNotFound { ref block, line: 1 } if block == "mine_info"));
    }

    #[test]
    fn test_subclass_without_parent_rejected() {
        let src = lines("};\n    qdev_register_subclass(&mine_info);");
        let err = locate_registration(&src, &block("mine_info", None), &MigrateConfig::default())
            .unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedSyntax { line: 2, .. }), "{err}");
    }
}
