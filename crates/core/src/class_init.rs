//! Class initializer synthesis.
//!
//! A block that names a `class_init` gets that hand-written function merged:
//! it keeps its body and gains the class-view declaration plus one assignment per
//! class-level field. Otherwise a minimal initializer is fabricated.

use crate::block::read_function_body;
use crate::emit::OutputBuffer;
use crate::error::{MigrateError, Result};
use crate::types::{
    ClassInitializer, DeclarationBlock, ExistingInitializer, FieldValue, LegacyField, MigrateConfig,
    PropertiesArray,
};
use regex::Regex;
use tracing::debug;

const DEFAULT_CLASS_PARAM: &str = "klass";

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Decide which initializer the block will use, locating it if it already exists.
pub fn resolve_initializer(lines: &[String], block: &DeclarationBlock, config: &MigrateConfig) -> Result<ClassInitializer> {
    match block.fields.scalar(LegacyField::ClassInit) {
        Some(name) => Ok(ClassInitializer::Existing(find_existing(lines, block, name, config)?)),
        None => Ok(ClassInitializer::Synthesized { name: block.class_init_name() }),
    }
}

/// Line holding the `{` of the declaration whose signature starts at `signature`,
/// or `None` when the declaration reaches `;` first and is only a prototype.
fn opening_brace(lines: &[String], signature: usize) -> Result<Option<usize>> {
    for (i, line) in lines.iter().enumerate().skip(signature) {
        let line = line.trim_end();
        if line.ends_with('{') {
            return Ok(Some(i));
        }
        if line.ends_with(';') {
            return Ok(None);
        }
    }
    Err(MigrateError::syntax(signature, "expected '{' after initializer signature", &lines[signature]))
}

/// Locate the definition of `name` above the block. Prototypes, including ones
/// whose parameters wrap, are ignored and the definition must be unique.
fn find_existing(
    lines: &[String],
    block: &DeclarationBlock,
    name: &str,
    config: &MigrateConfig,
) -> Result<ExistingInitializer> {
    let sig_re = Regex::new(&format!(r"^static\s+void\s+{}\s*\(", regex::escape(name)))?;
    let above = &lines[..block.start];

    // Nearest first; two are enough to detect a duplicate.
    let mut definitions = Vec::with_capacity(2);
    for i in (0..block.start).rev().filter(|&i| sig_re.is_match(&lines[i])) {
        if let Some(open) = opening_brace(above, i)? {
            definitions.push((i, open));
            if definitions.len() == 2 {
                break;
            }
        }
    }

    let (signature, open) = match definitions.as_slice() {
        [] => {
            return Err(MigrateError::InitializerNotFound {
                name: name.to_string(),
                block: block.name.clone(),
                line: block.start + 1,
            })
        }
        [nearest] => *nearest,
        [nearest, earlier, ..] => {
            return Err(MigrateError::DuplicateInitializer {
                name: name.to_string(),
                first: earlier.0 + 1,
                second: nearest.0 + 1,
            })
        }
    };

    let body = read_function_body(above, open)?;
    let close = body.next - 1;
    let mut relocated_end = body.next;
    if relocated_end < block.start && lines[relocated_end].trim().is_empty() {
        relocated_end += 1;
    }

    let class_param = class_param(&lines[signature..=open].join(" "));
    let view = class_view_decl(config, &class_param);
    let has_class_view = lines[body.body.clone()].iter().any(|l| l.trim() == view.trim());

    debug!(
        initializer = name,
        signature = signature + 1,
        close = close + 1,
        class_param = class_param.as_str(),
        "Located existing class initializer"
    );

    Ok(ExistingInitializer {
        name: name.to_string(),
        signature,
        open,
        body: body.body,
        close,
        relocated: signature..relocated_end,
        class_param,
        has_class_view,
    })
}

/// Name of the first parameter, which carries the generic class handle.
fn class_param(signature: &str) -> String {
    let param_re = Regex::new(r"\(\s*(?:const\s+)?\w+\s*\*\s*(\w+)");
    param_re
        .ok()
        .and_then(|re| re.captures(signature).map(|c| c[1].to_string()))
        .unwrap_or_else(|| DEFAULT_CLASS_PARAM.to_string())
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

pub fn class_view_decl(config: &MigrateConfig, class_param: &str) -> String {
    format!(
        "    {} *{} = {}({});",
        config.class_type, config.class_var, config.class_cast, class_param
    )
}

/// One `dc->field = value;` line per class-level field present on the block.
pub fn assignments(block: &DeclarationBlock, properties: Option<&PropertiesArray>, config: &MigrateConfig) -> Vec<String> {
    LegacyField::CLASS_FIELDS
        .iter()
        .filter_map(|&key| {
            let value = match (block.fields.get(key)?, properties) {
                (FieldValue::Scalar(v), _) => v.clone(),
                (FieldValue::List(_), Some(array)) => array.name.clone(),
                (FieldValue::List(_), None) => block.properties_name(),
            };
            Some(format!("    {}->{} = {};", config.class_var, key.key(), value))
        })
        .collect()
}

/// Emit the initializer's final text followed by a blank separator line.
pub fn emit_initializer(
    out: &mut OutputBuffer,
    lines: &[String],
    initializer: &ClassInitializer,
    block: &DeclarationBlock,
    properties: Option<&PropertiesArray>,
    config: &MigrateConfig,
) {
    let assigned = assignments(block, properties, config);
    match initializer {
        ClassInitializer::Existing(existing) => {
            out.copy(&lines[existing.signature..=existing.open]);
            if !existing.has_class_view {
                out.push(class_view_decl(config, &existing.class_param));
            }
            out.copy(&lines[existing.body.clone()]);
            for line in assigned {
                out.push(line);
            }
            out.copy(&lines[existing.close..=existing.close]);
        }
        ClassInitializer::Synthesized { name } => {
            out.push(format!("static void {name}(ObjectClass *{DEFAULT_CLASS_PARAM}, void *data)"));
            out.push("{");
            out.push(class_view_decl(config, DEFAULT_CLASS_PARAM));
            for line in assigned {
                out.push(line);
            }
            out.push("}");
        }
    }
    out.push("");
}
