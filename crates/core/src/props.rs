//! Lift an inline property list into a standalone array declaration.

use crate::emit::OutputBuffer;
use crate::types::{DeclarationBlock, FieldValue, LegacyField, MigrateConfig, PropertiesArray};

/// The block's property list as an array, if `props` held a list rather than a reference.
pub fn lift_properties(block: &DeclarationBlock) -> Option<PropertiesArray> {
    match block.fields.get(LegacyField::Props)? {
        FieldValue::List(entries) => {
            Some(PropertiesArray { name: block.properties_name(), entries: entries.clone() })
        }
        FieldValue::Scalar(_) => None,
    }
}

pub fn emit_properties(out: &mut OutputBuffer, array: &PropertiesArray, config: &MigrateConfig) {
    out.push(format!("static {} {}[] = {{", config.property_type, array.name));
    for entry in &array.entries {
        let last = entry.lines.len().saturating_sub(1);
        for (i, line) in entry.lines.iter().enumerate() {
            let sep = if i == last { "," } else { "" };
            out.push(format!("    {line}{sep}"));
        }
    }
    out.push("};");
    out.push("");
}
