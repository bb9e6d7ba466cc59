//! Re-emission: stitch untouched lines and the new declarations back together.
//!
//! Every block is planned against the untouched input, then the output is built
//! in one pass over it. Each input line is kept, dropped or replaced:
//! - a relocated class initializer is dropped from its old position
//! - a block header is replaced by the properties array (if any), the class
//!   initializer and the new type descriptor; the rest of the block is dropped
//! - a registration call is replaced by the new call (plus alias registration)
//!
//! Generated lines reuse the line ending of the line they replace, so CRLF
//! sources stay CRLF.

use crate::class_init::emit_initializer;
use crate::engine::BlockPlan;
use crate::props::emit_properties;
use crate::types::{DeclarationBlock, LegacyField, MigrateConfig, RegistrationSite};

/// Append-only line sink. Lines copied from the input are kept verbatim;
/// generated lines get the current line ending appended.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    lines: Vec<String>,
    eol: &'static str,
}

impl OutputBuffer {
    pub fn with_capacity(n: usize) -> Self {
        Self { lines: Vec::with_capacity(n), eol: "" }
    }

    /// Suffix for generated lines: `"\r"` for CRLF sources, empty otherwise.
    pub fn set_line_ending(&mut self, eol: &'static str) {
        self.eol = eol;
    }

    /// Append a generated line.
    pub fn push(&mut self, line: impl Into<String>) {
        let mut line = line.into();
        line.push_str(self.eol);
        self.lines.push(line);
    }

    /// Append input lines unchanged.
    pub fn copy(&mut self, lines: &[String]) {
        self.lines.extend_from_slice(lines);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

fn line_ending(line: &str) -> &'static str {
    if line.ends_with('\r') {
        "\r"
    } else {
        ""
    }
}

/// Emit the type descriptor. `name` and `size` are checked by the planner.
pub fn emit_descriptor(
    out: &mut OutputBuffer,
    block: &DeclarationBlock,
    site: &RegistrationSite,
    class_init: &str,
    config: &MigrateConfig,
) {
    let field = |key| block.fields.scalar(key).unwrap_or_default();
    out.push(format!("static {} {} = {{", config.descriptor_type, block.name));
    out.push(format!("  .name          = {},", field(LegacyField::Name)));
    out.push(format!("  .parent        = {},", site.parent));
    out.push(format!("  .instance_size = {},", field(LegacyField::Size)));
    out.push(format!("  .class_init    = {class_init},"));
    out.push("};");
}

pub fn emit_registration(out: &mut OutputBuffer, block: &DeclarationBlock, site: &RegistrationSite, config: &MigrateConfig) {
    out.push(format!("{}{}(&{});", site.indent, config.register_primitive, block.name));
    if let Some(alias) = &site.alias {
        out.push(format!("{}{}(&{}, {});", site.indent, config.alias_primitive, block.name, alias));
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LineFate {
    Keep,
    Drop,
    /// Header of the plan at this index.
    Declaration(usize),
    /// Registration call of the plan at this index.
    Registration(usize),
}

/// Rebuild the input with every planned block rewritten.
///
/// Plans must claim disjoint lines; the engine checks this before calling.
pub fn reemit(lines: &[String], plans: &[BlockPlan], config: &MigrateConfig) -> Vec<String> {
    let mut fate = vec![LineFate::Keep; lines.len()];
    for (n, plan) in plans.iter().enumerate() {
        let relocated = plan.initializer.relocated().unwrap_or(0..0);
        for i in relocated.chain(plan.block.start..plan.block.end) {
            fate[i] = LineFate::Drop;
        }
        fate[plan.block.start] = LineFate::Declaration(n);
        fate[plan.site.call_index] = LineFate::Registration(n);
    }

    let mut out = OutputBuffer::with_capacity(lines.len() + 16 * plans.len());
    for (i, line) in lines.iter().enumerate() {
        match fate[i] {
            LineFate::Keep => out.copy(&lines[i..=i]),
            LineFate::Drop => {}
            LineFate::Declaration(n) => {
                let plan = &plans[n];
                out.set_line_ending(line_ending(line));
                if let Some(array) = &plan.properties {
                    emit_properties(&mut out, array, config);
                }
                emit_initializer(&mut out, lines, &plan.initializer, &plan.block, plan.properties.as_ref(), config);
                emit_descriptor(&mut out, &plan.block, &plan.site, plan.initializer.name(), config);
            }
            LineFate::Registration(n) => {
                out.set_line_ending(line_ending(line));
                emit_registration(&mut out, &plans[n].block, &plans[n].site, config);
            }
        }
    }

    out.into_lines()
}
