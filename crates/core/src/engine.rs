//! The migration driver: find each legacy block, plan its rewrite, re-emit.
//!
//! Every block is planned against the untouched input, so line numbers in
//! errors and reports always refer to the user's file. Output is produced only
//! once all plans resolve.

use crate::block::{read_block, HeaderMatcher};
use crate::class_init::resolve_initializer;
use crate::emit::reemit;
use crate::error::{MigrateError, Result};
use crate::fields::extract_fields;
use crate::props::lift_properties;
use crate::registration::locate_registration;
use crate::types::*;
use std::ops::Range;
use tracing::{debug, info};

/// Everything needed to rewrite one block.
#[derive(Debug, Clone)]
pub struct BlockPlan {
    pub block: DeclarationBlock,
    pub site: RegistrationSite,
    pub initializer: ClassInitializer,
    pub properties: Option<PropertiesArray>,
}

impl BlockPlan {
    fn report(&self) -> BlockReport {
        BlockReport {
            name: self.block.name.clone(),
            start_line: self.block.start + 1,
            end_line: self.block.end,
            fields: self.block.fields.keys().collect(),
            form: self.site.form,
            parent: self.site.parent.clone(),
            call_line: self.site.call_index + 1,
            class_init: self.initializer.name().to_string(),
            initializer: self.initializer.kind(),
            properties: self.properties.as_ref().map_or(0, |p| p.entries.len()),
        }
    }
}

/// Parse the block opening at `start` and resolve everything its rewrite depends on.
pub fn plan_block(
    lines: &[String],
    start: usize,
    headers: &HeaderMatcher,
    config: &MigrateConfig,
) -> Result<BlockPlan> {
    let name = headers.name(lines, start)?;
    let extent = read_block(lines, start, &["};"])?;
    let fields = extract_fields(lines, extent.body, config.entry_indent)?;

    for required in [LegacyField::Name, LegacyField::Size] {
        if fields.scalar(required).is_none() {
            return Err(MigrateError::MissingField { block: name, field: required.key(), line: start + 1 });
        }
    }

    let block = DeclarationBlock { name, start, end: extent.next, fields };
    debug!(
        block = block.name.as_str(),
        start = block.start + 1,
        end = block.end,
        fields = block.fields.len(),
        "Parsed declaration block"
    );

    let site = locate_registration(lines, &block, config)?;
    let initializer = resolve_initializer(lines, &block, config)?;
    let properties = lift_properties(&block);

    Ok(BlockPlan { block, site, initializer, properties })
}

/// Lines each plan rewrites must not overlap, e.g. two blocks naming the same
/// class initializer.
fn check_disjoint(lines: &[String], plans: &[BlockPlan]) -> Result<()> {
    let mut claimed: Vec<(Range<usize>, &str)> = Vec::with_capacity(plans.len() * 3);
    for plan in plans {
        let name = plan.block.name.as_str();
        claimed.push((plan.block.start..plan.block.end, name));
        claimed.push((plan.site.call_index..plan.site.call_index + 1, name));
        if let Some(relocated) = plan.initializer.relocated() {
            claimed.push((relocated, name));
        }
    }
    claimed.sort_by_key(|(range, _)| range.start);

    for pair in claimed.windows(2) {
        let ((first, a), (second, b)) = (&pair[0], &pair[1]);
        if second.start < first.end {
            return Err(MigrateError::syntax(
                second.start,
                format!("line is rewritten for both '{a}' and '{b}'"),
                &lines[second.start],
            ));
        }
    }
    Ok(())
}

/// Rewrite every legacy declaration block in `input`.
///
/// Input without any block comes back byte-identical. Any failure aborts the
/// whole input and no output is produced.
pub fn migrate(input: &str, config: &MigrateConfig) -> Result<Migration> {
    let headers = HeaderMatcher::new(&config.legacy_type)?;
    let store = LineStore::from_text(input);
    let lines = store.lines();

    let mut plans = Vec::new();
    let mut cursor = 0;
    while let Some(start) = headers.find(lines, cursor) {
        let plan = plan_block(lines, start, &headers, config)?;
        cursor = plan.block.end;
        plans.push(plan);
    }
    if plans.is_empty() {
        return Ok(Migration { output: input.to_string(), report: MigrationReport::default() });
    }
    check_disjoint(lines, &plans)?;

    let output = reemit(lines, &plans, config);
    for plan in &plans {
        info!(
            block = plan.block.name.as_str(),
            parent = plan.site.parent.as_str(),
            class_init = plan.initializer.name(),
            initializer = plan.initializer.kind().label(),
            "Migrated declaration block"
        );
    }
    let report = MigrationReport { blocks: plans.iter().map(BlockPlan::report).collect() };

    Ok(Migration { output: LineStore::from_lines(output).to_text(), report })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untouched_input_is_identical() {
        let input = "#include \"hw.h\"\n\nstatic TypeInfo done_info = {\n  .name = \"done\",\n};\n";
        let out = migrate(input, &MigrateConfig::default()).unwrap();
        assert_eq!(out.output, input);
        assert!(out.report.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(migrate("", &MigrateConfig::default()).unwrap().output, "");
    }

    #[test]
    fn test_missing_size_field() {
        let input = "static DeviceInfo a_info = {\n    .name = \"a\",\n};\n    isa_qdev_register(&a_info);\n";
        let err = migrate(input, &MigrateConfig::default()).unwrap_err();
        assert!(matches!(err, MigrateError::MissingField { field: "size", line: 1, .. }), "{err}");
    }

    #[test]
    fn test_report_records_block() {
        let input = "static DeviceInfo a_info = {\n    .name = \"a\",\n    .size = 4,\n    .no_user = 1,\n};\n\n    isa_qdev_register(&a_info);";
        let out = migrate(input, &MigrateConfig::default()).unwrap();
        let block = &out.report.blocks[0];
        assert_eq!(block.name, "a_info");
        assert_eq!((block.start_line, block.end_line, block.call_line), (1, 5, 7));
        assert_eq!(block.fields, vec![LegacyField::Name, LegacyField::Size, LegacyField::NoUser]);
        assert_eq!(block.initializer, InitializerKind::Synthesized);
        assert_eq!(block.class_init, "a_class_init");
        assert_eq!(block.properties, 0);
    }

    #[test]
    fn test_shared_initializer_rejected() {
        let input = "static void f(ObjectClass *k, void *d)\n{\n}\n\nstatic DeviceInfo a_info = {\n    .name = \"a\",\n    .size = 4,\n    .class_init = f,\n};\nstatic DeviceInfo b_info = {\n    .name = \"b\",\n    .size = 4,\n    .class_init = f,\n};\n    isa_qdev_register(&a_info);\n    isa_qdev_register(&b_info);";
        let err = migrate(input, &MigrateConfig::default()).unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedSyntax { line: 1, .. }), "{err}");
        assert!(err.to_string().contains("'a_info' and 'b_info'"), "{err}");
    }
}
