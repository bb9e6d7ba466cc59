use serde::Serialize;
use std::ops::Range;

// ---------------------------------------------------------------------------
// Migration config
// ---------------------------------------------------------------------------

/// Names of the legacy and new schema, and of the calls that register them.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrateConfig {
    /// Record type opening a legacy declaration block.
    pub legacy_type: String,
    /// Record type of the emitted type descriptor.
    pub descriptor_type: String,
    /// Element type of a lifted properties array.
    pub property_type: String,
    /// Single-record registration call; the parent comes from `fixed_parent`.
    pub fixed_register_fn: String,
    /// Subclass registration call; the parent is its second argument.
    pub subclass_register_fn: String,
    pub fixed_parent: String,
    pub register_primitive: String,
    pub alias_primitive: String,
    /// Richer class view assigned to in the class initializer.
    pub class_type: String,
    pub class_cast: String,
    pub class_var: String,
    /// Leading blanks stripped from each property-list entry.
    pub entry_indent: usize,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            legacy_type: "DeviceInfo".to_string(),
            descriptor_type: "TypeInfo".to_string(),
            property_type: "Property".to_string(),
            fixed_register_fn: "isa_qdev_register".to_string(),
            subclass_register_fn: "qdev_register_subclass".to_string(),
            fixed_parent: "TYPE_ISA_DEVICE".to_string(),
            register_primitive: "type_register_static".to_string(),
            alias_primitive: "type_register_static_alias".to_string(),
            class_type: "DeviceClass".to_string(),
            class_cast: "DEVICE_CLASS".to_string(),
            class_var: "dc".to_string(),
            entry_indent: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// Line store
// ---------------------------------------------------------------------------

/// The whole input as lines. Splitting and joining on `\n` round-trips exactly,
/// including a trailing newline (which shows up as a final empty line).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineStore {
    lines: Vec<String>,
}

impl LineStore {
    pub fn from_text(text: &str) -> Self {
        Self { lines: text.split('\n').map(|l| l.to_string()).collect() }
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Legacy record fields
// ---------------------------------------------------------------------------

/// The closed set of keys a legacy declaration block may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyField {
    Name,
    Size,
    ClassInit,
    Props,
    FwName,
    Alias,
    Desc,
    NoUser,
    Reset,
    Vmsd,
}

impl LegacyField {
    /// Fields that become assignments on the class view, in emission order.
    pub const CLASS_FIELDS: [LegacyField; 7] = [
        LegacyField::FwName,
        LegacyField::Alias,
        LegacyField::Desc,
        LegacyField::NoUser,
        LegacyField::Reset,
        LegacyField::Vmsd,
        LegacyField::Props,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "name" => LegacyField::Name,
            "size" => LegacyField::Size,
            "class_init" => LegacyField::ClassInit,
            "props" => LegacyField::Props,
            "fw_name" => LegacyField::FwName,
            "alias" => LegacyField::Alias,
            "desc" => LegacyField::Desc,
            "no_user" => LegacyField::NoUser,
            "reset" => LegacyField::Reset,
            "vmsd" => LegacyField::Vmsd,
            _ => return None,
        })
    }

    pub fn key(self) -> &'static str {
        match self {
            LegacyField::Name => "name",
            LegacyField::Size => "size",
            LegacyField::ClassInit => "class_init",
            LegacyField::Props => "props",
            LegacyField::FwName => "fw_name",
            LegacyField::Alias => "alias",
            LegacyField::Desc => "desc",
            LegacyField::NoUser => "no_user",
            LegacyField::Reset => "reset",
            LegacyField::Vmsd => "vmsd",
        }
    }
}

/// One element of an inline property list. Usually a single line; an entry whose
/// parentheses span several lines keeps all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(String),
    List(Vec<PropertyEntry>),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(s) => Some(s),
            FieldValue::List(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: LegacyField,
    pub value: FieldValue,
    /// 0-based index of the line the field was declared on.
    pub line: usize,
}

/// Fields of one block in declaration order. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<Field>,
}

impl Fields {
    /// Insert a field; returns the previous declaration's line if the key is taken.
    pub fn insert(&mut self, field: Field) -> Result<(), usize> {
        if let Some(prev) = self.entries.iter().find(|f| f.key == field.key) {
            return Err(prev.line);
        }
        self.entries.push(field);
        Ok(())
    }

    pub fn get(&self, key: LegacyField) -> Option<&FieldValue> {
        self.entries.iter().find(|f| f.key == key).map(|f| &f.value)
    }

    pub fn scalar(&self, key: LegacyField) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_scalar)
    }

    pub fn contains(&self, key: LegacyField) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = LegacyField> + '_ {
        self.entries.iter().map(|f| f.key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Parsed block, registration site, initializer
// ---------------------------------------------------------------------------

/// A parsed legacy declaration block.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationBlock {
    /// Variable name of the declaration, e.g. `serial_isa_info`.
    pub name: String,
    /// Header line index.
    pub start: usize,
    /// Index just past the closing `};`.
    pub end: usize,
    pub fields: Fields,
}

impl DeclarationBlock {
    /// Block name without its `_info` suffix; base for generated names.
    pub fn stem(&self) -> &str {
        self.name.strip_suffix("_info").unwrap_or(&self.name)
    }

    pub fn properties_name(&self) -> String {
        format!("{}_properties", self.stem())
    }

    pub fn class_init_name(&self) -> String {
        format!("{}_class_init", self.stem())
    }
}

/// Which call convention registered the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationForm {
    /// Single-record call; parent comes from the run config.
    Fixed,
    /// Subclass call; parent is named at the call site.
    Subclass,
}

impl RegistrationForm {
    pub fn label(self) -> &'static str {
        match self {
            RegistrationForm::Fixed => "fixed",
            RegistrationForm::Subclass => "subclass",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationSite {
    pub call_index: usize,
    pub form: RegistrationForm,
    pub parent: String,
    /// Leading whitespace of the call line, reused for the rewritten call.
    pub indent: String,
    /// Alias to register alongside the type (subclass form only).
    pub alias: Option<String>,
}

/// Line layout of a hand-written class initializer found before the block.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingInitializer {
    pub name: String,
    pub signature: usize,
    /// Line holding the opening brace (may equal `signature`).
    pub open: usize,
    pub body: Range<usize>,
    pub close: usize,
    /// Lines removed from their original position (function plus one trailing blank).
    pub relocated: Range<usize>,
    /// Name of the generic class handle parameter.
    pub class_param: String,
    /// The body already declares the class view.
    pub has_class_view: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassInitializer {
    Existing(ExistingInitializer),
    Synthesized { name: String },
}

impl ClassInitializer {
    pub fn name(&self) -> &str {
        match self {
            ClassInitializer::Existing(e) => &e.name,
            ClassInitializer::Synthesized { name } => name,
        }
    }

    pub fn kind(&self) -> InitializerKind {
        match self {
            ClassInitializer::Existing(_) => InitializerKind::Merged,
            ClassInitializer::Synthesized { .. } => InitializerKind::Synthesized,
        }
    }

    pub fn relocated(&self) -> Option<Range<usize>> {
        match self {
            ClassInitializer::Existing(e) => Some(e.relocated.clone()),
            ClassInitializer::Synthesized { .. } => None,
        }
    }
}

/// A property list lifted out of a block into its own array.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertiesArray {
    pub name: String,
    pub entries: Vec<PropertyEntry>,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializerKind {
    Merged,
    Synthesized,
}

impl InitializerKind {
    pub fn label(self) -> &'static str {
        match self {
            InitializerKind::Merged => "merged",
            InitializerKind::Synthesized => "synthesized",
        }
    }
}

/// What happened to one declaration block. Line numbers are 1-based and refer
/// to the input text.
#[derive(Debug, Clone, Serialize)]
pub struct BlockReport {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub fields: Vec<LegacyField>,
    pub form: RegistrationForm,
    pub parent: String,
    pub call_line: usize,
    pub class_init: String,
    pub initializer: InitializerKind,
    pub properties: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub blocks: Vec<BlockReport>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Rewritten text plus what was done to produce it.
#[derive(Debug, Clone)]
pub struct Migration {
    pub output: String,
    pub report: MigrationReport,
}
