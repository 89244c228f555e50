//! # Image Sources
//!
//! The accessor boundary between the core and whatever parsed the debug
//! information. The core never looks at section bytes; it asks a
//! [`RecordSource`] for units, records and per-unit metadata and only ever
//! traverses what it is handed.
//!
//! Two sources ship with the crate:
//!
//! - [`DwarfImage`]: reads an object file from disk with `object` and walks its
//!   `.debug_info` section with `gimli`.
//! - [`MemoryImage`]: an in-memory record tree for tests and demos.

mod dwarf;
mod memory;

pub use dwarf::DwarfImage;
use gimli::{constants, DwAt, DwForm, DwTag};
pub use memory::MemoryImage;

/// Offset of a record within the debug-info section.
///
/// Offsets are the stable identity of a record for the lifetime of an image.
pub type RecordOffset = u64;

/// Position and extent of one top-level unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSummary
{
    /// Offset of the unit header
    pub header: u64,
    /// Offset of the unit's root record
    pub root: RecordOffset,
    /// Offset one past the end of the unit
    pub end: u64,
}

/// Value of an attribute as extracted by the image source.
///
/// The source resolves indirections (string tables, address tables,
/// unit-relative references) but keeps the value otherwise raw. The decoder
/// decides how to present it from the attribute's form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue
{
    /// Stored flag byte
    Flag(bool),
    /// String contents
    String(String),
    /// Unsigned constant, section offset or index
    Unsigned(u64),
    /// Signed constant
    Signed(i64),
    /// Block or expression bytes
    Block(Vec<u8>),
    /// Target address
    Address(u64),
    /// Section offset of the referenced record
    Reference(RecordOffset),
    /// Type signature with no type unit in this image
    Signature(u64),
}

/// One (attribute kind, storage encoding, value) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute
{
    pub name: DwAt,
    pub form: DwForm,
    pub value: AttrValue,
}

impl RawAttribute
{
    #[must_use]
    pub fn new(name: DwAt, form: DwForm, value: AttrValue) -> Self
    {
        Self { name, form, value }
    }

    /// Inline string attribute (`DW_FORM_string`).
    #[must_use]
    pub fn string(name: DwAt, value: impl Into<String>) -> Self
    {
        Self::new(name, constants::DW_FORM_string, AttrValue::String(value.into()))
    }

    /// Unsigned constant attribute (`DW_FORM_udata`).
    #[must_use]
    pub fn udata(name: DwAt, value: u64) -> Self
    {
        Self::new(name, constants::DW_FORM_udata, AttrValue::Unsigned(value))
    }

    /// Signed constant attribute (`DW_FORM_sdata`).
    #[must_use]
    pub fn sdata(name: DwAt, value: i64) -> Self
    {
        Self::new(name, constants::DW_FORM_sdata, AttrValue::Signed(value))
    }

    /// Present flag (`DW_FORM_flag_present`).
    #[must_use]
    pub fn flag_present(name: DwAt) -> Self
    {
        Self::new(name, constants::DW_FORM_flag_present, AttrValue::Flag(true))
    }

    /// Reference to another record by section offset (`DW_FORM_ref_addr`).
    #[must_use]
    pub fn reference(name: DwAt, target: RecordOffset) -> Self
    {
        Self::new(name, constants::DW_FORM_ref_addr, AttrValue::Reference(target))
    }

    /// Location expression (`DW_FORM_exprloc`).
    #[must_use]
    pub fn exprloc(name: DwAt, bytes: Vec<u8>) -> Self
    {
        Self::new(name, constants::DW_FORM_exprloc, AttrValue::Block(bytes))
    }

    /// Target address (`DW_FORM_addr`).
    #[must_use]
    pub fn address(name: DwAt, address: u64) -> Self
    {
        Self::new(name, constants::DW_FORM_addr, AttrValue::Address(address))
    }

    /// Value as an unsigned number, if it is one.
    #[must_use]
    pub fn udata_value(&self) -> Option<u64>
    {
        match self.value {
            AttrValue::Unsigned(value) | AttrValue::Address(value) => Some(value),
            AttrValue::Signed(value) => u64::try_from(value).ok(),
            _ => None,
        }
    }
}

/// A node of the debug-info tree.
///
/// Records are snapshots handed out by a [`RecordSource`]; navigating to a
/// child or sibling goes back through the source by offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record
{
    /// Section offset of this record
    pub offset: RecordOffset,
    /// Root offset of the owning unit
    pub unit: RecordOffset,
    pub tag: DwTag,
    pub attributes: Vec<RawAttribute>,
    pub first_child: Option<RecordOffset>,
    pub next_sibling: Option<RecordOffset>,
}

impl Record
{
    /// First attribute of the given kind.
    #[must_use]
    pub fn attr(&self, name: DwAt) -> Option<&RawAttribute>
    {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Whether the record carries an attribute of the given kind.
    #[must_use]
    pub fn has_attr(&self, name: DwAt) -> bool
    {
        self.attr(name).is_some()
    }

    /// String value of an attribute.
    #[must_use]
    pub fn string_attr(&self, name: DwAt) -> Option<&str>
    {
        match self.attr(name).map(|attr| &attr.value) {
            Some(AttrValue::String(value)) => Some(value),
            _ => None,
        }
    }

    /// Target of a reference attribute.
    #[must_use]
    pub fn reference_attr(&self, name: DwAt) -> Option<RecordOffset>
    {
        match self.attr(name).map(|attr| &attr.value) {
            Some(AttrValue::Reference(target)) => Some(*target),
            _ => None,
        }
    }

    /// Direct `DW_AT_name`.
    #[must_use]
    pub fn name(&self) -> Option<&str>
    {
        self.string_attr(constants::DW_AT_name)
    }

    /// Mangled linkage name, including the pre-DWARF4 MIPS spelling.
    #[must_use]
    pub fn linkage_name(&self) -> Option<&str>
    {
        self.string_attr(constants::DW_AT_linkage_name)
            .or_else(|| self.string_attr(constants::DW_AT_MIPS_linkage_name))
    }

    /// Marked with `DW_AT_declaration`.
    #[must_use]
    pub fn is_declaration(&self) -> bool
    {
        match self.attr(constants::DW_AT_declaration).map(|attr| &attr.value) {
            Some(AttrValue::Flag(value)) => *value,
            Some(AttrValue::Unsigned(value)) => *value != 0,
            Some(_) => true,
            None => false,
        }
    }
}

/// Source files of one unit, indexed the way `DW_AT_decl_file` counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTable
{
    base: u64,
    paths: Vec<String>,
}

impl FileTable
{
    /// Build a table whose first entry has index `base` (1 before DWARF 5, 0 after).
    #[must_use]
    pub fn new(base: u64, paths: Vec<String>) -> Self
    {
        Self { base, paths }
    }

    #[must_use]
    pub fn get(&self, index: u64) -> Option<&str>
    {
        let slot = usize::try_from(index.checked_sub(self.base)?).ok()?;
        self.paths.get(slot).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.paths.is_empty()
    }
}

/// Per-unit metadata needed to render file and line attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitInfo
{
    pub name: Option<String>,
    pub comp_dir: Option<String>,
    pub files: FileTable,
}

/// Read-only access to a parsed debug-info image.
pub trait RecordSource
{
    /// Size of the debug-info section in bytes; the build progress total.
    fn section_size(&self) -> u64;

    /// Width of a target address in bytes.
    fn address_size(&self) -> u8;

    /// First unit whose header starts at or after `offset`.
    fn next_unit(&self, offset: u64) -> Option<UnitSummary>;

    /// Record at a section offset, or `None` if the offset does not name one.
    fn record(&self, offset: RecordOffset) -> Option<Record>;

    /// Metadata of the unit whose root record is at `unit`.
    fn unit_info(&self, unit: RecordOffset) -> Option<&UnitInfo>;
}
