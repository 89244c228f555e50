//! # Attribute Decoding
//!
//! Turns a record's raw attributes into the rows of the attribute table:
//! the attribute name, the storage encoding, a normalized numeric value and
//! a formatted string.
//!
//! Decoding dispatches on the form family. A handful of attribute kinds are
//! special-cased within the constant family:
//!
//! - `decl_file` / `call_file` resolve through the unit's file table and are
//!   shown relative to the compilation directory
//! - `decl_line` / `call_line` read as `Line N`
//! - `inline` and `language` use their prose tables
//!
//! Nothing in here fails. A lookup that goes wrong degrades to a placeholder
//! for that one attribute, so a single bad value never hides the rest of a row.

pub mod expr;
pub mod types;

use gimli::constants;
use tracing::warn;

use crate::names::{NameResolver, NO_NAME};
use crate::source::{AttrValue, RawAttribute, Record, RecordOffset, UnitInfo};
use crate::tables::{self, FormFamily};

/// Text shown for a value whose shape does not match its form.
pub const MALFORMED: &str = "(malformed)";
/// Text shown for a form we do not decode.
pub const UNSUPPORTED: &str = "(unsupported form)";

/// One formatted row of a record's attribute table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAttribute
{
    /// Attribute kind (`name`, `decl_line`, ...)
    pub attr: &'static str,
    /// Storage encoding (`strp`, `data1`, ...)
    pub form: &'static str,
    /// Normalized numeric value: flags are 0/1, strings 0, blocks their
    /// length, addresses and references the raw number
    pub value: u64,
    /// Formatted display string
    pub text: String,
    /// Record this attribute points at, for reference-family attributes
    pub reference: Option<RecordOffset>,
}

/// Formats attribute values of one image.
pub struct ValueDecoder<'r, 'a>
{
    names: &'r NameResolver<'a>,
}

impl<'r, 'a> ValueDecoder<'r, 'a>
{
    #[must_use]
    pub fn new(names: &'r NameResolver<'a>) -> Self
    {
        Self { names }
    }

    /// Decode every attribute of a record in stored order.
    #[must_use]
    pub fn decode_all(&self, record: &Record) -> Vec<DecodedAttribute>
    {
        record
            .attributes
            .iter()
            .map(|attr| self.decode(record, attr))
            .collect()
    }

    /// Decode one attribute of `record`.
    #[must_use]
    pub fn decode(&self, record: &Record, attr: &RawAttribute) -> DecodedAttribute
    {
        let (value, text, reference) = match tables::form_family(attr.form) {
            FormFamily::Flag => match attr.value {
                AttrValue::Flag(flag) => (u64::from(flag), flag.to_string(), None),
                AttrValue::Unsigned(raw) => (u64::from(raw != 0), (raw != 0).to_string(), None),
                _ => malformed(),
            },
            FormFamily::FlagPresent => (1, true.to_string(), None),
            FormFamily::String => match &attr.value {
                AttrValue::String(text) => (0, text.clone(), None),
                _ => malformed(),
            },
            FormFamily::Constant => match attr.value {
                AttrValue::Unsigned(raw) => (raw, self.constant_text(record, attr.name, raw), None),
                AttrValue::Signed(raw) if raw >= 0 => {
                    let raw = raw.unsigned_abs();
                    (raw, self.constant_text(record, attr.name, raw), None)
                }
                AttrValue::Signed(raw) => (raw as u64, format!("-{:#x}", raw.unsigned_abs()), None),
                _ => malformed(),
            },
            FormFamily::Block => match &attr.value {
                AttrValue::Block(bytes) => (bytes.len() as u64, hex_dump(bytes), None),
                _ => malformed(),
            },
            FormFamily::Exprloc => match &attr.value {
                AttrValue::Block(bytes) => (
                    bytes.len() as u64,
                    expr::disassemble(bytes, self.names.source().address_size()),
                    None,
                ),
                _ => malformed(),
            },
            FormFamily::Address => match attr.value {
                AttrValue::Address(address) | AttrValue::Unsigned(address) => (address, format!("{address:#x}"), None),
                _ => malformed(),
            },
            FormFamily::Reference => match attr.value {
                AttrValue::Reference(target) => (target, self.reference_text(record, attr.name, target), Some(target)),
                AttrValue::Signature(signature) => (signature, format!("signature {signature:#018x}"), None),
                // points into another file
                AttrValue::Unsigned(raw) => (raw, format!("{raw:#x}"), None),
                _ => malformed(),
            },
            FormFamily::Unsupported => (0, UNSUPPORTED.to_string(), None),
        };

        DecodedAttribute {
            attr: tables::attr_name(attr.name),
            form: tables::form_name(attr.form),
            value,
            text,
            reference,
        }
    }

    fn constant_text(&self, record: &Record, name: gimli::DwAt, raw: u64) -> String
    {
        match name {
            constants::DW_AT_decl_file | constants::DW_AT_call_file => {
                file_name(self.names.source().unit_info(record.unit), raw)
            }
            constants::DW_AT_decl_line | constants::DW_AT_call_line => format!("Line {raw}"),
            constants::DW_AT_inline => tables::inline_name(raw).map_or_else(|| format!("{raw:#x}"), str::to_string),
            constants::DW_AT_language => tables::language_name(raw).map_or_else(|| format!("{raw:#x}"), str::to_string),
            _ => format!("{raw:#x}"),
        }
    }

    fn reference_text(&self, record: &Record, name: gimli::DwAt, target: RecordOffset) -> String
    {
        let Some(referenced) = self.names.source().record(target) else {
            warn!(offset = record.offset, target, "dangling reference");
            return format!("{target:#x}");
        };

        if name == constants::DW_AT_type {
            return format!("{target:#x} ({})", self.names.types().describe(&referenced));
        }

        let resolved = self.names.resolve(&referenced);
        if resolved == NO_NAME {
            format!("{target:#x}")
        } else {
            format!("{target:#x} ({resolved})")
        }
    }
}

fn malformed() -> (u64, String, Option<RecordOffset>)
{
    (0, MALFORMED.to_string(), None)
}

/// Space separated two-digit hex octets.
#[must_use]
pub fn hex_dump(bytes: &[u8]) -> String
{
    bytes
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a file-table index as a display path.
///
/// Paths under the unit's compilation directory are shown relative to it.
/// Falls back to the stored path, or to `Unknown file: N` when the index is
/// not in the table.
#[must_use]
pub fn file_name(info: Option<&UnitInfo>, index: u64) -> String
{
    let Some(info) = info else {
        return format!("Unknown file: {index}");
    };
    let Some(path) = info.files.get(index) else {
        return format!("Unknown file: {index}");
    };

    match info.comp_dir.as_deref() {
        Some(comp_dir) if !comp_dir.is_empty() => relative_to(path, comp_dir).to_string(),
        _ => path.to_string(),
    }
}

/// Strip `dir` from the front of `path` if it is a literal prefix ending on a
/// path separator. No normalization is applied.
fn relative_to<'p>(path: &'p str, dir: &str) -> &'p str
{
    let Some(rest) = path.strip_prefix(dir) else {
        return path;
    };
    let rest = if dir.ends_with('/') {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    };
    rest.filter(|rest| !rest.is_empty()).unwrap_or(path)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_relative_to_requires_separator()
    {
        assert_eq!(relative_to("/src/app/main.c", "/src/app"), "main.c");
        assert_eq!(relative_to("/src/app/main.c", "/src/app/"), "main.c");
        assert_eq!(relative_to("/src/application/main.c", "/src/app"), "/src/application/main.c");
        assert_eq!(relative_to("/src/app", "/src/app"), "/src/app");
        assert_eq!(relative_to("/usr/include/stdio.h", "/src/app"), "/usr/include/stdio.h");
    }

    #[test]
    fn test_hex_dump()
    {
        assert_eq!(hex_dump(&[0x01, 0xab, 0x00]), "01 ab 00");
        assert_eq!(hex_dump(&[]), "");
    }
}
