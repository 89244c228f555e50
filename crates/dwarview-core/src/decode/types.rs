//! Type descriptions.
//!
//! Turns a type record into the short phrase shown next to `type` references
//! and in the tree for type rows: `struct foo`, `pointer to const char`,
//! `array of int`. Modifier chains are followed iteratively with both a depth
//! bound and a visited set, so a cyclic chain ends in `no type`.

use gimli::constants;
use smallvec::SmallVec;
use tracing::warn;

use crate::source::{Record, RecordOffset, RecordSource};
use crate::tables;

/// Description of a record that has neither a name nor a referenced type.
pub const NO_TYPE: &str = "no type";

/// Describes type records reachable from a [`RecordSource`].
pub struct TypeNamer<'a>
{
    source: &'a dyn RecordSource,
    max_depth: usize,
}

impl<'a> TypeNamer<'a>
{
    /// Create a namer that follows at most `max_depth` type references.
    #[must_use]
    pub fn new(source: &'a dyn RecordSource, max_depth: usize) -> Self
    {
        Self { source, max_depth }
    }

    /// Describe the type record at `offset`.
    ///
    /// Returns `None` if no record exists there.
    #[must_use]
    pub fn describe_offset(&self, offset: RecordOffset) -> Option<String>
    {
        self.source.record(offset).map(|record| self.describe(&record))
    }

    /// Describe a type record.
    #[must_use]
    pub fn describe(&self, record: &Record) -> String
    {
        let mut prefix = String::new();
        let mut visited: SmallVec<[RecordOffset; 8]> = SmallVec::new();
        let mut current = record.clone();

        loop {
            if visited.contains(&current.offset) || visited.len() > self.max_depth {
                warn!(offset = current.offset, "type chain does not terminate");
                return NO_TYPE.to_string();
            }
            visited.push(current.offset);

            // declaration stub of a type that lives in a type unit
            if let Some(next) = current
                .reference_attr(constants::DW_AT_signature)
                .and_then(|target| self.source.record(target))
            {
                current = next;
                continue;
            }

            if let Some(base) = named(&current) {
                prefix.push_str(&base);
                return prefix;
            }

            let Some(target) = current.reference_attr(constants::DW_AT_type) else {
                return if prefix.is_empty() {
                    NO_TYPE.to_string()
                } else {
                    prefix + NO_TYPE
                };
            };

            let Some(modifier) = modifier_phrase(current.tag) else {
                prefix.push_str(&format!("unknown type ({:#x})", current.tag.0));
                return prefix;
            };
            prefix.push_str(modifier);

            let Some(next) = self.source.record(target) else {
                warn!(offset = current.offset, target, "type reference to missing record");
                prefix.push_str(NO_TYPE);
                return prefix;
            };
            current = next;
        }
    }
}

/// Name of a record that ends the chain: a direct name or an aggregate kind.
fn named(record: &Record) -> Option<String>
{
    let word = tables::kind_word(record.tag);
    match (word, record.name()) {
        (Some(word), Some(name)) => Some(format!("{word} {name}")),
        (None, Some(name)) => Some(name.to_string()),
        (Some(word), None) => Some(format!("anonymous {word}")),
        (None, None) => None,
    }
}

fn modifier_phrase(tag: gimli::DwTag) -> Option<&'static str>
{
    match tag {
        constants::DW_TAG_const_type => Some("const "),
        constants::DW_TAG_volatile_type => Some("volatile "),
        constants::DW_TAG_restrict_type => Some("restrict "),
        constants::DW_TAG_pointer_type => Some("pointer to "),
        constants::DW_TAG_reference_type | constants::DW_TAG_rvalue_reference_type => Some("reference to "),
        constants::DW_TAG_array_type => Some("array of "),
        _ => None,
    }
}
