//! Display-name resolution.
//!
//! A record's display name is not always stored on the record itself. Inlined
//! instances and out-of-line definitions point back at the declaration that
//! carries the name through `DW_AT_abstract_origin`, `DW_AT_specification` or
//! `DW_AT_import`. The resolver follows that chain until it finds a direct
//! name or (with a demangler) a linkage name.

use gimli::constants;
use tracing::warn;

use crate::decode::types::TypeNamer;
use crate::demangle::Demangler;
use crate::source::{Record, RecordOffset, RecordSource};
use crate::tables::{self, RecordClass};

/// Placeholder for records whose name cannot be resolved.
pub const NO_NAME: &str = "(no name)";

/// Attributes that point at the record holding the name.
const CHASE_ATTRIBUTES: [gimli::DwAt; 3] = [
    constants::DW_AT_abstract_origin,
    constants::DW_AT_specification,
    constants::DW_AT_import,
];

/// Resolves record display names against one image.
pub struct NameResolver<'a>
{
    source: &'a dyn RecordSource,
    demangler: &'a dyn Demangler,
    types: TypeNamer<'a>,
    max_steps: usize,
}

impl<'a> NameResolver<'a>
{
    /// ## Parameters
    ///
    /// - `max_steps`: number of records visited on a chase chain before giving up
    /// - `max_type_depth`: type references followed when describing a type
    #[must_use]
    pub fn new(
        source: &'a dyn RecordSource,
        demangler: &'a dyn Demangler,
        max_steps: usize,
        max_type_depth: usize,
    ) -> Self
    {
        Self {
            source,
            demangler,
            types: TypeNamer::new(source, max_type_depth),
            max_steps,
        }
    }

    #[must_use]
    pub fn source(&self) -> &'a dyn RecordSource
    {
        self.source
    }

    #[must_use]
    pub fn types(&self) -> &TypeNamer<'a>
    {
        &self.types
    }

    /// Display name of a record; [`NO_NAME`] when nothing resolves.
    #[must_use]
    pub fn resolve(&self, record: &Record) -> String
    {
        if tables::classify(record.tag) == RecordClass::Type {
            return self.types.describe(record);
        }

        let mut current = record.clone();
        for _ in 0..self.max_steps {
            if let Some(name) = current.name() {
                return name.to_string();
            }
            if let Some(linkage) = current.linkage_name().filter(|_| self.demangler.is_available()) {
                return self.demangler.demangle(linkage);
            }

            let Some(target) = chase_target(&current) else {
                return NO_NAME.to_string();
            };
            let Some(next) = self.source.record(target) else {
                warn!(offset = current.offset, target, "name chain points at a missing record");
                return NO_NAME.to_string();
            };
            current = next;
        }

        warn!(offset = record.offset, "name chain exceeds {} steps", self.max_steps);
        NO_NAME.to_string()
    }

    /// Display name of the record at `offset`; `None` if there is no record.
    #[must_use]
    pub fn resolve_offset(&self, offset: RecordOffset) -> Option<String>
    {
        self.source.record(offset).map(|record| self.resolve(&record))
    }
}

/// Target of the only chase attribute, if exactly one is present.
pub(crate) fn chase_target(record: &Record) -> Option<RecordOffset>
{
    let mut targets = CHASE_ATTRIBUTES
        .iter()
        .filter_map(|attr| record.reference_attr(*attr));
    let target = targets.next()?;
    targets.next().is_none().then_some(target)
}
