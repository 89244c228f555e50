//! In-memory record tree.

use std::collections::BTreeMap;

use gimli::{constants, DwTag};

use super::{FileTable, RawAttribute, Record, RecordOffset, RecordSource, UnitInfo, UnitSummary};

/// Distance between consecutive record offsets handed out by [`MemoryImage`].
const RECORD_STRIDE: u64 = 0x10;
/// Bytes reserved in front of each unit root for its (imaginary) header.
const HEADER_SIZE: u64 = 0xb;

#[derive(Debug, Clone)]
struct Node
{
    unit: RecordOffset,
    parent: Option<RecordOffset>,
    tag: DwTag,
    attributes: Vec<RawAttribute>,
    children: Vec<RecordOffset>,
    missing: bool,
}

#[derive(Debug, Clone)]
struct MemoryUnit
{
    header: u64,
    root: RecordOffset,
    info: UnitInfo,
}

/// A record tree built in memory.
///
/// Offsets are allocated in insertion order, so records added later always
/// have larger offsets. Records can be marked missing to simulate a corrupt
/// image: they keep their place in the parent's child list, but
/// [`RecordSource::record`] no longer finds them.
///
/// ```rust
/// use dwarview_core::source::{MemoryImage, RawAttribute, RecordSource};
/// use gimli::constants;
///
/// let mut image = MemoryImage::new();
/// let unit = image.add_unit("main.c", "/src", &["/src/main.c"]);
/// let main = image.add_child(unit, constants::DW_TAG_subprogram, vec![RawAttribute::string(
///     constants::DW_AT_name,
///     "main",
/// )]);
/// assert_eq!(image.record(main).unwrap().name(), Some("main"));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryImage
{
    nodes: BTreeMap<RecordOffset, Node>,
    units: Vec<MemoryUnit>,
    next_offset: u64,
    address_size: u8,
}

impl Default for MemoryImage
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl MemoryImage
{
    #[must_use]
    pub fn new() -> Self
    {
        Self {
            nodes: BTreeMap::new(),
            units: Vec::new(),
            next_offset: 0,
            address_size: 8,
        }
    }

    /// Override the target address width (defaults to 8).
    #[must_use]
    pub fn with_address_size(mut self, address_size: u8) -> Self
    {
        self.address_size = address_size;
        self
    }

    /// Add a compile unit with the given name, compilation directory and file table.
    ///
    /// The file table uses DWARF 4 numbering: the first path has index 1.
    /// Returns the offset of the unit's root record.
    pub fn add_unit(&mut self, name: &str, comp_dir: &str, files: &[&str]) -> RecordOffset
    {
        let header = self.next_offset;
        let root = header + HEADER_SIZE;
        self.next_offset = root + RECORD_STRIDE;

        let attributes = vec![
            RawAttribute::string(constants::DW_AT_name, name),
            RawAttribute::string(constants::DW_AT_comp_dir, comp_dir),
        ];
        self.nodes.insert(
            root,
            Node {
                unit: root,
                parent: None,
                tag: constants::DW_TAG_compile_unit,
                attributes,
                children: Vec::new(),
                missing: false,
            },
        );
        self.units.push(MemoryUnit {
            header,
            root,
            info: UnitInfo {
                name: Some(name.to_string()),
                comp_dir: Some(comp_dir.to_string()),
                files: FileTable::new(1, files.iter().map(|path| (*path).to_string()).collect()),
            },
        });
        root
    }

    /// Append a child record under `parent` and return its offset.
    ///
    /// A `parent` this image does not know leaves the new record detached:
    /// readable by offset, but outside every unit's tree and without a unit
    /// description.
    pub fn add_child(&mut self, parent: RecordOffset, tag: DwTag, attributes: Vec<RawAttribute>) -> RecordOffset
    {
        let offset = self.next_offset;
        self.next_offset += RECORD_STRIDE;

        let (unit, linked_parent) = match self.nodes.get_mut(&parent) {
            Some(parent_node) => {
                parent_node.children.push(offset);
                (parent_node.unit, Some(parent))
            }
            None => (parent, None),
        };

        self.nodes.insert(
            offset,
            Node {
                unit,
                parent: linked_parent,
                tag,
                attributes,
                children: Vec::new(),
                missing: false,
            },
        );
        offset
    }

    /// Add an attribute to an existing record.
    ///
    /// Useful for references to records created later, such as cycles.
    /// Returns `false` when `offset` was not created by this image.
    pub fn push_attribute(&mut self, offset: RecordOffset, attribute: RawAttribute) -> bool
    {
        let Some(node) = self.nodes.get_mut(&offset) else {
            return false;
        };
        node.attributes.push(attribute);
        true
    }

    /// Make a record unreadable while keeping it linked into the tree.
    pub fn mark_missing(&mut self, offset: RecordOffset)
    {
        if let Some(node) = self.nodes.get_mut(&offset) {
            node.missing = true;
        }
    }

    fn next_sibling_of(&self, offset: RecordOffset, parent: Option<RecordOffset>) -> Option<RecordOffset>
    {
        let siblings = &self.nodes.get(&parent?)?.children;
        let position = siblings.iter().position(|child| *child == offset)?;
        siblings.get(position + 1).copied()
    }
}

impl RecordSource for MemoryImage
{
    fn section_size(&self) -> u64
    {
        self.next_offset
    }

    fn address_size(&self) -> u8
    {
        self.address_size
    }

    fn next_unit(&self, offset: u64) -> Option<UnitSummary>
    {
        let position = self.units.iter().position(|unit| unit.header >= offset)?;
        let unit = &self.units[position];
        let end = self
            .units
            .get(position + 1)
            .map_or(self.next_offset, |next| next.header);
        Some(UnitSummary {
            header: unit.header,
            root: unit.root,
            end,
        })
    }

    fn record(&self, offset: RecordOffset) -> Option<Record>
    {
        let node = self.nodes.get(&offset).filter(|node| !node.missing)?;
        // Unit roots have no siblings; top-level units are reached through next_unit.
        let next_sibling = self.next_sibling_of(offset, node.parent);
        Some(Record {
            offset,
            unit: node.unit,
            tag: node.tag,
            attributes: node.attributes.clone(),
            first_child: node.children.first().copied(),
            next_sibling,
        })
    }

    fn unit_info(&self, unit: RecordOffset) -> Option<&UnitInfo>
    {
        self.units.iter().find(|candidate| candidate.root == unit).map(|found| &found.info)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_unknown_parent_leaves_record_detached()
    {
        let mut image = MemoryImage::new();
        let unit = image.add_unit("main.c", "/src", &[]);
        let orphan = image.add_child(0x999, constants::DW_TAG_variable, vec![]);

        let record = image.record(orphan).unwrap();
        assert_eq!(record.next_sibling, None);
        assert!(image.unit_info(record.unit).is_none());
        assert_eq!(image.record(unit).unwrap().first_child, None);
    }

    #[test]
    fn test_push_attribute_reports_unknown_record()
    {
        let mut image = MemoryImage::new();
        let unit = image.add_unit("main.c", "/src", &[]);

        assert!(image.push_attribute(unit, RawAttribute::udata(constants::DW_AT_language, 0x1c)));
        assert!(!image.push_attribute(0x999, RawAttribute::udata(constants::DW_AT_language, 0x1c)));
        assert_eq!(image.record(unit).unwrap().attributes.len(), 3);
    }
}
