//! Object file loading and DWARF record access.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gimli::{
    constants, AttributeValue, DebugInfoOffset, DebuggingInformationEntry, DwForm, Dwarf, EndianArcSlice, Reader,
    RunTimeEndian, SectionId, Unit, UnitOffset, UnitType,
};
use object::{Object, ObjectSection};
use tracing::{debug, info, warn};

use super::{AttrValue, FileTable, RawAttribute, Record, RecordOffset, RecordSource, UnitInfo, UnitSummary};
use crate::error::{map_dwarf_error, DwarviewError, Result};

type OwnedReader = EndianArcSlice<RunTimeEndian>;
type OwnedDwarf = Dwarf<OwnedReader>;

struct LoadedUnit
{
    header: u64,
    root: RecordOffset,
    end: u64,
    unit: Unit<OwnedReader>,
    info: UnitInfo,
}

/// A debug-info image read from an object file.
///
/// All `.debug_info` units are parsed up front (headers, abbreviations, line
/// program headers); individual records are decoded on demand as the core
/// asks for them.
pub struct DwarfImage
{
    path: PathBuf,
    dwarf: OwnedDwarf,
    units: Vec<LoadedUnit>,
    /// Type signature to the type record of its `.debug_info` type unit
    signatures: HashMap<u64, RecordOffset>,
    section_size: u64,
    address_size: u8,
}

impl DwarfImage
{
    /// Open an object file and index its compile units.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file is not a recognised object format
    /// - A debug section cannot be decompressed
    /// - The image has no `.debug_info` units
    pub fn open(path: impl AsRef<Path>) -> Result<Self>
    {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path)?;
        let file = object::File::parse(&*bytes).map_err(|err| DwarviewError::ObjectParse {
            path: path.clone(),
            message: err.to_string(),
        })?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let mut section_size = 0;
        let dwarf = Dwarf::load(|id| -> Result<OwnedReader> {
            let data = load_section_bytes(&file, id)?;
            if id == SectionId::DebugInfo {
                section_size = data.len() as u64;
            }
            Ok(EndianArcSlice::new(data, endian))
        })?;

        let (units, signatures) = load_units(&dwarf)?;
        if units.is_empty() {
            return Err(DwarviewError::NoDebugInfo(path));
        }

        let address_size = units
            .first()
            .map_or(if file.is_64() { 8 } else { 4 }, |loaded| loaded.unit.encoding().address_size);

        info!(
            "Opened {} ({} units, {} bytes of .debug_info)",
            path.display(),
            units.len(),
            section_size
        );

        Ok(Self {
            path,
            dwarf,
            units,
            signatures,
            section_size,
            address_size,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path
    {
        &self.path
    }

    #[must_use]
    pub fn unit_count(&self) -> usize
    {
        self.units.len()
    }

    fn locate(&self, offset: RecordOffset) -> Option<(&LoadedUnit, UnitOffset)>
    {
        let position = self.units.partition_point(|loaded| loaded.header <= offset);
        let loaded = self.units.get(position.checked_sub(1)?)?;
        if offset >= loaded.end {
            return None;
        }
        let unit_offset = DebugInfoOffset(usize::try_from(offset).ok()?).to_unit_offset(&loaded.unit.header)?;
        Some((loaded, unit_offset))
    }

    fn read_record(&self, loaded: &LoadedUnit, at: UnitOffset) -> gimli::Result<Option<Record>>
    {
        let unit = &loaded.unit;
        let mut cursor = unit.entries_at_offset(at)?;
        let Some((_, entry)) = cursor.next_dfs()? else {
            return Ok(None);
        };
        let Some(offset) = global_offset(unit, entry.offset()) else {
            return Ok(None);
        };
        let tag = entry.tag();
        let has_children = entry.has_children();
        let attributes = self.collect_attributes(loaded, entry)?;

        let first_child = if has_children {
            match cursor.next_dfs()? {
                Some((1, child)) => global_offset(unit, child.offset()),
                _ => None,
            }
        } else {
            None
        };

        let next_sibling = if offset == loaded.root {
            None
        } else {
            let mut siblings = unit.entries_at_offset(at)?;
            siblings.next_dfs()?;
            siblings
                .next_sibling()?
                .and_then(|sibling| global_offset(unit, sibling.offset()))
        };

        Ok(Some(Record {
            offset,
            unit: loaded.root,
            tag,
            attributes,
            first_child,
            next_sibling,
        }))
    }

    fn collect_attributes(
        &self,
        loaded: &LoadedUnit,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
    ) -> gimli::Result<Vec<RawAttribute>>
    {
        let specs = loaded
            .unit
            .abbreviations
            .get(entry.code())
            .map(gimli::Abbreviation::attributes);

        let mut attributes = Vec::new();
        let mut attrs = entry.attrs();
        let mut index = 0;
        while let Some(attr) = attrs.next()? {
            let raw = attr.raw_value();
            let form = specs
                .and_then(|specs| specs.get(index))
                .map_or_else(|| infer_form(&raw), gimli::AttributeSpecification::form);
            index += 1;

            match self.convert_value(&loaded.unit, raw) {
                Some(value) => attributes.push(RawAttribute::new(attr.name(), form, value)),
                None => debug!("Skipping unreadable {} attribute at {:#x}", attr.name(), entry.offset().0),
            }
        }
        Ok(attributes)
    }

    fn convert_value(&self, unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> Option<AttrValue>
    {
        let converted = match value {
            AttributeValue::Addr(address) => AttrValue::Address(address),
            AttributeValue::DebugAddrIndex(index) => AttrValue::Address(self.dwarf.address(unit, index).ok()?),
            AttributeValue::Block(data) => AttrValue::Block(data.to_slice().ok()?.into_owned()),
            AttributeValue::Exprloc(expression) => AttrValue::Block(expression.0.to_slice().ok()?.into_owned()),
            AttributeValue::Data1(value) => AttrValue::Unsigned(value.into()),
            AttributeValue::Data2(value) => AttrValue::Unsigned(value.into()),
            AttributeValue::Data4(value) => AttrValue::Unsigned(value.into()),
            AttributeValue::Data8(value) | AttributeValue::Udata(value) => AttrValue::Unsigned(value),
            AttributeValue::Sdata(value) => AttrValue::Signed(value),
            AttributeValue::Flag(value) => AttrValue::Flag(value),
            AttributeValue::SecOffset(offset) => AttrValue::Unsigned(offset as u64),
            AttributeValue::DebugLocListsIndex(index) => AttrValue::Unsigned(index.0 as u64),
            AttributeValue::DebugRngListsIndex(index) => AttrValue::Unsigned(index.0 as u64),
            AttributeValue::UnitRef(offset) => AttrValue::Reference(global_offset(unit, offset)?),
            AttributeValue::DebugInfoRef(offset) => AttrValue::Reference(offset.0 as u64),
            AttributeValue::DebugTypesRef(signature) => match self.signatures.get(&signature.0) {
                Some(target) => AttrValue::Reference(*target),
                None => AttrValue::Signature(signature.0),
            },
            AttributeValue::DebugInfoRefSup(offset) => AttrValue::Unsigned(offset.0 as u64),
            string @ (AttributeValue::String(_)
            | AttributeValue::DebugStrRef(_)
            | AttributeValue::DebugStrRefSup(_)
            | AttributeValue::DebugLineStrRef(_)
            | AttributeValue::DebugStrOffsetsIndex(_)) => AttrValue::String(attr_string(&self.dwarf, unit, string)?),
            _ => return None,
        };
        Some(converted)
    }
}

impl RecordSource for DwarfImage
{
    fn section_size(&self) -> u64
    {
        self.section_size
    }

    fn address_size(&self) -> u8
    {
        self.address_size
    }

    fn next_unit(&self, offset: u64) -> Option<UnitSummary>
    {
        let position = self.units.partition_point(|loaded| loaded.header < offset);
        self.units.get(position).map(|loaded| UnitSummary {
            header: loaded.header,
            root: loaded.root,
            end: loaded.end,
        })
    }

    fn record(&self, offset: RecordOffset) -> Option<Record>
    {
        let (loaded, unit_offset) = self.locate(offset)?;
        match self.read_record(loaded, unit_offset) {
            Ok(record) => record,
            Err(err) => {
                warn!("Failed to read record at {offset:#x}: {err}");
                None
            }
        }
    }

    fn unit_info(&self, unit: RecordOffset) -> Option<&UnitInfo>
    {
        self.units
            .iter()
            .find(|loaded| loaded.root == unit)
            .map(|loaded| &loaded.info)
    }
}

fn load_section_bytes(file: &object::File<'_>, id: SectionId) -> Result<Arc<[u8]>>
{
    let canonical = id.name();
    // Mach-O spells `.debug_info` as `__debug_info`.
    let macho = format!("__{}", canonical.trim_start_matches('.'));
    for name in [canonical, macho.as_str()] {
        if let Some(section) = file.section_by_name(name) {
            let data = section.uncompressed_data().map_err(|err| DwarviewError::Dwarf {
                context: format!("failed to read {name}"),
                message: err.to_string(),
            })?;
            return Ok(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes.to_vec()),
                Cow::Owned(vec) => vec.into(),
            });
        }
    }

    Ok(Arc::<[u8]>::from(Vec::new()))
}

fn load_units(dwarf: &OwnedDwarf) -> Result<(Vec<LoadedUnit>, HashMap<u64, RecordOffset>)>
{
    let mut units = Vec::new();
    let mut signatures = HashMap::new();
    let mut headers = dwarf.units();
    while let Some(header) = headers
        .next()
        .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
    {
        let Some(start) = header.offset().as_debug_info_offset() else {
            continue;
        };
        let start = start.0 as u64;
        let end = start + header.length_including_self() as u64;

        if let UnitType::Type {
            type_signature,
            type_offset,
        }
        | UnitType::SplitType {
            type_signature,
            type_offset,
        } = header.type_()
        {
            if let Some(target) = type_offset.to_debug_info_offset(&header) {
                signatures.insert(type_signature.0, target.0 as u64);
            }
        }

        let unit = match dwarf.unit(header) {
            Ok(unit) => unit,
            Err(err) => {
                warn!("Skipping unit at {start:#x}: {err}");
                continue;
            }
        };

        let root = {
            let mut cursor = unit.entries();
            match cursor.next_dfs() {
                Ok(Some((_, entry))) => global_offset(&unit, entry.offset()),
                _ => None,
            }
        };
        let Some(root) = root else {
            warn!("Skipping unit at {start:#x}: no root record");
            continue;
        };

        let info = unit_info(dwarf, &unit);
        units.push(LoadedUnit {
            header: start,
            root,
            end,
            unit,
            info,
        });
    }
    Ok((units, signatures))
}

fn unit_info(dwarf: &OwnedDwarf, unit: &Unit<OwnedReader>) -> UnitInfo
{
    let name = unit.name.as_ref().and_then(reader_string);
    let comp_dir = unit.comp_dir.as_ref().and_then(reader_string);

    let files = unit
        .line_program
        .as_ref()
        .map(|program| {
            let header = program.header();
            let base = if header.version() >= 5 { 0 } else { 1 };
            let paths = header
                .file_names()
                .iter()
                .map(|file| {
                    let file_name = attr_string(dwarf, unit, file.path_name()).unwrap_or_default();
                    let directory = file
                        .directory(header)
                        .and_then(|dir| attr_string(dwarf, unit, dir));
                    join_path(comp_dir.as_deref(), directory.as_deref(), &file_name)
                })
                .collect();
            FileTable::new(base, paths)
        })
        .unwrap_or_default();

    UnitInfo { name, comp_dir, files }
}

fn join_path(comp_dir: Option<&str>, directory: Option<&str>, file_name: &str) -> String
{
    let mut path = PathBuf::new();
    if let Some(comp_dir) = comp_dir {
        path.push(comp_dir);
    }
    if let Some(directory) = directory {
        path.push(directory);
    }
    path.push(file_name);
    path.to_string_lossy().into_owned()
}

fn global_offset(unit: &Unit<OwnedReader>, offset: UnitOffset) -> Option<RecordOffset>
{
    offset.to_debug_info_offset(&unit.header).map(|global| global.0 as u64)
}

fn reader_string(reader: &OwnedReader) -> Option<String>
{
    reader.to_string_lossy().ok().map(Cow::into_owned)
}

fn attr_string(dwarf: &OwnedDwarf, unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> Option<String>
{
    let reader = dwarf.attr_string(unit, value).ok()?;
    reader_string(&reader)
}

fn infer_form(value: &AttributeValue<OwnedReader>) -> DwForm
{
    match value {
        AttributeValue::Addr(_) => constants::DW_FORM_addr,
        AttributeValue::Block(_) => constants::DW_FORM_block,
        AttributeValue::Exprloc(_) => constants::DW_FORM_exprloc,
        AttributeValue::Data1(_) => constants::DW_FORM_data1,
        AttributeValue::Data2(_) => constants::DW_FORM_data2,
        AttributeValue::Data4(_) => constants::DW_FORM_data4,
        AttributeValue::Data8(_) => constants::DW_FORM_data8,
        AttributeValue::Sdata(_) => constants::DW_FORM_sdata,
        AttributeValue::Flag(_) => constants::DW_FORM_flag,
        AttributeValue::String(_) => constants::DW_FORM_string,
        AttributeValue::DebugStrRef(_) => constants::DW_FORM_strp,
        AttributeValue::UnitRef(_) => constants::DW_FORM_ref_udata,
        AttributeValue::DebugInfoRef(_) => constants::DW_FORM_ref_addr,
        AttributeValue::DebugTypesRef(_) => constants::DW_FORM_ref_sig8,
        AttributeValue::SecOffset(_) => constants::DW_FORM_sec_offset,
        _ => constants::DW_FORM_udata,
    }
}
