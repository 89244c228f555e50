//! Encoding tables.
//!
//! Static mappings from DWARF numeric codes to the short names the viewer
//! displays, plus the single kind classification shared by the tree builder,
//! the name resolver and the type namer.
//!
//! Tag, attribute and form names come from gimli's constant tables with the
//! `DW_*_` prefix stripped, so `DW_TAG_subprogram` shows as `subprogram`.
//! Inlining and language codes have their own tables because the viewer shows
//! prose rather than constant names for them.

use gimli::constants;
use gimli::{DwAt, DwForm, DwInl, DwLang, DwTag};

/// Name shown for a code that has no table entry.
pub const UNKNOWN: &str = "unknown";

/// Display name of a record kind (`subprogram`, `structure_type`, ...).
#[must_use]
pub fn tag_name(tag: DwTag) -> &'static str
{
    tag.static_string()
        .and_then(|name| name.strip_prefix("DW_TAG_"))
        .unwrap_or(UNKNOWN)
}

/// Display name of an attribute kind (`name`, `decl_file`, ...).
#[must_use]
pub fn attr_name(attr: DwAt) -> &'static str
{
    attr.static_string()
        .and_then(|name| name.strip_prefix("DW_AT_"))
        .unwrap_or(UNKNOWN)
}

/// Display name of a storage encoding (`data4`, `exprloc`, ...).
#[must_use]
pub fn form_name(form: DwForm) -> &'static str
{
    form.static_string()
        .and_then(|name| name.strip_prefix("DW_FORM_"))
        .unwrap_or(UNKNOWN)
}

const INLINE_NAMES: &[(DwInl, &str)] = &[
    (constants::DW_INL_not_inlined, "not inlined"),
    (constants::DW_INL_inlined, "inlined"),
    (constants::DW_INL_declared_not_inlined, "declared as inline but not inlined"),
    (constants::DW_INL_declared_inlined, "declared as inline and inlined"),
];

/// Prose for a `DW_AT_inline` value.
#[must_use]
pub fn inline_name(value: u64) -> Option<&'static str>
{
    let code = u8::try_from(value).ok()?;
    INLINE_NAMES
        .iter()
        .find(|(inl, _)| inl.0 == code)
        .map(|(_, name)| *name)
}

const LANGUAGE_NAMES: &[(DwLang, &str)] = &[
    (constants::DW_LANG_C89, "C89"),
    (constants::DW_LANG_C, "C"),
    (constants::DW_LANG_Ada83, "Ada83"),
    (constants::DW_LANG_C_plus_plus, "C++"),
    (constants::DW_LANG_Cobol74, "Cobol74"),
    (constants::DW_LANG_Cobol85, "Cobol85"),
    (constants::DW_LANG_Fortran77, "Fortran77"),
    (constants::DW_LANG_Fortran90, "Fortran90"),
    (constants::DW_LANG_Pascal83, "Pascal83"),
    (constants::DW_LANG_Modula2, "Modula2"),
    (constants::DW_LANG_Java, "Java"),
    (constants::DW_LANG_C99, "C99"),
    (constants::DW_LANG_Ada95, "Ada95"),
    (constants::DW_LANG_Fortran95, "Fortran95"),
    (constants::DW_LANG_PLI, "PL/I"),
    (constants::DW_LANG_ObjC, "Objective C"),
    (constants::DW_LANG_ObjC_plus_plus, "Objective C++"),
    (constants::DW_LANG_UPC, "UPC"),
    (constants::DW_LANG_D, "D"),
    (constants::DW_LANG_Python, "Python"),
    (constants::DW_LANG_OpenCL, "OpenCL"),
    (constants::DW_LANG_Go, "Go"),
    (constants::DW_LANG_Modula3, "Modula3"),
    (constants::DW_LANG_Haskell, "Haskell"),
    (constants::DW_LANG_C_plus_plus_03, "C++03"),
    (constants::DW_LANG_C_plus_plus_11, "C++11"),
    (constants::DW_LANG_OCaml, "OCaml"),
    (constants::DW_LANG_Rust, "Rust"),
    (constants::DW_LANG_C11, "C11"),
    (constants::DW_LANG_Swift, "Swift"),
    (constants::DW_LANG_Julia, "Julia"),
    (constants::DW_LANG_Dylan, "Dylan"),
    (constants::DW_LANG_C_plus_plus_14, "C++14"),
    (constants::DW_LANG_Fortran03, "Fortran03"),
    (constants::DW_LANG_Fortran08, "Fortran08"),
    (constants::DW_LANG_RenderScript, "RenderScript"),
    (constants::DW_LANG_BLISS, "BLISS"),
    (constants::DW_LANG_Mips_Assembler, "MIPS assembler"),
];

/// Human-readable name of a `DW_AT_language` value.
#[must_use]
pub fn language_name(value: u64) -> Option<&'static str>
{
    let code = u16::try_from(value).ok()?;
    LANGUAGE_NAMES
        .iter()
        .find(|(lang, _)| lang.0 == code)
        .map(|(_, name)| *name)
}

/// Logical bucket a record kind belongs to.
///
/// First-level children of a unit are grouped under one synthetic row per
/// bucket. The same classification decides which records feed the searchable
/// name lists and which records the name resolver hands to the type namer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordClass
{
    /// Subprograms, inlined subroutines and entry points
    Function,
    /// Variables and named constants
    Variable,
    /// Any type-describing record
    Type,
    /// Everything else (namespaces, imported units, ...)
    Other,
}

impl RecordClass
{
    /// All buckets in display order.
    pub const ALL: [RecordClass; 4] = [
        RecordClass::Function,
        RecordClass::Variable,
        RecordClass::Type,
        RecordClass::Other,
    ];

    /// Name of the synthetic bucket row.
    #[must_use]
    pub const fn bucket_name(self) -> &'static str
    {
        match self {
            RecordClass::Function => "functions",
            RecordClass::Variable => "variables",
            RecordClass::Type => "types",
            RecordClass::Other => "others",
        }
    }

    /// Position of this bucket in [`RecordClass::ALL`].
    #[must_use]
    pub const fn position(self) -> usize
    {
        match self {
            RecordClass::Function => 0,
            RecordClass::Variable => 1,
            RecordClass::Type => 2,
            RecordClass::Other => 3,
        }
    }
}

/// Classify a record kind.
#[must_use]
pub fn classify(tag: DwTag) -> RecordClass
{
    match tag {
        constants::DW_TAG_subprogram | constants::DW_TAG_inlined_subroutine | constants::DW_TAG_entry_point => {
            RecordClass::Function
        }
        constants::DW_TAG_variable | constants::DW_TAG_constant => RecordClass::Variable,
        constants::DW_TAG_base_type
        | constants::DW_TAG_array_type
        | constants::DW_TAG_class_type
        | constants::DW_TAG_enumeration_type
        | constants::DW_TAG_pointer_type
        | constants::DW_TAG_reference_type
        | constants::DW_TAG_string_type
        | constants::DW_TAG_structure_type
        | constants::DW_TAG_subroutine_type
        | constants::DW_TAG_union_type
        | constants::DW_TAG_set_type
        | constants::DW_TAG_subrange_type
        | constants::DW_TAG_const_type
        | constants::DW_TAG_file_type
        | constants::DW_TAG_packed_type
        | constants::DW_TAG_thrown_type
        | constants::DW_TAG_volatile_type
        | constants::DW_TAG_restrict_type
        | constants::DW_TAG_interface_type
        | constants::DW_TAG_unspecified_type
        | constants::DW_TAG_shared_type
        | constants::DW_TAG_ptr_to_member_type
        | constants::DW_TAG_rvalue_reference_type
        | constants::DW_TAG_atomic_type
        | constants::DW_TAG_typedef => RecordClass::Type,
        _ => RecordClass::Other,
    }
}

/// Word prefixed to the name of an aggregate type (`struct foo`).
///
/// Returns `None` for kinds that display their bare name, such as base types
/// and typedefs.
#[must_use]
pub fn kind_word(tag: DwTag) -> Option<&'static str>
{
    match tag {
        constants::DW_TAG_structure_type => Some("struct"),
        constants::DW_TAG_union_type => Some("union"),
        constants::DW_TAG_enumeration_type => Some("enum"),
        constants::DW_TAG_class_type => Some("class"),
        constants::DW_TAG_interface_type => Some("interface"),
        constants::DW_TAG_subroutine_type => Some("function"),
        _ => None,
    }
}

/// Storage-encoding family that selects the decoding rule for a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFamily
{
    /// One stored byte, zero or non-zero
    Flag,
    /// No stored bytes; presence means true
    FlagPresent,
    /// Inline or indirect string
    String,
    /// Fixed or variable width integer constant
    Constant,
    /// Opaque byte block
    Block,
    /// Executable location expression
    Exprloc,
    /// Target address
    Address,
    /// Reference to another record
    Reference,
    /// Anything we cannot decode (`indirect`, vendor forms)
    Unsupported,
}

/// Decoding family of a storage encoding.
#[must_use]
pub fn form_family(form: DwForm) -> FormFamily
{
    match form {
        constants::DW_FORM_flag => FormFamily::Flag,
        constants::DW_FORM_flag_present => FormFamily::FlagPresent,
        constants::DW_FORM_string
        | constants::DW_FORM_strp
        | constants::DW_FORM_line_strp
        | constants::DW_FORM_strp_sup
        | constants::DW_FORM_strx
        | constants::DW_FORM_strx1
        | constants::DW_FORM_strx2
        | constants::DW_FORM_strx3
        | constants::DW_FORM_strx4
        | constants::DW_FORM_GNU_str_index
        | constants::DW_FORM_GNU_strp_alt => FormFamily::String,
        constants::DW_FORM_data1
        | constants::DW_FORM_data2
        | constants::DW_FORM_data4
        | constants::DW_FORM_data8
        | constants::DW_FORM_sdata
        | constants::DW_FORM_udata
        | constants::DW_FORM_implicit_const
        | constants::DW_FORM_sec_offset
        | constants::DW_FORM_loclistx
        | constants::DW_FORM_rnglistx => FormFamily::Constant,
        constants::DW_FORM_block
        | constants::DW_FORM_block1
        | constants::DW_FORM_block2
        | constants::DW_FORM_block4
        | constants::DW_FORM_data16 => FormFamily::Block,
        constants::DW_FORM_exprloc => FormFamily::Exprloc,
        constants::DW_FORM_addr
        | constants::DW_FORM_addrx
        | constants::DW_FORM_addrx1
        | constants::DW_FORM_addrx2
        | constants::DW_FORM_addrx3
        | constants::DW_FORM_addrx4
        | constants::DW_FORM_GNU_addr_index => FormFamily::Address,
        constants::DW_FORM_ref1
        | constants::DW_FORM_ref2
        | constants::DW_FORM_ref4
        | constants::DW_FORM_ref8
        | constants::DW_FORM_ref_udata
        | constants::DW_FORM_ref_addr
        | constants::DW_FORM_ref_sig8
        | constants::DW_FORM_ref_sup4
        | constants::DW_FORM_ref_sup8
        | constants::DW_FORM_GNU_ref_alt => FormFamily::Reference,
        _ => FormFamily::Unsupported,
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_names_strip_prefix()
    {
        assert_eq!(tag_name(constants::DW_TAG_subprogram), "subprogram");
        assert_eq!(attr_name(constants::DW_AT_decl_file), "decl_file");
        assert_eq!(form_name(constants::DW_FORM_exprloc), "exprloc");
        assert_eq!(tag_name(DwTag(0x7fff)), UNKNOWN);
    }

    #[test]
    fn test_bucket_positions_match_order()
    {
        for (index, class) in RecordClass::ALL.iter().enumerate() {
            assert_eq!(class.position(), index);
        }
    }
}
