//! Tests for name resolution and type descriptions

use dwarview_core::decode::types::{TypeNamer, NO_TYPE};
use dwarview_core::demangle::{BuiltinDemangler, Demangler, DemanglerKind, NoDemangler};
use dwarview_core::names::{NameResolver, NO_NAME};
use dwarview_core::source::{AttrValue, MemoryImage, RawAttribute, RecordOffset, RecordSource};
use gimli::constants;

const MANGLED: &str = "_ZN4core3fmt5write17h0123456789abcdefE";

fn resolve_with(image: &MemoryImage, demangler: &dyn Demangler, offset: RecordOffset) -> String
{
    NameResolver::new(image, demangler, 16, 32)
        .resolve_offset(offset)
        .expect("record exists")
}

fn describe(image: &MemoryImage, offset: RecordOffset) -> String
{
    TypeNamer::new(image, 32).describe_offset(offset).expect("record exists")
}

fn named(name: &str) -> Vec<RawAttribute>
{
    vec![RawAttribute::string(constants::DW_AT_name, name)]
}

fn typed(target: RecordOffset) -> Vec<RawAttribute>
{
    vec![RawAttribute::reference(constants::DW_AT_type, target)]
}

/// Demangler that upper-cases its input.
struct Shouting;

impl Demangler for Shouting
{
    fn is_available(&self) -> bool
    {
        true
    }

    fn demangle(&self, mangled: &str) -> String
    {
        mangled.to_uppercase()
    }
}

#[test]
fn test_direct_name_wins_over_linkage_name()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("lib.rs", "/src", &[]);
    let function = image.add_child(unit, constants::DW_TAG_subprogram, vec![
        RawAttribute::string(constants::DW_AT_linkage_name, MANGLED),
        RawAttribute::string(constants::DW_AT_name, "write"),
    ]);

    assert_eq!(resolve_with(&image, &Shouting, function), "write");
}

#[test]
fn test_linkage_name_is_demangled()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("lib.rs", "/src", &[]);
    let function = image.add_child(unit, constants::DW_TAG_subprogram, vec![RawAttribute::string(
        constants::DW_AT_linkage_name,
        MANGLED,
    )]);

    assert_eq!(resolve_with(&image, &BuiltinDemangler, function), "core::fmt::write");
}

#[test]
fn test_cpp_linkage_name_is_demangled_by_default()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("foo.cc", "/src", &[]);
    let function = image.add_child(unit, constants::DW_TAG_subprogram, vec![RawAttribute::string(
        constants::DW_AT_linkage_name,
        "_ZN3foo3barEv",
    )]);

    let demangler = DemanglerKind::default().create();
    assert_eq!(resolve_with(&image, demangler.as_ref(), function), "foo::bar()");
}

#[test]
fn test_mips_linkage_name_is_demangled()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("a.cc", "/src", &[]);
    let function = image.add_child(unit, constants::DW_TAG_subprogram, vec![RawAttribute::string(
        constants::DW_AT_MIPS_linkage_name,
        "_Z3foov",
    )]);

    assert_eq!(resolve_with(&image, &Shouting, function), "_Z3FOOV");
}

#[test]
fn test_linkage_name_without_demangler_falls_through()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("lib.rs", "/src", &[]);
    let declaration = image.add_child(unit, constants::DW_TAG_subprogram, named("write"));
    let only_linkage = image.add_child(unit, constants::DW_TAG_subprogram, vec![RawAttribute::string(
        constants::DW_AT_linkage_name,
        MANGLED,
    )]);
    let with_origin = image.add_child(unit, constants::DW_TAG_subprogram, vec![
        RawAttribute::string(constants::DW_AT_linkage_name, MANGLED),
        RawAttribute::reference(constants::DW_AT_specification, declaration),
    ]);

    assert_eq!(resolve_with(&image, &NoDemangler, only_linkage), NO_NAME);
    assert_eq!(resolve_with(&image, &NoDemangler, with_origin), "write");
}

#[test]
fn test_chase_through_origin_chain()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let declaration = image.add_child(unit, constants::DW_TAG_subprogram, named("compute"));
    let definition = image.add_child(unit, constants::DW_TAG_subprogram, vec![RawAttribute::reference(
        constants::DW_AT_specification,
        declaration,
    )]);
    let inlined = image.add_child(unit, constants::DW_TAG_inlined_subroutine, vec![RawAttribute::reference(
        constants::DW_AT_abstract_origin,
        definition,
    )]);
    let imported = image.add_child(unit, constants::DW_TAG_imported_declaration, vec![RawAttribute::reference(
        constants::DW_AT_import,
        declaration,
    )]);

    assert_eq!(resolve_with(&image, &NoDemangler, inlined), "compute");
    assert_eq!(resolve_with(&image, &NoDemangler, imported), "compute");
}

#[test]
fn test_ambiguous_chase_stops()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let first = image.add_child(unit, constants::DW_TAG_subprogram, named("first"));
    let second = image.add_child(unit, constants::DW_TAG_subprogram, named("second"));
    let both = image.add_child(unit, constants::DW_TAG_subprogram, vec![
        RawAttribute::reference(constants::DW_AT_abstract_origin, first),
        RawAttribute::reference(constants::DW_AT_specification, second),
    ]);

    assert_eq!(resolve_with(&image, &NoDemangler, both), NO_NAME);
}

#[test]
fn test_cyclic_origin_chain_is_bounded()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let a = image.add_child(unit, constants::DW_TAG_subprogram, vec![]);
    let b = image.add_child(unit, constants::DW_TAG_subprogram, vec![RawAttribute::reference(
        constants::DW_AT_abstract_origin,
        a,
    )]);
    assert!(image.push_attribute(a, RawAttribute::reference(constants::DW_AT_abstract_origin, b)));

    assert_eq!(resolve_with(&image, &BuiltinDemangler, a), NO_NAME);
}

#[test]
fn test_chase_into_missing_record()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let gone = image.add_child(unit, constants::DW_TAG_subprogram, named("gone"));
    let user = image.add_child(unit, constants::DW_TAG_subprogram, vec![RawAttribute::reference(
        constants::DW_AT_abstract_origin,
        gone,
    )]);
    image.mark_missing(gone);

    assert_eq!(resolve_with(&image, &BuiltinDemangler, user), NO_NAME);
}

#[test]
fn test_type_records_use_type_namer()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let point = image.add_child(unit, constants::DW_TAG_structure_type, named("point"));
    let pointer = image.add_child(unit, constants::DW_TAG_pointer_type, typed(point));

    assert_eq!(resolve_with(&image, &NoDemangler, point), "struct point");
    assert_eq!(resolve_with(&image, &NoDemangler, pointer), "pointer to struct point");
}

#[test]
fn test_named_and_anonymous_aggregates()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let union = image.add_child(unit, constants::DW_TAG_union_type, vec![]);
    let class = image.add_child(unit, constants::DW_TAG_class_type, named("Widget"));
    let color = image.add_child(unit, constants::DW_TAG_enumeration_type, named("color"));
    let callback = image.add_child(unit, constants::DW_TAG_subroutine_type, vec![]);
    let size_t = image.add_child(unit, constants::DW_TAG_typedef, named("size_t"));

    assert_eq!(describe(&image, union), "anonymous union");
    assert_eq!(describe(&image, class), "class Widget");
    assert_eq!(describe(&image, color), "enum color");
    assert_eq!(describe(&image, callback), "anonymous function");
    assert_eq!(describe(&image, size_t), "size_t");
}

#[test]
fn test_declaration_stub_follows_signature()
{
    let mut image = MemoryImage::new();
    let types = image.add_unit("", "/src", &[]);
    let point = image.add_child(types, constants::DW_TAG_structure_type, named("Point"));
    let unit = image.add_unit("main.cc", "/src", &[]);
    let stub = image.add_child(unit, constants::DW_TAG_structure_type, vec![
        RawAttribute::flag_present(constants::DW_AT_declaration),
        RawAttribute::new(constants::DW_AT_signature, constants::DW_FORM_ref_sig8, AttrValue::Reference(point)),
    ]);
    let pointer = image.add_child(unit, constants::DW_TAG_pointer_type, typed(stub));

    assert_eq!(describe(&image, stub), "struct Point");
    assert_eq!(describe(&image, pointer), "pointer to struct Point");
}

#[test]
fn test_modifier_phrases()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let char_type = image.add_child(unit, constants::DW_TAG_base_type, named("char"));
    let volatile = image.add_child(unit, constants::DW_TAG_volatile_type, typed(char_type));
    let restrict = image.add_child(unit, constants::DW_TAG_restrict_type, typed(volatile));
    let array = image.add_child(unit, constants::DW_TAG_array_type, typed(char_type));
    let reference = image.add_child(unit, constants::DW_TAG_reference_type, typed(array));
    let rvalue = image.add_child(unit, constants::DW_TAG_rvalue_reference_type, typed(char_type));

    assert_eq!(describe(&image, restrict), "restrict volatile char");
    assert_eq!(describe(&image, reference), "reference to array of char");
    assert_eq!(describe(&image, rvalue), "reference to char");
}

#[test]
fn test_no_type_and_unknown_modifier()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let void_pointer = image.add_child(unit, constants::DW_TAG_pointer_type, vec![]);
    let int = image.add_child(unit, constants::DW_TAG_base_type, named("int"));
    let member_pointer = image.add_child(unit, constants::DW_TAG_ptr_to_member_type, typed(int));
    let const_member = image.add_child(unit, constants::DW_TAG_const_type, typed(member_pointer));

    assert_eq!(describe(&image, void_pointer), NO_TYPE);
    assert_eq!(describe(&image, member_pointer), "unknown type (0x1f)");
    assert_eq!(describe(&image, const_member), "const unknown type (0x1f)");
}

#[test]
fn test_cyclic_type_chain_terminates()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let a = image.add_child(unit, constants::DW_TAG_pointer_type, vec![]);
    let b = image.add_child(unit, constants::DW_TAG_const_type, typed(a));
    assert!(image.push_attribute(a, RawAttribute::reference(constants::DW_AT_type, b)));

    assert_eq!(describe(&image, a), NO_TYPE);
    assert_eq!(describe(&image, b), NO_TYPE);
}

#[test]
fn test_deep_type_chain_hits_depth_bound()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let mut current = image.add_child(unit, constants::DW_TAG_base_type, named("int"));
    for _ in 0..40 {
        current = image.add_child(unit, constants::DW_TAG_pointer_type, typed(current));
    }

    assert_eq!(TypeNamer::new(&image, 8).describe_offset(current).as_deref(), Some(NO_TYPE));
    assert!(TypeNamer::new(&image, 64)
        .describe_offset(current)
        .is_some_and(|text| text.ends_with("pointer to int")));
}

#[test]
fn test_unit_root_name()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    assert_eq!(image.record(unit).and_then(|record| record.name().map(str::to_string)), Some("main.c".to_string()));
    assert_eq!(resolve_with(&image, &NoDemangler, unit), "main.c");
}
