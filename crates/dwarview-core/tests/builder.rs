//! Tests for the incremental tree builder

use dwarview_core::builder::{BuildContext, BuildState, TreeBuilder};
use dwarview_core::demangle::NoDemangler;
use dwarview_core::index::DisplayIndex;
use dwarview_core::names::NameResolver;
use dwarview_core::source::{
    AttrValue, MemoryImage, RawAttribute, Record, RecordOffset, RecordSource, UnitInfo, UnitSummary,
};
use dwarview_core::tree::{DeclMarker, RowData, RowId, TreeModel};
use gimli::constants;

struct Built
{
    tree: TreeModel,
    index: DisplayIndex,
    advances: usize,
}

fn build(image: &dyn RecordSource) -> Built
{
    let names = NameResolver::new(image, &NoDemangler, 16, 32);
    let mut tree = TreeModel::new();
    let mut index = DisplayIndex::default();
    let mut builder = TreeBuilder::new(image.section_size());
    let mut advances = 0;
    while !builder.is_done() {
        let mut ctx = BuildContext {
            names: &names,
            sink: &mut tree,
            index: &mut index,
        };
        builder.advance(&mut ctx);
        advances += 1;
        assert!(advances < 100, "builder does not terminate");
    }
    Built { tree, index, advances }
}

/// Record source that rewires some links of a [`MemoryImage`] to form loops.
struct Rewired
{
    image: MemoryImage,
    siblings: Vec<(RecordOffset, RecordOffset)>,
    children: Vec<(RecordOffset, RecordOffset)>,
}

impl RecordSource for Rewired
{
    fn section_size(&self) -> u64
    {
        self.image.section_size()
    }

    fn address_size(&self) -> u8
    {
        self.image.address_size()
    }

    fn next_unit(&self, offset: u64) -> Option<UnitSummary>
    {
        self.image.next_unit(offset)
    }

    fn record(&self, offset: RecordOffset) -> Option<Record>
    {
        let mut record = self.image.record(offset)?;
        if let Some((_, to)) = self.siblings.iter().find(|(from, _)| *from == offset) {
            record.next_sibling = Some(*to);
        }
        if let Some((_, to)) = self.children.iter().find(|(from, _)| *from == offset) {
            record.first_child = Some(*to);
        }
        Some(record)
    }

    fn unit_info(&self, unit: RecordOffset) -> Option<&UnitInfo>
    {
        self.image.unit_info(unit)
    }
}

fn named(name: &str) -> Vec<RawAttribute>
{
    vec![RawAttribute::string(constants::DW_AT_name, name)]
}

fn names_under(tree: &TreeModel, row: RowId) -> Vec<String>
{
    tree.children(row)
        .iter()
        .filter_map(|child| tree.data(*child))
        .map(|data| data.name.clone())
        .collect()
}

fn bucket(tree: &TreeModel, unit_row: RowId, name: &str) -> RowId
{
    *tree
        .children(unit_row)
        .iter()
        .find(|row| tree.data(**row).is_some_and(|data| data.is_bucket() && data.name == name))
        .expect("bucket row exists")
}

fn row_of(built: &Built, offset: RecordOffset) -> RowId
{
    built.index.offsets.get(offset).expect("record was indexed")
}

#[test]
fn test_unit_row_and_buckets()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let built = build(&image);

    assert_eq!(built.tree.roots().len(), 1);
    let unit_row = built.tree.roots()[0];
    let data = built.tree.data(unit_row).unwrap();
    assert_eq!(data.offset, Some(unit));
    assert_eq!(data.label, "compile_unit");
    assert_eq!(data.name, "main.c");

    let buckets: Vec<&RowData> = built
        .tree
        .children(unit_row)
        .iter()
        .filter_map(|row| built.tree.data(*row))
        .collect();
    assert_eq!(buckets.len(), 4);
    for (data, expected) in buckets.iter().zip(["functions", "variables", "types", "others"]) {
        assert_eq!(data.offset, None);
        assert_eq!(data.label, "meta");
        assert_eq!(data.name, expected);
    }
}

#[test]
fn test_siblings_are_flattened()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let a = image.add_child(unit, constants::DW_TAG_subprogram, named("A"));
    let a1 = image.add_child(a, constants::DW_TAG_lexical_block, named("A1"));
    let b = image.add_child(unit, constants::DW_TAG_subprogram, named("B"));
    let c = image.add_child(unit, constants::DW_TAG_subprogram, named("C"));

    let built = build(&image);
    let unit_row = built.tree.roots()[0];
    let functions = bucket(&built.tree, unit_row, "functions");

    assert_eq!(names_under(&built.tree, functions), ["A", "B", "C"]);
    assert_eq!(names_under(&built.tree, row_of(&built, a)), ["A1"]);
    assert!(built.tree.children(row_of(&built, a1)).is_empty());

    // emission order follows row handles
    let order = [a, a1, b, c].map(|offset| row_of(&built, offset));
    assert!(order.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(built.tree.parent(row_of(&built, a1)), Some(row_of(&built, a)));
    assert_eq!(built.tree.parent(row_of(&built, c)), Some(functions));
}

#[test]
fn test_first_level_children_are_bucketed()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    image.add_child(unit, constants::DW_TAG_variable, named("counter"));
    image.add_child(unit, constants::DW_TAG_base_type, named("int"));
    image.add_child(unit, constants::DW_TAG_namespace, named("std"));
    image.add_child(unit, constants::DW_TAG_subprogram, named("main"));
    image.add_child(unit, constants::DW_TAG_constant, named("LIMIT"));

    let built = build(&image);
    let unit_row = built.tree.roots()[0];
    assert_eq!(names_under(&built.tree, bucket(&built.tree, unit_row, "functions")), ["main"]);
    assert_eq!(
        names_under(&built.tree, bucket(&built.tree, unit_row, "variables")),
        ["counter", "LIMIT"]
    );
    assert_eq!(names_under(&built.tree, bucket(&built.tree, unit_row, "types")), ["int"]);
    assert_eq!(names_under(&built.tree, bucket(&built.tree, unit_row, "others")), ["std"]);
}

#[test]
fn test_nested_records_stay_under_their_parent()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let namespace = image.add_child(unit, constants::DW_TAG_namespace, named("app"));
    let function = image.add_child(namespace, constants::DW_TAG_subprogram, named("run"));
    let local = image.add_child(function, constants::DW_TAG_variable, named("i"));

    let built = build(&image);
    assert_eq!(built.tree.parent(row_of(&built, function)), Some(row_of(&built, namespace)));
    assert_eq!(built.tree.parent(row_of(&built, local)), Some(row_of(&built, function)));

    // nested functions and variables are still searchable
    assert_eq!(built.index.functions.recent(0).map(|entry| entry.name.as_str()), Some("run"));
    assert_eq!(built.index.variables.recent(0).map(|entry| entry.name.as_str()), Some("i"));
}

#[test]
fn test_declaration_markers()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let declared = image.add_child(unit, constants::DW_TAG_subprogram, vec![
        RawAttribute::string(constants::DW_AT_name, "extern_fn"),
        RawAttribute::flag_present(constants::DW_AT_declaration),
    ]);
    let not_declared = image.add_child(unit, constants::DW_TAG_variable, vec![
        RawAttribute::string(constants::DW_AT_name, "defined"),
        RawAttribute::new(constants::DW_AT_declaration, constants::DW_FORM_flag, AttrValue::Flag(false)),
    ]);
    let imported = image.add_child(unit, constants::DW_TAG_imported_declaration, vec![RawAttribute::reference(
        constants::DW_AT_import,
        declared,
    )]);

    let built = build(&image);
    let declared_row = built.tree.data(row_of(&built, declared)).unwrap();
    assert_eq!(declared_row.marker, DeclMarker::Declaration);
    assert_eq!(declared_row.display_name(), "extern_fn (decl)");

    let defined_row = built.tree.data(row_of(&built, not_declared)).unwrap();
    assert_eq!(defined_row.marker, DeclMarker::None);

    let imported_row = built.tree.data(row_of(&built, imported)).unwrap();
    assert_eq!(imported_row.marker, DeclMarker::Imported);
    assert_eq!(imported_row.display_name(), "extern_fn");

    // declarations are indexed and listed, flagged as such
    let entry = built.index.functions.recent(0).unwrap();
    assert_eq!(entry.name, "extern_fn");
    assert!(entry.declaration);
}

#[test]
fn test_offset_index_matches_record_rows()
{
    let mut image = MemoryImage::new();
    let first = image.add_unit("a.c", "/src", &[]);
    let main = image.add_child(first, constants::DW_TAG_subprogram, named("main"));
    image.add_child(main, constants::DW_TAG_formal_parameter, named("argc"));
    let second = image.add_unit("b.c", "/src", &[]);
    image.add_child(second, constants::DW_TAG_variable, named("global"));

    let built = build(&image);
    let record_rows = (0..built.tree.len())
        .filter(|id| built.tree.data(RowId(*id)).is_some_and(|data| !data.is_bucket()))
        .count();
    assert_eq!(built.index.offsets.len(), record_rows);
    assert_eq!(record_rows, 5);
    assert_eq!(built.tree.len(), 5 + 8);

    for id in 0..built.tree.len() {
        let data = built.tree.data(RowId(id)).unwrap();
        if let Some(offset) = data.offset {
            assert_eq!(built.index.offsets.get(offset), Some(RowId(id)));
        }
    }
}

#[test]
fn test_name_lists_skip_placeholders_and_other_kinds()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    image.add_child(unit, constants::DW_TAG_subprogram, named("first"));
    image.add_child(unit, constants::DW_TAG_subprogram, vec![]);
    image.add_child(unit, constants::DW_TAG_structure_type, named("point"));
    image.add_child(unit, constants::DW_TAG_subprogram, named("second"));

    let built = build(&image);
    let names: Vec<_> = built
        .index
        .functions
        .iter_recent()
        .map(|entry| entry.name.as_str())
        .collect();
    assert_eq!(names, ["second", "first"]);
    assert!(built.index.variables.is_empty());
}

#[test]
fn test_missing_record_skips_only_its_branch()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let a = image.add_child(unit, constants::DW_TAG_subprogram, named("A"));
    let a1 = image.add_child(a, constants::DW_TAG_variable, named("A1"));
    image.add_child(a1, constants::DW_TAG_variable, named("A1x"));
    let b = image.add_child(unit, constants::DW_TAG_subprogram, named("B"));
    image.mark_missing(a1);

    let built = build(&image);
    assert!(built.index.offsets.get(a1).is_none());
    assert!(built.tree.children(row_of(&built, a)).is_empty());
    assert!(built.index.offsets.get(b).is_some());
    assert!(built.index.variables.is_empty());
}

#[test]
fn test_unreadable_unit_root_is_skipped()
{
    let mut image = MemoryImage::new();
    let broken = image.add_unit("broken.c", "/src", &[]);
    let fine = image.add_unit("fine.c", "/src", &[]);
    image.mark_missing(broken);

    let built = build(&image);
    assert_eq!(built.tree.roots().len(), 1);
    assert_eq!(built.tree.data(built.tree.roots()[0]).unwrap().offset, Some(fine));
}

#[test]
fn test_one_unit_per_advance()
{
    let mut image = MemoryImage::new();
    let first = image.add_unit("a.c", "/src", &[]);
    image.add_child(first, constants::DW_TAG_subprogram, named("f"));
    let second = image.add_unit("b.c", "/src", &[]);
    image.add_child(second, constants::DW_TAG_subprogram, named("g"));

    let names = NameResolver::new(&image, &NoDemangler, 16, 32);
    let mut tree = TreeModel::new();
    let mut index = DisplayIndex::default();
    let mut builder = TreeBuilder::new(image.section_size());
    assert_eq!(builder.state(), BuildState::AtUnit(0));

    let mut ctx = BuildContext {
        names: &names,
        sink: &mut tree,
        index: &mut index,
    };
    let progress = builder.advance(&mut ctx);
    assert_eq!(progress.units, 1);
    assert_eq!(progress.records, 2);
    assert!(!progress.done);
    assert!(progress.processed < progress.total);

    let progress = builder.advance(&mut ctx);
    assert_eq!(progress.units, 2);
    assert!(!progress.done);

    let progress = builder.advance(&mut ctx);
    assert!(progress.done);
    assert_eq!(progress.percent(), 100);
    assert_eq!(builder.state(), BuildState::Done);
    assert_eq!(tree.roots().len(), 2);
}

#[test]
fn test_build_counts_advances()
{
    let mut image = MemoryImage::new();
    for name in ["a.c", "b.c", "c.c"] {
        image.add_unit(name, "/src", &[]);
    }
    let built = build(&image);
    // one advance per unit plus the one that finds no more units
    assert_eq!(built.advances, 4);
}

#[test]
fn test_cancel_keeps_emitted_rows()
{
    let mut image = MemoryImage::new();
    image.add_unit("a.c", "/src", &[]);
    image.add_unit("b.c", "/src", &[]);

    let names = NameResolver::new(&image, &NoDemangler, 16, 32);
    let mut tree = TreeModel::new();
    let mut index = DisplayIndex::default();
    let mut builder = TreeBuilder::new(image.section_size());
    builder.advance(&mut BuildContext {
        names: &names,
        sink: &mut tree,
        index: &mut index,
    });
    builder.cancel();

    assert!(builder.is_done());
    let progress = builder.advance(&mut BuildContext {
        names: &names,
        sink: &mut tree,
        index: &mut index,
    });
    assert_eq!(progress.units, 1);
    assert_eq!(tree.roots().len(), 1);
}

#[test]
fn test_sibling_loop_emits_each_record_once()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let a = image.add_child(unit, constants::DW_TAG_subprogram, named("A"));
    let b = image.add_child(unit, constants::DW_TAG_subprogram, named("B"));
    let fine = image.add_unit("fine.c", "/src", &[]);
    image.add_child(fine, constants::DW_TAG_variable, named("after"));

    // a record that is its own sibling, and a chain that loops back to its start
    let source = Rewired {
        image,
        siblings: vec![(a, a), (b, a)],
        children: Vec::new(),
    };
    let built = build(&source);

    assert_eq!(built.advances, 3);
    assert_eq!(built.tree.roots().len(), 2);
    let unit_row = built.tree.roots()[0];
    assert_eq!(names_under(&built.tree, bucket(&built.tree, unit_row, "functions")), ["A"]);
    assert_eq!(built.index.functions.len(), 1);
    assert_eq!(built.index.variables.recent(0).map(|entry| entry.name.as_str()), Some("after"));
}

#[test]
fn test_child_loop_ends_the_branch()
{
    let mut image = MemoryImage::new();
    let unit = image.add_unit("main.c", "/src", &[]);
    let outer = image.add_child(unit, constants::DW_TAG_subprogram, named("outer"));
    let inner = image.add_child(outer, constants::DW_TAG_lexical_block, named("inner"));
    let next = image.add_child(unit, constants::DW_TAG_subprogram, named("next"));

    // inner claims its own parent, and the unit root, as children
    let source = Rewired {
        image,
        siblings: vec![(inner, unit)],
        children: vec![(inner, outer)],
    };
    let built = build(&source);

    assert_eq!(names_under(&built.tree, row_of(&built, outer)), ["inner"]);
    assert!(built.tree.children(row_of(&built, inner)).is_empty());
    assert!(built.index.offsets.contains(next));

    let record_rows = (0..built.tree.len())
        .filter(|id| built.tree.data(RowId(*id)).is_some_and(|data| !data.is_bucket()))
        .count();
    assert_eq!(record_rows, 4);
    assert_eq!(built.index.offsets.len(), record_rows);
}
