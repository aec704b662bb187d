//! Tests for the type crawler, run against hand-built symbol trees

use refinery_core::symbols::{
    BaseTypeCode, InMemorySymbolSource, LocationKind, SymbolIndexId, SymbolProperty, SymbolRecord, SymbolTag,
};
use refinery_core::types::{CvFlags, Type, TypeKind, TypeRepository};
use refinery_core::{RefineryError, TypeCrawler};

fn crawl(source: InMemorySymbolSource) -> TypeRepository
{
    let mut repo = TypeRepository::new();
    TypeCrawler::with_source(source).get_types(&mut repo).unwrap();
    repo
}

fn crawl_err(source: InMemorySymbolSource) -> RefineryError
{
    let mut repo = TypeRepository::new();
    TypeCrawler::with_source(source).get_types(&mut repo).unwrap_err()
}

fn pointer_named<'a>(repo: &'a TypeRepository, name: &str) -> &'a Type
{
    repo.types_of_kind(TypeKind::Pointer)
        .find(|ty| ty.name() == name)
        .unwrap_or_else(|| panic!("no pointer named {name}"))
}

#[test]
fn test_point_end_to_end()
{
    let mut source = InMemorySymbolSource::new();
    let int = source.add_base_type(BaseTypeCode::Int, 4);
    let point = source.add_udt("Point", 8);
    source.add_member(point, "x", 0, int);
    source.add_member(point, "y", 4, int);

    let repo = crawl(source);
    assert_eq!(repo.len(), 2);

    let point = repo.find_by_name("Point").unwrap().as_user_defined().unwrap();
    assert!(point.is_finalized());
    assert_eq!(point.size(), 8);
    let fields = point.fields();
    assert_eq!(fields.len(), 2);
    assert_eq!((fields[0].name(), fields[0].offset()), ("x", 0));
    assert_eq!((fields[1].name(), fields[1].offset()), ("y", 4));
    assert_eq!(fields[0].type_id(), fields[1].type_id());

    let int = repo.get_type(fields[0].type_id()).unwrap();
    assert_eq!(int.kind(), TypeKind::Basic);
    assert_eq!(int.name(), "int32_t");
    assert_eq!(int.size(), 4);
}

#[test]
fn test_self_referential_struct()
{
    let mut source = InMemorySymbolSource::new();
    let node = source.add_udt("Node", 8);
    let node_ptr = source.add_pointer(8, Some(node));
    source.add_member(node, "next", 0, node_ptr);

    let repo = crawl(source);
    assert_eq!(repo.len(), 2);

    let node = repo.find_by_name("Node").unwrap();
    let udt = node.as_user_defined().unwrap();
    let ptr = repo.field_type(udt, 0).unwrap().as_pointer().unwrap();
    assert_eq!(ptr.content_type_id(), node.type_id());
    assert_eq!(ptr.name(), "Node*");
}

#[test]
fn test_duplicate_listing_is_a_no_op()
{
    let mut source = InMemorySymbolSource::new();
    let int = source.add_base_type(BaseTypeCode::Int, 4);
    let point = source.add_udt("Point", 8);
    source.add_member(point, "x", 0, int);
    let global = source.global();
    source.list_again(global, point);
    source.list_again(global, point);

    let repo = crawl(source);
    assert_eq!(repo.len(), 2);
    let point = repo.find_by_name("Point").unwrap().as_user_defined().unwrap();
    assert_eq!(point.fields().len(), 1);
}

#[test]
fn test_shared_identity_yields_one_type()
{
    let mut source = InMemorySymbolSource::new();
    let first = source.add_udt("Twin", 4);
    let second = source.add_udt("Twin", 4);
    source.record_mut(first).unwrap().index_id = Some(SymbolIndexId(0x1000));
    source.record_mut(second).unwrap().index_id = Some(SymbolIndexId(0x1000));

    let repo = crawl(source);
    assert_eq!(repo.types_of_kind(TypeKind::UserDefined).count(), 1);
}

#[test]
fn test_pointer_naming()
{
    let mut source = InMemorySymbolSource::new();
    let int = source.add_base_type(BaseTypeCode::Int, 4);
    let cv_int = source.add_qualified(int, CvFlags::CONST | CvFlags::VOLATILE).unwrap();
    let int_ptr = source.add_pointer(8, Some(int));
    source.add_pointer(8, Some(cv_int));
    source.add_pointer(8, Some(int_ptr));
    source.add_pointer(8, None);

    let repo = crawl(source);
    let int_ptr = pointer_named(&repo, "int32_t*").as_pointer().unwrap();
    assert!(int_ptr.flags().is_empty());

    let cv_ptr = pointer_named(&repo, "int32_t const volatile*").as_pointer().unwrap();
    assert!(cv_ptr.is_const());
    assert!(cv_ptr.is_volatile());

    let ptr_ptr = pointer_named(&repo, "int32_t**").as_pointer().unwrap();
    assert_eq!(repo.content_type(ptr_ptr).unwrap().name(), "int32_t*");

    let untyped = pointer_named(&repo, "*").as_pointer().unwrap();
    assert!(untyped.content_type_id().is_none());

    assert!(repo.types_of_kind(TypeKind::Pointer).all(|ty| !ty.name().is_empty()));
}

#[test]
fn test_pointer_to_pointer_listed_before_its_content()
{
    let mut source = InMemorySymbolSource::new();
    let int = source.add_base_type(BaseTypeCode::Int, 4);
    let inner = source.add_detached(SymbolRecord::new(SymbolTag::PointerType).with_length(8).with_type(int));
    source.add_pointer(8, Some(inner));
    let global = source.global();
    source.list_again(global, inner);

    let repo = crawl(source);
    assert_eq!(repo.types_of_kind(TypeKind::Pointer).count(), 2);
    pointer_named(&repo, "int32_t*");
    pointer_named(&repo, "int32_t**");
}

#[test]
fn test_bitfield_fidelity()
{
    let mut source = InMemorySymbolSource::new();
    let uint = source.add_base_type(BaseTypeCode::UInt, 4);
    let flags = source.add_udt("Flags", 4);
    source.add_bitfield(flags, "mode", 0, 3, 5, uint);

    let repo = crawl(source);
    let flags = repo.find_by_name("Flags").unwrap().as_user_defined().unwrap();
    let field = &flags.fields()[0];
    assert!(field.is_bitfield());
    assert_eq!(field.bit_pos(), 3);
    assert_eq!(field.bit_len(), 5);
    assert_eq!(field.offset(), 0);
    assert_eq!(repo.get_type(field.type_id()).unwrap().name(), "uint32_t");
}

#[test]
fn test_field_flags_come_from_the_field_type()
{
    let mut source = InMemorySymbolSource::new();
    let int = source.add_base_type(BaseTypeCode::Int, 4);
    let const_int = source.add_qualified(int, CvFlags::CONST).unwrap();
    let holder = source.add_udt("Holder", 8);
    source.add_member(holder, "fixed", 0, const_int);
    source.add_member(holder, "free", 4, int);

    let repo = crawl(source);
    let holder = repo.find_by_name("Holder").unwrap().as_user_defined().unwrap();
    assert!(holder.fields()[0].is_const());
    assert!(!holder.fields()[1].is_const());
    // `const int` has its own identity, hence its own entity.
    assert_ne!(holder.fields()[0].type_id(), holder.fields()[1].type_id());
}

#[test]
fn test_non_member_children_are_skipped()
{
    let mut source = InMemorySymbolSource::new();
    let int = source.add_base_type(BaseTypeCode::Int, 4);
    let udt = source.add_udt("Counter", 4);
    source.add_member(udt, "value", 0, int);
    let mut shared = SymbolRecord::new(SymbolTag::Data).named("instances").with_type(int);
    shared.data_kind = refinery_core::symbols::DataKind::StaticMember;
    shared.location_kind = LocationKind::Static;
    source.add(udt, shared);
    source.add(udt, SymbolRecord::new(SymbolTag::Function).named("increment"));

    let repo = crawl(source);
    let udt = repo.find_by_name("Counter").unwrap().as_user_defined().unwrap();
    assert_eq!(udt.fields().len(), 1);
    assert_eq!(udt.fields()[0].name(), "value");
}

#[test]
fn test_wildcards()
{
    let mut source = InMemorySymbolSource::new();
    let int = source.add_base_type(BaseTypeCode::Int, 4);
    source.add_enum("Color", 4);
    source.add_typedef("DWORD", int);
    let array = source.add_array(int, 16);
    source.record_mut(array).unwrap().name = "int32_t[4]".to_string();
    let table = source.add_udt("Table", 16);
    source.add_member(table, "cells", 0, array);

    let repo = crawl(source);
    let color = repo.find_by_name("Color").unwrap();
    assert_eq!((color.kind(), color.size()), (TypeKind::Wildcard, 4));
    let dword = repo.find_by_name("DWORD").unwrap();
    assert_eq!((dword.kind(), dword.size()), (TypeKind::Wildcard, 0));
    let cells = repo.find_by_name("int32_t[4]").unwrap();
    assert_eq!((cells.kind(), cells.size()), (TypeKind::Wildcard, 16));
}

#[test]
fn test_void_has_zero_size()
{
    let mut source = InMemorySymbolSource::new();
    let void = source.add_base_type(BaseTypeCode::Void, 0);
    source.add_pointer(8, Some(void));

    let repo = crawl(source);
    let void = repo.find_by_name("void").unwrap();
    assert_eq!(void.size(), 0);
    pointer_named(&repo, "void*");
}

#[test]
fn test_unmapped_base_type_fails_the_crawl()
{
    let mut source = InMemorySymbolSource::new();
    let wide = source.add_base_type(BaseTypeCode::Int, 16);
    let udt = source.add_udt("Wide", 16);
    source.add_member(udt, "value", 0, wide);

    assert!(matches!(
        crawl_err(source),
        RefineryError::UnmappedBaseType {
            code: BaseTypeCode::Int,
            length: 16,
        }
    ));
}

#[test]
fn test_injected_failures_fail_the_crawl()
{
    let properties = [
        SymbolProperty::Name,
        SymbolProperty::Length,
        SymbolProperty::Tag,
        SymbolProperty::IndexId,
        SymbolProperty::Children,
    ];
    for property in properties {
        let mut source = InMemorySymbolSource::new();
        let int = source.add_base_type(BaseTypeCode::Int, 4);
        let point = source.add_udt("Point", 8);
        source.add_member(point, "x", 0, int);
        source.fail(point, property);

        match crawl_err(source) {
            RefineryError::SymbolQuery { property: failed, .. } => assert_eq!(failed, property),
            other => panic!("expected a symbol query failure, got {other}"),
        }
    }
}

#[test]
fn test_member_failures_fail_the_crawl()
{
    let properties = [
        SymbolProperty::LocationKind,
        SymbolProperty::Offset,
        SymbolProperty::Type,
        SymbolProperty::DataKind,
    ];
    for property in properties {
        let mut source = InMemorySymbolSource::new();
        let int = source.add_base_type(BaseTypeCode::Int, 4);
        let point = source.add_udt("Point", 8);
        let x = source.add_member(point, "x", 0, int);
        source.fail(x, property);

        assert!(matches!(crawl_err(source), RefineryError::SymbolQuery { .. }));
    }

    let mut source = InMemorySymbolSource::new();
    let int = source.add_base_type(BaseTypeCode::Int, 4);
    let point = source.add_udt("Point", 8);
    source.add_member(point, "x", 0, int);
    source.fail(int, SymbolProperty::BaseType);
    assert!(matches!(crawl_err(source), RefineryError::SymbolQuery { .. }));
}

#[test]
fn test_member_without_type_fails()
{
    let mut source = InMemorySymbolSource::new();
    let udt = source.add_udt("Broken", 4);
    let mut record = SymbolRecord::new(SymbolTag::Data).named("orphan");
    record.data_kind = refinery_core::symbols::DataKind::Member;
    record.location_kind = LocationKind::ThisRel;
    source.add(udt, record);

    assert!(matches!(
        crawl_err(source),
        RefineryError::SymbolQuery {
            property: SymbolProperty::Type,
            ..
        }
    ));
}

#[test]
fn test_unexpected_member_location_fails()
{
    let mut source = InMemorySymbolSource::new();
    let int = source.add_base_type(BaseTypeCode::Int, 4);
    let udt = source.add_udt("Odd", 4);
    let member = source.add_member(udt, "reg", 0, int);
    source.record_mut(member).unwrap().location_kind = LocationKind::Enregistered;

    assert!(matches!(
        crawl_err(source),
        RefineryError::UnexpectedLocation {
            location: LocationKind::Enregistered,
            ..
        }
    ));
}

#[test]
fn test_full_width_bitfield()
{
    let mut source = InMemorySymbolSource::new();
    let uint = source.add_base_type(BaseTypeCode::UInt, 8);
    let udt = source.add_udt("Huge", 16);
    source.add_bitfield(udt, "all", 0, 0, 64, uint);
    source.add_bitfield(udt, "top", 8, 63, 1, uint);

    let repo = crawl(source);
    let huge = repo.find_by_name("Huge").unwrap().as_user_defined().unwrap();
    let fields = huge.fields();
    assert_eq!((fields[0].bit_pos(), fields[0].bit_len()), (0, 64));
    assert_eq!((fields[1].offset(), fields[1].bit_pos(), fields[1].bit_len()), (8, 63, 1));
}

#[test]
fn test_bit_range_past_storage_fails()
{
    let mut source = InMemorySymbolSource::new();
    let uint = source.add_base_type(BaseTypeCode::UInt, 8);
    let udt = source.add_udt("Spill", 8);
    source.add_bitfield(udt, "tail", 0, 60, 8, uint);

    assert!(matches!(
        crawl_err(source),
        RefineryError::InvalidBitfield {
            bit_position: 60,
            bit_length: 8,
            ..
        }
    ));
}

#[test]
fn test_bit_length_beyond_u8_fails()
{
    let mut source = InMemorySymbolSource::new();
    let uint = source.add_base_type(BaseTypeCode::UInt, 8);
    let udt = source.add_udt("Wide", 8);
    source.add_bitfield(udt, "wide", 0, 0, 300, uint);

    assert!(matches!(
        crawl_err(source),
        RefineryError::InvalidBitfield { bit_length: 300, .. }
    ));
}

#[test]
fn test_unsupported_field_type_fails()
{
    let mut source = InMemorySymbolSource::new();
    let block = source.add_detached(SymbolRecord::new(SymbolTag::Block));
    let udt = source.add_udt("Scoped", 4);
    source.add_member(udt, "body", 0, block);

    assert!(matches!(
        crawl_err(source),
        RefineryError::UnsupportedSymbolTag(SymbolTag::Block)
    ));
}
