//! Graph construction: registration, parent resolution, post-load passes.

mod common;

use std::io::Cursor;

use common::{
    capture_with_frame_section, create_texture2d, driver_init, initial_contents_texture2d,
    set_resource_name, standard_frame_section, FrameSectionBuilder,
};
use rdc_capture::{CaptureFile, ChunkPayload, ChunkTag, RdcError, ResourceViewDesc};

fn load(frame: Vec<u8>) -> CaptureFile {
    CaptureFile::load(Cursor::new(capture_with_frame_section(&frame))).unwrap()
}

#[test]
fn set_resource_name_lands_on_resolved_parent_only() {
    let capture = load(standard_frame_section());
    let graph = capture.chunk_manager().unwrap();

    let named = graph.resource_chunk(100).unwrap();
    assert_eq!(named.name.as_deref(), Some("Albedo"));
    let unnamed = graph.resource_chunk(101).unwrap();
    assert_eq!(unnamed.name, None);

    // The name chunk is linked back as a child of the resource it named.
    let name_chunk_index = named.children[0];
    let name_chunk = &graph.chunks()[name_chunk_index];
    assert_eq!(name_chunk.tag(), ChunkTag::SET_RESOURCE_NAME);
    assert_eq!(name_chunk.parent, Some(2));
}

#[test]
fn event_ids_anchor_at_capture_begin() {
    let capture = load(standard_frame_section());
    let graph = capture.chunk_manager().unwrap();

    assert_eq!(graph.capture_begin_index(), Some(2));
    let events: Vec<u32> = graph.chunks().iter().map(|c| c.event_id()).collect();
    assert_eq!(events, [0, 0, 1, 2, 3]);
    let indices: Vec<u32> = graph.chunks().iter().map(|c| c.index()).collect();
    assert_eq!(indices, [1, 2, 3, 4, 5]);
}

#[test]
fn chunk_records_are_64_byte_aligned() {
    let capture = load(standard_frame_section());
    for chunk in capture.chunk_manager().unwrap().chunks() {
        assert_eq!(chunk.meta.offset % 64, 0);
        assert_eq!(chunk.meta.padded_end() % 64, 0);
    }
}

#[test]
fn consumer_before_creator_stays_unresolved() {
    let frame = FrameSectionBuilder::new()
        .chunk(ChunkTag::SET_RESOURCE_NAME, |w| {
            set_resource_name(w, 100, "too early");
        })
        .chunk(ChunkTag::CREATE_TEXTURE_2D, |w| {
            create_texture2d(w, 100, 8, 8, 28, 32, None);
        })
        .finish();
    let capture = load(frame);
    let graph = capture.chunk_manager().unwrap();

    let name_chunk = &graph.chunks()[0];
    assert_eq!(name_chunk.parent, None);
    let tex = graph.resource_chunk(100).unwrap();
    assert_eq!(tex.name, None);
    assert!(tex.children.is_empty());
}

#[test]
fn duplicate_resource_id_is_section_corruption() {
    let frame = FrameSectionBuilder::new()
        .chunk(ChunkTag::CREATE_TEXTURE_2D, |w| {
            create_texture2d(w, 7, 8, 8, 28, 32, None);
        })
        .chunk(ChunkTag::CREATE_TEXTURE_2D, |w| {
            create_texture2d(w, 7, 8, 8, 28, 32, None);
        })
        .finish();

    let capture = CaptureFile::load(Cursor::new(capture_with_frame_section(&frame))).unwrap();
    let section = capture.frame_capture();
    assert!(section.manager().is_none());
    assert!(matches!(
        section.chunk_error(),
        Some(RdcError::DuplicateResourceId(7))
    ));
}

#[test]
fn initial_contents_registers_against_target() {
    let pixels: Vec<u8> = (0..8 * 8 * 4).map(|i| (i & 0xff) as u8).collect();
    let frame = FrameSectionBuilder::new()
        .chunk(ChunkTag::CREATE_TEXTURE_2D, |w| {
            create_texture2d(w, 42, 8, 8, 28, 32, None);
        })
        .chunk(ChunkTag::INITIAL_CONTENTS, |w| {
            initial_contents_texture2d(w, 42, 32, &pixels);
        })
        .finish();
    let capture = load(frame);
    let graph = capture.chunk_manager().unwrap();

    let ic = graph.initial_contents_chunk(42).unwrap();
    let ChunkPayload::InitialContents(contents) = &ic.payload else {
        panic!("expected initial contents payload");
    };
    assert_eq!(contents.subresources.len(), 1);
    let sub = contents.subresources[0];
    assert_eq!(sub.row_pitch, 32);
    assert_eq!(sub.slice_pitch, 32 * 8);
    assert_eq!(sub.len, pixels.len() as u64);
    assert_eq!(sub.offset % 64, 0);

    // The locator points at the actual bytes in the section buffer.
    let data = capture.frame_capture().data();
    let located = &data[sub.offset as usize..(sub.offset + sub.len) as usize];
    assert_eq!(located, pixels.as_slice());
}

#[test]
fn duplicate_initial_contents_is_section_corruption() {
    let pixels = vec![0u8; 8 * 8 * 4];
    let frame = FrameSectionBuilder::new()
        .chunk(ChunkTag::CREATE_TEXTURE_2D, |w| {
            create_texture2d(w, 42, 8, 8, 28, 32, None);
        })
        .chunk(ChunkTag::INITIAL_CONTENTS, |w| {
            initial_contents_texture2d(w, 42, 32, &pixels);
        })
        .chunk(ChunkTag::INITIAL_CONTENTS, |w| {
            initial_contents_texture2d(w, 42, 32, &pixels);
        })
        .finish();

    let capture = CaptureFile::load(Cursor::new(capture_with_frame_section(&frame))).unwrap();
    let section = capture.frame_capture();
    assert!(section.manager().is_none());
    assert!(matches!(
        section.chunk_error(),
        Some(RdcError::DuplicateInitialContents(42))
    ));
}

#[test]
fn initial_contents_for_undecoded_resource_is_tolerated() {
    let frame = FrameSectionBuilder::new()
        .chunk(ChunkTag::INITIAL_CONTENTS, |w| {
            // Target 900 was never registered; the payload stays minimal
            // and the parser resynchronises from the declared length.
            w.u32(5);
            w.u64(900);
            w.u32(1);
            w.u8(0);
            w.u32(32);
            w.bytes_array(&[0xaa; 64]);
        })
        .chunk(ChunkTag::CREATE_TEXTURE_2D, |w| {
            create_texture2d(w, 43, 4, 4, 28, 16, None);
        })
        .finish();
    let capture = load(frame);
    let graph = capture.chunk_manager().unwrap();

    assert_eq!(graph.len(), 2);
    assert!(graph.initial_contents_chunk(900).is_none());
    assert!(graph.resource_chunk(43).is_some());
}

#[test]
fn unknown_tags_decode_to_opaque_chunks() {
    let frame = FrameSectionBuilder::new()
        .chunk(ChunkTag(1999), |w| w.bytes(&[0xab; 100]))
        .chunk(ChunkTag::CREATE_TEXTURE_2D, |w| {
            create_texture2d(w, 5, 4, 4, 28, 16, None);
        })
        .finish();
    let capture = load(frame);
    let graph = capture.chunk_manager().unwrap();

    assert_eq!(graph.len(), 2);
    let unknown = &graph.chunks()[0];
    assert!(matches!(unknown.payload, ChunkPayload::Opaque));
    assert_eq!(unknown.resource_id, 0);
    assert!(graph.resource_chunk(5).is_some());
}

#[test]
fn views_resolve_their_target_resource() {
    let frame = FrameSectionBuilder::new()
        .chunk(ChunkTag::CREATE_TEXTURE_2D, |w| {
            create_texture2d(w, 10, 8, 8, 28, 32, None);
        })
        .chunk(ChunkTag::CREATE_RENDER_TARGET_VIEW, |w| {
            common::create_render_target_view(w, 11, 10);
        })
        .finish();
    let capture = load(frame);
    let graph = capture.chunk_manager().unwrap();

    let view = graph.resource_chunk(11).unwrap();
    assert_eq!(view.parent, Some(0));
    assert!(matches!(
        &view.payload,
        ChunkPayload::ResourceView(view)
            if matches!(view.desc, Some(ResourceViewDesc::RenderTarget(_)))
    ));
    assert_eq!(graph.resource_chunk(10).unwrap().children, [1]);
}

#[test]
fn buffer_initial_bytes_are_located_inline() {
    let bytes: Vec<u8> = (0u8..=255).collect();
    let frame = FrameSectionBuilder::new()
        .chunk(ChunkTag::CREATE_BUFFER, |w| {
            common::create_buffer(w, 20, Some(&bytes));
        })
        .finish();
    let capture = load(frame);
    let graph = capture.chunk_manager().unwrap();

    let buffer = graph.resource_chunk(20).unwrap();
    let ChunkPayload::CreateBuffer(payload) = &buffer.payload else {
        panic!("expected create buffer payload");
    };
    assert_eq!(payload.desc.byte_width, 256);
    assert_eq!(payload.initial_data.len(), 1);
    let sub = payload.initial_data[0];
    let data = capture.frame_capture().data();
    assert_eq!(&data[sub.offset as usize..][..sub.len as usize], bytes.as_slice());
}

#[test]
fn update_subresource_locates_its_contents() {
    let pixels = vec![0x77u8; 8 * 8 * 4];
    let frame = FrameSectionBuilder::new()
        .chunk(ChunkTag::CREATE_TEXTURE_2D, |w| {
            create_texture2d(w, 30, 8, 8, 28, 32, None);
        })
        .chunk(ChunkTag::UPDATE_SUBRESOURCE, |w| {
            common::update_subresource(w, 30, 32, &pixels);
        })
        .finish();
    let capture = load(frame);
    let graph = capture.chunk_manager().unwrap();

    let update = &graph.chunks()[1];
    assert_eq!(update.parent, Some(0));
    let ChunkPayload::UpdateSubresource(upd) = &update.payload else {
        panic!("expected update subresource payload");
    };
    assert!(upd.is_update);
    assert!(!upd.box_present);
    assert_eq!(upd.row_pitch, 32);
    assert_eq!(upd.len, pixels.len() as u64);
    let data = capture.frame_capture().data();
    assert_eq!(&data[upd.offset as usize..][..upd.len as usize], pixels.as_slice());
}

#[test]
fn driver_init_exposes_adapter_description() {
    let frame = FrameSectionBuilder::new()
        .chunk(ChunkTag::DRIVER_INIT, |w| {
            driver_init(w, "AMD Radeon RX 580");
        })
        .finish();
    let capture = load(frame);
    let graph = capture.chunk_manager().unwrap();

    let init = graph.driver_init_chunk().unwrap();
    let ChunkPayload::DriverInit(params) = &init.payload else {
        panic!("expected driver init payload");
    };
    assert_eq!(params.adapter_desc.description, "AMD Radeon RX 580");
    assert_eq!(params.adapter_desc.description_slot.max_len, 17);
    assert_eq!(params.adapter_desc.vendor_id, 0x10de);
    assert_eq!(params.feature_levels, [0xb000]);
}

#[test]
fn creation_time_texture_data_is_located_not_copied() {
    let capture = load(standard_frame_section());
    let graph = capture.chunk_manager().unwrap();

    let (desc, subs) = graph.texture_subresources(100).unwrap();
    assert_eq!(desc.width, 16);
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].len, 16 * 16 * 4);
    assert_eq!(subs[0].offset % 64, 0);

    let expected: Vec<u8> = (0..16 * 16 * 4).map(|i| (i % 251) as u8).collect();
    let data = capture.frame_capture().data();
    let located = &data[subs[0].offset as usize..][..subs[0].len as usize];
    assert_eq!(located, expected.as_slice());

    // Resource 101 carries no data anywhere.
    assert!(graph.texture_subresources(101).is_none());
}
