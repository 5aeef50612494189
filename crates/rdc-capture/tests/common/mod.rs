//! Builders for synthetic captures, assembled byte-by-byte so the tests
//! stay independent of the encode paths they exercise.

#![allow(dead_code)]

use rdc_capture::ChunkTag;

pub const TEST_HEADER_LENGTH: u32 = 128;

fn align_to(buf: &mut Vec<u8>, align: usize) {
    while buf.len() % align != 0 {
        buf.push(0);
    }
}

/// Writes one chunk payload at absolute section offsets, so the 64-byte
/// alignment of embedded byte arrays matches what the parser expects.
pub struct PayloadWriter<'a> {
    buf: &'a mut Vec<u8>,
}

impl PayloadWriter<'_> {
    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bare u32-length-prefixed string, as stored inside chunk payloads.
    pub fn inline_string(&mut self, s: &str) {
        self.u32(s.len() as u32);
        self.bytes(s.as_bytes());
    }

    /// u64 byte count, padding to the next 64-byte boundary, then the
    /// bytes. Returns the absolute offset of the data.
    pub fn bytes_array(&mut self, data: &[u8]) -> u64 {
        self.u64(data.len() as u64);
        align_to(self.buf, 64);
        let offset = self.buf.len() as u64;
        self.bytes(data);
        offset
    }
}

/// Builds the decompressed byte stream of a frame-capture section.
#[derive(Default)]
pub struct FrameSectionBuilder {
    buf: Vec<u8>,
}

impl FrameSectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk record: aligned start, flag word carrying only the
    /// tag, u32 payload length (backpatched), then the payload.
    pub fn chunk(mut self, tag: ChunkTag, payload: impl FnOnce(&mut PayloadWriter)) -> Self {
        align_to(&mut self.buf, 64);
        let start = self.buf.len();
        self.buf.extend_from_slice(&tag.0.to_le_bytes());
        self.buf.extend_from_slice(&0u32.to_le_bytes()); // payload length
        payload(&mut PayloadWriter { buf: &mut self.buf });
        let payload_len = (self.buf.len() - start - 8) as u32;
        self.buf[start + 4..start + 8].copy_from_slice(&payload_len.to_le_bytes());
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        align_to(&mut self.buf, 64);
        self.buf
    }
}

/// Driver-init payload with the given adapter description.
pub fn driver_init(w: &mut PayloadWriter, description: &str) {
    w.i32(1); // driver type: hardware
    w.u32(0); // creation flags
    w.u32(7); // sdk version
    w.u32(1); // NumFeatureLevels
    w.u64(1); // feature level array count
    w.i32(0xb000); // feature level 11_0
    w.inline_string(description);
    w.u32(0x10de); // vendor
    w.u32(0x1b80); // device
    w.u32(0); // subsys
    w.u32(0); // revision
    w.u64(8 << 30); // dedicated video memory
    w.u64(0);
    w.u64(16 << 30);
    w.u32(1); // luid low
    w.i32(0); // luid high
}

/// CreateTexture2D payload for a 1-mip, 1-slice texture. When `data` is
/// given it becomes the creation-time initial contents and must be the
/// tight `width * height * bytes-per-pixel` bytes for the format.
pub fn create_texture2d(
    w: &mut PayloadWriter,
    resource_id: u64,
    width: u32,
    height: u32,
    format: u32,
    row_pitch: u32,
    data: Option<&[u8]>,
) {
    w.u32(width);
    w.u32(height);
    w.u32(1); // mips
    w.u32(1); // array size
    w.u32(format);
    w.u32(1); // sample count
    w.u32(0); // sample quality
    w.u32(0); // usage
    w.u32(0x8); // bind flags
    w.u32(0); // cpu access
    w.u32(0); // misc

    let count = u64::from(data.is_some());
    w.u64(count);
    if data.is_some() {
        w.bytes_array(&[]); // pSysMem placeholder
        w.u32(row_pitch);
        w.u32(0); // slice pitch
    }
    w.u64(resource_id);
    if let Some(data) = data {
        w.bytes_array(data);
        w.u32(data.len() as u32); // trailing length check
    }
}

/// SetResourceName payload.
pub fn set_resource_name(w: &mut PayloadWriter, resource_id: u64, name: &str) {
    w.u64(resource_id);
    w.inline_string(name);
}

/// InitialContents payload for a texture2d target.
pub fn initial_contents_texture2d(
    w: &mut PayloadWriter,
    resource_id: u64,
    row_pitch: u32,
    data: &[u8],
) {
    w.u32(5); // D3D11 resource type: Texture2D
    w.u64(resource_id);
    w.u32(1); // subresource count
    w.u8(0); // contents not omitted
    w.u32(row_pitch);
    w.bytes_array(data);
}

/// CreateBuffer payload, optionally carrying inline initial bytes.
pub fn create_buffer(w: &mut PayloadWriter, resource_id: u64, data: Option<&[u8]>) {
    w.u32(data.map_or(256, |d| d.len() as u32)); // byte width
    w.u32(0); // usage
    w.u32(0x1); // bind flags: vertex buffer
    w.u32(0); // cpu access
    w.u32(0); // misc
    w.u32(0); // structure byte stride
    match data {
        Some(data) => {
            w.u8(1);
            w.u64(1); // one subresource
            w.bytes_array(data);
            w.u32(data.len() as u32); // row pitch
            w.u32(0); // slice pitch
        }
        None => w.u8(0),
    }
    w.u64(resource_id);
}

/// CreateRenderTargetView payload with a texture2d view desc.
pub fn create_render_target_view(w: &mut PayloadWriter, view_id: u64, target_id: u64) {
    w.u64(target_id);
    w.u8(1); // desc present
    w.u32(28); // format
    w.u32(4); // dimension: texture2d
    w.u32(0); // mip slice
    w.u64(view_id);
}

/// UpdateSubresource payload carrying `data` for `target_id`.
pub fn update_subresource(w: &mut PayloadWriter, target_id: u64, row_pitch: u32, data: &[u8]) {
    w.u64(1); // context id
    w.u64(target_id);
    w.u32(0); // dst subresource
    w.u8(0); // box not present
    for _ in 0..6 {
        w.u32(0); // box fields are serialised regardless
    }
    w.u32(row_pitch);
    w.u32(0); // depth pitch
    w.u32(0); // copy flags
    w.u8(1); // is update
    w.bytes_array(data);
    w.u64(data.len() as u64); // trailing length check
}

/// File header + binary thumbnail + capture metadata, zero padded to
/// [`TEST_HEADER_LENGTH`].
pub fn capture_prelude() -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"RDOC\0\0\0\0");
    buf.extend_from_slice(&0x102u32.to_le_bytes()); // version
    buf.extend_from_slice(&TEST_HEADER_LENGTH.to_le_bytes());
    buf.extend_from_slice(&[0u8; 16]); // producer version

    // Binary thumbnail: a stub JPEG.
    let jpeg = [0xffu8, 0xd8, 0xff, 0xd9];
    buf.extend_from_slice(&4u16.to_le_bytes()); // width
    buf.extend_from_slice(&4u16.to_le_bytes()); // height
    buf.extend_from_slice(&(jpeg.len() as u32).to_le_bytes());
    buf.extend_from_slice(&jpeg);

    // Capture metadata.
    buf.extend_from_slice(&0x1122_3344_5566_7788u64.to_le_bytes());
    buf.extend_from_slice(&1u32.to_le_bytes()); // driver id: D3D11
    let name = b"D3D11";
    buf.push((name.len() + 1) as u8);
    buf.extend_from_slice(name);
    buf.push(0);

    assert!(buf.len() <= TEST_HEADER_LENGTH as usize);
    buf.resize(TEST_HEADER_LENGTH as usize, 0);
    buf
}

/// Append a section with explicit header fields and raw (on-disk) bytes.
pub fn write_section(
    out: &mut Vec<u8>,
    section_type: u32,
    flags: u32,
    uncompressed_len: u64,
    name: &str,
    raw: &[u8],
) {
    out.push(0); // isASCII
    out.extend_from_slice(&[0u8; 3]);
    out.extend_from_slice(&section_type.to_le_bytes());
    out.extend_from_slice(&(raw.len() as u64).to_le_bytes());
    out.extend_from_slice(&uncompressed_len.to_le_bytes());
    out.extend_from_slice(&0x11u64.to_le_bytes()); // section version
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&((name.len() + 1) as u32).to_le_bytes());
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    out.extend_from_slice(raw);
}

/// A complete capture holding one uncompressed frame-capture section.
pub fn capture_with_frame_section(frame_data: &[u8]) -> Vec<u8> {
    let mut buf = capture_prelude();
    write_section(
        &mut buf,
        1, // FrameCapture
        0,
        frame_data.len() as u64,
        "renderdoc/internal/framecapture",
        frame_data,
    );
    buf
}

/// The standard four-chunk stream used across the graph tests: driver
/// init, capture begin, two textures and a name for the first one.
pub fn standard_frame_section() -> Vec<u8> {
    let tex: Vec<u8> = (0..16 * 16 * 4).map(|i| (i % 251) as u8).collect();
    FrameSectionBuilder::new()
        .chunk(ChunkTag::DRIVER_INIT, |w| {
            driver_init(w, "NVIDIA GeForce 9");
        })
        .chunk(ChunkTag::CAPTURE_BEGIN, |w| w.u64(0))
        .chunk(ChunkTag::CREATE_TEXTURE_2D, |w| {
            create_texture2d(w, 100, 16, 16, 28, 64, Some(&tex));
        })
        .chunk(ChunkTag::CREATE_TEXTURE_2D, |w| {
            create_texture2d(w, 101, 16, 16, 28, 64, None);
        })
        .chunk(ChunkTag::SET_RESOURCE_NAME, |w| {
            set_resource_name(w, 100, "Albedo");
        })
        .finish()
}
