//! D3D11 payload vocabulary: the descriptor structures serialised inside
//! frame-capture chunks, and the DXGI format arithmetic needed to size
//! subresource data. The engine consumes these through plain decode
//! functions; nothing here touches the container layer.

use std::io::{Read, Seek};

use tracing::warn;

use crate::error::{RdcError, Result};
use crate::io::ReadLeExt;
use crate::patch::StringSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DxgiFormat(pub u32);

#[rustfmt::skip]
impl DxgiFormat {
    pub const UNKNOWN: DxgiFormat = DxgiFormat(0);
    pub const R32G32B32A32_TYPELESS: DxgiFormat = DxgiFormat(1);
    pub const R32G32B32A32_FLOAT: DxgiFormat = DxgiFormat(2);
    pub const R32G32B32A32_UINT: DxgiFormat = DxgiFormat(3);
    pub const R32G32B32A32_SINT: DxgiFormat = DxgiFormat(4);
    pub const R32G32B32_TYPELESS: DxgiFormat = DxgiFormat(5);
    pub const R32G32B32_FLOAT: DxgiFormat = DxgiFormat(6);
    pub const R32G32B32_UINT: DxgiFormat = DxgiFormat(7);
    pub const R32G32B32_SINT: DxgiFormat = DxgiFormat(8);
    pub const R16G16B16A16_TYPELESS: DxgiFormat = DxgiFormat(9);
    pub const R16G16B16A16_FLOAT: DxgiFormat = DxgiFormat(10);
    pub const R16G16B16A16_UNORM: DxgiFormat = DxgiFormat(11);
    pub const R16G16B16A16_UINT: DxgiFormat = DxgiFormat(12);
    pub const R16G16B16A16_SNORM: DxgiFormat = DxgiFormat(13);
    pub const R16G16B16A16_SINT: DxgiFormat = DxgiFormat(14);
    pub const R32G32_TYPELESS: DxgiFormat = DxgiFormat(15);
    pub const R32G32_FLOAT: DxgiFormat = DxgiFormat(16);
    pub const R32G32_UINT: DxgiFormat = DxgiFormat(17);
    pub const R32G32_SINT: DxgiFormat = DxgiFormat(18);
    pub const R32G8X24_TYPELESS: DxgiFormat = DxgiFormat(19);
    pub const D32_FLOAT_S8X24_UINT: DxgiFormat = DxgiFormat(20);
    pub const R32_FLOAT_X8X24_TYPELESS: DxgiFormat = DxgiFormat(21);
    pub const X32_TYPELESS_G8X24_UINT: DxgiFormat = DxgiFormat(22);
    pub const R10G10B10A2_TYPELESS: DxgiFormat = DxgiFormat(23);
    pub const R10G10B10A2_UNORM: DxgiFormat = DxgiFormat(24);
    pub const R10G10B10A2_UINT: DxgiFormat = DxgiFormat(25);
    pub const R11G11B10_FLOAT: DxgiFormat = DxgiFormat(26);
    pub const R8G8B8A8_TYPELESS: DxgiFormat = DxgiFormat(27);
    pub const R8G8B8A8_UNORM: DxgiFormat = DxgiFormat(28);
    pub const R8G8B8A8_UNORM_SRGB: DxgiFormat = DxgiFormat(29);
    pub const R8G8B8A8_UINT: DxgiFormat = DxgiFormat(30);
    pub const R8G8B8A8_SNORM: DxgiFormat = DxgiFormat(31);
    pub const R8G8B8A8_SINT: DxgiFormat = DxgiFormat(32);
    pub const R16G16_TYPELESS: DxgiFormat = DxgiFormat(33);
    pub const R16G16_FLOAT: DxgiFormat = DxgiFormat(34);
    pub const R16G16_UNORM: DxgiFormat = DxgiFormat(35);
    pub const R16G16_UINT: DxgiFormat = DxgiFormat(36);
    pub const R16G16_SNORM: DxgiFormat = DxgiFormat(37);
    pub const R16G16_SINT: DxgiFormat = DxgiFormat(38);
    pub const R32_TYPELESS: DxgiFormat = DxgiFormat(39);
    pub const D32_FLOAT: DxgiFormat = DxgiFormat(40);
    pub const R32_FLOAT: DxgiFormat = DxgiFormat(41);
    pub const R32_UINT: DxgiFormat = DxgiFormat(42);
    pub const R32_SINT: DxgiFormat = DxgiFormat(43);
    pub const R24G8_TYPELESS: DxgiFormat = DxgiFormat(44);
    pub const D24_UNORM_S8_UINT: DxgiFormat = DxgiFormat(45);
    pub const R24_UNORM_X8_TYPELESS: DxgiFormat = DxgiFormat(46);
    pub const X24_TYPELESS_G8_UINT: DxgiFormat = DxgiFormat(47);
    pub const R8G8_TYPELESS: DxgiFormat = DxgiFormat(48);
    pub const R8G8_UNORM: DxgiFormat = DxgiFormat(49);
    pub const R8G8_UINT: DxgiFormat = DxgiFormat(50);
    pub const R8G8_SNORM: DxgiFormat = DxgiFormat(51);
    pub const R8G8_SINT: DxgiFormat = DxgiFormat(52);
    pub const R16_TYPELESS: DxgiFormat = DxgiFormat(53);
    pub const R16_FLOAT: DxgiFormat = DxgiFormat(54);
    pub const D16_UNORM: DxgiFormat = DxgiFormat(55);
    pub const R16_UNORM: DxgiFormat = DxgiFormat(56);
    pub const R16_UINT: DxgiFormat = DxgiFormat(57);
    pub const R16_SNORM: DxgiFormat = DxgiFormat(58);
    pub const R16_SINT: DxgiFormat = DxgiFormat(59);
    pub const R8_TYPELESS: DxgiFormat = DxgiFormat(60);
    pub const R8_UNORM: DxgiFormat = DxgiFormat(61);
    pub const R8_UINT: DxgiFormat = DxgiFormat(62);
    pub const R8_SNORM: DxgiFormat = DxgiFormat(63);
    pub const R8_SINT: DxgiFormat = DxgiFormat(64);
    pub const A8_UNORM: DxgiFormat = DxgiFormat(65);
    pub const R1_UNORM: DxgiFormat = DxgiFormat(66);
    pub const R9G9B9E5_SHAREDEXP: DxgiFormat = DxgiFormat(67);
    pub const R8G8_B8G8_UNORM: DxgiFormat = DxgiFormat(68);
    pub const G8R8_G8B8_UNORM: DxgiFormat = DxgiFormat(69);
    pub const BC1_TYPELESS: DxgiFormat = DxgiFormat(70);
    pub const BC1_UNORM: DxgiFormat = DxgiFormat(71);
    pub const BC1_UNORM_SRGB: DxgiFormat = DxgiFormat(72);
    pub const BC2_TYPELESS: DxgiFormat = DxgiFormat(73);
    pub const BC2_UNORM: DxgiFormat = DxgiFormat(74);
    pub const BC2_UNORM_SRGB: DxgiFormat = DxgiFormat(75);
    pub const BC3_TYPELESS: DxgiFormat = DxgiFormat(76);
    pub const BC3_UNORM: DxgiFormat = DxgiFormat(77);
    pub const BC3_UNORM_SRGB: DxgiFormat = DxgiFormat(78);
    pub const BC4_TYPELESS: DxgiFormat = DxgiFormat(79);
    pub const BC4_UNORM: DxgiFormat = DxgiFormat(80);
    pub const BC4_SNORM: DxgiFormat = DxgiFormat(81);
    pub const BC5_TYPELESS: DxgiFormat = DxgiFormat(82);
    pub const BC5_UNORM: DxgiFormat = DxgiFormat(83);
    pub const BC5_SNORM: DxgiFormat = DxgiFormat(84);
    pub const B5G6R5_UNORM: DxgiFormat = DxgiFormat(85);
    pub const B5G5R5A1_UNORM: DxgiFormat = DxgiFormat(86);
    pub const B8G8R8A8_UNORM: DxgiFormat = DxgiFormat(87);
    pub const B8G8R8X8_UNORM: DxgiFormat = DxgiFormat(88);
    pub const R10G10B10_XR_BIAS_A2_UNORM: DxgiFormat = DxgiFormat(89);
    pub const B8G8R8A8_TYPELESS: DxgiFormat = DxgiFormat(90);
    pub const B8G8R8A8_UNORM_SRGB: DxgiFormat = DxgiFormat(91);
    pub const B8G8R8X8_TYPELESS: DxgiFormat = DxgiFormat(92);
    pub const B8G8R8X8_UNORM_SRGB: DxgiFormat = DxgiFormat(93);
    pub const BC6H_TYPELESS: DxgiFormat = DxgiFormat(94);
    pub const BC6H_UF16: DxgiFormat = DxgiFormat(95);
    pub const BC6H_SF16: DxgiFormat = DxgiFormat(96);
    pub const BC7_TYPELESS: DxgiFormat = DxgiFormat(97);
    pub const BC7_UNORM: DxgiFormat = DxgiFormat(98);
    pub const BC7_UNORM_SRGB: DxgiFormat = DxgiFormat(99);
    pub const AYUV: DxgiFormat = DxgiFormat(100);
    pub const Y410: DxgiFormat = DxgiFormat(101);
    pub const Y416: DxgiFormat = DxgiFormat(102);
    pub const NV12: DxgiFormat = DxgiFormat(103);
    pub const P010: DxgiFormat = DxgiFormat(104);
    pub const P016: DxgiFormat = DxgiFormat(105);
    pub const OPAQUE_420: DxgiFormat = DxgiFormat(106);
    pub const YUY2: DxgiFormat = DxgiFormat(107);
    pub const Y210: DxgiFormat = DxgiFormat(108);
    pub const Y216: DxgiFormat = DxgiFormat(109);
    pub const NV11: DxgiFormat = DxgiFormat(110);
    pub const AI44: DxgiFormat = DxgiFormat(111);
    pub const IA44: DxgiFormat = DxgiFormat(112);
    pub const P8: DxgiFormat = DxgiFormat(113);
    pub const A8P8: DxgiFormat = DxgiFormat(114);
    pub const B4G4R4A4_UNORM: DxgiFormat = DxgiFormat(115);
    pub const P208: DxgiFormat = DxgiFormat(130);
    pub const V208: DxgiFormat = DxgiFormat(131);
    pub const V408: DxgiFormat = DxgiFormat(132);
}

pub const fn align_up4(x: u64) -> u64 {
    (x + 0x3) & !0x3
}

pub fn calc_num_mips(mut w: u32, mut h: u32, mut d: u32) -> u32 {
    let mut mips = 1;
    while w > 1 || h > 1 || d > 1 {
        w = (w >> 1).max(1);
        h = (h >> 1).max(1);
        d = (d >> 1).max(1);
        mips += 1;
    }
    mips
}

pub fn is_block_format(f: DxgiFormat) -> bool {
    matches!(
        f,
        DxgiFormat::BC1_TYPELESS
            | DxgiFormat::BC1_UNORM
            | DxgiFormat::BC1_UNORM_SRGB
            | DxgiFormat::BC2_TYPELESS
            | DxgiFormat::BC2_UNORM
            | DxgiFormat::BC2_UNORM_SRGB
            | DxgiFormat::BC3_TYPELESS
            | DxgiFormat::BC3_UNORM
            | DxgiFormat::BC3_UNORM_SRGB
            | DxgiFormat::BC4_TYPELESS
            | DxgiFormat::BC4_UNORM
            | DxgiFormat::BC4_SNORM
            | DxgiFormat::BC5_TYPELESS
            | DxgiFormat::BC5_UNORM
            | DxgiFormat::BC5_SNORM
            | DxgiFormat::BC6H_TYPELESS
            | DxgiFormat::BC6H_UF16
            | DxgiFormat::BC6H_SF16
            | DxgiFormat::BC7_TYPELESS
            | DxgiFormat::BC7_UNORM
            | DxgiFormat::BC7_UNORM_SRGB
    )
}

pub fn is_yuv_planar_format(f: DxgiFormat) -> bool {
    matches!(
        f,
        DxgiFormat::NV12
            | DxgiFormat::P010
            | DxgiFormat::P016
            | DxgiFormat::OPAQUE_420
            | DxgiFormat::NV11
            | DxgiFormat::P208
    )
}

/// Number of stored rows for a planar YUV subresource; luma and chroma
/// planes are stacked, so this exceeds the pixel height.
pub fn yuv_num_rows(f: DxgiFormat, height: u32) -> u32 {
    match f {
        // 4:2:0: full-height luma plane plus a half-height chroma plane.
        DxgiFormat::NV12 | DxgiFormat::P010 | DxgiFormat::P016 | DxgiFormat::OPAQUE_420 => {
            height + height / 2
        }
        // 4:1:1 and 4:2:2 store chroma at full height.
        DxgiFormat::NV11 | DxgiFormat::P208 => height * 2,
        _ => height,
    }
}

/// Tightly packed byte size of one mip of a subresource.
pub fn subresource_byte_size(width: u32, height: u32, depth: u32, f: DxgiFormat, mip: u32) -> u64 {
    let w = u64::from((width >> mip).max(1));
    let h = u64::from((height >> mip).max(1));
    let d = u64::from((depth >> mip).max(1));
    let pixels = w * h * d;

    use DxgiFormat as F;
    match f {
        F::R32G32B32A32_TYPELESS | F::R32G32B32A32_FLOAT | F::R32G32B32A32_UINT
        | F::R32G32B32A32_SINT => pixels * 16,

        F::R32G32B32_TYPELESS | F::R32G32B32_FLOAT | F::R32G32B32_UINT | F::R32G32B32_SINT => {
            pixels * 12
        }

        F::R16G16B16A16_TYPELESS | F::R16G16B16A16_FLOAT | F::R16G16B16A16_UNORM
        | F::R16G16B16A16_UINT | F::R16G16B16A16_SNORM | F::R16G16B16A16_SINT
        | F::R32G32_TYPELESS | F::R32G32_FLOAT | F::R32G32_UINT | F::R32G32_SINT
        | F::R32G8X24_TYPELESS | F::D32_FLOAT_S8X24_UINT | F::R32_FLOAT_X8X24_TYPELESS
        | F::X32_TYPELESS_G8X24_UINT => pixels * 8,

        F::R10G10B10A2_TYPELESS | F::R10G10B10A2_UNORM | F::R10G10B10A2_UINT
        | F::R11G11B10_FLOAT | F::R8G8B8A8_TYPELESS | F::R8G8B8A8_UNORM
        | F::R8G8B8A8_UNORM_SRGB | F::R8G8B8A8_UINT | F::R8G8B8A8_SNORM | F::R8G8B8A8_SINT
        | F::R16G16_TYPELESS | F::R16G16_FLOAT | F::R16G16_UNORM | F::R16G16_UINT
        | F::R16G16_SNORM | F::R16G16_SINT | F::R32_TYPELESS | F::D32_FLOAT | F::R32_FLOAT
        | F::R32_UINT | F::R32_SINT | F::R24G8_TYPELESS | F::D24_UNORM_S8_UINT
        | F::R24_UNORM_X8_TYPELESS | F::X24_TYPELESS_G8_UINT | F::R9G9B9E5_SHAREDEXP
        | F::R8G8_B8G8_UNORM | F::G8R8_G8B8_UNORM | F::B8G8R8A8_UNORM | F::B8G8R8X8_UNORM
        | F::R10G10B10_XR_BIAS_A2_UNORM | F::B8G8R8A8_TYPELESS | F::B8G8R8A8_UNORM_SRGB
        | F::B8G8R8X8_TYPELESS | F::B8G8R8X8_UNORM_SRGB => pixels * 4,

        F::R8G8_TYPELESS | F::R8G8_UNORM | F::R8G8_UINT | F::R8G8_SNORM | F::R8G8_SINT
        | F::R16_TYPELESS | F::R16_FLOAT | F::D16_UNORM | F::R16_UNORM | F::R16_UINT
        | F::R16_SNORM | F::R16_SINT | F::B5G6R5_UNORM | F::B5G5R5A1_UNORM => pixels * 2,

        F::R8_TYPELESS | F::R8_UNORM | F::R8_UINT | F::R8_SNORM | F::R8_SINT | F::A8_UNORM => {
            pixels
        }

        F::R1_UNORM => (pixels / 8).max(1),

        F::BC1_TYPELESS | F::BC1_UNORM | F::BC1_UNORM_SRGB | F::BC4_TYPELESS | F::BC4_UNORM
        | F::BC4_SNORM => align_up4(w) * align_up4(h) * d / 2,

        F::BC2_TYPELESS | F::BC2_UNORM | F::BC2_UNORM_SRGB | F::BC3_TYPELESS | F::BC3_UNORM
        | F::BC3_UNORM_SRGB | F::BC5_TYPELESS | F::BC5_UNORM | F::BC5_SNORM
        | F::BC6H_TYPELESS | F::BC6H_UF16 | F::BC6H_SF16 | F::BC7_TYPELESS | F::BC7_UNORM
        | F::BC7_UNORM_SRGB => align_up4(w) * align_up4(h) * d,

        // 4 channels, half a byte each.
        F::B4G4R4A4_UNORM => pixels * 2,

        // 4:4:4 packed, 8/10-bit: same size as R8G8B8A8 / R10G10B10A2.
        F::AYUV | F::Y410 | F::V408 => pixels * 4,
        // 4:4:4 packed 16-bit.
        F::Y416 => pixels * 8,
        // 4:2:0 planar: 1 byte per pixel luma + half a byte per pixel chroma.
        F::NV12 | F::OPAQUE_420 | F::NV11 => pixels + pixels / 2,
        // 10-bit planar formats are stored as their 16-bit layout.
        F::P010 | F::P016 => {
            let p = pixels * 2;
            p + p / 2
        }
        // 4:2:2 packed 8-bit, and 4:2:2/4:4:0 planar 8-bit.
        F::YUY2 | F::P208 | F::V208 | F::A8P8 => pixels * 2,
        // 10-bit packed formats are stored as their 16-bit layout.
        F::Y210 | F::Y216 => pixels * 4,
        // Palletised, 1 byte per pixel.
        F::AI44 | F::IA44 | F::P8 => pixels,

        F::UNKNOWN => {
            warn!("getting byte size of unknown dxgi format");
            0
        }
        other => {
            warn!(format = other.0, "unrecognised dxgi format");
            pixels
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SampleDesc {
    pub count: u32,
    pub quality: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Texture2dDesc {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub array_size: u32,
    pub format: DxgiFormat,
    pub sample_desc: SampleDesc,
    pub usage: u32,
    pub bind_flags: u32,
    pub cpu_access_flags: u32,
    pub misc_flags: u32,
}

impl Texture2dDesc {
    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            width: r.read_u32_le()?,
            height: r.read_u32_le()?,
            mip_levels: r.read_u32_le()?,
            array_size: r.read_u32_le()?,
            format: DxgiFormat(r.read_u32_le()?),
            sample_desc: SampleDesc {
                count: r.read_u32_le()?,
                quality: r.read_u32_le()?,
            },
            usage: r.read_u32_le()?,
            bind_flags: r.read_u32_le()?,
            cpu_access_flags: r.read_u32_le()?,
            misc_flags: r.read_u32_le()?,
        })
    }

    pub fn is_multisampled(&self) -> bool {
        self.sample_desc.count > 1 || self.sample_desc.quality > 0
    }

    /// Mip count with the implicit full chain when the descriptor stores 0.
    pub fn effective_mip_levels(&self) -> u32 {
        if self.mip_levels != 0 {
            self.mip_levels
        } else {
            calc_num_mips(self.width, self.height, 1)
        }
    }

    /// Subresource count of the resource's initial contents stream.
    pub fn subresource_count(&self) -> u32 {
        let mut count = self.mip_levels.max(1) * self.array_size.max(1);
        if self.is_multisampled() {
            count *= self.sample_desc.count;
        }
        count
    }

    /// Stored row count for one mip, accounting for block compression and
    /// planar YUV layouts.
    pub fn rows_for_mip(&self, mip: u32) -> u32 {
        let height = (self.height >> mip).max(1);
        if is_block_format(self.format) {
            (align_up4(u64::from(height)) / 4) as u32
        } else if is_yuv_planar_format(self.format) {
            yuv_num_rows(self.format, height)
        } else {
            height
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BufferDesc {
    pub byte_width: u32,
    pub usage: u32,
    pub bind_flags: u32,
    pub cpu_access_flags: u32,
    pub misc_flags: u32,
    pub structure_byte_stride: u32,
}

impl BufferDesc {
    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            byte_width: r.read_u32_le()?,
            usage: r.read_u32_le()?,
            bind_flags: r.read_u32_le()?,
            cpu_access_flags: r.read_u32_le()?,
            misc_flags: r.read_u32_le()?,
            structure_byte_stride: r.read_u32_le()?,
        })
    }
}

/// Render-target view description; the dimension tag selects which union
/// arm was serialised.
#[derive(Debug, Clone, Copy)]
pub struct RenderTargetViewDesc {
    pub format: DxgiFormat,
    pub view: RtvView,
}

#[derive(Debug, Clone, Copy)]
pub enum RtvView {
    Unknown,
    Buffer { first_element: u32, num_elements: u32 },
    Texture1d { mip_slice: u32 },
    Texture1dArray { mip_slice: u32, first_array_slice: u32, array_size: u32 },
    Texture2d { mip_slice: u32 },
    Texture2dArray { mip_slice: u32, first_array_slice: u32, array_size: u32 },
    Texture2dMs,
    Texture2dMsArray { first_array_slice: u32, array_size: u32 },
    Texture3d { mip_slice: u32, first_w_slice: u32, w_size: u32 },
}

impl RenderTargetViewDesc {
    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let format = DxgiFormat(r.read_u32_le()?);
        let dimension = r.read_u32_le()?;
        let view = match dimension {
            0 => RtvView::Unknown,
            1 => RtvView::Buffer {
                first_element: r.read_u32_le()?,
                num_elements: r.read_u32_le()?,
            },
            2 => RtvView::Texture1d {
                mip_slice: r.read_u32_le()?,
            },
            3 => RtvView::Texture1dArray {
                mip_slice: r.read_u32_le()?,
                first_array_slice: r.read_u32_le()?,
                array_size: r.read_u32_le()?,
            },
            4 => RtvView::Texture2d {
                mip_slice: r.read_u32_le()?,
            },
            5 => RtvView::Texture2dArray {
                mip_slice: r.read_u32_le()?,
                first_array_slice: r.read_u32_le()?,
                array_size: r.read_u32_le()?,
            },
            6 => RtvView::Texture2dMs,
            7 => RtvView::Texture2dMsArray {
                first_array_slice: r.read_u32_le()?,
                array_size: r.read_u32_le()?,
            },
            8 => RtvView::Texture3d {
                mip_slice: r.read_u32_le()?,
                first_w_slice: r.read_u32_le()?,
                w_size: r.read_u32_le()?,
            },
            _ => return Err(RdcError::Corrupt("unrecognised rtv dimension")),
        };
        Ok(Self { format, view })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ShaderResourceViewDesc {
    pub format: DxgiFormat,
    pub view: SrvView,
}

#[derive(Debug, Clone, Copy)]
pub enum SrvView {
    Unknown,
    Buffer { first_element: u32, num_elements: u32 },
    Texture1d { most_detailed_mip: u32, mip_levels: u32 },
    Texture1dArray {
        most_detailed_mip: u32,
        mip_levels: u32,
        first_array_slice: u32,
        array_size: u32,
    },
    Texture2d { most_detailed_mip: u32, mip_levels: u32 },
    Texture2dArray {
        most_detailed_mip: u32,
        mip_levels: u32,
        first_array_slice: u32,
        array_size: u32,
    },
    Texture2dMs,
    Texture2dMsArray { first_array_slice: u32, array_size: u32 },
    Texture3d { most_detailed_mip: u32, mip_levels: u32 },
    TextureCube { most_detailed_mip: u32, mip_levels: u32 },
    TextureCubeArray {
        most_detailed_mip: u32,
        mip_levels: u32,
        first_2d_array_face: u32,
        num_cubes: u32,
    },
    BufferEx { first_element: u32, num_elements: u32, flags: u32 },
}

impl ShaderResourceViewDesc {
    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let format = DxgiFormat(r.read_u32_le()?);
        let dimension = r.read_u32_le()?;
        let view = match dimension {
            0 => SrvView::Unknown,
            1 => SrvView::Buffer {
                first_element: r.read_u32_le()?,
                num_elements: r.read_u32_le()?,
            },
            2 => SrvView::Texture1d {
                most_detailed_mip: r.read_u32_le()?,
                mip_levels: r.read_u32_le()?,
            },
            3 => SrvView::Texture1dArray {
                most_detailed_mip: r.read_u32_le()?,
                mip_levels: r.read_u32_le()?,
                first_array_slice: r.read_u32_le()?,
                array_size: r.read_u32_le()?,
            },
            4 => SrvView::Texture2d {
                most_detailed_mip: r.read_u32_le()?,
                mip_levels: r.read_u32_le()?,
            },
            5 => SrvView::Texture2dArray {
                most_detailed_mip: r.read_u32_le()?,
                mip_levels: r.read_u32_le()?,
                first_array_slice: r.read_u32_le()?,
                array_size: r.read_u32_le()?,
            },
            6 => SrvView::Texture2dMs,
            7 => SrvView::Texture2dMsArray {
                first_array_slice: r.read_u32_le()?,
                array_size: r.read_u32_le()?,
            },
            8 => SrvView::Texture3d {
                most_detailed_mip: r.read_u32_le()?,
                mip_levels: r.read_u32_le()?,
            },
            9 => SrvView::TextureCube {
                most_detailed_mip: r.read_u32_le()?,
                mip_levels: r.read_u32_le()?,
            },
            10 => SrvView::TextureCubeArray {
                most_detailed_mip: r.read_u32_le()?,
                mip_levels: r.read_u32_le()?,
                first_2d_array_face: r.read_u32_le()?,
                num_cubes: r.read_u32_le()?,
            },
            11 => SrvView::BufferEx {
                first_element: r.read_u32_le()?,
                num_elements: r.read_u32_le()?,
                flags: r.read_u32_le()?,
            },
            _ => return Err(RdcError::Corrupt("unrecognised srv dimension")),
        };
        Ok(Self { format, view })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DepthStencilViewDesc {
    pub format: DxgiFormat,
    pub flags: u32,
    pub view: DsvView,
}

#[derive(Debug, Clone, Copy)]
pub enum DsvView {
    Unknown,
    Texture1d { mip_slice: u32 },
    Texture1dArray { mip_slice: u32, first_array_slice: u32, array_size: u32 },
    Texture2d { mip_slice: u32 },
    Texture2dArray { mip_slice: u32, first_array_slice: u32, array_size: u32 },
    Texture2dMs,
    Texture2dMsArray { first_array_slice: u32, array_size: u32 },
}

impl DepthStencilViewDesc {
    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let format = DxgiFormat(r.read_u32_le()?);
        let dimension = r.read_u32_le()?;
        let flags = r.read_u32_le()?;
        let view = match dimension {
            0 => DsvView::Unknown,
            1 => DsvView::Texture1d {
                mip_slice: r.read_u32_le()?,
            },
            2 => DsvView::Texture1dArray {
                mip_slice: r.read_u32_le()?,
                first_array_slice: r.read_u32_le()?,
                array_size: r.read_u32_le()?,
            },
            3 => DsvView::Texture2d {
                mip_slice: r.read_u32_le()?,
            },
            4 => DsvView::Texture2dArray {
                mip_slice: r.read_u32_le()?,
                first_array_slice: r.read_u32_le()?,
                array_size: r.read_u32_le()?,
            },
            5 => DsvView::Texture2dMs,
            6 => DsvView::Texture2dMsArray {
                first_array_slice: r.read_u32_le()?,
                array_size: r.read_u32_le()?,
            },
            _ => return Err(RdcError::Corrupt("unrecognised dsv dimension")),
        };
        Ok(Self {
            format,
            flags,
            view,
        })
    }
}

/// DXGI adapter description inside the driver-init chunk. The description
/// string's byte span is recorded so the device name can be patched in
/// place later.
#[derive(Debug, Clone)]
pub struct AdapterDesc {
    pub description: String,
    pub description_slot: StringSlot,
    pub vendor_id: u32,
    pub device_id: u32,
    pub subsys_id: u32,
    pub revision: u32,
    pub dedicated_video_memory: u64,
    pub dedicated_system_memory: u64,
    pub shared_system_memory: u64,
    pub luid_low: u32,
    pub luid_high: i32,
}

impl AdapterDesc {
    pub fn decode<R: Read + Seek>(r: &mut R) -> Result<Self> {
        let slot_offset = r.stream_position()?;
        let description = r.read_inline_string()?;
        let description_slot = StringSlot {
            offset: slot_offset,
            max_len: description.len(),
        };
        Ok(Self {
            description,
            description_slot,
            vendor_id: r.read_u32_le()?,
            device_id: r.read_u32_le()?,
            subsys_id: r.read_u32_le()?,
            revision: r.read_u32_le()?,
            dedicated_video_memory: r.read_u64_le()?,
            dedicated_system_memory: r.read_u64_le()?,
            shared_system_memory: r.read_u64_le()?,
            luid_low: r.read_u32_le()?,
            luid_high: r.read_i32_le()?,
        })
    }
}

/// Device-creation parameters serialised by the driver-init chunk.
#[derive(Debug, Clone)]
pub struct InitParams {
    pub driver_type: i32,
    pub flags: u32,
    pub sdk_version: u32,
    pub num_feature_levels: u32,
    pub feature_levels: Vec<i32>,
    pub adapter_desc: AdapterDesc,
}

impl InitParams {
    pub fn decode<R: Read + Seek>(r: &mut R) -> Result<Self> {
        let driver_type = r.read_i32_le()?;
        let flags = r.read_u32_le()?;
        let sdk_version = r.read_u32_le()?;
        let num_feature_levels = r.read_u32_le()?;
        let count = r.read_u64_le()?;
        let mut feature_levels = Vec::with_capacity(count.min(16) as usize);
        for _ in 0..count {
            feature_levels.push(r.read_i32_le()?);
        }
        let adapter_desc = AdapterDesc::decode(r)?;
        Ok(Self {
            driver_type,
            flags,
            sdk_version,
            num_feature_levels,
            feature_levels,
            adapter_desc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_sizes_follow_format_class() {
        assert_eq!(
            subresource_byte_size(16, 16, 1, DxgiFormat::R8G8B8A8_UNORM, 0),
            16 * 16 * 4
        );
        assert_eq!(
            subresource_byte_size(16, 16, 1, DxgiFormat::R8G8B8A8_UNORM, 1),
            8 * 8 * 4
        );
        assert_eq!(subresource_byte_size(16, 16, 1, DxgiFormat::R8_UNORM, 0), 256);
        assert_eq!(
            subresource_byte_size(16, 16, 1, DxgiFormat::R16G16B16A16_FLOAT, 0),
            16 * 16 * 8
        );
        // BC1 packs 4x4 blocks at 8 bytes each.
        assert_eq!(subresource_byte_size(16, 16, 1, DxgiFormat::BC1_UNORM, 0), 128);
        // Mip tails of block formats round up to a whole block.
        assert_eq!(subresource_byte_size(16, 16, 1, DxgiFormat::BC1_UNORM, 3), 8);
        // NV12 is 12 bits per pixel.
        assert_eq!(subresource_byte_size(16, 16, 1, DxgiFormat::NV12, 0), 384);
        assert_eq!(subresource_byte_size(4, 4, 1, DxgiFormat::UNKNOWN, 0), 0);
    }

    #[test]
    fn mip_chain_length() {
        assert_eq!(calc_num_mips(1, 1, 1), 1);
        assert_eq!(calc_num_mips(16, 16, 1), 5);
        assert_eq!(calc_num_mips(256, 16, 1), 9);
    }

    #[test]
    fn subresource_counts() {
        let mut desc = Texture2dDesc {
            width: 64,
            height: 64,
            mip_levels: 3,
            array_size: 2,
            format: DxgiFormat::R8G8B8A8_UNORM,
            sample_desc: SampleDesc { count: 1, quality: 0 },
            usage: 0,
            bind_flags: 0,
            cpu_access_flags: 0,
            misc_flags: 0,
        };
        assert_eq!(desc.subresource_count(), 6);
        desc.sample_desc.count = 4;
        assert_eq!(desc.subresource_count(), 24);
    }

    #[test]
    fn block_format_row_counts() {
        let desc = Texture2dDesc {
            width: 16,
            height: 10,
            mip_levels: 1,
            array_size: 1,
            format: DxgiFormat::BC3_UNORM,
            sample_desc: SampleDesc::default(),
            usage: 0,
            bind_flags: 0,
            cpu_access_flags: 0,
            misc_flags: 0,
        };
        assert_eq!(desc.rows_for_mip(0), 3);
    }
}
