//! Texture export/import between capture payloads and PNG files on disk.
//!
//! Exports cover the formats worth editing by hand: the R8G8B8A8 family as
//! RGBA PNGs and single-channel textures as grayscale PNGs. Block
//! compressed formats are skipped. Imports go through the strided patch
//! primitive so row pitch padding inside the capture stays intact.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{bail, Context};
use rdc_capture::d3d11::{is_block_format, DxgiFormat, Texture2dDesc};
use rdc_capture::{CaptureFile, StridedSlot, SubresourceData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureClass {
    Rgba8,
    Gray8,
}

impl TextureClass {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureClass::Rgba8 => 4,
            TextureClass::Gray8 => 1,
        }
    }

    fn color_type(self) -> png::ColorType {
        match self {
            TextureClass::Rgba8 => png::ColorType::Rgba,
            TextureClass::Gray8 => png::ColorType::Grayscale,
        }
    }
}

/// Editable format classes; anything else is left alone.
pub fn classify(format: DxgiFormat) -> Option<TextureClass> {
    use DxgiFormat as F;
    match format {
        F::R8G8B8A8_TYPELESS | F::R8G8B8A8_UNORM | F::R8G8B8A8_UNORM_SRGB | F::R8G8B8A8_UINT
        | F::R8G8B8A8_SNORM | F::R8G8B8A8_SINT => Some(TextureClass::Rgba8),
        F::R8_TYPELESS | F::R8_UNORM | F::R8_UINT | F::R8_SNORM | F::R8_SINT | F::A8_UNORM => {
            Some(TextureClass::Gray8)
        }
        _ => None,
    }
}

/// Resource id and subresource-0 geometry of one exportable texture.
fn exportable(
    desc: &Texture2dDesc,
    subs: &[SubresourceData],
) -> Option<(TextureClass, StridedSlot)> {
    if is_block_format(desc.format) {
        return None;
    }
    let class = classify(desc.format)?;
    let sub = subs.first()?;
    let row_len = desc.width * class.bytes_per_pixel();
    let row_pitch = if sub.row_pitch != 0 { sub.row_pitch } else { row_len };
    Some((
        class,
        StridedSlot {
            offset: sub.offset,
            row_pitch,
            rows: desc.height,
            row_len,
        },
    ))
}

/// Export every decodable texture to `dir` as `<resourceId>_<name>.png`.
/// Returns how many files were written.
pub fn export_textures(capture: &CaptureFile, dir: &Path) -> anyhow::Result<usize> {
    let graph = capture
        .chunk_manager()
        .context("capture has no decoded chunk graph")?;
    let data = capture.frame_capture().data();

    let mut exported = 0;
    for chunk in graph.chunks() {
        if chunk.resource_id == 0 {
            continue;
        }
        let Some(name) = chunk.name.as_deref() else {
            continue;
        };
        let Some((desc, subs)) = graph.texture_subresources(chunk.resource_id) else {
            continue;
        };
        let Some((class, slot)) = exportable(desc, subs) else {
            continue;
        };

        let safe_name: String = name
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        let path = dir.join(format!("{}_{safe_name}.png", chunk.resource_id));
        let rows = gather_rows(data, &slot)
            .with_context(|| format!("texture {} has truncated data", chunk.resource_id))?;
        write_png(&path, desc.width, desc.height, class, &rows)
            .with_context(|| format!("writing {}", path.display()))?;
        exported += 1;
    }
    Ok(exported)
}

/// Load every `<resourceId>_*.png` in `dir` back into the capture buffer.
/// Returns how many textures were patched.
pub fn import_textures(capture: &mut CaptureFile, dir: &Path) -> anyhow::Result<usize> {
    let mut imported = 0;
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }
        let Some(resource_id) = resource_id_from_file_name(&path) else {
            continue;
        };

        let (slot, class, width, height) = {
            let graph = capture
                .chunk_manager()
                .context("capture has no decoded chunk graph")?;
            let Some((desc, subs)) = graph.texture_subresources(resource_id) else {
                eprintln!("skipping {}: no texture data for resource {resource_id}", path.display());
                continue;
            };
            let Some((class, slot)) = exportable(desc, subs) else {
                eprintln!("skipping {}: resource {resource_id} is not an importable format", path.display());
                continue;
            };
            (slot, class, desc.width, desc.height)
        };

        let pixels = read_png(&path, width, height, class)
            .with_context(|| format!("reading {}", path.display()))?;
        rdc_capture::overwrite_strided(
            capture.frame_capture_mut().data_mut(),
            &slot,
            &pixels,
        )?;
        imported += 1;
    }
    Ok(imported)
}

/// Leading decimal digits before the first `_`.
pub fn resource_id_from_file_name(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.split('_').next()?;
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn gather_rows(data: &[u8], slot: &StridedSlot) -> anyhow::Result<Vec<u8>> {
    let mut rows = Vec::with_capacity(slot.rows as usize * slot.row_len as usize);
    for row in 0..slot.rows as u64 {
        let start = slot.offset + row * u64::from(slot.row_pitch);
        let end = start + u64::from(slot.row_len);
        let Some(src) = data.get(start as usize..end as usize) else {
            bail!("row {row} at {start} is outside the section buffer");
        };
        rows.extend_from_slice(src);
    }
    Ok(rows)
}

fn write_png(
    path: &Path,
    width: u32,
    height: u32,
    class: TextureClass,
    rows: &[u8],
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(class.color_type());
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rows)?;
    Ok(())
}

fn read_png(
    path: &Path,
    width: u32,
    height: u32,
    class: TextureClass,
) -> anyhow::Result<Vec<u8>> {
    let decoder = png::Decoder::new(BufReader::new(File::open(path)?));
    let mut reader = decoder.read_info()?;
    let (color, depth) = reader.output_color_type();
    if depth != png::BitDepth::Eight || color != class.color_type() {
        bail!("expected an 8-bit {:?} png", class.color_type());
    }

    let info = reader.info();
    if info.width != width || info.height != height {
        bail!(
            "image is {}x{}, resource expects {width}x{height}",
            info.width,
            info.height
        );
    }

    let mut pixels = vec![0u8; (width * height * class.bytes_per_pixel()) as usize];
    reader.next_frame(&mut pixels)?;
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn file_names_carry_the_resource_id() {
        assert_eq!(
            resource_id_from_file_name(&PathBuf::from("/tmp/100_Albedo.png")),
            Some(100)
        );
        assert_eq!(
            resource_id_from_file_name(&PathBuf::from("42_Serialised Swap Chain Buffer.png")),
            Some(42)
        );
        assert_eq!(resource_id_from_file_name(&PathBuf::from("notes.png")), None);
    }

    #[test]
    fn png_files_round_trip_both_classes() {
        let dir = tempfile::tempdir().unwrap();

        let rgba: Vec<u8> = (0..4 * 4 * 4).map(|i| i as u8).collect();
        let path = dir.path().join("1_rgba.png");
        write_png(&path, 4, 4, TextureClass::Rgba8, &rgba).unwrap();
        assert_eq!(read_png(&path, 4, 4, TextureClass::Rgba8).unwrap(), rgba);

        let gray: Vec<u8> = (0u8..16).map(|i| i * 3).collect();
        let path = dir.path().join("2_gray.png");
        write_png(&path, 4, 4, TextureClass::Gray8, &gray).unwrap();
        assert_eq!(read_png(&path, 4, 4, TextureClass::Gray8).unwrap(), gray);

        // A class mismatch is refused.
        assert!(read_png(&path, 4, 4, TextureClass::Rgba8).is_err());
    }

    #[test]
    fn only_editable_formats_classify() {
        assert_eq!(
            classify(DxgiFormat::R8G8B8A8_UNORM),
            Some(TextureClass::Rgba8)
        );
        assert_eq!(classify(DxgiFormat::A8_UNORM), Some(TextureClass::Gray8));
        assert_eq!(classify(DxgiFormat::BC3_UNORM), None);
        assert_eq!(classify(DxgiFormat::R16G16B16A16_FLOAT), None);
    }
}
