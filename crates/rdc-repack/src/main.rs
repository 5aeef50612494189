//! Command-line driver for inspecting and rewriting `.rdc` captures.

mod textures;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rdc_capture::CaptureFile;

#[derive(Parser, Debug)]
#[command(
    name = "rdc-repack",
    about = "Inspect, patch and repack RenderDoc .rdc frame captures."
)]
struct Args {
    /// Input capture path.
    capture: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print capture metadata, sections and the chunk listing.
    Info,
    /// Export the embedded and extended thumbnails.
    ExportThumbnail {
        /// Output directory (defaults to Export_<capture> next to the input).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Load previously exported thumbnails back in and save a new capture.
    ImportThumbnail {
        /// Directory holding BinaryThumbnail.jpg / ExtThumbnail.png.
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export every decodable texture as a PNG named <resourceId>_<name>.
    ExportTextures {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Patch previously exported textures back in and save a new capture.
    ImportTextures {
        /// Directory of <resourceId>_*.png files (defaults to the export dir).
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Output capture path (defaults to <capture>_repack.rdc).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Overwrite the adapter description in the driver-init chunk.
    Rename {
        /// Replacement device name; must fit the stored field.
        name: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Remove an inclusive event-id range and save a new capture.
    RemoveEvents {
        from: u32,
        to: u32,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Re-save the capture with every section stored uncompressed.
    Repack {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut capture = CaptureFile::open(&args.capture)
        .with_context(|| format!("opening {}", args.capture.display()))?;

    match args.command {
        Command::Info => info(&capture),
        Command::ExportThumbnail { out } => {
            let dir = ensure_dir(out.unwrap_or_else(|| export_dir(&args.capture)))?;
            export_thumbnails(&capture, &dir)
        }
        Command::ImportThumbnail { dir, out } => {
            let dir = dir.unwrap_or_else(|| export_dir(&args.capture));
            import_thumbnails(&mut capture, &dir)?;
            let out = out.unwrap_or_else(|| repack_path(&args.capture));
            capture.save(&out)?;
            println!("thumbnails imported into {}", out.display());
            Ok(())
        }
        Command::ExportTextures { out } => {
            let dir = ensure_dir(out.unwrap_or_else(|| export_dir(&args.capture)).join("Textures"))?;
            let count = textures::export_textures(&capture, &dir)?;
            println!("exported {count} textures to {}", dir.display());
            Ok(())
        }
        Command::ImportTextures { dir, out } => {
            let dir = dir.unwrap_or_else(|| export_dir(&args.capture).join("Textures"));
            let count = textures::import_textures(&mut capture, &dir)?;
            let out = out.unwrap_or_else(|| repack_path(&args.capture));
            capture.save(&out)?;
            println!("patched {count} textures into {}", out.display());
            Ok(())
        }
        Command::Rename { name, out } => {
            capture
                .set_device_name(&name)
                .context("device name was not patched")?;
            let out = out.unwrap_or_else(|| repack_path(&args.capture));
            capture.save(&out)?;
            println!("renamed device to {name:?} in {}", out.display());
            Ok(())
        }
        Command::RemoveEvents { from, to, out } => {
            capture
                .remove_event_range(from, to)
                .context("event range was not removed")?;
            let out = out.unwrap_or_else(|| repack_path(&args.capture));
            capture.save(&out)?;
            println!("removed events {from}..={to}, saved {}", out.display());
            Ok(())
        }
        Command::Repack { out } => {
            let out = out.unwrap_or_else(|| repack_path(&args.capture));
            capture.save(&out)?;
            println!("repacked into {}", out.display());
            Ok(())
        }
    }
}

fn info(capture: &CaptureFile) -> anyhow::Result<()> {
    println!(
        "version 0x{:x}, machine {:#x}, driver {} ({})",
        capture.header.version,
        capture.meta.machine_ident,
        capture
            .meta
            .driver_id
            .name()
            .unwrap_or("unrecognised"),
        capture.meta.driver_name,
    );
    for section in capture.sections() {
        println!(
            "section {:<24} {:<36} {} -> {} bytes",
            section.header.section_type.to_string(),
            section.header.name,
            section.header.compressed_length,
            section.header.uncompressed_length,
        );
    }
    if let Some(err) = capture.frame_capture().chunk_error() {
        println!("frame capture stream failed to decode: {err}");
        return Ok(());
    }
    if let Some(graph) = capture.chunk_manager() {
        print!("{}", graph.dump_chunk_infos());
    }
    Ok(())
}

fn export_thumbnails(capture: &CaptureFile, dir: &Path) -> anyhow::Result<()> {
    let jpeg = dir.join("BinaryThumbnail.jpg");
    fs::write(&jpeg, &capture.thumbnail.data)
        .with_context(|| format!("writing {}", jpeg.display()))?;
    println!("wrote {}", jpeg.display());

    if let Some(thumb) = capture.thumbnail_section().and_then(|s| s.thumbnail()) {
        let path = dir.join("ExtThumbnail.png");
        fs::write(&path, &thumb.pixels).with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {} ({}x{})", path.display(), thumb.header.width, thumb.header.height);
    }
    Ok(())
}

/// Replace the embedded JPEG and, when present, the extended thumbnail
/// with previously exported files. The extended thumbnail must keep its
/// recorded dimensions.
fn import_thumbnails(capture: &mut CaptureFile, dir: &Path) -> anyhow::Result<()> {
    let jpeg = dir.join("BinaryThumbnail.jpg");
    if jpeg.is_file() {
        capture.thumbnail.data = fs::read(&jpeg)?;
        println!("loaded {}", jpeg.display());
    } else {
        eprintln!("{} not found, keeping the embedded thumbnail", jpeg.display());
    }

    let ext = dir.join("ExtThumbnail.png");
    if let Some(section) = capture.thumbnail_section_mut() {
        if ext.is_file() {
            let bytes = fs::read(&ext)?;
            let (width, height) = {
                let reader = png::Decoder::new(std::io::Cursor::new(&bytes)).read_info()?;
                let info = reader.info();
                (
                    u16::try_from(info.width).unwrap_or(u16::MAX),
                    u16::try_from(info.height).unwrap_or(u16::MAX),
                )
            };
            section
                .set_thumbnail_pixels(width, height, bytes)
                .with_context(|| format!("replacing the extended thumbnail from {}", ext.display()))?;
            println!("loaded {} ({width}x{height})", ext.display());
        }
    }
    Ok(())
}

/// `Export_<capture stem>` next to the input, as the original tool laid
/// its output out.
fn export_dir(capture: &Path) -> PathBuf {
    let stem = capture.file_stem().and_then(|s| s.to_str()).unwrap_or("capture");
    capture
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("Export_{stem}"))
}

fn repack_path(capture: &Path) -> PathBuf {
    let stem = capture.file_stem().and_then(|s| s.to_str()).unwrap_or("capture");
    capture
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{stem}_repack.rdc"))
}

fn ensure_dir(dir: PathBuf) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(dir)
}
