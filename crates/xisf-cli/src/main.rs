//! xisf - read/write XISF 1.0 image containers

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use xisf_image::{ColorSpace, Image, SampleFormat};
use xisf_xml::{PixelPlacement, Reader, Writer};

#[derive(Parser)]
#[command(
    name = "xisf",
    about = "Inspect and round-trip XISF 1.0 image containers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of an XISF file: geometry, sample format, properties, FITS keywords
    Info {
        /// XISF file to inspect
        file: PathBuf,
        /// Also decode and report the pixel payload size of each image
        #[arg(long)]
        pixels: bool,
    },
    /// Re-encode an XISF file, optionally changing the pixel placement
    Copy {
        /// Source XISF file
        input: PathBuf,
        /// Destination XISF file
        output: PathBuf,
        /// Where to place pixel data: attachment (default) or inline
        #[arg(long, default_value = "attachment")]
        placement: String,
    },
    /// Extract the file-level thumbnail, if present
    Thumbnail {
        /// Source XISF file
        input: PathBuf,
        /// Destination file for the raw thumbnail payload
        output: PathBuf,
    },
}

fn placement_from_name(name: &str) -> Result<PixelPlacement> {
    match name {
        "attachment" => Ok(PixelPlacement::Attachment),
        "inline" | "inline-base64" => Ok(PixelPlacement::Inline(xisf_core::datablock::Encoding::Base64)),
        "inline-base16" | "inline-hex" => Ok(PixelPlacement::Inline(xisf_core::datablock::Encoding::Base16)),
        "embedded" | "embedded-base64" => Ok(PixelPlacement::Embedded(xisf_core::datablock::Encoding::Base64)),
        "embedded-base16" | "embedded-hex" => Ok(PixelPlacement::Embedded(xisf_core::datablock::Encoding::Base16)),
        other => anyhow::bail!(
            "unknown placement '{other}'. Valid options: attachment, inline, inline-base16, embedded, embedded-base16"
        ),
    }
}

fn sample_format_label(fmt: SampleFormat) -> &'static str {
    fmt.name()
}

fn color_space_label(cs: ColorSpace) -> &'static str {
    cs.name()
}

fn print_image_summary(index: usize, img: &Image, pixels: bool) {
    println!("image {index}:");
    println!(
        "  geometry       : {}x{}x{}",
        img.width(),
        img.height(),
        img.channels()
    );
    println!("  sampleFormat   : {}", sample_format_label(img.sample_format()));
    println!("  colorSpace     : {}", color_space_label(img.color_space));
    println!("  pixelStorage   : {}", img.pixel_storage.name());
    println!("  imageType      : {}", img.image_type.name());
    println!("  bounds         : {}:{}", img.bounds.0, img.bounds.1);
    if pixels {
        println!("  pixel bytes    : {}", img.pixels().len());
    }
    if let Some(icc) = &img.icc_profile {
        println!("  iccProfile     : {} bytes", icc.len());
    }
    if let Some(cfa) = &img.cfa {
        println!("  cfa            : {} ({}x{})", cfa.pattern, cfa.width, cfa.height);
    }

    if !img.properties().is_empty() {
        println!("  properties:");
        for p in img.properties() {
            let rendered = p.value.format_scalar().unwrap_or_else(|| format!("<{}>", p.value.type_name()));
            println!("    {:<32} {:<10} {}", p.id, p.value.type_name(), rendered);
        }
    }
    if !img.fits_keywords.is_empty() {
        println!("  FITS keywords:");
        for kw in &img.fits_keywords {
            println!("    {:<8} = {}", kw.name, kw.value);
        }
    }
}

fn run_info(file: PathBuf, pixels: bool) -> Result<()> {
    let f = File::open(&file).with_context(|| format!("opening {file:?}"))?;
    let mut reader = Reader::open(BufReader::new(f)).with_context(|| format!("parsing {file:?}"))?;

    println!("=== {file:?} ===");
    println!("images: {}", reader.image_count());

    if !reader.file_properties().is_empty() {
        println!("file properties:");
        for p in reader.file_properties() {
            let rendered = p.value.format_scalar().unwrap_or_else(|| format!("<{}>", p.value.type_name()));
            println!("  {:<32} {:<10} {}", p.id, p.value.type_name(), rendered);
        }
    }
    if let Some(thumb) = reader.thumbnail() {
        println!(
            "thumbnail      : {}x{}x{}, {} bytes",
            thumb.width(),
            thumb.height(),
            thumb.channels(),
            thumb.pixels().len()
        );
    }
    println!();

    for i in 0..reader.image_count() {
        let img = reader.get_image(i, pixels)?;
        print_image_summary(i, img, pixels);
        println!();
    }

    Ok(())
}

fn run_copy(input: PathBuf, output: PathBuf, placement: String) -> Result<()> {
    let placement = placement_from_name(&placement)?;

    let f = File::open(&input).with_context(|| format!("opening {input:?}"))?;
    let mut reader = Reader::open(BufReader::new(f)).with_context(|| format!("parsing {input:?}"))?;

    let mut images = Vec::with_capacity(reader.image_count());
    for i in 0..reader.image_count() {
        images.push(reader.get_image(i, true)?.clone());
    }
    let file_properties = reader.file_properties().to_vec();
    let thumbnail = reader.thumbnail().cloned();

    let out = File::create(&output).with_context(|| format!("creating {output:?}"))?;
    let mut sink = BufWriter::new(out);
    Writer::write(&mut sink, &images, &file_properties, thumbnail.as_ref(), placement)
        .with_context(|| format!("writing {output:?}"))?;

    println!("wrote {} image(s) to {output:?}", images.len());
    Ok(())
}

fn run_thumbnail(input: PathBuf, output: PathBuf) -> Result<()> {
    let f = File::open(&input).with_context(|| format!("opening {input:?}"))?;
    let mut reader = Reader::open(BufReader::new(f)).with_context(|| format!("parsing {input:?}"))?;

    let thumb: &Image = reader
        .thumbnail()
        .ok_or_else(|| anyhow::anyhow!("{input:?} has no file-level thumbnail"))?;
    let bytes = thumb.pixels().to_vec();
    std::fs::write(&output, &bytes).with_context(|| format!("writing {output:?}"))?;
    println!("wrote {} bytes to {output:?}", bytes.len());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Info { file, pixels } => run_info(file, pixels),
        Commands::Copy {
            input,
            output,
            placement,
        } => run_copy(input, output, placement),
        Commands::Thumbnail { input, output } => run_thumbnail(input, output),
    }
}
