use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use scenefx::filter::parse::{BUILTIN_KINDS, parse_filter_chain};
use scenefx::{
    CpuBackend, CpuBackendOpts, FilterBackend as _, FilterSystem, RenderSurface, Texture,
};

#[derive(Parser, Debug)]
#[command(name = "scenefx", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a JSON filter chain over a PNG.
    Apply(ApplyArgs),
    /// List the built-in filter kinds.
    Kinds,
}

#[derive(Parser, Debug)]
struct ApplyArgs {
    /// Input PNG path.
    #[arg(long)]
    input: PathBuf,

    /// Output PNG path. The image grows by the chain's padding on every side.
    #[arg(long)]
    output: PathBuf,

    /// Filter chain JSON: an array of `{ "kind", "params", "settings" }` objects.
    #[arg(long)]
    filters: PathBuf,

    /// Device pixels per logical unit of the input image.
    #[arg(long, default_value_t = 1.0)]
    resolution: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Apply(args) => cmd_apply(args),
        Command::Kinds => {
            for kind in BUILTIN_KINDS {
                println!("{kind}");
            }
            Ok(())
        }
    }
}

fn read_chain_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let f = File::open(path).with_context(|| format!("open filter chain '{}'", path.display()))?;
    let r = BufReader::new(f);
    serde_json::from_reader(r).with_context(|| "parse filter chain JSON")
}

fn cmd_apply(args: ApplyArgs) -> anyhow::Result<()> {
    let chain = parse_filter_chain(&read_chain_json(&args.filters)?)?;

    let img = image::open(&args.input)
        .with_context(|| format!("decode image '{}'", args.input.display()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    let mut rgba = img.into_raw();
    for px in rgba.chunks_exact_mut(4) {
        let premul = scenefx::Rgba8Premul::from_straight_rgba(px[0], px[1], px[2], px[3]);
        px.copy_from_slice(&premul.to_array());
    }

    let backend = CpuBackend::new(
        CpuBackendOpts::default()
            .with_size(width, height)
            .with_resolution(args.resolution),
    )?;
    let mut system = FilterSystem::new(backend);

    let source = Texture::new(width, height, args.resolution)?;
    system.backend_mut().upload_texture(&source, &rgba)?;

    let result = system.generate_filtered_texture(&source, &chain)?;
    let frame = system
        .backend_mut()
        .read_pixels(&RenderSurface::Texture(result.clone()))?;
    let (out_w, out_h) = result.frame_pixel_size();

    let mut out = Vec::with_capacity((out_w as usize) * (out_h as usize) * 4);
    for y in 0..out_h {
        for x in 0..out_w {
            out.extend_from_slice(&unpremultiply(frame.pixel(x, y).to_array()));
        }
    }

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.output,
        &out,
        out_w,
        out_h,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.output.display()))?;

    let stats = system.pool().stats();
    eprintln!(
        "wrote {} ({out_w}x{out_h}, {} filters, {} textures allocated)",
        args.output.display(),
        chain.len(),
        stats.allocated
    );
    Ok(())
}

fn unpremultiply(px: [u8; 4]) -> [u8; 4] {
    let a = px[3];
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let un = |c: u8| ((u32::from(c) * 255 + u32::from(a) / 2) / u32::from(a)).min(255) as u8;
    [un(px[0]), un(px[1]), un(px[2]), a]
}
