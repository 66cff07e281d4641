use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use image::{GrayImage, Luma};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use video_background::{
    AggregationMethod, BackgroundModel, ChunkedSettings, ChunkedStatic, Frame, ImageSequence,
    InpaintSettings, InpaintedStatic, NoSubtraction, OffloadedStreaming, Polarity, RegionMask,
    SampledSettings, SampledStatic, SlidingWindow, SlidingWindowSettings, StaticImage,
    StreamingSettings, VideoSource,
};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModelKind {
    /// Pass frames through unchanged
    None,
    /// Fixed background loaded from --background
    Image,
    /// One frame with the --mask region painted out
    Inpaint,
    /// Aggregate of frames sampled across the whole sequence
    Static,
    /// One sampled background per time chunk
    Chunked,
    /// Background over a sliding window of recent frames
    Sliding,
    /// Sliding background recomputed on a worker thread
    Streaming,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory of frames, one image file per frame
    #[arg(short, long)]
    input: PathBuf,

    /// Directory to write the background and foreground frames to
    #[arg(short, long, default_value = "bgsub-out")]
    output: PathBuf,

    /// Background model
    #[arg(short, long, value_enum, default_value_t = ModelKind::Static)]
    model: ModelKind,

    /// Aggregation statistic: mode, mode_parallel, mean or median
    #[arg(long, default_value = "mode_parallel")]
    method: AggregationMethod,

    /// Foreground polarity: bright_on_dark or dark_on_bright
    #[arg(long, default_value = "bright_on_dark")]
    polarity: Polarity,

    /// Frames sampled per background (static, chunked)
    #[arg(long, default_value_t = 500)]
    samples: usize,

    /// Number of chunks for the chunked model
    #[arg(long, default_value_t = 5)]
    chunks: usize,

    /// Window length in samples (sliding, streaming)
    #[arg(long, default_value_t = 100)]
    window: usize,

    /// Sample every n-th frame into the window (sliding, streaming)
    #[arg(long, default_value_t = 10)]
    every_n: usize,

    /// Background file for the image model (.npy or image)
    #[arg(long)]
    background: Option<PathBuf>,

    /// Frame used by the inpaint model
    #[arg(long, default_value_t = 0)]
    frame_num: usize,

    /// Polygon painted out by the inpaint model, as "x,y;x,y;x,y"
    #[arg(long)]
    mask: Option<String>,

    /// Inpainting neighborhood radius in pixels
    #[arg(long, default_value_t = 3)]
    inpaint_radius: usize,

    /// Show a progress bar while sampling
    #[arg(long)]
    progress: bool,

    /// Only subtract, do not write foreground frames
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("bgsub starting");
    tracing::info!(
        "Model: {:?}, method: {}, polarity: {}",
        args.model,
        args.method,
        args.polarity
    );

    let frames = ImageSequence::open(&args.input)
        .with_context(|| format!("Failed to open frames in {}", args.input.display()))?;

    let mut model = build_model(&args, frames.height(), frames.width())?;
    model.set_polarity(args.polarity);

    let init_start = Instant::now();
    model
        .initialize()
        .context("Failed to initialize background model")?;
    tracing::info!(
        "Background model initialized in {:.1}ms",
        init_start.elapsed().as_secs_f64() * 1000.0
    );

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    run_pipeline(frames, model.as_mut(), &args.output, args.dry_run)?;

    if let Some(background) = model.background_image() {
        let path = args.output.join("background.png");
        save_frame(&background, &path)?;
        tracing::info!("Background written to {}", path.display());
    }

    Ok(())
}

fn build_model(args: &Args, height: usize, width: usize) -> Result<Box<dyn BackgroundModel>> {
    let open_source = || {
        ImageSequence::open(&args.input)
            .with_context(|| format!("Failed to open frames in {}", args.input.display()))
    };

    let model: Box<dyn BackgroundModel> = match args.model {
        ModelKind::None => Box::new(NoSubtraction::new(height, width)),
        ModelKind::Image => {
            let Some(path) = &args.background else {
                bail!("--background is required for the image model");
            };
            Box::new(StaticImage::new(path))
        }
        ModelKind::Inpaint => {
            let Some(polygon) = &args.mask else {
                bail!("--mask is required for the inpaint model");
            };
            let vertices = parse_polygon(polygon)?;
            let mask = RegionMask::from_polygon(height, width, &vertices)
                .context("Invalid mask polygon")?;
            tracing::info!("Mask covers {} pixels", mask.masked_count());
            let settings = InpaintSettings {
                frame_num: args.frame_num,
                inpaint_radius: args.inpaint_radius,
            };
            Box::new(InpaintedStatic::new(open_source()?, mask, settings))
        }
        ModelKind::Static => {
            let settings = SampledSettings {
                num_sample_frames: args.samples,
                method: args.method,
                show_progress: args.progress,
            };
            Box::new(SampledStatic::new(open_source()?, settings))
        }
        ModelKind::Chunked => {
            let settings = ChunkedSettings {
                num_sample_frames: args.samples,
                num_chunks: args.chunks,
                method: args.method,
                show_progress: args.progress,
            };
            Box::new(ChunkedStatic::new(open_source()?, settings))
        }
        ModelKind::Sliding => {
            let settings = SlidingWindowSettings {
                num_sample_frames: args.window,
                sample_every_n_frames: args.every_n,
                method: args.method,
            };
            Box::new(SlidingWindow::new(settings).context("Invalid sliding window settings")?)
        }
        ModelKind::Streaming => {
            let settings = StreamingSettings {
                num_images: args.window,
                every_n_image: args.every_n,
                method: args.method,
            };
            Box::new(
                OffloadedStreaming::new(height, width, settings)
                    .context("Invalid streaming settings")?,
            )
        }
    };
    Ok(model)
}

fn run_pipeline(
    mut frames: ImageSequence,
    model: &mut dyn BackgroundModel,
    output: &Path,
    dry_run: bool,
) -> Result<()> {
    let total = frames.frame_count();
    let mut frame_count = 0usize;
    let mut total_subtract_time = Duration::ZERO;

    tracing::info!("Subtracting background from {} frames", total);

    while frame_count < total {
        let Some(frame) = frames.next_frame() else {
            tracing::warn!("Frame {} unreadable, stopping", frame_count);
            break;
        };

        let subtract_start = Instant::now();
        let foreground = model
            .subtract(&frame)
            .with_context(|| format!("Failed to subtract frame {frame_count}"))?;
        total_subtract_time += subtract_start.elapsed();

        if !dry_run {
            let path = output.join(format!("fg_{frame_count:06}.png"));
            save_frame(&foreground, &path)?;
        }

        frame_count += 1;

        if frame_count % 100 == 0 {
            let avg_ms = total_subtract_time.as_secs_f64() * 1000.0 / frame_count as f64;
            tracing::info!("Frame {}/{}: subtract={:.2}ms", frame_count, total, avg_ms);
        }
    }

    tracing::info!("Processed {} frames", frame_count);
    Ok(())
}

/// Parse "x,y;x,y;..." into polygon vertices
fn parse_polygon(polygon: &str) -> Result<Vec<(f32, f32)>> {
    polygon
        .split(';')
        .filter(|point| !point.trim().is_empty())
        .map(|point| {
            let (x, y) = point
                .split_once(',')
                .with_context(|| format!("Mask vertex '{point}' is not x,y"))?;
            let x = x.trim().parse().with_context(|| format!("Bad x in '{point}'"))?;
            let y = y.trim().parse().with_context(|| format!("Bad y in '{point}'"))?;
            Ok((x, y))
        })
        .collect()
}

/// Write a [0, 1] frame as an 8-bit grayscale PNG
fn save_frame(frame: &Frame, path: &Path) -> Result<()> {
    let (height, width) = frame.dim();
    let image = GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let value = frame[[y as usize, x as usize]].clamp(0.0, 1.0);
        Luma([(value * 255.0).round() as u8])
    });
    image
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}
