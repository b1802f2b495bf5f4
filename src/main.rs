use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tof_capture::depth_pipeline::{
    DepthRenderer, ExportConfig, FpsMode, PipelineConfig, StageTimings, StreamFileReader,
    TiffCompression, TiffVisualizationWriter, Timer, VisualizationWriter,
};
use tof_capture::logger;

use tracing::{info, warn};

/// Inspect and replay recorded depth stream files
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,
    /// Log at debug level unless RUST_LOG is set
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the header and frame count of a stream file
    Inspect {
        file: PathBuf,
    },
    /// Re-render every frame of a stream file to RGBA TIFF images
    Replay {
        file: PathBuf,
        /// Directory receiving frame_NNNN.tiff
        #[clap(short, long, default_value = "replay")]
        out_dir: PathBuf,
        /// Orientation the frames were recorded in
        #[clap(short, long, value_enum, default_value_t = Orientation::Natural)]
        rotation: Orientation,
        /// Normalize against each frame's observed range instead of the static one
        #[clap(short, long)]
        dynamic: bool,
        /// Confidence fraction a sample must exceed to be shown
        #[clap(short, long, default_value_t = 0.0)]
        threshold: f32,
        /// Static range lower bound in millimeters
        #[clap(long, default_value_t = 0)]
        min_mm: i16,
        /// Static range upper bound in millimeters
        #[clap(long, default_value_t = 5000)]
        max_mm: i16,
        #[clap(short, long, value_enum, default_value_t = Compression::None)]
        compression: Compression,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Orientation {
    /// Transposed raster (rotation hint 0)
    Natural,
    /// Sensor-order raster (rotation hint 1)
    Rotated,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Compression {
    None,
    Lzw,
    Deflate,
}

impl From<Compression> for TiffCompression {
    fn from(value: Compression) -> Self {
        match value {
            Compression::None => TiffCompression::None,
            Compression::Lzw => TiffCompression::Lzw,
            Compression::Deflate => TiffCompression::Deflate,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.verbose {
        logger::init_with_default("debug");
    } else {
        logger::init();
    }

    match args.command {
        Command::Inspect { file } => inspect(&file),
        Command::Replay {
            file,
            out_dir,
            rotation,
            dynamic,
            threshold,
            min_mm,
            max_mm,
            compression,
        } => {
            let config = PipelineConfig::builder()
                .confidence_threshold(threshold)
                .static_range_mm(min_mm, max_mm)
                .build();
            config.validate()?;
            let export = ExportConfig::builder().compression(compression.into()).build();
            replay(&file, &out_dir, rotation, dynamic, &config, &export)
        }
    }
}

fn inspect(file: &Path) -> anyhow::Result<()> {
    let reader = StreamFileReader::open(file)
        .with_context(|| format!("cannot open {}", file.display()))?;
    let header = *reader.header();
    let file_len = std::fs::metadata(file)?.len();

    println!("file:            {}", file.display());
    println!("platform:        {}", header.platform_id);
    println!("frame size:      {}x{}", header.width, header.height);
    println!("bytes per pixel: {}", header.bytes_per_pixel);
    match header.fps_mode {
        FpsMode::Dynamic => println!("fps mode:        dynamic"),
        FpsMode::Fixed(fps) => println!("fps mode:        fixed {} fps", fps),
    }
    println!("frames:          {}", header.frame_count(file_len));

    if header.fps_mode == FpsMode::Dynamic {
        let mut total_ms = 0u64;
        for frame in reader {
            total_ms += u64::from(frame?.elapsed_ms.unwrap_or(0));
        }
        println!("duration:        {:.3} s", total_ms as f64 / 1000.0);
    }
    Ok(())
}

fn replay(
    file: &Path,
    out_dir: &Path,
    orientation: Orientation,
    dynamic: bool,
    config: &PipelineConfig,
    export: &ExportConfig,
) -> anyhow::Result<()> {
    let mut reader = StreamFileReader::open(file)
        .with_context(|| format!("cannot open {}", file.display()))?;
    let header = *reader.header();
    if header.bytes_per_pixel != 2 {
        bail!("unsupported sample size: {} bytes", header.bytes_per_pixel);
    }
    let (width, height) = match orientation {
        Orientation::Natural => (header.height as usize, header.width as usize),
        Orientation::Rotated => (header.width as usize, header.height as usize),
    };

    std::fs::create_dir_all(out_dir)?;
    info!("Replaying {} as {}x{} frames", file.display(), width, height);

    let renderer = DepthRenderer::new(config);
    let writer = TiffVisualizationWriter;
    let mut timings = StageTimings::new();
    let mut exported = 0usize;

    while let Some(frame) = reader.next_frame()? {
        let index = reader.frames_read();

        let timer = Timer::start("render");
        let (visualization, stats) =
            renderer.render_recorded(&frame.samples(), width, height, dynamic)?;
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        if stats.is_degenerate() {
            warn!("Frame {} has no valid samples", index);
        }

        let timer = Timer::start("export");
        let path = out_dir.join(format!("frame_{:04}.tiff", index));
        let mut output = BufWriter::new(File::create(&path)?);
        writer.write_frame(&visualization, &mut output, export)?;
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        exported += 1;
    }

    for line in timings.summary_lines() {
        println!("{}", line);
    }
    info!("Exported {} frames to {}", exported, out_dir.display());
    Ok(())
}
