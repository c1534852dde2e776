//! CLI front end over the `contour_locate` library. A thin presentation
//! layer, not part of the core engine — it exists so the crate is a
//! runnable demonstration of the engine, the way the teacher's `main.rs`
//! is a thin wrapper around its own scanning/detector modules.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use imageproc::drawing::draw_line_segment_mut;
use tracing_subscriber::EnvFilter;

use contour_locate::config::{MatchConfig, Mode as EngineMode, SearchParams};
use contour_locate::raster::Raster;
use contour_locate::{contour, matcher, pattern};

#[derive(Parser)]
#[command(name = "contour-locate", about = "Contour-based holistic image matcher")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Match one query image against one or more reference images.
    Match {
        query: PathBuf,
        references: Vec<PathBuf>,

        #[arg(long, value_enum, default_value = "holistic-simple")]
        mode: CliMode,

        #[arg(long, default_value_t = 50)]
        threshold: u8,

        #[arg(long, default_value_t = 512)]
        pattern_size: u32,

        #[arg(long, default_value_t = 10.0)]
        angle_step: f64,

        #[arg(long, default_value_t = 10)]
        scale_steps: usize,
    },
    /// Trace contours out of one image and write them over a copy of it —
    /// a preview/visualization surface for `extract_contours`.
    Extract {
        image: PathBuf,

        #[arg(long, default_value_t = 50)]
        threshold: u8,

        #[arg(long, default_value = "contours.png")]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CliMode {
    Individual,
    HolisticFull,
    HolisticSimple,
}

impl From<CliMode> for EngineMode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Individual => EngineMode::Individual,
            CliMode::HolisticFull => EngineMode::HolisticFull,
            CliMode::HolisticSimple => EngineMode::HolisticSimple,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Match {
            query,
            references,
            mode,
            threshold,
            pattern_size,
            angle_step,
            scale_steps,
        } => run_match(query, references, mode, threshold, pattern_size, angle_step, scale_steps),
        Command::Extract { image, threshold, out } => run_extract(image, threshold, out),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_match(
    query_path: PathBuf,
    reference_paths: Vec<PathBuf>,
    mode: CliMode,
    threshold: u8,
    pattern_size: u32,
    angle_step: f64,
    scale_steps: usize,
) -> Result<()> {
    if reference_paths.is_empty() {
        anyhow::bail!("at least one reference image is required");
    }

    let query = Raster::open(&query_path).context("failed to load query image")?;
    let references: Vec<Raster> = reference_paths
        .iter()
        .map(|p| Raster::open(p).with_context(|| format!("failed to load reference {}", p.display())))
        .collect::<Result<_>>()?;

    let mode: EngineMode = mode.into();
    let config = MatchConfig {
        mode,
        threshold,
        pattern_size,
        search: SearchParams {
            simplify: matches!(mode, EngineMode::HolisticSimple),
            angle_step_deg: angle_step,
            scale_steps,
            ..SearchParams::default()
        },
        ..MatchConfig::default()
    };

    tracing::info!(query = %query_path.display(), references = references.len(), ?mode, "running match");

    let result = matcher::match_query(&query, &references, &config)?;

    if result.query_featureless {
        println!("query image is featureless (no contours found)");
    }

    println!("rank  reference                         score   flags");
    for (rank, entry) in result.per_reference.iter().enumerate() {
        let path = &reference_paths[entry.index];
        let mut flags = Vec::new();
        if entry.result.reference_featureless {
            flags.push("featureless");
        }
        if entry.result.fetch_error {
            flags.push("fetch_error");
        }
        if entry.result.low_confidence {
            flags.push("low_confidence");
        }
        println!(
            "{:>4}  {:<32}  {:>6.2}  {}",
            rank + 1,
            truncate_display(path, 32),
            entry.result.score,
            flags.join(",")
        );
    }

    if let Some(best) = result.best_index {
        println!(
            "\nbest match: {} (score {:.2})",
            reference_paths[best].display(),
            result.best_score
        );
    } else {
        println!("\nno reference produced a result");
    }

    Ok(())
}

fn truncate_display(path: &Path, max: usize) -> String {
    let s = path.display().to_string();
    if s.len() <= max {
        s
    } else {
        format!("...{}", &s[s.len() - (max - 3)..])
    }
}

fn run_extract(image_path: PathBuf, threshold: u8, out_path: PathBuf) -> Result<()> {
    let raster = Raster::open(&image_path).context("failed to load image")?;
    let contours = contour::extract_contours(&raster, threshold);

    tracing::info!(count = contours.len(), "extracted contours");

    let mut canvas = raster.as_rgb8().clone();
    for c in contours.contours() {
        let points = c.points();
        if points.len() < 2 {
            continue;
        }
        for i in 0..points.len() {
            let (x1, y1) = points[i];
            let (x2, y2) = points[(i + 1) % points.len()];
            draw_line_segment_mut(
                &mut canvas,
                (x1 as f32, y1 as f32),
                (x2 as f32, y2 as f32),
                image::Rgb([255, 0, 0]),
            );
        }
    }

    canvas
        .save(&out_path)
        .with_context(|| format!("failed to write {}", out_path.display()))?;

    println!(
        "wrote {} contour(s) over {} to {}",
        contours.len(),
        image_path.display(),
        out_path.display()
    );

    // Preview of the fixed-size pattern the holistic matcher would compare.
    let pattern = pattern::rasterize(&contours, 512);
    println!("pattern: {}x{}, {} drawn pixels", pattern.side(), pattern.side(), pattern.drawn_count());

    Ok(())
}
