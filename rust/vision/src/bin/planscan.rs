// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command line shell around the planscan analysis core
//!
//! Every command prints its result as JSON on stdout. Preview crops are
//! written as PNG files into the output directory.
//!
//! Usage:
//!   planscan detect plan.png --grouped
//!   planscan locate plan.png --x 410 --y 220
//!   planscan measure 0 0 120 0 --pixel-distance 48 --real-distance 4

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::RgbImage;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use planscan_vision::config::RuntimeConfig;
use planscan_vision::image_ops::image_info;
use planscan_vision::{
    detect_legend_groups, detect_legends, edge_points, extract_region, load_image,
    locate_boundary, BoundingBox, Calibration, MeasureRequest, Preview, VisionConfig,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory preview crops are written to (overrides PLANSCAN_OUTPUT_DIR)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the decoded image dimensions
    Info {
        /// Path to the floor plan image
        image: PathBuf,
    },
    /// Detect colored legend markers across the whole image
    Detect {
        /// Path to the floor plan image
        image: PathBuf,
        /// Group markers by color and fill pattern
        #[arg(long)]
        grouped: bool,
    },
    /// Extract the region matching the colors of a selected rectangle
    Extract {
        /// Path to the floor plan image
        image: PathBuf,
        #[arg(long)]
        x: u32,
        #[arg(long)]
        y: u32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
    /// Locate the rectangle of structural lines around a click
    Locate {
        /// Path to the floor plan image
        image: PathBuf,
        #[arg(long)]
        x: u32,
        #[arg(long)]
        y: u32,
        /// Width of the clicked area
        #[arg(long, default_value = "1")]
        width: u32,
        /// Height of the clicked area
        #[arg(long, default_value = "1")]
        height: u32,
    },
    /// Measure the real distance between two points
    Measure {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        /// Reference length in pixels
        #[arg(long, default_value = "0")]
        pixel_distance: f64,
        /// Real length of the reference
        #[arg(long, default_value = "1")]
        real_distance: f64,
    },
    /// Dump the coordinates of every edge pixel
    Edges {
        /// Path to the floor plan image
        image: PathBuf,
    },
}

fn main() -> Result<()> {
    let runtime = RuntimeConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&runtime.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let vision = runtime
        .load_vision_config()
        .context("Failed to load vision config")?;
    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| runtime.output_dir.clone());

    match &cli.command {
        Commands::Info { image } => {
            let img = open_image(image, &runtime)?;
            print_json(&image_info(&img))?;
        }
        Commands::Detect { image, grouped } => {
            let img = open_image(image, &runtime)?;
            detect(&img, &vision, &output_dir, *grouped)?;
        }
        Commands::Extract {
            image,
            x,
            y,
            width,
            height,
        } => {
            let img = open_image(image, &runtime)?;
            let bounds = BoundingBox::new(*x, *y, *width, *height);
            let region = extract_region(&img, &bounds, &vision.sampler)
                .context("Failed to extract region")?;
            save_previews(
                &output_dir,
                &[Preview {
                    name: region.preview.clone(),
                    image: region.crop.clone(),
                }],
            )?;
            print_json(&region)?;
        }
        Commands::Locate {
            image,
            x,
            y,
            width,
            height,
        } => {
            let img = open_image(image, &runtime)?;
            let click = BoundingBox::new(*x, *y, *width, *height);
            print_json(&locate_boundary(&img, &click, &vision.boundary))?;
        }
        Commands::Measure {
            x1,
            y1,
            x2,
            y2,
            pixel_distance,
            real_distance,
        } => {
            let mut calibration = Calibration::new();
            calibration
                .set_calibration(*pixel_distance, *real_distance)
                .context("Invalid calibration")?;
            let request = MeasureRequest {
                x1: *x1,
                y1: *y1,
                x2: *x2,
                y2: *y2,
            };
            let (from, to) = request.endpoints();
            print_json(&calibration.measure(from, to))?;
        }
        Commands::Edges { image } => {
            let img = open_image(image, &runtime)?;
            print_json(&edge_points(&img, &vision.edges))?;
        }
    }

    Ok(())
}

fn open_image(path: &Path, runtime: &RuntimeConfig) -> Result<RgbImage> {
    load_image(path, runtime.max_file_size_mb)
        .with_context(|| format!("Failed to load image {}", path.display()))
}

fn detect(image: &RgbImage, config: &VisionConfig, output_dir: &Path, grouped: bool) -> Result<()> {
    if grouped {
        let (detection, groups) = detect_legend_groups(image, config);
        save_previews(output_dir, &detection.previews)?;
        info!(groups = groups.len(), "Legend groups ready");
        print_json(&groups)
    } else {
        let detection = detect_legends(image, &config.region_filter);
        save_previews(output_dir, &detection.previews)?;
        print_json(&detection.instances)
    }
}

fn save_previews(output_dir: &Path, previews: &[Preview]) -> Result<()> {
    if previews.is_empty() {
        return Ok(());
    }

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    for preview in previews {
        let path = output_dir.join(&preview.name);
        preview
            .image
            .save(&path)
            .with_context(|| format!("Failed to write preview {}", path.display()))?;
    }

    info!(
        count = previews.len(),
        dir = %output_dir.display(),
        "Saved previews"
    );
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).context("Failed to write JSON")?;
    writeln!(out)?;
    Ok(())
}
