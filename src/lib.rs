//! Boxlist: bounding-box collections for object detection pipelines.
//!
//! Boxlist stores a batch of boxes in one canonical coordinate order together
//! with named per-box attributes, and provides the geometric operations a
//! detection training/evaluation loop needs: format conversion, filtering,
//! clipping, scaling, class-aware non-maximum suppression, and shaping
//! results for a COCO-style evaluator.
//!
//! # Modules
//!
//! - [`boxes`]: The [`BoxList`](boxes::BoxList) collection and box geometry
//! - [`nms`]: Per-class greedy non-maximum suppression
//! - [`adapter`]: Conversion to and from a detector's label convention
//! - [`eval`]: COCO ground-truth and result records
//! - [`io_records`]: JSON files of per-image detection records
//! - [`error`]: Error types for boxlist operations

pub mod adapter;
pub mod boxes;
pub mod error;
pub mod eval;
pub mod io_records;
pub mod nms;

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{info, warn};

use boxes::{BoxFormat, BoxList, DEFAULT_SCORE_THRESHOLD};
pub use error::BoxListError;

/// The boxlist CLI application.
#[derive(Parser)]
#[command(name = "boxlist")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Remove duplicate detections with per-class non-maximum suppression.
    Nms(NmsArgs),
    /// Keep only detections scoring above a threshold.
    Filter(FilterArgs),
    /// Clamp boxes to the image bounds.
    Clip(ClipArgs),
    /// Multiply box coordinates by per-axis factors.
    Scale(ScaleArgs),
    /// Write COCO ground-truth and prediction files for an external evaluator.
    Export(ExportArgs),
}

/// Output options shared by the transform subcommands.
#[derive(clap::Args)]
struct OutputArgs {
    /// Write records here instead of printing them to stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Box format of the written records ('xyxy', 'yxyx', 'xywh', or 'cxcywh').
    #[arg(long, default_value = "xyxy")]
    format: String,
}

/// Arguments for the nms subcommand.
#[derive(clap::Args)]
struct NmsArgs {
    /// Detection records to suppress.
    input: PathBuf,

    /// Boxes overlapping a higher-scoring box of the same class by more
    /// than this IoU are removed.
    #[arg(long, default_value_t = nms::DEFAULT_IOU_THRESHOLD)]
    iou: f64,

    #[command(flatten)]
    out: OutputArgs,
}

/// Arguments for the filter subcommand.
#[derive(clap::Args)]
struct FilterArgs {
    /// Detection records to filter.
    input: PathBuf,

    /// Detections must score strictly above this value to be kept.
    #[arg(long, default_value_t = DEFAULT_SCORE_THRESHOLD)]
    score: f64,

    #[command(flatten)]
    out: OutputArgs,
}

/// Arguments for the clip subcommand.
#[derive(clap::Args)]
struct ClipArgs {
    /// Detection records to clip.
    input: PathBuf,

    /// Image height in pixels.
    #[arg(long)]
    height: f64,

    /// Image width in pixels.
    #[arg(long)]
    width: f64,

    #[command(flatten)]
    out: OutputArgs,
}

/// Arguments for the scale subcommand.
#[derive(clap::Args)]
struct ScaleArgs {
    /// Detection records to scale.
    input: PathBuf,

    /// Factor applied to y coordinates.
    #[arg(long)]
    y_scale: f64,

    /// Factor applied to x coordinates.
    #[arg(long)]
    x_scale: f64,

    #[command(flatten)]
    out: OutputArgs,
}

/// Arguments for the export subcommand.
#[derive(clap::Args)]
struct ExportArgs {
    /// Ground-truth records, one per image.
    #[arg(long)]
    targets: PathBuf,

    /// Predicted records (with scores), in the same image order.
    #[arg(long)]
    predictions: PathBuf,

    /// Number of classes in the label space.
    #[arg(long)]
    num_classes: usize,

    /// Directory that receives gt.json and preds.json.
    #[arg(long)]
    out_dir: PathBuf,
}

/// Run the boxlist CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), BoxListError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Nms(args)) => {
            let iou = args.iou;
            run_transform(&args.input, &args.out, "nms", |list| list.suppress(iou))
        }
        Some(Commands::Filter(args)) => {
            let score = args.score;
            run_transform(&args.input, &args.out, "filter", |list| {
                list.score_filter(score)
            })
        }
        Some(Commands::Clip(args)) => {
            let (height, width) = (args.height, args.width);
            run_transform(&args.input, &args.out, "clip", |list| {
                list.clip_to_image(height, width)
            })
        }
        Some(Commands::Scale(args)) => {
            let (y_scale, x_scale) = (args.y_scale, args.x_scale);
            run_transform(&args.input, &args.out, "scale", |list| {
                Ok(list.scale(y_scale, x_scale))
            })
        }
        Some(Commands::Export(args)) => run_export(args),
        None => {
            // No subcommand: just print help hint and exit successfully
            println!("boxlist {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Bounding-box lists, NMS, and COCO export for object detection.");
            println!();
            println!("Run 'boxlist --help' for usage information.");
            Ok(())
        }
    }
}

/// Applies `op` to every record in `input` and writes the results.
fn run_transform<F>(
    input: &std::path::Path,
    out: &OutputArgs,
    name: &str,
    op: F,
) -> Result<(), BoxListError>
where
    F: Fn(&BoxList) -> Result<BoxList, BoxListError>,
{
    let format: BoxFormat = out.format.parse()?;
    let lists = io_records::read_records(input)?;

    let results = lists.iter().map(&op).collect::<Result<Vec<_>, _>>()?;

    let before: usize = lists.iter().map(BoxList::len).sum();
    let after: usize = results.iter().map(BoxList::len).sum();
    info!(
        "{}: {} -> {} boxes across {} image(s)",
        name,
        before,
        after,
        lists.len()
    );

    match &out.output {
        Some(path) => {
            io_records::write_records(path, &results, format)?;
            println!(
                "{}: kept {} of {} boxes across {} image(s)",
                name,
                after,
                before,
                results.len()
            );
        }
        None => println!("{}", io_records::to_records_string(&results, format)?),
    }

    Ok(())
}

/// Execute the export subcommand.
fn run_export(args: ExportArgs) -> Result<(), BoxListError> {
    let targets = io_records::read_records(&args.targets)?;
    let predictions = io_records::read_records(&args.predictions)?;
    if targets.len() != predictions.len() {
        warn!(
            "{} target image(s) but {} prediction image(s); image ids are assigned by position",
            targets.len(),
            predictions.len()
        );
    }

    fs::create_dir_all(&args.out_dir)?;

    let ground_truth = eval::to_ground_truth_json(&targets, args.num_classes)?;
    let gt_path = args.out_dir.join("gt.json");
    eval::write_ground_truth_json(&gt_path, &ground_truth)?;
    println!(
        "Wrote {} annotation(s) for {} image(s) to {}",
        ground_truth.annotations.len(),
        ground_truth.images.len(),
        gt_path.display()
    );

    match eval::to_predictions_json(&predictions)? {
        Some(preds) => {
            let preds_path = args.out_dir.join("preds.json");
            eval::write_predictions_json(&preds_path, &preds)?;
            println!(
                "Wrote {} prediction(s) to {}",
                preds.len(),
                preds_path.display()
            );
        }
        None => {
            warn!("no predicted boxes; preds.json not written");
            println!("No predictions: metric undefined, evaluation should be skipped");
        }
    }

    Ok(())
}
