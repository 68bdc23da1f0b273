//! vocmap: PASCAL VOC mean Average Precision for object detectors.
//!
//! Ground truth and detections are read from their source formats into a
//! small set of common records ([`ir`]), then scored per class with the
//! VOC2012 all-point interpolated AP ([`eval`]).
//!
//! # Modules
//!
//! - [`ir`]: Boxes, ground-truth and prediction sets, and the format readers
//! - [`eval`]: Matching, precision/recall curves, AP and the report
//! - [`error`]: Error types for vocmap operations

pub mod error;
pub mod eval;
pub mod ir;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use error::VocMapError;

use ir::class_names::{check_class_names, read_class_names};
use ir::io_coco_json::CocoBboxFormat;
use ir::{GroundTruthFormat, GroundTruthSet, PredictionFormat, PredictionSet, ReadContext};

/// The vocmap CLI application.
#[derive(Parser)]
#[command(name = "vocmap")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Compute per-class AP and mAP of predictions against ground truth.
    Eval(EvalArgs),
    /// Compare the image ids of ground truth and predictions.
    Check(CheckArgs),
}

/// Where ground truth and predictions come from.
#[derive(clap::Args)]
struct InputArgs {
    /// Ground-truth directory.
    #[arg(long)]
    gt: PathBuf,

    /// Ground-truth format.
    #[arg(long, value_enum, default_value = "voc")]
    gt_format: GroundTruthFormat,

    /// Prediction file or directory.
    #[arg(long)]
    pred: PathBuf,

    /// Prediction format.
    #[arg(long, value_enum, default_value = "log")]
    pred_format: PredictionFormat,

    /// Comma-separated class names, in evaluation order.
    #[arg(long, value_delimiter = ',', conflicts_with = "classes_file")]
    classes: Vec<String>,

    /// Class names file (`data.yaml` or one name per line).
    #[arg(long)]
    classes_file: Option<PathBuf>,

    /// Image directory for YOLO inputs (default: sibling `images/` of `labels/`).
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// Layout of COCO `bbox` arrays.
    #[arg(long, value_enum, default_value = "xywh")]
    coco_bbox: CocoBboxFormat,
}

/// Arguments for the eval subcommand.
#[derive(clap::Args)]
struct EvalArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Minimum IoU for a detection to match a ground-truth box.
    #[arg(long, env = "VOCMAP_MIN_OVERLAP", default_value_t = eval::DEFAULT_MIN_OVERLAP)]
    min_overlap: f64,

    /// Approximate number of precision/recall points shown per class.
    #[arg(long, default_value_t = 10)]
    samples: usize,

    /// Output format for the report ('text' or 'json').
    #[arg(long, value_enum, default_value = "text")]
    output: ReportFormat,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,
}

/// Arguments for the check subcommand.
#[derive(clap::Args)]
struct CheckArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Exit non-zero unless both sides cover the same images.
    #[arg(long)]
    strict: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// Run the vocmap CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), VocMapError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Eval(args)) => run_eval(args),
        Some(Commands::Check(args)) => run_check(args),
        None => {
            println!("vocmap {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("PASCAL VOC mAP evaluation for object detectors.");
            println!();
            println!("Run 'vocmap --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the eval subcommand.
fn run_eval(args: EvalArgs) -> Result<(), VocMapError> {
    if !(0.0..=1.0).contains(&args.min_overlap) {
        return Err(VocMapError::InvalidOption(format!(
            "--min-overlap must be within [0, 1], got {}",
            args.min_overlap
        )));
    }

    let class_names = load_class_names(&args.input)?;
    let (ground_truth, predictions) = load_inputs(&args.input, &class_names)?;

    let opts = eval::EvalOptions {
        min_overlap: args.min_overlap,
        samples: args.samples,
    };
    let report = eval::evaluate(&ground_truth, &predictions, &class_names, &opts);

    match args.output {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&report).map_err(VocMapError::ReportWrite)?;
            println!("{}", json);
        }
        ReportFormat::Text => print!("{}", report),
    }

    let error_count = report.error_count();
    let warning_count = report.warning_count();
    if error_count > 0 || (args.strict && warning_count > 0) {
        Err(VocMapError::EvaluationFailed {
            error_count,
            warning_count,
        })
    } else {
        Ok(())
    }
}

/// Execute the check subcommand.
fn run_check(args: CheckArgs) -> Result<(), VocMapError> {
    let class_names = load_class_names(&args.input)?;
    let (ground_truth, predictions) = load_inputs(&args.input, &class_names)?;

    let coverage = eval::check_image_ids(&ground_truth, &predictions);
    print!("{}", coverage);

    if args.strict && !coverage.is_complete() {
        Err(VocMapError::EvaluationFailed {
            error_count: 0,
            warning_count: coverage.only_in_ground_truth.len() + coverage.only_in_predictions.len(),
        })
    } else {
        Ok(())
    }
}

fn load_class_names(input: &InputArgs) -> Result<Vec<String>, VocMapError> {
    let names = match &input.classes_file {
        Some(path) => read_class_names(path)?,
        None => input.classes.iter().map(|s| s.trim().to_string()).collect(),
    };

    if names.is_empty() {
        return Err(VocMapError::InvalidOption(
            "one of --classes or --classes-file is required".to_string(),
        ));
    }
    check_class_names(&names).map_err(VocMapError::InvalidOption)?;
    Ok(names)
}

fn load_inputs(
    input: &InputArgs,
    class_names: &[String],
) -> Result<(GroundTruthSet, PredictionSet), VocMapError> {
    let ctx = ReadContext {
        class_names,
        images_dir: input.images_dir.as_deref(),
        coco_bbox: input.coco_bbox,
    };

    let ground_truth = input.gt_format.read(&input.gt, &ctx)?;
    let mut predictions = input.pred_format.read(&input.pred, &ctx)?;

    let renames = predictions.align_numeric_ids(&ground_truth);
    if let Some((from, to)) = renames.first() {
        eprintln!(
            "Warning: matched {} numeric prediction image id(s) to ground-truth stems by value, e.g. {} -> {}",
            renames.len(),
            from,
            to
        );
    }
    Ok((ground_truth, predictions))
}
