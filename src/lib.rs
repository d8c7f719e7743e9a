//! Labelkit: the annotation core of a dataset labeling tool.
//!
//! A human reviews images, a pre-trained detector proposes boxes and masks,
//! the human edits them, and labelkit writes normalized label files while
//! sorting images into output and delete folders. The widget layer is not
//! part of this crate; the CLI drives the same code a GUI would call from its
//! event handlers.
//!
//! # Modules
//!
//! - [`ir`]: Coordinate spaces, annotations and the label line format
//! - [`geometry`]: Mapping between image pixels and the display canvas
//! - [`pipeline`]: Detector and detect-then-segment inference sequencing
//! - [`session`]: Session state, editing, folder sorting and undo
//! - [`config`]: Settings and class registry persistence
//! - [`validation`]: Checks for a saved output dataset
//! - [`error`]: Error types for labelkit operations

pub mod config;
pub mod error;
pub mod geometry;
pub mod ir;
pub mod pipeline;
pub mod session;
pub mod validation;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

pub use error::LabelkitError;

use config::{AppConfig, PipelineSettings};
use ir::Annotation;
use pipeline::{DetectionPipeline, ReplayEngine};
use session::{DrawMode, FolderLayout, ListOrder, Progress, Session};

/// The labelkit CLI application.
#[derive(Parser)]
#[command(name = "labelkit")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List image files in a folder.
    List(ListArgs),
    /// Run the detection pipeline on one image.
    Predict(PredictArgs),
    /// Save an input image with its annotations.
    Save(SaveArgs),
    /// Send a saved image back to the input folder.
    Reject(RejectArgs),
    /// Map a label file back onto its image.
    Show(ShowArgs),
    /// Validate the output folders.
    Validate(ValidateArgs),
    /// Export the class registry as data.yaml.
    Classes(ClassesArgs),
}

#[derive(clap::Args)]
struct ListArgs {
    dir: PathBuf,

    /// Sort by file name instead of directory order.
    #[arg(long)]
    sorted: bool,
}

#[derive(clap::Args)]
struct PredictArgs {
    image: PathBuf,

    /// Detector replay file.
    #[arg(long)]
    detector: Option<PathBuf>,

    /// Segmenter replay file (dual mode).
    #[arg(long)]
    segmenter: Option<PathBuf>,

    /// Detect, then segment each expanded box.
    #[arg(long)]
    dual: bool,

    /// Detector confidence threshold.
    #[arg(long)]
    confidence: Option<f64>,

    /// Per-side box growth before cropping.
    #[arg(long)]
    expand: Option<f64>,

    /// Drop predictions scoring below this.
    #[arg(long)]
    min_score: Option<f64>,

    /// Keep at most this many predictions.
    #[arg(long)]
    max_masks: Option<usize>,

    /// Keep polygons at full vertex count.
    #[arg(long)]
    no_decimate: bool,
}

#[derive(clap::Args)]
struct SaveArgs {
    /// File name inside the input folder.
    image: String,

    /// Directory holding settings.json and classes.json.
    #[arg(long, env = "LABELKIT_CONFIG", default_value = ".")]
    config: PathBuf,

    /// JSON array of pixel-space annotations; omit to save as empty.
    #[arg(long)]
    annotations: Option<PathBuf>,
}

#[derive(clap::Args)]
struct RejectArgs {
    /// File name inside the output image folder.
    image: String,

    #[arg(long, env = "LABELKIT_CONFIG", default_value = ".")]
    config: PathBuf,
}

#[derive(clap::Args)]
struct ShowArgs {
    image: PathBuf,
    label: PathBuf,
}

#[derive(clap::Args)]
struct ValidateArgs {
    #[arg(long, env = "LABELKIT_CONFIG", default_value = ".")]
    config: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Skip the class id check against classes.json.
    #[arg(long)]
    ignore_classes: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args)]
struct ClassesArgs {
    #[arg(long, env = "LABELKIT_CONFIG", default_value = ".")]
    config: PathBuf,

    /// Where to write data.yaml.
    #[arg(long, default_value = "data.yaml")]
    output: PathBuf,
}

/// Run the labelkit CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LabelkitError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::List(args)) => run_list(args),
        Some(Commands::Predict(args)) => run_predict(args),
        Some(Commands::Save(args)) => run_save(args),
        Some(Commands::Reject(args)) => run_reject(args),
        Some(Commands::Show(args)) => run_show(args),
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Classes(args)) => run_classes(args),
        None => {
            println!("labelkit {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Annotation core for detection and segmentation datasets.");
            println!();
            println!("Run 'labelkit --help' for usage information.");
            Ok(())
        }
    }
}

fn run_list(args: ListArgs) -> Result<(), LabelkitError> {
    let order = if args.sorted {
        ListOrder::Sorted
    } else {
        ListOrder::Directory
    };
    for name in session::list_images(&args.dir, order)? {
        println!("{name}");
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<(), LabelkitError> {
    let mut settings = PipelineSettings {
        dual_mode: args.dual,
        decimate: !args.no_decimate,
        min_score: args.min_score,
        max_masks: args.max_masks,
        ..Default::default()
    };
    if let Some(confidence) = args.confidence {
        settings.confidence = confidence;
    }
    if let Some(expand) = args.expand {
        settings.expand_ratio = expand;
    }

    let mut pipeline = DetectionPipeline::new(settings.to_options());
    if let Some(path) = &args.detector {
        pipeline = pipeline.with_detector(Box::new(ReplayEngine::from_path(path)?));
    }
    if let Some(path) = &args.segmenter {
        pipeline = pipeline.with_segmenter(Box::new(ReplayEngine::from_path(path)?));
    }

    let image = session::decode_image(&args.image)?;
    let output = pipeline.run(&image);

    println!("{}", serde_json::to_string_pretty(&output.predictions)?);
    eprint!("{}", output.report);
    Ok(())
}

fn read_annotations(path: &Path) -> Result<Vec<Annotation>, LabelkitError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|source| LabelkitError::AnnotationJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

fn run_save(args: SaveArgs) -> Result<(), LabelkitError> {
    let annotations = match &args.annotations {
        Some(path) => read_annotations(path)?,
        None => Vec::new(),
    };

    let config = AppConfig::load(&args.config)?;
    let mut session = Session::open(config, ListOrder::Directory, DrawMode::Both)?;
    session.select(&args.image)?;

    let status = session.load_current(None);
    if !status.loaded {
        for advisory in &status.advisories {
            eprintln!("{}", advisory.message);
        }
        return Err(LabelkitError::NoCurrentImage);
    }
    session.set_annotations(annotations)?;
    let count = session.editor().annotations().len();

    let progress = session.save()?;
    println!("Saved {} with {} annotation(s)", args.image, count);
    if progress == Progress::Finished {
        println!("All images processed");
    }
    Ok(())
}

fn run_reject(args: RejectArgs) -> Result<(), LabelkitError> {
    let config = AppConfig::load(&args.config)?;
    let layout = FolderLayout::from_settings(&config.settings);
    let path = session::reject_image(&layout, &args.image)?;
    println!("Returned {} to {}", args.image, path.display());
    Ok(())
}

fn run_show(args: ShowArgs) -> Result<(), LabelkitError> {
    let size = imagesize::size(&args.image).map_err(|source| LabelkitError::ImageDimensionRead {
        path: args.image.clone(),
        source,
    })?;
    let annotations =
        ir::io_label::read_label_annotations(&args.label, size.width as f64, size.height as f64)?;
    println!("{}", serde_json::to_string_pretty(&annotations)?);
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), LabelkitError> {
    let config = AppConfig::load(&args.config)?;
    let opts = validation::ValidateOptions {
        strict: args.strict,
        ignore_classes: args.ignore_classes,
    };
    let report = validation::validate_output(
        &config.settings.output_img_folder,
        &config.settings.output_label_folder,
        &config.classes,
        &opts,
    )?;

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "text" => print!("{}", report),
        other => {
            return Err(LabelkitError::UnsupportedFormat(format!(
                "'{}' (supported: text, json)",
                other
            )));
        }
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (opts.strict && has_warnings) {
        Err(LabelkitError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

fn run_classes(args: ClassesArgs) -> Result<(), LabelkitError> {
    let config = AppConfig::load(&args.config)?;
    config::write_data_yaml(&args.output, &config.classes)?;
    println!(
        "Wrote {} class(es) to {}",
        config.classes.classes.len(),
        args.output.display()
    );
    Ok(())
}
