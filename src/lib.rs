//! Labelgeom: geometry and representation engine for image annotations.
//!
//! Labelgeom holds located objects (boxes with optional polygons) in either
//! absolute pixel or normalized coordinates, and provides the geometric
//! operations annotation tooling needs: coordinate conversion, polygon
//! intersection and union, IoU, merging of adjacent same-label fragments,
//! simplification, and conversion between vector annotations and label
//! rasters.
//!
//! # Modules
//!
//! - [`ir`]: Annotation value types (AnnotationSet, LocatedObject, Polygon, etc.)
//! - [`transform`]: Absolute <-> normalized coordinate conversion
//! - [`geometry`]: Polygon algebra, the geometry kernel, and the polygon merger
//! - [`raster`]: Contour tracing and rasterization
//! - [`record`]: Image + annotation containers with lazy image loading
//! - [`validation`]: Structural validation and error reporting
//! - [`error`]: Error types for labelgeom operations

pub mod error;
pub mod geometry;
pub mod ir;
pub mod raster;
pub mod record;
pub mod transform;
pub mod validation;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use error::LabelGeomError;
pub use geometry::{
    bbox_to_polygon, fit_in_region, intersect_over_union, merge_polygons, object_iou,
    polygon_to_located_object, simplify, MergeOptions,
};
pub use ir::{AnnotationSet, CoordSpace, LocatedObject, Point, Polygon};
pub use raster::{Palette, TraceOptions};
pub use transform::{to_absolute, to_normalized};

/// The labelgeom CLI application.
#[derive(Parser)]
#[command(name = "labelgeom")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Validate an annotation set for errors and warnings.
    Validate(ValidateArgs),
    /// Convert an annotation set to normalized coordinates.
    Normalize(ConvertArgs),
    /// Convert an annotation set to absolute pixel coordinates.
    Absolute(ConvertArgs),
    /// Merge adjacent objects that share a label.
    Merge(MergeArgs),
    /// Simplify object polygons.
    Simplify(SimplifyArgs),
    /// Trace an indexed PNG raster into an annotation set.
    Trace(TraceArgs),
    /// Paint an annotation set into an indexed PNG raster.
    Rasterize(RasterizeArgs),
}

/// Image size, given directly or read from an image file.
#[derive(clap::Args)]
struct DimensionArgs {
    /// Image width in pixels.
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Image height in pixels.
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Image file to read the size from.
    #[arg(long, conflicts_with_all = ["width", "height"])]
    image: Option<PathBuf>,
}

impl DimensionArgs {
    fn resolve(&self) -> Result<Option<(u32, u32)>, LabelGeomError> {
        match (&self.image, self.width, self.height) {
            (Some(path), _, _) => record::ImageSource::from_path(path).dimensions().map(Some),
            (None, Some(w), Some(h)) => Ok(Some((w, h))),
            _ => Ok(None),
        }
    }

    fn require(&self) -> Result<(u32, u32), LabelGeomError> {
        self.resolve()?.ok_or(LabelGeomError::MissingDimensions)
    }
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// IR JSON file to validate.
    input: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,

    #[command(flatten)]
    dims: DimensionArgs,
}

/// Arguments for the normalize and absolute subcommands.
#[derive(clap::Args)]
struct ConvertArgs {
    /// IR JSON input file.
    input: PathBuf,

    /// Output file (stdout if omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    dims: DimensionArgs,
}

/// Arguments for the merge subcommand.
#[derive(clap::Args)]
struct MergeArgs {
    /// IR JSON input file.
    input: PathBuf,

    /// Output file (stdout if omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Largest slope difference at which two edges count as parallel.
    #[arg(long, default_value_t = 1e-6)]
    max_slope_diff: f64,

    /// Largest distance at which two parallel edges count as touching.
    #[arg(long, default_value_t = 1.0)]
    max_dist: f64,

    #[command(flatten)]
    dims: DimensionArgs,
}

/// Arguments for the simplify subcommand.
#[derive(clap::Args)]
struct SimplifyArgs {
    /// IR JSON input file.
    input: PathBuf,

    /// Output file (stdout if omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Ramer-Douglas-Peucker tolerance, in the set's units.
    #[arg(long, default_value_t = 1.0)]
    tolerance: f64,
}

/// Arguments for the trace subcommand.
#[derive(clap::Args)]
struct TraceArgs {
    /// 8-bit grayscale PNG whose pixel values are label indices.
    input: PathBuf,

    /// Output file (stdout if omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Comma-separated labels in palette order.
    #[arg(long, value_delimiter = ',')]
    labels: Vec<String>,

    /// Background index.
    #[arg(long, default_value_t = 0)]
    background: u8,

    /// Smallest accepted object side, in pixels.
    #[arg(long)]
    min_size: Option<f64>,

    /// Largest accepted object side, in pixels.
    #[arg(long)]
    max_size: Option<f64>,

    /// Also filter on the minimum-area enclosing rectangle.
    #[arg(long)]
    min_rect: bool,
}

/// Arguments for the rasterize subcommand.
#[derive(clap::Args)]
struct RasterizeArgs {
    /// IR JSON input file.
    input: PathBuf,

    /// Output PNG file.
    #[arg(short, long)]
    output: PathBuf,

    /// Comma-separated labels in palette order (default: labels in order of appearance).
    #[arg(long, value_delimiter = ',')]
    labels: Vec<String>,

    /// Background index.
    #[arg(long, default_value_t = 0)]
    background: u8,

    #[command(flatten)]
    dims: DimensionArgs,
}

/// Run the labelgeom CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LabelGeomError> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Normalize(args)) => run_convert(args, CoordSpace::Normalized),
        Some(Commands::Absolute(args)) => run_convert(args, CoordSpace::Absolute),
        Some(Commands::Merge(args)) => run_merge(args),
        Some(Commands::Simplify(args)) => run_simplify(args),
        Some(Commands::Trace(args)) => run_trace(args),
        Some(Commands::Rasterize(args)) => run_rasterize(args),
        None => {
            println!("labelgeom {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Geometry engine for image annotations.");
            println!();
            println!("Run 'labelgeom --help' for usage information.");
            Ok(())
        }
    }
}

/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when `run` is embedded.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn write_set(output: Option<&Path>, set: &AnnotationSet) -> Result<(), LabelGeomError> {
    match output {
        Some(path) => ir::io_json::write_ir_json(path, set),
        None => {
            let json =
                ir::io_json::to_json_string(set).map_err(|source| LabelGeomError::IrJsonWrite {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
            println!("{}", json);
            Ok(())
        }
    }
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), LabelGeomError> {
    let set = ir::io_json::read_ir_json(&args.input)?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
        image_size: args.dims.resolve()?,
    };
    let report = validation::validate_set(&set, &opts);

    match args.output.as_str() {
        "json" => {
            let issues: Vec<serde_json::Value> = report
                .issues
                .iter()
                .map(|issue| {
                    serde_json::json!({
                        "severity": format!("{:?}", issue.severity),
                        "code": format!("{:?}", issue.code),
                        "message": issue.message,
                        "context": issue.context.to_string(),
                    })
                })
                .collect();
            let json = serde_json::json!({
                "error_count": report.error_count(),
                "warning_count": report.warning_count(),
                "issues": issues,
            });
            println!("{:#}", json);
        }
        _ => print!("{}", report),
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (opts.strict && has_warnings) {
        Err(LabelGeomError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

/// Execute the normalize and absolute subcommands.
fn run_convert(args: ConvertArgs, target: CoordSpace) -> Result<(), LabelGeomError> {
    let set = ir::io_json::read_ir_json(&args.input)?;
    let converted = if set.space == target {
        set
    } else {
        let (width, height) = args.dims.require()?;
        transform::convert(&set, target, width, height)?
    };
    write_set(args.output.as_deref(), &converted)
}

/// Execute the merge subcommand.
fn run_merge(args: MergeArgs) -> Result<(), LabelGeomError> {
    let set = ir::io_json::read_ir_json(&args.input)?;
    let (width, height) = args.dims.resolve()?.unwrap_or((0, 0));
    let options = MergeOptions {
        max_slope_diff: args.max_slope_diff,
        max_dist: args.max_dist,
    };
    let merged = merge_polygons(&set, width, height, &options)?;
    tracing::info!("merged {} object(s) into {}", set.len(), merged.len());
    write_set(args.output.as_deref(), &merged)
}

/// Execute the simplify subcommand.
fn run_simplify(args: SimplifyArgs) -> Result<(), LabelGeomError> {
    let set = ir::io_json::read_ir_json(&args.input)?;
    let objects = set.iter().map(|o| simplify(o, args.tolerance)).collect();
    write_set(args.output.as_deref(), &set.with_objects(objects))
}

/// Execute the trace subcommand.
fn run_trace(args: TraceArgs) -> Result<(), LabelGeomError> {
    // Palette-mode PNGs decode to RGB, which would scramble the indices.
    let raster = match image::open(&args.input)? {
        image::DynamicImage::ImageLuma8(raster) => raster,
        other => {
            return Err(LabelGeomError::NotIndexedRaster {
                path: args.input.clone(),
                color: other.color(),
            })
        }
    };
    let palette = if args.labels.is_empty() {
        None
    } else {
        Some(Palette::from_labels(args.labels.iter().cloned(), args.background)?)
    };
    let options = TraceOptions {
        background: args.background,
        min_size: args.min_size,
        max_size: args.max_size,
        use_min_rect: args.min_rect,
    };
    let set = raster::trace_indexed(&raster, palette.as_ref(), &options);
    write_set(args.output.as_deref(), &set)
}

/// Execute the rasterize subcommand.
fn run_rasterize(args: RasterizeArgs) -> Result<(), LabelGeomError> {
    let set = ir::io_json::read_ir_json(&args.input)?;
    let (width, height) = args.dims.require()?;
    let labels = if args.labels.is_empty() {
        set.labels()
    } else {
        args.labels
    };
    let palette = Palette::from_labels(labels, args.background)?;
    let raster = raster::rasterize_indexed(&set, &palette, width, height)?;
    raster.save(&args.output)?;
    Ok(())
}
