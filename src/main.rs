use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use geo::{Area, Polygon};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use polymerge::config::{FileConfig, OutputFormat};
use polymerge::geometry::perimeter;
use polymerge::ops::{
    ChainStep, ClipOutcome, DeoverlapStep, IntersectionReport, MergeOutcome, Pipeline,
    PipelineConfig,
};
use polymerge::wkt::write_polygon;
use polymerge::{ParseReport, Shape, parse_polygons, parse_records};

/// Merge, clip and chain-clip WKT polygons into single-part results
///
/// Examples:
///   # Merge every polygon in a file into one
///   polymerge merge parcels.wkt
///
///   # Subtract one polygon from another
///   polymerge clip boundary.wkt "POLYGON ((0 0, 4 0, 4 4, 0 4, 0 0))"
///
///   # Clip each record against the previous result, then remove leftovers
///   polymerge chain --deoverlap records.wkt -o clipped.wkt
///
///   # Full report as JSON
///   cat records.wkt | polymerge --format json intersect
#[derive(Parser, Debug)]
#[command(name = "polymerge")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches polymerge.toml if not provided)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, value_enum, global = true)]
    format: Option<OutputFormat>,

    /// Decimal digits coordinates are rounded to before clipping
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(0..=15))]
    precision: Option<u32>,

    /// Clip with coordinates exactly as given
    #[arg(long, global = true, conflicts_with = "precision")]
    no_precision: bool,

    /// Output file path (defaults to stdout)
    #[arg(short = 'o', long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check for intersections, then union everything into one polygon
    Merge {
        /// Input file ('-' or omitted reads stdin)
        input: Option<PathBuf>,

        /// Merge even when no two polygons intersect
        #[arg(long)]
        force: bool,
    },
    /// Report which polygons intersect
    Intersect {
        /// Input file ('-' or omitted reads stdin)
        input: Option<PathBuf>,
    },
    /// Subtract BOUNDARY from TARGET
    Clip {
        /// File, '-' for stdin, or literal WKT
        boundary: String,
        /// File, '-' for stdin, or literal WKT
        target: String,
    },
    /// Subtract each record's predecessor output from it, in order
    Chain {
        /// Input file ('-' or omitted reads stdin)
        input: Option<PathBuf>,

        /// Also subtract every earlier output, not just the previous one
        #[arg(long)]
        deoverlap: bool,
    },
    /// Repair each record and reduce it to a single polygon
    Normalize {
        /// Input file ('-' or omitted reads stdin)
        input: Option<PathBuf>,
    },
}

/// Settings after merging CLI flags over the config file
struct Settings {
    verbose: bool,
    format: OutputFormat,
    force_merge: bool,
    deoverlap: bool,
    pipeline: PipelineConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let total_start = Instant::now();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let file_config = match args.config {
        Some(ref path) => FileConfig::load_from(path)
            .with_context(|| format!("Failed to load config file: {:?}", path))?,
        None => FileConfig::load().unwrap_or_default(),
    };
    let settings = resolve_settings(&args, &file_config);
    let pipeline = Pipeline::new(settings.pipeline);

    if settings.verbose {
        eprintln!("Configuration:");
        match settings.pipeline.precision {
            Some(p) => eprintln!(
                "  Precision: {} digits, tolerance {:e}",
                p.digits(),
                p.tolerance()
            ),
            None => eprintln!("  Precision: off"),
        }
        eprintln!("  Format: {:?}", settings.format);
        eprintln!();
    }

    let output = match &args.command {
        Command::Merge { input, force } => {
            run_merge(&pipeline, &settings, input.as_deref(), *force || settings.force_merge)?
        }
        Command::Intersect { input } => run_intersect(&pipeline, &settings, input.as_deref())?,
        Command::Clip { boundary, target } => run_clip(&pipeline, &settings, boundary, target)?,
        Command::Chain { input, deoverlap } => run_chain(
            &pipeline,
            &settings,
            input.as_deref(),
            *deoverlap || settings.deoverlap,
        )?,
        Command::Normalize { input } => run_normalize(&pipeline, &settings, input.as_deref())?,
    };

    write_output(args.output.as_deref(), &output)?;

    if settings.verbose {
        eprintln!("Done [{:.2}s]", total_start.elapsed().as_secs_f32());
    }
    Ok(())
}

fn resolve_settings(args: &Args, file: &FileConfig) -> Settings {
    let mut pipeline = file.pipeline_config();
    if args.no_precision {
        pipeline = PipelineConfig::without_precision();
    } else if let Some(digits) = args.precision {
        pipeline = pipeline.with_digits(digits);
    }
    Settings {
        verbose: args.verbose || file.verbose,
        format: args.format.unwrap_or(file.format),
        force_merge: file.force_merge,
        deoverlap: file.deoverlap,
        pipeline,
    }
}

#[derive(Serialize)]
struct MergeReport<'a> {
    input: &'a ParseReport,
    intersections: &'a IntersectionReport,
    merge: &'a MergeOutcome,
}

fn run_merge(
    pipeline: &Pipeline,
    settings: &Settings,
    input: Option<&Path>,
    force: bool,
) -> Result<String> {
    let parsed = parse_input(pipeline, settings, input, true)?;
    if parsed.shapes.is_empty() {
        bail!("No valid polygons found in input");
    }

    let spinner = create_spinner("Checking intersections...");
    let start = Instant::now();
    let intersections = pipeline.detect_intersections(&parsed.shapes);
    spinner.finish_with_message(format!(
        "Checked {} polygons, {} intersecting pairs [{:.1}s]",
        parsed.shapes.len(),
        intersections.pairs.as_ref().map_or(0, Vec::len),
        start.elapsed().as_secs_f32()
    ));
    if settings.verbose {
        for line in &intersections.details {
            eprintln!("  {}", line);
        }
    }

    if intersections.is_checked() && !intersections.has_intersection && !force {
        bail!("No polygons intersect, refusing to merge. Use --force to merge anyway");
    }

    let spinner = create_spinner("Merging polygons...");
    let start = Instant::now();
    let Some(outcome) = pipeline.merge(&parsed.shapes) else {
        bail!("No valid polygons found in input");
    };
    spinner.finish_with_message(format!(
        "Merged {} polygons ({:?}) [{:.1}s]",
        parsed.shapes.len(),
        outcome.method,
        start.elapsed().as_secs_f32()
    ));
    if settings.verbose {
        eprintln!(
            "  Area: {:.6}, perimeter: {:.6}",
            outcome.polygon.unsigned_area(),
            perimeter(&outcome.polygon)
        );
    }

    match settings.format {
        OutputFormat::Wkt => Ok(write_polygon(&outcome.polygon)),
        OutputFormat::Json => to_json(&MergeReport {
            input: &parsed,
            intersections: &intersections,
            merge: &outcome,
        }),
    }
}

fn run_intersect(pipeline: &Pipeline, settings: &Settings, input: Option<&Path>) -> Result<String> {
    let parsed = parse_input(pipeline, settings, input, true)?;
    let report = pipeline.detect_intersections(&parsed.shapes);
    match settings.format {
        OutputFormat::Wkt => Ok(report.details.join("\n")),
        OutputFormat::Json => to_json(&report),
    }
}

fn run_clip(pipeline: &Pipeline, settings: &Settings, boundary: &str, target: &str) -> Result<String> {
    if boundary == "-" && target == "-" {
        bail!("Only one of BOUNDARY and TARGET can be read from stdin");
    }
    let boundary = read_operand(pipeline, boundary).context("Failed to read BOUNDARY")?;
    let target = read_operand(pipeline, target).context("Failed to read TARGET")?;

    let spinner = create_spinner("Clipping target...");
    let start = Instant::now();
    let outcome: ClipOutcome = pipeline.clip(&boundary, &target);
    spinner.finish_with_message(format!(
        "Clipped ({:?}): area {:.6} -> {:.6} [{:.1}s]",
        outcome.status,
        outcome.target_area,
        outcome.result_area,
        start.elapsed().as_secs_f32()
    ));
    if settings.verbose && outcome.overlap.has_boundary_contact() {
        eprintln!(
            "  Boundary contact: {} shared vertices, {} shared edges",
            outcome.overlap.shared_vertices, outcome.overlap.shared_edges
        );
    }

    match settings.format {
        OutputFormat::Wkt => Ok(write_polygon(&outcome.polygon)),
        OutputFormat::Json => to_json(&outcome),
    }
}

#[derive(Serialize)]
struct ChainReport<'a> {
    input: &'a ParseReport,
    steps: &'a [ChainStep],
    #[serde(skip_serializing_if = "Option::is_none")]
    deoverlapped: Option<&'a [DeoverlapStep]>,
}

fn run_chain(
    pipeline: &Pipeline,
    settings: &Settings,
    input: Option<&Path>,
    deoverlap: bool,
) -> Result<String> {
    let parsed = parse_input(pipeline, settings, input, false)?;

    let spinner = create_spinner("Chain clipping...");
    let start = Instant::now();
    let steps = pipeline.chain_clip(&parsed.shapes);
    spinner.finish_with_message(format!(
        "Chain clipped {} polygons [{:.1}s]",
        steps.len(),
        start.elapsed().as_secs_f32()
    ));
    if settings.verbose {
        for step in &steps {
            eprintln!("  #{} {:?} area {:.6}", step.index, step.status, step.area);
        }
    }

    let deoverlapped = if deoverlap {
        let spinner = create_spinner("Removing overlaps...");
        let start = Instant::now();
        let polygons: Vec<_> = steps.iter().map(|s| s.polygon.clone()).collect();
        let cleaned = pipeline.remove_overlaps(&polygons);
        spinner.finish_with_message(format!(
            "Removed {} overlaps [{:.1}s]",
            cleaned.iter().map(|s| s.overlaps_removed).sum::<usize>(),
            start.elapsed().as_secs_f32()
        ));
        Some(cleaned)
    } else {
        None
    };

    match settings.format {
        OutputFormat::Wkt => Ok(match &deoverlapped {
            Some(cleaned) => lines(cleaned.iter().map(|s| &s.polygon)),
            None => lines(steps.iter().map(|s| &s.polygon)),
        }),
        OutputFormat::Json => to_json(&ChainReport {
            input: &parsed,
            steps: &steps,
            deoverlapped: deoverlapped.as_deref(),
        }),
    }
}

fn run_normalize(pipeline: &Pipeline, settings: &Settings, input: Option<&Path>) -> Result<String> {
    let parsed = parse_input(pipeline, settings, input, false)?;
    let polygons: Vec<_> = parsed
        .shapes
        .iter()
        .map(|s| pipeline.to_single_part(s))
        .collect();

    match settings.format {
        OutputFormat::Wkt => Ok(lines(polygons.iter())),
        OutputFormat::Json => to_json(
            &polygons
                .iter()
                .map(write_polygon)
                .collect::<Vec<_>>(),
        ),
    }
}

fn parse_input(
    pipeline: &Pipeline,
    settings: &Settings,
    input: Option<&Path>,
    expand: bool,
) -> Result<ParseReport> {
    let text = read_input(input)?;

    let spinner = create_spinner("Parsing polygons...");
    let start = Instant::now();
    let report = if expand {
        parse_polygons(pipeline.kernel(), &text)
    } else {
        parse_records(pipeline.kernel(), &text)
    };
    spinner.finish_with_message(format!(
        "Parsed {} polygons from {} records, {} skipped, {} repaired [{:.1}s]",
        report.shapes.len(),
        report.records,
        report.skipped.len(),
        report.repaired,
        start.elapsed().as_secs_f32()
    ));
    if settings.verbose {
        for skipped in &report.skipped {
            eprintln!("  Line {}: {}", skipped.line, skipped.reason);
        }
    }
    Ok(report)
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {:?}", path)),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

/// A clip operand: '-' for stdin, an existing file, or WKT text
fn read_operand(pipeline: &Pipeline, arg: &str) -> Result<Shape> {
    let path = Path::new(arg);
    let text = if arg == "-" || path.is_file() {
        read_input(Some(path))?
    } else {
        arg.to_string()
    };

    let report = parse_records(pipeline.kernel(), &text);
    let mut shapes = report.shapes;
    match shapes.len() {
        0 => bail!("No valid polygon found in {:?}", arg),
        1 => Ok(shapes.remove(0)),
        _ => Ok(Shape::MultiPolygon(
            shapes.iter().flat_map(Shape::polygons).collect(),
        )),
    }
}

fn lines<'a>(polygons: impl Iterator<Item = &'a Polygon<f64>>) -> String {
    polygons.map(write_polygon).collect::<Vec<_>>().join("\n")
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize report")
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            writeln!(file, "{}", text).context("Failed to write output")?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
