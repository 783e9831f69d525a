//! `lvt` – LVT dataset conversion CLI.
//!
//! Subcommands:
//!
//! - `convert` – read raw frames (JSON lines), normalize every pose, box and
//!   sweep into the vehicle frame, write canonical frames (JSON lines) plus a
//!   `<output>.calibration.json` sensor setup and a `<output>.report.json`
//!   run report.
//! - `compare` – match predicted against ground-truth boxes in converted
//!   frames and print precision, recall and mean center distance.
//! - `init-config` – write a default `lvt.toml`.
//!
//! Ctrl-C during `convert` stops after the current batch; every frame
//! converted so far is kept.  Frames are written to `<output>.partial` and
//! moved into place once the run succeeds, so an aborted run leaves any
//! previous output untouched.

mod config;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use colored::Colorize;
use lvt_convert::compare::{compare_frame, summarize};
use lvt_convert::jsonl::{JsonLinesSink, read_converted, read_frames};
use lvt_convert::{AssembledFrame, ConversionReport, Pipeline};
use lvt_types::FailurePolicy;
use tracing::warn;

#[derive(Parser)]
#[command(name = "lvt", version)]
#[command(about = "Normalize driving datasets into the LVT vehicle-frame format", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert raw frames into canonical frames
    Convert {
        /// Raw frames, one JSON object per line
        input: PathBuf,

        /// Converted frames, one JSON object per line
        #[arg(short, long)]
        output: PathBuf,

        /// Settings file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Failure policy (fail-fast / best-effort); overrides the settings file
        #[arg(long)]
        policy: Option<FailurePolicy>,

        /// Worker threads (0 = one per core); overrides the settings file
        #[arg(short, long)]
        threads: Option<usize>,
    },

    /// Compare predictions against ground truth in converted frames
    Compare {
        /// Converted frames, as written by `convert`
        input: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default settings file
    InitConfig {
        #[arg(default_value = config::DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    lvt_convert::telemetry::init_tracing();

    let cli = Cli::parse();
    let quiet = matches!(cli.command, Commands::Compare { json: true, .. });
    if !quiet {
        print_banner();
    }

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            config,
            policy,
            threads,
        } => run_convert(&input, &output, config.as_deref(), policy, threads),
        Commands::Compare { input, json } => run_compare(&input, json),
        Commands::InitConfig { path, force } => run_init_config(&path, force),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// convert
// ─────────────────────────────────────────────────────────────────────────────

fn run_convert(
    input: &Path,
    output: &Path,
    config_file: Option<&Path>,
    policy: Option<FailurePolicy>,
    threads: Option<usize>,
) -> Result<(), String> {
    let mut cfg = load_config(config_file)?;
    if let Some(policy) = policy {
        cfg.policy = policy;
    }
    if let Some(threads) = threads {
        cfg.threads = threads;
    }

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_clone = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", "⚠  Ctrl-C received – finishing the current batch …".yellow().bold());
        cancel_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; conversion cannot be interrupted cleanly");
    }

    let reader = File::open(input)
        .map(BufReader::new)
        .map_err(|e| format!("Failed to open {}: {}", input.display(), e))?;
    let partial = sidecar(output, ".partial");
    let writer = File::create(&partial)
        .map(BufWriter::new)
        .map_err(|e| format!("Failed to create {}: {}", partial.display(), e))?;

    println!(
        "  Converting {} → {}",
        input.display().to_string().bold(),
        output.display().to_string().bold()
    );

    let pipeline = Pipeline::new(cfg.pipeline()).map_err(|e| e.to_string())?;
    let mut sink = JsonLinesSink::new(writer);
    let report = match pipeline.run(read_frames(reader), &mut sink, &cancel) {
        Ok(report) => report,
        Err(e) => {
            drop(sink);
            if let Err(rm) = fs::remove_file(&partial) {
                warn!(path = %partial.display(), error = %rm, "Failed to remove partial output");
            }
            return Err(e.to_string());
        }
    };

    if let Some(setup) = sink.setup() {
        write_json(&sidecar(output, ".calibration.json"), setup)?;
    }
    sink.into_inner().map_err(|e| e.to_string())?;
    fs::rename(&partial, output)
        .map_err(|e| format!("Failed to move output into {}: {}", output.display(), e))?;
    write_json(&sidecar(output, ".report.json"), &report)?;

    print_report(&report);
    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<config::Config, String> {
    let path = explicit.map(Path::to_path_buf).unwrap_or_else(config::config_path);
    match config::load_from(&path)? {
        Some(cfg) => {
            println!("  Config loaded from {}", path.display().to_string().bold());
            Ok(cfg)
        }
        None if explicit.is_some() => Err(format!("Config file {} not found", path.display())),
        None => {
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            Ok(cfg)
        }
    }
}

fn print_report(report: &ConversionReport) {
    println!();
    let status = if report.cancelled {
        "cancelled".yellow().bold()
    } else {
        "done".green().bold()
    };
    println!("  {} {}", "✓".green().bold(), status);
    println!("    frames converted : {}", report.frames_converted);
    println!("    frames skipped   : {}", report.frames_skipped);
    println!("    ground truth     : {}", report.ground_truth_boxes);
    println!("    predicted        : {}", report.predicted_boxes);
    println!("    lidar points     : {}", report.points);
    if let Some(elapsed) = report.elapsed() {
        println!("    elapsed          : {} ms", elapsed.num_milliseconds());
    }
    if !report.failures.is_empty() {
        println!();
        println!("  {} ({})", "Skipped".yellow().bold(), report.failures.len());
        for failure in report.failures.iter().take(10) {
            println!("    • {}", failure.message.dimmed());
        }
        if report.failures.len() > 10 {
            println!("    … {} more in the report file", report.failures.len() - 10);
        }
    }
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// compare
// ─────────────────────────────────────────────────────────────────────────────

fn run_compare(input: &Path, json: bool) -> Result<(), String> {
    let reader = File::open(input)
        .map(BufReader::new)
        .map_err(|e| format!("Failed to open {}: {}", input.display(), e))?;

    let comparisons = read_converted(reader)
        .map(|frame| frame.map(|f: AssembledFrame| compare_frame(&f.frame)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    let summary = summarize(&comparisons);

    if json {
        let out = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
        println!("{out}");
        return Ok(());
    }

    let pct = |v: Option<f64>| v.map_or_else(|| "n/a".dimmed().to_string(), |v| format!("{:.1}%", v * 100.0));
    println!("  Compared {} frame(s)", summary.frames.to_string().bold());
    println!("    ground truth     : {}", summary.ground_truth);
    println!("    predicted        : {}", summary.predicted);
    println!("    matched          : {}", summary.matched);
    println!("    precision        : {}", pct(summary.precision()));
    println!("    recall           : {}", pct(summary.recall()));
    match summary.mean_distance() {
        Some(d) => println!("    mean distance    : {d:.3} m"),
        None => println!("    mean distance    : {}", "n/a".dimmed()),
    }
    if summary.unsupported_ground_truth > 0 {
        println!(
            "    {} ground-truth box(es) contain no lidar points",
            summary.unsupported_ground_truth.to_string().yellow()
        );
    }
    println!();
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// init-config
// ─────────────────────────────────────────────────────────────────────────────

fn run_init_config(path: &Path, force: bool) -> Result<(), String> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    config::save_to(&config::Config::default(), path)?;
    println!(
        "  {} Config saved to {}\n",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", "  ╔═════════════════════════╗".bold().cyan());
    println!("{}", "  ║   L  V  T   convert     ║".bold().cyan());
    println!("{}", "  ╚═════════════════════════╝".bold().cyan());
    println!();
    println!(
        "  {} {}",
        "LVT".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Driving dataset normalization");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// `<path><suffix>`, e.g. `frames.jsonl.calibration.json`.
fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), String> {
    let file = File::create(path)
        .map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}
