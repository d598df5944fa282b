//! fpverify CLI - check that a KiCad board's footprint layout can be rebuilt
//! from its first footprint.

use clap::{Parser, ValueEnum};
use fpverify::{Verifier, VerifyOptions, VerifyReport};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fpverify")]
#[command(about = "KiCad footprint placement verifier", long_about = None)]
#[command(version)]
struct Cli {
    /// Board to verify (.kicad_pcb)
    #[arg(value_name = "BOARD")]
    board: PathBuf,

    /// Where to save the rebuilt board when it does not match
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Where to save the board as loaded, before it is rebuilt
    #[arg(value_name = "SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Distance between neighbouring footprints, in millimetres
    #[arg(long, default_value_t = fpverify::core::DEFAULT_SPACING, allow_negative_numbers = true)]
    spacing: f64,

    /// Orientation of the rotated footprints, in degrees
    #[arg(long, default_value_t = fpverify::core::DEFAULT_ANGLE, allow_negative_numbers = true)]
    angle: f64,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON report
    Json,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help and --version
            let _ = e.print();
            process::exit(0);
        }
        Err(e) => {
            let rendered = e.render().to_string();
            let message = rendered.strip_prefix("error: ").unwrap_or(&rendered);
            eprint!("Error: {}", message);
            process::exit(1);
        }
    };

    init_tracing(cli.verbose);
    process::exit(handle_verify(cli));
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_verify(cli: Cli) -> i32 {
    let options = VerifyOptions {
        spacing: cli.spacing,
        angle: cli.angle,
        output: cli.output,
        snapshot: cli.snapshot,
        ..VerifyOptions::default()
    };
    tracing::debug!("Verifying {}", cli.board.display());

    match Verifier::new(options).run(&cli.board) {
        Ok(report) => {
            output_report(&report, &cli.format);
            if report.is_match() {
                0
            } else {
                1
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn output_report(report: &VerifyReport, format: &OutputFormat) {
    match format {
        OutputFormat::Human => output_human(report),
        OutputFormat::Json => output_json(report),
    }
}

fn output_human(report: &VerifyReport) {
    if report.is_match() {
        return;
    }

    println!("{}", report.compare_line());
    for diff in &report.diffs {
        println!();
        print!("{}", diff);
    }
    if let Some(path) = &report.saved_output {
        tracing::info!("Rebuilt board written to {}", path.display());
    }
}

fn output_json(report: &VerifyReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: {}", e),
    }
}
