use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use pim_mha::config::{
    MhaGeometry, MultiSlotGeometry, SingleHeadGeometry, SystemConfig, TilingGeometry,
};
use pim_mha::host::{run_validated, RunReport, DEFAULT_TOLERANCE};
use pim_mha::inputs::MhaInputs;
use pim_mha::logging::init_logging_default;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pim-mha", version)]
#[command(about = "Run multi-head attention on a simulated PIM rank", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate inputs, launch a preset and validate it against the references
    Run {
        /// Geometry preset to run
        #[arg(long, value_enum, default_value_t = Preset::Tiling)]
        preset: Preset,
        /// Units the simulated rank can grant (defaults to a full rank)
        #[arg(long)]
        units: Option<usize>,
        /// Clock used for cycle accounting, in MHz
        #[arg(long, default_value_t = 350)]
        clock_mhz: u64,
        /// Launch units one after another instead of concurrently
        #[arg(long)]
        sequential: bool,
        /// Absolute tolerance on dequantized outputs
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f32,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Also write the JSON report to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the geometry presets
    Presets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    Tiling,
    MultiSlot,
    SingleHead,
}

fn main() -> anyhow::Result<()> {
    init_logging_default();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            preset,
            units,
            clock_mhz,
            sequential,
            tolerance,
            json,
            output,
        } => {
            let mut config = SystemConfig::new()
                .with_clock_hz(clock_mhz * 1_000_000)
                .with_parallel_units(!sequential);
            if let Some(units) = units {
                config = config.with_available_units(units);
            }

            let report = match preset {
                Preset::Tiling => {
                    let inputs = MhaInputs::generate::<TilingGeometry>();
                    run::<TilingGeometry>(config, inputs, tolerance)
                }
                Preset::MultiSlot => {
                    let inputs = MhaInputs::generate::<MultiSlotGeometry>();
                    run::<MultiSlotGeometry>(config, inputs, tolerance)
                }
                Preset::SingleHead => {
                    let inputs = MhaInputs::scenario::<SingleHeadGeometry>();
                    run::<SingleHeadGeometry>(config, inputs, tolerance)
                }
            }?;

            let rendered = serde_json::to_string_pretty(&report)?;
            if let Some(path) = output {
                std::fs::write(&path, &rendered)
                    .with_context(|| format!("writing report to {}", path.display()))?;
            }
            if json {
                println!("{}", rendered);
            } else {
                print_report(&report);
            }
            if !report.passed {
                anyhow::bail!("kernel output does not match the integer reference");
            }
        }
        Commands::Presets => {
            print_preset::<TilingGeometry>();
            print_preset::<MultiSlotGeometry>();
            print_preset::<SingleHeadGeometry>();
        }
    }
    Ok(())
}

fn run<G: MhaGeometry>(
    config: SystemConfig,
    inputs: MhaInputs,
    tolerance: f32,
) -> anyhow::Result<RunReport> {
    let (_, report) = run_validated::<G>(config, &inputs, tolerance)
        .with_context(|| format!("running preset '{}'", G::NAME))?;
    Ok(report)
}

fn print_report(report: &RunReport) {
    println!(
        "{} ({}): {} slots on {} units x {} lanes",
        report.geometry, report.schedule, report.total_slots, report.units, report.lanes_per_unit
    );
    println!(
        "cycles: max {} ({:.3} ms), avg {:.0}, total {}",
        report.cycles.max_cycles,
        report.cycles.max_ms,
        report.cycles.avg_cycles,
        report.cycles.total_cycles
    );
    println!(
        "host: upload {:.2} ms, launch {:.2} ms, download {:.2} ms",
        report.timings.upload_ms, report.timings.launch_ms, report.timings.download_ms
    );
    println!(
        "float reference: max |diff| {:.5}, {} elements above {}",
        report.float_max_abs_diff, report.float_mismatches, report.tolerance
    );
    println!(
        "integer reference: {}",
        if report.passed {
            "[OK] bit-exact".to_string()
        } else {
            format!("[FAIL] {} slots differ", report.integer_mismatched_slots)
        }
    );
}

fn print_preset<G: MhaGeometry>() {
    println!(
        "{:<12} {:<14} seq {:>4}  dim {:>3}  heads {:>3}  batch {:>4}  lanes {:>2}  tile {:>2}  units {:>5}  scratch {:>6} B",
        G::NAME,
        G::SCHEDULE.as_str(),
        G::SEQ_LEN,
        G::HEAD_DIM,
        G::NUM_HEADS,
        G::BATCH_SIZE,
        G::NR_LANES,
        G::TILE_ROWS,
        G::NR_UNITS,
        G::SCRATCH_BYTES
    );
}
