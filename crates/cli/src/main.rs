//! Scratchpad DMA simulator CLI.
//!
//! This binary drives the IDMA model the way the bare-metal SPM test program does. It
//! performs:
//! 1. **Run:** Builds a system from a JSON config (or the default L1I/L1D/L2 layout),
//!    fills each transfer's source with a known word pattern, programs the engine through
//!    its registers, polls STATUS, verifies the destination, and prints statistics.
//! 2. **Dump config:** Prints the effective configuration as JSON.
//!
//! Logging goes through `tracing`; set `RUST_LOG` (e.g. `RUST_LOG=spmsim_core=debug`).

use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::{fs, process};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use spmsim_core::config::Config;
use spmsim_core::soc::System;

#[derive(Parser, Debug)]
#[command(
    name = "spmsim",
    author,
    version,
    about = "Scratchpad DMA engine simulator",
    long_about = "Run DMA transfers between scratchpad memories and verify the copied data.\n\nExamples:\n  spmsim run\n  spmsim run --config spm.json --transfers copies.json\n  spmsim dump-config --config spm.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run transfers and verify them.
    Run {
        /// JSON configuration file (defaults to the built-in layout).
        #[arg(short, long)]
        config: Option<String>,

        /// JSON list of `{ "src", "dst", "size" }` transfers.
        #[arg(short, long)]
        transfers: Option<String>,

        /// Abort if a run goes past this tick.
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Only print these statistics sections (summary, engine, ports).
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,
    },

    /// Print the effective configuration as JSON.
    DumpConfig {
        /// JSON configuration file (defaults to the built-in layout).
        #[arg(short, long)]
        config: Option<String>,
    },
}

/// One copy to perform.
#[derive(Debug, Clone, Copy, Deserialize)]
struct TransferSpec {
    src: u64,
    dst: u64,
    size: u32,
}

/// Mirrors the SPM test program: L1I data area to L1D, then L1D to L2.
const DEFAULT_TRANSFERS: [TransferSpec; 2] = [
    TransferSpec {
        src: 0x8000_8000,
        dst: 0x8001_0000,
        size: 1024,
    },
    TransferSpec {
        src: 0x8001_0000,
        dst: 0x8002_0000,
        size: 1024,
    },
];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            transfers,
            max_ticks,
            stats,
        } => cmd_run(config.as_deref(), transfers.as_deref(), max_ticks, &stats),
        Commands::DumpConfig { config } => {
            let config = load_config(config.as_deref());
            match config.to_json() {
                Ok(json) => println!("{json}"),
                Err(e) => fail(&e.to_string()),
            }
        }
    }
}

fn fail(msg: &str) -> ! {
    eprintln!("Error: {msg}");
    process::exit(1);
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| fail(&format!("reading {path}: {e}")))
}

fn load_config(path: Option<&str>) -> Config {
    path.map_or_else(Config::default, |p| {
        Config::from_json(&read_file(p)).unwrap_or_else(|e| fail(&format!("{p}: {e}")))
    })
}

fn load_transfers(path: Option<&str>) -> Vec<TransferSpec> {
    path.map_or_else(
        || DEFAULT_TRANSFERS.to_vec(),
        |p| {
            serde_json::from_str(&read_file(p))
                .unwrap_or_else(|e| fail(&format!("{p}: invalid transfer list: {e}")))
        },
    )
}

/// Source pattern: little-endian words `0xDEAD0000 + i`.
fn pattern(size: u32) -> Vec<u8> {
    (0..size.div_ceil(4))
        .flat_map(|i| 0xDEAD_0000u32.wrapping_add(i).to_le_bytes())
        .take(size as usize)
        .collect()
}

/// Runs each transfer in order and exits non-zero if any fails verification.
fn cmd_run(
    config: Option<&str>,
    transfers: Option<&str>,
    max_ticks: Option<u64>,
    sections: &[String],
) {
    let mut config = load_config(config);
    if max_ticks.is_some() {
        config.general.max_ticks = max_ticks;
    }
    let transfers = load_transfers(transfers);

    let mut system = System::new(&config).unwrap_or_else(|e| fail(&e.to_string()));
    println!(
        "Configuration: mode={:?}  IDMA base={:#x}",
        config.general.mode, config.idma.base
    );
    for (range, name) in system.crossbar().address_map() {
        println!("  {name:<6} {range}");
    }
    println!();

    let mut failures = 0;
    for (i, t) in transfers.iter().enumerate() {
        println!("[Transfer {}] {:#x} -> {:#x} ({} bytes)", i + 1, t.src, t.dst, t.size);
        let data = pattern(t.size);
        if let Err(e) = system.load(t.src, &data) {
            fail(&format!("loading source: {e}"));
        }

        let done = match system.run_transfer(t.src, t.dst, t.size) {
            Ok(done) => done,
            Err(e) => {
                error!(%e, "simulation aborted");
                system.stats().print_sections(sections);
                fail(&e.to_string());
            }
        };
        info!(ticks = done.finished_at - done.started_at, "transfer finished");

        let copied = system
            .dump(t.dst, done.params.len as usize)
            .unwrap_or_else(|e| fail(&format!("reading destination: {e}")));
        let expected = &data[..copied.len()];
        let errors = copied.iter().zip(expected).filter(|(a, b)| a != b).count();
        if errors == 0 {
            println!(
                "  [PASS] {} bytes verified in {} ticks",
                copied.len(),
                done.finished_at - done.started_at
            );
        } else {
            println!("  [FAIL] {errors} mismatching bytes");
            failures += 1;
        }
    }

    system.stats().print_sections(sections);
    if failures > 0 {
        process::exit(1);
    }
}
