//! raftwal CLI
//!
//! Drives a log file from the command line: a guided demo plus small
//! append / read / truncate / inspect commands.

use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use raftwal::config::{DEFAULT_MAX_ENTRY_SIZE, DEFAULT_MAX_SEGMENT_SIZE};
use raftwal::wal::{WalReader, WalRecovery, ENTRY_HEADER_SIZE, FILE_HEADER_SIZE};
use raftwal::{Wal, WalConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// raftwal CLI
#[derive(Parser, Debug)]
#[command(name = "raftwal-cli")]
#[command(about = "Inspect and drive a raftwal log file")]
#[command(version)]
struct Args {
    /// Maximum entry size in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_ENTRY_SIZE)]
    max_entry_size: u32,

    /// Advisory maximum file size in bytes (defaults to 100 MiB, raised to
    /// fit one entry of --max-entry-size)
    #[arg(long, global = true)]
    max_segment_size: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write, recover and truncate a throwaway log, narrating each step
    Demo {
        /// Directory to create the demo log in (defaults to a fresh temp dir).
        /// Only the demo's own log file is removed from it afterwards.
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Append one or more entries
    Append {
        /// Log file
        path: PathBuf,

        /// Entries to append (UTF-8)
        #[arg(required = true)]
        data: Vec<String>,

        /// Sync after each entry
        #[arg(short, long)]
        sync: bool,
    },

    /// Print a single entry
    Get {
        /// Log file
        path: PathBuf,

        /// 1-based log index
        index: u64,
    },

    /// Print every entry
    Dump {
        /// Log file
        path: PathBuf,
    },

    /// Discard an entry and everything after it
    Truncate {
        /// Log file
        path: PathBuf,

        /// First 1-based log index to discard
        index: u64,
    },

    /// Check a file without modifying it
    Verify {
        /// Log file
        path: PathBuf,
    },

    /// Open (recovering if needed) and print counters
    Stats {
        /// Log file
        path: PathBuf,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,raftwal=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    let largest_file = (FILE_HEADER_SIZE + ENTRY_HEADER_SIZE) as u64 + args.max_entry_size as u64;
    let config = WalConfig::builder()
        .max_entry_size(args.max_entry_size)
        .max_segment_size(
            args.max_segment_size
                .unwrap_or_else(|| DEFAULT_MAX_SEGMENT_SIZE.max(largest_file)),
        )
        .build();

    if let Err(e) = run(args.command, config) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands, config: WalConfig) -> raftwal::Result<()> {
    match command {
        Commands::Demo { dir } => demo(dir, config),
        Commands::Append { path, data, sync } => {
            let wal = Wal::open_with_config(&path, config)?;
            for item in &data {
                let index = if sync {
                    wal.append_and_sync(item.as_bytes())?
                } else {
                    wal.append(item.as_bytes())?
                };
                println!("appended [{}] {}", index, item);
            }
            wal.close()
        }
        Commands::Get { path, index } => {
            let wal = Wal::open_with_config(&path, config)?;
            let data = wal.get_entry(index)?;
            println!("[{}] {}", index, String::from_utf8_lossy(&data));
            wal.close()
        }
        Commands::Dump { path } => {
            for item in WalReader::open(&path, config.max_entry_size)?.entries() {
                let (index, entry) = item?;
                println!("[{}] {}", index, String::from_utf8_lossy(&entry.data));
            }
            Ok(())
        }
        Commands::Truncate { path, index } => {
            let wal = Wal::open_with_config(&path, config)?;
            wal.truncate_from_index(index)?;
            println!("last index is now {}", wal.last_index());
            wal.close()
        }
        Commands::Verify { path } => {
            let result = WalRecovery::verify(&path, &config)?;
            println!("valid entries:   {}", result.entries_recovered);
            println!("last index:      {}", result.last_index);
            println!("valid bytes:     {}", result.valid_bytes);
            println!("corrupt frames:  {}", result.entries_corrupted);
            println!("needs truncate:  {}", result.was_truncated);
            Ok(())
        }
        Commands::Stats { path } => {
            let wal = Wal::open_with_config(&path, config)?;
            let recovery = wal.recovery_result();
            let metrics = wal.metrics();
            println!("last index:      {}", wal.last_index());
            println!("write offset:    {}", wal.write_offset());
            println!("recovered:       {}", recovery.entries_recovered);
            println!("truncated:       {}", recovery.was_truncated);
            println!("corruptions:     {}", metrics.corruptions);
            wal.close()
        }
    }
}

fn demo(dir: Option<PathBuf>, config: WalConfig) -> raftwal::Result<()> {
    match dir {
        Some(dir) => {
            let path = dir.join("demo.wal");
            if path.exists() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists", path.display()),
                )
                .into());
            }
            let result = demo_phases(&path, config);
            let _ = std::fs::remove_file(&path);
            result
        }
        None => {
            // Removed with everything in it when dropped
            let temp = tempfile::Builder::new().prefix("raftwal_demo_").tempdir()?;
            demo_phases(&temp.path().join("demo.wal"), config)
        }
    }
}

fn demo_phases(path: &Path, config: WalConfig) -> raftwal::Result<()> {
    println!("--- Phase 1: Creating WAL and Writing Data ---");
    println!("File: {}\n", path.display());

    let wal = Wal::open_with_config(path, config)?;
    let entries = ["Set user_1=active", "Update user_1_score=100", "Delete session_99"];
    for data in entries {
        let index = wal.append_and_sync(data.as_bytes())?;
        println!("Appended Entry {}: {}", index, data);
    }
    println!("\nCurrent Last Index: {}", wal.last_index());
    wal.close()?;

    println!("\n--- Phase 2: Simulating Restart & Recovery ---");
    let wal = Wal::open_with_config(path, config)?;
    let recovered = wal.read_all()?;
    println!("Recovered {} entries from disk:", recovered.len());
    print_entries(&recovered);

    println!("\n--- Phase 3: Truncating from Index 2 ---");
    wal.truncate_from_index(2)?;
    println!("New Last Index after truncation: {}", wal.last_index());
    println!("Final Log Content:");
    print_entries(&wal.read_all()?);

    wal.close()
}

fn print_entries(entries: &[Vec<u8>]) {
    for (i, data) in entries.iter().enumerate() {
        println!("  [{}] {}", i + 1, String::from_utf8_lossy(data));
    }
}
