//! kt - keytrail CLI
//!
//! Record keyboard and mouse input into action logs and replay them.
//!
//! Supported: Linux (X11, needs `xinput` and `xdotool`)

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use keytrail_core::{Action, ActionLog};
use keytrail_recorder::prelude::*;
use keytrail_recorder::storage;

#[derive(Parser)]
#[command(name = "kt")]
#[command(about = "keytrail - record and replay keyboard and mouse macros")]
#[command(version)]
struct Cli {
    /// Directory holding saved logs (default: ~/.keytrail)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record until the stop hotkey or Ctrl+C
    Record {
        #[arg(short, long, default_value = "macro")]
        name: String,
        /// Devices to record
        #[arg(long, value_enum, default_value_t = Level::Both)]
        level: Level,
        /// Save as JSON instead of XML
        #[arg(long)]
        json: bool,
        /// Idle seconds before a pause is recorded
        #[arg(long, default_value = "2")]
        threshold: f64,
        /// Chord that ends the recording
        #[arg(long, default_value = "alt+z")]
        hotkey: String,
    },
    /// Replay a saved log
    Replay {
        file: String,
        #[arg(short, long, default_value = "1.0")]
        speed: f64,
        /// Seconds to wait before the first action
        #[arg(long, default_value = "2")]
        delay: u64,
    },
    /// Show a saved log
    Show {
        file: String,
        /// Print every action
        #[arg(long)]
        all: bool,
    },
    /// List saved logs
    List,
    /// Delete a saved log
    Delete { file: String },
    /// Re-encode a log; format follows the output extension
    Convert { input: PathBuf, output: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    Mouse,
    Keyboard,
    Both,
}

impl From<Level> for CaptureLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Mouse => CaptureLevel::Mouse,
            Level::Keyboard => CaptureLevel::Keyboard,
            Level::Both => CaptureLevel::Both,
        }
    }
}

#[derive(Serialize, Default)]
struct Summary {
    actions: usize,
    typed: usize,
    keys: usize,
    combos: usize,
    clicks: usize,
    moves: usize,
    scrolls: usize,
    windows: usize,
    pauses: usize,
    slept_secs: u64,
}

impl Summary {
    fn of(log: &ActionLog) -> Self {
        let mut s = Summary {
            actions: log.len(),
            slept_secs: log.total_sleep(),
            ..Default::default()
        };
        for action in log {
            match action {
                Action::Type { .. } => s.typed += 1,
                Action::Enter | Action::Tab { .. } => s.keys += 1,
                Action::Combo { .. } => s.combos += 1,
                Action::Mouse { .. } => s.clicks += 1,
                Action::MouseMove { .. } => s.moves += 1,
                Action::MouseWheel { .. } => s.scrolls += 1,
                Action::Window { .. } => s.windows += 1,
                Action::Sleep { .. } => s.pauses += 1,
            }
        }
        s
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let dir = cli.dir.as_deref();
    let result: Result<(), anyhow::Error> = match cli.command {
        Commands::Record {
            name,
            level,
            json,
            threshold,
            hotkey,
        } => record(dir, &name, level, json, threshold, &hotkey),
        Commands::Replay { file, speed, delay } => replay(dir, &file, speed, delay),
        Commands::Show { file, all } => show(dir, &file, all),
        Commands::List => list(dir),
        Commands::Delete { file } => delete(dir, &file),
        Commands::Convert { input, output } => convert(&input, &output),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn open_storage(dir: Option<&Path>) -> Result<LogStorage> {
    match dir {
        Some(dir) => LogStorage::with_dir(dir),
        None => LogStorage::new(),
    }
}

/// Flag raised by Ctrl+C
fn interrupt_flag() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let f = flag.clone();
    ctrlc::set_handler(move || {
        f.store(true, Ordering::SeqCst);
    })?;
    Ok(flag)
}

/// Sleep threshold from a `--threshold` value in seconds
fn threshold_duration(secs: f64) -> Result<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        anyhow::bail!("threshold must be a positive number of seconds, got {}", secs);
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|_| anyhow::anyhow!("threshold out of range: {} seconds", secs))
}

#[cfg(target_os = "linux")]
fn record(
    dir: Option<&Path>,
    name: &str,
    level: Level,
    json: bool,
    threshold: f64,
    hotkey: &str,
) -> Result<()> {
    let config = RecorderConfig {
        translator: TranslatorConfig {
            level: level.into(),
            sleep_threshold: threshold_duration(threshold)?,
            stop_hotkey: hotkey.parse()?,
        },
        ..Default::default()
    };
    let format = if json { Format::Json } else { Format::Xml };
    let storage = open_storage(dir)?.format(format);

    let xdo = Xdotool::new();
    if !xdo.is_available() {
        anyhow::bail!("xdotool not found on PATH");
    }

    println!(
        "Recording: {} ({} to stop, or Ctrl+C)",
        name, config.translator.stop_hotkey
    );
    let interrupted = interrupt_flag()?;
    let handle = Recorder::with_config(config).start(XInputSource::new(), xdo)?;

    let mut count = 0;
    while !interrupted.load(Ordering::SeqCst) && handle.is_running() {
        let seen = handle.events_seen();
        if seen != count {
            count = seen;
            print!("\r{} events", count);
            io::stdout().flush()?;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    let log = handle.stop()?;
    println!("\n{} actions recorded", log.len());

    let path = storage.save(name, &log)?;
    println!("Saved: {}", path.display());
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn record(
    _dir: Option<&Path>,
    _name: &str,
    _level: Level,
    _json: bool,
    _threshold: f64,
    _hotkey: &str,
) -> Result<()> {
    Err(keytrail_core::Error::not_supported("recording").into())
}

#[cfg(target_os = "linux")]
fn replay(dir: Option<&Path>, file: &str, speed: f64, delay: u64) -> Result<()> {
    let config = PlayerConfig {
        speed,
        start_delay: Duration::from_secs(delay),
    };
    config.validate()?;
    let log = open_storage(dir)?.load(file)?;
    println!(
        "Replaying {} ({} actions) at {}x speed...",
        file,
        log.len(),
        speed
    );
    if delay > 0 {
        println!("Starting in {} seconds...", delay);
    }

    let interrupted = interrupt_flag()?;
    let player = Player::new(Xdotool::new(), Xdotool::new())
        .with_config(config)
        .cancel_on(interrupted);
    let stats = player.play(&log)?;
    println!(
        "Done! {} clicks, {} keys, {} chars typed",
        stats.clicks, stats.keys, stats.text_chars
    );
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn replay(_dir: Option<&Path>, _file: &str, _speed: f64, _delay: u64) -> Result<()> {
    Err(keytrail_core::Error::not_supported("replay").into())
}

fn show(dir: Option<&Path>, file: &str, all: bool) -> Result<()> {
    let log = open_storage(dir)?.load(file)?;
    let summary = Summary::of(&log);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    if all {
        for (i, action) in log.iter().enumerate() {
            println!("{}: {:?}", i, action);
        }
    }
    Ok(())
}

fn list(dir: Option<&Path>) -> Result<()> {
    let files = open_storage(dir)?.list()?;
    if files.is_empty() {
        println!("No logs saved.");
    } else {
        for f in files {
            println!("{}", f);
        }
    }
    Ok(())
}

fn delete(dir: Option<&Path>, file: &str) -> Result<()> {
    open_storage(dir)?.delete(file)?;
    println!("Deleted: {}", file);
    Ok(())
}

fn convert(input: &Path, output: &Path) -> Result<()> {
    let log = storage::load_from(input)?;
    storage::save_to(output, &log)?;
    println!("Wrote {} actions to {}", log.len(), output.display());
    Ok(())
}
