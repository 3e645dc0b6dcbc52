use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod encode;
mod play;
mod source;

use zurich_transit::PlaybackConfig;

#[derive(Parser, Debug)]
#[command(
    name = "trip-player",
    author,
    version,
    about = "Play back and encode streamed GTFS trip files",
    long_about = "Drives the trip streaming pipeline outside a renderer.\n\n\
                  `play` streams a binary trip file (falling back to the JSON dataset) \
                  and logs the visible trips as simulated time advances. `encode` turns \
                  a JSON trip dataset into a binary trip file and its chunk manifest."
)]
struct Cli {
    /// Verbose output (show debug messages)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream trips and log what is visible at each frame
    Play(PlayArgs),
    /// Encode a JSON trip dataset into the binary format
    Encode(EncodeArgs),
}

#[derive(clap::Args, Debug)]
struct PlayArgs {
    /// Binary trip file, as an http(s) URL or a local path
    #[arg(short, long)]
    binary: Option<String>,

    /// JSON trip dataset used when the binary file cannot be read
    #[arg(short, long)]
    fallback: Option<String>,

    /// JSON playback configuration; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated seconds per real second
    #[arg(short, long)]
    speed: Option<f64>,

    /// Start time as HH:MM or HH:MM:SS (hours may exceed 23)
    #[arg(long)]
    start: Option<String>,

    /// Number of frames to play
    #[arg(long, default_value = "30")]
    frames: u32,

    /// Real time between frames, in milliseconds
    #[arg(long, default_value = "1000")]
    frame_ms: u64,

    /// Print the visible trips of the last frame as JSON
    #[arg(long)]
    dump: bool,
}

#[derive(clap::Args, Debug)]
struct EncodeArgs {
    /// Input JSON trip dataset
    #[arg(short, long)]
    input: PathBuf,

    /// Output binary file; the manifest is written next to it
    #[arg(short, long)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.parse()?)
                .from_env_lossy(),
        )
        .init();

    match cli.command {
        Command::Play(args) => {
            let config = playback_config(&args).await?;
            play::run(
                config,
                args.frames,
                Duration::from_millis(args.frame_ms),
                args.dump,
            )
            .await?;
            Ok(())
        }
        Command::Encode(args) => encode::run(&args.input, &args.output).await,
    }
}

async fn playback_config(args: &PlayArgs) -> Result<PlaybackConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => PlaybackConfig::default(),
    };

    if let Some(binary) = &args.binary {
        config.binary_url = Some(binary.clone());
    }
    if let Some(fallback) = &args.fallback {
        config.fallback_url = Some(fallback.clone());
    }
    if let Some(speed) = args.speed {
        config.speed = speed;
    }
    if let Some(start) = &args.start {
        config.start_time = parse_clock(start)?;
    }

    if config.binary_url.is_none() && config.fallback_url.is_none() {
        bail!("Pass --binary and/or --fallback, or set them in --config");
    }

    Ok(config)
}

/// `HH:MM[:SS]` to seconds since midnight.
fn parse_clock(text: &str) -> Result<f64> {
    let parts = text
        .split(':')
        .map(|part| part.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid time {text:?}"))?;

    let seconds = match parts.as_slice() {
        [h, m] if *m < 60 => h * 3600 + m * 60,
        [h, m, s] if *m < 60 && *s < 60 => h * 3600 + m * 60 + s,
        _ => bail!("Invalid time {text:?}, expected HH:MM or HH:MM:SS"),
    };

    Ok(seconds as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("08:00").unwrap(), 28_800.0);
        assert_eq!(parse_clock("25:30:15").unwrap(), 91_815.0);
        assert!(parse_clock("8").is_err());
        assert!(parse_clock("08:75").is_err());
        assert!(parse_clock("aa:bb").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "trip-player",
            "play",
            "--binary",
            "trips.bin",
            "--speed",
            "120",
            "--start",
            "07:30",
        ])
        .unwrap();

        match cli.command {
            Command::Play(args) => {
                assert_eq!(args.binary.as_deref(), Some("trips.bin"));
                assert_eq!(args.speed, Some(120.0));
                assert_eq!(args.frames, 30);
            }
            Command::Encode(_) => panic!("expected play"),
        }
    }
}
