mod headless;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use headless::{LogRenderer, ScriptedInput, SilentAudio};
use reel_core::{
    FsProjectSource, HostEnvironment, HostSurface, Player, PlayerConfig, Point, ProjectSource,
    SystemClock,
};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the project JSON document
    #[arg(value_name = "PROJECT")]
    project: PathBuf,

    /// Number of ticks to play
    #[arg(long, default_value_t = 120)]
    ticks: u64,

    /// Click at TICK:X:Y (repeatable, ticks start at 1)
    #[arg(long = "click", value_name = "TICK:X:Y", value_parser = parse_click)]
    clicks: Vec<(u64, Point)>,

    /// Initial pointer position X:Y
    #[arg(long, value_name = "X:Y", value_parser = parse_point)]
    pointer: Option<Point>,

    /// Host environment (overrides REEL_HOST)
    #[arg(long)]
    host: Option<HostEnvironment>,

    /// Pace ticks on the wall clock instead of running as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Print the final project state as JSON to stdout
    #[arg(long)]
    dump: bool,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogFormat {
    Pretty,
    Json,
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(':')
        .ok_or_else(|| format!("expected X:Y, got '{}'", s))?;
    let x = x.trim().parse().map_err(|_| format!("bad x in '{}'", s))?;
    let y = y.trim().parse().map_err(|_| format!("bad y in '{}'", s))?;
    Ok(Point::new(x, y))
}

fn parse_click(s: &str) -> Result<(u64, Point), String> {
    let (tick, point) = s
        .split_once(':')
        .ok_or_else(|| format!("expected TICK:X:Y, got '{}'", s))?;
    let tick = tick
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|&t| t > 0)
        .ok_or_else(|| format!("bad tick in '{}'", s))?;
    Ok((tick, parse_point(point)?))
}

fn init_logging(level: LogLevel, format: LogFormat) {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .to_string()
                .parse()
                .unwrap_or_else(|_| LevelFilter::INFO.into()),
        )
        .from_env_lossy();

    let subscriber_builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Json => subscriber_builder.json().init(),
        LogFormat::Pretty => subscriber_builder.pretty().init(),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_format);

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = PlayerConfig::from_env();
    if let Some(host) = cli.host {
        config.host = host;
    }

    let path = cli.project.to_string_lossy();
    let document = FsProjectSource
        .load_document(&path)
        .with_context(|| format!("reading {}", path))?;

    info!("Initializing Reel Player...");
    info!("Project: {:?}", cli.project);

    let pointer = cli
        .pointer
        .or_else(|| cli.clicks.first().map(|&(_, p)| p))
        .unwrap_or_default();
    let surface = HostSurface::new(
        LogRenderer::default(),
        ScriptedInput::new(pointer, cli.clicks.iter().copied()),
        SilentAudio,
    )
    .with_environment(config.host);

    let mut player = Player::new(config);
    player.run_project(&document, surface)?;

    let (ticks, faults) = if cli.realtime {
        let summary = player.run(&mut SystemClock::default(), Some(cli.ticks))?;
        (summary.ticks, summary.faults.len())
    } else {
        let mut faults = 0;
        for _ in 0..cli.ticks {
            faults += player.tick()?.faults.len();
        }
        (cli.ticks, faults)
    };

    if cli.dump {
        let session = player
            .session()
            .context("project stopped before it could be dumped")?;
        println!("{}", session.project().to_json()?);
    }
    player.stop_running_project();

    if faults > 0 {
        warn!(faults, "script faults during playback");
    }
    info!(ticks, "Playback complete.");
    if ticks < cli.ticks {
        bail!("playback stopped after {} of {} ticks", ticks, cli.ticks);
    }
    Ok(())
}
