//! a compact telemetry dashboard for rockchip boards.

use {
    anyhow::Context,
    clap::Parser,
    rktop::{App, config::Config, input::Key},
    std::{fs::OpenOptions, path::PathBuf, sync::Mutex},
    tracing::{info, warn},
    tracing_subscriber::{
        EnvFilter,
        fmt::{format::Writer, time::FormatTime},
    },
};

#[derive(Debug, Parser)]
#[command(name = "rktop", version, about = "a compact telemetry dashboard for rockchip boards")]
struct Args {
    /// read configuration from this toml file.
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// write logs to this file. the dashboard owns the terminal, so nothing is logged otherwise.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// the refresh period, in milliseconds.
    #[arg(long, short)]
    interval_ms: Option<u64>,
    /// how many rows the process table shows.
    #[arg(long, short)]
    top: Option<usize>,
    /// start even without root. some counters may be unreadable.
    #[arg(long)]
    no_root_check: bool,
}

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = configure(&args)?;
    init_logging(&config)?;

    let app = App::new(&config);
    let keys = app.keys();
    if let Err(error) = ctrlc::set_handler(move || {
        let _ = keys.send(Key::Interrupt);
    }) {
        warn!(%error, "could not install signal handler");
    }

    info!(interval_ms = config.interval_ms, "starting");
    let status = app.run();
    info!(?status, "exiting");

    std::process::exit(status.code());
}

/// loads the configuration file, then applies command-line overrides.
fn configure(args: &Args) -> anyhow::Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;

    if let Some(interval_ms) = args.interval_ms {
        config.interval_ms = interval_ms;
    }
    if let Some(top) = args.top {
        config.top_processes = top;
    }
    if let Some(log_file) = &args.log_file {
        config.log_file = Some(log_file.clone());
    }
    if args.no_root_check {
        config.require_root = false;
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(config: &Config) -> anyhow::Result<()> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    Ok(())
}
