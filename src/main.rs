//! lexicache binary entrypoint kept minimal. Subcommands live in `args`.

mod args;

use std::fmt;
use std::sync::OnceLock;

use clap::Parser;
use lexicache::config::EngineConfig;

struct LexicacheTimer;

impl tracing_subscriber::fmt::time::FormatTime for LexicacheTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let ts = chrono::Local::now().format("%Y-%m-%d-T %H:%M:%S");
        write!(w, "{ts}")
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// What: Install the tracing subscriber.
///
/// Inputs:
/// - `config`: Configuration providing the log directory
/// - `level`: Default filter when `RUST_LOG` is unset
///
/// Details:
/// - Writes to `<cache_dir>/logs/lexicache.log`; falls back to stderr when the file cannot be opened.
fn init_logging(config: &EngineConfig, level: &str) {
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
    };
    let logs_dir = config.logs_dir();
    let log_path = logs_dir.join("lexicache.log");
    let opened = std::fs::create_dir_all(&logs_dir).and_then(|()| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
    });
    match opened {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_timer(LexicacheTimer)
                .init();
            let _ = LOG_GUARD.set(guard);
            tracing::info!(path = %log_path.display(), "logging initialized");
        }
        Err(e) => {
            // Fallback: init stderr logger so commands still run
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .with_ansi(true)
                .with_writer(std::io::stderr)
                .with_timer(LexicacheTimer)
                .init();
            tracing::warn!(error = %e, "failed to open log file; using stderr");
        }
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = args::Args::parse();
    let config = match EngineConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("lexicache: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };
    init_logging(&config, &args::determine_log_level(&args));
    match &config.source {
        Some(path) => tracing::info!(path = %path.display(), "loaded configuration"),
        None => tracing::debug!("no config file found, using defaults"),
    }

    tracing::info!(command = ?args.command, "lexicache starting");
    let result = args::run(&args, config).await;
    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("lexicache: {err}");
            std::process::ExitCode::FAILURE
        }
    }
}
