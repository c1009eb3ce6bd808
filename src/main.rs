use std::{fs, process};

use anyhow::{Context, Result, bail};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ks_player::{
    app::PlayerApp, cli, config, config::PlayerConfig, engine::ks::KsEngine, player::PlaybackController,
};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

const PLAY_USAGE: &str = "ks-player play <script.ks>";
const RUN_USAGE: &str = "ks-player run <script.ks>";
const INSPECT_USAGE: &str = "ks-player inspect <script.ks> [output.json]";

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    match args.next().as_deref() {
        Some("play") => {
            let script = args.next().context(PLAY_USAGE)?;
            let _guard = init_file_logging()?;
            runtime.block_on(play(&script))
        }
        Some("run") => {
            let script = args.next().context(RUN_USAGE)?;
            init_stderr_logging();
            runtime.block_on(run_lines(&script))
        }
        Some("inspect") => {
            let script = args.next().context(INSPECT_USAGE)?;
            let output = args.next();
            init_stderr_logging();
            runtime.block_on(inspect(&script, output.as_deref()))
        }
        _ => bail!(
            "ks-player, a terminal host for KS scripts\n\nUsage:\n  {PLAY_USAGE}\n  {RUN_USAGE}\n  {INSPECT_USAGE}"
        ),
    }
}

fn engine(config: &PlayerConfig) -> KsEngine {
    KsEngine::new(config.propagation).with_base_url(config.base_url.clone())
}

async fn play(script: &str) -> Result<()> {
    let config = PlayerConfig::load();
    let mut app = PlayerApp::new(engine(&config), script, config);
    app.run().await
}

async fn run_lines(script: &str) -> Result<()> {
    let config = PlayerConfig::load();
    let controller = PlaybackController::new(engine(&config));
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    cli::run_lines(&controller, script, stdin, &mut stdout)
        .await
        .context("Failed to drive the session")
}

async fn inspect(script: &str, output: Option<&str>) -> Result<()> {
    let config = PlayerConfig::load();
    let tokens = engine(&config)
        .load(script)
        .await
        .with_context(|| format!("Failed to load {script}"))?;
    let json = serde_json::to_string_pretty(&tokens)?;

    match output {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("Failed to write {path}"))?;
            eprintln!("Wrote {} tokens from {} -> {}", tokens.len(), script, path);
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_stderr_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// The terminal player owns the screen, so it logs to a file only.
fn init_file_logging() -> Result<WorkerGuard> {
    let log_dir = config::log_dir();
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::never(&log_dir, "player.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .init();

    tracing::info!(dir = %log_dir.display(), "logging initialized");
    Ok(guard)
}
