//! Headless skirmish: loads a content directory and plays it out.
mod config;
mod driver;
mod report;

use anyhow::{Context, Result};
use config::SkirmishConfig;
use driver::Skirmish;
use tactics_content::{ContentFactory, SaveLoader};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = SkirmishConfig::from_env();
    let _guard = setup_logging(&config)?;

    let factory = ContentFactory::new(&config.content_dir);
    let sim = factory
        .build_simulation(config.seed)
        .with_context(|| format!("failed to load {}", config.content_dir.display()))?;
    tracing::info!(
        "loaded {} with seed {}",
        config.content_dir.display(),
        config.seed
    );

    let mut skirmish = Skirmish::new(sim, config.frame_dt);
    let outcome = skirmish.run(config.max_frames);
    if outcome.timed_out {
        tracing::warn!("still undecided after {} frames", outcome.frames);
    }
    tracing::info!(
        "finished after {} frames, {} combat(s), {} round(s)",
        outcome.frames,
        outcome.combats,
        outcome.rounds
    );
    for (name, hp) in &outcome.survivors {
        tracing::info!("{} stands with {} HP", name, hp);
    }

    if let Some(path) = &config.save_path {
        SaveLoader::write(path, &skirmish.sim().save())?;
        tracing::info!("saved to {}", path.display());
    }
    Ok(())
}

/// Logs to stderr, and to `skirmish.log` in the log directory when one is set.
/// The returned guard flushes the file writer when dropped.
fn setup_logging(config: &SkirmishConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::never(dir, "skirmish.log");
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some(dir) = &config.log_dir {
        tracing::info!("Log file: {}/skirmish.log", dir.display());
    }
    Ok(guard)
}
