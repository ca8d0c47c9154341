//! Engine cache commands

use std::sync::Arc;

use anyhow::{Context, Result};
use hover_core::{BuildConfig, EngineCache, EngineCacheOutcome, EngineConfig};

use crate::GlobalArgs;
use crate::ui::TerminalReporter;

/// Engine cache manager wired to the terminal.
pub fn engine_cache() -> Result<EngineCache> {
    let client = reqwest::Client::builder()
        .build()
        .context("Failed to create HTTP client")?;
    Ok(EngineCache::new(
        client,
        EngineConfig::from_env(),
        Arc::new(TerminalReporter::new()),
    ))
}

/// Validate the cache entry for `build`, downloading on a miss.
pub async fn ensure_engine(build: &BuildConfig) -> Result<EngineCacheOutcome> {
    let outcome = engine_cache()?.validate_or_update(build).await?;
    tracing::debug!(?outcome, path = %build.engine_cache_path().display(), "engine cache ready");
    Ok(outcome)
}

/// Print the engine cache directory. Performs no I/O.
pub fn path(global: &GlobalArgs) -> Result<()> {
    let key = hover_schema::PlatformKey::new(global.target_os()?, global.mode());
    println!("{}", key.cache_path(&global.cache_root()?).display());
    Ok(())
}

/// Bring the engine cache up to date.
pub async fn update(global: &GlobalArgs) -> Result<()> {
    let build = global.build_config(global.target_os()?)?;
    if ensure_engine(&build).await? == EngineCacheOutcome::Populated {
        eprintln!("Engine downloaded");
    }
    println!("{}", build.engine_cache_path().display());
    Ok(())
}

/// Remove the cached engine for the selected target and mode.
pub fn clean(global: &GlobalArgs) -> Result<()> {
    let build = global.build_config(global.target_os()?)?;
    if engine_cache()?.clean(&build)? {
        eprintln!("Removed {}", build.engine_cache_path().display());
    } else {
        eprintln!("Nothing to clean");
    }
    Ok(())
}
