//! Build command

use anyhow::{Context, Result};
use hover_core::stage::stage_engine;
use hover_schema::TargetOs;

use crate::GlobalArgs;
use crate::cmd::{aot, engine, env};
use crate::ui::TerminalReporter;

/// Prepare `<project>/go/build/outputs/<os>` for the native build.
///
/// The Flutter bundle step runs before this and the native compiler after it;
/// both are external. This validates the configuration, brings the engine
/// cache up to date, compiles the AOT snapshot when needed, stages the engine
/// next to the application and prints the build environment.
pub async fn build(global: &GlobalArgs, os: TargetOs, skip_engine_download: bool) -> Result<()> {
    let build = global.build_config(os)?;
    build.validate()?;

    if skip_engine_download {
        tracing::debug!("skipping engine download");
    } else {
        engine::ensure_engine(&build).await?;
    }

    std::fs::create_dir_all(&build.output_dir)
        .with_context(|| format!("Failed to create {}", build.output_dir.display()))?;

    if build.mode.is_aot() {
        let blocking = build.clone();
        tokio::task::spawn_blocking(move || aot::compile(&blocking)).await??;
    }

    let staged = stage_engine(build.key(), &build.engine_cache_path(), &build.output_dir)?;
    tracing::info!(files = staged.len(), output = %build.output_dir.display(), "staged engine");

    for line in env::render(&build, TargetOs::host(), &TerminalReporter::new()) {
        println!("{line}");
    }
    eprintln!("Prepared {} for {os}", build.output_dir.display());
    Ok(())
}
