//! AOT snapshot command

use anyhow::{Context, Result, bail};
use hover_core::BuildConfig;
use hover_core::aot::{AotPipeline, AotToolchain, prune_jit_assets};

use crate::GlobalArgs;
use crate::cmd::engine::ensure_engine;

/// Prune JIT assets and compile the ELF snapshot into the output directory.
///
/// Expects the Flutter bundle to already be in `<output>/flutter_assets`.
pub fn compile(build: &BuildConfig) -> Result<()> {
    if !build.mode.is_aot() {
        bail!("AOT snapshots are only built in profile or release mode");
    }
    build.validate()?;

    prune_jit_assets(&build.output_dir)?;
    let toolchain = AotToolchain::from_cache(build.key(), &build.engine_cache_path());
    let elf = AotPipeline::new(build, &toolchain)
        .run()
        .context("Failed to generate AOT snapshot")?;

    eprintln!("Generated {}", elf.display());
    Ok(())
}

/// `hover aot`: ensure the engine, then compile.
pub async fn aot(global: &GlobalArgs) -> Result<()> {
    let build = global.build_config(global.target_os()?)?;
    build.validate()?;
    ensure_engine(&build).await?;
    let blocking = build.clone();
    tokio::task::spawn_blocking(move || compile(&blocking)).await?
}
