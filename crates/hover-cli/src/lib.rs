//! hover - build desktop Flutter applications
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Command line boundary over `hover-core`. Flags and `hover.toml` are
//! resolved into a [`BuildConfig`] here; everything below this crate takes
//! configuration as plain values.
//!
//! # Cache Layout
//!
//! ```text
//! <cache>/hover/engine/
//! ├── linux-x64/            # debug engine
//! ├── linux-x64-release/    # AOT engine, dart-sdk, gen_snapshot
//! └── linux-x64.lock        # held while a populate runs
//! ```

pub mod cmd;
pub mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hover_core::config::DEFAULT_OPENGL;
use hover_core::{BuildConfig, ProjectConfig};
use hover_schema::{BuildMode, TargetOs};

#[derive(Debug, Parser)]
#[command(name = "hover")]
#[command(author, version = env!("HOVER_VERSION"), about = "hover - build desktop Flutter applications")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every command.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Root of the engine cache (defaults to the user cache directory)
    #[arg(long, global = true, env = "HOVER_CACHE_PATH")]
    pub cache_path: Option<PathBuf>,

    /// Flutter engine version to use (defaults to the installed Flutter SDK's)
    #[arg(long, global = true, default_value = "")]
    pub engine_version: String,

    /// Build a debug (JIT) application
    #[arg(long, global = true)]
    pub debug: bool,

    /// Build a profile (AOT) application
    #[arg(long, global = true, conflicts_with = "debug")]
    pub profile: bool,

    /// Build a release (AOT) application
    #[arg(long, global = true, conflicts_with_all = ["debug", "profile"])]
    pub release: bool,

    /// OpenGL version for texture plugins; 'none' disables texture support
    #[arg(long, global = true, default_value = DEFAULT_OPENGL)]
    pub opengl: String,

    /// Dart entry point of the application
    #[arg(short = 't', long, global = true)]
    pub target: Option<PathBuf>,

    /// Target operating system (defaults to the host)
    #[arg(long, global = true)]
    pub os: Option<TargetOs>,

    /// Project root
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,
}

impl GlobalArgs {
    /// Selected build mode; debug unless profile or release was requested.
    pub fn mode(&self) -> BuildMode {
        if self.release {
            BuildMode::Release
        } else if self.profile {
            BuildMode::Profile
        } else {
            BuildMode::Debug
        }
    }

    /// Target from `--os`, else the host.
    pub fn target_os(&self) -> Result<TargetOs> {
        self.os
            .or_else(TargetOs::host)
            .context("Host operating system is not a supported target, pass --os")
    }

    /// Cache root from `--cache-path`, else the user cache directory.
    pub fn cache_root(&self) -> Result<PathBuf> {
        self.cache_path
            .clone()
            .or_else(hover_core::paths::default_cache_root)
            .context("Failed to resolve the user cache directory, pass --cache-path")
    }

    /// Resolve flags and `hover.toml` into a build configuration for `target_os`.
    pub fn build_config(&self, target_os: TargetOs) -> Result<BuildConfig> {
        let project = ProjectConfig::load(&self.project_dir)?;

        let mut config = BuildConfig::new(target_os, self.mode(), self.cache_root()?)
            .with_project_dir(&self.project_dir)
            .with_engine_version(&self.engine_version)
            .with_opengl(&self.opengl);
        if let Some(target) = &self.target {
            config = config.with_entry_point(target);
        }
        Ok(config.merge_project(&project))
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage the cached Flutter engine
    Engine {
        #[command(subcommand)]
        command: EngineCommands,
    },
    /// Generate the AOT ELF snapshot for a profile or release build
    Aot,
    /// Print the environment for the native build
    Env,
    /// Prepare the output directory for a target: engine, AOT snapshot, build environment
    Build {
        /// Target operating system
        #[arg(value_name = "OS")]
        target_os: TargetOs,
        /// Use the cached engine as-is, without checking its version
        #[arg(long)]
        skip_engine_download: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum EngineCommands {
    /// Print the engine cache directory
    Path,
    /// Download the engine if the cache is missing or outdated
    Update,
    /// Remove the cached engine
    Clean,
}
