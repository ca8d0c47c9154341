//! Ahead-of-time snapshot pipeline.
//!
//! Two external tools run back to back:
//!
//! 1. **Kernel** - the frontend compiler turns Dart sources into
//!    `kernel_snapshot.dill`.
//! 2. **ELF** - `gen_snapshot` compiles the kernel into `libapp.so`.
//!
//! Each [`Stage`] declares its inputs and its output. A missing input or an
//! output that never appeared is attributed to the stage that owns it. The
//! kernel is an intermediate: a stale copy is removed before the kernel stage
//! and the fresh one is removed once the ELF exists.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use hover_schema::files::{
    ARTIFACTS_DIR, DART_SDK_DIR, FRONTEND_SERVER_SNAPSHOT, PATCHED_SDK_DIR, gen_snapshot_name,
};
use hover_schema::{BuildMode, PlatformKey, TargetOs};
use thiserror::Error;

use crate::config::BuildConfig;

/// Kernel intermediate written by the first stage.
pub const KERNEL_SNAPSHOT: &str = "kernel_snapshot.dill";

/// Final snapshot linked into the application.
pub const ELF_SNAPSHOT: &str = "libapp.so";

/// JIT-only assets removed from `flutter_assets` before an AOT build.
pub const JIT_ASSETS: [&str; 3] = ["isolate_snapshot_data", "vm_snapshot_data", "kernel_blob.bin"];

/// Errors raised by the AOT pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A declared input does not exist.
    #[error("{stage}: missing input {path}")]
    MissingInput {
        /// Stage name
        stage: &'static str,
        /// Missing path
        path: PathBuf,
    },

    /// The stage's program could not be found.
    #[error("{stage}: '{program}' not found")]
    ToolNotFound {
        /// Stage name
        stage: &'static str,
        /// Program path
        program: PathBuf,
    },

    /// The stage's program could not be started.
    #[error("{stage}: failed to run {program}")]
    Spawn {
        /// Stage name
        stage: &'static str,
        /// Program path
        program: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// The tool exited unsuccessfully.
    #[error("{stage} failed ({status}):\n{diagnostics}")]
    StageFailed {
        /// Stage name
        stage: &'static str,
        /// Exit status
        status: std::process::ExitStatus,
        /// Tool output, verbatim
        diagnostics: String,
    },

    /// The tool succeeded but its declared output is absent.
    #[error("{stage}: expected output {path} was not produced")]
    MissingOutput {
        /// Stage name
        stage: &'static str,
        /// Expected path
        path: PathBuf,
    },

    /// The kernel intermediate could not be removed.
    #[error("Failed to remove {path}")]
    Cleanup {
        /// Intermediate path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// A JIT asset could not be removed before the build.
    #[error("Failed to remove unused {path}")]
    Prune {
        /// Asset path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
}

/// One external tool invocation with declared inputs and output.
#[derive(Debug, Clone)]
pub struct Stage {
    /// Name used in errors and logs
    pub name: &'static str,
    /// Executable
    pub program: PathBuf,
    /// Arguments, in order
    pub args: Vec<OsString>,
    /// Files that must exist before the stage runs
    pub inputs: Vec<PathBuf>,
    /// File the stage must produce
    pub output: PathBuf,
    /// Working directory
    pub cwd: PathBuf,
}

impl Stage {
    /// Run the stage to completion.
    ///
    /// # Errors
    ///
    /// See [`PipelineError`]. Tool output is carried verbatim on failure.
    pub fn run(&self) -> Result<(), PipelineError> {
        for input in &self.inputs {
            if !input.exists() {
                return Err(PipelineError::MissingInput {
                    stage: self.name,
                    path: input.clone(),
                });
            }
        }

        tracing::info!(stage = self.name, program = %self.program.display(), "running");
        let output = match Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.cwd)
            .output()
        {
            Ok(o) => o,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PipelineError::ToolNotFound {
                    stage: self.name,
                    program: self.program.clone(),
                });
            }
            Err(source) => {
                return Err(PipelineError::Spawn {
                    stage: self.name,
                    program: self.program.clone(),
                    source,
                });
            }
        };

        if !output.status.success() {
            let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
            diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(PipelineError::StageFailed {
                stage: self.name,
                status: output.status,
                diagnostics,
            });
        }

        if !self.output.exists() {
            return Err(PipelineError::MissingOutput {
                stage: self.name,
                path: self.output.clone(),
            });
        }
        Ok(())
    }
}

/// Locations of the AOT tools inside a populated engine cache.
#[derive(Debug, Clone)]
pub struct AotToolchain {
    /// Dart VM from the cached SDK
    pub dart: PathBuf,
    /// Frontend compiler snapshot
    pub frontend_server: PathBuf,
    /// Patched platform SDK root
    pub patched_sdk: PathBuf,
    /// Snapshot generator
    pub gen_snapshot: PathBuf,
}

impl AotToolchain {
    /// Tool paths for `key` inside `cache_path`.
    pub fn from_cache(key: PlatformKey, cache_path: &Path) -> Self {
        let ext = key.target_os.executable_extension();
        let artifacts = cache_path.join(ARTIFACTS_DIR);
        let gen_snapshot = match key.target_os {
            TargetOs::Darwin => artifacts.join(gen_snapshot_name(key.target_os)),
            TargetOs::Linux | TargetOs::Windows => {
                cache_path.join(gen_snapshot_name(key.target_os))
            }
        };
        Self {
            dart: cache_path
                .join(DART_SDK_DIR)
                .join("bin")
                .join(format!("dart{ext}")),
            frontend_server: artifacts.join(FRONTEND_SERVER_SNAPSHOT),
            patched_sdk: cache_path.join(PATCHED_SDK_DIR),
            gen_snapshot,
        }
    }
}

/// Kernel then ELF, for one build.
#[derive(Debug)]
pub struct AotPipeline {
    kernel: Stage,
    elf: Stage,
}

impl AotPipeline {
    /// Plan both stages for `build`.
    pub fn new(build: &BuildConfig, toolchain: &AotToolchain) -> Self {
        let kernel_path = build.output_dir.join(KERNEL_SNAPSHOT);
        let elf_path = build.output_dir.join(ELF_SNAPSHOT);

        let mut kernel_args: Vec<OsString> = vec![
            toolchain.frontend_server.clone().into(),
            flag("--sdk-root=", &toolchain.patched_sdk),
            "--target=flutter".into(),
            "--aot".into(),
            "--tfa".into(),
            "-Ddart.vm.product=true".into(),
            "--packages=.packages".into(),
            flag("--output-dill=", &kernel_path),
        ];
        kernel_args.push(build.entry_point.clone().into());

        let mut elf_args: Vec<OsString> = vec![
            "--no-causal-async-stacks".into(),
            "--lazy-async-stacks".into(),
            "--deterministic".into(),
            "--snapshot_kind=app-aot-elf".into(),
            flag("--elf=", &elf_path),
        ];
        if build.mode == BuildMode::Release {
            elf_args.push("--strip".into());
        }
        if build.target_os == TargetOs::Darwin {
            elf_args.push("--dedup-instructions".into());
            elf_args.push("--no-code-comments".into());
        }
        elf_args.push(kernel_path.clone().into());

        Self {
            kernel: Stage {
                name: "Generating kernel snapshot",
                program: toolchain.dart.clone(),
                args: kernel_args,
                inputs: vec![
                    toolchain.frontend_server.clone(),
                    toolchain.patched_sdk.clone(),
                    build.project_dir.join(&build.entry_point),
                ],
                output: kernel_path.clone(),
                cwd: build.project_dir.clone(),
            },
            elf: Stage {
                name: "Generating ELF snapshot",
                program: toolchain.gen_snapshot.clone(),
                args: elf_args,
                inputs: vec![kernel_path],
                output: elf_path,
                cwd: build.project_dir.clone(),
            },
        }
    }

    /// The kernel stage.
    pub fn kernel_stage(&self) -> &Stage {
        &self.kernel
    }

    /// The ELF stage.
    pub fn elf_stage(&self) -> &Stage {
        &self.elf
    }

    /// Run both stages. Returns the ELF snapshot path.
    ///
    /// # Errors
    ///
    /// Stops at the first failing stage; the kernel is left behind only if
    /// the ELF stage failed.
    pub fn run(&self) -> Result<PathBuf, PipelineError> {
        remove_if_exists(&self.kernel.output)?;
        self.kernel.run()?;
        self.elf.run()?;
        remove_if_exists(&self.kernel.output)?;
        Ok(self.elf.output.clone())
    }
}

/// Remove the JIT-only assets from `<output_dir>/flutter_assets`.
///
/// # Errors
///
/// Every asset must exist; a missing one is an error.
pub fn prune_jit_assets(output_dir: &Path) -> Result<(), PipelineError> {
    let assets = output_dir.join("flutter_assets");
    for name in JIT_ASSETS {
        let path = assets.join(name);
        std::fs::remove_file(&path).map_err(|source| PipelineError::Prune { path, source })?;
    }
    Ok(())
}

fn flag(prefix: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(prefix);
    arg.push(path);
    arg
}

fn remove_if_exists(path: &Path) -> Result<(), PipelineError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PipelineError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}
