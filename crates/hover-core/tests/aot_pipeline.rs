//! AOT pipeline tests driving fake toolchain scripts.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use hover_core::aot::{AotPipeline, AotToolchain, ELF_SNAPSHOT, KERNEL_SNAPSHOT, PipelineError};
use hover_core::config::BuildConfig;
use hover_schema::{BuildMode, TargetOs};
use tempfile::TempDir;

/// Shell snippet writing the value of the `<flag>=` argument to a file.
fn write_flag_target(flag: &str, content: &str) -> String {
    format!(
        "for arg in \"$@\"; do case \"$arg\" in {flag}=*) printf '{content}' > \"${{arg#{flag}=}}\";; esac; done\n"
    )
}

fn script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Project and cache laid out the way a populated Linux release entry looks.
struct Fixture {
    _dir: TempDir,
    build: BuildConfig,
    toolchain: AotToolchain,
}

impl Fixture {
    fn new(dart_body: &str, gen_snapshot_body: &str) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let project = dir.path().join("app");
        let cache = dir.path().join("cache");

        fs::create_dir_all(project.join("lib")).unwrap();
        fs::write(project.join("lib/main_desktop.dart"), "void main() {}").unwrap();

        let build = BuildConfig::new(TargetOs::Linux, BuildMode::Release, &cache)
            .with_project_dir(&project);
        fs::create_dir_all(&build.output_dir).unwrap();

        let toolchain = AotToolchain::from_cache(build.key(), &cache);
        fs::create_dir_all(&toolchain.patched_sdk).unwrap();
        fs::create_dir_all(toolchain.frontend_server.parent().unwrap()).unwrap();
        fs::write(&toolchain.frontend_server, b"snapshot").unwrap();
        script(&toolchain.dart, dart_body);
        script(&toolchain.gen_snapshot, gen_snapshot_body);

        Self {
            _dir: dir,
            build,
            toolchain,
        }
    }

    fn output(&self, name: &str) -> PathBuf {
        self.build.output_dir.join(name)
    }
}

#[test]
fn test_pipeline_produces_elf_and_removes_kernel() {
    let fixture = Fixture::new(
        &write_flag_target("--output-dill", "kernel"),
        &write_flag_target("--elf", "elf"),
    );

    let elf = AotPipeline::new(&fixture.build, &fixture.toolchain)
        .run()
        .unwrap();

    assert_eq!(elf, fixture.output(ELF_SNAPSHOT));
    assert!(fs::metadata(&elf).unwrap().len() > 0);
    assert!(!fixture.output(KERNEL_SNAPSHOT).exists());
}

#[test]
fn test_stale_kernel_is_not_consumed() {
    // The kernel stage "succeeds" without writing anything.
    let fixture = Fixture::new("exit 0\n", &write_flag_target("--elf", "elf"));
    fs::write(fixture.output(KERNEL_SNAPSHOT), b"from a previous build").unwrap();

    let err = AotPipeline::new(&fixture.build, &fixture.toolchain)
        .run()
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::MissingOutput { stage: "Generating kernel snapshot", .. }
    ));
    assert!(!fixture.output(ELF_SNAPSHOT).exists());
}

#[test]
fn test_stage_failure_carries_diagnostics() {
    let fixture = Fixture::new(
        "echo 'lib/main_desktop.dart:1:1: Error: Expected a declaration' >&2\nexit 1\n",
        &write_flag_target("--elf", "elf"),
    );

    let err = AotPipeline::new(&fixture.build, &fixture.toolchain)
        .run()
        .unwrap_err();

    match err {
        PipelineError::StageFailed {
            stage, diagnostics, ..
        } => {
            assert_eq!(stage, "Generating kernel snapshot");
            assert!(diagnostics.contains("Error: Expected a declaration"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_elf_failure_keeps_kernel_for_inspection() {
    let fixture = Fixture::new(
        &write_flag_target("--output-dill", "kernel"),
        "echo 'bad kernel' >&2\nexit 3\n",
    );

    let err = AotPipeline::new(&fixture.build, &fixture.toolchain)
        .run()
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::StageFailed { stage: "Generating ELF snapshot", .. }
    ));
    assert!(fixture.output(KERNEL_SNAPSHOT).exists());
}
