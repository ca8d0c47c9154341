//! Integration tests for the `hover` binary

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Test context with an isolated cache root and project directory
struct TestContext {
    temp_dir: TempDir,
    cache_root: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let cache_root = temp_dir.path().join("cache");
        std::fs::create_dir_all(&cache_root).expect("failed to create cache root");
        Self {
            temp_dir,
            cache_root,
        }
    }

    fn hover_cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_hover");
        let mut cmd = Command::new(bin_path);
        cmd.env("HOVER_CACHE_PATH", &self.cache_root);
        cmd.env_remove("FLUTTER_STORAGE_BASE_URL");
        cmd.arg("--project-dir").arg(self.temp_dir.path());
        cmd
    }
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx
        .hover_cmd()
        .arg("--help")
        .output()
        .expect("failed to run hover");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("engine"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx
        .hover_cmd()
        .arg("--version")
        .output()
        .expect("failed to run hover");
    assert!(output.status.success());
}

#[test]
fn test_engine_path_is_pure() {
    let ctx = TestContext::new();
    let output = ctx
        .hover_cmd()
        .args(["--os", "linux", "--release", "engine", "path"])
        .output()
        .expect("failed to run hover");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let expected = ctx.cache_root.join("hover/engine/linux-x64-release");
    assert_eq!(stdout.trim(), expected.display().to_string());
    assert!(!expected.exists(), "engine path must not create the cache entry");
}

#[test]
fn test_conflicting_modes_rejected() {
    let ctx = TestContext::new();
    let output = ctx
        .hover_cmd()
        .args(["--debug", "--release", "engine", "path"])
        .output()
        .expect("failed to run hover");
    assert!(!output.status.success());
}

#[test]
fn test_unknown_os_rejected() {
    let ctx = TestContext::new();
    let output = ctx
        .hover_cmd()
        .args(["--os", "plan9", "engine", "path"])
        .output()
        .expect("failed to run hover");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("plan9"));
}

#[test]
fn test_env_prints_linker_flags() {
    let ctx = TestContext::new();
    let output = ctx
        .hover_cmd()
        .args(["--os", "linux", "env"])
        .output()
        .expect("failed to run hover");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("GOOS=linux"));
    assert!(stdout.contains("-lflutter_engine -Wl,-rpath,$ORIGIN"));
    assert!(stdout.contains("HOVER_BUILD_TAGS=opengl3.3"));
}

#[test]
fn test_engine_clean_removes_entry() {
    let ctx = TestContext::new();
    let entry = ctx.cache_root.join("hover/engine/windows-x64");
    std::fs::create_dir_all(&entry).unwrap();
    std::fs::write(entry.join("version"), "1.0").unwrap();

    let output = ctx
        .hover_cmd()
        .args(["--os", "windows", "--engine-version", "1.0", "engine", "clean"])
        .output()
        .expect("failed to run hover");
    assert!(output.status.success());
    assert!(!entry.exists());
}

#[test]
fn test_cached_engine_is_reused_offline() {
    let ctx = TestContext::new();
    let entry = ctx.cache_root.join("hover/engine/windows-x64");
    std::fs::create_dir_all(&entry).unwrap();
    std::fs::write(entry.join("version"), "abc").unwrap();

    let output = ctx
        .hover_cmd()
        .env("FLUTTER_STORAGE_BASE_URL", "http://127.0.0.1:9")
        .args(["--os", "windows", "--engine-version", "abc", "engine", "update"])
        .output()
        .expect("failed to run hover");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Using engine from cache"));
}

#[test]
fn test_unavailable_engine_prints_hint() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();

    let mut artifacts = zip::ZipWriter::new(Cursor::new(Vec::new()));
    artifacts
        .start_file("icudtl.dat", SimpleFileOptions::default())
        .unwrap();
    artifacts.write_all(b"icu").unwrap();
    let artifacts = artifacts.finish().unwrap().into_inner();

    let _artifacts = server
        .mock("GET", "/flutter_infra/flutter/v1/windows-x64/artifacts.zip")
        .with_status(200)
        .with_body(artifacts)
        .create();
    let _engine = server
        .mock("GET", "/flutter_infra/flutter/v1/windows-x64/windows-x64-flutter.zip")
        .with_status(404)
        .create();

    let output = ctx
        .hover_cmd()
        .env_remove("RUST_LOG")
        .env("FLUTTER_STORAGE_BASE_URL", server.url())
        .args(["--os", "windows", "--engine-version", "v1", "engine", "update"])
        .output()
        .expect("failed to run hover");
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no engine download is currently available"));
    assert!(!ctx.cache_root.join("hover/engine/windows-x64/version").exists());
}

#[test]
fn test_opengl_none_warns() {
    let ctx = TestContext::new();
    let output = ctx
        .hover_cmd()
        .env_remove("RUST_LOG")
        .args(["--os", "linux", "--opengl", "none", "env"])
        .output()
        .expect("failed to run hover");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("HOVER_BUILD_TAGS=openglnone"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("texture plugins"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_aot_cross_compile_rejected() {
    let ctx = TestContext::new();
    let output = ctx
        .hover_cmd()
        .args(["--release", "--engine-version", "abc", "build", "windows"])
        .output()
        .expect("failed to run hover");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("AOT builds currently only work on their host OS"));
}
