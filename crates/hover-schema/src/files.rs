//! Relative file layout of a populated engine cache.

use crate::{BuildMode, TargetOs};

/// ICU data file shipped next to every desktop binary.
pub const ICU_DATA: &str = "icudtl.dat";

/// Commit marker holding the engine version of a populated cache entry.
pub const VERSION_STAMP: &str = "version";

/// Directory holding `artifacts.zip` contents inside a cache entry.
pub const ARTIFACTS_DIR: &str = "artifacts";

/// Dart SDK directory (AOT caches only).
pub const DART_SDK_DIR: &str = "dart-sdk";

/// Patched platform SDK directory (AOT caches only).
pub const PATCHED_SDK_DIR: &str = "flutter_patched_sdk_product";

/// Frontend compiler snapshot, relative to the artifacts directory.
pub const FRONTEND_SERVER_SNAPSHOT: &str = "frontend_server.dart.snapshot";

/// Engine files a cache entry must contain, in relocation order.
///
/// The first entry is the primary engine binary (the one stripped on Linux).
/// Ownership follows the target/mode combination; the mode is accepted so
/// callers never have to care that current layouts happen to be mode
/// independent.
pub fn engine_files(target_os: TargetOs, _mode: BuildMode) -> &'static [&'static str] {
    match target_os {
        TargetOs::Linux => &["libflutter_engine.so"],
        TargetOs::Darwin => &["FlutterMacOS.framework"],
        TargetOs::Windows => &["flutter_engine.dll", "flutter_engine.dll.lib"],
    }
}

/// File name of the snapshot generator for a target.
pub fn gen_snapshot_name(target_os: TargetOs) -> String {
    format!("gen_snapshot{}", target_os.executable_extension())
}
