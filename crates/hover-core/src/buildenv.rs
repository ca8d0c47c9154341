//! Compiler and linker environment for the native build.

use std::path::Path;

use hover_schema::TargetOs;

use crate::reporter::Reporter;

/// Minimum macOS version passed to both compiler and linker.
pub const MACOS_MIN_VERSION: &str = "10.10";

/// C cross compiler used on Linux hosts for Windows targets.
pub const MINGW_GCC: &str = "x86_64-w64-mingw32-gcc";

/// C cross compiler used on Linux hosts for Darwin targets.
pub const OSXCROSS_CLANG: &str = "o32-clang";

/// Flags and variables the native build needs to link against the cached engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvironment {
    /// Target operating system
    pub target_os: TargetOs,
    /// Linker flags, in order
    pub ldflags: Vec<String>,
    /// Compiler flags, in order
    pub cflags: Vec<String>,
}

impl BuildEnvironment {
    /// Compose flags for linking against the engine in `cache_path`.
    ///
    /// Both the cache entry and `output_dir` are on the library search path.
    /// The runtime search path is `@executable_path` on Darwin and `$ORIGIN`
    /// on Linux; Windows finds the DLL next to the executable.
    pub fn compose(target_os: TargetOs, cache_path: &Path, output_dir: &Path) -> Self {
        let cache = cache_path.display();
        let out = output_dir.display();
        let library = target_os.library_name();

        let (ldflags, cflags) = match target_os {
            TargetOs::Darwin => (
                vec![
                    format!("-F{cache}"),
                    "-Wl,-rpath,@executable_path".to_string(),
                    format!("-F{out}"),
                    format!("-L{out}"),
                    format!("-mmacosx-version-min={MACOS_MIN_VERSION}"),
                    "-framework".to_string(),
                    library.to_string(),
                ],
                vec![format!("-mmacosx-version-min={MACOS_MIN_VERSION}")],
            ),
            TargetOs::Linux => (
                vec![
                    format!("-L{cache}"),
                    format!("-L{out}"),
                    format!("-l{library}"),
                    "-Wl,-rpath,$ORIGIN".to_string(),
                ],
                Vec::new(),
            ),
            TargetOs::Windows => (
                vec![format!("-L{cache}"), format!("-L{out}"), format!("-l{library}")],
                Vec::new(),
            ),
        };

        Self {
            target_os,
            ldflags,
            cflags,
        }
    }

    /// Value of `CGO_LDFLAGS`.
    pub fn cgo_ldflags(&self) -> String {
        self.ldflags.join(" ")
    }

    /// Value of `CGO_CFLAGS`.
    pub fn cgo_cflags(&self) -> String {
        self.cflags.join(" ")
    }

    /// Environment variables for the native build, in a stable order.
    ///
    /// On a Linux `host`, cross targets also get the matching C compiler.
    pub fn env_vars(&self, host: Option<TargetOs>) -> Vec<(String, String)> {
        let mut vars = vec![
            ("GO111MODULE".to_string(), "on".to_string()),
            ("CGO_LDFLAGS".to_string(), self.cgo_ldflags()),
            ("CGO_CFLAGS".to_string(), self.cgo_cflags()),
            ("GOOS".to_string(), self.target_os.goos().to_string()),
            ("GOARCH".to_string(), "amd64".to_string()),
            ("CGO_ENABLED".to_string(), "1".to_string()),
        ];
        if host == Some(TargetOs::Linux) {
            let cc = match self.target_os {
                TargetOs::Windows => Some(MINGW_GCC),
                TargetOs::Darwin => Some(OSXCROSS_CLANG),
                TargetOs::Linux => None,
            };
            if let Some(cc) = cc {
                vars.push(("CC".to_string(), cc.to_string()));
            }
        }
        vars
    }
}

/// Go build tag selecting the embedder's OpenGL flavor, e.g. `opengl3.3`.
///
/// `none` disables texture support, which breaks texture plugins; `reporter`
/// gets a warning in that case.
pub fn opengl_build_tag(flavor: &str, reporter: &dyn Reporter) -> String {
    if flavor == "none" {
        reporter.warning(
            "The '--opengl=none' flag makes this app incompatible with texture plugins",
        );
    }
    format!("opengl{flavor}")
}
