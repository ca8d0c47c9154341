//! Target operating systems.

/// Desktop operating system an application bundle is built for.
///
/// The target selects which engine archive is fetched, how the engine is
/// assembled inside the cache, and which linker flags the native build
/// receives.
///
/// # Example
///
/// ```
/// use hover_schema::TargetOs;
///
/// let target: TargetOs = "darwin".parse().unwrap();
/// assert_eq!(target.library_name(), "FlutterMacOS");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    /// Linux (GTK embedder)
    Linux,
    /// macOS
    Darwin,
    /// Windows
    Windows,
}

impl TargetOs {
    /// All supported targets, in a stable order.
    pub const ALL: [Self; 3] = [Self::Linux, Self::Darwin, Self::Windows];

    /// Operating system the current process runs on, if it is a supported target.
    pub fn host() -> Option<Self> {
        match std::env::consts::OS {
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::Darwin),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Lowercase name used in cache keys and download URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }

    /// Suffix appended to executables (`.exe` on Windows, empty elsewhere).
    pub fn executable_extension(&self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            Self::Linux | Self::Darwin => "",
        }
    }

    /// Name the native linker uses for the engine library.
    pub fn library_name(&self) -> &'static str {
        match self {
            Self::Darwin => "FlutterMacOS",
            Self::Linux | Self::Windows => "flutter_engine",
        }
    }

    /// File name of the platform engine archive on the storage bucket.
    pub fn engine_archive_name(&self) -> &'static str {
        match self {
            Self::Linux => "linux-x64-flutter-gtk.zip",
            Self::Darwin => "FlutterMacOS.framework.zip",
            Self::Windows => "windows-x64-flutter.zip",
        }
    }

    /// Value of `GOOS` for this target.
    pub fn goos(&self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for TargetOs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetOs {
    type Err = crate::SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "darwin" | "macos" => Ok(Self::Darwin),
            "windows" => Ok(Self::Windows),
            _ => Err(crate::SchemaError::UnsupportedTarget(s.to_string())),
        }
    }
}
