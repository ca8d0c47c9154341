//! Build modes.

/// Compilation mode of an application build.
///
/// Debug builds ship bytecode run by the JIT; profile and release builds are
/// compiled ahead of time and need the AOT toolchain in the engine cache.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// JIT build with unoptimized engine
    #[default]
    Debug,
    /// AOT build with profiling hooks
    Profile,
    /// AOT build for distribution
    Release,
}

impl BuildMode {
    /// Mode name as it appears in cache keys and output directories.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Debug => "debug_unopt",
            Self::Profile => "profile",
            Self::Release => "release",
        }
    }

    /// Whether this mode compiles ahead of time.
    pub fn is_aot(&self) -> bool {
        matches!(self, Self::Profile | Self::Release)
    }
}

impl std::fmt::Display for BuildMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for BuildMode {
    type Err = crate::SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" | "debug_unopt" => Ok(Self::Debug),
            "profile" => Ok(Self::Profile),
            "release" => Ok(Self::Release),
            _ => Err(crate::SchemaError::UnknownMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_profile_and_release_are_aot() {
        assert!(!BuildMode::Debug.is_aot());
        assert!(BuildMode::Profile.is_aot());
        assert!(BuildMode::Release.is_aot());
    }

    #[test]
    fn test_parse() {
        assert_eq!("release".parse::<BuildMode>().unwrap(), BuildMode::Release);
        assert_eq!("debug".parse::<BuildMode>().unwrap(), BuildMode::Debug);
        assert!("fast".parse::<BuildMode>().is_err());
    }
}
