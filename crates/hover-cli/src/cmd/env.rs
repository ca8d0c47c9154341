//! Print the native build environment

use anyhow::Result;
use hover_core::buildenv::{BuildEnvironment, opengl_build_tag};
use hover_core::{BuildConfig, Reporter};
use hover_schema::TargetOs;

use crate::GlobalArgs;
use crate::ui::TerminalReporter;

/// Environment assignments plus the build tag, one per line.
pub fn render(build: &BuildConfig, host: Option<TargetOs>, reporter: &dyn Reporter) -> Vec<String> {
    let env =
        BuildEnvironment::compose(build.target_os, &build.engine_cache_path(), &build.output_dir);
    let mut lines: Vec<String> = env
        .env_vars(host)
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    let tag = opengl_build_tag(&build.opengl, reporter);
    lines.push(format!("HOVER_BUILD_TAGS={tag}"));
    lines
}

/// Print the environment for the selected target. Performs no network I/O.
pub fn env(global: &GlobalArgs) -> Result<()> {
    let build = global.build_config(global.target_os()?)?;
    for line in render(&build, TargetOs::host(), &TerminalReporter::new()) {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hover_core::NullReporter;
    use hover_schema::BuildMode;

    #[test]
    fn test_render_includes_tag_and_flags() {
        let build = BuildConfig::new(TargetOs::Linux, BuildMode::Debug, "/c")
            .with_output_dir("/out")
            .with_opengl("none");
        let lines = render(&build, Some(TargetOs::Linux), &NullReporter);

        assert!(lines.contains(&"GOOS=linux".to_string()));
        assert!(lines.contains(&"HOVER_BUILD_TAGS=openglnone".to_string()));
        assert!(
            lines
                .iter()
                .any(|l| l.starts_with("CGO_LDFLAGS=-L/c/hover/engine/linux-x64 -L/out"))
        );
    }
}
