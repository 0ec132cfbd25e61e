//! Command-line arguments.
use anyhow::{bail, Context};
use cdsleuth_core::config::ScanSettings;
use cdsleuth_core::policy::normalize_lexically;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Find a directory while the scan is still running
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "cdsleuth",
    version,
    about = "Find a directory while the scan is still running",
    long_about = "Scans the working directory first, then the rest of the filesystem, and \
                  filters the directories found so far with a fuzzy query. The selected \
                  directory is printed on stdout so a shell function can cd to it.",
    after_help = "ENVIRONMENT:\n    \
        CDSLEUTH_CONFIG    JSON settings file (max_depth, use_ignore_patterns,\n                       \
        initial_batch_size, max_batch_size, ignore_patterns)\n\n\
        EXIT STATUS:\n    \
        0 a directory was selected, 1 error, 2 cancelled or interrupted"
)]
pub struct CliArgs {
    /// Directory to start from (default: the working directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Maximum scan depth (default 5)
    #[arg(long, value_name = "N")]
    pub depth: Option<usize>,

    /// Do not skip .git, node_modules, target and similar directories
    #[arg(long)]
    pub no_ignore: bool,

    /// Scan PATH (or the working directory) only
    #[arg(long)]
    pub local_only: bool,

    /// Filter query; the best match is picked when the scan ends
    #[arg(long, default_value = "", value_name = "TEXT")]
    pub query: String,

    /// Verbose logging on stderr
    #[arg(long)]
    pub debug: bool,
}

impl CliArgs {
    /// Apply command-line overrides on top of file settings.
    pub fn apply(&self, settings: &mut ScanSettings) {
        if let Some(depth) = self.depth {
            settings.max_depth = depth;
        }
        if self.no_ignore {
            settings.use_ignore_patterns = false;
        }
    }
}

/// Make `path` absolute and clean, and check it is an existing directory.
pub fn resolve_start(path: &Path) -> anyhow::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot determine working directory")?
            .join(path)
    };
    let absolute = normalize_lexically(&joined);
    let meta = std::fs::metadata(&absolute)
        .with_context(|| format!("path does not exist: {}", absolute.display()))?;
    if !meta.is_dir() {
        bail!("not a directory: {}", absolute.display());
    }
    Ok(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("cdsleuth").chain(args.iter().copied()))
    }

    #[test]
    fn definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn no_arguments_use_defaults() {
        assert_eq!(parse(&[]).unwrap(), CliArgs::default());
    }

    #[test]
    fn all_flags() {
        let args = parse(&[
            "--depth",
            "3",
            "--no-ignore",
            "--debug",
            "--local-only",
            "--query",
            "src",
            "/tmp",
        ])
        .unwrap();
        assert_eq!(args.depth, Some(3));
        assert!(args.no_ignore && args.debug && args.local_only);
        assert_eq!(args.query, "src");
        assert_eq!(args.path, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn inline_values() {
        let args = parse(&["--depth=7", "--query=a b"]).unwrap();
        assert_eq!(args.depth, Some(7));
        assert_eq!(args.query, "a b");
    }

    #[test]
    fn help_and_version_are_not_failures() {
        let help = parse(&["--help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);
        assert!(!help.use_stderr());
        let version = parse(&["--version"]).unwrap_err();
        assert_eq!(version.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(parse(&["--depth"]).is_err());
        assert!(parse(&["--depth", "deep"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["/a", "/b"]).is_err());
    }

    #[test]
    fn overrides_apply_to_settings() {
        let mut settings = ScanSettings::default();
        parse(&["--depth", "9", "--no-ignore"])
            .unwrap()
            .apply(&mut settings);
        assert_eq!(settings.max_depth, 9);
        assert!(!settings.use_ignore_patterns);

        let mut untouched = ScanSettings::default();
        parse(&[]).unwrap().apply(&mut untouched);
        assert_eq!(untouched, ScanSettings::default());
    }

    #[test]
    fn resolve_start_checks_directory() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(resolve_start(tmp.path()).unwrap(), tmp.path());
        assert!(resolve_start(&tmp.path().join("missing")).is_err());

        let file = tmp.path().join("f");
        std::fs::write(&file, b"").unwrap();
        assert!(resolve_start(&file).is_err());
    }

    #[test]
    fn resolve_start_removes_dot_components() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("a")).unwrap();
        std::fs::create_dir_all(tmp.path().join("proj")).unwrap();

        let dotted = tmp.path().join("a").join("..").join(".").join("proj");
        let resolved = resolve_start(&dotted).unwrap();
        assert_eq!(resolved, tmp.path().join("proj"));
        assert!(resolved.components().all(|c| c.as_os_str() != "." && c.as_os_str() != ".."));
    }
}
