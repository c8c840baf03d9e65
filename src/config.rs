/// Where to publish from and to, and how.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub(crate) struct Config {
    /// Directory whose immediate files are the source stylesheets.
    pub source_dir: PathBuf,

    /// Directory the minified stylesheets are written to.
    pub output_dir: PathBuf,

    /// Whether to remove everything in the output directory before publishing.
    pub clean_first: bool,

    /// Base that relative `url()` references are rewritten against.
    pub url_base: Option<String>,

    /// Whether to substitute custom properties declared on `:root`.
    pub expand_variables: bool,

    /// Whether we minify the result.
    pub minify: bool,

    /// Directory to keep daily log files in, in addition to logging to the terminal.
    pub log_dir: Option<PathBuf>,

    /// Size in bytes the log directory is kept under, by deleting the oldest files.
    pub max_log_size: u64,
}

/// Config file picked up from the working directory when none is given explicitly.
pub(crate) const DEFAULT_PATH: &str = "publish.toml";

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src/css"),
            output_dir: PathBuf::from("build/css"),
            clean_first: true,
            url_base: None,
            expand_variables: false,
            minify: true,
            log_dir: None,
            max_log_size: 100_000,
        }
    }
}

impl Config {
    /// Load the config at `path`, falling back to [`DEFAULT_PATH`] if it exists and to the
    /// defaults otherwise.
    pub(crate) fn discover(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_PATH).is_file() => Self::load(DEFAULT_PATH.as_ref()),
            None => Ok(Self::default()),
        }
    }

    /// Read a TOML config file. Relative directories in it are relative to the file.
    #[context("failed to load config file `{}`", path.display())]
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).context("failed to read file")?;
        let mut config: Self = toml::from_str(&text).context("failed to parse TOML")?;

        if let Some(dir) = path.parent() {
            config.source_dir = dir.join(&config.source_dir);
            config.output_dir = dir.join(&config.output_dir);
            config.log_dir = config.log_dir.map(|log_dir| dir.join(log_dir));
        }

        Ok(config)
    }

    pub(crate) fn minify_options(&self) -> minify::Options<'_> {
        minify::Options {
            url_base: self.url_base.as_deref(),
            expand_variables: self.expand_variables,
            minify: self.minify,
        }
    }
}


use crate::minify;
use anyhow::Context as _;
use fn_error_context::context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
