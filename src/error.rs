//! Errors produced while publishing.

/// Something that went wrong during a publish run.
///
/// Only [`PublishError::DirectoryRead`] stops a run. Every other variant concerns a single file
/// and is collected into the run's report instead.
#[derive(Debug)]
pub(crate) enum PublishError {
    /// The source directory is missing or could not be listed.
    DirectoryRead { path: PathBuf, source: io::Error },
    /// A stale entry of the output directory could not be removed.
    Delete { path: PathBuf, source: io::Error },
    /// A source file could not be read as UTF-8 text.
    Read { path: PathBuf, source: io::Error },
    /// A source file is not valid CSS.
    Minify { path: PathBuf, source: anyhow::Error },
    /// An output file could not be written.
    Write { path: PathBuf, source: anyhow::Error },
}

impl PublishError {
    /// The file or directory this error is about.
    pub(crate) fn path(&self) -> &Path {
        match self {
            Self::DirectoryRead { path, .. }
            | Self::Delete { path, .. }
            | Self::Read { path, .. }
            | Self::Minify { path, .. }
            | Self::Write { path, .. } => path,
        }
    }
}

impl Display for PublishError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let path = self.path().display();
        match self {
            Self::DirectoryRead { .. } => write!(f, "failed to read source directory `{path}`"),
            Self::Delete { .. } => write!(f, "failed to remove stale output `{path}`"),
            Self::Read { .. } => write!(f, "failed to read `{path}`"),
            Self::Minify { .. } => write!(f, "failed to minify `{path}`"),
            Self::Write { .. } => write!(f, "failed to write `{path}`"),
        }
    }
}

impl Error for PublishError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DirectoryRead { source, .. }
            | Self::Delete { source, .. }
            | Self::Read { source, .. } => Some(source),
            Self::Minify { source, .. } | Self::Write { source, .. } => Some(&**source),
        }
    }
}


use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::io;
use std::path::Path;
use std::path::PathBuf;
