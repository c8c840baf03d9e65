//! Publishing a directory of stylesheets into an output directory.
//!
//! A run has two phases. Clean removes whatever the output directory held before, and Publish
//! minifies every source file into it. Every deletion has finished before the first write starts;
//! within a phase the files are handled concurrently.

/// A stylesheet that was written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Published {
    /// File name, shared by the source and the output file.
    pub(crate) name: OsString,
    pub(crate) bytes: usize,
}

/// The outcome of one run, in discovery order.
#[derive(Debug, Default)]
pub(crate) struct Report {
    /// Every stale entry of the output directory, and whether it was removed.
    pub(crate) removed: Vec<Result<PathBuf, PublishError>>,
    /// Every source file, and whether it was published.
    pub(crate) files: Vec<Result<Published, PublishError>>,
}

impl Report {
    pub(crate) fn published(&self) -> impl Iterator<Item = &Published> {
        self.files.iter().filter_map(|res| res.as_ref().ok())
    }

    pub(crate) fn errors(&self) -> impl Iterator<Item = &PublishError> {
        let removed = self.removed.iter().filter_map(|res| res.as_ref().err());
        let files = self.files.iter().filter_map(|res| res.as_ref().err());
        removed.chain(files)
    }

    pub(crate) fn succeeded(&self) -> usize {
        self.published().count()
    }

    pub(crate) fn failed(&self) -> usize {
        self.errors().count()
    }

    pub(crate) fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

struct SourceFile {
    name: OsString,
    path: PathBuf,
}

struct StaleEntry {
    path: PathBuf,
    is_dir: bool,
}

/// Replace the contents of the output directory with the minified source files.
///
/// Fails only if the source directory can't be listed, in which case the output directory has not
/// been touched. Everything else is reported per file.
pub(crate) fn publish(config: &Config) -> Result<Report, PublishError> {
    let sources = list_sources(&config.source_dir)?;

    let removed = if config.clean_first {
        clean(&config.output_dir)
    } else {
        Vec::new()
    };

    let options = config.minify_options();
    let files = util::scatter(sources, |source| {
        publish_file(&source, &config.output_dir, &options)
    });

    let report = Report { removed, files };
    util::log_errors(report.errors());
    Ok(report)
}

fn list_sources(dir: &Path) -> Result<Vec<SourceFile>, PublishError> {
    let directory_read = |source: io::Error| PublishError::DirectoryRead {
        path: dir.to_owned(),
        source,
    };

    let metadata = fs::metadata(dir).map_err(directory_read)?;
    if !metadata.is_dir() {
        return Err(directory_read(io::Error::new(
            io::ErrorKind::Other,
            "not a directory",
        )));
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| directory_read(e.into()))?;
        if !entry.file_type().is_file() {
            log::debug!("skipping {}, which is not a file", entry.path().display());
            continue;
        }
        sources.push(SourceFile {
            name: entry.file_name().to_owned(),
            path: entry.into_path(),
        });
    }
    Ok(sources)
}

/// Remove everything in `dir`, returning once every removal has finished.
fn clean(dir: &Path) -> Vec<Result<PathBuf, PublishError>> {
    match stale_entries(dir) {
        Ok(entries) => util::scatter(entries, remove),
        Err(e) => vec![Err(e)],
    }
}

fn stale_entries(dir: &Path) -> Result<Vec<StaleEntry>, PublishError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            // Nothing to clean on the first run.
            Err(e) if e.depth() == 0 && e.io_error().map(io::Error::kind) == Some(NotFound) => {
                break;
            }
            Err(e) => {
                return Err(PublishError::Delete {
                    path: dir.to_owned(),
                    source: e.into(),
                })
            }
        };
        entries.push(StaleEntry {
            is_dir: entry.file_type().is_dir(),
            path: entry.into_path(),
        });
    }
    Ok(entries)
}

fn remove(entry: StaleEntry) -> Result<PathBuf, PublishError> {
    let res = if entry.is_dir {
        fs::remove_dir_all(&entry.path)
    } else {
        fs::remove_file(&entry.path)
    };
    match res {
        Ok(()) => {
            log::debug!("removed stale {}", entry.path.display());
            Ok(entry.path)
        }
        Err(source) => Err(PublishError::Delete {
            path: entry.path,
            source,
        }),
    }
}

fn publish_file(
    source: &SourceFile,
    output_dir: &Path,
    options: &minify::Options<'_>,
) -> Result<Published, PublishError> {
    let text = fs::read_to_string(&source.path).map_err(|e| PublishError::Read {
        path: source.path.clone(),
        source: e,
    })?;

    let filename = source.path.to_string_lossy();
    let minified = minify::css(&filename, &text, options).map_err(|e| PublishError::Minify {
        path: source.path.clone(),
        source: e,
    })?;

    let out_path = output_dir.join(&source.name);
    write_file(&out_path, &minified).map_err(|e| PublishError::Write {
        path: out_path.clone(),
        source: e,
    })?;
    log::info!("successfully emitted {}", out_path.display());

    Ok(Published {
        name: source.name.clone(),
        bytes: minified.len(),
    })
}

#[cfg(test)]
mod tests {
    struct Dirs {
        _root: TempDir,
        config: Config,
    }

    fn dirs(sources: &[(&str, &str)]) -> Dirs {
        let root = tempfile::tempdir().unwrap();
        let config = Config {
            source_dir: root.path().join("src"),
            output_dir: root.path().join("out"),
            ..Config::default()
        };
        fs::create_dir(&config.source_dir).unwrap();
        for (name, contents) in sources {
            fs::write(config.source_dir.join(name), contents).unwrap();
        }
        Dirs {
            _root: root,
            config,
        }
    }

    #[track_caller]
    fn read_output(config: &Config) -> BTreeMap<String, String> {
        fs::read_dir(&config.output_dir)
            .unwrap()
            .map(|entry| {
                let entry = entry.unwrap();
                let name = entry.file_name().into_string().unwrap();
                (name, fs::read_to_string(entry.path()).unwrap_or_default())
            })
            .collect()
    }

    #[track_caller]
    fn output(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|&(name, contents)| (name.to_owned(), contents.to_owned()))
            .collect()
    }

    #[test]
    fn replaces_stale_output() {
        let Dirs { _root, config } = dirs(&[
            ("a.css", "body{color:red;}"),
            ("b.css", "a{margin:  10px  ;}"),
        ]);
        fs::create_dir(&config.output_dir).unwrap();
        fs::write(config.output_dir.join("stale.css"), "old").unwrap();
        fs::create_dir(config.output_dir.join("old-dir")).unwrap();
        fs::write(config.output_dir.join("old-dir/nested.css"), "old").unwrap();

        let report = publish(&config).unwrap();

        assert!(report.is_success());
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.removed.len(), 2);
        assert_eq!(
            read_output(&config),
            output(&[("a.css", "body{color:red}"), ("b.css", "a{margin:10px}")])
        );

        let mut published: Vec<_> = report.published().cloned().collect();
        published.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            published,
            [
                Published {
                    name: "a.css".into(),
                    bytes: "body{color:red}".len(),
                },
                Published {
                    name: "b.css".into(),
                    bytes: "a{margin:10px}".len(),
                },
            ]
        );
    }

    #[test]
    fn one_output_per_source() {
        let sources: Vec<(String, String)> = (0..40)
            .map(|i| (format!("{i}.css"), format!(".c{i} {{ width: {i}px; }}")))
            .collect();
        let sources: Vec<(&str, &str)> = sources
            .iter()
            .map(|(name, contents)| (&**name, &**contents))
            .collect();
        let Dirs { _root, config } = dirs(&sources);

        let report = publish(&config).unwrap();

        assert_eq!(report.succeeded(), 40);
        let out = read_output(&config);
        assert_eq!(out.len(), 40);
        assert_eq!(out["7.css"], ".c7{width:7px}");
    }

    #[test]
    fn idempotent() {
        let Dirs { _root, config } = dirs(&[
            ("a.css", "a { color: blue; }\n"),
            ("b.css", "@media (min-width: 10px) { .b { display: none } }"),
        ]);

        publish(&config).unwrap();
        let first = read_output(&config);
        publish(&config).unwrap();
        assert_eq!(read_output(&config), first);
    }

    #[test]
    fn keeps_stale_output_without_clean() {
        let Dirs { _root, mut config } = dirs(&[("a.css", "a{color:red}")]);
        config.clean_first = false;
        fs::create_dir(&config.output_dir).unwrap();
        fs::write(config.output_dir.join("stale.css"), "old").unwrap();

        let report = publish(&config).unwrap();

        assert!(report.removed.is_empty());
        assert_eq!(read_output(&config)["stale.css"], "old");
        assert!(read_output(&config).contains_key("a.css"));
    }

    #[test]
    fn malformed_source_is_isolated() {
        let Dirs { _root, config } = dirs(&[
            ("good.css", "p { margin: 0 ; }"),
            ("bad.css", "..broken { color: red }"),
            ("also-good.css", "em{font-style:italic}"),
        ]);

        let report = publish(&config).unwrap();

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        let errors: Vec<_> = report.errors().collect();
        assert!(
            matches!(errors[0], PublishError::Minify { path, .. } if path.ends_with("bad.css")),
            "{errors:?}"
        );
        assert_eq!(
            read_output(&config),
            output(&[
                ("good.css", "p{margin:0}"),
                ("also-good.css", "em{font-style:italic}"),
            ])
        );
    }

    #[test]
    fn write_failure_is_isolated() {
        let Dirs { _root, mut config } = dirs(&[("a.css", "a{color:red}"), ("b.css", "b{color:red}")]);
        config.clean_first = false;
        // A directory where `a.css` should go can't be overwritten with a file.
        fs::create_dir_all(config.output_dir.join("a.css")).unwrap();

        let report = publish(&config).unwrap();

        assert_eq!(report.succeeded(), 1);
        let errors: Vec<_> = report.errors().collect();
        assert_eq!(errors.len(), 1);
        assert!(
            matches!(errors[0], PublishError::Write { path, .. } if path.ends_with("a.css")),
            "{errors:?}"
        );
        assert_eq!(fs::read_to_string(config.output_dir.join("b.css")).unwrap(), "b{color:red}");
    }

    #[test]
    fn unlistable_output_dir() {
        let Dirs { _root, mut config } = dirs(&[("a.css", "a{color:red}"), ("b.css", "b{color:red}")]);
        // Listing a path below a regular file fails with something other than `NotFound`.
        let file = config.output_dir.with_file_name("file");
        fs::write(&file, "not a directory").unwrap();
        config.output_dir = file.join("out");

        let report = publish(&config).unwrap();

        assert!(!report.is_success());
        assert!(
            matches!(&report.removed[..], [Err(PublishError::Delete { path, .. })] if *path == config.output_dir),
            "{:?}",
            report.removed
        );
        // The run still goes on to publish every file.
        assert_eq!(report.files.len(), 2);
        assert!(
            report
                .files
                .iter()
                .all(|res| matches!(res, Err(PublishError::Write { .. }))),
            "{:?}",
            report.files
        );
        assert_eq!(report.failed(), 3);
    }

    #[test]
    fn unreadable_source_is_isolated() {
        let Dirs { _root, config } = dirs(&[("a.css", "a{color:red}")]);
        fs::write(config.source_dir.join("latin1.css"), b"a{content:\"\xe9\"}").unwrap();

        let report = publish(&config).unwrap();

        assert_eq!(report.succeeded(), 1);
        let errors: Vec<_> = report.errors().collect();
        assert!(matches!(errors[..], [PublishError::Read { .. }]), "{errors:?}");
    }

    #[test]
    fn missing_source_dir() {
        let Dirs { _root, mut config } = dirs(&[]);
        config.source_dir = config.source_dir.join("nope");
        fs::create_dir(&config.output_dir).unwrap();
        fs::write(config.output_dir.join("keep.css"), "kept").unwrap();

        let error = publish(&config).unwrap_err();

        assert!(matches!(error, PublishError::DirectoryRead { .. }), "{error:?}");
        assert_eq!(read_output(&config), output(&[("keep.css", "kept")]));
    }

    #[test]
    fn source_dir_is_a_file() {
        let Dirs { _root, mut config } = dirs(&[("a.css", "a{color:red}")]);
        config.source_dir = config.source_dir.join("a.css");

        let error = publish(&config).unwrap_err();
        assert!(matches!(error, PublishError::DirectoryRead { .. }), "{error:?}");
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn subdirectories_are_skipped() {
        let Dirs { _root, config } = dirs(&[("a.css", "a{color:red}")]);
        fs::create_dir(config.source_dir.join("nested")).unwrap();
        fs::write(config.source_dir.join("nested/b.css"), "b{color:red}").unwrap();

        let report = publish(&config).unwrap();

        assert_eq!(report.files.len(), 1);
        assert_eq!(read_output(&config), output(&[("a.css", "a{color:red}")]));
    }

    #[test]
    fn empty_source_dir_empties_output() {
        let Dirs { _root, config } = dirs(&[]);
        fs::create_dir(&config.output_dir).unwrap();
        fs::write(config.output_dir.join("stale.css"), "old").unwrap();

        let report = publish(&config).unwrap();

        assert!(report.is_success());
        assert!(report.files.is_empty());
        assert!(read_output(&config).is_empty());
    }

    #[test]
    fn url_base_and_variables() {
        let Dirs { _root, mut config } = dirs(&[(
            "bg.css",
            ":root { --pad: 4px; }\n.hero { background: url(bg.png); padding: var(--pad); }\n",
        )]);
        config.url_base = Some("/assets/".to_owned());
        config.expand_variables = true;

        publish(&config).unwrap();

        let out = &read_output(&config)["bg.css"];
        assert!(out.contains("background:url(/assets/bg.png)"), "{out}");
        assert!(out.contains("padding:4px"), "{out}");
    }

    use super::publish;
    use super::Published;
    use crate::config::Config;
    use crate::error::PublishError;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;
}

use crate::config::Config;
use crate::error::PublishError;
use crate::minify;
use crate::util;
use crate::util::write_file;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::io::ErrorKind::NotFound;
use std::path::Path;
use std::path::PathBuf;
use walkdir::WalkDir;
