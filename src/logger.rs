//! The global logger: the terminal, and optionally a directory of daily log files.

/// Install the global logger. Terminal output is filtered by `RUST_LOG` (default `info`), and
/// whatever reaches the terminal is also appended to `files` if there is one.
pub(crate) fn init(files: Option<LogDir>) -> anyhow::Result<()> {
    let console = pretty_env_logger::formatted_builder()
        .parse_filters(&env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned()))
        .build();
    let max_level = console.filter();

    log::set_boxed_logger(Box::new(Tee {
        console: Box::new(console),
        files,
    }))
    .context("failed to install logger")?;
    log::set_max_level(max_level);

    Ok(())
}

struct Tee {
    console: Box<dyn Log>,
    files: Option<LogDir>,
}

impl Log for Tee {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.console.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.console.log(record);

        if let Some(files) = &self.files {
            let now = Local::now().naive_local();
            if let Err(e) = files.append(now, record.level(), &record.args().to_string()) {
                // Going through `log` again would land back here.
                eprintln!("{e:?}");
            }
        }
    }

    fn flush(&self) {
        self.console.flush();
    }
}

/// A directory of log files, one per day, named `YYYY_MM_DD.log`.
///
/// Before every write the oldest files are deleted until the directory is at most `max_size`
/// bytes.
pub(crate) struct LogDir {
    path: PathBuf,
    max_size: u64,
    lock: Mutex<()>,
}

impl LogDir {
    pub(crate) fn new(path: PathBuf, max_size: u64) -> Self {
        Self {
            path,
            max_size,
            lock: Mutex::new(()),
        }
    }

    /// Append one line to the file for `now`'s date.
    #[context("failed to write to log directory `{}`", self.path.display())]
    pub(crate) fn append(
        &self,
        now: NaiveDateTime,
        level: Level,
        message: &str,
    ) -> anyhow::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        fs::create_dir_all(&self.path).context("failed to create directory")?;
        self.prune()?;

        let path = self.path.join(format!("{}.log", now.format(FILE_DATE)));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open `{}`", path.display()))?;
        writeln!(file, "{}", line(now, level, message))
            .with_context(|| format!("failed to write to `{}`", path.display()))?;

        Ok(())
    }

    /// Delete the oldest log files until the rest fit in `max_size`.
    fn prune(&self) -> anyhow::Result<()> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.path).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.context("failed to list directory")?;
            if !entry.file_type().is_file() || !is_log_file(entry.file_name()) {
                continue;
            }
            let size = entry.metadata().context("failed to read file size")?.len();
            files.push((entry.into_path(), size));
        }

        let mut total: u64 = files.iter().map(|&(_, size)| size).sum();
        for (path, size) in files {
            if total <= self.max_size {
                break;
            }
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove `{}`", path.display()))?;
            total -= size;
        }

        Ok(())
    }
}

const FILE_DATE: &str = "%Y_%m_%d";

fn is_log_file(name: &OsStr) -> bool {
    name.to_str()
        .and_then(|name| name.strip_suffix(".log"))
        .is_some_and(|date| NaiveDate::parse_from_str(date, FILE_DATE).is_ok())
}

fn line(now: NaiveDateTime, level: Level, message: &str) -> String {
    format!("[{}] {:<5} {message}", now.format("%Y-%m-%d %H:%M:%S"), level.as_str())
}


use anyhow::Context as _;
use chrono::Local;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use fn_error_context::context;
use log::Level;
use log::Log;
use log::Metadata;
use log::Record;
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::PoisonError;
use walkdir::WalkDir;
