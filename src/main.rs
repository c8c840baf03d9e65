#![warn(
    noop_method_call,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications,
    clippy::pedantic
)]
#![allow(
    clippy::match_bool,
    clippy::single_component_path_imports, // https://github.com/rust-lang/rust-clippy/issues/7923
    clippy::too_many_lines,
    clippy::items_after_statements,
    clippy::struct_excessive_bools,
)]

mod config;
mod error;
mod logger;
mod minify;
mod publish;
mod util;
mod variables;

/// Minify a directory of stylesheets into a build directory.
#[derive(clap::Parser)]
struct Args {
    /// Config file to read. Defaults to `publish.toml` if it exists.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Directory containing the source stylesheets.
    #[clap(long)]
    src: Option<PathBuf>,

    /// Directory to write the minified stylesheets to.
    #[clap(long)]
    out: Option<PathBuf>,

    /// Keep whatever is already in the output directory.
    #[clap(long)]
    no_clean: bool,

    /// Rewrite relative `url()` references against this base.
    #[clap(long)]
    url_base: Option<String>,

    /// Substitute custom properties declared on `:root`.
    #[clap(long)]
    expand_variables: bool,

    /// Copy the stylesheets without minifying them.
    #[clap(long)]
    no_minify: bool,

    /// Also write logs to daily files in this directory.
    #[clap(long)]
    log_dir: Option<PathBuf>,

    /// Whether to watch the source directory for changes.
    #[clap(long)]
    watch: bool,
}

impl Args {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config::discover(self.config.as_deref())?;

        if let Some(src) = &self.src {
            config.source_dir = src.clone();
        }
        if let Some(out) = &self.out {
            config.output_dir = out.clone();
        }
        if self.no_clean {
            config.clean_first = false;
        }
        if let Some(url_base) = &self.url_base {
            config.url_base = Some(url_base.clone());
        }
        if self.expand_variables {
            config.expand_variables = true;
        }
        if self.no_minify {
            config.minify = false;
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = Some(log_dir.clone());
        }

        Ok(config)
    }
}

fn main() -> ExitCode {
    let args: Args = clap::Parser::parse();

    // The config decides where logs go, so it is loaded first and its errors reported after.
    let config = args.config();
    let log_dir = config.as_ref().ok().and_then(|config| {
        let dir = config.log_dir.clone()?;
        Some(LogDir::new(dir, config.max_log_size))
    });
    if let Err(e) = logger::init(log_dir) {
        eprintln!("{e:?}");
        return ExitCode::FAILURE;
    }

    match config.and_then(|config| run(&args, &config)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, config: &Config) -> anyhow::Result<bool> {
    let success = publish_and_report(config);

    if args.watch {
        match watch(config)? {}
    }

    Ok(success)
}

/// Publish once and log a summary. Returns whether every file made it.
fn publish_and_report(config: &Config) -> bool {
    let start = Instant::now();
    match publish::publish(config) {
        Ok(report) => {
            let mut bytes = 0;
            for published in report.published() {
                let name = Path::new(&published.name).display();
                log::debug!("{name}: {} bytes", published.bytes);
                bytes += published.bytes;
            }
            log::info!(
                "published {} file(s), {bytes} bytes, to {} in {:.2?}, {} failed",
                report.succeeded(),
                config.output_dir.display(),
                start.elapsed(),
                report.failed(),
            );
            report.is_success()
        }
        Err(e) => {
            log::error!("{:?}", anyhow::Error::new(e));
            false
        }
    }
}

#[context("failed to watch `{}`", config.source_dir.display())]
fn watch(config: &Config) -> anyhow::Result<Infallible> {
    let (sender, receiver) = channel::bounded(1);

    let mut watcher = notify::recommended_watcher(move |event_res| {
        let event: notify::Event = match event_res {
            Ok(event) => event,
            Err(e) => {
                log::error!("error watching: {}", e);
                return;
            }
        };
        if !matches!(event.kind, notify::event::EventKind::Access(_)) {
            let _ = sender.try_send(());
        }
    })
    .context("failed to create file watcher")?;

    watcher
        .watch(&config.source_dir, notify::RecursiveMode::NonRecursive)
        .context("failed to watch directory")?;

    log::info!("now watching for changes");

    loop {
        let _ = receiver.recv();
        // debounce
        let debounce_deadline = Instant::now() + Duration::from_millis(10);
        while receiver.recv_deadline(debounce_deadline).is_ok() {}

        log::info!("republishing");
        publish_and_report(config);
    }
}


use self::config::Config;
use self::logger::LogDir;
use ::{
    anyhow::Context as _,
    crossbeam::channel,
    fn_error_context::context,
    notify::Watcher as _,
    std::{
        convert::Infallible,
        path::{Path, PathBuf},
        process::ExitCode,
        time::{Duration, Instant},
    },
};
