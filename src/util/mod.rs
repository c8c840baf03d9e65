//! This module contains many small independent components.

pub(crate) fn log_errors<'e, E, I>(errors: I)
where
    E: Error + 'static,
    I: IntoIterator<Item = &'e E>,
{
    for error in errors {
        log::error!("{}", one_line(error));
    }
}

/// An error and its causes, formatted the way `anyhow` does with `{:#}`.
fn one_line(error: &(dyn Error + 'static)) -> String {
    let chain: Vec<String> = anyhow::Chain::new(error).map(|e| e.to_string()).collect();
    chain.join(": ")
}

pub(crate) fn write_file<P: AsRef<Path>, D: AsRef<[u8]>>(path: P, data: D) -> anyhow::Result<()> {
    let path = path.as_ref();
    make_parents(path)?;
    fs::write(path, data)
        .with_context(|| format!("couldn't write asset to `{}`", path.display()))?;

    Ok(())
}

pub(crate) fn make_parents<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create dir `{}`", parent.display()))?;
    }
    Ok(())
}

/// Run `f` on every item using a scoped pool of worker threads.
///
/// All the work has finished by the time this returns, and the results come back in the same
/// order as `items`.
pub(crate) fn scatter<T, R, F>(items: Vec<T>, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let workers = thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .min(items.len());

    if workers <= 1 {
        return items.into_iter().map(f).collect();
    }

    let jobs = SegQueue::new();
    for job in items.into_iter().enumerate() {
        jobs.push(job);
    }

    let (sender, receiver) = channel::unbounded();
    let jobs = &jobs;
    let f = &f;

    let scoped = crossbeam::scope(|scope| {
        for _ in 0..workers {
            let sender = sender.clone();
            scope.spawn(move |_| {
                while let Some((i, item)) = jobs.pop() {
                    // The receiver outlives the scope.
                    let _ = sender.send((i, f(item)));
                }
            });
        }
    });
    if let Err(payload) = scoped {
        panic::resume_unwind(payload);
    }
    drop(sender);

    let mut results: Vec<(usize, R)> = receiver.into_iter().collect();
    results.sort_unstable_by_key(|&(i, _)| i);
    results.into_iter().map(|(_, result)| result).collect()
}


use anyhow::Context as _;
use crossbeam::channel;
use crossbeam::queue::SegQueue;
use std::error::Error;
use std::fs;
use std::num::NonZeroUsize;
use std::panic;
use std::path::Path;
use std::thread;
