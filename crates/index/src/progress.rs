//! Progress reporting for long-running indexers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};

use crate::error::{ErrorKind, Result};

/// Count of artifacts processed so far, out of a total when one is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimpleProgress {
    pub current: u64,
    pub total: Option<u64>,
}
impl SimpleProgress {
    pub fn new(current: u64, total: Option<u64>) -> Self {
        Self { current, total }
    }
}

/// State of a multi-artifact indexing run.
///
/// A run reports any number of [`Simple`](Self::Simple) or
/// [`Staged`](Self::Staged) updates followed by exactly one
/// [`Result`](Self::Result).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Simple(SimpleProgress),
    /// Progress within one of several sequential stages (1-based).
    Staged {
        description: &'static str,
        stage: u32,
        stage_total: Option<u32>,
        progress: SimpleProgress,
    },
    /// The run is over.
    Result { success_count: u64, error_count: u64 },
}
impl Progress {
    pub fn simple(current: u64, total: Option<u64>) -> Self {
        Self::Simple(SimpleProgress::new(current, total))
    }

    pub fn is_result(&self) -> bool {
        matches!(self, Self::Result { .. })
    }
}

/// Stream of progress updates for one run. The last item is either the
/// terminal [`Progress::Result`] or the error that ended the run early.
///
/// Updates are coalesced: a consumer slower than the run only sees the most
/// recent state, and never holds the run up. Dropping the stream cancels the
/// run.
pub type ProgressStream = Pin<Box<dyn Stream<Item = Result<Progress>> + Send>>;

/// Indexes many artifacts, reporting progress as it goes.
///
/// Failures of individual artifacts are counted in the final
/// [`Progress::Result`] and never end the run.
pub trait MultipleArtifactIndexer {
    /// Start a run. Nothing happens until the stream is polled.
    fn index(&self) -> ProgressStream;
}

/// Publishes a run's latest progress to its [`ProgressStream`].
#[derive(Debug, Clone)]
pub(crate) struct Reporter {
    tx: Arc<watch::Sender<Option<Progress>>>,
}
impl Reporter {
    pub(crate) fn report(&self, progress: Progress) {
        // Replaces whatever the consumer hasn't picked up yet.
        self.tx.send_replace(Some(progress));
    }

    /// A reporter whose updates can be read straight off the channel.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, watch::Receiver<Option<Progress>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx: Arc::new(tx) }, rx)
    }
}

/// Success and error counts shared between the tasks of a run.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    success: AtomicU64,
    errors: AtomicU64,
}
impl Tally {
    /// Count a success, returning the new number of successes.
    pub(crate) fn success(&self) -> u64 {
        self.success.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count an error, returning the new number of errors.
    pub(crate) fn error(&self) -> u64 {
        self.errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn successes(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    pub(crate) fn result(&self) -> Progress {
        Progress::Result {
            success_count: self.success.load(Ordering::Relaxed),
            error_count: self.errors.load(Ordering::Relaxed),
        }
    }
}

enum Step {
    Changed,
    Closed,
    Finished(Option<std::result::Result<Result<Progress>, JoinError>>),
}

/// Drive `run` on its own task and stream its progress.
///
/// `run` reports intermediate progress through the [`Reporter`] it's handed
/// and resolves to the terminal [`Progress::Result`].
pub(crate) fn progress_stream<F, Fut>(run: F) -> ProgressStream
where
    F: FnOnce(Reporter) -> Fut,
    Fut: Future<Output = Result<Progress>> + Send + 'static,
{
    let (tx, mut rx) = watch::channel(None);
    let run = run(Reporter { tx: Arc::new(tx) });
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    Box::pin(stream!({
        let mut tasks = JoinSet::new();
        tasks.spawn(run);
        let mut last: Option<Progress> = None;
        let mut reporting = true;
        loop {
            let step = if reporting {
                tokio::select! {
                    biased;
                    changed = rx.changed() => if changed.is_ok() { Step::Changed } else { Step::Closed },
                    joined = tasks.join_next() => Step::Finished(joined),
                }
            } else {
                Step::Finished(tasks.join_next().await)
            };
            match step {
                Step::Changed => {
                    let latest = rx.borrow_and_update().clone();
                    if let Some(progress) = latest {
                        last = Some(progress.clone());
                        yield Ok(progress);
                    }
                },
                Step::Closed => reporting = false,
                Step::Finished(joined) => {
                    // An update may have landed between the last change
                    // notification and the run finishing.
                    let latest = rx.borrow_and_update().clone();
                    if let Some(progress) = latest {
                        if last.as_ref() != Some(&progress) {
                            yield Ok(progress);
                        }
                    }
                    yield match joined {
                        Some(Ok(outcome)) => outcome,
                        Some(Err(err)) => Err(err).or_raise(|| ErrorKind::Interrupted),
                        None => Err(exn::Exn::from(ErrorKind::Interrupted)),
                    };
                    break;
                },
            }
        }
    }))
}
