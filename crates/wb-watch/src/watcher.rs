//! The inbox watcher.
//!
//! ```text
//! notify ──┐
//!          ├──► raw paths ──► settle task ──► ready queue ──► pipeline task
//! rescan ──┘                 (quiescence)                    (one at a time)
//! ```
//!
//! The notify callback runs on notify's own thread and hands paths over a
//! bounded channel. The settle task owns the [`SettleTracker`] and the
//! startup/periodic scans. A single pipeline task processes settled files in
//! order, so the board sees one producer.
//!
//! Stopping drops the notify watcher first (no new events), cancels the
//! settle task, then lets the pipeline task drain whatever was already
//! queued before it exits.

use crate::error::WatchError;
use crate::pipeline::{Outcome, Pipeline};
use crate::settle::{is_candidate, FileProbe, SettleTracker, Settled};
use crate::stats::{WatchCounters, WatchStats};
use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wb_core::config::WatchConfig;
use wb_core::Board;

const MIN_TICK: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub inbox: PathBuf,
    pub quiescence: Duration,
    pub settle_timeout: Duration,
    pub rescan: Option<Duration>,
    pub queue_capacity: usize,
    pub ignore_suffixes: Vec<String>,
}

impl WatchOptions {
    pub fn new(inbox: impl Into<PathBuf>) -> Self {
        Self {
            inbox: inbox.into(),
            quiescence: Duration::from_millis(1500),
            settle_timeout: Duration::from_secs(60),
            rescan: Some(Duration::from_secs(30)),
            queue_capacity: 64,
            ignore_suffixes: vec![".part".to_string(), ".tmp".to_string()],
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            inbox: config.inbox.clone(),
            quiescence: config.quiescence(),
            settle_timeout: config.settle_timeout(),
            rescan: config.rescan(),
            queue_capacity: config.queue_capacity.max(1),
            ignore_suffixes: config.ignore_suffixes.clone(),
        }
    }

    pub fn with_quiescence(mut self, quiescence: Duration) -> Self {
        self.quiescence = quiescence;
        self
    }

    pub fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    pub fn with_rescan(mut self, rescan: Option<Duration>) -> Self {
        self.rescan = rescan;
        self
    }

    fn tick(&self) -> Duration {
        (self.quiescence / 4).max(MIN_TICK)
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// A running watcher. Dropping it without [`WatcherHandle::stop`] cancels
/// the tasks but does not wait for the drain.
pub struct WatcherHandle {
    fs_watcher: Option<RecommendedWatcher>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    board: Arc<Board>,
    counters: Arc<WatchCounters>,
}

impl WatcherHandle {
    pub fn board(&self) -> Arc<Board> {
        Arc::clone(&self.board)
    }

    pub fn stats(&self) -> WatchStats {
        self.counters.snapshot()
    }

    pub fn counters(&self) -> Arc<WatchCounters> {
        Arc::clone(&self.counters)
    }

    /// Token that fires when the watcher begins stopping.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop accepting events and wait for in-flight files to finish.
    pub async fn stop(mut self) {
        drop(self.fs_watcher.take());
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "watcher task ended abnormally");
            }
        }
        info!("watcher stopped");
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// Check the directories, render once, subscribe to the inbox and start the
/// settle and pipeline tasks. Every error here is fatal.
pub async fn start(options: WatchOptions, pipeline: Pipeline) -> Result<WatcherHandle, WatchError> {
    check_inbox(&options.inbox)?;
    let quarantine = pipeline.quarantine();
    for dir in [quarantine.archive_dir(), quarantine.error_dir()] {
        std::fs::create_dir_all(dir).map_err(|source| WatchError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    pipeline.render().await;

    let (raw_tx, raw_rx) = mpsc::channel::<PathBuf>(options.queue_capacity);
    let (ready_tx, ready_rx) = mpsc::channel::<Settled>(options.queue_capacity);

    let fs_watcher = subscribe(&options, raw_tx)?;
    let cancel = CancellationToken::new();
    let board = Arc::clone(pipeline.board());
    let counters = Arc::clone(pipeline.counters());

    info!(
        inbox = %options.inbox.display(),
        quiescence_ms = options.quiescence.as_millis() as u64,
        entries = board.len(),
        "watching inbox"
    );

    let settle = tokio::spawn(settle_loop(options.clone(), raw_rx, ready_tx, cancel.clone()));
    let process = tokio::spawn(pipeline_loop(pipeline, ready_rx, options.settle_timeout));

    Ok(WatcherHandle {
        fs_watcher: Some(fs_watcher),
        cancel,
        tasks: vec![settle, process],
        board,
        counters,
    })
}

fn check_inbox(inbox: &Path) -> Result<(), WatchError> {
    match std::fs::metadata(inbox) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(WatchError::NotADirectory(inbox.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(WatchError::MissingDir(inbox.to_path_buf()))
        }
        Err(source) => Err(WatchError::Io {
            path: inbox.to_path_buf(),
            source,
        }),
    }
}

fn subscribe(
    options: &WatchOptions,
    raw_tx: mpsc::Sender<PathBuf>,
) -> Result<RecommendedWatcher, WatchError> {
    let ignore = options.ignore_suffixes.clone();
    let notify_err = |source| WatchError::Notify {
        path: options.inbox.clone(),
        source,
    };

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "filesystem watch error");
                return;
            }
        };
        if !is_activity(&event.kind) {
            return;
        }
        for path in event.paths {
            if is_candidate(&path, &ignore) && raw_tx.blocking_send(path).is_err() {
                // Receiver is gone: the watcher is shutting down.
                return;
            }
        }
    })
    .map_err(notify_err)?;

    watcher
        .watch(&options.inbox, RecursiveMode::NonRecursive)
        .map_err(notify_err)?;
    Ok(watcher)
}

/// Events that may mean a file appeared or grew.
fn is_activity(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(_)
            | EventKind::Access(AccessKind::Close(AccessMode::Write))
    )
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

async fn settle_loop(
    options: WatchOptions,
    mut raw_rx: mpsc::Receiver<PathBuf>,
    ready_tx: mpsc::Sender<Settled>,
    cancel: CancellationToken,
) {
    let mut tracker = SettleTracker::new(options.quiescence, options.settle_timeout);
    scan(&options, &mut tracker);

    let mut tick = interval(options.tick());
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rescan = options.rescan.map(|every| {
        let mut rescan = tokio::time::interval_at(Instant::now() + every, every);
        rescan.set_missed_tick_behavior(MissedTickBehavior::Skip);
        rescan
    });

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            Some(path) = raw_rx.recv() => {
                tracker.observe(path, Instant::now().into_std());
            }
            _ = tick.tick() => {
                let decided = tracker.poll(Instant::now().into_std(), FileProbe::of);
                for outcome in decided {
                    if let Settled::Vanished(path) = &outcome {
                        debug!(path = %path.display(), "file vanished before settling");
                        continue;
                    }
                    if ready_tx.send(outcome).await.is_err() {
                        return;
                    }
                }
            }
            _ = next_rescan(&mut rescan) => scan(&options, &mut tracker),
        }
    }
    debug!(pending = tracker.len(), "settle task stopped");
}

async fn next_rescan(rescan: &mut Option<Interval>) {
    match rescan {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Pick up every candidate file already sitting in the inbox.
fn scan(options: &WatchOptions, tracker: &mut SettleTracker) {
    let entries = match std::fs::read_dir(&options.inbox) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(inbox = %options.inbox.display(), error = %e, "inbox scan failed");
            return;
        }
    };
    let now = Instant::now().into_std();
    let mut found = 0usize;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file && is_candidate(&path, &options.ignore_suffixes) && !tracker.is_pending(&path) {
            tracker.track(path, now);
            found += 1;
        }
    }
    if found > 0 {
        debug!(found, "inbox scan queued files");
    }
}

async fn pipeline_loop(pipeline: Pipeline, mut ready_rx: mpsc::Receiver<Settled>, waited: Duration) {
    while let Some(settled) = ready_rx.recv().await {
        let outcome = match settled {
            Settled::Ready(path) => pipeline.process(&path).await,
            Settled::TimedOut(path) => pipeline.reject_unsettled(&path, waited).await,
            Settled::Vanished(_) => Outcome::Skipped,
        };
        debug!(?outcome, "file processed");
    }
    debug!("pipeline task drained");
}
