//! Worker Pool Module
//!
//! Fans a directory listing out over a fixed set of worker threads.
//!
//! Two crossbeam channels, both sized to the number of entries, so neither
//! the producer nor the workers ever block on capacity:
//! - jobs: filled completely by `submit` once every worker is running, then
//!   closed
//! - outcomes: one message per entry; closes once the last worker exits and
//!   drops its sender clone
//!
//! Workers only ever send owned `ConversionOutcome` values. Entries whose
//! output path is already taken by an earlier entry never reach a worker;
//! `submit` reports them as failed directly.

use crate::batch::{BatchLayout, ConversionOutcome, SourceFile};
use crate::conversion::Convert;
use crate::file_times::apply_file_timestamps;
use crate::img_errors::{ConvertError, SetupError};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::any::Any;
use std::collections::HashMap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

type WorkerBody = Box<dyn FnOnce() + Send + 'static>;

fn spawn_named(id: usize, body: WorkerBody) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("convert-worker-{}", id))
        .spawn(body)
}

pub struct WorkerPool<C> {
    converter: Arc<C>,
    layout: Arc<BatchLayout>,
    workers: usize,
    preserve_timestamps: bool,
}

impl<C> WorkerPool<C>
where
    C: Convert + 'static,
{
    pub fn new(converter: Arc<C>, layout: BatchLayout, workers: usize) -> Self {
        Self {
            converter,
            layout: Arc::new(layout),
            workers: workers.max(1),
            preserve_timestamps: false,
        }
    }

    /// Copy atime/mtime from each source onto its converted file.
    pub fn preserve_timestamps(mut self, enabled: bool) -> Self {
        self.preserve_timestamps = enabled;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Create the output directory; an existing directory is fine.
    pub fn prepare_output_dir(&self) -> Result<(), SetupError> {
        std::fs::create_dir_all(&self.layout.output_dir).map_err(|e| {
            SetupError::CreateOutputDir {
                path: self.layout.output_dir.clone(),
                source: e,
            }
        })
    }

    /// Create the output directory, start the workers and queue every entry.
    ///
    /// Returns as soon as the workers are running; drain
    /// [`PendingBatch::outcomes`] to collect results.
    pub fn submit(&self, entries: Vec<SourceFile>) -> Result<PendingBatch, SetupError> {
        self.submit_with(entries, spawn_named)
    }

    fn submit_with<S>(
        &self,
        entries: Vec<SourceFile>,
        mut spawn: S,
    ) -> Result<PendingBatch, SetupError>
    where
        S: FnMut(usize, WorkerBody) -> io::Result<JoinHandle<()>>,
    {
        self.prepare_output_dir()?;

        let total = entries.len();
        let capacity = total.max(1);
        let (job_tx, job_rx) = bounded::<SourceFile>(capacity);
        let (outcome_tx, outcome_rx) = bounded::<ConversionOutcome>(capacity);

        // Every worker must be up before the first job is queued, so a
        // failed spawn aborts the batch with nothing converted.
        let mut handles = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            let converter = Arc::clone(&self.converter);
            let layout = Arc::clone(&self.layout);
            let jobs = job_rx.clone();
            let results = outcome_tx.clone();
            let preserve = self.preserve_timestamps;
            let body: WorkerBody =
                Box::new(move || run_worker(id, &*converter, &layout, preserve, jobs, results));

            match spawn(id, body) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    drop(job_tx);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(SetupError::SpawnWorker(e));
                }
            }
        }
        drop(job_rx);

        info!(
            entries = total,
            workers = self.workers,
            output_dir = %self.layout.output_dir.display(),
            "Dispatching batch"
        );

        let mut claimed: HashMap<PathBuf, String> = HashMap::new();
        for entry in entries {
            let sent = match claim_destination(&self.layout, &mut claimed, entry) {
                Ok(entry) => job_tx.send(entry).is_ok(),
                Err(outcome) => outcome_tx.send(outcome).is_ok(),
            };
            // both channels hold `total` slots: only a vanished receiver fails
            if !sent {
                break;
            }
        }
        drop(job_tx);
        drop(outcome_tx);

        Ok(PendingBatch {
            outcomes: outcome_rx,
            handles,
        })
    }
}

/// Reserve the entry's output path. A matching entry whose destination is
/// already reserved by an earlier entry comes back as a `Failed` outcome.
fn claim_destination(
    layout: &BatchLayout,
    claimed: &mut HashMap<PathBuf, String>,
    entry: SourceFile,
) -> Result<SourceFile, ConversionOutcome> {
    if !layout.matches(&entry.name) {
        return Ok(entry);
    }

    let dest = layout.destination_for(&entry.name);
    if let Some(owner) = claimed.get(&dest) {
        let error = ConvertError::DestinationClaimed {
            destination: layout.destination_name(&entry.name),
            claimed_by: owner.clone(),
        };
        warn!(file = %entry.name, error = %error, "Destination collision");
        return Err(ConversionOutcome::Failed {
            source_name: entry.name,
            error: error.to_string(),
        });
    }

    claimed.insert(dest, entry.name.clone());
    Ok(entry)
}

/// A running batch.
pub struct PendingBatch {
    outcomes: Receiver<ConversionOutcome>,
    handles: Vec<JoinHandle<()>>,
}

impl PendingBatch {
    /// Outcome channel; iteration ends once every worker has finished.
    pub fn outcomes(&self) -> &Receiver<ConversionOutcome> {
        &self.outcomes
    }

    /// Wait for all workers. Returns how many of them died abnormally.
    pub fn join(self) -> usize {
        let mut crashed = 0;
        for handle in self.handles {
            if handle.join().is_err() {
                crashed += 1;
            }
        }
        if crashed > 0 {
            warn!(crashed, "Worker threads terminated abnormally");
        }
        crashed
    }
}

fn run_worker<C: Convert + ?Sized>(
    id: usize,
    converter: &C,
    layout: &BatchLayout,
    preserve_timestamps: bool,
    jobs: Receiver<SourceFile>,
    results: Sender<ConversionOutcome>,
) {
    debug!(worker = id, "Worker started");
    let mut handled = 0usize;
    for entry in jobs {
        let outcome = process_entry(converter, layout, preserve_timestamps, entry);
        handled += 1;
        if results.send(outcome).is_err() {
            // aggregator is gone, nobody is listening anymore
            break;
        }
    }
    debug!(worker = id, handled, "Worker finished");
}

/// Examine one entry: skip it, or convert it and describe the result.
pub fn process_entry<C: Convert + ?Sized>(
    converter: &C,
    layout: &BatchLayout,
    preserve_timestamps: bool,
    entry: SourceFile,
) -> ConversionOutcome {
    if !layout.matches(&entry.name) {
        return ConversionOutcome::Skipped {
            source_name: entry.name,
        };
    }

    info!(file = %entry.name, "Processing file");
    let dest_path = layout.destination_for(&entry.name);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        converter.convert(&entry.path, &dest_path)
    }));

    match result {
        Ok(Ok(())) => {
            if preserve_timestamps {
                apply_file_timestamps(&entry.path, &dest_path);
            }
            ConversionOutcome::Converted {
                source_name: entry.name,
                dest_path,
            }
        }
        Ok(Err(e)) => {
            warn!(file = %entry.name, error = %e, "Conversion failed");
            ConversionOutcome::Failed {
                source_name: entry.name,
                error: e.to_string(),
            }
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(file = %entry.name, error = %message, "Converter panicked");
            ConversionOutcome::Failed {
                source_name: entry.name,
                error: format!("converter panicked: {}", message),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
