//! # Worker Pool
//!
//! A fixed set of threads draining a jobs channel and publishing scored
//! results. Each worker owns a private [`AffinityProbe`] (its own encoder
//! and solo cache), so no mutable state crosses threads; the entry list is
//! shared read-only. Results arrive in completion order, not submission
//! order — consumers correlate them by the `perm` field.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::archive::TarEntry;
use crate::oracle::AffinityProbe;
use crate::RepackError;

/// An ordered index sequence to score. Length 2 is a pair probe; longer
/// sequences are exhaustive-mode candidates scored by adjacent-pair sum.
pub struct Job {
    pub perm: Vec<usize>,
}

/// A scored sequence from the results channel.
#[derive(Debug, Clone)]
pub struct JointResult {
    pub perm: Vec<usize>,
    pub gain: i64,
}

/// Default worker count: one thread per logical CPU, minus one for the
/// coordinating thread, never less than one.
pub fn default_workers() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// Handle to the running workers. Dropping it closes the jobs channel and
/// joins every thread.
pub struct Pool {
    jobs: Option<Sender<Job>>,
    results: Receiver<Result<JointResult, RepackError>>,
    handles: Vec<JoinHandle<()>>,
}

impl Pool {
    pub fn new(entries: Arc<Vec<TarEntry>>, workers: usize) -> Pool {
        let workers = workers.max(1);
        let (job_tx, job_rx) = unbounded::<Job>();
        let (result_tx, result_rx) = unbounded();

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let jrx = job_rx.clone();
            let rtx = result_tx.clone();
            let entries = Arc::clone(&entries);
            handles.push(thread::spawn(move || worker(&entries, jrx, rtx)));
        }

        Pool { jobs: Some(job_tx), results: result_rx, handles }
    }

    /// Queues a sequence for scoring. The queue is unbounded; concurrency
    /// is bounded by the worker count.
    pub fn submit(&self, perm: Vec<usize>) -> Result<(), RepackError> {
        let jobs = self
            .jobs
            .as_ref()
            .ok_or_else(|| RepackError::Pool("job channel already closed".into()))?;
        jobs.send(Job { perm })
            .map_err(|_| RepackError::Pool("all workers exited early".into()))
    }

    /// Receives the next completed result. Worker-side encoder failures
    /// surface here and end the run.
    pub fn recv(&self) -> Result<JointResult, RepackError> {
        match self.results.recv() {
            Ok(result) => result,
            Err(_) => Err(RepackError::Pool("result channel closed".into())),
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        // Closing the jobs channel lets every worker's receive loop end.
        self.jobs.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker(
    entries: &[TarEntry],
    jobs: Receiver<Job>,
    results: Sender<Result<JointResult, RepackError>>,
) {
    let mut probe = AffinityProbe::new(true);
    for job in jobs {
        let scored = probe
            .chain_gain(entries, &job.perm)
            .map(|gain| JointResult { perm: job.perm, gain });
        if results.send(scored).is_err() {
            break;
        }
    }
}
