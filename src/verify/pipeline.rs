//! Concurrent piece hashing.
//!
//! One reader (the caller) assembles pieces and hands them to a fixed pool of
//! hashing workers over a rendezvous channel. Buffers cycle back to the reader
//! through a free list, so at most `workers + 1` piece buffers ever exist: one
//! being filled and one per worker.
//!
//! Mismatches are noticed between dispatches, which lets the reader run a few
//! pieces past a bad one. The final verdict is settled after every worker has
//! been joined and always names the lowest mismatching piece, so it agrees
//! with the sequential check.

use std::mem;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, trace, warn};

use crate::torrent::{Metainfo, PieceHash};

use super::assembler::{piece_buffer, PieceSink};
use super::{expected_hash, piece_matches, VerifyError};

struct Job {
    index: usize,
    expected: PieceHash,
    data: Vec<u8>,
}

struct Outcome {
    index: usize,
    matched: bool,
}

pub(crate) struct Pipeline<'m> {
    meta: &'m Metainfo,
    buffer_capacity: usize,
    jobs: Option<Sender<Job>>,
    free: Receiver<Vec<u8>>,
    outcomes: Receiver<Outcome>,
    workers: Vec<JoinHandle<()>>,
    unallocated: usize,
    first_mismatch: Option<usize>,
    worker_panicked: bool,
}

impl<'m> Pipeline<'m> {
    pub fn start(
        meta: &'m Metainfo,
        buffer_capacity: usize,
        workers: usize,
    ) -> Result<Self, VerifyError> {
        let workers = workers.max(1);
        let (jobs_tx, jobs_rx) = channel::bounded::<Job>(0);
        let (free_tx, free_rx) = channel::bounded::<Vec<u8>>(workers + 1);
        let (outcomes_tx, outcomes_rx) = channel::unbounded::<Outcome>();

        let mut pipeline = Pipeline {
            meta,
            buffer_capacity,
            jobs: Some(jobs_tx),
            free: free_rx,
            outcomes: outcomes_rx,
            workers: Vec::with_capacity(workers),
            unallocated: workers,
            first_mismatch: None,
            worker_panicked: false,
        };

        for id in 0..workers {
            let jobs = jobs_rx.clone();
            let free = free_tx.clone();
            let outcomes = outcomes_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("piece-hasher-{id}"))
                .spawn(move || hash_worker(jobs, free, outcomes))
                .map_err(VerifyError::Spawn)?;
            pipeline.workers.push(handle);
        }
        debug!(workers, "started hashing workers");

        Ok(pipeline)
    }

    /// Stop the workers once the queued pieces are hashed and report the
    /// lowest mismatching piece, if any.
    pub fn finish(mut self) -> Result<(), VerifyError> {
        self.shutdown();
        self.collect_outcomes();
        match self.first_mismatch {
            Some(index) => Err(VerifyError::PieceMismatch { index }),
            None if self.worker_panicked => Err(VerifyError::WorkerLost),
            None => Ok(()),
        }
    }

    fn shutdown(&mut self) {
        // Workers leave their loop once the job channel is closed and drained.
        self.jobs.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("hashing worker panicked");
                self.worker_panicked = true;
            }
        }
    }

    fn collect_outcomes(&mut self) {
        for outcome in self.outcomes.try_iter() {
            if outcome.matched {
                continue;
            }
            warn!(index = outcome.index, "piece hash mismatch");
            self.first_mismatch = Some(match self.first_mismatch {
                Some(seen) => seen.min(outcome.index),
                None => outcome.index,
            });
        }
    }

    fn take_buffer(&mut self) -> Result<Vec<u8>, VerifyError> {
        if let Ok(buffer) = self.free.try_recv() {
            return Ok(buffer);
        }
        if self.unallocated > 0 {
            self.unallocated -= 1;
            return piece_buffer(self.buffer_capacity);
        }
        self.free.recv().map_err(|_| VerifyError::WorkerLost)
    }
}

impl PieceSink for Pipeline<'_> {
    fn piece(&mut self, index: usize, data: &mut Vec<u8>) -> Result<(), VerifyError> {
        self.collect_outcomes();
        if let Some(first) = self.first_mismatch {
            return Err(VerifyError::PieceMismatch { index: first });
        }

        let expected = *expected_hash(self.meta, index)?;
        let buffer = self.take_buffer()?;
        let data = mem::replace(data, buffer);
        let jobs = self.jobs.as_ref().ok_or(VerifyError::WorkerLost)?;
        jobs.send(Job {
            index,
            expected,
            data,
        })
        .map_err(|_| VerifyError::WorkerLost)?;
        trace!(index, "dispatched piece");
        Ok(())
    }
}

impl Drop for Pipeline<'_> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn hash_worker(jobs: Receiver<Job>, free: Sender<Vec<u8>>, outcomes: Sender<Outcome>) {
    for job in jobs.iter() {
        let matched = piece_matches(&job.data, &job.expected);
        trace!(index = job.index, matched, "hashed piece");
        // Report before recycling the buffer.
        if outcomes
            .send(Outcome {
                index: job.index,
                matched,
            })
            .is_err()
        {
            break;
        }
        let mut data = job.data;
        data.clear();
        free.send(data).ok();
    }
}
