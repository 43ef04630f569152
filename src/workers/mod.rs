//! # Worker Pool Module
//!
//! A generic fixed-size pool of OS threads for running mesh builds (or any
//! other job kind) off the owning thread.
//!
//! ## Architecture Overview
//!
//! - `WorkerPool<J, R>`: central coordinator for job distribution and worker
//!   lifecycle
//! - each worker owns one long-lived functor built by the pool's worker
//!   factory (for meshing, that functor owns a `MeshCompiler` instance)
//! - each worker has a dedicated channel pair; the owning thread drains
//!   results in `update()`
//!
//! ## Ordering and backpressure
//!
//! At most [`MAX_JOBS_IN_FLIGHT`] jobs are outstanding per worker. A worker
//! does not receive its next job until the owning thread has consumed its
//! previous result, which bounds result memory and makes "result published"
//! strictly precede "worker takes next job". Jobs that cannot be dispatched
//! immediately wait in a FIFO queue; call [`WorkerPool::pump_queued`] once
//! per frame to keep it draining.
//!
//! ## Shutdown
//!
//! Dropping the pool clears the `working` flag and drops the job senders,
//! which wakes every idle worker; each thread is then joined. A job already
//! mid-flight completes and its result is silently discarded. Jobs still
//! sitting in channel buffers are received but never executed.
//!
//! ## Failure policy
//!
//! A panic inside a worker functor is caught per job, logged, and the worker
//! continues with its next job ("log and continue"). The panicked job's
//! result is lost; the owning thread sees its in-flight slot freed as if the
//! result had been consumed.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Maximum number of jobs that can be in flight per worker channel.
///
/// Kept at 1 so a worker can never overwrite or stack up unconsumed
/// results; raising it would trade bounded memory for pipelining.
pub const MAX_JOBS_IN_FLIGHT: usize = 1;

/// Wrapper distinguishing a real result from a job lost to a worker panic.
/// The failure marker keeps the in-flight accounting correct.
enum WorkerMessage<R> {
    Completed(R),
    Failed,
}

/// A communication channel between the owning thread and one worker thread.
struct WorkerChannel<J, R> {
    job_sender: Sender<J>,
    result_receiver: Receiver<WorkerMessage<R>>,
    jobs_in_flight: usize,
    worker: Option<JoinHandle<()>>,
}

/// Manages a fixed pool of worker threads and coordinates job execution.
///
/// The pool is owned and driven by exactly one thread (for meshing, the
/// render thread): `submit`, `pump_queued` and `update` all take `&mut self`
/// and are not meant to be called from anywhere else. Workers themselves
/// never see the queues, only their private channel.
///
/// # Type Parameters
/// - `J`: Job type, sent to workers
/// - `R`: Result type, sent back to the owning thread
pub struct WorkerPool<J, R> {
    channels: Vec<WorkerChannel<J, R>>,
    queued_jobs: VecDeque<J>,
    current_channel: usize,
    working: Arc<AtomicBool>,
}

impl<J: Send + 'static, R: Send + 'static> WorkerPool<J, R> {
    /// Creates a pool with `num_workers` threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads, clamped to at least 1
    /// * `worker_factory` - Builds the per-thread worker functor; called once
    ///   per worker on the constructing thread, with the worker index
    ///
    /// # Panics
    /// Panics if the underlying thread creation fails.
    pub fn new<W, F>(num_workers: usize, worker_factory: F) -> Self
    where
        W: FnMut(J) -> R + Send + 'static,
        F: Fn(usize) -> W,
    {
        let num_workers = num_workers.max(1);
        let working = Arc::new(AtomicBool::new(true));
        let mut channels = Vec::with_capacity(num_workers);

        for index in 0..num_workers {
            let (job_sender, job_receiver) = channel::<J>();
            let (result_sender, result_receiver) = channel::<WorkerMessage<R>>();
            let mut worker_fn = worker_factory(index);
            let working_flag = working.clone();

            let worker = std::thread::Builder::new()
                .name(format!("mesh-worker-{index}"))
                .spawn(move || {
                    while let Ok(job) = job_receiver.recv() {
                        if !working_flag.load(Ordering::Acquire) {
                            break;
                        }
                        let message = match catch_unwind(AssertUnwindSafe(|| worker_fn(job))) {
                            Ok(result) => WorkerMessage::Completed(result),
                            Err(_) => {
                                log::error!("worker {index} panicked on a job, continuing");
                                WorkerMessage::Failed
                            }
                        };
                        if result_sender.send(message).is_err() {
                            break;
                        }
                    }
                })
                .expect("failed to spawn worker thread");

            channels.push(WorkerChannel {
                job_sender,
                result_receiver,
                jobs_in_flight: 0,
                worker: Some(worker),
            });
        }

        log::info!("worker pool started with {num_workers} threads");

        WorkerPool {
            channels,
            queued_jobs: VecDeque::new(),
            current_channel: 0,
            working,
        }
    }

    /// Number of worker threads in the pool.
    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of jobs waiting for a free worker.
    pub fn queued_len(&self) -> usize {
        self.queued_jobs.len()
    }

    /// Whether any job is dispatched but not yet consumed.
    pub fn has_jobs_in_flight(&self) -> bool {
        self.channels.iter().any(|c| c.jobs_in_flight > 0)
    }

    /// Attempts to send a job to a specific worker channel, handing the job
    /// back if the worker has disconnected.
    fn try_send_job(&mut self, job: J, channel_index: usize) -> Result<(), J> {
        match self.channels[channel_index].job_sender.send(job) {
            Ok(()) => {
                self.channels[channel_index].jobs_in_flight += 1;
                Ok(())
            }
            Err(send_error) => Err(send_error.0),
        }
    }

    /// Finds a channel that can accept a job, round-robin from the last one
    /// used so load spreads evenly.
    fn find_available_channel(&self) -> Option<usize> {
        if self.channels.is_empty() {
            return None;
        }
        let start = self.current_channel % self.channels.len();
        let mut current = start;
        loop {
            if self.channels[current].jobs_in_flight < MAX_JOBS_IN_FLIGHT {
                return Some(current);
            }
            current = (current + 1) % self.channels.len();
            if current == start {
                return None;
            }
        }
    }

    /// Submits a job for background execution.
    ///
    /// # Returns
    /// - `true` if the job was dispatched to a worker immediately
    /// - `false` if every worker was busy and the job was queued
    ///
    /// Never blocks either way.
    pub fn submit(&mut self, job: J) -> bool {
        match self.find_available_channel() {
            Some(channel_index) => match self.try_send_job(job, channel_index) {
                Ok(()) => {
                    self.current_channel = (channel_index + 1) % self.channels.len();
                    true
                }
                Err(job) => {
                    self.queued_jobs.push_back(job);
                    false
                }
            },
            None => {
                self.queued_jobs.push_back(job);
                false
            }
        }
    }

    /// Dispatches queued jobs to workers that have freed up. Call once per
    /// frame, after `update()` has consumed results.
    pub fn pump_queued(&mut self) {
        while !self.queued_jobs.is_empty() {
            let Some(channel_index) = self.find_available_channel() else {
                return;
            };
            let job = self.queued_jobs.pop_front().unwrap();
            if let Err(job) = self.try_send_job(job, channel_index) {
                // Worker disconnected; put the job back and stop.
                self.queued_jobs.push_front(job);
                return;
            }
        }
    }

    /// Drains every completed result, invoking `consumer` for each.
    ///
    /// Must be called by the owning thread only; results never surface
    /// anywhere else. Freeing a channel's in-flight slot here is exactly
    /// what allows that worker to receive its next job.
    pub fn update(&mut self, mut consumer: impl FnMut(R)) {
        for channel in &mut self.channels {
            while let Ok(message) = channel.result_receiver.try_recv() {
                channel.jobs_in_flight -= 1;
                match message {
                    WorkerMessage::Completed(result) => consumer(result),
                    WorkerMessage::Failed => {}
                }
            }
        }
    }
}

impl<J, R> Drop for WorkerPool<J, R> {
    fn drop(&mut self) {
        self.working.store(false, Ordering::Release);
        // Swap every job sender for a dead stub first: each drop wakes a
        // worker idle in recv(), so all threads wind down in parallel before
        // the joins start. Result receivers stay alive until after the
        // joins, letting a mid-flight result land quietly before the worker
        // notices its channel is gone.
        for worker_channel in &mut self.channels {
            drop(std::mem::replace(
                &mut worker_channel.job_sender,
                dead_sender(),
            ));
        }
        for worker_channel in &mut self.channels {
            if let Some(handle) = worker_channel.worker.take() {
                let _ = handle.join();
            }
        }
    }
}

/// A sender wired to nothing, used to drop the real sender in place.
fn dead_sender<J>() -> Sender<J> {
    let (sender, _receiver) = channel();
    sender
}
