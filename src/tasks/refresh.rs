//! Refresh Worker
//!
//! Supervises detached refresh-ahead jobs. Callers hand a job over and return
//! immediately; the worker runs it, and failures or panics are logged here
//! and never reach the caller.

use std::future::Future;
use std::pin::Pin;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, info, warn};

type JobFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

// == Refresh Job ==
/// A unit of background work with a label for log output.
pub struct RefreshJob {
    label: String,
    future: JobFuture,
}

impl RefreshJob {
    pub fn new<F>(label: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            label: label.into(),
            future: Box::pin(future),
        }
    }
}

// == Refresh Worker ==
/// Queue plus supervisor task for refresh jobs.
///
/// Jobs dispatched before `start` wait in the queue. After `shutdown` new jobs
/// are rejected and in-flight jobs are aborted until `start` opens a new queue.
pub struct RefreshWorker {
    sender: Mutex<UnboundedSender<RefreshJob>>,
    receiver: Mutex<Option<UnboundedReceiver<RefreshJob>>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshWorker {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender: Mutex::new(sender),
            receiver: Mutex::new(Some(receiver)),
            supervisor: Mutex::new(None),
        }
    }

    /// Spawns the supervisor. Must be called from within a tokio runtime.
    /// Calls while a supervisor is running are no-ops.
    pub fn start(&self) {
        let mut supervisor = self.supervisor.lock();
        if supervisor.is_some() {
            return;
        }

        let receiver = match self.receiver.lock().take() {
            Some(receiver) => receiver,
            None => {
                // The previous queue closed on shutdown
                let (sender, receiver) = mpsc::unbounded_channel();
                *self.sender.lock() = sender;
                receiver
            }
        };
        *supervisor = Some(tokio::spawn(supervise(receiver)));
    }

    /// Queues a job. Returns false when the worker has been shut down.
    pub fn dispatch(&self, job: RefreshJob) -> bool {
        let sent = self.sender.lock().send(job);
        match sent {
            Ok(()) => true,
            Err(rejected) => {
                warn!(job = %rejected.0.label, "Refresh worker is stopped, job dropped");
                false
            }
        }
    }

    /// Stops the supervisor and aborts jobs still running.
    pub fn shutdown(&self) {
        // Dropping an unstarted receiver closes the queue as well
        self.receiver.lock().take();
        if let Some(handle) = self.supervisor.lock().take() {
            handle.abort();
        }
    }
}

impl Default for RefreshWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RefreshWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn supervise(mut receiver: UnboundedReceiver<RefreshJob>) {
    info!("Refresh worker started");
    let mut running: JoinSet<(String, anyhow::Result<()>)> = JoinSet::new();

    loop {
        tokio::select! {
            job = receiver.recv() => match job {
                Some(RefreshJob { label, future }) => {
                    debug!(job = %label, "Running refresh job");
                    running.spawn(async move { (label, future.await) });
                }
                None => break,
            },
            Some(finished) = running.join_next(), if !running.is_empty() => report(finished),
        }
    }

    while let Some(finished) = running.join_next().await {
        report(finished);
    }
    info!("Refresh worker stopped");
}

fn report(finished: Result<(String, anyhow::Result<()>), JoinError>) {
    match finished {
        Ok((label, Ok(()))) => debug!(job = %label, "Refresh job completed"),
        Ok((label, Err(err))) => warn!(job = %label, error = %format!("{err:#}"), "Refresh job failed"),
        Err(err) if err.is_panic() => warn!(error = %err, "Refresh job panicked"),
        Err(_) => {}
    }
}
