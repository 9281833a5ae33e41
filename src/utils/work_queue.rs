//! Single background thread executing jobs in submission order

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Sequential job queue backed by one named thread
#[derive(Debug)]
pub struct WorkQueue {
    name: String,
    sender: Option<mpsc::Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl WorkQueue {
    /// Spawn the worker thread
    pub fn new(name: &str) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let thread_name = name.to_string();
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                debug!("Work queue {thread_name} started");
                while let Ok(job) = receiver.recv() {
                    // Jobs queued after a panicking one still run
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!("Job on work queue {thread_name} panicked");
                    }
                }
                debug!("Work queue {thread_name} stopped");
            })?;
        Ok(Self {
            name: name.to_string(),
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Queue a job. Returns `false` if the worker has stopped.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) -> bool {
        match &self.sender {
            Some(sender) => sender.send(Box::new(job)).is_ok(),
            None => false,
        }
    }

    /// Name of the worker thread
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            // The last owner may be a job running on the worker itself
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                error!("Work queue {} thread panicked", self.name);
            }
        }
    }
}
