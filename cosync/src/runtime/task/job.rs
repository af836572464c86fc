use crate::runtime::schedule::Job;
use crate::runtime::task::Runnable;

use parking_lot::Mutex;

use std::sync::Arc;

/// A posted closure wrapped so that it can travel through the run queues.
///
/// The closure runs at most once, on whichever worker picks it up.
pub(crate) struct JobTask {
    job: Mutex<Option<Job>>,
}

impl JobTask {
    pub(crate) fn new(job: Job) -> Arc<Self> {
        Arc::new(Self {
            job: Mutex::new(Some(job)),
        })
    }
}

impl Runnable for JobTask {
    fn run(self: Arc<Self>) {
        let job = self.job.lock().take();

        if let Some(job) = job {
            job();
        }
    }
}
