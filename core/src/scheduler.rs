//! Where asynchronous transfer steps run.

use tokio::runtime::Handle;

/// A unit of work submitted by the step chain.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted work later, on some thread other than the caller's.
///
/// Each submission carries exactly one engine step. Work submitted while an
/// earlier one is still running must not be run concurrently with it for the
/// same transfer; the chain only ever submits the next step from inside the
/// current one, so any FIFO executor satisfies this.
pub trait Scheduler: Send + Sync + 'static {
    fn schedule(&self, work: Work);
}

/// Steps run on the runtime's blocking pool, since an engine step may block
/// briefly on socket I/O.
impl Scheduler for Handle {
    fn schedule(&self, work: Work) {
        drop(self.spawn_blocking(work));
    }
}

impl<S: Scheduler + ?Sized> Scheduler for std::sync::Arc<S> {
    fn schedule(&self, work: Work) {
        (**self).schedule(work);
    }
}
