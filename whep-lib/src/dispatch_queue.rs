use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::error::SignalingError;

pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// The execution context outbound signaling must run on.
///
/// Hosts that own a specific thread or loop implement this to schedule jobs
/// there. Jobs are independent; ordering is provided by [`DispatchQueue`].
pub trait ExecutionContext: Send + Sync + 'static {
    fn spawn(&self, job: Job);
}

impl ExecutionContext for tokio::runtime::Handle {
    fn spawn(&self, job: Job) {
        tokio::runtime::Handle::spawn(self, job);
    }
}

/// Resolves once the queued operation has run.
#[must_use]
pub struct CompletionHandle<T> {
    rx: oneshot::Receiver<Result<T, SignalingError>>,
}

impl<T> CompletionHandle<T> {
    /// A handle that is already resolved.
    pub fn ready(result: Result<T, SignalingError>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }
}

impl<T> Future for CompletionHandle<T> {
    type Output = Result<T, SignalingError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|x| x.unwrap_or(Err(SignalingError::DispatchClosed)))
    }
}

/// Single worker draining operations in submission order.
///
/// Each operation, with all of its network I/O, completes before the next
/// one starts.
pub struct DispatchQueue {
    job_tx: mpsc::UnboundedSender<Job>,
}

impl DispatchQueue {
    pub fn new(context: &dyn ExecutionContext) -> Self {
        let (job_tx, mut job_rx) = mpsc::unbounded_channel::<Job>();
        context.spawn(Box::pin(async move {
            while let Some(job) = job_rx.recv().await {
                job.await;
            }
            trace!("dispatch queue closed");
        }));
        Self { job_tx }
    }

    pub fn enqueue<T, F>(&self, work: F) -> CompletionHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, SignalingError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job = Box::pin(async move {
            let _ = tx.send(work.await);
        });
        // A rejected job drops its sender, which resolves the handle as closed.
        let _ = self.job_tx.send(job);
        CompletionHandle { rx }
    }
}
