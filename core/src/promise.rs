//! Future handle for an asynchronous perform.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::TransferError;
use crate::response::Response;

/// Resolves once the transfer finishes.
///
/// Dropping the promise abandons the transfer: the step chain stops at the
/// next step boundary and the engine is released.
#[derive(Debug)]
pub struct Promise {
    receiver: oneshot::Receiver<Result<Response, TransferError>>,
}

impl Promise {
    pub(crate) fn new(receiver: oneshot::Receiver<Result<Response, TransferError>>) -> Self {
        Self { receiver }
    }

    /// Block the current thread until the transfer finishes.
    ///
    /// Must not be called from within an async context.
    pub fn wait(self) -> Result<Response, TransferError> {
        self.receiver
            .blocking_recv()
            .unwrap_or_else(|_| Err(TransferError::Interrupted))
    }
}

impl Future for Promise {
    type Output = Result<Response, TransferError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(TransferError::Interrupted)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropped_sender_resolves_as_interrupted() {
        let (sender, receiver) = oneshot::channel();
        drop(sender);
        let outcome = Promise::new(receiver).await;
        assert!(matches!(outcome, Err(TransferError::Interrupted)));
    }

    #[tokio::test]
    async fn resolves_with_sent_response() {
        let (sender, receiver) = oneshot::channel();
        sender.send(Ok(Response::new())).unwrap();
        let response = Promise::new(receiver).await.unwrap();
        assert_eq!(response.response_code(), 0);
    }

    #[test]
    fn wait_blocks_until_sent() {
        let (sender, receiver) = oneshot::channel();
        let worker = std::thread::spawn(move || {
            sender.send(Ok(Response::new())).unwrap();
        });
        let response = Promise::new(receiver).wait().unwrap();
        worker.join().unwrap();
        assert!(response.body_bytes().is_empty());
    }
}
