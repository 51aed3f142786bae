use crate::{error::Error, ResponseData, Violation};
use std::{fmt::Debug, sync::Arc};
use tokio::sync::oneshot;
use tracing::warn;

pub type Outcome = Result<(), Error>;

/// Capability to signal the outcome of one call.
///
/// Every signalling method consumes the completion, so it can be signalled at
/// most once. Dropping it without signalling resolves the call with
/// [`Error::CompletionDropped`].
#[derive(Debug)]
pub struct Completion {
    sender: Option<oneshot::Sender<Outcome>>,
}

impl Completion {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Outcome>) {
        let (sender, receiver) = oneshot::channel();

        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    pub fn complete(mut self, outcome: Outcome) {
        if let Some(sender) = self.sender.take() {
            // the caller may have stopped waiting; nothing left to report to
            let _ = sender.send(outcome);
        }
    }

    pub fn succeed(self) {
        self.complete(Ok(()))
    }

    pub fn fail<E: Into<Error>>(self, error: E) {
        self.complete(Err(error.into()))
    }

    /// Forwards the violation handed to an after handler, if any.
    pub fn finish(self, violation: Option<Violation>) {
        match violation {
            Some(violation) => self.fail(violation),
            None => self.succeed(),
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            warn!("completion dropped without being signalled");
            let _ = sender.send(Err(Error::CompletionDropped));
        }
    }
}

type HandlerFn = dyn Fn(Option<Violation>, ResponseData, Completion) + Send + Sync;

/// Hook run between structural validation and completion.
#[derive(Clone)]
pub struct AfterHandler {
    handler: Arc<HandlerFn>,
}

impl AfterHandler {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(Option<Violation>, ResponseData, Completion) + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }

    pub(crate) fn call(
        &self,
        violation: Option<Violation>,
        response: ResponseData,
        completion: Completion,
    ) {
        (self.handler)(violation, response, completion)
    }
}

impl Debug for AfterHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AfterHandler")
    }
}
