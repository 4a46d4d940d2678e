//! Waiting for a dialog to close.
//!
//! A dialog receives a [`Completion`] and signals through it when it
//! closes. The completion is consumed by [`Completion::complete`]; dropping
//! it unused signals [`DialogOutcome::Cancelled`]. Either way the waiting
//! side hears exactly once.

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    /// Closed with an action, e.g. `"OK"` or the name of a pressed button.
    Completed(String),
    Cancelled,
}

/// The dialog's half of a rendezvous.
#[derive(Debug)]
pub struct Completion {
    tx: Option<oneshot::Sender<DialogOutcome>>,
}

impl Completion {
    pub fn complete(mut self, outcome: DialogOutcome) {
        if let Some(tx) = self.tx.take() {
            // The waiter may have given up; nothing to do then.
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            debug!("dialog closed without completing");
            let _ = tx.send(DialogOutcome::Cancelled);
        }
    }
}

/// The waiting half of a rendezvous.
#[derive(Debug)]
pub struct PendingOutcome {
    rx: oneshot::Receiver<DialogOutcome>,
}

impl PendingOutcome {
    pub async fn wait(self) -> DialogOutcome {
        self.rx.await.unwrap_or(DialogOutcome::Cancelled)
    }
}

pub fn rendezvous() -> (Completion, PendingOutcome) {
    let (tx, rx) = oneshot::channel();
    (Completion { tx: Some(tx) }, PendingOutcome { rx })
}

/// Something shown to the user that eventually closes.
#[async_trait]
pub trait Dialog: Send + Sync {
    /// Show the dialog. It may return before the dialog closes; closing is
    /// signalled through `completion`.
    async fn show(&self, completion: Completion);
}

/// Show `dialog` and wait until it closes.
pub async fn show_and_wait(dialog: &dyn Dialog) -> DialogOutcome {
    let (completion, pending) = rendezvous();
    dialog.show(completion).await;
    pending.wait().await
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Accepting;

    #[async_trait]
    impl Dialog for Accepting {
        async fn show(&self, completion: Completion) {
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                completion.complete(DialogOutcome::Completed("OK".into()));
            });
        }
    }

    struct Forgetful;

    #[async_trait]
    impl Dialog for Forgetful {
        async fn show(&self, _completion: Completion) {}
    }

    #[tokio::test]
    async fn completion_arrives_from_another_task() {
        assert_eq!(
            show_and_wait(&Accepting).await,
            DialogOutcome::Completed("OK".into())
        );
    }

    #[tokio::test]
    async fn dropping_the_completion_cancels() {
        assert_eq!(show_and_wait(&Forgetful).await, DialogOutcome::Cancelled);
    }

    #[tokio::test]
    async fn completing_after_the_waiter_left_is_harmless() {
        let (completion, pending) = rendezvous();
        drop(pending);
        completion.complete(DialogOutcome::Cancelled);
    }
}
