//! The sequential event queue.
//!
//! One worker task owns the receiving end and processes each event to
//! completion, holding the document lock, before looking at the next. Events
//! never return errors to the poster; failures go to the model's diagnostic
//! sink.

use std::sync::Arc;

use formdoc_core::ConfigNode;
use formdoc_storage::PersistentData;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, Instrument};

use crate::commands::PrintBlockKind;
use crate::diagnostics::Diagnostic;
use crate::dialog::{show_and_wait, Dialog, DialogOutcome};
use crate::host::{Span, TextDocument};
use crate::manager::SharedModel;
use crate::substitution::SubstitutionPart;

pub enum DocumentEvent {
    /// Rescan commands and fields.
    Scan,
    /// Store a value and render the fields showing it.
    SetValue { id: String, value: Option<String> },
    Substitute {
        id: String,
        parts: Vec<SubstitutionPart>,
    },
    InsertTrafoField { span: Span, conf: ConfigNode },
    SetTrafo { name: String, conf: ConfigNode },
    SetPreviewMode(bool),
    SetVisibleState { group: String, visible: bool },
    SetPrintBlocksProps {
        kind: PrintBlockKind,
        visible: bool,
        show_highlight: bool,
    },
    CollectGarbage,
    FocusField(String),
    /// Show a dialog and hold the queue until it closes.
    ShowDialog {
        dialog: Arc<dyn Dialog>,
        reply: oneshot::Sender<DialogOutcome>,
    },
    /// Acknowledged once every earlier event is processed.
    Barrier(oneshot::Sender<()>),
}

impl DocumentEvent {
    fn label(&self) -> &'static str {
        match self {
            DocumentEvent::Scan => "scan",
            DocumentEvent::SetValue { .. } => "setValue",
            DocumentEvent::Substitute { .. } => "substitute",
            DocumentEvent::InsertTrafoField { .. } => "insertTrafoField",
            DocumentEvent::SetTrafo { .. } => "setTrafo",
            DocumentEvent::SetPreviewMode(_) => "setPreviewMode",
            DocumentEvent::SetVisibleState { .. } => "setVisibleState",
            DocumentEvent::SetPrintBlocksProps { .. } => "setPrintBlocksProps",
            DocumentEvent::CollectGarbage => "collectGarbage",
            DocumentEvent::FocusField(_) => "focusField",
            DocumentEvent::ShowDialog { .. } => "showDialog",
            DocumentEvent::Barrier(_) => "barrier",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("event queue is closed")]
pub struct QueueClosed;

impl std::fmt::Debug for DocumentEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Posting handle of a running queue. Clones post to the same worker.
#[derive(Clone)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<DocumentEvent>,
}

impl EventQueue {
    /// Start a worker for `model` on the current tokio runtime.
    pub fn spawn<D, S>(model: SharedModel<D, S>) -> (EventQueue, JoinHandle<()>)
    where
        D: TextDocument + 'static,
        S: PersistentData + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<DocumentEvent>();
        let worker = tokio::spawn(
            async move {
                let mut processed = 0u64;
                while let Some(event) = rx.recv().await {
                    process(&model, event).await;
                    processed += 1;
                }
                debug!(processed, "event queue drained");
            }
            .instrument(tracing::debug_span!("event_queue")),
        );
        (EventQueue { tx }, worker)
    }

    pub fn post(&self, event: DocumentEvent) -> Result<(), QueueClosed> {
        self.tx.send(event).map_err(|_| QueueClosed)
    }

    /// Wait until every event posted before this call is processed.
    pub async fn flush(&self) -> Result<(), QueueClosed> {
        let (ack, done) = oneshot::channel();
        self.post(DocumentEvent::Barrier(ack))?;
        done.await.map_err(|_| QueueClosed)
    }
}

async fn process<D, S>(model: &SharedModel<D, S>, event: DocumentEvent)
where
    D: TextDocument + 'static,
    S: PersistentData + 'static,
{
    let label = event.label();
    debug!(event = label, "processing event");
    match event {
        DocumentEvent::ShowDialog { dialog, reply } => {
            let outcome = show_and_wait(dialog.as_ref()).await;
            let _ = reply.send(outcome);
            return;
        }
        DocumentEvent::Barrier(ack) => {
            let _ = ack.send(());
            return;
        }
        _ => {}
    }

    let mut model = model.lock().await;
    let result = match event {
        DocumentEvent::Scan => {
            model.scan();
            Ok(())
        }
        DocumentEvent::SetValue { id, value } => {
            model.set_value(&id, value.as_deref());
            model.update_fields(&id);
            Ok(())
        }
        DocumentEvent::Substitute { id, parts } => {
            model.substitute(&id, &parts);
            Ok(())
        }
        DocumentEvent::InsertTrafoField { span, conf } => {
            model.insert_trafo_field(span, &conf).map(|_| ())
        }
        DocumentEvent::SetTrafo { name, conf } => model.set_trafo(&name, &conf),
        DocumentEvent::SetPreviewMode(on) => {
            model.set_preview_mode(on);
            Ok(())
        }
        DocumentEvent::SetVisibleState { group, visible } => {
            model.set_visible_state(&group, visible);
            Ok(())
        }
        DocumentEvent::SetPrintBlocksProps {
            kind,
            visible,
            show_highlight,
        } => {
            model.set_print_blocks_props(kind, visible, show_highlight);
            Ok(())
        }
        DocumentEvent::CollectGarbage => {
            model.collect_garbage();
            Ok(())
        }
        DocumentEvent::FocusField(id) => {
            model.focus_form_field(&id);
            Ok(())
        }
        DocumentEvent::ShowDialog { .. } | DocumentEvent::Barrier(_) => Ok(()),
    };
    if let Err(e) = result {
        model
            .diagnostics()
            .report(Diagnostic::with_cause(format!("event '{}' failed", label), e));
    }
}
