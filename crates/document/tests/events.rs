//! The document manager and the sequential event queue.

use std::sync::Arc;

use async_trait::async_trait;
use formdoc_document::{
    CollectingSink, Completion, Dialog, DialogOutcome, DocumentEvent, DocumentFixture,
    DocumentManager, EventQueue, MemoryDocument, TextDocument,
};
use formdoc_eval::FunctionLibrary;
use formdoc_storage::MemoryStore;
use serde_json::json;
use tokio::sync::oneshot;

fn fixture() -> (MemoryDocument, MemoryStore) {
    let fixture: DocumentFixture = serde_json::from_value(json!({
        "content": [
            {"text": "Name: "},
            {"bookmark": {"name": "WM(CMD 'insertFormValue' ID 'Name')", "content": []}}
        ]
    }))
    .unwrap();
    fixture.into_parts().unwrap()
}

fn manager(sink: Arc<CollectingSink>) -> DocumentManager<MemoryDocument, MemoryStore> {
    DocumentManager::new(Arc::new(FunctionLibrary::new()), sink)
}

#[tokio::test]
async fn events_are_applied_in_order() {
    let sink = Arc::new(CollectingSink::new());
    let docs = manager(sink.clone());
    let (doc, data) = fixture();
    let model = docs.open("brief", doc, data).await;
    let (queue, worker) = EventQueue::spawn(model.clone());

    for value in ["a", "b", "c"] {
        queue
            .post(DocumentEvent::SetValue {
                id: "Name".into(),
                value: Some(value.into()),
            })
            .unwrap();
    }
    queue.flush().await.unwrap();
    assert_eq!(model.lock().await.doc().text(), "Name: c");

    drop(queue);
    drop(model);
    worker.await.unwrap();
    assert!(sink.is_empty());

    let (doc, _) = docs.close("brief").await.unwrap();
    assert_eq!(doc.text(), "Name: c");
    assert!(docs.keys().await.is_empty());
}

#[tokio::test]
async fn failing_events_go_to_the_diagnostics() {
    let sink = Arc::new(CollectingSink::new());
    let docs = manager(sink.clone());
    let (doc, data) = fixture();
    let model = docs.open("brief", doc, data).await;
    let (queue, _worker) = EventQueue::spawn(model);

    let conf = formdoc_core::parse_single("t", "X(VALUE 'a')").unwrap();
    queue
        .post(DocumentEvent::SetTrafo {
            name: "Unbekannt".into(),
            conf,
        })
        .unwrap();
    queue.flush().await.unwrap();
    let reported = sink.take();
    assert_eq!(reported.len(), 1);
    assert!(reported[0].message.contains("setTrafo"));
}

#[tokio::test]
async fn opening_twice_returns_the_same_model() {
    let docs = manager(Arc::new(CollectingSink::new()));
    let (doc, data) = fixture();
    let first = docs.open("brief", doc, data).await;
    let second = docs.open("brief", MemoryDocument::new(), MemoryStore::new()).await;
    assert!(Arc::ptr_eq(&first, &second));
    assert!(!second.lock().await.doc().is_empty());

    // Still shared, so closing cannot hand the parts back.
    assert!(docs.close("brief").await.is_none());
    assert!(docs.get("brief").await.is_none());
}

struct Closing(Option<&'static str>);

#[async_trait]
impl Dialog for Closing {
    async fn show(&self, completion: Completion) {
        if let Some(action) = self.0 {
            completion.complete(DialogOutcome::Completed(action.into()));
        }
    }
}

#[tokio::test]
async fn dialogs_hold_the_queue_until_they_close() {
    let docs = manager(Arc::new(CollectingSink::new()));
    let (doc, data) = fixture();
    let model = docs.open("brief", doc, data).await;
    let (queue, _worker) = EventQueue::spawn(model);

    let (ok_tx, ok_rx) = oneshot::channel();
    queue
        .post(DocumentEvent::ShowDialog {
            dialog: Arc::new(Closing(Some("OK"))),
            reply: ok_tx,
        })
        .unwrap();
    let (gone_tx, gone_rx) = oneshot::channel();
    queue
        .post(DocumentEvent::ShowDialog {
            dialog: Arc::new(Closing(None)),
            reply: gone_tx,
        })
        .unwrap();

    assert_eq!(ok_rx.await.unwrap(), DialogOutcome::Completed("OK".into()));
    assert_eq!(gone_rx.await.unwrap(), DialogOutcome::Cancelled);
}
