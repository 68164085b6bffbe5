//! Background persistence for graph snapshots.
//!
//! Inside a tokio runtime each graph owns a writer task that applies
//! store requests in submission order on the blocking pool, so mutating
//! calls only pay for building the snapshot. Outside a runtime requests
//! are applied inline.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::Result;
use crate::knowledge::store::{GraphSnapshot, GraphStore};

/// One unit of work for the writer.
pub(crate) enum WriteRequest {
    Save(GraphSnapshot),
    Remove,
    Flush(oneshot::Sender<()>),
}

impl WriteRequest {
    fn label(&self) -> &'static str {
        match self {
            WriteRequest::Save(_) => "save",
            WriteRequest::Remove => "remove",
            WriteRequest::Flush(_) => "flush",
        }
    }
}

/// Apply a request directly against the store.
pub(crate) fn apply(store: &dyn GraphStore, owner_id: &str, request: WriteRequest) -> Result<()> {
    match request {
        WriteRequest::Save(snapshot) => store.save(owner_id, &snapshot),
        WriteRequest::Remove => store.remove(owner_id).map(|_| ()),
        WriteRequest::Flush(ack) => {
            let _ = ack.send(());
            Ok(())
        }
    }
}

/// Handle to a graph's writer task.
///
/// Dropping the handle closes the channel; queued requests are still
/// applied before the task exits.
pub(crate) struct SnapshotWriter {
    sender: mpsc::UnboundedSender<WriteRequest>,
}

impl SnapshotWriter {
    /// Spawn a writer on the current tokio runtime, or `None` outside one.
    pub(crate) fn spawn(owner_id: &str, store: Arc<dyn GraphStore>) -> Option<Self> {
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let (sender, mut receiver) = mpsc::unbounded_channel::<WriteRequest>();
        let owner_id = owner_id.to_string();

        runtime.spawn(async move {
            while let Some(request) = receiver.recv().await {
                let label = request.label();
                let store = store.clone();
                let owner = owner_id.clone();

                // One request at a time keeps writes in mutation order
                let outcome =
                    tokio::task::spawn_blocking(move || apply(store.as_ref(), &owner, request))
                        .await;
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!(owner = %owner_id, request = label, error = %e, "graph write failed")
                    }
                    Err(e) => {
                        warn!(owner = %owner_id, request = label, error = %e, "graph write task failed")
                    }
                }
            }
            debug!(owner = %owner_id, "snapshot writer stopped");
        });

        Some(Self { sender })
    }

    /// Queue a request. Hands it back if the writer is gone.
    pub(crate) fn submit(&self, request: WriteRequest) -> std::result::Result<(), WriteRequest> {
        self.sender.send(request).map_err(|e| e.0)
    }

    /// Wait until every request queued so far has been applied.
    pub(crate) async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(WriteRequest::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }
}
