//! Background workers.
//!
//! A worker is a named tokio task fed through an unbounded channel. The
//! inbound handler only logs and counts messages today; real task offload
//! plugs in here.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Error, Result};

/// Handle to a running worker task.
///
/// Dropping the handle closes the inbound channel, which ends the task
/// once queued messages are drained.
pub struct WorkerHandle {
    name: String,
    script: String,
    sender: mpsc::UnboundedSender<Value>,
    received: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawn a worker on the current tokio runtime.
    pub fn spawn(name: impl Into<String>, script: impl Into<String>) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Internal(format!("Cannot spawn worker: {}", e)))?;

        let name = name.into();
        let script = script.into();
        let (sender, mut receiver) = mpsc::unbounded_channel::<Value>();
        let received = Arc::new(AtomicU64::new(0));

        let task_name = name.clone();
        let task_received = received.clone();
        let task = runtime.spawn(async move {
            while let Some(message) = receiver.recv().await {
                task_received.fetch_add(1, Ordering::SeqCst);
                debug!(worker = %task_name, %message, "worker received message");
            }
            debug!(worker = %task_name, "worker channel closed");
        });

        Ok(Self {
            name,
            script,
            sender,
            received,
            task,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    /// Queue a message for the worker.
    pub fn post(&self, message: Value) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|_| Error::Internal(format!("Worker {} is no longer running", self.name)))
    }

    /// False once the message loop has exited.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Close the channel and wait for the task to finish.
    pub async fn shutdown(self) -> Result<()> {
        let Self { sender, task, .. } = self;
        drop(sender);
        task.await
            .map_err(|e| Error::Internal(format!("Worker task failed: {}", e)))
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("name", &self.name)
            .field("script", &self.script)
            .field("received", &self.received.load(Ordering::SeqCst))
            .finish()
    }
}
