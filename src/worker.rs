//! A single-worker queue in front of an [`Engine`].
//!
//! Interactive callers can dispatch long-running operations without
//! blocking their own loop. Every request goes through one blocking task
//! that owns the engine, so operations on the backup-storage directory never
//! overlap.

use crate::engine::{CreateOutcome, Engine, PruneReport, RestoreReport};
use crate::error::{BackupError, Result};
use crate::version_log::BackupRecord;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Pending requests allowed before `send` waits.
const QUEUE_DEPTH: usize = 16;

enum Request {
    Create {
        comment: String,
        reply: oneshot::Sender<Result<CreateOutcome>>,
    },
    List {
        reply: oneshot::Sender<Result<Vec<BackupRecord>>>,
    },
    Restore {
        id: String,
        reply: oneshot::Sender<Result<RestoreReport>>,
    },
    Delete {
        id: String,
        reply: oneshot::Sender<Result<BackupRecord>>,
    },
    Prune {
        reply: oneshot::Sender<Result<PruneReport>>,
    },
}

impl Request {
    // A dropped receiver means the caller stopped waiting; the result is discarded.
    fn run(self, engine: &mut Engine) {
        match self {
            Request::Create { comment, reply } => {
                let _ = reply.send(engine.create(&comment));
            }
            Request::List { reply } => {
                let _ = reply.send(engine.list());
            }
            Request::Restore { id, reply } => {
                let _ = reply.send(engine.restore(&id));
            }
            Request::Delete { id, reply } => {
                let _ = reply.send(engine.delete(&id));
            }
            Request::Prune { reply } => {
                let _ = reply.send(engine.prune());
            }
        }
    }
}

/// Owner of the background task.
pub struct EngineWorker;

impl EngineWorker {
    /// Moves `engine` onto a blocking task and returns a handle for queuing
    /// requests plus the task itself, which yields the engine back once every
    /// handle is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(engine: Engine) -> (WorkerHandle, JoinHandle<Engine>) {
        let (tx, mut rx) = mpsc::channel::<Request>(QUEUE_DEPTH);
        let task = tokio::task::spawn_blocking(move || {
            let mut engine = engine;
            while let Some(request) = rx.blocking_recv() {
                request.run(&mut engine);
            }
            debug!("backup worker stopped");
            engine
        });
        (WorkerHandle { tx }, task)
    }
}

/// Cloneable handle that queues requests for the worker.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Request>,
}

impl WorkerHandle {
    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> Request,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| BackupError::WorkerStopped)?;
        rx.await.map_err(|_| BackupError::WorkerStopped)?
    }

    pub async fn create(&self, comment: impl Into<String>) -> Result<CreateOutcome> {
        let comment = comment.into();
        self.call(|reply| Request::Create { comment, reply }).await
    }

    pub async fn list(&self) -> Result<Vec<BackupRecord>> {
        self.call(|reply| Request::List { reply }).await
    }

    pub async fn restore(&self, id: impl Into<String>) -> Result<RestoreReport> {
        let id = id.into();
        self.call(|reply| Request::Restore { id, reply }).await
    }

    pub async fn delete(&self, id: impl Into<String>) -> Result<BackupRecord> {
        let id = id.into();
        self.call(|reply| Request::Delete { id, reply }).await
    }

    pub async fn prune(&self) -> Result<PruneReport> {
        self.call(|reply| Request::Prune { reply }).await
    }
}
