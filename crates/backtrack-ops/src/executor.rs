//! Async front end that runs the engine on a blocking worker.
//!
//! Requests are queued over a channel and executed strictly one at a time in
//! arrival order. Each request carries a oneshot reply. Confirmation prompts
//! travel the other way as [`ConfirmRequest`]s and the worker waits for the
//! answer before touching the filesystem.

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use backtrack_core::EngineConfig;

use crate::OPERATION_CHANNEL_SIZE;
use crate::confirm::Confirm;
use crate::conflict::Conflict;
use crate::engine::{Engine, History};
use crate::operation::{CreateKind, FileOperation};
use crate::outcome::OperationOutcome;

/// The worker has stopped and no longer accepts requests.
#[derive(Debug, Clone, Copy, Error)]
#[error("Operation executor has stopped")]
pub struct ExecutorClosed;

/// A confirmation prompt waiting for the UI's answer.
#[derive(Debug)]
pub struct ConfirmRequest {
    /// What the user is asked about.
    pub conflict: Conflict,
    reply: oneshot::Sender<bool>,
}

impl ConfirmRequest {
    /// Answer the prompt.
    pub fn respond(self, approved: bool) {
        if self.reply.send(approved).is_err() {
            debug!("confirmation answered after the worker gave up");
        }
    }
}

/// [`Confirm`] that forwards prompts over a channel and blocks for the reply.
///
/// Only usable from a blocking thread. A closed channel counts as "no".
#[derive(Debug, Clone)]
pub struct ChannelConfirm {
    tx: mpsc::Sender<ConfirmRequest>,
}

impl ChannelConfirm {
    pub fn new(tx: mpsc::Sender<ConfirmRequest>) -> Self {
        Self { tx }
    }
}

impl Confirm for ChannelConfirm {
    fn confirm(&mut self, conflict: &Conflict) -> bool {
        let (reply, rx) = oneshot::channel();
        let request = ConfirmRequest {
            conflict: conflict.clone(),
            reply,
        };
        if self.tx.blocking_send(request).is_err() {
            warn!("confirmation channel closed; declining");
            return false;
        }
        rx.blocking_recv().unwrap_or(false)
    }
}

enum Request {
    Apply(FileOperation),
    Undo,
    Redo,
}

enum Job {
    Run {
        request: Request,
        reply: oneshot::Sender<OperationOutcome>,
    },
    History {
        reply: oneshot::Sender<History>,
    },
    Clear {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to an engine running on a blocking worker.
#[derive(Debug)]
pub struct OperationExecutor {
    tx: mpsc::Sender<Job>,
    worker: JoinHandle<()>,
}

impl OperationExecutor {
    /// Move `engine` onto a blocking worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(engine: Engine) -> Self {
        let (tx, mut rx) = mpsc::channel::<Job>(OPERATION_CHANNEL_SIZE);

        let worker = tokio::task::spawn_blocking(move || {
            let mut engine = engine;
            while let Some(job) = rx.blocking_recv() {
                match job {
                    Job::Run { request, reply } => {
                        let outcome = match request {
                            Request::Apply(operation) => engine.execute(operation),
                            Request::Undo => engine.undo(),
                            Request::Redo => engine.redo(),
                        };
                        let _ = reply.send(outcome);
                    }
                    Job::History { reply } => {
                        let _ = reply.send(engine.history());
                    }
                    Job::Clear { reply } => {
                        engine.clear();
                        let _ = reply.send(());
                    }
                }
            }
            debug!("operation executor stopped");
        });

        Self { tx, worker }
    }

    /// Spawn an engine whose prompts are delivered on the returned receiver.
    pub fn spawn_interactive(config: EngineConfig) -> (Self, mpsc::Receiver<ConfirmRequest>) {
        let (confirm_tx, confirm_rx) = mpsc::channel(1);
        let engine = Engine::new(config, ChannelConfirm::new(confirm_tx));
        (Self::spawn(engine), confirm_rx)
    }

    /// Apply a file operation.
    pub async fn submit(&self, operation: FileOperation) -> Result<OperationOutcome, ExecutorClosed> {
        self.run(Request::Apply(operation)).await
    }

    pub async fn copy(
        &self,
        source: impl Into<PathBuf>,
        destination_dir: impl Into<PathBuf>,
    ) -> Result<OperationOutcome, ExecutorClosed> {
        self.submit(FileOperation::copy(source, destination_dir)).await
    }

    pub async fn move_to(
        &self,
        source: impl Into<PathBuf>,
        destination_dir: impl Into<PathBuf>,
    ) -> Result<OperationOutcome, ExecutorClosed> {
        self.submit(FileOperation::move_to(source, destination_dir)).await
    }

    pub async fn rename(
        &self,
        source: impl Into<PathBuf>,
        new_name: impl Into<String>,
    ) -> Result<OperationOutcome, ExecutorClosed> {
        self.submit(FileOperation::rename(source, new_name)).await
    }

    pub async fn delete(&self, path: impl Into<PathBuf>) -> Result<OperationOutcome, ExecutorClosed> {
        self.submit(FileOperation::delete(path)).await
    }

    pub async fn create_file(
        &self,
        path: impl Into<PathBuf>,
    ) -> Result<OperationOutcome, ExecutorClosed> {
        self.submit(FileOperation::create_file(path)).await
    }

    pub async fn create_folder(
        &self,
        path: impl Into<PathBuf>,
    ) -> Result<OperationOutcome, ExecutorClosed> {
        self.submit(FileOperation::create_folder(path)).await
    }

    /// Create a "new item" with a free name based on `path`.
    pub async fn create_new(
        &self,
        path: impl Into<PathBuf>,
        kind: CreateKind,
    ) -> Result<OperationOutcome, ExecutorClosed> {
        self.submit(FileOperation::create_new(path, kind)).await
    }

    pub async fn undo(&self) -> Result<OperationOutcome, ExecutorClosed> {
        self.run(Request::Undo).await
    }

    pub async fn redo(&self) -> Result<OperationOutcome, ExecutorClosed> {
        self.run(Request::Redo).await
    }

    /// Snapshot both history stacks.
    pub async fn history(&self) -> Result<History, ExecutorClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(Job::History { reply }).await?;
        rx.await.map_err(|_| ExecutorClosed)
    }

    /// Forget all history.
    pub async fn clear(&self) -> Result<(), ExecutorClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(Job::Clear { reply }).await?;
        rx.await.map_err(|_| ExecutorClosed)
    }

    /// Stop the worker after queued requests finish, waiting for cleanup.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            warn!(error = %e, "operation executor panicked");
        }
    }

    async fn run(&self, request: Request) -> Result<OperationOutcome, ExecutorClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(Job::Run { request, reply }).await?;
        rx.await.map_err(|_| ExecutorClosed)
    }

    async fn send(&self, job: Job) -> Result<(), ExecutorClosed> {
        self.tx.send(job).await.map_err(|_| ExecutorClosed)
    }
}
