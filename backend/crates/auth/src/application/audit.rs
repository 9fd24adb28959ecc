//! Audit queue
//!
//! Token "used" marks are written off the request path. Producers push jobs
//! onto a bounded channel; one background worker applies them to the store.
//! A full queue drops the job. Failures are logged and never retried.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::domain::repository::AuthStore;
use crate::domain::value_object::token_hash::TokenHash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditJob {
    MarkTokenUsed {
        token_hash: TokenHash,
        at: DateTime<Utc>,
    },
}

/// Producer handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AuditQueue {
    tx: mpsc::Sender<AuditJob>,
}

impl AuditQueue {
    /// Never blocks. The job is dropped if the queue is full or closed.
    pub fn enqueue(&self, job: AuditJob) {
        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(?job, "Audit queue full, dropping job");
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::debug!(?job, "Audit queue closed, dropping job");
            }
        }
    }

    pub fn mark_token_used(&self, token_hash: TokenHash) {
        self.enqueue(AuditJob::MarkTokenUsed {
            token_hash,
            at: Utc::now(),
        });
    }

    /// A queue with no worker; every job is dropped. For callers that do not
    /// want audit marks at all.
    pub fn disabled() -> Self {
        let (tx, _) = mpsc::channel(1);
        Self { tx }
    }
}

/// Owns the background task
pub struct AuditWorker {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<u64>,
}

impl AuditWorker {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn<S: AuthStore>(store: Arc<S>, capacity: usize) -> (AuditQueue, AuditWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run(store, rx, shutdown_rx));

        (
            AuditQueue { tx },
            AuditWorker {
                shutdown: shutdown_tx,
                handle,
            },
        )
    }

    /// Stop accepting jobs, apply the ones already queued, and wait for the
    /// worker to exit. Returns the number of jobs applied over the worker's
    /// lifetime.
    pub async fn shutdown(self) -> u64 {
        // Err only if the worker already exited
        let _ = self.shutdown.send(());
        match self.handle.await {
            Ok(processed) => processed,
            Err(e) => {
                tracing::error!(error = %e, "Audit worker panicked");
                0
            }
        }
    }
}

async fn run<S: AuthStore>(
    store: Arc<S>,
    mut rx: mpsc::Receiver<AuditJob>,
    mut shutdown: oneshot::Receiver<()>,
) -> u64 {
    let mut processed = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            job = rx.recv() => match job {
                Some(job) => {
                    apply(store.as_ref(), job).await;
                    processed += 1;
                }
                // every producer dropped
                None => return processed,
            },
        }
    }

    rx.close();
    while let Some(job) = rx.recv().await {
        apply(store.as_ref(), job).await;
        processed += 1;
    }

    tracing::info!(processed, "Audit worker drained");
    processed
}

async fn apply<S: AuthStore>(store: &S, job: AuditJob) {
    match job {
        AuditJob::MarkTokenUsed { token_hash, at } => {
            if let Err(e) = store.mark_token_used(&token_hash, at).await {
                tracing::warn!(
                    token_hash = %token_hash,
                    error = %e,
                    "Failed to mark token used"
                );
            }
        }
    }
}
