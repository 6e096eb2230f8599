//! Fetch actor: runs store queries off the owner task

use std::sync::Arc;
use tokio::sync::mpsc;

use super::ListParameters;
use crate::constants::{FETCH_COMMAND_CAPACITY, FETCH_EVENT_CAPACITY};
use crate::error::StoreError;
use crate::store::{FetchOutcome, RecordStore};

/// Commands that can be sent to the fetch actor
#[derive(Debug)]
pub enum FetchCommand {
    /// Run the query described by a frozen parameter set
    Fetch { params: Box<ListParameters> },
    /// Shutdown the actor
    Shutdown,
}

/// Events emitted by the fetch actor
#[derive(Debug)]
pub enum FetchEvent {
    /// Query completed; `params` are the ones it was issued with
    Loaded {
        params: Box<ListParameters>,
        outcome: FetchOutcome,
    },
    /// Query failed at the store boundary
    Failed {
        params: Box<ListParameters>,
        error: StoreError,
    },
}

impl FetchEvent {
    pub fn params(&self) -> &ListParameters {
        match self {
            Self::Loaded { params, .. } | Self::Failed { params, .. } => params,
        }
    }
}

/// Handle for communicating with the fetch actor
pub struct FetchActorHandle {
    pub cmd_tx: mpsc::Sender<FetchCommand>,
    pub event_rx: mpsc::Receiver<FetchEvent>,
}

/// Spawn the fetch actor task
pub fn spawn_fetch_actor<S: RecordStore>(store: Arc<S>) -> FetchActorHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(FETCH_COMMAND_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(FETCH_EVENT_CAPACITY);

    tokio::spawn(fetch_actor_loop(store, cmd_rx, event_tx));

    FetchActorHandle { cmd_tx, event_rx }
}

async fn fetch_actor_loop<S: RecordStore>(
    store: Arc<S>,
    mut cmd_rx: mpsc::Receiver<FetchCommand>,
    event_tx: mpsc::Sender<FetchEvent>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            FetchCommand::Fetch { params } => {
                let request = params.fetch_request();
                tracing::debug!(
                    "Fetch actor: generation {} {:?} {:?}",
                    params.generation,
                    request.category,
                    request.bound
                );

                let event = match store.query(&request).await {
                    Ok(outcome) => FetchEvent::Loaded { params, outcome },
                    Err(error) => FetchEvent::Failed { params, error },
                };
                if event_tx.send(event).await.is_err() {
                    tracing::warn!("Fetch actor: event receiver dropped");
                    break;
                }
            }

            FetchCommand::Shutdown => {
                tracing::debug!("Fetch actor: shutdown");
                break;
            }
        }
    }
}
