//! Turn dispatch: a bounded event queue feeding per-user ordered turns.

use std::collections::HashMap;
use std::sync::Arc;

use messenger::InboundEvent;
use report_flow::OutboundMessage;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::OrchestratorError;
use crate::media::MediaStore;
use crate::orchestrator::Orchestrator;
use crate::sender::MessageSender;
use crate::store::Store;

/// Default capacity of the turn queue.
pub const DEFAULT_QUEUE_SIZE: usize = 256;

/// Producer side of the turn queue.
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    tx: mpsc::Sender<InboundEvent>,
}

impl DispatchHandle {
    /// Enqueue an event without waiting. Fails when the queue is full or the
    /// dispatcher has stopped.
    pub fn enqueue(&self, event: InboundEvent) -> Result<(), OrchestratorError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(event) => {
                OrchestratorError::Dispatch(format!("queue full, dropped {}", event.log_id()))
            }
            mpsc::error::TrySendError::Closed(event) => OrchestratorError::Dispatch(format!(
                "dispatcher stopped, dropped {}",
                event.log_id()
            )),
        })
    }
}

/// Create a bounded turn queue.
pub fn channel(size: usize) -> (DispatchHandle, mpsc::Receiver<InboundEvent>) {
    let (tx, rx) = mpsc::channel(size.max(1));
    (DispatchHandle { tx }, rx)
}

type UserQueues = HashMap<String, mpsc::UnboundedSender<InboundEvent>>;

/// Routes queued events to per-user queues.
///
/// Each user with pending events has one task draining that user's queue in
/// arrival order, so turns of the same user never overlap or reorder. Turns
/// of different users run in parallel. A user's task exits once the queue
/// is empty.
pub struct Dispatcher<S, D, M> {
    orchestrator: Arc<Orchestrator<S, D, M>>,
    queues: Arc<Mutex<UserQueues>>,
}

impl<S, D, M> Clone for Dispatcher<S, D, M> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            queues: Arc::clone(&self.queues),
        }
    }
}

impl<S, D, M> Dispatcher<S, D, M>
where
    S: MessageSender + 'static,
    D: Store + 'static,
    M: MediaStore + 'static,
{
    pub fn new(orchestrator: Arc<Orchestrator<S, D, M>>) -> Self {
        Self {
            orchestrator,
            queues: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator<S, D, M> {
        &self.orchestrator
    }

    /// Consume the queue until every [`DispatchHandle`] is dropped.
    ///
    /// Turns still running on user tasks may finish after this returns.
    pub async fn run(self, mut rx: mpsc::Receiver<InboundEvent>) {
        info!("Dispatcher started");
        while let Some(event) = rx.recv().await {
            self.route(event).await;
        }
        info!("Dispatcher stopped");
    }

    /// Run [`Dispatcher::run`] on a background task.
    pub fn spawn(self, rx: mpsc::Receiver<InboundEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }

    /// Number of users with a draining task.
    pub async fn active_users(&self) -> usize {
        self.queues.lock().await.len()
    }

    /// Append an event to its user's queue, starting a drain task when the
    /// user has none.
    async fn route(&self, event: InboundEvent) {
        let mut queues = self.queues.lock().await;
        let user_id = event.sender_id.clone();

        let event = match queues.get(&user_id) {
            Some(tx) => match tx.send(event) {
                Ok(()) => return,
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        if tx.send(event).is_err() {
            return;
        }
        queues.insert(user_id.clone(), tx);
        debug!(user_id = %user_id, "Started turn queue");
        tokio::spawn(self.clone().drain(user_id, rx));
    }

    /// Process a user's events one at a time until the queue is empty.
    async fn drain(self, user_id: String, mut rx: mpsc::UnboundedReceiver<InboundEvent>) {
        loop {
            let event = match rx.try_recv() {
                Ok(event) => event,
                Err(_) => {
                    // Events are only routed under this lock, so an empty
                    // queue seen here stays empty.
                    let mut queues = self.queues.lock().await;
                    match rx.try_recv() {
                        Ok(event) => event,
                        Err(_) => {
                            queues.remove(&user_id);
                            debug!(user_id = %user_id, "Turn queue drained");
                            return;
                        }
                    }
                }
            };
            let outcome = self.orchestrator.process(event).await;
            self.log_outcome(outcome);
        }
    }

    fn log_outcome(&self, outcome: Result<OutboundMessage, OrchestratorError>) {
        match outcome {
            Ok(_) => {}
            Err(OrchestratorError::Skipped(reason)) => warn!("Turn skipped: {}", reason),
            Err(e) => error!("Turn failed: {}", e),
        }
    }
}
