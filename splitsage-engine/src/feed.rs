use std::sync::Arc;

use splitsage_events::{Event, EventStream, RecvError, TryRecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::BalanceEngine;

/// Cloneable one-shot stop flag shared between the feed task and its owner.
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    pub async fn wait(&self) {
        let mut receiver = self.receiver.clone();
        while !*receiver.borrow_and_update() {
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Owner handle of a running change feed.
pub struct FeedHandle {
    shutdown: ShutdownSignal,
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the feed and wait for the task to exit.
    pub async fn stop(self) {
        self.shutdown.trigger();
        if let Err(err) = self.task.await {
            warn!(error = %err, "balance change feed task failed");
        }
    }
}

pub(crate) fn spawn(
    engine: Arc<BalanceEngine>,
    expenses: EventStream,
    memberships: EventStream,
) -> FeedHandle {
    let shutdown = ShutdownSignal::new();
    let task = tokio::spawn(run(engine, expenses, memberships, shutdown.clone()));
    FeedHandle { shutdown, task }
}

struct Source {
    name: &'static str,
    stream: EventStream,
    open: bool,
}

impl Source {
    fn new(name: &'static str, stream: EventStream) -> Self {
        Self {
            name,
            stream,
            open: true,
        }
    }

    /// Handle one received item. Returns true if events were lost.
    fn accept(&mut self, received: Result<Event, RecvError>, batch: &mut Vec<Event>) -> bool {
        match received {
            Ok(event) => {
                batch.push(event);
                false
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(source = self.name, skipped, "change feed lagged behind the bus");
                true
            }
            Err(RecvError::Closed) => {
                info!(source = self.name, "change source closed");
                self.open = false;
                false
            }
        }
    }

    /// Move every already queued event into the batch. Returns true if events were lost.
    fn drain(&mut self, batch: &mut Vec<Event>) -> bool {
        let mut lagged = false;
        while self.open {
            match self.stream.try_recv() {
                Ok(event) => batch.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(source = self.name, skipped, "change feed lagged behind the bus");
                    lagged = true;
                }
                Err(TryRecvError::Closed) => {
                    info!(source = self.name, "change source closed");
                    self.open = false;
                }
            }
        }
        lagged
    }
}

async fn run(
    engine: Arc<BalanceEngine>,
    expenses: EventStream,
    memberships: EventStream,
    shutdown: ShutdownSignal,
) {
    let mut expenses = Source::new("expenses", expenses);
    let mut memberships = Source::new("memberships", memberships);
    info!(version = engine.version(), "balance change feed started");

    while expenses.open || memberships.open {
        let mut batch = Vec::new();
        let mut lagged = tokio::select! {
            _ = shutdown.wait() => break,
            received = expenses.stream.recv(), if expenses.open => {
                expenses.accept(received, &mut batch)
            }
            received = memberships.stream.recv(), if memberships.open => {
                memberships.accept(received, &mut batch)
            }
        };
        lagged |= expenses.drain(&mut batch);
        lagged |= memberships.drain(&mut batch);

        if lagged {
            engine.rebuild();
        } else if !batch.is_empty() {
            engine.apply_batch(batch);
        }
    }

    info!(version = engine.version(), "balance change feed stopped");
}
