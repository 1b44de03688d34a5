//! Change events published by the SplitSage stores and the bus that carries them.

use futures::{stream, Stream};
use serde::{Deserialize, Serialize};
use splitsage_core::{ChangeKind, Expense, GroupId, UserId};
use tokio::sync::broadcast;

pub use broadcast::error::{RecvError, TryRecvError};

/// An expense was added, edited or deleted.
///
/// For `Updated`, `previous` carries the value that was replaced. For
/// `Removed`, `expense` is the deleted value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExpenseChange {
    pub kind: ChangeKind,
    pub expense: Expense,
    pub previous: Option<Expense>,
}

/// A user joined or left a group.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MembershipChange {
    pub kind: ChangeKind,
    pub group: GroupId,
    pub user: UserId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Event {
    Expense(ExpenseChange),
    Membership(MembershipChange),
}

impl Event {
    pub fn label(&self) -> &'static str {
        match self {
            Event::Expense(_) => "expense",
            Event::Membership(_) => "membership",
        }
    }
}

/// Which events a stream yields.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EventFilter {
    #[default]
    All,
    Expenses,
    Memberships,
}

impl EventFilter {
    fn accepts(self, event: &Event) -> bool {
        matches!(
            (self, event),
            (EventFilter::All, _)
                | (EventFilter::Expenses, Event::Expense(_))
                | (EventFilter::Memberships, Event::Membership(_))
        )
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> EventStream {
        self.subscribe_filtered(EventFilter::All)
    }

    pub fn subscribe_filtered(&self, filter: EventFilter) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    /// Publish an event, returning how many subscribers will see it.
    pub fn publish(&self, event: Event) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

pub struct EventStream {
    receiver: broadcast::Receiver<Event>,
    filter: EventFilter,
}

impl EventStream {
    pub async fn recv(&mut self) -> Result<Event, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.filter.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Take the next queued event without waiting.
    pub fn try_recv(&mut self) -> Result<Event, TryRecvError> {
        loop {
            let event = self.receiver.try_recv()?;
            if self.filter.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Convert this subscription into a [`futures::Stream`] that ends when the bus is dropped.
    pub fn into_stream(self) -> impl Stream<Item = Result<Event, RecvError>> {
        stream::unfold(self, |mut state| async move {
            match state.recv().await {
                Ok(event) => Some((Ok(event), state)),
                Err(RecvError::Closed) => None,
                Err(err) => Some((Err(err), state)),
            }
        })
    }
}
