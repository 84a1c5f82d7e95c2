//! Typed observer lists that announce occupancy and level transitions.

use std::{error::Error, fmt};

use combine_rush_core::CellCoord;

/// Handle identifying a registered subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u32);

impl SubscriberId {
    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Notice describing a change to the play grid's occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridNotice {
    /// A single cell flipped occupancy.
    Changed {
        /// Cell whose occupancy changed.
        cell: CellCoord,
        /// New occupancy state of the cell.
        occupied: bool,
    },
    /// The whole grid was reset to walkable.
    Cleared,
}

/// Notice describing a completed level load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelNotice {
    /// Name of the level that finished loading.
    pub name: String,
}

/// Instruction a handler returns about its own subscription.
///
/// Self-unsubscription is deferred until the publish pass completes, so it
/// never affects delivery to subscribers enumerated after the handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retention {
    /// Keep receiving notices.
    Keep,
    /// Drop this subscription once the current publish pass finishes.
    Unsubscribe,
}

/// Error reported by a failing notification handler.
#[derive(Debug)]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates a new handler error carrying the provided message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for HandlerError {}

/// Outcome of a single publish pass.
#[derive(Debug, Default)]
pub struct PublishOutcome {
    /// Number of handlers that ran without error.
    pub delivered: usize,
    /// Handlers that failed, in delivery order; delivery continued past them.
    pub failures: Vec<(SubscriberId, HandlerError)>,
}

type Handler<T> = Box<dyn FnMut(&T) -> Result<Retention, HandlerError>>;

struct ObserverList<T> {
    entries: Vec<(SubscriberId, Handler<T>)>,
}

impl<T> ObserverList<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn subscribe(&mut self, id: SubscriberId, handler: Handler<T>) {
        self.entries.push((id, handler));
    }

    fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Invokes every handler registered at the start of the pass, in
    /// subscription order. Failures are collected, not propagated, and
    /// cancellations take effect only after the pass.
    fn publish(&mut self, notice: &T) -> PublishOutcome {
        let mut outcome = PublishOutcome::default();
        let mut cancelled: Vec<SubscriberId> = Vec::new();

        for (id, handler) in &mut self.entries {
            match handler(notice) {
                Ok(Retention::Keep) => outcome.delivered += 1,
                Ok(Retention::Unsubscribe) => {
                    outcome.delivered += 1;
                    cancelled.push(*id);
                }
                Err(error) => outcome.failures.push((*id, error)),
            }
        }

        if !cancelled.is_empty() {
            self.entries.retain(|(id, _)| !cancelled.contains(id));
        }
        outcome
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Fan-out channel announcing grid and level transitions to subscribers.
pub(crate) struct ChangeNotifier {
    next_id: u32,
    grid: ObserverList<GridNotice>,
    level: ObserverList<LevelNotice>,
}

impl ChangeNotifier {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            grid: ObserverList::new(),
            level: ObserverList::new(),
        }
    }

    pub(crate) fn subscribe_grid<F>(&mut self, handler: F) -> SubscriberId
    where
        F: FnMut(&GridNotice) -> Result<Retention, HandlerError> + 'static,
    {
        let id = self.allocate_id();
        self.grid.subscribe(id, Box::new(handler));
        id
    }

    pub(crate) fn subscribe_level<F>(&mut self, handler: F) -> SubscriberId
    where
        F: FnMut(&LevelNotice) -> Result<Retention, HandlerError> + 'static,
    {
        let id = self.allocate_id();
        self.level.subscribe(id, Box::new(handler));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.grid.unsubscribe(id) || self.level.unsubscribe(id)
    }

    pub(crate) fn publish_grid(&mut self, notice: &GridNotice) -> PublishOutcome {
        self.grid.publish(notice)
    }

    pub(crate) fn publish_level(&mut self, notice: &LevelNotice) -> PublishOutcome {
        self.level.publish(notice)
    }

    fn allocate_id(&mut self) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("grid_subscribers", &self.grid.len())
            .field("level_subscribers", &self.level.len())
            .finish()
    }
}
