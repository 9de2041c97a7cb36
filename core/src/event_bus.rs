//! Per-instance lifecycle event bus.
//!
//! Handlers subscribe to [`LifecycleEvent`]s on a [`LifecycleEventBus`]. A
//! bus belongs to one interaction instance; type-level subscriptions are
//! installed on every new instance by `Interaction::behaviors`, which is how
//! cross-cutting behaviors (transaction wrapping, auditing) attach without the
//! pipeline knowing about them.
//!
//! # Dispatch rules
//!
//! - Handlers run in subscription order.
//! - For cancellable events the first [`EventOutcome::Stop`] ends dispatch and
//!   is returned to the pipeline; later handlers are not invoked.
//! - For notification events every handler runs and outcomes are ignored.
//!
//! # Example
//!
//! ```
//! use composable_interactions_core::errors::Errors;
//! use composable_interactions_core::event::{EventContext, EventOutcome, LifecycleEvent};
//! use composable_interactions_core::event_bus::LifecycleEventBus;
//!
//! struct Ping;
//!
//! let mut bus = LifecycleEventBus::<Ping>::new();
//! bus.subscribe(LifecycleEvent::BeforeExecute, |_: &EventContext<'_, Ping>| false);
//!
//! let errors = Errors::new();
//! let ctx = EventContext::new(LifecycleEvent::BeforeExecute, "Ping", &Ping, &errors);
//! assert_eq!(bus.trigger(&ctx), EventOutcome::Stop);
//! ```

use crate::event::{EventContext, EventOutcome, LifecycleEvent};
use smallvec::SmallVec;
use std::fmt;

/// Something that reacts to lifecycle events of interaction type `I`.
///
/// Closures `FnMut(&EventContext<'_, I>) -> R` implement this trait for any
/// `R: Into<EventOutcome>`, so `()` (continue) and `bool` (`false` stops) are
/// both accepted return types.
pub trait LifecycleHandler<I>: Send {
    /// React to the event described by `ctx`
    fn handle(&mut self, ctx: &EventContext<'_, I>) -> EventOutcome;
}

impl<I, F, R> LifecycleHandler<I> for F
where
    F: FnMut(&EventContext<'_, I>) -> R + Send,
    R: Into<EventOutcome>,
{
    fn handle(&mut self, ctx: &EventContext<'_, I>) -> EventOutcome {
        self(ctx).into()
    }
}

/// A handler that declares which events it listens to.
///
/// Attaching a behavior subscribes its single handler to every listed event,
/// so state can flow between events (e.g. a transaction opened on
/// `beforeExecute` and closed on `onSuccess`).
pub trait Behavior<I>: LifecycleHandler<I> {
    /// Events this behavior subscribes to
    fn events(&self) -> &[LifecycleEvent];
}

struct Subscription<I> {
    events: SmallVec<[LifecycleEvent; 6]>,
    handler: Box<dyn LifecycleHandler<I>>,
}

/// Registry of handlers for one interaction instance.
pub struct LifecycleEventBus<I> {
    subscriptions: Vec<Subscription<I>>,
}

impl<I> LifecycleEventBus<I> {
    /// Create an empty bus
    #[must_use]
    pub const fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Subscribe `handler` to a single event
    pub fn subscribe<H>(&mut self, event: LifecycleEvent, handler: H) -> &mut Self
    where
        H: LifecycleHandler<I> + 'static,
    {
        let mut events = SmallVec::new();
        events.push(event);
        self.subscriptions.push(Subscription {
            events,
            handler: Box::new(handler),
        });
        self
    }

    /// Attach a behavior to every event it lists
    pub fn attach<B>(&mut self, behavior: B) -> &mut Self
    where
        B: Behavior<I> + 'static,
    {
        let events = behavior.events().iter().copied().collect();
        self.subscriptions.push(Subscription {
            events,
            handler: Box::new(behavior),
        });
        self
    }

    /// Raise `ctx.event()` on every subscribed handler
    ///
    /// Returns [`EventOutcome::Stop`] only for a cancellable event that a
    /// handler stopped.
    pub fn trigger(&mut self, ctx: &EventContext<'_, I>) -> EventOutcome {
        let event = ctx.event();
        tracing::trace!(event = %event, form = ctx.form_name(), "Raising lifecycle event");

        for subscription in self
            .subscriptions
            .iter_mut()
            .filter(|s| s.events.contains(&event))
        {
            let outcome = subscription.handler.handle(ctx);
            if event.is_cancellable() && outcome.is_stop() {
                tracing::debug!(event = %event, form = ctx.form_name(), "Handler stopped the stage");
                return EventOutcome::Stop;
            }
        }

        EventOutcome::Continue
    }

    /// Number of handlers listening to `event`
    #[must_use]
    pub fn handler_count(&self, event: LifecycleEvent) -> usize {
        self.subscriptions
            .iter()
            .filter(|s| s.events.contains(&event))
            .count()
    }

    /// True when nothing is subscribed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl<I> Default for LifecycleEventBus<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> fmt::Debug for LifecycleEventBus<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleEventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
