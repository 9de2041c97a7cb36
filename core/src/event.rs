//! Lifecycle events.
//!
//! The pipeline raises a fixed set of named events around its stages. Two of
//! them ([`LifecycleEvent::BeforeLoad`] and [`LifecycleEvent::BeforeExecute`])
//! are cancellable: a handler returning [`EventOutcome::Stop`] aborts the rest
//! of that stage. The other four are notifications and their return value is
//! ignored.
//!
//! ```text
//! run(input)
//!   ├─ beforeLoad ──(stop)──► load returns false
//!   ├─ afterLoad
//!   ├─ validate
//!   ├─ beforeExecute ──(stop)──► execute skipped
//!   ├─ execute()
//!   ├─ afterExecute
//!   └─ onSuccess | onErrors
//! ```

use crate::errors::Errors;
use std::fmt;

/// Named hook points of the interaction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Before input is bound (cancellable)
    BeforeLoad,

    /// After input was bound, including nested children
    AfterLoad,

    /// Before business logic runs (cancellable)
    BeforeExecute,

    /// After business logic returned normally
    AfterExecute,

    /// Execution finished and the interaction is successful
    OnSuccess,

    /// Execution finished and the interaction has errors
    OnErrors,
}

impl LifecycleEvent {
    /// Every event, in the order a successful run raises them
    pub const ALL: [Self; 6] = [
        Self::BeforeLoad,
        Self::AfterLoad,
        Self::BeforeExecute,
        Self::AfterExecute,
        Self::OnSuccess,
        Self::OnErrors,
    ];

    /// Whether a handler can stop the stage this event precedes
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::BeforeLoad | Self::BeforeExecute)
    }

    /// Conventional event name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeLoad => "beforeLoad",
            Self::AfterLoad => "afterLoad",
            Self::BeforeExecute => "beforeExecute",
            Self::AfterExecute => "afterExecute",
            Self::OnSuccess => "onSuccess",
            Self::OnErrors => "onErrors",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a handler asks the pipeline to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventOutcome {
    /// Carry on with the stage
    #[default]
    Continue,

    /// Abort the stage (honoured for cancellable events only)
    Stop,
}

impl EventOutcome {
    /// True for [`EventOutcome::Stop`]
    #[must_use]
    pub const fn is_stop(self) -> bool {
        matches!(self, Self::Stop)
    }
}

impl From<()> for EventOutcome {
    fn from((): ()) -> Self {
        Self::Continue
    }
}

/// `false` stops, `true` continues.
impl From<bool> for EventOutcome {
    fn from(proceed: bool) -> Self {
        if proceed { Self::Continue } else { Self::Stop }
    }
}

/// Read-only view handed to lifecycle handlers.
pub struct EventContext<'a, I> {
    event: LifecycleEvent,
    form_name: &'static str,
    interaction: &'a I,
    errors: &'a Errors,
}

impl<'a, I> EventContext<'a, I> {
    /// Build a context for `event`
    #[must_use]
    pub const fn new(
        event: LifecycleEvent,
        form_name: &'static str,
        interaction: &'a I,
        errors: &'a Errors,
    ) -> Self {
        Self {
            event,
            form_name,
            interaction,
            errors,
        }
    }

    /// The event being raised
    #[must_use]
    pub const fn event(&self) -> LifecycleEvent {
        self.event
    }

    /// Form name of the interaction raising the event
    #[must_use]
    pub const fn form_name(&self) -> &'static str {
        self.form_name
    }

    /// The concrete interaction
    #[must_use]
    pub const fn interaction(&self) -> &'a I {
        self.interaction
    }

    /// Errors recorded so far
    #[must_use]
    pub const fn errors(&self) -> &'a Errors {
        self.errors
    }
}

impl<I> fmt::Debug for EventContext<'_, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("event", &self.event)
            .field("form_name", &self.form_name)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellable_events() {
        let cancellable: Vec<_> = LifecycleEvent::ALL
            .into_iter()
            .filter(|e| e.is_cancellable())
            .collect();
        assert_eq!(
            cancellable,
            vec![LifecycleEvent::BeforeLoad, LifecycleEvent::BeforeExecute]
        );
    }

    #[test]
    fn test_event_names() {
        assert_eq!(LifecycleEvent::BeforeLoad.to_string(), "beforeLoad");
        assert_eq!(LifecycleEvent::OnErrors.as_str(), "onErrors");
    }

    #[test]
    fn test_outcome_conversions() {
        assert_eq!(EventOutcome::from(()), EventOutcome::Continue);
        assert_eq!(EventOutcome::from(true), EventOutcome::Continue);
        assert!(EventOutcome::from(false).is_stop());
    }
}
