//! Mock collaborators for interaction tests.

use composable_interactions_core::event::{EventContext, EventOutcome, LifecycleEvent};
use composable_interactions_core::event_bus::{Behavior, LifecycleHandler};
use composable_interactions_runtime::{
    IsolationLevel, Transaction, TransactionError, TransactionManager,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Behavior recording every lifecycle event it sees
///
/// Clones share the same log, so keep one clone for assertions and attach
/// the other.
///
/// # Example
///
/// ```ignore
/// let recorder = RecordingHandler::new();
/// instance.attach(recorder.clone());
/// instance.run(input).await?;
/// assert_eq!(recorder.events(), vec![LifecycleEvent::BeforeLoad, /* ... */]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    seen: Arc<Mutex<Vec<LifecycleEvent>>>,
    stop_on: Option<LifecycleEvent>,
}

impl RecordingHandler {
    /// Recorder that never stops a stage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder that answers `Stop` to `event`
    #[must_use]
    pub fn stopping_on(event: LifecycleEvent) -> Self {
        Self {
            seen: Arc::default(),
            stop_on: Some(event),
        }
    }

    /// Events recorded so far, in order
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        lock(&self.seen).clone()
    }

    /// How many times `event` was seen
    #[must_use]
    pub fn count(&self, event: LifecycleEvent) -> usize {
        lock(&self.seen).iter().filter(|seen| **seen == event).count()
    }

    /// Forget recorded events
    pub fn clear(&self) {
        lock(&self.seen).clear();
    }
}

impl<I> LifecycleHandler<I> for RecordingHandler {
    fn handle(&mut self, ctx: &EventContext<'_, I>) -> EventOutcome {
        lock(&self.seen).push(ctx.event());
        if self.stop_on == Some(ctx.event()) {
            EventOutcome::Stop
        } else {
            EventOutcome::Continue
        }
    }
}

impl<I> Behavior<I> for RecordingHandler {
    fn events(&self) -> &[LifecycleEvent] {
        &LifecycleEvent::ALL
    }
}

/// One call observed by [`InMemoryTransactionManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionCall {
    /// A transaction was opened
    Begin(Option<IsolationLevel>),
    /// A transaction was committed
    Commit,
    /// A transaction was rolled back
    Rollback,
}

/// In-memory transaction manager recording every call
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransactionManager {
    calls: Arc<Mutex<Vec<TransactionCall>>>,
    fail_begin: bool,
}

impl InMemoryTransactionManager {
    /// Manager whose transactions always succeed
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager that refuses to open transactions
    #[must_use]
    pub fn failing() -> Self {
        Self {
            calls: Arc::default(),
            fail_begin: true,
        }
    }

    /// Calls observed so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<TransactionCall> {
        lock(&self.calls).clone()
    }

    /// Number of committed transactions
    #[must_use]
    pub fn commits(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| **call == TransactionCall::Commit)
            .count()
    }

    /// Number of rolled back transactions
    #[must_use]
    pub fn rollbacks(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| **call == TransactionCall::Rollback)
            .count()
    }
}

struct InMemoryTransaction {
    calls: Arc<Mutex<Vec<TransactionCall>>>,
}

impl Transaction for InMemoryTransaction {
    fn commit(self: Box<Self>) -> Result<(), TransactionError> {
        lock(&self.calls).push(TransactionCall::Commit);
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), TransactionError> {
        lock(&self.calls).push(TransactionCall::Rollback);
        Ok(())
    }
}

impl TransactionManager for InMemoryTransactionManager {
    fn begin(
        &self,
        isolation: Option<IsolationLevel>,
    ) -> Result<Box<dyn Transaction>, TransactionError> {
        if self.fail_begin {
            return Err(TransactionError::Begin("in-memory manager set to fail".to_string()));
        }
        lock(&self.calls).push(TransactionCall::Begin(isolation));
        Ok(Box::new(InMemoryTransaction {
            calls: Arc::clone(&self.calls),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composable_interactions_core::Errors;

    #[test]
    fn test_recorder_shares_log_between_clones() {
        let recorder = RecordingHandler::new();
        let mut attached = recorder.clone();
        let errors = Errors::new();

        for event in [LifecycleEvent::BeforeLoad, LifecycleEvent::AfterLoad] {
            let ctx = EventContext::new(event, "Probe", &(), &errors);
            let outcome = LifecycleHandler::<()>::handle(&mut attached, &ctx);
            assert_eq!(outcome, EventOutcome::Continue);
        }

        assert_eq!(
            recorder.events(),
            vec![LifecycleEvent::BeforeLoad, LifecycleEvent::AfterLoad]
        );
        assert_eq!(recorder.count(LifecycleEvent::AfterLoad), 1);
        recorder.clear();
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_recorder_stops_on_configured_event() {
        let mut recorder = RecordingHandler::stopping_on(LifecycleEvent::BeforeExecute);
        let errors = Errors::new();
        let ctx = EventContext::new(LifecycleEvent::BeforeExecute, "Probe", &(), &errors);

        assert_eq!(
            LifecycleHandler::<()>::handle(&mut recorder, &ctx),
            EventOutcome::Stop
        );
    }

    #[test]
    fn test_manager_records_calls() -> Result<(), TransactionError> {
        let manager = InMemoryTransactionManager::new();
        manager.begin(Some(IsolationLevel::ReadCommitted))?.commit()?;
        manager.begin(None)?.rollback()?;

        assert_eq!(
            manager.calls(),
            vec![
                TransactionCall::Begin(Some(IsolationLevel::ReadCommitted)),
                TransactionCall::Commit,
                TransactionCall::Begin(None),
                TransactionCall::Rollback,
            ]
        );
        assert_eq!(manager.commits(), 1);
        assert_eq!(manager.rollbacks(), 1);
        Ok(())
    }

    #[test]
    fn test_failing_manager() {
        let manager = InMemoryTransactionManager::failing();
        assert!(manager.begin(None).is_err());
        assert!(manager.calls().is_empty());
    }
}
