//! Transaction wrapping behavior.
//!
//! [`TransactionWrap`] opens a unit of work on `beforeExecute`, commits it on
//! `onSuccess`, and rolls it back on `onErrors`. Nested children executed by
//! the parent's business logic run inside the same scope; savepoints are the
//! manager's concern.
//!
//! # Example
//!
//! ```ignore
//! impl Interaction for PlaceOrder {
//!     fn behaviors(bus: &mut LifecycleEventBus<Self>) {
//!         bus.attach(
//!             TransactionWrap::new(database.clone())
//!                 .with_isolation(IsolationLevel::Serializable),
//!         );
//!     }
//!     // ...
//! }
//! ```

use composable_interactions_core::event::{EventContext, EventOutcome, LifecycleEvent};
use composable_interactions_core::event_bus::{Behavior, LifecycleHandler};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// SQL-style isolation levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    /// Dirty reads allowed
    ReadUncommitted,
    /// Only committed data is read
    ReadCommitted,
    /// Rows read stay stable for the transaction
    RepeatableRead,
    /// Full serializability
    Serializable,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        })
    }
}

/// Errors from a transaction collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// The transaction could not be opened
    #[error("Failed to begin transaction: {0}")]
    Begin(String),

    /// Commit failed
    #[error("Failed to commit transaction: {0}")]
    Commit(String),

    /// Rollback failed
    #[error("Failed to roll back transaction: {0}")]
    Rollback(String),
}

/// An open unit of work.
pub trait Transaction: Send {
    /// Make the work durable
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::Commit`] if the backend rejects the commit.
    fn commit(self: Box<Self>) -> Result<(), TransactionError>;

    /// Discard the work
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::Rollback`] if the backend fails to roll back.
    fn rollback(self: Box<Self>) -> Result<(), TransactionError>;
}

/// Opens transactions.
pub trait TransactionManager: Send + Sync {
    /// Begin a transaction, optionally at a specific isolation level
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::Begin`] if no transaction can be opened.
    fn begin(&self, isolation: Option<IsolationLevel>)
    -> Result<Box<dyn Transaction>, TransactionError>;
}

const EVENTS: [LifecycleEvent; 3] = [
    LifecycleEvent::BeforeExecute,
    LifecycleEvent::OnSuccess,
    LifecycleEvent::OnErrors,
];

/// Behavior wrapping staged execution in a transaction.
pub struct TransactionWrap {
    manager: Arc<dyn TransactionManager>,
    isolation: Option<IsolationLevel>,
    active: Option<Box<dyn Transaction>>,
}

impl TransactionWrap {
    /// Wrap execution in transactions opened by `manager`
    #[must_use]
    pub fn new(manager: Arc<dyn TransactionManager>) -> Self {
        Self {
            manager,
            isolation: None,
            active: None,
        }
    }

    /// Open transactions at `level`
    #[must_use]
    pub fn with_isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    /// Whether a transaction is currently open
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn begin(&mut self, form: &'static str) -> EventOutcome {
        if self.active.is_some() {
            tracing::warn!(form, "Transaction already open, reusing it");
            return EventOutcome::Continue;
        }

        match self.manager.begin(self.isolation) {
            Ok(transaction) => {
                tracing::debug!(form, isolation = ?self.isolation, "Transaction opened");
                self.active = Some(transaction);
                EventOutcome::Continue
            },
            Err(error) => {
                tracing::error!(form, %error, "Transaction could not be opened, skipping execution");
                EventOutcome::Stop
            },
        }
    }

    fn finish(&mut self, form: &'static str, commit: bool) {
        let Some(transaction) = self.active.take() else {
            tracing::warn!(form, "No open transaction to finish");
            return;
        };

        let outcome = if commit {
            transaction.commit()
        } else {
            transaction.rollback()
        };

        match outcome {
            Ok(()) => tracing::debug!(form, commit, "Transaction finished"),
            Err(error) => tracing::error!(form, %error, "Transaction did not finish cleanly"),
        }
    }
}

impl<I> LifecycleHandler<I> for TransactionWrap {
    fn handle(&mut self, ctx: &EventContext<'_, I>) -> EventOutcome {
        match ctx.event() {
            LifecycleEvent::BeforeExecute => self.begin(ctx.form_name()),
            LifecycleEvent::OnSuccess => {
                self.finish(ctx.form_name(), true);
                EventOutcome::Continue
            },
            LifecycleEvent::OnErrors => {
                self.finish(ctx.form_name(), false);
                EventOutcome::Continue
            },
            _ => EventOutcome::Continue,
        }
    }
}

impl<I> Behavior<I> for TransactionWrap {
    fn events(&self) -> &[LifecycleEvent] {
        &EVENTS
    }
}

impl Drop for TransactionWrap {
    fn drop(&mut self) {
        if let Some(transaction) = self.active.take() {
            tracing::warn!("Transaction left open, rolling back");
            if let Err(error) = transaction.rollback() {
                tracing::error!(%error, "Rollback of abandoned transaction failed");
            }
        }
    }
}

impl fmt::Debug for TransactionWrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionWrap")
            .field("isolation", &self.isolation)
            .field("active", &self.active.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composable_interactions_core::Errors;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Journal(Mutex<Vec<String>>);

    impl Journal {
        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable in tests
        fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable in tests
        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct Recorded(Arc<Journal>);

    impl Transaction for Recorded {
        fn commit(self: Box<Self>) -> Result<(), TransactionError> {
            self.0.push("commit".to_string());
            Ok(())
        }

        fn rollback(self: Box<Self>) -> Result<(), TransactionError> {
            self.0.push("rollback".to_string());
            Ok(())
        }
    }

    struct Manager {
        journal: Arc<Journal>,
        fail: bool,
    }

    impl TransactionManager for Manager {
        fn begin(
            &self,
            isolation: Option<IsolationLevel>,
        ) -> Result<Box<dyn Transaction>, TransactionError> {
            if self.fail {
                return Err(TransactionError::Begin("pool exhausted".to_string()));
            }
            self.journal
                .push(format!("begin {}", isolation.map_or_else(String::new, |l| l.to_string())));
            Ok(Box::new(Recorded(Arc::clone(&self.journal))))
        }
    }

    fn fire(wrap: &mut TransactionWrap, event: LifecycleEvent) -> EventOutcome {
        let errors = Errors::new();
        let ctx = EventContext::new(event, "Checkout", &(), &errors);
        LifecycleHandler::<()>::handle(wrap, &ctx)
    }

    #[test]
    fn test_commit_on_success() {
        let journal = Arc::new(Journal::default());
        let mut wrap = TransactionWrap::new(Arc::new(Manager {
            journal: Arc::clone(&journal),
            fail: false,
        }))
        .with_isolation(IsolationLevel::Serializable);

        assert_eq!(fire(&mut wrap, LifecycleEvent::BeforeExecute), EventOutcome::Continue);
        assert!(wrap.is_active());
        fire(&mut wrap, LifecycleEvent::OnSuccess);

        assert!(!wrap.is_active());
        assert_eq!(journal.entries(), vec!["begin SERIALIZABLE", "commit"]);
    }

    #[test]
    fn test_rollback_on_errors() {
        let journal = Arc::new(Journal::default());
        let mut wrap = TransactionWrap::new(Arc::new(Manager {
            journal: Arc::clone(&journal),
            fail: false,
        }));

        fire(&mut wrap, LifecycleEvent::BeforeExecute);
        fire(&mut wrap, LifecycleEvent::OnErrors);

        assert_eq!(journal.entries(), vec!["begin ", "rollback"]);
    }

    #[test]
    fn test_failed_begin_stops_execution() {
        let mut wrap = TransactionWrap::new(Arc::new(Manager {
            journal: Arc::new(Journal::default()),
            fail: true,
        }));

        assert_eq!(fire(&mut wrap, LifecycleEvent::BeforeExecute), EventOutcome::Stop);
        assert!(!wrap.is_active());
    }

    #[test]
    fn test_drop_rolls_back_open_transaction() {
        let journal = Arc::new(Journal::default());
        let mut wrap = TransactionWrap::new(Arc::new(Manager {
            journal: Arc::clone(&journal),
            fail: false,
        }));
        fire(&mut wrap, LifecycleEvent::BeforeExecute);
        drop(wrap);

        assert_eq!(journal.entries(), vec!["begin ", "rollback"]);
    }

    #[test]
    fn test_behavior_events() {
        let wrap = TransactionWrap::new(Arc::new(Manager {
            journal: Arc::new(Journal::default()),
            fail: false,
        }));
        assert_eq!(Behavior::<()>::events(&wrap), &EVENTS);
    }
}
