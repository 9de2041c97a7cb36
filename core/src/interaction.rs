//! The [`Interaction`] trait - one business operation as a command object.
//!
//! A concrete interaction is a plain struct holding its attributes (and any
//! nested relation slots or internal state). It declares its validation
//! rules, optional prepare parameters, type-level behaviors, and the business
//! logic in [`Interaction::execute`]. The runtime crate drives it through the
//! fixed lifecycle:
//!
//! ```text
//! Created → Prepared → Loaded → Validated{pass|fail} → Executed{succeeded|failed}
//! ```
//!
//! # Example
//!
//! ```ignore
//! #[derive(Attributes, Default)]
//! struct RegisterUser {
//!     email: Option<String>,
//!     password: Option<String>,
//!     #[attributes(skip)]
//!     users: Option<Arc<dyn UserRepository>>,
//! }
//!
//! impl Interaction for RegisterUser {
//!     type Output = UserId;
//!     type Params = RegisterParams;
//!     type Error = RepositoryError;
//!
//!     fn form_name() -> &'static str {
//!         "RegisterUser"
//!     }
//!
//!     fn rules() -> Vec<Rule> {
//!         vec![Rule::required(&["email", "password"]), Rule::string(&["password"]).min(8)]
//!     }
//!
//!     fn prepare(&mut self, params: RegisterParams) {
//!         self.users = Some(params.users);
//!     }
//!
//!     async fn execute(&mut self, _ctx: &mut ExecutionContext<'_>) -> Result<UserId, RepositoryError> {
//!         // business logic
//!     }
//! }
//! ```

use crate::attributes::Attributes;
use crate::config::InteractionConfig;
use crate::errors::Errors;
use crate::event_bus::LifecycleEventBus;
use crate::validation::Rule;
use std::fmt;
use std::future::Future;

/// A self-validating, self-describing business operation.
pub trait Interaction: Attributes + Send + Sized + 'static {
    /// Value produced by [`Interaction::execute`]
    type Output: Send + 'static;

    /// Named parameters consumed once by [`Interaction::prepare`]
    ///
    /// Use `()` when the interaction needs no preparation.
    type Params: Default + Send;

    /// Business-logic failure raised by [`Interaction::execute`]
    ///
    /// Never caught by the pipeline; it propagates to the caller.
    type Error: fmt::Display + fmt::Debug + Send + 'static;

    /// Key under which this interaction's input is scoped in a larger payload
    fn form_name() -> &'static str;

    /// Validation rules; folded into the instance schema at construction
    fn rules() -> Vec<Rule> {
        Vec::new()
    }

    /// Pipeline policies for this interaction type
    fn config() -> InteractionConfig {
        InteractionConfig::new()
    }

    /// Type-level subscriptions, installed on every new instance
    fn behaviors(_bus: &mut LifecycleEventBus<Self>) {}

    /// One-time initialisation, run before the first load
    fn prepare(&mut self, _params: Self::Params) {}

    /// Instance-level checks run after the schema rules
    ///
    /// For constraints that depend on prepared state or on several
    /// attributes at once. Record failures in `errors`.
    fn check(&self, _errors: &mut Errors) {}

    /// The business logic
    ///
    /// Runs only after validation passed. Messages added through `ctx` mark
    /// the run as failed without raising.
    fn execute(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// Handle given to [`Interaction::execute`].
pub struct ExecutionContext<'a> {
    form_name: &'static str,
    errors: &'a mut Errors,
}

impl<'a> ExecutionContext<'a> {
    /// Wrap the instance's error map
    #[must_use]
    pub const fn new(form_name: &'static str, errors: &'a mut Errors) -> Self {
        Self { form_name, errors }
    }

    /// Form name of the executing interaction
    #[must_use]
    pub const fn form_name(&self) -> &'static str {
        self.form_name
    }

    /// Record a business-level error against an attribute
    pub fn add_error(&mut self, attribute: impl Into<String>, message: impl Into<String>) {
        self.errors.add(attribute, message);
    }

    /// Errors recorded so far
    #[must_use]
    pub fn errors(&self) -> &Errors {
        self.errors
    }

    /// True when any error is recorded
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("form_name", &self.form_name)
            .field("errors", &self.errors)
            .finish()
    }
}

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Constructed, prepare not yet run
    #[default]
    Created,

    /// Prepare ran
    Prepared,

    /// Input bound
    Loaded,

    /// Validation ran
    Validated {
        /// Whether own fields and every nested relation were valid
        passed: bool,
    },

    /// Business logic returned normally
    Executed {
        /// Overall success at the end of the run
        succeeded: bool,
    },
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Prepared => write!(f, "prepared"),
            Self::Loaded => write!(f, "loaded"),
            Self::Validated { passed: true } => write!(f, "validated(pass)"),
            Self::Validated { passed: false } => write!(f, "validated(fail)"),
            Self::Executed { succeeded: true } => write!(f, "executed(succeeded)"),
            Self::Executed { succeeded: false } => write!(f, "executed(failed)"),
        }
    }
}

/// Result of asking an instance to prepare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// The prepare hook ran now
    Prepared,

    /// The prepare hook had already run; nothing happened
    AlreadyPrepared,
}
