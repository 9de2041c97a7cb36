//! `one` and `many` relation slots.
//!
//! A parent interaction declares a child relationship by holding a slot as a
//! field (marked `#[nested]` when deriving `Attributes`). The parent's
//! pipeline reaches slots through [`NestedRelation`]:
//!
//! - **load**: the sub-payload under the child's form name is bound into the
//!   child (`One`) or replaces the children wholesale (`Many`)
//! - **validate**: every child is validated, with no short-circuit
//! - **success**: a slot succeeds when every child is valid and every child
//!   that executed succeeded
//!
//! Execution is explicit. The parent's business logic calls
//! [`One::execute`] or [`Many::execute`] (or their `_with` variants, which
//! configure each child first, typically by preparing it with parameters
//! derived from the parent). Each child is prepared with default parameters
//! if the closure did not, re-validated, and then runs its staged execute.
//! A `Many` keeps going past invalid children and returns `None` in their
//! positions. Business-logic errors from a child abort and propagate.
//!
//! Both slots hold one placeholder child from construction until the first
//! load.

use crate::error::InteractionError;
use crate::interaction::ActiveInteraction;
use composable_interactions_core::input::entries;
use composable_interactions_core::nested::{join_path, Cardinality, NestedRelation};
use composable_interactions_core::{Errors, Interaction, Value};
use std::fmt;
use std::sync::Arc;

/// Builds a fresh child instance for a slot.
pub type Factory<C> =
    Arc<dyn Fn() -> Result<ActiveInteraction<C>, InteractionError> + Send + Sync>;

// ============================================================================
// One
// ============================================================================

/// Slot holding exactly one child interaction.
pub struct One<C: Interaction> {
    child: Option<Box<ActiveInteraction<C>>>,
    factory: Factory<C>,
    fault: Option<InteractionError>,
}

impl<C: Interaction> One<C> {
    /// Slot whose child is built (and rebuilt) by `factory`
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Result<ActiveInteraction<C>, InteractionError> + Send + Sync + 'static,
    {
        let factory: Factory<C> = Arc::new(factory);
        match factory() {
            Ok(child) => Self {
                child: Some(Box::new(child)),
                factory,
                fault: None,
            },
            Err(error) => Self {
                child: None,
                factory,
                fault: Some(error),
            },
        }
    }

    /// The child instance
    #[must_use]
    pub fn child(&self) -> Option<&ActiveInteraction<C>> {
        self.child.as_deref()
    }

    /// The child instance, mutably
    pub fn child_mut(&mut self) -> Option<&mut ActiveInteraction<C>> {
        self.child.as_deref_mut()
    }

    /// The child's concrete interaction
    #[must_use]
    pub fn get(&self) -> Option<&C> {
        self.child().map(ActiveInteraction::inner)
    }

    /// Validate and execute the child
    ///
    /// Returns `Ok(None)` when the child is invalid, already executed, or
    /// stopped by its `beforeExecute` handlers.
    ///
    /// # Errors
    ///
    /// Propagates the child's business-logic error.
    pub async fn execute(&mut self) -> Result<Option<C::Output>, C::Error> {
        self.execute_with(|_| {}).await
    }

    /// Configure the child, then validate and execute it
    ///
    /// # Errors
    ///
    /// Propagates the child's business-logic error.
    pub async fn execute_with<F>(&mut self, configure: F) -> Result<Option<C::Output>, C::Error>
    where
        F: FnOnce(&mut ActiveInteraction<C>) + Send,
    {
        let Some(child) = self.child.as_deref_mut() else {
            return Ok(None);
        };
        if child.is_executed() {
            tracing::debug!(form = C::form_name(), "Nested child already executed");
            return Ok(None);
        }

        configure(child);
        child.prepare(C::Params::default());

        if !child.validate() {
            tracing::debug!(form = C::form_name(), "Nested child invalid at execute time");
            return Ok(None);
        }
        child.execute_staged().await
    }

    fn ensure_child(&mut self) -> Option<&mut ActiveInteraction<C>> {
        if self.child.is_none() {
            match (self.factory)() {
                Ok(child) => self.child = Some(Box::new(child)),
                Err(error) => {
                    tracing::error!(form = C::form_name(), %error, "Failed to build nested child");
                    self.fault = Some(error);
                },
            }
        }
        self.child.as_deref_mut()
    }
}

impl<C: Interaction + Default> Default for One<C> {
    fn default() -> Self {
        Self::with_factory(|| ActiveInteraction::new(C::default()))
    }
}

impl<C: Interaction> NestedRelation for One<C> {
    fn cardinality(&self) -> Cardinality {
        Cardinality::One
    }

    fn form_name(&self) -> &'static str {
        C::form_name()
    }

    fn load_from(&mut self, payload: Option<&Value>) {
        let Some(payload) = payload else {
            return;
        };
        if let Some(child) = self.ensure_child() {
            child.load(payload.clone());
        }
    }

    fn validate(&mut self) -> bool {
        self.child
            .as_deref_mut()
            .is_some_and(|child| child.validate())
    }

    fn is_valid(&self) -> bool {
        self.fault.is_none() && self.child().is_some_and(ActiveInteraction::is_valid)
    }

    fn is_success(&self) -> bool {
        self.fault.is_none() && self.child().is_some_and(child_succeeded)
    }

    fn len(&self) -> usize {
        usize::from(self.child.is_some())
    }

    fn collect_errors(&self, prefix: &str, errors: &mut Errors) {
        if let Some(child) = self.child() {
            child.collect_errors_into(prefix, errors);
        }
    }

    fn fault(&self) -> Option<String> {
        self.fault.as_ref().map(ToString::to_string)
    }
}

impl<C: Interaction> fmt::Debug for One<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("One")
            .field("form", &C::form_name())
            .field("child", &self.child)
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Many
// ============================================================================

/// Slot holding an ordered sequence of child interactions.
///
/// Starts with a single placeholder child. Every load replaces the sequence
/// with one child per input entry.
pub struct Many<C: Interaction> {
    children: Vec<ActiveInteraction<C>>,
    factory: Factory<C>,
    fault: Option<InteractionError>,
}

impl<C: Interaction> Many<C> {
    /// Slot whose children are built by `factory`
    ///
    /// The placeholder child is built right away, so a broken child type
    /// surfaces when the parent is constructed.
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Result<ActiveInteraction<C>, InteractionError> + Send + Sync + 'static,
    {
        let factory: Factory<C> = Arc::new(factory);
        let (children, fault) = match factory() {
            Ok(placeholder) => (vec![placeholder], None),
            Err(error) => (Vec::new(), Some(error)),
        };
        Self {
            children,
            factory,
            fault,
        }
    }

    /// Children in input order
    #[must_use]
    pub fn children(&self) -> &[ActiveInteraction<C>] {
        &self.children
    }

    /// Children in input order, mutably
    pub fn children_mut(&mut self) -> &mut [ActiveInteraction<C>] {
        &mut self.children
    }

    /// Child at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ActiveInteraction<C>> {
        self.children.get(index)
    }

    /// Iterate the children's concrete interactions
    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.children.iter().map(ActiveInteraction::inner)
    }

    /// Validate and execute every child in order
    ///
    /// The result holds one entry per child; `None` marks a child that was
    /// invalid, already executed, or stopped by its handlers.
    ///
    /// # Errors
    ///
    /// Propagates the first child business-logic error; later children do
    /// not run.
    pub async fn execute(&mut self) -> Result<Vec<Option<C::Output>>, C::Error> {
        self.execute_with(|_, _| {}).await
    }

    /// Configure each child (by index), then validate and execute it
    ///
    /// # Errors
    ///
    /// Propagates the first child business-logic error.
    pub async fn execute_with<F>(
        &mut self,
        mut configure: F,
    ) -> Result<Vec<Option<C::Output>>, C::Error>
    where
        F: FnMut(usize, &mut ActiveInteraction<C>) + Send,
    {
        let mut results = Vec::with_capacity(self.children.len());

        for (index, child) in self.children.iter_mut().enumerate() {
            if child.is_executed() {
                results.push(None);
                continue;
            }

            configure(index, child);
            child.prepare(C::Params::default());

            if !child.validate() {
                tracing::debug!(
                    form = C::form_name(),
                    index,
                    "Nested child invalid at execute time"
                );
                results.push(None);
                continue;
            }
            results.push(child.execute_staged().await?);
        }

        Ok(results)
    }
}

impl<C: Interaction + Default> Default for Many<C> {
    fn default() -> Self {
        Self::with_factory(|| ActiveInteraction::new(C::default()))
    }
}

impl<C: Interaction> NestedRelation for Many<C> {
    fn cardinality(&self) -> Cardinality {
        Cardinality::Many
    }

    fn form_name(&self) -> &'static str {
        C::form_name()
    }

    fn load_from(&mut self, payload: Option<&Value>) {
        self.children.clear();

        let Some(payload) = payload else {
            return;
        };

        for entry in entries(payload) {
            match (self.factory)() {
                Ok(mut child) => {
                    child.load(entry.clone());
                    self.children.push(child);
                },
                Err(error) => {
                    tracing::error!(form = C::form_name(), %error, "Failed to build nested child");
                    self.fault = Some(error);
                    self.children.clear();
                    return;
                },
            }
        }
    }

    fn validate(&mut self) -> bool {
        self.children
            .iter_mut()
            .fold(self.fault.is_none(), |valid, child| child.validate() && valid)
    }

    fn is_valid(&self) -> bool {
        self.fault.is_none() && self.children.iter().all(ActiveInteraction::is_valid)
    }

    fn is_success(&self) -> bool {
        self.fault.is_none() && self.children.iter().all(child_succeeded)
    }

    fn len(&self) -> usize {
        self.children.len()
    }

    fn collect_errors(&self, prefix: &str, errors: &mut Errors) {
        for (index, child) in self.children.iter().enumerate() {
            child.collect_errors_into(&join_path(prefix, &index.to_string()), errors);
        }
    }

    fn fault(&self) -> Option<String> {
        self.fault.as_ref().map(ToString::to_string)
    }
}

impl<C: Interaction> fmt::Debug for Many<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Many")
            .field("form", &C::form_name())
            .field("children", &self.children)
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}

/// A child counts toward its slot's success when it is valid and, if it
/// executed, finished without errors.
fn child_succeeded<C: Interaction>(child: &ActiveInteraction<C>) -> bool {
    child.is_valid() && (!child.is_executed() || child.is_success())
}
