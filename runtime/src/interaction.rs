//! The interaction pipeline.
//!
//! [`ActiveInteraction`] wraps a concrete [`Interaction`] and drives it
//! through the fixed stage sequence:
//!
//! ```text
//! new ──► prepare (once) ──► load ──► validate ──► staged execute
//!                             │          │              │
//!                        beforeLoad   own fields    beforeExecute
//!                        afterLoad    + nested      execute()
//!                                                   afterExecute
//!                                                   onSuccess | onErrors
//! ```
//!
//! `run` combines load, validate, and execute. Validation failures become
//! structured data on the instance; business-logic errors from
//! [`Interaction::execute`] propagate to the caller untouched.
//!
//! # Example
//!
//! ```ignore
//! let mut signup = ActiveInteraction::create(Signup::default(), SignupParams { mailer })?;
//! signup.run(json!({ "email": "ada@example.com" })).await?;
//!
//! if signup.is_success() {
//!     println!("created {:?}", signup.result());
//! } else {
//!     println!("errors: {}", signup.errors().to_json());
//! }
//! ```

use crate::error::{ForceRunError, InteractionError};
use crate::metrics;
use composable_interactions_core::event::{EventContext, EventOutcome, LifecycleEvent};
use composable_interactions_core::event_bus::{Behavior, LifecycleEventBus, LifecycleHandler};
use composable_interactions_core::nested::join_path;
use composable_interactions_core::validation::{label, RuleValidator, Schema, Validator};
use composable_interactions_core::{
    Errors, ExecutionContext, Input, Interaction, InteractionConfig, LifecycleState, Map,
    PrepareOutcome, Value,
};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// A live interaction instance: the concrete interaction plus its pipeline state.
pub struct ActiveInteraction<I: Interaction> {
    inner: I,
    schema: Schema,
    config: InteractionConfig,
    validator: Arc<dyn Validator>,
    events: LifecycleEventBus<I>,
    errors: Errors,
    binding_errors: Errors,
    state: LifecycleState,
    result: Option<I::Output>,
    prepared: bool,
    executed: bool,
    primary_key: Option<Value>,
}

impl<I: Interaction> ActiveInteraction<I> {
    /// Construct an instance without preparing it
    ///
    /// Builds the schema from [`Interaction::rules`] and installs the
    /// type-level behaviors from [`Interaction::behaviors`].
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::Schema`] if a rule names an undeclared
    /// attribute, or [`InteractionError::Nested`] if a relation slot could
    /// not build its placeholder child.
    pub fn new(inner: I) -> Result<Self, InteractionError> {
        let schema = Schema::from_rules(I::form_name(), I::attribute_names(), I::rules())?;

        if let Some((relation, reason)) = inner
            .relations()
            .into_iter()
            .find_map(|(name, relation)| relation.fault().map(|fault| (name, fault)))
        {
            return Err(InteractionError::Nested {
                form: I::form_name(),
                relation,
                reason,
            });
        }

        let mut events = LifecycleEventBus::new();
        I::behaviors(&mut events);

        tracing::trace!(form = I::form_name(), "Interaction constructed");

        Ok(Self {
            inner,
            schema,
            config: I::config(),
            validator: Arc::new(RuleValidator),
            events,
            errors: Errors::new(),
            binding_errors: Errors::new(),
            state: LifecycleState::Created,
            result: None,
            prepared: false,
            executed: false,
            primary_key: None,
        })
    }

    /// Construct and prepare an instance in one step
    ///
    /// # Errors
    ///
    /// Same as [`ActiveInteraction::new`].
    pub fn create(inner: I, params: I::Params) -> Result<Self, InteractionError> {
        let mut instance = Self::new(inner)?;
        instance.prepare(params);
        Ok(instance)
    }

    /// Override the type-level configuration for this instance
    #[must_use]
    pub fn with_config(mut self, config: InteractionConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the validation engine for this instance
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Subscribe an instance-level handler
    pub fn on<H>(&mut self, event: LifecycleEvent, handler: H) -> &mut Self
    where
        H: LifecycleHandler<I> + 'static,
    {
        self.events.subscribe(event, handler);
        self
    }

    /// Attach an instance-level behavior
    pub fn attach<B>(&mut self, behavior: B) -> &mut Self
    where
        B: Behavior<I> + 'static,
    {
        self.events.attach(behavior);
        self
    }

    // ========================================================================
    // Prepare
    // ========================================================================

    /// Run [`Interaction::prepare`] if it has not run yet
    pub fn prepare(&mut self, params: I::Params) -> PrepareOutcome {
        if self.prepared {
            tracing::trace!(form = I::form_name(), "Prepare already ran");
            return PrepareOutcome::AlreadyPrepared;
        }

        self.inner.prepare(params);
        self.prepared = true;
        self.state = LifecycleState::Prepared;
        tracing::debug!(form = I::form_name(), "Interaction prepared");
        PrepareOutcome::Prepared
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Bind raw input into attributes and nested children
    ///
    /// Returns `false` only when a `beforeLoad` handler stopped the load, in
    /// which case nothing was mutated.
    #[tracing::instrument(skip_all, name = "interaction_load", fields(form = I::form_name()))]
    pub fn load(&mut self, input: impl Into<Input>) -> bool {
        if self.trigger(LifecycleEvent::BeforeLoad).is_stop() {
            tracing::debug!("Load cancelled by beforeLoad handler");
            return false;
        }

        let data = input.into().normalize(I::form_name());
        self.bind(&data);

        for (name, relation) in self.inner.relations_mut() {
            let payload = data.get(relation.form_name());
            relation.load_from(payload);
            tracing::trace!(
                relation = name,
                cardinality = %relation.cardinality(),
                children = relation.len(),
                "Nested relation loaded"
            );
        }

        self.state = LifecycleState::Loaded;
        self.trigger(LifecycleEvent::AfterLoad);
        true
    }

    fn bind(&mut self, data: &Map<String, Value>) {
        self.binding_errors.clear();

        for name in self.schema.attributes() {
            let Some(value) = data.get(name) else {
                continue;
            };
            if let Err(error) = self.inner.set_attribute(name, value.clone()) {
                tracing::debug!(attribute = name, %error, "Attribute binding failed");
                self.binding_errors
                    .add(name, format!("{} is invalid.", label(name)));
            }
        }
    }

    // ========================================================================
    // Validate
    // ========================================================================

    /// Validate own fields, then every nested relation
    ///
    /// Nested children are all evaluated (no short-circuit). When the
    /// parent's own fields already failed, nested validation still runs
    /// unless `validate_nested_when_invalid` is off.
    #[tracing::instrument(skip_all, name = "interaction_validate", fields(form = I::form_name()))]
    pub fn validate(&mut self) -> bool {
        let mut errors = self.binding_errors.clone();
        errors.extend(self.schema.validate(&self.inner, self.validator.as_ref()));
        self.inner.check(&mut errors);
        self.errors = errors;

        let own_valid = self.errors.is_empty();
        let nested_valid = if own_valid || self.config.validate_nested_when_invalid {
            self.inner
                .relations_mut()
                .into_iter()
                .fold(true, |valid, (_, relation)| relation.validate() && valid)
        } else {
            self.nested_is_valid()
        };

        if self.config.bubble_nested_errors {
            let nested = self.nested_errors("");
            merge_missing(&mut self.errors, &nested);
        }

        let passed = own_valid && nested_valid;
        self.state = LifecycleState::Validated { passed };
        tracing::debug!(passed, own_valid, nested_valid, "Validation finished");
        passed
    }

    // ========================================================================
    // Execute
    // ========================================================================

    /// Load, validate, and (when valid) execute
    ///
    /// With `wait_for_input` set, an empty input returns the instance
    /// untouched. Running an instance that already executed is a no-op that
    /// keeps the prior result.
    ///
    /// # Errors
    ///
    /// Returns the business-logic error raised by [`Interaction::execute`].
    /// The instance must not be reused after that.
    #[tracing::instrument(skip_all, name = "interaction_run", fields(form = I::form_name()))]
    pub async fn run(&mut self, input: impl Into<Input>) -> Result<&mut Self, I::Error> {
        let input = input.into();

        if self.config.wait_for_input && input.is_empty() {
            tracing::debug!("No input supplied, waiting");
            metrics::record_run(I::form_name(), metrics::Outcome::Waiting);
            return Ok(self);
        }

        if self.executed {
            tracing::debug!("Interaction already executed, keeping prior result");
            metrics::record_run(I::form_name(), metrics::Outcome::Repeated);
            return Ok(self);
        }

        self.prepare(I::Params::default());
        self.load(input);

        if !self.validate() {
            metrics::record_validation_failure(I::form_name());
            metrics::record_run(I::form_name(), metrics::Outcome::Invalid);
            return Ok(self);
        }

        match self.execute_staged().await {
            Ok(output) => {
                let outcome = match (&output, self.is_success()) {
                    (None, _) => metrics::Outcome::Cancelled,
                    (Some(_), true) => metrics::Outcome::Succeeded,
                    (Some(_), false) => metrics::Outcome::Failed,
                };
                metrics::record_run(I::form_name(), outcome);
                self.result = output;
                Ok(self)
            },
            Err(error) => {
                tracing::warn!(%error, "Business logic failed");
                metrics::record_run(I::form_name(), metrics::Outcome::Error);
                Err(error)
            },
        }
    }

    /// Like [`ActiveInteraction::run`], but an invalid or failed outcome
    /// becomes an error carrying the whole instance
    ///
    /// # Errors
    ///
    /// - [`ForceRunError::Invalid`] when the run finished with errors
    /// - [`ForceRunError::Execution`] when the business logic raised
    pub async fn force_run(mut self, input: impl Into<Input>) -> Result<Self, ForceRunError<I>> {
        self.run(input).await.map_err(ForceRunError::Execution)?;

        if !self.is_valid() || (self.executed && !self.is_success()) {
            return Err(ForceRunError::Invalid(Box::new(self)));
        }
        Ok(self)
    }

    /// Run the business logic wrapped in its lifecycle events
    ///
    /// Returns `Ok(None)` when a `beforeExecute` handler stopped execution.
    pub(crate) async fn execute_staged(&mut self) -> Result<Option<I::Output>, I::Error> {
        if self.trigger(LifecycleEvent::BeforeExecute).is_stop() {
            tracing::debug!(form = I::form_name(), "Execution cancelled by beforeExecute handler");
            return Ok(None);
        }

        let started = Instant::now();
        let output = {
            let mut ctx = ExecutionContext::new(I::form_name(), &mut self.errors);
            self.inner.execute(&mut ctx).await?
        };
        metrics::record_execute_duration(I::form_name(), started.elapsed());

        self.executed = true;
        if self.config.bubble_nested_errors {
            // children re-validated during execute may have failed since
            let nested = self.nested_errors("");
            merge_missing(&mut self.errors, &nested);
        }
        self.trigger(LifecycleEvent::AfterExecute);

        let succeeded = self.is_success();
        self.state = LifecycleState::Executed { succeeded };
        tracing::debug!(form = I::form_name(), succeeded, "Execution finished");

        if succeeded {
            self.trigger(LifecycleEvent::OnSuccess);
        } else {
            self.trigger(LifecycleEvent::OnErrors);
        }

        Ok(Some(output))
    }

    fn trigger(&mut self, event: LifecycleEvent) -> EventOutcome {
        let ctx = EventContext::new(event, I::form_name(), &self.inner, &self.errors);
        self.events.trigger(&ctx)
    }

    // ========================================================================
    // Outcome
    // ========================================================================

    /// No own errors, executed, and every nested relation successful
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.executed
            && self.errors.is_empty()
            && self
                .inner
                .relations()
                .iter()
                .all(|(_, relation)| relation.is_success())
    }

    /// No own errors and every nested relation valid
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty() && self.nested_is_valid()
    }

    fn nested_is_valid(&self) -> bool {
        self.inner
            .relations()
            .iter()
            .all(|(_, relation)| relation.is_valid())
    }

    /// Whether the business logic returned normally
    #[must_use]
    pub const fn is_executed(&self) -> bool {
        self.executed
    }

    /// Whether prepare has run
    #[must_use]
    pub const fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Own errors (nested errors stay on the children unless bubbled)
    #[must_use]
    pub const fn errors(&self) -> &Errors {
        &self.errors
    }

    /// Own errors plus every nested error under dotted paths
    /// (`relation.attribute`, `relation.index.attribute`)
    #[must_use]
    pub fn collect_errors(&self) -> Errors {
        let mut collected = Errors::new();
        self.collect_errors_into("", &mut collected);
        collected
    }

    pub(crate) fn collect_errors_into(&self, prefix: &str, out: &mut Errors) {
        for (attribute, messages) in &self.errors {
            out.add_all(&join_path(prefix, attribute), messages.iter().cloned());
        }
        if self.config.bubble_nested_errors {
            merge_missing(out, &self.nested_errors(prefix));
        } else {
            for (name, relation) in self.inner.relations() {
                relation.collect_errors(&join_path(prefix, name), out);
            }
        }
    }

    fn nested_errors(&self, prefix: &str) -> Errors {
        let mut nested = Errors::new();
        for (name, relation) in self.inner.relations() {
            relation.collect_errors(&join_path(prefix, name), &mut nested);
        }
        nested
    }

    /// Value returned by the business logic, once executed
    #[must_use]
    pub const fn result(&self) -> Option<&I::Output> {
        self.result.as_ref()
    }

    /// Move the result out of the instance
    pub const fn take_result(&mut self) -> Option<I::Output> {
        self.result.take()
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// The concrete interaction
    #[must_use]
    pub const fn inner(&self) -> &I {
        &self.inner
    }

    /// The concrete interaction, mutably
    pub const fn inner_mut(&mut self) -> &mut I {
        &mut self.inner
    }

    /// Consume into the concrete interaction
    #[must_use]
    pub fn into_inner(self) -> I {
        self.inner
    }

    /// Scalar attribute values
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.inner.snapshot()
    }

    /// Attribute → rules mapping fixed at construction
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Effective configuration
    #[must_use]
    pub const fn config(&self) -> &InteractionConfig {
        &self.config
    }

    /// Form name of the interaction type
    #[must_use]
    pub fn form_name(&self) -> &'static str {
        I::form_name()
    }

    /// Key of the record this interaction operates on, if any
    #[must_use]
    pub const fn primary_key(&self) -> Option<&Value> {
        self.primary_key.as_ref()
    }

    /// Set the key of the record this interaction operates on
    pub fn set_primary_key(&mut self, key: impl Into<Value>) {
        self.primary_key = Some(key.into());
    }
}

impl<I: Interaction> fmt::Debug for ActiveInteraction<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveInteraction")
            .field("form", &I::form_name())
            .field("state", &self.state)
            .field("prepared", &self.prepared)
            .field("executed", &self.executed)
            .field("errors", &self.errors)
            .field("primary_key", &self.primary_key)
            .finish_non_exhaustive()
    }
}

/// Copy messages from `source` that `target` does not already hold
fn merge_missing(target: &mut Errors, source: &Errors) {
    for (attribute, messages) in source.iter() {
        for message in messages {
            if !target.get(attribute).contains(message) {
                target.add(attribute, message.clone());
            }
        }
    }
}
