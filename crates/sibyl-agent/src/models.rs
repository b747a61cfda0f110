//! Model selection and fallback.
//!
//! The registry owns every configured model spec plus a mutex-guarded health
//! record per model. Selection walks a preference order derived from the task
//! category, skipping models that are cooling down after a failure, probing
//! each candidate before handing it out. When every candidate is cooling down
//! or fails its probe, one emergency pass retries the full list with cooldown
//! ignored before the turn is declared lost.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::task::TaskCategory;
use crate::{AgentError, ModelClient};

/// Cooldown applied to a model after a failed probe.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Static configuration for one hosted model.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub name: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub max_retries: u32,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            temperature: 0.1,
            max_tokens: 2000,
            max_retries: 2,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Mutable per-model counters. A model is AVAILABLE when `last_failure` is
/// unset or older than the cooldown, otherwise COOLING_DOWN.
#[derive(Debug, Default)]
struct ModelHealth {
    success_count: u64,
    failure_count: u64,
    last_failure: Option<Instant>,
}

struct HealthState {
    per_model: Vec<ModelHealth>,
    /// Index of the model that served the last successful selection.
    current: Option<usize>,
    total_requests: u64,
}

/// Snapshot of one model's counters, for observability.
#[derive(Debug, Clone)]
pub struct ModelStats {
    pub name: String,
    pub success_count: u64,
    pub failure_count: u64,
    pub available: bool,
}

/// Registry of configured models and their health, shared across turns.
///
/// The first two specs are the primary pair; everything after them is the
/// ordered fallback list.
pub struct ModelRegistry {
    specs: Vec<ModelSpec>,
    health: Mutex<HealthState>,
    cooldown: Duration,
}

impl ModelRegistry {
    /// Registry with the default Groq model line-up: a primary pair of large
    /// Llama models plus progressively lighter fallbacks.
    pub fn groq_default() -> Self {
        Self::new(vec![
            ModelSpec::new("llama-3.3-70b-versatile"),
            ModelSpec::new("llama-3.1-70b-versatile"),
            ModelSpec::new("llama-3.2-90b-text-preview").with_max_tokens(1800),
            ModelSpec::new("llama-3.1-8b-instant").with_max_tokens(1500),
            ModelSpec::new("gemma2-9b-it").with_max_tokens(1500),
        ])
    }

    pub fn new(specs: Vec<ModelSpec>) -> Self {
        let per_model = specs.iter().map(|_| ModelHealth::default()).collect();
        Self {
            specs,
            health: Mutex::new(HealthState {
                per_model,
                current: None,
                total_requests: 0,
            }),
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Whether a model is currently outside its cooldown window.
    pub fn is_available(&self, name: &str) -> bool {
        let state = self.health.lock().unwrap();
        match self.index_of(name) {
            Some(idx) => self.entry_available(&state.per_model[idx]),
            None => false,
        }
    }

    fn entry_available(&self, health: &ModelHealth) -> bool {
        match health.last_failure {
            None => true,
            Some(at) => at.elapsed() > self.cooldown,
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|s| s.name == name)
    }

    /// Preference order for a category: preferred primary, the other primary,
    /// then the fallback list in configured order.
    fn candidate_order(&self, category: TaskCategory) -> Vec<usize> {
        if self.specs.is_empty() {
            return Vec::new();
        }
        let preferred = match category {
            TaskCategory::Reasoning | TaskCategory::Analysis | TaskCategory::Research => 1,
            _ => 0,
        };
        let preferred = preferred.min(self.specs.len().saturating_sub(1));
        let mut order = vec![preferred];
        for idx in 0..self.specs.len() {
            if idx != preferred {
                order.push(idx);
            }
        }
        order
    }

    /// Select and probe a model for the given task category.
    ///
    /// Failing every candidate (including the cooldown-ignoring emergency
    /// pass) is fatal for this one call only, never for the session.
    pub async fn acquire(
        &self,
        client: &dyn ModelClient,
        category: TaskCategory,
    ) -> Result<ModelSpec, AgentError> {
        self.health.lock().unwrap().total_requests += 1;
        let order = self.candidate_order(category);

        for &idx in &order {
            if !self.available_by_index(idx) {
                debug!(model = %self.specs[idx].name, "skipping model in cooldown");
                continue;
            }
            if let Some(spec) = self.try_probe(client, idx).await {
                return Ok(spec);
            }
        }

        // Emergency pass: every candidate is cooling down or just failed.
        warn!("all models unavailable, retrying without cooldown restrictions");
        for &idx in &order {
            if let Some(spec) = self.try_probe(client, idx).await {
                info!(model = %spec.name, "emergency fallback selected");
                return Ok(spec);
            }
        }

        Err(AgentError::AllModelsFailed)
    }

    /// Select a specific model by name, bypassing category preference.
    /// The probe and health bookkeeping still apply.
    pub async fn acquire_forced(
        &self,
        client: &dyn ModelClient,
        name: &str,
    ) -> Result<ModelSpec, AgentError> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| AgentError::ModelUnavailable(name.to_string()))?;
        self.health.lock().unwrap().total_requests += 1;
        match self.try_probe(client, idx).await {
            Some(spec) => Ok(spec),
            None => Err(AgentError::ModelUnavailable(name.to_string())),
        }
    }

    /// Select the other half of the primary pair relative to the model that
    /// served the last selection. Used for the single in-turn retry.
    pub async fn acquire_alternate(
        &self,
        client: &dyn ModelClient,
    ) -> Result<ModelSpec, AgentError> {
        let last = self.health.lock().unwrap().current;
        let category = match last {
            Some(0) => TaskCategory::Reasoning, // prefers the secondary
            _ => TaskCategory::General,         // prefers the primary
        };
        self.acquire(client, category).await
    }

    fn available_by_index(&self, idx: usize) -> bool {
        let state = self.health.lock().unwrap();
        self.entry_available(&state.per_model[idx])
    }

    async fn try_probe(&self, client: &dyn ModelClient, idx: usize) -> Option<ModelSpec> {
        let spec = self.specs[idx].clone();
        match client.probe(&spec).await {
            Ok(()) => {
                let mut state = self.health.lock().unwrap();
                state.per_model[idx].success_count += 1;
                state.current = Some(idx);
                info!(model = %spec.name, "model selected");
                Some(spec)
            }
            Err(e) => {
                let mut state = self.health.lock().unwrap();
                state.per_model[idx].failure_count += 1;
                state.per_model[idx].last_failure = Some(Instant::now());
                warn!(model = %spec.name, error = %e, "model probe failed");
                None
            }
        }
    }

    /// Record a call failure for a model that was already handed out
    /// (the probe passed but the real call did not).
    pub fn record_failure(&self, name: &str) {
        if let Some(idx) = self.index_of(name) {
            let mut state = self.health.lock().unwrap();
            state.per_model[idx].failure_count += 1;
            state.per_model[idx].last_failure = Some(Instant::now());
        }
    }

    /// Name of the model that served the last successful selection.
    pub fn current_model(&self) -> Option<String> {
        let state = self.health.lock().unwrap();
        state.current.map(|idx| self.specs[idx].name.clone())
    }

    pub fn total_requests(&self) -> u64 {
        self.health.lock().unwrap().total_requests
    }

    /// Per-model counter snapshot.
    pub fn stats(&self) -> Vec<ModelStats> {
        let state = self.health.lock().unwrap();
        self.specs
            .iter()
            .zip(state.per_model.iter())
            .map(|(spec, health)| ModelStats {
                name: spec.name.clone(),
                success_count: health.success_count,
                failure_count: health.failure_count,
                available: self.entry_available(health),
            })
            .collect()
    }

    /// Reset every counter and forget the current model.
    pub fn reset_stats(&self) {
        let mut state = self.health.lock().unwrap();
        for health in &mut state.per_model {
            *health = ModelHealth::default();
        }
        state.current = None;
        state.total_requests = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Message, ModelResponse, ToolDefinition};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    /// Scripted client: probes fail for any model name in `failing`.
    struct ScriptedClient {
        failing: HashSet<String>,
        probed: StdMutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn failing(names: &[&str]) -> Self {
            Self {
                failing: names.iter().map(|s| s.to_string()).collect(),
                probed: StdMutex::new(Vec::new()),
            }
        }

        fn probed(&self) -> Vec<String> {
            self.probed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        async fn probe(&self, model: &ModelSpec) -> Result<(), AgentError> {
            self.probed.lock().unwrap().push(model.name.clone());
            if self.failing.contains(&model.name) {
                Err(AgentError::ModelUnavailable(model.name.clone()))
            } else {
                Ok(())
            }
        }

        async fn invoke(
            &self,
            _model: &ModelSpec,
            _messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> Result<ModelResponse, AgentError> {
            Ok(ModelResponse::default())
        }
    }

    fn small_registry() -> ModelRegistry {
        ModelRegistry::new(vec![
            ModelSpec::new("primary"),
            ModelSpec::new("secondary"),
            ModelSpec::new("fallback"),
        ])
    }

    #[test]
    fn available_until_failure_then_cooldown() {
        let registry = small_registry().with_cooldown(Duration::from_millis(30));
        assert!(registry.is_available("primary"));

        registry.record_failure("primary");
        assert!(!registry.is_available("primary"));

        std::thread::sleep(Duration::from_millis(40));
        assert!(registry.is_available("primary"));
    }

    #[tokio::test]
    async fn math_prefers_primary() {
        let registry = small_registry();
        let client = ScriptedClient::failing(&[]);
        let spec = registry.acquire(&client, TaskCategory::Math).await.unwrap();
        assert_eq!(spec.name, "primary");
        assert_eq!(registry.current_model().as_deref(), Some("primary"));
    }

    #[tokio::test]
    async fn reasoning_prefers_secondary() {
        let registry = small_registry();
        let client = ScriptedClient::failing(&[]);
        let spec = registry
            .acquire(&client, TaskCategory::Reasoning)
            .await
            .unwrap();
        assert_eq!(spec.name, "secondary");
    }

    #[tokio::test]
    async fn probe_failure_falls_through_in_order() {
        let registry = small_registry();
        let client = ScriptedClient::failing(&["primary", "secondary"]);
        let spec = registry.acquire(&client, TaskCategory::Math).await.unwrap();
        assert_eq!(spec.name, "fallback");
        assert_eq!(client.probed(), vec!["primary", "secondary", "fallback"]);

        let stats = registry.stats();
        assert_eq!(stats[0].failure_count, 1);
        assert_eq!(stats[2].success_count, 1);
        assert!(!stats[0].available);
    }

    #[tokio::test]
    async fn cooling_model_skipped_without_probe() {
        let registry = small_registry();
        registry.record_failure("primary");

        let client = ScriptedClient::failing(&[]);
        let spec = registry.acquire(&client, TaskCategory::Math).await.unwrap();
        assert_eq!(spec.name, "secondary");
        // The cooling primary was never probed on the normal pass.
        assert_eq!(client.probed(), vec!["secondary"]);
    }

    #[tokio::test]
    async fn emergency_pass_ignores_cooldown() {
        let registry = small_registry();
        registry.record_failure("primary");
        registry.record_failure("secondary");
        registry.record_failure("fallback");

        // Every model is cooling down, but probes now succeed: the emergency
        // pass must still find one.
        let client = ScriptedClient::failing(&[]);
        let spec = registry.acquire(&client, TaskCategory::Math).await.unwrap();
        assert_eq!(spec.name, "primary");
    }

    #[tokio::test]
    async fn exhaustion_is_a_single_fatal_error() {
        let registry = small_registry();
        let client = ScriptedClient::failing(&["primary", "secondary", "fallback"]);
        let err = registry
            .acquire(&client, TaskCategory::General)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::AllModelsFailed));
        // Normal pass + emergency pass, then stop: no infinite loop.
        assert_eq!(client.probed().len(), 6);
    }

    #[tokio::test]
    async fn forced_model_bypasses_preference() {
        let registry = small_registry();
        let client = ScriptedClient::failing(&[]);
        let spec = registry.acquire_forced(&client, "fallback").await.unwrap();
        assert_eq!(spec.name, "fallback");

        let err = registry.acquire_forced(&client, "no-such").await.unwrap_err();
        assert!(matches!(err, AgentError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn alternate_switches_primary_pair() {
        let registry = small_registry();
        let client = ScriptedClient::failing(&[]);

        let first = registry.acquire(&client, TaskCategory::Math).await.unwrap();
        assert_eq!(first.name, "primary");

        let second = registry.acquire_alternate(&client).await.unwrap();
        assert_eq!(second.name, "secondary");
    }

    #[tokio::test]
    async fn empty_registry_fails_cleanly() {
        let registry = ModelRegistry::new(vec![]);
        let client = ScriptedClient::failing(&[]);
        let err = registry
            .acquire(&client, TaskCategory::General)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::AllModelsFailed));
    }

    #[tokio::test]
    async fn reset_clears_counters() {
        let registry = small_registry();
        let client = ScriptedClient::failing(&["primary"]);
        let _ = registry.acquire(&client, TaskCategory::Math).await;
        assert!(registry.total_requests() > 0);

        registry.reset_stats();
        assert_eq!(registry.total_requests(), 0);
        assert!(registry.stats().iter().all(|s| s.failure_count == 0));
        assert!(registry.current_model().is_none());
    }
}
