//! Health tracking for the app service
//!
//! Tracks the catalog and the orchestration service so liveness and
//! readiness probes reflect whether sessions can currently be launched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Recent calls failed but the service keeps accepting requests
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the component entered its current status
    pub since: DateTime<Utc>,
    pub consecutive_failures: u32,
}

impl ComponentHealth {
    fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            since: Utc::now(),
            consecutive_failures: 0,
        }
    }

    fn transition(&mut self, status: ComponentStatus, message: Option<String>) {
        if self.status != status {
            self.since = Utc::now();
        }
        self.status = status;
        self.message = message;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Tracked components
pub mod components {
    pub const CATALOG: &str = "catalog";
    pub const ORCHESTRATOR: &str = "orchestrator";
}

/// Shared registry of component health; clones share state
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a component as healthy
    pub async fn register(&self, name: &str) {
        self.components
            .write()
            .await
            .insert(name.to_string(), ComponentHealth::healthy());
    }

    /// A call through the component succeeded; clears degradation but not `Unhealthy`
    pub async fn record_success(&self, name: &str) {
        let mut components = self.components.write().await;
        let health = components
            .entry(name.to_string())
            .or_insert_with(ComponentHealth::healthy);
        health.consecutive_failures = 0;
        if health.status != ComponentStatus::Unhealthy {
            health.transition(ComponentStatus::Healthy, None);
        }
    }

    /// A call through the component failed; the component is degraded until the next success
    pub async fn record_failure(&self, name: &str, message: impl Into<String>) {
        let mut components = self.components.write().await;
        let health = components
            .entry(name.to_string())
            .or_insert_with(ComponentHealth::healthy);
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);
        if health.status != ComponentStatus::Unhealthy {
            health.transition(ComponentStatus::Degraded, Some(message.into()));
        }
    }

    /// Take the component out of service until it is re-registered
    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        let mut components = self.components.write().await;
        components
            .entry(name.to_string())
            .or_insert_with(ComponentHealth::healthy)
            .transition(ComponentStatus::Unhealthy, Some(message.into()));
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Per-component health plus the worst status among them
    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = components
            .values()
            .map(|h| h.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        HealthResponse { status, components }
    }

    /// Ready once start-up finished and no component is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let reason = if !*self.ready.read().await {
            Some("start-up not finished".to_string())
        } else {
            self.components
                .read()
                .await
                .iter()
                .find(|(_, h)| h.status == ComponentStatus::Unhealthy)
                .map(|(name, _)| format!("{} unhealthy", name))
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registry_starts_empty_and_healthy() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_orchestrator_failures_degrade_until_success() {
        let registry = HealthRegistry::new();
        registry.register(components::CATALOG).await;
        registry.register(components::ORCHESTRATOR).await;

        registry
            .record_failure(components::ORCHESTRATOR, "launch failed")
            .await;
        registry
            .record_failure(components::ORCHESTRATOR, "node unreachable")
            .await;

        let health = registry.health().await;
        let orchestrator = &health.components[components::ORCHESTRATOR];
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(orchestrator.consecutive_failures, 2);
        assert_eq!(orchestrator.message.as_deref(), Some("node unreachable"));

        registry.record_success(components::ORCHESTRATOR).await;
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.components[components::ORCHESTRATOR].consecutive_failures, 0);
        assert!(health.components[components::ORCHESTRATOR].message.is_none());
    }

    #[tokio::test]
    async fn test_unhealthy_sticks_until_registered() {
        let registry = HealthRegistry::new();
        registry.set_unhealthy(components::CATALOG, "seed missing").await;
        registry.record_failure(components::CATALOG, "lookup failed").await;
        registry.record_failure(components::ORCHESTRATOR, "slow").await;

        registry.record_success(components::CATALOG).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert_eq!(
            health.components[components::CATALOG].message.as_deref(),
            Some("seed missing")
        );

        registry.register(components::CATALOG).await;
        let health = registry.health().await;
        assert_eq!(health.components[components::CATALOG].status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_since_only_moves_on_status_change() {
        let registry = HealthRegistry::new();
        registry.record_failure(components::ORCHESTRATOR, "a").await;
        let first = registry.health().await.components[components::ORCHESTRATOR].since;

        registry.record_failure(components::ORCHESTRATOR, "b").await;
        let second = registry.health().await.components[components::ORCHESTRATOR].since;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_readiness() {
        let registry = HealthRegistry::new();
        registry.register(components::CATALOG).await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("start-up not finished"));

        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);

        // degraded still serves
        registry.record_failure(components::CATALOG, "slow").await;
        assert!(registry.readiness().await.ready);

        registry.set_unhealthy(components::CATALOG, "Failed").await;
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("catalog unhealthy"));
    }
}
