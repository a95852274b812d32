//! Core library for the app service
//!
//! This crate provides:
//! - Catalog models, lookup and search
//! - Data center preference ranking
//! - Hardware requirement reconciliation
//! - Launch request assembly and session lifecycle via the orchestration service
//! - Health checks and observability

pub mod catalog;
pub mod config;
pub mod error;
pub mod health;
pub mod jukebox;
pub mod launch;
pub mod models;
pub mod observability;
pub mod ranker;
pub mod reqs;
pub mod service;

pub use catalog::{CatalogStore, DcHistoryStore, MemoryCatalog};
pub use config::{RunnerConf, StaticConfig};
pub use error::{AppError, JukeboxError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use jukebox::{JukeboxClient, Orchestrator};
pub use launch::LaunchRequestBuilder;
pub use models::*;
pub use observability::{AppMetrics, StructuredLogger};
pub use ranker::rank_dcs;
pub use reqs::RequirementReconciler;
pub use service::AppService;
