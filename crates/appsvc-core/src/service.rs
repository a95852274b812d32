//! Catalog and session operations
//!
//! Entry points behind the HTTP API. Session operations are delegated to
//! the orchestration service; its failures surface as operational errors.

use crate::catalog::CatalogStore;
use crate::error::{AppError, JukeboxError};
use crate::health::{components, HealthRegistry};
use crate::jukebox::Orchestrator;
use crate::launch::LaunchRequestBuilder;
use crate::models::{
    AppReleaseDetails, ContainerDescr, PauseAppRequest, ResumeAppRequest, RunAppRequest,
    RunAppResponse, SearchAppsAclRequest, SearchAppsRequest, SearchAppsResponseItem,
    StopAppRequest, StopOutcome,
};
use crate::observability::{ops, outcomes, AppMetrics, StructuredLogger};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Catalog browsing and session lifecycle
pub struct AppService {
    catalog: Arc<dyn CatalogStore>,
    launcher: LaunchRequestBuilder,
    orchestrator: Arc<dyn Orchestrator>,
    health: HealthRegistry,
    metrics: AppMetrics,
    logger: StructuredLogger,
}

impl AppService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        launcher: LaunchRequestBuilder,
        orchestrator: Arc<dyn Orchestrator>,
        health: HealthRegistry,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            catalog,
            launcher,
            orchestrator,
            health,
            metrics: AppMetrics::new(),
            logger,
        }
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    pub async fn get_app_release(&self, id: &str) -> Result<AppReleaseDetails, AppError> {
        self.track_catalog(self.catalog.get_release(id).await.map_err(AppError::from))
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn search_apps(
        &self,
        req: &SearchAppsRequest,
    ) -> Result<Vec<SearchAppsResponseItem>, AppError> {
        self.track_catalog(self.catalog.search(req).await.map_err(AppError::from))
            .await
    }

    pub async fn search_apps_acl(&self, req: &SearchAppsAclRequest) -> Result<Vec<String>, AppError> {
        self.track_catalog(self.catalog.search_acl(req).await.map_err(AppError::from))
            .await
    }

    /// Launch a new session for a release
    pub async fn run_app(&self, req: &RunAppRequest) -> Result<RunAppResponse, AppError> {
        debug!(request = ?req, "run_app");
        let started = Instant::now();

        let spec = match self.track_catalog(self.launcher.build(req).await).await {
            Ok(spec) => spec,
            Err(e) => {
                if let AppError::ConfigurationDefect { runner } = &e {
                    error!(
                        runner = %runner,
                        release = %req.app_release_uuid,
                        "Release references an unconfigured runner"
                    );
                }
                self.metrics.inc_session_op(ops::RUN, outcome_label(&e));
                return Err(e);
            }
        };

        let launched = self.dispatch(ops::RUN, self.orchestrator.run_container(&spec)).await?;
        self.metrics
            .observe_launch_latency(started.elapsed().as_secs_f64());
        self.logger
            .log_launch(&spec, &launched.container.id, &launched.node.region);

        Ok(RunAppResponse {
            container: ContainerDescr {
                id: launched.container.id,
                node_id: launched.node.id,
                region: launched.node.region,
            },
        })
    }

    pub async fn pause_app(&self, req: &PauseAppRequest) -> Result<(), AppError> {
        debug!(request = ?req, "pause_app");
        self.dispatch(ops::PAUSE, self.orchestrator.pause_container(&req.container))
            .await
    }

    /// Resume a paused session; the client may have switched signalling servers
    pub async fn resume_app(&self, req: &ResumeAppRequest) -> Result<(), AppError> {
        debug!(request = ?req, "resume_app");
        self.dispatch(
            ops::RESUME,
            self.orchestrator
                .resume_container(&req.container, &req.ws_conn),
        )
        .await
    }

    /// Stop a session. Stopping a container that is already gone succeeds.
    pub async fn stop_app(&self, req: &StopAppRequest) -> Result<StopOutcome, AppError> {
        debug!(request = ?req, "stop_app");
        match self.orchestrator.stop_container(&req.container).await {
            Err(JukeboxError::ContainerNotFound(_)) => {
                self.logger
                    .log_already_stopped(&req.container.id, &req.container.node_id);
                self.metrics
                    .inc_session_op(ops::STOP, outcomes::ALREADY_STOPPED);
                Ok(StopOutcome::AlreadyStopped)
            }
            result => {
                self.dispatch(ops::STOP, async { result }).await?;
                Ok(StopOutcome::Stopped)
            }
        }
    }

    /// Record catalog health from a catalog-backed result. Only storage
    /// failures count against the catalog.
    async fn track_catalog<T>(&self, result: Result<T, AppError>) -> Result<T, AppError> {
        match &result {
            Err(e @ AppError::Catalog(_)) => {
                error!(error = %e, "Catalog lookup failed");
                self.health
                    .record_failure(components::CATALOG, e.to_string())
                    .await;
            }
            _ => self.health.record_success(components::CATALOG).await,
        }
        result
    }

    /// Await an orchestrator call, translating failures and tracking
    /// orchestrator health.
    async fn dispatch<T>(
        &self,
        op: &'static str,
        call: impl std::future::Future<Output = Result<T, JukeboxError>>,
    ) -> Result<T, AppError> {
        match call.await {
            Ok(value) => {
                self.metrics.inc_session_op(op, outcomes::OK);
                self.health.record_success(components::ORCHESTRATOR).await;
                info!(op, "Session operation completed");
                Ok(value)
            }
            Err(e) => {
                let err = AppError::from(e);
                error!(op, error = %err, "Session operation failed");
                self.metrics.inc_session_op(op, outcomes::OPERATIONAL_ERROR);
                self.health
                    .record_failure(components::ORCHESTRATOR, err.to_string())
                    .await;
                Err(err)
            }
        }
    }
}

fn outcome_label(e: &AppError) -> &'static str {
    match e {
        AppError::NotFound => outcomes::NOT_FOUND,
        AppError::ConfigurationDefect { .. } => outcomes::CONFIGURATION_DEFECT,
        AppError::Operational(_) => outcomes::OPERATIONAL_ERROR,
        AppError::Validation(_) | AppError::Catalog(_) => outcomes::ERROR,
    }
}
