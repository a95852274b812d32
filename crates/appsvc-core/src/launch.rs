//! Launch request assembly
//!
//! Turns a run request into the complete launch specification sent to the
//! orchestration service: release lookup, runner resolution, data center
//! ranking and requirement reconciliation.

use crate::catalog::{CatalogStore, DcHistoryStore};
use crate::config::{RunnerConf, StaticConfig};
use crate::error::AppError;
use crate::models::{
    AppDescr, AppReleaseDetails, AppRequirements, ContainerSpecs, LaunchSpec, Requirements,
    RunAppRequest, RunnerSpec,
};
use crate::ranker::rank_dcs;
use crate::reqs::{
    clamp_color_bits, fit_screen, select_video_enc, RequirementReconciler, DEFAULT_APP_REQ_MIDI,
};
use std::sync::Arc;
use tracing::debug;

/// Assembles launch specifications from catalog data and static config
pub struct LaunchRequestBuilder {
    config: Arc<StaticConfig>,
    catalog: Arc<dyn CatalogStore>,
    history: Arc<dyn DcHistoryStore>,
    reconciler: RequirementReconciler,
}

impl LaunchRequestBuilder {
    pub fn new(
        config: Arc<StaticConfig>,
        catalog: Arc<dyn CatalogStore>,
        history: Arc<dyn DcHistoryStore>,
    ) -> Self {
        Self {
            config,
            catalog,
            history,
            reconciler: RequirementReconciler::default(),
        }
    }

    /// Replace the default requirement reconciler
    pub fn with_reconciler(mut self, reconciler: RequirementReconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    /// Data centers for a user, fastest first
    pub async fn preferred_dcs(&self, user_id: i64) -> Result<Vec<String>, AppError> {
        let history = self.history.history(user_id).await?;
        let ranked = rank_dcs(history.as_ref(), &self.config.known_dcs);
        debug!(user_id, preferred_dcs = ?ranked, "Ranked data centers");
        Ok(ranked)
    }

    /// Build the launch specification for a run request
    pub async fn build(&self, req: &RunAppRequest) -> Result<LaunchSpec, AppError> {
        let release = self
            .catalog
            .get_release(&req.app_release_uuid)
            .await?
            .ok_or(AppError::NotFound)?;

        // fail on a missing runner entry before touching latency history
        let runner_conf = self.config.runner(&release.runner.name)?;

        // TODO: preferred DCs sent by the client are trusted as-is; validate against known_dcs
        let preferred_dcs = match &req.preferred_dcs {
            Some(dcs) if !dcs.is_empty() => dcs.clone(),
            _ => self.preferred_dcs(req.user_id).await?,
        };

        Ok(self.assemble(&release, runner_conf, req, preferred_dcs))
    }

    fn assemble(
        &self,
        release: &AppReleaseDetails,
        runner_conf: &RunnerConf,
        req: &RunAppRequest,
        preferred_dcs: Vec<String>,
    ) -> LaunchSpec {
        let runner_name = release.runner.name.as_str();

        let runner_ver = release
            .runner
            .ver
            .clone()
            .unwrap_or_else(|| runner_conf.ver.clone());
        let window_system = release
            .runner
            .window_system
            .unwrap_or(runner_conf.window_system);

        let app_reqs = &release.app_reqs;
        let (screen_height, screen_width) = fit_screen(app_reqs.screen_height, app_reqs.screen_width);
        let color_bits = clamp_color_bits(app_reqs.color_bits, runner_name);

        let hw = self
            .reconciler
            .reconcile(&app_reqs.hw, &self.config.streamd_reqs, &runner_conf.hw);

        LaunchSpec {
            app_descr: AppDescr {
                slug: release.igdb.slug.clone(),
                release_uuid: release.uuid.clone(),
                platform: release.platform.slug.clone(),
            },
            reqs: Requirements {
                app: AppRequirements {
                    midi: app_reqs.midi || DEFAULT_APP_REQ_MIDI,
                    screen_height,
                    screen_width,
                    color_bits,
                    loading_duration: app_reqs.loading_duration,
                },
                container: ContainerSpecs {
                    runner: RunnerSpec {
                        name: runner_name.to_string(),
                        ver: runner_ver,
                        window_system,
                    },
                    video_enc: select_video_enc(&self.config.streamd_reqs),
                },
                hw,
            },
            user_id: req.user_id,
            preferred_dcs,
            ws_conn: req.ws_conn.clone(),
        }
    }
}
