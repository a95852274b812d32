//! Core data models for the app service
//!
//! Catalog records, session request/response payloads and the launch
//! request handed to the orchestration service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-user round-trip-time samples (seconds) keyed by data center id
pub type UserDcHistory = BTreeMap<String, Vec<f64>>;

/// Display server required by a runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowSystem {
    X11,
    Wayland,
}

/// Video encoder used by the streaming daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoEnc {
    GpuIntel,
    GpuNvidia,
    Cpu,
}

impl VideoEnc {
    /// Wire name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoEnc::GpuIntel => "gpu_intel",
            VideoEnc::GpuNvidia => "gpu_nvidia",
            VideoEnc::Cpu => "cpu",
        }
    }
}

/// Hardware requirement record shared by app, streaming daemon and runner
/// sources. Missing fields read as zero/false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HwReqs {
    pub dgpu: bool,
    pub igpu: bool,
    pub memory: u64,
    pub memory_shared: u64,
    pub nanocpus: u64,
}

/// Requirements declared by a catalog release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppReqs {
    #[serde(default)]
    pub midi: bool,
    pub screen_height: u32,
    pub screen_width: u32,
    #[serde(default)]
    pub color_bits: Option<u8>,
    #[serde(default)]
    pub loading_duration: Option<u32>,
    #[serde(default)]
    pub hw: HwReqs,
}

/// Runner reference on a release; unset fields fall back to runner config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerRef {
    pub name: String,
    #[serde(default)]
    pub ver: Option<String>,
    #[serde(default)]
    pub window_system: Option<WindowSystem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRef {
    pub id: i64,
    #[serde(default)]
    pub developer: bool,
    #[serde(default)]
    pub publisher: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverImage {
    pub image_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAssets {
    #[serde(default)]
    pub cover: Option<CoverImage>,
    #[serde(default)]
    pub screenshots: Vec<CoverImage>,
}

impl MediaAssets {
    pub fn cover_image_id(&self) -> Option<&str> {
        self.cover.as_ref().map(|c| c.image_id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distro {
    pub format: String,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgdbDescr {
    pub slug: String,
    #[serde(default)]
    pub id: Option<i64>,
}

/// Game-level record shared by all of its releases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub name: String,
    #[serde(default)]
    pub alternative_names: Vec<String>,
    #[serde(default)]
    pub esrb_rating: Option<i32>,
    pub igdb: IgdbDescr,
    #[serde(default)]
    pub short_descr: Option<String>,
    #[serde(default)]
    pub long_descr: Option<String>,
    #[serde(default)]
    pub media_assets: MediaAssets,
    #[serde(default)]
    pub addl_artifacts: serde_json::Value,
    #[serde(default)]
    pub refs: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A catalog release row joined with its game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRelease {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub is_visible: bool,
    #[serde(default)]
    pub lang: Option<String>,
    pub platform: Platform,
    #[serde(default)]
    pub year_released: Option<i32>,
    pub ts_added: chrono::DateTime<chrono::Utc>,
    pub app_reqs: AppReqs,
    pub runner: RunnerRef,
    pub distro: Distro,
    #[serde(default)]
    pub companies: Vec<CompanyRef>,
    #[serde(default)]
    pub media_assets: Option<MediaAssets>,
    pub game: Game,
}

/// Release details returned by the get endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppReleaseDetails {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub is_visible: bool,
    pub lang: Option<String>,
    pub platform: Platform,
    pub year_released: Option<i32>,
    pub ts_added: chrono::DateTime<chrono::Utc>,
    pub app_reqs: AppReqs,
    pub runner: RunnerRef,
    pub distro: Distro,
    pub companies: Vec<CompanyRef>,
    pub igdb: IgdbDescr,
    pub alternative_names: Vec<String>,
    pub esrb_rating: Option<i32>,
    pub short_descr: Option<String>,
    pub long_descr: Option<String>,
    pub media_assets: MediaAssets,
    pub media_assets_localized: Option<MediaAssets>,
    pub addl_artifacts: serde_json::Value,
    pub refs: BTreeMap<String, serde_json::Value>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchAppsOrderBy {
    #[default]
    Name,
    TsAdded,
    YearReleased,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchAppsRequest {
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub publisher_name: Option<String>,
    #[serde(default)]
    pub kids_mode: bool,
    #[serde(default)]
    pub order_by: SearchAppsOrderBy,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    50
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchAppsResponseItem {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub cover_image_id: Option<String>,
    pub esrb_rating: Option<i32>,
    pub lang: Option<String>,
    pub year_released: Option<i32>,
    pub platform: String,
    pub distro_format: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchAppsAclRequest {
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub kids_mode: bool,
}

/// Signalling connection the container should attach to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsConn {
    pub id: String,
    pub consumer_id: String,
}

/// Container handle used by pause/resume/stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerOp {
    pub id: String,
    pub node_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDescr {
    pub id: String,
    pub node_id: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAppRequest {
    pub app_release_uuid: String,
    pub user_id: i64,
    #[serde(default)]
    pub preferred_dcs: Option<Vec<String>>,
    pub ws_conn: WsConn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAppResponse {
    pub container: ContainerDescr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseAppRequest {
    pub container: ContainerOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeAppRequest {
    pub container: ContainerOp,
    pub ws_conn: WsConn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopAppRequest {
    pub container: ContainerOp,
}

/// Outcome of a stop request; a container that is already gone is not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    AlreadyStopped,
}

// Launch request sent to the orchestration service

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescr {
    pub slug: String,
    pub release_uuid: String,
    pub platform: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRequirements {
    pub midi: bool,
    pub screen_height: u32,
    pub screen_width: u32,
    pub color_bits: u8,
    pub loading_duration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerSpec {
    pub name: String,
    pub ver: String,
    pub window_system: WindowSystem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpecs {
    pub runner: RunnerSpec,
    pub video_enc: VideoEnc,
}

/// Reconciled hardware requirements for one launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareRequirements {
    pub dgpu: bool,
    pub igpu: bool,
    pub memory: u64,
    pub memory_shared: Option<u64>,
    pub nanocpus: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    pub app: AppRequirements,
    pub container: ContainerSpecs,
    pub hw: HardwareRequirements,
}

/// Complete launch request for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub app_descr: AppDescr,
    pub reqs: Requirements,
    pub user_id: i64,
    pub preferred_dcs: Vec<String>,
    pub ws_conn: WsConn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchedContainer {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchedNode {
    pub id: String,
    pub region: String,
}

/// Orchestration service reply to a launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchResult {
    pub container: LaunchedContainer,
    pub node: LaunchedNode,
}
