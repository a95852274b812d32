//! Container orchestration service (jukeboxsvc) client
//!
//! Launches, pauses, resumes and stops session containers over HTTP.

use crate::error::JukeboxError;
use crate::models::{ContainerOp, LaunchResult, LaunchSpec, WsConn};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Connect timeout for every request
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
/// Total timeout for pause/resume/stop
const OP_TIMEOUT: Duration = Duration::from_secs(10);
/// Total timeout for a launch; container start-up is slow
const RUN_TIMEOUT: Duration = Duration::from_secs(55);

/// Session operations delegated to the orchestration service
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn run_container(&self, spec: &LaunchSpec) -> Result<LaunchResult, JukeboxError>;

    async fn pause_container(&self, container: &ContainerOp) -> Result<(), JukeboxError>;

    /// Resume may land on a different signalling server, hence the new `ws_conn`
    async fn resume_container(
        &self,
        container: &ContainerOp,
        ws_conn: &WsConn,
    ) -> Result<(), JukeboxError>;

    /// Fails with `ContainerNotFound` when the container is already gone
    async fn stop_container(&self, container: &ContainerOp) -> Result<(), JukeboxError>;
}

#[derive(Serialize)]
struct ResumeContainerRequest<'a> {
    ws_conn: &'a WsConn,
}

/// HTTP client for jukeboxsvc
pub struct JukeboxClient {
    client: Client,
    base_url: Url,
}

impl JukeboxClient {
    /// Create a new client for the given base URL
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid jukeboxsvc URL")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded as a single path segment
    fn url(&self, segments: &[&str]) -> Result<Url, JukeboxError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| JukeboxError::Service(format!("invalid jukeboxsvc url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn container_url(&self, container: &ContainerOp, op: &str) -> Result<Url, JukeboxError> {
        // dot segments would be dropped by the url builder and shift the route
        for id in [&container.node_id, &container.id] {
            if matches!(id.as_str(), "" | "." | "..") {
                return Err(JukeboxError::Service(format!(
                    "invalid container address: {:?}",
                    id
                )));
            }
        }
        self.url(&["nodes", container.node_id.as_str(), "containers", container.id.as_str(), op])
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, JukeboxError> {
        if response.status() == StatusCode::OK {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(JukeboxError::Service(body))
    }
}

#[async_trait]
impl Orchestrator for JukeboxClient {
    async fn run_container(&self, spec: &LaunchSpec) -> Result<LaunchResult, JukeboxError> {
        let url = self.url(&["containers", "run"])?;
        debug!(url = %url, "Dispatching container launch");

        let response = self
            .client
            .post(url)
            .json(spec)
            .timeout(RUN_TIMEOUT)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn pause_container(&self, container: &ContainerOp) -> Result<(), JukeboxError> {
        let url = self.container_url(container, "pause")?;
        let response = self.client.post(url).timeout(OP_TIMEOUT).send().await?;
        Self::check(response).await.map(|_| ())
    }

    async fn resume_container(
        &self,
        container: &ContainerOp,
        ws_conn: &WsConn,
    ) -> Result<(), JukeboxError> {
        let url = self.container_url(container, "resume")?;
        let response = self
            .client
            .post(url)
            .json(&ResumeContainerRequest { ws_conn })
            .timeout(OP_TIMEOUT)
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    async fn stop_container(&self, container: &ContainerOp) -> Result<(), JukeboxError> {
        let url = self.container_url(container, "stop")?;
        let response = self.client.post(url).timeout(OP_TIMEOUT).send().await?;

        if response.status() == StatusCode::GONE {
            let body = response.text().await.unwrap_or_default();
            return Err(JukeboxError::ContainerNotFound(body));
        }
        Self::check(response).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AppDescr, AppRequirements, ContainerSpecs, HardwareRequirements, Requirements, RunnerSpec,
        VideoEnc, WindowSystem,
    };
    use mockito::Matcher;
    use serde_json::json;

    fn container() -> ContainerOp {
        ContainerOp {
            id: "c-1".to_string(),
            node_id: "n-1".to_string(),
        }
    }

    fn spec() -> LaunchSpec {
        LaunchSpec {
            app_descr: AppDescr {
                slug: "kings-quest".to_string(),
                release_uuid: "7f1c2a5e-8a53-4c1a-9b3e-3f6f1c9d0a10".to_string(),
                platform: "win".to_string(),
            },
            reqs: Requirements {
                app: AppRequirements {
                    midi: false,
                    screen_height: 400,
                    screen_width: 640,
                    color_bits: 24,
                    loading_duration: None,
                },
                container: ContainerSpecs {
                    runner: RunnerSpec {
                        name: "wine".to_string(),
                        ver: "9.0".to_string(),
                        window_system: WindowSystem::X11,
                    },
                    video_enc: VideoEnc::Cpu,
                },
                hw: HardwareRequirements {
                    dgpu: false,
                    igpu: false,
                    memory: 1024,
                    memory_shared: None,
                    nanocpus: 1_000_000_000,
                },
            },
            user_id: 7,
            preferred_dcs: vec!["us-west-1".to_string()],
            ws_conn: WsConn {
                id: "ws-1".to_string(),
                consumer_id: "consumer-1".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_run_container_posts_spec() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/containers/run")
            .match_body(Matcher::PartialJson(json!({
                "user_id": 7,
                "preferred_dcs": ["us-west-1"],
                "reqs": {"container": {"video_enc": "cpu"}}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"container": {"id": "c-1"}, "node": {"id": "n-1", "region": "us-west-1"}}"#)
            .create_async()
            .await;

        let client = JukeboxClient::new(&server.url()).unwrap();
        let result = client.run_container(&spec()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.container.id, "c-1");
        assert_eq!(result.node.region, "us-west-1");
    }

    #[tokio::test]
    async fn test_run_container_failure_carries_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/containers/run")
            .with_status(409)
            .with_body("no free nodes")
            .create_async()
            .await;

        let client = JukeboxClient::new(&server.url()).unwrap();
        let err = client.run_container(&spec()).await.unwrap_err();
        assert!(matches!(err, JukeboxError::Service(ref m) if m == "no free nodes"));
    }

    #[tokio::test]
    async fn test_pause_and_resume_paths() {
        let mut server = mockito::Server::new_async().await;
        let pause = server
            .mock("POST", "/nodes/n-1/containers/c-1/pause")
            .with_status(200)
            .create_async()
            .await;
        let resume = server
            .mock("POST", "/nodes/n-1/containers/c-1/resume")
            .match_body(Matcher::Json(json!({
                "ws_conn": {"id": "ws-2", "consumer_id": "consumer-2"}
            })))
            .with_status(200)
            .create_async()
            .await;

        let client = JukeboxClient::new(&server.url()).unwrap();
        client.pause_container(&container()).await.unwrap();
        client
            .resume_container(
                &container(),
                &WsConn {
                    id: "ws-2".to_string(),
                    consumer_id: "consumer-2".to_string(),
                },
            )
            .await
            .unwrap();

        pause.assert_async().await;
        resume.assert_async().await;
    }

    #[tokio::test]
    async fn test_stop_gone_is_container_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/nodes/n-1/containers/c-1/stop")
            .with_status(410)
            .with_body("container not found")
            .create_async()
            .await;

        let client = JukeboxClient::new(&server.url()).unwrap();
        let err = client.stop_container(&container()).await.unwrap_err();
        assert!(matches!(err, JukeboxError::ContainerNotFound(_)));
    }

    #[tokio::test]
    async fn test_stop_other_failure_is_service_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/nodes/n-1/containers/c-1/stop")
            .with_status(500)
            .with_body("docker daemon down")
            .create_async()
            .await;

        let client = JukeboxClient::new(&server.url()).unwrap();
        let err = client.stop_container(&container()).await.unwrap_err();
        assert!(matches!(err, JukeboxError::Service(ref m) if m == "docker daemon down"));
    }

    #[tokio::test]
    async fn test_container_ids_stay_single_path_segments() {
        let mut server = mockito::Server::new_async().await;
        let run = server
            .mock("POST", "/containers/run")
            .expect(0)
            .create_async()
            .await;
        let pause = server
            .mock(
                "POST",
                Matcher::Regex(r"^/nodes/n-1/containers/[^/]+/pause$".to_string()),
            )
            .with_status(200)
            .create_async()
            .await;

        let client = JukeboxClient::new(&server.url()).unwrap();
        client
            .pause_container(&ContainerOp {
                id: "../../../containers/run?".to_string(),
                node_id: "n-1".to_string(),
            })
            .await
            .unwrap();

        pause.assert_async().await;
        run.assert_async().await;
    }

    #[tokio::test]
    async fn test_dot_segment_ids_are_rejected() {
        let mut server = mockito::Server::new_async().await;
        let any = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = JukeboxClient::new(&server.url()).unwrap();
        for (id, node_id) in [("..", "n-1"), ("c-1", "."), ("", "n-1")] {
            let err = client
                .stop_container(&ContainerOp {
                    id: id.to_string(),
                    node_id: node_id.to_string(),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, JukeboxError::Service(_)));
        }
        any.assert_async().await;
    }

    #[test]
    fn test_base_url_path_is_kept() {
        let client = JukeboxClient::new("http://jukebox:8080/api/").unwrap();
        let url = client.container_url(&container(), "stop").unwrap();
        assert_eq!(url.as_str(), "http://jukebox:8080/api/nodes/n-1/containers/c-1/stop");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(JukeboxClient::new("not a url").is_err());
    }
}
