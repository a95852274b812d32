//! API client for the app service

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// Launches wait on container start-up, so stay above the server's own 55s budget
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// API client for the app service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse response")
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        check_status(self.send_post(path, body).await?)
            .await?
            .json()
            .await
            .context("Failed to parse response")
    }

    /// Make a POST request whose success response has no body
    pub async fn post_empty<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        check_status(self.send_post(path, body).await?).await?;
        Ok(())
    }

    async fn send_post<B: Serialize>(&self, path: &str, body: &B) -> Result<Response> {
        let url = self.base_url.join(path).context("Invalid path")?;

        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")
    }
}

/// Turn a non-success response into an error carrying the service's code and message
async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => anyhow::bail!("API error ({}, code {}): {}", status, err.code, err.message),
        Err(_) => anyhow::bail!("API error ({}): {}", status, body),
    }
}

// API request and response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerRef {
    pub name: String,
    #[serde(default)]
    pub ver: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRef {
    pub id: i64,
    #[serde(default)]
    pub developer: bool,
    #[serde(default)]
    pub publisher: bool,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgdbDescr {
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppReqs {
    pub screen_height: u32,
    pub screen_width: u32,
    #[serde(default)]
    pub color_bits: Option<u8>,
}

/// Release details; fields the CLI does not render pass through as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppReleaseDetails {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub lang: Option<String>,
    pub platform: Platform,
    #[serde(default)]
    pub year_released: Option<i32>,
    pub ts_added: String,
    pub app_reqs: AppReqs,
    pub runner: RunnerRef,
    #[serde(default)]
    pub companies: Vec<CompanyRef>,
    pub igdb: IgdbDescr,
    #[serde(default)]
    pub short_descr: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchAppsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher_name: Option<String>,
    pub kids_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchAppsItem {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub year_released: Option<i32>,
    pub platform: String,
    #[serde(default)]
    pub esrb_rating: Option<i32>,
    #[serde(default)]
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchAppsResponse {
    pub apps: Vec<SearchAppsItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchAppsAclRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    pub kids_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchAppsAclResponse {
    pub acl: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConn {
    pub id: String,
    pub consumer_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerOp {
    pub id: String,
    pub node_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunAppRequest {
    pub app_release_uuid: String,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_dcs: Option<Vec<String>>,
    pub ws_conn: WsConn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDescr {
    pub id: String,
    pub node_id: String,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunAppResponse {
    pub container: ContainerDescr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerRequest {
    pub container: ContainerOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeAppRequest {
    pub container: ContainerOp,
    pub ws_conn: WsConn,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn container() -> ContainerOp {
        ContainerOp {
            id: "c-1".to_string(),
            node_id: "n-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_search_posts_filters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/apps/search")
            .match_body(Matcher::PartialJson(json!({"app_name": "doom", "limit": 10})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"apps": [{"id": 3, "name": "Doom", "slug": "doom", "platform": "dos"}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let req = SearchAppsRequest {
            app_name: Some("doom".to_string()),
            limit: 10,
            ..Default::default()
        };
        let res: SearchAppsResponse = client.post("apps/search", &req).await.unwrap();

        mock.assert_async().await;
        assert_eq!(res.apps.len(), 1);
        assert_eq!(res.apps[0].slug, "doom");
    }

    #[tokio::test]
    async fn test_business_error_carries_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/apps/42")
            .with_status(409)
            .with_body(json!({"code": 1404, "message": "app release not found"}).to_string())
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .get::<AppReleaseDetails>("apps/42")
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("code 1404"), "{err}");
        assert!(err.contains("app release not found"), "{err}");
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/apps/pause")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .post_empty("apps/pause", &ContainerRequest { container: container() })
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("502"), "{err}");
        assert!(err.contains("bad gateway"), "{err}");
    }

    #[tokio::test]
    async fn test_post_empty_accepts_empty_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/apps/stop")
            .match_body(Matcher::Json(json!({"container": {"id": "c-1", "node_id": "n-1"}})))
            .with_status(200)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        client
            .post_empty("apps/stop", &ContainerRequest { container: container() })
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
