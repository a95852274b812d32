//! Catalog storage
//!
//! Release lookup and search, plus the per-user data center latency
//! history. The shipped store is an in-memory catalog loaded from a JSON
//! seed file.

use crate::models::{
    AppRelease, AppReleaseDetails, Company, SearchAppsAclRequest, SearchAppsOrderBy,
    SearchAppsRequest, SearchAppsResponseItem, UserDcHistory,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

pub const APPS_SEARCH_LIMIT: usize = 200;
pub const APPS_ACL_SEARCH_LIMIT: usize = 25;
/// ESRB "Teen" rating id; kids mode keeps ratings below it
pub const ESRB_RATING_T_ID: i32 = 10;

/// Length of a release UUID in its canonical text form
const RELEASE_UUID_LEN: usize = 36;

/// Catalog lookups used by the service
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Resolve a visible release by UUID or numeric id
    async fn get_release(&self, id: &str) -> Result<Option<AppReleaseDetails>>;

    /// Search visible releases
    async fn search(&self, req: &SearchAppsRequest) -> Result<Vec<SearchAppsResponseItem>>;

    /// Release names for auto-complete
    async fn search_acl(&self, req: &SearchAppsAclRequest) -> Result<Vec<String>>;
}

/// Per-user latency history lookup
#[async_trait]
pub trait DcHistoryStore: Send + Sync {
    async fn history(&self, user_id: i64) -> Result<Option<UserDcHistory>>;
}

/// Latency history of one user as stored in the seed file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDcs {
    pub user_id: i64,
    pub dcs: UserDcHistory,
}

/// Seed file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub releases: Vec<AppRelease>,
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub users_dcs: Vec<UserDcs>,
}

/// In-memory catalog, immutable after load
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    releases: Vec<AppRelease>,
    companies: HashMap<i64, String>,
    users_dcs: HashMap<i64, UserDcHistory>,
}

impl MemoryCatalog {
    pub fn new(seed: CatalogSeed) -> Self {
        Self {
            releases: seed.releases,
            companies: seed.companies.into_iter().map(|c| (c.id, c.name)).collect(),
            users_dcs: seed
                .users_dcs
                .into_iter()
                .map(|u| (u.user_id, u.dcs))
                .collect(),
        }
    }

    /// Load the catalog from a JSON seed file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read catalog seed {}", path.display()))?;
        let seed: CatalogSeed =
            serde_json::from_str(&content).context("Failed to parse catalog seed")?;

        info!(
            path = %path.display(),
            releases = seed.releases.len(),
            users = seed.users_dcs.len(),
            "Catalog loaded"
        );
        Ok(Self::new(seed))
    }

    pub fn release_count(&self) -> usize {
        self.releases.len()
    }

    fn visible(&self) -> impl Iterator<Item = &AppRelease> {
        self.releases.iter().filter(|r| r.is_visible)
    }

    fn find_release(&self, id: &str) -> Option<&AppRelease> {
        // "human-readable" urls use the numeric release id instead of the uuid
        if id.len() == RELEASE_UUID_LEN {
            self.visible().find(|r| r.uuid == id)
        } else {
            let id: i64 = id.parse().ok()?;
            self.visible().find(|r| r.id == id)
        }
    }

    fn details(&self, r: &AppRelease) -> AppReleaseDetails {
        let companies = r
            .companies
            .iter()
            .map(|c| {
                let mut c = c.clone();
                c.name = self.companies.get(&c.id).cloned();
                c
            })
            .collect();

        AppReleaseDetails {
            id: r.id,
            uuid: r.uuid.clone(),
            name: r.name.clone(),
            is_visible: r.is_visible,
            lang: r.lang.clone(),
            platform: r.platform.clone(),
            year_released: r.year_released,
            ts_added: r.ts_added,
            app_reqs: r.app_reqs.clone(),
            runner: r.runner.clone(),
            distro: r.distro.clone(),
            companies,
            igdb: r.game.igdb.clone(),
            alternative_names: r.game.alternative_names.clone(),
            esrb_rating: r.game.esrb_rating,
            short_descr: r.game.short_descr.clone(),
            long_descr: r.game.long_descr.clone(),
            media_assets: r.game.media_assets.clone(),
            media_assets_localized: r.media_assets.clone(),
            addl_artifacts: r.game.addl_artifacts.clone(),
            refs: normalize_refs(&r.game.refs),
            tags: r.game.tags.clone(),
        }
    }

    fn has_publisher(&self, r: &AppRelease, mask: &str) -> bool {
        r.companies.iter().filter(|c| c.publisher).any(|c| {
            self.companies
                .get(&c.id)
                .is_some_and(|name| contains_ci(name, mask))
        })
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn get_release(&self, id: &str) -> Result<Option<AppReleaseDetails>> {
        Ok(self.find_release(id).map(|r| self.details(r)))
    }

    async fn search(&self, req: &SearchAppsRequest) -> Result<Vec<SearchAppsResponseItem>> {
        let mut hits: Vec<&AppRelease> = self
            .visible()
            .filter(|r| {
                req.app_name
                    .as_deref()
                    .map_or(true, |mask| matches_app_name(r, mask))
            })
            .filter(|r| !req.kids_mode || is_kids_friendly(r))
            .filter(|r| {
                req.publisher_name
                    .as_deref()
                    .map_or(true, |mask| self.has_publisher(r, mask))
            })
            .collect();

        match req.order_by {
            SearchAppsOrderBy::Name => hits.sort_by(|a, b| a.name.cmp(&b.name)),
            SearchAppsOrderBy::TsAdded => hits.sort_by(|a, b| b.ts_added.cmp(&a.ts_added)),
            SearchAppsOrderBy::YearReleased => hits.sort_by(|a, b| {
                b.year_released
                    .cmp(&a.year_released)
                    .then_with(|| b.ts_added.cmp(&a.ts_added))
            }),
        }

        Ok(hits
            .into_iter()
            .skip(req.offset)
            .take(req.limit.min(APPS_SEARCH_LIMIT))
            .map(search_item)
            .collect())
    }

    async fn search_acl(&self, req: &SearchAppsAclRequest) -> Result<Vec<String>> {
        Ok(self
            .visible()
            .filter(|r| {
                req.app_name
                    .as_deref()
                    .map_or(true, |mask| contains_ci(&r.name, mask))
            })
            .filter(|r| !req.kids_mode || is_kids_friendly(r))
            .take(APPS_ACL_SEARCH_LIMIT)
            .map(|r| r.name.clone())
            .collect())
    }
}

#[async_trait]
impl DcHistoryStore for MemoryCatalog {
    async fn history(&self, user_id: i64) -> Result<Option<UserDcHistory>> {
        Ok(self.users_dcs.get(&user_id).cloned())
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches_app_name(r: &AppRelease, mask: &str) -> bool {
    contains_ci(&r.name, mask)
        || contains_ci(&r.game.name, mask)
        || contains_ci(&r.game.alternative_names.join(","), mask)
}

fn is_kids_friendly(r: &AppRelease) -> bool {
    r.game
        .esrb_rating
        .map_or(true, |rating| rating < ESRB_RATING_T_ID)
}

fn search_item(r: &AppRelease) -> SearchAppsResponseItem {
    let cover_image_id = r
        .media_assets
        .as_ref()
        .and_then(|m| m.cover_image_id())
        .or_else(|| r.game.media_assets.cover_image_id())
        .map(str::to_string);

    SearchAppsResponseItem {
        id: r.id,
        name: r.name.clone(),
        slug: r.game.igdb.slug.clone(),
        cover_image_id,
        esrb_rating: r.game.esrb_rating,
        lang: r.lang.clone(),
        year_released: r.year_released,
        platform: r.platform.slug.clone(),
        distro_format: r.distro.format.clone(),
        tags: r.game.tags.clone(),
    }
}

/// Placeholder reference values (`-1`, `""`) become null
fn normalize_refs(
    refs: &std::collections::BTreeMap<String, serde_json::Value>,
) -> std::collections::BTreeMap<String, serde_json::Value> {
    refs.iter()
        .map(|(k, v)| {
            let placeholder = v.as_i64() == Some(-1) || v.as_str() == Some("");
            let v = if placeholder {
                serde_json::Value::Null
            } else {
                v.clone()
            };
            (k.clone(), v)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn seed() -> CatalogSeed {
        serde_json::from_value(json!({
            "companies": [
                {"id": 1, "name": "Sierra On-Line"},
                {"id": 2, "name": "LucasArts"}
            ],
            "releases": [
                {
                    "id": 10,
                    "uuid": "7f1c2a5e-8a53-4c1a-9b3e-3f6f1c9d0a10",
                    "name": "King's Quest",
                    "is_visible": true,
                    "lang": "en",
                    "platform": {"slug": "win"},
                    "year_released": 1984,
                    "ts_added": "2024-01-01T00:00:00Z",
                    "app_reqs": {"screen_height": 200, "screen_width": 320, "color_bits": 16},
                    "runner": {"name": "wine"},
                    "distro": {"format": "zip"},
                    "companies": [{"id": 1, "publisher": true}],
                    "game": {
                        "name": "King's Quest I",
                        "alternative_names": ["Quest for the Crown"],
                        "esrb_rating": 8,
                        "igdb": {"slug": "kings-quest"},
                        "media_assets": {"cover": {"image_id": "game-cover"}},
                        "refs": {"mobygames": -1, "wikipedia": "", "gog": "kq1"}
                    }
                },
                {
                    "id": 11,
                    "uuid": "7f1c2a5e-8a53-4c1a-9b3e-3f6f1c9d0a11",
                    "name": "Full Throttle",
                    "is_visible": true,
                    "platform": {"slug": "dos"},
                    "year_released": 1995,
                    "ts_added": "2024-03-01T00:00:00Z",
                    "app_reqs": {"screen_height": 480, "screen_width": 640},
                    "runner": {"name": "dosbox", "ver": "0.74"},
                    "distro": {"format": "iso"},
                    "companies": [{"id": 2, "publisher": true}],
                    "media_assets": {"cover": {"image_id": "release-cover"}},
                    "game": {
                        "name": "Full Throttle",
                        "esrb_rating": 11,
                        "igdb": {"slug": "full-throttle"}
                    }
                },
                {
                    "id": 12,
                    "uuid": "7f1c2a5e-8a53-4c1a-9b3e-3f6f1c9d0a12",
                    "name": "Hidden Beta",
                    "is_visible": false,
                    "platform": {"slug": "dos"},
                    "ts_added": "2024-04-01T00:00:00Z",
                    "app_reqs": {"screen_height": 480, "screen_width": 640},
                    "runner": {"name": "dosbox"},
                    "distro": {"format": "zip"},
                    "game": {"name": "Hidden Beta", "igdb": {"slug": "hidden-beta"}}
                }
            ],
            "users_dcs": [
                {"user_id": 7, "dcs": {"us-west-1": [1.0, 1.3]}}
            ]
        }))
        .unwrap()
    }

    fn search_req() -> SearchAppsRequest {
        SearchAppsRequest {
            app_name: None,
            publisher_name: None,
            kids_mode: false,
            order_by: SearchAppsOrderBy::Name,
            offset: 0,
            limit: 50,
        }
    }

    #[tokio::test]
    async fn test_get_release_by_uuid_and_numeric_id() {
        let catalog = MemoryCatalog::new(seed());

        let by_uuid = catalog
            .get_release("7f1c2a5e-8a53-4c1a-9b3e-3f6f1c9d0a10")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_uuid.name, "King's Quest");

        let by_id = catalog.get_release("11").await.unwrap().unwrap();
        assert_eq!(by_id.name, "Full Throttle");

        assert!(catalog.get_release("not-an-id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invisible_release_is_not_found() {
        let catalog = MemoryCatalog::new(seed());
        assert!(catalog.get_release("12").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_details_fill_company_names_and_normalize_refs() {
        let catalog = MemoryCatalog::new(seed());
        let details = catalog.get_release("10").await.unwrap().unwrap();

        assert_eq!(details.companies[0].name.as_deref(), Some("Sierra On-Line"));
        assert_eq!(details.refs["mobygames"], serde_json::Value::Null);
        assert_eq!(details.refs["wikipedia"], serde_json::Value::Null);
        assert_eq!(details.refs["gog"], json!("kq1"));
    }

    #[tokio::test]
    async fn test_search_by_name_matches_alternative_names() {
        let catalog = MemoryCatalog::new(seed());
        let mut req = search_req();
        req.app_name = Some("crown".to_string());

        let hits = catalog.search(&req).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].slug, "kings-quest");
        assert_eq!(hits[0].cover_image_id.as_deref(), Some("game-cover"));
    }

    #[tokio::test]
    async fn test_search_kids_mode_and_ordering() {
        let catalog = MemoryCatalog::new(seed());

        let mut req = search_req();
        let names: Vec<String> = catalog
            .search(&req)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Full Throttle", "King's Quest"]);

        req.order_by = SearchAppsOrderBy::YearReleased;
        let hits = catalog.search(&req).await.unwrap();
        assert_eq!(hits[0].name, "Full Throttle");
        assert_eq!(hits[0].cover_image_id.as_deref(), Some("release-cover"));

        req.kids_mode = true;
        let hits = catalog.search(&req).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "King's Quest");
    }

    #[tokio::test]
    async fn test_search_by_publisher_and_paging() {
        let catalog = MemoryCatalog::new(seed());

        let mut req = search_req();
        req.publisher_name = Some("lucas".to_string());
        let hits = catalog.search(&req).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Full Throttle");

        let mut req = search_req();
        req.offset = 1;
        req.limit = 1;
        let hits = catalog.search(&req).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "King's Quest");
    }

    #[tokio::test]
    async fn test_search_acl() {
        let catalog = MemoryCatalog::new(seed());
        let names = catalog
            .search_acl(&SearchAppsAclRequest {
                app_name: Some("QUEST".to_string()),
                kids_mode: false,
            })
            .await
            .unwrap();
        assert_eq!(names, vec!["King's Quest"]);
    }

    #[tokio::test]
    async fn test_history_lookup() {
        let catalog = MemoryCatalog::new(seed());
        let history = catalog.history(7).await.unwrap().unwrap();
        assert_eq!(history["us-west-1"], vec![1.0, 1.3]);
        assert!(catalog.history(8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&seed()).unwrap()).unwrap();

        let catalog = MemoryCatalog::load(file.path()).await.unwrap();
        assert_eq!(catalog.release_count(), 3);
    }

    #[tokio::test]
    async fn test_load_rejects_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = MemoryCatalog::load(&dir.path().join("missing.json")).await;
        tokio_test::assert_err!(result);
    }
}
