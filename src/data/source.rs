//! Entity source adapters
//!
//! [`InMemoryEntityStore`] backs tests and the demo binary.
//! [`RestEntitySource`] talks to a PostgREST-style HTTP backend.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::sync::{Arc, Mutex};

use crate::core::config::BackendConfig;
use crate::data::entity::{GeoEntity, OwnerProfile, PostDraft, ValidPost};
use crate::prelude::HashMap;
use crate::services::HTTP_CLIENT;
use crate::traits::{EntitySource, EntityStore};
use crate::{MapError, Result};

const POST_COLUMNS: &str = "id,title,description,category_slug,lat,lng,created_at,user_id";

#[derive(Default)]
struct StoreState {
    posts: Vec<GeoEntity>,
    profiles: HashMap<String, String>,
    failing_fetches: usize,
    failing_profiles: bool,
    fetch_count: u64,
}

/// Process-local post store
#[derive(Clone, Default)]
pub struct InMemoryEntityStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(posts: Vec<GeoEntity>) -> Self {
        let store = Self::new();
        store.replace_all(posts);
        store
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| MapError::Source("store lock poisoned".to_string()))
    }

    /// Replaces the whole collection
    pub fn replace_all(&self, posts: Vec<GeoEntity>) {
        if let Ok(mut state) = self.state.lock() {
            state.posts = posts;
        }
    }

    pub fn set_profile(&self, owner_id: impl Into<String>, display_name: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.profiles.insert(owner_id.into(), display_name.into());
        }
    }

    /// Makes the next `count` fetches fail with a source error
    pub fn fail_next_fetches(&self, count: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_fetches = count;
        }
    }

    /// Toggles failure of the display-name lookup
    pub fn fail_profile_lookups(&self, failing: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_profiles = failing;
        }
    }

    /// Number of fetches served so far, failed ones included
    pub fn fetch_count(&self) -> u64 {
        self.state.lock().map(|s| s.fetch_count).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.posts.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn entity_from_valid(id: String, valid: ValidPost) -> GeoEntity {
    GeoEntity {
        id,
        title: valid.title,
        description: valid.description,
        category_slug: valid.category_slug,
        lat: valid.lat,
        lng: valid.lng,
        created_at: Utc::now(),
        owner_id: valid.owner_id,
        display_name: None,
    }
}

#[async_trait]
impl EntitySource for InMemoryEntityStore {
    async fn fetch_entities(&self) -> Result<Vec<GeoEntity>> {
        let mut state = self.lock()?;
        state.fetch_count += 1;
        if state.failing_fetches > 0 {
            state.failing_fetches -= 1;
            return Err(MapError::Source("simulated fetch failure".to_string()));
        }

        let mut posts = state.posts.clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn fetch_display_names(&self, owner_ids: &[String]) -> Result<Vec<OwnerProfile>> {
        let state = self.lock()?;
        if state.failing_profiles {
            return Err(MapError::Source("simulated profile lookup failure".to_string()));
        }

        Ok(owner_ids
            .iter()
            .filter_map(|id| {
                state.profiles.get(id).map(|name| OwnerProfile {
                    id: id.clone(),
                    display_name: name.clone(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn create(&self, draft: PostDraft) -> Result<GeoEntity> {
        let valid = draft.validate()?;
        let entity = entity_from_valid(uuid::Uuid::new_v4().to_string(), valid);

        self.lock()?.posts.insert(0, entity.clone());
        log::debug!("created post {}", entity.id);
        Ok(entity)
    }

    async fn update(&self, id: &str, draft: PostDraft) -> Result<GeoEntity> {
        let valid = draft.validate()?;
        let mut state = self.lock()?;
        let existing = state
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| MapError::NotFound(format!("post {id}")))?;

        existing.title = valid.title;
        existing.description = valid.description;
        existing.category_slug = valid.category_slug;
        existing.lat = valid.lat;
        existing.lng = valid.lng;
        Ok(existing.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.lock()?;
        let before = state.posts.len();
        state.posts.retain(|p| p.id != id);
        if state.posts.len() == before {
            return Err(MapError::NotFound(format!("post {id}")));
        }
        Ok(())
    }
}

/// PostgREST-style HTTP backend
#[derive(Clone)]
pub struct RestEntitySource {
    client: Client,
    config: BackendConfig,
}

impl RestEntitySource {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: HTTP_CLIENT.clone(),
            config,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.endpoint.trim_end_matches('/'), table)
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }
}

/// `in.(a,b,c)` filter value, ids quoted so commas inside them survive
pub(crate) fn in_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait]
impl EntitySource for RestEntitySource {
    async fn fetch_entities(&self) -> Result<Vec<GeoEntity>> {
        let posts = self
            .request(reqwest::Method::GET, "posts")
            .query(&[("select", POST_COLUMNS), ("order", "created_at.desc")])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<GeoEntity>>()
            .await?;
        Ok(posts)
    }

    async fn fetch_display_names(&self, owner_ids: &[String]) -> Result<Vec<OwnerProfile>> {
        if owner_ids.is_empty() {
            return Ok(Vec::new());
        }

        let profiles = self
            .request(reqwest::Method::GET, "profiles")
            .query(&[
                ("select", "user_id,display_name".to_string()),
                ("user_id", in_filter(owner_ids)),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<OwnerProfile>>()
            .await?;
        Ok(profiles)
    }
}

#[async_trait]
impl EntityStore for RestEntitySource {
    async fn create(&self, draft: PostDraft) -> Result<GeoEntity> {
        let valid = draft.validate()?;
        let mut rows = self
            .request(reqwest::Method::POST, "posts")
            .header("Prefer", "return=representation")
            .json(&valid)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<GeoEntity>>()
            .await?;
        rows.pop()
            .ok_or_else(|| MapError::Source("insert returned no rows".to_string()))
    }

    async fn update(&self, id: &str, draft: PostDraft) -> Result<GeoEntity> {
        let valid = draft.validate()?;
        let mut rows = self
            .request(reqwest::Method::PATCH, "posts")
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&valid)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<GeoEntity>>()
            .await?;
        rows.pop()
            .ok_or_else(|| MapError::NotFound(format!("post {id}")))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.request(reqwest::Method::DELETE, "posts")
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;
    use chrono::TimeZone;

    fn post_at(id: &str, minute: u32) -> GeoEntity {
        GeoEntity::new(id, id, "cafe", LatLng::new(38.24, 21.73))
            .with_created_at(Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap())
    }

    #[tokio::test]
    async fn test_fetch_is_newest_first() {
        let store = InMemoryEntityStore::with_posts(vec![
            post_at("old", 1),
            post_at("new", 30),
            post_at("mid", 15),
        ]);

        let ids: Vec<_> = store
            .fetch_entities()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = InMemoryEntityStore::with_posts(vec![post_at("a", 1)]);
        store.fail_next_fetches(1);

        assert!(store.fetch_entities().await.is_err());
        assert_eq!(store.fetch_entities().await.unwrap().len(), 1);
        assert_eq!(store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let store = InMemoryEntityStore::new();
        let created = store
            .create(PostDraft::new("Harbour", LatLng::new(38.25, 21.74)))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(created.category_slug, "other");

        let mut draft = PostDraft::new("Harbour at night", LatLng::new(38.26, 21.75));
        draft.category_slug = Some("view".to_string());
        let updated = store.update(&created.id, draft).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.category_slug, "view");

        store.delete(&created.id).await.unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            store.delete(&created.id).await,
            Err(MapError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_display_name_lookup() {
        let store = InMemoryEntityStore::new();
        store.set_profile("u1", "Eleni");

        let names = store
            .fetch_display_names(&["u1".to_string(), "u2".to_string()])
            .await
            .unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].display_name, "Eleni");

        store.fail_profile_lookups(true);
        assert!(store.fetch_display_names(&["u1".to_string()]).await.is_err());
    }

    #[test]
    fn test_in_filter_quotes_ids() {
        let ids = vec!["a".to_string(), "b,c".to_string()];
        assert_eq!(in_filter(&ids), "in.(\"a\",\"b,c\")");
    }
}
