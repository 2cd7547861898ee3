//! Snapshot generation for crawler-facing pages.
//!
//! Each route kind has a renderer that produces a complete HTML document
//! with Open Graph tags and, where applicable, schema.org JSON-LD.
//!
//! All rendering uses [maud](https://maud.lambda.xyz/) for compile-time HTML
//! generation with automatic XSS protection (all dynamic values are escaped).

pub mod anime;
pub mod components;
pub mod genre;
pub mod home;
pub mod info;
pub mod shell;

use std::sync::Arc;
use std::time::Instant;

use jkflv_core::metrics::record_duration;
use jkflv_core::{ContentEnvelope, RouteDescriptor, RouteKind};
use serde_json::Value;

use crate::origin::{FetchOptions, Origin};
use crate::payload;

/// Public identity of the site, used in titles and absolute URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInfo {
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Display name.
    pub name: String,
}

impl SiteInfo {
    /// Build site info, stripping any trailing slash from `base_url`.
    pub fn new(base_url: impl Into<String>, name: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            name: name.into(),
        }
    }

    /// Absolute URL of a site-relative path.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

/// Upstream endpoint backing a route, if any.
pub fn endpoint_for(route: &RouteDescriptor) -> Option<String> {
    match &route.kind {
        RouteKind::Home => Some("anime/home".to_string()),
        RouteKind::AnimeDetail(id) => Some(format!("anime/detail/{id}")),
        RouteKind::GenreListing(slug) => Some(format!("anime/list?genre={slug}")),
        RouteKind::StaticInfoPage(_) | RouteKind::Unknown => None,
    }
}

/// Builds snapshot documents from upstream data.
pub struct Generator {
    origin: Arc<dyn Origin>,
    site: SiteInfo,
    options: FetchOptions,
}

impl Generator {
    /// Create a generator fetching through `origin`.
    pub fn new(origin: Arc<dyn Origin>, site: SiteInfo, options: FetchOptions) -> Self {
        Self {
            origin,
            site,
            options,
        }
    }

    /// Site identity used in rendered pages.
    pub fn site(&self) -> &SiteInfo {
        &self.site
    }

    /// Render the complete document for `route`.
    ///
    /// Returns `None` when the route is not prerenderable, the primary
    /// upstream call fails, or the payload carries nothing to render.
    pub async fn generate(&self, route: &RouteDescriptor) -> Option<String> {
        let started = Instant::now();
        let canonical_path = route.canonical_path();

        let markup = match &route.kind {
            RouteKind::Home => {
                let data = self.fetch(route).await?;
                home::render(&payload::home(&data), &self.site)
            }
            RouteKind::AnimeDetail(_) => {
                let data = self.fetch(route).await?;
                let Some(detail) = payload::anime_detail(&data) else {
                    tracing::debug!(path = %route.pathname, "detail payload has no title");
                    return None;
                };
                anime::render(&detail, &canonical_path, &self.site)
            }
            RouteKind::GenreListing(slug) => {
                let data = self.fetch(route).await?;
                genre::render(slug, &payload::anime_list(&data), &canonical_path, &self.site)
            }
            RouteKind::StaticInfoPage(slug) => info::render(slug, &canonical_path, &self.site)?,
            RouteKind::Unknown => return None,
        };

        record_duration(
            "prerender_generate_duration_seconds",
            started.elapsed().as_secs_f64(),
        );
        Some(markup.into_string())
    }

    async fn fetch(&self, route: &RouteDescriptor) -> Option<Value> {
        let endpoint = endpoint_for(route)?;
        match self.origin.fetch_json(&endpoint, self.options).await {
            ContentEnvelope::Ok(data) => Some(data),
            ContentEnvelope::Err(message) => {
                tracing::info!(
                    path = %route.pathname,
                    endpoint = %endpoint,
                    error = %message,
                    "snapshot generation skipped: upstream failure"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeOrigin;
    use serde_json::json;

    fn generator(origin: &Arc<FakeOrigin>) -> Generator {
        Generator::new(
            origin.clone(),
            SiteInfo::new("https://jk.example/", "JKAnime FLV"),
            FetchOptions::default(),
        )
    }

    #[tokio::test]
    async fn generate_anime_detail_scenario() {
        let origin = Arc::new(FakeOrigin::new());
        origin.respond(
            "anime/detail/42",
            json!({"msg": "succeed", "data": {"anime": {"id": 42, "name": "Demo", "type": "movie"}}}),
        );

        let html = generator(&origin)
            .generate(&RouteDescriptor::from_path("/anime/42"))
            .await
            .unwrap();

        assert!(html.contains("<title>Demo - Ver Online | JKAnime FLV</title>"));
        assert!(html.contains(r#""@type":"Movie""#));
        assert_eq!(origin.calls(), vec!["anime/detail/42"]);
    }

    #[tokio::test]
    async fn generate_returns_none_on_upstream_failure() {
        let origin = Arc::new(FakeOrigin::new());
        origin.fail("anime/home", "upstream returned status 500");
        origin.respond("anime/detail/1", json!({"result_code": 404, "msg": "not found"}));
        origin.respond("anime/list?genre=accion", json!({"error": "boom"}));

        let generator = generator(&origin);
        for path in ["/", "/anime/1", "/generos/accion", "/anime/unregistered"] {
            assert!(
                generator
                    .generate(&RouteDescriptor::from_path(path))
                    .await
                    .is_none(),
                "{path}"
            );
        }
    }

    #[tokio::test]
    async fn generate_detail_without_title_is_none() {
        let origin = Arc::new(FakeOrigin::new());
        origin.respond("anime/detail/5", json!({"msg": "succeed", "data": {"anime": {"id": 5}}}));
        let html = generator(&origin)
            .generate(&RouteDescriptor::from_path("/anime/5"))
            .await;
        assert!(html.is_none());
    }

    #[tokio::test]
    async fn generate_home_and_genre_endpoints() {
        let origin = Arc::new(FakeOrigin::new());
        origin.respond(
            "anime/home",
            json!({"result_code": 200, "data": {"latestMovies": [{"id": 1, "name": "Película Uno"}]}}),
        );
        origin.respond("anime/list?genre=comedia", json!([{"id": 2, "name": "Risa"}]));

        let generator = generator(&origin);
        let home = generator
            .generate(&RouteDescriptor::from_path("/"))
            .await
            .unwrap();
        assert!(home.contains("Película Uno"));
        assert!(home.contains(r#""@type":"WebSite""#));

        let genre = generator
            .generate(&RouteDescriptor::from_path("/genero/Comedia"))
            .await
            .unwrap();
        assert!(genre.contains("Risa"));
        assert!(genre.contains(r#"href="https://jk.example/generos/comedia""#));
    }

    #[tokio::test]
    async fn generate_static_page_without_upstream() {
        let origin = Arc::new(FakeOrigin::new());
        let html = generator(&origin)
            .generate(&RouteDescriptor::from_path("/privacidad"))
            .await
            .unwrap();
        assert!(html.contains("Política de privacidad"));
        assert!(origin.calls().is_empty());
    }

    #[tokio::test]
    async fn generate_unknown_route_is_none() {
        let origin = Arc::new(FakeOrigin::new());
        let html = generator(&origin)
            .generate(&RouteDescriptor::from_path("/assets/app.js"))
            .await;
        assert!(html.is_none());
        assert!(origin.calls().is_empty());
    }

    #[test]
    fn site_info_url() {
        let site = SiteInfo::new("https://jk.example/", "x");
        assert_eq!(site.url("/"), "https://jk.example/");
        assert_eq!(site.url("anime/1"), "https://jk.example/anime/1");
    }

    #[test]
    fn endpoints_per_route() {
        let endpoint = |p: &str| endpoint_for(&RouteDescriptor::from_path(p));
        assert_eq!(endpoint("/").as_deref(), Some("anime/home"));
        assert_eq!(endpoint("/anime/7").as_deref(), Some("anime/detail/7"));
        assert_eq!(
            endpoint("/generos/accion").as_deref(),
            Some("anime/list?genre=accion")
        );
        assert_eq!(endpoint("/dmca"), None);
    }
}
