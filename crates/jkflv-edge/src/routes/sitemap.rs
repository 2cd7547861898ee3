//! `GET /sitemap.xml` rendered from the refreshed sitemap entries.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use jkflv_core::{SITEMAP_DATA_KEY, SitemapEntry};
use maud::{Markup, PreEscaped, html};

use crate::error::EdgeError;
use crate::render::SiteInfo;
use crate::state::AppState;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Serve the sitemap derived by the last successful refresh.
pub async fn sitemap_xml(State(state): State<AppState>) -> Result<Response, EdgeError> {
    let Some(snapshot) = state.store.get(SITEMAP_DATA_KEY).await? else {
        return Err(EdgeError::NotFound("sitemap has not been generated yet".to_string()));
    };

    let entries: Vec<SitemapEntry> = serde_json::from_str(&snapshot.body)
        .map_err(|err| EdgeError::corrupt(SITEMAP_DATA_KEY, err))?;
    let xml = render_sitemap(&entries, state.site(), snapshot.created_at);

    Ok((
        [
            (header::CONTENT_TYPE, "application/xml; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        xml.into_string(),
    )
        .into_response())
}

/// Render entries as a sitemaps.org `urlset` with absolute URLs.
pub fn render_sitemap(entries: &[SitemapEntry], site: &SiteInfo, lastmod: DateTime<Utc>) -> Markup {
    let lastmod = lastmod.format("%Y-%m-%d").to_string();
    html! {
        (PreEscaped(XML_DECLARATION))
        urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9" {
            @for entry in entries {
                url {
                    loc { (site.url(&entry.path)) }
                    lastmod { (lastmod) }
                    changefreq { (entry.changefreq.as_str()) }
                    priority { (format!("{:.1}", entry.priority)) }
                }
            }
        }
    }
}
