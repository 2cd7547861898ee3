//! Anime detail renderer.
//!
//! Renders title, synopsis, facts, genres and the episode list. Series and
//! movies get different schema.org types and OG types.

use maud::{Markup, html};
use serde_json::{Map, Value, json};

use super::SiteInfo;
use super::components::{OpenGraphData, is_safe_url, page_shell, truncate};
use crate::payload::{AnimeDetail, slugify};

/// Episodes listed before the "+N más" notice.
pub const EPISODE_LIMIT: usize = 20;

/// Longest meta description, in bytes.
const DESCRIPTION_MAX: usize = 160;

/// Render an anime detail page.
pub fn render(detail: &AnimeDetail, canonical_path: &str, site: &SiteInfo) -> Markup {
    let canonical = site.url(canonical_path);
    let title = format!("{} - Ver Online | {}", detail.name, site.name);
    let fallback = format!("Ver {} online en {}.", detail.name, site.name);
    let overview = detail.overview.as_deref().unwrap_or(&fallback);
    let description = truncate(overview, DESCRIPTION_MAX);
    let poster = detail.poster.as_deref().filter(|p| is_safe_url(p));
    let structured = structured_data(detail, &canonical, &description, poster);

    let hidden_episodes = detail.episodes.len().saturating_sub(EPISODE_LIMIT);

    let body = html! {
        article class="detail" {
            @if let Some(poster) = poster {
                img src=(poster) alt=(detail.name);
            }
            div {
                h1 { (detail.name) }
                @if let Some(kind) = detail.kind.as_deref() {
                    span class="badge" { (kind) }
                }
                p class="overview" { (overview) }
                dl class="facts" {
                    @if let Some(kind) = detail.kind.as_deref() {
                        dt { "Tipo" } dd { (kind) }
                    }
                    @if let Some(status) = detail.status.as_deref() {
                        dt { "Estado" } dd { (status) }
                    }
                    @if let Some(aired) = detail.aired.as_deref() {
                        dt { "Estreno" } dd { (aired) }
                    }
                    @if let Some(rating) = detail.rating {
                        dt { "Puntuación" } dd { (format!("{rating:.1}")) }
                    }
                    @if !detail.episodes.is_empty() {
                        dt { "Episodios" } dd { (detail.episodes.len()) }
                    }
                }
                @if !detail.genres.is_empty() {
                    ul class="genres" {
                        @for genre in &detail.genres {
                            li {
                                @let slug = slugify(genre);
                                @if slug.is_empty() {
                                    span class="badge" { (genre) }
                                } @else {
                                    a class="badge" href={ "/generos/" (slug) } { (genre) }
                                }
                            }
                        }
                    }
                }
            }
        }
        @if !detail.episodes.is_empty() {
            section {
                h2 { "Episodios" }
                ol class="episodes" {
                    @for (index, episode) in detail.episodes.iter().take(EPISODE_LIMIT).enumerate() {
                        @let number = episode.number.clone().unwrap_or_else(|| (index + 1).to_string());
                        li {
                            "Episodio " (number)
                            @if let Some(ep_title) = episode.title.as_deref() {
                                ": " (ep_title)
                            }
                        }
                    }
                }
                @if hidden_episodes > 0 {
                    p class="more" { "+" (hidden_episodes) " más" }
                }
            }
        }
    };

    let og = OpenGraphData {
        title: &detail.name,
        description: &description,
        og_type: if detail.is_movie() { "video.movie" } else { "video.tv_show" },
        image: poster,
    };

    page_shell(
        &title,
        &description,
        &canonical,
        og,
        Some(&structured),
        body,
        &site.name,
    )
}

/// schema.org `Movie` or `TVSeries`. Unknown fields are left out rather
/// than emitted empty.
fn structured_data(
    detail: &AnimeDetail,
    canonical: &str,
    description: &str,
    poster: Option<&str>,
) -> Value {
    let mut data = Map::new();
    data.insert("@context".into(), json!("https://schema.org"));
    data.insert(
        "@type".into(),
        json!(if detail.is_movie() { "Movie" } else { "TVSeries" }),
    );
    data.insert("name".into(), json!(detail.name));
    data.insert("url".into(), json!(canonical));
    data.insert("description".into(), json!(description));
    data.insert("inLanguage".into(), json!("es"));

    if let Some(poster) = poster {
        data.insert("image".into(), json!(poster));
    }
    if !detail.genres.is_empty() {
        data.insert("genre".into(), json!(detail.genres));
    }
    if let Some(aired) = detail.aired.as_deref() {
        data.insert("datePublished".into(), json!(aired));
    }
    if let Some(rating) = detail.rating {
        data.insert(
            "aggregateRating".into(),
            json!({
                "@type": "AggregateRating",
                "ratingValue": rating,
                "bestRating": 10,
                "worstRating": 0,
            }),
        );
    }
    if !detail.is_movie() && !detail.episodes.is_empty() {
        data.insert("numberOfEpisodes".into(), json!(detail.episodes.len()));
    }

    Value::Object(data)
}
