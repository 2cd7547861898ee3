//! Home page renderer.

use maud::{Markup, html};
use serde_json::json;

use super::SiteInfo;
use super::components::{OpenGraphData, anime_grid, page_shell};
use crate::payload::HomePayload;

/// Titles shown per home section.
pub const SECTION_LIMIT: usize = 10;

/// Render the home page: latest movies and latest series.
pub fn render(home: &HomePayload, site: &SiteInfo) -> Markup {
    let canonical = site.url("/");
    let title = format!("{} - Ver Anime Online Gratis en HD", site.name);
    let description = format!(
        "Ve anime online gratis en {}. Últimas películas y series, episodios en español y subtitulados.",
        site.name
    );

    let structured = json!({
        "@context": "https://schema.org",
        "@type": "WebSite",
        "name": site.name,
        "url": canonical,
        "inLanguage": "es",
        "potentialAction": {
            "@type": "SearchAction",
            "target": format!("{}/buscar?q={{search_term_string}}", site.base_url),
            "query-input": "required name=search_term_string",
        },
    });

    let body = html! {
        h1 { (title) }
        @if !home.latest_movies.is_empty() {
            section {
                h2 { "Últimas películas" }
                (anime_grid(&home.latest_movies, SECTION_LIMIT))
            }
        }
        @if !home.latest_series.is_empty() {
            section {
                h2 { "Últimas series" }
                (anime_grid(&home.latest_series, SECTION_LIMIT))
            }
        }
    };

    let og = OpenGraphData {
        title: &title,
        description: &description,
        og_type: "website",
        image: home.all_items().find_map(|item| item.poster.as_deref()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload;

    fn site() -> SiteInfo {
        SiteInfo::new("https://jk.example", "JKAnime FLV")
    }

    #[test]
    fn home_caps_each_section() {
        let items: Vec<_> = (0..25)
            .map(|i| json!({"id": i, "name": format!("Título {i}")}))
            .collect();
        let data = json!({"latestMovies": items, "latestSeries": items});
        let html = render(&payload::home(&data), &site()).into_string();

        assert_eq!(html.matches("class=\"card\"").count(), 2 * SECTION_LIMIT);
        assert!(html.contains("Título 9"));
        assert!(!html.contains("Título 10<"));
    }

    #[test]
    fn home_structured_data_is_website_with_search() {
        let html = render(&HomePayload::default(), &site()).into_string();
        assert!(html.contains(r#""@type":"WebSite""#));
        assert!(html.contains(r#""@type":"SearchAction""#));
        assert!(html.contains("https://jk.example/buscar?q={search_term_string}"));
        assert!(html.contains(r#"<link rel="canonical" href="https://jk.example/">"#));
    }

    #[test]
    fn home_omits_empty_sections() {
        let data = json!({"latestSeries": [{"id": 1, "name": "Solo serie"}]});
        let html = render(&payload::home(&data), &site()).into_string();
        assert!(!html.contains("Últimas películas"));
        assert!(html.contains("Últimas series"));
    }
}
