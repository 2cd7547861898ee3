//! Genre listing renderer.

use maud::{Markup, html};
use serde_json::{Value, json};

use super::SiteInfo;
use super::components::{OpenGraphData, anime_grid, page_shell, title_case_slug};
use crate::payload::AnimeSummary;

/// Titles shown on a genre page.
pub const GENRE_LIMIT: usize = 12;

/// Render a genre listing page.
pub fn render(slug: &str, items: &[AnimeSummary], canonical_path: &str, site: &SiteInfo) -> Markup {
    let canonical = site.url(canonical_path);
    let genre = title_case_slug(slug);
    let title = format!("Anime de {genre} - Ver Online | {}", site.name);
    let description = format!(
        "Lista de anime del género {genre}: series y películas para ver online en {}.",
        site.name
    );

    let listed: Vec<&AnimeSummary> = items
        .iter()
        .filter(|item| item.route().is_some())
        .take(GENRE_LIMIT)
        .collect();

    let structured = json!({
        "@context": "https://schema.org",
        "@type": "CollectionPage",
        "name": format!("Anime de {genre}"),
        "url": canonical,
        "description": description,
        "inLanguage": "es",
        "mainEntity": {
            "@type": "ItemList",
            "numberOfItems": listed.len(),
            "itemListElement": listed
                .iter()
                .enumerate()
                .map(|(i, item)| list_element(i + 1, item, site))
                .collect::<Vec<_>>(),
        },
    });

    let body = html! {
        h1 { "Anime de " (genre) }
        @if listed.is_empty() {
            p { "No hay títulos disponibles en este género por ahora." }
        } @else {
            (anime_grid(listed.iter().copied(), GENRE_LIMIT))
        }
    };

    let og = OpenGraphData {
        title: &title,
        description: &description,
        og_type: "website",
        image: listed.iter().find_map(|item| item.poster.as_deref()),
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

fn list_element(position: usize, item: &AnimeSummary, site: &SiteInfo) -> Value {
    let path = item
        .id
        .as_deref()
        .map(|id| format!("/anime/{id}"))
        .unwrap_or_default();
    json!({
        "@type": "ListItem",
        "position": position,
        "name": item.display_name(),
        "url": site.url(&path),
    })
}
