//! Shared HTML components used across all snapshot pages.
//!
//! These are maud functions that return `Markup` fragments for composition
//! into full pages.

use maud::{Markup, PreEscaped, html};
use serde_json::Value;

use crate::payload::AnimeSummary;

/// Inline CSS for all snapshot pages.
///
/// Crawlers ignore most of it, but link previews and "view cached page"
/// tools render the document as-is.
pub const PAGE_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
:root{--bg:#0f0f14;--fg:#ececf1;--fg2:#a3a3b2;--accent:#ff5a1f;--surface:#191922;--border:rgba(255,90,31,.2)}
body{font-family:-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;line-height:1.6;color:var(--fg);background:var(--bg);padding:1.5rem 1rem}
header,main,footer{max-width:960px;margin:0 auto}
header{margin-bottom:1.5rem}
header a{font-weight:700;font-size:1.25rem;color:var(--accent);text-decoration:none}
a{color:var(--accent)}
h1{font-size:1.75rem;margin-bottom:.75rem}
h2{font-size:1.25rem;margin:1.5rem 0 .75rem}
.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(150px,1fr));gap:1rem;list-style:none}
.card a{display:block;color:var(--fg);text-decoration:none}
.card img{width:100%;aspect-ratio:2/3;object-fit:cover;border-radius:6px;background:var(--surface)}
.card span{display:block;font-size:.9rem;margin-top:.35rem}
.badge{display:inline-block;font-size:.75rem;padding:.1rem .5rem;border:1px solid var(--border);border-radius:100px;color:var(--fg2);text-transform:uppercase}
.detail{display:flex;gap:1.5rem;flex-wrap:wrap}
.detail img{width:220px;border-radius:8px}
.overview{color:var(--fg2);margin:1rem 0}
.facts{display:grid;grid-template-columns:max-content 1fr;gap:.25rem 1rem;font-size:.95rem}
.facts dt{color:var(--fg2)}
.genres{display:flex;gap:.5rem;flex-wrap:wrap;list-style:none;margin-top:1rem}
.episodes{list-style:none}
.episodes li{padding:.35rem 0;border-bottom:1px solid var(--border)}
.more{color:var(--fg2);margin-top:.5rem}
footer{margin-top:2rem;font-size:.85rem;color:var(--fg2)}
footer nav{display:flex;gap:1rem;flex-wrap:wrap}
"#;

/// Content-Security-Policy header value.
///
/// Allows inline styles and the inline redirect script. JSON-LD blocks are
/// data, not scripts, so they are unaffected.
pub const CSP_HEADER: &str = "default-src 'self'; style-src 'unsafe-inline'; script-src 'unsafe-inline'; img-src https: data:; form-action 'none'; frame-ancestors 'none'";

/// User-Agent regex (JavaScript syntax) that suppresses the client redirect.
const CLIENT_BOT_PATTERN: &str =
    "bot|crawler|spider|crawling|slurp|facebookexternalhit|whatsapp|telegram|embedly|preview";

/// Static pages linked from every footer: (slug, label).
const FOOTER_LINKS: &[(&str, &str)] = &[
    ("acerca", "Acerca de"),
    ("contacto", "Contacto"),
    ("privacidad", "Privacidad"),
    ("terminos", "Términos"),
    ("dmca", "DMCA"),
];

/// Open Graph metadata for a page.
pub struct OpenGraphData<'a> {
    /// OG title.
    pub title: &'a str,
    /// OG description.
    pub description: &'a str,
    /// OG type (e.g., "website", "video.movie", "video.tv_show").
    pub og_type: &'a str,
    /// OG image URL (must be HTTP(S)).
    pub image: Option<&'a str>,
}

impl OpenGraphData<'_> {
    fn twitter_card_type(&self) -> &'static str {
        if self.image.is_some() {
            "summary_large_image"
        } else {
            "summary"
        }
    }
}

/// Render the full HTML document: `<head>` with canonical link, OG and
/// Twitter tags, optional JSON-LD, then the body and the client redirect.
pub fn page_shell(
    title: &str,
    description: &str,
    canonical_url: &str,
    og: OpenGraphData<'_>,
    structured_data: Option<&Value>,
    body_content: Markup,
    site_name: &str,
) -> Markup {
    let image = og.image.filter(|url| is_safe_url(url));

    html! {
        (maud::DOCTYPE)
        html lang="es" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                meta name="description" content=(description);
                meta name="robots" content="index, follow";
                link rel="canonical" href=(canonical_url);

                // Open Graph
                meta property="og:title" content=(og.title);
                meta property="og:description" content=(og.description);
                meta property="og:url" content=(canonical_url);
                meta property="og:site_name" content=(site_name);
                meta property="og:type" content=(og.og_type);
                meta property="og:locale" content="es_ES";
                @if let Some(image) = image {
                    meta property="og:image" content=(image);
                }

                // Twitter Card
                meta name="twitter:card" content=(og.twitter_card_type());
                meta name="twitter:title" content=(og.title);
                meta name="twitter:description" content=(og.description);
                @if let Some(image) = image {
                    meta name="twitter:image" content=(image);
                }

                @if let Some(data) = structured_data {
                    script type="application/ld+json" { (PreEscaped(json_for_script(data))) }
                }

                style { (PreEscaped(PAGE_CSS)) }
            }
            body {
                header {
                    a href="/" { (site_name) }
                }
                main { (body_content) }
                footer {
                    nav {
                        @for (slug, label) in FOOTER_LINKS {
                            a href={ "/" (slug) } { (label) }
                        }
                    }
                }
                (redirect_script(canonical_url))
            }
        }
    }
}

/// Client-side redirect that sends human visitors to the SPA.
///
/// A snapshot is crawler-only content. If one reaches a browser (e.g. via a
/// shared CDN entry), it replaces itself with the canonical app URL once
/// per session.
pub fn redirect_script(canonical_url: &str) -> Markup {
    let target = json_for_script(&Value::String(canonical_url.to_string()));
    let script = format!(
        "(function(){{var ua=navigator.userAgent||\"\";if(/{CLIENT_BOT_PATTERN}/i.test(ua))return;\
var t={target};try{{if(sessionStorage.getItem(\"jkflv-spa\")===t)return;sessionStorage.setItem(\"jkflv-spa\",t);}}catch(e){{}}\
window.location.replace(t);}})();"
    );
    html! {
        script { (PreEscaped(script)) }
    }
}

/// Serialize JSON for embedding inside a `<script>` element.
///
/// `<`, `>` and `&` are emitted as unicode escapes so upstream text can
/// never close the element or open a comment. Line and paragraph
/// separators are escaped because JavaScript string literals reject them.
pub fn json_for_script(value: &Value) -> String {
    let json = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            other => out.push(other),
        }
    }
    out
}

/// Poster card linking to a title's detail page.
pub fn anime_card(item: &AnimeSummary) -> Markup {
    let href = item.id.as_deref().map(|id| format!("/anime/{id}"));
    let name = item.display_name();

    html! {
        li class="card" {
            a href=[href] {
                @if let Some(poster) = item.poster.as_deref().filter(|p| is_safe_url(p)) {
                    img src=(poster) alt=(name) loading="lazy";
                }
                span { (name) }
                @if let Some(kind) = item.kind.as_deref() {
                    span class="badge" { (kind) }
                }
            }
        }
    }
}

/// Grid of at most `limit` cards. Items without a usable id are skipped.
pub fn anime_grid<'a>(items: impl IntoIterator<Item = &'a AnimeSummary>, limit: usize) -> Markup {
    html! {
        ul class="grid" {
            @for item in items.into_iter().filter(|i| i.route().is_some()).take(limit) {
                (anime_card(item))
            }
        }
    }
}

/// Check if a URL is safe to use in `src` or `href` attributes.
pub fn is_safe_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Truncate a string to a maximum length, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        format!("{}...", s[..end].trim_end())
    }
}

/// Human label for a slug: `slice-of-life` → `Slice Of Life`.
pub fn title_case_slug(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
