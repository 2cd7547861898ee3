//! Minimal fallback document for crawler requests with nothing to serve.

use maud::{DOCTYPE, Markup, html};

use super::SiteInfo;
use super::components::redirect_script;

/// A `noindex` shell returned with 404 when neither a snapshot nor fresh
/// data is available. Humans that land on it are sent to the app.
pub fn not_found(canonical_path: &str, site: &SiteInfo) -> Markup {
    let canonical = site.url(canonical_path);
    html! {
        (DOCTYPE)
        html lang="es" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Contenido no disponible | " (site.name) }
                meta name="robots" content="noindex";
                link rel="canonical" href=(canonical);
            }
            body {
                main {
                    h1 { "Contenido no disponible" }
                    p { "Este contenido no está disponible en este momento." }
                    a href="/" { "Volver a " (site.name) }
                }
                (redirect_script(&canonical))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_is_noindex() {
        let site = SiteInfo::new("https://jk.example", "JKAnime FLV");
        let html = not_found("/anime/404", &site).into_string();
        assert!(html.contains(r#"<meta name="robots" content="noindex">"#));
        assert!(html.contains("https://jk.example/anime/404"));
        assert!(!html.contains("og:title"));
    }
}
