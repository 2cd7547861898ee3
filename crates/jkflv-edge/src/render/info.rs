//! Static informational pages. Rendered without upstream data.

use maud::{Markup, html};

use super::SiteInfo;
use super::components::{OpenGraphData, page_shell};

/// Render a static page, or `None` for an unknown slug.
pub fn render(slug: &str, canonical_path: &str, site: &SiteInfo) -> Option<Markup> {
    let (heading, description, content) = page_content(slug, &site.name)?;
    let canonical = site.url(canonical_path);
    let title = format!("{heading} | {}", site.name);

    let body = html! {
        article {
            h1 { (heading) }
            (content)
        }
    };

    let og = OpenGraphData {
        title: &title,
        description: &description,
        og_type: "website",
        image: None,
    };

    Some(page_shell(
        &title,
        &description,
        &canonical,
        og,
        None,
        body,
        &site.name,
    ))
}

fn page_content(slug: &str, site_name: &str) -> Option<(&'static str, String, Markup)> {
    let page = match slug {
        "acerca" => (
            "Acerca de",
            format!("Qué es {site_name} y cómo funciona."),
            html! {
                p { (site_name) " es un índice de anime que enlaza a reproductores de terceros. "
                    "No alojamos ni transmitimos ningún archivo de video." }
                p { "El catálogo se actualiza automáticamente varias veces al día." }
            },
        ),
        "contacto" => (
            "Contacto",
            format!("Cómo ponerse en contacto con {site_name}."),
            html! {
                p { "Para consultas generales, sugerencias o reportes de enlaces rotos, "
                    "escríbenos a través del formulario de la aplicación." }
            },
        ),
        "privacidad" => (
            "Política de privacidad",
            format!("Política de privacidad de {site_name}."),
            html! {
                p { "No requerimos registro ni recopilamos datos personales. "
                    "El historial de reproducción se guarda únicamente en tu navegador." }
                p { "Los reproductores de terceros pueden aplicar sus propias políticas." }
            },
        ),
        "terminos" => (
            "Términos de uso",
            format!("Términos y condiciones de uso de {site_name}."),
            html! {
                p { "El contenido enlazado pertenece a sus respectivos propietarios. "
                    "El uso del sitio implica la aceptación de estos términos." }
            },
        ),
        "dmca" => (
            "DMCA",
            format!("Aviso DMCA y procedimiento de retirada de {site_name}."),
            html! {
                p { (site_name) " no aloja archivos. Si eres titular de derechos y deseas "
                    "retirar un enlace, envía una notificación con la URL exacta y la prueba de titularidad." }
            },
        ),
        _ => return None,
    };
    Some(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jkflv_core::STATIC_PAGES;

    fn site() -> SiteInfo {
        SiteInfo::new("https://jk.example", "JKAnime FLV")
    }

    #[test]
    fn every_static_page_renders() {
        for slug in STATIC_PAGES {
            let html = render(slug, &format!("/{slug}"), &site())
                .unwrap_or_else(|| panic!("no content for {slug}"))
                .into_string();
            assert!(html.contains("| JKAnime FLV</title>"), "{slug}");
            assert!(html.contains(&format!("https://jk.example/{slug}")));
        }
    }

    #[test]
    fn static_pages_have_no_json_ld() {
        let html = render("dmca", "/dmca", &site()).unwrap().into_string();
        assert!(!html.contains("application/ld+json"));
    }

    #[test]
    fn unknown_slug_is_none() {
        assert!(render("faq", "/faq", &site()).is_none());
    }
}
