//! Sitemap entries derived by the refresh job.

use serde::{Deserialize, Serialize};

use crate::RouteDescriptor;

/// How often a sitemap location is expected to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFreq {
    /// Home page.
    Hourly,
    /// Catalogue pages.
    Daily,
    /// Genre listings.
    Weekly,
    /// Static informational pages.
    Monthly,
}

impl ChangeFreq {
    /// Value for the `<changefreq>` element.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// One `<url>` of the sitemap. `path` is site-relative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapEntry {
    /// Site-relative path, always starting with `/`.
    pub path: String,
    /// Expected change frequency.
    pub changefreq: ChangeFreq,
    /// Relative priority in `0.0..=1.0`.
    pub priority: f32,
}

impl SitemapEntry {
    /// Entry for a classified route.
    pub fn for_route(route: &RouteDescriptor, changefreq: ChangeFreq, priority: f32) -> Self {
        Self {
            path: route.canonical_path(),
            changefreq,
            priority: priority.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RouteKind;

    #[test]
    fn test_for_route_uses_canonical_path() {
        let route = RouteDescriptor::from_path("/genero/accion/");
        let entry = SitemapEntry::for_route(&route, ChangeFreq::Weekly, 0.6);
        assert_eq!(entry.path, "/generos/accion");
        assert_eq!(entry.changefreq.as_str(), "weekly");
    }

    #[test]
    fn test_priority_is_clamped() {
        let route = RouteDescriptor::from_kind(RouteKind::Home);
        assert_eq!(SitemapEntry::for_route(&route, ChangeFreq::Hourly, 3.0).priority, 1.0);
        assert_eq!(SitemapEntry::for_route(&route, ChangeFreq::Hourly, -1.0).priority, 0.0);
    }

    #[test]
    fn test_serialized_form() {
        let route = RouteDescriptor::from_path("/anime/9");
        let entry = SitemapEntry::for_route(&route, ChangeFreq::Daily, 0.8);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["path"], "/anime/9");
        assert_eq!(json["changefreq"], "daily");
    }
}
