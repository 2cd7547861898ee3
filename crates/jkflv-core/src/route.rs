//! Route classification and snapshot keys.
//!
//! Every inbound pathname is classified once into a [`RouteDescriptor`]. The
//! descriptor decides which renderer runs, which upstream endpoint is
//! called, and under which key the rendered snapshot is stored.

use serde::Serialize;

use crate::{Error, Result};

/// Static informational pages served without upstream data.
pub const STATIC_PAGES: &[&str] = &["acerca", "contacto", "privacidad", "terminos", "dmca"];

/// Longest id or slug accepted in a path segment.
const MAX_SEGMENT_LEN: usize = 128;

/// What kind of page a pathname refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "param", rename_all = "camelCase")]
pub enum RouteKind {
    /// `/`
    Home,
    /// `/anime/{id}`
    AnimeDetail(String),
    /// `/acerca`, `/contacto`, ...
    StaticInfoPage(String),
    /// `/generos/{slug}`
    GenreListing(String),
    /// Anything else: assets, client-only routes, garbage.
    Unknown,
}

impl RouteKind {
    /// Build an anime detail route from an upstream id, validating it.
    pub fn anime_detail(id: &str) -> Result<Self> {
        validate_segment(id).map(|id| Self::AnimeDetail(id.to_string()))
    }

    /// Build a genre listing route from a slug, validating it.
    pub fn genre_listing(slug: &str) -> Result<Self> {
        validate_segment(slug).map(|slug| Self::GenreListing(slug.to_string()))
    }
}

/// A classified inbound path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDescriptor {
    /// The pathname as received (without query string).
    pub pathname: String,
    /// The classification.
    pub kind: RouteKind,
}

impl RouteDescriptor {
    /// Classify a pathname.
    ///
    /// Trailing slashes are ignored; segments must match `[A-Za-z0-9_-]+`.
    pub fn from_path(pathname: &str) -> Self {
        let trimmed = pathname.trim_matches('/');
        let segments: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };

        let kind = match segments.as_slice() {
            [] => RouteKind::Home,
            ["anime", id] => RouteKind::anime_detail(id).unwrap_or(RouteKind::Unknown),
            ["generos" | "genero", slug] => {
                RouteKind::genre_listing(&slug.to_ascii_lowercase()).unwrap_or(RouteKind::Unknown)
            }
            [page] if STATIC_PAGES.contains(page) => RouteKind::StaticInfoPage(page.to_string()),
            _ => RouteKind::Unknown,
        };

        Self {
            pathname: pathname.to_string(),
            kind,
        }
    }

    /// Build a descriptor from an already-classified kind.
    pub fn from_kind(kind: RouteKind) -> Self {
        let mut descriptor = Self {
            pathname: String::new(),
            kind,
        };
        descriptor.pathname = descriptor.canonical_path();
        descriptor
    }

    /// Whether a snapshot can be rendered for this route.
    pub fn is_prerenderable(&self) -> bool {
        !matches!(self.kind, RouteKind::Unknown)
    }

    /// Deterministic snapshot store key, or `None` for unknown routes.
    pub fn snapshot_key(&self) -> Option<String> {
        match &self.kind {
            RouteKind::Home => Some("index".to_string()),
            RouteKind::AnimeDetail(id) => Some(format!("anime/{id}")),
            RouteKind::StaticInfoPage(slug) => Some(format!("pages/{slug}")),
            RouteKind::GenreListing(slug) => Some(format!("generos/{slug}")),
            RouteKind::Unknown => None,
        }
    }

    /// Canonical pathname used in `<link rel="canonical">` and sitemaps.
    pub fn canonical_path(&self) -> String {
        match &self.kind {
            RouteKind::Home => "/".to_string(),
            RouteKind::AnimeDetail(id) => format!("/anime/{id}"),
            RouteKind::StaticInfoPage(slug) => format!("/{slug}"),
            RouteKind::GenreListing(slug) => format!("/generos/{slug}"),
            RouteKind::Unknown => self.pathname.clone(),
        }
    }

    /// Freshness lifetime of this route's snapshot, in seconds.
    ///
    /// | Route | TTL |
    /// |-------|-----|
    /// | Home | 1 hour |
    /// | Genre listing | 6 hours |
    /// | Anime detail | 24 hours |
    /// | Static page | 7 days |
    pub fn ttl_seconds(&self) -> u64 {
        match self.kind {
            RouteKind::Home => 3600,
            RouteKind::GenreListing(_) => 6 * 3600,
            RouteKind::AnimeDetail(_) => 24 * 3600,
            RouteKind::StaticInfoPage(_) => 7 * 24 * 3600,
            RouteKind::Unknown => 0,
        }
    }
}

fn validate_segment(segment: &str) -> Result<&str> {
    let valid = !segment.is_empty()
        && segment.len() <= MAX_SEGMENT_LEN
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(segment)
    } else {
        Err(Error::InvalidSegment(segment.to_string()))
    }
}
