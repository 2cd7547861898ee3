//! Lenient views over upstream content payloads.
//!
//! The content API has renamed fields over time (`name`/`title`,
//! `latestMovies`/`latest_movies`, numeric or string ids) and nests detail
//! payloads inconsistently. Objects often carry several of the synonyms at
//! once, so fields are looked up by key in priority order rather than through
//! serde aliases. A bad field never rejects the whole payload: unparseable
//! values become `None` or are skipped.

use jkflv_core::RouteKind;
use serde::Serialize;
use serde_json::{Map, Value};

type Object = Map<String, Value>;

/// One title in a listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnimeSummary {
    /// Upstream id (numeric ids are stringified).
    pub id: Option<String>,
    /// Display title.
    pub name: Option<String>,
    /// Poster image URL.
    pub poster: Option<String>,
    /// `movie`, `tv`, `ova`, ...
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl AnimeSummary {
    /// Parse one listing item. Non-objects yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            id: first_text(obj, &["id", "slug", "anime_id"]),
            name: first_text(obj, &["name", "title"]),
            poster: first_text(obj, &["poster", "image", "cover"]),
            kind: first_text(obj, &["type", "kind"]),
        })
    }

    /// Title to show, with a placeholder for untitled entries.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Sin título")
    }

    /// Detail route for this title, if its id is usable in a path.
    pub fn route(&self) -> Option<RouteKind> {
        self.id
            .as_deref()
            .and_then(|id| RouteKind::anime_detail(id).ok())
    }
}

/// One episode line of a detail page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Episode {
    /// Upstream episode id.
    pub id: Option<String>,
    /// Episode number as displayed.
    pub number: Option<String>,
    /// Episode title.
    pub title: Option<String>,
}

impl Episode {
    /// Parse one episode. Bare numbers are accepted as episode numbers.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(obj) => Some(Self {
                id: first_text(obj, &["id", "episode_id"]),
                number: first_text(obj, &["number", "episode", "num"]),
                title: first_text(obj, &["title", "name"]),
            }),
            Value::Number(n) => Some(Self {
                number: Some(n.to_string()),
                ..Default::default()
            }),
            _ => None,
        }
    }
}

/// A full title record from `anime/detail/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnimeDetail {
    /// Upstream id.
    pub id: Option<String>,
    /// Display title. Always present on parsed details.
    pub name: String,
    /// Synopsis.
    pub overview: Option<String>,
    /// Poster image URL.
    pub poster: Option<String>,
    /// `movie`, `tv`, ...
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Airing status.
    pub status: Option<String>,
    /// Premiere date or year.
    pub aired: Option<String>,
    /// Genres, from a comma-delimited string or an array.
    pub genres: Vec<String>,
    /// Score, only when numeric and finite.
    pub rating: Option<f64>,
    /// Episode list.
    pub episodes: Vec<Episode>,
}

impl AnimeDetail {
    /// Whether schema.org should describe this title as a `Movie`.
    pub fn is_movie(&self) -> bool {
        self.kind.as_deref().is_some_and(|kind| {
            matches!(
                kind.trim().to_lowercase().as_str(),
                "movie" | "película" | "pelicula"
            )
        })
    }
}

/// Latest releases shown on the home page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HomePayload {
    /// Newest movies.
    pub latest_movies: Vec<AnimeSummary>,
    /// Newest series.
    pub latest_series: Vec<AnimeSummary>,
}

impl HomePayload {
    /// Every title on the home page, movies first.
    pub fn all_items(&self) -> impl Iterator<Item = &AnimeSummary> {
        self.latest_movies.iter().chain(self.latest_series.iter())
    }
}

/// A genre with its URL slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Genre {
    /// URL slug (`accion`, `slice-of-life`).
    pub slug: String,
    /// Display name.
    pub name: String,
}

impl Genre {
    /// Listing route, if the slug is usable in a path.
    pub fn route(&self) -> Option<RouteKind> {
        RouteKind::genre_listing(&self.slug).ok()
    }
}

/// Parse a home payload. Unknown shapes yield an empty payload.
pub fn home(data: &Value) -> HomePayload {
    let Some(obj) = data.as_object() else {
        return HomePayload::default();
    };
    HomePayload {
        latest_movies: first(obj, &["latestMovies", "latest_movies", "movies"])
            .map(summaries)
            .unwrap_or_default(),
        latest_series: first(
            obj,
            &["latestSeries", "latest_series", "series", "latestAnimes"],
        )
        .map(summaries)
        .unwrap_or_default(),
    }
}

/// Parse a detail payload, which may be wrapped in `{ "anime": {...} }`.
///
/// Returns `None` when there is no object or it carries no title.
pub fn anime_detail(data: &Value) -> Option<AnimeDetail> {
    let obj = data
        .get("anime")
        .and_then(Value::as_object)
        .or_else(|| data.as_object())?;

    Some(AnimeDetail {
        id: first_text(obj, &["id", "slug"]),
        name: first_text(obj, &["name", "title"])?,
        overview: first_text(obj, &["overview", "synopsis", "sinopsis", "description"]),
        poster: first_text(obj, &["poster", "image", "cover"]),
        kind: first_text(obj, &["type", "kind"]),
        status: first_text(obj, &["status", "estado", "state"]),
        aired: first_text(obj, &["aired", "year", "date"]),
        genres: first(obj, &["genres", "genre"])
            .map(genre_names)
            .unwrap_or_default(),
        rating: first(obj, &["rating", "score", "vote_average"]).and_then(parse_rating),
        episodes: first(obj, &["episodes", "episodios"])
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Episode::from_value).collect())
            .unwrap_or_default(),
    })
}

/// Parse a listing: a bare array, or an object holding one under a
/// well-known key.
pub fn anime_list(data: &Value) -> Vec<AnimeSummary> {
    let array = match data {
        Value::Array(_) => Some(data),
        Value::Object(obj) => ["items", "animes", "anime", "list", "results", "data"]
            .iter()
            .find_map(|key| obj.get(*key).filter(|v| v.is_array())),
        _ => None,
    };
    array.map(summaries).unwrap_or_default()
}

/// Parse the genre list: strings or `{slug?, name}` objects, bare or under
/// `genres`.
pub fn genres(data: &Value) -> Vec<Genre> {
    let items: &[Value] = match data {
        Value::Array(items) => items,
        Value::Object(obj) => obj
            .get("genres")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    items
        .iter()
        .filter_map(|item| {
            let (name, slug) = match item {
                Value::String(name) => (name.trim().to_string(), None),
                Value::Object(obj) => (
                    first_text(obj, &["name", "title"])?,
                    first_text(obj, &["slug", "id"]),
                ),
                _ => return None,
            };
            let slug = slug.map(|s| s.to_lowercase()).unwrap_or_else(|| slugify(&name));
            (!name.is_empty() && !slug.is_empty()).then_some(Genre { slug, name })
        })
        .collect()
}

/// Parse a rating: finite numbers or numeric strings only.
pub fn parse_rating(value: &Value) -> Option<f64> {
    let rating = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    rating.is_finite().then_some(rating)
}

/// Lowercase ASCII slug: accents folded, runs of other characters become `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        let c = match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        };
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

// ═══════════════════════════════════════════════════════════════════════════
// Field probing
// ═══════════════════════════════════════════════════════════════════════════

/// First non-null value among `keys`.
fn first<'a>(obj: &'a Object, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| obj.get(*key).filter(|v| !v.is_null()))
}

/// First value among `keys` that reads as non-empty text.
fn first_text(obj: &Object, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| obj.get(*key).and_then(text_of))
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn summaries(value: &Value) -> Vec<AnimeSummary> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(AnimeSummary::from_value).collect())
        .unwrap_or_default()
}

/// Genre names from `"Acción, Drama"` or `["Acción", {"name": "Drama"}]`.
fn genre_names(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(obj) => first_text(obj, &["name", "title"]),
                other => text_of(other),
            })
            .collect(),
        _ => Vec::new(),
    }
}
