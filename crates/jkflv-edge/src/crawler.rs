//! Crawler detection by User-Agent.
//!
//! False positives are harmless (a human with a bot-like UA gets a
//! prerendered page that redirects them to the app); false negatives only
//! forgo prerendering.

use std::sync::LazyLock;

use regex::Regex;

/// User-Agent fragments of search engines, social previewers and SEO bots.
///
/// Matched case-insensitively anywhere in the header. The trailing generic
/// tokens catch the long tail of self-identifying bots.
pub const CRAWLER_PATTERNS: &[&str] = &[
    // Search engines
    "googlebot",
    "google-inspectiontool",
    "bingbot",
    "baiduspider",
    "yandex",
    "duckduckbot",
    "slurp",
    "applebot",
    "sogou",
    "exabot",
    // Social and chat link previews
    "facebookexternalhit",
    "facebot",
    "twitterbot",
    "linkedinbot",
    "whatsapp",
    "telegrambot",
    "discordbot",
    "slackbot",
    "pinterest",
    "redditbot",
    "embedly",
    "quora link preview",
    "skypeuripreview",
    "vkshare",
    // SEO tooling
    "semrushbot",
    "ahrefsbot",
    "mj12bot",
    "petalbot",
    "dotbot",
    // Generic
    "bot",
    "crawler",
    "spider",
];

static CRAWLER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = CRAWLER_PATTERNS
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){alternation}")).expect("crawler regex should compile")
});

/// Whether a User-Agent header value belongs to a crawler.
pub fn is_crawler(user_agent: &str) -> bool {
    !user_agent.is_empty() && CRAWLER_REGEX.is_match(user_agent)
}
