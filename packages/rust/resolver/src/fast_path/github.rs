//! GitHub fast path.

use url::Url;

use super::FastPath;
use crate::Resolution;

/// First path segments that are site pages rather than `<owner>/<repo>`.
const RESERVED: &[&str] = &[
    "about",
    "collections",
    "explore",
    "features",
    "login",
    "marketplace",
    "notifications",
    "orgs",
    "pricing",
    "settings",
    "sponsors",
    "topics",
];

/// Names repository pages after their path instead of fetching them.
pub struct GitHubFastPath;

impl FastPath for GitHubFastPath {
    fn matches(&self, url: &Url) -> bool {
        matches!(url.host_str(), Some("github.com" | "www.github.com"))
    }

    fn resolve(&self, url: &Url) -> Option<Resolution> {
        let segments: Vec<&str> = url
            .path_segments()?
            .filter(|s| !s.is_empty())
            .collect();

        // Need at least owner/repo
        if segments.len() < 2 || RESERVED.contains(&segments[0]) {
            return None;
        }

        Some(Resolution {
            final_url: url.to_string(),
            title: format!("GitHub - {}", segments.join("/")),
        })
    }

    fn name(&self) -> &str {
        "github"
    }
}
