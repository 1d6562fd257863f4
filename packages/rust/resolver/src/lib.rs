//! Link resolution and normalization.
//!
//! This crate provides:
//! - [`normalize`]: canonical link and title forms
//! - [`Resolve`]: the resolution contract, implemented by [`HttpResolver`]
//! - [`fast_path`]: host-specific strategies that skip the network

pub mod fast_path;
pub mod http;
pub mod normalize;
mod resolution;

pub use fast_path::{FastPath, FastPathRegistry, GitHubFastPath};
pub use http::{HttpResolver, extract_title};
pub use normalize::{normalize_link, normalize_title};
pub use resolution::{Resolution, Resolve};

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    // -----------------------------------------------------------------------
    // Fast path registry
    // -----------------------------------------------------------------------

    #[test]
    fn github_repo_is_named_from_path() {
        let registry = FastPathRegistry::new();
        let (name, resolution) = registry
            .resolve(&url("https://github.com/tokio-rs/tokio"))
            .expect("fast path");
        assert_eq!(name, "github");
        assert_eq!(resolution.title, "GitHub - tokio-rs/tokio");
        assert_eq!(resolution.final_url, "https://github.com/tokio-rs/tokio");
    }

    #[test]
    fn github_site_pages_fall_through() {
        let registry = FastPathRegistry::new();
        assert!(registry.resolve(&url("https://github.com/")).is_none());
        assert!(registry.resolve(&url("https://github.com/tokio-rs")).is_none());
        assert!(registry.resolve(&url("https://github.com/topics/rust")).is_none());
        assert!(registry.resolve(&url("https://github.com/orgs/rust-lang/people")).is_none());
    }

    #[test]
    fn other_hosts_fall_through() {
        let registry = FastPathRegistry::new();
        assert!(registry.resolve(&url("https://gitlab.com/a/b")).is_none());
        assert!(registry.resolve(&url("https://notgithub.com/a/b")).is_none());
    }

    #[test]
    fn empty_registry_never_matches() {
        let registry = FastPathRegistry::empty();
        assert!(registry.resolve(&url("https://github.com/a/b")).is_none());
    }

    #[test]
    fn www_host_is_recognised() {
        let fast = GitHubFastPath;
        assert!(fast.matches(&url("https://www.github.com/a/b")));
        assert!(!fast.matches(&url("https://gist.github.com/a/b")));
    }
}
