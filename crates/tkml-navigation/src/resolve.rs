//! URL resolution
//!
//! Two steps. [`UrlResolver::resolve`] turns an href into a location that
//! is either host-relative (`//host/path`) or root-relative (`/path`),
//! relative to the current document location. [`UrlResolver::expand`]
//! attaches the real origin to produce something fetchable.

use url::Url;

use crate::error::NavigationError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Host- or root-relative location
    pub location: String,
    /// Current host after resolution; absolute hrefs move it
    pub host: Option<String>,
    /// The href itself when it was already absolute
    pub absolute: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct UrlResolver {
    origin: Url,
}

impl UrlResolver {
    pub fn new(origin: Url) -> Self {
        Self { origin }
    }

    pub fn parse(origin: &str) -> Result<Self> {
        Url::parse(origin)
            .map(Self::new)
            .map_err(|e| NavigationError::InvalidUrl(format!("{}: {}", origin, e)))
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Resolve `href` against the current `location` and `host`.
    pub fn resolve(&self, href: &str, location: Option<&str>, host: Option<&str>) -> Resolution {
        let href = href.trim();
        let host = host.map(String::from);

        if let Some(rest) = absolute_remainder(href) {
            return match Url::parse(href) {
                Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => {
                    let authority = authority(&url);
                    let mut location = format!("//{}{}", authority, url.path());
                    if let Some(query) = url.query() {
                        location.push('?');
                        location.push_str(query);
                    }
                    tracing::debug!(host = %authority, "Absolute href moves current host");
                    Resolution {
                        location,
                        host: Some(authority),
                        absolute: Some(url),
                    }
                }
                _ => Resolution {
                    location: format!("//{}", rest),
                    host,
                    absolute: None,
                },
            };
        }

        if href.starts_with("//") {
            return Resolution {
                location: href.to_string(),
                host,
                absolute: None,
            };
        }

        if href.starts_with('/') {
            return Resolution {
                location: root_relative(href, host.as_deref()),
                host,
                absolute: None,
            };
        }

        let location = match location.and_then(directory_of) {
            Some(dir) => format!("{}{}", dir, href),
            None => root_relative(&format!("/{}", href), host.as_deref()),
        };
        Resolution {
            location,
            host,
            absolute: None,
        }
    }

    /// Attach the origin to a resolved location.
    pub fn expand(&self, location: &str) -> Result<Url> {
        self.origin
            .join(location)
            .map_err(|e| NavigationError::InvalidUrl(format!("{}: {}", location, e)))
    }

    /// URL to fetch for a resolution; absolute hrefs are used untouched.
    pub fn fetch_url(&self, resolution: &Resolution) -> Result<Url> {
        match &resolution.absolute {
            Some(url) => Ok(url.clone()),
            None => self.expand(&resolution.location),
        }
    }
}

/// `scheme://rest` → `rest`
fn absolute_remainder(href: &str) -> Option<&str> {
    let (scheme, rest) = href.split_once("://")?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'));
    valid.then_some(rest)
}

fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn root_relative(path: &str, host: Option<&str>) -> String {
    match host {
        Some(host) if !host.is_empty() => format!("//{}{}", host, path),
        _ => path.to_string(),
    }
}

/// Everything up to and including the last `/` of the path, query dropped.
fn directory_of(location: &str) -> Option<String> {
    let base = location.split(['?', '#']).next().unwrap_or_default();
    let start = if base.starts_with("//") { 2 } else { 0 };
    match base[start..].rfind('/') {
        Some(i) => Some(base[..start + i + 1].to_string()),
        None if start > 0 => Some(format!("{}/", base)),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> UrlResolver {
        UrlResolver::parse("https://app.example:8443").unwrap()
    }

    #[test]
    fn test_relative_to_current_directory() {
        let r = resolver().resolve("d.page", Some("/a/b/c.page"), None);
        assert_eq!(r.location, "/a/b/d.page");
        assert_eq!(r.host, None);
    }

    #[test]
    fn test_relative_strips_query() {
        let r = resolver().resolve("d.page?x=2", Some("/a/b/c.page?x=1/2"), None);
        assert_eq!(r.location, "/a/b/d.page?x=2");
    }

    #[test]
    fn test_root_relative_ignores_location() {
        let r = resolver().resolve("/x.page", Some("/a/b/c.page"), None);
        assert_eq!(r.location, "/x.page");

        let r = resolver().resolve("/x.page", Some("/a/b/c.page"), Some("other.example"));
        assert_eq!(r.location, "//other.example/x.page");
    }

    #[test]
    fn test_absolute_moves_host() {
        let r = resolver().resolve("https://other.example/y", Some("/a/b/c.page"), None);
        assert_eq!(r.location, "//other.example/y");
        assert_eq!(r.host.as_deref(), Some("other.example"));

        let r = resolver().resolve("http://h.example:81/p?q=1#frag", None, None);
        assert_eq!(r.location, "//h.example:81/p?q=1");
        assert_eq!(r.host.as_deref(), Some("h.example:81"));
    }

    #[test]
    fn test_unparseable_absolute_keeps_host() {
        let r = resolver().resolve("foo://", None, Some("kept.example"));
        assert_eq!(r.location, "//");
        assert_eq!(r.host.as_deref(), Some("kept.example"));
    }

    #[test]
    fn test_scheme_relative_as_is() {
        let r = resolver().resolve("//cdn.example/z", Some("/a/"), Some("h"));
        assert_eq!(r.location, "//cdn.example/z");
        assert_eq!(r.host.as_deref(), Some("h"));
    }

    #[test]
    fn test_relative_without_location() {
        let r = resolver().resolve("start.page", None, None);
        assert_eq!(r.location, "/start.page");

        let r = resolver().resolve("start.page", Some("index"), None);
        assert_eq!(r.location, "/start.page");
    }

    #[test]
    fn test_relative_to_host_location() {
        let r = resolver().resolve("next.page", Some("//other.example/dir/p.page"), None);
        assert_eq!(r.location, "//other.example/dir/next.page");

        let r = resolver().resolve("next.page", Some("//other.example"), None);
        assert_eq!(r.location, "//other.example/next.page");
    }

    #[test]
    fn test_expand() {
        let resolver = resolver();
        assert_eq!(
            resolver.expand("/a/b.page").unwrap().as_str(),
            "https://app.example:8443/a/b.page"
        );
        assert_eq!(
            resolver.expand("//other.example/y").unwrap().as_str(),
            "https://other.example/y"
        );
    }

    #[test]
    fn test_fetch_url_keeps_absolute_href() {
        let resolver = resolver();
        let r = resolver.resolve("http://plain.example/p?q=1", None, None);
        assert_eq!(resolver.fetch_url(&r).unwrap().as_str(), "http://plain.example/p?q=1");

        let r = resolver.resolve("/a.page", None, None);
        assert_eq!(
            resolver.fetch_url(&r).unwrap().as_str(),
            "https://app.example:8443/a.page"
        );
    }

    #[test]
    fn test_invalid_origin() {
        assert!(matches!(
            UrlResolver::parse("not a url"),
            Err(NavigationError::InvalidUrl(_))
        ));
    }
}
