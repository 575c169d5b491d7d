//! Hypermedia envelopes
//!
//! Every resource response is wrapped as `{ data, links }`. Collections get
//! `self` and `create` links, single records get `self`, `update` and
//! `delete`. Links are derived from the request and the route alone, so they
//! never depend on storage state.
//!
//! When an href cannot be built the link is still emitted with an empty
//! `href`.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, Method},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::state::AppState;

/// Placeholder base used to normalize relative links
const RELATIVE_BASE: &str = "http://relative.invalid";

/// A single hypermedia link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub rel: String,
    pub href: String,
    pub method: String,
}

impl Link {
    /// Link followed with `GET`
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self::with_method(rel, href, Method::GET)
    }

    pub fn with_method(rel: impl Into<String>, href: impl Into<String>, method: Method) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            method: method.to_string(),
        }
    }
}

/// Payload plus the links a client may follow from it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope<T> {
    pub data: T,
    pub links: Vec<Link>,
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Where links should point
#[derive(Debug, Clone)]
enum Origin {
    /// Absolute links under this base
    Absolute(Url),
    /// Path-only links
    Relative,
    /// Base could not be determined; every href is empty
    Broken,
}

/// Make `base` a directory so that joined paths nest under its path prefix
fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

/// Builds links for the current request
///
/// The origin comes from `service.public_url` when configured, otherwise from
/// the `Host` header (honoring `X-Forwarded-Proto`). Without either, links are
/// relative paths. A path prefix in `public_url` (`https://host/scann`) is kept
/// in front of every route.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    origin: Origin,
    current: String,
}

impl LinkBuilder {
    /// Builder for a request to `current` (path plus query)
    pub fn new(
        public_url: Option<&str>,
        host: Option<&str>,
        scheme: Option<&str>,
        current: &str,
    ) -> Self {
        let origin = match (public_url, host) {
            (Some(public), _) => match Url::parse(public) {
                Ok(base) => Origin::Absolute(with_trailing_slash(base)),
                Err(e) => {
                    tracing::debug!(
                        public_url = public,
                        error = %e,
                        "Unusable public URL for links"
                    );
                    Origin::Broken
                }
            },
            (None, Some(host)) => {
                let scheme = scheme.unwrap_or("http");
                match Url::parse(&format!("{scheme}://{host}")) {
                    Ok(base) => Origin::Absolute(base),
                    Err(_) => Origin::Relative,
                }
            }
            (None, None) => Origin::Relative,
        };

        Self {
            origin,
            current: current.to_string(),
        }
    }

    /// Resolve `path` (which may carry a query) against the origin
    pub fn href(&self, path: &str) -> String {
        let resolved = match &self.origin {
            Origin::Absolute(base) => base.join(path.trim_start_matches('/')).map(String::from),
            Origin::Relative => Url::parse(RELATIVE_BASE)
                .and_then(|base| base.join(path))
                .map(|url| match url.query() {
                    Some(query) => format!("{}?{}", url.path(), query),
                    None => url.path().to_string(),
                }),
            Origin::Broken => return String::new(),
        };

        resolved.unwrap_or_else(|e| {
            tracing::debug!(path, error = %e, "Link generation failed");
            String::new()
        })
    }

    /// `self` link reproducing the current request
    pub fn self_link(&self) -> Link {
        Link::new("self", self.href(&self.current))
    }

    /// Wrap a collection served at `route`
    pub fn collection<T>(&self, data: T, route: &str) -> Envelope<T> {
        Envelope {
            data,
            links: vec![
                self.self_link(),
                Link::with_method("create", self.href(route), Method::POST),
            ],
        }
    }

    /// Wrap the record `id` of the collection at `route`
    pub fn item<T>(&self, data: T, route: &str, id: i64) -> Envelope<T> {
        let item = self.href(&format!("{route}/{id}"));
        Envelope {
            data,
            links: vec![
                self.self_link(),
                Link::with_method("update", item.clone(), Method::PUT),
                Link::with_method("delete", item, Method::DELETE),
            ],
        }
    }
}

impl FromRequestParts<AppState> for LinkBuilder {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_str = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let host = header_str(header::HOST.as_str()).or(parts.uri.authority().map(|a| a.as_str()));
        let scheme = header_str("x-forwarded-proto").or(parts.uri.scheme_str());
        let current = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());

        Ok(Self::new(
            state.config().service.public_url.as_deref(),
            host,
            scheme,
            &current,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_links() {
        let links = LinkBuilder::new(
            None,
            Some("api.local:8080"),
            None,
            "/api/motorcycles?brand=Honda",
        );
        let envelope = links.collection(vec![1, 2], "/api/motorcycles");

        assert_eq!(
            envelope.links,
            vec![
                Link::new("self", "http://api.local:8080/api/motorcycles?brand=Honda"),
                Link::with_method("create", "http://api.local:8080/api/motorcycles", Method::POST),
            ]
        );
    }

    #[test]
    fn test_item_links() {
        let links = LinkBuilder::new(None, Some("api.local"), Some("https"), "/api/portals/7");
        let envelope = links.item("portal", "/api/portals", 7);

        let rels: Vec<_> = envelope
            .links
            .iter()
            .map(|l| (l.rel.as_str(), l.method.as_str(), l.href.as_str()))
            .collect();
        assert_eq!(
            rels,
            vec![
                ("self", "GET", "https://api.local/api/portals/7"),
                ("update", "PUT", "https://api.local/api/portals/7"),
                ("delete", "DELETE", "https://api.local/api/portals/7"),
            ]
        );
    }

    #[test]
    fn test_public_url_takes_precedence() {
        let links = LinkBuilder::new(
            Some("https://scann.example.com"),
            Some("10.0.0.5"),
            None,
            "/api/users",
        );
        assert_eq!(links.self_link().href, "https://scann.example.com/api/users");
    }

    #[test]
    fn test_public_url_path_prefix_is_kept() {
        for public in ["https://scann.example.com/yard", "https://scann.example.com/yard/"] {
            let links = LinkBuilder::new(Some(public), None, None, "/api/portals?type=REPAIR");
            assert_eq!(
                links.self_link().href,
                "https://scann.example.com/yard/api/portals?type=REPAIR"
            );
            assert_eq!(
                links.href("/api/portals/2"),
                "https://scann.example.com/yard/api/portals/2"
            );
        }
    }

    #[test]
    fn test_relative_links_without_host() {
        let links = LinkBuilder::new(None, None, None, "/api/motorcycles?pageSize=1");
        assert_eq!(links.self_link().href, "/api/motorcycles?pageSize=1");
        assert_eq!(links.href("/api/motorcycles/3"), "/api/motorcycles/3");
    }

    #[test]
    fn test_broken_origin_yields_empty_hrefs() {
        let links = LinkBuilder::new(Some("not a url"), None, None, "/api/portals");
        let envelope = links.item((), "/api/portals", 1);
        assert_eq!(envelope.links.len(), 3);
        assert!(envelope.links.iter().all(|l| l.href.is_empty()));
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = Envelope {
            data: serde_json::json!({"id": 1}),
            links: vec![Link::new("self", "/x")],
        };
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            serde_json::json!({
                "data": {"id": 1},
                "links": [{"rel": "self", "href": "/x", "method": "GET"}]
            })
        );
    }
}
