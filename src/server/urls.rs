//! Self-referential URL composition.
//!
//! Documents served by the tiler link back to other endpoints of the same
//! service (TileJSON → tiles, viewer → style). Those links must be absolute,
//! honour the mount prefix the service runs under, and carry the archive
//! locator plus every extra query parameter of the current request so that a
//! client following the link reads the same archive with the same options.
//!
//! ```text
//! http://host:8080  /collections/{id}   /tiles/{z}/{x}/{y}  ?url=...&extra=1
//! └── base URL ───┘ └── mount prefix ─┘ └─ route template ┘ └─ request query ┘
//!                   (bound from request)  (unknowns stay literal)
//! ```

use std::collections::HashSet;

use axum::extract::RawPathParams;
use http::{header, HeaderMap, Uri};
use url::form_urlencoded;

use crate::error::UrlError;

// =============================================================================
// Path Templates
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A path with `{name}` placeholders, e.g. `/tiles/{z}/{x}/{y}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template, rejecting unbalanced braces and empty placeholder names.
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let invalid = |reason: &str| UrlError::InvalidTemplate {
            template: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut rest = raw;

        while let Some(open) = rest.find(['{', '}']) {
            if rest.as_bytes()[open] == b'}' {
                return Err(invalid("unmatched '}'"));
            }
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| invalid("unclosed '{'"))?;
            let name = &after[..close];
            if name.is_empty() {
                return Err(invalid("empty placeholder"));
            }
            if name.contains('{') {
                return Err(invalid("nested '{'"));
            }
            segments.push(Segment::Param(name.to_string()));
            rest = &after[close + 1..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in order of appearance.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Whether the template contains any placeholder.
    pub fn has_params(&self) -> bool {
        self.params().next().is_some()
    }

    /// Substitute the given parameters.
    ///
    /// Values are percent-encoded. Placeholders without a value are kept as
    /// literal `{name}` tokens so the result can itself serve as a template.
    pub fn expand(&self, params: &[(&str, &str)]) -> String {
        self.render(|name| {
            params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
        })
        .unwrap_or_else(|missing| missing)
    }

    /// Substitute every placeholder from `params`, failing on the first one without a value.
    pub fn expand_strict(&self, params: &[(String, String)]) -> Result<String, UrlError> {
        self.render(|name| {
            params
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        })
        .map_err(|_| {
            let missing = self
                .params()
                .find(|name| !params.iter().any(|(key, _)| key == name))
                .unwrap_or_default();
            UrlError::MissingPrefixParam(missing.to_string())
        })
    }

    /// Render with `lookup`. On a missing value returns `Err` holding the
    /// rendering with that placeholder left literal.
    fn render<'v>(&self, lookup: impl Fn(&str) -> Option<&'v str>) -> Result<String, String> {
        let mut out = String::with_capacity(self.raw.len());
        let mut complete = true;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param(name) => match lookup(name) {
                    Some(value) => out.push_str(&urlencoding::encode(value)),
                    None => {
                        complete = false;
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }

        if complete {
            Ok(out)
        } else {
            Err(out)
        }
    }
}

// =============================================================================
// Route Table
// =============================================================================

/// A named endpoint and its path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    pub template: PathTemplate,
}

/// Immutable registry of the service's endpoints, queried by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Start assembling a route table.
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Look up an endpoint by name.
    pub fn get(&self, name: &str) -> Result<&Route, UrlError> {
        self.routes
            .iter()
            .find(|route| route.name == name)
            .ok_or_else(|| UrlError::UnknownEndpoint(name.to_string()))
    }

    /// Routes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Collects routes before freezing them into a [`RouteTable`].
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    entries: Vec<(String, String)>,
}

impl RouteTableBuilder {
    /// Register an endpoint.
    pub fn route(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.entries.push((name.into(), template.into()));
        self
    }

    /// Parse every template and reject duplicate names.
    pub fn build(self) -> Result<RouteTable, UrlError> {
        let mut seen = HashSet::new();
        let mut routes = Vec::with_capacity(self.entries.len());

        for (name, template) in self.entries {
            if !seen.insert(name.clone()) {
                return Err(UrlError::InvalidTemplate {
                    template,
                    reason: format!("endpoint '{}' registered twice", name),
                });
            }
            let template = PathTemplate::parse(&template)?;
            if !template.as_str().starts_with('/') {
                return Err(UrlError::InvalidTemplate {
                    template: template.as_str().to_string(),
                    reason: "must start with '/'".to_string(),
                });
            }
            routes.push(Route { name, template });
        }

        Ok(RouteTable { routes })
    }
}

// =============================================================================
// Request Context
// =============================================================================

/// The parts of the current request that links are derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    base_url: String,
    path_params: Vec<(String, String)>,
    query: Vec<(String, String)>,
}

impl RequestContext {
    /// Context with the given base URL (`scheme://host[:port][/root]`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            path_params: Vec::new(),
            query: Vec::new(),
        }
    }

    /// Path parameters already bound for the current request.
    pub fn with_path_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.path_params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Decoded query pairs of the current request, in order and with repeats.
    pub fn with_query<K, V>(mut self, query: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query = query
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Build the context from an incoming request.
    ///
    /// The host comes from the `Host` header (or the URI authority), the
    /// scheme from `X-Forwarded-Proto` when behind a proxy. `root_path` is the
    /// path a reverse proxy exposes the whole service under.
    pub fn from_request(
        headers: &HeaderMap,
        uri: &Uri,
        path_params: &RawPathParams,
        root_path: &str,
    ) -> Self {
        Self::from_parts(headers, uri, path_params.iter(), root_path)
    }

    /// Same as [`RequestContext::from_request`] with path parameters given as pairs.
    pub fn from_parts<'a>(
        headers: &HeaderMap,
        uri: &Uri,
        path_params: impl IntoIterator<Item = (&'a str, &'a str)>,
        root_path: &str,
    ) -> Self {
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| uri.authority().map(|a| a.as_str()))
            .unwrap_or("localhost");

        let proto = headers
            .get("x-forwarded-proto")
            .and_then(|h| h.to_str().ok())
            .or_else(|| uri.scheme_str())
            .unwrap_or("http");

        let query: Vec<(String, String)> = uri
            .query()
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Self::new(format!("{}://{}{}", proto, host, root_path))
            .with_path_params(path_params)
            .with_query(query)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn path_params(&self) -> &[(String, String)] {
        &self.path_params
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// First value of a query parameter.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// =============================================================================
// URL Composer
// =============================================================================

/// Produces absolute links to this service's endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlComposer {
    routes: RouteTable,
    mount_prefix: Option<PathTemplate>,
}

impl UrlComposer {
    pub fn new(routes: RouteTable, mount_prefix: Option<PathTemplate>) -> Self {
        Self {
            routes,
            mount_prefix,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn mount_prefix(&self) -> Option<&PathTemplate> {
        self.mount_prefix.as_ref()
    }

    /// Absolute URL of endpoint `name`.
    ///
    /// `params` fills the endpoint's own placeholders; omitted ones stay as
    /// literal `{name}` tokens. Placeholders in the mount prefix are bound
    /// from the current request's path parameters. The request's query
    /// string is appended with order and repeated keys preserved.
    ///
    /// # Errors
    ///
    /// - [`UrlError::UnknownEndpoint`] if no route is named `name`
    /// - [`UrlError::MissingPrefixParam`] if the prefix needs a parameter the
    ///   request does not carry
    pub fn url_for(
        &self,
        ctx: &RequestContext,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<String, UrlError> {
        let route = self.routes.get(name)?;
        let path = route.template.expand(params);

        let prefix = match &self.mount_prefix {
            Some(prefix) => prefix.expand_strict(ctx.path_params())?,
            None => String::new(),
        };

        let mut url = format!(
            "{}{}{}",
            ctx.base_url(),
            prefix.trim_end_matches('/'),
            path
        );

        if !ctx.query().is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(ctx.query())
                .finish();
            url.push('?');
            url.push_str(&query);
        }

        Ok(url)
    }
}
