//! Request dispatch
//!
//! An explicit table of `(method pattern, path) → route`, checked in order,
//! with a fallback route for anything that does not match.

use http::Method;

/// The encoder selected for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// JSON description of url, headers and body
    StructuredEcho,
    /// Plain-text dump of raw headers and body bytes
    RawDump,
    /// Base64 body decoded, templated and re-encoded
    Base64RoundTrip,
    /// Static HTML upload form
    UploadForm,
    /// Structured echo of a parsed multipart submission
    UploadSubmit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodPattern {
    Any,
    Exact(Method),
}

impl MethodPattern {
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodPattern::Any => true,
            MethodPattern::Exact(expected) => expected == method,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: MethodPattern,
    pub path: &'static str,
    pub route: Route,
}

/// Ordered dispatch table
///
/// # Examples
///
/// ```
/// use capturesrv::routing::{Route, RouteTable};
/// use http::Method;
///
/// let table = RouteTable::default();
/// assert_eq!(table.resolve(&Method::PUT, "/echo?x=1"), Route::RawDump);
/// assert_eq!(table.resolve(&Method::GET, "/upload"), Route::UploadForm);
/// assert_eq!(table.resolve(&Method::GET, "/anything/else"), Route::StructuredEcho);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    fallback: Route,
}

impl RouteTable {
    /// Creates an empty table that sends everything to `fallback`
    pub fn new(fallback: Route) -> Self {
        Self {
            entries: Vec::new(),
            fallback,
        }
    }

    /// Appends an entry; earlier entries take precedence
    pub fn route(mut self, method: MethodPattern, path: &'static str, route: Route) -> Self {
        self.entries.push(RouteEntry {
            method,
            path,
            route,
        });
        self
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Picks the route for a method and raw request-target
    pub fn resolve(&self, method: &Method, target: &str) -> Route {
        let path = request_path(target);
        self.entries
            .iter()
            .find(|entry| entry.method.matches(method) && entry.path.eq_ignore_ascii_case(path))
            .map_or(self.fallback, |entry| entry.route)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        RouteTable::new(Route::StructuredEcho)
            .route(MethodPattern::Any, "/", Route::StructuredEcho)
            .route(MethodPattern::Any, "/json", Route::StructuredEcho)
            .route(MethodPattern::Any, "/echo", Route::RawDump)
            .route(MethodPattern::Any, "/base64", Route::Base64RoundTrip)
            .route(MethodPattern::Exact(Method::GET), "/upload", Route::UploadForm)
            .route(MethodPattern::Exact(Method::POST), "/upload", Route::UploadSubmit)
    }
}

/// Path component of a request-target.
///
/// Drops the scheme and authority of absolute-form targets, the query and
/// fragment, and a single trailing slash.
pub fn request_path(target: &str) -> &str {
    let without_authority = ["http://", "https://"]
        .iter()
        .find_map(|scheme| target.strip_prefix(scheme))
        .map(|rest| rest.find('/').map_or("/", |slash| &rest[slash..]))
        .unwrap_or(target);

    let path = without_authority
        .split(['?', '#'])
        .next()
        .unwrap_or(without_authority);

    match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    }
}
