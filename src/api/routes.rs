//! Ordered route table
//!
//! Patterns are `/`-separated segments: `literal`, `:name` (required capture) and
//! `:name?` (optional capture, last segment only). Entries are tried in
//! registration order and the first one whose method and segment shape fit wins.
//!
//! Ordering is a checked invariant, not a convention: [`RouteTable::register`]
//! refuses an entry when an earlier entry with the same method already accepts
//! every path the new one would, since the new entry could never be reached.

use std::collections::HashMap;
use std::fmt;

use axum::http::Method;
use percent_encoding::percent_decode_str;
use thiserror::Error;

use super::handlers::{self, Handler};

/// Captured path parameters, by capture name
pub type PathParams = HashMap<String, String>;

/// Route table construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Pattern does not start with `/`
    #[error("pattern {0} must start with '/'")]
    NotAbsolute(String),

    /// Empty literal or capture name
    #[error("pattern {0} has an empty segment")]
    EmptySegment(String),

    /// `:name?` somewhere other than the last segment
    #[error("pattern {0}: optional capture must be the last segment")]
    OptionalNotTrailing(String),

    /// Same capture name used twice
    #[error("pattern {pattern}: duplicate capture {name}")]
    DuplicateCapture {
        /// Offending pattern
        pattern: String,
        /// Repeated capture name
        name: String,
    },

    /// Entry can never match because an earlier entry covers it
    #[error("route {method} {pattern} is shadowed by earlier route {method} {earlier}")]
    Shadowed {
        /// Method shared by both entries
        method: String,
        /// Unreachable pattern
        pattern: String,
        /// Earlier covering pattern
        earlier: String,
    },
}

/// Request path that cannot be split into segments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A segment does not decode to UTF-8
    #[error("path segment {0} is not valid percent-encoded UTF-8")]
    InvalidEncoding(String),
}

/// One pattern segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the path segment exactly
    Literal(String),
    /// Binds any non-empty path segment
    Capture(String),
    /// Binds the last path segment if present
    OptionalCapture(String),
}

impl Segment {
    fn is_capture(&self) -> bool {
        !matches!(self, Segment::Literal(_))
    }
}

/// Parsed path pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse a pattern such as `/:db/:collection/:docid?`
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let body = raw
            .strip_prefix('/')
            .ok_or_else(|| RouteError::NotAbsolute(raw.to_string()))?;

        let mut segments = Vec::new();
        if !body.is_empty() {
            for part in body.split('/') {
                let segment = match part.strip_prefix(':') {
                    Some(name) => match name.strip_suffix('?') {
                        Some(name) => Segment::OptionalCapture(name.to_string()),
                        None => Segment::Capture(name.to_string()),
                    },
                    None => Segment::Literal(part.to_string()),
                };

                let name = match &segment {
                    Segment::Literal(s) | Segment::Capture(s) | Segment::OptionalCapture(s) => s,
                };
                if name.is_empty() {
                    return Err(RouteError::EmptySegment(raw.to_string()));
                }
                segments.push(segment);
            }
        }

        let last = segments.len().saturating_sub(1);
        if segments
            .iter()
            .enumerate()
            .any(|(i, s)| matches!(s, Segment::OptionalCapture(_)) && i != last)
        {
            return Err(RouteError::OptionalNotTrailing(raw.to_string()));
        }

        let mut seen = Vec::new();
        for segment in &segments {
            if let Segment::Capture(name) | Segment::OptionalCapture(name) = segment {
                if seen.contains(&name) {
                    return Err(RouteError::DuplicateCapture {
                        pattern: raw.to_string(),
                        name: name.clone(),
                    });
                }
                seen.push(name);
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Smallest number of path segments this pattern accepts
    fn min_len(&self) -> usize {
        match self.segments.last() {
            Some(Segment::OptionalCapture(_)) => self.segments.len() - 1,
            _ => self.segments.len(),
        }
    }

    /// Largest number of path segments this pattern accepts
    fn max_len(&self) -> usize {
        self.segments.len()
    }

    /// Bind `path` segments against this pattern
    pub fn matches<S: AsRef<str>>(&self, path: &[S]) -> Option<PathParams> {
        if path.len() < self.min_len() || path.len() > self.max_len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, value) in self.segments.iter().zip(path) {
            let value = value.as_ref();
            match segment {
                Segment::Literal(lit) if lit == value => {}
                Segment::Literal(_) => return None,
                Segment::Capture(name) | Segment::OptionalCapture(name) => {
                    params.insert(name.clone(), value.to_string());
                }
            }
        }
        Some(params)
    }

    /// Whether every path accepted by `other` is also accepted by `self`
    fn covers(&self, other: &Pattern) -> bool {
        if other.min_len() < self.min_len() || other.max_len() > self.max_len() {
            return false;
        }

        self.segments
            .iter()
            .zip(&other.segments)
            .all(|(mine, theirs)| match (mine, theirs) {
                (m, _) if m.is_capture() => true,
                (Segment::Literal(a), Segment::Literal(b)) => a == b,
                _ => false,
            })
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split a request path into percent-decoded segments.
///
/// One leading and one trailing `/` are ignored; `/` itself has no segments.
/// Returns `Ok(None)` when the path has an empty segment such as `a//b` or `//`,
/// which no pattern matches.
pub fn split_path(path: &str) -> Result<Option<Vec<String>>, PathError> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Ok(Some(Vec::new()));
    }
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

    let raw: Vec<&str> = trimmed.split('/').collect();
    if raw.iter().any(|s| s.is_empty()) {
        return Ok(None);
    }

    raw.into_iter()
        .map(|segment| {
            percent_decode_str(segment)
                .decode_utf8()
                .map(|decoded| decoded.into_owned())
                .map_err(|_| PathError::InvalidEncoding(segment.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// A registered route
#[derive(Clone)]
pub struct Route {
    /// Name used in logs
    pub name: &'static str,
    /// HTTP method
    pub method: Method,
    /// Path pattern
    pub pattern: Pattern,
    /// Operation to run
    pub handler: Handler,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.method, self.pattern, self.name)
    }
}

/// Result of a successful lookup
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    /// The winning route
    pub route: &'a Route,
    /// Captured path parameters
    pub params: PathParams,
}

/// Routes in registration order
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route, rejecting bad patterns and unreachable entries
    pub fn register(
        &mut self,
        name: &'static str,
        method: Method,
        pattern: &str,
        handler: Handler,
    ) -> Result<&mut Self, RouteError> {
        let pattern = Pattern::parse(pattern)?;

        if let Some(earlier) = self
            .routes
            .iter()
            .find(|r| r.method == method && r.pattern.covers(&pattern))
        {
            return Err(RouteError::Shadowed {
                method: method.to_string(),
                pattern: pattern.raw,
                earlier: earlier.pattern.raw.clone(),
            });
        }

        self.routes.push(Route {
            name,
            method,
            pattern,
            handler,
        });
        Ok(self)
    }

    /// The gateway's routes.
    ///
    /// Registration order is part of the HTTP contract: document-level patterns
    /// precede collection-level ones, which precede database-level ones, for each
    /// method. `register` fails if a later entry would be unreachable.
    pub fn gateway() -> Result<Self, RouteError> {
        let mut table = Self::new();
        table
            .register("list_databases", Method::GET, "/", handlers::list_databases)?
            .register("list_collections", Method::GET, "/:db", handlers::list_collections)?
            .register("list_documents", Method::GET, "/:db/:collection", handlers::list_documents)?
            .register("get_document", Method::GET, "/:db/:collection/:docid", handlers::get_document)?
            .register("upsert_document", Method::POST, "/:db/:collection", handlers::upsert_document)?
            .register("put_document", Method::PUT, "/:db/:collection/:docid", handlers::put_document)?
            .register("delete_document", Method::DELETE, "/:db/:collection/:docid", handlers::delete_document)?
            .register("drop_collection", Method::DELETE, "/:db/:collection", handlers::drop_collection)?
            .register("drop_database", Method::DELETE, "/:db", handlers::drop_database)?;
        Ok(table)
    }

    /// Find the first route for `method` whose pattern accepts `path`
    pub fn resolve(&self, method: &Method, path: &str) -> Result<Option<RouteMatch<'_>>, PathError> {
        let Some(segments) = split_path(path)? else {
            return Ok(None);
        };

        Ok(self
            .routes
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| {
                route
                    .pattern
                    .matches(&segments)
                    .map(|params| RouteMatch { route, params })
            }))
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        self.routes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(Method, &str)]) -> Result<RouteTable, RouteError> {
        let mut table = RouteTable::new();
        for (method, pattern) in entries {
            table.register("test", method.clone(), pattern, handlers::list_databases)?;
        }
        Ok(table)
    }

    #[test]
    fn test_split_path() {
        let split = |path: &str| split_path(path).unwrap();
        assert_eq!(split("/"), Some(vec![]));
        assert_eq!(split(""), Some(vec![]));
        assert_eq!(split("/shop"), Some(vec!["shop".to_string()]));
        assert_eq!(split("/shop/orders/"), Some(vec!["shop".to_string(), "orders".to_string()]));
        assert_eq!(split("/shop//orders"), None);
        assert_eq!(split("//"), None);
        assert_eq!(split("///"), None);
    }

    #[test]
    fn test_split_path_decodes_segments() {
        let segments = split_path("/my%20shop/orders/order%201").unwrap().unwrap();
        assert_eq!(segments, ["my shop", "orders", "order 1"]);

        // An encoded slash stays inside its segment
        let segments = split_path("/shop/a%2Fb").unwrap().unwrap();
        assert_eq!(segments, ["shop", "a/b"]);

        assert_eq!(
            split_path("/shop/%FF"),
            Err(PathError::InvalidEncoding("%FF".to_string()))
        );
    }

    #[test]
    fn test_parse_pattern() {
        let pattern = Pattern::parse("/:db/:collection/:docid?").unwrap();
        assert_eq!(pattern.min_len(), 2);
        assert_eq!(pattern.max_len(), 3);

        let root = Pattern::parse("/").unwrap();
        assert_eq!(root.max_len(), 0);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Pattern::parse(":db"), Err(RouteError::NotAbsolute(_))));
        assert!(matches!(Pattern::parse("/:"), Err(RouteError::EmptySegment(_))));
        assert!(matches!(Pattern::parse("/a//b"), Err(RouteError::EmptySegment(_))));
        assert!(matches!(
            Pattern::parse("/:db?/:collection"),
            Err(RouteError::OptionalNotTrailing(_))
        ));
        assert!(matches!(
            Pattern::parse("/:db/:db"),
            Err(RouteError::DuplicateCapture { .. })
        ));
    }

    #[test]
    fn test_pattern_binds_captures() {
        let pattern = Pattern::parse("/:db/:collection/:docid?").unwrap();

        let params = pattern.matches(&["shop", "orders"]).unwrap();
        assert_eq!(params["db"], "shop");
        assert_eq!(params["collection"], "orders");
        assert!(!params.contains_key("docid"));

        let params = pattern.matches(&["shop", "orders", "42"]).unwrap();
        assert_eq!(params["docid"], "42");

        assert!(pattern.matches(&["shop"]).is_none());
        assert!(pattern.matches(&["a", "b", "c", "d"]).is_none());
    }

    #[test]
    fn test_literal_segments() {
        let pattern = Pattern::parse("/admin/:db").unwrap();
        assert!(pattern.matches(&["admin", "shop"]).is_some());
        assert!(pattern.matches(&["public", "shop"]).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let mut table = RouteTable::new();
        table
            .register("special", Method::GET, "/admin/:collection", handlers::list_databases)
            .unwrap()
            .register("general", Method::GET, "/:db/:collection", handlers::list_collections)
            .unwrap();

        let hit = table.resolve(&Method::GET, "/admin/users").unwrap().unwrap();
        assert_eq!(hit.route.name, "special");

        let hit = table.resolve(&Method::GET, "/shop/users").unwrap().unwrap();
        assert_eq!(hit.route.name, "general");
        assert_eq!(hit.params["db"], "shop");
    }

    #[test]
    fn test_method_must_match() {
        let table = table(&[(Method::GET, "/:db")]).unwrap();
        assert!(table.resolve(&Method::GET, "/shop").unwrap().is_some());
        assert!(table.resolve(&Method::POST, "/shop").unwrap().is_none());
        assert!(table.resolve(&Method::GET, "/shop//").unwrap().is_none());
    }

    #[test]
    fn test_shadowed_route_rejected() {
        let result = table(&[(Method::GET, "/:db/:collection"), (Method::GET, "/admin/users")]);
        assert!(matches!(result, Err(RouteError::Shadowed { .. })));

        let result = table(&[(Method::GET, "/:db/:docid?"), (Method::GET, "/:db")]);
        assert!(matches!(result, Err(RouteError::Shadowed { .. })));

        let result = table(&[(Method::GET, "/:db"), (Method::GET, "/:name")]);
        assert!(matches!(result, Err(RouteError::Shadowed { .. })));
    }

    #[test]
    fn test_specific_before_general_is_accepted() {
        assert!(table(&[(Method::GET, "/admin/users"), (Method::GET, "/:db/:collection")]).is_ok());
        // A required capture does not cover the shorter path an optional one accepts
        assert!(table(&[(Method::GET, "/:db/:collection"), (Method::GET, "/:db/:docid?")]).is_ok());
        // Different methods never shadow each other
        assert!(table(&[(Method::GET, "/:db"), (Method::DELETE, "/:db")]).is_ok());
    }

    #[test]
    fn test_gateway_table() {
        let table = RouteTable::gateway().unwrap();
        assert_eq!(table.len(), 9);

        let hit = table.resolve(&Method::GET, "/my%20shop/orders/order%201").unwrap().unwrap();
        assert_eq!(hit.params["db"], "my shop");
        assert_eq!(hit.params["docid"], "order 1");
        assert!(table.resolve(&Method::GET, "/shop/%C3%28").is_err());

        let cases = [
            (Method::GET, "/", "list_databases"),
            (Method::GET, "/shop", "list_collections"),
            (Method::GET, "/shop/orders", "list_documents"),
            (Method::GET, "/shop/orders/42", "get_document"),
            (Method::POST, "/shop/orders", "upsert_document"),
            (Method::PUT, "/shop/orders/42", "put_document"),
            (Method::DELETE, "/shop/orders/42", "delete_document"),
            (Method::DELETE, "/shop/orders", "drop_collection"),
            (Method::DELETE, "/shop", "drop_database"),
        ];
        for (method, path, name) in cases {
            let hit = table.resolve(&method, path).unwrap().unwrap();
            assert_eq!(hit.route.name, name, "{} {}", method, path);
        }
    }

    #[test]
    fn test_gateway_table_misses() {
        let table = RouteTable::gateway().unwrap();
        assert!(table.resolve(&Method::POST, "/").unwrap().is_none());
        assert!(table.resolve(&Method::POST, "/shop/orders/42").unwrap().is_none());
        assert!(table.resolve(&Method::PUT, "/shop/orders").unwrap().is_none());
        assert!(table.resolve(&Method::PATCH, "/shop/orders/42").unwrap().is_none());
        assert!(table.resolve(&Method::GET, "/a/b/c/d").unwrap().is_none());
        assert!(table.resolve(&Method::GET, "//").unwrap().is_none());
    }
}
