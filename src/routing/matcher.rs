//! Route matching
//!
//! Patterns are `/`-separated segments; `{name}` captures exactly one
//! non-empty segment. Routes are tried in table order, first match wins.

use hyper::Method;

/// One pattern segment
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Parsed path pattern such as `/customers/{id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

/// Values captured from `{name}` segments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = split(pattern)
            .map(|seg| {
                seg.strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .map_or_else(
                        || Segment::Literal(seg.to_string()),
                        |name| Segment::Param(name.to_string()),
                    )
            })
            .collect();

        Self { segments }
    }

    /// Match `path` against this pattern, capturing parameters
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = split(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    params.push((name.clone(), part.to_string()));
                }
                _ => return None,
            }
        }
        Some(PathParams(params))
    }
}

/// Split a path into segments, keeping a trailing empty segment so that
/// `/customers` and `/customers/` stay distinct
fn split(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

/// A single (method, pattern) -> action entry
#[derive(Debug, Clone)]
pub struct Route<A> {
    pub method: Method,
    pub pattern: PathPattern,
    pub action: A,
}

/// Outcome of a route lookup
#[derive(Debug, PartialEq, Eq)]
pub enum RouteMatch<'a, A> {
    Found { action: &'a A, params: PathParams },
    /// Path known, method not; carries the methods the path accepts
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Find the first route whose pattern and method match
pub fn match_route<'a, A>(routes: &'a [Route<A>], method: &Method, path: &str) -> RouteMatch<'a, A> {
    let mut allowed: Vec<Method> = Vec::new();

    for route in routes {
        let Some(params) = route.pattern.matches(path) else {
            continue;
        };
        if route.method == *method {
            return RouteMatch::Found {
                action: &route.action,
                params,
            };
        }
        if !allowed.contains(&route.method) {
            allowed.push(route.method.clone());
        }
    }

    if allowed.is_empty() {
        RouteMatch::NotFound
    } else {
        RouteMatch::MethodNotAllowed(allowed)
    }
}
