//! Route matching module
//!
//! Path patterns with `:name` parameters and an optional trailing `*`, and
//! first-match lookup over the route table.

use super::table::{HttpMethod, RouteEntry};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

/// A compiled route path such as `/users/:id`.
///
/// Literal segments compare case-insensitively and a trailing slash is
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(path: &str) -> Self {
        let segments = split(path)
            .map(|seg| {
                if seg == "*" {
                    Segment::Wildcard
                } else if let Some(name) = seg.strip_prefix(':') {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal(seg.to_string())
                }
            })
            .collect();
        Self { segments }
    }

    /// Path parameters if `path` matches
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let mut params = HashMap::new();
        let mut parts = split(path);

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Wildcard if i + 1 == self.segments.len() => {
                    let rest: Vec<&str> = parts.by_ref().collect();
                    params.insert("*".to_string(), decode(&rest.join("/")));
                    return Some(params);
                }
                Segment::Wildcard => {
                    parts.next()?;
                }
                Segment::Literal(expected) => {
                    if !parts.next()?.eq_ignore_ascii_case(expected) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), decode(parts.next()?));
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |s| s.into_owned())
}

/// Find the first route at or after `start` matching `method` and `path`
pub fn find_route(
    routes: &[RouteEntry],
    method: HttpMethod,
    path: &str,
    start: usize,
) -> Option<(usize, HashMap<String, String>)> {
    routes
        .iter()
        .enumerate()
        .skip(start)
        .filter(|(_, route)| route.method == method)
        .find_map(|(i, route)| route.pattern.matches(path).map(|params| (i, params)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_literal() {
        let pattern = PathPattern::parse("/hello");
        assert!(pattern.matches("/hello").is_some());
        assert!(pattern.matches("/hello/").is_some());
        assert!(pattern.matches("/HELLO").is_some());
        assert!(pattern.matches("/hello/world").is_none());
        assert!(pattern.matches("/").is_none());
    }

    #[test]
    fn test_match_params() {
        let pattern = PathPattern::parse("/users/:id/posts/:post");
        let params = pattern.matches("/users/42/posts/hello%20world").unwrap();
        assert_eq!(params["id"], "42");
        assert_eq!(params["post"], "hello world");
        assert!(pattern.matches("/users/42/posts").is_none());
    }

    #[test]
    fn test_match_root() {
        let pattern = PathPattern::parse("/");
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("/x").is_none());
    }

    #[test]
    fn test_match_wildcard() {
        let pattern = PathPattern::parse("/files/*");
        let params = pattern.matches("/files/a/b.txt").unwrap();
        assert_eq!(params["*"], "a/b.txt");
        assert!(pattern.matches("/other/a").is_none());
    }
}
