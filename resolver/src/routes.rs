//! Route table
//!
//! Maps the many URL shapes an article has been published under onto the
//! three-segment model consumed by [`classify`](crate::classify::classify).
//!
//! Patterns are made of static segments and the `{category}`, `{source}` and
//! `{slug}` parameters:
//!
//! ```text
//! /news/source/{source}/{slug}   → source + slug
//! /news/{category}/{slug}        → category + slug
//! /news/{slug}                   → slug only
//! /article/{slug}                → slug only (legacy)
//! ```
//!
//! Patterns are tried in order and the first match wins.

use crate::classify::RouteSegments;

pub const DEFAULT_PATTERNS: &[&str] = &[
    "/news/source/{source}/{slug}",
    "/news/{category}/{slug}",
    "/news/{slug}",
    "/article/{slug}",
    "/articles/{slug}",
    "/category/{category}/{slug}",
    "/source/{source}/{slug}",
    "/feed/{source}/{slug}",
];

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PatternError {
    #[error("route pattern '{0}' has no {{slug}} parameter")]
    MissingSlug(String),

    #[error("route pattern '{pattern}' uses unknown parameter '{param}'")]
    UnknownParam { pattern: String, param: String },

    #[error("route pattern '{pattern}' repeats parameter '{param}'")]
    DuplicateParam { pattern: String, param: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Param {
    Category,
    Source,
    Slug,
}

impl Param {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "category" => Some(Param::Category),
            "source" => Some(Param::Source),
            "slug" => Some(Param::Slug),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum PathSegment {
    Static(String),
    Param(Param),
}

#[derive(Clone, Debug)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<PathSegment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let trimmed = pattern.trim().trim_matches('/');
        let mut segments = Vec::new();
        let mut seen: Vec<Param> = Vec::new();

        for s in trimmed.split('/').filter(|s| !s.is_empty()) {
            match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => {
                    let param = Param::from_name(name).ok_or_else(|| PatternError::UnknownParam {
                        pattern: pattern.to_string(),
                        param: name.to_string(),
                    })?;
                    if seen.contains(&param) {
                        return Err(PatternError::DuplicateParam {
                            pattern: pattern.to_string(),
                            param: name.to_string(),
                        });
                    }
                    seen.push(param);
                    segments.push(PathSegment::Param(param));
                }
                None => segments.push(PathSegment::Static(s.to_string())),
            }
        }

        if !seen.contains(&Param::Slug) {
            return Err(PatternError::MissingSlug(pattern.to_string()));
        }

        Ok(RoutePattern {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Matches an already split request path.
    fn matches(&self, request_segments: &[&str]) -> Option<RouteSegments> {
        if request_segments.len() != self.segments.len() {
            return None;
        }

        let mut out = RouteSegments::default();
        for (seg, req_segment) in self.segments.iter().zip(request_segments) {
            match seg {
                PathSegment::Static(s) => {
                    if req_segment != s {
                        return None;
                    }
                }
                PathSegment::Param(Param::Category) => out.category = Some(req_segment.to_string()),
                PathSegment::Param(Param::Source) => out.source = Some(req_segment.to_string()),
                PathSegment::Param(Param::Slug) => out.slug = req_segment.to_string(),
            }
        }
        Some(out)
    }
}

#[derive(Clone, Debug)]
pub struct RouteTable {
    patterns: Vec<RoutePattern>,
}

impl RouteTable {
    pub fn new(patterns: Vec<RoutePattern>) -> Self {
        RouteTable { patterns }
    }

    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let patterns = patterns
            .iter()
            .map(|p| RoutePattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RouteTable::new(patterns))
    }

    /// Returns the segments of the first pattern matching `path`. Query string,
    /// fragment, repeated slashes and trailing slashes are ignored.
    pub fn segments(&self, path: &str) -> Option<RouteSegments> {
        let path = path.trim();
        let path = match path.find(['?', '#']) {
            Some(idx) => &path[..idx],
            None => path,
        };
        let request_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        self.patterns
            .iter()
            .find_map(|pattern| pattern.matches(&request_segments))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        let patterns = DEFAULT_PATTERNS
            .iter()
            .filter_map(|p| RoutePattern::parse(p).ok())
            .collect();
        RouteTable::new(patterns)
    }
}
