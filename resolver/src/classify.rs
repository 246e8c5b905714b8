use std::fmt;

/// The three URL segments an article route can carry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteSegments {
    pub category: Option<String>,
    pub source: Option<String>,
    pub slug: String,
}

impl RouteSegments {
    pub fn short_link(slug: impl Into<String>) -> Self {
        RouteSegments {
            slug: slug.into(),
            ..Default::default()
        }
    }

    pub fn authored(category: impl Into<String>, slug: impl Into<String>) -> Self {
        RouteSegments {
            category: Some(category.into()),
            slug: slug.into(),
            ..Default::default()
        }
    }

    pub fn imported(source: impl Into<String>, slug: impl Into<String>) -> Self {
        RouteSegments {
            source: Some(source.into()),
            slug: slug.into(),
            ..Default::default()
        }
    }
}

/// How an article is reached from its route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Strategy {
    DirectImported { source: String, slug: String },
    DirectAuthored { category: String, slug: String },
    /// Slug only: the identity must be resolved before anything can be fetched.
    ShortLink { slug: String },
}

impl Strategy {
    pub fn slug(&self) -> &str {
        match self {
            Strategy::DirectImported { slug, .. }
            | Strategy::DirectAuthored { slug, .. }
            | Strategy::ShortLink { slug } => slug,
        }
    }

    pub fn needs_resolve(&self) -> bool {
        matches!(self, Strategy::ShortLink { .. })
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Strategy::DirectImported { .. } => "direct_imported",
            Strategy::DirectAuthored { .. } => "direct_authored",
            Strategy::ShortLink { .. } => "short_link",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::DirectImported { source, slug } => {
                write!(f, "DirectImported({source:?}, {slug:?})")
            }
            Strategy::DirectAuthored { category, slug } => {
                write!(f, "DirectAuthored({category:?}, {slug:?})")
            }
            Strategy::ShortLink { slug } => write!(f, "ShortLink({slug:?})"),
        }
    }
}

/// Picks the resolution strategy for a route. Pure and total.
///
/// Priority is source+slug, then category+slug, then slug alone. Blank
/// optional segments count as absent.
pub fn classify(segments: &RouteSegments) -> Strategy {
    fn present(s: &Option<String>) -> Option<&str> {
        s.as_deref().filter(|v| !v.trim().is_empty())
    }

    let slug = segments.slug.clone();

    if let Some(source) = present(&segments.source) {
        return Strategy::DirectImported {
            source: source.to_string(),
            slug,
        };
    }

    if let Some(category) = present(&segments.category) {
        return Strategy::DirectAuthored {
            category: category.to_string(),
            slug,
        };
    }

    Strategy::ShortLink { slug }
}
