use crate::errors::ResolveError;
use crate::slug;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type NavigationKey = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleKind {
    /// Written on-platform, filed under a category.
    Authored,
    /// Syndicated from an external source.
    Imported,
}

impl ArticleKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ArticleKind::Authored => "authored",
            ArticleKind::Imported => "imported",
        }
    }
}

impl fmt::Display for ArticleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved identity of a piece of content.
///
/// Fields are normalized on construction, so two identities compare equal
/// exactly when they name the same article.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArticleIdentity {
    kind: ArticleKind,
    parent_slug: String,
    slug: String,
}

impl ArticleIdentity {
    pub fn new(kind: ArticleKind, parent_slug: &str, slug: &str) -> Result<Self, ResolveError> {
        let parent_slug = slug::normalize(parent_slug);
        let slug = slug::normalize(slug);

        if parent_slug.is_empty() {
            return Err(ResolveError::Malformed(format!(
                "{kind} article '{slug}' has no parent slug"
            )));
        }
        if slug.is_empty() {
            return Err(ResolveError::Malformed(format!(
                "{kind} article under '{parent_slug}' has no slug"
            )));
        }
        // Each part must stay a single path segment of the canonical path
        if parent_slug.contains('/') || slug.contains('/') {
            return Err(ResolveError::Malformed(format!(
                "{kind} article '{parent_slug}/{slug}' spans more than one path segment"
            )));
        }

        Ok(ArticleIdentity {
            kind,
            parent_slug,
            slug,
        })
    }

    pub fn kind(&self) -> ArticleKind {
        self.kind
    }

    /// Category slug for authored articles, source slug for imported ones.
    pub fn parent_slug(&self) -> &str {
        &self.parent_slug
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn canonical_path(&self) -> String {
        match self.kind {
            ArticleKind::Authored => format!("/news/{}/{}", self.parent_slug, self.slug),
            ArticleKind::Imported => format!("/news/source/{}/{}", self.parent_slug, self.slug),
        }
    }
}

impl fmt::Display for ArticleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.kind, self.parent_slug, self.slug)
    }
}

/// Identity triple as returned by the resolve endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub kind: Option<ArticleKind>,
    pub parent_slug: Option<String>,
    pub slug: Option<String>,
}

impl IdentityRecord {
    pub fn into_identity(self) -> Result<ArticleIdentity, ResolveError> {
        let kind = self
            .kind
            .ok_or_else(|| ResolveError::Malformed("resolve response has no kind".into()))?;
        ArticleIdentity::new(
            kind,
            self.parent_slug.as_deref().unwrap_or_default(),
            self.slug.as_deref().unwrap_or_default(),
        )
    }
}

/// Full article payload. Never mutated once fetched.
#[derive(Clone, Debug, PartialEq)]
pub struct Article {
    pub identity: ArticleIdentity,
    pub title: String,
    pub body: String,
    pub cover_image: Option<String>,
    pub published_at: Option<String>,
    pub link: Option<String>,
    pub source_name: Option<String>,
    pub category_name: Option<String>,
}

impl Article {
    pub fn canonical_path(&self) -> String {
        self.identity.canonical_path()
    }
}

/// Article as it comes off the wire.
///
/// Authored articles name their parent `category`, imported ones `source`;
/// `parentSlug` is accepted from either.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub kind: Option<ArticleKind>,
    pub slug: Option<String>,
    pub parent_slug: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "content")]
    pub body: String,
    pub cover_image: Option<String>,
    pub published_at: Option<String>,
    pub link: Option<String>,
    pub source_name: Option<String>,
    pub category_name: Option<String>,
}

impl ArticleRecord {
    /// Converts the record, using `expected` when the payload omits its kind.
    pub fn into_article(self, expected: ArticleKind) -> Result<Article, ResolveError> {
        let kind = self.kind.unwrap_or(expected);
        let parent = match kind {
            ArticleKind::Authored => self.parent_slug.or(self.category),
            ArticleKind::Imported => self.parent_slug.or(self.source),
        };
        let identity = ArticleIdentity::new(
            kind,
            parent.as_deref().unwrap_or_default(),
            self.slug.as_deref().unwrap_or_default(),
        )?;

        Ok(Article {
            identity,
            title: self.title,
            body: self.body,
            cover_image: self.cover_image,
            published_at: self.published_at,
            link: self.link,
            source_name: self.source_name,
            category_name: self.category_name,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MetricHit {
    pub views: u64,
}
