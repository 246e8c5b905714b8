use crate::classify::Strategy;
use crate::content_api::ContentApi;
use crate::errors::ResolveError;
use crate::metrics_defs::{CANDIDATE_MISS, SHORT_LINK_FALLBACK};
use crate::slug;
use crate::types::{Article, ArticleIdentity, ArticleKind};
use shared::counter;
use std::sync::Arc;

/// How an identity was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvedVia {
    /// Taken straight from the route segments, no network call.
    Route,
    /// Returned by the resolve endpoint.
    ResolveEndpoint,
    /// Found by treating a short link as a direct slug.
    SlugFallback,
}

/// The outcome of [`ResolutionClient::resolve`].
#[derive(Clone, Debug)]
pub struct Resolution {
    pub identity: ArticleIdentity,
    /// Slug spellings tried in order when fetching.
    pub slug_candidates: Vec<String>,
    /// Article already fetched while resolving; fetching it again is skipped.
    pub prefetched: Option<Arc<Article>>,
    pub via: ResolvedVia,
}

impl Resolution {
    pub fn from_identity(identity: ArticleIdentity, via: ResolvedVia) -> Self {
        Resolution {
            slug_candidates: vec![identity.slug().to_string()],
            identity,
            prefetched: None,
            via,
        }
    }
}

/// Tracks why the candidates of a cascade failed.
#[derive(Default)]
struct Misses {
    network: Option<String>,
}

impl Misses {
    fn record(&mut self, candidate: &str, err: ResolveError) {
        counter!(CANDIDATE_MISS).increment(1);
        match err {
            ResolveError::NotFound => {
                tracing::debug!(candidate, "candidate not found");
            }
            ResolveError::Malformed(reason) => {
                tracing::warn!(candidate, %reason, "malformed article payload, treating as not found");
            }
            ResolveError::Network(reason) => {
                tracing::warn!(candidate, %reason, "network error fetching candidate");
                self.network = Some(reason);
            }
        }
    }

    /// Not found only if no candidate failed for transient reasons.
    fn into_error(self) -> ResolveError {
        match self.network {
            Some(reason) => ResolveError::Network(reason),
            None => ResolveError::NotFound,
        }
    }
}

/// Resolves strategies to identities and fetches articles, walking the
/// candidate list in order and stopping at the first success.
///
/// The client performs HTTP calls only. It never touches the de-duplication
/// cache and never navigates.
#[derive(Clone)]
pub struct ResolutionClient {
    api: Arc<dyn ContentApi>,
}

impl ResolutionClient {
    pub fn new(api: Arc<dyn ContentApi>) -> Self {
        ResolutionClient { api }
    }

    pub async fn resolve(&self, strategy: &Strategy) -> Result<Resolution, ResolveError> {
        match strategy {
            Strategy::DirectAuthored { category, slug } => {
                Self::direct(ArticleKind::Authored, category, slug)
            }
            Strategy::DirectImported { source, slug } => {
                Self::direct(ArticleKind::Imported, source, slug)
            }
            Strategy::ShortLink { slug } => self.resolve_short_link(slug).await,
        }
    }

    /// Returns the prefetched article, or fetches each slug candidate in order.
    pub async fn fetch(&self, resolution: &Resolution) -> Result<Arc<Article>, ResolveError> {
        if let Some(article) = &resolution.prefetched {
            return Ok(article.clone());
        }

        let identity = &resolution.identity;
        let mut misses = Misses::default();
        for candidate in &resolution.slug_candidates {
            let result = match identity.kind() {
                ArticleKind::Authored => {
                    self.api
                        .fetch_authored(identity.parent_slug(), candidate)
                        .await
                }
                ArticleKind::Imported => {
                    self.api
                        .fetch_imported(identity.parent_slug(), candidate)
                        .await
                }
            };

            match result {
                Ok(article) => return Ok(Arc::new(article)),
                Err(err) => misses.record(candidate, err),
            }
        }

        Err(misses.into_error())
    }

    pub async fn fetch_identity(
        &self,
        identity: &ArticleIdentity,
    ) -> Result<Arc<Article>, ResolveError> {
        self.fetch(&Resolution::from_identity(identity.clone(), ResolvedVia::Route))
            .await
    }

    fn direct(kind: ArticleKind, parent: &str, raw_slug: &str) -> Result<Resolution, ResolveError> {
        let identity = ArticleIdentity::new(kind, parent, raw_slug).map_err(|err| {
            tracing::debug!(%err, "route does not name a valid article");
            ResolveError::NotFound
        })?;

        Ok(Resolution {
            identity,
            slug_candidates: slug::candidates(raw_slug),
            prefetched: None,
            via: ResolvedVia::Route,
        })
    }

    async fn resolve_short_link(&self, raw_slug: &str) -> Result<Resolution, ResolveError> {
        let normalized = slug::normalize(raw_slug);
        if normalized.is_empty() {
            return Err(ResolveError::NotFound);
        }

        match self.api.resolve(&normalized).await {
            Ok(identity) => {
                tracing::debug!(slug = %normalized, %identity, "short link resolved");
                return Ok(Resolution::from_identity(identity, ResolvedVia::ResolveEndpoint));
            }
            Err(err) => {
                tracing::info!(slug = %normalized, %err, "resolve failed, trying slug fallback");
            }
        }

        // Degrade to treating the short link as a direct slug, authored first.
        let candidates = slug::candidates(raw_slug);
        let mut misses = Misses::default();
        for kind in [ArticleKind::Authored, ArticleKind::Imported] {
            for candidate in &candidates {
                let result = match kind {
                    ArticleKind::Authored => self.api.fetch_authored_by_slug(candidate).await,
                    ArticleKind::Imported => self.api.fetch_imported_by_slug(candidate).await,
                };

                match result {
                    Ok(article) => {
                        counter!(SHORT_LINK_FALLBACK).increment(1);
                        return Ok(Resolution {
                            identity: article.identity.clone(),
                            slug_candidates: vec![article.identity.slug().to_string()],
                            prefetched: Some(Arc::new(article)),
                            via: ResolvedVia::SlugFallback,
                        });
                    }
                    Err(err) => misses.record(candidate, err),
                }
            }
        }

        Err(misses.into_error())
    }
}
