use crate::content_api::ContentApi;
use crate::errors::ResolveError;
use crate::navigation::ArticleView;
use crate::types::{Article, ArticleIdentity, ArticleKind};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

type Hook = Box<dyn Fn() + Send + Sync>;

pub fn article(kind: ArticleKind, parent: &str, slug: &str) -> Article {
    Article {
        identity: ArticleIdentity::new(kind, parent, slug).unwrap(),
        title: format!("Title of {slug}"),
        body: format!("<p>{slug}</p>"),
        cover_image: None,
        published_at: Some("2024-05-01T10:00:00Z".into()),
        link: None,
        source_name: None,
        category_name: None,
    }
}

/// In-memory content API.
///
/// Articles are stored under `"{kind}:{parent}/{slug}"`. Every call is logged
/// as `"{method}:{argument}"`, and unknown lookups answer `NotFound`. An
/// injected failure for a call key wins over any stored data. With a delay
/// set, every call is logged at once and answered after the delay.
#[derive(Default)]
pub struct FakeContentApi {
    articles: Mutex<HashMap<String, Article>>,
    resolves: Mutex<HashMap<String, ArticleIdentity>>,
    related: Mutex<HashMap<String, Vec<Article>>>,
    views: Mutex<HashMap<String, u64>>,
    failures: Mutex<HashMap<String, ResolveError>>,
    hooks: Mutex<HashMap<String, Hook>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl FakeContentApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_article(self, article: Article) -> Self {
        let key = article.identity.to_string();
        self.with_article_at(&key, article)
    }

    pub fn with_article_at(self, key: &str, article: Article) -> Self {
        self.articles.lock().insert(key.to_string(), article);
        self
    }

    pub fn with_resolve(self, slug: &str, kind: ArticleKind, parent: &str) -> Self {
        let identity = ArticleIdentity::new(kind, parent, slug).unwrap();
        self.resolves.lock().insert(slug.to_string(), identity);
        self
    }

    pub fn with_related(self, path: &str, related: Vec<Article>) -> Self {
        self.set_related(path, related);
        self
    }

    pub fn with_views(self, path: &str, views: u64) -> Self {
        self.views.lock().insert(path.to_string(), views);
        self
    }

    pub fn with_failure(self, call: &str, err: ResolveError) -> Self {
        self.fail(call, err);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Runs `hook` whenever `call` is made, before it is answered.
    pub fn on_call(self, call: &str, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks.lock().insert(call.to_string(), Box::new(hook));
        self
    }

    pub fn set_related(&self, path: &str, related: Vec<Article>) {
        self.related.lock().insert(path.to_string(), related);
    }

    pub fn fail(&self, call: &str, err: ResolveError) {
        self.failures.lock().insert(call.to_string(), err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    async fn record(&self, call: String) -> Result<(), ResolveError> {
        self.calls.lock().push(call.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(hook) = self.hooks.lock().get(&call) {
            hook();
        }
        match self.failures.lock().get(&call) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn stored(&self, kind: ArticleKind, parent: &str, slug: &str) -> Result<Article, ResolveError> {
        self.articles
            .lock()
            .get(&format!("{kind}:{parent}/{slug}"))
            .cloned()
            .ok_or(ResolveError::NotFound)
    }

    fn stored_by_slug(&self, kind: ArticleKind, slug: &str) -> Result<Article, ResolveError> {
        let prefix = format!("{kind}:");
        self.articles
            .lock()
            .iter()
            .find(|(key, _)| {
                key.strip_prefix(&prefix)
                    .and_then(|rest| rest.split_once('/'))
                    .is_some_and(|(_, stored)| stored == slug)
            })
            .map(|(_, article)| article.clone())
            .ok_or(ResolveError::NotFound)
    }
}

#[async_trait]
impl ContentApi for FakeContentApi {
    async fn resolve(&self, slug: &str) -> Result<ArticleIdentity, ResolveError> {
        self.record(format!("resolve:{slug}")).await?;
        self.resolves
            .lock()
            .get(slug)
            .cloned()
            .ok_or(ResolveError::NotFound)
    }

    async fn fetch_authored(&self, category: &str, slug: &str) -> Result<Article, ResolveError> {
        self.record(format!("fetch_authored:{category}/{slug}")).await?;
        self.stored(ArticleKind::Authored, category, slug)
    }

    async fn fetch_imported(&self, source: &str, slug: &str) -> Result<Article, ResolveError> {
        self.record(format!("fetch_imported:{source}/{slug}")).await?;
        self.stored(ArticleKind::Imported, source, slug)
    }

    async fn fetch_authored_by_slug(&self, slug: &str) -> Result<Article, ResolveError> {
        self.record(format!("fetch_authored_by_slug:{slug}")).await?;
        self.stored_by_slug(ArticleKind::Authored, slug)
    }

    async fn fetch_imported_by_slug(&self, slug: &str) -> Result<Article, ResolveError> {
        self.record(format!("fetch_imported_by_slug:{slug}")).await?;
        self.stored_by_slug(ArticleKind::Imported, slug)
    }

    async fn fetch_related(&self, identity: &ArticleIdentity) -> Result<Vec<Article>, ResolveError> {
        let path = identity.canonical_path();
        self.record(format!("fetch_related:{path}")).await?;
        self.related
            .lock()
            .get(&path)
            .cloned()
            .ok_or(ResolveError::NotFound)
    }

    async fn post_metric_hit(&self, identity: &ArticleIdentity) -> Result<u64, ResolveError> {
        let path = identity.canonical_path();
        self.record(format!("post_metric_hit:{path}")).await?;
        self.views
            .lock()
            .get(&path)
            .copied()
            .ok_or(ResolveError::NotFound)
    }
}

/// View that records everything it is shown.
#[derive(Default)]
pub struct RecordingView {
    loading: Mutex<Vec<bool>>,
    articles: Mutex<Vec<Option<String>>>,
    related: Mutex<Vec<usize>>,
    views: Mutex<Vec<u64>>,
}

impl RecordingView {
    pub fn loading(&self) -> Vec<bool> {
        self.loading.lock().clone()
    }

    /// Canonical paths of shown articles, `None` for not found.
    pub fn articles(&self) -> Vec<Option<String>> {
        self.articles.lock().clone()
    }

    pub fn related_counts(&self) -> Vec<usize> {
        self.related.lock().clone()
    }

    pub fn views(&self) -> Vec<u64> {
        self.views.lock().clone()
    }
}

impl ArticleView for RecordingView {
    fn set_loading(&self, loading: bool) {
        self.loading.lock().push(loading);
    }

    fn show_article(&self, article: Option<Arc<Article>>) {
        self.articles
            .lock()
            .push(article.map(|article| article.canonical_path()));
    }

    fn show_related(&self, related: Arc<Vec<Article>>) {
        self.related.lock().push(related.len());
    }

    fn show_views(&self, views: u64) {
        self.views.lock().push(views);
    }
}
