use crate::config::Config;
use resolver::classify::{Strategy, classify};
use resolver::routes::RouteTable;
use resolver::{
    Article, ArticleIdentity, ArticleKind, ArticlePipeline, ArticleView, AttemptOutcome,
    HttpContentApi, MemoryHistory, Mount, Navigator, slug,
};
use std::sync::Arc;

/// Redirects followed before `resolve` gives up.
const MAX_REDIRECTS: usize = 3;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error(transparent)]
    Validation(#[from] resolver::config::ValidationError),
    #[error(transparent)]
    Metrics(#[from] crate::observability::MetricsError),
    #[error("path {0} matches no article route")]
    Unmatched(String),
    #[error("gave up after {0} redirects")]
    TooManyRedirects(usize),
    #[error("article not found")]
    NotFound,
}

pub fn normalize(raw: &str) {
    println!("normalized: {}", slug::normalize(raw));
    println!("candidates: {}", slug::candidates(raw).join(", "));
}

pub fn classify_path(routes: &RouteTable, path: &str) -> Result<(), CliError> {
    let segments = routes
        .segments(path)
        .ok_or_else(|| CliError::Unmatched(path.to_string()))?;
    let strategy = classify(&segments);

    println!("category: {}", segments.category.as_deref().unwrap_or("-"));
    println!("source:   {}", segments.source.as_deref().unwrap_or("-"));
    println!("slug:     {}", segments.slug);
    println!("strategy: {strategy}");

    let direct = match &strategy {
        Strategy::DirectAuthored { category, slug } => {
            Some(ArticleIdentity::new(ArticleKind::Authored, category, slug))
        }
        Strategy::DirectImported { source, slug } => {
            Some(ArticleIdentity::new(ArticleKind::Imported, source, slug))
        }
        Strategy::ShortLink { .. } => None,
    };
    match direct {
        Some(Ok(identity)) => println!("canonical: {}", identity.canonical_path()),
        Some(Err(err)) => println!("canonical: - ({err})"),
        None => println!("canonical: - (needs resolve)"),
    }

    Ok(())
}

/// Runs navigation attempts for `path`, following redirects, and prints
/// what a view would show.
pub async fn resolve(config: &Config, path: &str) -> Result<(), CliError> {
    let api = Arc::new(HttpContentApi::new(&config.resolver.content_api));
    let history = Arc::new(MemoryHistory::new(path));
    let view = Arc::new(ConsoleView);
    let pipeline = ArticlePipeline::new(&config.resolver, api, history.clone(), view)?;
    let mount = Mount::new();

    for _ in 0..=MAX_REDIRECTS {
        let result = pipeline.navigate(&mount).await;
        println!("{} -> {}", history.current_path(), result.outcome.name());

        match result.outcome {
            AttemptOutcome::Redirected(_) => continue,
            AttemptOutcome::Rendered(_) => {
                result.satellites.join().await;
                return Ok(());
            }
            AttemptOutcome::NotFound => return Err(CliError::NotFound),
            AttemptOutcome::Skipped(_) | AttemptOutcome::Abandoned => return Ok(()),
        }
    }

    Err(CliError::TooManyRedirects(MAX_REDIRECTS))
}

struct ConsoleView;

impl ArticleView for ConsoleView {
    fn set_loading(&self, loading: bool) {
        tracing::debug!(loading, "loading state changed");
    }

    fn show_article(&self, article: Option<Arc<Article>>) {
        match article {
            Some(article) => {
                println!("canonical: {}", article.canonical_path());
                println!("title:     {}", article.title);
                if let Some(published_at) = &article.published_at {
                    println!("published: {published_at}");
                }
                if let Some(link) = &article.link {
                    println!("link:      {link}");
                }
            }
            None => println!("article not found"),
        }
    }

    fn show_related(&self, related: Arc<Vec<Article>>) {
        println!("related:   {}", related.len());
        for article in related.iter() {
            println!("  {} ({})", article.title, article.canonical_path());
        }
    }

    fn show_views(&self, views: u64) {
        println!("views:     {views}");
    }
}
