// Best-effort fetches started once an article is rendered. Each runs in its
// own task, failures are swallowed and never reach the article itself.
use crate::config::SatelliteConfig;
use crate::content_api::ContentApi;
use crate::metrics_defs::{RELATED_CACHE_HIT, SATELLITE_FAILURE};
use crate::navigation::{ArticleView, Mount};
use crate::types::{Article, ArticleIdentity};
use moka::sync::Cache;
use shared::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Clone)]
struct CachedRelated {
    items: Arc<Vec<Article>>,
    fetched_at: Instant,
}

/// Handles of the satellite tasks of one rendered article.
#[derive(Debug, Default)]
pub struct SatelliteTasks {
    handles: Vec<JoinHandle<()>>,
}

impl SatelliteTasks {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every task, including background refreshes.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("Satellite task panicked: {}", e);
            }
        }
    }
}

#[derive(Clone)]
pub struct SatelliteFetchers {
    api: Arc<dyn ContentApi>,
    config: SatelliteConfig,
    // Keyed by canonical path. Entries are kept past their freshness window so
    // a stale list can be shown while it refreshes.
    related_cache: Cache<String, CachedRelated>,
}

impl SatelliteFetchers {
    pub fn new(api: Arc<dyn ContentApi>, config: SatelliteConfig) -> Self {
        let related_cache = Cache::builder()
            .max_capacity(config.related_cache_capacity)
            .build();

        SatelliteFetchers {
            api,
            config,
            related_cache,
        }
    }

    pub fn freshness(&self) -> Duration {
        self.config.freshness()
    }

    pub fn cached_related(&self, identity: &ArticleIdentity) -> Option<Arc<Vec<Article>>> {
        self.related_cache
            .get(&identity.canonical_path())
            .map(|cached| cached.items)
    }

    /// Starts the enabled satellites for `identity`. Must be called from
    /// within a tokio runtime.
    pub fn spawn(
        &self,
        identity: &ArticleIdentity,
        view: Arc<dyn ArticleView>,
        mount: Mount,
    ) -> SatelliteTasks {
        let mut handles = Vec::with_capacity(2);

        if self.config.related {
            let this = self.clone();
            let identity = identity.clone();
            let view = view.clone();
            let mount = mount.clone();
            handles.push(tokio::spawn(async move {
                this.run_related(identity, view, mount).await;
            }));
        }

        if self.config.metric_hit {
            let api = self.api.clone();
            let identity = identity.clone();
            handles.push(tokio::spawn(async move {
                run_metric_hit(api, identity, view, mount).await;
            }));
        }

        SatelliteTasks { handles }
    }

    /// Stale-while-revalidate: a cached list is shown at once, and refreshed
    /// in the background only once it is older than the freshness window.
    async fn run_related(&self, identity: ArticleIdentity, view: Arc<dyn ArticleView>, mount: Mount) {
        let key = identity.canonical_path();
        let cached = self.related_cache.get(&key);

        if let Some(cached) = &cached {
            let fresh = cached.fetched_at.elapsed() < self.config.freshness();
            counter!(RELATED_CACHE_HIT, "freshness" => if fresh { "fresh" } else { "stale" })
                .increment(1);
            publish(&mount, || view.show_related(cached.items.clone()));
            if fresh {
                return;
            }
        }

        match self.api.fetch_related(&identity).await {
            Ok(items) => {
                let items = Arc::new(items);
                self.related_cache.insert(
                    key,
                    CachedRelated {
                        items: items.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                publish(&mount, || view.show_related(items));
            }
            Err(err) => {
                counter!(SATELLITE_FAILURE, "satellite" => "related").increment(1);
                tracing::debug!(%identity, %err, "related articles unavailable");
                // Keep whatever was already shown, otherwise degrade to an empty list
                if cached.is_none() {
                    publish(&mount, || view.show_related(Arc::new(Vec::new())));
                }
            }
        }
    }
}

async fn run_metric_hit(
    api: Arc<dyn ContentApi>,
    identity: ArticleIdentity,
    view: Arc<dyn ArticleView>,
    mount: Mount,
) {
    match api.post_metric_hit(&identity).await {
        Ok(views) => publish(&mount, || view.show_views(views)),
        Err(err) => {
            counter!(SATELLITE_FAILURE, "satellite" => "metric_hit").increment(1);
            tracing::debug!(%identity, %err, "metric hit failed");
        }
    }
}

fn publish(mount: &Mount, f: impl FnOnce()) {
    if mount.is_mounted() {
        f();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ResolveError;
    use crate::testutils::{FakeContentApi, RecordingView, article};
    use crate::types::ArticleKind;

    fn identity() -> ArticleIdentity {
        ArticleIdentity::new(ArticleKind::Authored, "tech", "abc").unwrap()
    }

    fn fetchers(api: &Arc<FakeContentApi>) -> SatelliteFetchers {
        SatelliteFetchers::new(api.clone(), SatelliteConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_related_and_views() {
        let api = Arc::new(
            FakeContentApi::new()
                .with_related(
                    "/news/tech/abc",
                    vec![article(ArticleKind::Authored, "tech", "other")],
                )
                .with_views("/news/tech/abc", 7),
        );
        let view = Arc::new(RecordingView::default());

        let tasks = fetchers(&api).spawn(&identity(), view.clone(), Mount::new());
        assert_eq!(tasks.len(), 2);
        tasks.join().await;

        assert_eq!(view.related_counts(), vec![1]);
        assert_eq!(view.views(), vec![7]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_independent() {
        let api = Arc::new(
            FakeContentApi::new()
                .with_failure(
                    "fetch_related:/news/tech/abc",
                    ResolveError::Network("timeout".into()),
                )
                .with_views("/news/tech/abc", 3),
        );
        let view = Arc::new(RecordingView::default());

        fetchers(&api)
            .spawn(&identity(), view.clone(), Mount::new())
            .join()
            .await;

        // Related degrades to an empty list, the view count still arrives
        assert_eq!(view.related_counts(), vec![0]);
        assert_eq!(view.views(), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_cache_skips_network() {
        let api = Arc::new(FakeContentApi::new().with_related(
            "/news/tech/abc",
            vec![article(ArticleKind::Authored, "tech", "other")],
        ));
        let fetchers = fetchers(&api);
        let view = Arc::new(RecordingView::default());

        fetchers.spawn(&identity(), view.clone(), Mount::new()).join().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        fetchers.spawn(&identity(), view.clone(), Mount::new()).join().await;

        assert_eq!(api.count_calls("fetch_related:"), 1);
        assert_eq!(view.related_counts(), vec![1, 1]);
        assert_eq!(api.count_calls("post_metric_hit:"), 2, "hits are never cached");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_cache_served_then_refreshed() {
        let api = Arc::new(FakeContentApi::new().with_related(
            "/news/tech/abc",
            vec![article(ArticleKind::Authored, "tech", "one")],
        ));
        let fetchers = fetchers(&api);
        let view = Arc::new(RecordingView::default());

        fetchers.spawn(&identity(), view.clone(), Mount::new()).join().await;

        api.set_related(
            "/news/tech/abc",
            vec![
                article(ArticleKind::Authored, "tech", "one"),
                article(ArticleKind::Authored, "tech", "two"),
            ],
        );
        tokio::time::advance(fetchers.freshness() + Duration::from_secs(1)).await;
        fetchers.spawn(&identity(), view.clone(), Mount::new()).join().await;

        // First visit, stale copy, refreshed copy
        assert_eq!(view.related_counts(), vec![1, 1, 2]);
        assert_eq!(api.count_calls("fetch_related:"), 2);
        assert_eq!(fetchers.cached_related(&identity()).unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_refresh_failure_keeps_cached_list() {
        let api = Arc::new(FakeContentApi::new().with_related(
            "/news/tech/abc",
            vec![article(ArticleKind::Authored, "tech", "one")],
        ));
        let fetchers = fetchers(&api);
        let view = Arc::new(RecordingView::default());
        fetchers.spawn(&identity(), view.clone(), Mount::new()).join().await;

        api.fail(
            "fetch_related:/news/tech/abc",
            ResolveError::Network("reset".into()),
        );
        tokio::time::advance(fetchers.freshness()).await;
        fetchers.spawn(&identity(), view.clone(), Mount::new()).join().await;

        assert_eq!(view.related_counts(), vec![1, 1]);
        assert_eq!(fetchers.cached_related(&identity()).unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmounted_view_receives_nothing() {
        let api = Arc::new(FakeContentApi::new().with_views("/news/tech/abc", 1));
        let view = Arc::new(RecordingView::default());
        let mount = Mount::new();
        mount.unmount();

        fetchers(&api).spawn(&identity(), view.clone(), mount).join().await;

        assert!(view.related_counts().is_empty());
        assert!(view.views().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_satellites() {
        let api = Arc::new(FakeContentApi::new());
        let config = SatelliteConfig {
            related: false,
            metric_hit: false,
            ..SatelliteConfig::default()
        };
        let tasks = SatelliteFetchers::new(api.clone(), config).spawn(
            &identity(),
            Arc::new(RecordingView::default()),
            Mount::new(),
        );
        assert!(tasks.is_empty());
        assert!(api.calls().is_empty());
    }
}
