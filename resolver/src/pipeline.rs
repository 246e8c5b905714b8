//! The navigation entry point.
//!
//! One call to [`ArticlePipeline::navigate`] is one navigation attempt for
//! the navigator's current path:
//!
//! 1. The debounce guard and the de-dup cache decide whether the attempt runs
//!    at all. A skipped attempt makes no network call and leaves the view
//!    untouched.
//! 2. The route table turns the path into segments and the classifier picks a
//!    strategy.
//! 3. Short links are resolved first and redirected to their canonical path
//!    when it differs from the current one.
//! 4. The article is fetched and its own identity checked again; this late
//!    check may still redirect.
//! 5. If the view is still mounted the result is committed, the key is marked
//!    done and the satellites start.
//!
//! Errors never reach the view: every resolve or fetch failure ends in the
//! not-found state.

use crate::classify::{Strategy, classify};
use crate::client::ResolutionClient;
use crate::config::{Config, ValidationError};
use crate::content_api::ContentApi;
use crate::dedup::{DebounceGuard, RequestDedupCache};
use crate::errors::{RedirectError, ResolveError};
use crate::metrics_defs::{
    NAVIGATION_DURATION, NAVIGATION_OUTCOME, NAVIGATION_SKIPPED, REDIRECT_LOOP_PREVENTED,
};
use crate::navigation::{ArticleView, Mount, Navigator};
use crate::redirect::{AttemptState, RedirectController, RedirectDecision};
use crate::routes::RouteTable;
use crate::satellite::{SatelliteFetchers, SatelliteTasks};
use crate::types::Article;
use shared::{counter, histogram};
use std::sync::Arc;
use tokio::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The path was already attempted in this session.
    Duplicate,
    /// Another attempt was admitted less than the debounce interval ago.
    Debounced,
}

impl SkipReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Duplicate => "duplicate",
            SkipReason::Debounced => "debounced",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttemptOutcome {
    Skipped(SkipReason),
    /// The navigator was sent to this canonical path. The next attempt, for
    /// the new path, does the rest.
    Redirected(String),
    Rendered(Arc<Article>),
    NotFound,
    /// The view unmounted before the result could be committed.
    Abandoned,
}

impl AttemptOutcome {
    pub const fn name(&self) -> &'static str {
        match self {
            AttemptOutcome::Skipped(_) => "skipped",
            AttemptOutcome::Redirected(_) => "redirected",
            AttemptOutcome::Rendered(_) => "rendered",
            AttemptOutcome::NotFound => "not_found",
            AttemptOutcome::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug)]
pub struct NavigationResult {
    pub outcome: AttemptOutcome,
    /// States entered by the redirect controller. Empty for skipped attempts.
    pub trail: Vec<AttemptState>,
    /// Satellite tasks started for a rendered article.
    pub satellites: SatelliteTasks,
}

impl NavigationResult {
    fn skipped(reason: SkipReason) -> Self {
        NavigationResult {
            outcome: AttemptOutcome::Skipped(reason),
            trail: Vec::new(),
            satellites: SatelliteTasks::default(),
        }
    }
}

enum Step {
    Redirected(String),
    Found(Arc<Article>),
    Missing,
    Abandoned,
}

pub struct ArticlePipeline {
    routes: RouteTable,
    client: ResolutionClient,
    satellites: SatelliteFetchers,
    dedup: Arc<RequestDedupCache>,
    debounce: Arc<DebounceGuard>,
    navigator: Arc<dyn Navigator>,
    view: Arc<dyn ArticleView>,
}

impl ArticlePipeline {
    pub fn new(
        config: &Config,
        api: Arc<dyn ContentApi>,
        navigator: Arc<dyn Navigator>,
        view: Arc<dyn ArticleView>,
    ) -> Result<Self, ValidationError> {
        config.validate()?;

        Ok(ArticlePipeline {
            routes: config.route_table()?,
            client: ResolutionClient::new(api.clone()),
            satellites: SatelliteFetchers::new(api, config.satellites.clone()),
            dedup: Arc::new(RequestDedupCache::new()),
            debounce: Arc::new(DebounceGuard::new(config.navigation.debounce())),
            navigator,
            view,
        })
    }

    /// Shares a de-dup cache with other pipelines of the same session.
    pub fn with_dedup(mut self, dedup: Arc<RequestDedupCache>) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_debounce(mut self, debounce: Arc<DebounceGuard>) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn dedup(&self) -> &Arc<RequestDedupCache> {
        &self.dedup
    }

    pub fn satellites(&self) -> &SatelliteFetchers {
        &self.satellites
    }

    pub async fn navigate(&self, mount: &Mount) -> NavigationResult {
        let key = self.navigator.current_path();

        // A debounced attempt leaves the key untouched so it can run later
        if !self.debounce.admit(&key) {
            return self.skip(&key, SkipReason::Debounced);
        }
        if !self.dedup.try_begin(&key) {
            return self.skip(&key, SkipReason::Duplicate);
        }

        let started = Instant::now();
        self.view.set_loading(true);
        let mut controller = RedirectController::start(self.navigator.as_ref());

        let strategy = self.routes.segments(&key).map(|segments| classify(&segments));
        let strategy_name = strategy.as_ref().map_or("unmatched", Strategy::name);

        let step = match &strategy {
            Some(strategy) => {
                tracing::debug!(path = %key, %strategy, "navigation started");
                self.run(strategy, &mut controller, mount)
                    .await
                    .unwrap_or_else(|err| {
                        tracing::error!(path = %key, %err, "navigation aborted");
                        Step::Missing
                    })
            }
            None => {
                tracing::debug!(path = %key, "path matches no article route");
                Step::Missing
            }
        };

        let step = match step {
            Step::Found(_) | Step::Missing if !mount.is_mounted() => Step::Abandoned,
            step => step,
        };

        let mut satellites = SatelliteTasks::default();
        let outcome = match step {
            Step::Redirected(target) => {
                self.debounce.expect(&target);
                // The attempt for an already visited target is skipped and
                // would leave the view loading
                if self.dedup.state(&target).is_some() {
                    self.view.set_loading(false);
                }
                AttemptOutcome::Redirected(target)
            }
            Step::Found(article) => {
                finish(&mut controller, AttemptState::Rendered);
                self.view.show_article(Some(article.clone()));
                self.view.set_loading(false);
                satellites =
                    self.satellites
                        .spawn(&article.identity, self.view.clone(), mount.clone());
                AttemptOutcome::Rendered(article)
            }
            Step::Missing => {
                finish(&mut controller, AttemptState::NotFound);
                self.view.show_article(None);
                self.view.set_loading(false);
                AttemptOutcome::NotFound
            }
            Step::Abandoned => {
                tracing::debug!(path = %key, "view unmounted, discarding result");
                AttemptOutcome::Abandoned
            }
        };

        self.dedup.mark_done(&key);

        counter!(NAVIGATION_OUTCOME, "outcome" => outcome.name(), "strategy" => strategy_name)
            .increment(1);
        histogram!(NAVIGATION_DURATION).record(started.elapsed().as_secs_f64());
        tracing::info!(
            path = %key,
            strategy = strategy_name,
            outcome = outcome.name(),
            "navigation finished"
        );

        NavigationResult {
            outcome,
            trail: controller.trail().to_vec(),
            satellites,
        }
    }

    async fn run(
        &self,
        strategy: &Strategy,
        controller: &mut RedirectController<'_>,
        mount: &Mount,
    ) -> Result<Step, RedirectError> {
        if strategy.needs_resolve() {
            controller.transition(AttemptState::Resolving)?;
        }

        let resolution = match self.client.resolve(strategy).await {
            Ok(resolution) => resolution,
            Err(err) => {
                log_failure("resolve", strategy.slug(), &err);
                return Ok(Step::Missing);
            }
        };

        if strategy.needs_resolve() {
            if !mount.is_mounted() {
                return Ok(Step::Abandoned);
            }
            if let Some(target) = redirect(controller, &resolution.identity.canonical_path())? {
                return Ok(Step::Redirected(target));
            }
        }

        controller.transition(AttemptState::Continuing)?;
        controller.transition(AttemptState::Fetching)?;

        let article = match self.client.fetch(&resolution).await {
            Ok(article) => article,
            Err(err) => {
                log_failure("fetch", resolution.identity.slug(), &err);
                return Ok(Step::Missing);
            }
        };

        if !mount.is_mounted() {
            return Ok(Step::Abandoned);
        }
        // The fetched article's own identity wins over the resolved one
        if let Some(target) = redirect(controller, &article.canonical_path())? {
            return Ok(Step::Redirected(target));
        }

        Ok(Step::Found(article))
    }

    fn skip(&self, key: &str, reason: SkipReason) -> NavigationResult {
        tracing::debug!(path = key, reason = reason.as_str(), "navigation skipped");
        counter!(NAVIGATION_SKIPPED, "reason" => reason.as_str()).increment(1);
        NavigationResult::skipped(reason)
    }
}

/// Runs the redirect check. A suppressed second redirect is logged and the
/// attempt carries on with the current path.
fn redirect(
    controller: &mut RedirectController<'_>,
    canonical: &str,
) -> Result<Option<String>, RedirectError> {
    match controller.check(canonical) {
        Ok(RedirectDecision::Continue) => Ok(None),
        Ok(RedirectDecision::Redirected(target)) => Ok(Some(target)),
        Err(RedirectError::LoopPrevented { from, to }) => {
            counter!(REDIRECT_LOOP_PREVENTED).increment(1);
            tracing::warn!(%from, %to, "second redirect suppressed");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn finish(controller: &mut RedirectController<'_>, state: AttemptState) {
    if let Err(err) = controller.transition(state) {
        tracing::error!(%err, "cannot finish navigation attempt");
    }
}

fn log_failure(stage: &'static str, slug: &str, err: &ResolveError) {
    match err {
        ResolveError::Network(_) => tracing::warn!(stage, slug, %err, "article unavailable"),
        _ => tracing::info!(stage, slug, %err, "article not found"),
    }
}
