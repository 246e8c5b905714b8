//! Metrics definitions for the resolver.

use shared::metrics_defs::{MetricDef, MetricType};

pub const NAVIGATION_SKIPPED: MetricDef = MetricDef {
    name: "navigation.skipped",
    metric_type: MetricType::Counter,
    description: "Navigation attempts skipped before any network work. Tagged with reason.",
};

pub const NAVIGATION_OUTCOME: MetricDef = MetricDef {
    name: "navigation.outcome",
    metric_type: MetricType::Counter,
    description: "Finished navigation attempts. Tagged with outcome and strategy.",
};

pub const NAVIGATION_DURATION: MetricDef = MetricDef {
    name: "navigation.duration",
    metric_type: MetricType::Histogram,
    description: "Time from admission to the final state of a navigation attempt in seconds",
};

pub const REDIRECT_LOOP_PREVENTED: MetricDef = MetricDef {
    name: "redirect.loop_prevented",
    metric_type: MetricType::Counter,
    description: "Second redirects suppressed within a single navigation attempt",
};

pub const SHORT_LINK_FALLBACK: MetricDef = MetricDef {
    name: "resolve.short_link_fallback",
    metric_type: MetricType::Counter,
    description: "Short links resolved through the slug-only fallback endpoints",
};

pub const CANDIDATE_MISS: MetricDef = MetricDef {
    name: "fetch.candidate_miss",
    metric_type: MetricType::Counter,
    description: "Slug candidates that failed before the cascade moved on",
};

pub const DEDUP_ENTRIES: MetricDef = MetricDef {
    name: "dedup.entries",
    metric_type: MetricType::Gauge,
    description: "Navigation keys held by the de-duplication cache",
};

pub const SATELLITE_FAILURE: MetricDef = MetricDef {
    name: "satellite.failure",
    metric_type: MetricType::Counter,
    description: "Swallowed satellite fetch failures. Tagged with satellite.",
};

pub const RELATED_CACHE_HIT: MetricDef = MetricDef {
    name: "satellite.related_cache.hit",
    metric_type: MetricType::Counter,
    description: "Related lists served from cache. Tagged with freshness.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    NAVIGATION_SKIPPED,
    NAVIGATION_OUTCOME,
    NAVIGATION_DURATION,
    REDIRECT_LOOP_PREVENTED,
    SHORT_LINK_FALLBACK,
    CANDIDATE_MISS,
    DEDUP_ENTRIES,
    SATELLITE_FAILURE,
    RELATED_CACHE_HIT,
];
