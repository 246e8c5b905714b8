use crate::routes::{DEFAULT_PATTERNS, PatternError, RouteTable};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("content api url must be http or https, got '{0}'")]
    UnsupportedScheme(String),

    #[error("endpoint '{endpoint}' is missing the {{{placeholder}}} placeholder")]
    MissingPlaceholder {
        endpoint: &'static str,
        placeholder: &'static str,
    },

    #[error("related cache capacity cannot be 0")]
    ZeroCacheCapacity,

    #[error("at least one route pattern is required")]
    NoRoutes,

    #[error(transparent)]
    Route(#[from] PatternError),
}

/// Resolver configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    pub content_api: ContentApiConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub satellites: SatelliteConfig,
    /// Article route patterns, tried in order
    #[serde(default = "default_routes")]
    pub routes: Vec<String>,
}

impl Config {
    pub fn new(base_url: Url) -> Self {
        Config {
            content_api: ContentApiConfig {
                base_url,
                endpoints: Endpoints::default(),
            },
            navigation: NavigationConfig::default(),
            satellites: SatelliteConfig::default(),
            routes: default_routes(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.content_api.validate()?;
        self.satellites.validate()?;
        self.route_table()?;
        Ok(())
    }

    pub fn route_table(&self) -> Result<RouteTable, ValidationError> {
        if self.routes.is_empty() {
            return Err(ValidationError::NoRoutes);
        }
        Ok(RouteTable::from_patterns(&self.routes)?)
    }
}

fn default_routes() -> Vec<String> {
    DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect()
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ContentApiConfig {
    /// Base URL every endpoint template is joined onto
    pub base_url: Url,
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl ContentApiConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.base_url.scheme() {
            "http" | "https" => {}
            other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
        }
        self.endpoints.validate()
    }
}

/// Path templates of the content API, relative to the base URL.
///
/// Placeholders are substituted with percent-encoded path segments.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Endpoints {
    /// `{slug}` → `{kind, parentSlug, slug}`
    pub resolve: String,
    /// `{category}`, `{slug}` → article
    pub authored: String,
    /// `{source}`, `{slug}` → article
    pub imported: String,
    /// `{slug}` → authored article, used when short-link resolution fails
    pub authored_by_slug: String,
    /// `{slug}` → imported article, used when short-link resolution fails
    pub imported_by_slug: String,
    /// `{kind}`, `{parent}`, `{slug}` → article list
    pub related: String,
    /// `{kind}`, `{parent}`, `{slug}` → `{views}`, POST
    pub metric_hit: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            resolve: "/articles/resolve/{slug}".into(),
            authored: "/categories/{category}/articles/{slug}".into(),
            imported: "/sources/{source}/articles/{slug}".into(),
            authored_by_slug: "/articles/{slug}".into(),
            imported_by_slug: "/imported-articles/{slug}".into(),
            related: "/articles/{kind}/{parent}/{slug}/related".into(),
            metric_hit: "/articles/{kind}/{parent}/{slug}/hits".into(),
        }
    }
}

impl Endpoints {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let checks: [(&'static str, &str, &[&'static str]); 7] = [
            ("resolve", &self.resolve, &["slug"]),
            ("authored", &self.authored, &["category", "slug"]),
            ("imported", &self.imported, &["source", "slug"]),
            ("authored_by_slug", &self.authored_by_slug, &["slug"]),
            ("imported_by_slug", &self.imported_by_slug, &["slug"]),
            ("related", &self.related, &["kind", "parent", "slug"]),
            ("metric_hit", &self.metric_hit, &["kind", "parent", "slug"]),
        ];

        for (endpoint, template, placeholders) in checks {
            for &placeholder in placeholders {
                if !template.contains(&format!("{{{placeholder}}}")) {
                    return Err(ValidationError::MissingPlaceholder {
                        endpoint,
                        placeholder,
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct NavigationConfig {
    /// Minimum spacing between two admitted navigation attempts
    pub debounce_ms: u64,
}

impl NavigationConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        NavigationConfig { debounce_ms: 600 }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SatelliteConfig {
    pub related: bool,
    pub metric_hit: bool,
    /// How long a cached related list is served without a refresh
    pub related_freshness_secs: u64,
    pub related_cache_capacity: u64,
}

impl SatelliteConfig {
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.related_freshness_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.related_cache_capacity == 0 {
            return Err(ValidationError::ZeroCacheCapacity);
        }
        Ok(())
    }
}

impl Default for SatelliteConfig {
    fn default() -> Self {
        SatelliteConfig {
            related: true,
            metric_hit: true,
            related_freshness_secs: 300,
            related_cache_capacity: 1000,
        }
    }
}
