//! Article identity resolution.
//!
//! Turns an incoming article URL (short slug, legacy path, category+slug or
//! source+slug) into exactly one canonical article, fetches it once, redirects
//! the navigator to the canonical path when needed and keeps repeated
//! navigations from repeating network work.
//!
//! [`ArticlePipeline`] is the entry point; the other modules are its parts,
//! leaf first: [`slug`], [`classify`], [`client`], [`dedup`], [`redirect`]
//! and [`satellite`].

pub mod classify;
pub mod client;
pub mod config;
pub mod content_api;
pub mod dedup;
pub mod errors;
pub mod metrics_defs;
pub mod navigation;
pub mod pipeline;
pub mod redirect;
pub mod routes;
pub mod satellite;
pub mod slug;
pub mod types;

#[cfg(test)]
mod testutils;

pub use config::Config;
pub use content_api::{ContentApi, HttpContentApi};
pub use errors::{RedirectError, ResolveError};
pub use navigation::{ArticleView, MemoryHistory, Mount, Navigator};
pub use pipeline::{ArticlePipeline, AttemptOutcome, NavigationResult, SkipReason};
pub use types::{Article, ArticleIdentity, ArticleKind};
