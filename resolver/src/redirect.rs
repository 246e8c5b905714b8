//! Redirect Controller
//!
//! One controller lives for one navigation attempt:
//!
//! ```text
//! Start ─┬─> Resolving ─┬─> RedirectIssued
//!        │              └─> Continuing ─> Fetching ─┬─> Rendered
//!        └──────────────────> Continuing            ├─> NotFound
//!                                                   └─> RedirectIssued
//! ```
//!
//! At most one redirect is issued per attempt. A redirect replaces the
//! current history entry and ends the attempt; the new path starts a fresh,
//! independent attempt.

use crate::errors::RedirectError;
use crate::navigation::Navigator;
use percent_encoding::percent_decode_str;
use std::borrow::Cow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptState {
    Start,
    Resolving,
    RedirectIssued,
    Continuing,
    Fetching,
    Rendered,
    NotFound,
}

impl AttemptState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptState::RedirectIssued | AttemptState::Rendered | AttemptState::NotFound
        )
    }

    fn can_transition_to(&self, to: AttemptState) -> bool {
        use AttemptState::*;

        matches!(
            (self, to),
            (Start, Resolving | Continuing | NotFound)
                | (Resolving, RedirectIssued | Continuing | NotFound)
                | (Continuing, Fetching | NotFound)
                | (Fetching, RedirectIssued | Rendered | NotFound)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedirectDecision {
    /// The current path already is the canonical one.
    Continue,
    /// The browser was sent to this path; the attempt is over.
    Redirected(String),
}

pub struct RedirectController<'a> {
    navigator: &'a dyn Navigator,
    current_path: String,
    state: AttemptState,
    trail: Vec<AttemptState>,
    issued: Option<String>,
}

impl<'a> RedirectController<'a> {
    /// Captures the current path and enters `Start`.
    pub fn start(navigator: &'a dyn Navigator) -> Self {
        RedirectController {
            current_path: navigator.current_path(),
            navigator,
            state: AttemptState::Start,
            trail: vec![AttemptState::Start],
            issued: None,
        }
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn trail(&self) -> &[AttemptState] {
        &self.trail
    }

    pub fn issued_redirect(&self) -> Option<&str> {
        self.issued.as_deref()
    }

    pub fn transition(&mut self, to: AttemptState) -> Result<(), RedirectError> {
        if !self.state.can_transition_to(to) {
            return Err(RedirectError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        self.trail.push(to);
        Ok(())
    }

    /// Redirects to `canonical` if it differs from the captured path and no
    /// redirect was issued yet in this attempt.
    pub fn check(&mut self, canonical: &str) -> Result<RedirectDecision, RedirectError> {
        if paths_match(&self.current_path, canonical) {
            return Ok(RedirectDecision::Continue);
        }

        if self.issued.is_some() {
            return Err(RedirectError::LoopPrevented {
                from: self.current_path.clone(),
                to: canonical.to_string(),
            });
        }

        self.transition(AttemptState::RedirectIssued)?;
        tracing::info!(from = %self.current_path, to = canonical, "redirecting to canonical path");
        self.navigator.replace(canonical);
        self.issued = Some(canonical.to_string());

        Ok(RedirectDecision::Redirected(canonical.to_string()))
    }
}

/// Compares two paths ignoring query, fragment, percent-encoding and
/// trailing slashes.
pub fn paths_match(a: &str, b: &str) -> bool {
    comparable_path(a) == comparable_path(b)
}

fn comparable_path(path: &str) -> Cow<'_, str> {
    let path = path.trim();
    let path = match path.find(['?', '#']) {
        Some(idx) => &path[..idx],
        None => path,
    };
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(path));

    let trimmed_len = decoded.trim_end_matches('/').len();
    if trimmed_len == 0 {
        return Cow::Borrowed("/");
    }
    match decoded {
        Cow::Borrowed(s) => Cow::Borrowed(&s[..trimmed_len]),
        Cow::Owned(mut s) => {
            s.truncate(trimmed_len);
            Cow::Owned(s)
        }
    }
}
