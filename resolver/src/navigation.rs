//! Seams to the browser-side collaborators: the history provider, the mount
//! lifecycle and the view layer.

use crate::types::Article;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// History provider.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;

    /// Navigates without adding a history entry.
    fn replace(&self, path: &str);
}

/// Consumer of pipeline results. Only ever sees an article, nothing, or a
/// loading flag; errors never reach it.
pub trait ArticleView: Send + Sync {
    fn set_loading(&self, loading: bool);

    /// `None` means the article could not be found.
    fn show_article(&self, article: Option<Arc<Article>>);

    fn show_related(&self, related: Arc<Vec<Article>>);

    fn show_views(&self, views: u64);
}

/// Mount lifecycle flag of the view that started a navigation attempt.
///
/// Clones share the flag. Once unmounted, pending results are discarded.
#[derive(Clone, Debug)]
pub struct Mount(Arc<AtomicBool>);

impl Mount {
    pub fn new() -> Self {
        Mount(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn unmount(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Mount {
    fn default() -> Self {
        Mount::new()
    }
}

/// In-memory history: a stack of entries whose top is the current path.
pub struct MemoryHistory {
    entries: Mutex<Vec<String>>,
    replacements: Mutex<Vec<String>>,
}

impl MemoryHistory {
    pub fn new(initial: &str) -> Self {
        MemoryHistory {
            entries: Mutex::new(vec![initial.to_string()]),
            replacements: Mutex::new(Vec::new()),
        }
    }

    /// Adds a history entry, as a link click would.
    pub fn push(&self, path: &str) {
        self.entries.lock().push(path.to_string());
    }

    /// Goes back one entry. The first entry is never removed.
    pub fn back(&self) -> bool {
        let mut entries = self.entries.lock();
        if entries.len() > 1 {
            entries.pop();
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Every path passed to [`Navigator::replace`], oldest first.
    pub fn replacements(&self) -> Vec<String> {
        self.replacements.lock().clone()
    }
}

impl Navigator for MemoryHistory {
    fn current_path(&self) -> String {
        self.entries.lock().last().cloned().unwrap_or_default()
    }

    fn replace(&self, path: &str) {
        let mut entries = self.entries.lock();
        match entries.last_mut() {
            Some(last) => *last = path.to_string(),
            None => entries.push(path.to_string()),
        }
        self.replacements.lock().push(path.to_string());
    }
}
