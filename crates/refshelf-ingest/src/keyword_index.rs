//! Keyword index: normalized keyword text to a stable identifier.
//!
//! ## Resolution Order
//!
//! 1. Normalize (trim, lowercase, cap at 15 characters)
//! 2. Cache lookup
//! 3. Exact match on `keyword.text`
//! 4. Insert-if-absent; a lost race re-reads the winner's row
//! 5. Cache the resolved id
//!
//! Keywords are never deleted, so a cached id never goes stale.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use refshelf_core::defaults::KEYWORD_CACHE_SIZE;
use refshelf_core::{
    normalize_keyword, tokenize_keywords, Error, KeywordId, KeywordRepository,
    ReferenceKeywordLink, Result,
};

/// Outcome of linking a keyword string to a reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkOutcome {
    /// Linked keyword ids, in token order.
    pub linked: Vec<KeywordId>,
    /// Tokens that failed to resolve or link.
    pub skipped: usize,
}

/// Caching keyword resolver.
#[derive(Clone)]
pub struct KeywordIndex {
    repo: Arc<dyn KeywordRepository>,
    cache: Arc<Mutex<LruCache<String, KeywordId>>>,
}

impl KeywordIndex {
    /// Create a new KeywordIndex with a 1000-entry LRU cache.
    pub fn new(repo: Arc<dyn KeywordRepository>) -> Self {
        Self::with_cache_size(repo, KEYWORD_CACHE_SIZE)
    }

    pub fn with_cache_size(repo: Arc<dyn KeywordRepository>, cache_size: usize) -> Self {
        let cache_size = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            repo,
            cache: Arc::new(Mutex::new(LruCache::new(cache_size))),
        }
    }

    /// Resolve one keyword to its id, creating it when absent.
    pub async fn resolve(&self, text: &str) -> Result<KeywordId> {
        let normalized = normalize_keyword(text)
            .ok_or_else(|| Error::Keyword("keyword is empty after normalization".to_string()))?;

        {
            let mut cache = self.cache.lock().await;
            if let Some(&id) = cache.get(&normalized) {
                return Ok(id);
            }
        }

        let id = match self.repo.find_by_text(&normalized).await? {
            Some(existing) => existing.id,
            None => match self.repo.insert_if_absent(&normalized).await? {
                Some(created) => {
                    debug!(
                        subsystem = "ingest",
                        component = "keyword_index",
                        op = "create",
                        keyword = %created.text,
                        "Created keyword"
                    );
                    created.id
                }
                None => self
                    .repo
                    .find_by_text(&normalized)
                    .await?
                    .map(|winner| winner.id)
                    .ok_or_else(|| {
                        Error::Keyword(format!("keyword '{}' vanished after insert", normalized))
                    })?,
            },
        };

        let mut cache = self.cache.lock().await;
        cache.put(normalized, id);
        Ok(id)
    }

    /// Tokenize `raw` and link each keyword to `reference_id`.
    ///
    /// At most the first 10 tokens are considered. A keyword occurring
    /// twice is linked once, at its first position. Failures are logged
    /// and skipped; they never fail the caller.
    pub async fn link_all(&self, reference_id: Uuid, raw: &str) -> LinkOutcome {
        let mut outcome = LinkOutcome::default();
        let mut seen = HashSet::new();

        for (position, token) in tokenize_keywords(raw).into_iter().enumerate() {
            let id = match self.resolve(token).await {
                Ok(id) => id,
                Err(e) => {
                    warn!(
                        subsystem = "ingest",
                        component = "keyword_index",
                        reference_id = %reference_id,
                        token,
                        error = %e,
                        "Skipping keyword"
                    );
                    outcome.skipped += 1;
                    continue;
                }
            };
            if !seen.insert(id) {
                continue;
            }

            let link = ReferenceKeywordLink {
                reference_id,
                keyword_id: id,
                position: position as i32,
            };
            match self.repo.add_link(link).await {
                Ok(_) => outcome.linked.push(id),
                Err(e) => {
                    warn!(
                        subsystem = "ingest",
                        component = "keyword_index",
                        reference_id = %reference_id,
                        keyword_id = %id,
                        error = %e,
                        "Failed to link keyword"
                    );
                    outcome.skipped += 1;
                }
            }
        }

        outcome
    }
}
