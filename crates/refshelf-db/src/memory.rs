//! In-memory repositories and blob store.
//!
//! Deterministic stand-ins for the Postgres and filesystem implementations,
//! used by pipeline and HTTP tests and by local runs without a database.
//! `MemoryBlobStore` can be told to fail writes or deletes so that failure
//! paths can be exercised.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use refshelf_core::{
    new_v7, Attachment, BlobStore, Collection, CollectionDirectory, Error, Keyword,
    KeywordRepository, NewOrphan, NewReference, OrphanLog, OrphanedBlob, Reference,
    ReferenceFieldUpdate, ReferenceKeywordLink, ReferenceRepository, Result, RootRegistry,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct MemoryState {
    collections: Vec<Collection>,
    references: HashMap<Uuid, Reference>,
    keywords: Vec<Keyword>,
    links: Vec<ReferenceKeywordLink>,
    roots: HashSet<String>,
    orphans: Vec<OrphanedBlob>,
}

/// In-memory implementation of every repository trait.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored references.
    pub fn reference_count(&self) -> usize {
        lock(&self.state).references.len()
    }

    /// Every reserved storage root, sorted.
    pub fn reserved_roots(&self) -> Vec<String> {
        let mut roots: Vec<String> = lock(&self.state).roots.iter().cloned().collect();
        roots.sort();
        roots
    }

    /// Every keyword link, in insertion order.
    pub fn links(&self) -> Vec<ReferenceKeywordLink> {
        lock(&self.state).links.clone()
    }
}

#[async_trait]
impl CollectionDirectory for MemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Collection>> {
        Ok(lock(&self.state)
            .collections
            .iter()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Collection>> {
        Ok(lock(&self.state)
            .collections
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn insert(&self, name: &str, owner_id: Uuid) -> Result<Collection> {
        let mut state = lock(&self.state);
        if state
            .collections
            .iter()
            .any(|c| c.owner_id == owner_id && c.name == name)
        {
            return Err(Error::Validation(format!(
                "Collection already exists: {}",
                name
            )));
        }
        let collection = Collection {
            id: new_v7(),
            name: name.to_string(),
            owner_id,
            created_at_utc: Utc::now(),
        };
        state.collections.push(collection.clone());
        Ok(collection)
    }
}

#[async_trait]
impl ReferenceRepository for MemoryStore {
    async fn insert(&self, req: NewReference) -> Result<Reference> {
        let mut state = lock(&self.state);
        if !state.collections.iter().any(|c| c.id == req.collection_id) {
            return Err(Error::CollectionNotFound(req.collection_id.to_string()));
        }
        let now = Utc::now();
        let reference = Reference {
            id: new_v7(),
            collection_id: req.collection_id,
            title: req.title,
            memo: req.memo,
            attachments: Vec::new(),
            created_at_utc: now,
            updated_at_utc: now,
        };
        state.references.insert(reference.id, reference.clone());
        Ok(reference)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Reference>> {
        Ok(lock(&self.state).references.get(&id).cloned())
    }

    async fn set_attachments(&self, id: Uuid, attachments: &[Attachment]) -> Result<()> {
        let mut state = lock(&self.state);
        let reference = state
            .references
            .get_mut(&id)
            .ok_or(Error::ReferenceNotFound(id))?;
        reference.attachments = attachments.to_vec();
        reference.updated_at_utc = Utc::now();
        Ok(())
    }

    async fn update_fields(&self, id: Uuid, update: ReferenceFieldUpdate) -> Result<()> {
        let mut state = lock(&self.state);
        if let Some(collection_id) = update.collection_id {
            if !state.collections.iter().any(|c| c.id == collection_id) {
                return Err(Error::CollectionNotFound(collection_id.to_string()));
            }
        }
        let reference = state
            .references
            .get_mut(&id)
            .ok_or(Error::ReferenceNotFound(id))?;
        if let Some(collection_id) = update.collection_id {
            reference.collection_id = collection_id;
        }
        if let Some(title) = update.title {
            reference.title = title;
        }
        if let Some(memo) = update.memo {
            reference.memo = memo;
        }
        reference.updated_at_utc = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = lock(&self.state);
        let existed = state.references.remove(&id).is_some();
        state.links.retain(|l| l.reference_id != id);
        Ok(existed)
    }
}

#[async_trait]
impl KeywordRepository for MemoryStore {
    async fn find_by_text(&self, text: &str) -> Result<Option<Keyword>> {
        Ok(lock(&self.state)
            .keywords
            .iter()
            .find(|k| k.text == text)
            .cloned())
    }

    async fn insert_if_absent(&self, text: &str) -> Result<Option<Keyword>> {
        let mut state = lock(&self.state);
        if state.keywords.iter().any(|k| k.text == text) {
            return Ok(None);
        }
        let keyword = Keyword {
            id: new_v7(),
            text: text.to_string(),
            created_at_utc: Utc::now(),
        };
        state.keywords.push(keyword.clone());
        Ok(Some(keyword))
    }

    async fn list(&self) -> Result<Vec<Keyword>> {
        let mut keywords = lock(&self.state).keywords.clone();
        keywords.sort_by(|a, b| a.text.cmp(&b.text));
        Ok(keywords)
    }

    async fn add_link(&self, link: ReferenceKeywordLink) -> Result<bool> {
        let mut state = lock(&self.state);
        if !state.references.contains_key(&link.reference_id) {
            return Err(Error::ReferenceNotFound(link.reference_id));
        }
        if !state.keywords.iter().any(|k| k.id == link.keyword_id) {
            return Err(Error::NotFound(format!("Keyword {}", link.keyword_id)));
        }
        if state
            .links
            .iter()
            .any(|l| l.reference_id == link.reference_id && l.keyword_id == link.keyword_id)
        {
            return Ok(false);
        }
        state.links.push(link);
        Ok(true)
    }

    async fn clear_links(&self, reference_id: Uuid) -> Result<u64> {
        let mut state = lock(&self.state);
        let before = state.links.len();
        state.links.retain(|l| l.reference_id != reference_id);
        Ok((before - state.links.len()) as u64)
    }

    async fn for_reference(&self, reference_id: Uuid) -> Result<Vec<Keyword>> {
        let state = lock(&self.state);
        let mut links: Vec<&ReferenceKeywordLink> = state
            .links
            .iter()
            .filter(|l| l.reference_id == reference_id)
            .collect();
        links.sort_by_key(|l| l.position);
        Ok(links
            .into_iter()
            .filter_map(|l| state.keywords.iter().find(|k| k.id == l.keyword_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RootRegistry for MemoryStore {
    async fn try_reserve(&self, root: &str) -> Result<bool> {
        Ok(lock(&self.state).roots.insert(root.to_string()))
    }

    async fn release(&self, root: &str) -> Result<()> {
        lock(&self.state).roots.remove(root);
        Ok(())
    }

    async fn is_reserved(&self, root: &str) -> Result<bool> {
        Ok(lock(&self.state).roots.contains(root))
    }
}

#[async_trait]
impl OrphanLog for MemoryStore {
    async fn record(&self, orphans: Vec<NewOrphan>) -> Result<()> {
        let now = Utc::now();
        let mut state = lock(&self.state);
        state
            .orphans
            .extend(orphans.into_iter().map(|o| OrphanedBlob {
                id: new_v7(),
                path: o.path,
                reason: o.reason,
                reference_id: o.reference_id,
                recorded_at_utc: now,
            }));
        Ok(())
    }

    async fn list(&self, limit: i64) -> Result<Vec<OrphanedBlob>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(lock(&self.state)
            .orphans
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn remove(&self, ids: &[Uuid]) -> Result<()> {
        lock(&self.state).orphans.retain(|o| !ids.contains(&o.id));
        Ok(())
    }

    async fn has_pending_under(&self, root: &str) -> Result<bool> {
        let prefix = format!("{}/", root);
        Ok(lock(&self.state)
            .orphans
            .iter()
            .any(|o| o.path.starts_with(&prefix)))
    }
}

#[derive(Default)]
struct BlobState {
    blobs: BTreeMap<String, Vec<u8>>,
    fail_put_containing: Option<String>,
    fail_deletes: bool,
    put_calls: usize,
}

/// In-memory blob store with failure injection.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    state: Arc<Mutex<BlobState>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `put` whose path contains `fragment`.
    pub fn fail_puts_containing(&self, fragment: impl Into<String>) {
        lock(&self.state).fail_put_containing = Some(fragment.into());
    }

    /// Make every `delete` fail (or succeed again).
    pub fn fail_deletes(&self, fail: bool) {
        lock(&self.state).fail_deletes = fail;
    }

    /// Stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        lock(&self.state).blobs.keys().cloned().collect()
    }

    /// Contents of a stored blob.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.state).blobs.get(path).cloned()
    }

    /// Number of `put` calls, failed ones included.
    pub fn put_calls(&self) -> usize {
        lock(&self.state).put_calls
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut state = lock(&self.state);
        state.put_calls += 1;
        if let Some(fragment) = &state.fail_put_containing {
            if path.contains(fragment.as_str()) {
                return Err(Error::Storage(format!("Injected write failure: {}", path)));
            }
        }
        state.blobs.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail_deletes {
            return Err(Error::Storage(format!("Injected delete failure: {}", path)));
        }
        state.blobs.remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(lock(&self.state).blobs.contains_key(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refshelf_core::OrphanReason;

    async fn store_with_reference() -> (MemoryStore, Reference) {
        let store = MemoryStore::new();
        let collection = CollectionDirectory::insert(&store, "Papers", Uuid::nil())
            .await
            .unwrap();
        let reference = ReferenceRepository::insert(
            &store,
            NewReference {
                collection_id: collection.id,
                title: "Survey".to_string(),
                memo: String::new(),
            },
        )
        .await
        .unwrap();
        (store, reference)
    }

    #[tokio::test]
    async fn test_insert_if_absent_is_unique_by_text() {
        let store = MemoryStore::new();
        assert!(store.insert_if_absent("nlp").await.unwrap().is_some());
        assert!(store.insert_if_absent("nlp").await.unwrap().is_none());
        assert_eq!(KeywordRepository::list(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_reference_cascades_links() {
        let (store, reference) = store_with_reference().await;
        let keyword = store.insert_if_absent("nlp").await.unwrap().unwrap();
        store
            .add_link(ReferenceKeywordLink {
                reference_id: reference.id,
                keyword_id: keyword.id,
                position: 0,
            })
            .await
            .unwrap();

        assert!(ReferenceRepository::delete(&store, reference.id)
            .await
            .unwrap());
        assert!(store.links().is_empty());
        assert_eq!(store.reference_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_link_is_ignored() {
        let (store, reference) = store_with_reference().await;
        let keyword = store.insert_if_absent("nlp").await.unwrap().unwrap();
        let link = ReferenceKeywordLink {
            reference_id: reference.id,
            keyword_id: keyword.id,
            position: 0,
        };
        assert!(store.add_link(link).await.unwrap());
        assert!(!store.add_link(link).await.unwrap());
    }

    #[tokio::test]
    async fn test_root_reservation_is_exclusive() {
        let store = MemoryStore::new();
        assert!(store.try_reserve("papers/survey").await.unwrap());
        assert!(!store.try_reserve("papers/survey").await.unwrap());
        store.release("papers/survey").await.unwrap();
        assert!(store.try_reserve("papers/survey").await.unwrap());
    }

    #[tokio::test]
    async fn test_orphan_log_lists_oldest_first() {
        let store = MemoryStore::new();
        store
            .record(vec![
                NewOrphan {
                    path: "a".to_string(),
                    reason: OrphanReason::FailedIngestion,
                    reference_id: None,
                },
                NewOrphan {
                    path: "b".to_string(),
                    reason: OrphanReason::ReferenceDeleted,
                    reference_id: None,
                },
            ])
            .await
            .unwrap();

        let entries = OrphanLog::list(&store, 10).await.unwrap();
        assert_eq!(entries[0].path, "a");
        OrphanLog::remove(&store, &[entries[0].id]).await.unwrap();
        let entries = OrphanLog::list(&store, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "b");
    }

    #[tokio::test]
    async fn test_pending_orphans_are_matched_by_whole_segment() {
        let store = MemoryStore::new();
        store
            .record(vec![NewOrphan {
                path: "Papers/Survey_1/0.png".to_string(),
                reason: OrphanReason::ReplacedOnUpdate,
                reference_id: None,
            }])
            .await
            .unwrap();

        assert!(store.has_pending_under("Papers/Survey_1").await.unwrap());
        assert!(!store.has_pending_under("Papers/Survey").await.unwrap());
        assert!(!store.has_pending_under("Papers/Survey_").await.unwrap());
    }

    #[tokio::test]
    async fn test_blob_store_failure_injection() {
        let blobs = MemoryBlobStore::new();
        blobs.fail_puts_containing("/1.");
        blobs.put("p/s/0.png", b"a").await.unwrap();
        assert!(blobs.put("p/s/1.png", b"b").await.is_err());
        assert_eq!(blobs.paths(), vec!["p/s/0.png".to_string()]);
        assert_eq!(blobs.put_calls(), 2);

        blobs.fail_deletes(true);
        assert!(blobs.delete("p/s/0.png").await.is_err());
        assert!(blobs.exists("p/s/0.png").await.unwrap());
    }
}
