//! Reference assembly: create, update, fetch and delete references.
//!
//! A create call moves through the stages of [`IngestStage`]:
//!
//! ```text
//! Validating → CollectionResolved → ReferenceCreated
//!            → AttachmentsProcessing → KeywordsProcessing → Committed
//! ```
//!
//! Every attachment is classified before anything is written, so a bad
//! descriptor never leaves a reference or a blob behind. Storage paths are
//! reserved one attachment at a time in input order; blob writes and pdf
//! rendering then run with bounded parallelism. When a write fails, the
//! blobs already written are recorded in the orphan log and the reference
//! shell is deleted. Keyword failures are logged and never fail a call.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use refshelf_core::defaults::INGEST_CONCURRENCY;
use refshelf_core::{
    classify_all, Attachment, BlobStore, ClassifiedAttachment, Collection, CollectionDirectory,
    Error, IngestError, IngestStage, Keyword, KeywordRepository, NewOrphan, NewReference,
    OrphanLog, OrphanReason, PayloadLimits, PreviewRenderer, Reference, ReferenceDetail,
    ReferenceFieldUpdate, ReferenceRepository, ReferenceRequest, Result, RootRegistry,
    SweepReport,
};
use refshelf_db::{Database, MemoryBlobStore, MemoryStore};

use crate::keyword_index::KeywordIndex;
use crate::path_resolver::{image_root_of, PathResolver, PlannedAttachment, SuffixCursor};
use crate::preview::{PreviewArtifact, PreviewGenerator};

/// Default number of orphan log entries handled by one sweep.
pub const DEFAULT_SWEEP_BATCH: i64 = 500;

/// Tunables of the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestConfig {
    pub limits: PayloadLimits,
    /// Blob writes and renders in flight per call.
    pub concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            limits: PayloadLimits::default(),
            concurrency: INGEST_CONCURRENCY,
        }
    }
}

impl IngestConfig {
    pub fn with_max_upload_bytes(mut self, max_bytes: usize) -> Self {
        self.limits.max_bytes = max_bytes;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Collaborators the assembler is written against.
#[derive(Clone)]
pub struct IngestStores {
    pub collections: Arc<dyn CollectionDirectory>,
    pub references: Arc<dyn ReferenceRepository>,
    pub keywords: Arc<dyn KeywordRepository>,
    pub roots: Arc<dyn RootRegistry>,
    pub orphans: Arc<dyn OrphanLog>,
    pub blobs: Arc<dyn BlobStore>,
    pub renderer: Arc<dyn PreviewRenderer>,
}

impl IngestStores {
    /// Postgres repositories plus the given blob store and renderer.
    pub fn from_database(
        db: &Database,
        blobs: Arc<dyn BlobStore>,
        renderer: Arc<dyn PreviewRenderer>,
    ) -> Self {
        Self {
            collections: Arc::new(db.collections.clone()),
            references: Arc::new(db.references.clone()),
            keywords: Arc::new(db.keywords.clone()),
            roots: Arc::new(db.roots.clone()),
            orphans: Arc::new(db.orphans.clone()),
            blobs,
            renderer,
        }
    }

    /// Everything in memory.
    pub fn in_memory(
        store: MemoryStore,
        blobs: MemoryBlobStore,
        renderer: Arc<dyn PreviewRenderer>,
    ) -> Self {
        let shared = Arc::new(store);
        Self {
            collections: shared.clone(),
            references: shared.clone(),
            keywords: shared.clone(),
            roots: shared.clone(),
            orphans: shared,
            blobs: Arc::new(blobs),
            renderer,
        }
    }
}

/// Result of writing one planned attachment.
type StoreResult = std::result::Result<Attachment, (Error, Vec<String>)>;

/// A failed attachment batch: the first error plus everything to clean up.
struct BatchFailure {
    error: Error,
    written: Vec<String>,
    roots: Vec<String>,
}

/// Orchestrates classification, path resolution, previews, blob writes
/// and keyword linking for one reference at a time.
#[derive(Clone)]
pub struct ReferenceAssembler {
    stores: IngestStores,
    resolver: Arc<PathResolver>,
    previews: PreviewGenerator,
    keyword_index: KeywordIndex,
    config: IngestConfig,
}

impl ReferenceAssembler {
    pub fn new(stores: IngestStores, config: IngestConfig) -> Self {
        Self {
            resolver: Arc::new(PathResolver::new(stores.roots.clone())),
            previews: PreviewGenerator::new(stores.renderer.clone(), stores.blobs.clone()),
            keyword_index: KeywordIndex::new(stores.keywords.clone()),
            stores,
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    /// Ingest a new reference with at least one attachment.
    pub async fn create(
        &self,
        req: ReferenceRequest,
    ) -> std::result::Result<ReferenceDetail, IngestError> {
        let start = Instant::now();

        let collection_name = required(req.collection_name.as_deref(), "collectionName")
            .map_err(|e| IngestError::new(IngestStage::Validating, e))?;
        let title = required(req.title.as_deref(), "title")
            .map_err(|e| IngestError::new(IngestStage::Validating, e))?;
        let files = match req.files.as_deref() {
            Some(files) if !files.is_empty() => files,
            _ => {
                return Err(IngestError::new(
                    IngestStage::Validating,
                    Error::Validation("at least one attachment is required".to_string()),
                ))
            }
        };
        let classified = classify_all(files, &self.config.limits)
            .map_err(|e| IngestError::new(IngestStage::Validating, e))?;

        let collection = self
            .resolve_collection(collection_name)
            .await
            .map_err(|e| IngestError::new(IngestStage::CollectionResolved, e))?;

        let shell = self
            .stores
            .references
            .insert(NewReference {
                collection_id: collection.id,
                title: title.to_string(),
                memo: req.memo.clone().unwrap_or_default(),
            })
            .await
            .map_err(|e| IngestError::new(IngestStage::ReferenceCreated, e))?;
        debug!(
            subsystem = "ingest",
            component = "assembler",
            op = "create",
            reference_id = %shell.id,
            stage = %IngestStage::ReferenceCreated,
            "Reference shell persisted"
        );

        let attachments = match self
            .process_attachments(shell.id, &collection.name, title, classified)
            .await
        {
            Ok(attachments) => attachments,
            Err(failure) => {
                self.abandon(&failure, shell.id, OrphanReason::FailedIngestion)
                    .await;
                self.delete_shell(shell.id).await;
                return Err(IngestError::new(
                    IngestStage::AttachmentsProcessing,
                    failure.error,
                ));
            }
        };

        if let Err(e) = self
            .stores
            .references
            .set_attachments(shell.id, &attachments)
            .await
        {
            let failure = BatchFailure {
                error: e,
                written: blob_paths(&attachments),
                roots: image_roots(&attachments),
            };
            self.abandon(&failure, shell.id, OrphanReason::FailedIngestion)
                .await;
            self.delete_shell(shell.id).await;
            return Err(IngestError::new(
                IngestStage::AttachmentsProcessing,
                failure.error,
            ));
        }

        if let Some(raw) = non_blank(req.keywords.as_deref()) {
            let outcome = self.keyword_index.link_all(shell.id, raw).await;
            debug!(
                subsystem = "ingest",
                component = "assembler",
                reference_id = %shell.id,
                stage = %IngestStage::KeywordsProcessing,
                keyword_count = outcome.linked.len(),
                skipped = outcome.skipped,
                "Keywords linked"
            );
        }

        let detail = self
            .assemble(shell.id)
            .await
            .map_err(|e| IngestError::new(IngestStage::Committed, e))?;

        info!(
            subsystem = "ingest",
            component = "assembler",
            op = "create",
            reference_id = %detail.reference.id,
            collection = %collection.name,
            attachment_count = detail.reference.attachments.len(),
            keyword_count = detail.keywords.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Reference committed"
        );
        Ok(detail)
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// Partially update an existing reference.
    ///
    /// Blank fields are left as they are. A non-empty `files` list replaces
    /// the attachment list; the replaced blobs go to the orphan log rather
    /// than being deleted. A non-blank keyword string replaces the links.
    pub async fn update(
        &self,
        id: Uuid,
        req: ReferenceRequest,
    ) -> std::result::Result<ReferenceDetail, IngestError> {
        let start = Instant::now();

        let existing = self
            .fetch_reference(id)
            .await
            .map_err(|e| IngestError::new(IngestStage::Validating, e))?;
        let classified = match req.files.as_deref() {
            Some(files) if !files.is_empty() => Some(
                classify_all(files, &self.config.limits)
                    .map_err(|e| IngestError::new(IngestStage::Validating, e))?,
            ),
            _ => None,
        };

        let collection = match non_blank(req.collection_name.as_deref()) {
            Some(name) => self.resolve_collection(name).await,
            None => self.collection_of(&existing).await,
        }
        .map_err(|e| IngestError::new(IngestStage::CollectionResolved, e))?;

        let title = non_blank(req.title.as_deref()).unwrap_or(&existing.title);

        let new_attachments = match classified {
            Some(classified) => match self
                .process_attachments(id, &collection.name, title, classified)
                .await
            {
                Ok(attachments) => Some(attachments),
                Err(failure) => {
                    self.abandon(&failure, id, OrphanReason::FailedIngestion)
                        .await;
                    return Err(IngestError::new(
                        IngestStage::AttachmentsProcessing,
                        failure.error,
                    ));
                }
            },
            None => None,
        };

        let update = ReferenceFieldUpdate {
            collection_id: (collection.id != existing.collection_id).then_some(collection.id),
            title: non_blank(req.title.as_deref()).map(str::to_string),
            memo: non_blank(req.memo.as_deref()).map(str::to_string),
        };
        let persisted = self.persist_update(id, update, new_attachments.as_deref()).await;
        if let Err(e) = persisted {
            if let Some(attachments) = &new_attachments {
                let failure = BatchFailure {
                    error: e,
                    written: blob_paths(attachments),
                    roots: image_roots(attachments),
                };
                self.abandon(&failure, id, OrphanReason::FailedIngestion)
                    .await;
                return Err(IngestError::new(
                    IngestStage::AttachmentsProcessing,
                    failure.error,
                ));
            }
            return Err(IngestError::new(IngestStage::ReferenceCreated, e));
        }

        if new_attachments.is_some() {
            // Replaced image roots stay reserved until their blobs are swept.
            let replaced: Vec<NewOrphan> = blob_paths(&existing.attachments)
                .into_iter()
                .map(|path| NewOrphan {
                    path,
                    reason: OrphanReason::ReplacedOnUpdate,
                    reference_id: Some(id),
                })
                .collect();
            if let Err(e) = self.stores.orphans.record(replaced).await {
                warn!(
                    subsystem = "ingest",
                    component = "assembler",
                    op = "update",
                    reference_id = %id,
                    error = %e,
                    "Failed to record replaced blobs in the orphan log"
                );
            }
        }

        if let Some(raw) = non_blank(req.keywords.as_deref()) {
            if let Err(e) = self.stores.keywords.clear_links(id).await {
                warn!(
                    subsystem = "ingest",
                    component = "assembler",
                    reference_id = %id,
                    stage = %IngestStage::KeywordsProcessing,
                    error = %e,
                    "Failed to clear keyword links"
                );
            }
            self.keyword_index.link_all(id, raw).await;
        }

        let detail = self
            .assemble(id)
            .await
            .map_err(|e| IngestError::new(IngestStage::Committed, e))?;
        info!(
            subsystem = "ingest",
            component = "assembler",
            op = "update",
            reference_id = %id,
            attachment_count = detail.reference.attachments.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Reference updated"
        );
        Ok(detail)
    }

    async fn persist_update(
        &self,
        id: Uuid,
        update: ReferenceFieldUpdate,
        attachments: Option<&[Attachment]>,
    ) -> Result<()> {
        if !update.is_empty() {
            self.stores.references.update_fields(id, update).await?;
        }
        if let Some(attachments) = attachments {
            self.stores.references.set_attachments(id, attachments).await?;
        }
        Ok(())
    }

    // =========================================================================
    // READ / DELETE
    // =========================================================================

    /// Fetch a reference with its collection name and keyword texts.
    pub async fn get(&self, id: Uuid) -> Result<ReferenceDetail> {
        self.assemble(id).await
    }

    /// Delete a reference and, best effort, its blobs.
    ///
    /// Blobs that fail to delete are recorded in the orphan log. An image
    /// root is released only when every blob under it is gone.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let reference = self.fetch_reference(id).await?;
        if !self.stores.references.delete(id).await? {
            return Err(Error::ReferenceNotFound(id));
        }

        let mut failed = Vec::new();
        for path in blob_paths(&reference.attachments) {
            if let Err(e) = self.stores.blobs.delete(&path).await {
                warn!(
                    subsystem = "ingest",
                    component = "assembler",
                    op = "delete",
                    reference_id = %id,
                    storage_path = %path,
                    error = %e,
                    "Blob delete failed, recording orphan"
                );
                failed.push(path);
            }
        }

        for root in image_roots(&reference.attachments) {
            if failed.iter().any(|p| is_under(p, &root)) {
                continue;
            }
            if let Err(e) = self.stores.roots.release(&root).await {
                warn!(storage_path = %root, error = %e, "Failed to release image root");
            }
        }

        let failed_count = failed.len();
        if !failed.is_empty() {
            let orphans = failed
                .into_iter()
                .map(|path| NewOrphan {
                    path,
                    reason: OrphanReason::ReferenceDeleted,
                    reference_id: Some(id),
                })
                .collect();
            if let Err(e) = self.stores.orphans.record(orphans).await {
                error!(
                    subsystem = "ingest",
                    component = "assembler",
                    op = "delete",
                    reference_id = %id,
                    error = %e,
                    "Failed to record orphaned blobs"
                );
            }
        }

        info!(
            subsystem = "ingest",
            component = "assembler",
            op = "delete",
            reference_id = %id,
            orphaned = failed_count,
            "Reference deleted"
        );
        Ok(())
    }

    /// All keywords, ordered by text.
    pub async fn list_keywords(&self) -> Result<Vec<Keyword>> {
        self.stores.keywords.list().await
    }

    // =========================================================================
    // ORPHAN SWEEP
    // =========================================================================

    /// Delete up to `limit` blobs from the orphan log.
    ///
    /// Missing blobs count as swept. Entries whose delete fails stay in the
    /// log for the next sweep. Image roots emptied by the sweep are released.
    pub async fn sweep_orphans(&self, limit: i64) -> Result<SweepReport> {
        let start = Instant::now();
        let entries = self.stores.orphans.list(limit).await?;

        let mut swept_ids = Vec::with_capacity(entries.len());
        let mut swept_roots: BTreeMap<String, HashSet<Uuid>> = BTreeMap::new();
        let mut report = SweepReport::default();
        for entry in entries {
            match self.stores.blobs.delete(&entry.path).await {
                Ok(()) => {
                    swept_ids.push(entry.id);
                    if let Some(root) = image_root_of(&entry.path) {
                        let owners = swept_roots.entry(root.to_string()).or_default();
                        owners.extend(entry.reference_id);
                    }
                }
                Err(e) => {
                    warn!(
                        subsystem = "ingest",
                        component = "orphan_sweep",
                        storage_path = %entry.path,
                        reason = %entry.reason,
                        error = %e,
                        "Orphan delete failed"
                    );
                    report.failed += 1;
                }
            }
        }
        report.swept = swept_ids.len();
        self.stores.orphans.remove(&swept_ids).await?;

        let mut released = 0usize;
        for (root, owners) in &swept_roots {
            match self.root_is_idle(root, owners).await {
                Ok(true) => match self.stores.roots.release(root).await {
                    Ok(()) => released += 1,
                    Err(e) => {
                        warn!(storage_path = %root, error = %e, "Failed to release image root")
                    }
                },
                Ok(false) => {}
                Err(e) => warn!(
                    subsystem = "ingest",
                    component = "orphan_sweep",
                    storage_path = %root,
                    error = %e,
                    "Could not check image root, keeping it reserved"
                ),
            }
        }

        info!(
            subsystem = "ingest",
            component = "orphan_sweep",
            op = "sweep",
            swept = report.swept,
            failed = report.failed,
            released,
            duration_ms = start.elapsed().as_millis() as u64,
            "Orphan sweep finished"
        );
        Ok(report)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// A reserved root with no pending orphans and no live attachment.
    async fn root_is_idle(&self, root: &str, owners: &HashSet<Uuid>) -> Result<bool> {
        if !self.stores.roots.is_reserved(root).await? {
            return Ok(false);
        }
        if self.stores.orphans.has_pending_under(root).await? {
            return Ok(false);
        }
        for owner in owners {
            if let Some(reference) = self.stores.references.fetch(*owner).await? {
                if reference
                    .attachments
                    .iter()
                    .any(|a| a.image_root() == Some(root))
                {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    async fn resolve_collection(&self, name: &str) -> Result<Collection> {
        self.stores
            .collections
            .find_by_name(name)
            .await?
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    async fn collection_of(&self, reference: &Reference) -> Result<Collection> {
        self.stores
            .collections
            .get(reference.collection_id)
            .await?
            .ok_or_else(|| {
                Error::Internal(format!(
                    "collection {} of reference {} is missing",
                    reference.collection_id, reference.id
                ))
            })
    }

    async fn fetch_reference(&self, id: Uuid) -> Result<Reference> {
        self.stores
            .references
            .fetch(id)
            .await?
            .ok_or(Error::ReferenceNotFound(id))
    }

    async fn assemble(&self, id: Uuid) -> Result<ReferenceDetail> {
        let reference = self.fetch_reference(id).await?;
        let collection = self.collection_of(&reference).await?;
        let keywords = self
            .stores
            .keywords
            .for_reference(id)
            .await?
            .into_iter()
            .map(|k| k.text)
            .collect();
        Ok(ReferenceDetail {
            reference,
            collection_name: collection.name,
            keywords,
        })
    }

    /// Reserve paths in input order, then write with bounded parallelism.
    ///
    /// The returned attachments are in input order.
    async fn process_attachments(
        &self,
        reference_id: Uuid,
        collection: &str,
        title: &str,
        classified: Vec<ClassifiedAttachment>,
    ) -> std::result::Result<Vec<Attachment>, BatchFailure> {
        let mut cursor = SuffixCursor::new();
        let mut planned = Vec::with_capacity(classified.len());
        for attachment in classified {
            match self
                .resolver
                .plan(attachment, collection, title, &mut cursor, Utc::now())
                .await
            {
                Ok(plan) => planned.push(plan),
                Err(error) => {
                    return Err(BatchFailure {
                        error,
                        written: Vec::new(),
                        roots: planned
                            .iter()
                            .filter_map(|p| p.reserved_root().map(str::to_string))
                            .collect(),
                    })
                }
            }
        }
        let roots: Vec<String> = planned
            .iter()
            .filter_map(|p| p.reserved_root().map(str::to_string))
            .collect();

        debug!(
            subsystem = "ingest",
            component = "assembler",
            reference_id = %reference_id,
            stage = %IngestStage::AttachmentsProcessing,
            attachment_count = planned.len(),
            concurrency = self.config.concurrency,
            "Paths reserved, writing blobs"
        );

        let results: Vec<StoreResult> = stream::iter(planned)
            .map(|plan| self.store_planned(plan))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut attachments = Vec::with_capacity(results.len());
        let mut written = Vec::new();
        let mut first_error = None;
        for result in results {
            match result {
                Ok(attachment) => {
                    written.extend(attachment.blob_paths().into_iter().map(str::to_string));
                    attachments.push(attachment);
                }
                Err((error, partial)) => {
                    written.extend(partial);
                    first_error.get_or_insert(error);
                }
            }
        }

        match first_error {
            None => Ok(attachments),
            Some(error) => Err(BatchFailure {
                error,
                written,
                roots,
            }),
        }
    }

    /// Write the blobs of one planned attachment.
    ///
    /// A pdf's preview is rendered and stored before the pdf itself.
    async fn store_planned(&self, plan: PlannedAttachment) -> StoreResult {
        let artifact = self.previews.preview(&plan).await.map_err(|e| (e, Vec::new()))?;

        match plan {
            PlannedAttachment::Link { url } => Ok(Attachment::Link { url }),
            PlannedAttachment::Image { location, blobs } => {
                let mut written = Vec::with_capacity(blobs.len());
                for (path, data) in &blobs {
                    if let Err(e) = self.stores.blobs.put(path, data).await {
                        return Err((e, written));
                    }
                    written.push(path.clone());
                }
                Ok(Attachment::Image {
                    stored_path: location.root,
                    display_name: location.display_name,
                    source_images: written,
                })
            }
            PlannedAttachment::Pdf {
                stored_path,
                display_name,
                preview_path,
                payload,
            } => {
                let preview_path = match artifact {
                    PreviewArtifact::Rendered { path } => path,
                    _ => preview_path,
                };
                if let Err(e) = self.stores.blobs.put(&stored_path, &payload).await {
                    return Err((e, vec![preview_path]));
                }
                Ok(Attachment::Pdf {
                    stored_path,
                    display_name,
                    preview_path,
                })
            }
            PlannedAttachment::File {
                stored_path,
                display_name,
                payload,
            } => {
                self.stores
                    .blobs
                    .put(&stored_path, &payload)
                    .await
                    .map_err(|e| (e, Vec::new()))?;
                Ok(Attachment::File {
                    stored_path,
                    display_name,
                })
            }
        }
    }

    /// Record the blobs of a failed batch as orphans and release the image
    /// roots that have nothing written under them.
    async fn abandon(&self, failure: &BatchFailure, reference_id: Uuid, reason: OrphanReason) {
        warn!(
            subsystem = "ingest",
            component = "assembler",
            reference_id = %reference_id,
            stage = %IngestStage::AttachmentsProcessing,
            orphaned = failure.written.len(),
            error = %failure.error,
            "Attachment processing failed"
        );

        if !failure.written.is_empty() {
            let orphans = failure
                .written
                .iter()
                .map(|path| NewOrphan {
                    path: path.clone(),
                    reason,
                    reference_id: Some(reference_id),
                })
                .collect();
            if let Err(e) = self.stores.orphans.record(orphans).await {
                error!(
                    subsystem = "ingest",
                    component = "assembler",
                    reference_id = %reference_id,
                    error = %e,
                    "Failed to record orphaned blobs"
                );
            }
        }

        for root in &failure.roots {
            if failure.written.iter().any(|p| is_under(p, root)) {
                continue;
            }
            if let Err(e) = self.stores.roots.release(root).await {
                warn!(storage_path = %root, error = %e, "Failed to release image root");
            }
        }
    }

    async fn delete_shell(&self, id: Uuid) {
        if let Err(e) = self.stores.references.delete(id).await {
            error!(
                subsystem = "ingest",
                component = "assembler",
                reference_id = %id,
                error = %e,
                "Failed to delete reference shell"
            );
        }
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    non_blank(value).ok_or_else(|| Error::Validation(format!("{} is required", field)))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn blob_paths(attachments: &[Attachment]) -> Vec<String> {
    attachments
        .iter()
        .flat_map(|a| a.blob_paths())
        .map(str::to_string)
        .collect()
}

fn image_roots(attachments: &[Attachment]) -> Vec<String> {
    let mut seen = HashSet::new();
    attachments
        .iter()
        .filter_map(Attachment::image_root)
        .filter(|root| seen.insert(*root))
        .map(str::to_string)
        .collect()
}

fn is_under(path: &str, root: &str) -> bool {
    path.strip_prefix(root)
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_blank() {
        assert!(required(Some("  "), "title").is_err());
        assert!(required(None, "title").is_err());
        assert_eq!(required(Some("Survey"), "title").unwrap(), "Survey");
    }

    #[test]
    fn test_is_under() {
        assert!(is_under("Papers/Survey/0.png", "Papers/Survey"));
        assert!(!is_under("Papers/Survey_1/0.png", "Papers/Survey"));
        assert!(!is_under("Papers/Survey", "Papers/Survey"));
    }

    #[test]
    fn test_ingest_config_concurrency_floor() {
        let config = IngestConfig::default().with_concurrency(0);
        assert_eq!(config.concurrency, 1);
        assert_eq!(
            IngestConfig::default().with_max_upload_bytes(10).limits.max_bytes,
            10
        );
    }
}
