//! Storage path resolution.
//!
//! Image sets get a storage root of their own, `{collection}/{title}`,
//! reserved in the [`RootRegistry`] before anything is written. A taken
//! root is never reused: the resolver moves on to `{root}_1`, `{root}_2`,
//! and so on. Pdfs and other files share a flat `files/` folder per
//! collection and are kept apart by a microsecond timestamp prefix.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use refshelf_core::defaults::{EMPTY_SLUG, FILES_SEGMENT, PREVIEWS_SEGMENT};
use refshelf_core::file_safety::{file_stem, image_extension};
use refshelf_core::{sanitize_filename, ClassifiedAttachment, Error, Result, RootRegistry};

/// Upper bound on suffix probing for one base root.
const MAX_SUFFIX: u32 = 10_000;

/// A reserved (or computed) storage location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    /// Root of an image set, or full blob path of a pdf/file.
    pub root: String,
    /// Name shown to users; carries the same suffix as `root`.
    pub display_name: String,
}

/// Per-call memory of the last suffix consumed for each base root.
///
/// A second image set in the same call continues after the first one's
/// suffix instead of probing from zero again.
#[derive(Debug, Default)]
pub struct SuffixCursor {
    next: HashMap<String, u32>,
}

impl SuffixCursor {
    pub fn new() -> Self {
        Self::default()
    }

    fn start(&self, base: &str) -> u32 {
        self.next.get(base).copied().unwrap_or(0)
    }

    fn consumed(&mut self, base: &str, suffix: u32) {
        self.next.insert(base.to_string(), suffix + 1);
    }
}

/// An attachment with its storage paths decided, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAttachment {
    Link {
        url: String,
    },
    Image {
        location: StorageLocation,
        /// `(blob path, bytes)` in upload order.
        blobs: Vec<(String, Vec<u8>)>,
    },
    Pdf {
        stored_path: String,
        display_name: String,
        preview_path: String,
        payload: Vec<u8>,
    },
    File {
        stored_path: String,
        display_name: String,
        payload: Vec<u8>,
    },
}

impl PlannedAttachment {
    /// The image root this plan reserved, if any.
    pub fn reserved_root(&self) -> Option<&str> {
        match self {
            Self::Image { location, .. } => Some(&location.root),
            _ => None,
        }
    }
}

/// Slug used for storage path segments.
///
/// Alphanumerics of any script are kept (case preserved), every run of
/// other characters becomes a single `-`, and leading/trailing dashes are
/// trimmed. Empty results fall back to `untitled`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// UTC timestamp prefix for file blobs, `YYYYMMDDHHMMSSffffff`.
pub fn file_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S%6f").to_string()
}

/// Path of a pdf or file blob.
pub fn file_path(collection: &str, original_name: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}_{}",
        slugify(collection),
        FILES_SEGMENT,
        file_timestamp(at),
        sanitize_filename(original_name)
    )
}

/// Path of the rendered preview of a pdf.
pub fn preview_path(collection: &str, original_name: &str, at: DateTime<Utc>) -> String {
    let sanitized = sanitize_filename(original_name);
    format!(
        "{}/{}/{}_{}.png",
        slugify(collection),
        PREVIEWS_SEGMENT,
        file_timestamp(at),
        file_stem(&sanitized)
    )
}

/// Path of the `index`-th image under an image root.
pub fn image_blob_path(root: &str, index: usize, data: &[u8]) -> String {
    format!("{}/{}.{}", root, index, image_extension(data))
}

/// Image root of a blob written by [`image_blob_path`], if `path` is one.
///
/// File and preview blobs carry a timestamp prefix and never match.
pub fn image_root_of(path: &str) -> Option<&str> {
    let (root, name) = path.rsplit_once('/')?;
    let (index, ext) = name.split_once('.')?;
    let is_index = !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit());
    (is_index && !ext.is_empty() && !root.is_empty()).then_some(root)
}

/// Resolves collision-free storage locations.
pub struct PathResolver {
    registry: Arc<dyn RootRegistry>,
    key_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl PathResolver {
    pub fn new(registry: Arc<dyn RootRegistry>) -> Self {
        Self {
            registry,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    fn key_lock(&self, base: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .key_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(base.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn drop_key_lock(&self, base: &str) {
        let mut locks = self
            .key_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Only the map still holds it: nobody is waiting on this key.
        if locks.get(base).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(base);
        }
    }

    /// Reserve a fresh root for an image set.
    ///
    /// Tries `base`, then `base_1`, `base_2`, ... starting after the last
    /// suffix `cursor` consumed for this base. Reservation goes through
    /// the registry's atomic insert, so a root already in use is never
    /// returned even when another call races on the same title.
    pub async fn reserve_image_root(
        &self,
        collection: &str,
        title: &str,
        cursor: &mut SuffixCursor,
    ) -> Result<StorageLocation> {
        let base = format!("{}/{}", slugify(collection), slugify(title));
        let lock = self.key_lock(&base);
        let result = {
            let _guard = lock.lock().await;
            self.probe(&base, title, cursor).await
        };
        drop(lock);
        self.drop_key_lock(&base);
        result
    }

    async fn probe(
        &self,
        base: &str,
        title: &str,
        cursor: &mut SuffixCursor,
    ) -> Result<StorageLocation> {
        for suffix in cursor.start(base)..=MAX_SUFFIX {
            let (root, display_name) = if suffix == 0 {
                (base.to_string(), title.to_string())
            } else {
                (format!("{}_{}", base, suffix), format!("{}_{}", title, suffix))
            };
            if self.registry.try_reserve(&root).await? {
                cursor.consumed(base, suffix);
                debug!(
                    subsystem = "ingest",
                    component = "path_resolver",
                    op = "reserve",
                    storage_path = %root,
                    suffix,
                    "Reserved image root"
                );
                return Ok(StorageLocation { root, display_name });
            }
            trace!(storage_path = %root, "Image root taken");
        }
        Err(Error::Storage(format!(
            "No free storage root for '{}' after {} attempts",
            base, MAX_SUFFIX
        )))
    }

    /// Decide every storage path of one classified attachment.
    ///
    /// Only image sets touch the registry; the other kinds are computed
    /// from the collection name, the filename and `at`.
    pub async fn plan(
        &self,
        attachment: ClassifiedAttachment,
        collection: &str,
        title: &str,
        cursor: &mut SuffixCursor,
        at: DateTime<Utc>,
    ) -> Result<PlannedAttachment> {
        let planned = match attachment {
            ClassifiedAttachment::Link { url } => PlannedAttachment::Link { url },
            ClassifiedAttachment::Image { images } => {
                let location = self.reserve_image_root(collection, title, cursor).await?;
                let blobs = images
                    .into_iter()
                    .enumerate()
                    .map(|(index, data)| (image_blob_path(&location.root, index, &data), data))
                    .collect();
                PlannedAttachment::Image { location, blobs }
            }
            ClassifiedAttachment::Pdf {
                original_name,
                payload,
            } => PlannedAttachment::Pdf {
                stored_path: file_path(collection, &original_name, at),
                preview_path: preview_path(collection, &original_name, at),
                display_name: original_name,
                payload,
            },
            ClassifiedAttachment::File {
                original_name,
                payload,
            } => PlannedAttachment::File {
                stored_path: file_path(collection, &original_name, at),
                display_name: original_name,
                payload,
            },
        };
        Ok(planned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use refshelf_db::MemoryStore;

    const PNG: &[u8] = &[
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R', 0, 0, 0,
        1, 0, 0, 0, 1, 8, 2, 0, 0, 0, 0x90, 0x77, 0x53, 0xDE,
    ];

    fn resolver() -> (PathResolver, MemoryStore) {
        let store = MemoryStore::new();
        (PathResolver::new(Arc::new(store.clone())), store)
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 5).unwrap()
            + chrono::Duration::microseconds(42)
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Papers"), "Papers");
        assert_eq!(slugify("Deep Learning: A Survey"), "Deep-Learning-A-Survey");
        assert_eq!(slugify("  --spaced--  "), "spaced");
        assert_eq!(slugify("논문 모음"), "논문-모음");
        assert_eq!(slugify("../.."), "untitled");
        assert_eq!(slugify(""), "untitled");
    }

    #[test]
    fn test_file_timestamp_has_microseconds() {
        assert_eq!(file_timestamp(at()), "20261019083005000042");
    }

    #[test]
    fn test_file_and_preview_paths() {
        assert_eq!(
            file_path("Papers", "my paper.pdf", at()),
            "Papers/files/20261019083005000042_my_paper.pdf"
        );
        assert_eq!(
            preview_path("Papers", "my paper.pdf", at()),
            "Papers/previews/20261019083005000042_my_paper.png"
        );
        assert_eq!(
            file_path("Papers", "../../etc/passwd", at()),
            "Papers/files/20261019083005000042_passwd"
        );
    }

    #[test]
    fn test_image_blob_path_uses_magic_bytes() {
        assert_eq!(image_blob_path("Papers/Survey", 0, PNG), "Papers/Survey/0.png");
        assert_eq!(image_blob_path("Papers/Survey", 3, b"??"), "Papers/Survey/3.bin");
    }

    #[test]
    fn test_image_root_of() {
        assert_eq!(image_root_of("Papers/Survey_2/10.png"), Some("Papers/Survey_2"));
        assert_eq!(image_root_of("Papers/files/20261019120000000000_a.pdf"), None);
        assert_eq!(image_root_of("Papers/previews/20261019120000000000_a.png"), None);
        assert_eq!(image_root_of("0.png"), None);
    }

    #[tokio::test]
    async fn test_suffix_sequence_across_calls() {
        let (resolver, _store) = resolver();
        let mut roots = Vec::new();
        for _ in 0..3 {
            let mut cursor = SuffixCursor::new();
            let location = resolver
                .reserve_image_root("Papers", "Survey", &mut cursor)
                .await
                .unwrap();
            roots.push((location.root, location.display_name));
        }
        assert_eq!(
            roots,
            vec![
                ("Papers/Survey".to_string(), "Survey".to_string()),
                ("Papers/Survey_1".to_string(), "Survey_1".to_string()),
                ("Papers/Survey_2".to_string(), "Survey_2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_cursor_continues_within_one_call() {
        let (resolver, store) = resolver();
        store.try_reserve("Papers/Survey").await.unwrap();

        let mut cursor = SuffixCursor::new();
        let first = resolver
            .reserve_image_root("Papers", "Survey", &mut cursor)
            .await
            .unwrap();
        let second = resolver
            .reserve_image_root("Papers", "Survey", &mut cursor)
            .await
            .unwrap();
        assert_eq!(first.root, "Papers/Survey_1");
        assert_eq!(second.root, "Papers/Survey_2");
    }

    #[tokio::test]
    async fn test_released_root_is_reused() {
        let (resolver, store) = resolver();
        let mut cursor = SuffixCursor::new();
        let location = resolver
            .reserve_image_root("Papers", "Survey", &mut cursor)
            .await
            .unwrap();
        store.release(&location.root).await.unwrap();

        let again = resolver
            .reserve_image_root("Papers", "Survey", &mut SuffixCursor::new())
            .await
            .unwrap();
        assert_eq!(again.root, "Papers/Survey");
    }

    #[tokio::test]
    async fn test_concurrent_reservations_are_distinct() {
        let (resolver, store) = resolver();
        let resolver = Arc::new(resolver);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let resolver = resolver.clone();
            handles.push(tokio::spawn(async move {
                resolver
                    .reserve_image_root("Papers", "Survey", &mut SuffixCursor::new())
                    .await
                    .unwrap()
                    .root
            }));
        }
        let mut roots = Vec::new();
        for handle in handles {
            roots.push(handle.await.unwrap());
        }
        roots.sort();
        roots.dedup();
        assert_eq!(roots.len(), 8);
        assert_eq!(store.reserved_roots().len(), 8);
    }

    #[tokio::test]
    async fn test_plan_image_set() {
        let (resolver, _store) = resolver();
        let planned = resolver
            .plan(
                ClassifiedAttachment::Image {
                    images: vec![PNG.to_vec(), PNG.to_vec()],
                },
                "Papers",
                "Survey",
                &mut SuffixCursor::new(),
                at(),
            )
            .await
            .unwrap();

        match planned {
            PlannedAttachment::Image { location, blobs } => {
                assert_eq!(location.root, "Papers/Survey");
                let paths: Vec<&str> = blobs.iter().map(|(p, _)| p.as_str()).collect();
                assert_eq!(paths, vec!["Papers/Survey/0.png", "Papers/Survey/1.png"]);
            }
            other => panic!("expected image plan, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_plan_pdf_does_not_reserve() {
        let (resolver, store) = resolver();
        let planned = resolver
            .plan(
                ClassifiedAttachment::Pdf {
                    original_name: "a.pdf".to_string(),
                    payload: b"%PDF-1.4".to_vec(),
                },
                "Papers",
                "Survey",
                &mut SuffixCursor::new(),
                at(),
            )
            .await
            .unwrap();

        assert!(planned.reserved_root().is_none());
        assert!(store.reserved_roots().is_empty());
        match planned {
            PlannedAttachment::Pdf {
                stored_path,
                preview_path,
                display_name,
                ..
            } => {
                assert_eq!(stored_path, "Papers/files/20261019083005000042_a.pdf");
                assert_eq!(preview_path, "Papers/previews/20261019083005000042_a.png");
                assert_eq!(display_name, "a.pdf");
            }
            other => panic!("expected pdf plan, got {:?}", other),
        }
    }
}
