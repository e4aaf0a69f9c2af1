use hearback_core::{AttachmentKind, AttachmentRecord, PersistedAttachment};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Why a single attachment was dropped during ingestion. None of these abort
/// the session.
#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    /// The source file no longer exists.
    #[error("source '{0}' does not exist")]
    Missing(PathBuf),

    /// The name reduces to nothing usable as a file name.
    #[error("'{0}' is not a usable file name")]
    InvalidName(String),

    /// Creating the session directory or copying the bytes failed.
    #[error("failed to copy '{path}': {source}")]
    CopyFailure {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Copies agent-reported attachments into
/// `attachments_root/attachments/{session_id}/`.
///
/// The session directory outlives the session; nothing here removes it.
#[derive(Debug, Clone)]
pub struct AttachmentIngestor {
    attachments_root: PathBuf,
}

impl AttachmentIngestor {
    /// Ingestor writing under `attachments_root`.
    pub fn new(attachments_root: impl Into<PathBuf>) -> Self {
        Self {
            attachments_root: attachments_root.into(),
        }
    }

    /// Directory holding one session's attachments.
    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.attachments_root.join("attachments").join(session_id)
    }

    /// Ingest every record independently. Records that fail are logged and
    /// left out; the rest keep their input order.
    pub async fn ingest(
        &self,
        session_id: &str,
        records: Vec<AttachmentRecord>,
    ) -> Vec<PersistedAttachment> {
        let dir = self.session_dir(session_id);
        let mut taken = HashSet::new();
        let mut persisted = Vec::with_capacity(records.len());

        for record in records {
            let id = record.id.clone();
            let name = record.name.clone();
            match ingest_one(&dir, record, &mut taken).await {
                Ok(attachment) => {
                    debug!(
                        session_id,
                        attachment = %attachment.name,
                        size = attachment.size_bytes,
                        "Attachment persisted"
                    );
                    persisted.push(attachment);
                }
                Err(e) => {
                    warn!(
                        session_id,
                        attachment_id = %id,
                        attachment = %name,
                        error = %e,
                        "Dropping attachment"
                    );
                }
            }
        }

        persisted
    }
}

async fn ingest_one(
    dir: &Path,
    record: AttachmentRecord,
    taken: &mut HashSet<String>,
) -> Result<PersistedAttachment, AttachmentError> {
    if !tokio::fs::try_exists(&record.source_path)
        .await
        .unwrap_or(false)
    {
        return Err(AttachmentError::Missing(record.source_path));
    }

    let base = file_name_of(&record.name)
        .ok_or_else(|| AttachmentError::InvalidName(record.name.clone()))?;
    let name = claim_name(&base, taken);

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| AttachmentError::CopyFailure {
            path: dir.to_path_buf(),
            source,
        })?;

    let dest = dir.join(&name);
    tokio::fs::copy(&record.source_path, &dest)
        .await
        .map_err(|source| AttachmentError::CopyFailure {
            path: record.source_path.clone(),
            source,
        })?;

    let size_bytes = tokio::fs::metadata(&dest)
        .await
        .map_err(|source| AttachmentError::CopyFailure {
            path: dest.clone(),
            source,
        })?
        .len();

    let inline_data = match record.kind {
        AttachmentKind::Image => record.inline_data,
        AttachmentKind::File => None,
    };

    Ok(PersistedAttachment {
        name,
        kind: record.kind,
        size_bytes,
        inline_data,
        stored_path: dest,
    })
}

/// Final path component of an agent-supplied name, so a record can never
/// write outside its session directory.
fn file_name_of(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.to_string())
}

/// Reserve `base`, or `stem-N.ext` when an earlier record in the batch
/// already took it.
fn claim_name(base: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(base.to_string()) {
        return base.to_string();
    }
    let path = Path::new(base);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(base);
    let ext = path.extension().and_then(|e| e.to_str());
    let mut n = 1;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, path: &Path, kind: AttachmentKind) -> AttachmentRecord {
        AttachmentRecord {
            id: id.to_string(),
            name: name.to_string(),
            source_path: path.to_path_buf(),
            kind,
            size_bytes: 999,
            inline_data: Some("data:image/png;base64,AAEC".to_string()),
        }
    }

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(file_name_of("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(file_name_of("C:\\Users\\me\\a.png").as_deref(), Some("a.png"));
        assert!(file_name_of("").is_none());
        assert!(file_name_of("..").is_none());
        assert!(file_name_of("dir/").is_none());
    }

    #[test]
    fn test_claim_name_disambiguates() {
        let mut taken = HashSet::new();
        assert_eq!(claim_name("a.png", &mut taken), "a.png");
        assert_eq!(claim_name("a.png", &mut taken), "a-1.png");
        assert_eq!(claim_name("a.png", &mut taken), "a-2.png");
        assert_eq!(claim_name("README", &mut taken), "README");
        assert_eq!(claim_name("README", &mut taken), "README-1");
    }

    #[tokio::test]
    async fn test_ingest_copies_and_measures() {
        let src_dir = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("notes.txt");
        std::fs::write(&src, b"twelve bytes").unwrap();

        let ingestor = AttachmentIngestor::new(root.path());
        let out = ingestor
            .ingest("s1", vec![record("a", "notes.txt", &src, AttachmentKind::File)])
            .await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].size_bytes, 12);
        assert_eq!(out[0].kind, AttachmentKind::File);
        assert!(out[0].inline_data.is_none(), "files never carry previews");
        let stored = root.path().join("attachments").join("s1").join("notes.txt");
        assert_eq!(out[0].stored_path, stored);
        assert_eq!(std::fs::read(stored).unwrap(), b"twelve bytes");
    }

    #[tokio::test]
    async fn test_ingest_keeps_image_preview() {
        let src_dir = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("shot.png");
        std::fs::write(&src, [0u8, 1, 2]).unwrap();

        let ingestor = AttachmentIngestor::new(root.path());
        let out = ingestor
            .ingest("s2", vec![record("a", "shot.png", &src, AttachmentKind::Image)])
            .await;

        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].inline_data.as_deref(),
            Some("data:image/png;base64,AAEC")
        );
    }

    #[tokio::test]
    async fn test_ingest_drops_missing_and_preserves_order() {
        let src_dir = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let first = src_dir.path().join("first.txt");
        let third = src_dir.path().join("third.txt");
        std::fs::write(&first, b"1").unwrap();
        std::fs::write(&third, b"333").unwrap();

        let ingestor = AttachmentIngestor::new(root.path());
        let out = ingestor
            .ingest(
                "s3",
                vec![
                    record("1", "first.txt", &first, AttachmentKind::File),
                    record("2", "gone.txt", &src_dir.path().join("gone.txt"), AttachmentKind::File),
                    record("3", "third.txt", &third, AttachmentKind::File),
                ],
            )
            .await;

        let names: Vec<&str> = out.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["first.txt", "third.txt"]);
    }

    #[tokio::test]
    async fn test_ingest_nothing_creates_no_directory() {
        let root = tempfile::tempdir().unwrap();
        let ingestor = AttachmentIngestor::new(root.path());
        let out = ingestor
            .ingest(
                "s4",
                vec![record("1", "x", Path::new("/definitely/not/here"), AttachmentKind::File)],
            )
            .await;
        assert!(out.is_empty());
        assert!(!ingestor.session_dir("s4").exists());
    }

    #[tokio::test]
    async fn test_ingest_duplicate_names_get_distinct_files() {
        let src_dir = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let a = src_dir.path().join("a");
        let b = src_dir.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        std::fs::write(a.join("log.txt"), b"aa").unwrap();
        std::fs::write(b.join("log.txt"), b"bbbb").unwrap();

        let ingestor = AttachmentIngestor::new(root.path());
        let out = ingestor
            .ingest(
                "s5",
                vec![
                    record("1", "log.txt", &a.join("log.txt"), AttachmentKind::File),
                    record("2", "log.txt", &b.join("log.txt"), AttachmentKind::File),
                ],
            )
            .await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "log.txt");
        assert_eq!(out[1].name, "log-1.txt");
        assert_eq!(std::fs::read(&out[0].stored_path).unwrap(), b"aa");
        assert_eq!(std::fs::read(&out[1].stored_path).unwrap(), b"bbbb");
    }

    #[tokio::test]
    async fn test_ingest_directory_source_is_copy_failure() {
        let src_dir = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let ingestor = AttachmentIngestor::new(root.path());
        let out = ingestor
            .ingest(
                "s6",
                vec![record("1", "folder", src_dir.path(), AttachmentKind::File)],
            )
            .await;
        assert!(out.is_empty());
    }
}
