//! Upload persistence: naming, disk storage and the in-memory record list.
//!
//! [`Uploads`] is the single entry point request handlers use. It generates a public path for
//! each incoming file, streams the bytes to the [`FileStorage`] backend and only then records the
//! [`UploadRecord`] in the [`UploadRegistry`].
//!
//! # Batches
//!
//! [`Uploads::save_batch`] is all-or-nothing with respect to the registry: files are written one
//! after another, and their records become visible only once every file in the batch has been
//! written. When a file fails, files written earlier in the same batch stay on disk without a
//! record.

pub mod local;
pub mod models;
pub mod naming;
pub mod registry;

pub use local::{FileStorage, LocalFileStorage};
pub use models::{IncomingUpload, UploadRecord};
pub use naming::UploadNamespace;
pub use registry::UploadRegistry;

use crate::errors::{Error, Result};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::instrument;

#[derive(Clone)]
pub struct Uploads {
    namespace: UploadNamespace,
    storage: Arc<dyn FileStorage>,
    registry: UploadRegistry,
}

impl Uploads {
    pub fn new(namespace: UploadNamespace, storage: Arc<dyn FileStorage>, registry: UploadRegistry) -> Self {
        Self {
            namespace,
            storage,
            registry,
        }
    }

    pub fn namespace(&self) -> &UploadNamespace {
        &self.namespace
    }

    /// Write one upload to disk, without recording it
    async fn write<R>(&self, upload: IncomingUpload<R>) -> Result<UploadRecord>
    where
        R: AsyncRead + Send + Unpin,
    {
        let IncomingUpload {
            filename,
            mimetype,
            encoding,
            mut content,
        } = upload;

        let file_name = self.namespace.file_name_for(&filename);
        let public_uri = self.namespace.public_uri_of(&file_name);

        let bytes = self.storage.store(&file_name, &mut content).await?;
        tracing::debug!(filename = %filename, public_uri = %public_uri, bytes, "Stored upload");

        Ok(UploadRecord {
            filename,
            mimetype,
            encoding,
            public_uri,
        })
    }

    /// Store every upload in order, recording them only if all succeed
    #[instrument(skip_all, fields(batch_size = uploads.len()))]
    pub async fn save_batch<R>(&self, uploads: Vec<IncomingUpload<R>>) -> Result<Vec<UploadRecord>>
    where
        R: AsyncRead + Send + Unpin,
    {
        let mut records = Vec::with_capacity(uploads.len());
        for upload in uploads {
            records.push(self.write(upload).await?);
        }

        self.registry.extend(records.iter().cloned()).await;
        tracing::info!(count = records.len(), "Upload batch stored");
        Ok(records)
    }

    /// All recorded uploads, oldest first
    pub async fn list(&self) -> Vec<UploadRecord> {
        self.registry.list().await
    }

    /// Raw bytes behind `public_uri`
    pub async fn read(&self, public_uri: &str) -> Result<Vec<u8>> {
        let file_name = self.namespace.file_name_of(public_uri).ok_or_else(|| Error::NotFound {
            resource: "Upload".to_string(),
            id: public_uri.to_string(),
        })?;
        self.storage.retrieve(&file_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::local::tests::FailingReader;
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;
    use tokio::io::AsyncRead;

    fn uploads_in(dir: &Path) -> Uploads {
        Uploads::new(
            UploadNamespace::new("/uploads", 9),
            Arc::new(LocalFileStorage::new(dir.to_path_buf())),
            UploadRegistry::new(),
        )
    }

    type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

    fn text_upload(name: &str, body: &'static [u8]) -> IncomingUpload<BoxedReader> {
        IncomingUpload::new(name, Some("text/plain".to_string()), Box::new(body) as BoxedReader)
    }

    fn failing_upload(name: &str, prefix: &[u8]) -> IncomingUpload<BoxedReader> {
        IncomingUpload::new(name, Some("text/plain".to_string()), Box::new(FailingReader::new(prefix)) as BoxedReader)
    }

    fn files_on_disk(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_save_single_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = uploads_in(dir.path());

        let records = uploads.save_batch(vec![text_upload("a.txt", b"0123456789")]).await.unwrap();
        let record = &records[0];

        assert_eq!(record.filename, "a.txt");
        assert_eq!(record.mimetype, "text/plain");
        assert_eq!(record.encoding, "7bit");
        assert!(record.public_uri.starts_with("/uploads/"));
        assert!(record.public_uri.ends_with(".txt"));

        assert_eq!(uploads.list().await, records);
        assert_eq!(uploads.read(&record.public_uri).await.unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn test_url_syntax_in_extension_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = uploads_in(dir.path());

        let records = uploads
            .save_batch(vec![text_upload("report.%41", b"percent"), text_upload("notes.a#b", b"hash")])
            .await
            .unwrap();

        assert!(records[0].public_uri.ends_with(".%2541"));
        assert!(records[1].public_uri.ends_with(".a%23b"));
        assert_eq!(uploads.read(&records[0].public_uri).await.unwrap(), b"percent");
        assert_eq!(uploads.read(&records[1].public_uri).await.unwrap(), b"hash");
    }

    #[tokio::test]
    async fn test_missing_mimetype_defaults_to_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = uploads_in(dir.path());

        let records = uploads
            .save_batch(vec![IncomingUpload::new("blob", None, &b"\x00\x01"[..])])
            .await
            .unwrap();
        let record = &records[0];

        assert_eq!(record.mimetype, "application/octet-stream");
        assert!(!record.is_image());
    }

    #[tokio::test]
    async fn test_batch_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = uploads_in(dir.path());

        let batch = vec![
            text_upload("one.txt", b"1"),
            text_upload("two.txt", b"22"),
            text_upload("three.txt", b"333"),
        ];
        let records = uploads.save_batch(batch).await.unwrap();

        let names: Vec<_> = records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, ["one.txt", "two.txt", "three.txt"]);
        assert_eq!(uploads.list().await, records);

        for (record, body) in records.iter().zip([&b"1"[..], b"22", b"333"]) {
            assert_eq!(uploads.read(&record.public_uri).await.unwrap(), body);
        }
    }

    #[tokio::test]
    async fn test_batch_failure_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = uploads_in(dir.path());

        let batch = vec![
            text_upload("first.txt", b"first file"),
            failing_upload("second.txt", b"half"),
            text_upload("third.txt", b"never written"),
        ];

        let result = uploads.save_batch(batch).await;

        assert!(matches!(result, Err(Error::Io(_))));
        assert!(uploads.list().await.is_empty());
        // the first file is orphaned on disk, the broken one is cleaned up, the third never started
        assert_eq!(files_on_disk(&dir), 1);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_disturb_earlier_records() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = uploads_in(dir.path());

        let kept = uploads.save_batch(vec![text_upload("kept.txt", b"kept")]).await.unwrap();

        assert!(uploads.save_batch(vec![failing_upload("bad.txt", b"")]).await.is_err());

        assert_eq!(uploads.list().await, kept);
    }

    #[tokio::test]
    async fn test_list_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = uploads_in(dir.path());
        uploads.save_batch(vec![text_upload("x.txt", b"x")]).await.unwrap();
        uploads.save_batch(vec![text_upload("y.txt", b"y")]).await.unwrap();

        assert_eq!(uploads.list().await, uploads.list().await);
    }

    #[tokio::test]
    async fn test_read_outside_namespace_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = uploads_in(dir.path());

        for uri in ["/elsewhere/a.txt", "/uploads/../a.txt", "/uploads/never-written.txt"] {
            let err = uploads.read(uri).await.unwrap_err();
            assert!(err.is_not_found(), "{uri}: {err}");
        }
    }

    #[tokio::test]
    async fn test_write_failure_surfaces_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = uploads_in(&dir.path().join("missing"));

        let result = uploads.save_batch(vec![text_upload("a.txt", b"data")]).await;

        assert!(matches!(result, Err(Error::Io(_))));
        assert!(uploads.list().await.is_empty());
    }
}
