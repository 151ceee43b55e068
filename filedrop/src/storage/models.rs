use async_graphql::SimpleObject;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

/// Default for uploads whose multipart part carries no `Content-Type`
pub const DEFAULT_MIMETYPE: &str = "application/octet-stream";

/// Transfer encoding reported for every upload; multipart parts default to `7bit`
pub const DEFAULT_ENCODING: &str = "7bit";

/// Metadata of a stored upload. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
#[graphql(name = "File")]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    /// Original name as sent by the client
    pub filename: String,
    pub mimetype: String,
    pub encoding: String,
    /// Server-relative path the content is served from
    pub public_uri: String,
}

impl UploadRecord {
    pub fn is_image(&self) -> bool {
        self.mimetype.starts_with("image/")
    }
}

/// An upload on its way to disk: client-supplied metadata plus the byte stream.
pub struct IncomingUpload<R> {
    pub filename: String,
    pub mimetype: String,
    pub encoding: String,
    pub content: R,
}

impl<R: AsyncRead + Send + Unpin> IncomingUpload<R> {
    pub fn new(filename: impl Into<String>, mimetype: Option<String>, content: R) -> Self {
        Self {
            filename: filename.into(),
            mimetype: mimetype.unwrap_or_else(|| DEFAULT_MIMETYPE.to_string()),
            encoding: DEFAULT_ENCODING.to_string(),
            content,
        }
    }
}
