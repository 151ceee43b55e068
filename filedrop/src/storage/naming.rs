//! Public path generation for stored uploads.
//!
//! Every stored file is named `{token}{ext}`: a short random base-36 token plus the extension of
//! the name the client sent. It is addressed as `{prefix}/{token}{ext}`, with the name
//! percent-encoded. Nothing checks the generated name for collisions;
//! a collision overwrites the earlier file.

use rand::prelude::RngExt;
use rand::rng;

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a lowercase base-36 token of `len` characters.
pub fn generate_token(len: usize) -> String {
    let mut rng = rng();
    (0..len)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Extension of `filename`, including the leading dot, with its case preserved.
///
/// Only the last path component is considered, with either separator. Names without a dot, and names whose only dot is
/// the leading one (`.bashrc`), have no extension. A trailing dot yields `"."`.
pub fn extension_of(filename: &str) -> &str {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match base.rfind('.') {
        Some(idx) if base[..idx].chars().any(|c| c != '.') => &base[idx..],
        _ => "",
    }
}

/// The fixed URL prefix that all stored files are addressable under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadNamespace {
    prefix: String,
    token_length: usize,
}

impl UploadNamespace {
    /// `prefix` must start with `/` and have no trailing `/` (enforced by config validation).
    pub fn new(prefix: impl Into<String>, token_length: usize) -> Self {
        Self {
            prefix: prefix.into(),
            token_length,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generate a fresh storage name for an upload called `filename`: token plus original extension.
    pub fn file_name_for(&self, filename: &str) -> String {
        format!("{}{}", generate_token(self.token_length), extension_of(filename))
    }

    /// Public path of the stored file `file_name`, percent-encoded so it survives a round trip
    /// through a URL unchanged.
    pub fn public_uri_of(&self, file_name: &str) -> String {
        format!("{}/{}", self.prefix, urlencoding::encode(file_name))
    }

    /// Map a public path back to the bare file name it is stored under.
    ///
    /// Returns `None` unless `public_uri` is exactly `{prefix}/{name}` with `name` decoding to a
    /// single plain path component.
    pub fn file_name_of(&self, public_uri: &str) -> Option<String> {
        let rest = public_uri.strip_prefix(self.prefix.as_str())?.strip_prefix('/')?;
        let decoded = urlencoding::decode(rest).ok()?;
        is_plain_file_name(&decoded).then(|| decoded.into_owned())
    }
}

/// A single path component that cannot climb out of, or descend below, its directory.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}
