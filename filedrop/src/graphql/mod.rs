//! GraphQL schema: the `uploads` listing and the `uploadFiles` mutation.
//!
//! ```graphql
//! type File {
//!   filename: String!
//!   mimetype: String!
//!   encoding: String!
//!   publicUri: String!
//! }
//!
//! type Query {
//!   uploads: [File!]
//! }
//!
//! type Mutation {
//!   uploadFiles(files: [Upload!]!): [File!]
//! }
//! ```
//!
//! Files arrive through the GraphQL multipart request convention (`operations`, `map` and one
//! part per file), which `async-graphql` spools into temporary files before resolvers run.

use async_graphql::{Context, EmptySubscription, Object, Schema, Upload, UploadValue};
use tracing::{error, info};

use crate::storage::{IncomingUpload, UploadRecord, Uploads};

pub type UploadSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the executable schema over `uploads`
pub fn build_schema(uploads: Uploads) -> UploadSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription).data(uploads).finish()
}

/// Schema definition language of the API
pub fn sdl() -> String {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription).finish().sdl()
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Every upload recorded since the server started, oldest first
    async fn uploads(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<Vec<UploadRecord>>> {
        let uploads = ctx.data::<Uploads>()?;
        Ok(Some(uploads.list().await))
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Store the given files. Returns null, and records none of them, if any file fails.
    async fn upload_files(&self, ctx: &Context<'_>, files: Vec<Upload>) -> async_graphql::Result<Option<Vec<UploadRecord>>> {
        let uploads = ctx.data::<Uploads>()?;
        info!(batch_size = files.len(), "Receiving upload batch");

        let mut incoming = Vec::with_capacity(files.len());
        for file in &files {
            match file.value(ctx) {
                Ok(value) => incoming.push(into_incoming(value)),
                Err(e) => {
                    error!(error = %e, "Failed to open uploaded file");
                    return Ok(None);
                }
            }
        }

        match uploads.save_batch(incoming).await {
            Ok(records) => Ok(Some(records)),
            Err(e) => {
                error!(error = %e, "Upload batch failed");
                Ok(None)
            }
        }
    }
}

fn into_incoming(value: UploadValue) -> IncomingUpload<tokio::fs::File> {
    IncomingUpload::new(value.filename, value.content_type, tokio::fs::File::from_std(value.content))
}
