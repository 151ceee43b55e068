//! HTTP surface of the service.
//!
//! - **GraphQL** (`/graphql`): the `uploads` query and the `uploadFiles` mutation
//! - **Uploads** (`{uploads.path_prefix}/*`): raw bytes of stored files
//! - **UI** (`/`, `/assets/*`): the drag-and-drop page and its assets

pub mod handlers;
