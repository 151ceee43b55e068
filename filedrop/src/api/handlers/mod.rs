//! HTTP request handlers.
//!
//! - [`graphql`]: GraphQL execution and the GraphiQL IDE
//! - [`static_assets`]: embedded JS/CSS for the client page
//! - [`ui`]: the server-rendered client page
//! - [`uploads`]: serving previously uploaded files from disk
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts to a status code and a plain-text
//! message. The uploads responder is the exception: every miss is an empty 404.

pub mod graphql;
pub mod static_assets;
pub mod ui;
pub mod uploads;
