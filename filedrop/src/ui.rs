//! Server-rendered client page: a drop zone above the list of uploads.
//!
//! The page is rendered once per `GET /`; after that `static/app.js` keeps it current by
//! re-issuing the `uploads` query after each successful mutation. Both sides apply the same rule:
//! records whose mimetype starts with `image/` get an `<img>` pointing at
//! `public_base_uri + publicUri`, every record gets its filename label.

use anyhow::Context;
use minijinja::{Environment, context};
use serde::Serialize;

use crate::config::ClientConfig;
use crate::errors::Result;
use crate::storage::UploadRecord;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

/// What the page shows for a single upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileView {
    pub filename: String,
    /// Set only for images
    pub image_src: Option<String>,
}

impl FileView {
    pub fn new(record: &UploadRecord, public_base_uri: &str) -> Self {
        Self {
            filename: record.filename.clone(),
            image_src: record.is_image().then(|| format!("{public_base_uri}{}", record.public_uri)),
        }
    }
}

pub struct Ui {
    env: Environment<'static>,
    client: ClientConfig,
    graphql_endpoint: String,
}

impl Ui {
    pub fn new(client: ClientConfig, graphql_endpoint: impl Into<String>) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE).context("load page template")?;

        Ok(Self {
            env,
            client,
            graphql_endpoint: graphql_endpoint.into(),
        })
    }

    pub fn render_index(&self, uploads: &[UploadRecord]) -> Result<String> {
        let files: Vec<FileView> = uploads
            .iter()
            .map(|record| FileView::new(record, &self.client.public_base_uri))
            .collect();

        let template = self.env.get_template("index.html").context("look up page template")?;

        let html = template
            .render(context! {
                title => &self.client.title,
                public_base_uri => &self.client.public_base_uri,
                graphql_endpoint => &self.graphql_endpoint,
                files => &files,
            })
            .context("render page")?;
        Ok(html)
    }
}
