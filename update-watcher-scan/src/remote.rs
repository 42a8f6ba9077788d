//! Update metadata fetched from an HTTP endpoint.
//!
//! The endpoint is queried once per component kind with `?kind=core`,
//! `?kind=plugins` or `?kind=themes`. Core answers with a [`CoreUpdate`]
//! object; plugins and themes answer with an object keyed by component id
//! whose values are [`crate::provider::ComponentUpdate`]s.

use crate::error::MetadataError;
use crate::http;
use crate::provider::{Candidates, CoreUpdate, UpdateMetadataProvider};
use ureq::Agent;

pub struct HttpMetadataProvider {
    endpoint: url::Url,
    agent: Agent,
}

impl HttpMetadataProvider {
    /// Build a provider for `endpoint`, rejecting insecure or malformed URLs.
    pub fn new(endpoint: &str) -> Result<Self, MetadataError> {
        let endpoint = http::validate_endpoint_url(endpoint)?;
        Ok(Self {
            endpoint,
            agent: http::agent(),
        })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    /// Endpoint URL for one component kind. Existing query pairs are kept.
    pub fn kind_url(&self, kind: &str) -> url::Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("kind", kind);
        url
    }

    fn fetch<T: serde::de::DeserializeOwned>(&self, kind: &str) -> Result<T, MetadataError> {
        let url = self.kind_url(kind);
        log::debug!("Fetching {} update metadata from {}", kind, url);
        http::fetch_json(&self.agent, &url)
    }
}

impl UpdateMetadataProvider for HttpMetadataProvider {
    fn core_update(&self) -> Result<CoreUpdate, MetadataError> {
        self.fetch("core")
    }

    fn plugin_updates(&self) -> Result<Candidates, MetadataError> {
        self.fetch("plugins")
    }

    fn theme_updates(&self) -> Result<Candidates, MetadataError> {
        self.fetch("themes")
    }
}
