// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST client for the catalog.
//!
//! Entity endpoints live under
//! `{location}/api/shared_spaces/{shared_space}/workspaces/{workspace}/{collection}`.
//! Authentication is a cookie session opened with the client id and secret;
//! an expired session (401) is renewed once per request.

use super::{
    CatalogClient, CatalogError, Condition, Entity, EntityQuery, ListItem, PagedList, RemoteError,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tsync_core::wire::list_nodes;
use tsync_core::EntityId;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
// Header names are case-insensitive; `from_static` needs lowercase.
const CLIENT_TYPE_HEADER: &str = "hpeclienttype";
const CLIENT_TYPE: &str = "HPE_CI_CLIENT";

fn default_timeout_secs() -> u64 {
    60
}

/// Connection settings for the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Base URL, e.g. `https://octane.example.com`
    pub location: String,
    pub shared_space: u64,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl CatalogSettings {
    /// Why these settings cannot be used, if they cannot.
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(self.location.trim()).map_err(|e| format!("location: {e}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("location: unsupported scheme {}", url.scheme()));
        }
        if self.shared_space == 0 {
            return Err("shared_space must be positive".to_string());
        }
        if self.client_id.trim().is_empty() {
            return Err("client_id is empty".to_string());
        }
        Ok(())
    }
}

/// Error body shapes returned by the catalog.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Many { errors: Vec<RemoteError> },
    One(RemoteError),
}

fn parse_errors(body: &[u8]) -> Option<Vec<RemoteError>> {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody::Many { errors }) => Some(errors),
        Ok(ErrorBody::One(error)) => Some(vec![error]),
        Err(_) => None,
    }
}

/// Map a non-success response body to a [`CatalogError`].
pub(crate) fn request_error(status: u16, body: &[u8]) -> CatalogError {
    match parse_errors(body) {
        Some(errors) if !errors.is_empty() => CatalogError::request(status, errors),
        errors => {
            let text = String::from_utf8_lossy(body);
            let message = if text.trim().is_empty() {
                "no error details".to_string()
            } else {
                text.chars().take(512).collect()
            };
            CatalogError::Request {
                status,
                errors,
                message,
            }
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

/// [`CatalogClient`] over HTTPS.
#[derive(Clone)]
pub struct HttpCatalogClient {
    http: reqwest::Client,
    settings: Arc<CatalogSettings>,
    signed_in: Arc<AtomicBool>,
}

impl HttpCatalogClient {
    pub fn new(settings: CatalogSettings) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        headers.insert(CLIENT_TYPE_HEADER, HeaderValue::from_static(CLIENT_TYPE));

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            http,
            settings: Arc::new(settings),
            signed_in: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    fn base(&self) -> &str {
        self.settings.location.trim().trim_end_matches('/')
    }

    pub(crate) fn collection_url(
        &self,
        workspace: u64,
        collection: &str,
    ) -> Result<Url, CatalogError> {
        let url = format!(
            "{}/api/shared_spaces/{}/workspaces/{}/{}",
            self.base(),
            self.settings.shared_space,
            workspace,
            collection
        );
        Url::parse(&url).map_err(|e| CatalogError::Transport(format!("invalid url {url}: {e}")))
    }

    pub(crate) fn query_url(
        &self,
        workspace: u64,
        query: &EntityQuery,
    ) -> Result<Url, CatalogError> {
        let mut url = self.collection_url(workspace, &query.collection)?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(rendered) = query.render() {
                pairs.append_pair("query", &rendered);
            }
            if !query.fields.is_empty() {
                pairs.append_pair("fields", &query.fields.join(","));
            }
            if query.offset > 0 {
                pairs.append_pair("offset", &query.offset.to_string());
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    async fn sign_in(&self) -> Result<(), CatalogError> {
        let url = format!("{}/authentication/sign_in", self.base());
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "client_id": self.settings.client_id,
                "client_secret": self.settings.client_secret,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(CatalogError::Auth(format!(
                "sign in returned {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body).chars().take(256).collect::<String>()
            )));
        }
        self.signed_in.store(true, Ordering::SeqCst);
        tracing::debug!(location = self.base(), "signed in to catalog");
        Ok(())
    }

    /// Send a request, signing in first if needed and once more on 401.
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Response, CatalogError> {
        let build = || -> RequestBuilder {
            let request = self.http.request(method.clone(), url.clone());
            match body {
                Some(body) => request.json(body),
                None => request,
            }
        };

        if !self.signed_in.load(Ordering::SeqCst) {
            self.sign_in().await?;
        }

        let response = build().send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check(response).await;
        }

        self.signed_in.store(false, Ordering::SeqCst);
        self.sign_in().await?;
        let response = build().send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.signed_in.store(false, Ordering::SeqCst);
            return Err(CatalogError::Auth(format!(
                "{} {} rejected after sign in",
                method,
                url.path()
            )));
        }
        check(response).await
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<T, CatalogError> {
        let response = self.execute(method, url, body).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

async fn check(response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(request_error(status.as_u16(), &body))
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn query_entities(
        &self,
        workspace: u64,
        query: &EntityQuery,
    ) -> Result<PagedList<Entity>, CatalogError> {
        let url = self.query_url(workspace, query)?;
        self.execute_json(Method::GET, url, None).await
    }

    async fn post_entities(
        &self,
        workspace: u64,
        collection: &str,
        body: &Value,
    ) -> Result<PagedList<Entity>, CatalogError> {
        let url = self.collection_url(workspace, collection)?;
        self.execute_json(Method::POST, url, Some(body)).await
    }

    async fn update_entities(
        &self,
        workspace: u64,
        collection: &str,
        body: &Value,
    ) -> Result<PagedList<Entity>, CatalogError> {
        let url = self.collection_url(workspace, collection)?;
        self.execute_json(Method::PUT, url, Some(body)).await
    }

    async fn update_entity(
        &self,
        workspace: u64,
        collection: &str,
        id: &EntityId,
        body: &Value,
    ) -> Result<Entity, CatalogError> {
        let mut url = self.collection_url(workspace, collection)?;
        let base_err = format!("{url} cannot be a base");
        url.path_segments_mut()
            .map_err(|()| CatalogError::Transport(base_err))?
            .push(id.as_str());
        self.execute_json(Method::PUT, url, Some(body)).await
    }

    async fn delete_entities(
        &self,
        workspace: u64,
        collection: &str,
        ids: &[EntityId],
    ) -> Result<(), CatalogError> {
        let query = EntityQuery::new(collection).filter(Condition::id_in(ids));
        let url = self.query_url(workspace, &query)?;
        self.execute(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn query_list_items(
        &self,
        workspace: u64,
        list_root: &str,
        offset: u32,
        limit: u32,
    ) -> Result<PagedList<ListItem>, CatalogError> {
        let mut query = EntityQuery::new(list_nodes::COLLECTION)
            .filter(Condition::refers_to_logical_name("list_root", list_root))
            .fields(&["id", "logical_name", "name"])
            .limit(limit);
        query.offset = offset;
        let url = self.query_url(workspace, &query)?;
        self.execute_json(Method::GET, url, None).await
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
