//! HTTP client for the form server
//!
//! Implements [`FormRemote`] over the server's JSON API. Status codes other
//! than 2xx become errors carrying the endpoint and response body.

use super::traits::FormRemote;
use crate::codec::AnswerPayload;
use crate::config::SyncConfig;
use crate::state::{
    FormDraftSnapshot, Identity, SessionId, SiblingSet, TempUpload, UploadFile, UploadScope,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("answer-sync/", env!("CARGO_PKG_VERSION"));

/// Client for communicating with the form server
pub struct HttpFormClient {
    http: reqwest::Client,
    /// Base URL, without trailing slash
    base_url: String,
    auth_token: Option<String>,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    respondent_id: &'a str,
    answers: &'a [AnswerPayload],
}

#[derive(Serialize)]
struct ReorderRequest<'a> {
    parent_id: &'a str,
    order_sequence: u32,
}

impl HttpFormClient {
    pub fn new(base_url: &str, auth_token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Self::new(
            &config.server_address(),
            config.auth_token.clone(),
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn draft_path(identity: &Identity) -> String {
        format!("drafts/{}/{}", identity.form_id, identity.respondent_id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Response> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| anyhow!("Request to {} failed: {}", endpoint, e))
    }

    async fn expect_success(response: Response, endpoint: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(anyhow!("{} returned {}: {}", endpoint, status, body))
    }
}

#[async_trait]
impl FormRemote for HttpFormClient {
    async fn fetch_draft(&self, identity: &Identity) -> Result<Option<FormDraftSnapshot>> {
        let endpoint = Self::draft_path(identity);
        let response = self
            .send(self.http.get(self.url(&endpoint)), &endpoint)
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::expect_success(response, &endpoint).await?;

        let snapshot = response
            .json::<Option<FormDraftSnapshot>>()
            .await
            .with_context(|| format!("Invalid draft body from {}", endpoint))?;
        Ok(snapshot)
    }

    async fn write_draft(&self, identity: &Identity, snapshot: &FormDraftSnapshot) -> Result<()> {
        let endpoint = Self::draft_path(identity);
        let response = self
            .send(self.http.put(self.url(&endpoint)).json(snapshot), &endpoint)
            .await?;
        Self::expect_success(response, &endpoint).await?;
        Ok(())
    }

    async fn delete_draft(&self, identity: &Identity) -> Result<()> {
        let endpoint = Self::draft_path(identity);
        let response = self
            .send(self.http.delete(self.url(&endpoint)), &endpoint)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::expect_success(response, &endpoint).await?;
        Ok(())
    }

    async fn submit_answers(&self, identity: &Identity, payloads: &[AnswerPayload]) -> Result<()> {
        let endpoint = format!("forms/{}/submissions", identity.form_id);
        let body = SubmitRequest {
            respondent_id: &identity.respondent_id,
            answers: payloads,
        };
        let response = self
            .send(self.http.post(self.url(&endpoint)).json(&body), &endpoint)
            .await?;
        Self::expect_success(response, &endpoint).await?;
        Ok(())
    }

    async fn update_answer(&self, answer_id: &str, payload: &AnswerPayload) -> Result<()> {
        let endpoint = format!("answers/{}", answer_id);
        let response = self
            .send(self.http.put(self.url(&endpoint)).json(payload), &endpoint)
            .await?;
        Self::expect_success(response, &endpoint).await?;
        Ok(())
    }

    async fn reorder_element(
        &self,
        parent: &SiblingSet,
        element_id: &str,
        new_sequence: u32,
    ) -> Result<()> {
        let endpoint = format!("{}/{}/order", parent.kind.collection(), element_id);
        let body = ReorderRequest {
            parent_id: &parent.parent_id,
            order_sequence: new_sequence,
        };
        let response = self
            .send(self.http.patch(self.url(&endpoint)).json(&body), &endpoint)
            .await?;
        Self::expect_success(response, &endpoint).await?;
        Ok(())
    }

    async fn upload_temp(&self, scope: &UploadScope, file: UploadFile) -> Result<TempUpload> {
        let endpoint = "temp-uploads";
        let mut part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.filename);
        if let Some(content_type) = file.content_type {
            part = part
                .mime_str(&content_type)
                .with_context(|| format!("Invalid content type {}", content_type))?;
        }
        let form = reqwest::multipart::Form::new()
            .text("session_id", scope.session_id.to_string())
            .text("form_id", scope.form_id.clone())
            .text("question_id", scope.question_id.clone())
            .part("file", part);

        let response = self
            .send(self.http.post(self.url(endpoint)).multipart(form), endpoint)
            .await?;
        let response = Self::expect_success(response, endpoint).await?;
        response
            .json::<TempUpload>()
            .await
            .with_context(|| format!("Invalid upload body from {}", endpoint))
    }

    async fn list_temp_uploads(&self, session_id: &SessionId) -> Result<Vec<TempUpload>> {
        let endpoint = "temp-uploads";
        let request = self
            .http
            .get(self.url(endpoint))
            .query(&[("session_id", session_id.as_str())]);
        let response = self.send(request, endpoint).await?;
        let response = Self::expect_success(response, endpoint).await?;
        response
            .json::<Vec<TempUpload>>()
            .await
            .with_context(|| format!("Invalid upload list from {}", endpoint))
    }

    async fn delete_temp_upload(&self, id: &str) -> Result<()> {
        let endpoint = format!("temp-uploads/{}", id);
        let response = self
            .send(self.http.delete(self.url(&endpoint)), &endpoint)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::expect_success(response, &endpoint).await?;
        Ok(())
    }
}
