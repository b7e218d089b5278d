//! REST operations against the Creator data API.

use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde_json::{Value, json};
use thiserror::Error;

use depotrack_core::RemoteId;

use crate::config::{CreatorConfig, report_for_form};
use crate::token::TokenManager;

/// Remote client error. Carries a diagnostic string the caller surfaces to
/// the user; none of these abort local state.
#[derive(Debug, Error)]
pub enum CreatorError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("record already mirrored (ID={0})")]
    Duplicate(RemoteId),
}

/// Whether a write creates a new remote record or updates an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteTarget {
    Create,
    Update(RemoteId),
}

/// Client for the Creator data API.
///
/// All calls share one bearer token through the [`TokenManager`]; a 401/403
/// triggers exactly one refresh-and-retry per logical operation (bounded by
/// an explicit attempt counter, never recursion).
#[derive(Debug)]
pub struct CreatorClient {
    config: CreatorConfig,
    http: reqwest::Client,
    tokens: TokenManager,
}

impl CreatorClient {
    pub fn new(config: CreatorConfig) -> Result<Self, CreatorError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CreatorError::Network(e.to_string()))?;

        let tokens = TokenManager::new(&config, http.clone());

        Ok(Self {
            config,
            http,
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Does a record exist in the given report?
    ///
    /// 200 means yes, 404 means no; an auth failure gets one refresh-and-
    /// retry; any other status or transport error is treated as "no" and
    /// logged, never propagated.
    pub async fn check_record_exists(&self, report: &str, id: &RemoteId) -> bool {
        for attempt in 0..2 {
            let token = match self.tokens.acquire().await {
                Ok(t) => t,
                Err(err) => {
                    tracing::warn!("existence check for {report}/{id} skipped: {err}");
                    return false;
                }
            };

            let url = self.config.report_record_url(report, id);
            let resp = self
                .http
                .get(&url)
                .header(AUTHORIZATION, format!("Zoho-oauthtoken {token}"))
                .send()
                .await;

            match resp {
                Ok(r) => match r.status() {
                    StatusCode::OK => return true,
                    StatusCode::NOT_FOUND => return false,
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN if attempt == 0 => {
                        if self.tokens.refresh().await.is_err() {
                            return false;
                        }
                    }
                    status => {
                        tracing::warn!("existence check for {report}/{id} returned {status}");
                        return false;
                    }
                },
                Err(err) => {
                    tracing::warn!("existence check for {report}/{id} failed: {err}");
                    return false;
                }
            }
        }

        false
    }

    /// Send a record to a form: PUT the record path when updating, otherwise
    /// POST after guarding against a duplicate remote row.
    ///
    /// Returns the decoded response body on success so the caller can
    /// extract the newly assigned remote identifier.
    pub async fn send(
        &self,
        form: &str,
        payload: &Value,
        target: &WriteTarget,
    ) -> Result<Value, CreatorError> {
        // Creating a record that already names its remote ID would duplicate
        // a remote row; check the form's report first.
        if matches!(target, WriteTarget::Create) {
            if let Some(id) = payload.get("ID").and_then(value_to_id) {
                if self.check_record_exists(&report_for_form(form), &id).await {
                    return Err(CreatorError::Duplicate(id));
                }
            }
        }

        for attempt in 0..2 {
            let token = self.tokens.acquire().await?;

            let request = match target {
                WriteTarget::Update(id) => self.http.put(self.config.form_record_url(form, id)),
                WriteTarget::Create => self.http.post(self.config.form_url(form)),
            };

            let resp = request
                .header(AUTHORIZATION, format!("Zoho-oauthtoken {token}"))
                .json(&json!({ "data": payload }))
                .send()
                .await
                .map_err(|e| CreatorError::Network(e.to_string()))?;

            let status = resp.status();
            if status == StatusCode::OK || status == StatusCode::CREATED {
                return resp
                    .json()
                    .await
                    .map_err(|e| CreatorError::Parse(e.to_string()));
            }

            if (status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN)
                && attempt == 0
            {
                self.tokens.refresh().await?;
                continue;
            }

            let body = resp.text().await.unwrap_or_default();
            return Err(CreatorError::Api(status.as_u16(), body));
        }

        Err(CreatorError::Auth(
            "request still unauthorized after token refresh".to_string(),
        ))
    }

    /// Delete a record from a form's report.
    ///
    /// Existence-checks first: a record that is already absent remotely makes
    /// the deletion an idempotent success. Transport errors are logged and
    /// reported as a failure, never panicked on.
    pub async fn delete(&self, form: &str, id: &RemoteId) -> Result<(), CreatorError> {
        let report = report_for_form(form);

        if !self.check_record_exists(&report, id).await {
            tracing::info!("{form} id={id} already absent remotely, skipping delete");
            return Ok(());
        }

        for attempt in 0..2 {
            let token = self.tokens.acquire().await?;

            let url = self.config.report_record_url(&report, id);
            let resp = self
                .http
                .delete(&url)
                .header(AUTHORIZATION, format!("Zoho-oauthtoken {token}"))
                .send()
                .await;

            match resp {
                Ok(r) => {
                    let status = r.status();
                    if status.is_success() {
                        return Ok(());
                    }

                    if (status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN)
                        && attempt == 0
                    {
                        self.tokens.refresh().await?;
                        continue;
                    }

                    let body = r.text().await.unwrap_or_default();
                    tracing::warn!("delete of {form}/{id} returned {status}");
                    return Err(CreatorError::Api(status.as_u16(), body));
                }
                Err(err) => {
                    tracing::warn!("delete of {form}/{id} failed: {err}");
                    return Err(CreatorError::Network(err.to_string()));
                }
            }
        }

        Err(CreatorError::Auth(
            "delete still unauthorized after token refresh".to_string(),
        ))
    }
}

/// Pull the platform-assigned record identifier out of a write response.
///
/// The platform has answered with `{"data": {"ID": ...}}`, with a list under
/// `data`, and with a bare `ID`, so all three are accepted; anything else
/// (including a malformed body) yields `None` and the local remote identifier
/// simply stays unset.
pub fn extract_remote_id(body: &Value) -> Option<RemoteId> {
    if let Some(data) = body.get("data") {
        if let Some(id) = data.get("ID").and_then(value_to_id) {
            return Some(id);
        }
        if let Some(first) = data.as_array().and_then(|a| a.first()) {
            if let Some(id) = first.get("ID").and_then(value_to_id) {
                return Some(id);
            }
        }
    }

    body.get("ID").and_then(value_to_id)
}

fn value_to_id(value: &Value) -> Option<RemoteId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(RemoteId::new(s.clone())),
        Value::Number(n) => Some(RemoteId::new(n.to_string())),
        _ => None,
    }
}
