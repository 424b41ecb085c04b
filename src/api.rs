use crate::errors::ApiError;
use crate::models::{ProgressMark, RemoteHabit};
use chrono::NaiveDate;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

/// Outbound calls to the habit backend. Every request carries the bearer
/// token when one is set, and fails after the configured timeout.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|token| !token.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Value, ApiError> {
        let body = json!({ "username": username, "password": password });
        self.send(Method::POST, "auth/login", Some(&body)).await
    }

    pub async fn register<T: Serialize>(&self, user_data: &T) -> Result<Value, ApiError> {
        let body = serde_json::to_value(user_data)?;
        self.send(Method::POST, "auth/register", Some(&body)).await
    }

    pub async fn list_habits(&self) -> Result<Vec<RemoteHabit>, ApiError> {
        let value = self.send(Method::GET, "habits", None).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn create_habit(&self, habit: &RemoteHabit) -> Result<Value, ApiError> {
        let body = serde_json::to_value(habit)?;
        self.send(Method::POST, "habits", Some(&body)).await
    }

    pub async fn update_habit(&self, habit_id: i64, habit: &RemoteHabit) -> Result<Value, ApiError> {
        let body = serde_json::to_value(habit)?;
        self.send(Method::PUT, &format!("habits/{habit_id}"), Some(&body))
            .await
    }

    pub async fn delete_habit(&self, habit_id: i64) -> Result<Value, ApiError> {
        self.send(Method::DELETE, &format!("habits/{habit_id}"), None)
            .await
    }

    pub async fn mark_completion(
        &self,
        habit_id: i64,
        fecha: NaiveDate,
        cumplido: bool,
    ) -> Result<Value, ApiError> {
        let body = serde_json::to_value(ProgressMark { fecha, cumplido })?;
        self.send(Method::POST, &format!("progress/{habit_id}"), Some(&body))
            .await
    }

    pub async fn daily_progress(&self) -> Result<Value, ApiError> {
        self.send(Method::GET, "progress/diario", None).await
    }

    pub async fn weekly_stats(&self) -> Result<Value, ApiError> {
        self.send(Method::GET, "progress/stats/weekly", None).await
    }

    pub async fn monthly_stats(&self) -> Result<Value, ApiError> {
        self.send(Method::GET, "progress/stats/monthly", None).await
    }

    pub async fn notifications(&self) -> Result<Vec<Value>, ApiError> {
        let value = self.send(Method::GET, "notifications", None).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn progress(&self) -> Result<Vec<Value>, ApiError> {
        let value = self.send(Method::GET, "progress", None).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn send(&self, method: Method, endpoint: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        debug!(%method, %url, "api request");

        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if method == Method::DELETE && status == StatusCode::NO_CONTENT {
            return Ok(json!({ "success": true }));
        }

        let text = response.text().await?;
        let result = interpret_response(status, &text);
        if let Err(err) = &result {
            warn!(%url, "api call failed: {err}");
        }
        result
    }
}

/// Decodes a response body: empty is null, invalid JSON is kept as raw text.
/// Statuses outside 2xx become `ApiError::Status` with the message taken from
/// `message`, then `error`, then the reason phrase.
pub fn interpret_response(status: StatusCode, text: &str) -> Result<Value, ApiError> {
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    };

    if status.is_success() {
        return Ok(body);
    }

    let message = ["message", "error"]
        .iter()
        .filter_map(|field| body.get(*field))
        .filter_map(Value::as_str)
        .find(|message| !message.is_empty())
        .map(str::to_string)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "Request failed".to_string());

    Err(ApiError::Status {
        status: status.as_u16(),
        message,
        body,
    })
}

/// Pulls a bearer token out of a login or register response.
pub fn token_from(response: &Value) -> Option<String> {
    ["token", "accessToken", "jwt"]
        .iter()
        .filter_map(|field| response.get(*field))
        .filter_map(Value::as_str)
        .find(|token| !token.is_empty())
        .map(str::to_string)
}
