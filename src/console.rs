//! Console effect handler
//!
//! Prints every effect as one line of JSON on stdout. HTTP requests are
//! also performed for real so `callRestApi` callbacks see a live response.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sprig_actions::{ActionError, Effect, EffectHandler, HttpMethod, Result};
use sprig_expr::stringify;
use std::io::Write;
use std::time::Duration;
use tracing::debug;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ConsoleEffects {
    client: reqwest::Client,
}

impl ConsoleEffects {
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self { client })
    }

    async fn http_request(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &Value,
        body: &Value,
    ) -> Result<Value> {
        let mut request = self.client.request(to_reqwest(method), url);
        if let Value::Object(headers) = headers {
            for (name, value) in headers {
                request = request.header(name.as_str(), stringify(value));
            }
        }
        request = match body {
            Value::Null => request,
            Value::String(text) => request.body(text.clone()),
            other => request.json(other),
        };

        let response = request.send().await.map_err(http_error)?;
        let status = response.status().as_u16();
        let mut response_headers = Map::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                response_headers.insert(name.as_str().to_string(), Value::String(value.to_string()));
            }
        }
        let text = response.text().await.map_err(http_error)?;
        debug!(url = %url, status, bytes = text.len(), "HTTP response received");
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(serde_json::json!({
            "statusCode": status,
            "headers": response_headers,
            "body": body,
        }))
    }
}

impl std::fmt::Debug for ConsoleEffects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleEffects").finish_non_exhaustive()
    }
}

#[async_trait]
impl EffectHandler for ConsoleEffects {
    async fn perform(&self, effect: Effect) -> Result<Value> {
        print_line(&serde_json::to_value(&effect)?)?;
        match effect {
            Effect::HttpRequest {
                method,
                url,
                headers,
                body,
            } => self.http_request(method, &url, &headers, &body).await,
            _ => Ok(Value::Null),
        }
    }
}

/// Write one JSON value as a line on stdout
pub fn print_line(value: &Value) -> Result<()> {
    let line = serde_json::to_string(value)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}").map_err(|e| ActionError::EffectFailed(e.to_string()))
}

fn to_reqwest(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn http_error(err: reqwest::Error) -> ActionError {
    ActionError::EffectFailed(err.to_string())
}
