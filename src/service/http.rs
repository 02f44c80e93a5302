use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use std::time::Duration;
use tracing::{debug, info};
use ureq::Agent;
use url::form_urlencoded;

use super::retry::RetryPolicy;
use super::Backend;
use crate::approval::DeepCreatePayload;
use crate::config::{Config, ServiceSettings};
use crate::error::{PayflowError, Result};
use crate::model::{parse_collection, HeaderRecord, UserApprovalLevel};

const CSRF_HEADER: &str = "X-CSRF-Token";
const PASSWORD_ENV: &str = "PAYFLOW_PASSWORD";

/// OData v2 gateway client.
pub struct HttpBackend {
    agent: Agent,
    service: ServiceSettings,
    retry: RetryPolicy,
    authorization: Option<String>,
    csrf_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.service.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        let authorization = config.service.username.as_ref().map(|user| {
            let password = std::env::var(PASSWORD_ENV).unwrap_or_default();
            let token = BASE64_STANDARD.encode(format!("{user}:{password}"));
            format!("Basic {token}")
        });

        Self {
            agent,
            service: config.service.clone(),
            retry: RetryPolicy::from(&config.retry),
            authorization,
            csrf_token: None,
        }
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> String {
        let base = self.service.url.trim_end_matches('/');
        let mut params: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{k}={}", encode_query_value(v)))
            .collect();
        if let Some(client) = &self.service.sap_client {
            params.push(format!("sap-client={}", encode_query_value(client)));
        }
        if params.is_empty() {
            format!("{base}/{path}")
        } else {
            format!("{base}/{path}?{}", params.join("&"))
        }
    }

    /// GET a collection, picking up a CSRF token for later writes.
    fn get_collection(&mut self, url: &str) -> Result<String> {
        debug!(%url, "GET");
        let mut request = self
            .agent
            .get(url)
            .header("Accept", "application/json")
            .header(CSRF_HEADER, "Fetch");
        if let Some(auth) = &self.authorization {
            request = request.header("Authorization", auth.as_str());
        }

        let mut response = request.call()?;
        let status = response.status().as_u16();
        if let Some(token) = response
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            self.csrf_token = Some(token.to_string());
        }
        let body = response.body_mut().read_to_string()?;

        if !(200..300).contains(&status) {
            return Err(PayflowError::Http { status, body });
        }
        Ok(body)
    }

    fn ensure_csrf_token(&mut self) -> Result<String> {
        if let Some(token) = &self.csrf_token {
            return Ok(token.clone());
        }
        let url = self.url("", &[]);
        let retry = self.retry;
        retry.run("csrf fetch", || self.get_collection(&url).map(|_| ()))?;
        self.csrf_token.clone().ok_or_else(|| {
            PayflowError::MalformedResponse("service did not issue a CSRF token".into())
        })
    }

    fn post_json(&mut self, url: &str, body: &str, request_key: &str) -> Result<()> {
        let token = self.ensure_csrf_token()?;
        debug!(%url, %request_key, bytes = body.len(), "POST");
        let mut request = self
            .agent
            .post(url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header(CSRF_HEADER, token.as_str())
            .header("X-Request-ID", request_key);
        if let Some(auth) = &self.authorization {
            request = request.header("Authorization", auth.as_str());
        }

        let mut response = request.send(body)?;
        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            return Ok(());
        }
        if status == 403 {
            // Token expired with the session; the next attempt fetches a new one.
            self.csrf_token = None;
        }
        let body = response.body_mut().read_to_string().unwrap_or_default();
        Err(PayflowError::Http { status, body })
    }
}

fn encode_query_value(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

impl Backend for HttpBackend {
    fn fetch_headers(&mut self) -> Result<Vec<HeaderRecord>> {
        let url = self.url(
            &self.service.header_set,
            &[
                ("$expand", self.service.items_navigation.as_str()),
                ("$format", "json"),
            ],
        );
        let retry = self.retry;
        let body = retry.run("fetch headers", || self.get_collection(&url))?;
        let headers: Vec<HeaderRecord> = parse_collection(&body)?;
        info!(count = headers.len(), "fetched payment headers");
        Ok(headers)
    }

    fn create_deep(&mut self, payload: &DeepCreatePayload, request_key: &str) -> Result<()> {
        let url = self.url(&self.service.header_set, &[]);
        let body = serde_json::to_string(payload)?;
        let retry = self.retry;
        retry.run("deep create", || self.post_json(&url, &body, request_key))?;
        info!(
            approval_no = %payload.approval_no,
            items = payload.to_items.results.len(),
            %request_key,
            "deep create accepted"
        );
        Ok(())
    }

    fn fetch_user_levels(&mut self) -> Result<Vec<UserApprovalLevel>> {
        let url = self.url(&self.service.user_set, &[("$format", "json")]);
        let retry = self.retry;
        let body = retry.run("fetch user levels", || self.get_collection(&url))?;
        parse_collection(&body)
    }
}
