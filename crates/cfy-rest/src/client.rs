//! Manager client trait and its HTTP implementation.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::{ClientError, NONEXISTENT_WORKFLOW_CODE, Result};
use crate::types::{
    Event, EventPage, ExecuteRequest, Execution, ExecutionAction, ExecutionId, ListResponse,
};

/// Header carrying the API token.
pub const AUTH_TOKEN_HEADER: &str = "Authentication-Token";

/// Header selecting the tenant.
pub const TENANT_HEADER: &str = "Tenant";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations the CLI needs from the manager.
///
/// All calls are blocking. Implementations report unreachable managers as
/// [`ClientError::Transport`] so callers can decide whether to retry.
pub trait ManagerClient {
    /// Fetch a single execution.
    fn get_execution(&self, execution_id: &ExecutionId) -> Result<Execution>;

    /// List executions, optionally restricted to one deployment.
    fn list_executions(&self, deployment_id: Option<&str>) -> Result<Vec<Execution>>;

    /// Fetch one page of an execution's events, ordered by sequence.
    ///
    /// `from_event` is the absolute index of the first event to return.
    fn list_events(
        &self,
        execution_id: &ExecutionId,
        from_event: u64,
        batch_size: u32,
        include_logs: bool,
    ) -> Result<EventPage>;

    /// Start a workflow execution.
    fn execute(&self, request: &ExecuteRequest) -> Result<Execution>;

    /// Request cancellation of a running execution.
    fn cancel(&self, execution_id: &ExecutionId, force: bool) -> Result<Execution>;
}

impl<T: ManagerClient + ?Sized> ManagerClient for &T {
    fn get_execution(&self, execution_id: &ExecutionId) -> Result<Execution> {
        (**self).get_execution(execution_id)
    }

    fn list_executions(&self, deployment_id: Option<&str>) -> Result<Vec<Execution>> {
        (**self).list_executions(deployment_id)
    }

    fn list_events(
        &self,
        execution_id: &ExecutionId,
        from_event: u64,
        batch_size: u32,
        include_logs: bool,
    ) -> Result<EventPage> {
        (**self).list_events(execution_id, from_event, batch_size, include_logs)
    }

    fn execute(&self, request: &ExecuteRequest) -> Result<Execution> {
        (**self).execute(request)
    }

    fn cancel(&self, execution_id: &ExecutionId, force: bool) -> Result<Execution> {
        (**self).cancel(execution_id, force)
    }
}

// ============================================================================
// HTTP client
// ============================================================================

/// Connection settings for [`RestClient`].
#[derive(Debug, Clone)]
pub struct RestClientConfig {
    /// Manager API root, e.g. `https://manager.example.com/api/v3.1`.
    pub base_url: String,
    /// API token sent in the `Authentication-Token` header.
    pub token: Option<String>,
    /// Tenant sent in the `Tenant` header.
    pub tenant: Option<String>,
    /// Timeout applied to every request.
    pub request_timeout: Duration,
}

impl RestClientConfig {
    /// Settings for `base_url` with no credentials.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            tenant: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// [`ManagerClient`] over the manager's REST API.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base: Url,
    token: Option<String>,
    tenant: Option<String>,
}

impl RestClient {
    /// Build a client for the configured manager.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if the base URL does not parse or
    /// is not http(s), and [`ClientError::Transport`] if the HTTP stack
    /// cannot be initialized.
    pub fn new(config: RestClientConfig) -> Result<Self> {
        let base = parse_base_url(&config.base_url)?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        debug!(base_url = %base, "manager client initialized");
        Ok(Self {
            http,
            base,
            token: config.token,
            tenant: config.tenant,
        })
    }

    /// The manager API root.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        build_endpoint(&self.base, segments)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.token {
            Some(token) => request.header(AUTH_TOKEN_HEADER, token),
            None => request,
        };
        match &self.tenant {
            Some(tenant) => request.header(TENANT_HEADER, tenant),
            None => request,
        }
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self
            .authorize(request)
            .send()
            .map_err(|e| ClientError::Transport(describe_send_error(&e)))?;
        decode_response(response)
    }
}

impl ManagerClient for RestClient {
    fn get_execution(&self, execution_id: &ExecutionId) -> Result<Execution> {
        let url = self.endpoint(&["executions", execution_id.as_str()])?;
        trace!(%url, "GET execution");
        self.send(self.http.get(url))
    }

    fn list_executions(&self, deployment_id: Option<&str>) -> Result<Vec<Execution>> {
        let mut url = self.endpoint(&["executions"])?;
        if let Some(deployment_id) = deployment_id {
            url.query_pairs_mut().append_pair("deployment_id", deployment_id);
        }
        trace!(%url, "GET executions");
        let page: ListResponse<Execution> = self.send(self.http.get(url))?;
        Ok(page.items)
    }

    fn list_events(
        &self,
        execution_id: &ExecutionId,
        from_event: u64,
        batch_size: u32,
        include_logs: bool,
    ) -> Result<EventPage> {
        let url = events_url(&self.base, execution_id, from_event, batch_size, include_logs)?;
        trace!(%url, "GET events");
        let page: ListResponse<Event> = self.send(self.http.get(url))?;
        Ok(EventPage {
            total: page.metadata.pagination.total,
            items: page.items,
        })
    }

    fn execute(&self, request: &ExecuteRequest) -> Result<Execution> {
        let url = self.endpoint(&["executions"])?;
        debug!(
            deployment_id = %request.deployment_id,
            workflow_id = %request.workflow_id,
            "starting execution"
        );
        self.send(self.http.post(url).json(request))
    }

    fn cancel(&self, execution_id: &ExecutionId, force: bool) -> Result<Execution> {
        let url = self.endpoint(&["executions", execution_id.as_str()])?;
        let action = ExecutionAction {
            action: if force { "force-cancel" } else { "cancel" },
        };
        debug!(%execution_id, force, "cancelling execution");
        self.send(self.http.post(url).json(&action))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ClientError::InvalidUrl(format!(
            "{raw}: unsupported scheme {other}, expected http or https"
        ))),
    }
}

fn build_endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ClientError::InvalidUrl(format!("{base} cannot be a base url")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn events_url(
    base: &Url,
    execution_id: &ExecutionId,
    from_event: u64,
    batch_size: u32,
    include_logs: bool,
) -> Result<Url> {
    let mut url = build_endpoint(base, &["events"])?;
    url.query_pairs_mut()
        .append_pair("execution_id", execution_id.as_str())
        .append_pair("_offset", &from_event.to_string())
        .append_pair("_size", &batch_size.to_string())
        .append_pair("_sort", "@timestamp")
        .append_pair("include_logs", if include_logs { "true" } else { "false" });
    Ok(url)
}

fn describe_send_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .map_err(|e| ClientError::Transport(format!("failed to read response body: {e}")))?;

    if !(200..300).contains(&status) {
        return Err(classify_status(status, &body));
    }
    serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_code: String,
}

/// Map a non-2xx response onto a [`ClientError`].
pub(crate) fn classify_status(status: u16, body: &str) -> ClientError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = if parsed.message.is_empty() {
        body.trim().to_owned()
    } else {
        parsed.message
    };

    match status {
        404 => ClientError::NotFound(message),
        400 if parsed.error_code == NONEXISTENT_WORKFLOW_CODE => {
            ClientError::InvalidWorkflow(message)
        }
        502..=504 => ClientError::Transport(format!("manager unavailable ({status}): {message}")),
        _ => ClientError::Api { status, message },
    }
}
