use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use crate::common::errors::CdnError;

/// Maximum paths per invalidation request
pub const INVALIDATION_BATCH_SIZE: usize = 3000;

/// Network timeout for invalidation requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Submits CDN cache invalidations. Fire-and-forget: the returned job id
/// is logged, never awaited.
pub trait CdnInvalidator {
    fn invalidate(&self, distribution_id: &str, paths: &[String]) -> Result<String, CdnError>;
}

/// Split `paths` into request-sized batches and submit each one.
/// Returns one result per batch, in order.
pub fn invalidate_batched(
    cdn: &dyn CdnInvalidator,
    distribution_id: &str,
    paths: &[String],
) -> Vec<Result<String, CdnError>> {
    paths
        .chunks(INVALIDATION_BATCH_SIZE)
        .map(|batch| cdn.invalidate(distribution_id, batch))
        .collect()
}

/// Records invalidations in the log only; used when no endpoint is configured
#[derive(Debug, Default)]
pub struct LogInvalidator {
    requests: Mutex<Vec<(String, Vec<String>)>>,
}

impl LogInvalidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request seen so far, as (distribution id, paths)
    pub fn requests(&self) -> Vec<(String, Vec<String>)> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl CdnInvalidator for LogInvalidator {
    fn invalidate(&self, distribution_id: &str, paths: &[String]) -> Result<String, CdnError> {
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        requests.push((distribution_id.to_string(), paths.to_vec()));
        let id = format!("logged-{}", requests.len());
        tracing::info!(
            "Invalidation {} for distribution {}: {} paths",
            id,
            distribution_id,
            paths.len()
        );
        Ok(id)
    }
}

/// Posts `{"distribution_id": ..., "paths": [...]}` to an HTTP endpoint.
/// The response body is taken as the job id.
#[derive(Debug, Clone)]
pub struct HttpInvalidator {
    endpoint: String,
}

impl HttpInvalidator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

impl CdnInvalidator for HttpInvalidator {
    fn invalidate(&self, distribution_id: &str, paths: &[String]) -> Result<String, CdnError> {
        let request_error = |message: String| CdnError::Request {
            distribution_id: distribution_id.to_string(),
            message,
        };

        let body = serde_json::json!({
            "distribution_id": distribution_id,
            "paths": paths,
        })
        .to_string();

        let response = http_agent()
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .send(body.as_str())
            .map_err(|e| request_error(e.to_string()))?;

        let job_id = response
            .into_body()
            .read_to_string()
            .map_err(|e| request_error(e.to_string()))?;
        Ok(job_id.trim().to_string())
    }
}
