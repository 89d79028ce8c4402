//! Cluster HTTP client: login, submit, poll

use chrono::Utc;
use launch_core::{
    ClusterConfig, Error, PollConfig, Result, RetryConfig, RunId, RunRecord, RunStatus,
};
use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Name of the session cookie issued by the cluster auth service
pub const SESSION_COOKIE: &str = "gantry_session";

/// Run submission request body
#[derive(Debug, Serialize)]
struct SubmitRunRequest<'a> {
    /// Display name of the run
    name: &'a str,

    /// Namespace the run is created in
    namespace: &'a str,

    /// Experiment grouping in the cluster UI
    experiment: &'a str,

    /// Rendered pipeline definition (YAML)
    pipeline: &'a str,
}

/// Run submission response body
#[derive(Debug, Deserialize)]
struct SubmitRunResponse {
    run_id: RunId,
}

/// Run status response body
#[derive(Debug, Deserialize)]
struct RunStatusResponse {
    status: String,
}

/// Authenticated client for one cluster
pub struct ClusterClient {
    http: reqwest::Client,
    host: String,
    namespace: String,
    session: String,
    poll: PollConfig,
    retry: RetryConfig,
}

impl ClusterClient {
    /// Log into the cluster and return an authenticated client
    ///
    /// Follows the cluster's redirect chain from the host root to the login
    /// form, posts the credentials, and captures the session cookie from
    /// the response. The cookie rides along on every later request.
    pub async fn login(
        cluster: &ClusterConfig,
        poll: PollConfig,
        retry: RetryConfig,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().build().map_err(http_error)?;

        let host = cluster.host.trim_end_matches('/').to_string();
        debug!(host = %host, "resolving login form");
        let landing = http.get(&host).send().await.map_err(http_error)?;
        let login_url = landing.url().clone();

        let response = http
            .post(login_url)
            .form(&[
                ("login", cluster.username.as_str()),
                ("password", cluster.password.as_str()),
            ])
            .send()
            .await
            .map_err(http_error)?;

        let session = extract_session_cookie(response.headers()).ok_or_else(|| Error::Auth {
            message: format!("login response carried no {} cookie", SESSION_COOKIE),
        })?;

        info!(host = %host, namespace = %cluster.namespace, "logged into cluster");
        Ok(Self {
            http,
            host,
            namespace: cluster.namespace.clone(),
            session,
            poll,
            retry,
        })
    }

    /// Cluster UI URL for a run
    pub fn ui_url(&self, run_id: &str) -> String {
        format!("{}/pipeline/#/runs/details/{}", self.host, run_id)
    }

    /// Submit a rendered pipeline as a new run
    pub async fn submit(
        &self,
        pipeline: &str,
        pipeline_yaml: &str,
        run_name: &str,
        experiment: &str,
    ) -> Result<RunRecord> {
        let request = SubmitRunRequest {
            name: run_name,
            namespace: &self.namespace,
            experiment,
            pipeline: pipeline_yaml,
        };

        let response = self
            .http
            .post(format!("{}/apis/v1/runs", self.host))
            .header(COOKIE, self.cookie_header())
            .json(&request)
            .send()
            .await
            .map_err(http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SubmitFailed {
                pipeline: pipeline.to_string(),
                message: format!("{}: {}", status, body),
            });
        }

        let submitted: SubmitRunResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let ui_url = self.ui_url(&submitted.run_id);
        info!(run_id = %submitted.run_id, %ui_url, "run launched");

        Ok(RunRecord {
            run_id: submitted.run_id,
            pipeline: pipeline.to_string(),
            status: RunStatus::Pending,
            submitted_at: Utc::now(),
            finished_at: None,
            ui_url,
        })
    }

    /// Fetch the current status of a run
    pub async fn status(&self, run_id: &str) -> Result<RunStatus> {
        let response = self
            .http
            .get(format!("{}/apis/v1/runs/{}", self.host, run_id))
            .header(COOKIE, self.cookie_header())
            .send()
            .await
            .map_err(http_error)?;

        if !response.status().is_success() {
            return Err(Error::Http {
                message: format!("status query for {} returned {}", run_id, response.status()),
            });
        }

        let body: RunStatusResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        Ok(RunStatus::parse(&body.status))
    }

    /// Poll a run until it reaches a terminal state
    ///
    /// Transient status-poll failures are retried with backoff; the poll
    /// deadline is absolute. A terminal state other than `Succeeded` is an
    /// error carrying the reported status.
    pub async fn wait(&self, run_id: &str) -> Result<RunStatus> {
        info!(run_id = %run_id, "waiting for completion");
        let deadline = tokio::time::Instant::now() + self.poll.timeout;
        let mut attempts = 0u32;

        loop {
            match self.status(run_id).await {
                Ok(status) => {
                    attempts = 0;
                    debug!(run_id = %run_id, status = %status, "polled run");

                    if status.is_terminal() {
                        if status.is_success() {
                            info!(run_id = %run_id, "run succeeded");
                            return Ok(status);
                        }
                        return Err(Error::RunFailed {
                            run_id: run_id.to_string(),
                            status: status.to_string(),
                        });
                    }
                }
                Err(e) if e.is_retryable() && attempts < self.retry.max_retries => {
                    attempts += 1;
                    let delay = self.retry.delay_for(attempts - 1);
                    warn!(
                        run_id = %run_id,
                        attempt = attempts,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "status poll failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(e),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Timeout {
                    operation: format!("wait for run {}", run_id),
                    timeout_ms: self.poll.timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll.interval).await;
        }
    }

    fn cookie_header(&self) -> String {
        format!("{}={}", SESSION_COOKIE, self.session)
    }
}

/// Pull the session cookie value out of login response headers
fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    for value in headers.get_all(SET_COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        let pair = raw.split(';').next().unwrap_or_default();
        if let Some((name, value)) = pair.split_once('=') {
            if name.trim() == SESSION_COOKIE && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn http_error(e: reqwest::Error) -> Error {
    Error::Http {
        message: e.to_string(),
    }
}
