//! Cluster client integration tests against a mock cluster
//!
//! Exercises the full client lifecycle: login through the redirecting
//! form, run submission with the session cookie, and polling runs to
//! their terminal states, including the failure and timeout paths.

mod common;

use std::time::Duration;

use anyhow::Result;
use cluster_client::ClusterClient;
use launch_core::{ClusterConfig, Error, PollConfig, RetryConfig, RunStatus};

use common::{MockCluster, MockOptions};

fn cluster_config(base_url: &str) -> ClusterConfig {
    ClusterConfig {
        host: base_url.to_string(),
        username: "tester".to_string(),
        password: "secret".to_string(),
        namespace: "integration".to_string(),
    }
}

fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(20),
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_submit_and_wait_success() -> Result<()> {
    let mock = MockCluster::spawn_with(MockOptions {
        pending_polls: 2,
        ..Default::default()
    })
    .await?;

    let client = ClusterClient::login(
        &cluster_config(&mock.base_url),
        fast_poll(),
        RetryConfig::default(),
    )
    .await?;

    let record = client
        .submit(
            "intro_pipeline.yaml",
            "name: intro\nsteps: []\n",
            "integration build-1 - intro_pipeline.yaml",
            "integration-tests",
        )
        .await?;
    assert!(!record.run_id.is_empty());
    assert!(record.ui_url.contains(&record.run_id));

    // Two Running polls, then Succeeded
    let status = client.wait(&record.run_id).await?;
    assert_eq!(status, RunStatus::Succeeded);

    let submitted = mock.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0]["namespace"], "integration");
    assert_eq!(submitted[0]["experiment"], "integration-tests");
    Ok(())
}

#[tokio::test]
async fn test_failed_run_is_an_error() -> Result<()> {
    let mock = MockCluster::spawn_with(MockOptions {
        terminal_status: "Failed".to_string(),
        ..Default::default()
    })
    .await?;

    let client = ClusterClient::login(
        &cluster_config(&mock.base_url),
        fast_poll(),
        RetryConfig::default(),
    )
    .await?;

    let record = client
        .submit("dist_pipeline.yaml", "name: dist\n", "run", "integration-tests")
        .await?;

    let result = client.wait(&record.run_id).await;
    match result {
        Err(Error::RunFailed { run_id, status }) => {
            assert_eq!(run_id, record.run_id);
            assert_eq!(status, "Failed");
        }
        other => panic!("expected RunFailed, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_wait_times_out_on_stuck_run() -> Result<()> {
    let mock = MockCluster::spawn_with(MockOptions {
        pending_polls: u64::MAX,
        ..Default::default()
    })
    .await?;

    let poll = PollConfig {
        interval: Duration::from_millis(20),
        timeout: Duration::from_millis(100),
    };
    let client = ClusterClient::login(
        &cluster_config(&mock.base_url),
        poll,
        RetryConfig::default(),
    )
    .await?;

    let record = client
        .submit("intro_pipeline.yaml", "name: intro\n", "run", "integration-tests")
        .await?;

    let result = client.wait(&record.run_id).await;
    assert!(matches!(result, Err(Error::Timeout { .. })));
    Ok(())
}

#[tokio::test]
async fn test_login_without_cookie_is_auth_error() -> Result<()> {
    let mock = MockCluster::spawn_with(MockOptions {
        issue_cookie: false,
        ..Default::default()
    })
    .await?;

    let result = ClusterClient::login(
        &cluster_config(&mock.base_url),
        fast_poll(),
        RetryConfig::default(),
    )
    .await;

    assert!(matches!(result, Err(Error::Auth { .. })));
    Ok(())
}

#[tokio::test]
async fn test_unknown_run_status_is_http_error() -> Result<()> {
    let mock = MockCluster::spawn().await?;

    let client = ClusterClient::login(
        &cluster_config(&mock.base_url),
        fast_poll(),
        RetryConfig::default(),
    )
    .await?;

    let result = client.status("run-does-not-exist").await;
    assert!(matches!(result, Err(Error::Http { .. })));
    Ok(())
}
