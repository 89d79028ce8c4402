//! Collective process-group tests over loopback
//!
//! Every rank runs in its own task against a shared rendezvous port, the
//! way the dist pipeline runs one world-check process per rank.

use std::time::Duration;

use anyhow::Result;
use collective::{one_hot, verify_world_size, GroupConfig, ProcessGroup};
use launch_core::Error;

fn loopback_config(rank: u32, world_size: u32, port: u16) -> GroupConfig {
    let mut config = GroupConfig::new(rank, world_size);
    config.master_port = port;
    config.join_timeout = Duration::from_secs(10);
    config.reduce_timeout = Duration::from_secs(10);
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 6)]
async fn test_world_size_verification_across_ranks() -> Result<()> {
    let world_size = 4;
    let port = portpicker::pick_unused_port().expect("no ports free");

    let mut tasks = Vec::new();
    for rank in 0..world_size {
        let config = loopback_config(rank, world_size, port);
        tasks.push(tokio::spawn(
            async move { verify_world_size(&config).await },
        ));
    }

    for task in tasks {
        let computed = task.await??;
        assert_eq!(computed, world_size);
    }
    Ok(())
}

#[tokio::test]
async fn test_single_rank_group() -> Result<()> {
    let port = portpicker::pick_unused_port().expect("no ports free");
    let computed = verify_world_size(&loopback_config(0, 1, port)).await?;
    assert_eq!(computed, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_multiple_reduce_rounds() -> Result<()> {
    let world_size = 2;
    let port = portpicker::pick_unused_port().expect("no ports free");

    let mut tasks = Vec::new();
    for rank in 0..world_size {
        let config = loopback_config(rank, world_size, port);
        tasks.push(tokio::spawn(async move {
            let mut group = ProcessGroup::join(&config).await?;

            let first = group.all_reduce_sum(one_hot(rank, world_size)).await?;
            let second = group.all_reduce_sum(vec![rank as u64 + 1, 10]).await?;
            Ok::<_, Error>((first, second))
        }));
    }

    for task in tasks {
        let (first, second) = task.await??;
        assert_eq!(first, vec![1, 1]);
        // (1 + 2, 10 + 10) across the two ranks
        assert_eq!(second, vec![3, 20]);
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_rank_is_rejected() -> Result<()> {
    let world_size = 2;
    let port = portpicker::pick_unused_port().expect("no ports free");

    let master_config = loopback_config(0, world_size, port);
    let master = tokio::spawn(async move { ProcessGroup::join(&master_config).await });

    let peer_config = loopback_config(1, world_size, port);
    let peer = ProcessGroup::join(&peer_config).await?;

    // Group is assembled; a second rank 1 must be turned away
    let _master_group = master.await??;
    let intruder_config = loopback_config(1, world_size, port);
    let result = ProcessGroup::join(&intruder_config).await;

    match result {
        Err(Error::Rendezvous { message }) => {
            assert!(message.contains("already joined"), "message: {}", message);
        }
        other => panic!("expected Rendezvous error, got {:?}", other),
    }

    drop(peer);
    Ok(())
}

#[tokio::test]
async fn test_peer_fails_when_master_never_appears() -> Result<()> {
    let port = portpicker::pick_unused_port().expect("no ports free");

    let mut config = loopback_config(1, 2, port);
    // Few retries so the test fails fast
    config.retry.max_retries = 2;
    config.retry.initial_delay = Duration::from_millis(10);

    let result = ProcessGroup::join(&config).await;
    assert!(matches!(result, Err(Error::Rendezvous { .. })));
    Ok(())
}
