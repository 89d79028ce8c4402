//! Collective - Rendezvous process group for the launch toolkit
//!
//! A minimal distributed helper: every participant joins a TCP rendezvous
//! group (rank 0 listens, peers connect), after which element-wise
//! all-reduce sums are available. The one shipped workload is world-size
//! verification: each rank contributes a one-hot vector of its rank and the
//! reduced sum must total the configured world size.

mod config;
mod endpoint;
mod group;
mod wire;

pub use config::GroupConfig;
pub use endpoint::{is_ipv6, rendezvous_endpoint};
pub use group::ProcessGroup;
pub use wire::{decode_frame, encode_frame, Message};

use launch_core::{Error, Result};
use tracing::info;

/// One-hot vector for a rank: all zeros except a single 1 at `rank`
pub fn one_hot(rank: u32, world_size: u32) -> Vec<u64> {
    let mut v = vec![0u64; world_size as usize];
    v[rank as usize] = 1;
    v
}

/// Join the group and verify world size via an all-reduce
///
/// Each rank contributes `one_hot(rank)`; summing the reduced vector
/// yields the number of distinct participants. Returns the computed world
/// size, or `WorldSizeMismatch` if it disagrees with the configuration.
pub async fn verify_world_size(config: &GroupConfig) -> Result<u32> {
    let mut group = ProcessGroup::join(config).await?;

    let reduced = group
        .all_reduce_sum(one_hot(config.rank, config.world_size))
        .await?;
    let computed = reduced.iter().sum::<u64>() as u32;

    info!(
        rank = config.rank,
        world_size = config.world_size,
        computed,
        "world size computed"
    );

    if computed != config.world_size {
        return Err(Error::WorldSizeMismatch {
            expected: config.world_size,
            computed,
        });
    }
    Ok(computed)
}
