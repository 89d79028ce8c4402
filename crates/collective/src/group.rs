//! Rendezvous process group
//!
//! Rank 0 hosts the rendezvous: it listens on the master endpoint, admits
//! one connection per rank, and releases the group once every rank arrived.
//! All-reduce rounds are master-mediated: peers send contributions, the
//! master sums element-wise and broadcasts the result. Group state follows
//! the waiter-channel barrier shape: whoever completes a round drains the
//! registered waiters.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use launch_core::{Error, Result};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::GroupConfig;
use crate::wire::{recv_message, send_message, Message};

/// Join barrier for group assembly
struct JoinState {
    world_size: u32,
    inner: Mutex<JoinInner>,
}

struct JoinInner {
    ranks: HashSet<u32>,
    waiters: Vec<oneshot::Sender<()>>,
    complete: bool,
}

impl JoinState {
    fn new(world_size: u32) -> Self {
        Self {
            world_size,
            inner: Mutex::new(JoinInner {
                ranks: HashSet::new(),
                waiters: Vec::new(),
                complete: false,
            }),
        }
    }

    /// Record an arrival; releases every waiter when the group is full
    fn arrive(&self, rank: u32) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.ranks.insert(rank) {
            return Err(Error::RankConflict { rank });
        }

        debug!(rank, arrived = inner.ranks.len(), "rank joined");
        if inner.ranks.len() as u32 == self.world_size {
            inner.complete = true;
            for waiter in inner.waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
        Ok(())
    }

    /// Register for release; `None` means the group already assembled
    fn wait(&self) -> Option<oneshot::Receiver<()>> {
        let mut inner = self.inner.lock();
        if inner.complete {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        inner.waiters.push(tx);
        Some(rx)
    }
}

/// One all-reduce round on the master
struct ReduceRound {
    expected: u32,
    inner: Mutex<RoundInner>,
}

struct RoundInner {
    contributions: HashMap<u32, Vec<u64>>,
    result: Option<Vec<u64>>,
    waiters: Vec<oneshot::Sender<Vec<u64>>>,
}

/// Outcome of registering for a round result
enum WaitOutcome {
    Ready(Vec<u64>),
    Pending(oneshot::Receiver<Vec<u64>>),
}

impl ReduceRound {
    fn new(expected: u32) -> Self {
        Self {
            expected,
            inner: Mutex::new(RoundInner {
                contributions: HashMap::new(),
                result: None,
                waiters: Vec::new(),
            }),
        }
    }

    /// Add one rank's vector; the final contribution computes the sum and
    /// releases every waiter
    fn contribute(&self, rank: u32, values: Vec<u64>) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.contributions.contains_key(&rank) {
            return Err(Error::RankConflict { rank });
        }
        if let Some(existing) = inner.contributions.values().next() {
            if existing.len() != values.len() {
                return Err(Error::Rendezvous {
                    message: format!(
                        "contribution length mismatch: rank {} sent {}, expected {}",
                        rank,
                        values.len(),
                        existing.len()
                    ),
                });
            }
        }

        inner.contributions.insert(rank, values);
        if inner.contributions.len() as u32 == self.expected {
            let width = inner
                .contributions
                .values()
                .next()
                .map(Vec::len)
                .unwrap_or_default();
            let mut sum = vec![0u64; width];
            for contribution in inner.contributions.values() {
                for (slot, value) in sum.iter_mut().zip(contribution) {
                    *slot += value;
                }
            }

            for waiter in inner.waiters.drain(..) {
                let _ = waiter.send(sum.clone());
            }
            inner.result = Some(sum);
        }
        Ok(())
    }

    /// Register for the round result
    fn wait(&self) -> WaitOutcome {
        let mut inner = self.inner.lock();
        if let Some(result) = &inner.result {
            return WaitOutcome::Ready(result.clone());
        }
        let (tx, rx) = oneshot::channel();
        inner.waiters.push(tx);
        WaitOutcome::Pending(rx)
    }
}

/// Shared master-side group state
struct GroupState {
    world_size: u32,
    join: JoinState,
    rounds: DashMap<u64, Arc<ReduceRound>>,
}

impl GroupState {
    fn new(world_size: u32) -> Self {
        Self {
            world_size,
            join: JoinState::new(world_size),
            rounds: DashMap::new(),
        }
    }

    fn round(&self, id: u64) -> Arc<ReduceRound> {
        self.rounds
            .entry(id)
            .or_insert_with(|| Arc::new(ReduceRound::new(self.world_size)))
            .clone()
    }
}

/// Role-specific half of a joined group
enum Role {
    Master {
        state: Arc<GroupState>,
        accept_task: JoinHandle<()>,
    },
    Peer {
        stream: TcpStream,
    },
}

/// A joined process group
pub struct ProcessGroup {
    config: GroupConfig,
    next_round: u64,
    role: Role,
}

impl std::fmt::Debug for ProcessGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessGroup")
            .field("config", &self.config)
            .field("next_round", &self.next_round)
            .finish()
    }
}

impl ProcessGroup {
    /// Join the group described by `config`
    ///
    /// Blocks until every rank arrived or the join timeout elapses. Rank 0
    /// binds the master endpoint; other ranks connect with retry so they
    /// can start before the master listens.
    pub async fn join(config: &GroupConfig) -> Result<Self> {
        config.validate()?;
        if config.rank == 0 {
            Self::join_as_master(config).await
        } else {
            Self::join_as_peer(config).await
        }
    }

    async fn join_as_master(config: &GroupConfig) -> Result<Self> {
        let endpoint = config.master_endpoint();
        let listener = TcpListener::bind(&endpoint)
            .await
            .map_err(|e| Error::Rendezvous {
                message: format!("failed to bind master endpoint {}: {}", endpoint, e),
            })?;
        info!(%endpoint, world_size = config.world_size, "rendezvous master listening");

        let state = Arc::new(GroupState::new(config.world_size));
        state.join.arrive(0)?;
        let release = state.join.wait();

        let accept_task = tokio::spawn(accept_loop(Arc::clone(&state), listener));

        if let Some(rx) = release {
            timeout(config.join_timeout, rx)
                .await
                .map_err(|_| Error::Rendezvous {
                    message: format!(
                        "group did not assemble within {:?} (world_size {})",
                        config.join_timeout, config.world_size
                    ),
                })?
                .map_err(|_| Error::Rendezvous {
                    message: "rendezvous state dropped before release".to_string(),
                })?;
        }

        info!(world_size = config.world_size, "process group assembled");
        Ok(Self {
            config: config.clone(),
            next_round: 0,
            role: Role::Master { state, accept_task },
        })
    }

    async fn join_as_peer(config: &GroupConfig) -> Result<Self> {
        let endpoint = config.master_endpoint();
        let mut stream = connect_with_retry(&endpoint, config).await?;

        send_message(&mut stream, &Message::Join { rank: config.rank }).await?;

        let reply = timeout(config.join_timeout, recv_message(&mut stream))
            .await
            .map_err(|_| Error::Rendezvous {
                message: format!("no join ack within {:?}", config.join_timeout),
            })??;

        match reply {
            Message::JoinAck { world_size } if world_size == config.world_size => {
                info!(rank = config.rank, world_size, "joined process group");
                Ok(Self {
                    config: config.clone(),
                    next_round: 0,
                    role: Role::Peer { stream },
                })
            }
            Message::JoinAck { world_size } => Err(Error::Rendezvous {
                message: format!(
                    "master runs world_size {} but this rank expects {}",
                    world_size, config.world_size
                ),
            }),
            Message::Abort { reason } => Err(Error::Rendezvous { message: reason }),
            other => Err(Error::Rendezvous {
                message: format!("unexpected join reply: {:?}", other),
            }),
        }
    }

    /// This participant's rank
    pub fn rank(&self) -> u32 {
        self.config.rank
    }

    /// Configured group size
    pub fn world_size(&self) -> u32 {
        self.config.world_size
    }

    /// Element-wise sum of `values` across every rank
    ///
    /// All ranks must call this the same number of times with vectors of
    /// equal length; every rank receives the same reduced vector.
    pub async fn all_reduce_sum(&mut self, values: Vec<u64>) -> Result<Vec<u64>> {
        let round = self.next_round;
        self.next_round += 1;

        match &mut self.role {
            Role::Master { state, .. } => {
                let round_state = state.round(round);
                round_state.contribute(0, values)?;

                match round_state.wait() {
                    WaitOutcome::Ready(result) => Ok(result),
                    WaitOutcome::Pending(rx) => timeout(self.config.reduce_timeout, rx)
                        .await
                        .map_err(|_| Error::Timeout {
                            operation: format!("all_reduce round {}", round),
                            timeout_ms: self.config.reduce_timeout.as_millis() as u64,
                        })?
                        .map_err(|_| Error::Rendezvous {
                            message: "reduce state dropped before release".to_string(),
                        }),
                }
            }
            Role::Peer { stream } => {
                send_message(
                    stream,
                    &Message::Contribute {
                        round,
                        rank: self.config.rank,
                        values,
                    },
                )
                .await?;

                let reply = timeout(self.config.reduce_timeout, recv_message(stream))
                    .await
                    .map_err(|_| Error::Timeout {
                        operation: format!("all_reduce round {}", round),
                        timeout_ms: self.config.reduce_timeout.as_millis() as u64,
                    })??;

                match reply {
                    Message::Reduced { round: r, values } if r == round => Ok(values),
                    Message::Abort { reason } => Err(Error::Rendezvous { message: reason }),
                    other => Err(Error::Rendezvous {
                        message: format!("unexpected reduce reply: {:?}", other),
                    }),
                }
            }
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if let Role::Master { accept_task, .. } = &self.role {
            accept_task.abort();
        }
    }
}

/// Connect to the master, retrying while it comes up
async fn connect_with_retry(endpoint: &str, config: &GroupConfig) -> Result<TcpStream> {
    let mut attempt = 0u32;
    loop {
        match TcpStream::connect(endpoint).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                if attempt >= config.retry.max_retries {
                    return Err(Error::Rendezvous {
                        message: format!("failed to reach master at {}: {}", endpoint, e),
                    });
                }
                let delay = config.retry.delay_for(attempt);
                debug!(
                    %endpoint,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis(),
                    "master not reachable yet, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Master accept loop; one handler task per peer connection
async fn accept_loop(state: Arc<GroupState>, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!(%addr, "peer connected");
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    if let Err(e) = handle_peer(state, stream).await {
                        warn!(error = %e, "peer connection ended with error");
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
            }
        }
    }
}

/// Serve one peer: admit it to the join barrier, then answer reduce rounds
async fn handle_peer(state: Arc<GroupState>, mut stream: TcpStream) -> Result<()> {
    let rank = match recv_message(&mut stream).await? {
        Message::Join { rank } => rank,
        other => {
            let reason = format!("expected Join, got {:?}", other);
            send_message(&mut stream, &Message::Abort { reason: reason.clone() }).await?;
            return Err(Error::Rendezvous { message: reason });
        }
    };

    if rank == 0 || rank >= state.world_size {
        let reason = format!("invalid rank {} for world_size {}", rank, state.world_size);
        send_message(&mut stream, &Message::Abort { reason: reason.clone() }).await?;
        return Err(Error::Rendezvous { message: reason });
    }

    if let Err(e) = state.join.arrive(rank) {
        send_message(
            &mut stream,
            &Message::Abort {
                reason: e.to_string(),
            },
        )
        .await?;
        return Err(e);
    }

    if let Some(rx) = state.join.wait() {
        if rx.await.is_err() {
            return Err(Error::Rendezvous {
                message: "rendezvous state dropped before release".to_string(),
            });
        }
    }

    send_message(
        &mut stream,
        &Message::JoinAck {
            world_size: state.world_size,
        },
    )
    .await?;

    loop {
        let message = match recv_message(&mut stream).await {
            Ok(message) => message,
            // Peer hung up after finishing its rounds
            Err(Error::Io(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        match message {
            Message::Contribute {
                round,
                rank: sender,
                values,
            } => {
                if sender != rank {
                    let reason = format!("rank {} sent contribution labelled {}", rank, sender);
                    send_message(&mut stream, &Message::Abort { reason: reason.clone() }).await?;
                    return Err(Error::Rendezvous { message: reason });
                }

                let round_state = state.round(round);
                if let Err(e) = round_state.contribute(rank, values) {
                    send_message(
                        &mut stream,
                        &Message::Abort {
                            reason: e.to_string(),
                        },
                    )
                    .await?;
                    return Err(e);
                }

                let result = match round_state.wait() {
                    WaitOutcome::Ready(result) => result,
                    WaitOutcome::Pending(rx) => rx.await.map_err(|_| Error::Rendezvous {
                        message: "reduce state dropped before release".to_string(),
                    })?,
                };

                send_message(
                    &mut stream,
                    &Message::Reduced {
                        round,
                        values: result,
                    },
                )
                .await?;
            }
            Message::Abort { reason } => {
                return Err(Error::Rendezvous { message: reason });
            }
            other => {
                return Err(Error::Rendezvous {
                    message: format!("unexpected message from rank {}: {:?}", rank, other),
                });
            }
        }
    }
}
