//! TCP bridge client.
//!
//! Speaks the JSON-lines protocol in [`crate::protocol`] to a game-side
//! bridge process. Requests are correlated by id so that chat events and
//! out-of-order replies can share one connection: a reader task routes each
//! response to its waiting caller and publishes chat events.

use async_trait::async_trait;
use minebrain_core::{
    AgentStatus, Block, BlockPos, ChatEvent, ContainerId, EntityFilter, EntityId, EntityInfo, Face,
    GameClient, GameError, ItemStack, LoginOptions, PlayerInfo,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::protocol::{self, Event, Incoming, Request};

type Waiter = oneshot::Sender<Result<serde_json::Value, GameError>>;

/// Requests awaiting a reply. `closed` is set once the reader has stopped;
/// nothing may be registered after that.
#[derive(Default)]
struct PendingTable {
    waiters: HashMap<u64, Waiter>,
    closed: Option<String>,
}

type Pending = Arc<Mutex<PendingTable>>;

/// A [`GameClient`] backed by a bridge process over TCP.
pub struct RemoteGameClient {
    username: String,
    writer: Mutex<OwnedWriteHalf>,
    pending: Pending,
    next_id: AtomicU64,
    chat_tx: broadcast::Sender<ChatEvent>,
    timeout: Duration,
    reader: JoinHandle<()>,
}

impl RemoteGameClient {
    /// Connect to the bridge at `addr` and log in to the game server.
    pub async fn connect(addr: &str, login: LoginOptions, timeout: Duration) -> Result<Self, GameError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| GameError::Disconnected(format!("connect bridge {addr}: {e}")))?;
        let (read, write) = stream.into_split();

        let pending: Pending = Arc::new(Mutex::new(PendingTable::default()));
        let (chat_tx, _) = broadcast::channel(256);
        let reader = tokio::spawn(read_loop(BufReader::new(read), pending.clone(), chat_tx.clone()));

        let client = Self {
            username: login.username.clone(),
            writer: Mutex::new(write),
            pending,
            next_id: AtomicU64::new(1),
            chat_tx,
            timeout,
            reader,
        };

        let LoginOptions { host, port, username, auth } = login;
        info!(bridge = %addr, %host, port, %username, %auth, "Logging in through bridge");
        client
            .call_raw(Request::Login { host, port, username, auth })
            .await?;
        Ok(client)
    }

    async fn call_raw(&self, request: Request) -> Result<serde_json::Value, GameError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = protocol::encode(id, &request)?;
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if let Some(reason) = &pending.closed {
                return Err(GameError::Disconnected(reason.clone()));
            }
            pending.waiters.insert(id, tx);
        }

        debug!(id, op = request.op(), "bridge request");
        let written = {
            let mut writer = self.writer.lock().await;
            match writer.write_all(line.as_bytes()).await {
                Ok(()) => writer.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            self.pending.lock().await.waiters.remove(&id);
            return Err(GameError::Disconnected(format!("bridge write: {e}")));
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(GameError::Disconnected("bridge connection closed".into())),
            Err(_) => {
                self.pending.lock().await.waiters.remove(&id);
                Err(GameError::Timeout(self.timeout.as_secs()))
            }
        }
    }

    async fn call<T: DeserializeOwned>(&self, request: Request) -> Result<T, GameError> {
        let op = request.op();
        let value = self.call_raw(request).await?;
        serde_json::from_value(value).map_err(|e| GameError::Protocol(format!("decode {op} result: {e}")))
    }
}

impl Drop for RemoteGameClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(mut reader: BufReader<OwnedReadHalf>, pending: Pending, chat_tx: broadcast::Sender<ChatEvent>) {
    let mut line = String::new();
    let reason = loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break "bridge closed the connection".to_string(),
            Ok(_) => {}
            Err(e) => break format!("bridge read: {e}"),
        }
        if line.trim().is_empty() {
            continue;
        }

        match protocol::decode(&line) {
            Ok(Incoming::Response(response)) => {
                let waiter = pending.lock().await.waiters.remove(&response.id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(response.into_result());
                    }
                    None => warn!(id = response.id, "bridge response for unknown request"),
                }
            }
            Ok(Incoming::Event(Event::Chat { sender, message })) => {
                let _ = chat_tx.send(ChatEvent { sender, message });
            }
            Ok(Incoming::Event(Event::Disconnected { reason })) => {
                break format!("kicked: {reason}");
            }
            Err(e) => warn!(error = %e, "Skipping bridge line"),
        }
    };

    warn!(%reason, "Bridge connection ended");
    let mut pending = pending.lock().await;
    for (_, tx) in pending.waiters.drain() {
        let _ = tx.send(Err(GameError::Disconnected(reason.clone())));
    }
    pending.closed = Some(reason);
}

#[async_trait]
impl GameClient for RemoteGameClient {
    fn username(&self) -> &str {
        &self.username
    }

    fn subscribe_chat(&self) -> broadcast::Receiver<ChatEvent> {
        self.chat_tx.subscribe()
    }

    async fn status(&self) -> Result<AgentStatus, GameError> {
        self.call(Request::Status).await
    }

    async fn inventory(&self) -> Result<Vec<ItemStack>, GameError> {
        self.call(Request::Inventory).await
    }

    async fn players(&self) -> Result<Vec<PlayerInfo>, GameError> {
        self.call(Request::Players).await
    }

    async fn nearest_entity(&self, filter: &EntityFilter) -> Result<Option<EntityInfo>, GameError> {
        self.call(Request::NearestEntity { filter: filter.clone() }).await
    }

    async fn entity(&self, id: EntityId) -> Result<Option<EntityInfo>, GameError> {
        self.call(Request::Entity { id }).await
    }

    async fn block_at(&self, position: BlockPos) -> Result<Option<Block>, GameError> {
        self.call(Request::BlockAt { position }).await
    }

    async fn find_block(&self, name: &str, max_distance: f64) -> Result<Option<Block>, GameError> {
        self.call(Request::FindBlock {
            name: name.to_string(),
            max_distance,
        })
        .await
    }

    async fn raycast_block(&self, max_distance: f64) -> Result<Option<Block>, GameError> {
        self.call(Request::RaycastBlock { max_distance }).await
    }

    async fn equip(&self, slot: u16) -> Result<(), GameError> {
        self.call_raw(Request::Equip { slot }).await.map(drop)
    }

    async fn place_block(&self, reference: BlockPos, face: Face) -> Result<(), GameError> {
        self.call_raw(Request::PlaceBlock { reference, face }).await.map(drop)
    }

    async fn dig(&self, position: BlockPos) -> Result<(), GameError> {
        self.call_raw(Request::Dig { position }).await.map(drop)
    }

    async fn attack(&self, entity: EntityId) -> Result<(), GameError> {
        self.call_raw(Request::Attack { entity }).await.map(drop)
    }

    async fn set_goal(&self, goal: BlockPos) -> Result<(), GameError> {
        self.call_raw(Request::SetGoal { goal }).await.map(drop)
    }

    async fn look(&self, yaw: f32, pitch: f32) -> Result<(), GameError> {
        self.call_raw(Request::Look { yaw, pitch }).await.map(drop)
    }

    async fn open_container(&self, position: BlockPos) -> Result<ContainerId, GameError> {
        self.call(Request::OpenContainer { position }).await
    }

    async fn deposit(&self, container: ContainerId, slot: u16, count: u32) -> Result<(), GameError> {
        self.call_raw(Request::Deposit { container, slot, count }).await.map(drop)
    }

    async fn close_container(&self, container: ContainerId) -> Result<(), GameError> {
        self.call_raw(Request::CloseContainer { container }).await.map(drop)
    }

    async fn chat(&self, text: &str) -> Result<(), GameError> {
        self.call_raw(Request::Chat { text: text.to_string() }).await.map(drop)
    }
}
