//! Open board sessions. Each session owns one orchestrator behind its own
//! lock so boards for different jobs never contend.
//!
//! Sessions that go untouched for longer than the idle TTL are dropped, either
//! when a new session is opened or by the periodic sweeper.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::board::orchestrator::{BoardOrchestrator, SharedBoard};

struct Entry {
    board: SharedBoard,
    last_seen: Instant,
}

pub struct SessionStore {
    boards: RwLock<HashMap<Uuid, Entry>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            boards: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub async fn insert(&self, board: BoardOrchestrator) -> (Uuid, SharedBoard) {
        self.sweep_idle().await;

        let id = Uuid::new_v4();
        let shared = SharedBoard::new(board);
        let entry = Entry {
            board: shared.clone(),
            last_seen: Instant::now(),
        };
        self.boards.write().await.insert(id, entry);
        (id, shared)
    }

    /// Looks a session up and marks it as used.
    pub async fn get(&self, id: Uuid) -> Option<SharedBoard> {
        let mut boards = self.boards.write().await;
        let entry = boards.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(entry.board.clone())
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.boards.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.boards.read().await.len()
    }

    /// Drops every session idle for longer than the TTL. Returns how many went.
    pub async fn sweep_idle(&self) -> usize {
        let now = Instant::now();
        let mut boards = self.boards.write().await;
        let before = boards.len();
        boards.retain(|_, entry| now.duration_since(entry.last_seen) <= self.idle_ttl);
        before - boards.len()
    }

    /// Runs `sweep_idle` every `every` for as long as the store lives.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(every);
            ticks.tick().await;
            loop {
                ticks.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let dropped = store.sweep_idle().await;
                if dropped > 0 {
                    let open = store.len().await;
                    info!(dropped, open, "Dropped idle board sessions");
                }
            }
        })
    }
}
