use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::ingest::reading::Reading;
use crate::session::{Session, SessionId};
use crate::stats::Stats;
use crate::transport::message::ServerMessage;

#[derive(Debug, Default)]
struct Room {
    members: HashMap<SessionId, Session>,
}

/// Maps channel ids to rooms of live observer sessions.
///
/// The outer map is only write-locked when a channel gets its first room;
/// joins, leaves, and emits on existing rooms take the per-room mutex, so
/// channel A's churn never blocks channel B's emit. Rooms stay in the map
/// once created (the channel table is finite); an empty room makes emit a
/// no-op.
#[derive(Debug)]
pub struct FanoutRouter {
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
    stats: Arc<Stats>,
}

impl FanoutRouter {
    pub fn new(stats: Arc<Stats>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            stats,
        }
    }

    fn room(&self, channel_id: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().unwrap().get(channel_id).cloned()
    }

    fn room_or_create(&self, channel_id: &str) -> Arc<Mutex<Room>> {
        if let Some(room) = self.room(channel_id) {
            return room;
        }
        let mut rooms = self.rooms.write().unwrap();
        rooms
            .entry(channel_id.to_string())
            .or_insert_with(|| {
                Stats::incr(&self.stats.rooms);
                Arc::new(Mutex::new(Room::default()))
            })
            .clone()
    }

    /// Add a session to a channel's room. Idempotent: joining twice leaves
    /// the membership identical to joining once. Returns whether the
    /// session was newly added.
    pub fn join(&self, session: &Session, channel_id: &str) -> bool {
        let room = self.room_or_create(channel_id);
        let added = room
            .lock()
            .unwrap()
            .members
            .insert(session.id.clone(), session.clone())
            .is_none();
        if added {
            debug!("session {} joined room {}", session.id, channel_id);
        }
        added
    }

    /// Remove a session from a channel's room. Leaving a channel that was
    /// never joined is a no-op.
    pub fn leave(&self, session_id: &SessionId, channel_id: &str) {
        if let Some(room) = self.room(channel_id) {
            room.lock().unwrap().members.remove(session_id);
        }
    }

    /// Remove a session from every room it belongs to. Called on
    /// connection termination, before the session handle is dropped, so no
    /// later emit can observe the dead connection.
    pub fn cleanup_connection(&self, session_id: &SessionId) {
        let rooms: Vec<_> = self.rooms.read().unwrap().values().cloned().collect();
        for room in rooms {
            room.lock().unwrap().members.remove(session_id);
        }
    }

    /// Push a reading to exactly the sessions joined to its channel.
    ///
    /// An empty or absent room is a silent no-op. A member whose
    /// connection vanished mid-iteration is skipped, never an error.
    pub fn emit(&self, channel_id: &str, reading: &Reading) {
        let Some(room) = self.room(channel_id) else {
            return;
        };

        let event = ServerMessage::Reading {
            channel_id: channel_id.to_string(),
            reading: reading.clone(),
            server_emit_time: chrono::Utc::now().timestamp_millis(),
        };
        let text = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialize reading event: {e}");
                return;
            }
        };
        let ws_msg = WsMessage::text(text);

        let room = room.lock().unwrap();
        for (session_id, session) in &room.members {
            if session.sender.send(ws_msg.clone()).is_err() {
                // Receiver gone: the session is being torn down, skip it.
                debug!("skipping vanished session {session_id} in room {channel_id}");
            }
        }
    }

    /// Number of sessions currently joined to a channel.
    pub fn member_count(&self, channel_id: &str) -> usize {
        self.room(channel_id)
            .map(|room| room.lock().unwrap().members.len())
            .unwrap_or(0)
    }
}
