//! Per-session conversation logs behind an injectable store.

use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
	time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as TurnLock, OwnedMutexGuard};

use crate::{BoxFuture, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	Human,
	Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
	pub role: Role,
	pub content: String,
}
impl Message {
	pub fn human(content: impl Into<String>) -> Self {
		Self { role: Role::Human, content: content.into() }
	}

	pub fn ai(content: impl Into<String>) -> Self {
		Self { role: Role::Ai, content: content.into() }
	}
}

/// The two independent logs each session owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Log {
	/// Display history used for rewriting and greeting context.
	Chat,
	/// Issued filters (AI role) and rewritten questions (Human role) for paging continuity.
	Query,
}

/// Held for the duration of one turn; dropping it lets the next turn of the session proceed.
pub struct TurnGuard {
	_guard: OwnedMutexGuard<()>,
}
impl TurnGuard {
	pub fn new(guard: OwnedMutexGuard<()>) -> Self {
		Self { _guard: guard }
	}
}

pub trait SessionStore
where
	Self: Send + Sync,
{
	fn acquire<'a>(&'a self, session_id: &'a str) -> BoxFuture<'a, Result<TurnGuard>>;

	fn get<'a>(&'a self, session_id: &'a str, log: Log) -> BoxFuture<'a, Result<Vec<Message>>>;

	fn append<'a>(
		&'a self,
		session_id: &'a str,
		log: Log,
		messages: Vec<Message>,
	) -> BoxFuture<'a, Result<()>>;

	/// Keeps only the newest `keep` messages of the log.
	fn trim<'a>(&'a self, session_id: &'a str, log: Log, keep: usize) -> BoxFuture<'a, Result<()>>;
}

/// Process-local store. Idle sessions are evicted when another session is acquired.
pub struct MemorySessionStore {
	slots: Mutex<HashMap<String, Slot>>,
	idle_ttl: Duration,
}
impl MemorySessionStore {
	pub fn new(cfg: &hunian_config::Session) -> Self {
		Self::with_idle_ttl(Duration::from_secs(cfg.idle_ttl_secs))
	}

	pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
		Self { slots: Mutex::new(HashMap::new()), idle_ttl }
	}

	pub fn session_count(&self) -> usize {
		self.slots.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	fn turn_lock(&self, session_id: &str) -> Arc<TurnLock<()>> {
		let mut slots = self.slots.lock().unwrap_or_else(|err| err.into_inner());
		let before = slots.len();

		slots.retain(|id, slot| id == session_id || !slot.is_evictable(self.idle_ttl));

		let evicted = before - slots.len();

		if evicted > 0 {
			tracing::debug!(evicted, "Idle sessions evicted.");
		}

		let slot = slots.entry(session_id.to_string()).or_insert_with(Slot::new);

		slot.touched = Instant::now();

		slot.turn.clone()
	}

	fn with_slot<T>(&self, session_id: &str, f: impl FnOnce(&mut Slot) -> T) -> T {
		let mut slots = self.slots.lock().unwrap_or_else(|err| err.into_inner());
		let slot = slots.entry(session_id.to_string()).or_insert_with(Slot::new);

		slot.touched = Instant::now();

		f(slot)
	}
}
impl SessionStore for MemorySessionStore {
	fn acquire<'a>(&'a self, session_id: &'a str) -> BoxFuture<'a, Result<TurnGuard>> {
		let turn = self.turn_lock(session_id);

		Box::pin(async move { Ok(TurnGuard::new(turn.lock_owned().await)) })
	}

	fn get<'a>(&'a self, session_id: &'a str, log: Log) -> BoxFuture<'a, Result<Vec<Message>>> {
		let messages = {
			let slots = self.slots.lock().unwrap_or_else(|err| err.into_inner());

			slots.get(session_id).map(|slot| slot.log(log).clone()).unwrap_or_default()
		};

		Box::pin(async move { Ok(messages) })
	}

	fn append<'a>(
		&'a self,
		session_id: &'a str,
		log: Log,
		messages: Vec<Message>,
	) -> BoxFuture<'a, Result<()>> {
		self.with_slot(session_id, |slot| slot.log_mut(log).extend(messages));

		Box::pin(async move { Ok(()) })
	}

	fn trim<'a>(&'a self, session_id: &'a str, log: Log, keep: usize) -> BoxFuture<'a, Result<()>> {
		self.with_slot(session_id, |slot| {
			let messages = slot.log_mut(log);
			let excess = messages.len().saturating_sub(keep);

			messages.drain(..excess);
		});

		Box::pin(async move { Ok(()) })
	}
}

struct Slot {
	turn: Arc<TurnLock<()>>,
	chat: Vec<Message>,
	query: Vec<Message>,
	touched: Instant,
}
impl Slot {
	fn new() -> Self {
		Self {
			turn: Arc::new(TurnLock::new(())),
			chat: Vec::new(),
			query: Vec::new(),
			touched: Instant::now(),
		}
	}

	fn log(&self, log: Log) -> &Vec<Message> {
		match log {
			Log::Chat => &self.chat,
			Log::Query => &self.query,
		}
	}

	fn log_mut(&mut self, log: Log) -> &mut Vec<Message> {
		match log {
			Log::Chat => &mut self.chat,
			Log::Query => &mut self.query,
		}
	}

	/// Idle past the TTL with nobody holding or waiting on the turn lock.
	fn is_evictable(&self, idle_ttl: Duration) -> bool {
		self.touched.elapsed() >= idle_ttl
			&& Arc::strong_count(&self.turn) == 1
			&& self.turn.try_lock().is_ok()
	}
}
