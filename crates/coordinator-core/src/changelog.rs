//! Bounded ring buffer of structured audit events.
//!
//! A consumer of registry mutations, routing decisions, and dispatcher
//! outcomes — never referenced by producers except through [`Changelog::append`].
//! Not in the cascade's hot path: append is synchronized but cheap (a
//! `VecDeque` push plus an optional pop).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEventType {
    ServiceRegistered,
    ServiceActivated,
    ServiceDeactivated,
    RoutingDecision,
    DispatchOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: u64,
    #[serde(rename = "type")]
    pub event_type: ChangeEventType,
    pub details: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

pub struct Changelog {
    max_entries: usize,
    events: RwLock<VecDeque<ChangeEvent>>,
    next_id: AtomicU64,
}

impl Changelog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            events: RwLock::new(VecDeque::with_capacity(max_entries.min(1024))),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn append(&self, event_type: ChangeEventType, details: impl Into<String>, source: impl Into<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let event = ChangeEvent {
            id,
            event_type,
            details: details.into(),
            source: source.into(),
            timestamp: Utc::now(),
        };

        let mut events = self.events.write().await;
        if events.len() >= self.max_entries {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Most recent `limit` events, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<ChangeEvent> {
        let events = self.events.read().await;
        events.iter().rev().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
