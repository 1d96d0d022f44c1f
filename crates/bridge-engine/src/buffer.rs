//! Chat Buffer (C5, §4.5) — bounded, monotonically-indexed ring of observable
//! events the UI polls. Modeled on `InMemoryQueue<T, N>`'s
//! `Arc<RwLock<Vec<...>>>` shape, specialized to a capacity-bounded
//! `VecDeque` ring rather than an unbounded `Vec`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use mgba_bridge_protocol::{ChatMessage, ChatMessageBody};

pub const CHAT_BUFFER_CAPACITY: usize = 100;

/// A point-in-time view of the ring, the shape `GET /api/chat-messages/`
/// serializes (spec §6).
#[derive(Debug, Clone)]
pub struct BufferSnapshot {
    pub messages: Vec<ChatMessage>,
    pub head_id: u64,
    pub tail_id: u64,
    pub total_appended: u64,
    pub capacity: usize,
}

/// The bounded ring. `append` takes a write lock for the shortest possible
/// critical section (message is built before the lock is taken); `snapshot`
/// takes a read lock only, so HTTP observers never block the session writer
/// beyond that (§5).
pub struct ChatBuffer {
    messages: RwLock<VecDeque<ChatMessage>>,
    next_id: AtomicU64,
    total_appended: AtomicU64,
    capacity: usize,
}

impl ChatBuffer {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            messages: RwLock::new(VecDeque::with_capacity(capacity)),
            next_id: AtomicU64::new(1),
            total_appended: AtomicU64::new(0),
            capacity,
        })
    }

    pub fn with_default_capacity() -> Arc<Self> {
        Self::new(CHAT_BUFFER_CAPACITY)
    }

    /// Assign the next id, timestamp, and push, evicting the oldest entry on
    /// overflow (invariant 1). Returns the appended message's id.
    pub async fn append(&self, body: ChatMessageBody) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let message = ChatMessage {
            id,
            ts: Utc::now(),
            body,
        };

        let mut messages = self.messages.write().await;
        messages.push_back(message);
        while messages.len() > self.capacity {
            messages.pop_front();
        }
        drop(messages);

        self.total_appended.fetch_add(1, Ordering::SeqCst);
        id
    }

    /// `messages` with `id > since_id` (or the whole ring if `since_id` is
    /// absent or below `head_id`), plus the bookkeeping fields §4.5 requires.
    pub async fn snapshot(&self, since_id: Option<u64>) -> BufferSnapshot {
        let messages = self.messages.read().await;
        let head_id = messages.front().map(|m| m.id).unwrap_or(0);
        let tail_id = messages.back().map(|m| m.id).unwrap_or(0);

        let threshold = since_id.filter(|id| *id >= head_id).unwrap_or(0);
        let filtered: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.id > threshold)
            .cloned()
            .collect();

        BufferSnapshot {
            messages: filtered,
            head_id,
            tail_id,
            total_appended: self.total_appended.load(Ordering::SeqCst),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_are_monotonic_and_never_reset() {
        let buffer = ChatBuffer::new(100);
        let a = buffer
            .append(ChatMessageBody::System {
                content: "a".to_string(),
            })
            .await;
        let b = buffer
            .append(ChatMessageBody::System {
                content: "b".to_string(),
            })
            .await;
        assert_eq!(b, a + 1);
    }

    #[tokio::test]
    async fn overflow_evicts_oldest_and_keeps_head_tail_consistent() {
        let buffer = ChatBuffer::new(100);
        for i in 0..105 {
            buffer
                .append(ChatMessageBody::System {
                    content: format!("msg-{i}"),
                })
                .await;
        }

        let snapshot = buffer.snapshot(Some(0)).await;
        assert_eq!(snapshot.messages.len(), 100);
        assert_eq!(snapshot.head_id, 6);
        assert_eq!(snapshot.tail_id, 105);
        assert_eq!(snapshot.total_appended, 105);
        assert_eq!(snapshot.capacity, 100);
    }

    #[tokio::test]
    async fn since_id_filters_to_newer_messages_only() {
        let buffer = ChatBuffer::new(100);
        for i in 0..5 {
            buffer
                .append(ChatMessageBody::System {
                    content: format!("msg-{i}"),
                })
                .await;
        }

        let snapshot = buffer.snapshot(Some(3)).await;
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[0].id, 4);
    }

    #[tokio::test]
    async fn stale_since_id_below_head_returns_whole_ring() {
        let buffer = ChatBuffer::new(3);
        for i in 0..5 {
            buffer
                .append(ChatMessageBody::System {
                    content: format!("msg-{i}"),
                })
                .await;
        }
        // head_id is now 3 after two evictions; a since_id of 1 is stale.
        let snapshot = buffer.snapshot(Some(1)).await;
        assert_eq!(snapshot.messages.len(), 3);
        assert_eq!(snapshot.head_id, 3);
    }
}
