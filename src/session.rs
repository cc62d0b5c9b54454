//! Conversation session store
//!
//! Per-user trailing window of chat turns, injected into the orchestrator
//! rather than held as process-global state. Lives only as long as the
//! process; history is advisory context, not financial data.

use crate::models::{ConversationTurn, TurnRole};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Most recent turns kept per user (5 exchange pairs)
pub const HISTORY_CAPACITY: usize = 10;

/// Bounded per-user conversation history
#[derive(Clone)]
pub struct SessionStore {
    histories: Arc<RwLock<HashMap<Uuid, VecDeque<ConversationTurn>>>>,
    capacity: usize,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            histories: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Append a turn, evicting the oldest entries beyond the capacity.
    pub async fn append(&self, user_id: Uuid, role: TurnRole, message: impl Into<String>) {
        let mut histories = self.histories.write().await;
        let history = histories.entry(user_id).or_insert_with(VecDeque::new);

        history.push_back(ConversationTurn::new(role, message));
        while history.len() > self.capacity {
            history.pop_front();
        }
    }

    /// Stored turns for a user, oldest first. Empty if the user is unknown.
    pub async fn get(&self, user_id: Uuid) -> Vec<ConversationTurn> {
        let histories = self.histories.read().await;
        histories
            .get(&user_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop a user's history.
    pub async fn clear(&self, user_id: Uuid) {
        let mut histories = self.histories.write().await;
        if let Some(history) = histories.get_mut(&user_id) {
            history.clear();
        }
    }

    /// Render the history as a labeled transcript for prompt injection.
    /// Empty string when there is nothing to include.
    pub async fn format_for_prompt(&self, user_id: Uuid) -> String {
        let histories = self.histories.read().await;
        let Some(history) = histories.get(&user_id).filter(|h| !h.is_empty()) else {
            return String::new();
        };

        let mut formatted = String::from("\n\nLịch sử trò chuyện trước đó:\n");
        for turn in history {
            formatted.push_str(&format!("{}: {}\n", turn.role, turn.message));
        }

        formatted
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded() {
        tokio_test::block_on(async {
            let store = SessionStore::new();
            let user_id = Uuid::new_v4();

            for i in 0..25 {
                let role = if i % 2 == 0 { TurnRole::User } else { TurnRole::Assistant };
                store.append(user_id, role, format!("turn {}", i)).await;
            }

            let history = store.get(user_id).await;
            assert_eq!(history.len(), HISTORY_CAPACITY);
            // Oldest entries were evicted; the tail survives in order.
            assert_eq!(history[0].message, "turn 15");
            assert_eq!(history[9].message, "turn 24");
        });
    }

    #[test]
    fn test_unknown_user_gets_empty_history() {
        tokio_test::block_on(async {
            let store = SessionStore::new();
            assert!(store.get(Uuid::new_v4()).await.is_empty());
            assert_eq!(store.format_for_prompt(Uuid::new_v4()).await, "");
        });
    }

    #[test]
    fn test_clear_resets_history() {
        tokio_test::block_on(async {
            let store = SessionStore::new();
            let user_id = Uuid::new_v4();

            store.append(user_id, TurnRole::User, "xin chào").await;
            store.append(user_id, TurnRole::Assistant, "chào bạn!").await;
            assert_eq!(store.get(user_id).await.len(), 2);

            store.clear(user_id).await;
            assert!(store.get(user_id).await.is_empty());
        });
    }

    #[test]
    fn test_transcript_labels_roles() {
        tokio_test::block_on(async {
            let store = SessionStore::new();
            let user_id = Uuid::new_v4();

            store.append(user_id, TurnRole::User, "mình muốn tiết kiệm").await;
            store.append(user_id, TurnRole::Assistant, "bắt đầu từ ghi chép chi tiêu nhé").await;

            let transcript = store.format_for_prompt(user_id).await;
            assert!(transcript.contains("User: mình muốn tiết kiệm"));
            assert!(transcript.contains("Fin: bắt đầu từ ghi chép chi tiêu nhé"));
        });
    }
}
