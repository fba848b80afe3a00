//! Typing-State Tracker: per-room set of users currently composing.
//!
//! Every entry carries the handle of its pending expiry task. Re-arming or
//! stopping aborts that task, so at most one expiry is pending per
//! (room, user). The arm generation additionally protects against an expiry
//! that already woke up before it could be aborted.

use std::collections::HashMap;

use tokio::task::AbortHandle;

use crate::domain::{ConnectionId, RoomId, UserId};

#[derive(Debug)]
struct TypingEntry {
    /// Connection that sent the latest start signal
    connection_id: ConnectionId,
    generation: u64,
    expiry: Option<AbortHandle>,
}

impl TypingEntry {
    fn cancel_expiry(&mut self) {
        if let Some(handle) = self.expiry.take() {
            handle.abort();
        }
    }
}

/// Result of arming a typing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTyping {
    pub generation: u64,
    /// `false` when the user was already typing and the timer was re-armed
    pub started: bool,
}

#[derive(Debug, Default)]
pub struct TypingTracker {
    rooms: HashMap<RoomId, HashMap<UserId, TypingEntry>>,
    next_generation: u64,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `user_id` as typing, replacing any pending expiry.
    pub fn arm(
        &mut self,
        room_id: RoomId,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> ArmedTyping {
        self.next_generation += 1;
        let generation = self.next_generation;
        let users = self.rooms.entry(room_id).or_default();

        let started = match users.get_mut(&user_id) {
            Some(entry) => {
                entry.cancel_expiry();
                entry.connection_id = connection_id;
                entry.generation = generation;
                false
            }
            None => {
                users.insert(
                    user_id,
                    TypingEntry {
                        connection_id,
                        generation,
                        expiry: None,
                    },
                );
                true
            }
        };

        ArmedTyping {
            generation,
            started,
        }
    }

    /// Attach the expiry task of the given arm generation.
    ///
    /// A handle for a superseded generation is aborted right away.
    pub fn attach_expiry(
        &mut self,
        room_id: &RoomId,
        user_id: &UserId,
        generation: u64,
        handle: AbortHandle,
    ) {
        match self.entry_mut(room_id, user_id) {
            Some(entry) if entry.generation == generation => {
                entry.cancel_expiry();
                entry.expiry = Some(handle);
            }
            _ => handle.abort(),
        }
    }

    /// Explicit stop. Returns the originating connection if the user was typing.
    pub fn stop(&mut self, room_id: &RoomId, user_id: &UserId) -> Option<ConnectionId> {
        let mut entry = self.take(room_id, user_id, |_| true)?;
        entry.cancel_expiry();
        Some(entry.connection_id)
    }

    /// Called by the expiry task itself. Only removes the entry if it still
    /// belongs to `generation`.
    pub fn expire(
        &mut self,
        room_id: &RoomId,
        user_id: &UserId,
        generation: u64,
    ) -> Option<ConnectionId> {
        self.take(room_id, user_id, |entry| entry.generation == generation)
            .map(|entry| entry.connection_id)
    }

    /// Drop every entry started from `connection_id`, cancelling their timers.
    pub fn clear_connection(&mut self, connection_id: &ConnectionId) -> Vec<(RoomId, UserId)> {
        let mut cleared = Vec::new();
        for (room_id, users) in self.rooms.iter_mut() {
            users.retain(|user_id, entry| {
                if &entry.connection_id != connection_id {
                    return true;
                }
                entry.cancel_expiry();
                cleared.push((room_id.clone(), user_id.clone()));
                false
            });
        }
        self.rooms.retain(|_, users| !users.is_empty());
        cleared
    }

    /// Like [`Self::clear_connection`] but limited to a single room.
    pub fn clear_connection_in_room(
        &mut self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
    ) -> Option<UserId> {
        let user_id = self
            .rooms
            .get(room_id)?
            .iter()
            .find(|(_, entry)| &entry.connection_id == connection_id)
            .map(|(user_id, _)| user_id.clone())?;
        self.stop(room_id, &user_id)?;
        Some(user_id)
    }

    pub fn is_typing(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|users| users.contains_key(user_id))
    }

    /// Users currently typing in the room, sorted.
    pub fn typing_users(&self, room_id: &RoomId) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .rooms
            .get(room_id)
            .map(|users| users.keys().cloned().collect())
            .unwrap_or_default();
        users.sort();
        users
    }

    fn entry_mut(&mut self, room_id: &RoomId, user_id: &UserId) -> Option<&mut TypingEntry> {
        self.rooms.get_mut(room_id)?.get_mut(user_id)
    }

    fn take(
        &mut self,
        room_id: &RoomId,
        user_id: &UserId,
        matches: impl FnOnce(&TypingEntry) -> bool,
    ) -> Option<TypingEntry> {
        let users = self.rooms.get_mut(room_id)?;
        if !matches(users.get(user_id)?) {
            return None;
        }
        let entry = users.remove(user_id);
        if users.is_empty() {
            self.rooms.remove(room_id);
        }
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn pending_task() -> tokio::task::JoinHandle<()> {
        tokio::spawn(std::future::pending::<()>())
    }

    #[tokio::test]
    async fn test_rearm_aborts_previous_expiry() {
        // テスト項目: 再度 start するとそれまでの失効タスクが中断される（積み上がらない）
        // given (前提条件):
        let mut tracker = TypingTracker::new();
        let conn = ConnectionId::generate();
        let first = tracker.arm(room("r1"), user("alice"), conn);
        let first_task = pending_task();
        tracker.attach_expiry(&room("r1"), &user("alice"), first.generation, first_task.abort_handle());

        // when (操作):
        let second = tracker.arm(room("r1"), user("alice"), conn);

        // then (期待する結果):
        assert!(first.started);
        assert!(!second.started);
        assert!(second.generation > first.generation);
        assert!(first_task.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_stop_cancels_expiry_and_removes_user() {
        // テスト項目: stop で入力中状態が即座に解除され、失効タスクも中断される
        // given (前提条件):
        let mut tracker = TypingTracker::new();
        let conn = ConnectionId::generate();
        let armed = tracker.arm(room("r1"), user("alice"), conn);
        let task = pending_task();
        tracker.attach_expiry(&room("r1"), &user("alice"), armed.generation, task.abort_handle());

        // when (操作):
        let stopped = tracker.stop(&room("r1"), &user("alice"));
        let stopped_again = tracker.stop(&room("r1"), &user("alice"));

        // then (期待する結果):
        assert_eq!(stopped, Some(conn));
        assert_eq!(stopped_again, None);
        assert!(!tracker.is_typing(&room("r1"), &user("alice")));
        assert!(task.await.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_stale_expiry_is_ignored() {
        // テスト項目: 古い世代の失効は再 start 後のエントリを削除しない
        // given (前提条件):
        let mut tracker = TypingTracker::new();
        let conn = ConnectionId::generate();
        let first = tracker.arm(room("r1"), user("alice"), conn);
        let second = tracker.arm(room("r1"), user("alice"), conn);

        // when (操作):
        let stale = tracker.expire(&room("r1"), &user("alice"), first.generation);

        // then (期待する結果):
        assert_eq!(stale, None);
        assert!(tracker.is_typing(&room("r1"), &user("alice")));

        // 現在の世代の失効は一度だけ成功する
        assert_eq!(tracker.expire(&room("r1"), &user("alice"), second.generation), Some(conn));
        assert_eq!(tracker.expire(&room("r1"), &user("alice"), second.generation), None);
    }

    #[tokio::test]
    async fn test_attach_expiry_for_superseded_generation_aborts_handle() {
        // テスト項目: 既に置き換えられた世代のハンドルは登録されずに中断される
        // given (前提条件):
        let mut tracker = TypingTracker::new();
        let conn = ConnectionId::generate();
        let first = tracker.arm(room("r1"), user("alice"), conn);
        tracker.arm(room("r1"), user("alice"), conn);
        let task = pending_task();

        // when (操作):
        tracker.attach_expiry(&room("r1"), &user("alice"), first.generation, task.abort_handle());

        // then (期待する結果):
        assert!(task.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_clear_connection_removes_only_its_entries() {
        // テスト項目: 切断された接続から開始された入力中状態のみ削除される
        // given (前提条件):
        let mut tracker = TypingTracker::new();
        let alice_conn = ConnectionId::generate();
        let bob_conn = ConnectionId::generate();
        let a1 = tracker.arm(room("r1"), user("alice"), alice_conn);
        let task = pending_task();
        tracker.attach_expiry(&room("r1"), &user("alice"), a1.generation, task.abort_handle());
        tracker.arm(room("r2"), user("alice"), alice_conn);
        tracker.arm(room("r1"), user("bob"), bob_conn);

        // when (操作):
        let mut cleared = tracker.clear_connection(&alice_conn);
        cleared.sort();

        // then (期待する結果):
        assert_eq!(
            cleared,
            vec![(room("r1"), user("alice")), (room("r2"), user("alice"))]
        );
        assert_eq!(tracker.typing_users(&room("r1")), vec![user("bob")]);
        assert!(tracker.typing_users(&room("r2")).is_empty());
        assert!(task.await.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_clear_connection_in_room() {
        // テスト項目: ルーム単位で接続の入力中状態を削除できる
        // given (前提条件):
        let mut tracker = TypingTracker::new();
        let conn = ConnectionId::generate();
        tracker.arm(room("r1"), user("alice"), conn);
        tracker.arm(room("r2"), user("alice"), conn);

        // when (操作):
        let cleared = tracker.clear_connection_in_room(&room("r1"), &conn);

        // then (期待する結果):
        assert_eq!(cleared, Some(user("alice")));
        assert!(!tracker.is_typing(&room("r1"), &user("alice")));
        assert!(tracker.is_typing(&room("r2"), &user("alice")));
        assert_eq!(tracker.clear_connection_in_room(&room("r1"), &conn), None);
    }
}
