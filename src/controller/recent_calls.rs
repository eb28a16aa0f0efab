//! Recent calls board: the side list of calls made in the last few minutes.

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::RecentCallsConfig;
use crate::model::{OrderCallChange, OrderCallRecord};

/// Active calls newer than `window`, newest first, at most `limit`.
#[derive(Debug, Clone)]
pub struct RecentCallsBoard {
    window: TimeDelta,
    limit: usize,
    calls: Vec<OrderCallRecord>,
}

impl RecentCallsBoard {
    pub fn new(window: TimeDelta, limit: usize) -> Self {
        Self {
            window,
            limit,
            calls: Vec::new(),
        }
    }

    pub fn from_config(config: &RecentCallsConfig) -> Self {
        let window = TimeDelta::from_std(config.window()).unwrap_or(TimeDelta::MAX);
        Self::new(window, config.limit)
    }

    pub fn calls(&self) -> &[OrderCallRecord] {
        &self.calls
    }

    /// Oldest `called_at` still on the board at `now`.
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Applies a feed change. Returns whether the board changed.
    pub fn apply(&mut self, change: &OrderCallChange, now: DateTime<Utc>) -> bool {
        match change {
            OrderCallChange::Inserted(record) => self.insert(record.clone(), now),
            OrderCallChange::Updated(record) if !record.is_active() => self.remove(&record.id),
            OrderCallChange::Updated(record) => match self.calls.iter_mut().find(|c| c.id == record.id) {
                Some(existing) => {
                    *existing = record.clone();
                    self.sort();
                    true
                }
                None => false,
            },
            OrderCallChange::Deleted(record) => self.remove(&record.id),
        }
    }

    fn insert(&mut self, record: OrderCallRecord, now: DateTime<Utc>) -> bool {
        if !record.is_active() || record.called_at < self.since(now) {
            return false;
        }
        self.calls.retain(|c| c.id != record.id);
        self.calls.insert(0, record);
        self.sort();
        self.calls.truncate(self.limit);
        true
    }

    fn remove(&mut self, id: &str) -> bool {
        let before = self.calls.len();
        self.calls.retain(|c| c.id != id);
        before != self.calls.len()
    }

    /// Replaces the board with a fresh load.
    pub fn replace(&mut self, records: Vec<OrderCallRecord>, now: DateTime<Utc>) {
        let since = self.since(now);
        let mut seen = HashSet::new();
        self.calls = records
            .into_iter()
            .filter(|r| r.is_active() && r.called_at >= since)
            .filter(|r| seen.insert(r.id.clone()))
            .collect();
        self.sort();
        self.calls.truncate(self.limit);
    }

    /// Drops calls that fell out of the window. Returns whether any did.
    pub fn prune(&mut self, now: DateTime<Utc>) -> bool {
        let since = self.since(now);
        let before = self.calls.len();
        self.calls.retain(|c| c.called_at >= since);
        before != self.calls.len()
    }

    fn sort(&mut self) {
        // Stable, so equal timestamps keep arrival order
        self.calls.sort_by(|a, b| b.called_at.cmp(&a.called_at));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderNumber, OrderType};

    fn call(id: &str, number: u16, at: DateTime<Utc>) -> OrderCallRecord {
        OrderCallRecord {
            id: id.to_string(),
            store_id: "s1".to_string(),
            number: OrderNumber::new(number).unwrap(),
            order_type: OrderType::DineIn,
            called_at: at,
            admin_id: None,
            deleted_at: None,
        }
    }

    fn ids(board: &RecentCallsBoard) -> Vec<&str> {
        board.calls().iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_inserts_are_newest_first_and_bounded() {
        let now = Utc::now();
        let mut board = RecentCallsBoard::new(TimeDelta::minutes(2), 2);

        assert!(board.apply(&OrderCallChange::Inserted(call("a", 1, now - TimeDelta::seconds(30))), now));
        assert!(board.apply(&OrderCallChange::Inserted(call("b", 2, now - TimeDelta::seconds(20))), now));
        assert!(board.apply(&OrderCallChange::Inserted(call("c", 3, now - TimeDelta::seconds(10))), now));
        assert_eq!(ids(&board), vec!["c", "b"]);

        // Too old for the window
        assert!(!board.apply(&OrderCallChange::Inserted(call("d", 4, now - TimeDelta::minutes(5))), now));
    }

    #[test]
    fn test_soft_delete_and_hard_delete_remove_by_id() {
        let now = Utc::now();
        let mut board = RecentCallsBoard::new(TimeDelta::minutes(2), 10);
        board.apply(&OrderCallChange::Inserted(call("a", 1, now)), now);
        board.apply(&OrderCallChange::Inserted(call("b", 2, now)), now);

        let mut soft = call("a", 1, now);
        soft.deleted_at = Some(now);
        assert!(board.apply(&OrderCallChange::Updated(soft), now));
        assert!(board.apply(&OrderCallChange::Deleted(call("b", 2, now)), now));
        assert!(board.calls().is_empty());
        assert!(!board.apply(&OrderCallChange::Deleted(call("b", 2, now)), now));
    }

    #[test]
    fn test_from_config_uses_window_and_limit() {
        let now = Utc::now();
        let config = RecentCallsConfig {
            window_secs: 60,
            limit: 3,
            ..RecentCallsConfig::default()
        };
        let board = RecentCallsBoard::from_config(&config);
        assert_eq!(board.since(now), now - TimeDelta::seconds(60));
        assert_eq!(board.limit(), 3);
    }

    #[test]
    fn test_replace_and_prune_respect_window() {
        let now = Utc::now();
        let mut board = RecentCallsBoard::new(TimeDelta::minutes(2), 10);
        board.replace(
            vec![
                call("old", 1, now - TimeDelta::minutes(3)),
                call("mid", 2, now - TimeDelta::seconds(90)),
                call("new", 3, now - TimeDelta::seconds(5)),
            ],
            now,
        );
        assert_eq!(ids(&board), vec!["new", "mid"]);

        assert!(board.prune(now + TimeDelta::seconds(60)));
        assert_eq!(ids(&board), vec!["new"]);
    }
}
