//! In-memory accounts, sessions, and search history

use std::collections::HashMap;

use chrono::{SecondsFormat, Utc};
use parking_lot::RwLock;
use pavlo_contract::{AdminUser, NewSearchEntry, SearchHistoryEntry, User};
use serde_json::Map;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StateError {
    #[error("User already exists")]
    EmailTaken,

    #[error("Invalid email or password")]
    BadCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,
}

#[derive(Debug, Clone)]
struct Account {
    id: i64,
    email: String,
    password: String,
    is_admin: bool,
    created_at: String,
}

impl Account {
    fn to_user(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            is_admin: self.is_admin,
            created_at: Some(self.created_at.clone()),
            search_count: None,
            extra: Map::new(),
        }
    }
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    accounts: Vec<Account>,
    by_email: HashMap<String, usize>,
    /// token -> account id; removed on logout
    sessions: HashMap<String, i64>,
    history: HashMap<i64, Vec<SearchHistoryEntry>>,
}

/// Shared stub state
#[derive(Default)]
pub struct StubState {
    inner: RwLock<Inner>,
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn normalize(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

impl StubState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_account(
        &self,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<User, StateError> {
        let mut inner = self.inner.write();
        let key = normalize(email);
        if inner.by_email.contains_key(&key) {
            return Err(StateError::EmailTaken);
        }

        inner.next_id += 1;
        let account = Account {
            id: inner.next_id,
            email: email.trim().to_string(),
            password: password.to_string(),
            is_admin,
            created_at: now_timestamp(),
        };
        let user = account.to_user();
        let idx = inner.accounts.len();
        inner.accounts.push(account);
        inner.by_email.insert(key, idx);
        Ok(user)
    }

    pub fn authenticate(&self, email: &str, password: &str) -> Result<User, StateError> {
        let inner = self.inner.read();
        let idx = inner
            .by_email
            .get(&normalize(email))
            .ok_or(StateError::BadCredentials)?;
        let account = &inner.accounts[*idx];
        if account.password != password {
            return Err(StateError::BadCredentials);
        }
        Ok(account.to_user())
    }

    pub fn issue_token(&self, user_id: i64) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.inner.write().sessions.insert(token.clone(), user_id);
        token
    }

    /// Returns whether the token was live
    pub fn revoke(&self, token: &str) -> bool {
        self.inner.write().sessions.remove(token).is_some()
    }

    pub fn user_for_token(&self, token: &str) -> Result<User, StateError> {
        let inner = self.inner.read();
        let id = inner.sessions.get(token).ok_or(StateError::InvalidToken)?;
        inner
            .accounts
            .iter()
            .find(|a| a.id == *id)
            .map(Account::to_user)
            .ok_or(StateError::InvalidToken)
    }

    pub fn add_history(&self, user_id: i64, entry: NewSearchEntry) -> SearchHistoryEntry {
        let stored = SearchHistoryEntry {
            url: entry.url,
            title: entry.title,
            request_id: entry.request_id,
            timestamp: now_timestamp(),
        };
        self.inner
            .write()
            .history
            .entry(user_id)
            .or_default()
            .push(stored.clone());
        stored
    }

    /// Newest first
    pub fn history(&self, user_id: i64) -> Vec<SearchHistoryEntry> {
        let inner = self.inner.read();
        let mut entries = inner.history.get(&user_id).cloned().unwrap_or_default();
        entries.reverse();
        entries
    }

    pub fn admin_listing(&self) -> Vec<AdminUser> {
        let inner = self.inner.read();
        inner
            .accounts
            .iter()
            .map(|a| AdminUser {
                id: a.id,
                email: a.email.clone(),
                is_admin: a.is_admin,
                created_at: a.created_at.clone(),
                search_count: inner.history.get(&a.id).map_or(0, |h| h.len() as u64),
                extra: Map::new(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_unique_case_insensitively() {
        let state = StubState::new();
        state.create_account("A@example.com", "Passw0rdX", false).unwrap();
        assert_eq!(
            state.create_account("a@example.com", "Passw0rdX", false),
            Err(StateError::EmailTaken)
        );
    }

    #[test]
    fn test_revoked_token_is_rejected() {
        let state = StubState::new();
        let user = state.create_account("b@example.com", "Passw0rdX", false).unwrap();
        let token = state.issue_token(user.id);
        assert_eq!(state.user_for_token(&token).unwrap().id, user.id);
        assert!(state.revoke(&token));
        assert_eq!(state.user_for_token(&token), Err(StateError::InvalidToken));
        assert!(!state.revoke(&token));
    }

    #[test]
    fn test_history_is_scoped_and_counted() {
        let state = StubState::new();
        let a = state.create_account("c@example.com", "Passw0rdX", false).unwrap();
        let b = state.create_account("d@example.com", "Passw0rdX", true).unwrap();
        for n in 0..2 {
            state.add_history(
                a.id,
                NewSearchEntry {
                    url: format!("https://example.com/{n}"),
                    title: "t".to_string(),
                    request_id: n.to_string(),
                },
            );
        }
        assert_eq!(state.history(a.id)[0].request_id, "1");
        assert!(state.history(b.id).is_empty());

        let listing = state.admin_listing();
        assert_eq!(listing[0].search_count, 2);
        assert_eq!(listing[1].search_count, 0);
    }

    #[test]
    fn test_wrong_password() {
        let state = StubState::new();
        state.create_account("e@example.com", "Passw0rdX", false).unwrap();
        assert_eq!(
            state.authenticate("e@example.com", "nope"),
            Err(StateError::BadCredentials)
        );
        assert_eq!(
            state.authenticate("missing@example.com", "Passw0rdX"),
            Err(StateError::BadCredentials)
        );
    }
}
