#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Durable session storage for GeoToken.
//!
//! The session persists as three independent key-value records: the token
//! store, the held token, and the player position. Each record loads on its
//! own, so a parse failure in one never corrupts the others. Write failures
//! are swallowed after a warning; the in-memory world stays authoritative for
//! the rest of the session.

use geotoken_core::{GeoPoint, SavedSession, SavedToken, TileCoord, TokenValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage key holding the token store record.
pub const TOKENS_KEY: &str = "geotoken-tokens";
/// Storage key holding the held-token record.
pub const HELD_KEY: &str = "geotoken-held";
/// Storage key holding the player position record.
pub const PLAYER_KEY: &str = "geotoken-player";

/// Errors a storage backend can report.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying medium failed to read or write.
    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),
    /// The backend ran out of quota for new records.
    #[error("storage quota exhausted")]
    QuotaExceeded,
}

/// Durable key-value storage consumed by the persistence pass.
pub trait Storage {
    /// Reads the record stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes `value` under `key`, replacing any previous record.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes the record stored under `key`. Removing an absent key is not
    /// an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct TokenRecord {
    key: String,
    value: u64,
    collected: bool,
}

/// Persists the complete session. Failures are logged and swallowed; the
/// session continues from memory.
pub fn save(session: &SavedSession, storage: &mut dyn Storage) {
    let records: Vec<TokenRecord> = session
        .tokens
        .iter()
        .map(|token| TokenRecord {
            key: token.tile.key(),
            value: token.value.get(),
            collected: token.collected,
        })
        .collect();
    write_json(storage, TOKENS_KEY, &records);
    write_json(storage, HELD_KEY, &session.held.map(|value| value.get()));
    if let Some(player) = session.player {
        write_json(storage, PLAYER_KEY, &player);
    }
}

/// Restores the session from storage. Absent or malformed records fall back
/// to fresh defaults without affecting the other records.
#[must_use]
pub fn load(storage: &dyn Storage) -> SavedSession {
    SavedSession {
        tokens: load_tokens(storage),
        held: read_json::<Option<u64>>(storage, HELD_KEY)
            .flatten()
            .map(TokenValue::new),
        player: read_json::<GeoPoint>(storage, PLAYER_KEY),
    }
}

/// Removes every persisted record, returning the storage to a fresh state.
pub fn clear(storage: &mut dyn Storage) {
    for key in [TOKENS_KEY, HELD_KEY, PLAYER_KEY] {
        if let Err(error) = storage.remove(key) {
            log::warn!("failed to remove '{key}': {error}");
        }
    }
}

fn load_tokens(storage: &dyn Storage) -> Vec<SavedToken> {
    let Some(records) = read_json::<Vec<TokenRecord>>(storage, TOKENS_KEY) else {
        return Vec::new();
    };
    records
        .into_iter()
        .filter_map(|record| {
            let Some(tile) = TileCoord::from_key(&record.key) else {
                log::warn!("skipping token record with malformed key '{}'", record.key);
                return None;
            };
            if record.value == 0 {
                log::warn!("skipping token record at '{}' with zero value", record.key);
                return None;
            }
            Some(SavedToken {
                tile,
                value: TokenValue::new(record.value),
                collected: record.collected,
            })
        })
        .collect()
}

fn write_json<T: Serialize>(storage: &mut dyn Storage, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => {
            if let Err(error) = storage.write(key, &json) {
                log::warn!("failed to persist '{key}': {error}");
            }
        }
        Err(error) => log::warn!("failed to serialise '{key}': {error}"),
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = match storage.read(key) {
        Ok(raw) => raw?,
        Err(error) => {
            log::warn!("failed to read '{key}': {error}");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            log::warn!("ignoring malformed record under '{key}': {error}");
            None
        }
    }
}
