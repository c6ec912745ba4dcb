#![allow(clippy::missing_errors_doc)]

//! Single-line session transfer codec.
//!
//! A complete saved session encodes as `geotoken:v1:<count>:<payload>` where
//! `count` is the number of token records and `payload` is base64-wrapped
//! JSON. The line is safe to paste through chat or a clipboard, which is all
//! the durability a transfer needs.

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use geotoken_core::{GeoPoint, SavedSession, SavedToken, TileCoord, TokenValue};
use serde::{Deserialize, Serialize};

const TRANSFER_DOMAIN: &str = "geotoken";
const TRANSFER_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded session payload.
pub const TRANSFER_HEADER: &str = "geotoken:v1";
/// Delimiter used to separate the prefix, record count and payload.
const FIELD_DELIMITER: char = ':';

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct TransferPayload {
    tokens: Vec<TransferToken>,
    held: Option<u64>,
    player: Option<GeoPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct TransferToken {
    key: String,
    value: u64,
    collected: bool,
}

/// Encodes the session into a single-line string suitable for clipboard
/// transfer.
#[must_use]
pub fn encode(session: &SavedSession) -> String {
    let payload = TransferPayload {
        tokens: session
            .tokens
            .iter()
            .map(|token| TransferToken {
                key: token.tile.key(),
                value: token.value.get(),
                collected: token.collected,
            })
            .collect(),
        held: session.held.map(|value| value.get()),
        player: session.player,
    };
    let json = serde_json::to_vec(&payload).expect("session transfer serialization never fails");
    let encoded = STANDARD_NO_PAD.encode(json);
    format!(
        "{TRANSFER_HEADER}:{}:{encoded}",
        session.tokens.len()
    )
}

/// Decodes a session from the provided string representation.
pub fn decode(value: &str) -> Result<SavedSession, TransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TransferError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(TransferError::MissingPrefix)?;
    let version = parts.next().ok_or(TransferError::MissingVersion)?;
    let count = parts.next().ok_or(TransferError::MissingCount)?;
    let payload = parts.next().ok_or(TransferError::MissingPayload)?;

    if domain != TRANSFER_DOMAIN {
        return Err(TransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != TRANSFER_VERSION {
        return Err(TransferError::UnsupportedVersion(version.to_owned()));
    }

    let declared: usize = count
        .trim()
        .parse()
        .map_err(|_| TransferError::InvalidCount(count.to_owned()))?;
    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(TransferError::InvalidEncoding)?;
    let decoded: TransferPayload =
        serde_json::from_slice(&bytes).map_err(TransferError::InvalidPayload)?;

    if decoded.tokens.len() != declared {
        return Err(TransferError::CountMismatch {
            declared,
            actual: decoded.tokens.len(),
        });
    }

    let mut tokens = Vec::with_capacity(decoded.tokens.len());
    for record in decoded.tokens {
        let tile = TileCoord::from_key(&record.key)
            .ok_or_else(|| TransferError::InvalidTokenKey(record.key.clone()))?;
        tokens.push(SavedToken {
            tile,
            value: TokenValue::new(record.value),
            collected: record.collected,
        });
    }

    Ok(SavedSession {
        tokens,
        held: decoded.held.map(TokenValue::new),
        player: decoded.player,
    })
}

/// Errors that can occur while decoding session transfer strings.
#[derive(Debug)]
pub enum TransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded session.
    MissingPrefix,
    /// The encoded session did not contain a version segment.
    MissingVersion,
    /// The encoded session did not include the record count.
    MissingCount,
    /// The encoded session did not include the payload segment.
    MissingPayload,
    /// The encoded session used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded session used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The record count could not be parsed from the encoded session.
    InvalidCount(String),
    /// The declared record count disagreed with the decoded payload.
    CountMismatch {
        /// Count announced in the header.
        declared: usize,
        /// Number of records actually present.
        actual: usize,
    },
    /// A token record carried a key that is not a tile coordinate.
    InvalidTokenKey(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "transfer payload was empty"),
            Self::MissingPrefix => write!(f, "transfer string is missing the prefix"),
            Self::MissingVersion => write!(f, "transfer string is missing the version"),
            Self::MissingCount => write!(f, "transfer string is missing the record count"),
            Self::MissingPayload => write!(f, "transfer string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "transfer prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "transfer version '{version}' is not supported")
            }
            Self::InvalidCount(count) => {
                write!(f, "could not parse record count '{count}'")
            }
            Self::CountMismatch { declared, actual } => {
                write!(
                    f,
                    "transfer announced {declared} records but contained {actual}"
                )
            }
            Self::InvalidTokenKey(key) => {
                write!(f, "token record key '{key}' is not a tile coordinate")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode transfer payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse transfer payload: {error}")
            }
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{decode, encode, TransferError, TRANSFER_HEADER};
    use geotoken_core::{GeoPoint, SavedSession, SavedToken, TileCoord, TokenValue};

    #[test]
    fn round_trip_empty_session() {
        let session = SavedSession::default();

        let encoded = encode(&session);
        assert!(encoded.starts_with(&format!("{TRANSFER_HEADER}:0:")));

        let decoded = decode(&encoded).expect("session decodes");
        assert_eq!(session, decoded);
    }

    #[test]
    fn round_trip_populated_session() {
        let session = SavedSession {
            tokens: vec![
                SavedToken {
                    tile: TileCoord::new(-4, 17),
                    value: TokenValue::new(4),
                    collected: false,
                },
                SavedToken {
                    tile: TileCoord::new(0, 0),
                    value: TokenValue::new(1),
                    collected: true,
                },
            ],
            held: Some(TokenValue::new(2)),
            player: Some(GeoPoint::new(0.00035, -0.00125)),
        };

        let encoded = encode(&session);
        assert!(encoded.starts_with(&format!("{TRANSFER_HEADER}:2:")));

        let decoded = decode(&encoded).expect("session decodes");
        assert_eq!(session, decoded);
    }

    #[test]
    fn foreign_prefixes_are_rejected() {
        let error = decode("geocache:v1:0:e30").expect_err("prefix must be rejected");
        assert!(matches!(error, TransferError::InvalidPrefix(_)));
    }

    #[test]
    fn future_versions_are_rejected() {
        let error = decode("geotoken:v9:0:e30").expect_err("version must be rejected");
        assert!(matches!(error, TransferError::UnsupportedVersion(_)));
    }

    #[test]
    fn count_disagreements_are_rejected() {
        let session = SavedSession::default();
        let encoded = encode(&session).replace(":0:", ":3:");
        let error = decode(&encoded).expect_err("count mismatch must be rejected");
        assert!(matches!(
            error,
            TransferError::CountMismatch {
                declared: 3,
                actual: 0
            }
        ));
    }

    #[test]
    fn garbage_payloads_are_rejected() {
        let error = decode("geotoken:v1:0:!!!").expect_err("payload must be rejected");
        assert!(matches!(error, TransferError::InvalidEncoding(_)));
    }
}
