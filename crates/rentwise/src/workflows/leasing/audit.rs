//! Append-only, hash-chained audit trail attached to every lease.
//!
//! Each event commits to the previous event's hash, so editing, removing or reordering any
//! recorded event breaks verification from that point on.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";
const FIELD_SEPARATOR: [u8; 1] = [0x1f];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub sequence: u64,
    pub at: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub detail: String,
    pub prev_hash: String,
    pub hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrail {
    events: Vec<AuditEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    #[error("audit event {sequence} does not match its recorded hash")]
    Tampered { sequence: u64 },
    #[error("audit sequence broken: expected {expected}, found {found}")]
    Sequence { expected: u64, found: u64 },
}

fn event_hash(
    prev_hash: &str,
    sequence: u64,
    at: &DateTime<Utc>,
    actor: &str,
    action: &str,
    detail: &str,
) -> String {
    let sequence = sequence.to_string();
    let timestamp = at.to_rfc3339_opts(SecondsFormat::Micros, true);
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    for field in [
        sequence.as_str(),
        timestamp.as_str(),
        actor,
        action,
        detail,
    ] {
        hasher.update(FIELD_SEPARATOR);
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        at: DateTime<Utc>,
        actor: impl Into<String>,
        action: impl Into<String>,
        detail: impl Into<String>,
    ) -> &AuditEvent {
        let sequence = self.events.len() as u64 + 1;
        let prev_hash = self.head_hash().to_string();
        let actor = actor.into();
        let action = action.into();
        let detail = detail.into();
        let hash = event_hash(&prev_hash, sequence, &at, &actor, &action, &detail);

        self.events.push(AuditEvent {
            sequence,
            at,
            actor,
            action,
            detail,
            prev_hash,
            hash,
        });
        &self.events[self.events.len() - 1]
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Hash of the latest event, or the genesis hash for an empty trail.
    pub fn head_hash(&self) -> &str {
        self.events
            .last()
            .map(|event| event.hash.as_str())
            .unwrap_or(GENESIS_HASH)
    }

    pub fn actions(&self) -> Vec<&str> {
        self.events
            .iter()
            .map(|event| event.action.as_str())
            .collect()
    }

    pub fn verify(&self) -> Result<(), AuditError> {
        let mut prev_hash = GENESIS_HASH;
        for (index, event) in self.events.iter().enumerate() {
            let expected = index as u64 + 1;
            if event.sequence != expected {
                return Err(AuditError::Sequence {
                    expected,
                    found: event.sequence,
                });
            }
            let recomputed = event_hash(
                prev_hash,
                event.sequence,
                &event.at,
                &event.actor,
                &event.action,
                &event.detail,
            );
            if event.prev_hash != prev_hash || event.hash != recomputed {
                return Err(AuditError::Tampered {
                    sequence: event.sequence,
                });
            }
            prev_hash = &event.hash;
        }
        Ok(())
    }
}
