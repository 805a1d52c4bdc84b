//! Core data model: jobs, amounts, and chain call descriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{Error, Result};

// =============================================================================
// JOB TYPES
// =============================================================================

/// Status of a transaction job in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// String form used in the database and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse the database string form. Unknown strings fall back to
    /// `Queued` so a corrupt row degrades to re-execution rather than loss.
    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => JobStatus::Queued,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Queued,
        }
    }

    /// Terminal states are never claimed again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// The known token-management operation tags.
///
/// Jobs persist their kind as a free string so producers can enqueue
/// tags this build does not know about (they fail at execution time
/// with `UnsupportedType`); this enum covers the kinds the executor
/// registers handlers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Mint new tokens to a recipient
    Mint,
    /// Burn an existing coin object
    Burn,
    /// Mint to a batch of recipients in one transaction
    Distribute,
    /// Freeze or unfreeze a wallet in the registry
    FreezeWallet,
    /// Move a coin object to another address
    Transfer,
}

impl JobKind {
    /// String tag used in job records and route payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Mint => "mint",
            JobKind::Burn => "burn",
            JobKind::Distribute => "distribute",
            JobKind::FreezeWallet => "freeze_wallet",
            JobKind::Transfer => "transfer",
        }
    }

    /// Parse a string tag. Returns `None` for unknown tags.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mint" => Some(JobKind::Mint),
            "burn" => Some(JobKind::Burn),
            "distribute" => Some(JobKind::Distribute),
            "freeze_wallet" => Some(JobKind::FreezeWallet),
            "transfer" => Some(JobKind::Transfer),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction job in the queue.
///
/// Serialized shape is the dashboard wire contract: camelCase fields
/// with the kind tag under `"type"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: JsonValue,
    pub status: JobStatus,
    pub attempts: i64,
    pub error: Option<String>,
    pub result: Option<JsonValue>,
    /// Milliseconds since epoch before which the job is not claimable.
    pub next_run_at: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Queue statistics summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub total: i64,
}

// =============================================================================
// TOKEN AMOUNTS
// =============================================================================

/// A positive token amount carried as a validated digit string.
///
/// Chain amounts routinely exceed what JSON numbers round-trip exactly,
/// so amounts travel as strings and are validated rather than converted
/// to a native integer type. A `TokenAmount` always holds a canonical
/// (no leading zeros), non-zero, unsigned decimal integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount(String);

impl TokenAmount {
    /// Parse an amount out of a payload field.
    ///
    /// Accepts a JSON string of digits or a non-negative JSON integer.
    /// Anything else (missing, null, empty, signed, fractional, zero,
    /// or containing non-digits) is rejected as `InvalidAmount` with
    /// the offending value preserved in the message.
    pub fn parse(value: Option<&JsonValue>) -> Result<Self> {
        let raw = match value {
            Some(JsonValue::String(s)) => s.trim().to_string(),
            Some(JsonValue::Number(n)) => n.to_string(),
            Some(JsonValue::Null) | None => String::from("null"),
            Some(other) => other.to_string(),
        };

        if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidAmount(raw));
        }

        let canonical = raw.trim_start_matches('0');
        if canonical.is_empty() {
            // All zeros
            return Err(Error::InvalidAmount(raw));
        }

        Ok(Self(canonical.to_string()))
    }

    /// The canonical decimal string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

// =============================================================================
// CHAIN CALL DESCRIPTIONS
// =============================================================================

/// One argument of a move call: a shared/owned object reference or a
/// pure value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CallArg {
    Object(String),
    Pure(JsonValue),
}

/// A single `package::module::function` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveCall {
    pub target: String,
    pub arguments: Vec<CallArg>,
}

/// The unit handed to the chain gateway: one or more calls executed
/// atomically under a shared gas budget. Encoding and signing happen
/// behind the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTransaction {
    pub calls: Vec<MoveCall>,
    pub gas_budget: u64,
}

/// Receipt returned by a successful chain submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effects: Option<JsonValue>,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_status_round_trip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn job_status_unknown_falls_back_to_queued() {
        assert_eq!(JobStatus::parse("cancelled"), JobStatus::Queued);
        assert_eq!(JobStatus::parse(""), JobStatus::Queued);
    }

    #[test]
    fn job_status_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn job_kind_round_trip() {
        for kind in [
            JobKind::Mint,
            JobKind::Burn,
            JobKind::Distribute,
            JobKind::FreezeWallet,
            JobKind::Transfer,
        ] {
            assert_eq!(JobKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn job_kind_unknown_is_none() {
        assert_eq!(JobKind::parse("swap"), None);
        assert_eq!(JobKind::parse("MINT"), None);
        assert_eq!(JobKind::parse(""), None);
    }

    #[test]
    fn job_serializes_with_wire_names() {
        let job = Job {
            id: Uuid::now_v7(),
            kind: "mint".to_string(),
            payload: json!({"amount": "1000"}),
            status: JobStatus::Queued,
            attempts: 0,
            error: None,
            result: None,
            next_run_at: 1_700_000_000_000,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["type"], "mint");
        assert_eq!(value["status"], "queued");
        assert_eq!(value["nextRunAt"], 1_700_000_000_000i64);
        assert!(value["createdAt"].is_string());
        assert!(value["updatedAt"].is_string());
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn token_amount_parses_strings_and_integers() {
        let amount = TokenAmount::parse(Some(&json!("1000"))).unwrap();
        assert_eq!(amount.as_str(), "1000");

        let amount = TokenAmount::parse(Some(&json!(250))).unwrap();
        assert_eq!(amount.as_str(), "250");
    }

    #[test]
    fn token_amount_preserves_precision_beyond_u64() {
        let big = "340282366920938463463374607431768211456"; // 2^128
        let amount = TokenAmount::parse(Some(&json!(big))).unwrap();
        assert_eq!(amount.as_str(), big);
    }

    #[test]
    fn token_amount_canonicalizes_leading_zeros() {
        let amount = TokenAmount::parse(Some(&json!("007"))).unwrap();
        assert_eq!(amount.as_str(), "7");
    }

    #[test]
    fn token_amount_rejects_zero_and_negative() {
        assert!(matches!(
            TokenAmount::parse(Some(&json!("0"))),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            TokenAmount::parse(Some(&json!("000"))),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            TokenAmount::parse(Some(&json!(-5))),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn token_amount_rejects_garbage() {
        for value in [json!("invalid"), json!(""), json!(1.5), json!(null), json!({})] {
            let err = TokenAmount::parse(Some(&value)).unwrap_err();
            assert!(err.to_string().starts_with("Invalid amount"), "{err}");
        }
        assert!(TokenAmount::parse(None).is_err());
    }

    #[test]
    fn token_amount_serializes_as_string() {
        let amount = TokenAmount::parse(Some(&json!("1000"))).unwrap();
        assert_eq!(serde_json::to_value(&amount).unwrap(), json!("1000"));
    }

    #[test]
    fn call_arg_serde_shape() {
        let arg = CallArg::Object("0xcap".to_string());
        let value = serde_json::to_value(&arg).unwrap();
        assert_eq!(value, json!({"kind": "object", "value": "0xcap"}));

        let arg = CallArg::Pure(json!("0xabc"));
        let value = serde_json::to_value(&arg).unwrap();
        assert_eq!(value, json!({"kind": "pure", "value": "0xabc"}));
    }

    #[test]
    fn chain_transaction_serde_shape() {
        let txn = ChainTransaction {
            calls: vec![MoveCall {
                target: "0xpkg::managed_token::mint".to_string(),
                arguments: vec![CallArg::Object("0xcap".to_string())],
            }],
            gas_budget: 10_000_000,
        };
        let value = serde_json::to_value(&txn).unwrap();
        assert_eq!(value["gasBudget"], 10_000_000);
        assert_eq!(value["calls"][0]["target"], "0xpkg::managed_token::mint");
    }
}
