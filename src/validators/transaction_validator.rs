use crate::domain::transaction::SignatureEntry;
use crate::infrastructure::config::Config;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of validating an inbound `POST /tx` deposit. Kept in the teacher's
/// `{valid, errors, warnings}` shape (`validators::transaction_validator`)
/// but re-pointed at the finalizer's record fields instead of RLP-decoded
/// Ethereum transactions.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self { valid: true, errors: Vec::new(), warnings: Vec::new() }
    }

    fn fail(&mut self, msg: impl Into<String>) {
        self.valid = false;
        self.errors.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

const KNOWN_ENCODINGS: &[&str] = &["hex", "base64"];

/// Validates the shape of a deposit before it reaches the Store. Per-chain
/// SDK encoding (stellar XDR well-formedness, EVM RLP structure) is out of
/// scope (spec.md §1) — this only validates the invariants the finalization
/// pipeline itself depends on: CAS-relevant timing, signature uniqueness,
/// and the config-scoped tag sets (`blockchain`, `encoding`).
pub struct TransactionValidator {
    config: Arc<Config>,
}

impl TransactionValidator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn validate_deposit(
        &self,
        hash: &str,
        blockchain: &str,
        payload: &str,
        encoding: &str,
        signatures: &[SignatureEntry],
        min_time: i64,
        max_time: Option<i64>,
    ) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if let Err(e) = Self::validate_hash(hash) {
            result.fail(format!("invalid hash: {e}"));
        }
        if blockchain.trim().is_empty() {
            result.fail("blockchain must not be empty");
        }
        if !self.config.networks.values().any(|_| true) {
            result.warn("no networks configured; submission will fail at dispatch time");
        }
        if payload.trim().is_empty() {
            result.fail("payload must not be empty");
        }
        if !KNOWN_ENCODINGS.contains(&encoding) {
            result.fail(format!("unknown encoding '{encoding}', expected one of {KNOWN_ENCODINGS:?}"));
        } else if let Err(e) = Self::validate_payload_encoding(payload, encoding) {
            result.fail(format!("payload does not match encoding '{encoding}': {e}"));
        }
        if let Err(e) = Self::validate_signatures(signatures) {
            result.fail(format!("invalid signatures: {e}"));
        }
        if let Some(max) = max_time {
            if min_time > max {
                result.fail(format!("minTime ({min_time}) must be <= maxTime ({max})"));
            }
        }

        result
    }

    fn validate_hash(hash: &str) -> Result<(), String> {
        let without_prefix = hash.strip_prefix("0x").unwrap_or(hash);
        if without_prefix.len() != 64 {
            return Err(format!("expected 64 hex chars (32 bytes), got {}", without_prefix.len()));
        }
        hex::decode(without_prefix).map(|_| ()).map_err(|e| e.to_string())
    }

    fn validate_payload_encoding(payload: &str, encoding: &str) -> Result<(), String> {
        match encoding {
            "hex" => {
                let stripped = payload.strip_prefix("0x").unwrap_or(payload);
                if stripped.is_empty() || stripped.len() % 2 != 0 {
                    return Err("hex payload must be non-empty and even-length".into());
                }
                hex::decode(stripped).map(|_| ()).map_err(|e| e.to_string())
            }
            "base64" => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD
                    .decode(payload)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            }
            _ => Err(format!("unsupported encoding '{encoding}'")),
        }
    }

    fn validate_signatures(signatures: &[SignatureEntry]) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for sig in signatures {
            if sig.key.trim().is_empty() {
                return Err("signature key must not be empty".into());
            }
            if sig.signature.trim().is_empty() {
                return Err(format!("signature for key '{}' must not be empty", sig.key));
            }
            if !seen.insert(sig.key.as_str()) {
                return Err(format!("duplicate signature key '{}'", sig.key));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> TransactionValidator {
        TransactionValidator::new(Arc::new(Config::default()))
    }

    #[test]
    fn accepts_well_formed_deposit() {
        let v = validator();
        let result = v.validate_deposit(
            "a3f1b2c3d4e5f60718293a4b5c6d7e8f900112233445566778899aabbccddee",
            "stellar",
            "AAAAAgAAAAA=",
            "base64",
            &[SignatureEntry { key: "signer1".into(), signature: "deadbeef".into() }],
            0,
            Some(1_000),
        );
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn rejects_short_hash() {
        let v = validator();
        let result = v.validate_deposit("abcd", "stellar", "AAAA", "base64", &[], 0, None);
        assert!(!result.valid);
    }

    #[test]
    fn rejects_min_time_after_max_time() {
        let v = validator();
        let result = v.validate_deposit(
            "a3f1b2c3d4e5f60718293a4b5c6d7e8f900112233445566778899aabbccddee",
            "stellar",
            "AAAA",
            "base64",
            &[],
            500,
            Some(100),
        );
        assert!(!result.valid);
    }

    #[test]
    fn rejects_duplicate_signature_keys() {
        let v = validator();
        let result = v.validate_deposit(
            "a3f1b2c3d4e5f60718293a4b5c6d7e8f900112233445566778899aabbccddee",
            "stellar",
            "AAAA",
            "base64",
            &[
                SignatureEntry { key: "a".into(), signature: "s1".into() },
                SignatureEntry { key: "a".into(), signature: "s2".into() },
            ],
            0,
            None,
        );
        assert!(!result.valid);
    }
}
