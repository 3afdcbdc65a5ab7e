//! Deterministic fix request ids.

use serde_json::Value;
use sha2::{Digest, Sha256};
use tokenfix_types::fix::FixRequest;
use uuid::Uuid;

const NAMESPACE: Uuid = Uuid::from_bytes([
    0x7a, 0x1f, 0x0c, 0x93, 0x5e, 0x22, 0x4b, 0x61, 0x9d, 0x04, 0xb8, 0x3e, 0x6a, 0x17, 0xc2,
    0x55,
]);

/// v5(namespace, `type|target|locator|sha256(payload)`). The same suggestion made in two
/// passes gets the same id.
pub fn fix_request_id(fix: &FixRequest) -> Uuid {
    let stable_key = format!(
        "{}|{}|{}|{}",
        fix.fix_type,
        fix.target,
        fix.issue.locator,
        payload_fingerprint(fix)
    );
    Uuid::new_v5(&NAMESPACE, stable_key.as_bytes())
}

fn payload_fingerprint(fix: &FixRequest) -> String {
    let value = serde_json::to_value(&fix.fix).unwrap_or(Value::Null);
    let s = serde_json::to_string(&canonicalize_json(&value)).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}

/// Object keys sorted at every level.
pub fn canonicalize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                if let Some(v) = map.get(&k) {
                    out.insert(k, canonicalize_json(v));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize_json).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokenfix_types::fix::FixPayload;
    use tokenfix_types::issue::{Issue, Locator, Severity};

    fn request(args: Value) -> FixRequest {
        FixRequest::new(
            "aria.set_attribute",
            "markup",
            Issue::new("markup", "x", Severity::Error, Locator::element("#a"), "m"),
            FixPayload::Transform {
                rule_id: "set_attribute".to_string(),
                args: Some(args),
            },
            "d",
        )
    }

    #[test]
    fn id_ignores_key_order_and_timestamps() {
        let a = request(json!({ "name": "alt", "value": "" }));
        let b = request(json!({ "value": "", "name": "alt" }));
        assert_eq!(fix_request_id(&a), fix_request_id(&b));
    }

    #[test]
    fn id_changes_with_payload() {
        let a = request(json!({ "name": "alt", "value": "" }));
        let b = request(json!({ "name": "alt", "value": "logo" }));
        assert_ne!(fix_request_id(&a), fix_request_id(&b));
    }

    #[test]
    fn id_changes_with_target() {
        let a = request(json!({}));
        let mut b = a.clone();
        b.target = "tokens".to_string();
        assert_ne!(fix_request_id(&a), fix_request_id(&b));
    }
}
