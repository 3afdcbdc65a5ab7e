//! Property tests for reference resolution.

use proptest::prelude::*;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use tokenfix_tokens::{InMemoryTokenSource, ResolveError, TokenStore};

fn store_from(tokens: Vec<(String, String)>) -> TokenStore {
    let mut map = Map::new();
    for (path, value) in tokens {
        map.insert(path, json!({ "$value": value, "$type": "dimension" }));
    }
    TokenStore::open(InMemoryTokenSource::from_tiers([(
        "primitive",
        Value::Object(map),
    )]))
    .unwrap()
}

/// `t0 -> t1 -> ... -> tn`, where `tn` is a literal.
fn chain(len: usize) -> Vec<(String, String)> {
    (0..=len)
        .map(|i| {
            let value = if i == len {
                "8px".to_string()
            } else {
                format!("{{t{}}}", i + 1)
            };
            (format!("t{i}"), value)
        })
        .collect()
}

proptest! {
    /// An acyclic chain of any length resolves completely with one chain entry per hop.
    #[test]
    fn acyclic_chains_resolve(len in 0usize..64) {
        let store = store_from(chain(len));
        let token = store.get("t0").unwrap().unwrap();

        prop_assert_eq!(token.resolved_value, "8px");
        prop_assert_eq!(token.reference_chain.len(), len);

        let unique: HashSet<&String> = token.reference_chain.iter().collect();
        prop_assert_eq!(unique.len(), len);
        prop_assert!(!token.reference_chain.contains(&"t0".to_string()));
    }

    /// Closing any chain back onto its head is always reported as a cycle.
    #[test]
    fn closed_chains_are_circular(len in 1usize..32, start in 0usize..32) {
        let mut tokens = chain(len);
        tokens[len].1 = "{t0}".to_string();
        let store = store_from(tokens);

        let start = start % (len + 1);
        let err = store.get(&format!("t{start}")).unwrap_err();
        prop_assert!(
            matches!(err, ResolveError::CircularReference { .. }),
            "expected a circular reference, got {:?}",
            err
        );
    }

    /// Two tokens referencing each other fail from either side.
    #[test]
    fn two_node_cycles_fail(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
        prop_assume!(a != b);
        let store = store_from(vec![
            (a.clone(), format!("{{{b}}}")),
            (b.clone(), format!("{{{a}}}")),
        ]);
        prop_assert!(store.get(&a).unwrap_err().is_circular());
        prop_assert!(store.get(&b).unwrap_err().is_circular());
    }

    /// Resolution never changes the stored tree.
    #[test]
    fn reads_are_pure(len in 0usize..16) {
        let store = store_from(chain(len));
        let before = store.fingerprint();
        let _ = store.to_flat_json();
        let _ = store.validate();
        prop_assert_eq!(store.fingerprint(), before);
    }
}
