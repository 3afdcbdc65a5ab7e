//! Read-only serialisations of the resolved tree.

use crate::error::ResolveError;
use crate::store::TokenStore;
use serde_json::{Map, Value};

impl TokenStore {
    /// CSS custom properties under `:root`, one per token in tree order.
    pub fn to_css(&self) -> Result<String, ResolveError> {
        let mut out = String::from(":root {\n");
        for path in self.paths() {
            let Some(token) = self.get(path)? else {
                continue;
            };
            out.push_str(&format!(
                "  {}: {};\n",
                css_variable(path),
                token.resolved_value
            ));
        }
        out.push_str("}\n");
        Ok(out)
    }

    /// `{ "dot.path": "resolved value" }` for every token.
    pub fn to_flat_json(&self) -> Result<Value, ResolveError> {
        let mut map = Map::new();
        for path in self.paths() {
            if let Some(token) = self.get(path)? {
                map.insert(path.to_string(), Value::String(token.resolved_value));
            }
        }
        Ok(Value::Object(map))
    }
}

/// `color.blue.500` -> `--color-blue-500`.
pub fn css_variable(path: &str) -> String {
    format!("--{}", path.replace('.', "-"))
}

#[cfg(test)]
mod tests {
    use crate::source::InMemoryTokenSource;
    use crate::store::TokenStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store() -> TokenStore {
        TokenStore::open(InMemoryTokenSource::from_tiers([(
            "primitive",
            json!({
                "color": { "$type": "color", "blue": { "500": "#2563eb" }, "primary": "{color.blue.500}" },
                "space": { "$type": "dimension", "sm": "4px", "inset": "{space.sm} {space.sm}" }
            }),
        )]))
        .unwrap()
    }

    #[test]
    fn css_uses_dashed_custom_properties() {
        assert_eq!(
            store().to_css().unwrap(),
            ":root {\n  --color-blue-500: #2563eb;\n  --color-primary: #2563eb;\n  --space-inset: 4px 4px;\n  --space-sm: 4px;\n}\n"
        );
    }

    #[test]
    fn flat_json_holds_resolved_values() {
        assert_eq!(
            store().to_flat_json().unwrap(),
            json!({
                "color.blue.500": "#2563eb",
                "color.primary": "#2563eb",
                "space.inset": "4px 4px",
                "space.sm": "4px"
            })
        );
    }

    #[test]
    fn unresolvable_trees_do_not_export() {
        let mut store = store();
        assert!(store.set("space.sm", "{space.missing}", Default::default()));
        assert!(store.to_css().is_err());
        assert!(store.to_flat_json().is_err());
    }
}
