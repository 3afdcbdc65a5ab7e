//! Iterative reference resolution.
//!
//! Each call walks references with an explicit frame stack instead of recursion. The active set
//! is the stack itself; the memo holds values already resolved during this call. Nothing is shared
//! between calls.

use crate::error::ResolveError;
use crate::reference::{Segment, alias_target, split_references};
use crate::token::Token;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resolution {
    pub value: String,
    pub chain: Vec<String>,
}

struct Frame<'a> {
    path: &'a str,
    segments: Vec<Segment<'a>>,
    next: usize,
    out: String,
}

impl<'a> Frame<'a> {
    fn new(path: &'a str, raw: &'a str) -> Self {
        Self {
            path,
            segments: split_references(raw),
            next: 0,
            out: String::with_capacity(raw.len()),
        }
    }
}

/// Resolve `path`, which must exist in `tokens`.
pub(crate) fn resolve<'a>(
    tokens: &'a BTreeMap<String, Token>,
    path: &'a str,
    raw: &'a str,
) -> Result<Resolution, ResolveError> {
    resolve_within(tokens, path, raw, tokens.len())
}

/// [`resolve`] allowing at most `limit` nested references.
///
/// Frames on the stack are distinct paths, so with `limit = tokens.len()` a cycle is always
/// reported before the limit; smaller limits bound the walk directly.
pub(crate) fn resolve_within<'a>(
    tokens: &'a BTreeMap<String, Token>,
    path: &'a str,
    raw: &'a str,
    limit: usize,
) -> Result<Resolution, ResolveError> {
    let mut chain: Vec<String> = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut memo: HashMap<&str, String> = HashMap::new();
    let mut stack = vec![Frame::new(path, raw)];
    let mut resolved = String::new();

    while let Some(top) = stack.len().checked_sub(1) {
        let Some(segment) = stack[top].segments.get(stack[top].next).copied() else {
            let Some(done) = stack.pop() else { break };
            match stack.last_mut() {
                Some(parent) => {
                    parent.out.push_str(&done.out);
                    memo.insert(done.path, done.out);
                }
                None => resolved = done.out,
            }
            continue;
        };
        stack[top].next += 1;

        let target = match segment {
            Segment::Literal(text) => {
                stack[top].out.push_str(text);
                continue;
            }
            Segment::Reference(target) => target,
        };

        if let Some(value) = memo.get(target) {
            stack[top].out.push_str(value);
            continue;
        }

        if let Some(pos) = stack.iter().position(|frame| frame.path == target) {
            let mut cycle: Vec<String> = stack[pos..]
                .iter()
                .map(|frame| frame.path.to_string())
                .collect();
            cycle.push(target.to_string());
            return Err(ResolveError::CircularReference {
                path: path.to_string(),
                cycle,
            });
        }

        let Some((key, token)) = tokens.get_key_value(target) else {
            return Err(ResolveError::UnresolvedReference {
                path: stack[top].path.to_string(),
                reference: target.to_string(),
            });
        };

        if stack.len() > limit {
            return Err(ResolveError::DepthExceeded {
                path: path.to_string(),
                limit,
            });
        }

        if visited.insert(key.as_str()) {
            chain.push(key.clone());
        }
        stack.push(Frame::new(key.as_str(), token.value.as_str()));
    }

    Ok(Resolution {
        value: resolved,
        chain,
    })
}

/// The declared type of `path`, or for pure aliases the first declared type along the alias
/// chain.
pub(crate) fn effective_type<'a>(
    tokens: &'a BTreeMap<String, Token>,
    path: &str,
) -> Option<&'a str> {
    let mut current = tokens.get(path)?;
    for _ in 0..=tokens.len() {
        if let Some(token_type) = current.token_type.as_deref() {
            return Some(token_type);
        }
        current = tokens.get(alias_target(&current.value)?)?;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(pairs: &[(&str, &str)]) -> BTreeMap<String, Token> {
        pairs
            .iter()
            .map(|(p, v)| (p.to_string(), Token::new(*v)))
            .collect()
    }

    fn run(tokens: &BTreeMap<String, Token>, path: &str) -> Result<Resolution, ResolveError> {
        let raw = tokens[path].value.as_str();
        resolve(tokens, path, raw)
    }

    #[test]
    fn literal_resolves_to_itself() {
        let t = tokens(&[("a", "#fff")]);
        assert_eq!(
            run(&t, "a").unwrap(),
            Resolution {
                value: "#fff".to_string(),
                chain: vec![]
            }
        );
    }

    #[test]
    fn chain_records_visit_order() {
        let t = tokens(&[("a", "{b}"), ("b", "{c}"), ("c", "4px")]);
        let r = run(&t, "a").unwrap();
        assert_eq!(r.value, "4px");
        assert_eq!(r.chain, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn embedded_references_substitute_every_occurrence() {
        let t = tokens(&[
            ("shadow", "0 {y} {blur} {color}"),
            ("y", "{unit}"),
            ("blur", "{unit}"),
            ("unit", "2px"),
            ("color", "#000"),
        ]);
        let r = run(&t, "shadow").unwrap();
        assert_eq!(r.value, "0 2px 2px #000");
        assert_eq!(
            r.chain,
            vec![
                "y".to_string(),
                "unit".to_string(),
                "blur".to_string(),
                "color".to_string()
            ]
        );
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let t = tokens(&[("top", "{l} {r}"), ("l", "{base}"), ("r", "{base}"), ("base", "1")]);
        let r = run(&t, "top").unwrap();
        assert_eq!(r.value, "1 1");
        assert_eq!(r.chain.iter().filter(|p| *p == "base").count(), 1);
    }

    #[test]
    fn two_node_cycle_names_the_cycle() {
        let t = tokens(&[("a", "{b}"), ("b", "{a}")]);
        let err = run(&t, "a").unwrap_err();
        assert_eq!(
            err,
            ResolveError::CircularReference {
                path: "a".to_string(),
                cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()],
            }
        );
    }

    #[test]
    fn self_reference_is_circular() {
        let t = tokens(&[("a", "x {a}")]);
        assert!(run(&t, "a").unwrap_err().is_circular());
    }

    #[test]
    fn cycle_downstream_is_reported_for_the_caller() {
        let t = tokens(&[("entry", "{a}"), ("a", "{b}"), ("b", "{a}")]);
        match run(&t, "entry").unwrap_err() {
            ResolveError::CircularReference { path, cycle } => {
                assert_eq!(path, "entry");
                assert_eq!(cycle, vec!["a", "b", "a"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_reference_names_the_referencing_token() {
        let t = tokens(&[("a", "{b}"), ("b", "{gone}")]);
        assert_eq!(
            run(&t, "a").unwrap_err(),
            ResolveError::UnresolvedReference {
                path: "b".to_string(),
                reference: "gone".to_string(),
            }
        );
    }

    #[test]
    fn nesting_beyond_limit_is_depth_exceeded() {
        let t = tokens(&[("a", "{b}"), ("b", "{c}"), ("c", "4px")]);
        assert_eq!(resolve_within(&t, "a", "{b}", 2).unwrap().value, "4px");
        assert_eq!(
            resolve_within(&t, "a", "{b}", 1).unwrap_err(),
            ResolveError::DepthExceeded {
                path: "a".to_string(),
                limit: 1
            }
        );
    }

    #[test]
    fn effective_type_follows_aliases() {
        let mut t = tokens(&[("a", "{b}"), ("b", "{c}"), ("c", "#fff")]);
        assert_eq!(effective_type(&t, "a"), None);
        t.get_mut("c").unwrap().token_type = Some("color".to_string());
        assert_eq!(effective_type(&t, "a"), Some("color"));
        t.get_mut("b").unwrap().token_type = Some("alias".to_string());
        assert_eq!(effective_type(&t, "a"), Some("alias"));
    }

    #[test]
    fn effective_type_terminates_on_alias_cycles() {
        let t = tokens(&[("a", "{b}"), ("b", "{a}")]);
        assert_eq!(effective_type(&t, "a"), None);
    }
}
