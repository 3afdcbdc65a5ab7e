//! `{dot.path}` reference syntax.

/// A piece of a raw token value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// Path inside `{...}`, without the braces.
    Reference(&'a str),
}

/// A path is one or more non-empty segments of ASCII alphanumerics, `-` or `_`, joined by `.`.
pub fn is_valid_path(path: &str) -> bool {
    !path.is_empty()
        && path.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

/// Split a raw value into literal text and references.
///
/// Braces whose content is not a well-formed path stay literal text.
pub fn split_references(value: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(open) = value[cursor..].find('{').map(|i| cursor + i) {
        let Some(close) = value[open + 1..].find('}').map(|i| open + 1 + i) else {
            break;
        };
        let inner = &value[open + 1..close];
        if is_valid_path(inner) {
            if open > literal_start {
                out.push(Segment::Literal(&value[literal_start..open]));
            }
            out.push(Segment::Reference(inner));
            literal_start = close + 1;
            cursor = close + 1;
        } else {
            cursor = open + 1;
        }
    }

    if literal_start < value.len() {
        out.push(Segment::Literal(&value[literal_start..]));
    }
    out
}

/// Every referenced path in `value`, in order of appearance.
pub fn references(value: &str) -> Vec<&str> {
    split_references(value)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Reference(path) => Some(path),
            Segment::Literal(_) => None,
        })
        .collect()
}

/// The referenced path when the whole value is a single reference.
pub(crate) fn alias_target(value: &str) -> Option<&str> {
    match split_references(value).as_slice() {
        [Segment::Reference(path)] => Some(path),
        _ => None,
    }
}
