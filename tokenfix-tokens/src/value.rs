//! Literal value classification.

/// Split a literal like `1.5rem` or `-4px` into its number and unit.
pub fn split_number_unit(value: &str) -> Option<(f64, &str)> {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    let number: f64 = value[..end].parse().ok()?;
    Some((number, &value[end..]))
}

/// Infer a token type from a literal value, or `None` when the value is ambiguous.
pub fn infer_type(value: &str) -> Option<&'static str> {
    let value = value.trim();
    let lower = value.to_ascii_lowercase();

    if is_hex_color(value)
        || ["rgb(", "rgba(", "hsl(", "hsla("]
            .iter()
            .any(|prefix| lower.starts_with(prefix))
    {
        return Some("color");
    }
    if lower.starts_with("cubic-bezier(") {
        return Some("cubicBezier");
    }

    match split_number_unit(&lower)? {
        (_, "px" | "rem" | "em" | "%") => Some("dimension"),
        (_, "ms" | "s") => Some("duration"),
        _ => None,
    }
}

fn is_hex_color(value: &str) -> bool {
    value.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}
