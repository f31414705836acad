use crate::error::TimestampError;

/// Parse heterogeneous timestamp text into elapsed seconds.
///
/// Accepted grammars, tried in order:
/// 1. Surrounding parentheses are stripped first: `(4:52:13)`.
/// 2. Colon-delimited with 2 or 3 groups: `H:MM:SS` or `MM:SS`.
///    Fractional values are allowed in any group.
/// 3. A bare decimal number, taken as seconds directly.
///
/// A lone integer with no colon is seconds, not minutes. Negative values are
/// rejected. No upper bound: multi-day recordings are valid.
pub fn parse_timestamp(text: &str) -> Result<f64, TimestampError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::Empty);
    }

    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed)
        .trim();

    if inner.is_empty() {
        return Err(TimestampError::Unrecognized(text.to_string()));
    }

    let seconds = if inner.contains(':') {
        parse_clock(inner).ok_or_else(|| TimestampError::Unrecognized(text.to_string()))?
    } else {
        inner
            .parse::<f64>()
            .map_err(|_| TimestampError::Unrecognized(text.to_string()))?
    };

    if seconds < 0.0 || !seconds.is_finite() {
        return Err(TimestampError::Negative(text.to_string()));
    }

    Ok(seconds)
}

fn parse_clock(text: &str) -> Option<f64> {
    let groups: Vec<f64> = text
        .split(':')
        .map(|g| g.trim().parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;

    if groups.iter().any(|&g| g < 0.0) {
        return None;
    }

    match groups.as_slice() {
        [h, m, s] => Some(h * 3600.0 + m * 60.0 + s),
        [m, s] => Some(m * 60.0 + s),
        _ => None,
    }
}
