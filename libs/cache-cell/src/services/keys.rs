use std::fmt::Display;

pub const KEY_DELIMITER: &str = ":";

/// Joins `parts` with the key delimiter.
pub fn cache_key<I>(parts: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    parts.into_iter()
        .map(|part| part.to_string())
        .collect::<Vec<_>>()
        .join(KEY_DELIMITER)
}

/// `prefix:part1:part2`
pub fn prefixed_key<I>(prefix: &str, parts: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    let rest = cache_key(parts);
    if rest.is_empty() {
        format!("{}{}", prefix, KEY_DELIMITER)
    } else {
        format!("{}{}{}", prefix, KEY_DELIMITER, rest)
    }
}
