use std::sync::LazyLock;

use regex::Regex;

pub const FILTERED: &str = "[FILTERED]";

static ABSOLUTE_PATH: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(^|[\s'"`(\[=:])(/[^\s'"`)\]]+)"#).ok());

/// Replace absolute filesystem paths in `message` with `[FILTERED]`.
///
/// If the pattern cannot be compiled the whole message is withheld.
pub fn redact_paths(message: &str) -> String {
    match ABSOLUTE_PATH.as_ref() {
        Some(re) => re
            .replace_all(message, |caps: &regex::Captures<'_>| {
                format!("{}{}", &caps[1], FILTERED)
            })
            .into_owned(),
        None => String::from(FILTERED),
    }
}
