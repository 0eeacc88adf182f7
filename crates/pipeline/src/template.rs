//! `{placeholder}` substitution for announcement strings.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_]+)\}").expect("placeholder pattern is valid"));

/// Replace every `{name}` with its value from `vars`. Unknown placeholders
/// are left as written.
pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_placeholders() {
        let out = render(
            "{user} reached level **{level}**!",
            &[("user", "<@7>".into()), ("level", "5".into())],
        );
        assert_eq!(out, "<@7> reached level **5**!");
    }

    #[test]
    fn leaves_unknown_placeholders() {
        assert_eq!(render("{user} {nope}", &[("user", "a".into())]), "a {nope}");
    }

    #[test]
    fn repeated_placeholders_all_replaced() {
        assert_eq!(render("{xp}/{xp}", &[("xp", "3".into())]), "3/3");
    }
}
