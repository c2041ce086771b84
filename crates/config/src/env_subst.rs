/// Replace `${ENV_VAR}` and `${ENV_VAR:-default}` placeholders in config text.
///
/// Unresolvable variables without a default are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// [`substitute_env`] with an injected variable lookup.
pub(crate) fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 2..];
        let Some(close) = tail.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let placeholder = &rest[open..open + close + 3];
        let body = &tail[..close];
        let (name, default) = body
            .split_once(":-")
            .map_or((body, None), |(name, default)| (name, Some(default)));

        let value = if name.is_empty() {
            None
        } else {
            lookup(name).or_else(|| default.map(str::to_string))
        };
        out.push_str(value.as_deref().unwrap_or(placeholder));
        rest = &tail[close + 1..];
    }

    out.push_str(rest);
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "QUIRE_TEST_VAR" => Some("hello".to_string()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("key=${QUIRE_TEST_VAR}", lookup),
            "key=hello"
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${QUIRE_NONEXISTENT_XYZ}", lookup),
            "${QUIRE_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn falls_back_to_default() {
        assert_eq!(
            substitute_env_with("policy=${QUIRE_POLICY:-permissive}", lookup),
            "policy=permissive"
        );
        assert_eq!(
            substitute_env_with("${QUIRE_TEST_VAR:-ignored}", lookup),
            "hello"
        );
    }

    #[test]
    fn malformed_placeholders_are_literal() {
        assert_eq!(substitute_env_with("a ${unterminated", lookup), "a ${unterminated");
        assert_eq!(substitute_env_with("${}", lookup), "${}");
    }

    #[test]
    fn substitutes_several_in_one_line() {
        assert_eq!(
            substitute_env_with("${QUIRE_TEST_VAR}-${MISSING:-x}-${QUIRE_TEST_VAR}", lookup),
            "hello-x-hello"
        );
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text $ sign"), "plain text $ sign");
    }
}
