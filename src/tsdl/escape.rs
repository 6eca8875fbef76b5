//! Escaping rules of the TSDL output.

use super::EmitError;

/// Identifiers readers such as Babeltrace 1.x expect without a prepended
/// underscore. Everything else gets the historical escape treatment.
const SAFE_TSDL_IDENTIFIERS: &[&str] = &[
    "stream_id",
    "packet_size",
    "content_size",
    "id",
    "v",
    "timestamp",
    "events_discarded",
    "packet_seq_num",
    "timestamp_begin",
    "timestamp_end",
    "cpu_id",
    "magic",
    "uuid",
    "stream_instance_id",
];

/// Escapes an arbitrary tracer-supplied name into a TSDL identifier.
///
/// A previous implementation always prepended `_` to side-step TSDL keyword
/// collisions and identifiers starting with a digit. Readers have come to
/// expect that initial underscore, so the rule is frozen: whitelist names
/// pass through, everything else is prefixed with `_` and has every
/// character outside `[A-Za-z0-9_]` replaced by `_`.
pub fn escape_identifier(name: &str) -> Result<String, EmitError> {
    if name.is_empty() {
        return Err(EmitError::InvalidIdentifier);
    }

    if SAFE_TSDL_IDENTIFIERS.contains(&name) {
        return Ok(name.to_string());
    }

    let mut escaped = String::with_capacity(name.len() + 1);
    escaped.push('_');
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            escaped.push(c);
        } else {
            escaped.push('_');
        }
    }

    Ok(escaped)
}

/// Escapes an environment string value for inclusion in a `"…"` literal.
pub fn escape_env_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\n' => escaped.push_str("\\n"),
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn arbitrary_name_is_prefixed_and_substituted() {
        assert_eq!(escape_identifier("my field!").unwrap(), "_my_field_");
    }

    #[test]
    fn safe_identifiers_pass_through() {
        assert_eq!(escape_identifier("uuid").unwrap(), "uuid");
        assert_eq!(escape_identifier("timestamp_begin").unwrap(), "timestamp_begin");
    }

    #[test]
    fn empty_identifier_is_an_error() {
        assert!(matches!(
            escape_identifier(""),
            Err(EmitError::InvalidIdentifier)
        ));
    }

    #[test]
    fn non_ascii_characters_are_substituted() {
        assert_eq!(escape_identifier("héllo").unwrap(), "_h_llo");
    }

    #[test]
    fn env_string_escapes() {
        assert_eq!(escape_env_string("a\nb"), "a\\nb");
        assert_eq!(escape_env_string("a\\b"), "a\\\\b");
        assert_eq!(escape_env_string("say \"hi\""), "say \\\"hi\\\"");
    }

    proptest! {
        #[test]
        fn escaped_identifiers_are_always_lexically_valid(name in ".+") {
            let escaped = escape_identifier(&name).unwrap();
            let passthrough = SAFE_TSDL_IDENTIFIERS.contains(&name.as_str());
            if passthrough {
                prop_assert_eq!(&escaped, &name);
            } else {
                prop_assert!(escaped.starts_with('_'));
            }
            prop_assert!(
                escaped.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            );
        }
    }
}
