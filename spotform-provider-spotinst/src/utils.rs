//! Utility functions for value extraction and conversion

use std::collections::HashMap;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use spotform_core::resource::Value;

static INSTANCE_PROFILE_ARN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws[a-z-]*:iam::[0-9]*:instance-profile/\S+$")
        .expect("instance profile ARN pattern is valid")
});

/// Whether an IAM instance profile reference is an ARN rather than a name
/// e.g., "arn:aws:iam::123456789012:instance-profile/ocean" -> true
pub fn is_instance_profile_arn(s: &str) -> bool {
    INSTANCE_PROFILE_ARN.is_match(s)
}

/// Base64-encode user data unless it already is
pub fn encode_user_data(s: &str) -> String {
    if is_base64_encoded(s) {
        s.to_string()
    } else {
        STANDARD.encode(s)
    }
}

/// Decode base64 user data, returning the input when it is not valid UTF-8 base64
pub fn decode_user_data(s: &str) -> String {
    STANDARD
        .decode(s)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| s.to_string())
}

fn is_base64_encoded(s: &str) -> bool {
    !s.is_empty() && STANDARD.decode(s).is_ok()
}

/// Non-empty string member of a block
pub fn string_attr(block: &HashMap<String, Value>, key: &str) -> Option<String> {
    block
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Positive integer member of a block
pub fn positive_int_attr(block: &HashMap<String, Value>, key: &str) -> Option<i64> {
    block.get(key).and_then(Value::as_int).filter(|v| *v > 0)
}

/// Positive number member of a block
pub fn positive_float_attr(block: &HashMap<String, Value>, key: &str) -> Option<f64> {
    block.get(key).and_then(Value::as_float).filter(|v| *v > 0.0)
}

/// Build a block value from (key, value) pairs
pub fn block(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    Value::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

/// `Value::String` of an optional string, empty when absent
pub fn string_or_empty(s: Option<&String>) -> Value {
    Value::String(s.cloned().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_instance_profile_arn() {
        assert!(is_instance_profile_arn(
            "arn:aws:iam::123456789012:instance-profile/ocean-nodes"
        ));
        assert!(is_instance_profile_arn(
            "arn:aws-us-gov:iam::123456789012:instance-profile/path/ocean"
        ));
        assert!(!is_instance_profile_arn("ocean-nodes"));
        assert!(!is_instance_profile_arn("arn:aws:iam::123456789012:role/ocean"));
    }

    #[test]
    fn test_encode_user_data() {
        assert_eq!(encode_user_data("#!/bin/bash\necho hi"), "IyEvYmluL2Jhc2gKZWNobyBoaQ==");
        // already encoded
        assert_eq!(
            encode_user_data("IyEvYmluL2Jhc2gKZWNobyBoaQ=="),
            "IyEvYmluL2Jhc2gKZWNobyBoaQ=="
        );
    }

    #[test]
    fn test_decode_user_data() {
        assert_eq!(
            decode_user_data("IyEvYmluL2Jhc2gKZWNobyBoaQ=="),
            "#!/bin/bash\necho hi"
        );
        assert_eq!(decode_user_data("not base64!"), "not base64!");
    }

    #[test]
    fn test_block_attrs() {
        let Value::Map(map) = block([
            ("name", Value::from("cpu")),
            ("empty", Value::from("")),
            ("count", Value::Int(0)),
            ("period", Value::Int(300)),
            ("threshold", Value::Float(72.5)),
        ]) else {
            panic!("block must build a map");
        };

        assert_eq!(string_attr(&map, "name").as_deref(), Some("cpu"));
        assert_eq!(string_attr(&map, "empty"), None);
        assert_eq!(string_attr(&map, "missing"), None);
        assert_eq!(positive_int_attr(&map, "count"), None);
        assert_eq!(positive_int_attr(&map, "period"), Some(300));
        assert_eq!(positive_float_attr(&map, "threshold"), Some(72.5));
    }
}
