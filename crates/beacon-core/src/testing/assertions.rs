//! Test assertion macros and helpers.

use crate::error::BeaconError;

/// Assert that a result is Ok.
///
/// # Example
///
/// ```ignore
/// assert_ok!(client.register(true).await);
/// assert_ok!(result, "registration should succeed");
/// ```
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match &$expr {
            Ok(_) => (),
            Err(e) => panic!("assertion failed: expected Ok, got Err({:?})", e),
        }
    };
    ($expr:expr, $($arg:tt)+) => {
        match &$expr {
            Ok(_) => (),
            Err(e) => panic!("assertion failed: {}: expected Ok, got Err({:?})", format_args!($($arg)+), e),
        }
    };
}

/// Assert that an error matches a specific variant.
///
/// # Example
///
/// ```ignore
/// assert_err_variant!(result, BeaconError::Protocol { status: 500, .. });
/// ```
#[macro_export]
macro_rules! assert_err_variant {
    ($expr:expr, $variant:pat) => {
        match &$expr {
            Err($variant) => (),
            Err(e) => panic!(
                "assertion failed: expected {}, got {:?}",
                stringify!($variant),
                e
            ),
            Ok(v) => panic!(
                "assertion failed: expected Err({}), got Ok({:?})",
                stringify!($variant),
                v
            ),
        }
    };
}

/// Assert that an HTTP call was made on a mock transport.
#[macro_export]
macro_rules! assert_http_called {
    ($mock:expr, $pattern:expr) => {
        $mock.assert_called($pattern);
    };
}

/// Assert that an HTTP call was not made on a mock transport.
#[macro_export]
macro_rules! assert_http_not_called {
    ($mock:expr, $pattern:expr) => {
        $mock.assert_not_called($pattern);
    };
}

/// Check if an error message contains a substring.
pub fn error_contains(error: &BeaconError, substring: &str) -> bool {
    error.to_string().contains(substring)
}

/// Partial JSON match: the pattern only lists the fields to verify.
pub fn json_matches(actual: &serde_json::Value, pattern: &serde_json::Value) -> bool {
    match (actual, pattern) {
        (serde_json::Value::Object(a), serde_json::Value::Object(p)) => p
            .iter()
            .all(|(key, expected)| a.get(key).is_some_and(|v| json_matches(v, expected))),
        (serde_json::Value::Array(a), serde_json::Value::Array(p)) => {
            a.len() == p.len() && a.iter().zip(p.iter()).all(|(a, p)| json_matches(a, p))
        }
        (a, p) => a == p,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_ok_macro() {
        let result: Result<i32, String> = Ok(42);
        assert_ok!(result);
    }

    #[test]
    #[should_panic(expected = "expected Ok")]
    fn test_assert_ok_macro_fails() {
        let result: Result<i32, String> = Err("error".to_string());
        assert_ok!(result);
    }

    #[test]
    fn test_assert_err_variant_macro() {
        let result: Result<(), BeaconError> = Err(BeaconError::Protocol {
            status: 500,
            context: "registering".into(),
            body: "down".into(),
        });
        assert_err_variant!(result, BeaconError::Protocol { status: 500, .. });
    }

    #[test]
    fn test_error_contains() {
        let error = BeaconError::Config("client.serviceUrls is empty".to_string());
        assert!(error_contains(&error, "serviceUrls"));
        assert!(!error_contains(&error, "pollInterval"));
    }

    #[test]
    fn test_json_matches() {
        let actual = serde_json::json!({
            "instance": {"app": "svc", "status": "UP", "port": {"$": 8080}}
        });

        assert!(json_matches(
            &actual,
            &serde_json::json!({"instance": {"status": "UP"}})
        ));
        assert!(json_matches(
            &actual,
            &serde_json::json!({"instance": {"port": {"$": 8080}}})
        ));
        assert!(!json_matches(
            &actual,
            &serde_json::json!({"instance": {"status": "DOWN"}})
        ));
        assert!(!json_matches(&actual, &serde_json::json!({"missing": true})));
    }
}
