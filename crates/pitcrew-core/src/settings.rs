//! Environment variable resolution helpers

use anyhow::Result;

/// Read a required environment variable, failing with an actionable message.
pub fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => anyhow::bail!("environment variable {name} is not set"),
    }
}

/// Read an environment variable, falling back to `default` when unset or
/// empty.
pub fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_require_env_present() {
        unsafe { std::env::set_var("PITCREW_TEST_REQUIRED", "value") };
        assert_eq!(require_env("PITCREW_TEST_REQUIRED").unwrap(), "value");
        unsafe { std::env::remove_var("PITCREW_TEST_REQUIRED") };
    }

    #[test]
    #[serial]
    fn test_require_env_missing_names_variable() {
        unsafe { std::env::remove_var("PITCREW_TEST_MISSING") };
        let err = require_env("PITCREW_TEST_MISSING").unwrap_err();
        assert!(err.to_string().contains("PITCREW_TEST_MISSING"));
    }

    #[test]
    #[serial]
    fn test_require_env_rejects_blank() {
        unsafe { std::env::set_var("PITCREW_TEST_BLANK", "  ") };
        assert!(require_env("PITCREW_TEST_BLANK").is_err());
        unsafe { std::env::remove_var("PITCREW_TEST_BLANK") };
    }

    #[test]
    #[serial]
    fn test_env_or_default() {
        unsafe { std::env::remove_var("PITCREW_TEST_DEFAULT") };
        assert_eq!(
            env_or("PITCREW_TEST_DEFAULT", "http://localhost:8111"),
            "http://localhost:8111"
        );
    }

    #[test]
    #[serial]
    fn test_env_or_set() {
        unsafe { std::env::set_var("PITCREW_TEST_SET", "http://tc:8111") };
        assert_eq!(env_or("PITCREW_TEST_SET", "fallback"), "http://tc:8111");
        unsafe { std::env::remove_var("PITCREW_TEST_SET") };
    }
}
