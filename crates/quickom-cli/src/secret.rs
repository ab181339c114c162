//! Secret references in configuration values.
//!
//! The API key in `config.toml` may point elsewhere instead of holding the
//! key itself:
//!
//! - `pass::path/in/store` runs `pass show path/in/store` and keeps the first line
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - any other value is used as written

use std::process::Command;

use thiserror::Error;

/// A secret reference that could not be resolved.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("environment variable `{0}` is not set")]
    MissingEnv(String),

    #[error("failed to run `pass show {path}`: {message}")]
    PassUnavailable { path: String, message: String },

    #[error("`pass show {path}` failed: {message}")]
    PassFailed { path: String, message: String },

    #[error("`pass show {0}` produced no output")]
    PassEmpty(String),
}

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, SecretError> {
    if let Some(path) = value.strip_prefix("pass::") {
        resolve_pass(path)
    } else if let Some(var) = value.strip_prefix("env::") {
        std::env::var(var).map_err(|_| SecretError::MissingEnv(var.to_string()))
    } else {
        Ok(value.to_string())
    }
}

/// Returns true if `value` is a reference rather than a literal.
pub fn is_reference(value: &str) -> bool {
    value.starts_with("pass::") || value.starts_with("env::")
}

fn resolve_pass(path: &str) -> Result<String, SecretError> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| SecretError::PassUnavailable {
            path: path.to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SecretError::PassFailed {
            path: path.to_string(),
            message: format!("exit {}: {}", output.status, stderr.trim()),
        });
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .ok_or_else(|| SecretError::PassEmpty(path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_passthrough() {
        assert_eq!(resolve("k3y-literal").unwrap(), "k3y-literal");
        assert_eq!(resolve("").unwrap(), "");
        assert!(!is_reference("k3y-literal"));
    }

    #[test]
    fn env_reference() {
        unsafe {
            std::env::set_var("_QUICKOM_TEST_API_KEY", "from-env");
        }
        assert!(is_reference("env::_QUICKOM_TEST_API_KEY"));
        assert_eq!(resolve("env::_QUICKOM_TEST_API_KEY").unwrap(), "from-env");
        unsafe {
            std::env::remove_var("_QUICKOM_TEST_API_KEY");
        }
    }

    #[test]
    fn missing_env_reference() {
        assert_eq!(
            resolve("env::_QUICKOM_UNSET_VAR_12345"),
            Err(SecretError::MissingEnv("_QUICKOM_UNSET_VAR_12345".into()))
        );
    }

    #[test]
    fn pass_reference_to_unknown_entry_fails() {
        // Fails whether or not `pass` is installed.
        assert!(resolve("pass::quickom/no/such/entry/12345").is_err());
    }
}
