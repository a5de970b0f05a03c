// ABOUTME: Docker credential helper protocol client.
// ABOUTME: Runs docker-credential-<name> get with the server URL on stdin.

use super::AuthError;
use crate::types::RegistryAuth;
use serde::Deserialize;
use std::io::Write;
use std::process::{Command, Stdio};

/// Username helpers return when the secret is an identity token.
const TOKEN_USERNAME: &str = "<token>";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HelperResponse {
    username: String,
    secret: String,
}

/// Ask a credential helper for the credentials of `server`.
///
/// Returns `Ok(None)` when the helper has no entry for the server.
pub(super) fn get(helper: &str, server: &str) -> Result<Option<RegistryAuth>, AuthError> {
    let program = format!("docker-credential-{}", helper);
    let fail = |reason: String| AuthError::Helper {
        helper: program.clone(),
        host: server.to_string(),
        reason,
    };

    let mut child = Command::new(&program)
        .arg("get")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| fail(e.to_string()))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(server.as_bytes())
            .map_err(|e| fail(e.to_string()))?;
    }

    let output = child.wait_with_output().map_err(|e| fail(e.to_string()))?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stdout.contains("credentials not found") || stderr.contains("credentials not found") {
            return Ok(None);
        }
        return Err(fail(format!("{} {}", stdout.trim(), stderr.trim())));
    }

    parse_response(&stdout, server).map_err(fail)
}

fn parse_response(stdout: &str, server: &str) -> Result<Option<RegistryAuth>, String> {
    let response: HelperResponse =
        serde_json::from_str(stdout).map_err(|e| format!("invalid helper output: {}", e))?;

    if response.secret.is_empty() {
        return Ok(None);
    }

    let auth = if response.username == TOKEN_USERNAME {
        RegistryAuth {
            server: Some(server.to_string()),
            identity_token: Some(response.secret),
            ..Default::default()
        }
    } else {
        RegistryAuth {
            username: response.username,
            password: response.secret,
            server: Some(server.to_string()),
            identity_token: None,
        }
    };
    Ok(Some(auth))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_username_and_secret() {
        let out = r#"{"ServerURL":"quay.io","Username":"robot","Secret":"pw"}"#;
        let auth = parse_response(out, "quay.io").unwrap().unwrap();
        assert_eq!(auth.username, "robot");
        assert_eq!(auth.password, "pw");
        assert_eq!(auth.server.as_deref(), Some("quay.io"));
    }

    #[test]
    fn token_username_becomes_identity_token() {
        let out = r#"{"ServerURL":"ghcr.io","Username":"<token>","Secret":"abc"}"#;
        let auth = parse_response(out, "ghcr.io").unwrap().unwrap();
        assert!(auth.username.is_empty());
        assert_eq!(auth.identity_token.as_deref(), Some("abc"));
    }

    #[test]
    fn empty_secret_means_no_credentials() {
        let out = r#"{"ServerURL":"ghcr.io","Username":"","Secret":""}"#;
        assert!(parse_response(out, "ghcr.io").unwrap().is_none());
    }

    #[test]
    fn missing_helper_binary_is_an_error() {
        let err = get("sinker-test-no-such-helper", "quay.io").unwrap_err();
        assert!(matches!(err, AuthError::Helper { .. }));
    }
}
