// ABOUTME: Integration tests for Docker and Podman credential file lookup.
// ABOUTME: Uses temporary config files, environment overrides, and fake credential helpers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sinker::auth::{AuthError, AuthProvider, DockerConfigAuth};
use sinker::types::RegistryAuth;
use std::fs;
use std::path::{Path, PathBuf};

fn write_config(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, json).unwrap();
    path
}

fn basic(user: &str, password: &str) -> String {
    STANDARD.encode(format!("{user}:{password}"))
}

fn resolve(provider: &DockerConfigAuth, host: &str) -> Option<RegistryAuth> {
    provider.resolve(host).unwrap().decode().unwrap()
}

#[test]
fn unknown_host_is_anonymous() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "config.json",
        &format!(r#"{{"auths": {{"quay.io": {{"auth": "{}"}}}}}}"#, basic("a", "b")),
    );
    let provider = DockerConfigAuth::with_paths(vec![config]);

    assert!(provider.resolve("ghcr.io").unwrap().is_anonymous());
}

#[test]
fn missing_files_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let provider = DockerConfigAuth::with_paths(vec![dir.path().join("absent.json")]);

    assert!(provider.resolve("quay.io").unwrap().is_anonymous());
}

#[test]
fn reads_basic_auth_entry() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "config.json",
        &format!(
            r#"{{"auths": {{"https://quay.io": {{"auth": "{}"}}}}}}"#,
            basic("robot", "s3cret")
        ),
    );
    let provider = DockerConfigAuth::with_paths(vec![config]);

    let auth = resolve(&provider, "quay.io").unwrap();
    assert_eq!(auth.username, "robot");
    assert_eq!(auth.password, "s3cret");
    assert_eq!(auth.server.as_deref(), Some("quay.io"));
}

#[test]
fn docker_hub_key_matches_implicit_registry() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "config.json",
        &format!(
            r#"{{"auths": {{"https://index.docker.io/v1/": {{"auth": "{}"}}}}}}"#,
            basic("hub", "pass")
        ),
    );
    let provider = DockerConfigAuth::with_paths(vec![config]);

    let auth = resolve(&provider, "docker.io").unwrap();
    assert_eq!(auth.username, "hub");
}

#[test]
fn identity_token_is_forwarded() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "config.json",
        r#"{"auths": {"registry.example.com": {"identitytoken": "refresh-token"}}}"#,
    );
    let provider = DockerConfigAuth::with_paths(vec![config]);

    let auth = resolve(&provider, "registry.example.com").unwrap();
    assert_eq!(auth.identity_token.as_deref(), Some("refresh-token"));
}

#[test]
fn podman_file_overrides_docker_file() {
    let dir = tempfile::tempdir().unwrap();
    let docker = write_config(
        dir.path(),
        "config.json",
        &format!(r#"{{"auths": {{"quay.io": {{"auth": "{}"}}}}}}"#, basic("docker", "x")),
    );
    let podman = write_config(
        dir.path(),
        "auth.json",
        &format!(r#"{{"auths": {{"quay.io": {{"auth": "{}"}}}}}}"#, basic("podman", "y")),
    );
    let provider = DockerConfigAuth::with_paths(vec![docker, podman]);

    assert_eq!(resolve(&provider, "quay.io").unwrap().username, "podman");
}

#[test]
fn podman_hub_entry_overrides_docker_hub_alias() {
    let dir = tempfile::tempdir().unwrap();
    let docker = write_config(
        dir.path(),
        "config.json",
        &format!(
            r#"{{"auths": {{"https://index.docker.io/v1/": {{"auth": "{}"}}}}}}"#,
            basic("old", "x")
        ),
    );
    let podman = write_config(
        dir.path(),
        "auth.json",
        &format!(r#"{{"auths": {{"docker.io": {{"auth": "{}"}}}}}}"#, basic("new", "y")),
    );
    let provider = DockerConfigAuth::with_paths(vec![docker, podman]);

    for _ in 0..50 {
        assert_eq!(resolve(&provider, "docker.io").unwrap().username, "new");
        assert_eq!(resolve(&provider, "index.docker.io").unwrap().username, "new");
    }
}

#[test]
fn malformed_file_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "config.json", "{ not json");
    let provider = DockerConfigAuth::with_paths(vec![config]);

    let err = provider.resolve("quay.io").unwrap_err();
    assert!(matches!(err, AuthError::Parse { .. }));
}

#[test]
fn undecodable_auth_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "config.json",
        r#"{"auths": {"quay.io": {"auth": "%%%not-base64%%%"}}}"#,
    );
    let provider = DockerConfigAuth::with_paths(vec![config]);

    let err = provider.resolve("quay.io").unwrap_err();
    assert!(matches!(err, AuthError::InvalidEntry { ref host, .. } if host == "quay.io"));
}

#[test]
fn missing_credential_helper_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "config.json",
        r#"{"credHelpers": {"quay.io": "sinker-test-does-not-exist"}}"#,
    );
    let provider = DockerConfigAuth::with_paths(vec![config]);

    let err = provider.resolve("quay.io").unwrap_err();
    assert!(matches!(err, AuthError::Helper { .. }));
    assert!(err.to_string().contains("docker-credential-sinker-test-does-not-exist"));
}

#[test]
fn default_paths_follow_environment() {
    let dir = tempfile::tempdir().unwrap();
    let auth_file = dir.path().join("auth.json");

    temp_env::with_vars(
        [
            ("DOCKER_CONFIG", Some(dir.path().as_os_str())),
            ("REGISTRY_AUTH_FILE", Some(auth_file.as_os_str())),
        ],
        || {
            let provider = DockerConfigAuth::new();
            assert_eq!(
                provider.paths(),
                &[dir.path().join("config.json"), auth_file.clone()]
            );
        },
    );
}

#[cfg(unix)]
mod helpers {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Install `docker-credential-<name>` printing `body` and exiting with `code`.
    fn install_helper(dir: &Path, name: &str, body: &str, code: i32) {
        let path = dir.join(format!("docker-credential-{name}"));
        let script = format!("#!/bin/sh\ncat > /dev/null\necho '{body}'\nexit {code}\n");
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn path_with(dir: &Path) -> String {
        let current = std::env::var("PATH").unwrap_or_default();
        format!("{}:{}", dir.display(), current)
    }

    #[test]
    fn per_host_helper_supplies_credentials() {
        let dir = tempfile::tempdir().unwrap();
        install_helper(
            dir.path(),
            "sinkertest",
            r#"{"ServerURL":"quay.io","Username":"helper-user","Secret":"helper-pass"}"#,
            0,
        );
        let config = write_config(
            dir.path(),
            "config.json",
            r#"{"credHelpers": {"quay.io": "sinkertest"}}"#,
        );
        let provider = DockerConfigAuth::with_paths(vec![config]);

        temp_env::with_var("PATH", Some(path_with(dir.path())), || {
            let auth = resolve(&provider, "quay.io").unwrap();
            assert_eq!(auth.username, "helper-user");
            assert_eq!(auth.password, "helper-pass");
        });
    }

    #[test]
    fn token_username_becomes_identity_token() {
        let dir = tempfile::tempdir().unwrap();
        install_helper(
            dir.path(),
            "sinkertoken",
            r#"{"ServerURL":"ghcr.io","Username":"<token>","Secret":"refresh"}"#,
            0,
        );
        let config = write_config(dir.path(), "config.json", r#"{"credsStore": "sinkertoken"}"#);
        let provider = DockerConfigAuth::with_paths(vec![config]);

        temp_env::with_var("PATH", Some(path_with(dir.path())), || {
            let auth = resolve(&provider, "ghcr.io").unwrap();
            assert_eq!(auth.identity_token.as_deref(), Some("refresh"));
            assert!(auth.username.is_empty());
        });
    }

    #[test]
    fn helper_without_entry_falls_back_to_auths() {
        let dir = tempfile::tempdir().unwrap();
        install_helper(dir.path(), "sinkerempty", "credentials not found in native keychain", 1);
        let config = write_config(
            dir.path(),
            "config.json",
            &format!(
                r#"{{"credsStore": "sinkerempty", "auths": {{"quay.io": {{"auth": "{}"}}}}}}"#,
                basic("stored", "pw")
            ),
        );
        let provider = DockerConfigAuth::with_paths(vec![config]);

        temp_env::with_var("PATH", Some(path_with(dir.path())), || {
            assert_eq!(resolve(&provider, "quay.io").unwrap().username, "stored");
        });
    }
}
