// Credential store: the OAuth token triple, read from `LAUNCHPAD_TOKEN` or the
// TOML config file, and written there after a fresh handshake.

use crate::config::Config;
use crate::oauth;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Name of the environment variable holding `token:secret:key`.
pub const TOKEN_ENV: &str = "LAUNCHPAD_TOKEN";

/// Absent fields read as empty strings, so a file without a secret fails the
/// same way as one with an empty secret.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credential {
    #[serde(rename = "oauth_consumer_key")]
    pub key: String,
    #[serde(rename = "oauth_token")]
    pub token: String,
    #[serde(rename = "oauth_token_secret")]
    pub secret: String,
}

impl Credential {
    /// Parse the `token:secret:key` form. The consumer key comes last so it
    /// may itself contain `:`.
    pub fn from_env_value(value: &str) -> Result<Self> {
        let mut fields = value.splitn(3, ':');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(token), Some(secret), Some(key)) => Ok(Credential {
                key: key.to_string(),
                token: token.to_string(),
                secret: secret.to_string(),
            }),
            _ => anyhow::bail!("{TOKEN_ENV} must look like 'token:secret:consumer_key'"),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let credential: Credential = toml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        if credential.secret.is_empty() {
            anyhow::bail!("Read {} failed.", path.display());
        }
        debug!(key = %credential.key, token = %credential.token, "found credential");
        Ok(credential)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let data = toml::to_string(self).context("Failed to encode credential")?;
        fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "saved credential");
        Ok(())
    }

    /// Find a credential for this run: the environment value first, then the
    /// config file, and as a last resort the OAuth handshake, whose result is
    /// persisted to `config.conf_path`. `prompt` receives the authorize URL.
    pub fn obtain(config: &Config, env_value: Option<&str>, prompt: impl FnOnce(&str)) -> Result<Self> {
        if let Some(value) = env_value.filter(|v| !v.is_empty()) {
            debug!("using credential from {TOKEN_ENV}");
            return Credential::from_env_value(value);
        }
        if config.conf_path.exists() {
            return Credential::load(&config.conf_path);
        }
        let credential = oauth::handshake(config, prompt)?;
        credential.save(&config.conf_path)?;
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Credential {
        Credential {
            key: "System-wide: lp-api".into(),
            token: "tok".into(),
            secret: "sec".into(),
        }
    }

    #[test]
    fn env_value_fields_are_token_secret_key() {
        let c = Credential::from_env_value("tok:sec:System-wide: lp-api").unwrap();
        assert_eq!(c, sample());
    }

    #[test]
    fn empty_env_fields_give_an_anonymous_credential() {
        let c = Credential::from_env_value("::").unwrap();
        assert_eq!(c, Credential::default());
    }

    #[test]
    fn short_env_value_is_rejected() {
        assert!(Credential::from_env_value("tok:sec").is_err());
        assert!(Credential::from_env_value("").is_err());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("lp-api.toml");
        sample().save(&path).unwrap();
        assert_eq!(Credential::load(&path).unwrap(), sample());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("oauth_consumer_key = \"System-wide: lp-api\""));
        assert!(text.contains("oauth_token_secret = \"sec\""));
    }

    #[test]
    fn load_requires_a_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lp-api.toml");
        fs::write(&path, "oauth_consumer_key = \"k\"\noauth_token = \"t\"\noauth_token_secret = \"\"\n").unwrap();
        let err = Credential::load(&path).unwrap_err();
        assert!(err.to_string().starts_with("Read "));
        assert!(err.to_string().ends_with(" failed."));
    }

    #[test]
    fn load_treats_a_missing_secret_or_empty_file_as_unusable() {
        let dir = tempfile::tempdir().unwrap();

        let no_secret = dir.path().join("no-secret.toml");
        fs::write(&no_secret, "oauth_consumer_key = \"k\"\noauth_token = \"t\"\n").unwrap();
        let err = Credential::load(&no_secret).unwrap_err();
        assert_eq!(err.to_string(), format!("Read {} failed.", no_secret.display()));

        let empty = dir.path().join("empty.toml");
        fs::write(&empty, "").unwrap();
        let err = Credential::load(&empty).unwrap_err();
        assert_eq!(err.to_string(), format!("Read {} failed.", empty.display()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn obtain_runs_the_handshake_and_saves_the_result() {
        use std::time::Duration;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/+request-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("oauth_token=req&oauth_token_secret=reqsecret"),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/+access-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("oauth_token=final&oauth_token_secret=finalsecret"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            conf_path: dir.path().join("config").join("lp-api.toml"),
            web_base: format!("{}/", server.uri()),
            consumer_key: "System-wide: test".into(),
            poll_interval: Duration::from_millis(10),
            ..Config::default()
        };
        assert!(!config.conf_path.exists());

        let expected_url = format!(
            "{}/+authorize-token?oauth_token=req&allow_permission=DESKTOP_INTEGRATION",
            server.uri()
        );
        let conf_path = config.conf_path.clone();
        let (credential, prompted) = tokio::task::spawn_blocking(move || {
            let mut prompted = String::new();
            let credential =
                Credential::obtain(&config, None, |url| prompted = url.to_string()).unwrap();
            (credential, prompted)
        })
        .await
        .unwrap();

        assert_eq!(prompted, expected_url);
        assert!(conf_path.exists());
        let stored = Credential::load(&conf_path).unwrap();
        assert_eq!(stored, credential);
        assert_eq!(stored.key, "System-wide: test");
        assert_eq!(stored.token, "final");
        assert_eq!(stored.secret, "finalsecret");
    }

    #[test]
    fn obtain_prefers_the_environment_over_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            conf_path: dir.path().join("lp-api.toml"),
            ..Config::default()
        };
        sample().save(&config.conf_path).unwrap();

        let from_env = Credential::obtain(&config, Some("a:b:c"), |_| panic!("no prompt")).unwrap();
        assert_eq!(from_env.token, "a");

        let from_file = Credential::obtain(&config, Some(""), |_| panic!("no prompt")).unwrap();
        assert_eq!(from_file, sample());
    }
}
