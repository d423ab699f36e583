// OAuth 1.0a with PLAINTEXT signatures, the only method Launchpad needs for
// desktop clients. The handshake runs once, when no credential is cached.

use crate::config::Config;
use crate::credential::Credential;
use crate::error::LpError;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

pub const REALM: &str = "https://api.launchpad.net/";

const NOT_REVIEWED: &str = "Request token has not yet been reviewed. Try again later.";
const REFUSED: &str = "End-user refused to authorize request token.";

/// Run the whole handshake: request token, user authorization, access token.
pub fn handshake(config: &Config, prompt: impl FnOnce(&str)) -> Result<Credential> {
    let client = Client::builder()
        .timeout(config.timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let request = request_token(&client, config)?;
    prompt(&authorize_url(config, &request.token));
    access_token(&client, config, &request)
}

/// First leg: trade the consumer key for an unauthorized request token.
pub fn request_token(client: &Client, config: &Config) -> Result<Credential> {
    let url = format!("{}+request-token", config.web_base);
    let res = client
        .post(&url)
        .form(&[
            ("oauth_consumer_key", config.consumer_key.as_str()),
            ("oauth_signature_method", "PLAINTEXT"),
            ("oauth_signature", "&"),
        ])
        .send()
        .context("Failed to send request-token request")?;
    let status = res.status();
    let body = res.text().context("Failed to read request-token response")?;
    debug!("{}", body);
    if !status.is_success() {
        return Err(LpError::Http { status, body, hint: None }.into());
    }
    let (token, secret) = parse_token_response(&body)?;
    Ok(Credential {
        key: config.consumer_key.clone(),
        token,
        secret,
    })
}

/// Page the user must visit to approve `token`. System-wide consumers ask for
/// desktop integration so one token serves every application on the machine.
pub fn authorize_url(config: &Config, token: &str) -> String {
    let mut url = format!("{}+authorize-token?oauth_token={}", config.web_base, token);
    if config.consumer_key.starts_with("System-wide: ") {
        url.push_str("&allow_permission=DESKTOP_INTEGRATION");
    }
    url
}

/// Last leg: poll until the user has reviewed the request token. Retries at
/// a fixed `poll_interval` for as long as Launchpad says "not yet reviewed".
pub fn access_token(client: &Client, config: &Config, request: &Credential) -> Result<Credential> {
    let url = format!("{}+access-token", config.web_base);
    let signature = format!("&{}", request.secret);
    loop {
        thread::sleep(config.poll_interval);
        let res = client
            .post(&url)
            .form(&[
                ("oauth_token", request.token.as_str()),
                ("oauth_consumer_key", request.key.as_str()),
                ("oauth_signature_method", "PLAINTEXT"),
                ("oauth_signature", signature.as_str()),
            ])
            .send()
            .context("Failed to send access-token request")?;
        let status = res.status();
        let body = res.text().context("Failed to read access-token response")?;
        match body.as_str() {
            NOT_REVIEWED => {
                debug!("request token not reviewed yet");
                continue;
            }
            REFUSED => return Err(LpError::Refused(body).into()),
            _ => {}
        }
        debug!("{}", body);
        if !status.is_success() {
            return Err(LpError::Http { status, body, hint: None }.into());
        }
        let (token, secret) = parse_token_response(&body)?;
        return Ok(Credential {
            key: request.key.clone(),
            token,
            secret,
        });
    }
}

fn parse_token_response(body: &str) -> Result<(String, String)> {
    let mut token = None;
    let mut secret = None;
    for (name, value) in url::form_urlencoded::parse(body.as_bytes()) {
        match name.as_ref() {
            "oauth_token" if token.is_none() => token = Some(value.into_owned()),
            "oauth_token_secret" if secret.is_none() => secret = Some(value.into_owned()),
            _ => {}
        }
    }
    let token = token.ok_or(LpError::MissingField("oauth_token"))?;
    let secret = secret.ok_or(LpError::MissingField("oauth_token_secret"))?;
    Ok((token, secret))
}

/// `Authorization` header value for one request. The nonce is the timestamp.
pub fn authorization_header(credential: &Credential, timestamp: u64) -> String {
    format!(
        "OAuth realm=\"{REALM}\", oauth_consumer_key=\"{}\", oauth_token=\"{}\", oauth_signature=\"&{}\", oauth_nonce=\"{timestamp}\", oauth_signature_method=\"PLAINTEXT\", oauth_timestamp=\"{timestamp}\", oauth_version=\"1.0\"",
        credential.key, credential.token, credential.secret
    )
}

pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
