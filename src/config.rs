// Runtime configuration. Built once from the command line in `cli` and passed
// by reference to the credential store, the handshake and the API client.

use std::path::PathBuf;
use std::time::Duration;

pub const PRODUCTION_API: &str = "https://api.launchpad.net/devel/";
pub const STAGING_API: &str = "https://api.staging.launchpad.net/devel/";
pub const WEB_BASE: &str = "https://launchpad.net/";
pub const DEFAULT_CONSUMER_KEY: &str =
    "System-wide: lp-api (https://github.com/fourdollars/lp-api)";

/// Everything the request path needs to know about where to talk to and how.
#[derive(Clone, Debug)]
pub struct Config {
    /// TOML file holding the cached credential.
    pub conf_path: PathBuf,
    /// OAuth consumer key used when a new token has to be requested.
    pub consumer_key: String,
    /// Base URL relative resources are appended to. Ends with `/`.
    pub api_base: String,
    /// Launchpad web root serving the `+request-token` family of pages.
    pub web_base: String,
    /// Total timeout for API calls. Downloads are not bounded.
    pub timeout: Duration,
    /// Delay before each access-token poll.
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            conf_path: default_conf_path(),
            consumer_key: DEFAULT_CONSUMER_KEY.into(),
            api_base: PRODUCTION_API.into(),
            web_base: WEB_BASE.into(),
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Full URL for a resource given on the command line. Only URLs under a
    /// Launchpad API base are kept as they are, so a production or staging
    /// URL picks its own host. Anything else is a path under `api_base`; the
    /// signed header never leaves for another host or plain http.
    pub fn resolve(&self, resource: &str) -> String {
        if self.is_api_url(resource) {
            resource.to_string()
        } else {
            format!("{}{}", self.api_base, resource.trim_start_matches('/'))
        }
    }

    fn is_api_url(&self, resource: &str) -> bool {
        [PRODUCTION_API, STAGING_API, self.api_base.as_str()]
            .iter()
            .any(|base| resource.starts_with(base))
    }

    /// Request URL for a file link. Web links such as
    /// `https://launchpad.net/bugs/1/+attachment/2/+files/x.log` are served
    /// from the API host under the same path.
    pub fn download_url(&self, file_url: &str) -> String {
        match file_url.strip_prefix(self.web_base.as_str()) {
            Some(rest) => format!("{}{}", self.api_base, rest),
            None => self.resolve(file_url),
        }
    }
}

/// `~/.config/lp-api.toml`, or `./lp-api.toml` when there is no home.
pub fn default_conf_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lp-api.toml")
}

/// Parse a timeout such as `500ms`, `10s`, `2m`, `1h` or a bare number of
/// seconds. Used as a clap value parser.
pub fn parse_timeout(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{text}'"))?;
    let secs = match unit {
        "ms" => return Ok(Duration::from_millis(value)),
        "" | "s" => Some(value),
        "m" => value.checked_mul(60),
        "h" => value.checked_mul(3600),
        _ => return Err(format!("invalid duration unit in '{text}'")),
    };
    secs.map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{text}' is too large"))
}
