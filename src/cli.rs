// Command-line surface: flags, verb selection and exit codes.

use crate::api::LaunchpadClient;
use crate::config::{
    default_conf_path, parse_timeout, Config, DEFAULT_CONSUMER_KEY, PRODUCTION_API, STAGING_API,
};
use crate::credential::{Credential, TOKEN_ENV};
use crate::ui;
use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

const USAGE: &str = "Usage: lp-api {get,patch,put,post,delete,download} resource, such as `lp-api get people/+me` or `lp-api get bugs/1`.
\tPlease check https://api.launchpad.net/devel.html for details.";

#[derive(Parser, Debug)]
#[command(name = "lp-api")]
#[command(about = "Launchpad REST API client")]
#[command(version)]
pub struct Cli {
    /// Launchpad API config file [default: ~/.config/lp-api.toml]
    #[arg(long, value_name = "PATH")]
    pub conf: Option<PathBuf>,

    /// Show debug messages
    #[arg(long)]
    pub debug: bool,

    /// OAuth consumer key
    #[arg(long, default_value = DEFAULT_CONSUMER_KEY)]
    pub key: String,

    /// Write the response to this file instead of stdout
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Use the Launchpad staging server
    #[arg(long)]
    pub staging: bool,

    /// API request timeout, e.g. 10s or 500ms
    #[arg(long, default_value = "5s", value_parser = parse_timeout)]
    pub timeout: Duration,

    /// <method> [resource] [key==value | key:=json | key=value | key=@file ...]
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub words: Vec<String>,
}

/// One API call, decoded from the positional words.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Get { resource: String, args: Vec<String> },
    Delete { resource: String, args: Vec<String> },
    Patch { resource: String, args: Vec<String> },
    Put { resource: String, file: PathBuf },
    Post { resource: String, args: Vec<String> },
    Download { url: String },
    /// `.key`: follow the URL under `key` in the JSON read from stdin.
    Pipe { key: String },
}

#[derive(Debug, PartialEq, Eq)]
pub enum Invocation {
    /// No words at all: usage, success.
    Help,
    /// Not enough words: usage, failure.
    Usage,
    Unsupported(String),
    Run(Command),
}

impl Invocation {
    pub fn from_words(words: &[String]) -> Self {
        let Some(method) = words.first() else {
            return Invocation::Help;
        };
        if words.len() == 1 {
            return match method.strip_prefix('.') {
                Some(key) => Invocation::Run(Command::Pipe { key: key.to_string() }),
                None => Invocation::Usage,
            };
        }
        let resource = words[1].clone();
        let args = words[2..].to_vec();
        let command = match method.as_str() {
            "get" => Command::Get { resource, args },
            "delete" => Command::Delete { resource, args },
            "patch" => Command::Patch { resource, args },
            "post" => Command::Post { resource, args },
            "put" => match words.get(2) {
                Some(file) => Command::Put {
                    resource,
                    file: PathBuf::from(file),
                },
                None => return Invocation::Usage,
            },
            "download" => Command::Download { url: resource },
            _ => return Invocation::Unsupported(method.clone()),
        };
        Invocation::Run(command)
    }
}

impl Command {
    /// Run against `lp`. Returns the payload to print, if the verb has one.
    pub fn execute(&self, lp: &LaunchpadClient, download_dir: &Path) -> Result<Option<String>> {
        let payload = match self {
            Command::Get { resource, args } => lp.get(resource, args)?,
            Command::Delete { resource, args } => lp.delete(resource, args)?,
            Command::Patch { resource, args } => lp.patch(resource, args)?,
            Command::Put { resource, file } => lp.put(resource, file)?,
            Command::Post { resource, args } => lp.post(resource, args)?,
            Command::Pipe { key } => lp.pipe(key, std::io::stdin().lock())?,
            Command::Download { url } => {
                lp.download(url, download_dir)?;
                return Ok(None);
            }
        };
        Ok(Some(payload))
    }
}

impl Cli {
    pub fn config(&self) -> Config {
        Config {
            conf_path: self.conf.clone().unwrap_or_else(default_conf_path),
            consumer_key: self.key.clone(),
            api_base: (if self.staging { STAGING_API } else { PRODUCTION_API }).to_string(),
            timeout: self.timeout,
            ..Config::default()
        }
    }

    pub fn run(self) -> Result<ExitCode> {
        let command = match Invocation::from_words(&self.words) {
            Invocation::Help => {
                print_usage();
                return Ok(ExitCode::SUCCESS);
            }
            Invocation::Usage => {
                print_usage();
                return Ok(ExitCode::FAILURE);
            }
            Invocation::Unsupported(method) => {
                println!("'{method}' method is not supported.");
                return Ok(ExitCode::FAILURE);
            }
            Invocation::Run(command) => command,
        };

        let config = self.config();
        let env_token = std::env::var(TOKEN_ENV).ok();
        let credential =
            Credential::obtain(&config, env_token.as_deref(), ui::prompt_authorization)?;
        let lp = LaunchpadClient::new(config, credential)?;

        if let Some(payload) = command.execute(&lp, Path::new("."))? {
            ui::write_output(&payload, self.output.as_deref())?;
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn print_usage() {
    println!("{USAGE}");
    let _ = Cli::command().print_help();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn verbs_take_resource_and_arguments() {
        assert_eq!(
            Invocation::from_words(&words(&["get", "bugs", "ws.op==searchTasks"])),
            Invocation::Run(Command::Get {
                resource: "bugs".into(),
                args: words(&["ws.op==searchTasks"]),
            })
        );
        assert_eq!(
            Invocation::from_words(&words(&["put", "bugs/1", "payload.json"])),
            Invocation::Run(Command::Put {
                resource: "bugs/1".into(),
                file: PathBuf::from("payload.json"),
            })
        );
        assert_eq!(
            Invocation::from_words(&words(&["download", "https://launchpad.net/x/data"])),
            Invocation::Run(Command::Download { url: "https://launchpad.net/x/data".into() })
        );
    }

    #[test]
    fn usage_and_unsupported() {
        assert_eq!(Invocation::from_words(&[]), Invocation::Help);
        assert_eq!(Invocation::from_words(&words(&["get"])), Invocation::Usage);
        assert_eq!(Invocation::from_words(&words(&["put", "bugs/1"])), Invocation::Usage);
        assert_eq!(
            Invocation::from_words(&words(&["fetch", "bugs/1"])),
            Invocation::Unsupported("fetch".into())
        );
        assert_eq!(
            Invocation::from_words(&words(&[".self_link", "extra"])),
            Invocation::Unsupported(".self_link".into())
        );
    }

    #[test]
    fn leading_dot_alone_is_a_pipe() {
        assert_eq!(
            Invocation::from_words(&words(&[".owner_link"])),
            Invocation::Run(Command::Pipe { key: "owner_link".into() })
        );
    }

    #[test]
    fn flags_build_the_config() {
        let cli = Cli::try_parse_from([
            "lp-api", "--staging", "--timeout", "10s", "--conf", "/tmp/lp.toml", "patch", "bugs/1",
            "tags:=[]",
        ])
        .unwrap();
        assert_eq!(cli.words, words(&["patch", "bugs/1", "tags:=[]"]));
        let config = cli.config();
        assert_eq!(config.api_base, STAGING_API);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.conf_path, PathBuf::from("/tmp/lp.toml"));
        assert_eq!(config.consumer_key, DEFAULT_CONSUMER_KEY);
    }

    #[test]
    fn defaults_point_at_production() {
        let cli = Cli::try_parse_from(["lp-api", "get", "people/+me"]).unwrap();
        let config = cli.config();
        assert_eq!(config.api_base, PRODUCTION_API);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.conf_path.ends_with("lp-api.toml"));
    }

    #[test]
    fn bad_timeout_is_a_usage_error() {
        assert!(Cli::try_parse_from(["lp-api", "--timeout", "soon", "get", "bugs/1"]).is_err());
    }
}
