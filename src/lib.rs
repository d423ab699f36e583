// Library root
// -----------
// The binary (`main.rs`) only parses flags and hands over to `cli`.
//
// Module responsibilities:
// - `config`: run configuration (hosts, config file, timeouts).
// - `credential`: the OAuth token triple and where it is stored.
// - `oauth`: the token handshake and the PLAINTEXT request signer.
// - `args`: grammar of the `key==value`, `key:=json`, `key=value` words.
// - `api`: the signed HTTP client, one method per verb.
// - `ui`: authorization prompt, download progress, payload output.
// - `cli`: flags, verb selection and exit codes.
pub mod api;
pub mod args;
pub mod cli;
pub mod config;
pub mod credential;
pub mod error;
pub mod oauth;
pub mod telemetry;
pub mod ui;

pub use error::LpError;
