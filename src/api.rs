// API client module: a blocking HTTP client that signs every request with the
// cached OAuth credential and implements one method per command-line verb.

use crate::args::{self, FormField};
use crate::config::Config;
use crate::credential::Credential;
use crate::error::LpError;
use crate::oauth;
use crate::ui::DownloadProgress;
use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Holds the HTTP client, the run configuration and the credential used to
/// sign requests.
#[derive(Clone)]
pub struct LaunchpadClient {
    client: Client,
    config: Config,
    credential: Credential,
}

impl LaunchpadClient {
    pub fn new(config: Config, credential: Credential) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(LaunchpadClient {
            client,
            config,
            credential,
        })
    }

    /// Authorization header for a request sent now.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let auth = oauth::authorization_header(&self.credential, oauth::unix_timestamp());
        debug!("{}", auth);
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&auth).context("Credential is not a valid header value")?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// Attach the `==` words of `words` as query parameters.
    fn with_query(req: RequestBuilder, words: &[String]) -> RequestBuilder {
        let params = args::query_params(words);
        if params.is_empty() {
            return req;
        }
        debug!(?params, "query");
        req.query(&params)
    }

    /// Send a signed request and turn the response into its body text.
    fn send(&self, req: RequestBuilder) -> Result<String> {
        let res = req
            .headers(self.auth_headers()?)
            .send()
            .context("Failed to send request")?;
        self.finish(res)
    }

    /// Any 2xx status yields the body. Everything else becomes
    /// [`LpError::Http`]; expired tokens get a hint about the cached file.
    fn finish(&self, res: Response) -> Result<String> {
        let status = res.status();
        let body = res.text().context("Failed to read response body")?;
        if status.is_success() {
            return Ok(body);
        }
        Err(self.http_error(status, body))
    }

    fn http_error(&self, status: StatusCode, body: String) -> anyhow::Error {
        let hint = body.starts_with("Expired token").then(|| {
            format!(
                "Please remove {} if it exists and try it again.",
                self.config.conf_path.display()
            )
        });
        LpError::Http { status, body, hint }.into()
    }

    pub fn get(&self, resource: &str, words: &[String]) -> Result<String> {
        let url = self.config.resolve(resource);
        debug!("GET {} {:?}", url, words);
        self.send(Self::with_query(self.client.get(&url), words))
    }

    pub fn delete(&self, resource: &str, words: &[String]) -> Result<String> {
        let url = self.config.resolve(resource);
        debug!("DELETE {} {:?}", url, words);
        self.send(Self::with_query(self.client.delete(&url), words))
    }

    /// JSON object from the `:=` words as body, `==` words as query.
    pub fn patch(&self, resource: &str, words: &[String]) -> Result<String> {
        let url = self.config.resolve(resource);
        debug!("PATCH {} {:?}", url, words);
        let payload = serde_json::to_string(&args::json_object(words)?)
            .context("Failed to encode JSON body")?;
        debug!("JSON: {}", payload);
        let req = self
            .client
            .patch(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        self.send(Self::with_query(req, words))
    }

    /// Body is the file content as is, once it is known to be JSON.
    pub fn put(&self, resource: &str, json_file: &Path) -> Result<String> {
        let url = self.config.resolve(resource);
        debug!("PUT {} {}", url, json_file.display());
        let payload = std::fs::read(json_file)
            .with_context(|| format!("Error when opening file: {}", json_file.display()))?;
        if serde_json::from_slice::<Value>(&payload).is_err() {
            return Err(LpError::InvalidJsonFile(json_file.to_path_buf()).into());
        }
        debug!("JSON: {}", String::from_utf8_lossy(&payload));
        let req = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        self.send(req)
    }

    /// Form-encoded `=` words as body, `==` words as query. Any `key=@path`
    /// word switches the body to multipart/form-data.
    pub fn post(&self, resource: &str, words: &[String]) -> Result<String> {
        let url = self.config.resolve(resource);
        debug!("POST {} {:?}", url, words);
        let fields = args::form_fields(words);
        let has_attachment = fields
            .iter()
            .any(|f| matches!(f, FormField::Attachment { .. }));
        let req = if has_attachment {
            self.client.post(&url).multipart(build_multipart(&fields)?)
        } else {
            let pairs: Vec<(&str, &str)> = fields
                .iter()
                .filter_map(|f| match f {
                    FormField::Text { key, value } => Some((key.as_str(), value.as_str())),
                    FormField::Attachment { .. } => None,
                })
                .collect();
            debug!(?pairs, "form");
            self.client.post(&url).form(&pairs)
        };
        self.send(Self::with_query(req, words))
    }

    /// Read a JSON object from `input`, take the URL stored under `key` and
    /// GET it. Lets one response feed the next call through a pipe.
    pub fn pipe(&self, key: &str, mut input: impl Read) -> Result<String> {
        let mut data = String::new();
        input
            .read_to_string(&mut data)
            .context("Failed to read standard input")?;
        let object: Value = serde_json::from_str(&data).context("Standard input is not JSON")?;
        let url = match object.get(key) {
            None | Some(Value::Null) => return Err(LpError::NoSuchKey(key.to_string()).into()),
            Some(Value::String(url)) => url.clone(),
            Some(_) => return Err(LpError::NotString(key.to_string()).into()),
        };
        debug!("PIPE {}", url);
        self.send(self.client.get(&url))
    }

    /// Save the file behind `file_url` into `dest_dir`, named after the last
    /// path segment. Returns the written path.
    pub fn download(&self, file_url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let url = self.config.download_url(file_url);
        debug!("DOWNLOAD {}", url);
        let filename = url::Url::parse(&url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut s| s.next_back().map(str::to_string))
            })
            .filter(|name| !name.is_empty())
            .with_context(|| format!("No file name in {file_url}"))?;
        let dest = dest_dir.join(&filename);

        // Large attachments take longer than the API timeout.
        let client = Client::builder()
            .timeout(None)
            .build()
            .context("Failed to build HTTP client")?;
        let mut res = client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .context("Failed to send download request")?;
        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .with_context(|| format!("Failed to read download response ({status})"))?;
            return Err(self.http_error(status, body));
        }

        let mut file =
            File::create(&dest).with_context(|| format!("Failed to create {}", dest.display()))?;
        let progress = DownloadProgress::start(&dest, res.content_length().unwrap_or(0));
        let copied = res.copy_to(&mut file);
        let size = copied.as_ref().copied().unwrap_or(0);
        progress.finish(size);
        copied.with_context(|| format!("Failed to write {}", dest.display()))?;
        Ok(dest)
    }
}

/// Multipart body for a POST with attachments: text fields as text parts,
/// each attachment as a file part with its name and content type.
fn build_multipart(fields: &[FormField]) -> Result<multipart::Form> {
    let mut form = multipart::Form::new();
    for field in fields {
        form = match field {
            FormField::Text { key, value } => form.text(key.clone(), value.clone()),
            FormField::Attachment { key, path } => {
                let data = args::read_file_content(path)?;
                let file_name = path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or("attachment")
                    .to_string();
                let content_type = args::detect_content_type(path);
                debug!(file = %path.display(), %content_type, bytes = data.len(), "attachment");
                let part = multipart::Part::bytes(data)
                    .file_name(file_name)
                    .mime_str(&content_type)
                    .context("Invalid content type")?;
                form.part(key.clone(), part)
            }
        };
    }
    Ok(form)
}
