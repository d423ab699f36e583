// UI layer: everything the user sees besides log lines. The authorization
// prompt, the download progress line and the final payload output.

use anyhow::{Context, Result};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Ask the user to approve the request token in a browser.
pub fn prompt_authorization(url: &str) {
    eprintln!("Please open {url} to authorize the token.");
}

/// Write the response body to `output` when given, else to stdout.
pub fn write_output(payload: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            tracing::debug!("OUTPUT: {}", payload);
            fs::write(path, payload)
                .with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            println!("{payload}");
            Ok(())
        }
    }
}

/// Progress for a download in flight. A reporter thread watches the size of
/// the file being written once per second and compares it to the expected
/// length. Without a `Content-Length` nothing runs until `finish`.
pub struct DownloadProgress {
    name: String,
    reporter: Option<(Sender<u64>, JoinHandle<()>)>,
}

impl DownloadProgress {
    pub fn start(path: &Path, length: u64) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if length == 0 {
            return DownloadProgress { name, reporter: None };
        }
        let (tx, rx) = mpsc::channel();
        let path = path.to_path_buf();
        let thread_name = name.clone();
        let handle = thread::spawn(move || report(path, thread_name, length, rx));
        DownloadProgress {
            name,
            reporter: Some((tx, handle)),
        }
    }

    /// Stop the reporter and print the summary line. `size` is the number of
    /// bytes actually written.
    pub fn finish(self, size: u64) {
        match self.reporter {
            Some((tx, handle)) => {
                // A send error means the reporter already stopped.
                let _ = tx.send(size);
                let _ = handle.join();
            }
            None => println!("{} ({} bytes) is downloaded.", self.name, size),
        }
    }
}

fn report(path: PathBuf, name: String, length: u64, done: Receiver<u64>) {
    println!("Downloading {name} ...");
    let bar = ProgressBar::new(length);
    bar.set_style(
        ProgressStyle::with_template("{percent}% ({pos}/{len} bytes) about {msg} left")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let begin = Instant::now();
    let mut prev = 0;
    loop {
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(prev);
        if size > prev {
            bar.set_position(size);
            bar.set_message(HumanDuration(remaining(length, size, prev)).to_string());
            prev = size;
        }
        match done.recv_timeout(Duration::from_secs(1)) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(_) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    bar.finish_and_clear();
    let took = Duration::from_secs(begin.elapsed().as_secs());
    println!("{} ({} bytes took {}) is downloaded.", name, length, HumanDuration(took));
}

/// Seconds left at the rate seen since the previous one-second poll.
fn remaining(length: u64, size: u64, prev: u64) -> Duration {
    let rate = size.saturating_sub(prev).max(1);
    Duration::from_secs(length.saturating_sub(size) / rate + 1)
}
