//! Parameter download utilities.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use super::format::format_bytes;
use super::logging::Verbosity;

/// Moves the bytes behind a URL into a writer.
pub trait Fetcher {
    /// Stream `url` into `sink`, returning the number of bytes written
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> crate::Result<u64>;
}

impl<T: Fetcher + ?Sized> Fetcher for &T {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> crate::Result<u64> {
        (**self).fetch(url, sink)
    }
}

/// HTTP(S) fetcher.
///
/// The transfer runs on a private single-threaded runtime, so `fetch` blocks
/// the calling thread until the body has been written or an error occurs.
pub struct HttpFetcher {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    verbosity: Verbosity,
}

impl HttpFetcher {
    /// Create a new fetcher
    pub fn new(timeout: Duration, verbosity: impl Into<Verbosity>) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rs-deepnog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                crate::DeepnogError::DownloadError(format!("Failed to create HTTP client: {}", e))
            })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            client,
            runtime,
            verbosity: verbosity.into(),
        })
    }

    async fn fetch_async(&self, url: &str, sink: &mut dyn Write) -> crate::Result<u64> {
        tracing::debug!("GET {}", url);

        let mut response = self.client.get(url).send().await.map_err(|e| {
            crate::DeepnogError::DownloadError(format!("Failed to download {}: {}", url, e))
        })?;

        if !response.status().is_success() {
            return Err(crate::DeepnogError::DownloadError(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let pb = self.progress_bar(response.content_length());
        let mut written = 0u64;

        while let Some(chunk) = response.chunk().await.map_err(|e| {
            crate::DeepnogError::DownloadError(format!("Download error: {}", e))
        })? {
            sink.write_all(&chunk)?;
            written += chunk.len() as u64;
            pb.inc(chunk.len() as u64);
        }

        pb.finish_and_clear();
        Ok(written)
    }

    fn progress_bar(&self, total: Option<u64>) -> ProgressBar {
        if !self.verbosity.shows_progress() {
            return ProgressBar::hidden();
        }
        match total {
            Some(total) => {
                let pb = ProgressBar::new(total);
                if let Ok(style) =
                    ProgressStyle::default_bar().template("{spinner:.green} {bytes}/{total_bytes} ({eta})")
                {
                    pb.set_style(style);
                }
                pb
            }
            None => ProgressBar::new_spinner(),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> crate::Result<u64> {
        self.runtime.block_on(self.fetch_async(url, sink))
    }
}

/// Download `url` to `dest` without ever exposing a partial file.
///
/// Bytes go to a temporary file next to `dest` which is renamed into place
/// once the transfer is complete and synced. On failure the temporary file is
/// removed and `dest` is left untouched.
pub fn download_to_path(fetcher: &dyn Fetcher, url: &str, dest: &Path) -> crate::Result<u64> {
    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let tmp = tempfile::Builder::new()
        .prefix(".download-")
        .suffix(".part")
        .tempfile_in(parent)?;

    let written = {
        let mut writer = BufWriter::new(tmp.as_file());
        let written = fetcher.fetch(url, &mut writer)?;
        writer.flush()?;
        written
    };
    tmp.as_file().sync_all()?;

    tmp.persist(dest).map_err(|e| crate::DeepnogError::IoError(e.error))?;

    tracing::info!("Downloaded {} ({})", dest.display(), format_bytes(written));
    Ok(written)
}
