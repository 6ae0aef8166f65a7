//! Resolution of parameter files inside the local data home.

use std::path::{Path, PathBuf};

use super::descriptor::WeightsDescriptor;
use crate::config::Settings;
use crate::utils::{download_to_path, Fetcher, HttpFetcher, Verbosity};

/// Maps descriptors to files under a data home and fills cache misses from a
/// remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightsLocator {
    data_home: PathBuf,
    remote_url: String,
}

impl WeightsLocator {
    pub fn new(data_home: impl AsRef<Path>, remote_url: impl Into<String>) -> Self {
        Self {
            data_home: data_home.as_ref().to_path_buf(),
            remote_url: remote_url.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.data_home, settings.remote_url.clone())
    }

    pub fn data_home(&self) -> &Path {
        &self.data_home
    }

    /// Where the file for `descriptor` lives if it is cached
    pub fn expected_path(&self, descriptor: &WeightsDescriptor) -> PathBuf {
        self.data_home.join(descriptor.relative_path())
    }

    /// Where the file for `descriptor` can be downloaded from
    pub fn remote_url(&self, descriptor: &WeightsDescriptor) -> String {
        format!(
            "{}/{}",
            self.remote_url.trim_end_matches('/'),
            descriptor.remote_path()
        )
    }

    /// The cached file, if present
    pub fn locate(&self, descriptor: &WeightsDescriptor) -> Option<PathBuf> {
        let path = self.expected_path(descriptor);
        path.is_file().then_some(path)
    }

    /// Return the cached file, downloading it first when missing and
    /// `allow_fetch` is set
    pub fn ensure_present(
        &self,
        descriptor: &WeightsDescriptor,
        allow_fetch: bool,
        fetcher: &dyn Fetcher,
    ) -> crate::Result<PathBuf> {
        self.ensure_present_with(descriptor, allow_fetch, || Ok(fetcher))
    }

    /// Like [`WeightsLocator::ensure_present`], but the fetcher is only built
    /// once a download is actually needed
    pub fn ensure_present_with<F, M>(
        &self,
        descriptor: &WeightsDescriptor,
        allow_fetch: bool,
        make_fetcher: M,
    ) -> crate::Result<PathBuf>
    where
        F: Fetcher,
        M: FnOnce() -> crate::Result<F>,
    {
        if let Some(path) = self.locate(descriptor) {
            tracing::debug!("Weights for {} cached at {:?}", descriptor, path);
            return Ok(path);
        }

        let path = self.expected_path(descriptor);
        if !allow_fetch {
            return Err(crate::DeepnogError::DataNotFound(path));
        }

        let fetcher = make_fetcher()?;
        let url = self.remote_url(descriptor);
        tracing::info!("Downloading weights for {} from {}", descriptor, url);
        download_to_path(&fetcher, &url, &path)?;

        Ok(path)
    }
}

/// Resolve the parameter file for `(database, level, architecture)`.
///
/// `data_home` overrides the directory from the environment. On a cache miss
/// the file is downloaded if `allow_fetch` is set; otherwise
/// [`DataNotFound`](crate::DeepnogError::DataNotFound) is returned without any
/// network access. `verbosity` only affects diagnostics.
pub fn resolve_weights(
    database: &str,
    level: &str,
    architecture: &str,
    data_home: Option<&Path>,
    allow_fetch: bool,
    verbosity: impl Into<Verbosity>,
) -> crate::Result<PathBuf> {
    let descriptor = WeightsDescriptor::new(database, level, architecture)?;
    let settings = Settings::from_env_with_data_home(data_home)?;
    resolve_weights_with(&settings, &descriptor, allow_fetch, verbosity)
}

/// Resolve `descriptor` against explicit settings, downloading over HTTP on a
/// cache miss when `allow_fetch` is set
pub fn resolve_weights_with(
    settings: &Settings,
    descriptor: &WeightsDescriptor,
    allow_fetch: bool,
    verbosity: impl Into<Verbosity>,
) -> crate::Result<PathBuf> {
    let verbosity: Verbosity = verbosity.into();
    WeightsLocator::from_settings(settings).ensure_present_with(descriptor, allow_fetch, || {
        HttpFetcher::new(settings.timeout()?, verbosity)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Write;

    struct CountingFetcher {
        calls: Cell<usize>,
    }

    impl CountingFetcher {
        fn new() -> Self {
            Self { calls: Cell::new(0) }
        }
    }

    impl Fetcher for CountingFetcher {
        fn fetch(&self, url: &str, sink: &mut dyn Write) -> crate::Result<u64> {
            self.calls.set(self.calls.get() + 1);
            sink.write_all(url.as_bytes())?;
            Ok(url.len() as u64)
        }
    }

    struct FailingFetcher;

    impl Fetcher for FailingFetcher {
        fn fetch(&self, _url: &str, _sink: &mut dyn Write) -> crate::Result<u64> {
            Err(crate::DeepnogError::DownloadError("HTTP 404 Not Found".to_string()))
        }
    }

    fn test_descriptor() -> WeightsDescriptor {
        WeightsDescriptor::new("testdb", "1", "do_not_delete").unwrap()
    }

    #[test]
    fn test_expected_path_and_url() {
        let locator = WeightsLocator::new("/data", "https://example.org/params/");
        let d = test_descriptor();
        assert_eq!(
            locator.expected_path(&d),
            Path::new("/data").join("testdb").join("1").join("do_not_delete.pth")
        );
        assert_eq!(
            locator.remote_url(&d),
            "https://example.org/params/testdb/1/do_not_delete.pth"
        );
    }

    #[test]
    fn test_missing_without_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let locator = WeightsLocator::new(dir.path(), "mem://params");
        let fetcher = CountingFetcher::new();

        let err = locator.ensure_present(&test_descriptor(), false, &fetcher).unwrap_err();

        assert!(matches!(err, crate::DeepnogError::DataNotFound(_)));
        assert!(err.to_string().contains("Data not found"));
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn test_fetch_then_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let locator = WeightsLocator::new(dir.path(), "mem://params");
        let fetcher = CountingFetcher::new();

        let first = locator.ensure_present(&test_descriptor(), true, &fetcher).unwrap();
        assert!(first.is_file());
        assert_eq!(
            std::fs::read_to_string(&first).unwrap(),
            "mem://params/testdb/1/do_not_delete.pth"
        );

        let second = locator.ensure_present(&test_descriptor(), true, &fetcher).unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.calls.get(), 1);

        let third = locator.ensure_present(&test_descriptor(), false, &fetcher).unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn test_fetch_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let locator = WeightsLocator::new(dir.path(), "mem://params");

        let err = locator.ensure_present(&test_descriptor(), true, &FailingFetcher).unwrap_err();

        assert!(matches!(err, crate::DeepnogError::DownloadError(_)));
        assert!(locator.locate(&test_descriptor()).is_none());
    }

    fn unusable_fetcher() -> crate::Result<CountingFetcher> {
        Err(crate::DeepnogError::ConfigError(
            "DEEPNOG_TIMEOUT must be a number of seconds, got \"soon\"".to_string(),
        ))
    }

    #[test]
    fn test_fetcher_not_built_without_download() {
        let dir = tempfile::tempdir().unwrap();
        let locator = WeightsLocator::new(dir.path(), "mem://params");

        let err = locator
            .ensure_present_with(&test_descriptor(), false, unusable_fetcher)
            .unwrap_err();
        assert!(matches!(err, crate::DeepnogError::DataNotFound(_)));

        let cached = locator.expected_path(&test_descriptor());
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, b"params").unwrap();

        let path = locator
            .ensure_present_with(&test_descriptor(), true, unusable_fetcher)
            .unwrap();
        assert_eq!(path, cached);
    }

    #[test]
    fn test_fetcher_error_surfaces_on_miss() {
        let dir = tempfile::tempdir().unwrap();
        let locator = WeightsLocator::new(dir.path(), "mem://params");

        let err = locator
            .ensure_present_with(&test_descriptor(), true, unusable_fetcher)
            .unwrap_err();
        assert!(matches!(err, crate::DeepnogError::ConfigError(_)));
    }

    #[test]
    fn test_resolve_weights_with_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_home: dir.path().to_path_buf(),
            remote_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: Some(1),
        };

        let err = resolve_weights_with(&settings, &test_descriptor(), false, 0u8).unwrap_err();
        assert!(matches!(err, crate::DeepnogError::DataNotFound(_)));
    }

    #[test]
    fn test_resolve_weights_impossible() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_weights("testdb", "1", "do_not_delete", Some(dir.path()), false, 3u8)
            .unwrap_err();
        assert!(err.to_string().contains("Data not found"));
    }

    #[test]
    fn test_resolve_weights_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("testdb").join("1").join("do_not_delete.pth");
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, b"params").unwrap();

        let path = resolve_weights("testdb", "1", "do_not_delete", Some(dir.path()), false, 0u8)
            .unwrap();
        assert_eq!(path, cached);
    }

    #[test]
    #[ignore = "downloads from the remote parameter store"]
    fn test_resolve_weights_download() {
        let dir = tempfile::tempdir().unwrap();
        let path = resolve_weights("testdb", "1", "do_not_delete", Some(dir.path()), true, 3u8)
            .unwrap();
        assert!(path.is_file());
    }
}
