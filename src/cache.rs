//! Durable TTL cache with stale fallback.
//!
//! Each key is one JSON file holding the payload and the instant it was
//! fetched. Files are written to a temporary name and renamed into place, so
//! readers never see a payload without its timestamp.
//!
//! [`CacheManager::get_or_fetch`] serves a fresh entry without fetching,
//! otherwise fetches and writes through. When the fetch fails it returns the
//! last stored payload no matter how old, and only falls back to an empty
//! payload when nothing was ever stored.
//!
//! There is no per-key locking. Two concurrent misses both fetch and the
//! last rename wins.

use crate::error::CacheError;
use crate::utils::looks_truncated;
use chrono::{DateTime, TimeDelta, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Display;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// A payload and the instant it was fetched, stored together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Fresh iff `now - fetched_at < ttl`.
    pub fn is_fresh(&self, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.fetched_at) < ttl
    }
}

/// Where a payload returned by the cache came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Stored entry was within its TTL; no fetch happened.
    Cached,
    /// Fetched just now and written through.
    Fetched,
    /// Fetch failed; the last stored payload was served.
    Stale,
    /// Fetch failed and nothing was stored; the payload is empty.
    Missing,
}

/// A payload plus where it came from.
#[derive(Debug, Clone)]
pub struct Lookup<T> {
    pub payload: T,
    pub freshness: Freshness,
    /// When the served payload was fetched (`None` for [`Freshness::Missing`]).
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Reads and writes cache entries under one directory.
#[derive(Debug, Clone)]
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    /// Cache manager rooted at the XDG cache directory
    /// (`~/.cache/awful_headlines/` on Linux).
    ///
    /// Returns `None` if no home directory can be determined.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("com", "awfulsec", "awful_headlines")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the file backing `key`. Characters outside `[A-Za-z0-9_-]`
    /// are replaced so a key can never escape the cache directory.
    fn cache_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.cache_dir.join(format!("{safe}.json"))
    }

    /// Read the entry for `key`.
    ///
    /// Missing, unreadable, and corrupt entries all read as `None`.
    #[instrument(level = "debug", skip(self))]
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let path = self.cache_path(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache entry unreadable");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) if looks_truncated(&e) => {
                warn!(path = %path.display(), error = %e, "Cache entry truncated; ignoring");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache entry corrupt; ignoring");
                None
            }
        }
    }

    /// Store `payload` for `key` as fetched now.
    pub async fn write<T: Serialize>(&self, key: &str, payload: &T) -> Result<DateTime<Utc>, CacheError> {
        let now = Utc::now();
        self.write_at(key, payload, now).await?;
        Ok(now)
    }

    /// Store `payload` for `key` with an explicit fetch instant.
    ///
    /// Payload and timestamp land in one file via write-then-rename.
    #[instrument(level = "debug", skip(self, payload))]
    pub async fn write_at<T: Serialize>(
        &self,
        key: &str,
        payload: &T,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir).await?;

        let entry = CacheEntry { payload, fetched_at };
        let json = serde_json::to_string_pretty(&entry)?;

        let path = self.cache_path(key);
        let tmp = path.with_extension(format!("{:08x}.tmp", rand::random::<u32>()));
        fs::write(&tmp, json).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(path = %path.display(), "Cache entry written");
        Ok(())
    }

    /// Return the payload for `key`, fetching only when the entry is missing
    /// or older than `ttl`. See the module docs for the failure policy.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, ttl: TimeDelta, fetch: F) -> T
    where
        T: Serialize + DeserializeOwned + Default,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_fetch_with_status(key, ttl, fetch).await.payload
    }

    /// [`get_or_fetch`](Self::get_or_fetch), also reporting where the payload came from.
    #[instrument(level = "info", skip(self, fetch), fields(ttl_secs = ttl.num_seconds()))]
    pub async fn get_or_fetch_with_status<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: TimeDelta,
        fetch: F,
    ) -> Lookup<T>
    where
        T: Serialize + DeserializeOwned + Default,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let previous = self.read::<T>(key).await;
        if let Some(entry) = previous {
            if entry.is_fresh(ttl, Utc::now()) {
                info!(fetched_at = %entry.fetched_at, "Serving fresh cache entry");
                return Lookup {
                    payload: entry.payload,
                    freshness: Freshness::Cached,
                    fetched_at: Some(entry.fetched_at),
                };
            }
            debug!(fetched_at = %entry.fetched_at, "Cache entry expired");
            return self.fetch_and_store(key, Some(entry), fetch).await;
        }
        self.fetch_and_store(key, None, fetch).await
    }

    /// Fetch regardless of freshness, keeping the stale fallback.
    #[instrument(level = "info", skip(self, fetch))]
    pub async fn refresh<T, E, F, Fut>(&self, key: &str, fetch: F) -> Lookup<T>
    where
        T: Serialize + DeserializeOwned + Default,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let previous = self.read::<T>(key).await;
        self.fetch_and_store(key, previous, fetch).await
    }

    async fn fetch_and_store<T, E, F, Fut>(
        &self,
        key: &str,
        previous: Option<CacheEntry<T>>,
        fetch: F,
    ) -> Lookup<T>
    where
        T: Serialize + DeserializeOwned + Default,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match fetch().await {
            Ok(payload) => {
                let fetched_at = match self.write(key, &payload).await {
                    Ok(at) => at,
                    Err(e) => {
                        warn!(key, error = %e, "Fetched but could not persist cache entry");
                        Utc::now()
                    }
                };
                Lookup {
                    payload,
                    freshness: Freshness::Fetched,
                    fetched_at: Some(fetched_at),
                }
            }
            Err(e) => match previous {
                Some(entry) => {
                    warn!(
                        key,
                        error = %e,
                        fetched_at = %entry.fetched_at,
                        "Fetch failed; serving stale cache entry"
                    );
                    Lookup {
                        payload: entry.payload,
                        freshness: Freshness::Stale,
                        fetched_at: Some(entry.fetched_at),
                    }
                }
                None => {
                    warn!(key, error = %e, "Fetch failed and nothing is cached");
                    Lookup {
                        payload: T::default(),
                        freshness: Freshness::Missing,
                        fetched_at: None,
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct QuizRecord {
        question: String,
        answer: String,
    }

    fn create_test_cache() -> (CacheManager, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheManager::with_dir(temp_dir.path().to_path_buf());
        (cache, temp_dir)
    }

    fn day() -> TimeDelta {
        TimeDelta::hours(24)
    }

    #[tokio::test]
    async fn test_fetch_runs_once_within_ttl() {
        let (cache, _tmp) = create_test_cache();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(vec!["a".to_string()])
        };

        let first: Vec<String> = cache.get_or_fetch("items", day(), fetch).await;
        let second: Vec<String> = cache.get_or_fetch("items", day(), fetch).await;

        assert_eq!(first, vec!["a"]);
        assert_eq!(second, first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_fallback_after_failed_refetch() {
        let (cache, _tmp) = create_test_cache();

        let first: Vec<String> = cache
            .get_or_fetch("items", TimeDelta::zero(), || async { Ok::<_, String>(vec!["first".to_string()]) })
            .await;
        let second = cache
            .get_or_fetch_with_status("items", TimeDelta::zero(), || async {
                Err::<Vec<String>, _>("network down")
            })
            .await;

        assert_eq!(second.payload, first);
        assert_eq!(second.freshness, Freshness::Stale);
    }

    #[tokio::test]
    async fn test_expired_entry_served_when_fetch_fails() {
        let (cache, _tmp) = create_test_cache();
        let old = Utc::now() - TimeDelta::hours(25);
        cache.write_at("items", &vec!["Z".to_string()], old).await.unwrap();

        let got = cache
            .get_or_fetch_with_status("items", day(), || async { Err::<Vec<String>, _>("all sources failed") })
            .await;

        assert_eq!(got.payload, vec!["Z".to_string()]);
        assert_eq!(got.freshness, Freshness::Stale);
        assert_eq!(got.fetched_at, Some(old));
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let (cache, _tmp) = create_test_cache();
        let old = Utc::now() - TimeDelta::hours(25);
        cache.write_at("items", &vec!["old".to_string()], old).await.unwrap();

        let got = cache
            .get_or_fetch_with_status("items", day(), || async { Ok::<_, String>(vec!["new".to_string()]) })
            .await;
        assert_eq!(got.payload, vec!["new".to_string()]);
        assert_eq!(got.freshness, Freshness::Fetched);

        let stored: CacheEntry<Vec<String>> = cache.read("items").await.unwrap();
        assert_eq!(stored.payload, vec!["new".to_string()]);
        assert!(stored.fetched_at > old);
    }

    #[tokio::test]
    async fn test_missing_entry_and_failed_fetch_is_empty() {
        let (cache, _tmp) = create_test_cache();
        let got = cache
            .get_or_fetch_with_status("items", day(), || async { Err::<Vec<String>, _>("boom") })
            .await;
        assert!(got.payload.is_empty());
        assert_eq!(got.freshness, Freshness::Missing);
        assert!(got.fetched_at.is_none());
    }

    #[tokio::test]
    async fn test_refresh_bypasses_fresh_entry() {
        let (cache, _tmp) = create_test_cache();
        cache.write("quiz", &vec![QuizRecord::default()]).await.unwrap();

        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let got = cache
            .refresh("quiz", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(vec![QuizRecord {
                    question: "Capital of France?".into(),
                    answer: "Paris".into(),
                }])
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(got.freshness, Freshness::Fetched);
        assert_eq!(got.payload[0].answer, "Paris");
    }

    #[tokio::test]
    async fn test_corrupt_entry_reads_as_absent() {
        let (cache, tmp) = create_test_cache();
        std::fs::write(tmp.path().join("items.json"), r#"{"payload": ["a""#).unwrap();
        assert!(cache.read::<Vec<String>>("items").await.is_none());

        std::fs::write(tmp.path().join("items.json"), "not json").unwrap();
        assert!(cache.read::<Vec<String>>("items").await.is_none());
    }

    #[tokio::test]
    async fn test_item_without_link_invalidates_entry() {
        use crate::models::Item;

        let (cache, tmp) = create_test_cache();
        let entry = r#"{
            "payload": [{"title": "T", "url": "", "rawTime": "", "summary": "", "imageUrl": "", "source": "wire"}],
            "fetched_at": "2025-05-06T08:00:00Z"
        }"#;
        std::fs::write(tmp.path().join("headlines.json"), entry).unwrap();
        assert!(cache.read::<Vec<Item>>("headlines").await.is_none());
    }

    #[tokio::test]
    async fn test_write_creates_directory_and_single_file() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("nested").join("cache");
        let cache = CacheManager::with_dir(nested.clone());

        cache.write("items", &vec![1, 2, 3]).await.unwrap();

        let files: Vec<_> = std::fs::read_dir(&nested)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files, vec!["items.json".to_string()]);

        let content = std::fs::read_to_string(nested.join("items.json")).unwrap();
        assert!(content.contains("\"payload\""));
        assert!(content.contains("\"fetched_at\""));
    }

    #[test]
    fn test_cache_path_sanitizes_keys() {
        let cache = CacheManager::with_dir(PathBuf::from("/tmp/c"));
        assert_eq!(cache.cache_path("../etc/passwd"), PathBuf::from("/tmp/c/___etc_passwd.json"));
    }

    #[test]
    fn test_is_fresh_boundary() {
        let now = Utc::now();
        let entry = CacheEntry {
            payload: (),
            fetched_at: now - TimeDelta::hours(24),
        };
        assert!(!entry.is_fresh(day(), now));
        assert!(entry.is_fresh(TimeDelta::hours(25), now));
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(cache) = CacheManager::new() {
            let path_str = cache.dir().to_string_lossy();
            assert!(path_str.contains("awful_headlines"));
        }
    }
}
