//! Bounded worker pool for batch uploads.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use shipyard_core::config::UploadConfig;

use crate::error::{StoreError, UploadError, UploadResult};
use crate::plan::{UploadUnit, plan_uploads};
use crate::store::ObjectStore;

/// A file that could not be uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub key: String,
    pub attempts: u32,
    pub error: String,
}

/// Outcome of a batch upload. Keys are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub uploaded: Vec<String>,
    /// Already present remotely.
    pub skipped: Vec<String>,
    pub failed: Vec<UploadFailure>,
}

impl UploadReport {
    pub fn total(&self) -> usize {
        self.uploaded.len() + self.skipped.len() + self.failed.len()
    }

    pub fn into_result(self) -> UploadResult<Self> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(UploadError::Incomplete {
                failed: self.failed.len(),
                total: self.total(),
            })
        }
    }
}

/// Uploads files to an object store with at most `workers` in flight.
pub struct Uploader<S> {
    store: Arc<S>,
    workers: usize,
    retries: u32,
}

impl<S: ObjectStore + 'static> Uploader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::from_config(store, &UploadConfig::default())
    }

    pub fn from_config(store: Arc<S>, config: &UploadConfig) -> Self {
        Self {
            store,
            workers: config.workers.max(1),
            retries: config.retries.max(1),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    /// Upload a file or folder to `target`.
    ///
    /// A single file is always uploaded. Files found in a folder are skipped
    /// when their key already exists.
    pub async fn upload(&self, source: &Path, target: &str) -> UploadResult<UploadReport> {
        let skip_existing = source.is_dir();
        let units = plan_uploads(source, target)?;
        info!(source = %source.display(), target, files = units.len(), "starting upload");
        Ok(self.upload_units(units, skip_existing).await)
    }

    /// Upload prepared units and wait for every one of them.
    pub async fn upload_units(&self, units: Vec<UploadUnit>, skip_existing: bool) -> UploadReport {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks: JoinSet<(String, Result<u32, (u32, StoreError)>)> = JoinSet::new();
        let mut report = UploadReport::default();

        for unit in units {
            if skip_existing && self.already_uploaded(&unit.key).await {
                debug!(key = %unit.key, "already exists, skipping");
                report.skipped.push(unit.key);
                continue;
            }

            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let retries = self.retries;
            tasks.spawn(async move {
                // Held until the upload finishes.
                let _permit = semaphore.acquire_owned().await;
                let outcome = upload_with_retry(store.as_ref(), &unit, retries).await;
                (unit.key, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, Ok(attempts))) => {
                    info!(%key, attempts, "uploaded");
                    report.uploaded.push(key);
                }
                Ok((key, Err((attempts, e)))) => {
                    warn!(%key, attempts, error = %e, "upload failed");
                    report.failed.push(UploadFailure {
                        key,
                        attempts,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "upload task did not finish");
                    report.failed.push(UploadFailure {
                        key: String::new(),
                        attempts: 0,
                        error: e.to_string(),
                    });
                }
            }
        }

        report.uploaded.sort();
        report.skipped.sort();
        report.failed.sort_by(|a, b| a.key.cmp(&b.key));
        report
    }

    /// A failed existence check counts as "not uploaded yet".
    async fn already_uploaded(&self, key: &str) -> bool {
        match self.store.exists(key).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(%key, error = %e, "existence check failed, uploading anyway");
                false
            }
        }
    }
}

async fn upload_with_retry<S: ObjectStore>(
    store: &S,
    unit: &UploadUnit,
    retries: u32,
) -> Result<u32, (u32, StoreError)> {
    let mut attempt = 1;
    loop {
        debug!(key = %unit.key, source = %unit.source.display(), attempt, "uploading");
        match store.put_file(&unit.key, &unit.source).await {
            Ok(()) => return Ok(attempt),
            Err(e) if attempt >= retries => return Err((attempt, e)),
            Err(e) => {
                warn!(key = %unit.key, attempt, error = %e, "upload attempt failed, retrying");
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<HashMap<String, Vec<u8>>>,
        /// Remaining failures per key.
        flaky: Mutex<HashMap<String, u32>>,
        broken_exists: HashSet<String>,
        put_calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl MemoryStore {
        fn with_object(self, key: &str) -> Self {
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), Vec::new());
            self
        }

        fn failing(self, key: &str, times: u32) -> Self {
            self.flaky.lock().unwrap().insert(key.to_string(), times);
            self
        }

        fn keys(&self) -> Vec<String> {
            let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        }
    }

    impl ObjectStore for MemoryStore {
        async fn exists(&self, key: &str) -> Result<bool, StoreError> {
            if self.broken_exists.contains(key) {
                return Err(StoreError::Rejected {
                    key: key.to_string(),
                    message: "AccessDenied".to_string(),
                });
            }
            Ok(self.objects.lock().unwrap().contains_key(key))
        }

        async fn put_file(&self, key: &str, path: &Path) -> Result<(), StoreError> {
            self.put_calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            {
                let mut flaky = self.flaky.lock().unwrap();
                if let Some(left) = flaky.get_mut(key) {
                    if *left > 0 {
                        *left -= 1;
                        return Err(StoreError::Rejected {
                            key: key.to_string(),
                            message: "SlowDown".to_string(),
                        });
                    }
                }
            }

            let bytes = tokio::fs::read(path).await.map_err(|source| StoreError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            Ok(())
        }
    }

    fn site(files: usize) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..files {
            std::fs::write(dir.path().join(format!("f{i:02}.txt")), format!("{i}")).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn uploads_every_file_in_folder() {
        let dir = site(5);
        let store = Arc::new(MemoryStore::default());
        let uploader = Uploader::new(Arc::clone(&store));

        let report = uploader.upload(dir.path(), "web").await.unwrap();

        assert_eq!(report.uploaded.len(), 5);
        assert_eq!(report.uploaded[0], "web/f00.txt");
        assert!(report.failed.is_empty());
        assert_eq!(store.keys().len(), 5);
    }

    #[tokio::test]
    async fn existing_objects_are_skipped() {
        let dir = site(3);
        let store = Arc::new(MemoryStore::default().with_object("web/f01.txt"));
        let uploader = Uploader::new(Arc::clone(&store));

        let report = uploader.upload(dir.path(), "web").await.unwrap();

        assert_eq!(report.skipped, vec!["web/f01.txt".to_string()]);
        assert_eq!(report.uploaded.len(), 2);
        assert_eq!(store.put_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_existence_check_still_uploads() {
        let dir = site(1);
        let store = Arc::new(MemoryStore {
            broken_exists: HashSet::from(["web/f00.txt".to_string()]),
            ..Default::default()
        });
        let uploader = Uploader::new(Arc::clone(&store));

        let report = uploader.upload(dir.path(), "web").await.unwrap();
        assert_eq!(report.uploaded, vec!["web/f00.txt".to_string()]);
    }

    #[tokio::test]
    async fn single_file_ignores_existing_object() {
        let dir = site(1);
        let file = dir.path().join("f00.txt");
        let store = Arc::new(MemoryStore::default().with_object("one.txt"));
        let uploader = Uploader::new(Arc::clone(&store));

        let report = uploader.upload(&file, "one.txt").await.unwrap();
        assert_eq!(report.uploaded, vec!["one.txt".to_string()]);
        assert!(report.skipped.is_empty());
    }

    #[tokio::test]
    async fn pool_never_exceeds_worker_bound() {
        let dir = site(12);
        let store = Arc::new(MemoryStore::default());
        let uploader = Uploader::new(Arc::clone(&store)).with_workers(3);

        let report = uploader.upload(dir.path(), "").await.unwrap();

        assert_eq!(report.uploaded.len(), 12);
        assert!(store.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn flaky_upload_succeeds_within_retries() {
        let dir = site(1);
        let store = Arc::new(MemoryStore::default().failing("web/f00.txt", 2));
        let uploader = Uploader::new(Arc::clone(&store)).with_retries(3);

        let report = uploader.upload(dir.path(), "web").await.unwrap();

        assert_eq!(report.uploaded, vec!["web/f00.txt".to_string()]);
        assert_eq!(store.put_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_are_reported_not_fatal() {
        let dir = site(3);
        let store = Arc::new(MemoryStore::default().failing("web/f02.txt", 10));
        let uploader = Uploader::new(Arc::clone(&store)).with_retries(3);

        let report = uploader.upload(dir.path(), "web").await.unwrap();

        assert_eq!(report.uploaded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].key, "web/f02.txt");
        assert_eq!(report.failed[0].attempts, 3);
        assert!(matches!(
            report.into_result(),
            Err(UploadError::Incomplete {
                failed: 1,
                total: 3
            })
        ));
    }
}
