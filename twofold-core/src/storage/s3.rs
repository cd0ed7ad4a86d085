/*!
Amazon S3 storage adapter implementation.

Objects addressed by `s3://bucket/key` paths are read and written through the
official AWS SDK. The facade is synchronous: requests run on one process-wide
Tokio runtime, and callers already inside a runtime are served from a scoped
helper thread instead of blocking their executor.
*/

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

use super::StorageAdapter;
use crate::config::StorageConfig;
use crate::{Result, TwofoldError};

/// Amazon S3 storage adapter
///
/// Credentials come from the standard AWS provider chain (environment,
/// `~/.aws/credentials`, instance and task roles). Region and endpoint can be
/// overridden through the path's storage options.
///
/// # Example
/// ```rust,no_run
/// use twofold_core::storage::{S3StorageAdapter, StorageAdapter};
///
/// let adapter = S3StorageAdapter::new("my-data-bucket".to_string())?;
/// adapter.save(b"a,b\n1,2\n", "frames/data.csv")?;
/// # Ok::<(), twofold_core::TwofoldError>(())
/// ```
#[derive(Debug)]
pub struct S3StorageAdapter {
    client: S3Client,
    bucket: String,
    runtime: &'static Runtime,
}

type AdapterKey = (String, Option<String>, Option<String>);

static ADAPTERS: Lazy<Mutex<HashMap<AdapterKey, Arc<S3StorageAdapter>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

impl S3StorageAdapter {
    /// Create a new S3 storage adapter for the specified bucket
    ///
    /// # Errors
    /// Returns an error if the Tokio runtime cannot be created or no AWS
    /// credentials are available.
    pub fn new(bucket: String) -> Result<Self> {
        Self::from_config(&StorageConfig::s3_with_bucket(bucket))
    }

    /// Adapter for `config`, reused across calls with the same bucket, region
    /// and endpoint
    pub fn shared(config: &StorageConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let key = (
            config.bucket.clone().unwrap_or_default(),
            config.region.clone(),
            config.endpoint_url.clone(),
        );
        if let Some(adapter) = lock_adapters().get(&key) {
            return Ok(Arc::clone(adapter));
        }

        let adapter = Arc::new(Self::from_config(config)?);
        Ok(Arc::clone(lock_adapters().entry(key).or_insert(adapter)))
    }

    /// Create an adapter from a validated S3 [`StorageConfig`]
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| TwofoldError::validation("S3 bucket name is required"))?;

        let runtime = shared_runtime()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let sdk_config = run_blocking(runtime, loader.load())?;

        if sdk_config.credentials_provider().is_none() {
            return Err(TwofoldError::storage(
                "AWS credentials not found. Please set AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, and AWS_REGION environment variables",
            ));
        }

        // Custom endpoints (localstack, minio) only resolve path-style addressing.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint_url.is_some())
            .build();
        let client = S3Client::from_conf(s3_config);

        info!(bucket = %bucket, region = ?config.region, "Initialized S3 storage adapter");

        Ok(Self {
            client,
            bucket,
            runtime,
        })
    }

    /// Create a new S3 storage adapter with explicit AWS configuration
    pub fn with_sdk_config(bucket: String, config: &SdkConfig) -> Result<Self> {
        let runtime = shared_runtime()?;
        let client = S3Client::new(config);

        info!(bucket = %bucket, "Initialized S3 storage adapter with custom config");

        Ok(Self {
            client,
            bucket,
            runtime,
        })
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Run `op`, retrying transient failures with exponential backoff
    fn with_retry<T>(&self, op_name: &str, key: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 0u32;
        backoff::retry(cloud_storage_backoff_policy(), || {
            attempt += 1;
            op().map_err(|e| {
                if is_transient_error(&e) {
                    warn!(
                        attempt,
                        bucket = %self.bucket,
                        key = %key,
                        operation = op_name,
                        error = %e,
                        "S3 request failed, retrying"
                    );
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .map_err(|e| match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        })
    }

    fn put_once(&self, data: &[u8], key: &str) -> Result<()> {
        debug!(bucket = %self.bucket, key = %key, size = data.len(), "Starting S3 put_object");

        run_blocking(
            self.runtime,
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(data.to_vec()))
                .send(),
        )?
        .map(|_| ())
        .map_err(|e| map_s3_error("put_object", e, key))
    }

    fn get_once(&self, key: &str) -> Result<Vec<u8>> {
        debug!(bucket = %self.bucket, key = %key, "Starting S3 get_object");

        run_blocking(self.runtime, async {
            let output = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| map_s3_error("get_object", e, key))?;

            let data = output.body.collect().await.map_err(|e| {
                TwofoldError::storage(format!("Failed to read S3 object stream: {e}"))
            })?;
            Ok(data.into_bytes().to_vec())
        })?
    }
}

impl StorageAdapter for S3StorageAdapter {
    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        info!(bucket = %self.bucket, key = %path, size = data.len(), "Saving object to S3");
        self.with_retry("put_object", path, || self.put_once(data, path))
            .inspect_err(|e| error!(bucket = %self.bucket, key = %path, error = %e, "Failed to save object to S3"))
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        info!(bucket = %self.bucket, key = %path, "Loading object from S3");
        self.with_retry("get_object", path, || self.get_once(path))
            .inspect_err(|e| error!(bucket = %self.bucket, key = %path, error = %e, "Failed to load object from S3"))
    }

    fn exists(&self, path: &str) -> bool {
        let result = run_blocking(
            self.runtime,
            self.client
                .head_object()
                .bucket(&self.bucket)
                .key(path)
                .send(),
        );

        let exists = matches!(result, Ok(Ok(_)));
        debug!(bucket = %self.bucket, key = %path, exists, "S3 object existence check completed");
        exists
    }

    fn delete(&self, path: &str) -> Result<()> {
        info!(bucket = %self.bucket, key = %path, "Deleting object from S3");

        run_blocking(
            self.runtime,
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(path)
                .send(),
        )?
        .map(|_| ())
        .map_err(|e| map_s3_error("delete_object", e, path))
    }
}

fn lock_adapters() -> std::sync::MutexGuard<'static, HashMap<AdapterKey, Arc<S3StorageAdapter>>> {
    ADAPTERS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The runtime every S3 request runs on; built once and never dropped
fn shared_runtime() -> Result<&'static Runtime> {
    static RUNTIME: OnceCell<Runtime> = OnceCell::new();
    RUNTIME.get_or_try_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("twofold-s3")
            .enable_all()
            .build()
            .map_err(|e| TwofoldError::storage(format!("Failed to create async runtime for S3 client: {e}")))
    })
}

/// Drive `fut` to completion from synchronous code
///
/// `Runtime::block_on` panics on a thread that is already inside a Tokio
/// runtime, so such callers hand the future to a scoped helper thread.
fn run_blocking<F>(runtime: &Runtime, fut: F) -> Result<F::Output>
where
    F: Future + Send,
    F::Output: Send,
{
    if tokio::runtime::Handle::try_current().is_err() {
        return Ok(runtime.block_on(fut));
    }
    std::thread::scope(|scope| scope.spawn(|| runtime.block_on(fut)).join())
        .map_err(|_| TwofoldError::storage("S3 request thread panicked"))
}

/// Backoff policy for cloud object-store requests
pub fn cloud_storage_backoff_policy() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(500))
        .with_max_interval(Duration::from_secs(10))
        .with_max_elapsed_time(Some(Duration::from_secs(60)))
        .with_multiplier(1.5)
        .build()
}

/// Map AWS SDK errors to TwofoldError with appropriate context
fn map_s3_error<E, R>(op: &str, error: SdkError<E, R>, key: &str) -> TwofoldError
where
    E: ProvideErrorMetadata + std::fmt::Debug,
    R: std::fmt::Debug,
{
    match &error {
        SdkError::DispatchFailure(dispatch_err) => {
            TwofoldError::storage(format!("S3 {op} request failed to dispatch: {dispatch_err:?}"))
        }
        SdkError::TimeoutError(_) => {
            TwofoldError::storage(format!("S3 {op} request timed out (key: {key})"))
        }
        SdkError::ResponseError(response_err) => {
            TwofoldError::storage(format!("S3 {op} response error: {response_err:?}"))
        }
        SdkError::ServiceError(service_err) => match service_err.err().code() {
            Some("NoSuchKey") | Some("NotFound") => TwofoldError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("S3 object '{key}' not found"),
            )),
            Some("NoSuchBucket") => TwofoldError::storage("S3 bucket not found"),
            Some("AccessDenied") | Some("Forbidden") => TwofoldError::storage(
                "Access denied to S3 (check credentials and permissions)",
            ),
            Some(code) => TwofoldError::storage(format!(
                "S3 service error ({}): {}",
                code,
                service_err.err().message().unwrap_or("Unknown error")
            )),
            None => TwofoldError::storage(format!("S3 {op} service error: {service_err:?}")),
        },
        _ => TwofoldError::storage(format!("S3 {op} error: {error:?}")),
    }
}

/// Check if an error is transient and should be retried
fn is_transient_error(error: &TwofoldError) -> bool {
    match error {
        TwofoldError::Storage(msg) => {
            msg.contains("timed out")
                || msg.contains("dispatch")
                || msg.contains("InternalError")
                || msg.contains("SlowDown")
                || msg.contains("503")
                || msg.contains("502")
                || msg.contains("500")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::operation::get_object::GetObjectError;

    #[test]
    fn test_error_mapping_timeout() {
        let timeout: SdkError<GetObjectError> = SdkError::timeout_error("deadline exceeded");
        let mapped = map_s3_error("get_object", timeout, "test-key");

        match mapped {
            TwofoldError::Storage(msg) => {
                assert!(msg.contains("timed out"));
                assert!(msg.contains("test-key"));
            }
            other => panic!("Expected storage error for timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_is_transient_error() {
        let timeout_error = TwofoldError::storage("S3 get_object request timed out (key: test)");
        assert!(is_transient_error(&timeout_error));

        let dispatch_error = TwofoldError::storage("S3 put_object request failed to dispatch");
        assert!(is_transient_error(&dispatch_error));

        let auth_error = TwofoldError::storage("Access denied to S3");
        assert!(!is_transient_error(&auth_error));

        let other_error = TwofoldError::validation("Invalid input");
        assert!(!is_transient_error(&other_error));
    }

    #[test]
    fn test_from_config_rejects_missing_bucket() {
        let mut config = StorageConfig::s3_with_bucket(String::new());
        config.bucket = None;
        assert!(matches!(
            S3StorageAdapter::from_config(&config),
            Err(TwofoldError::Validation(_))
        ));
    }

    #[test]
    fn test_runtime_is_shared() {
        let first = shared_runtime().unwrap();
        let second = shared_runtime().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_run_blocking_outside_a_runtime() {
        let runtime = shared_runtime().unwrap();
        assert_eq!(run_blocking(runtime, async { 40 + 2 }).unwrap(), 42);
    }

    #[tokio::test]
    async fn test_run_blocking_inside_a_runtime_does_not_panic() {
        let runtime = shared_runtime().unwrap();
        let value = run_blocking(runtime, async {
            tokio::task::yield_now().await;
            "done"
        })
        .unwrap();
        assert_eq!(value, "done");
    }

    #[test]
    fn test_backoff_policy_is_bounded() {
        let policy = cloud_storage_backoff_policy();
        assert_eq!(policy.max_elapsed_time, Some(Duration::from_secs(60)));
        assert_eq!(policy.initial_interval, Duration::from_millis(500));
    }
}
