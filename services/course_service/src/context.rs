use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use aws_config::BehaviorVersion;
use service_core::ddb::Adapter;
use thiserror::Error;

use crate::enrollment::ProgressLocks;
use crate::repository::{
    CachedCoursesRepository, CoursesRepository, DdbRepository, EnrollmentsRepository, MemoryRepository,
    PaymentsRepository,
};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_CACHE_TTL_SECONDS: u64 = 30;
const DEFAULT_CURRENCY: &str = "PHP";

#[derive(Debug, Clone, Copy)]
pub enum ContextKey {
    BindAddress,
    AccessTokenSecret,
    StorageBackend,
    DynamoDbEndpoint,
    CoursesTableName,
    CourseEnrollmentsTableName,
    PaymentsTableName,
    CatalogCacheTtlSeconds,
    PlatformCurrency,
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::BindAddress => write!(f, "BIND_ADDRESS"),
            Self::AccessTokenSecret => write!(f, "ACCESS_TOKEN_SECRET"),
            Self::StorageBackend => write!(f, "STORAGE_BACKEND"),
            Self::DynamoDbEndpoint => write!(f, "DYNAMODB_ENDPOINT"),
            Self::CoursesTableName => write!(f, "COURSES_TABLE_NAME"),
            Self::CourseEnrollmentsTableName => write!(f, "COURSE_ENROLLMENTS_TABLE_NAME"),
            Self::PaymentsTableName => write!(f, "PAYMENTS_TABLE_NAME"),
            Self::CatalogCacheTtlSeconds => write!(f, "CATALOG_CACHE_TTL_SECONDS"),
            Self::PlatformCurrency => write!(f, "PLATFORM_CURRENCY"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Environment variable {0} not set.")]
    Missing(ContextKey),

    #[error("Invalid value for {key}: {value:?}.")]
    Invalid { key: ContextKey, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    DynamoDb,
}

/// Shared state of the service, built once at startup.
pub struct Context {
    pub courses: Arc<dyn CoursesRepository>,
    pub enrollments: Arc<dyn EnrollmentsRepository>,
    pub payments: Arc<dyn PaymentsRepository>,
    pub progress_locks: ProgressLocks,
    pub access_token_secret: String,
    pub currency: String,
    pub bind_address: String,
}

impl Context {
    pub async fn from_env() -> Result<Self, ContextError> {
        let access_token_secret =
            Context::key(&ContextKey::AccessTokenSecret).ok_or(ContextError::Missing(ContextKey::AccessTokenSecret))?;
        let bind_address = Context::key(&ContextKey::BindAddress).unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let currency = match Context::key(&ContextKey::PlatformCurrency) {
            None => DEFAULT_CURRENCY.to_string(),
            Some(c) if c.len() == 3 && c.chars().all(|ch| ch.is_ascii_alphabetic()) => c.to_uppercase(),
            Some(c) => {
                return Err(ContextError::Invalid {
                    key: ContextKey::PlatformCurrency,
                    value: c,
                })
            }
        };
        let cache_ttl = match Context::key(&ContextKey::CatalogCacheTtlSeconds) {
            None => Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            Some(v) => v.parse::<u64>().map(Duration::from_secs).map_err(|_| ContextError::Invalid {
                key: ContextKey::CatalogCacheTtlSeconds,
                value: v,
            })?,
        };
        let backend = match Context::key(&ContextKey::StorageBackend).as_deref() {
            None | Some("memory") => StorageBackend::Memory,
            Some("dynamodb") => StorageBackend::DynamoDb,
            Some(other) => {
                return Err(ContextError::Invalid {
                    key: ContextKey::StorageBackend,
                    value: other.to_string(),
                })
            }
        };

        let mut ctx = match backend {
            StorageBackend::Memory => {
                tracing::info!("Using in-memory storage.");
                Context::with_repository(Arc::new(MemoryRepository::new()), cache_ttl, access_token_secret)
            }
            StorageBackend::DynamoDb => {
                let repository = Arc::new(Context::ddb_repository().await);
                Context::with_repository(repository, cache_ttl, access_token_secret)
            }
        };
        ctx.currency = currency;
        ctx.bind_address = bind_address;

        Ok(ctx)
    }

    /// Context over a single repository implementing every table, with the catalog cached for
    /// `cache_ttl`. A zero TTL disables the cache.
    pub fn with_repository<R>(repository: Arc<R>, cache_ttl: Duration, access_token_secret: impl Into<String>) -> Self
    where
        R: CoursesRepository + EnrollmentsRepository + PaymentsRepository + 'static,
    {
        let courses: Arc<dyn CoursesRepository> = if cache_ttl.is_zero() {
            repository.clone()
        } else {
            Arc::new(CachedCoursesRepository::new(repository.clone(), cache_ttl))
        };

        Context {
            courses,
            enrollments: repository.clone(),
            payments: repository,
            progress_locks: ProgressLocks::new(),
            access_token_secret: access_token_secret.into(),
            currency: DEFAULT_CURRENCY.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }

    async fn ddb_repository() -> DdbRepository<Adapter> {
        let mut config_builder = aws_config::defaults(BehaviorVersion::latest());
        if let Some(endpoint) = Context::key(&ContextKey::DynamoDbEndpoint) {
            tracing::info!(%endpoint, "Using DynamoDB with custom endpoint.");
            config_builder = config_builder.endpoint_url(endpoint);
        }
        let shared_config = config_builder.load().await;
        let client = aws_sdk_dynamodb::Client::new(&shared_config);

        DdbRepository::new(
            Adapter::from(client),
            Context::key(&ContextKey::CoursesTableName).unwrap_or_else(|| "Courses".to_string()),
            Context::key(&ContextKey::CourseEnrollmentsTableName).unwrap_or_else(|| "CourseEnrollments".to_string()),
            Context::key(&ContextKey::PaymentsTableName).unwrap_or_else(|| "Payments".to_string()),
        )
    }

    pub fn key(key: &ContextKey) -> Option<String> {
        env::var(key.to_string()).ok().filter(|v| !v.is_empty())
    }
}
