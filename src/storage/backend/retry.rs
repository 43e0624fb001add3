//! 写操作重试
//!
//! 连接获取失败、断线、死锁、锁等待超时、序列化失败、SQLite BUSY
//! 按指数退避 + 抖动重试，其余错误立即返回。
//! `with_retry_when` 供缓存等非数据库操作复用同一套退避策略。

use sea_orm::DbErr;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;

/// 判断数据库错误是否可重试
pub fn is_retryable_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(runtime_err) | DbErr::Query(runtime_err) => {
            is_retryable_runtime_error(runtime_err)
        }
        _ => false,
    }
}

fn is_retryable_runtime_error(err: &sea_orm::error::RuntimeErr) -> bool {
    use sea_orm::error::RuntimeErr;

    match err {
        RuntimeErr::SqlxError(sqlx_err) => {
            use std::ops::Deref;
            if let Some(db_err) = sqlx_err.deref().as_database_error()
                && let Some(code) = db_err.code()
            {
                return matches!(
                    code.as_ref(),
                    // MySQL 死锁 / 锁超时
                    "1213" | "1205" |
                    // PostgreSQL 序列化失败 / 死锁
                    "40001" | "40P01" |
                    // SQLite BUSY / LOCKED / BUSY_SNAPSHOT
                    "5" | "6" | "517"
                );
            }
            is_retryable_error_message(&sqlx_err.to_string().to_lowercase())
        }
        RuntimeErr::Internal(msg) => is_retryable_error_message(&msg.to_lowercase()),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

fn is_retryable_error_message(err_str: &str) -> bool {
    err_str.contains("deadlock")
        || err_str.contains("lock wait timeout")
        || err_str.contains("database is locked")
        || err_str.contains("serialization failure")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl From<&DatabaseConfig> for RetryConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        }
    }
}

/// 数据库操作重试
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    config: RetryConfig,
    operation: F,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    with_retry_when(operation_name, config, is_retryable_error, operation).await
}

/// 通用重试：由 `is_retryable` 决定错误是否值得再试
pub async fn with_retry_when<T, E, F, Fut, P>(
    operation_name: &str,
    config: RetryConfig,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    P: Fn(&E) -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        "Operation '{}' succeeded after {} retries",
                        operation_name, attempt
                    );
                }
                return Ok(result);
            }
            Err(e) if is_retryable(&e) && attempt < config.max_retries => {
                attempt += 1;
                let delay = calculate_backoff(attempt, config.base_delay_ms, config.max_delay_ms);
                warn!(
                    "Operation '{}' failed (attempt {}/{}): {}; retrying in {} ms",
                    operation_name,
                    attempt,
                    config.max_retries + 1,
                    e,
                    delay
                );
                sleep(Duration::from_millis(delay)).await;
            }
            Err(e) => {
                debug!("Operation '{}' failed: {}", operation_name, e);
                return Err(e);
            }
        }
    }
}

/// 指数退避延迟，上限 `max_ms`，再加 0-25% 抖动
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    let exp_delay = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    let capped = exp_delay.min(max_ms);
    let jitter = rand::random_range(0..=capped / 4);
    capped.saturating_add(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            base_delay_ms: 5,
            max_delay_ms: 20,
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(is_retryable_error(&DbErr::ConnectionAcquire(
            sea_orm::error::ConnAcquireErr::Timeout
        )));
        assert!(is_retryable_error(&DbErr::Conn(
            sea_orm::error::RuntimeErr::Internal("connection reset".to_string())
        )));
        assert!(is_retryable_error(&DbErr::Exec(
            sea_orm::error::RuntimeErr::Internal("Deadlock found when trying to get lock".to_string())
        )));
        assert!(is_retryable_error(&DbErr::Query(
            sea_orm::error::RuntimeErr::Internal("database is locked".to_string())
        )));
        assert!(!is_retryable_error(&DbErr::RecordNotFound(
            "camper".to_string()
        )));
        assert!(!is_retryable_error(&DbErr::Custom("constraint".to_string())));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let d1 = calculate_backoff(1, 100, 2000);
        assert!((100..=125).contains(&d1));
        let d3 = calculate_backoff(3, 100, 2000);
        assert!((400..=500).contains(&d3));
        let d10 = calculate_backoff(10, 100, 2000);
        assert!((2000..=2500).contains(&d10));
    }

    #[test]
    fn test_retry_config_from_database_config() {
        let db = DatabaseConfig {
            retry_count: 7,
            retry_base_delay_ms: 11,
            retry_max_delay_ms: 99,
            ..Default::default()
        };
        let cfg = RetryConfig::from(&db);
        assert_eq!(cfg.max_retries, 7);
        assert_eq!(cfg.base_delay_ms, 11);
        assert_eq!(cfg.max_delay_ms, 99);
    }

    #[tokio::test]
    async fn test_with_retry_recovers() {
        let calls = AtomicU32::new(0);
        let result = with_retry("recover", fast(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(DbErr::ConnectionAcquire(
                        sea_orm::error::ConnAcquireErr::Timeout,
                    ))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up() {
        let calls = AtomicU32::new(0);
        let result = with_retry("exhaust", fast(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(DbErr::ConnectionAcquire(
                    sea_orm::error::ConnAcquireErr::Timeout,
                ))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let calls = AtomicU32::new(0);
        let result = with_retry("fast-fail", fast(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(DbErr::RecordNotFound("x".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_when_custom_predicate() {
        let calls = AtomicU32::new(0);
        let result: Result<u8, String> = with_retry_when(
            "custom",
            fast(),
            |e: &String| e == "flaky",
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n == 0 { Err("flaky".to_string()) } else { Ok(1) } }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
