//! SeaORM storage backend
//!
//! Persists campers, care data, volunteers and volunteer assignments,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod assignments;
mod bulk;
mod campers;
mod connection;
mod converters;
pub mod retry;
mod volunteers;

use std::time::Duration;

use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::errors::{CampError, Result};
use crate::storage::models::{CampCounts, StorageConfig};

pub use assignments::AssignmentUpdate;
pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{
    model_to_assignment, model_to_camper, model_to_care_data, model_to_volunteer,
};

use migration::entities::{camper, volunteer, volunteer_assignment};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(CampError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 规范化 backend 名称
pub fn normalize_backend_name(backend: &str) -> String {
    match backend {
        "mariadb" => "mysql".to_string(),
        "postgresql" => "postgres".to_string(),
        other => other.to_string(),
    }
}

/// SeaORM-based camp storage
#[derive(Clone)]
pub struct CampStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry_config: retry::RetryConfig,
}

impl CampStorage {
    pub async fn new(database_url: &str, backend_name: &str, config: &DatabaseConfig) -> Result<Self> {
        if database_url.is_empty() {
            return Err(CampError::database_config("database_url 未设置"));
        }

        let backend_name = normalize_backend_name(backend_name);
        let db = match backend_name.as_str() {
            "sqlite" => connect_sqlite(database_url, config.pool_size).await?,
            "mysql" | "postgres" => {
                connect_generic(database_url, &backend_name, config.pool_size).await?
            }
            other => {
                return Err(CampError::database_config(format!(
                    "不支持的数据库类型: {}",
                    other
                )));
            }
        };

        let storage = CampStorage {
            db,
            backend_name,
            retry_config: retry::RetryConfig::from(config),
        };

        run_migrations(&storage.db).await?;

        info!(
            "{} storage initialized",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    pub fn get_backend_config(&self) -> StorageConfig {
        StorageConfig {
            storage_type: self.backend_name.clone(),
        }
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn retry_config(&self) -> retry::RetryConfig {
        self.retry_config
    }

    /// 各表行数（健康检查）
    pub async fn count_all(&self) -> Result<CampCounts> {
        let campers = camper::Entity::find().count(&self.db).await?;
        let volunteers = volunteer::Entity::find().count(&self.db).await?;
        let assignments = volunteer_assignment::Entity::find().count(&self.db).await?;
        Ok(CampCounts {
            campers,
            volunteers,
            assignments,
        })
    }

    /// 带超时的 count_all，超时视为数据库不可用
    pub async fn count_all_within(&self, timeout: Duration) -> Result<CampCounts> {
        match tokio::time::timeout(timeout, self.count_all()).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Storage health check timed out after {:?}", timeout);
                Err(CampError::database_connection(format!(
                    "health check timed out after {}ms",
                    timeout.as_millis()
                )))
            }
        }
    }

    /// 关闭连接池（所有克隆共享同一个池）
    pub async fn close(&self) -> Result<()> {
        self.db
            .clone()
            .close()
            .await
            .map_err(|e| CampError::database_connection(format!("关闭数据库连接失败: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(infer_backend_from_url("sqlite://camp.db").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("data/camp.sqlite").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url(":memory:").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("mariadb://root@localhost/camp").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://localhost/camp").unwrap(),
            "postgres"
        );
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }

    #[test]
    fn test_normalize_backend_name() {
        assert_eq!(normalize_backend_name("mariadb"), "mysql");
        assert_eq!(normalize_backend_name("postgresql"), "postgres");
        assert_eq!(normalize_backend_name("sqlite"), "sqlite");
    }
}
