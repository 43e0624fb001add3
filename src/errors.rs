use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum CampError {
    CacheConnection(String),
    CacheOperation(String),
    CacheBackendNotFound(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    Serialization(String),
    SyncVerification(String),
}

impl CampError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            CampError::CacheConnection(_) => "E001",
            CampError::CacheOperation(_) => "E002",
            CampError::CacheBackendNotFound(_) => "E003",
            CampError::DatabaseConfig(_) => "E004",
            CampError::DatabaseConnection(_) => "E005",
            CampError::DatabaseOperation(_) => "E006",
            CampError::FileOperation(_) => "E007",
            CampError::Validation(_) => "E008",
            CampError::NotFound(_) => "E009",
            CampError::Conflict(_) => "E010",
            CampError::Serialization(_) => "E011",
            CampError::SyncVerification(_) => "E012",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            CampError::CacheConnection(_) => "Cache Connection Error",
            CampError::CacheOperation(_) => "Cache Operation Error",
            CampError::CacheBackendNotFound(_) => "Cache Backend Not Found",
            CampError::DatabaseConfig(_) => "Database Configuration Error",
            CampError::DatabaseConnection(_) => "Database Connection Error",
            CampError::DatabaseOperation(_) => "Database Operation Error",
            CampError::FileOperation(_) => "File Operation Error",
            CampError::Validation(_) => "Validation Error",
            CampError::NotFound(_) => "Resource Not Found",
            CampError::Conflict(_) => "Conflict",
            CampError::Serialization(_) => "Serialization Error",
            CampError::SyncVerification(_) => "Sync Verification Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            CampError::CacheConnection(msg)
            | CampError::CacheOperation(msg)
            | CampError::CacheBackendNotFound(msg)
            | CampError::DatabaseConfig(msg)
            | CampError::DatabaseConnection(msg)
            | CampError::DatabaseOperation(msg)
            | CampError::FileOperation(msg)
            | CampError::Validation(msg)
            | CampError::NotFound(msg)
            | CampError::Conflict(msg)
            | CampError::Serialization(msg)
            | CampError::SyncVerification(msg) => msg,
        }
    }

    /// 映射到 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            CampError::Validation(_) => StatusCode::BAD_REQUEST,
            CampError::NotFound(_) => StatusCode::NOT_FOUND,
            CampError::Conflict(_) => StatusCode::CONFLICT,
            CampError::CacheConnection(_) | CampError::DatabaseConnection(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于 Server 模式）
    #[cfg(feature = "server")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for CampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 默认使用简洁格式
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CampError {}

// 便捷的构造函数
impl CampError {
    pub fn cache_connection<T: Into<String>>(msg: T) -> Self {
        CampError::CacheConnection(msg.into())
    }

    pub fn cache_operation<T: Into<String>>(msg: T) -> Self {
        CampError::CacheOperation(msg.into())
    }

    pub fn cache_backend_not_found<T: Into<String>>(msg: T) -> Self {
        CampError::CacheBackendNotFound(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        CampError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        CampError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        CampError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        CampError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        CampError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        CampError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        CampError::Conflict(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        CampError::Serialization(msg.into())
    }

    pub fn sync_verification<T: Into<String>>(msg: T) -> Self {
        CampError::SyncVerification(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for CampError {
    fn from(err: sea_orm::DbErr) -> Self {
        CampError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for CampError {
    fn from(err: std::io::Error) -> Self {
        CampError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for CampError {
    fn from(err: serde_json::Error) -> Self {
        CampError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for CampError {
    fn from(err: csv::Error) -> Self {
        CampError::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for CampError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            CampError::CacheConnection(err.to_string())
        } else {
            CampError::CacheOperation(err.to_string())
        }
    }
}

/// GraphQL 错误扩展：extensions 中带上 code 和 type
impl async_graphql::ErrorExtensions for CampError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.message().to_string()).extend_with(|_, e| {
            e.set("code", self.code());
            e.set("type", self.error_type());
        })
    }
}

pub type Result<T> = std::result::Result<T, CampError>;
