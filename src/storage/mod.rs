use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::errors::Result;

pub mod backend;
pub mod drafts;
pub mod id_list;
pub mod models;

pub use backend::{AssignmentUpdate, CampStorage};
pub use drafts::{CamperInput, CareDataInput, VolunteerInput};
pub use models::{
    Assignment, CampCounts, Camper, CamperWithCare, CareData, InsulinDelivery, StorageConfig,
    Volunteer,
};

pub struct StorageFactory;

impl StorageFactory {
    /// 按全局配置创建存储
    pub async fn create() -> Result<Arc<CampStorage>> {
        let config = crate::config::get_config();
        Self::create_with(&config.database).await
    }

    /// 从 URL 自动推断数据库类型
    pub async fn create_with(config: &DatabaseConfig) -> Result<Arc<CampStorage>> {
        let database_url = &config.database_url;
        let backend_type = backend::infer_backend_from_url(database_url)?;

        let storage = CampStorage::new(database_url, &backend_type, config).await?;
        Ok(Arc::new(storage))
    }
}
