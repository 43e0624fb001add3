use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

/// 营员
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
#[graphql(complex)]
pub struct Camper {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub cabin: Option<String>,
    pub address: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_email: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Camper {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 胰岛素给药方式
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Enum,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InsulinDelivery {
    Pump,
    Injection,
    Pen,
}

/// 营员医疗档案（与 Camper 一对一）
///
/// BG 目标单位为 mg/dL；carb_ratio 为每单位胰岛素覆盖的碳水克数；
/// correction_factor 为每单位胰岛素降低的 mg/dL。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct CareData {
    pub camper_id: i32,
    pub insulin_type: Option<String>,
    pub delivery_method: Option<InsulinDelivery>,
    pub target_bg_low: Option<i32>,
    pub target_bg_high: Option<i32>,
    pub carb_ratio: Option<f64>,
    pub correction_factor: Option<f64>,
    pub long_acting_units: Option<f64>,
    pub allergies: Option<String>,
    pub medications: Option<String>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// 营员及其医疗档案（批量同步、导出时成对处理）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CamperWithCare {
    pub camper: Camper,
    pub care: Option<CareData>,
}

/// 志愿者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
#[graphql(complex)]
pub struct Volunteer {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 志愿者分配：一名志愿者负责的营员列表
///
/// 数据库中 camper_ids 以逗号拼接保存，这里始终是升序去重后的列表。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct Assignment {
    pub volunteer_id: i32,
    pub camper_ids: Vec<i32>,
}

impl Assignment {
    pub fn empty(volunteer_id: i32) -> Self {
        Self {
            volunteer_id,
            camper_ids: Vec::new(),
        }
    }

    pub fn contains(&self, camper_id: i32) -> bool {
        self.camper_ids.binary_search(&camper_id).is_ok()
    }
}

/// 各表记录数（健康检查使用）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampCounts {
    pub campers: u64,
    pub volunteers: u64,
    pub assignments: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StorageConfig {
    pub storage_type: String,
}
