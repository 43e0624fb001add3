//! 写入用的输入结构
//!
//! 同时作为 GraphQL InputObject 和导入文件（JSON）的格式。
//! `id` 为空表示新建；批量同步时带 id 的条目按 id 对齐已有记录。

use async_graphql::InputObject;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::models::{Camper, CareData, InsulinDelivery, Volunteer};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, InputObject)]
pub struct CamperInput {
    #[serde(default)]
    pub id: Option<i32>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub cabin: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub guardian_phone: Option<String>,
    #[serde(default)]
    pub guardian_email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// None 表示不修改医疗档案
    #[serde(default)]
    pub care: Option<CareDataInput>,
}

impl CamperInput {
    /// 与已存储记录比较内容字段（忽略 id 和时间戳）
    pub fn matches(&self, camper: &Camper, care: Option<&CareData>) -> bool {
        let base = self.first_name == camper.first_name
            && self.last_name == camper.last_name
            && self.birth_date == camper.birth_date
            && self.cabin == camper.cabin
            && self.address == camper.address
            && self.guardian_name == camper.guardian_name
            && self.guardian_phone == camper.guardian_phone
            && self.guardian_email == camper.guardian_email
            && self.notes == camper.notes;

        match (&self.care, care) {
            (None, _) => base,
            (Some(input), Some(existing)) => base && input.matches(existing),
            (Some(_), None) => false,
        }
    }

    /// 从已有记录构造输入（导出、混淆等场景）
    pub fn from_record(camper: &Camper, care: Option<&CareData>) -> Self {
        Self {
            id: Some(camper.id),
            first_name: camper.first_name.clone(),
            last_name: camper.last_name.clone(),
            birth_date: camper.birth_date,
            cabin: camper.cabin.clone(),
            address: camper.address.clone(),
            guardian_name: camper.guardian_name.clone(),
            guardian_phone: camper.guardian_phone.clone(),
            guardian_email: camper.guardian_email.clone(),
            notes: camper.notes.clone(),
            care: care.map(CareDataInput::from_record),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, InputObject)]
#[serde(default)]
pub struct CareDataInput {
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
}

impl CareDataInput {
    pub fn matches(&self, care: &CareData) -> bool {
        self.insulin_type == care.insulin_type
            && self.delivery_method == care.delivery_method
            && self.target_bg_low == care.target_bg_low
            && self.target_bg_high == care.target_bg_high
            && self.carb_ratio == care.carb_ratio
            && self.correction_factor == care.correction_factor
            && self.long_acting_units == care.long_acting_units
            && self.allergies == care.allergies
            && self.medications == care.medications
            && self.notes == care.notes
    }

    pub fn from_record(care: &CareData) -> Self {
        Self {
            insulin_type: care.insulin_type.clone(),
            delivery_method: care.delivery_method,
            target_bg_low: care.target_bg_low,
            target_bg_high: care.target_bg_high,
            carb_ratio: care.carb_ratio,
            correction_factor: care.correction_factor,
            long_acting_units: care.long_acting_units,
            allergies: care.allergies.clone(),
            medications: care.medications.clone(),
            notes: care.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, InputObject)]
pub struct VolunteerInput {
    #[serde(default)]
    pub id: Option<i32>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl VolunteerInput {
    pub fn matches(&self, volunteer: &Volunteer) -> bool {
        self.first_name == volunteer.first_name
            && self.last_name == volunteer.last_name
            && self.role == volunteer.role
            && self.email == volunteer.email
            && self.phone == volunteer.phone
    }

    pub fn from_record(volunteer: &Volunteer) -> Self {
        Self {
            id: Some(volunteer.id),
            first_name: volunteer.first_name.clone(),
            last_name: volunteer.last_name.clone(),
            role: volunteer.role.clone(),
            email: volunteer.email.clone(),
            phone: volunteer.phone.clone(),
        }
    }
}
