use std::str::FromStr;

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::{NotSet, Set};
use tracing::warn;

use crate::errors::{CampError, Result};
use crate::storage::id_list::{join_id_list, parse_id_list};
use crate::storage::{
    Assignment, Camper, CamperInput, CareData, CareDataInput, InsulinDelivery, Volunteer,
    VolunteerInput,
};
use migration::entities::{camper, care_data, volunteer, volunteer_assignment};

pub fn model_to_camper(model: camper::Model) -> Camper {
    Camper {
        id: model.id,
        first_name: model.first_name,
        last_name: model.last_name,
        birth_date: model.birth_date,
        cabin: model.cabin,
        address: model.address,
        guardian_name: model.guardian_name,
        guardian_phone: model.guardian_phone,
        guardian_email: model.guardian_email,
        notes: model.notes,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// 输入 → ActiveModel；`id` 为 None 时交给数据库自增
pub fn camper_to_active_model(
    id: Option<i32>,
    input: &CamperInput,
    now: DateTime<Utc>,
) -> camper::ActiveModel {
    camper::ActiveModel {
        id: id.map(Set).unwrap_or(NotSet),
        first_name: Set(input.first_name.clone()),
        last_name: Set(input.last_name.clone()),
        birth_date: Set(input.birth_date),
        cabin: Set(input.cabin.clone()),
        address: Set(input.address.clone()),
        guardian_name: Set(input.guardian_name.clone()),
        guardian_phone: Set(input.guardian_phone.clone()),
        guardian_email: Set(input.guardian_email.clone()),
        notes: Set(input.notes.clone()),
        created_at: if id.is_none() { Set(now) } else { NotSet },
        updated_at: Set(now),
    }
}

pub fn model_to_care_data(model: care_data::Model) -> CareData {
    let delivery_method = model.delivery_method.as_deref().and_then(|raw| {
        InsulinDelivery::from_str(raw)
            .map_err(|_| {
                warn!(
                    "Camper {} has unknown delivery method '{}', ignoring",
                    model.camper_id, raw
                )
            })
            .ok()
    });

    CareData {
        camper_id: model.camper_id,
        insulin_type: model.insulin_type,
        delivery_method,
        target_bg_low: model.target_bg_low,
        target_bg_high: model.target_bg_high,
        carb_ratio: model.carb_ratio,
        correction_factor: model.correction_factor,
        long_acting_units: model.long_acting_units,
        allergies: model.allergies,
        medications: model.medications,
        notes: model.notes,
        updated_at: model.updated_at,
    }
}

pub fn care_data_to_active_model(
    camper_id: i32,
    input: &CareDataInput,
    now: DateTime<Utc>,
) -> care_data::ActiveModel {
    care_data::ActiveModel {
        camper_id: Set(camper_id),
        insulin_type: Set(input.insulin_type.clone()),
        delivery_method: Set(input.delivery_method.map(|m| m.as_ref().to_string())),
        target_bg_low: Set(input.target_bg_low),
        target_bg_high: Set(input.target_bg_high),
        carb_ratio: Set(input.carb_ratio),
        correction_factor: Set(input.correction_factor),
        long_acting_units: Set(input.long_acting_units),
        allergies: Set(input.allergies.clone()),
        medications: Set(input.medications.clone()),
        notes: Set(input.notes.clone()),
        updated_at: Set(now),
    }
}

pub fn model_to_volunteer(model: volunteer::Model) -> Volunteer {
    Volunteer {
        id: model.id,
        first_name: model.first_name,
        last_name: model.last_name,
        role: model.role,
        email: model.email,
        phone: model.phone,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub fn volunteer_to_active_model(
    id: Option<i32>,
    input: &VolunteerInput,
    now: DateTime<Utc>,
) -> volunteer::ActiveModel {
    volunteer::ActiveModel {
        id: id.map(Set).unwrap_or(NotSet),
        first_name: Set(input.first_name.clone()),
        last_name: Set(input.last_name.clone()),
        role: Set(input.role.clone()),
        email: Set(input.email.clone()),
        phone: Set(input.phone.clone()),
        created_at: if id.is_none() { Set(now) } else { NotSet },
        updated_at: Set(now),
    }
}

/// 分配行的 camper_ids 无法解析时报错，而不是静默丢弃
pub fn model_to_assignment(model: volunteer_assignment::Model) -> Result<Assignment> {
    let camper_ids = parse_id_list(&model.camper_ids).map_err(|e| {
        CampError::database_operation(format!(
            "Volunteer {} has a corrupt assignment list: {}",
            model.volunteer_id, e
        ))
    })?;
    Ok(Assignment {
        volunteer_id: model.volunteer_id,
        camper_ids,
    })
}

pub fn assignment_to_active_model(
    assignment: &Assignment,
    now: DateTime<Utc>,
) -> volunteer_assignment::ActiveModel {
    volunteer_assignment::ActiveModel {
        volunteer_id: Set(assignment.volunteer_id),
        camper_ids: Set(join_id_list(&assignment.camper_ids)),
        updated_at: Set(now),
    }
}
