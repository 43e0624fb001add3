//! 输入规范化与校验
//!
//! 字符串去首尾空白，空串视为 None；然后检查业务约束。
//! 一条输入的所有问题合并在一个 Validation 错误里返回。

use chrono::{NaiveDate, Utc};

use crate::errors::{CampError, Result};
use crate::storage::{CamperInput, CareDataInput, VolunteerInput};

/// BG 目标允许范围（mg/dL）
pub const BG_TARGET_MIN: i32 = 40;
pub const BG_TARGET_MAX: i32 = 400;

pub fn normalize_text(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        }
        None => false,
    }
}

fn check_name(field: &str, value: &str, problems: &mut Vec<String>) {
    if value.is_empty() {
        problems.push(format!("{} is required", field));
    }
}

fn check_email(field: &str, value: Option<&str>, problems: &mut Vec<String>) {
    if let Some(email) = value
        && !is_plausible_email(email)
    {
        problems.push(format!("{} '{}' is not a valid email address", field, email));
    }
}

fn check_birth_date(value: Option<NaiveDate>, today: NaiveDate, problems: &mut Vec<String>) {
    if let Some(date) = value
        && date > today
    {
        problems.push(format!("birth_date {} is in the future", date));
    }
}

fn finish<T>(value: T, problems: Vec<String>) -> Result<T> {
    if problems.is_empty() {
        Ok(value)
    } else {
        Err(CampError::validation(problems.join("; ")))
    }
}

pub fn normalize_camper(input: CamperInput) -> Result<CamperInput> {
    normalize_camper_at(input, Utc::now().date_naive())
}

/// `today` 由调用方给出，便于测试
pub fn normalize_camper_at(input: CamperInput, today: NaiveDate) -> Result<CamperInput> {
    let mut problems = Vec::new();

    let care = match input.care {
        Some(care) => match normalize_care(care) {
            Ok(care) => Some(care),
            Err(e) => {
                problems.push(format!("care: {}", e.message()));
                None
            }
        },
        None => None,
    };

    let camper = CamperInput {
        id: input.id,
        first_name: input.first_name.trim().to_string(),
        last_name: input.last_name.trim().to_string(),
        birth_date: input.birth_date,
        cabin: normalize_text(input.cabin),
        address: normalize_text(input.address),
        guardian_name: normalize_text(input.guardian_name),
        guardian_phone: normalize_text(input.guardian_phone),
        guardian_email: normalize_text(input.guardian_email),
        notes: normalize_text(input.notes),
        care,
    };

    check_name("first_name", &camper.first_name, &mut problems);
    check_name("last_name", &camper.last_name, &mut problems);
    check_email("guardian_email", camper.guardian_email.as_deref(), &mut problems);
    check_birth_date(camper.birth_date, today, &mut problems);

    finish(camper, problems)
}

pub fn normalize_care(input: CareDataInput) -> Result<CareDataInput> {
    let mut problems = Vec::new();

    let care = CareDataInput {
        insulin_type: normalize_text(input.insulin_type),
        delivery_method: input.delivery_method,
        target_bg_low: input.target_bg_low,
        target_bg_high: input.target_bg_high,
        carb_ratio: input.carb_ratio,
        correction_factor: input.correction_factor,
        long_acting_units: input.long_acting_units,
        allergies: normalize_text(input.allergies),
        medications: normalize_text(input.medications),
        notes: normalize_text(input.notes),
    };

    for (field, value) in [
        ("target_bg_low", care.target_bg_low),
        ("target_bg_high", care.target_bg_high),
    ] {
        if let Some(v) = value
            && !(BG_TARGET_MIN..=BG_TARGET_MAX).contains(&v)
        {
            problems.push(format!(
                "{} {} is outside {}-{} mg/dL",
                field, v, BG_TARGET_MIN, BG_TARGET_MAX
            ));
        }
    }
    if let (Some(low), Some(high)) = (care.target_bg_low, care.target_bg_high)
        && low >= high
    {
        problems.push(format!(
            "target_bg_low {} must be below target_bg_high {}",
            low, high
        ));
    }

    for (field, value) in [
        ("carb_ratio", care.carb_ratio),
        ("correction_factor", care.correction_factor),
    ] {
        if let Some(v) = value
            && !(v.is_finite() && v > 0.0)
        {
            problems.push(format!("{} must be a positive number", field));
        }
    }
    if let Some(v) = care.long_acting_units
        && !(v.is_finite() && v >= 0.0)
    {
        problems.push("long_acting_units must not be negative".to_string());
    }

    finish(care, problems)
}

pub fn normalize_volunteer(input: VolunteerInput) -> Result<VolunteerInput> {
    let mut problems = Vec::new();

    let volunteer = VolunteerInput {
        id: input.id,
        first_name: input.first_name.trim().to_string(),
        last_name: input.last_name.trim().to_string(),
        role: normalize_text(input.role),
        email: normalize_text(input.email),
        phone: normalize_text(input.phone),
    };

    check_name("first_name", &volunteer.first_name, &mut problems);
    check_name("last_name", &volunteer.last_name, &mut problems);
    check_email("email", volunteer.email.as_deref(), &mut problems);

    finish(volunteer, problems)
}

/// 批量输入逐条规范化，错误信息带上下标
pub fn normalize_batch<T, F>(label: &str, inputs: Vec<T>, normalize: F) -> Result<Vec<T>>
where
    F: Fn(T) -> Result<T>,
{
    let mut problems = Vec::new();
    let mut normalized = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.into_iter().enumerate() {
        match normalize(input) {
            Ok(value) => normalized.push(value),
            Err(e) => problems.push(format!("{}[{}]: {}", label, index, e.message())),
        }
    }
    finish(normalized, problems)
}
