//! 演示数据脱敏：打乱营员地址和监护人电话
//!
//! 结果由 (seed, salt) 决定：同一 seed 重跑得到同样的输出，
//! salt 用营员 id，保证相同原地址在不同营员上得到不同结果。

use serde::Serialize;
use tracing::{debug, info};
use xxhash_rust::xxh64::xxh64;

use super::camp_service::CampService;
use crate::errors::Result;
use crate::storage::CamperInput;

const STREET_NAMES: &[&str] = &[
    "Maple", "Oak", "Cedar", "Pine", "Elm", "Birch", "Willow", "Aspen", "Spruce", "Hickory",
    "Juniper", "Laurel", "Magnolia", "Sycamore", "Chestnut", "Walnut", "Poplar", "Alder",
    "Hawthorn", "Linden",
];

/// 保留原样的街道后缀（小写、去掉结尾的点）
const STREET_SUFFIXES: &[&str] = &[
    "st", "street", "ave", "avenue", "rd", "road", "blvd", "boulevard", "ln", "lane", "dr",
    "drive", "ct", "court", "way", "pl", "place", "ter", "terrace", "cir", "circle", "pkwy",
    "parkway", "hwy", "highway", "trl", "trail",
];

/// 保留原样的门牌附加词
const UNIT_WORDS: &[&str] = &["apt", "unit", "suite", "ste", "#", "n", "s", "e", "w"];

fn mix(seed: u64, salt: &str, position: u64) -> u64 {
    xxh64(format!("{}:{}", salt, position).as_bytes(), seed)
}

/// 逐位替换数字；一段数字的首位非零时替换结果也非零
fn scramble_digits(text: &str, seed: u64, salt: &str, offset: u64) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_digit = false;
    for (i, ch) in text.chars().enumerate() {
        match ch.to_digit(10) {
            Some(d) => {
                let h = mix(seed, salt, offset + i as u64);
                let replacement = if !prev_digit && d != 0 {
                    1 + (h % 9) as u32
                } else {
                    (h % 10) as u32
                };
                out.push(char::from_digit(replacement, 10).unwrap_or(ch));
                prev_digit = true;
            }
            None => {
                out.push(ch);
                prev_digit = false;
            }
        }
    }
    out
}

fn normalized_word(token: &str) -> String {
    token.trim_end_matches(['.', ',']).to_lowercase()
}

fn obfuscate_street(street: &str, seed: u64, salt: &str) -> String {
    let tokens: Vec<&str> = street.split_whitespace().collect();
    let last = tokens.len().saturating_sub(1);

    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| {
            let word = normalized_word(token);
            if token.chars().any(|c| c.is_ascii_digit()) {
                scramble_digits(token, seed, salt, (i as u64) * 100)
            } else if (i == last && STREET_SUFFIXES.contains(&word.as_str()))
                || UNIT_WORDS.contains(&word.as_str())
                || !token.chars().any(char::is_alphabetic)
            {
                (*token).to_string()
            } else {
                let idx = mix(seed, salt, 10_000 + i as u64) as usize % STREET_NAMES.len();
                STREET_NAMES[idx].to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// 打乱地址
///
/// 第一个逗号之前视为街道：数字替换，普通单词换成树名，结尾后缀词保留；
/// 逗号之后（城市、州、邮编）只替换数字。
pub fn obfuscate_address(address: &str, seed: u64, salt: &str) -> String {
    match address.split_once(',') {
        Some((street, rest)) => format!(
            "{},{}",
            obfuscate_street(street, seed, salt),
            scramble_digits(rest, seed, salt, 1_000_000)
        ),
        None => obfuscate_street(address, seed, salt),
    }
}

/// 打乱电话号码中的数字，保留格式
pub fn obfuscate_phone(phone: &str, seed: u64, salt: &str) -> String {
    scramble_digits(phone, seed, salt, 2_000_000)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObfuscationReport {
    pub examined: usize,
    pub changed: usize,
    pub dry_run: bool,
}

/// 预览只带改写后的值
fn preview_line(camper_id: i32, address: Option<&str>, phone: Option<&str>) -> String {
    format!(
        "camper {}: address -> {}, guardian phone -> {}",
        camper_id,
        address.unwrap_or("-"),
        phone.unwrap_or("-")
    )
}

/// 对所有营员的地址和监护人电话脱敏，返回修改数量
pub async fn obfuscate_campers(
    service: &CampService,
    seed: u64,
    dry_run: bool,
) -> Result<ObfuscationReport> {
    let campers = service.list_campers().await?;
    let mut report = ObfuscationReport {
        examined: campers.len(),
        changed: 0,
        dry_run,
    };

    for camper in campers {
        let salt = format!("camper:{}", camper.id);
        let address = camper
            .address
            .as_deref()
            .map(|a| obfuscate_address(a, seed, &salt));
        let guardian_phone = camper
            .guardian_phone
            .as_deref()
            .map(|p| obfuscate_phone(p, seed, &salt));

        if address == camper.address && guardian_phone == camper.guardian_phone {
            continue;
        }
        report.changed += 1;

        if dry_run {
            info!("[dry-run] camper {} would be rewritten", camper.id);
            debug!(
                "[dry-run] {}",
                preview_line(camper.id, address.as_deref(), guardian_phone.as_deref())
            );
            continue;
        }

        let input = CamperInput {
            address,
            guardian_phone,
            care: None,
            ..CamperInput::from_record(&camper, None)
        };
        service.update_camper(camper.id, input).await?;
    }

    info!(
        "Obfuscation {}: {} of {} campers changed",
        if dry_run { "preview" } else { "applied" },
        report.changed,
        report.examined
    );
    Ok(report)
}
