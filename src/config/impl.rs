use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks. Falls back to defaults (plus `CT__*` env
/// overrides) when nothing was initialized yet.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::load(None)))
        .load_full()
}

/// Initialize the global configuration from "config.toml" in the current
/// directory. If the file doesn't exist, uses in-memory defaults.
///
/// # Examples
/// ```no_run
/// use camptrack::config::init_config;
/// init_config();
/// ```
pub fn init_config() {
    init_config_from(None);
}

/// Initialize the global configuration from an explicit TOML path
pub fn init_config_from(path: Option<&str>) {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(StaticConfig::load(path)));
}

/// 整体替换配置（测试和 CLI 覆盖参数时使用）
pub fn replace_config(config: StaticConfig) {
    match CONFIG.get() {
        Some(current) => current.store(Arc::new(config)),
        None => {
            let _ = CONFIG.set(ArcSwap::from_pointee(config));
        }
    }
}
