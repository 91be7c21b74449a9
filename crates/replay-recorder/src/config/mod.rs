mod behaviour_config;
#[allow(clippy::module_inception)]
mod config;

pub(crate) use {behaviour_config::BehaviourConfig, config::Config};

pub(crate) const DEFAULT_OVERRUN_SECS: u64 = 3;
pub(crate) const CONFIG_FILE_NAME: &str = "config.toml";

pub(crate) fn default_overrun_secs() -> u64 {
    DEFAULT_OVERRUN_SECS
}
