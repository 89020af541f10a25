// config.rs
//
// TOML-backed runtime configuration. Every tuning knob has a default so
// a minimal config only names the server and the bot.

use std::fs;

use anyhow::Result;
use serde::Deserialize;

use crate::llm::ChatConfig;
use crate::player::movement::WanderOptions;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bot display name; also used to ignore our own chat echo.
    pub username: String,
    /// XUIDs treated as privileged by the chat fallback template.
    #[serde(default)]
    pub admin_xuids: Vec<String>,
    pub llm: ChatConfig,
    #[serde(default)]
    pub bot: BotConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Queue items still Received after this long are timed out.
    pub queue_timeout_ms: u64,
    pub dispatch_interval_ms: u64,
    pub tick_interval_ms: u64,
    /// System persona for the chat LLM.
    pub persona: String,
    pub movement: WanderOptions,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            queue_timeout_ms: 30_000,
            dispatch_interval_ms: 2_500,
            tick_interval_ms: 50,
            persona: "You are a wandering villager in a blocky world. \
                      Reply in one short, slightly cryptic sentence."
                .to_string(),
            movement: WanderOptions::default(),
        }
    }
}

fn default_port() -> u16 {
    19132
}

impl Config {
    /// Loads configuration from a TOML file at the given path.
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let raw = r#"
            host = "localhost"
            username = "WanderBot"

            [llm]
            endpoint = "http://127.0.0.1:11434/api/chat"
            model = "llama3"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.port, 19132);
        assert!(config.admin_xuids.is_empty());
        assert_eq!(config.bot.queue_timeout_ms, 30_000);
        assert_eq!(config.bot.dispatch_interval_ms, 2_500);
        assert_eq!(config.bot.tick_interval_ms, 50);
        assert_eq!(config.bot.movement.max_speed_bps, 4.3);
        assert!(config.bot.movement.initial_heading_deg.is_none());
    }

    #[test]
    fn movement_tuning_overrides_apply() {
        let raw = r#"
            host = "mc.example.net"
            port = 25565
            username = "WanderBot"
            admin_xuids = ["2535400000000000"]

            [llm]
            endpoint = "http://127.0.0.1:11434/api/chat"
            model = "llama3"

            [bot]
            dispatch_interval_ms = 3000

            [bot.movement]
            max_speed_bps = 5.6
            wander_per_tick = 0.12
            initial_heading_deg = 45.0
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.port, 25565);
        assert_eq!(config.admin_xuids.len(), 1);
        assert_eq!(config.bot.dispatch_interval_ms, 3000);
        assert_eq!(config.bot.movement.max_speed_bps, 5.6);
        assert_eq!(config.bot.movement.initial_heading_deg, Some(45.0));
        // untouched knobs keep their defaults
        assert_eq!(config.bot.movement.friction, 0.14);
        assert_eq!(config.bot.queue_timeout_ms, 30_000);
    }
}
