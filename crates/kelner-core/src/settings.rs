//! Global engine settings loaded from TOML.
//!
//! - `init_custom(toml_content)` sets a custom TOML before first `settings()` call
//! - `settings()` returns `&'static Settings` (lazy-init singleton)
//! - Default values are embedded via `include_str!("default_settings.toml")`
//!
//! Runtime admin toggles (TTS on/off, navigation, fallback mode) are *not*
//! here: they may change between turns and live on the engine.

use std::sync::OnceLock;

use serde::Deserialize;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Set custom TOML before first `settings()` call.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Get or initialize the global settings singleton.
pub fn settings() -> &'static Settings {
    static INSTANCE: OnceLock<Settings> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub limits: LimitSettings,
    pub timeouts: TimeoutSettings,
    pub tts: TtsSettings,
    pub nlu: NluSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitSettings {
    /// Hard cap for a single order line; above this the item is rejected.
    pub max_quantity: u32,
    pub dialog_stack_cap: usize,
    pub turn_buffer_cap: usize,
    /// Restaurants returned for a generic discovery query.
    pub generic_results: usize,
    /// Restaurants returned when the query names a cuisine.
    pub cuisine_results: usize,
    /// Menu items shown in a preview.
    pub menu_preview: usize,
    /// Price drift below this is treated as equal.
    pub price_epsilon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutSettings {
    pub turn_deadline_ms: u64,
    pub repository_ms: u64,
    pub tts_ms: u64,
    pub location_cache_ttl_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TtsSettings {
    pub chunk_max_chars: usize,
    pub rate: f64,
    pub pitch: f64,
    pub pause_between_chunks_ms: u64,
    pub pause_jitter_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NluSettings {
    /// Token-overlap share required for a fuzzy match.
    pub fuzzy_overlap: f64,
    /// Upper bound on confidence reported by the backup resolver.
    pub llm_confidence_cap: f64,
    /// Enables the backup resolver tier.
    pub expert_mode: bool,
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings =
        toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_positive {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }
    macro_rules! check_unit_fraction {
        ($section:ident . $field:ident) => {
            if !(0.0..=1.0).contains(&s.$section.$field) {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be within 0.0..=1.0".to_string(),
                });
            }
        };
    }

    check_positive!(limits.max_quantity);
    check_positive!(limits.dialog_stack_cap);
    check_positive!(limits.turn_buffer_cap);
    check_positive!(limits.generic_results);
    check_positive!(limits.cuisine_results);
    check_positive!(limits.menu_preview);
    if s.limits.price_epsilon < 0.0 {
        return Err(SettingsError::InvalidValue {
            field: "limits.price_epsilon".to_string(),
            reason: "must be non-negative".to_string(),
        });
    }

    check_positive!(timeouts.turn_deadline_ms);
    check_positive!(timeouts.repository_ms);
    check_positive!(timeouts.tts_ms);
    check_positive!(timeouts.location_cache_ttl_ms);

    check_positive!(tts.chunk_max_chars);
    if s.tts.rate <= 0.0 {
        return Err(SettingsError::InvalidValue {
            field: "tts.rate".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    check_unit_fraction!(nlu.fuzzy_overlap);
    check_unit_fraction!(nlu.llm_confidence_cap);

    Ok(())
}
