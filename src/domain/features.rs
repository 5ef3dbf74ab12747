//! Feature flag keys.
//!
//! Lookups go through this enum instead of free-form strings, so a typo is an
//! `UnknownFeature` error rather than a silent `false`.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureKey {
    // modules
    Invoicing,
    TimeTracking,
    ClientManagement,
    Analytics,
    Integrations,
    // beta
    NewDashboard,
    AdvancedReports,
    AiAssistant,
    // experimental
    DarkModeV2,
    RealTimeSync,
    VoiceCommands,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 11] = [
        FeatureKey::Invoicing,
        FeatureKey::TimeTracking,
        FeatureKey::ClientManagement,
        FeatureKey::Analytics,
        FeatureKey::Integrations,
        FeatureKey::NewDashboard,
        FeatureKey::AdvancedReports,
        FeatureKey::AiAssistant,
        FeatureKey::DarkModeV2,
        FeatureKey::RealTimeSync,
        FeatureKey::VoiceCommands,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FeatureKey::Invoicing => "invoicing",
            FeatureKey::TimeTracking => "timeTracking",
            FeatureKey::ClientManagement => "clientManagement",
            FeatureKey::Analytics => "analytics",
            FeatureKey::Integrations => "integrations",
            FeatureKey::NewDashboard => "newDashboard",
            FeatureKey::AdvancedReports => "advancedReports",
            FeatureKey::AiAssistant => "aiAssistant",
            FeatureKey::DarkModeV2 => "darkModeV2",
            FeatureKey::RealTimeSync => "realTimeSync",
            FeatureKey::VoiceCommands => "voiceCommands",
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureKey {
    type Err = ConfigError;

    /// Case-insensitive; `-` and `_` separators are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        FeatureKey::ALL
            .into_iter()
            .find(|key| key.name().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| ConfigError::UnknownFeature(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert_eq!("timetracking".parse::<FeatureKey>().unwrap(), FeatureKey::TimeTracking);
        assert_eq!("TimeTracking".parse::<FeatureKey>().unwrap(), FeatureKey::TimeTracking);
        assert_eq!("time-tracking".parse::<FeatureKey>().unwrap(), FeatureKey::TimeTracking);
        assert_eq!("dark_mode_v2".parse::<FeatureKey>().unwrap(), FeatureKey::DarkModeV2);
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        assert_eq!(
            "payroll".parse::<FeatureKey>().unwrap_err(),
            ConfigError::UnknownFeature("payroll".into())
        );
    }
}
