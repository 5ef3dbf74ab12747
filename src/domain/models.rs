//! Typed views over the four configuration documents.
//!
//! Every field is optional or defaulted so that documents only need to carry
//! what they use; the models exist to reject structurally wrong content
//! (wrong types, non-object roots) at load time.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{ConfigError, Domain, FeatureKey};

const DEFAULT_COMPANY_NAME: &str = "Company";
const DEFAULT_PRIMARY_COLOR: &str = "#007bff";
const DEFAULT_THEME: &str = "light";

/// Application-level settings (`app` domain).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub system: Option<SystemInfo>,
    pub features: Option<AppFeatures>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SystemInfo {
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub version: Option<String>,
    pub environment: Option<String>,
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppFeatures {
    pub notifications: NotificationSettings,
    pub dashboard: DashboardSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub email: bool,
    pub push: bool,
    pub sms: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardSettings {
    pub default_view: Option<String>,
    pub show_metrics: bool,
    pub auto_refresh: u32,
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.system
            .as_ref()
            .and_then(|s| s.environment.as_deref())
            .is_some_and(|env| env.eq_ignore_ascii_case("development"))
    }
}

/// Owner and contact details (`business` domain).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BusinessProfile {
    pub owner: Option<Owner>,
    pub contacts: Option<Contacts>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Owner {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub title: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Contacts {
    pub primary: Option<PrimaryContact>,
    pub social: Option<SocialLinks>,
    pub business: Option<BusinessDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PrimaryContact {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SocialLinks {
    pub linkedin: Option<String>,
    pub website: Option<String>,
    pub github: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BusinessDetails {
    pub company_name: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

impl BusinessProfile {
    /// Company name, or a generic placeholder when the profile has none.
    pub fn company_display_name(&self) -> &str {
        self.contacts
            .as_ref()
            .and_then(|c| c.business.as_ref())
            .and_then(|b| b.company_name.as_deref())
            .unwrap_or(DEFAULT_COMPANY_NAME)
    }
}

/// Presentation settings (`ui` domain).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    pub preferences: Option<Preferences>,
    pub branding: Option<Branding>,
    pub layout: Option<Layout>,
    pub themes: Option<Themes>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    pub theme: Option<String>,
    pub language: Option<String>,
    pub timezone: Option<String>,
    pub date_format: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Branding {
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub logo: Option<String>,
    pub favicon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Layout {
    pub sidebar_collapsed: bool,
    pub header_fixed: bool,
    pub footer_visible: bool,
    pub breadcrumbs_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Themes {
    pub available: Vec<String>,
    #[serde(rename = "default")]
    pub default_theme: Option<String>,
    pub custom_css: Option<String>,
}

impl UiConfig {
    pub fn primary_color(&self) -> &str {
        self.branding
            .as_ref()
            .and_then(|b| b.primary_color.as_deref())
            .unwrap_or(DEFAULT_PRIMARY_COLOR)
    }

    pub fn current_theme(&self) -> &str {
        self.preferences
            .as_ref()
            .and_then(|p| p.theme.as_deref())
            .unwrap_or(DEFAULT_THEME)
    }
}

/// Feature toggles (`features` domain).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub features: FeatureGroups,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureGroups {
    pub beta: BetaFeatures,
    pub experimental: ExperimentalFeatures,
    pub modules: ModuleFeatures,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BetaFeatures {
    pub new_dashboard: bool,
    pub advanced_reports: bool,
    pub ai_assistant: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperimentalFeatures {
    pub dark_mode_v2: bool,
    pub real_time_sync: bool,
    pub voice_commands: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModuleFeatures {
    pub invoicing: bool,
    pub time_tracking: bool,
    pub client_management: bool,
    pub analytics: bool,
    pub integrations: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Permissions {
    pub can_export_data: bool,
    pub can_modify_settings: bool,
    pub can_access_beta_features: bool,
}

impl FeatureFlags {
    /// Whether the given flag is switched on.
    pub fn is_enabled(&self, key: FeatureKey) -> bool {
        let groups = &self.features;
        match key {
            FeatureKey::Invoicing => groups.modules.invoicing,
            FeatureKey::TimeTracking => groups.modules.time_tracking,
            FeatureKey::ClientManagement => groups.modules.client_management,
            FeatureKey::Analytics => groups.modules.analytics,
            FeatureKey::Integrations => groups.modules.integrations,
            FeatureKey::NewDashboard => groups.beta.new_dashboard,
            FeatureKey::AdvancedReports => groups.beta.advanced_reports,
            FeatureKey::AiAssistant => groups.beta.ai_assistant,
            FeatureKey::DarkModeV2 => groups.experimental.dark_mode_v2,
            FeatureKey::RealTimeSync => groups.experimental.real_time_sync,
            FeatureKey::VoiceCommands => groups.experimental.voice_commands,
        }
    }
}

/// Typed view of one document, decoded once when the document is loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigModel {
    App(AppConfig),
    Business(BusinessProfile),
    Ui(UiConfig),
    FeatureFlags(FeatureFlags),
}

impl ConfigModel {
    /// Decode `value` into the model of `domain`.
    pub fn decode(domain: Domain, value: &serde_json::Value) -> Result<Self, ConfigError> {
        Ok(match domain {
            Domain::App => ConfigModel::App(decode(domain, value)?),
            Domain::Business => ConfigModel::Business(decode(domain, value)?),
            Domain::Ui => ConfigModel::Ui(decode(domain, value)?),
            Domain::FeatureFlags => ConfigModel::FeatureFlags(decode(domain, value)?),
        })
    }

    pub fn defaults(domain: Domain) -> Self {
        match domain {
            Domain::App => ConfigModel::App(AppConfig::default()),
            Domain::Business => ConfigModel::Business(BusinessProfile::default()),
            Domain::Ui => ConfigModel::Ui(UiConfig::default()),
            Domain::FeatureFlags => ConfigModel::FeatureFlags(FeatureFlags::default()),
        }
    }
}

fn decode<T: DeserializeOwned>(domain: Domain, value: &serde_json::Value) -> Result<T, ConfigError> {
    T::deserialize(value).map_err(|e| ConfigError::Parse {
        domain,
        reason: e.to_string(),
    })
}

/// A model type bound to the domain whose documents it describes.
pub trait DomainModel: Default {
    const DOMAIN: Domain;

    fn view(model: &ConfigModel) -> Option<&Self>;
}

macro_rules! domain_model {
    ($ty:ty, $variant:ident) => {
        impl DomainModel for $ty {
            const DOMAIN: Domain = Domain::$variant;

            fn view(model: &ConfigModel) -> Option<&Self> {
                match model {
                    ConfigModel::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

domain_model!(AppConfig, App);
domain_model!(BusinessProfile, Business);
domain_model!(UiConfig, Ui);
domain_model!(FeatureFlags, FeatureFlags);
