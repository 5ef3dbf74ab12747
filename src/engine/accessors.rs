//! Typed read helpers over the current snapshots.

use crate::domain::models::{AppConfig, BusinessProfile, DomainModel, FeatureFlags, UiConfig};
use crate::domain::{ConfigError, FeatureKey};
use crate::engine::ConfigEngine;

impl ConfigEngine {
    /// Read the typed view of a model's domain, or the model's defaults when
    /// the domain has no snapshot.
    fn with_model<T: DomainModel, R>(&self, read: impl FnOnce(&T) -> R) -> R {
        let snapshot = self.store.try_read(T::DOMAIN);
        match snapshot.as_deref().and_then(|s| T::view(s.document.model())) {
            Some(model) => read(model),
            None => read(&T::default()),
        }
    }

    /// Look up a flag by name. Unknown names are an error, not `false`.
    pub fn is_feature_enabled(&self, name: &str) -> Result<bool, ConfigError> {
        let key: FeatureKey = name.parse()?;
        Ok(self.feature_enabled(key))
    }

    pub fn feature_enabled(&self, key: FeatureKey) -> bool {
        self.with_model(|flags: &FeatureFlags| flags.is_enabled(key))
    }

    pub fn company_display_name(&self) -> String {
        self.with_model(|profile: &BusinessProfile| profile.company_display_name().to_string())
    }

    pub fn primary_color(&self) -> String {
        self.with_model(|ui: &UiConfig| ui.primary_color().to_string())
    }

    pub fn current_theme(&self) -> String {
        self.with_model(|ui: &UiConfig| ui.current_theme().to_string())
    }

    pub fn is_development_environment(&self) -> bool {
        self.with_model(|app: &AppConfig| app.is_development())
    }
}
