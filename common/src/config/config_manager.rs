use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

use super::{
    ConfigContentProvider, ConfigSerializer, FileContentConfigProvider, Validate,
    YamlConfigSerializer,
};

/// Loads, validates and caches a serde document kept behind a content provider.
pub struct ConfigManager<TConfigContentProvider, TConfig, TConfigSerializer = YamlConfigSerializer>
where
    TConfigContentProvider: ConfigContentProvider,
    TConfig: Clone + for<'de> Deserialize<'de> + Serialize + Validate + Default,
    TConfigSerializer: ConfigSerializer<TConfig>,
{
    config_serializer: TConfigSerializer,
    config_content_provider: TConfigContentProvider,
    config: Mutex<Option<TConfig>>,
}

impl<TConfig> ConfigManager<FileContentConfigProvider, TConfig, YamlConfigSerializer>
where
    TConfig: Clone + for<'de> Deserialize<'de> + Serialize + Validate + Default,
{
    pub fn from_yaml_file(file_path: impl Into<PathBuf>) -> Self {
        Self::new(
            FileContentConfigProvider::new(file_path),
            YamlConfigSerializer::new(),
        )
    }
}

impl<TConfigContentProvider, TConfig, TConfigSerializer>
    ConfigManager<TConfigContentProvider, TConfig, TConfigSerializer>
where
    TConfigContentProvider: ConfigContentProvider,
    TConfig: Clone + for<'de> Deserialize<'de> + Serialize + Validate + Default,
    TConfigSerializer: ConfigSerializer<TConfig>,
{
    pub fn new(
        config_content_provider: TConfigContentProvider,
        config_serializer: TConfigSerializer,
    ) -> Self {
        Self {
            config_serializer,
            config_content_provider,
            config: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> &TConfigContentProvider {
        &self.config_content_provider
    }

    pub fn get_config(&self) -> Result<TConfig, String> {
        let mut current = self
            .config
            .lock()
            .map_err(|_| "Config cache poisoned".to_string())?;

        if let Some(config) = current.as_ref() {
            return Ok(config.clone());
        }

        let Some(config_data) = self.config_content_provider.get_config_content()? else {
            return Ok(TConfig::default());
        };

        let config = self.config_serializer.deserialize(&config_data)?;
        config
            .validate()
            .map_err(|e| format!("Config validation error: {}", e))?;

        *current = Some(config.clone());
        Ok(config)
    }

    pub fn set_config(&self, config: &TConfig) -> Result<(), String> {
        config
            .validate()
            .map_err(|e| format!("Config validation error: {}", e))?;

        let serialized_config = self.config_serializer.serialize(config)?;
        self.config_content_provider
            .set_config_content(&serialized_config)?;

        let mut current = self
            .config
            .lock()
            .map_err(|_| "Config cache poisoned".to_string())?;
        *current = Some(config.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InMemoryContentProvider;

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Volume {
        level: u32,
    }

    impl Validate for Volume {
        fn validate(&self) -> Result<(), String> {
            if self.level > 100 {
                return Err("Volume must be at most 100".to_string());
            }
            Ok(())
        }
    }

    fn manager(content: Option<&str>) -> ConfigManager<InMemoryContentProvider, Volume> {
        let provider = match content {
            Some(c) => InMemoryContentProvider::with_content(c),
            None => InMemoryContentProvider::new(),
        };
        ConfigManager::new(provider, YamlConfigSerializer::new())
    }

    #[test]
    fn test_empty_store_yields_default() {
        assert_eq!(manager(None).get_config().unwrap(), Volume::default());
    }

    #[test]
    fn test_loads_and_caches() {
        let manager = manager(Some("level: 40\n"));
        assert_eq!(manager.get_config().unwrap().level, 40);
        manager.provider().set_config_content("level: 90\n").unwrap();
        assert_eq!(manager.get_config().unwrap().level, 40);
    }

    #[test]
    fn test_invalid_document_is_rejected() {
        let err = manager(Some("level: 400\n")).get_config().unwrap_err();
        assert!(err.contains("Volume must be at most 100"));
    }

    #[test]
    fn test_set_config_validates_before_writing() {
        let manager = manager(None);
        assert!(manager.set_config(&Volume { level: 101 }).is_err());
        assert_eq!(manager.provider().content(), None);

        manager.set_config(&Volume { level: 7 }).unwrap();
        assert_eq!(manager.get_config().unwrap().level, 7);
        assert!(manager.provider().content().unwrap().contains("level: 7"));
    }
}
