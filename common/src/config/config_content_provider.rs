use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

/// Raw storage behind a [`super::ConfigManager`]. `Ok(None)` means nothing
/// has been stored yet and the caller should fall back to defaults.
pub trait ConfigContentProvider {
    fn get_config_content(&self) -> Result<Option<String>, String>;
    fn set_config_content(&self, content: &str) -> Result<(), String>;
}

pub struct FileContentConfigProvider {
    file_path: PathBuf,
}

impl FileContentConfigProvider {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }
}

impl ConfigContentProvider for FileContentConfigProvider {
    fn get_config_content(&self) -> Result<Option<String>, String> {
        match std::fs::read_to_string(&self.file_path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(format!(
                "Failed to read {}: {}",
                self.file_path.display(),
                err
            )),
        }
    }

    fn set_config_content(&self, content: &str) -> Result<(), String> {
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
        std::fs::write(&self.file_path, content)
            .map_err(|e| format!("Failed to write {}: {}", self.file_path.display(), e))
    }
}

#[derive(Default)]
pub struct InMemoryContentProvider {
    content: Mutex<Option<String>>,
}

impl InMemoryContentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: &str) -> Self {
        Self {
            content: Mutex::new(Some(content.to_string())),
        }
    }

    pub fn content(&self) -> Option<String> {
        self.content
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(None)
    }
}

impl ConfigContentProvider for InMemoryContentProvider {
    fn get_config_content(&self) -> Result<Option<String>, String> {
        let guard = self
            .content
            .lock()
            .map_err(|_| "In-memory store poisoned".to_string())?;
        Ok(guard.clone())
    }

    fn set_config_content(&self, content: &str) -> Result<(), String> {
        let mut guard = self
            .content
            .lock()
            .map_err(|_| "In-memory store poisoned".to_string())?;
        *guard = Some(content.to_string());
        Ok(())
    }
}
