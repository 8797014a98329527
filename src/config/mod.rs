//! Application configuration — the `config.json` document.
//!
//! The document has three sections (`fileStorage`, `app`, `chat`). Every
//! field has a serde default, so a file written by an older build (or edited
//! by hand) loads with the missing keys backfilled instead of failing.

mod store;

pub use store::{config_path, ConfigError, ConfigLoad, ConfigStatus, ConfigStore};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Component, Path};

/// Sub-folder names for the five storage categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderNames {
    pub messages: String,
    pub audio: String,
    pub images: String,
    pub videos: String,
    pub files: String,
}

impl FolderNames {
    fn entries(&self) -> [&str; 5] {
        [
            &self.messages,
            &self.audio,
            &self.images,
            &self.videos,
            &self.files,
        ]
    }

    /// Put back the default for every name that isn't a plain folder name.
    /// Returns the keys that were reset.
    fn reset_invalid(&mut self) -> Vec<&'static str> {
        let defaults = Self::default();
        let mut reset = Vec::new();
        for (key, name, default) in [
            ("messages", &mut self.messages, defaults.messages),
            ("audio", &mut self.audio, defaults.audio),
            ("images", &mut self.images, defaults.images),
            ("videos", &mut self.videos, defaults.videos),
            ("files", &mut self.files, defaults.files),
        ] {
            if !is_valid_folder_name(name) {
                *name = default;
                reset.push(key);
            }
        }
        reset
    }
}

/// A folder name must be a single plain path component, so the category
/// folder always stays directly under the base path.
pub fn is_valid_folder_name(name: &str) -> bool {
    if name.trim().is_empty() {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

impl Default for FolderNames {
    fn default() -> Self {
        Self {
            messages: "messages".to_string(),
            audio: "audio".to_string(),
            images: "images".to_string(),
            videos: "videos".to_string(),
            files: "files".to_string(),
        }
    }
}

/// Where stored files live.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileStorageConfig {
    /// Ignored unless `use_custom_path` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<String>,
    pub use_custom_path: bool,
    pub folders: FolderNames,
}

impl FileStorageConfig {
    /// The custom root, if it is switched on and non-empty.
    pub fn effective_custom_path(&self) -> Option<&str> {
        match self.custom_path.as_deref() {
            Some(path) if self.use_custom_path && !path.trim().is_empty() => Some(path),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    pub version: String,
    pub language: String,
    pub theme: Theme,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "HdSome".to_string(),
            version: "1.0.0".to_string(),
            language: "zh-CN".to_string(),
            theme: Theme::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatSection {
    pub save_messages: bool,
    /// Minutes.
    pub auto_save_interval: u32,
    pub max_saved_messages: u32,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            save_messages: true,
            auto_save_interval: 5,
            max_saved_messages: 10_000,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub file_storage: FileStorageConfig,
    pub app: AppSection,
    pub chat: ChatSection,
}

impl AppConfig {
    /// Build a config from a parsed JSON document, keeping every value that
    /// fits the schema. Values that don't (a wrong type, an unknown theme)
    /// fall back to their default one by one instead of discarding the whole
    /// document. Folder names that would leave the base path are reset the
    /// same way. Returns the JSON pointers of the values that were dropped.
    pub fn from_value_lenient(raw: &Value) -> (Self, Vec<String>) {
        let (mut config, mut rejected) = match serde_json::from_value::<Self>(raw.clone()) {
            Ok(config) => (config, Vec::new()),
            Err(_) => Self::overlay_leaves(raw),
        };
        for key in config.file_storage.folders.reset_invalid() {
            rejected.push(format!("/fileStorage/folders/{}", key));
        }
        (config, rejected)
    }

    fn overlay_leaves(raw: &Value) -> (Self, Vec<String>) {
        let mut doc = match serde_json::to_value(Self::default()) {
            Ok(doc) => doc,
            Err(_) => return (Self::default(), vec![String::new()]),
        };
        let mut leaves = Vec::new();
        collect_leaves(raw, String::new(), &mut leaves);

        let mut rejected = Vec::new();
        for (pointer, value) in leaves {
            let mut candidate = doc.clone();
            set_at_pointer(&mut candidate, &pointer, value);
            if serde_json::from_value::<Self>(candidate.clone()).is_ok() {
                doc = candidate;
            } else {
                rejected.push(pointer);
            }
        }

        let config = serde_json::from_value(doc).unwrap_or_default();
        (config, rejected)
    }

    /// Checks the storage invariants: every folder name is a single plain
    /// path component, and a switched-on custom path is a non-empty absolute
    /// path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let storage = &self.file_storage;
        if let Some(bad) = storage
            .folders
            .entries()
            .into_iter()
            .find(|name| !is_valid_folder_name(name))
        {
            return Err(ConfigError::InvalidFolderName(bad.to_string()));
        }
        if !storage.use_custom_path {
            return Ok(());
        }
        match storage.custom_path.as_deref() {
            Some(path) if !path.trim().is_empty() && Path::new(path).is_absolute() => Ok(()),
            other => Err(ConfigError::InvalidCustomPath(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}

fn collect_leaves(value: &Value, pointer: String, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let token = key.replace('~', "~0").replace('/', "~1");
                collect_leaves(child, format!("{}/{}", pointer, token), out);
            }
        }
        _ => out.push((pointer, value.clone())),
    }
}

fn set_at_pointer(doc: &mut Value, pointer: &str, value: Value) {
    if pointer.is_empty() {
        *doc = value;
        return;
    }
    let tokens: Vec<String> = pointer
        .split('/')
        .skip(1)
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect();

    let Some((last, parents)) = tokens.split_last() else {
        return;
    };

    let mut node = doc;
    for token in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else { return };
        node = map.entry(token.clone()).or_insert(Value::Null);
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(last.clone(), value);
    }
}
