//! Metadata published for consumers, and package identity

use cpkg_types::{Options, SettingKey, Settings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

fn default_includedirs() -> Vec<PathBuf> {
    vec![PathBuf::from("include")]
}

fn default_libdirs() -> Vec<PathBuf> {
    vec![PathBuf::from("lib")]
}

fn default_bindirs() -> Vec<PathBuf> {
    vec![PathBuf::from("bin")]
}

/// Link and compile metadata of a package or component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CppInfo {
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub system_libs: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<String>,
    #[serde(default = "default_includedirs")]
    pub includedirs: Vec<PathBuf>,
    #[serde(default = "default_libdirs")]
    pub libdirs: Vec<PathBuf>,
    #[serde(default = "default_bindirs")]
    pub bindirs: Vec<PathBuf>,
    #[serde(default)]
    pub resdirs: Vec<PathBuf>,
    /// Generator hints such as `cmake_file_name` or `pkg_config_name`
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Default for CppInfo {
    fn default() -> Self {
        Self {
            libs: Vec::new(),
            defines: Vec::new(),
            system_libs: Vec::new(),
            frameworks: Vec::new(),
            includedirs: default_includedirs(),
            libdirs: default_libdirs(),
            bindirs: default_bindirs(),
            resdirs: Vec::new(),
            properties: BTreeMap::new(),
        }
    }
}

impl CppInfo {
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<String>) {
        self.properties.insert(key.to_string(), value.into());
    }
}

/// An environment contribution; paths are relative to the package root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EnvAction {
    AppendPath { name: String, path: PathBuf },
    DefinePath { name: String, path: PathBuf },
    Define { name: String, value: String },
}

/// A configuration entry exported to consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConfValue {
    /// Relative to the package root
    Path(PathBuf),
    Text(String),
}

/// Everything a consumer learns about a package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    #[serde(flatten)]
    pub cpp: CppInfo,
    #[serde(default)]
    pub components: BTreeMap<String, CppInfo>,
    #[serde(default)]
    pub env: Vec<EnvAction>,
    #[serde(default)]
    pub conf: BTreeMap<String, ConfValue>,
}

impl PackageInfo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Headers only: no library or binary directories
    #[must_use]
    pub fn header_only() -> Self {
        let mut info = Self::default();
        info.cpp.libdirs.clear();
        info.cpp.bindirs.clear();
        info
    }

    /// Executables only: no include or library directories
    #[must_use]
    pub fn application() -> Self {
        let mut info = Self::default();
        info.cpp.includedirs.clear();
        info.cpp.libdirs.clear();
        info
    }

    /// Append `bin` (or another folder) to `PATH`
    pub fn append_path(&mut self, path: impl Into<PathBuf>) {
        self.env.push(EnvAction::AppendPath {
            name: "PATH".to_string(),
            path: path.into(),
        });
    }

    #[must_use]
    pub fn component(&self, name: &str) -> Option<&CppInfo> {
        self.components.get(name)
    }

    /// Every define, including those of components
    pub fn all_defines(&self) -> impl Iterator<Item = &str> {
        self.cpp
            .defines
            .iter()
            .chain(self.components.values().flat_map(|c| c.defines.iter()))
            .map(String::as_str)
    }
}

/// Inputs that determine binary compatibility
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageIdInfo {
    pub settings: BTreeMap<String, String>,
    pub options: BTreeMap<String, String>,
    pub requires: Vec<String>,
}

impl PackageIdInfo {
    #[must_use]
    pub fn new(settings: &Settings, options: &Options, requires: Vec<String>) -> Self {
        let mut requires = requires;
        requires.sort();
        Self {
            settings: settings.to_pairs(),
            options: options.to_pairs(),
            requires,
        }
    }

    /// Erase everything: one binary fits every configuration
    #[must_use]
    pub fn clear(self) -> Self {
        Self::default()
    }

    /// Erase a setting dimension and its sub-settings
    #[must_use]
    pub fn without_setting(mut self, key: SettingKey) -> Self {
        let name = key.as_str();
        let prefix = format!("{name}.");
        self.settings
            .retain(|k, _| k != name && !k.starts_with(&prefix));
        self
    }

    /// BLAKE3 digest of the canonical JSON form
    #[must_use]
    pub fn package_id(&self) -> String {
        // BTreeMaps serialize in key order, so the encoding is canonical
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        cpkg_hash::content_id(&canonical)
    }
}
