//! Default settings profile

use cpkg_errors::Error;
use cpkg_types::{Arch, Os, Settings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `[profile]` section: the settings a build targets unless overridden
///
/// ```toml
/// [profile]
/// os = "Linux"
/// arch = "x86_64"
/// compiler = "gcc"
/// "compiler.version" = "13"
/// "compiler.libcxx" = "libstdc++11"
/// build_type = "Release"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileConfig {
    pub settings: BTreeMap<String, String>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            settings: host_profile(),
        }
    }
}

/// A profile for the machine cpkg runs on
fn host_profile() -> BTreeMap<String, String> {
    let os = Os::host();
    let mut pairs: Vec<(&str, String)> = Vec::new();
    if let Some(os) = os {
        pairs.push(("os", os.to_string()));
    }
    if let Some(arch) = Arch::host() {
        pairs.push(("arch", arch.to_string()));
    }
    pairs.push(("build_type", "Release".to_string()));

    let compiler: &[(&str, &str)] = match os {
        Some(Os::Windows) => &[
            ("compiler", "msvc"),
            ("compiler.version", "193"),
            ("compiler.runtime", "dynamic"),
            ("compiler.cppstd", "14"),
        ],
        Some(Os::Macos) => &[
            ("compiler", "apple-clang"),
            ("compiler.version", "15"),
            ("compiler.libcxx", "libc++"),
            ("compiler.cppstd", "gnu17"),
        ],
        _ => &[
            ("compiler", "gcc"),
            ("compiler.version", "13"),
            ("compiler.libcxx", "libstdc++11"),
            ("compiler.cppstd", "gnu17"),
        ],
    };
    pairs.extend(compiler.iter().map(|(k, v)| (*k, (*v).to_string())));

    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

impl ProfileConfig {
    /// Parse the profile into typed settings
    ///
    /// # Errors
    /// Returns an error if a key is not a known setting or a value is outside
    /// its domain.
    pub fn to_settings(&self) -> Result<Settings, Error> {
        Settings::from_pairs(self.settings.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .map_err(Into::into)
    }
}
