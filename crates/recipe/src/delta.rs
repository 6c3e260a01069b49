//! Configuration deltas returned by config-options and configure

use crate::context::RecipeContext;
use cpkg_types::{OptionKey, Os, SettingKey};

/// Options and settings a phase wants removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDelta {
    pub remove_options: Vec<OptionKey>,
    pub remove_settings: Vec<SettingKey>,
}

impl ConfigDelta {
    /// A delta that changes nothing
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn remove_option(mut self, key: OptionKey) -> Self {
        if !self.remove_options.contains(&key) {
            self.remove_options.push(key);
        }
        self
    }

    #[must_use]
    pub fn remove_setting(mut self, key: SettingKey) -> Self {
        if !self.remove_settings.contains(&key) {
            self.remove_settings.push(key);
        }
        self
    }

    /// Remove `compiler.libcxx` and `compiler.cppstd`, as pure C projects do
    #[must_use]
    pub fn c_only(self) -> Self {
        self.remove_setting(SettingKey::CompilerLibcxx)
            .remove_setting(SettingKey::CompilerCppstd)
    }

    /// Remove `fPIC` when targeting Windows
    #[must_use]
    pub fn fpic_unless_windows(self, ctx: &RecipeContext) -> Self {
        if ctx.settings().os == Some(Os::Windows) {
            self.remove_option(OptionKey::FPIC)
        } else {
            self
        }
    }

    /// Remove `fPIC` when building shared libraries
    #[must_use]
    pub fn fpic_unless_static(self, ctx: &RecipeContext) -> Self {
        if ctx.shared() {
            self.remove_option(OptionKey::FPIC)
        } else {
            self
        }
    }

    /// Combine two deltas
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        for key in other.remove_options {
            self = self.remove_option(key);
        }
        for key in other.remove_settings {
            self = self.remove_setting(key);
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remove_options.is_empty() && self.remove_settings.is_empty()
    }
}
