#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for cpkg
//!
//! This crate provides the vocabulary shared by recipes and the engine:
//! settings (os, arch, compiler, build type), typed option schemas,
//! loose versions and version ranges, and package references.

pub mod options;
pub mod reference;
pub mod settings;
pub mod version;

pub use options::{OptionDef, OptionDomain, OptionKey, OptionSchema, OptionValue, Options};
pub use reference::{PackageType, Reference};
pub use settings::{
    parse_assignment, Arch, BuildType, Compiler, CompilerKind, CppStd, LibCxx, MsvcRuntime, Os,
    SettingKey, Settings,
};
pub use version::{Version, VersionConstraint, VersionRange};

use serde::{Deserialize, Serialize};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    #[default]
    Tty,
    Json,
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    #[default]
    Auto,
    Never,
}

impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}
