//! Build settings supplied by the profile
//!
//! Settings describe the target platform and toolchain. They are never
//! invented by a recipe: the engine restricts the profile to the dimensions a
//! recipe declares, and recipes may only remove dimensions afterwards.

use crate::version::Version;
use cpkg_errors::RecipeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

macro_rules! setting_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $setting:literal {
            $( $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// All values accepted for this setting
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = RecipeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| RecipeError::InvalidSettingValue {
                        setting: $setting.to_string(),
                        value: s.to_string(),
                    })
            }
        }
    };
}

setting_enum! {
    /// Target operating system
    Os, "os" {
        Windows => "Windows",
        Linux => "Linux",
        Macos => "Macos",
        FreeBsd => "FreeBSD",
        Android => "Android",
        Ios => "iOS",
    }
}

setting_enum! {
    /// Target CPU architecture
    Arch, "arch" {
        X86 => "x86",
        X86_64 => "x86_64",
        Armv7 => "armv7",
        Armv8 => "armv8",
        Ppc64le => "ppc64le",
    }
}

setting_enum! {
    /// Compiler family
    CompilerKind, "compiler" {
        Gcc => "gcc",
        Clang => "clang",
        AppleClang => "apple-clang",
        Msvc => "msvc",
        VisualStudio => "Visual Studio",
        IntelCc => "intel-cc",
    }
}

setting_enum! {
    /// C++ standard library flavour
    LibCxx, "compiler.libcxx" {
        Libstdcxx => "libstdc++",
        Libstdcxx11 => "libstdc++11",
        Libcxx => "libc++",
    }
}

setting_enum! {
    /// MSVC runtime linkage
    MsvcRuntime, "compiler.runtime" {
        Static => "static",
        Dynamic => "dynamic",
    }
}

setting_enum! {
    /// Build configuration
    BuildType, "build_type" {
        Debug => "Debug",
        Release => "Release",
        RelWithDebInfo => "RelWithDebInfo",
        MinSizeRel => "MinSizeRel",
    }
}

impl Os {
    /// The OS this process runs on
    #[must_use]
    pub fn host() -> Option<Self> {
        match std::env::consts::OS {
            "windows" => Some(Self::Windows),
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::Macos),
            "freebsd" => Some(Self::FreeBsd),
            "android" => Some(Self::Android),
            "ios" => Some(Self::Ios),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_apple(self) -> bool {
        matches!(self, Self::Macos | Self::Ios)
    }
}

impl Arch {
    /// The architecture this process runs on
    #[must_use]
    pub fn host() -> Option<Self> {
        match std::env::consts::ARCH {
            "x86" => Some(Self::X86),
            "x86_64" => Some(Self::X86_64),
            "arm" => Some(Self::Armv7),
            "aarch64" => Some(Self::Armv8),
            "powerpc64" => Some(Self::Ppc64le),
            _ => None,
        }
    }
}

impl CompilerKind {
    /// Whether this is one of the Microsoft compiler spellings
    #[must_use]
    pub fn is_msvc(self) -> bool {
        matches!(self, Self::Msvc | Self::VisualStudio)
    }

    #[must_use]
    pub fn is_clang(self) -> bool {
        matches!(self, Self::Clang | Self::AppleClang)
    }
}

/// A C++ language standard such as `17` or `gnu20`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CppStd {
    year: u16,
    gnu: bool,
}

impl CppStd {
    /// Standard from a two-digit year (98, 11, 14, 17, 20, 23)
    #[must_use]
    pub const fn new(short_year: u16) -> Self {
        let year = if short_year >= 98 {
            1900 + short_year
        } else {
            2000 + short_year
        };
        Self { year, gnu: false }
    }

    #[must_use]
    pub const fn gnu(self) -> Self {
        Self {
            year: self.year,
            gnu: true,
        }
    }

    /// Four-digit year, used for ordering
    #[must_use]
    pub fn year(self) -> u16 {
        self.year
    }

    #[must_use]
    pub fn is_gnu(self) -> bool {
        self.gnu
    }

    /// Two-digit spelling without the gnu prefix
    #[must_use]
    pub fn short(self) -> u16 {
        self.year % 100
    }
}

impl PartialOrd for CppStd {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CppStd {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.year.cmp(&other.year).then(self.gnu.cmp(&other.gnu))
    }
}

impl fmt::Display for CppStd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.gnu {
            write!(f, "gnu{:02}", self.short())
        } else {
            write!(f, "{:02}", self.short())
        }
    }
}

impl FromStr for CppStd {
    type Err = RecipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (gnu, digits) = match trimmed.strip_prefix("gnu") {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        match digits.parse::<u16>() {
            Ok(short @ (98 | 3 | 11 | 14 | 17 | 20 | 23 | 26)) => {
                let std = Self::new(short);
                Ok(if gnu { std.gnu() } else { std })
            }
            _ => Err(RecipeError::InvalidSettingValue {
                setting: "compiler.cppstd".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for CppStd {
    type Error = RecipeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CppStd> for String {
    fn from(value: CppStd) -> Self {
        value.to_string()
    }
}

/// Compiler identity and its sub-settings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Compiler {
    pub kind: CompilerKind,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libcxx: Option<LibCxx>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cppstd: Option<CppStd>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<MsvcRuntime>,
}

impl Compiler {
    #[must_use]
    pub fn new(kind: CompilerKind, version: Version) -> Self {
        Self {
            kind,
            version,
            libcxx: None,
            cppstd: None,
            runtime: None,
        }
    }

    #[must_use]
    pub fn with_libcxx(mut self, libcxx: LibCxx) -> Self {
        self.libcxx = Some(libcxx);
        self
    }

    #[must_use]
    pub fn with_cppstd(mut self, cppstd: CppStd) -> Self {
        self.cppstd = Some(cppstd);
        self
    }

    #[must_use]
    pub fn with_runtime(mut self, runtime: MsvcRuntime) -> Self {
        self.runtime = Some(runtime);
        self
    }
}

/// Addressable setting dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SettingKey {
    #[serde(rename = "os")]
    Os,
    #[serde(rename = "arch")]
    Arch,
    #[serde(rename = "compiler")]
    Compiler,
    #[serde(rename = "compiler.libcxx")]
    CompilerLibcxx,
    #[serde(rename = "compiler.cppstd")]
    CompilerCppstd,
    #[serde(rename = "compiler.runtime")]
    CompilerRuntime,
    #[serde(rename = "build_type")]
    BuildType,
}

impl SettingKey {
    /// The four top-level dimensions most compiled recipes declare
    pub const STANDARD: &'static [Self] = &[Self::Os, Self::Arch, Self::Compiler, Self::BuildType];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Os => "os",
            Self::Arch => "arch",
            Self::Compiler => "compiler",
            Self::CompilerLibcxx => "compiler.libcxx",
            Self::CompilerCppstd => "compiler.cppstd",
            Self::CompilerRuntime => "compiler.runtime",
            Self::BuildType => "build_type",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The settings a recipe instance sees
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<Os>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<Arch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<Compiler>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_type: Option<BuildType>,
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_os(mut self, os: Os) -> Self {
        self.os = Some(os);
        self
    }

    #[must_use]
    pub fn with_arch(mut self, arch: Arch) -> Self {
        self.arch = Some(arch);
        self
    }

    #[must_use]
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = Some(compiler);
        self
    }

    #[must_use]
    pub fn with_build_type(mut self, build_type: BuildType) -> Self {
        self.build_type = Some(build_type);
        self
    }

    /// Compiler family, if a compiler is set
    #[must_use]
    pub fn compiler_kind(&self) -> Option<CompilerKind> {
        self.compiler.as_ref().map(|c| c.kind)
    }

    #[must_use]
    pub fn compiler_version(&self) -> Option<&Version> {
        self.compiler.as_ref().map(|c| &c.version)
    }

    #[must_use]
    pub fn cppstd(&self) -> Option<CppStd> {
        self.compiler.as_ref().and_then(|c| c.cppstd)
    }

    #[must_use]
    pub fn libcxx(&self) -> Option<LibCxx> {
        self.compiler.as_ref().and_then(|c| c.libcxx)
    }

    #[must_use]
    pub fn is_msvc(&self) -> bool {
        self.compiler_kind().is_some_and(CompilerKind::is_msvc)
    }

    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == Some(Os::Windows)
    }

    /// Whether a dimension is currently present
    #[must_use]
    pub fn has(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::Os => self.os.is_some(),
            SettingKey::Arch => self.arch.is_some(),
            SettingKey::Compiler => self.compiler.is_some(),
            SettingKey::CompilerLibcxx => self.libcxx().is_some(),
            SettingKey::CompilerCppstd => self.cppstd().is_some(),
            SettingKey::CompilerRuntime => self.compiler.as_ref().is_some_and(|c| c.runtime.is_some()),
            SettingKey::BuildType => self.build_type.is_some(),
        }
    }

    /// A copy with one dimension removed
    #[must_use]
    pub fn without(&self, key: SettingKey) -> Self {
        let mut next = self.clone();
        match key {
            SettingKey::Os => next.os = None,
            SettingKey::Arch => next.arch = None,
            SettingKey::Compiler => next.compiler = None,
            SettingKey::CompilerLibcxx => {
                if let Some(c) = next.compiler.as_mut() {
                    c.libcxx = None;
                }
            }
            SettingKey::CompilerCppstd => {
                if let Some(c) = next.compiler.as_mut() {
                    c.cppstd = None;
                }
            }
            SettingKey::CompilerRuntime => {
                if let Some(c) = next.compiler.as_mut() {
                    c.runtime = None;
                }
            }
            SettingKey::BuildType => next.build_type = None,
        }
        next
    }

    /// A copy keeping only the top-level dimensions listed in `declared`
    #[must_use]
    pub fn restricted_to(&self, declared: &[SettingKey]) -> Self {
        [
            SettingKey::Os,
            SettingKey::Arch,
            SettingKey::Compiler,
            SettingKey::BuildType,
        ]
        .into_iter()
        .filter(|key| !declared.contains(key))
        .fold(self.clone(), |acc, key| acc.without(key))
    }

    /// Flatten into sorted `key -> value` pairs
    #[must_use]
    pub fn to_pairs(&self) -> BTreeMap<String, String> {
        let mut pairs = BTreeMap::new();
        if let Some(os) = self.os {
            pairs.insert("os".to_string(), os.to_string());
        }
        if let Some(arch) = self.arch {
            pairs.insert("arch".to_string(), arch.to_string());
        }
        if let Some(compiler) = &self.compiler {
            pairs.insert("compiler".to_string(), compiler.kind.to_string());
            pairs.insert("compiler.version".to_string(), compiler.version.to_string());
            if let Some(libcxx) = compiler.libcxx {
                pairs.insert("compiler.libcxx".to_string(), libcxx.to_string());
            }
            if let Some(cppstd) = compiler.cppstd {
                pairs.insert("compiler.cppstd".to_string(), cppstd.to_string());
            }
            if let Some(runtime) = compiler.runtime {
                pairs.insert("compiler.runtime".to_string(), runtime.to_string());
            }
        }
        if let Some(build_type) = self.build_type {
            pairs.insert("build_type".to_string(), build_type.to_string());
        }
        pairs
    }

    /// Build settings from `key -> value` pairs
    ///
    /// # Errors
    /// Returns an error for unknown keys, values outside a setting's domain, or
    /// compiler sub-settings without a compiler and version.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, RecipeError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut settings = Self::default();
        let mut compiler_kind = None;
        let mut compiler_version = None;
        let mut libcxx = None;
        let mut cppstd = None;
        let mut runtime = None;

        for (key, value) in pairs {
            match key.trim() {
                "os" => settings.os = Some(value.parse()?),
                "arch" => settings.arch = Some(value.parse()?),
                "build_type" => settings.build_type = Some(value.parse()?),
                "compiler" => compiler_kind = Some(value.parse::<CompilerKind>()?),
                "compiler.version" => {
                    compiler_version = Some(Version::parse(value).map_err(|_| {
                        RecipeError::InvalidSettingValue {
                            setting: "compiler.version".to_string(),
                            value: value.to_string(),
                        }
                    })?);
                }
                "compiler.libcxx" => libcxx = Some(value.parse::<LibCxx>()?),
                "compiler.cppstd" => cppstd = Some(value.parse::<CppStd>()?),
                "compiler.runtime" => runtime = Some(value.parse::<MsvcRuntime>()?),
                other => {
                    return Err(RecipeError::UnknownSetting {
                        setting: other.to_string(),
                    })
                }
            }
        }

        match (compiler_kind, compiler_version) {
            (Some(kind), Some(version)) => {
                settings.compiler = Some(Compiler {
                    kind,
                    version,
                    libcxx,
                    cppstd,
                    runtime,
                });
            }
            (Some(_), None) => {
                return Err(RecipeError::MissingSetting {
                    recipe: "profile".to_string(),
                    setting: "compiler.version".to_string(),
                })
            }
            (None, _) if libcxx.is_some() || cppstd.is_some() || runtime.is_some() => {
                return Err(RecipeError::MissingSetting {
                    recipe: "profile".to_string(),
                    setting: "compiler".to_string(),
                })
            }
            (None, _) => {}
        }

        Ok(settings)
    }

    /// A copy with `key=value` overrides layered on top
    ///
    /// # Errors
    /// Returns an error if an override names an unknown setting or an invalid value.
    pub fn with_overrides(&self, overrides: &[(String, String)]) -> Result<Self, RecipeError> {
        let mut pairs = self.to_pairs();
        for (key, value) in overrides {
            pairs.insert(key.clone(), value.clone());
        }
        Self::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .to_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Parse a `key=value` argument as used by `-s` and `-o` flags
///
/// # Errors
/// Returns an error if the argument has no `=` or an empty key.
pub fn parse_assignment(input: &str) -> Result<(String, String), RecipeError> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(RecipeError::UnknownSetting {
            setting: input.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux_gcc() -> Settings {
        Settings::from_pairs([
            ("os", "Linux"),
            ("arch", "x86_64"),
            ("compiler", "gcc"),
            ("compiler.version", "12"),
            ("compiler.libcxx", "libstdc++11"),
            ("compiler.cppstd", "17"),
            ("build_type", "Release"),
        ])
        .unwrap()
    }

    #[test]
    fn parses_profile_pairs() {
        let settings = linux_gcc();
        assert_eq!(settings.os, Some(Os::Linux));
        assert_eq!(settings.compiler_kind(), Some(CompilerKind::Gcc));
        assert_eq!(settings.cppstd(), Some(CppStd::new(17)));
        assert_eq!(settings.libcxx(), Some(LibCxx::Libstdcxx11));
    }

    #[test]
    fn pairs_round_trip_in_sorted_order() {
        let settings = linux_gcc();
        let pairs = settings.to_pairs();
        let keys: Vec<_> = pairs.keys().cloned().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        let again =
            Settings::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))).unwrap();
        assert_eq!(again, settings);
    }

    #[test]
    fn without_removes_sub_settings() {
        let settings = linux_gcc()
            .without(SettingKey::CompilerCppstd)
            .without(SettingKey::CompilerLibcxx);
        assert!(settings.compiler.is_some());
        assert!(!settings.has(SettingKey::CompilerCppstd));
        assert!(!settings.has(SettingKey::CompilerLibcxx));
    }

    #[test]
    fn restricted_to_drops_undeclared_dimensions() {
        let settings = linux_gcc().restricted_to(&[SettingKey::Os, SettingKey::Arch]);
        assert_eq!(settings.os, Some(Os::Linux));
        assert!(settings.compiler.is_none());
        assert!(settings.build_type.is_none());
    }

    #[test]
    fn overrides_replace_profile_values() {
        let settings = linux_gcc()
            .with_overrides(&[("compiler.version".into(), "9".into())])
            .unwrap();
        assert_eq!(settings.compiler_version().unwrap().major(), 9);
    }

    #[test]
    fn rejects_unknown_keys_and_values() {
        assert!(matches!(
            Settings::from_pairs([("distro", "debian")]),
            Err(RecipeError::UnknownSetting { .. })
        ));
        assert!(matches!(
            Settings::from_pairs([("os", "Plan9")]),
            Err(RecipeError::InvalidSettingValue { .. })
        ));
        assert!(matches!(
            Settings::from_pairs([("compiler", "gcc")]),
            Err(RecipeError::MissingSetting { .. })
        ));
    }

    #[test]
    fn cppstd_ordering_and_spelling() {
        let gnu17: CppStd = "gnu17".parse().unwrap();
        assert!(gnu17.is_gnu());
        assert_eq!(gnu17.to_string(), "gnu17");
        assert!(CppStd::new(98) < CppStd::new(11));
        assert!(CppStd::new(14) < CppStd::new(17));
        assert!("19".parse::<CppStd>().is_err());
    }

    #[test]
    fn assignments() {
        assert_eq!(
            parse_assignment("os=Windows").unwrap(),
            ("os".to_string(), "Windows".to_string())
        );
        assert!(parse_assignment("=x").is_err());
        assert!(parse_assignment("shared").is_err());
    }
}
