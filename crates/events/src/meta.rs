use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Subsystem that originated an event, used as the `source` log field
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventSource(Cow<'static, str>);

impl EventSource {
    pub const GENERAL: Self = Self::const_str("general");
    pub const LIFECYCLE: Self = Self::const_str("lifecycle");
    pub const SOURCE: Self = Self::const_str("source");
    pub const BUILD: Self = Self::const_str("build");
    pub const PACKAGE: Self = Self::const_str("package");

    const fn const_str(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
