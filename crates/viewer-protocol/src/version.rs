use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionData {
    version_code: (u16, u16, u16),
    version_string: String,
}

impl VersionData {
    pub fn current() -> Self {
        const VERSION: &str = env!("CARGO_PKG_VERSION");
        const VERSION_MAJOR: &str = env!("CARGO_PKG_VERSION_MAJOR");
        const VERSION_MINOR: &str = env!("CARGO_PKG_VERSION_MINOR");
        const VERSION_PATCH: &str = env!("CARGO_PKG_VERSION_PATCH");
        Self {
            version_code: (
                VERSION_MAJOR.parse().unwrap_or_default(),
                VERSION_MINOR.parse().unwrap_or_default(),
                VERSION_PATCH.parse().unwrap_or_default(),
            ),
            version_string: String::from(VERSION),
        }
    }

    /// Hosts and viewers only talk when their major versions agree.
    pub fn is_compatible(&self, other: &VersionData) -> bool {
        self.version_code.0 == other.version_code.0
    }
}

impl Display for VersionData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}.{}.{})",
            self.version_string, self.version_code.0, self.version_code.1, self.version_code.2
        )
    }
}
