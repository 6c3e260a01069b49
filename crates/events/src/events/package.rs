use cpkg_types::Reference;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Packaging and cache commit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PackageEvent {
    /// Files copied by one copy step
    FilesCopied {
        pattern: String,
        count: usize,
    },

    Removed {
        path: PathBuf,
    },

    Committed {
        reference: Reference,
        package_id: String,
        path: PathBuf,
    },

    /// A concurrent pass committed the same package first
    AlreadyCommitted {
        reference: Reference,
        package_id: String,
    },

    /// A reused entry was republished with recomputed package info
    MetadataRefreshed {
        reference: Reference,
        package_id: String,
    },
}
