use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Download, verification, extraction and patching of sources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SourceEvent {
    DownloadStarted {
        url: String,
        attempt: u32,
    },

    DownloadCompleted {
        url: String,
        bytes: u64,
    },

    /// A mirror failed; the next one (or a retry) follows
    DownloadRetry {
        url: String,
        attempt: u32,
        error: String,
    },

    /// A previously verified archive was reused from the download cache
    CacheHit {
        path: PathBuf,
    },

    Verified {
        path: PathBuf,
        checksum: String,
    },

    Extracted {
        archive: PathBuf,
        destination: PathBuf,
        entries: usize,
    },

    PatchApplied {
        description: String,
    },
}
