#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]
//! Recipe execution for cpkg
//!
//! This crate runs recipes: it fetches and extracts sources, writes toolchain
//! and dependency files, drives CMake, Autotools, MSBuild or plain make,
//! assembles the package tree and publishes it into the local package cache.

pub mod build_systems;
pub mod cache;
mod engine;
pub mod extract;
pub mod fetch;
pub mod generators;
pub mod packager;
pub mod patch;
pub mod paths;
pub mod runner;

pub use build_systems::{for_tool, BuildSystem, BuildSystemContext};
pub use cache::{CacheEntry, CommitOutcome, PackageCache, PackageMetadata};
pub use engine::{CreateOutcome, Engine, Evaluation};
pub use extract::{extract_archive, ArchiveFormat};
pub use fetch::Fetcher;
pub use generators::GeneratedFile;
pub use packager::{extract_section, run_plan, PackageRoots};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, RecordingRunner, SystemRunner};
