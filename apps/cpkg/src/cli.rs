//! Command line interface definition

use clap::{Args, Parser, Subcommand};
use cpkg_types::{parse_assignment, ColorChoice};
use std::path::PathBuf;

/// cpkg - build C and C++ packages from built-in recipes
#[derive(Parser)]
#[command(name = "cpkg")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build C and C++ packages from built-in recipes")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Args)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Settings and options layered over the configured profile
#[derive(Args, Debug, Default, Clone)]
pub struct ProfileArgs {
    /// Override a setting, e.g. `-s compiler.version=12`
    #[arg(short = 's', long = "setting", value_name = "KEY=VALUE", value_parser = parse_pair)]
    pub settings: Vec<(String, String)>,

    /// Set a recipe option, e.g. `-o shared=True`
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", value_parser = parse_pair)]
    pub options: Vec<(String, String)>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// List built-in recipes
    #[command(alias = "ls")]
    List,

    /// Show a recipe's metadata, options and versions
    Inspect {
        /// Recipe name, optionally with a version (`zlib` or `zlib/1.3`)
        recipe: String,
    },

    /// Resolve configuration and run validation without building
    Validate {
        /// Package reference (`name/version`)
        reference: String,

        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Fetch, build and package a reference into the cache
    Create {
        /// Package reference (`name/version`)
        reference: String,

        #[command(flatten)]
        profile: ProfileArgs,

        /// Number of parallel build jobs
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Keep the build folder after packaging
        #[arg(long)]
        keep_build: bool,
    },

    /// Show published metadata for cached packages
    Info {
        /// Package reference (`name/version`)
        reference: String,
    },

    /// Print the effective configuration
    Config,
}

fn parse_pair(input: &str) -> Result<(String, String), String> {
    parse_assignment(input).map_err(|_| format!("expected KEY=VALUE, got '{input}'"))
}
