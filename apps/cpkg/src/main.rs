//! cpkg - build C and C++ packages from built-in recipes
//!
//! The CLI resolves configuration, wires the engine to an event channel and
//! renders each command's result as a table or as JSON.

mod cli;
mod display;
mod error;
mod events;
mod logging;
mod report;

use crate::cli::{Cli, Commands, GlobalArgs, ProfileArgs};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::EventHandler;
use crate::report::{
    CachedPackage, CommandResult, CreateReport, RecipeDetails, RecipeSummary, ValidationReport,
};
use clap::Parser;
use cpkg_builder::Engine;
use cpkg_config::Config;
use cpkg_errors::{PackageError, RecipeError};
use cpkg_events::{EventReceiver, EventSender};
use cpkg_recipes::RecipeRegistry;
use cpkg_types::{ColorChoice, Reference, Version};
use std::process;
use tokio::select;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {e}");
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting cpkg v{}", env!("CARGO_PKG_VERSION"));

    // File (or defaults), then CPKG_* variables, then flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global, &cli.command)?;

    let color = config.general.color;
    let renderer = OutputRenderer::new(cli.global.json, color);
    let colors_enabled = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.json);

    let (event_sender, event_receiver) = cpkg_events::channel();
    let result = execute_command_with_events(
        cli.command,
        config,
        event_sender,
        event_receiver,
        &mut event_handler,
    )
    .await?;

    renderer.render_result(&result)?;
    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    config: Config,
    event_sender: EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, config, event_sender));

    loop {
        select! {
            result = &mut command_future => {
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(&event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    event_handler.handle_event(&event);
                }
            }
        }
    }
}

async fn execute_command(
    command: Commands,
    config: Config,
    events: EventSender,
) -> Result<CommandResult, CliError> {
    let registry = RecipeRegistry::builtin()?;

    match command {
        Commands::List => Ok(CommandResult::Recipes(
            registry.iter().map(RecipeSummary::new).collect(),
        )),

        Commands::Inspect { recipe } => {
            let (name, version) = match recipe.split_once('/') {
                Some((name, version)) => (name, Some(version)),
                None => (recipe.as_str(), None),
            };
            let found = registry.require(name)?;
            if let Some(version) = version {
                let known = Version::parse(version)
                    .is_ok_and(|v| found.sources().contains(&v));
                if !known {
                    return Err(RecipeError::UnknownVersion {
                        name: name.to_string(),
                        version: version.to_string(),
                    }
                    .into());
                }
            }
            Ok(CommandResult::Recipe(RecipeDetails::new(found)))
        }

        Commands::Validate { reference, profile } => {
            let reference = Reference::parse(&reference)?;
            let recipe = registry.require(&reference.name)?;
            let engine = engine(&config, &profile, events)?;
            let evaluation = engine
                .evaluate(recipe, &reference, &profile.options)
                .await?;
            Ok(CommandResult::Validation(ValidationReport::from(
                &evaluation,
            )))
        }

        Commands::Create {
            reference, profile, ..
        } => {
            let reference = Reference::parse(&reference)?;
            let recipe = registry.require(&reference.name)?;
            let engine = engine(&config, &profile, events)?;
            let outcome = engine.create(recipe, &reference, &profile.options).await?;
            Ok(CommandResult::Created(CreateReport::from(outcome)))
        }

        Commands::Info { reference } => {
            let engine = Engine::from_config(&config)?;
            let entries = match reference.split_once('/') {
                Some(_) => engine.cache().entries(&Reference::parse(&reference)?).await?,
                None => engine
                    .cache()
                    .list()
                    .await?
                    .into_iter()
                    .filter(|entry| entry.metadata.reference.name == reference)
                    .collect(),
            };
            if entries.is_empty() {
                return Err(cpkg_errors::Error::from(PackageError::NotFound { reference }).into());
            }
            Ok(CommandResult::Packages(
                entries.into_iter().map(CachedPackage::from).collect(),
            ))
        }

        Commands::Config => Ok(CommandResult::Config(Box::new(config))),
    }
}

/// Engine for `config` with the `-s` overrides applied to its profile
fn engine(config: &Config, profile: &ProfileArgs, events: EventSender) -> Result<Engine, CliError> {
    let engine = Engine::from_config(config)?.with_events(events);
    let settings = engine.profile().with_overrides(&profile.settings)?;
    Ok(engine.with_profile(settings))
}

/// Initialize tracing; logs go to stderr so stdout stays parseable
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "info,cpkg=debug,cpkg_builder=debug,cpkg_config=debug"
    } else if json_mode {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json_mode {
        builder.json().init();
    } else {
        builder.without_time().with_target(debug_enabled).init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(
    config: &mut Config,
    global: &GlobalArgs,
    command: &Commands,
) -> Result<(), CliError> {
    if let Some(color) = global.color {
        config.general.color = color;
    }

    if let Commands::Create {
        jobs, keep_build, ..
    } = command
    {
        if let Some(jobs) = jobs {
            if *jobs == 0 {
                return Err(CliError::InvalidArguments(
                    "--jobs must be at least 1".to_string(),
                ));
            }
            config.build.build_jobs = *jobs;
        }
        if *keep_build {
            config.build.keep_build = true;
        }
    }

    Ok(())
}
