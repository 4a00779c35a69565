use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::error;

use reading_tracker::ReadingTrackerPlugin;
use shiori_core::kernel::constants::{
    CONFIG_DIR_NAME, DEFAULT_LIBRARIES_DIR, DEFAULT_PLUGINS_DIR, ENABLED_STATE_FILE,
};
use shiori_core::plugin_system::library::LibraryManager;
use shiori_core::plugin_system::loader::PluginLoader;
use shiori_core::plugin_system::registry::PluginState;
use shiori_core::plugin_system::state::EnabledStore;
use shiori_core::services::memory::{
    MemoryBookmarkStore, MemoryCacheManager, MemoryContentSource, MemoryMenuRegistry,
    MemoryReadingProgressStore, MemoryRecentItemsStore,
};
use shiori_core::storage::LocalStorageProvider;
use shiori_core::{PluginContext, PluginManager};

/// Shiori: a manga reader with a plugin runtime
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Data directory holding plugins, libraries and persisted state
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage plugins
    Plugin {
        #[command(subcommand)]
        command: PluginCommand,
    },
    /// Manage shared libraries available to plugins
    Libs {
        #[command(subcommand)]
        command: LibsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PluginCommand {
    /// List installed plugins with their status
    List {},
    /// Enable a plugin (persisted; initializes it on first enable)
    Enable {
        /// The id of the plugin to enable
        id: String,
    },
    /// Disable a plugin (persisted; stops hook delivery)
    Disable {
        /// The id of the plugin to disable
        id: String,
    },
    /// Install a plugin archive into the plugins directory
    Install {
        /// Path to the plugin .zip archive
        archive: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum LibsCommand {
    /// List installed shared libraries
    List {},
    /// Copy a shared library into the managed libraries directory
    Add {
        /// Path to the library file
        path: PathBuf,
    },
    /// Show a summary of the libraries directory
    Info {},
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

fn build_manager(data_dir: &PathBuf) -> PluginManager {
    let provider = Arc::new(LocalStorageProvider::new(data_dir.clone()));
    let context = PluginContext::new(
        Arc::new(MemoryContentSource::new()),
        Arc::new(MemoryBookmarkStore::new()),
        Arc::new(MemoryReadingProgressStore::new()),
        Arc::new(MemoryRecentItemsStore::new()),
        Arc::new(MemoryCacheManager::new()),
        Arc::new(MemoryMenuRegistry::new()),
    );
    PluginManager::new(
        PluginLoader::new(data_dir.join(DEFAULT_PLUGINS_DIR)),
        LibraryManager::new(data_dir.join(DEFAULT_LIBRARIES_DIR)),
        EnabledStore::new(provider, ENABLED_STATE_FILE.into()),
        context,
    )
}

fn state_label(state: Option<&PluginState>, enabled: bool) -> &'static str {
    match state {
        Some(PluginState::Initialized) => "Enabled",
        Some(PluginState::InitFailed(_)) => "Failed (init)",
        Some(PluginState::MissingDependency(_)) => "Failed (dependency)",
        _ if enabled => "Enabled (pending)",
        _ => "Disabled",
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = CliArgs::parse();
    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);

    let manager = build_manager(&data_dir);

    // Bundled plugins register before initialize so the persisted enabled
    // set applies to them too.
    if let Err(e) = manager
        .register_static(
            ReadingTrackerPlugin::descriptor(),
            Arc::new(ReadingTrackerPlugin::new()),
        )
        .await
    {
        eprintln!("Fatal: failed to register bundled reading-tracker plugin: {}", e);
        return ExitCode::FAILURE;
    }

    // A failed startup scan leaves the manager with whatever did load;
    // the host keeps running either way.
    if !manager.initialize().await {
        log::warn!("plugin system started with no plugins loaded");
    }

    let outcome = run_command(&manager, args.command).await;

    for e in manager.shutdown().await {
        error!("Shutdown error: {}", e);
    }

    outcome
}

async fn run_command(manager: &PluginManager, command: Commands) -> ExitCode {
    match command {
        Commands::Plugin { command } => match command {
            PluginCommand::List {} => {
                let descriptors = manager.get_all_descriptors().await;
                if descriptors.is_empty() {
                    println!("No plugins installed.");
                    return ExitCode::SUCCESS;
                }
                println!(
                    "{} plugin(s), {} enabled:",
                    manager.get_plugin_count().await,
                    manager.get_enabled_count().await
                );
                for descriptor in descriptors {
                    let enabled = manager.is_enabled(&descriptor.id).await;
                    let state = manager.plugin_state(&descriptor.id).await;
                    println!(
                        "  - {} v{} [{}] ({}): {}",
                        descriptor.id,
                        descriptor.version,
                        descriptor.capability,
                        state_label(state.as_ref(), enabled),
                        descriptor.name,
                    );
                }
                ExitCode::SUCCESS
            }
            PluginCommand::Enable { id } => match manager.enable_plugin(&id).await {
                Ok(()) => {
                    println!("Enabled plugin '{}'.", id);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error enabling plugin '{}': {}", id, e);
                    ExitCode::FAILURE
                }
            },
            PluginCommand::Disable { id } => match manager.disable_plugin(&id).await {
                Ok(()) => {
                    println!("Disabled plugin '{}'.", id);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error disabling plugin '{}': {}", id, e);
                    ExitCode::FAILURE
                }
            },
            PluginCommand::Install { archive } => match manager.install_archive(&archive).await {
                Ok(id) => {
                    println!("Installed plugin '{}' (disabled; enable it to activate).", id);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error installing '{}': {}", archive.display(), e);
                    ExitCode::FAILURE
                }
            },
        },
        Commands::Libs { command } => match command {
            LibsCommand::List {} => {
                let libraries = manager.library_manager().list_available_libraries();
                if libraries.is_empty() {
                    println!("No shared libraries installed.");
                } else {
                    for name in libraries {
                        println!("{}", name);
                    }
                }
                ExitCode::SUCCESS
            }
            LibsCommand::Add { path } => {
                if manager.library_manager().add_library(&path) {
                    println!("Added library '{}'.", path.display());
                    ExitCode::SUCCESS
                } else {
                    eprintln!("Failed to add library '{}'.", path.display());
                    ExitCode::FAILURE
                }
            }
            LibsCommand::Info {} => {
                println!("{}", manager.library_manager().library_info());
                ExitCode::SUCCESS
            }
        },
    }
}
