use std::{net::SocketAddr, path::Path, sync::Arc};

use beacon::{
    adapters::{FileConfigStore, HttpVisitTransport},
    app,
    config::{BeaconConfig, BeaconConfigValidator, load_config, load_config_unchecked},
    core::{sanitize::sanitize_access_token, settings},
    ports::config_store::ConfigStore,
    tracing_setup::{self, LogFormat},
};
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Configuration file (TOML, YAML, JSON or INI)
    #[clap(short, long, global = true, default_value = "beacon.toml")]
    config: String,

    /// Log output format
    #[clap(long, global = true, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Start the host server with the visit beacon (default)
    Serve,
    /// Validate configuration file
    Validate,
    /// Initialize a new configuration file
    Init,
    /// Show or change the stored beacon settings
    Settings {
        /// New collector access token (sanitized; an empty result is ignored)
        #[clap(long)]
        token: Option<String>,
        /// Turn reporting on
        #[clap(long, conflicts_with = "disable")]
        enable: bool,
        /// Turn reporting off
        #[clap(long)]
        disable: bool,
        /// Print the settings after applying changes (implied when nothing changes)
        #[clap(long)]
        show: bool,
    },
    /// Remove all stored beacon settings
    Uninstall,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&args.config, args.log_format).await,
        Commands::Validate => validate_config_command(&args.config),
        Commands::Init => init_config_command(&args.config).await,
        Commands::Settings {
            token,
            enable,
            disable,
            show,
        } => settings_command(&args.config, token, enable, disable, show),
        Commands::Uninstall => uninstall_command(&args.config),
    }
}

async fn serve(config_path: &str, log_format: LogFormat) -> Result<()> {
    tracing_setup::init_tracing(log_format)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    tracing::info!("Loading configuration from {config_path}");
    let config = load_config(config_path)?;

    let store = Arc::new(
        FileConfigStore::watched(&config.store.path)
            .with_context(|| format!("Failed to open settings store {}", config.store.path))?,
    );
    if settings::activate(store.as_ref()).context("Failed to write default settings")? {
        tracing::info!("Wrote default settings to {}", config.store.path);
    }
    if store.get_access_token().is_empty() {
        tracing::warn!("No access token configured; visits will not be reported until one is set");
    }

    let transport = Arc::new(
        HttpVisitTransport::new(&config.collector.endpoint, config.collector_timeout())
            .context("Failed to create collector transport")?,
    );

    let app = app::build_router(&config, store, transport);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .context("Failed to parse listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!(
        "Beacon host listening on {} (site root: {}, collector: {})",
        addr,
        config.site.root,
        config.collector.endpoint
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("Beacon host stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT (Ctrl+C), shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}

fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config_unchecked(config_path) {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match BeaconConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!("   • Collector: {}", config.collector.endpoint);
            println!("   • Reported Headers: {}", config.reporter.headers.join(", "));
            println!("   • Settings File: {}", config.store.path);
            println!(
                "   • Settings API: {}",
                if config.settings_api.admin_token.is_some() {
                    config.settings_api.mount.as_str()
                } else {
                    "disabled"
                }
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let defaults = BeaconConfig::default();
    let default_config = format!(
        r#"# Visit beacon configuration

# The address the host listens on
listen_addr = "{listen_addr}"

[site]
root = "{site_root}"

[collector]
endpoint = "{endpoint}"
timeout_secs = 10

[reporter]
headers = ["Host", "User-Agent", "Referer"]
# Extra path prefixes that are never reported
excluded_prefixes = []

[store]
path = "{store_path}"

# Uncomment to expose the settings API
# [settings_api]
# mount = "/_beacon/settings"
# admin_token = "change-me"
"#,
        listen_addr = defaults.listen_addr,
        site_root = defaults.site.root,
        endpoint = defaults.collector.endpoint,
        store_path = defaults.store.path,
    );

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'beacon settings --token <TOKEN>' then 'beacon serve --config {config_path}'");
    Ok(())
}

fn open_store(config_path: &str) -> Result<FileConfigStore> {
    let config = load_config(config_path)?;
    FileConfigStore::new(&config.store.path)
        .with_context(|| format!("Failed to open settings store {}", config.store.path))
}

fn settings_command(
    config_path: &str,
    token: Option<String>,
    enable: bool,
    disable: bool,
    show: bool,
) -> Result<()> {
    let store = open_store(config_path)?;
    let show = show || (token.is_none() && !enable && !disable);

    if let Some(raw) = token {
        let token = sanitize_access_token(&raw);
        if token.is_empty() {
            eprintln!("⚠️  Token is empty after sanitization; keeping the current token");
        } else {
            store.set_access_token(token)?;
            println!("✅ Access token updated");
        }
    }
    if enable || disable {
        store.set_enabled(enable)?;
        println!("✅ Reporting {}", if enable { "enabled" } else { "disabled" });
    }
    if !show {
        return Ok(());
    }

    let current = settings::SettingsView::from_store(&store);
    println!("📋 Settings ({}):", store.path().display());
    println!("   • Reporting: {}", if current.enabled { "on" } else { "off" });
    println!(
        "   • Access token: {}",
        if current.has_access_token { "set" } else { "not set" }
    );
    Ok(())
}

fn uninstall_command(config_path: &str) -> Result<()> {
    let store = open_store(config_path)?;
    settings::uninstall(&store)?;
    println!("✅ Removed settings file {}", store.path().display());
    Ok(())
}
