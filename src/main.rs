use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;

use palaver::api::ApiClient;
use palaver::app::{self, App, AppEvent};
use palaver::config::Config;
use palaver::route::Route;
use palaver::store::Store;
use palaver::theme::ThemeVariant;
use palaver::ui;

/// Get the config directory path (~/.config/palaver/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("palaver"))
}

#[derive(Parser, Debug)]
#[command(
    name = "palaver",
    about = "Terminal client for Flarum-style discussion forums"
)]
struct Args {
    /// Forum root URL (overrides the config file)
    #[arg(long, value_name = "URL")]
    forum: Option<String>,

    /// Start at a specific path, e.g. "/d/123-welcome/4"
    #[arg(long, value_name = "PATH")]
    path: Option<String>,

    /// Config file (default: ~/.config/palaver/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up config directory
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    // User-only access: the config file can hold an API token
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(&config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                    eprintln!(
                        "Warning: failed to set permissions on {}: {}",
                        config_dir.display(),
                        e
                    );
                }
            }
            Err(e) => {
                eprintln!(
                    "Warning: failed to read metadata for {}: {}",
                    config_dir.display(),
                    e
                );
            }
        }
    }

    // Tracing goes to a file — stderr belongs to the TUI
    let log_path = config_dir.join("palaver.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .init();

    // Load configuration
    let config_path = args
        .config
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let Some(forum_url) = args.forum.or_else(|| config.forum_url.clone()) else {
        eprintln!("Error: no forum URL configured.");
        eprintln!();
        eprintln!("Either pass one:");
        eprintln!("  palaver --forum https://discuss.example.com");
        eprintln!();
        eprintln!("or set it in {}:", config_path.display());
        eprintln!("  forum_url = \"https://discuss.example.com\"");
        std::process::exit(1);
    };

    let token = config.resolve_token();
    let authenticated = token.is_some();

    let http = app::build_http_client().context("Failed to build HTTP client")?;
    let client = ApiClient::new(http, &forum_url, token)
        .with_context(|| format!("Invalid forum URL: {}", forum_url))?;
    let store = Store::new(client);

    let theme = ThemeVariant::from_str_name(&config.theme).unwrap_or(ThemeVariant::Dark);
    let mut app = App::new(store.clone(), forum_url, theme, config.pane_hot_edge);

    // Event channel for background tasks
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    // Resolve the session in the background; the loggedIn event will
    // re-fetch whatever page is open by then.
    if authenticated {
        let session_store = store.clone();
        let session_tx = event_tx.clone();
        tokio::spawn(async move {
            let result = session_store.current_user().await;
            let _ = session_tx.send(AppEvent::SessionResolved { result }).await;
        });
    }

    // Initial navigation: a requested path, or the index
    let initial = args
        .path
        .as_deref()
        .and_then(Route::parse)
        .unwrap_or(Route::Index);
    app.navigate(initial, &event_tx);

    ui::run(&mut app, event_tx, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
