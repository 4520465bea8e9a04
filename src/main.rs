use anyhow::Result;
use chirp::api::memory::MemoryApi;
use chirp::api::rest::RestClient;
use chirp::api::SocialApi;
use chirp::app::App;
use chirp::config::Config;
use chirp::route::Route;
use chirp::session::Session;
use chirp::tui;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const DEMO_USER_ID: &str = "guest1";
const DEMO_USERNAME: &str = "guest";
const OFFLINE_LATENCY: Duration = Duration::from_millis(300);

/// `[session]` in the config skips the login screen. A bare username is
/// treated like a typed display name.
fn configured_session(config: &Config) -> Option<Session> {
    match (&config.session.user_id, &config.session.username) {
        (Some(id), Some(name)) if !id.is_empty() && !name.is_empty() => Some(Session::new(id.as_str(), name.as_str())),
        (_, Some(name)) => Session::sign_in(name),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_file = std::fs::File::create("chirp.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chirp=info")))
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let offline = args.iter().any(|arg| arg == "--offline");

    // Saved values from .env (real env vars take precedence)
    Config::load_env_file();
    let config_path = Config::resolve_path(&args);
    let config = Config::load_or_default(&config_path)?;

    let mut session = configured_session(&config);

    let (api, backend_label): (Arc<dyn SocialApi>, String) = if offline {
        // The demo world is seeded around the viewer so the home feed has content.
        let viewer = session
            .get_or_insert_with(|| Session::new(DEMO_USER_ID, DEMO_USERNAME))
            .clone();
        let api = MemoryApi::demo(&viewer.user_id, &viewer.username).with_latency(OFFLINE_LATENCY);
        (Arc::new(api), "offline demo".to_string())
    } else {
        println!();
        println!("  chirp v{}", env!("CARGO_PKG_VERSION"));
        println!();
        let base_url = config.base_url_or_prompt()?;
        let client = RestClient::new(&base_url, config.api.request_timeout(), config.api.pool_max_idle_per_host)?;
        (Arc::new(client), base_url)
    };
    tracing::info!(backend = %backend_label, config = %config_path.display(), "starting");

    let (mut app, state_rx) = App::new(&config, api, backend_label);
    if let Some(session) = session {
        app.start_session(session);
        // `--open /profile/<name>` starts on that page instead of home.
        let start = args.iter().position(|a| a == "--open").and_then(|i| args.get(i + 1));
        if let Some(path) = start {
            app.navigate(Route::parse(path));
        }
    }

    let (cmd_tx, cmd_rx) = mpsc::channel::<tui::TuiCommand>(64);
    let controller = tokio::spawn(app.run(cmd_rx));

    tui::run_tui(state_rx, cmd_tx).await?;

    controller.abort();
    tracing::debug!("shutting down");
    Ok(())
}
