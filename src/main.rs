use std::error::Error;
use std::time::Duration;

use clap::Parser;
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

mod api;
mod app;
mod charging;
mod console;
mod logging;
mod models;
mod payment;
mod stations;
mod stomp;
mod storage;
mod ui;
mod ws;

use api::ApiClient;
use app::App;
use storage::SessionStore;

#[derive(Parser)]
#[command(name = "evcharge", version, about = "EV charging network terminal client")]
struct Args {
    /// Backend REST base URL.
    #[arg(
        long,
        env = "EVCHARGE_API_URL",
        default_value = "http://localhost:8080/api"
    )]
    base_url: String,
    /// WebSocket endpoint for live charging updates. Derived from the base
    /// URL when not set.
    #[arg(long, env = "EVCHARGE_WS_URL")]
    ws_url: Option<String>,
    /// Open the live status view for one charging session.
    #[arg(long, value_name = "SESSION_ID")]
    watch_session: Option<u64>,
    /// Discard stored credentials and prompt for login.
    #[arg(long)]
    login: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    logging::init()?;

    let store = SessionStore::open_default()?;
    if args.login {
        store.clear()?;
    }

    let ws_url = args
        .ws_url
        .clone()
        .unwrap_or_else(|| derive_ws_url(&args.base_url));
    let api = ApiClient::new(&args.base_url, store.access_token());
    let mut app = App::new(api, store, ws_url);
    if let Some(session_id) = args.watch_session {
        app.watch(session_id);
    }

    let mut stdout = std::io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    loop {
        app.tick();

        terminal.draw(|frame| ui::draw(frame, &mut app))?;

        if app.needs_refresh {
            app.refresh_data();
        }

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(120))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key_event(key);
            }
        }
    }

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

/// `http://host:port/api` -> `ws://host:port/ws`.
fn derive_ws_url(base_url: &str) -> String {
    let stripped = base_url.trim_end_matches('/').trim_end_matches("/api");
    let ws = if let Some(rest) = stripped.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = stripped.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("ws://{stripped}")
    };
    format!("{ws}/ws")
}

#[cfg(test)]
mod tests {
    use super::derive_ws_url;

    #[test]
    fn ws_url_is_derived_from_base_url() {
        assert_eq!(
            derive_ws_url("http://localhost:8080/api"),
            "ws://localhost:8080/ws"
        );
        assert_eq!(
            derive_ws_url("https://charge.example.com/api/"),
            "wss://charge.example.com/ws"
        );
        assert_eq!(derive_ws_url("http://10.0.0.5:8080"), "ws://10.0.0.5:8080/ws");
    }
}
