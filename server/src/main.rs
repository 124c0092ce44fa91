use axum::{response::Html, routing::get, Router};
use clap::Parser;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod connections;
mod content;
mod event_queue;
mod game;
mod players;
mod prompts;
mod reactions;
mod rounds;
mod router;
mod screen;
mod session;
mod story;
mod ws;
#[cfg(test)]
mod tests;

use config::Args;
use event_queue::EventQueue;
use screen::PacedScreen;
use session::Session;
use ws::AppState;

const CONTROLLER_PAGE: &str = include_str!("../static/controller.html");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plotline_server=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let prompts = content::load_prompts(args.content_dir.as_deref())?;
    let dialogue = content::load_dialogue(args.content_dir.as_deref())?;

    let queue = EventQueue::new();
    let screen = PacedScreen::new(queue.clone(), args.pacing());
    let session = Session::new(
        args.game_config(),
        queue.clone(),
        Box::new(screen),
        prompts,
        Box::new(dialogue),
    );
    tokio::spawn(run_logic_loop(session, queue.clone(), args.tick()));

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("controller page on http://{addr}/ , socket on ws://{addr}/ws");
    axum::serve(listener, app(queue)).await?;
    Ok(())
}

fn app(queue: EventQueue<Session>) -> Router {
    Router::new()
        .route("/", get(controller))
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { queue })
}

async fn controller() -> Html<&'static str> {
    Html(CONTROLLER_PAGE)
}

/// Owns the session; every state change happens inside this task.
async fn run_logic_loop(mut session: Session, queue: EventQueue<Session>, tick: Duration) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(tick_ms = tick.as_millis() as u64, "Logic loop running");
    loop {
        interval.tick().await;
        let handled = queue.drain(&mut session);
        if handled > 0 {
            tracing::trace!(handled, "Drained events");
        }
    }
}
