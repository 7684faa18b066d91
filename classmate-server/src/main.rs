use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

mod error;
mod extractors;
mod fuzz;
mod handlers;
mod store;

pub use error::Error;
pub use store::Store;

use extractors::AppState;

#[derive(structopt::StructOpt)]
struct Opt {
    /// Address to listen on
    #[structopt(long, env = "CLASSMATE_LISTEN", default_value = "0.0.0.0:80")]
    listen: SocketAddr,

    /// Directory holding threads.json and events.json
    #[structopt(long, env = "CLASSMATE_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,
}

pub fn app(store: Store) -> Router {
    Router::new()
        .route(
            "/events",
            get(handlers::fetch_events).post(handlers::create_event),
        )
        .route("/events/:event_id", get(handlers::fetch_event))
        .route("/forum/categories", get(handlers::fetch_categories))
        .route(
            "/forum/threads",
            get(handlers::fetch_threads).post(handlers::create_thread),
        )
        .route("/forum/threads/:thread_id", get(handlers::fetch_thread))
        .route(
            "/forum/threads/:thread_id/comment",
            post(handlers::create_comment),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { store })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let store = Store::load(&opt.data_dir)
        .await
        .with_context(|| format!("loading data from {:?}", opt.data_dir))?;

    tracing::info!("classmate server listening on {}", opt.listen);
    axum::Server::try_bind(&opt.listen)
        .with_context(|| format!("binding to {}", opt.listen))?
        .serve(app(store).into_make_service())
        .await
        .context("serving axum webserver")
}
