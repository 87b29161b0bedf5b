use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use rangeserve::config::{self, AppState};
use rangeserve::logger;
use rangeserve::server::{create_reusable_listener, start_server_loop, ServerLoopConfig};

const DEFAULT_CONFIG_PATH: &str = "config";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Build the Tokio runtime, sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let app_addr = cfg.get_socket_addr()?;
    let api_addr = cfg.get_api_socket_addr()?;

    let app_listener = create_reusable_listener(app_addr)?;
    let api_listener = create_reusable_listener(api_addr)?;

    if !std::path::Path::new(&cfg.files.root_dir).is_dir() {
        logger::log_warning(&format!(
            "Root directory '{}' does not exist; every request will get 404",
            cfg.files.root_dir
        ));
    }

    let state = Arc::new(AppState::new(&cfg));

    logger::log_server_start(&app_addr, &cfg);
    logger::log_api_server_start(&api_addr);

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local
        .run_until(run_dual_servers(app_listener, api_listener, state))
        .await;
    Ok(())
}

async fn run_dual_servers(
    app_listener: TcpListener,
    api_listener: TcpListener,
    state: Arc<AppState>,
) {
    // Spawn API server task
    tokio::task::spawn_local(start_server_loop(
        api_listener,
        Arc::clone(&state),
        Arc::new(AtomicUsize::new(0)),
        ServerLoopConfig {
            is_api_server: true,
            check_connection_limits: false,
        },
    ));

    // Run app server in main task
    start_server_loop(
        app_listener,
        state,
        Arc::new(AtomicUsize::new(0)),
        ServerLoopConfig {
            is_api_server: false,
            check_connection_limits: true,
        },
    )
    .await;
}
