use std::sync::Arc;

mod config;
mod customer;
mod handler;
mod http;
mod logger;
mod routing;
mod server;
mod store;

use customer::ErrorLogService;
use store::MemoryCustomerStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // First argument: config file path (without extension is fine)
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let seed = match cfg.store.seed_file.as_deref() {
        Some(path) => store::seed::load_seed_file(path)?,
        None => Vec::new(),
    };
    logger::log_info(&format!("Loaded {} seed customer(s)", seed.len()));

    let store = Arc::new(MemoryCustomerStore::with_customers(seed));
    let state = Arc::new(config::AppState::new(
        cfg,
        store,
        Arc::new(ErrorLogService::new()),
    ));

    let listener = server::create_listener(addr)?;
    logger::log_server_start(&addr, &state.config);

    server::start_server_loop(listener, state, server::shutdown_signal()).await;
    Ok(())
}
