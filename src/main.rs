use clap::Parser;
use tollgate::cli::{
    Args, StoreKind, build_config, init_logging, load_jwt_secret, open_sqlite_store,
};
use tollgate::store::{MemoryStore, RevocationStore};
use tollgate::{ServerConfig, create_app, create_gate, init_cleanup, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let config = build_config(&args, jwt_secret);

    match args.store {
        StoreKind::Memory => serve(&args, &config, MemoryStore::new()).await,
        StoreKind::Sqlite => {
            let Some(store) = open_sqlite_store(&args.database).await else {
                std::process::exit(1);
            };
            serve(&args, &config, store).await
        }
    }
}

async fn serve<S: RevocationStore>(args: &Args, config: &ServerConfig, store: S) {
    init_cleanup(&store).await;

    let gate = create_gate(config, store).unwrap_or_else(|e| {
        error!(error = %e, "Failed to initialize authentication gate");
        std::process::exit(1);
    });
    let app = create_app(gate);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, store = ?args.store, "Listening"),
        Err(e) => error!(error = %e, "Failed to get local address"),
    }

    if let Err(e) = run_server(app, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
