#![doc = include_str!("../README.md")]

use std::path::PathBuf;

use clap::{command, Parser};
use tokio::task::JoinHandle;
use tracing::{error, info, subscriber::set_global_default};
use tracing_subscriber::filter::EnvFilter;

use crate::{
    app::{create_app, AppConfig},
    file_sink::CheckpointSinkConfig,
    rpc::{RpcConfig, RpcServer},
    shutdown::Shutdown,
};

mod app;
mod file_sink;
mod rpc;
mod shutdown;
mod store;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// RPC server host
    #[arg(long, default_value = "127.0.0.1:5000")]
    rpc_host: String,
    /// Domain of the chain messages are dispatched from
    #[arg(long, env = "ORIGIN_DOMAIN")]
    origin_domain: u32,
    /// Path to the database storing the bridge tree, nonce and messages
    #[arg(long, default_value = "./.relayer_data/relayer.db")]
    db_path: PathBuf,
    /// Output directory for checkpoint JSON files
    #[arg(long, default_value = "./.relayer_data/checkpoints")]
    checkpoints_dir: PathBuf,
    /// Number of checkpoints per shard directory
    #[arg(long, default_value = "10000")]
    checkpoints_shard_size: u32,
    /// Logging level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber_builder =
        tracing_subscriber::fmt::Subscriber::builder().with_env_filter(env_filter);

    let subscriber = subscriber_builder.with_writer(std::io::stderr).finish();
    set_global_default(subscriber).expect("Failed to set subscriber");
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    info!("Strand relayer is launching...");

    let shutdown = Shutdown::default();

    let app_config = AppConfig {
        db_path: cli.db_path,
        origin_domain: cli.origin_domain,
        api_requests_capacity: 1000,
        sink_config: CheckpointSinkConfig {
            output_dir: cli.checkpoints_dir,
            shard_size: cli.checkpoints_shard_size,
        },
    };
    let (mut app_server, app_client) = create_app(app_config, shutdown.subscribe());

    let rpc_config = RpcConfig {
        rpc_host: cli.rpc_host,
    };
    let rpc_server = RpcServer::new(rpc_config, app_client, shutdown.subscribe());

    let app_handle = tokio::spawn(async move { app_server.run().await });
    let rpc_handle = tokio::spawn(async move { rpc_server.run().await });
    let shutdown_handle = tokio::spawn(async move { shutdown.run().await });

    // If at least one component exits with an error (e.g. the tree is full), the relayer
    // exits with an error
    match tokio::try_join!(
        flatten(app_handle),
        flatten(rpc_handle),
        flatten(shutdown_handle)
    ) {
        Ok(_) => {
            info!("Strand relayer has shut down");
            std::process::exit(0);
        }
        Err(_) => {
            error!("Strand relayer has exited with error");
            std::process::exit(1);
        }
    }
}

async fn flatten<T>(handle: JoinHandle<Result<T, ()>>) -> Result<T, ()> {
    match handle.await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(()),
    }
}
