//! HTTP RPC server exposing message dispatch and the bridge tree state.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use strand_bridge_tree::{IncrementalMerkleTree, TreeSnapshot};
use strand_hash::Hash256;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::app::{AppClient, DispatchReceipt, MessageDraft};
use crate::store::StoredMessage;

/// Query parameters for tree snapshot retrieval
#[derive(Debug, Deserialize)]
pub struct TreeQuery {
    /// Leaf count of a past tree state
    pub count: Option<u32>,
}

/// Current root along with the number of leaves it commits to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub root: Hash256,
    pub count: u32,
}

/// Configuration for the RPC server
#[derive(Clone)]
pub struct RpcConfig {
    /// Host and port binding for the RPC server (e.g., "127.0.0.1:5000")
    pub rpc_host: String,
}

/// HTTP RPC server forwarding requests to the app server
pub struct RpcServer {
    config: RpcConfig,
    app_client: AppClient,
    rx_shutdown: broadcast::Receiver<()>,
}

impl RpcServer {
    pub fn new(
        config: RpcConfig,
        app_client: AppClient,
        rx_shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            app_client,
            rx_shutdown,
        }
    }

    async fn run_inner(&self) -> Result<(), std::io::Error> {
        info!("Starting RPC server on {}", self.config.rpc_host);

        let listener = TcpListener::bind(&self.config.rpc_host).await?;
        let mut rx_shutdown = self.rx_shutdown.resubscribe();

        axum::serve(listener, router(self.app_client.clone()))
            .with_graceful_shutdown(async move { rx_shutdown.recv().await.unwrap_or_default() })
            .await
    }

    pub async fn run(&self) -> Result<(), ()> {
        match self.run_inner().await {
            Err(err) => {
                error!("RPC server exited: {}", err);
                Err(())
            }
            Ok(()) => {
                info!("RPC server terminated");
                Ok(())
            }
        }
    }
}

fn router(app_client: AppClient) -> Router {
    Router::new()
        .route("/messages", post(dispatch_message))
        .route("/messages/:nonce", get(get_message))
        .route("/tree", get(get_tree))
        .route("/root", get(get_root))
        .with_state(app_client)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Dispatch a message: assign it a nonce and commit it to the bridge tree
///
/// # Returns
/// * `Json<DispatchReceipt>` - Message id, nonce, leaf index and the new root
/// * `StatusCode::INTERNAL_SERVER_ERROR` - If the message could not be committed
pub async fn dispatch_message(
    State(app_client): State<AppClient>,
    Json(draft): Json<MessageDraft>,
) -> Result<Json<DispatchReceipt>, StatusCode> {
    let receipt = app_client.dispatch_message(draft).await.map_err(|e| {
        error!("Failed to dispatch message: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(receipt))
}

/// Get the tree snapshot: latest or for a given leaf count (optional)
///
/// # Returns
/// * `Json<TreeSnapshot>` - Frontier, leaf count and root
/// * `StatusCode::NOT_FOUND` - If the tree never had the requested leaf count
/// * `StatusCode::INTERNAL_SERVER_ERROR` - If reading the snapshot fails
pub async fn get_tree(
    State(app_client): State<AppClient>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<TreeSnapshot>, StatusCode> {
    let snapshot = app_client.get_tree(query.count).await.map_err(|e| {
        error!("Failed to get tree for count {:?}: {}", query.count, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    snapshot.map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Get the current root and leaf count
///
/// The root is recomputed from the frontier, so an empty tree reports the empty tree root.
pub async fn get_root(
    State(app_client): State<AppClient>,
) -> Result<Json<RootResponse>, StatusCode> {
    let snapshot = app_client
        .get_tree(None)
        .await
        .map_err(|e| {
            error!("Failed to get tree: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
    let count = snapshot.count;
    Ok(Json(RootResponse {
        root: IncrementalMerkleTree::from_snapshot(snapshot).root(),
        count,
    }))
}

/// Get a dispatched message by nonce
///
/// # Returns
/// * `Json<StoredMessage>` - The message and its id
/// * `StatusCode::NOT_FOUND` - If no message with this nonce was dispatched
pub async fn get_message(
    State(app_client): State<AppClient>,
    Path(nonce): Path<u32>,
) -> Result<Json<StoredMessage>, StatusCode> {
    let message = app_client.get_message(nonce).await.map_err(|e| {
        error!("Failed to get message {}: {}", nonce, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    message.map(Json).ok_or(StatusCode::NOT_FOUND)
}
