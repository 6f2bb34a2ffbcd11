//! Application server owning the bridge tree, and its client, communicating via async message passing.
//!
//! The server is the only writer of the tree and of the store: requests are processed one at
//! a time, so every dispatched message gets a unique nonce and leaf index.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strand_bridge_tree::{
    BridgeMessage, IncrementalMerkleTree, TreeError, TreeSnapshot, MESSAGE_VERSION,
};
use strand_hash::Hash256;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{error, info, warn};

use crate::file_sink::{CheckpointSink, CheckpointSinkConfig};
use crate::store::{AppStore, BridgeStore, StoredMessage};

/// Request sent to the application server via the API channel
pub struct ApiRequest {
    /// The body of the API request containing the specific operation
    pub body: ApiRequestBody,
    /// Channel to send the response back to the caller
    pub tx_response: oneshot::Sender<ApiResponse>,
}

pub type ApiResponse = Result<ApiResponseBody, anyhow::Error>;

/// Possible request operations that can be sent to the application server
pub enum ApiRequestBody {
    /// Assign a nonce to a message and commit it to the tree
    DispatchMessage(MessageDraft),
    /// Get the tree snapshot: latest or for a given leaf count (optional)
    GetTree(Option<u32>),
    /// Get a dispatched message by nonce
    GetMessage(u32),
}

/// Response body for API requests containing the result data
pub enum ApiResponseBody {
    DispatchMessage(DispatchReceipt),
    GetTree(Option<TreeSnapshot>),
    GetMessage(Option<StoredMessage>),
}

/// Message fields chosen by the sender, the relayer fills in the rest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    pub sender: Hash256,
    pub destination_domain: u32,
    pub recipient: Hash256,
    #[serde(with = "hex::serde")]
    pub body: Vec<u8>,
}

/// Outcome of a message dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReceipt {
    pub message_id: Hash256,
    pub nonce: u32,
    pub leaf_index: u32,
    pub root: Hash256,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to the database storing the app state
    pub db_path: PathBuf,
    /// Domain of the chain the relayer dispatches messages from
    pub origin_domain: u32,
    /// Api requests channel capacity
    pub api_requests_capacity: usize,
    /// Checkpoint files configuration
    pub sink_config: CheckpointSinkConfig,
}

/// The main application server that processes API requests and manages the bridge tree
pub struct AppServer {
    config: AppConfig,
    rx_requests: mpsc::Receiver<ApiRequest>,
    rx_shutdown: broadcast::Receiver<()>,
}

/// Client for communicating with the application server via async channels
#[derive(Clone)]
pub struct AppClient {
    tx_requests: mpsc::Sender<ApiRequest>,
}

/// In-memory tree and nonce, mirrored in the store after every dispatch
struct BridgeState {
    origin_domain: u32,
    tree: IncrementalMerkleTree,
    nonce: u32,
    store: AppStore,
    sink: CheckpointSink,
}

impl BridgeState {
    async fn restore(config: &AppConfig) -> Result<Self, anyhow::Error> {
        let store = AppStore::single_atomic_writer(&config.db_path).await?;
        let tree = store
            .get_latest_tree_snapshot()
            .await?
            .map(IncrementalMerkleTree::from_snapshot)
            .unwrap_or_default();
        let nonce = store.get_nonce().await?;
        let sink = CheckpointSink::new(config.sink_config.clone()).await?;

        info!(
            "Bridge tree restored: {} leaves, root {}, next nonce {}",
            tree.count(),
            tree.cached_root(),
            nonce
        );

        Ok(Self {
            origin_domain: config.origin_domain,
            tree,
            nonce,
            store,
            sink,
        })
    }

    /// Commit a message to the tree and persist the result.
    /// The in-memory state only changes once the store write succeeded.
    async fn dispatch(&mut self, draft: MessageDraft) -> Result<DispatchReceipt, anyhow::Error> {
        let message = BridgeMessage {
            version: MESSAGE_VERSION,
            nonce: self.nonce,
            origin_domain: self.origin_domain,
            sender: draft.sender,
            destination_domain: draft.destination_domain,
            recipient: draft.recipient,
            body: draft.body,
        };
        let message_id = message.id();
        let next_nonce = self
            .nonce
            .checked_add(1)
            .ok_or_else(|| anyhow::anyhow!("Message nonce overflow"))?;

        let mut tree = self.tree.clone();
        let leaf_index = tree.insert(message_id)?;
        let stored = StoredMessage {
            id: message_id,
            message,
        };
        self.store
            .add_message(&stored, &tree.save(), next_nonce)
            .await?;

        self.tree = tree;
        self.nonce = next_nonce;
        info!(
            "Message {} dispatched: nonce {}, leaf {}",
            message_id, stored.message.nonce, leaf_index
        );

        if let Some(checkpoint) = self.tree.checkpoint(message_id) {
            // Checkpoints can be regenerated from the stored snapshots
            if let Err(err) = self.sink.write_checkpoint(&checkpoint).await {
                warn!("Failed to write checkpoint {}: {}", leaf_index, err);
            }
        }

        Ok(DispatchReceipt {
            message_id,
            nonce: stored.message.nonce,
            leaf_index,
            root: self.tree.cached_root(),
        })
    }

    async fn get_tree(&self, count: Option<u32>) -> Result<Option<TreeSnapshot>, anyhow::Error> {
        match count {
            None => Ok(Some(self.tree.save())),
            Some(0) => Ok(Some(TreeSnapshot::default())),
            Some(count) => Ok(self.store.get_tree_snapshot(count).await?),
        }
    }
}

impl AppServer {
    pub fn new(
        config: AppConfig,
        rx_requests: mpsc::Receiver<ApiRequest>,
        rx_shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            rx_requests,
            rx_shutdown,
        }
    }

    async fn run_inner(&mut self) -> Result<(), anyhow::Error> {
        info!("App server started");

        let mut state = BridgeState::restore(&self.config).await?;

        loop {
            tokio::select! {
                Some(req) = self.rx_requests.recv() => {
                    match req.body {
                        ApiRequestBody::DispatchMessage(draft) => {
                            let res = state.dispatch(draft).await;
                            // A full tree can not accept any further message
                            let fatal = matches!(
                                res.as_ref().map_err(|err| err.downcast_ref::<TreeError>()),
                                Err(Some(TreeError::TreeFull))
                            );
                            req.tx_response
                                .send(res.map(ApiResponseBody::DispatchMessage))
                                .map_err(|_| anyhow::anyhow!("Failed to send response to DispatchMessage request"))?;
                            if fatal {
                                return Err(TreeError::TreeFull.into());
                            }
                        }
                        ApiRequestBody::GetTree(count) => {
                            let res = state.get_tree(count).await.map(ApiResponseBody::GetTree);
                            req.tx_response.send(res).map_err(|_| anyhow::anyhow!("Failed to send response to GetTree request"))?;
                        }
                        ApiRequestBody::GetMessage(nonce) => {
                            let res = state.store.get_message(nonce).await.map(ApiResponseBody::GetMessage).map_err(Into::into);
                            req.tx_response.send(res).map_err(|_| anyhow::anyhow!("Failed to send response to GetMessage request"))?;
                        }
                    }
                },
                _ = self.rx_shutdown.recv() => {
                    return Ok(())
                }
            }
        }
    }

    pub async fn run(&mut self) -> Result<(), ()> {
        match self.run_inner().await {
            Err(err) => {
                error!("App server exited: {}", err);
                Err(())
            }
            Ok(()) => {
                info!("App server terminated");
                Ok(())
            }
        }
    }
}

impl AppClient {
    pub fn new(tx_requests: mpsc::Sender<ApiRequest>) -> Self {
        Self { tx_requests }
    }

    /// Helper method to send a request and handle the response
    async fn send_request<T>(
        &self,
        body: ApiRequestBody,
        extract_response: impl FnOnce(ApiResponseBody) -> Option<T>,
    ) -> Result<T, anyhow::Error> {
        let (tx_response, rx_response) = oneshot::channel();
        self.tx_requests
            .send(ApiRequest { body, tx_response })
            .await
            .map_err(|_| anyhow::anyhow!("App server is not running"))?;

        let res = rx_response
            .await
            .map_err(|_| anyhow::anyhow!("Failed to receive response"))?;

        match res {
            Ok(response_body) => extract_response(response_body)
                .ok_or_else(|| anyhow::anyhow!("Unexpected response type")),
            Err(err) => Err(err),
        }
    }

    pub async fn dispatch_message(
        &self,
        draft: MessageDraft,
    ) -> Result<DispatchReceipt, anyhow::Error> {
        self.send_request(
            ApiRequestBody::DispatchMessage(draft),
            |response| match response {
                ApiResponseBody::DispatchMessage(receipt) => Some(receipt),
                _ => None,
            },
        )
        .await
    }

    pub async fn get_tree(&self, count: Option<u32>) -> Result<Option<TreeSnapshot>, anyhow::Error> {
        self.send_request(ApiRequestBody::GetTree(count), |response| match response {
            ApiResponseBody::GetTree(snapshot) => Some(snapshot),
            _ => None,
        })
        .await
    }

    pub async fn get_message(&self, nonce: u32) -> Result<Option<StoredMessage>, anyhow::Error> {
        self.send_request(ApiRequestBody::GetMessage(nonce), |response| match response {
            ApiResponseBody::GetMessage(message) => Some(message),
            _ => None,
        })
        .await
    }
}

/// Create app server and client
pub fn create_app(
    config: AppConfig,
    rx_shutdown: broadcast::Receiver<()>,
) -> (AppServer, AppClient) {
    let (tx_requests, rx_requests) = mpsc::channel(config.api_requests_capacity);
    let server = AppServer::new(config, rx_requests, rx_shutdown);
    let client = AppClient::new(tx_requests);
    (server, client)
}
