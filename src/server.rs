use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::handle_connection;
use crate::store::{KeyValueStore, StoreChange};

pub struct Server {
    listener: TcpListener,
    store: Arc<Mutex<KeyValueStore>>,
}

impl Server {
    pub async fn new(address: &str, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(format!("{}:{}", address, port)).await?;

        let mut store = KeyValueStore::new();
        store.subscribe(log_change);

        Ok(Self {
            listener,
            store: Arc::new(Mutex::new(store)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The table shared by every connection.
    pub fn store(&self) -> Arc<Mutex<KeyValueStore>> {
        Arc::clone(&self.store)
    }

    pub async fn start(&self) -> Result<()> {
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((socket, peer)) => {
                            debug!(%peer, "accepted connection");
                            let store = Arc::clone(&self.store);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(socket, &store).await {
                                    error!(%peer, "connection error: {}", e);
                                }
                                debug!(%peer, "connection closed");
                            });
                        }
                        Err(e) => {
                            error!("accept error: {}", e);
                        }
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Ctrl+C pressed, shutting down...");
                    break;
                }
            }
        }

        Ok(())
    }
}

fn log_change(change: &StoreChange<'_>) {
    debug!(
        kind = change.kind(),
        index = change.index(),
        key = change.entry().key(),
        "table changed"
    );
}
