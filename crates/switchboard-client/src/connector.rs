//! Observer link establishment.
//!
//! A [`Connector`] opens one transport to the server and hands back a
//! [`Link`]: a sender for outbound text and a receiver for inbound text.
//! The link is closed when the inbound receiver yields `None`; dropping the
//! outbound sender closes it from our side.
//!
//! [`WsConnector`] is the production implementation over
//! `tokio-tungstenite`. Tests substitute channel pairs.

use std::future::Future;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as Frame;
use tracing::{debug, info, warn};

use crate::error::ClientError;

/// Per-direction queue depth for a [`WsConnector`] link.
const LINK_BUFFER: usize = 64;

/// One established observer transport.
#[derive(Debug)]
pub struct Link {
    /// Encoded messages to send to the server.
    pub outbound: mpsc::Sender<String>,
    /// Text frames received from the server. `None` means the link closed.
    pub inbound: mpsc::Receiver<String>,
}

/// Opens observer links.
pub trait Connector: Send + Sync + 'static {
    /// Establish a new link.
    ///
    /// # Errors
    ///
    /// [`ClientError::ConnectFailure`] if the transport cannot be opened.
    fn connect(&self) -> impl Future<Output = Result<Link, ClientError>> + Send;
}

/// `WebSocket` connector.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// Connector for the observer endpoint at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The endpoint this connector dials.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for WsConnector {
    async fn connect(&self) -> Result<Link, ClientError> {
        let (socket, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ClientError::ConnectFailure(format!("{}: {e}", self.url)))?;
        info!(url = %self.url, "observer socket open");

        let (mut sink, mut source) = socket.split();
        let (outbound, mut outbox) = mpsc::channel::<String>(LINK_BUFFER);
        let (inbox, inbound) = mpsc::channel::<String>(LINK_BUFFER);

        tokio::spawn(async move {
            while let Some(text) = outbox.recv().await {
                if let Err(e) = sink.send(Frame::Text(text.into())).await {
                    warn!(error = %e, "observer send failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                let text = match frame {
                    Ok(Frame::Text(text)) => text.as_str().to_owned(),
                    Ok(Frame::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(error = %e, "dropping non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Ok(Frame::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "observer receive failed");
                        break;
                    }
                };
                if inbox.send(text).await.is_err() {
                    break;
                }
            }
            debug!("observer socket reader finished");
        });

        Ok(Link { outbound, inbound })
    }
}
