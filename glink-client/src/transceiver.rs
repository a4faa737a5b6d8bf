/// Transaction channel transceiver
///
/// Owns one duplex transaction channel. Outbound requests are queued on an
/// unbounded sender; a single reader task drains the inbound stream and hands
/// each message to the `ResponseRouter`, which wakes the caller waiting on
/// that request id.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::iterator::ResponseIterator;
use crate::router::{describe, RequestId, ResponseRouter, Routed};
use futures::{Stream, StreamExt};
use glink_proto::{self as proto, transaction_request::Req, TransactionRequest, TransactionResponse};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::Status;
use tracing::{debug, info, warn};

/// State shared by the transceiver handle and its open iterators
pub(crate) struct Shared {
    /// Taken on close so the request stream ends
    outbound: Mutex<Option<mpsc::UnboundedSender<TransactionRequest>>>,
    pub(crate) router: Arc<ResponseRouter>,
    pub(crate) config: ClientConfig,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    /// Queue a request tagged with `id`, attaching the configured metadata
    pub(crate) fn send(&self, id: RequestId, mut request: TransactionRequest) -> Result<()> {
        request.id = id.to_vec();
        for (key, value) in &self.config.metadata {
            request
                .metadata
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        debug!(request_id = %id, kind = request_kind(&request.req), "Sending request");
        let outbound = self.outbound.lock();
        let closed = || ClientError::Transport("transaction channel closed".to_string());
        outbound
            .as_ref()
            .ok_or_else(closed)?
            .send(request)
            .map_err(|_| closed())
    }

    /// Send an iterator control request (continue or close) on `id`
    pub(crate) fn send_control(&self, id: RequestId, req: Req) -> Result<()> {
        self.send(
            id,
            TransactionRequest {
                id: Vec::new(),
                metadata: Default::default(),
                req: Some(req),
            },
        )
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
    }
}

/// Request/response correlation over one transaction channel
///
/// Cheap to clone; all clones share the same channel. Safe to use from many
/// tasks at once: each call waits only for its own response.
#[derive(Clone)]
pub struct Transceiver {
    shared: Arc<Shared>,
}

impl Transceiver {
    /// Connect to a GraphLink server and open a transaction stream
    ///
    /// # Arguments
    /// * `addr` - Server address (e.g., "http://127.0.0.1:1729")
    /// * `config` - Client configuration
    ///
    /// # Example
    /// ```no_run
    /// # use glink_client::{ClientConfig, Transceiver};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let transceiver = Transceiver::connect("http://localhost:1729", ClientConfig::default()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(addr: impl Into<String>, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let addr = addr.into();

        let channel = Endpoint::from_shared(addr.clone())
            .map_err(|e| ClientError::Connection(format!("Invalid address: {}", e)))?
            .connect_timeout(config.connect_timeout)
            .connect()
            .await
            .map_err(|e| ClientError::Connection(format!("Failed to connect: {}", e)))?;

        info!(addr = %addr, "Connected to GraphLink server");
        Self::open(channel, config).await
    }

    /// Open a transaction stream on an established gRPC channel
    pub async fn open(channel: Channel, config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready()
            .await
            .map_err(|e| ClientError::Connection(format!("Service was not ready: {}", e)))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let outbound = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|request| (request, rx))
        });

        let codec: ProstCodec<TransactionRequest, TransactionResponse> = ProstCodec::default();
        let path = PathAndQuery::from_static(proto::TRANSACTION_PATH);
        let inbound = grpc
            .streaming(tonic::Request::new(outbound), path, codec)
            .await?
            .into_inner();

        Self::new(tx, inbound, config)
    }

    /// Attach to an already established duplex
    ///
    /// Requests are written to `outbound`; `inbound` must yield the server's
    /// messages in the order the server sent them. Must be called within a
    /// Tokio runtime: the inbound reader runs as a spawned task.
    pub fn new<S>(
        outbound: mpsc::UnboundedSender<TransactionRequest>,
        inbound: S,
        config: ClientConfig,
    ) -> Result<Self>
    where
        S: Stream<Item = std::result::Result<TransactionResponse, Status>> + Send + 'static,
    {
        config.validate()?;

        let router = Arc::new(ResponseRouter::new());
        let reader = tokio::spawn(read_inbound(inbound, Arc::clone(&router)));

        Ok(Self {
            shared: Arc::new(Shared {
                outbound: Mutex::new(Some(outbound)),
                router,
                config,
                reader: Mutex::new(Some(reader)),
            }),
        })
    }

    /// Send `request` and wait for the response carrying the same id
    ///
    /// Fails with `Transport` if the channel closes first, `Timeout` if the
    /// configured deadline elapses, and `Remote` if the server answers with
    /// an explicit failure.
    pub async fn send_and_receive(&self, request: TransactionRequest) -> Result<TransactionResponse> {
        let id = RequestId::new();
        let receiver = self.shared.router.register_unary(id)?;

        if let Err(e) = self.shared.send(id, request) {
            self.shared.router.retire(id);
            return Err(e);
        }

        let delivery = match self.shared.config.request_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, receiver).await {
                Ok(delivery) => delivery,
                Err(_) => {
                    self.shared.router.retire(id);
                    warn!(request_id = %id, ?timeout, "Request timed out");
                    return Err(ClientError::Timeout(format!(
                        "no response to request {} within {:?}",
                        id, timeout
                    )));
                }
            },
            None => receiver.await,
        };

        let response = delivery.map_err(|_| {
            ClientError::Transport(format!("response slot for request {} was dropped", id))
        })??;

        debug!(request_id = %id, kind = describe(&response.res), "Received response");
        Ok(response)
    }

    /// Open a server-side iterator and return its lazy fragment sequence
    ///
    /// Nothing is read until the iterator is pulled. The iterator must be
    /// drained or closed to release the server cursor; dropping it closes it.
    pub fn open_iterator(&self, request: TransactionRequest) -> Result<ResponseIterator> {
        let id = RequestId::new();
        let receiver = self.shared.router.register_stream(id)?;

        if let Err(e) = self.shared.send(id, request) {
            self.shared.router.retire(id);
            return Err(e);
        }

        Ok(ResponseIterator::new(id, receiver, Arc::clone(&self.shared)))
    }

    /// Client configuration this transceiver was built with
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Number of calls and iterators still awaiting the server
    pub fn pending(&self) -> usize {
        self.shared.router.pending()
    }

    /// True once the channel has failed or `close` was called
    pub fn is_closed(&self) -> bool {
        self.shared.router.is_closed()
    }

    /// End the request stream, stop reading the channel and fail every
    /// outstanding call
    pub fn close(&self) {
        info!("Closing transaction channel");
        self.shared.outbound.lock().take();
        if let Some(reader) = self.shared.reader.lock().take() {
            reader.abort();
        }
        self.shared
            .router
            .fail_all(ClientError::Transport("transaction closed by client".to_string()));
    }
}

/// Drain the inbound stream into the router until it ends or fails
async fn read_inbound<S>(inbound: S, router: Arc<ResponseRouter>)
where
    S: Stream<Item = std::result::Result<TransactionResponse, Status>> + Send + 'static,
{
    futures::pin_mut!(inbound);

    while let Some(message) = inbound.next().await {
        match message {
            Ok(response) => {
                if router.dispatch(response) == Routed::Dropped {
                    debug!("Inbound message had no waiting caller");
                }
            }
            Err(status) => {
                let err = ClientError::from(status);
                warn!(error = %err, "Transaction stream failed");
                router.fail_all(err);
                return;
            }
        }
    }

    info!("Transaction stream closed by server");
    router.fail_all(ClientError::Transport(
        "transaction stream closed by server".to_string(),
    ));
}

fn request_kind(req: &Option<Req>) -> &'static str {
    match req {
        None => "unset",
        Some(Req::PutEntityType(_)) => "put_entity_type",
        Some(Req::PutRelationType(_)) => "put_relation_type",
        Some(Req::PutAttributeType(_)) => "put_attribute_type",
        Some(Req::GetType(_)) => "get_type",
        Some(Req::GetThing(_)) => "get_thing",
        Some(Req::ThingMethod(_)) => "thing_method",
        Some(Req::TypeMethod(_)) => "type_method",
        Some(Req::OpenThingIter(_)) => "open_thing_iter",
        Some(Req::OpenTypeIter(_)) => "open_type_iter",
        Some(Req::IterContinue(_)) => "iter_continue",
        Some(Req::IterClose(_)) => "iter_close",
    }
}
