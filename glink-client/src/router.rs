/// Response routing for the transaction channel
///
/// Every outbound request carries a `RequestId`; the server echoes it on the
/// matching response or on every fragment of an iterator. The router owns
/// the map from id to the slot of the waiting caller and demultiplexes the
/// single ordered inbound stream into those slots.

use crate::error::{ClientError, Result};
use glink_proto::{transaction_response::Res, TransactionResponse};
use parking_lot::Mutex;
use prost::Message;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Correlation token linking a request to its response or fragment stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the wire form; None if it is not 16 bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Uuid::from_slice(bytes).ok().map(Self)
    }

    /// Wire form of the id
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How many closed iterator ids are remembered for quiet discards
pub const RETIRED_CAPACITY: usize = 1024;

/// What a waiting caller receives: a response, or the error that ended it
pub(crate) type Delivery = Result<TransactionResponse>;

enum Slot {
    /// Single-shot call; removed on first delivery
    Unary(oneshot::Sender<Delivery>),
    /// Open iterator; removed on its terminal fragment
    Stream(mpsc::UnboundedSender<Delivery>),
}

/// Bounded FIFO of ids whose iterators were closed by the consumer
#[derive(Default)]
struct Retired {
    order: VecDeque<RequestId>,
    ids: HashSet<RequestId>,
}

impl Retired {
    fn insert(&mut self, id: RequestId) {
        if !self.ids.insert(id) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > RETIRED_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    fn contains(&self, id: &RequestId) -> bool {
        self.ids.contains(id)
    }

    fn forget(&mut self, id: &RequestId) {
        if self.ids.remove(id) {
            self.order.retain(|other| other != id);
        }
    }
}

struct RouterState {
    slots: HashMap<RequestId, Slot>,
    /// Closed iterators; late fragments for these are discarded quietly
    retired: Retired,
    /// Set once the channel has failed; every later registration gets it
    closed: Option<ClientError>,
}

/// Outcome of routing one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Handed to the waiting caller or iterator
    Delivered,
    /// Fragment for an iterator the consumer already closed
    Discarded,
    /// No live slot for the id, or the id was malformed
    Dropped,
}

/// Correlation map from request id to pending-call slot
pub struct ResponseRouter {
    state: Mutex<RouterState>,
}

impl ResponseRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RouterState {
                slots: HashMap::new(),
                retired: Retired::default(),
                closed: None,
            }),
        }
    }

    /// Register a single-shot slot for `id`
    pub(crate) fn register_unary(&self, id: RequestId) -> Result<oneshot::Receiver<Delivery>> {
        let (tx, rx) = oneshot::channel();
        self.register(id, Slot::Unary(tx))?;
        Ok(rx)
    }

    /// Register a fragment queue for `id`
    pub(crate) fn register_stream(
        &self,
        id: RequestId,
    ) -> Result<mpsc::UnboundedReceiver<Delivery>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.register(id, Slot::Stream(tx))?;
        Ok(rx)
    }

    fn register(&self, id: RequestId, slot: Slot) -> Result<()> {
        let mut state = self.state.lock();

        if let Some(err) = &state.closed {
            return Err(err.clone());
        }

        match state.slots.entry(id) {
            Entry::Occupied(_) => Err(ClientError::Protocol(format!(
                "request id {} is already in use",
                id
            ))),
            Entry::Vacant(entry) => {
                entry.insert(slot);
                trace!(request_id = %id, "Registered response slot");
                Ok(())
            }
        }
    }

    /// Remove the slot for `id`; returns false if it was not registered
    pub fn retire(&self, id: RequestId) -> bool {
        let removed = self.state.lock().slots.remove(&id).is_some();
        if removed {
            trace!(request_id = %id, "Retired response slot");
        }
        removed
    }

    /// Release the slot of an iterator closed by its consumer
    ///
    /// The id is remembered among the last `RETIRED_CAPACITY` closed
    /// iterators so fragments still in flight are discarded quietly.
    pub fn cancel(&self, id: RequestId) {
        let mut state = self.state.lock();
        if state.slots.remove(&id).is_some() {
            state.retired.insert(id);
            trace!(request_id = %id, "Cancelled iterator slot");
        }
    }

    /// Route one inbound message to its slot
    pub fn dispatch(&self, response: TransactionResponse) -> Routed {
        let Some(id) = RequestId::from_bytes(&response.id) else {
            warn!(
                id_len = response.id.len(),
                "Dropping response with malformed request id"
            );
            return Routed::Dropped;
        };

        let terminal = is_terminal(&response);
        let encoded_len = response.encoded_len();
        let mut state = self.state.lock();

        match state.slots.remove(&id) {
            None if state.retired.contains(&id) => {
                debug!(request_id = %id, terminal, "Discarding fragment for closed iterator");
                if terminal {
                    state.retired.forget(&id);
                }
                Routed::Discarded
            }
            None => {
                warn!(
                    request_id = %id,
                    kind = describe(&response.res),
                    "Dropping response for unknown or retired request"
                );
                Routed::Dropped
            }
            Some(Slot::Unary(tx)) => {
                debug!(request_id = %id, bytes = encoded_len, "Delivering response");
                if tx.send(into_delivery(response)).is_err() {
                    debug!(request_id = %id, "Caller stopped waiting before its response arrived");
                }
                Routed::Delivered
            }
            Some(Slot::Stream(tx)) => {
                if tx.send(into_delivery(response)).is_err() {
                    debug!(request_id = %id, "Iterator consumer gone, dropping fragment");
                    return Routed::Discarded;
                }
                trace!(request_id = %id, bytes = encoded_len, terminal, "Delivering fragment");
                if !terminal {
                    state.slots.insert(id, Slot::Stream(tx));
                }
                Routed::Delivered
            }
        }
    }

    /// Fail every pending call with `err` and refuse new registrations
    pub fn fail_all(&self, err: ClientError) {
        let mut state = self.state.lock();
        if state.closed.is_some() {
            return;
        }

        let pending = state.slots.len();
        for (_, slot) in state.slots.drain() {
            match slot {
                Slot::Unary(tx) => {
                    let _ = tx.send(Err(err.clone()));
                }
                Slot::Stream(tx) => {
                    let _ = tx.send(Err(err.clone()));
                }
            }
        }

        if pending > 0 {
            warn!(pending, error = %err, "Failed pending calls on closed channel");
        }
        state.retired = Retired::default();
        state.closed = Some(err);
    }

    /// Number of calls and open iterators awaiting the server
    pub fn pending(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// True once the channel has failed or been closed
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed.is_some()
    }
}

impl Default for ResponseRouter {
    fn default() -> Self {
        Self::new()
    }
}

fn is_terminal(response: &TransactionResponse) -> bool {
    matches!(response.res, Some(Res::IterDone(_)) | Some(Res::Error(_)))
}

/// An explicit server failure becomes the caller's error
fn into_delivery(response: TransactionResponse) -> Delivery {
    match response.res {
        Some(Res::Error(err)) => Err(ClientError::Remote {
            code: err.code,
            message: err.message,
        }),
        _ => Ok(response),
    }
}

/// Short name of a response case, for logs and protocol errors
pub(crate) fn describe(res: &Option<Res>) -> &'static str {
    match res {
        None => "unset",
        Some(Res::PutEntityType(_)) => "put_entity_type",
        Some(Res::PutRelationType(_)) => "put_relation_type",
        Some(Res::PutAttributeType(_)) => "put_attribute_type",
        Some(Res::GetType(_)) => "get_type",
        Some(Res::GetThing(_)) => "get_thing",
        Some(Res::ThingMethod(_)) => "thing_method",
        Some(Res::TypeMethod(_)) => "type_method",
        Some(Res::IterItem(_)) => "iter_item",
        Some(Res::IterContinue(_)) => "iter_continue",
        Some(Res::IterDone(_)) => "iter_done",
        Some(Res::Error(_)) => "error",
    }
}
