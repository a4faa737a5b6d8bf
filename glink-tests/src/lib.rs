/// Test utilities for GraphLink client testing
///
/// `MockServer` is an in-memory graph server speaking the transaction
/// protocol over an in-process duplex. It answers schema and instance
/// requests from a small graph, serves iterators in batches, and can be
/// told to delay, withhold or reorder replies so that correlation and
/// cancellation can be observed.

use anyhow::{anyhow, Context as _};
use bytes::Bytes;
use glink_client::{ClientConfig, ConceptService, Transceiver};
use glink_proto::{
    self as proto, concept::Kind, iter_item, thing_method_iter_req, thing_method_iter_res,
    thing_method_req, thing_method_res, transaction_request::Req, transaction_response::Res,
    type_method_iter_req, type_method_iter_res, type_method_req, type_method_res, IterItem,
    TransactionRequest, TransactionResponse,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tonic::Status;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type Inbound = Result<TransactionResponse, Status>;

/// Initialize tracing for tests; RUST_LOG overrides the default level
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Failure answered to the client as an explicit error response
#[derive(Debug, Error)]
pub enum MockError {
    #[error("no type labelled '{0}'")]
    TypeNotFound(String),

    #[error("no thing with iid {0:?}")]
    ThingNotFound(Bytes),

    #[error("invalid request: {0}")]
    Invalid(String),
}

impl MockError {
    pub fn code(&self) -> &'static str {
        match self {
            MockError::TypeNotFound(_) => "TYPE_NOT_FOUND",
            MockError::ThingNotFound(_) => "THING_NOT_FOUND",
            MockError::Invalid(_) => "INVALID_REQUEST",
        }
    }
}

fn error_res(err: &anyhow::Error) -> Res {
    let code = err
        .downcast_ref::<MockError>()
        .map(MockError::code)
        .unwrap_or("INTERNAL");
    Res::Error(proto::ErrorRes {
        code: code.to_string(),
        message: format!("{:#}", err),
    })
}

struct TypeRecord {
    concept: proto::Concept,
    supertype: Option<String>,
}

struct ThingRecord {
    type_label: String,
    encoding: proto::ThingEncoding,
    has: Vec<Bytes>,
    relations: Vec<Bytes>,
}

/// Schema and instances served by the mock; ordered for stable iteration
#[derive(Default)]
struct Graph {
    types: BTreeMap<String, TypeRecord>,
    things: BTreeMap<Bytes, ThingRecord>,
}

fn label_of(concept: &proto::Concept) -> Option<&str> {
    match concept.kind.as_ref()? {
        Kind::ThingType(t) | Kind::EntityType(t) | Kind::RelationType(t) | Kind::Rule(t) => {
            Some(&t.label)
        }
        Kind::AttributeType(t) => Some(&t.label),
        Kind::RoleType(t) => Some(&t.label),
        Kind::Thing(_) => None,
    }
}

fn relabel(concept: &mut proto::Concept, label: &str) {
    match concept.kind.as_mut() {
        Some(Kind::ThingType(t))
        | Some(Kind::EntityType(t))
        | Some(Kind::RelationType(t))
        | Some(Kind::Rule(t)) => t.label = label.to_string(),
        Some(Kind::AttributeType(t)) => t.label = label.to_string(),
        Some(Kind::RoleType(t)) => t.label = label.to_string(),
        Some(Kind::Thing(_)) | None => {}
    }
}

impl Graph {
    fn seeded() -> Self {
        let mut graph = Self::default();
        graph.insert_type(proto::Concept::thing_type("thing"), None);
        graph.insert_type(proto::Concept::entity_type("entity"), Some("thing"));
        graph.insert_type(proto::Concept::relation_type("relation"), Some("thing"));
        graph.insert_type(
            proto::Concept::attribute_type("attribute", proto::ValueType::Object),
            Some("thing"),
        );
        graph.insert_type(proto::Concept::role_type("role", "relation"), None);
        graph.insert_type(proto::Concept::rule("rule"), None);
        graph
    }

    fn insert_type(&mut self, concept: proto::Concept, supertype: Option<&str>) {
        if let Some(label) = label_of(&concept).map(str::to_string) {
            self.types.insert(
                label,
                TypeRecord {
                    concept,
                    supertype: supertype.map(str::to_string),
                },
            );
        }
    }

    /// Existing concept for `label`, whatever its kind, or a freshly added one
    fn put_type(&mut self, concept: proto::Concept, root: &str) -> proto::Concept {
        let Some(label) = label_of(&concept).map(str::to_string) else {
            return concept;
        };
        if let Some(existing) = self.types.get(&label) {
            return existing.concept.clone();
        }
        self.insert_type(concept.clone(), Some(root));
        concept
    }

    fn get_type(&self, label: &str) -> anyhow::Result<&TypeRecord> {
        self.types
            .get(label)
            .ok_or_else(|| MockError::TypeNotFound(label.to_string()).into())
    }

    fn get_thing(&self, iid: &Bytes) -> anyhow::Result<&ThingRecord> {
        self.things
            .get(iid)
            .ok_or_else(|| MockError::ThingNotFound(iid.clone()).into())
    }

    fn thing_concept(&self, iid: &Bytes) -> Option<proto::Concept> {
        self.things
            .get(iid)
            .map(|t| proto::Concept::thing(iid.clone(), t.encoding))
    }

    /// `label` and every type below it
    fn subtypes(&self, label: &str) -> Vec<String> {
        self.types
            .keys()
            .filter(|candidate| {
                let mut current = Some(candidate.as_str());
                while let Some(l) = current {
                    if l == label {
                        return true;
                    }
                    current = self.types.get(l).and_then(|t| t.supertype.as_deref());
                }
                false
            })
            .cloned()
            .collect()
    }

    fn rename_type(&mut self, from: &str, to: &str) -> anyhow::Result<()> {
        let mut record = self
            .types
            .remove(from)
            .ok_or_else(|| MockError::TypeNotFound(from.to_string()))?;
        relabel(&mut record.concept, to);
        self.types.insert(to.to_string(), record);

        for t in self.types.values_mut() {
            if t.supertype.as_deref() == Some(from) {
                t.supertype = Some(to.to_string());
            }
        }
        for thing in self.things.values_mut() {
            if thing.type_label == from {
                thing.type_label = to.to_string();
            }
        }
        Ok(())
    }
}

/// Server-side state of one open iterator
struct Cursor {
    items: VecDeque<IterItem>,
    batch_size: usize,
}

/// Shared sending end of the inbound stream; empty once shut down
#[derive(Clone)]
struct Outbox {
    sender: Arc<Mutex<Option<mpsc::UnboundedSender<Inbound>>>>,
}

impl Outbox {
    fn send(&self, message: Inbound) {
        if let Some(sender) = self.sender.lock().as_ref() {
            let _ = sender.send(message);
        }
    }

    fn close(&self) {
        self.sender.lock().take();
    }
}

/// Builder for a scripted in-memory graph server
pub struct MockServer {
    graph: Graph,
    delays: HashMap<String, Duration>,
    silent: HashSet<String>,
    shuffle_window: usize,
    batching: bool,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServer {
    /// Server holding only the root concepts
    pub fn new() -> Self {
        Self {
            graph: Graph::seeded(),
            delays: HashMap::new(),
            silent: HashSet::new(),
            shuffle_window: 0,
            batching: true,
        }
    }

    /// Add or replace a type, under `supertype`
    pub fn with_type(mut self, concept: proto::Concept, supertype: Option<&str>) -> Self {
        self.graph.insert_type(concept, supertype);
        self
    }

    pub fn with_entity_type(self, label: &str, supertype: &str) -> Self {
        self.with_type(proto::Concept::entity_type(label), Some(supertype))
    }

    pub fn with_relation_type(self, label: &str, supertype: &str) -> Self {
        self.with_type(proto::Concept::relation_type(label), Some(supertype))
    }

    pub fn with_attribute_type(self, label: &str, value_type: proto::ValueType) -> Self {
        self.with_type(
            proto::Concept::attribute_type(label, value_type),
            Some("attribute"),
        )
    }

    /// Add an instance of `type_label`; its encoding follows the type's kind
    pub fn with_thing(mut self, iid: &[u8], type_label: &str) -> Self {
        let encoding = match self
            .graph
            .types
            .get(type_label)
            .and_then(|t| t.concept.kind.as_ref())
        {
            Some(Kind::RelationType(_)) => proto::ThingEncoding::Relation,
            Some(Kind::AttributeType(_)) => proto::ThingEncoding::Attribute,
            _ => proto::ThingEncoding::Entity,
        };
        self.graph.things.insert(
            Bytes::copy_from_slice(iid),
            ThingRecord {
                type_label: type_label.to_string(),
                encoding,
                has: Vec::new(),
                relations: Vec::new(),
            },
        );
        self
    }

    /// Make `owner` own the attribute thing `attribute`
    pub fn with_has(mut self, owner: &[u8], attribute: &[u8]) -> Self {
        if let Some(thing) = self.graph.things.get_mut(owner) {
            thing.has.push(Bytes::copy_from_slice(attribute));
        }
        self
    }

    /// Make `player` play a role in the relation thing `relation`
    pub fn with_role_player(mut self, relation: &[u8], player: &[u8]) -> Self {
        if let Some(thing) = self.graph.things.get_mut(player) {
            thing.relations.push(Bytes::copy_from_slice(relation));
        }
        self
    }

    /// Hold replies to requests naming `label` for `delay`
    pub fn delay_label(mut self, label: &str, delay: Duration) -> Self {
        self.delays.insert(label.to_string(), delay);
        self
    }

    /// Never reply to requests naming `label`
    pub fn silence_label(mut self, label: &str) -> Self {
        self.silent.insert(label.to_string());
        self
    }

    /// Collect unary replies and release each group of `window` in reverse
    /// arrival order
    pub fn shuffle_replies(mut self, window: usize) -> Self {
        self.shuffle_window = window;
        self
    }

    /// Send every iterator result at once, ignoring the requested batch size
    pub fn without_batching(mut self) -> Self {
        self.batching = false;
        self
    }

    /// Start serving with the default client configuration
    pub fn start(self) -> (Transceiver, ServerHandle) {
        self.start_with(ClientConfig::default())
    }

    /// Start serving and attach a transceiver built from `config`
    ///
    /// Panics if `config` is invalid; must be called within a Tokio runtime.
    pub fn start_with(self, config: ClientConfig) -> (Transceiver, ServerHandle) {
        let (out_tx, out_rx) = mpsc::unbounded_channel::<TransactionRequest>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<Inbound>();

        let outbox = Outbox {
            sender: Arc::new(Mutex::new(Some(in_tx))),
        };
        let requests = Arc::new(Mutex::new(Vec::new()));

        let worker = Worker {
            graph: self.graph,
            delays: self.delays,
            silent: self.silent,
            shuffle_window: self.shuffle_window,
            batching: self.batching,
            cursors: HashMap::new(),
            held: Vec::new(),
            outbox: outbox.clone(),
            requests: Arc::clone(&requests),
        };
        let task = tokio::spawn(worker.run(out_rx));

        let inbound = futures::stream::unfold(in_rx, |mut rx| async move {
            rx.recv().await.map(|message| (message, rx))
        });
        let transceiver =
            Transceiver::new(out_tx, inbound, config).expect("invalid client configuration");

        info!("Mock graph server started");
        (
            transceiver,
            ServerHandle {
                requests,
                outbox,
                task,
            },
        )
    }

    /// Start serving and wrap the transceiver in a `ConceptService`
    pub fn start_service(self) -> (ConceptService, ServerHandle) {
        let (transceiver, handle) = self.start();
        (ConceptService::new(transceiver), handle)
    }
}

/// Control side of a running mock server
pub struct ServerHandle {
    requests: Arc<Mutex<Vec<TransactionRequest>>>,
    outbox: Outbox,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<TransactionRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of received requests whose case satisfies `predicate`
    pub fn count_matching(&self, predicate: impl Fn(&Req) -> bool) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.req.as_ref().is_some_and(&predicate))
            .count()
    }

    /// Wait until at least `count` requests arrived (up to two seconds)
    pub async fn wait_for_requests(&self, count: usize) -> Vec<TransactionRequest> {
        for _ in 0..200 {
            if self.request_count() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.requests()
    }

    /// Push a raw message onto the inbound stream
    pub fn inject(&self, response: TransactionResponse) {
        self.outbox.send(Ok(response));
    }

    /// Fail the transaction stream with `status`
    pub fn fail(&self, status: Status) {
        self.outbox.send(Err(status));
    }

    /// Stop serving and end the inbound stream
    pub fn shutdown(self) {
        self.task.abort();
        self.outbox.close();
        info!("Mock graph server shut down");
    }
}

struct Worker {
    graph: Graph,
    delays: HashMap<String, Duration>,
    silent: HashSet<String>,
    shuffle_window: usize,
    batching: bool,
    cursors: HashMap<Vec<u8>, Cursor>,
    held: Vec<TransactionResponse>,
    outbox: Outbox,
    requests: Arc<Mutex<Vec<TransactionRequest>>>,
}

impl Worker {
    async fn run(mut self, mut requests: mpsc::UnboundedReceiver<TransactionRequest>) {
        loop {
            let next = if self.held.is_empty() {
                requests.recv().await
            } else {
                match tokio::time::timeout(Duration::from_millis(25), requests.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        self.flush_held();
                        continue;
                    }
                }
            };

            let Some(request) = next else {
                break;
            };
            self.requests.lock().push(request.clone());
            self.serve(request);
        }

        self.flush_held();
        debug!("Mock graph server saw the client hang up");
    }

    fn serve(&mut self, request: TransactionRequest) {
        let id = request.id;
        let Some(req) = request.req else {
            self.reply_now(&id, error_res(&anyhow!(MockError::Invalid("empty request".into()))));
            return;
        };

        let label = request_label(&req).map(str::to_string);
        if label.as_ref().is_some_and(|l| self.silent.contains(l)) {
            debug!(?label, "Withholding reply");
            return;
        }

        match req {
            Req::OpenThingIter(open) => {
                let batch_size = self.batch_size(open.options.as_ref());
                match self.open_thing_iter(open) {
                    Ok(items) => self.open_cursor(id, items, batch_size),
                    Err(e) => self.reply_now(&id, error_res(&e)),
                }
            }
            Req::OpenTypeIter(open) => {
                let batch_size = self.batch_size(open.options.as_ref());
                match self.open_type_iter(open) {
                    Ok(items) => self.open_cursor(id, items, batch_size),
                    Err(e) => self.reply_now(&id, error_res(&e)),
                }
            }
            Req::IterContinue(_) => {
                if self.cursors.contains_key(&id) {
                    self.send_batch(&id);
                }
            }
            Req::IterClose(_) => {
                if self.cursors.remove(&id).is_some() {
                    self.reply_now(&id, Res::IterDone(proto::IterDoneRes {}));
                }
            }
            unary => {
                let res = self.answer(unary).unwrap_or_else(|e| error_res(&e));
                let response = TransactionResponse::new(id, res);

                match label.and_then(|l| self.delays.get(&l).copied()) {
                    Some(delay) => {
                        let outbox = self.outbox.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            outbox.send(Ok(response));
                        });
                    }
                    None if self.shuffle_window > 0 => {
                        self.held.push(response);
                        if self.held.len() >= self.shuffle_window {
                            self.flush_held();
                        }
                    }
                    None => self.outbox.send(Ok(response)),
                }
            }
        }
    }

    fn reply_now(&self, id: &[u8], res: Res) {
        self.outbox.send(Ok(TransactionResponse::new(id.to_vec(), res)));
    }

    fn flush_held(&mut self) {
        for response in self.held.drain(..).rev() {
            self.outbox.send(Ok(response));
        }
    }

    fn batch_size(&self, options: Option<&proto::IterOptions>) -> usize {
        match options.map(|o| o.batch_size as usize) {
            Some(size) if self.batching && size > 0 => size,
            _ => usize::MAX,
        }
    }

    fn open_cursor(&mut self, id: Vec<u8>, items: Vec<IterItem>, batch_size: usize) {
        debug!(items = items.len(), batch_size, "Opening cursor");
        self.cursors.insert(
            id.clone(),
            Cursor {
                items: items.into(),
                batch_size,
            },
        );
        self.send_batch(&id);
    }

    fn send_batch(&mut self, id: &[u8]) {
        let Some(cursor) = self.cursors.get_mut(id) else {
            return;
        };

        let count = cursor.batch_size.min(cursor.items.len());
        let batch: Vec<IterItem> = cursor.items.drain(..count).collect();
        let finished = cursor.items.is_empty();

        for item in batch {
            self.reply_now(id, Res::IterItem(item));
        }
        if finished {
            self.cursors.remove(id);
            self.reply_now(id, Res::IterDone(proto::IterDoneRes {}));
        } else {
            self.reply_now(id, Res::IterContinue(proto::IterContinueRes {}));
        }
    }

    fn answer(&mut self, req: Req) -> anyhow::Result<Res> {
        let res = match req {
            Req::PutEntityType(put) => Res::PutEntityType(proto::PutEntityTypeRes {
                entity_type: Some(
                    self.graph
                        .put_type(proto::Concept::entity_type(put.label), "entity"),
                ),
            }),
            Req::PutRelationType(put) => Res::PutRelationType(proto::PutRelationTypeRes {
                relation_type: Some(
                    self.graph
                        .put_type(proto::Concept::relation_type(put.label), "relation"),
                ),
            }),
            Req::PutAttributeType(put) => {
                let value_type = proto::ValueType::try_from(put.value_type).map_err(|_| {
                    MockError::Invalid(format!("unknown value type {}", put.value_type))
                })?;
                Res::PutAttributeType(proto::PutAttributeTypeRes {
                    attribute_type: Some(self.graph.put_type(
                        proto::Concept::attribute_type(put.label, value_type),
                        "attribute",
                    )),
                })
            }
            Req::GetType(get) => Res::GetType(proto::GetTypeRes {
                r#type: self.graph.types.get(&get.label).map(|t| t.concept.clone()),
            }),
            Req::GetThing(get) => Res::GetThing(proto::GetThingRes {
                thing: self.graph.thing_concept(&get.iid),
            }),
            Req::TypeMethod(call) => {
                let method = call
                    .method
                    .and_then(|m| m.req)
                    .ok_or_else(|| MockError::Invalid("type method not set".into()))?;
                Res::TypeMethod(self.type_method(&call.label, method)?)
            }
            Req::ThingMethod(call) => {
                let method = call
                    .method
                    .and_then(|m| m.req)
                    .ok_or_else(|| MockError::Invalid("thing method not set".into()))?;
                Res::ThingMethod(self.thing_method(&call.iid, method)?)
            }
            other => {
                return Err(MockError::Invalid(format!("{:?} is not a unary request", other)).into())
            }
        };
        Ok(res)
    }

    fn type_method(
        &mut self,
        label: &str,
        method: type_method_req::Req,
    ) -> anyhow::Result<proto::TypeMethodRes> {
        let res = match method {
            type_method_req::Req::GetSupertype(_) => {
                let record = self.graph.get_type(label)?;
                let supertype = record
                    .supertype
                    .as_deref()
                    .and_then(|s| self.graph.types.get(s))
                    .map(|t| t.concept.clone());
                type_method_res::Res::GetSupertype(proto::GetSupertypeRes { supertype })
            }
            type_method_req::Req::Delete(_) => {
                self.graph
                    .types
                    .remove(label)
                    .ok_or_else(|| MockError::TypeNotFound(label.to_string()))?;
                type_method_res::Res::Delete(proto::DeleteRes {})
            }
            type_method_req::Req::SetLabel(set) => {
                self.graph
                    .rename_type(label, &set.label)
                    .with_context(|| format!("renaming '{}'", label))?;
                type_method_res::Res::SetLabel(proto::SetLabelRes {})
            }
        };
        Ok(proto::TypeMethodRes { res: Some(res) })
    }

    fn thing_method(
        &mut self,
        iid: &Bytes,
        method: thing_method_req::Req,
    ) -> anyhow::Result<proto::ThingMethodRes> {
        let res = match method {
            thing_method_req::Req::GetType(_) => {
                let thing = self.graph.get_thing(iid)?;
                let thing_type = self.graph.get_type(&thing.type_label)?.concept.clone();
                thing_method_res::Res::GetType(proto::ThingGetTypeRes {
                    thing_type: Some(thing_type),
                })
            }
            thing_method_req::Req::Delete(_) => {
                self.graph
                    .things
                    .remove(iid)
                    .ok_or_else(|| MockError::ThingNotFound(iid.clone()))?;
                thing_method_res::Res::Delete(proto::DeleteRes {})
            }
        };
        Ok(proto::ThingMethodRes { res: Some(res) })
    }

    fn open_type_iter(&self, open: proto::OpenTypeIterReq) -> anyhow::Result<Vec<IterItem>> {
        self.graph.get_type(&open.label)?;
        let method = open
            .method
            .and_then(|m| m.req)
            .ok_or_else(|| MockError::Invalid("type iterator method not set".into()))?;
        let subtypes = self.graph.subtypes(&open.label);

        let results = match method {
            type_method_iter_req::Req::GetSubtypes(_) => subtypes
                .iter()
                .filter_map(|l| self.graph.types.get(l))
                .map(|t| {
                    type_method_iter_res::Res::GetSubtypes(proto::GetSubtypesRes {
                        subtype: Some(t.concept.clone()),
                    })
                })
                .collect::<Vec<_>>(),
            type_method_iter_req::Req::GetInstances(_) => self
                .graph
                .things
                .iter()
                .filter(|(_, t)| subtypes.contains(&t.type_label))
                .map(|(iid, t)| {
                    type_method_iter_res::Res::GetInstances(proto::GetInstancesRes {
                        thing: Some(proto::Concept::thing(iid.clone(), t.encoding)),
                    })
                })
                .collect(),
        };

        Ok(results
            .into_iter()
            .map(|res| IterItem {
                item: Some(iter_item::Item::TypeMethod(proto::TypeMethodIterRes {
                    res: Some(res),
                })),
            })
            .collect())
    }

    fn open_thing_iter(&self, open: proto::OpenThingIterReq) -> anyhow::Result<Vec<IterItem>> {
        let thing = self.graph.get_thing(&open.iid)?;
        let method = open
            .method
            .and_then(|m| m.req)
            .ok_or_else(|| MockError::Invalid("thing iterator method not set".into()))?;

        let results = match method {
            thing_method_iter_req::Req::GetHas(get) => thing
                .has
                .iter()
                .filter(|iid| {
                    get.attribute_types.is_empty()
                        || self
                            .graph
                            .things
                            .get(*iid)
                            .is_some_and(|a| get.attribute_types.contains(&a.type_label))
                })
                .filter_map(|iid| self.graph.thing_concept(iid))
                .map(|attribute| {
                    thing_method_iter_res::Res::GetHas(proto::GetHasRes {
                        attribute: Some(attribute),
                    })
                })
                .collect::<Vec<_>>(),
            thing_method_iter_req::Req::GetRelations(_) => thing
                .relations
                .iter()
                .filter_map(|iid| self.graph.thing_concept(iid))
                .map(|relation| {
                    thing_method_iter_res::Res::GetRelations(proto::GetRelationsRes {
                        relation: Some(relation),
                    })
                })
                .collect(),
        };

        Ok(results
            .into_iter()
            .map(|res| IterItem {
                item: Some(iter_item::Item::ThingMethod(proto::ThingMethodIterRes {
                    res: Some(res),
                })),
            })
            .collect())
    }
}

/// Label a request names, for delay and silence matching
fn request_label(req: &Req) -> Option<&str> {
    match req {
        Req::PutEntityType(r) => Some(&r.label),
        Req::PutRelationType(r) => Some(&r.label),
        Req::PutAttributeType(r) => Some(&r.label),
        Req::GetType(r) => Some(&r.label),
        Req::TypeMethod(r) => Some(&r.label),
        Req::OpenTypeIter(r) => Some(&r.label),
        _ => None,
    }
}

/// Iterator fragment carrying a subtype result for `label`
pub fn subtype_item(label: &str) -> IterItem {
    IterItem {
        item: Some(iter_item::Item::TypeMethod(proto::TypeMethodIterRes {
            res: Some(type_method_iter_res::Res::GetSubtypes(proto::GetSubtypesRes {
                subtype: Some(proto::Concept::entity_type(label)),
            })),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_roots() {
        let graph = Graph::seeded();
        for root in ["thing", "entity", "relation", "attribute", "role", "rule"] {
            assert!(graph.types.contains_key(root), "missing root {}", root);
        }
        assert_eq!(graph.subtypes("thing"), vec!["attribute", "entity", "relation", "thing"]);
    }

    #[test]
    fn test_put_type_returns_existing_concept() {
        let mut graph = Graph::seeded();
        let first = graph.put_type(proto::Concept::entity_type("person"), "entity");
        let second = graph.put_type(proto::Concept::entity_type("person"), "entity");
        assert_eq!(first, second);

        let clash = graph.put_type(proto::Concept::entity_type("relation"), "entity");
        assert_eq!(clash, proto::Concept::relation_type("relation"));
    }

    #[test]
    fn test_rename_moves_subtypes_and_instances() {
        let mut graph = Graph::seeded();
        graph.insert_type(proto::Concept::entity_type("person"), Some("entity"));
        graph.insert_type(proto::Concept::entity_type("student"), Some("person"));

        graph.rename_type("person", "human").unwrap();
        assert_eq!(graph.subtypes("human"), vec!["human", "student"]);
        assert!(graph.rename_type("person", "x").is_err());
    }

    #[test]
    fn test_error_codes_survive_context() {
        let err = anyhow::Error::from(MockError::TypeNotFound("person".into()))
            .context("renaming 'person'");
        match error_res(&err) {
            Res::Error(e) => {
                assert_eq!(e.code, "TYPE_NOT_FOUND");
                assert!(e.message.starts_with("renaming 'person'"));
            }
            other => panic!("expected error response, got {:?}", other),
        }
    }
}
