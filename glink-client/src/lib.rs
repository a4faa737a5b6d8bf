/// GraphLink transaction client
///
/// Client-side protocol layer for GraphLink graph servers. A `Transceiver`
/// multiplexes correlated requests over one bidirectional transaction
/// stream; `ConceptService` turns typed graph operations into those
/// requests and decodes the answers into concept handles.

pub mod concept;
pub mod config;
pub mod error;
pub mod iterator;
pub mod remote;
pub mod resolver;
pub mod router;
pub mod service;
pub mod transceiver;

// Re-export key types
pub use concept::{
    AttributeType, Concept, ConceptKind, EntityType, Iid, RelationType, RoleType, Rule, Thing,
    ThingEncoding, ThingType, Type, TypeRef, ValueType,
};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use iterator::{IteratorState, LazySequence, ResponseIterator};
pub use resolver::resolve_concept;
pub use router::{RequestId, ResponseRouter, Routed};
pub use service::ConceptService;
pub use transceiver::Transceiver;
