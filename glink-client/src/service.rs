/// Concept service facade
///
/// Typed graph operations over one transaction. Each call builds exactly one
/// request (none for `put_rule`), sends it through the `Transceiver` and
/// decodes the answer with the concept resolver.

use crate::concept::{
    AttributeType, Concept, ConceptKind, EntityType, Iid, RelationType, RoleType, Rule, ThingType,
    Type, TypeRef, ValueType,
};
use crate::error::{ClientError, Result};
use crate::iterator::LazySequence;
use crate::resolver::{resolve_optional, resolve_required};
use crate::router::describe;
use crate::transceiver::Transceiver;
use glink_proto::{
    self as proto, iter_item, transaction_request::Req, transaction_response::Res, IterItem,
    IterOptions, ThingMethodIterReq, ThingMethodIterRes, ThingMethodReq, ThingMethodRes,
    TransactionRequest, TypeMethodIterReq, TypeMethodIterRes, TypeMethodReq, TypeMethodRes,
};
use tracing::debug;

/// Reserved labels of the root concepts
pub const ROOT_THING: &str = "thing";
pub const ROOT_ENTITY: &str = "entity";
pub const ROOT_RELATION: &str = "relation";
pub const ROOT_ATTRIBUTE: &str = "attribute";
pub const ROOT_ROLE: &str = "role";
pub const ROOT_RULE: &str = "rule";

/// Typed concept operations over a shared transaction channel
#[derive(Clone)]
pub struct ConceptService {
    transceiver: Transceiver,
}

impl ConceptService {
    pub fn new(transceiver: Transceiver) -> Self {
        Self { transceiver }
    }

    pub fn transceiver(&self) -> &Transceiver {
        &self.transceiver
    }

    /// Send one request and return its populated result case
    async fn call(&self, req: Req) -> Result<Res> {
        let response = self.transceiver.send_and_receive(request(req)).await?;
        response
            .res
            .ok_or_else(|| ClientError::Protocol("response has no result case".to_string()))
    }

    /// Root of the type hierarchy (`thing`)
    pub async fn get_root_type(&self) -> Result<ThingType> {
        self.root(ROOT_THING, ConceptKind::ThingType)
            .await
            .and_then(|t| t.as_thing_type())
            .map_err(|e| e.with_context("while resolving root type"))
    }

    pub async fn get_root_entity_type(&self) -> Result<EntityType> {
        self.root(ROOT_ENTITY, ConceptKind::EntityType)
            .await
            .and_then(|t| t.as_entity_type())
            .map_err(|e| e.with_context("while resolving root entity type"))
    }

    pub async fn get_root_relation_type(&self) -> Result<RelationType> {
        self.root(ROOT_RELATION, ConceptKind::RelationType)
            .await
            .and_then(|t| t.as_relation_type())
            .map_err(|e| e.with_context("while resolving root relation type"))
    }

    pub async fn get_root_attribute_type(&self) -> Result<AttributeType> {
        self.root(ROOT_ATTRIBUTE, ConceptKind::AttributeType)
            .await
            .and_then(|t| t.as_attribute_type())
            .map_err(|e| e.with_context("while resolving root attribute type"))
    }

    pub async fn get_root_role_type(&self) -> Result<RoleType> {
        self.root(ROOT_ROLE, ConceptKind::RoleType)
            .await
            .and_then(|t| t.as_role_type())
            .map_err(|e| e.with_context("while resolving root role type"))
    }

    pub async fn get_root_rule(&self) -> Result<Rule> {
        self.root(ROOT_RULE, ConceptKind::Rule)
            .await
            .and_then(|t| t.as_rule())
            .map_err(|e| e.with_context("while resolving root rule"))
    }

    /// A root concept must exist; its absence means the server is not a
    /// graph server this client understands
    async fn root(&self, label: &str, expected: ConceptKind) -> Result<Type> {
        match self.get_type(label).await? {
            Some(Concept::Type(t)) => Ok(t),
            Some(Concept::Thing(_)) => Err(mismatch(expected, ConceptKind::Thing)),
            None => Err(ClientError::Protocol(format!(
                "server has no root concept labelled '{}'",
                label
            ))),
        }
    }

    /// Create the entity type `label`, or return the existing one
    pub async fn put_entity_type(&self, label: &str) -> Result<EntityType> {
        let req = Req::PutEntityType(proto::PutEntityTypeReq {
            label: label.to_string(),
        });
        match self.call(req).await? {
            Res::PutEntityType(res) => {
                resolve_required(res.entity_type, "put entity type")?.as_entity_type()
            }
            other => Err(unexpected("put entity type", other)),
        }
    }

    /// Create the relation type `label`, or return the existing one
    pub async fn put_relation_type(&self, label: &str) -> Result<RelationType> {
        let req = Req::PutRelationType(proto::PutRelationTypeReq {
            label: label.to_string(),
        });
        match self.call(req).await? {
            Res::PutRelationType(res) => {
                resolve_required(res.relation_type, "put relation type")?.as_relation_type()
            }
            other => Err(unexpected("put relation type", other)),
        }
    }

    /// Create the attribute type `label` holding `value_type` values, or
    /// return the existing one
    pub async fn put_attribute_type(
        &self,
        label: &str,
        value_type: ValueType,
    ) -> Result<AttributeType> {
        let req = Req::PutAttributeType(proto::PutAttributeTypeReq {
            label: label.to_string(),
            value_type: proto::ValueType::from(value_type) as i32,
        });
        match self.call(req).await? {
            Res::PutAttributeType(res) => {
                resolve_required(res.attribute_type, "put attribute type")?.as_attribute_type()
            }
            other => Err(unexpected("put attribute type", other)),
        }
    }

    /// Entity type labelled `label`; None if absent or of another kind
    pub async fn get_entity_type(&self, label: &str) -> Result<Option<EntityType>> {
        Ok(self.get_type(label).await?.and_then(|c| c.entity_type()))
    }

    /// Relation type labelled `label`; None if absent or of another kind
    pub async fn get_relation_type(&self, label: &str) -> Result<Option<RelationType>> {
        Ok(self.get_type(label).await?.and_then(|c| c.relation_type()))
    }

    /// Attribute type labelled `label`; None if absent or of another kind
    pub async fn get_attribute_type(&self, label: &str) -> Result<Option<AttributeType>> {
        Ok(self.get_type(label).await?.and_then(|c| c.attribute_type()))
    }

    /// Rule creation is not part of this protocol version
    ///
    /// Always fails with `UnsupportedOperation` without contacting the
    /// server. Existing rules can still be read with `get_rule`.
    pub async fn put_rule(&self, label: &str, _when: &str, _then: &str) -> Result<Rule> {
        debug!(label, "Rejecting rule creation");
        Err(ClientError::UnsupportedOperation(format!(
            "cannot create rule '{}': rule creation is not supported",
            label
        )))
    }

    /// Rule labelled `label`; None if absent or of another kind
    pub async fn get_rule(&self, label: &str) -> Result<Option<Rule>> {
        Ok(self.get_type(label).await?.and_then(|c| c.rule()))
    }

    /// Look up any type by label
    ///
    /// # Returns
    /// The concept if the server has a type with this label, None otherwise
    ///
    /// # Example
    /// ```no_run
    /// # use glink_client::{ClientConfig, ConceptService, Transceiver};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let transceiver = Transceiver::connect("http://localhost:1729", ClientConfig::default()).await?;
    /// let service = ConceptService::new(transceiver);
    ///
    /// if let Some(person) = service.get_type("person").await? {
    ///     println!("found {}", person.kind());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_type(&self, label: &str) -> Result<Option<Concept>> {
        let req = Req::GetType(proto::GetTypeReq {
            label: label.to_string(),
        });
        match self.call(req).await? {
            Res::GetType(res) => resolve_optional(res.r#type),
            other => Err(unexpected("get type", other)),
        }
    }

    /// Look up a thing by its identity
    ///
    /// # Returns
    /// The concept if the thing exists, None otherwise
    pub async fn get_thing(&self, iid: &Iid) -> Result<Option<Concept>> {
        let req = Req::GetThing(proto::GetThingReq { iid: iid.to_bytes() });
        match self.call(req).await? {
            Res::GetThing(res) => resolve_optional(res.thing),
            other => Err(unexpected("get thing", other)),
        }
    }

    /// Run a method on one thing and return its raw result envelope
    pub async fn invoke_thing_method(
        &self,
        iid: &Iid,
        method: ThingMethodReq,
    ) -> Result<ThingMethodRes> {
        let req = Req::ThingMethod(proto::ThingMethodCall {
            iid: iid.to_bytes(),
            method: Some(method),
        });
        match self.call(req).await? {
            Res::ThingMethod(res) => Ok(res),
            other => Err(unexpected("thing method", other)),
        }
    }

    /// Run a method on one type and return its raw result envelope
    pub async fn invoke_type_method(
        &self,
        target: &TypeRef,
        method: TypeMethodReq,
    ) -> Result<TypeMethodRes> {
        let req = Req::TypeMethod(proto::TypeMethodCall {
            label: target.label.clone(),
            scope: target.scope.clone().unwrap_or_default(),
            method: Some(method),
        });
        match self.call(req).await? {
            Res::TypeMethod(res) => Ok(res),
            other => Err(unexpected("type method", other)),
        }
    }

    /// Open a server cursor over a thing method's results
    ///
    /// Every call opens an independent cursor. Nothing is fetched until the
    /// returned sequence is pulled.
    pub fn iterate_thing_method<T, F>(
        &self,
        iid: &Iid,
        method: ThingMethodIterReq,
        decode: F,
    ) -> Result<LazySequence<T>>
    where
        F: Fn(ThingMethodIterRes) -> Result<T> + Send + 'static,
    {
        let req = Req::OpenThingIter(proto::OpenThingIterReq {
            iid: iid.to_bytes(),
            method: Some(method),
            options: Some(self.iter_options()),
        });
        let iterator = self.transceiver.open_iterator(request(req))?;

        Ok(LazySequence::new(
            iterator,
            Box::new(move |item: IterItem| match item.item {
                Some(iter_item::Item::ThingMethod(res)) => decode(res),
                other => Err(unexpected_item("thing method", other)),
            }),
        ))
    }

    /// Open a server cursor over a type method's results
    pub fn iterate_type_method<T, F>(
        &self,
        target: &TypeRef,
        method: TypeMethodIterReq,
        decode: F,
    ) -> Result<LazySequence<T>>
    where
        F: Fn(TypeMethodIterRes) -> Result<T> + Send + 'static,
    {
        let req = Req::OpenTypeIter(proto::OpenTypeIterReq {
            label: target.label.clone(),
            scope: target.scope.clone().unwrap_or_default(),
            method: Some(method),
            options: Some(self.iter_options()),
        });
        let iterator = self.transceiver.open_iterator(request(req))?;

        Ok(LazySequence::new(
            iterator,
            Box::new(move |item: IterItem| match item.item {
                Some(iter_item::Item::TypeMethod(res)) => decode(res),
                other => Err(unexpected_item("type method", other)),
            }),
        ))
    }

    fn iter_options(&self) -> IterOptions {
        IterOptions {
            batch_size: self.transceiver.config().batch_size,
        }
    }
}

fn request(req: Req) -> TransactionRequest {
    TransactionRequest {
        id: Vec::new(),
        metadata: Default::default(),
        req: Some(req),
    }
}

fn mismatch(expected: ConceptKind, found: ConceptKind) -> ClientError {
    ClientError::TypeMismatch {
        expected: expected.name(),
        found,
    }
}

fn unexpected(operation: &str, res: Res) -> ClientError {
    ClientError::Protocol(format!(
        "{} answered with a {} response",
        operation,
        describe(&Some(res))
    ))
}

fn unexpected_item(operation: &str, item: Option<iter_item::Item>) -> ClientError {
    let found = match item {
        None => "empty",
        Some(iter_item::Item::ThingMethod(_)) => "thing method",
        Some(iter_item::Item::TypeMethod(_)) => "type method",
    };
    ClientError::Protocol(format!(
        "{} iterator yielded a {} item",
        operation, found
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use glink_proto::{GetTypeRes, TransactionResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Service backed by a responder answering each request in order
    fn scripted<F>(respond: F) -> (ConceptService, Arc<AtomicUsize>)
    where
        F: Fn(&Req) -> Res + Send + 'static,
    {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<TransactionRequest>();
        let (in_tx, in_rx) =
            mpsc::unbounded_channel::<std::result::Result<TransactionResponse, tonic::Status>>();
        let sent = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&sent);
        tokio::spawn(async move {
            while let Some(request) = out_rx.recv().await {
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(req) = &request.req {
                    let response = TransactionResponse::new(request.id.clone(), respond(req));
                    if in_tx.send(Ok(response)).is_err() {
                        break;
                    }
                }
            }
        });

        let inbound = futures::stream::unfold(in_rx, |mut rx| async move {
            rx.recv().await.map(|message| (message, rx))
        });
        let transceiver = Transceiver::new(out_tx, inbound, ClientConfig::default()).unwrap();
        (ConceptService::new(transceiver), sent)
    }

    fn get_type_answer(concept: Option<proto::Concept>) -> Res {
        Res::GetType(GetTypeRes { r#type: concept })
    }

    #[tokio::test]
    async fn test_put_rule_never_sends() {
        let (service, sent) = scripted(|_| get_type_answer(None));

        let err = service.put_rule("r", "{ $x isa person; }", "{ $x has name 'a'; }").await;
        assert!(matches!(err, Err(ClientError::UnsupportedOperation(_))));
        tokio::task::yield_now().await;
        assert_eq!(sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_absent_type_is_none() {
        let (service, sent) = scripted(|_| get_type_answer(None));

        assert_eq!(service.get_type("doesNotExist").await.unwrap(), None);
        assert_eq!(sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_typed_lookup_of_other_kind_is_none() {
        let (service, _) =
            scripted(|_| get_type_answer(Some(proto::Concept::relation_type("marriage"))));

        assert_eq!(service.get_entity_type("marriage").await.unwrap(), None);
        assert_eq!(
            service.get_relation_type("marriage").await.unwrap(),
            Some(RelationType::new("marriage"))
        );
    }

    #[tokio::test]
    async fn test_root_of_wrong_kind_is_mismatch_with_context() {
        let (service, _) =
            scripted(|_| get_type_answer(Some(proto::Concept::relation_type("entity"))));

        let err = service.get_root_entity_type().await.unwrap_err();
        assert_eq!(err.code(), "TYPE_MISMATCH");
        assert!(err.to_string().starts_with("while resolving root entity type"));
    }

    #[tokio::test]
    async fn test_root_thing_type_narrows_any_thing_type() {
        let (service, _) =
            scripted(|_| get_type_answer(Some(proto::Concept::entity_type("thing"))));
        assert_eq!(service.get_root_type().await.unwrap(), ThingType::new("thing"));

        let (service, _) =
            scripted(|_| get_type_answer(Some(proto::Concept::role_type("thing", "marriage"))));
        let err = service.get_root_type().await.unwrap_err();
        assert!(err.to_string().starts_with("while resolving root type"));
        assert!(matches!(
            err.root(),
            ClientError::TypeMismatch {
                found: ConceptKind::RoleType,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unexpected_response_case_is_protocol_error() {
        let (service, _) = scripted(|_| Res::IterDone(proto::IterDoneRes {}));

        let err = service.get_type("person").await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(ref m) if m.contains("iter_done")));
    }

    #[tokio::test]
    async fn test_put_without_concept_is_protocol_error() {
        let (service, _) =
            scripted(|_| Res::PutEntityType(proto::PutEntityTypeRes { entity_type: None }));

        assert!(matches!(
            service.put_entity_type("person").await,
            Err(ClientError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_iterator_options_carry_batch_size() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_in_tx, in_rx) =
            mpsc::unbounded_channel::<std::result::Result<TransactionResponse, tonic::Status>>();
        let inbound = futures::stream::unfold(in_rx, |mut rx| async move {
            rx.recv().await.map(|message| (message, rx))
        });
        let config = ClientConfig::default().with_batch_size(7);
        let service = ConceptService::new(Transceiver::new(out_tx, inbound, config).unwrap());

        let _sequence = service
            .iterate_type_method(&TypeRef::new("person"), TypeMethodIterReq::default(), Ok)
            .unwrap();

        match out_rx.recv().await.unwrap().req {
            Some(Req::OpenTypeIter(open)) => {
                assert_eq!(open.label, "person");
                assert_eq!(open.options.map(|o| o.batch_size), Some(7));
            }
            other => panic!("expected open type iterator, got {:?}", other),
        }
    }
}
