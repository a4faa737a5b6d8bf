/// Remote accessors on concept handles
///
/// Handles cache nothing, so every accessor here is one round trip (or one
/// cursor) through the `ConceptService` method escape hatches.

use crate::concept::{AttributeType, Concept, Thing, ThingType, Type, TypeRef};
use crate::error::{ClientError, Result};
use crate::iterator::LazySequence;
use crate::resolver::{resolve_optional, resolve_required};
use crate::service::ConceptService;
use glink_proto::{
    thing_method_iter_req, thing_method_iter_res, thing_method_req, thing_method_res,
    type_method_iter_req, type_method_iter_res, type_method_req, type_method_res, DeleteReq,
    GetHasReq, GetInstancesReq, GetRelationsReq, GetSubtypesReq, GetSupertypeReq, SetLabelReq,
    ThingGetTypeReq, ThingMethodIterReq, ThingMethodReq, TypeMethodIterReq, TypeMethodReq,
};

impl Type {
    /// Direct supertype; None for a root
    pub async fn get_supertype(&self, service: &ConceptService) -> Result<Option<Type>> {
        let method = TypeMethodReq {
            req: Some(type_method_req::Req::GetSupertype(GetSupertypeReq {})),
        };
        let res = service.invoke_type_method(&self.type_ref(), method).await?;
        match res.res {
            Some(type_method_res::Res::GetSupertype(res)) => resolve_optional(res.supertype)?
                .map(|c| c.as_type())
                .transpose(),
            other => Err(unexpected_method("get supertype", other.is_some())),
        }
    }

    /// All transitive subtypes, including this type
    pub fn get_subtypes(&self, service: &ConceptService) -> Result<LazySequence<Type>> {
        let method = TypeMethodIterReq {
            req: Some(type_method_iter_req::Req::GetSubtypes(GetSubtypesReq {})),
        };
        service.iterate_type_method(&self.type_ref(), method, |res| match res.res {
            Some(type_method_iter_res::Res::GetSubtypes(res)) => {
                resolve_required(res.subtype, "get subtypes")?.as_type()
            }
            other => Err(unexpected_method("get subtypes", other.is_some())),
        })
    }

    pub async fn set_label(&self, service: &ConceptService, label: &str) -> Result<()> {
        let method = TypeMethodReq {
            req: Some(type_method_req::Req::SetLabel(SetLabelReq {
                label: label.to_string(),
            })),
        };
        match service.invoke_type_method(&self.type_ref(), method).await?.res {
            Some(type_method_res::Res::SetLabel(_)) => Ok(()),
            other => Err(unexpected_method("set label", other.is_some())),
        }
    }

    pub async fn delete(&self, service: &ConceptService) -> Result<()> {
        delete_type(service, &self.type_ref()).await
    }
}

impl ThingType {
    /// Every instance of this type, including instances of its subtypes
    pub fn get_instances(&self, service: &ConceptService) -> Result<LazySequence<Thing>> {
        let method = TypeMethodIterReq {
            req: Some(type_method_iter_req::Req::GetInstances(GetInstancesReq {})),
        };
        service.iterate_type_method(&self.type_ref(), method, |res| match res.res {
            Some(type_method_iter_res::Res::GetInstances(res)) => {
                resolve_required(res.thing, "get instances")?.as_thing()
            }
            other => Err(unexpected_method("get instances", other.is_some())),
        })
    }

    pub async fn delete(&self, service: &ConceptService) -> Result<()> {
        delete_type(service, &self.type_ref()).await
    }
}

impl Thing {
    /// The type this thing is a direct instance of
    pub async fn get_type(&self, service: &ConceptService) -> Result<ThingType> {
        let method = ThingMethodReq {
            req: Some(thing_method_req::Req::GetType(ThingGetTypeReq {})),
        };
        match service.invoke_thing_method(self.iid(), method).await?.res {
            Some(thing_method_res::Res::GetType(res)) => {
                resolve_required(res.thing_type, "get type")?.as_thing_type()
            }
            other => Err(unexpected_method("get type", other.is_some())),
        }
    }

    /// Attributes owned by this thing, limited to `attribute_types` when
    /// any are given
    pub fn get_has(
        &self,
        service: &ConceptService,
        attribute_types: &[AttributeType],
    ) -> Result<LazySequence<Thing>> {
        let method = ThingMethodIterReq {
            req: Some(thing_method_iter_req::Req::GetHas(GetHasReq {
                attribute_types: attribute_types
                    .iter()
                    .map(|t| t.label().to_string())
                    .collect(),
            })),
        };
        service.iterate_thing_method(self.iid(), method, |res| match res.res {
            Some(thing_method_iter_res::Res::GetHas(res)) => {
                resolve_required(res.attribute, "get has")?.as_thing()
            }
            other => Err(unexpected_method("get has", other.is_some())),
        })
    }

    /// Relations this thing plays a role in
    pub fn get_relations(&self, service: &ConceptService) -> Result<LazySequence<Thing>> {
        let method = ThingMethodIterReq {
            req: Some(thing_method_iter_req::Req::GetRelations(GetRelationsReq {})),
        };
        service.iterate_thing_method(self.iid(), method, |res| match res.res {
            Some(thing_method_iter_res::Res::GetRelations(res)) => {
                resolve_required(res.relation, "get relations")?.as_thing()
            }
            other => Err(unexpected_method("get relations", other.is_some())),
        })
    }

    pub async fn delete(&self, service: &ConceptService) -> Result<()> {
        let method = ThingMethodReq {
            req: Some(thing_method_req::Req::Delete(DeleteReq {})),
        };
        match service.invoke_thing_method(self.iid(), method).await?.res {
            Some(thing_method_res::Res::Delete(_)) => Ok(()),
            other => Err(unexpected_method("delete thing", other.is_some())),
        }
    }
}

impl Concept {
    /// Delete the concept this handle refers to
    pub async fn delete(&self, service: &ConceptService) -> Result<()> {
        match self {
            Concept::Type(t) => t.delete(service).await,
            Concept::Thing(t) => t.delete(service).await,
        }
    }
}

async fn delete_type(service: &ConceptService, target: &TypeRef) -> Result<()> {
    let method = TypeMethodReq {
        req: Some(type_method_req::Req::Delete(DeleteReq {})),
    };
    match service.invoke_type_method(target, method).await?.res {
        Some(type_method_res::Res::Delete(_)) => Ok(()),
        other => Err(unexpected_method("delete type", other.is_some())),
    }
}

fn unexpected_method(method: &str, populated: bool) -> ClientError {
    if populated {
        ClientError::Protocol(format!("{} answered with another method's result", method))
    } else {
        ClientError::Protocol(format!("{} result is empty", method))
    }
}
