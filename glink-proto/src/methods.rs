/// Concept method sub-requests
///
/// Methods addressed at one thing (by iid) or one type (by label). Unary
/// methods answer with a single result; iterator methods answer with a
/// stream of `*IterRes` fragments.

use crate::concepts::Concept;

// ============================================================================
// Type methods
// ============================================================================

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TypeMethodReq {
    #[prost(oneof = "type_method_req::Req", tags = "1, 2, 3")]
    pub req: ::core::option::Option<type_method_req::Req>,
}

pub mod type_method_req {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Req {
        #[prost(message, tag = "1")]
        GetSupertype(super::GetSupertypeReq),
        #[prost(message, tag = "2")]
        Delete(super::DeleteReq),
        #[prost(message, tag = "3")]
        SetLabel(super::SetLabelReq),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TypeMethodRes {
    #[prost(oneof = "type_method_res::Res", tags = "1, 2, 3")]
    pub res: ::core::option::Option<type_method_res::Res>,
}

pub mod type_method_res {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Res {
        #[prost(message, tag = "1")]
        GetSupertype(super::GetSupertypeRes),
        #[prost(message, tag = "2")]
        Delete(super::DeleteRes),
        #[prost(message, tag = "3")]
        SetLabel(super::SetLabelRes),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSupertypeReq {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSupertypeRes {
    /// Unset when the type is a root
    #[prost(message, optional, tag = "1")]
    pub supertype: ::core::option::Option<Concept>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteReq {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteRes {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetLabelReq {
    #[prost(string, tag = "1")]
    pub label: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetLabelRes {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TypeMethodIterReq {
    #[prost(oneof = "type_method_iter_req::Req", tags = "1, 2")]
    pub req: ::core::option::Option<type_method_iter_req::Req>,
}

pub mod type_method_iter_req {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Req {
        #[prost(message, tag = "1")]
        GetSubtypes(super::GetSubtypesReq),
        #[prost(message, tag = "2")]
        GetInstances(super::GetInstancesReq),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TypeMethodIterRes {
    #[prost(oneof = "type_method_iter_res::Res", tags = "1, 2")]
    pub res: ::core::option::Option<type_method_iter_res::Res>,
}

pub mod type_method_iter_res {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Res {
        #[prost(message, tag = "1")]
        GetSubtypes(super::GetSubtypesRes),
        #[prost(message, tag = "2")]
        GetInstances(super::GetInstancesRes),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSubtypesReq {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSubtypesRes {
    #[prost(message, optional, tag = "1")]
    pub subtype: ::core::option::Option<Concept>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetInstancesReq {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetInstancesRes {
    #[prost(message, optional, tag = "1")]
    pub thing: ::core::option::Option<Concept>,
}

// ============================================================================
// Thing methods
// ============================================================================

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThingMethodReq {
    #[prost(oneof = "thing_method_req::Req", tags = "1, 2")]
    pub req: ::core::option::Option<thing_method_req::Req>,
}

pub mod thing_method_req {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Req {
        #[prost(message, tag = "1")]
        GetType(super::ThingGetTypeReq),
        #[prost(message, tag = "2")]
        Delete(super::DeleteReq),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThingMethodRes {
    #[prost(oneof = "thing_method_res::Res", tags = "1, 2")]
    pub res: ::core::option::Option<thing_method_res::Res>,
}

pub mod thing_method_res {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Res {
        #[prost(message, tag = "1")]
        GetType(super::ThingGetTypeRes),
        #[prost(message, tag = "2")]
        Delete(super::DeleteRes),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThingGetTypeReq {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThingGetTypeRes {
    #[prost(message, optional, tag = "1")]
    pub thing_type: ::core::option::Option<Concept>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThingMethodIterReq {
    #[prost(oneof = "thing_method_iter_req::Req", tags = "1, 2")]
    pub req: ::core::option::Option<thing_method_iter_req::Req>,
}

pub mod thing_method_iter_req {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Req {
        #[prost(message, tag = "1")]
        GetHas(super::GetHasReq),
        #[prost(message, tag = "2")]
        GetRelations(super::GetRelationsReq),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThingMethodIterRes {
    #[prost(oneof = "thing_method_iter_res::Res", tags = "1, 2")]
    pub res: ::core::option::Option<thing_method_iter_res::Res>,
}

pub mod thing_method_iter_res {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Res {
        #[prost(message, tag = "1")]
        GetHas(super::GetHasRes),
        #[prost(message, tag = "2")]
        GetRelations(super::GetRelationsRes),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetHasReq {
    /// Attribute type labels to restrict to; empty means all
    #[prost(string, repeated, tag = "1")]
    pub attribute_types: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetHasRes {
    #[prost(message, optional, tag = "1")]
    pub attribute: ::core::option::Option<Concept>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetRelationsReq {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetRelationsRes {
    #[prost(message, optional, tag = "1")]
    pub relation: ::core::option::Option<Concept>,
}
