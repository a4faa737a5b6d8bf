/// Transaction envelopes
///
/// Every message on the transaction stream carries the correlation `id` of
/// the call it belongs to. Iterator calls reuse the id of the opening
/// request for their continue/close requests and for every fragment.

use crate::concepts::{Concept, ValueType};
use crate::methods::{
    ThingMethodIterReq, ThingMethodIterRes, ThingMethodReq, ThingMethodRes, TypeMethodIterReq,
    TypeMethodIterRes, TypeMethodReq, TypeMethodRes,
};
use bytes::Bytes;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub id: ::prost::alloc::vec::Vec<u8>,
    /// Opaque attachments (tracing data), forwarded unmodified
    #[prost(map = "string, string", tag = "2")]
    pub metadata: ::std::collections::HashMap<
        ::prost::alloc::string::String,
        ::prost::alloc::string::String,
    >,
    #[prost(
        oneof = "transaction_request::Req",
        tags = "10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20"
    )]
    pub req: ::core::option::Option<transaction_request::Req>,
}

pub mod transaction_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Req {
        #[prost(message, tag = "10")]
        PutEntityType(super::PutEntityTypeReq),
        #[prost(message, tag = "11")]
        PutRelationType(super::PutRelationTypeReq),
        #[prost(message, tag = "12")]
        PutAttributeType(super::PutAttributeTypeReq),
        #[prost(message, tag = "13")]
        GetType(super::GetTypeReq),
        #[prost(message, tag = "14")]
        GetThing(super::GetThingReq),
        #[prost(message, tag = "15")]
        ThingMethod(super::ThingMethodCall),
        #[prost(message, tag = "16")]
        TypeMethod(super::TypeMethodCall),
        #[prost(message, tag = "17")]
        OpenThingIter(super::OpenThingIterReq),
        #[prost(message, tag = "18")]
        OpenTypeIter(super::OpenTypeIterReq),
        #[prost(message, tag = "19")]
        IterContinue(super::IterContinueReq),
        #[prost(message, tag = "20")]
        IterClose(super::IterCloseReq),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutEntityTypeReq {
    #[prost(string, tag = "1")]
    pub label: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutRelationTypeReq {
    #[prost(string, tag = "1")]
    pub label: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutAttributeTypeReq {
    #[prost(string, tag = "1")]
    pub label: ::prost::alloc::string::String,
    #[prost(enumeration = "ValueType", tag = "2")]
    pub value_type: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTypeReq {
    #[prost(string, tag = "1")]
    pub label: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetThingReq {
    #[prost(bytes = "bytes", tag = "1")]
    pub iid: Bytes,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThingMethodCall {
    #[prost(bytes = "bytes", tag = "1")]
    pub iid: Bytes,
    #[prost(message, optional, tag = "2")]
    pub method: ::core::option::Option<ThingMethodReq>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TypeMethodCall {
    #[prost(string, tag = "1")]
    pub label: ::prost::alloc::string::String,
    /// Relation label scoping a role type; empty for other types
    #[prost(string, tag = "2")]
    pub scope: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub method: ::core::option::Option<TypeMethodReq>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IterOptions {
    /// Number of fragments the server sends before asking to continue
    #[prost(uint32, tag = "1")]
    pub batch_size: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OpenThingIterReq {
    #[prost(bytes = "bytes", tag = "1")]
    pub iid: Bytes,
    #[prost(message, optional, tag = "2")]
    pub method: ::core::option::Option<ThingMethodIterReq>,
    #[prost(message, optional, tag = "3")]
    pub options: ::core::option::Option<IterOptions>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OpenTypeIterReq {
    #[prost(string, tag = "1")]
    pub label: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub scope: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub method: ::core::option::Option<TypeMethodIterReq>,
    #[prost(message, optional, tag = "4")]
    pub options: ::core::option::Option<IterOptions>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IterContinueReq {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IterCloseReq {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub id: ::prost::alloc::vec::Vec<u8>,
    #[prost(
        oneof = "transaction_response::Res",
        tags = "10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20"
    )]
    pub res: ::core::option::Option<transaction_response::Res>,
}

pub mod transaction_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Res {
        #[prost(message, tag = "10")]
        PutEntityType(super::PutEntityTypeRes),
        #[prost(message, tag = "11")]
        PutRelationType(super::PutRelationTypeRes),
        #[prost(message, tag = "12")]
        PutAttributeType(super::PutAttributeTypeRes),
        #[prost(message, tag = "13")]
        GetType(super::GetTypeRes),
        #[prost(message, tag = "14")]
        GetThing(super::GetThingRes),
        #[prost(message, tag = "15")]
        ThingMethod(super::ThingMethodRes),
        #[prost(message, tag = "16")]
        TypeMethod(super::TypeMethodRes),
        #[prost(message, tag = "17")]
        IterItem(super::IterItem),
        #[prost(message, tag = "18")]
        IterContinue(super::IterContinueRes),
        #[prost(message, tag = "19")]
        IterDone(super::IterDoneRes),
        #[prost(message, tag = "20")]
        Error(super::ErrorRes),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutEntityTypeRes {
    #[prost(message, optional, tag = "1")]
    pub entity_type: ::core::option::Option<Concept>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutRelationTypeRes {
    #[prost(message, optional, tag = "1")]
    pub relation_type: ::core::option::Option<Concept>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutAttributeTypeRes {
    #[prost(message, optional, tag = "1")]
    pub attribute_type: ::core::option::Option<Concept>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTypeRes {
    /// Unset when no type has the label
    #[prost(message, optional, tag = "1")]
    pub r#type: ::core::option::Option<Concept>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetThingRes {
    /// Unset when no thing has the iid
    #[prost(message, optional, tag = "1")]
    pub thing: ::core::option::Option<Concept>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IterItem {
    #[prost(oneof = "iter_item::Item", tags = "1, 2")]
    pub item: ::core::option::Option<iter_item::Item>,
}

pub mod iter_item {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Item {
        #[prost(message, tag = "1")]
        ThingMethod(super::ThingMethodIterRes),
        #[prost(message, tag = "2")]
        TypeMethod(super::TypeMethodIterRes),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IterContinueRes {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IterDoneRes {}

/// Explicit failure answered by the server for one request
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorRes {
    #[prost(string, tag = "1")]
    pub code: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
}

impl TransactionResponse {
    /// Build a response envelope echoing `id`
    pub fn new(id: impl Into<Vec<u8>>, res: transaction_response::Res) -> Self {
        Self {
            id: id.into(),
            res: Some(res),
        }
    }

    /// True for the fragment that terminates an iterator
    pub fn is_iter_done(&self) -> bool {
        matches!(self.res, Some(transaction_response::Res::IterDone(_)))
    }
}
