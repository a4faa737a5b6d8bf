/// Concept payloads
///
/// A `Concept` is an untyped envelope: exactly one case of its `kind` union
/// is populated, and that case alone determines what the client decodes.

use bytes::Bytes;

/// Value type of an attribute type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ValueType {
    Object = 0,
    Boolean = 1,
    Long = 2,
    Double = 3,
    String = 4,
    Datetime = 5,
}

/// Encoding of a thing instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ThingEncoding {
    Entity = 0,
    Relation = 1,
    Attribute = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Concept {
    #[prost(oneof = "concept::Kind", tags = "1, 2, 3, 4, 5, 6, 7")]
    pub kind: ::core::option::Option<concept::Kind>,
}

/// Nested message and enum types in `Concept`.
pub mod concept {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        ThingType(super::TypeLabel),
        #[prost(message, tag = "2")]
        EntityType(super::TypeLabel),
        #[prost(message, tag = "3")]
        RelationType(super::TypeLabel),
        #[prost(message, tag = "4")]
        AttributeType(super::AttributeType),
        #[prost(message, tag = "5")]
        RoleType(super::RoleType),
        #[prost(message, tag = "6")]
        Rule(super::TypeLabel),
        #[prost(message, tag = "7")]
        Thing(super::Thing),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TypeLabel {
    #[prost(string, tag = "1")]
    pub label: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AttributeType {
    #[prost(string, tag = "1")]
    pub label: ::prost::alloc::string::String,
    #[prost(enumeration = "ValueType", tag = "2")]
    pub value_type: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RoleType {
    #[prost(string, tag = "1")]
    pub label: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub scope: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Thing {
    #[prost(bytes = "bytes", tag = "1")]
    pub iid: Bytes,
    #[prost(enumeration = "ThingEncoding", tag = "2")]
    pub encoding: i32,
}

impl Concept {
    fn of(kind: concept::Kind) -> Self {
        Self { kind: Some(kind) }
    }

    pub fn thing_type(label: impl Into<String>) -> Self {
        Self::of(concept::Kind::ThingType(TypeLabel { label: label.into() }))
    }

    pub fn entity_type(label: impl Into<String>) -> Self {
        Self::of(concept::Kind::EntityType(TypeLabel { label: label.into() }))
    }

    pub fn relation_type(label: impl Into<String>) -> Self {
        Self::of(concept::Kind::RelationType(TypeLabel { label: label.into() }))
    }

    pub fn attribute_type(label: impl Into<String>, value_type: ValueType) -> Self {
        Self::of(concept::Kind::AttributeType(AttributeType {
            label: label.into(),
            value_type: value_type as i32,
        }))
    }

    pub fn role_type(label: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::of(concept::Kind::RoleType(RoleType {
            label: label.into(),
            scope: scope.into(),
        }))
    }

    pub fn rule(label: impl Into<String>) -> Self {
        Self::of(concept::Kind::Rule(TypeLabel { label: label.into() }))
    }

    pub fn thing(iid: impl Into<Bytes>, encoding: ThingEncoding) -> Self {
        Self::of(concept::Kind::Thing(Thing {
            iid: iid.into(),
            encoding: encoding as i32,
        }))
    }
}
