/// Concept handles
///
/// Client-side proxies for server concepts. A handle holds only its identity
/// (a label for types and rules, an iid for things); everything else is
/// re-queried from the server through the accessors in `remote`.

use bytes::Bytes;
use glink_proto as proto;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{ClientError, Result};

/// Kind of a concept, as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConceptKind {
    ThingType,
    EntityType,
    RelationType,
    AttributeType,
    RoleType,
    Rule,
    Thing,
}

impl ConceptKind {
    /// Schema-level concept addressed by label
    pub fn is_type(self) -> bool {
        !matches!(self, ConceptKind::Thing)
    }

    /// Type whose instances are things
    pub fn is_thing_type(self) -> bool {
        matches!(
            self,
            ConceptKind::ThingType
                | ConceptKind::EntityType
                | ConceptKind::RelationType
                | ConceptKind::AttributeType
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ConceptKind::ThingType => "thing type",
            ConceptKind::EntityType => "entity type",
            ConceptKind::RelationType => "relation type",
            ConceptKind::AttributeType => "attribute type",
            ConceptKind::RoleType => "role type",
            ConceptKind::Rule => "rule",
            ConceptKind::Thing => "thing",
        }
    }
}

impl fmt::Display for ConceptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value type of an attribute type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Object,
    Boolean,
    Long,
    Double,
    String,
    Datetime,
}

impl From<proto::ValueType> for ValueType {
    fn from(value: proto::ValueType) -> Self {
        match value {
            proto::ValueType::Object => ValueType::Object,
            proto::ValueType::Boolean => ValueType::Boolean,
            proto::ValueType::Long => ValueType::Long,
            proto::ValueType::Double => ValueType::Double,
            proto::ValueType::String => ValueType::String,
            proto::ValueType::Datetime => ValueType::Datetime,
        }
    }
}

impl From<ValueType> for proto::ValueType {
    fn from(value: ValueType) -> Self {
        match value {
            ValueType::Object => proto::ValueType::Object,
            ValueType::Boolean => proto::ValueType::Boolean,
            ValueType::Long => proto::ValueType::Long,
            ValueType::Double => proto::ValueType::Double,
            ValueType::String => proto::ValueType::String,
            ValueType::Datetime => proto::ValueType::Datetime,
        }
    }
}

/// What kind of instance a thing is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThingEncoding {
    Entity,
    Relation,
    Attribute,
}

impl From<proto::ThingEncoding> for ThingEncoding {
    fn from(value: proto::ThingEncoding) -> Self {
        match value {
            proto::ThingEncoding::Entity => ThingEncoding::Entity,
            proto::ThingEncoding::Relation => ThingEncoding::Relation,
            proto::ThingEncoding::Attribute => ThingEncoding::Attribute,
        }
    }
}

/// Opaque server-assigned identity of a thing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Iid(Bytes);

impl Iid {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Wire form (cheap clone of the shared buffer)
    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }
}

impl fmt::Display for Iid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Wire address of a type: its label, plus the relation scoping a role type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub label: String,
    pub scope: Option<String>,
}

impl TypeRef {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            scope: None,
        }
    }

    pub fn scoped(label: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            scope: Some(scope.into()),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}:{}", scope, self.label),
            None => f.write_str(&self.label),
        }
    }
}

macro_rules! labelled_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name {
            label: String,
        }

        impl $name {
            pub fn new(label: impl Into<String>) -> Self {
                Self { label: label.into() }
            }

            pub fn label(&self) -> &str {
                &self.label
            }

            pub fn type_ref(&self) -> TypeRef {
                TypeRef::new(self.label.clone())
            }
        }
    };
}

labelled_handle!(
    /// Any type whose instances are things, including the root `thing`
    ThingType
);
labelled_handle!(EntityType);
labelled_handle!(RelationType);
labelled_handle!(Rule);

/// Attribute type; the value type reported by the server rides along but is
/// not part of its identity
#[derive(Debug, Clone)]
pub struct AttributeType {
    label: String,
    value_type: ValueType,
}

impl PartialEq for AttributeType {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Eq for AttributeType {}

impl Hash for AttributeType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
    }
}

impl AttributeType {
    pub fn new(label: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            label: label.into(),
            value_type,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn type_ref(&self) -> TypeRef {
        TypeRef::new(self.label.clone())
    }
}

/// Role type, identified by its label within the scoping relation type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleType {
    label: String,
    scope: String,
}

impl RoleType {
    pub fn new(label: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            scope: scope.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn type_ref(&self) -> TypeRef {
        TypeRef::scoped(self.label.clone(), self.scope.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Thing {
    iid: Iid,
    encoding: ThingEncoding,
}

impl Thing {
    pub fn new(iid: Iid, encoding: ThingEncoding) -> Self {
        Self { iid, encoding }
    }

    pub fn iid(&self) -> &Iid {
        &self.iid
    }

    pub fn encoding(&self) -> ThingEncoding {
        self.encoding
    }
}

/// Schema-level concept
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    ThingType(ThingType),
    EntityType(EntityType),
    RelationType(RelationType),
    AttributeType(AttributeType),
    RoleType(RoleType),
    Rule(Rule),
}

impl Type {
    pub fn kind(&self) -> ConceptKind {
        match self {
            Type::ThingType(_) => ConceptKind::ThingType,
            Type::EntityType(_) => ConceptKind::EntityType,
            Type::RelationType(_) => ConceptKind::RelationType,
            Type::AttributeType(_) => ConceptKind::AttributeType,
            Type::RoleType(_) => ConceptKind::RoleType,
            Type::Rule(_) => ConceptKind::Rule,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Type::ThingType(t) => t.label(),
            Type::EntityType(t) => t.label(),
            Type::RelationType(t) => t.label(),
            Type::AttributeType(t) => t.label(),
            Type::RoleType(t) => t.label(),
            Type::Rule(t) => t.label(),
        }
    }

    pub fn type_ref(&self) -> TypeRef {
        match self {
            Type::RoleType(t) => t.type_ref(),
            other => TypeRef::new(other.label()),
        }
    }

    fn mismatch<T>(&self, expected: ConceptKind) -> Result<T> {
        Err(ClientError::TypeMismatch {
            expected: expected.name(),
            found: self.kind(),
        })
    }

    /// Entity, relation and attribute types are thing types too
    pub fn as_thing_type(&self) -> Result<ThingType> {
        if self.kind().is_thing_type() {
            Ok(ThingType::new(self.label()))
        } else {
            self.mismatch(ConceptKind::ThingType)
        }
    }

    pub fn as_entity_type(&self) -> Result<EntityType> {
        match self {
            Type::EntityType(t) => Ok(t.clone()),
            _ => self.mismatch(ConceptKind::EntityType),
        }
    }

    pub fn as_relation_type(&self) -> Result<RelationType> {
        match self {
            Type::RelationType(t) => Ok(t.clone()),
            _ => self.mismatch(ConceptKind::RelationType),
        }
    }

    pub fn as_attribute_type(&self) -> Result<AttributeType> {
        match self {
            Type::AttributeType(t) => Ok(t.clone()),
            _ => self.mismatch(ConceptKind::AttributeType),
        }
    }

    pub fn as_role_type(&self) -> Result<RoleType> {
        match self {
            Type::RoleType(t) => Ok(t.clone()),
            _ => self.mismatch(ConceptKind::RoleType),
        }
    }

    pub fn as_rule(&self) -> Result<Rule> {
        match self {
            Type::Rule(t) => Ok(t.clone()),
            _ => self.mismatch(ConceptKind::Rule),
        }
    }
}

/// Any addressable concept, as decoded from the server's payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Concept {
    Type(Type),
    Thing(Thing),
}

impl Concept {
    pub fn kind(&self) -> ConceptKind {
        match self {
            Concept::Type(t) => t.kind(),
            Concept::Thing(_) => ConceptKind::Thing,
        }
    }

    fn expect_type(&self, expected: &'static str) -> Result<&Type> {
        match self {
            Concept::Type(t) => Ok(t),
            Concept::Thing(_) => Err(ClientError::TypeMismatch {
                expected,
                found: ConceptKind::Thing,
            }),
        }
    }

    pub fn as_type(&self) -> Result<Type> {
        self.expect_type("type").cloned()
    }

    pub fn as_thing_type(&self) -> Result<ThingType> {
        self.expect_type(ConceptKind::ThingType.name())?.as_thing_type()
    }

    pub fn as_entity_type(&self) -> Result<EntityType> {
        self.expect_type(ConceptKind::EntityType.name())?.as_entity_type()
    }

    pub fn as_relation_type(&self) -> Result<RelationType> {
        self.expect_type(ConceptKind::RelationType.name())?.as_relation_type()
    }

    pub fn as_attribute_type(&self) -> Result<AttributeType> {
        self.expect_type(ConceptKind::AttributeType.name())?.as_attribute_type()
    }

    pub fn as_role_type(&self) -> Result<RoleType> {
        self.expect_type(ConceptKind::RoleType.name())?.as_role_type()
    }

    pub fn as_rule(&self) -> Result<Rule> {
        self.expect_type(ConceptKind::Rule.name())?.as_rule()
    }

    pub fn as_thing(&self) -> Result<Thing> {
        match self {
            Concept::Thing(t) => Ok(t.clone()),
            Concept::Type(t) => Err(ClientError::TypeMismatch {
                expected: ConceptKind::Thing.name(),
                found: t.kind(),
            }),
        }
    }

    // Option views: None when the kind does not match

    pub fn thing_type(&self) -> Option<ThingType> {
        self.as_thing_type().ok()
    }

    pub fn entity_type(&self) -> Option<EntityType> {
        self.as_entity_type().ok()
    }

    pub fn relation_type(&self) -> Option<RelationType> {
        self.as_relation_type().ok()
    }

    pub fn attribute_type(&self) -> Option<AttributeType> {
        self.as_attribute_type().ok()
    }

    pub fn role_type(&self) -> Option<RoleType> {
        self.as_role_type().ok()
    }

    pub fn rule(&self) -> Option<Rule> {
        self.as_rule().ok()
    }

    pub fn thing(&self) -> Option<Thing> {
        self.as_thing().ok()
    }
}

impl From<Type> for Concept {
    fn from(value: Type) -> Self {
        Concept::Type(value)
    }
}

impl From<Thing> for Concept {
    fn from(value: Thing) -> Self {
        Concept::Thing(value)
    }
}
