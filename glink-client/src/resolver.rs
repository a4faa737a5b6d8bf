/// Concept resolution from wire payloads
///
/// The populated case of the `Concept` union alone decides which handle is
/// produced. Payloads that cannot be decoded fail closed with a protocol
/// error instead of yielding a guessed handle.

use crate::concept::{
    AttributeType, Concept, EntityType, Iid, RelationType, RoleType, Rule, Thing, ThingType, Type,
};
use crate::error::{ClientError, Result};
use glink_proto::{self as proto, concept::Kind};

/// Decode a wire concept into its typed handle
pub fn resolve_concept(concept: proto::Concept) -> Result<Concept> {
    let kind = concept
        .kind
        .ok_or_else(|| ClientError::Protocol("concept payload has no kind set".to_string()))?;

    let resolved = match kind {
        Kind::ThingType(t) => Concept::Type(Type::ThingType(ThingType::new(label(t.label)?))),
        Kind::EntityType(t) => Concept::Type(Type::EntityType(EntityType::new(label(t.label)?))),
        Kind::RelationType(t) => {
            Concept::Type(Type::RelationType(RelationType::new(label(t.label)?)))
        }
        Kind::AttributeType(t) => {
            let value_type = proto::ValueType::try_from(t.value_type).map_err(|_| {
                ClientError::Protocol(format!("unknown value type {}", t.value_type))
            })?;
            Concept::Type(Type::AttributeType(AttributeType::new(
                label(t.label)?,
                value_type.into(),
            )))
        }
        Kind::RoleType(t) => Concept::Type(Type::RoleType(RoleType::new(
            label(t.label)?,
            label(t.scope)?,
        ))),
        Kind::Rule(t) => Concept::Type(Type::Rule(Rule::new(label(t.label)?))),
        Kind::Thing(t) => {
            if t.iid.is_empty() {
                return Err(ClientError::Protocol("thing payload has an empty iid".to_string()));
            }
            let encoding = proto::ThingEncoding::try_from(t.encoding).map_err(|_| {
                ClientError::Protocol(format!("unknown thing encoding {}", t.encoding))
            })?;
            Concept::Thing(Thing::new(Iid::new(t.iid), encoding.into()))
        }
    };

    Ok(resolved)
}

/// Decode an optional wire concept; an unset payload means absence
pub fn resolve_optional(concept: Option<proto::Concept>) -> Result<Option<Concept>> {
    concept.map(resolve_concept).transpose()
}

/// Decode a payload that must be present, naming the response it came from
pub fn resolve_required(concept: Option<proto::Concept>, context: &str) -> Result<Concept> {
    match concept {
        Some(concept) => resolve_concept(concept),
        None => Err(ClientError::Protocol(format!(
            "{} response carried no concept",
            context
        ))),
    }
}

fn label(label: String) -> Result<String> {
    if label.is_empty() {
        Err(ClientError::Protocol("type payload has an empty label".to_string()))
    } else {
        Ok(label)
    }
}
