//! Entity metadata
//!
//! `EntityMetadata` is the type-erased view used by augmentation
//! contexts and engines; `EntityInformation<T>` adds identifier
//! extraction from a concrete entity instance.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde_json::Value;

use crate::criteria::ValueType;

/// Read-only description of an entity type
pub trait EntityMetadata: Send + Sync {
    /// Display name, used for fallback entity graph names
    fn entity_name(&self) -> &str;

    /// Runtime type name, as known to the persistence session
    fn entity_type(&self) -> &str;

    /// Name of the identifier attribute
    fn id_attribute(&self) -> &str;

    fn id_type(&self) -> ValueType;
}

impl fmt::Debug for dyn EntityMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMetadata")
            .field("entity_name", &self.entity_name())
            .field("entity_type", &self.entity_type())
            .field("id_attribute", &self.id_attribute())
            .finish()
    }
}

/// Entity metadata plus identifier extraction for `T`
pub trait EntityInformation<T>: EntityMetadata {
    /// Identifier of `entity`, or `None` if it has none yet
    fn get_id(&self, entity: &T) -> Option<Value>;
}

/// Entity information for serde-serializable entities.
///
/// The identifier is read from the serialized form of the entity.
pub struct JsonEntityInformation<T> {
    entity_name: String,
    entity_type: String,
    id_attribute: String,
    id_type: ValueType,
    _entity: PhantomData<fn() -> T>,
}

impl<T> JsonEntityInformation<T> {
    /// Entity whose runtime type and display name are both `entity_name`
    pub fn new(entity_name: impl Into<String>, id_attribute: impl Into<String>, id_type: ValueType) -> Self {
        let entity_name = entity_name.into();
        Self {
            entity_type: entity_name.clone(),
            entity_name,
            id_attribute: id_attribute.into(),
            id_type,
            _entity: PhantomData,
        }
    }

    /// Overrides the runtime type name
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = entity_type.into();
        self
    }
}

impl<T> EntityMetadata for JsonEntityInformation<T> {
    fn entity_name(&self) -> &str {
        &self.entity_name
    }

    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    fn id_type(&self) -> ValueType {
        self.id_type
    }
}

impl<T: Serialize> EntityInformation<T> for JsonEntityInformation<T> {
    fn get_id(&self, entity: &T) -> Option<Value> {
        let value = serde_json::to_value(entity).ok()?;
        match value.get(&self.id_attribute) {
            Some(Value::Null) | None => None,
            Some(id) => Some(id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct User {
        id: Option<i64>,
        name: String,
    }

    #[test]
    fn test_get_id() {
        let info = JsonEntityInformation::<User>::new("User", "id", ValueType::Integer);
        let user = User {
            id: Some(7),
            name: "Alice".into(),
        };
        assert_eq!(info.get_id(&user), Some(json!(7)));
    }

    #[test]
    fn test_get_id_of_transient_entity() {
        let info = JsonEntityInformation::<User>::new("User", "id", ValueType::Integer);
        let user = User {
            id: None,
            name: "Bob".into(),
        };
        assert_eq!(info.get_id(&user), None);
    }

    #[test]
    fn test_entity_type_override() {
        let info = JsonEntityInformation::<User>::new("User", "id", ValueType::Integer)
            .with_entity_type("app_user");
        assert_eq!(info.entity_name(), "User");
        assert_eq!(info.entity_type(), "app_user");
    }
}
