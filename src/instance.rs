//! Entity instances: positional construction and typed attribute access.

use std::fmt;
use std::sync::Arc;

use crate::descriptor::EntityDescriptor;
use crate::error::{ModelError, Result};
use crate::value::Value;

/// One populated instance of an entity. Values are stored in the
/// descriptor's flattened slot order and are always bound (coerced and
/// mandatory-checked); there is no partially-constructed state.
#[derive(Debug, Clone)]
pub struct EntityInstance {
    descriptor: Arc<EntityDescriptor>,
    values: Vec<Value>,
}

impl EntityInstance {
    /// Construct from positional values in the descriptor's flattened
    /// slot order (supertype attributes first).
    ///
    /// All-or-nothing: an arity mismatch or any slot rejecting its value
    /// fails the whole construction and produces no instance.
    pub fn construct(
        descriptor: Arc<EntityDescriptor>,
        raw: Vec<Value>,
    ) -> Result<Self> {
        if raw.len() != descriptor.arity() {
            return Err(ModelError::ArityMismatch {
                entity: descriptor.name().to_string(),
                expected: descriptor.arity(),
                got: raw.len(),
            });
        }
        let values = descriptor
            .slots()
            .iter()
            .zip(&raw)
            .map(|(slot, value)| slot.bind(value))
            .collect::<Result<Vec<Value>>>()?;
        tracing::trace!(entity = %descriptor.name(), "constructed instance");
        Ok(Self { descriptor, values })
    }

    pub fn descriptor(&self) -> &Arc<EntityDescriptor> {
        &self.descriptor
    }

    pub fn entity_name(&self) -> &str {
        self.descriptor.name()
    }

    /// Read an attribute's bound value by name.
    pub fn get(&self, attribute: &str) -> Result<&Value> {
        self.descriptor
            .slot_index(attribute)
            .map(|i| &self.values[i])
            .ok_or_else(|| self.unknown(attribute))
    }

    /// Rebind one attribute. The new value goes through the same
    /// mandatory check and coercion as construction; on failure the
    /// stored value is untouched.
    pub fn set(&mut self, attribute: &str, raw: &Value) -> Result<()> {
        let idx = self
            .descriptor
            .slot_index(attribute)
            .ok_or_else(|| self.unknown(attribute))?;
        let bound = self.descriptor.slots()[idx].bind(raw)?;
        self.values[idx] = bound;
        Ok(())
    }

    /// Unset an optional attribute; rejected for mandatory ones.
    pub fn unset(&mut self, attribute: &str) -> Result<()> {
        self.set(attribute, &Value::Unset)
    }

    /// Bound values, in slot order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    fn unknown(&self, attribute: &str) -> ModelError {
        ModelError::UnknownAttribute {
            entity: self.descriptor.name().to_string(),
            attribute: attribute.to_string(),
        }
    }
}

impl fmt::Display for EntityInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.descriptor.name())?;
        for (i, (slot, value)) in self.descriptor.slots().iter().zip(&self.values).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:?}", slot.name, value)?;
        }
        write!(f, ")")
    }
}
