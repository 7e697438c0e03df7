//! Attribute slots: one declared attribute and its binding contract.

use std::sync::Arc;

use crate::error::{ModelError, Result};
use crate::types::TypeDef;
use crate::value::Value;

/// One declared attribute: name, type, mandatory flag, and the entity level
/// that declared it. Owned by exactly one descriptor level; `declared_by`
/// survives flattening so diagnostics can point at the right supertype.
#[derive(Debug, Clone)]
pub struct AttributeSlot {
    pub name: String,
    pub ty: Arc<TypeDef>,
    pub mandatory: bool,
    pub declared_by: String,
}

impl AttributeSlot {
    pub fn new(
        name: impl Into<String>,
        ty: Arc<TypeDef>,
        mandatory: bool,
        declared_by: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            mandatory,
            declared_by: declared_by.into(),
        }
    }

    /// Bind a raw value to this slot.
    ///
    /// - mandatory + unset → [`ModelError::MissingMandatoryAttribute`]
    /// - optional + unset → `Unset`, no coercion attempted
    /// - otherwise the slot type's coercion, with failures surfaced as
    ///   [`ModelError::TypeMismatch`] naming this slot
    pub fn bind(&self, raw: &Value) -> Result<Value> {
        if !raw.exists() {
            return if self.mandatory {
                Err(ModelError::MissingMandatoryAttribute(self.name.clone()))
            } else {
                Ok(Value::Unset)
            };
        }
        self.ty
            .coerce(raw)
            .map_err(|e| ModelError::TypeMismatch {
                attribute: self.name.clone(),
                expected: e.expected,
                found: e.found,
            })
    }
}
