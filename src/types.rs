//! Type definitions and the type registry.
//!
//! Coercion policy for user-defined simple types (preserved exactly from the
//! schema runtime's contract): a value already carrying the target type's
//! tag is accepted unchanged; anything else is coerced through the base
//! primitive and then wrapped with the subtype tag. This avoids
//! double-wrapping and lets pre-typed values cross entity boundaries
//! untouched. Coercion is idempotent for every type.

use std::collections::HashMap;
use std::sync::Arc;

use strum::{Display, EnumString};

use crate::error::{ModelError, Result};
use crate::value::Value;

/// The built-in simple types, under their schema-language names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PrimitiveKind {
    Boolean,
    Integer,
    Real,
    String,
}

/// How a type coerces and validates values.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    /// A closed set of named members.
    Enumeration(Vec<String>),
    /// A named subtype delegating to its base type's coercion.
    Defined { base: Arc<TypeDef> },
}

/// A named type. Built once, shared read-only via `Arc`.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
}

/// Why a coercion was rejected. The attribute layer turns this into a
/// [`ModelError::TypeMismatch`] with the slot name attached.
#[derive(Debug, Clone, PartialEq)]
pub struct CoerceError {
    pub expected: String,
    pub found: String,
}

impl TypeDef {
    fn reject(&self, raw: &Value) -> CoerceError {
        CoerceError {
            expected: self.name.clone(),
            found: raw.kind_name(),
        }
    }

    /// Coerce `raw` into this type, or reject it.
    pub fn coerce(&self, raw: &Value) -> std::result::Result<Value, CoerceError> {
        match &self.kind {
            TypeKind::Primitive(p) => {
                coerce_primitive(*p, raw).ok_or_else(|| self.reject(raw))
            }
            TypeKind::Enumeration(members) => match raw {
                Value::Enumeration { type_name, .. } if type_name == &self.name => {
                    Ok(raw.clone())
                }
                Value::Text(token) if members.iter().any(|m| m == token) => {
                    Ok(Value::Enumeration {
                        type_name: self.name.clone(),
                        member: token.clone(),
                    })
                }
                _ => Err(self.reject(raw)),
            },
            TypeKind::Defined { base } => match raw {
                // Already this exact type: accept unchanged.
                Value::Tagged { type_name, .. } if type_name == &self.name => Ok(raw.clone()),
                _ => {
                    let inner = base.coerce(raw).map_err(|_| self.reject(raw))?;
                    Ok(Value::Tagged {
                        type_name: self.name.clone(),
                        value: Box::new(inner),
                    })
                }
            },
        }
    }
}

fn coerce_primitive(kind: PrimitiveKind, raw: &Value) -> Option<Value> {
    // A tagged value whose underlying primitive matches is accepted
    // unchanged (a `label` IS a string).
    if let Value::Tagged { .. } = raw {
        return match (kind, raw.base()) {
            (PrimitiveKind::Boolean, Value::Bool(_))
            | (PrimitiveKind::Integer, Value::Integer(_))
            | (PrimitiveKind::Real, Value::Real(_))
            | (PrimitiveKind::String, Value::Text(_)) => Some(raw.clone()),
            _ => None,
        };
    }

    match (kind, raw) {
        (PrimitiveKind::Boolean, Value::Bool(b)) => Some(Value::Bool(*b)),

        (PrimitiveKind::Integer, Value::Integer(i)) => Some(Value::Integer(*i)),
        // Exactly-integral reals only: truncation would silently change data.
        (PrimitiveKind::Integer, Value::Real(r))
            if r.fract() == 0.0 && *r >= i64::MIN as f64 && *r <= i64::MAX as f64 =>
        {
            Some(Value::Integer(*r as i64))
        }
        (PrimitiveKind::Integer, Value::Text(s)) => {
            s.trim().parse::<i64>().ok().map(Value::Integer)
        }

        (PrimitiveKind::Real, Value::Real(r)) => Some(Value::Real(*r)),
        (PrimitiveKind::Real, Value::Integer(i)) => Some(Value::Real(*i as f64)),
        (PrimitiveKind::Real, Value::Text(s)) => s.trim().parse::<f64>().ok().map(Value::Real),

        (PrimitiveKind::String, Value::Text(s)) => Some(Value::Text(s.clone())),

        _ => None,
    }
}

/// Maps type names to their definitions. Built once per schema, then
/// treated as immutable shared state.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<TypeDef>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in primitives preregistered under their
    /// schema-language names.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        for kind in [
            PrimitiveKind::Boolean,
            PrimitiveKind::Integer,
            PrimitiveKind::Real,
            PrimitiveKind::String,
        ] {
            // Infallible: the registry is empty and primitive names are unique.
            let _ = reg.register(TypeDef {
                name: kind.to_string(),
                kind: TypeKind::Primitive(kind),
            });
        }
        reg
    }

    pub fn register(&mut self, def: TypeDef) -> Result<Arc<TypeDef>> {
        if self.types.contains_key(&def.name) {
            return Err(ModelError::DuplicateType(def.name));
        }
        tracing::trace!(type_name = %def.name, "registering type");
        let def = Arc::new(def);
        self.types.insert(def.name.clone(), Arc::clone(&def));
        Ok(def)
    }

    /// Register a defined simple type: a named subtype of `base_name`.
    pub fn register_defined(
        &mut self,
        name: impl Into<String>,
        base_name: &str,
    ) -> Result<Arc<TypeDef>> {
        let base = self.resolve(base_name)?;
        self.register(TypeDef {
            name: name.into(),
            kind: TypeKind::Defined { base },
        })
    }

    /// Register an enumeration type with the given member set.
    pub fn register_enumeration(
        &mut self,
        name: impl Into<String>,
        members: Vec<String>,
    ) -> Result<Arc<TypeDef>> {
        self.register(TypeDef {
            name: name.into(),
            kind: TypeKind::Enumeration(members),
        })
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<TypeDef>> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }
}
