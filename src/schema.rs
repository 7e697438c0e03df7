//! Schema assembly: declarative entity specs compiled into descriptors.
//!
//! Specs are plain serde data, so a schema can come from code or from a
//! JSON document. `SchemaBuilder::finish` is the single validation gate:
//! it resolves types, parses rule expressions, flattens supertype chains,
//! and rejects cycles. After it returns, every descriptor is internally
//! consistent and immutable.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attribute::AttributeSlot;
use crate::descriptor::EntityDescriptor;
use crate::error::{ModelError, Result};
use crate::instance::EntityInstance;
use crate::rules::{NativePredicate, Rule};
use crate::types::TypeRegistry;
use crate::value::Value;

/// One declared attribute, before type resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub optional: bool,
}

/// One WHERE rule, as expression source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub expression: String,
}

/// One entity declaration, before flattening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySpec {
    pub name: String,
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl EntitySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            attributes: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn supertype(mut self, name: impl Into<String>) -> Self {
        self.supertypes.push(name.into());
        self
    }

    /// Declare a mandatory attribute.
    pub fn attribute(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.attributes.push(AttributeSpec {
            name: name.into(),
            type_name: type_name.into(),
            optional: false,
        });
        self
    }

    /// Declare an optional attribute.
    pub fn optional(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.attributes.push(AttributeSpec {
            name: name.into(),
            type_name: type_name.into(),
            optional: true,
        });
        self
    }

    pub fn rule(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.rules.push(RuleSpec {
            name: name.into(),
            expression: expression.into(),
        });
        self
    }
}

/// Accumulates type and entity declarations, then compiles them.
pub struct SchemaBuilder {
    name: String,
    registry: TypeRegistry,
    entities: Vec<EntitySpec>,
    native_rules: HashMap<String, Vec<Rule>>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: TypeRegistry::with_builtins(),
            entities: Vec::new(),
            native_rules: HashMap::new(),
        }
    }

    /// Register a defined simple type (a named subtype of an existing type).
    /// Types are validated eagerly: the base must already be registered.
    pub fn defined_type(mut self, name: &str, base: &str) -> Result<Self> {
        self.registry.register_defined(name, base)?;
        Ok(self)
    }

    pub fn enumeration(mut self, name: &str, members: &[&str]) -> Result<Self> {
        self.registry
            .register_enumeration(name, members.iter().map(|m| m.to_string()).collect())?;
        Ok(self)
    }

    /// Declare an entity. Validation is deferred to [`SchemaBuilder::finish`]
    /// so declaration order does not matter.
    pub fn entity(mut self, spec: EntitySpec) -> Self {
        self.entities.push(spec);
        self
    }

    /// Attach a native-code rule to an entity, for invariants the
    /// expression grammar cannot state. The entity must be declared by the
    /// time [`SchemaBuilder::finish`] runs, or compilation fails with
    /// [`ModelError::UnknownEntity`].
    pub fn native_rule(
        mut self,
        entity: &str,
        name: impl Into<String>,
        predicate: NativePredicate,
    ) -> Self {
        self.native_rules
            .entry(entity.to_string())
            .or_default()
            .push(Rule::native(name, entity, predicate));
        self
    }

    /// Compile every declaration into flattened descriptors.
    pub fn finish(self) -> Result<Schema> {
        let mut specs: HashMap<String, EntitySpec> = HashMap::new();
        for spec in self.entities {
            if specs.contains_key(&spec.name) {
                return Err(ModelError::DuplicateEntity(spec.name));
            }
            specs.insert(spec.name.clone(), spec);
        }

        let mut native_rules = self.native_rules;
        let mut done: HashMap<String, Arc<EntityDescriptor>> = HashMap::new();
        let mut in_progress: HashSet<String> = HashSet::new();
        let mut names: Vec<&String> = specs.keys().collect();
        names.sort();
        for name in names {
            compose_entity(
                name,
                &specs,
                &self.registry,
                &mut native_rules,
                &mut done,
                &mut in_progress,
            )?;
        }

        // Every native rule must have found its entity; a leftover key is
        // a rule that would otherwise vanish silently.
        if let Some(orphan) = native_rules.keys().min() {
            return Err(ModelError::UnknownEntity(orphan.clone()));
        }

        tracing::info!(schema = %self.name, entities = done.len(), "schema compiled");
        Ok(Schema {
            name: self.name,
            registry: self.registry,
            entities: done,
        })
    }
}

fn compose_entity(
    name: &str,
    specs: &HashMap<String, EntitySpec>,
    registry: &TypeRegistry,
    native_rules: &mut HashMap<String, Vec<Rule>>,
    done: &mut HashMap<String, Arc<EntityDescriptor>>,
    in_progress: &mut HashSet<String>,
) -> Result<Arc<EntityDescriptor>> {
    if let Some(existing) = done.get(name) {
        return Ok(Arc::clone(existing));
    }
    if !in_progress.insert(name.to_string()) {
        return Err(ModelError::SupertypeCycle(name.to_string()));
    }
    let spec = specs
        .get(name)
        .ok_or_else(|| ModelError::UnknownEntity(name.to_string()))?;

    let mut supertypes = Vec::with_capacity(spec.supertypes.len());
    for sup in &spec.supertypes {
        supertypes.push(compose_entity(
            sup,
            specs,
            registry,
            native_rules,
            done,
            in_progress,
        )?);
    }

    let mut slots = Vec::with_capacity(spec.attributes.len());
    for attr in &spec.attributes {
        let ty = registry.resolve(&attr.type_name)?;
        slots.push(AttributeSlot::new(
            attr.name.as_str(),
            ty,
            !attr.optional,
            name,
        ));
    }

    let mut rules = Vec::with_capacity(spec.rules.len());
    for r in &spec.rules {
        let rule =
            Rule::parse(r.name.as_str(), name, &r.expression).map_err(|message| {
                ModelError::RuleSyntax {
                    entity: name.to_string(),
                    rule: r.name.clone(),
                    message,
                }
            })?;
        rules.push(rule);
    }
    if let Some(extra) = native_rules.remove(name) {
        rules.extend(extra);
    }

    let descriptor = EntityDescriptor::compose(name, &supertypes, slots, rules)?;
    in_progress.remove(name);
    done.insert(name.to_string(), Arc::clone(&descriptor));
    Ok(descriptor)
}

/// A compiled schema: immutable registry plus flattened descriptors.
#[derive(Debug)]
pub struct Schema {
    name: String,
    registry: TypeRegistry,
    entities: HashMap<String, Arc<EntityDescriptor>>,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn descriptor(&self, entity: &str) -> Result<Arc<EntityDescriptor>> {
        self.entities
            .get(entity)
            .cloned()
            .ok_or_else(|| ModelError::UnknownEntity(entity.to_string()))
    }

    /// Construct an instance of `entity` from positional values.
    pub fn construct(&self, entity: &str, values: Vec<Value>) -> Result<EntityInstance> {
        EntityInstance::construct(self.descriptor(entity)?, values)
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}
