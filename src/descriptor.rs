//! Entity descriptors: flattened definitions ready for instantiation.
//!
//! A descriptor is composed once from its supertype chain: supertype slots
//! come first, in declaration order, then the entity's own slots. The
//! positional constructor contract of [`crate::instance::EntityInstance`]
//! depends on this order being stable. Rules flatten the same way, so
//! supertype invariants keep applying to every subtype instance.

use std::collections::HashMap;
use std::sync::Arc;

use crate::attribute::AttributeSlot;
use crate::error::{ModelError, Result};
use crate::rules::Rule;

#[derive(Debug)]
pub struct EntityDescriptor {
    name: String,
    /// All slots, supertype-first. Positional order for construction.
    slots: Vec<AttributeSlot>,
    /// All rules, supertype-first.
    rules: Vec<Rule>,
    /// Slot name → position in `slots`.
    index: HashMap<String, usize>,
}

impl EntityDescriptor {
    /// Flatten supertypes and own declarations into one descriptor.
    ///
    /// An attribute name colliding with any inherited name is a
    /// [`ModelError::DuplicateAttribute`]; redeclaration is not supported.
    pub fn compose(
        name: impl Into<String>,
        supertypes: &[Arc<EntityDescriptor>],
        own_slots: Vec<AttributeSlot>,
        own_rules: Vec<Rule>,
    ) -> Result<Arc<Self>> {
        let name = name.into();

        let mut slots: Vec<AttributeSlot> = Vec::new();
        let mut rules: Vec<Rule> = Vec::new();
        for sup in supertypes {
            slots.extend(sup.slots.iter().cloned());
            rules.extend(sup.rules.iter().cloned());
        }
        slots.extend(own_slots);
        rules.extend(own_rules);

        let mut index = HashMap::with_capacity(slots.len());
        for (pos, slot) in slots.iter().enumerate() {
            if index.insert(slot.name.clone(), pos).is_some() {
                return Err(ModelError::DuplicateAttribute {
                    entity: name,
                    attribute: slot.name.clone(),
                });
            }
        }

        tracing::debug!(
            entity = %name,
            slots = slots.len(),
            rules = rules.len(),
            "composed entity descriptor"
        );
        Ok(Arc::new(Self {
            name,
            slots,
            rules,
            index,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flattened slots, in positional-constructor order.
    pub fn slots(&self) -> &[AttributeSlot] {
        &self.slots
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of constructor values an instance takes.
    pub fn arity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_index(&self, attribute: &str) -> Option<usize> {
        self.index.get(attribute).copied()
    }

    pub fn slot(&self, attribute: &str) -> Option<&AttributeSlot> {
        self.slot_index(attribute).map(|i| &self.slots[i])
    }
}
