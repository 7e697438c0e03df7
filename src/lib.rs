//! Runtime object model for schema-defined entities.
//!
//! The crate compiles declarative entity definitions (simple types,
//! attributes with mandatory/optional semantics, supertype chains, and
//! WHERE-rule invariants) into immutable descriptors, then constructs
//! and checks typed instances against them.
//!
//! ```
//! use entity_model_core::{check_all, EntitySpec, SchemaBuilder};
//!
//! let schema = SchemaBuilder::new("geometry")
//!     .entity(
//!         EntitySpec::new("unit_vector")
//!             .attribute("x", "real")
//!             .attribute("y", "real")
//!             .attribute("z", "real")
//!             .rule("length_1", "x ** 2 + y ** 2 + z ** 2 = 1"),
//!     )
//!     .finish()?;
//!
//! let v = schema.construct("unit_vector", vec![1.0.into(), 0.0.into(), 0.0.into()])?;
//! assert!(check_all(&v).all_passed());
//! # Ok::<(), entity_model_core::ModelError>(())
//! ```

pub mod attribute;
pub mod descriptor;
pub mod error;
pub mod expr;
pub mod instance;
pub mod rules;
pub mod schema;
pub mod types;
pub mod value;

pub use attribute::AttributeSlot;
pub use descriptor::EntityDescriptor;
pub use error::{ModelError, Result};
pub use expr::{parse_rule_expr, Expr};
pub use instance::EntityInstance;
pub use rules::{check_all, Rule, RuleReport, RuleResult, RuleStatus};
pub use schema::{AttributeSpec, EntitySpec, RuleSpec, Schema, SchemaBuilder};
pub use types::{PrimitiveKind, TypeDef, TypeKind, TypeRegistry};
pub use value::Value;
