//! WHERE rules and invariant checking.
//!
//! A rule violation is reported data, not an error: checking never aborts,
//! every rule of every level is evaluated, and the caller decides what a
//! violation means. A rule whose expression cannot be evaluated (an unset
//! operand reached arithmetic, a non-boolean result) is `Indeterminate`,
//! carrying the reason; it neither passes nor fails silently.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::expr::{parse_rule_expr, Expr};
use crate::instance::EntityInstance;
use crate::value::Value;

/// A native predicate, for invariants that outgrow the expression grammar.
pub type NativePredicate =
    Arc<dyn Fn(&EntityInstance) -> Result<bool, String> + Send + Sync>;

/// How a rule decides pass or fail.
#[derive(Clone)]
pub enum RulePredicate {
    /// A parsed WHERE expression; must evaluate to a boolean.
    Expr(Expr),
    Native(NativePredicate),
}

impl fmt::Debug for RulePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RulePredicate::Expr(e) => f.debug_tuple("Expr").field(e).finish(),
            RulePredicate::Native(_) => f.write_str("Native(..)"),
        }
    }
}

/// A named invariant attached to one entity level.
///
/// Identity is `(declared_by, name)`: a subtype may declare a rule with the
/// same name as a supertype rule and both are kept and checked.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub declared_by: String,
    pub predicate: RulePredicate,
}

impl Rule {
    /// Build a rule from expression source text.
    pub fn parse(
        name: impl Into<String>,
        declared_by: impl Into<String>,
        source: &str,
    ) -> Result<Self, String> {
        let expr = parse_rule_expr(source)?;
        Ok(Self {
            name: name.into(),
            declared_by: declared_by.into(),
            predicate: RulePredicate::Expr(expr),
        })
    }

    pub fn native(
        name: impl Into<String>,
        declared_by: impl Into<String>,
        predicate: NativePredicate,
    ) -> Self {
        Self {
            name: name.into(),
            declared_by: declared_by.into(),
            predicate: RulePredicate::Native(predicate),
        }
    }

    /// Evaluate against one instance. Total: never panics, never errors.
    pub fn check(&self, instance: &EntityInstance) -> RuleStatus {
        let outcome = match &self.predicate {
            RulePredicate::Expr(expr) => match expr.evaluate(instance) {
                Ok(value) => match value.base() {
                    Value::Bool(b) => Ok(*b),
                    other => Err(format!(
                        "rule expression produced {}, not a boolean",
                        other.kind_name()
                    )),
                },
                Err(reason) => Err(reason),
            },
            RulePredicate::Native(f) => f(instance),
        };
        match outcome {
            Ok(true) => RuleStatus::Passed,
            Ok(false) => RuleStatus::Violated,
            Err(reason) => RuleStatus::Indeterminate(reason),
        }
    }
}

/// Outcome of one rule check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    Passed,
    Violated,
    /// The rule could not be decided; the reason says why.
    Indeterminate(String),
}

/// One rule's outcome, addressed by entity level and rule name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleResult {
    /// Entity the checked instance belongs to.
    pub entity: String,
    /// Level in the supertype chain that declared the rule.
    pub declared_by: String,
    pub rule: String,
    pub status: RuleStatus,
}

impl RuleResult {
    /// True only for `Passed`; violated and indeterminate both fail.
    pub fn passed(&self) -> bool {
        self.status == RuleStatus::Passed
    }
}

impl fmt::Display for RuleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            RuleStatus::Passed => {
                write!(f, "{}.{}: passed", self.declared_by, self.rule)
            }
            RuleStatus::Violated => {
                write!(f, "{}.{}: VIOLATED", self.declared_by, self.rule)
            }
            RuleStatus::Indeterminate(reason) => {
                write!(f, "{}.{}: indeterminate ({reason})", self.declared_by, self.rule)
            }
        }
    }
}

/// All rule outcomes for one instance, in declaration order
/// (supertype rules first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct RuleReport {
    pub results: Vec<RuleResult>,
}

impl RuleReport {
    /// True iff every rule passed. Empty reports pass vacuously;
    /// an indeterminate rule means the instance is NOT known-valid.
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(RuleResult::passed)
    }

    pub fn violations(&self) -> impl Iterator<Item = &RuleResult> {
        self.results
            .iter()
            .filter(|r| r.status == RuleStatus::Violated)
    }

    pub fn indeterminate(&self) -> impl Iterator<Item = &RuleResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.status, RuleStatus::Indeterminate(_)))
    }
}

/// Evaluate every rule of the instance's descriptor, supertype levels
/// first. Never short-circuits on a violation.
pub fn check_all(instance: &EntityInstance) -> RuleReport {
    let descriptor = instance.descriptor();
    let results = descriptor
        .rules()
        .iter()
        .map(|rule| {
            let status = rule.check(instance);
            if status != RuleStatus::Passed {
                tracing::debug!(
                    entity = %descriptor.name(),
                    rule = %rule.name,
                    declared_by = %rule.declared_by,
                    ?status,
                    "rule did not pass"
                );
            }
            RuleResult {
                entity: descriptor.name().to_string(),
                declared_by: rule.declared_by.clone(),
                rule: rule.name.clone(),
                status,
            }
        })
        .collect();
    RuleReport { results }
}
