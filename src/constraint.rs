//! Startup preconditions.
//!
//! Constraints are supplied by the embedding application (for example "the
//! spool directory must exist") and are evaluated in order, once, before the
//! daemon detaches or spawns anything.

use crate::config::DaemonConfig;
use crate::error::{DaemonError, Result};
use crate::supervisor::ExecutionMode;

/// What a constraint gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintContext<'a> {
    pub config: &'a DaemonConfig,
    pub mode: ExecutionMode,
}

/// A single precondition.
pub trait Constraint {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Return `Err(reason)` if the precondition does not hold.
    fn check(&self, ctx: &ConstraintContext<'_>) -> std::result::Result<(), String>;
}

/// Adapter for closure-based constraints, see [`ConstraintSet::check_with`].
struct FnConstraint<F> {
    name: String,
    check: F,
}

impl<F> Constraint for FnConstraint<F>
where
    F: Fn(&ConstraintContext<'_>) -> std::result::Result<(), String>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, ctx: &ConstraintContext<'_>) -> std::result::Result<(), String> {
        (self.check)(ctx)
    }
}

/// Ordered collection of constraints.
#[derive(Default)]
pub struct ConstraintSet {
    constraints: Vec<Box<dyn Constraint>>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a constraint; evaluation follows insertion order.
    pub fn add(&mut self, constraint: impl Constraint + 'static) -> &mut Self {
        self.constraints.push(Box::new(constraint));
        self
    }

    /// Append a closure as a named constraint.
    pub fn check_with<F>(&mut self, name: impl Into<String>, check: F) -> &mut Self
    where
        F: Fn(&ConstraintContext<'_>) -> std::result::Result<(), String> + 'static,
    {
        self.add(FnConstraint {
            name: name.into(),
            check,
        })
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Evaluate every constraint in order, stopping at the first failure.
    pub fn check_all(&self, ctx: &ConstraintContext<'_>) -> Result<()> {
        for constraint in &self.constraints {
            if let Err(reason) = constraint.check(ctx) {
                return Err(DaemonError::ConstraintViolation {
                    constraint: constraint.name().to_string(),
                    reason,
                });
            }
            tracing::trace!(constraint = constraint.name(), "Constraint fulfilled");
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConstraintSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.constraints.iter().map(|c| c.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ctx(config: &DaemonConfig) -> ConstraintContext<'_> {
        ConstraintContext {
            config,
            mode: ExecutionMode::Supervise,
        }
    }

    #[test]
    fn test_empty_set_passes() {
        let config = DaemonConfig::default();
        let set = ConstraintSet::new();
        assert!(set.is_empty());
        assert!(set.check_all(&ctx(&config)).is_ok());
    }

    #[test]
    fn test_first_failure_is_reported() {
        let config = DaemonConfig::default();
        let mut set = ConstraintSet::new();
        set.check_with("always-ok", |_| Ok(()))
            .check_with("needs-db", |_| Err("database unreachable".to_string()))
            .check_with("needs-disk", |_| Err("disk full".to_string()));

        match set.check_all(&ctx(&config)) {
            Err(DaemonError::ConstraintViolation { constraint, reason }) => {
                assert_eq!(constraint, "needs-db");
                assert_eq!(reason, "database unreachable");
            }
            other => panic!("Expected ConstraintViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_evaluation_stops_at_first_failure() {
        let config = DaemonConfig::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut set = ConstraintSet::new();
        for (name, ok) in [("a", true), ("b", false), ("c", true)] {
            let seen = Rc::clone(&seen);
            set.check_with(name, move |_| {
                seen.borrow_mut().push(name);
                if ok { Ok(()) } else { Err("no".into()) }
            });
        }

        assert!(set.check_all(&ctx(&config)).is_err());
        assert_eq!(*seen.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_context_exposes_config_and_mode() {
        let config = DaemonConfig::default().with_output_log("/tmp/out.log");
        let mut set = ConstraintSet::new();
        set.check_with("logs-configured", |ctx| {
            if ctx.mode == ExecutionMode::Supervise && ctx.config.output_log.ends_with("out.log") {
                Ok(())
            } else {
                Err("unexpected context".into())
            }
        });
        assert!(set.check_all(&ctx(&config)).is_ok());
    }

    #[test]
    fn test_debug_lists_names() {
        let mut set = ConstraintSet::new();
        set.check_with("one", |_| Ok(())).check_with("two", |_| Ok(()));
        assert_eq!(set.len(), 2);
        assert_eq!(format!("{:?}", set), r#"["one", "two"]"#);
    }
}
