// `list` and `listout` loops

use crate::config::LoopCapPolicy;
use crate::memory::arith;
use crate::memory::target::TargetAccess;
use crate::memory::value::{ScalarType, Value};
use crate::model::{Expression, LoopSpec, TypeRef};
use crate::parser::ast::BinOp;
use crate::statements::engine::{PassEvent, StatementEngine};
use crate::statements::errors::{ExecResult, StatementError};
use crate::statements::gui::GuiId;
use crate::statements::tree::Statement;
use log::{debug, warn};

impl<'d, T: TargetAccess> StatementEngine<'d, T> {
    /// Drive the loop variable and run the body once per iteration.
    ///
    /// With `limit`: `var = start; while var < limit { body; var++ }`.
    /// With `while`: the condition is checked after each iteration, or
    /// before it for `listout`; a condition that fails to evaluate ends the
    /// loop. Either form stops at the configured iteration cap.
    pub(crate) fn exec_loop(
        &mut self,
        statement: &Statement<'d>,
        spec: &LoopSpec,
        parent: GuiId,
        check_first: bool,
    ) -> ExecResult {
        let line = statement.line();
        let ty = loop_type(line, spec)?;

        let start = match &spec.start {
            Some(expr) => self.eval_at(line, "start", expr)?,
            None => Value::I32(0),
        };
        self.set_loop_var(line, spec, ty, &start)?;

        let cap = self.config.max_loop_iterations;
        let mut iterations = 0usize;

        match (&spec.limit, &spec.while_) {
            (Some(limit), None) => {
                let limit = self.eval_at(line, "limit", limit)?;
                loop {
                    let current = self.loop_var(line, spec, ty)?;
                    let below = arith::binary(BinOp::Lt, &current, &limit)
                        .map_err(|err| invalid(line, err.to_string()))?;
                    if !below.is_truthy() {
                        break;
                    }
                    if iterations == cap {
                        return self.loop_capped(line, iterations);
                    }
                    self.checkpoint()?;
                    self.run_children(statement, parent)?;
                    iterations += 1;
                    self.step_loop_var(line, spec, ty)?;
                }
            }
            (None, Some(cond)) => loop {
                if check_first && !self.loop_condition(cond) {
                    break;
                }
                if iterations == cap {
                    return self.loop_capped(line, iterations);
                }
                self.checkpoint()?;
                self.run_children(statement, parent)?;
                iterations += 1;
                self.step_loop_var(line, spec, ty)?;
                if !check_first && !self.loop_condition(cond) {
                    break;
                }
            },
            _ => {
                return Err(invalid(
                    line,
                    format!("loop '{}' needs exactly one of 'limit' and 'while'", spec.var),
                )
                .into())
            }
        }

        debug!("loop '{}' ran {} iterations", spec.var, iterations);
        Ok(())
    }

    fn loop_capped(&mut self, line: u32, iterations: usize) -> ExecResult {
        match self.config.loop_cap_policy {
            LoopCapPolicy::Truncate => {
                warn!("loop at line {} truncated after {} iterations", line, iterations);
                self.report
                    .events
                    .push(PassEvent::LoopCapReached { line, iterations });
                Ok(())
            }
            LoopCapPolicy::Fail => Err(StatementError::LoopCap { line, iterations }.into()),
        }
    }

    fn loop_condition(&mut self, cond: &Expression) -> bool {
        match self.evaluate(cond) {
            Ok(value) => value.is_truthy(),
            Err(err) => {
                debug!("loop condition '{}' ended the loop: {}", cond.text, err);
                false
            }
        }
    }

    fn set_loop_var(
        &mut self,
        line: u32,
        spec: &LoopSpec,
        ty: ScalarType,
        value: &Value,
    ) -> Result<(), StatementError> {
        let bytes = value
            .coerce(ty)
            .and_then(|v| v.encode(ty))
            .ok_or_else(|| invalid(line, format!("'{}' does not fit {}", value, ty)))?;
        self.session
            .store
            .store(&spec.var, 0, &bytes, bytes.len() as u64, None)
            .map_err(|source| StatementError::Cache { line, source })?;
        Ok(())
    }

    /// Current value; the body may have assigned to it
    fn loop_var(&self, line: u32, spec: &LoopSpec, ty: ScalarType) -> Result<Value, StatementError> {
        let bytes = self
            .session
            .store
            .read(&spec.var, 0, ty.byte_width() as u64)
            .map_err(|source| StatementError::Cache { line, source })?;
        Value::decode(&bytes, ty).ok_or_else(|| invalid(line, format!("'{}' is unreadable", spec.var)))
    }

    fn step_loop_var(&mut self, line: u32, spec: &LoopSpec, ty: ScalarType) -> Result<(), StatementError> {
        let current = self.loop_var(line, spec, ty)?;
        let next = arith::increment(&current, true).map_err(|err| invalid(line, err.to_string()))?;
        self.set_loop_var(line, spec, ty, &next)
    }
}

fn loop_type(line: u32, spec: &LoopSpec) -> Result<ScalarType, StatementError> {
    match &spec.ty {
        TypeRef::Scalar(ty) if !ty.is_float() => Ok(*ty),
        other => Err(invalid(line, format!("loop variable '{}' has type {:?}", spec.var, other))),
    }
}

fn invalid(line: u32, message: String) -> StatementError {
    StatementError::Invalid { line, message }
}

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::memory::target::SimulatedTarget;
    use crate::model::{Description, Expression, LoopSpec, Node, VarSpec};
    use crate::statements::engine::StatementEngine;
    use crate::statements::errors::StatementError;
    use pretty_assertions::assert_eq;

    fn run(object: Node) -> (Vec<String>, Vec<StatementError>, String) {
        let d = Description::new().with_object(
            Node::object(1, "o")
                .child(Node::var(2, VarSpec::new("seen", "uint32_t")))
                .child(object.child(Node::calc(100, &["seen = seen * 10 + i + 1"])))
                .child(Node::var(200, VarSpec::new("last_i", "int32_t").value("i"))),
        );
        let mut engine = StatementEngine::new(&d, SimulatedTarget::new(), EngineConfig::default());
        let report = engine.refresh().unwrap();
        let seen = engine.evaluate(&Expression::parse("seen")).unwrap().to_string();
        let end = engine.evaluate(&Expression::parse("last_i")).unwrap().to_string();
        (vec![seen], report.skipped, end)
    }

    #[test]
    fn test_limit_form() {
        let (seen, skipped, end) = run(Node::list(3, LoopSpec::new("i").start("0").limit("2")));
        // Body ran with i = 0 then i = 1
        assert_eq!(seen, vec!["12"]);
        assert_eq!(end, "2");
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_limit_form_never_entered() {
        let (seen, _, end) = run(Node::list(3, LoopSpec::new("i").start("5").limit("2")));
        assert_eq!(seen, vec!["0"]);
        assert_eq!(end, "5");
    }

    #[test]
    fn test_while_form_checks_after_body() {
        let (seen, _, end) = run(Node::list(3, LoopSpec::new("i").while_("i < 0")));
        assert_eq!(seen, vec!["1"]);
        assert_eq!(end, "1");
    }

    #[test]
    fn test_listout_checks_before_body() {
        let (seen, _, end) = run(Node::listout(3, LoopSpec::new("i").while_("i < 0")));
        assert_eq!(seen, vec!["0"]);
        assert_eq!(end, "0");

        let (seen, _, _) = run(Node::listout(3, LoopSpec::new("i").while_("i < 3")));
        assert_eq!(seen, vec!["123"]);
    }

    #[test]
    fn test_unreadable_condition_ends_loop() {
        let (seen, skipped, _) = run(Node::list(3, LoopSpec::new("i").while_("missing[i] != 0")));
        assert_eq!(seen, vec!["1"]);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_conflicting_bounds() {
        let (seen, skipped, _) = run(Node::list(3, LoopSpec::new("i").limit("2").while_("1")));
        assert_eq!(seen, vec!["0"]);
        assert!(matches!(skipped[..], [StatementError::Invalid { line: 3, .. }]));
    }
}
