// Statement engine: drives refresh passes over a description

use crate::config::{CancelToken, EngineConfig};
use crate::interpreter::{EvalError, EvalResult, Evaluator};
use crate::memory::session::TargetSession;
use crate::memory::target::TargetAccess;
use crate::memory::value::Value;
use crate::model::{Description, Expression, NodeKind, TypeRef};
use crate::statements::errors::{EngineError, ExecResult, Interrupt, StatementError};
use crate::statements::gui::{GuiId, GuiTree, OutputNode};
use crate::statements::host::{EngineHost, HostRef};
use crate::statements::tree::Statement;
use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::time::Instant;

/// Notable things that happened during a pass without failing a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassEvent {
    /// A readlist reached an element it had already collected
    CycleDetected { symbol: String, address: u64 },
    /// A loop hit the iteration cap and was truncated
    LoopCapReached { line: u32, iterations: usize },
    /// A readlist hit the element guard
    ListLimitReached { symbol: String, limit: usize },
}

/// Result of one refresh pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    /// Statements skipped because they failed
    pub skipped: Vec<StatementError>,
    pub events: Vec<PassEvent>,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.events.is_empty()
    }
}

/// Statement engine.
///
/// Owns the target session and the output tree. Each
/// [`StatementEngine::refresh`] walks all statements once: conditions are
/// evaluated, reads fill the symbol store, loops drive their bodies and
/// output statements claim nodes in the output tree, which is committed at
/// the end of the pass.
pub struct StatementEngine<'d, T> {
    pub(crate) description: &'d Description,
    statements: Vec<Statement<'d>>,
    pub(crate) symbols: FxHashMap<String, TypeRef>,
    pub(crate) session: TargetSession<T>,
    pub(crate) gui: GuiTree,
    pub(crate) config: EngineConfig,
    /// `const` reads already satisfied, by statement id
    pub(crate) satisfied: FxHashSet<usize>,
    pub(crate) report: PassReport,
    started: Option<Instant>,
}

impl<'d, T: TargetAccess> StatementEngine<'d, T> {
    pub fn new(description: &'d Description, target: T, config: EngineConfig) -> Self {
        let session = TargetSession::new(target, config.chunk_size);
        Self::with_session(description, session, config)
    }

    pub fn with_session(description: &'d Description, session: TargetSession<T>, config: EngineConfig) -> Self {
        StatementEngine {
            description,
            statements: Statement::forest(&description.objects),
            symbols: description.declared_symbols(),
            session,
            gui: GuiTree::new(),
            config,
            satisfied: FxHashSet::default(),
            report: PassReport::default(),
            started: None,
        }
    }

    pub fn session(&self) -> &TargetSession<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut TargetSession<T> {
        &mut self.session
    }

    pub fn gui(&self) -> &GuiTree {
        &self.gui
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Committed output tree
    pub fn output(&self) -> Vec<OutputNode> {
        self.gui.snapshot()
    }

    /// Target state changed: drop everything read from it except `const`
    /// reads
    pub fn invalidate(&mut self) {
        self.session.invalidate();
    }

    /// Forget satisfied `const` reads as well
    pub fn reset(&mut self) {
        self.satisfied.clear();
        for name in self.symbols.keys() {
            self.session.store.set_persistent(name, false);
        }
        self.session.invalidate();
    }

    /// Run one pass over all statements and commit the output tree.
    ///
    /// Failing statements are skipped and listed in the report. A cancelled
    /// or overdue pass leaves the previous output tree in place.
    pub fn refresh(&mut self) -> Result<PassReport, EngineError> {
        self.gui.begin_pass();
        self.session.store.clear_transient();
        self.report = PassReport::default();
        self.started = Some(Instant::now());

        let statements = std::mem::take(&mut self.statements);
        let mut outcome = Ok(());
        for statement in &statements {
            if let Err(Interrupt::Engine(err)) = self.run_guarded(statement, GuiTree::ROOT) {
                outcome = Err(err);
                break;
            }
        }
        self.statements = statements;
        self.started = None;

        match outcome {
            Ok(()) => {
                self.gui.commit_pass();
                debug!(
                    "pass {} committed: {} skipped, {} events",
                    self.gui.epoch(),
                    self.report.skipped.len(),
                    self.report.events.len()
                );
                Ok(std::mem::take(&mut self.report))
            }
            Err(err) => {
                warn!("{}", err);
                self.gui.abort_pass();
                Err(err)
            }
        }
    }

    // ===== Statement dispatch =====

    /// Run a statement; a failure of the statement itself is logged and
    /// recorded, only pass-level interrupts propagate
    pub(crate) fn run_guarded(&mut self, statement: &Statement<'d>, parent: GuiId) -> ExecResult {
        match self.run(statement, parent) {
            Err(Interrupt::Statement(err)) => {
                warn!("Skipping {} statement: {}", statement.node.kind.tag(), err);
                self.report.skipped.push(err);
                Ok(())
            }
            other => other,
        }
    }

    pub(crate) fn run_children(&mut self, statement: &Statement<'d>, parent: GuiId) -> ExecResult {
        for child in &statement.children {
            self.run_guarded(child, parent)?;
        }
        Ok(())
    }

    fn run(&mut self, statement: &Statement<'d>, parent: GuiId) -> ExecResult {
        self.checkpoint()?;

        let node = statement.node;
        if let Some(cond) = &node.cond {
            let holds = self
                .evaluate(cond)
                .map_err(|source| StatementError::Condition {
                    line: node.line,
                    source,
                })?;
            if !holds.is_truthy() {
                return Ok(());
            }
        }

        match &node.kind {
            NodeKind::List(spec) => return self.exec_loop(statement, spec, parent, false),
            NodeKind::ListOut(spec) => return self.exec_loop(statement, spec, parent, true),
            NodeKind::Out { name } => return self.exec_out(statement, name, parent),
            NodeKind::Item { property, value } => {
                return self.exec_item(statement, property.as_ref(), value.as_ref(), parent)
            }
            NodeKind::Print { property, value } => {
                self.exec_print(statement, property.as_ref(), value.as_ref(), parent)?
            }
            NodeKind::Var(spec) => self.exec_var(statement, spec)?,
            NodeKind::Calc { exprs } => {
                for expr in exprs {
                    self.eval_at(node.line, "calc", expr)?;
                }
            }
            NodeKind::Read(spec) => self.exec_read(statement, spec)?,
            NodeKind::ReadList(spec) => self.exec_readlist(statement, spec)?,
            NodeKind::Object { .. } => {}
        }
        self.run_children(statement, parent)
    }

    /// Stop the pass when cancelled or out of time
    pub(crate) fn checkpoint(&self) -> Result<(), EngineError> {
        if self.config.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(EngineError::Cancelled);
        }
        if let (Some(deadline), Some(started)) = (self.config.deadline, self.started) {
            if started.elapsed() > deadline {
                return Err(EngineError::DeadlineExceeded(deadline));
            }
        }
        Ok(())
    }

    // ===== Expression helpers =====

    /// Evaluate an expression attribute against the symbol store
    pub fn evaluate(&mut self, expr: &Expression) -> EvalResult<Value> {
        let Some(ast) = &expr.parsed.ast else {
            return Err(EvalError::Parse(
                expr.parsed
                    .first_error()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| format!("'{}' is not an expression", expr.text)),
            ));
        };
        let mut host = EngineHost::new(self.description, &self.symbols, &mut self.session);
        Evaluator::new(&mut host, HostRef::Root)
            .with_options(self.config.eval_options())
            .evaluate(ast)
    }

    pub(crate) fn eval_at(
        &mut self,
        line: u32,
        what: &'static str,
        expr: &Expression,
    ) -> Result<Value, StatementError> {
        self.evaluate(expr)
            .map_err(|source| StatementError::Eval { line, what, source })
    }

    /// Display text of a template attribute; absent attributes are empty
    pub(crate) fn template_text(
        &mut self,
        line: u32,
        what: &'static str,
        expr: Option<&Expression>,
    ) -> Result<String, StatementError> {
        match expr {
            None => Ok(String::new()),
            Some(expr) => Ok(match self.eval_at(line, what, expr)? {
                Value::Str(text) => text,
                other => other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoopCapPolicy;
    use crate::memory::target::SimulatedTarget;
    use crate::model::{LoopSpec, Node, ReadSpec, Typedef, VarSpec};
    use pretty_assertions::assert_eq;

    const RAM: u64 = 0x2000_0000;

    fn target() -> SimulatedTarget {
        let mut target = SimulatedTarget::new()
            .with_region(RAM, 0x100)
            .with_symbol("counters", RAM + 0x10, 8);
        target.poke_u32(RAM + 0x10, 7);
        target.poke_u32(RAM + 0x14, 9);
        target
    }

    fn description() -> Description {
        Description::new()
            .with_type(Typedef::new("Pair", 8).member("a", "uint32_t", 0).member("b", "uint32_t", 4))
            .unwrap()
            .with_object(
                Node::object(1, "Counters")
                    .child(Node::read(2, ReadSpec::new("pair", "Pair").symbol("counters")))
                    .child(Node::var(3, VarSpec::new("sum", "uint32_t").value("pair.a + pair.b")))
                    .child(
                        Node::out(4, "Counters")
                            .child(Node::item(5, "a", "%d[pair.a]"))
                            .child(Node::item(6, "sum", "%d[sum]"))
                            .child(Node::item(7, "hidden", "x").when("sum > 100")),
                    ),
            )
    }

    #[test]
    fn test_refresh_builds_output() {
        let d = description();
        let mut engine = StatementEngine::new(&d, target(), EngineConfig::default());
        let report = engine.refresh().unwrap();
        assert!(report.is_clean());
        assert_eq!(engine.gui().render_text(), "Counters\n  a: 7\n  sum: 16\n");
    }

    #[test]
    fn test_failed_statement_is_skipped() {
        let d = Description::new().with_object(
            Node::object(1, "o")
                .child(Node::read(2, ReadSpec::new("gone", "uint32_t").symbol("missing")))
                .child(Node::out(3, "Out").child(Node::item(4, "x", "%d[gone]")).child(Node::item(5, "y", "1"))),
        );
        let mut engine = StatementEngine::new(&d, target(), EngineConfig::default());
        let report = engine.refresh().unwrap();

        assert_eq!(report.skipped.len(), 2);
        assert!(matches!(report.skipped[0], StatementError::UnresolvedSymbol { line: 2, .. }));
        assert!(matches!(report.skipped[1], StatementError::Eval { line: 4, .. }));
        assert_eq!(engine.gui().render_text(), "Out\n  y: 1\n");
    }

    #[test]
    fn test_refresh_reuses_nodes_and_sees_new_target_state() {
        let d = description();
        let mut engine = StatementEngine::new(&d, target(), EngineConfig::default());
        engine.refresh().unwrap();
        let ids: Vec<GuiId> = engine.gui().children(GuiTree::ROOT).to_vec();

        engine.session_mut().target_mut().poke_u32(RAM + 0x10, 100);
        engine.refresh().unwrap();
        assert_eq!(engine.gui().render_text(), "Counters\n  a: 7\n  sum: 16\n");

        engine.invalidate();
        engine.refresh().unwrap();
        assert_eq!(engine.gui().children(GuiTree::ROOT), ids.as_slice());
        assert_eq!(
            engine.gui().render_text(),
            "Counters\n  a: 100\n  sum: 109\n  hidden: x\n"
        );
    }

    #[test]
    fn test_cancelled_pass_keeps_previous_output() {
        let d = description();
        let token = CancelToken::new();
        let config = EngineConfig::default().with_cancel(token.clone());
        let mut engine = StatementEngine::new(&d, target(), config);
        engine.refresh().unwrap();
        let before = engine.output();

        token.cancel();
        assert_eq!(engine.refresh(), Err(EngineError::Cancelled));
        assert_eq!(engine.output(), before);

        token.reset();
        assert!(engine.refresh().is_ok());
    }

    #[test]
    fn test_loop_cap_policies() {
        let d = Description::new().with_object(
            Node::object(1, "o").child(Node::list(2, LoopSpec::new("i").while_("1"))),
        );
        let config = EngineConfig::default().with_max_loop_iterations(5);
        let mut engine = StatementEngine::new(&d, target(), config.clone());
        let report = engine.refresh().unwrap();
        assert_eq!(report.events, vec![PassEvent::LoopCapReached { line: 2, iterations: 5 }]);
        assert!(report.skipped.is_empty());

        let mut strict = StatementEngine::new(&d, target(), config.with_loop_cap_policy(LoopCapPolicy::Fail));
        let report = strict.refresh().unwrap();
        assert_eq!(report.skipped, vec![StatementError::LoopCap { line: 2, iterations: 5 }]);
    }
}
