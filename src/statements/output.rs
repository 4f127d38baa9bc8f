// `out`, `item` and `print` statements

use crate::memory::target::TargetAccess;
use crate::model::Expression;
use crate::statements::engine::StatementEngine;
use crate::statements::errors::{ExecResult, StatementError};
use crate::statements::gui::GuiId;
use crate::statements::tree::Statement;

impl<'d, T: TargetAccess> StatementEngine<'d, T> {
    pub(crate) fn exec_out(&mut self, statement: &Statement<'d>, name: &Expression, parent: GuiId) -> ExecResult {
        let text = self.template_text(statement.line(), "name", Some(name))?;
        let id = self.gui.claim_child(parent, &node_key(statement));
        self.gui.set_text(id, text, String::new());
        self.run_children(statement, id)
    }

    /// An item with an empty name takes name and value from its first
    /// `print` child. Print children never stay in the tree, and an item
    /// left without name and children is dropped.
    pub(crate) fn exec_item(
        &mut self,
        statement: &Statement<'d>,
        property: Option<&Expression>,
        value: Option<&Expression>,
        parent: GuiId,
    ) -> ExecResult {
        let line = statement.line();
        let name = self.template_text(line, "property", property)?;
        let value = self.template_text(line, "value", value)?;

        let id = self.gui.claim_child(parent, &node_key(statement));
        let unnamed = name.is_empty();
        self.gui.set_text(id, name, value);
        self.run_children(statement, id)?;

        let prints: Vec<GuiId> = self
            .gui
            .claimed(id)
            .iter()
            .copied()
            .filter(|&child| self.gui.is_print(child))
            .collect();
        if unnamed {
            if let Some(&first) = prints.first() {
                let (name, value) = self.gui.text(first);
                let (name, value) = (name.to_string(), value.to_string());
                self.gui.set_text(id, name, value);
            }
        }
        for print in prints {
            self.gui.detach(print);
        }

        if self.gui.text(id).0.is_empty() && self.gui.claimed(id).is_empty() {
            self.gui.detach(id);
        }
        Ok(())
    }

    pub(crate) fn exec_print(
        &mut self,
        statement: &Statement<'d>,
        property: Option<&Expression>,
        value: Option<&Expression>,
        parent: GuiId,
    ) -> Result<(), StatementError> {
        let line = statement.line();
        let name = self.template_text(line, "property", property)?;
        let value = self.template_text(line, "value", value)?;
        let id = self.gui.claim_print(parent, &node_key(statement));
        self.gui.set_text(id, name, value);
        Ok(())
    }
}

/// Output nodes are keyed by the statement that produced them; repeats in
/// loops are told apart by the tree's duplicate suffixes
fn node_key(statement: &Statement<'_>) -> String {
    format!("{}@{}", statement.node.kind.tag(), statement.id)
}

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::memory::target::SimulatedTarget;
    use crate::model::{Description, LoopSpec, Node, VarSpec};
    use crate::statements::engine::StatementEngine;
    use crate::statements::gui::GuiTree;
    use pretty_assertions::assert_eq;

    fn render(d: &Description) -> String {
        let mut engine = StatementEngine::new(d, SimulatedTarget::new(), EngineConfig::default());
        engine.refresh().unwrap();
        engine.gui().render_text()
    }

    #[test]
    fn test_item_promotes_first_print() {
        let d = Description::new().with_object(
            Node::object(1, "o")
                .child(Node::var(2, VarSpec::new("state", "uint8_t").value("2")))
                .child(
                    Node::out(3, "Kernel").child(
                        Node::item(4, "", "")
                            .child(Node::print(5, "State", "idle").when("state == 0"))
                            .child(Node::print(6, "State", "running %d[state]").when("state != 0"))
                            .child(Node::print(7, "State", "fallback")),
                    ),
                ),
        );
        assert_eq!(render(&d), "Kernel\n  State: running 2\n");
    }

    #[test]
    fn test_empty_items_are_dropped() {
        let d = Description::new().with_object(
            Node::object(1, "o").child(
                Node::out(2, "Out")
                    .child(Node::item(3, "", "").child(Node::print(4, "never", "").when("0")))
                    .child(Node::item(5, "", "").child(Node::item(6, "nested", "1")))
                    .child(Node::item(7, "named", "")),
            ),
        );
        assert_eq!(render(&d), "Out\n  \n    nested: 1\n  named\n");
    }

    #[test]
    fn test_items_in_loops_keep_identity() {
        let d = Description::new().with_object(
            Node::object(1, "o")
                .child(Node::var(2, VarSpec::new("n", "uint32_t").value("3")))
                .child(
                    Node::out(3, "Rows").child(
                        Node::list(4, LoopSpec::new("i").limit("n"))
                            .child(Node::item(5, "row %d[i]", "%d[i * i]")),
                    ),
                ),
        );
        let mut engine = StatementEngine::new(&d, SimulatedTarget::new(), EngineConfig::default());
        engine.refresh().unwrap();
        assert_eq!(
            engine.gui().render_text(),
            "Rows\n  row 0: 0\n  row 1: 1\n  row 2: 4\n"
        );
        let rows = engine.gui().children(GuiTree::ROOT)[0];
        let first: Vec<_> = engine.gui().children(rows).to_vec();

        engine.refresh().unwrap();
        assert_eq!(engine.gui().children(rows), first.as_slice());
    }
}
