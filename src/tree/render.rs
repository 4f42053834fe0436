// src/tree/render.rs

//! Text overview of the forest, as shown by `simon list`.

use std::fmt::{self, Write};

use crate::tree::forest::SimulationTree;
use crate::types::{TaskId, ROOT_ID};

impl fmt::Display for SimulationTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(self, ROOT_ID, f)
    }
}

fn write_node(tree: &SimulationTree, id: TaskId, out: &mut impl Write) -> fmt::Result {
    let node = &tree[id];
    let indent = "  ".repeat(node.level);

    if node.is_root() {
        writeln!(out, "[{}] {}  {}  ({})", node.id, node.name, node.status, node.dir.display())?;
    } else {
        write!(
            out,
            "{indent}[{}] {}  {}  t={}/{}  nice={}",
            node.id, node.name, node.status, node.progress, node.progress_target, node.niceness
        )?;
        if let Some(cid) = node.restart_candidate {
            write!(out, "  cid={cid}")?;
        }
        match node.code_name() {
            Some(code) => writeln!(out, "  code={code}")?,
            None => writeln!(out, "  code=?")?,
        }
    }

    for &child in &node.children {
        write_node(tree, child, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::tree::SimulationTree;
    use crate::types::{TaskStatus, ROOT_ID};

    #[test]
    fn children_are_indented_under_parents() {
        let mut tree = SimulationTree::new("/sims");
        let a = tree.insert_child(ROOT_ID, "run_001".into(), "/sims/run_001".into());
        let b = tree.insert_child(a, "restart_01".into(), "/sims/run_001/restart_01".into());
        tree[a].status = TaskStatus::Stopped;
        tree[a].progress = 50.0;
        tree[a].progress_target = 100.0;
        tree[a].restart_candidate = Some(b);

        let text = tree.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("[0] root"));
        assert_eq!(lines[1], "  [1] run_001  STOP  t=50/100  nice=0  cid=2  code=?");
        assert!(lines[2].starts_with("    [2] restart_01  NEW"));
    }
}
