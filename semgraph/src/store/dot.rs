//! Graphviz rendering of a [`MemStore`], for debugging.
//!
//! Arcs are first-class elements here, so every arc is drawn as its own small
//! node with an edge from its source and an edge to its target. That keeps
//! arc-to-arc references visible, which a plain edge rendering cannot show.

use super::{ElementKind, GraphStore, MemStore};

impl MemStore {
    pub fn dot(&self) -> String {
        let mut out = String::from("digraph {\n");
        for el in self.elements() {
            let Ok(tag) = self.type_of(el) else { continue };
            let (shape, label) = match tag.kind {
                ElementKind::Node(role) => ("box", format!("{el:?} {role:?}")),
                ElementKind::Link => ("note", format!("{el:?} link")),
                ElementKind::Arc(_) => ("point", format!("{el:?}")),
            };
            let constness = if tag.is_var() { " style=dashed" } else { "" };
            out.push_str(&format!(
                "    \"{el:?}\" [shape={shape} label=\"{}\"{constness}]\n",
                label.escape_debug()
            ));
        }
        for el in self.elements() {
            if let Ok((source, target)) = self.endpoints(el) {
                out.push_str(&format!("    \"{source:?}\" -> \"{el:?}\" [arrowhead=none]\n"));
                out.push_str(&format!("    \"{el:?}\" -> \"{target:?}\"\n"));
            }
        }
        out.push_str("}\n");
        out
    }
}
