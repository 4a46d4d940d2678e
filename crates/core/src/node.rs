//! The configuration tree node.
//!
//! A node is a name plus an ordered list of children. A node without
//! children is a leaf and its name doubles as its scalar value, so
//! `CMD 'insertFormValue'` is a node `CMD` with one leaf child whose
//! name is `insertFormValue`.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ConfigNode>,
}

impl ConfigNode {
    pub fn new(name: impl Into<String>) -> Self {
        ConfigNode {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Alias of [`ConfigNode::new`] that reads better for scalar values.
    pub fn leaf(value: impl Into<String>) -> Self {
        ConfigNode::new(value)
    }

    pub fn with_children(name: impl Into<String>, children: Vec<ConfigNode>) -> Self {
        ConfigNode {
            name: name.into(),
            children,
        }
    }

    /// `NAME 'value'`
    pub fn pair(name: impl Into<String>, value: impl Into<String>) -> Self {
        ConfigNode::with_children(name, vec![ConfigNode::leaf(value)])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn count(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> &[ConfigNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<ConfigNode> {
        &mut self.children
    }

    pub fn first_child(&self) -> Option<&ConfigNode> {
        self.children.first()
    }

    pub fn last_child(&self) -> Option<&ConfigNode> {
        self.children.last()
    }

    /// Appends `child` and returns a handle to it.
    pub fn add(&mut self, child: ConfigNode) -> &mut ConfigNode {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn add_leaf(&mut self, value: impl Into<String>) -> &mut ConfigNode {
        self.add(ConfigNode::leaf(value))
    }

    /// Scalar value of the node: the name of a leaf, otherwise the
    /// concatenated values of all children.
    pub fn value(&self) -> String {
        if self.is_leaf() {
            return self.name.clone();
        }
        let mut out = String::new();
        self.push_value(&mut out);
        out
    }

    fn push_value(&self, out: &mut String) {
        if self.is_leaf() {
            out.push_str(&self.name);
        } else {
            for c in &self.children {
                c.push_value(out);
            }
        }
    }

    // ──────────────────────────────────────────────
    // Queries
    // ──────────────────────────────────────────────

    /// All descendants named `name` on the shallowest level where any exist.
    pub fn query(&self, name: &str) -> Vec<&ConfigNode> {
        self.query_min_depth(name, 1)
    }

    /// Like [`ConfigNode::query`], but ignores matches shallower than
    /// `min_depth` (direct children are depth 1).
    pub fn query_min_depth(&self, name: &str, min_depth: usize) -> Vec<&ConfigNode> {
        let mut level: Vec<&ConfigNode> = vec![self];
        let mut depth = 0usize;
        while !level.is_empty() {
            let next: Vec<&ConfigNode> = level.iter().flat_map(|n| n.children.iter()).collect();
            depth += 1;
            if depth >= min_depth {
                let found: Vec<&ConfigNode> =
                    next.iter().copied().filter(|n| n.name == name).collect();
                if !found.is_empty() {
                    return found;
                }
            }
            level = next;
        }
        Vec::new()
    }

    /// Every descendant named `name`, at any depth, in breadth-first order.
    pub fn query_all(&self, name: &str) -> Vec<&ConfigNode> {
        let mut out = Vec::new();
        let mut queue: VecDeque<&ConfigNode> = self.children.iter().collect();
        while let Some(n) = queue.pop_front() {
            if n.name == name {
                out.push(n);
            }
            queue.extend(n.children.iter());
        }
        out
    }

    /// The last of the shallowest descendants named `name`.
    pub fn get(&self, name: &str) -> Result<&ConfigNode, ConfigError> {
        self.query(name)
            .pop()
            .ok_or_else(|| ConfigError::not_found(&self.name, name))
    }

    /// Value of [`ConfigNode::get`], if the node exists.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).ok().map(ConfigNode::value)
    }

    /// Direct child named `name`; the last one wins when repeated.
    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        self.children.iter().rev().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut ConfigNode> {
        self.children.iter_mut().rev().find(|c| c.name == name)
    }

    /// Direct child named `name`, appended if missing.
    pub fn child_or_insert(&mut self, name: &str) -> &mut ConfigNode {
        match self.children.iter().rposition(|c| c.name == name) {
            Some(i) => &mut self.children[i],
            None => self.add(ConfigNode::new(name)),
        }
    }

    /// Index path from `self` to the node [`ConfigNode::get`] would return.
    pub fn path_of(&self, name: &str) -> Option<Vec<usize>> {
        let mut level: Vec<(Vec<usize>, &ConfigNode)> = vec![(Vec::new(), self)];
        while !level.is_empty() {
            let mut next = Vec::new();
            for (path, node) in &level {
                for (i, c) in node.children.iter().enumerate() {
                    let mut p = path.clone();
                    p.push(i);
                    next.push((p, c));
                }
            }
            if let Some((p, _)) = next.iter().rev().find(|(_, n)| n.name == name) {
                return Some(p.clone());
            }
            level = next;
        }
        None
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&ConfigNode> {
        path.iter().try_fold(self, |n, &i| n.children.get(i))
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut ConfigNode> {
        path.iter()
            .try_fold(self, |n, &i| n.children.get_mut(i))
    }

    /// Mutable counterpart of [`ConfigNode::get`].
    pub fn get_mut(&mut self, name: &str) -> Result<&mut ConfigNode, ConfigError> {
        let parent = self.name.clone();
        match self.path_of(name) {
            Some(path) => self
                .node_at_mut(&path)
                .ok_or_else(|| ConfigError::not_found(&parent, name)),
            None => Err(ConfigError::not_found(&parent, name)),
        }
    }

    /// Removes every direct child named `name`; returns how many were removed.
    pub fn remove_children_named(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|c| c.name != name);
        before - self.children.len()
    }

    /// Applies `f` to this node and every descendant, parents first.
    pub fn walk_mut(&mut self, f: &mut dyn FnMut(&mut ConfigNode)) {
        f(self);
        for c in &mut self.children {
            c.walk_mut(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn conf(src: &str) -> ConfigNode {
        parse("test", src).unwrap()
    }

    #[test]
    fn leaf_value_is_its_name() {
        let n = conf("CMD 'insertFormValue'");
        assert_eq!(n.get("CMD").unwrap().value(), "insertFormValue");
    }

    #[test]
    fn inner_value_concatenates_children() {
        let n = conf("A('x' B 'y' ('z'))");
        assert_eq!(n.get("A").unwrap().value(), "xyz");
    }

    #[test]
    fn get_returns_last_of_repeated_sections() {
        let n = conf("Fenster(Titel 'a') Fenster(Titel 'b')");
        assert_eq!(n.get("Titel").unwrap().value(), "b");
        assert_eq!(n.query("Fenster").len(), 2);
    }

    #[test]
    fn query_stops_at_shallowest_level() {
        let n = conf("A(ID 'deep' B(ID 'deeper')) ID 'top'");
        let ids: Vec<String> = n.query("ID").into_iter().map(ConfigNode::value).collect();
        assert_eq!(ids, vec!["top"]);
        let all: Vec<String> = n.query_all("ID").into_iter().map(ConfigNode::value).collect();
        assert_eq!(all, vec!["top", "deep", "deeper"]);
    }

    #[test]
    fn query_min_depth_skips_shallow_matches() {
        let n = conf("X(X(X 'v'))");
        assert_eq!(n.query_min_depth("X", 2).len(), 1);
        assert_eq!(n.query_min_depth("X", 3)[0].value(), "v");
    }

    #[test]
    fn get_missing_is_not_found() {
        let n = conf("A 'b'");
        assert!(matches!(
            n.get("Nope"),
            Err(ConfigError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn get_mut_edits_in_place() {
        let mut n = conf("Formular(Funktionen(F1 'a') Funktionen(F2 'b'))");
        n.get_mut("Funktionen").unwrap().add(ConfigNode::pair("F3", "c"));
        let funcs = n.query("Funktionen");
        assert_eq!(funcs[1].count(), 2);
        assert_eq!(funcs[0].count(), 1);
    }

    #[test]
    fn child_or_insert_creates_missing_sections() {
        let mut n = ConfigNode::new("WM");
        n.child_or_insert("Formular")
            .child_or_insert("Funktionen")
            .add(ConfigNode::pair("F", "x"));
        assert_eq!(n.get("F").unwrap().value(), "x");
        n.child_or_insert("Formular");
        assert_eq!(n.count(), 1);
    }

    #[test]
    fn remove_children_named_counts() {
        let mut n = conf("A 'x' B 'y' A 'z'");
        assert_eq!(n.remove_children_named("A"), 2);
        assert_eq!(n.count(), 1);
    }
}
