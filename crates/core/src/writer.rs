//! Serialization of configuration trees back to text.
//!
//! Output of [`ConfigNode::to_conf_string`] parses back (via [`crate::parse`])
//! into a root whose single child equals the original node.

use std::fmt::{self, Write as _};

use crate::node::ConfigNode;

/// Quote `s` with single quotes, escaping quotes, percent signs and newlines.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("''"),
            '%' => out.push_str("%%"),
            '\n' => out.push_str("%n"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

impl ConfigNode {
    /// Single-line text form of this node.
    pub fn to_conf_string(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out, None, 0);
        out
    }

    /// Text form of the children only, as parsed from a file.
    pub fn children_to_conf_string(&self) -> String {
        let parts: Vec<String> = self.children.iter().map(|c| c.to_conf_string()).collect();
        parts.join(" ")
    }

    /// Multi-line text form with nested sections indented.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out, Some("  "), 0);
        out
    }
}

impl fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_conf_string())
    }
}

fn write_node(node: &ConfigNode, out: &mut String, indent: Option<&str>, depth: usize) {
    if node.is_leaf() {
        out.push_str(&quote(&node.name));
        return;
    }
    if !node.name.is_empty() && node.children.len() == 1 && node.children[0].is_leaf() {
        let _ = write!(out, "{} {}", node.name, quote(&node.children[0].name));
        return;
    }
    out.push_str(&node.name);
    out.push('(');
    let nested = node.children.iter().any(|c| !c.is_leaf());
    match indent {
        Some(step) if nested => {
            for c in &node.children {
                out.push('\n');
                push_indent(out, step, depth + 1);
                write_node(c, out, indent, depth + 1);
            }
            out.push('\n');
            push_indent(out, step, depth);
        }
        _ => {
            for (i, c) in node.children.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_node(c, out, indent, depth + 1);
            }
        }
    }
    out.push(')');
}

fn push_indent(out: &mut String, step: &str, depth: usize) {
    for _ in 0..depth {
        out.push_str(step);
    }
}
