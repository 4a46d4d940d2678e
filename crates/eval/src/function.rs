//! Transformation functions.
//!
//! A function is built from a definition tree such as
//! `Anrede(IF(STRCMP(VALUE 'Geschlecht' 'm') THEN 'Herr' ELSE 'Frau'))`.
//! The children of the definition node form the body; several children are
//! an implicit concatenation. The closed set of combinators is [`Expr`].
//! Functions can also wrap a native callback registered from Rust.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use formdoc_core::ConfigNode;
use regex::Regex;

use crate::error::FunctionError;
use crate::library::FunctionLibrary;
use crate::values::{Overlay, ValueProvider};

pub type NativeFn = Arc<dyn Fn(&[String]) -> String + Send + Sync>;

const TRUE: &str = "true";
const FALSE: &str = "false";

fn bool_str(b: bool) -> String {
    let s = if b { TRUE } else { FALSE };
    s.to_owned()
}

fn is_true(s: &str) -> bool {
    s.trim().eq_ignore_ascii_case(TRUE)
}

// ──────────────────────────────────────────────
// Expressions
// ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(String),
    /// `VALUE 'id'`
    Value(String),
    Cat(Vec<Expr>),
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Vec<Expr>),
    /// True if all operands are equal.
    StrCmp(Vec<Expr>),
    /// True if the whole input matches.
    Match {
        input: Box<Expr>,
        regex: Regex,
    },
    Replace {
        input: Box<Expr>,
        regex: Regex,
        replacement: String,
    },
    Length(Vec<Expr>),
    /// Calls another function with some parameters fixed.
    Bind {
        name: String,
        function: Arc<Function>,
        set: Vec<(String, Expr)>,
    },
}

impl Expr {
    pub fn parse(node: &ConfigNode, lib: &FunctionLibrary) -> Result<Expr, FunctionError> {
        if node.is_leaf() {
            return Ok(Expr::Literal(node.name.clone()));
        }
        let kind = node.name.as_str();
        match kind {
            "" | "CAT" => Ok(Expr::Cat(parse_all(node.children(), lib)?)),
            "VALUE" => {
                if node.count() != 1 {
                    return Err(FunctionError::arity(kind, "exactly one field id"));
                }
                Ok(Expr::Value(node.value()))
            }
            "IF" => parse_if(node, lib),
            "AND" => Ok(Expr::And(parse_all(node.children(), lib)?)),
            "OR" => Ok(Expr::Or(parse_all(node.children(), lib)?)),
            "NOT" => Ok(Expr::Not(parse_all(node.children(), lib)?)),
            "STRCMP" => {
                if node.count() < 2 {
                    return Err(FunctionError::arity(kind, "at least two operands"));
                }
                Ok(Expr::StrCmp(parse_all(node.children(), lib)?))
            }
            "MATCH" => {
                let [input, pattern] = node.children() else {
                    return Err(FunctionError::arity(kind, "an input and a pattern"));
                };
                Ok(Expr::Match {
                    input: Box::new(Expr::parse(input, lib)?),
                    regex: compile_anchored(&pattern.value())?,
                })
            }
            "REPLACE" => {
                let [input, pattern, replacement] = node.children() else {
                    return Err(FunctionError::arity(
                        kind,
                        "an input, a pattern and a replacement",
                    ));
                };
                let pattern = pattern.value();
                let regex = Regex::new(&pattern).map_err(|e| FunctionError::Regex {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
                Ok(Expr::Replace {
                    input: Box::new(Expr::parse(input, lib)?),
                    regex,
                    replacement: replacement.value(),
                })
            }
            "LENGTH" => Ok(Expr::Length(parse_all(node.children(), lib)?)),
            "BIND" => parse_bind(node, lib),
            other => Err(FunctionError::UnknownKind {
                kind: other.to_owned(),
            }),
        }
    }

    pub fn eval(&self, values: &dyn ValueProvider) -> String {
        match self {
            Expr::Literal(s) => s.clone(),
            Expr::Value(id) => values.value(id).unwrap_or_default(),
            Expr::Cat(parts) => parts.iter().map(|p| p.eval(values)).collect(),
            Expr::If {
                cond,
                then,
                otherwise,
            } => {
                if is_true(&cond.eval(values)) {
                    then.eval(values)
                } else {
                    otherwise.eval(values)
                }
            }
            Expr::And(ops) => bool_str(ops.iter().all(|o| is_true(&o.eval(values)))),
            Expr::Or(ops) => bool_str(ops.iter().any(|o| is_true(&o.eval(values)))),
            Expr::Not(ops) => bool_str(!ops.iter().all(|o| is_true(&o.eval(values)))),
            Expr::StrCmp(ops) => {
                let mut it = ops.iter().map(|o| o.eval(values));
                let first = it.next().unwrap_or_default();
                bool_str(it.all(|v| v == first))
            }
            Expr::Match { input, regex } => bool_str(regex.is_match(&input.eval(values))),
            Expr::Replace {
                input,
                regex,
                replacement,
            } => regex
                .replace_all(&input.eval(values), replacement.as_str())
                .into_owned(),
            Expr::Length(parts) => {
                let s: String = parts.iter().map(|p| p.eval(values)).collect();
                s.chars().count().to_string()
            }
            Expr::Bind { function, set, .. } => {
                let bound: BTreeMap<String, String> = set
                    .iter()
                    .map(|(param, e)| (param.clone(), e.eval(values)))
                    .collect();
                function.eval(&Overlay::new(&bound, values))
            }
        }
    }

    /// Appends every field id this expression reads, skipping duplicates.
    fn collect_params(&self, out: &mut Vec<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Value(id) => push_unique(out, id),
            Expr::Cat(v)
            | Expr::And(v)
            | Expr::Or(v)
            | Expr::Not(v)
            | Expr::StrCmp(v)
            | Expr::Length(v) => {
                for e in v {
                    e.collect_params(out);
                }
            }
            Expr::If {
                cond,
                then,
                otherwise,
            } => {
                cond.collect_params(out);
                then.collect_params(out);
                otherwise.collect_params(out);
            }
            Expr::Match { input, .. } | Expr::Replace { input, .. } => input.collect_params(out),
            Expr::Bind { function, set, .. } => {
                for p in function.parameters() {
                    if !set.iter().any(|(name, _)| name == p) {
                        push_unique(out, p);
                    }
                }
                for (_, e) in set {
                    e.collect_params(out);
                }
            }
        }
    }
}

fn push_unique(out: &mut Vec<String>, id: &str) {
    if !out.iter().any(|p| p == id) {
        out.push(id.to_owned());
    }
}

fn parse_all(nodes: &[ConfigNode], lib: &FunctionLibrary) -> Result<Vec<Expr>, FunctionError> {
    nodes.iter().map(|n| Expr::parse(n, lib)).collect()
}

fn compile_anchored(pattern: &str) -> Result<Regex, FunctionError> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| FunctionError::Regex {
        pattern: pattern.to_owned(),
        message: e.to_string(),
    })
}

/// `IF(cond THEN ... ELSE ...)`; a missing ELSE yields the empty string.
fn parse_if(node: &ConfigNode, lib: &FunctionLibrary) -> Result<Expr, FunctionError> {
    let mut cond = None;
    let mut then = None;
    let mut otherwise = None;
    for c in node.children() {
        match c.name.as_str() {
            "THEN" if !c.is_leaf() => then = Some(Expr::Cat(parse_all(c.children(), lib)?)),
            "ELSE" if !c.is_leaf() => otherwise = Some(Expr::Cat(parse_all(c.children(), lib)?)),
            _ if cond.is_none() => cond = Some(Expr::parse(c, lib)?),
            _ => return Err(FunctionError::arity("IF", "one condition, THEN and ELSE")),
        }
    }
    match (cond, then) {
        (Some(cond), Some(then)) => Ok(Expr::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise.unwrap_or(Expr::Literal(String::new()))),
        }),
        _ => Err(FunctionError::arity("IF", "a condition and a THEN branch")),
    }
}

/// `BIND(FUNCTION 'name' SET('param' expr) ...)`
fn parse_bind(node: &ConfigNode, lib: &FunctionLibrary) -> Result<Expr, FunctionError> {
    let name = node
        .child("FUNCTION")
        .map(ConfigNode::value)
        .ok_or_else(|| FunctionError::arity("BIND", "a FUNCTION"))?;
    let function = lib
        .get(&name)
        .ok_or_else(|| FunctionError::Undefined { name: name.clone() })?;
    let mut set = Vec::new();
    for c in node.children().iter().filter(|c| c.name == "SET") {
        let [param, expr] = c.children() else {
            return Err(FunctionError::arity("SET", "a parameter name and a value"));
        };
        set.push((param.value(), Expr::parse(expr, lib)?));
    }
    Ok(Expr::Bind {
        name,
        function,
        set,
    })
}

// ──────────────────────────────────────────────
// Function
// ──────────────────────────────────────────────

#[derive(Clone)]
pub enum Body {
    Expr(Expr),
    Native(NativeFn),
}

/// A named transformation: parameters plus a body.
///
/// `parameters()` is exactly the list of field ids the body reads, in order
/// of first appearance.
#[derive(Clone)]
pub struct Function {
    params: Vec<String>,
    body: Body,
    definition: Option<ConfigNode>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Function");
        d.field("params", &self.params);
        match &self.body {
            Body::Expr(e) => d.field("body", e),
            Body::Native(_) => d.field("body", &"<native>"),
        };
        d.finish()
    }
}

impl Function {
    /// Build a function from its definition node. The node's own name is the
    /// function name and is not interpreted.
    pub fn parse(definition: &ConfigNode, lib: &FunctionLibrary) -> Result<Function, FunctionError> {
        if definition.is_leaf() {
            return Err(FunctionError::arity(&definition.name, "a body"));
        }
        let expr = match definition.children() {
            [single] => Expr::parse(single, lib)?,
            many => Expr::Cat(parse_all(many, lib)?),
        };
        let mut params = Vec::new();
        expr.collect_params(&mut params);
        Ok(Function {
            params,
            body: Body::Expr(expr),
            definition: Some(definition.clone()),
        })
    }

    /// Wrap a callback. It receives the parameter values in the order of `params`.
    pub fn native<F>(params: Vec<String>, f: F) -> Function
    where
        F: Fn(&[String]) -> String + Send + Sync + 'static,
    {
        Function {
            params,
            body: Body::Native(Arc::new(f)),
            definition: None,
        }
    }

    pub fn parameters(&self) -> &[String] {
        &self.params
    }

    /// The definition tree, absent for native functions.
    pub fn definition(&self) -> Option<&ConfigNode> {
        self.definition.as_ref()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn eval(&self, values: &dyn ValueProvider) -> String {
        match &self.body {
            Body::Expr(e) => e.eval(values),
            Body::Native(f) => {
                let args: Vec<String> = self
                    .params
                    .iter()
                    .map(|p| values.value(p).unwrap_or_default())
                    .collect();
                f(&args)
            }
        }
    }
}

/// Rewrite every `VALUE 'old'` in a definition tree to `VALUE 'new'`.
/// Returns the number of replaced references.
pub fn rename_value_refs(definition: &mut ConfigNode, old: &str, new: &str) -> usize {
    let mut replaced = 0;
    definition.walk_mut(&mut |n| {
        if n.name == "VALUE" && n.count() == 1 && n.children[0].is_leaf() && n.children[0].name == old
        {
            n.children[0].name = new.to_owned();
            replaced += 1;
        }
    });
    replaced
}
