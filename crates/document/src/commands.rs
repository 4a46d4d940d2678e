//! Command tree: commands embedded in anchor names.
//!
//! An anchor named `WM(CMD 'insertFormValue' ID 'Nachname') 3` carries a
//! command; the trailing number only keeps anchor names unique. Commands
//! nest the way their anchors' spans do.
//!
//! Commands live in a slab arena and are keyed by anchor name, so
//! [`CommandTree::update`] keeps the same [`CommandId`] (and the same
//! `done` flag) for anchors that survive a rescan.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use formdoc_core::{identifier, parse, ConfigError, ConfigNode};
use regex::Regex;
use slab::Slab;
use tracing::{debug, error, trace};

use crate::host::{Anchor, Span, TextDocument};

fn command_anchor_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?s)\A\s*(WM\s*\(.*\))\s*\d*\z").ok())
        .as_ref()
}

/// The `WM(...)` part of a command anchor name, if it is one.
pub fn command_payload(anchor_name: &str) -> Option<&str> {
    command_anchor_pattern()?
        .captures(anchor_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub fn is_command_anchor(anchor_name: &str) -> bool {
    command_payload(anchor_name).is_some()
}

// ──────────────────────────────────────────────
// Command kinds
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrintBlockKind {
    DraftOnly,
    AllVersions,
    NotInOriginal,
    OriginalOnly,
}

impl PrintBlockKind {
    pub fn cmd_name(self) -> &'static str {
        match self {
            PrintBlockKind::DraftOnly => "draftOnly",
            PrintBlockKind::AllVersions => "allVersions",
            PrintBlockKind::NotInOriginal => "notInOriginal",
            PrintBlockKind::OriginalOnly => "originalOnly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Its anchor covers the text of a form description to merge.
    Form,
    SetType {
        doc_type: String,
    },
    SetGroups {
        groups: Vec<String>,
    },
    InsertFormValue {
        id: String,
        trafo: Option<String>,
    },
    OverrideFrag {
        frag_id: String,
        new_frag_id: Option<String>,
    },
    SetPrintFunction {
        function: String,
    },
    InvisibleMarker,
    PrintBlock {
        kind: PrintBlockKind,
        highlight_color: Option<u32>,
    },
    /// A well-formed command this model does not interpret.
    Other {
        cmd: String,
    },
}

impl CommandKind {
    /// Classify a parsed `WM(...)` node.
    pub fn classify(wm: &ConfigNode) -> Result<CommandKind, ConfigError> {
        let cmd = match wm.child("CMD") {
            Some(c) => c.value(),
            None if wm.child("GROUPS").is_some() => return Ok(classify_groups(wm)),
            None => return Err(ConfigError::not_found(&wm.name, "CMD")),
        };
        let kind = match cmd.to_ascii_lowercase().as_str() {
            "form" => CommandKind::Form,
            "settype" => CommandKind::SetType {
                doc_type: wm.get("TYPE")?.value(),
            },
            "setgroups" => classify_groups(wm),
            "insertformvalue" => CommandKind::InsertFormValue {
                id: wm.get("ID")?.value(),
                trafo: wm.child("TRAFO").map(ConfigNode::value),
            },
            "overridefrag" => CommandKind::OverrideFrag {
                frag_id: wm.get("FRAG_ID")?.value(),
                new_frag_id: wm.child("NEW_FRAG_ID").map(ConfigNode::value),
            },
            "setprintfunction" => CommandKind::SetPrintFunction {
                function: identifier(&wm.get("FUNCTION")?.value())?.to_owned(),
            },
            "invisiblemarker" => CommandKind::InvisibleMarker,
            "draftonly" => print_block(wm, PrintBlockKind::DraftOnly),
            "allversions" => print_block(wm, PrintBlockKind::AllVersions),
            "notinoriginal" => print_block(wm, PrintBlockKind::NotInOriginal),
            "originalonly" => print_block(wm, PrintBlockKind::OriginalOnly),
            _ => CommandKind::Other { cmd },
        };
        Ok(kind)
    }

    /// Short name for listings.
    pub fn label(&self) -> &str {
        match self {
            CommandKind::Form => "form",
            CommandKind::SetType { .. } => "setType",
            CommandKind::SetGroups { .. } => "setGroups",
            CommandKind::InsertFormValue { .. } => "insertFormValue",
            CommandKind::OverrideFrag { .. } => "overrideFrag",
            CommandKind::SetPrintFunction { .. } => "setPrintFunction",
            CommandKind::InvisibleMarker => "invisibleMarker",
            CommandKind::PrintBlock { kind, .. } => kind.cmd_name(),
            CommandKind::Other { cmd } => cmd,
        }
    }
}

fn classify_groups(wm: &ConfigNode) -> CommandKind {
    let groups = wm
        .child("GROUPS")
        .map(|g| g.children().iter().map(ConfigNode::value).collect())
        .unwrap_or_default();
    CommandKind::SetGroups { groups }
}

fn print_block(wm: &ConfigNode, kind: PrintBlockKind) -> CommandKind {
    let highlight_color = wm.child("HIGHLIGHT_COLOR").and_then(|c| {
        let hex = c.value();
        match u32::from_str_radix(hex.trim_start_matches('#'), 16) {
            Ok(v) => Some(v),
            Err(_) => {
                error!(color = %hex, "ignoring malformed HIGHLIGHT_COLOR");
                None
            }
        }
    });
    CommandKind::PrintBlock {
        kind,
        highlight_color,
    }
}

// ──────────────────────────────────────────────
// Commands and the tree
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(usize);

#[derive(Debug, Clone)]
pub struct Command {
    pub anchor: String,
    pub span: Span,
    pub payload: ConfigNode,
    pub kind: CommandKind,
    done: bool,
    visible: bool,
    parent: Option<CommandId>,
    children: Vec<CommandId>,
}

impl Command {
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn parent(&self) -> Option<CommandId> {
        self.parent
    }

    pub fn children(&self) -> &[CommandId] {
        &self.children
    }
}

/// What a call to [`CommandTree::update`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub added: Vec<CommandId>,
    pub removed: usize,
    pub skipped: usize,
}

impl UpdateSummary {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed == 0
    }
}

#[derive(Debug, Default)]
pub struct CommandTree {
    arena: Slab<Command>,
    by_anchor: HashMap<String, CommandId>,
    roots: Vec<CommandId>,
    /// Ids in document order.
    order: Vec<CommandId>,
}

impl CommandTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rescan the document's anchors.
    ///
    /// Commands whose anchor still exists are kept (only their span is
    /// refreshed); new command anchors are parsed and added; commands whose
    /// anchor disappeared are dropped. Anchors with unparsable payloads are
    /// logged and skipped.
    pub fn update(&mut self, doc: &dyn TextDocument) -> UpdateSummary {
        let anchors: Vec<Anchor> = doc
            .anchors()
            .into_iter()
            .filter(|a| is_command_anchor(&a.name))
            .collect();
        let mut summary = UpdateSummary::default();
        let mut seen: HashSet<&str> = HashSet::with_capacity(anchors.len());

        for anchor in &anchors {
            seen.insert(anchor.name.as_str());
            if let Some(&id) = self.by_anchor.get(&anchor.name) {
                if let Some(cmd) = self.arena.get_mut(id.0) {
                    cmd.span = anchor.span;
                }
                continue;
            }
            match parse_command(&anchor.name) {
                Ok((payload, kind)) => {
                    let visible = kind != CommandKind::InvisibleMarker;
                    let id = CommandId(self.arena.insert(Command {
                        anchor: anchor.name.clone(),
                        span: anchor.span,
                        payload,
                        kind,
                        done: false,
                        visible,
                        parent: None,
                        children: Vec::new(),
                    }));
                    self.by_anchor.insert(anchor.name.clone(), id);
                    summary.added.push(id);
                }
                Err(e) => {
                    error!(anchor = %anchor.name, error = %e, "skipping malformed command");
                    summary.skipped += 1;
                }
            }
        }

        let gone: Vec<(String, CommandId)> = self
            .by_anchor
            .iter()
            .filter(|(name, _)| !seen.contains(name.as_str()))
            .map(|(name, id)| (name.clone(), *id))
            .collect();
        for (name, id) in gone {
            trace!(anchor = %name, "command anchor disappeared");
            self.by_anchor.remove(&name);
            self.arena.remove(id.0);
            summary.removed += 1;
        }

        self.rebuild_nesting();
        debug!(
            commands = self.arena.len(),
            added = summary.added.len(),
            removed = summary.removed,
            skipped = summary.skipped,
            "command tree updated"
        );
        summary
    }

    /// Derive parent/child links from span containment. Equal spans nest
    /// in anchor-name order.
    fn rebuild_nesting(&mut self) {
        let mut ids: Vec<CommandId> = self.arena.iter().map(|(k, _)| CommandId(k)).collect();
        ids.sort_by(|a, b| {
            let ca = &self.arena[a.0];
            let cb = &self.arena[b.0];
            (ca.span.start, std::cmp::Reverse(ca.span.end), &ca.anchor).cmp(&(
                cb.span.start,
                std::cmp::Reverse(cb.span.end),
                &cb.anchor,
            ))
        });
        for (_, cmd) in self.arena.iter_mut() {
            cmd.parent = None;
            cmd.children.clear();
        }
        self.roots.clear();

        let mut stack: Vec<CommandId> = Vec::new();
        for &id in &ids {
            let span = self.arena[id.0].span;
            while let Some(&top) = stack.last() {
                if self.arena[top.0].span.contains(&span) {
                    break;
                }
                stack.pop();
            }
            match stack.last() {
                Some(&parent) => {
                    self.arena[id.0].parent = Some(parent);
                    self.arena[parent.0].children.push(id);
                }
                None => self.roots.push(id),
            }
            stack.push(id);
        }
        self.order = ids;
    }

    pub fn get(&self, id: CommandId) -> Option<&Command> {
        self.arena.get(id.0)
    }

    pub fn by_anchor(&self, anchor: &str) -> Option<CommandId> {
        self.by_anchor.get(anchor).copied()
    }

    pub fn roots(&self) -> &[CommandId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// All commands in document order.
    pub fn iter(&self) -> impl Iterator<Item = (CommandId, &Command)> {
        self.order
            .iter()
            .filter_map(move |&id| self.arena.get(id.0).map(|c| (id, c)))
    }

    /// Sets the done flag. It is never cleared for a surviving command.
    pub fn mark_done(&mut self, id: CommandId) {
        if let Some(cmd) = self.arena.get_mut(id.0) {
            cmd.done = true;
        }
    }

    pub fn set_visible(&mut self, id: CommandId, visible: bool) {
        if let Some(cmd) = self.arena.get_mut(id.0) {
            cmd.visible = visible;
        }
    }

    /// Removes the anchors of all done commands from the document and
    /// drops the commands. Returns how many were removed.
    pub fn remove_done(&mut self, doc: &mut dyn TextDocument) -> usize {
        let done: Vec<CommandId> = self
            .iter()
            .filter(|(_, c)| c.done)
            .map(|(id, _)| id)
            .collect();
        for id in &done {
            let anchor = self.arena[id.0].anchor.clone();
            if let Err(e) = doc.remove_anchor(&anchor) {
                trace!(anchor = %anchor, error = %e, "done command anchor already gone");
            }
            self.by_anchor.remove(&anchor);
            self.arena.remove(id.0);
        }
        if !done.is_empty() {
            self.rebuild_nesting();
        }
        done.len()
    }

    /// Depth-first rendering for listings, one command per line.
    pub fn outline(&self) -> Vec<(usize, CommandId)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, CommandId)> =
            self.roots.iter().rev().map(|&id| (0, id)).collect();
        while let Some((depth, id)) = stack.pop() {
            out.push((depth, id));
            if let Some(cmd) = self.arena.get(id.0) {
                for &child in cmd.children.iter().rev() {
                    stack.push((depth + 1, child));
                }
            }
        }
        out
    }
}

/// Parse an anchor name into its `WM` payload and command kind.
pub fn parse_command(anchor_name: &str) -> Result<(ConfigNode, CommandKind), ConfigError> {
    let text = command_payload(anchor_name).ok_or_else(|| ConfigError::Syntax {
        source_name: anchor_name.to_owned(),
        line: 1,
        message: "not a command anchor".to_owned(),
    })?;
    let root = parse(anchor_name, text)?;
    let wm = root.get("WM")?.clone();
    let kind = CommandKind::classify(&wm)?;
    Ok((wm, kind))
}

/// Anchor name of a fresh untransformed form field.
pub fn insert_form_value_anchor(id: &str) -> String {
    ConfigNode::with_children(
        "WM",
        vec![
            ConfigNode::pair("CMD", "insertFormValue"),
            ConfigNode::pair("ID", id),
        ],
    )
    .to_conf_string()
}

/// Master name binding user fields to the transformation `function`.
pub fn user_field_master(function: &str) -> String {
    ConfigNode::with_children("WM", vec![ConfigNode::pair("FUNCTION", function)]).to_conf_string()
}

/// The transformation a user field master of the form `WM(FUNCTION 'name')`
/// binds, or `None` for masters this model does not interpret.
pub fn user_field_function(master: &str) -> Option<String> {
    let payload = command_payload(master)?;
    let conf = parse("master", payload).ok()?;
    match conf.query("FUNCTION").as_slice() {
        [single] => Some(single.value()),
        _ => None,
    }
}
