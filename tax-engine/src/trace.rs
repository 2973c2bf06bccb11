//! Traced-value graph behind "explain this number".
//!
//! Every computed amount is recorded as a node with its value, a label and
//! the ids of the nodes it was computed from. Nodes can only reference
//! nodes that already exist, so the finished graph is acyclic by
//! construction. A [`TraceBuilder`] is created per computation and turned
//! into an immutable [`TraceGraph`] at the end; nothing is shared between
//! runs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::Money;

/// Dotted node path, e.g. `form1040.line11` or `form540.caAgi`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(
        source: &str,
        key: &str,
    ) -> Self {
        Self(format!("{source}.{key}"))
    }

    /// Node for a field of the `index`-th (zero-based) document of a kind,
    /// e.g. `w2.1.box1`. Document keys are one-based.
    pub fn document(
        source: &str,
        index: usize,
        field: &str,
    ) -> Self {
        Self(format!("{source}.{}.{field}", index + 1))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Segment before the first dot.
    pub fn source(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }
}

impl fmt::Display for NodeId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A form line: its amount and the node that explains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub amount: Money,
    pub trace_id: NodeId,
}

impl Line {
    pub fn id(&self) -> &NodeId {
        &self.trace_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracedValue {
    pub id: NodeId,
    pub value: Money,
    pub label: String,
    /// Direct inputs, in the order they were given.
    pub inputs: Vec<NodeId>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("node {node} references unknown input {input}")]
    UnknownInput { node: NodeId, input: NodeId },

    #[error("node {0} was recorded twice")]
    DuplicateNode(NodeId),
}

/// Accumulates nodes for one computation.
#[derive(Debug, Default)]
pub struct TraceBuilder {
    nodes: BTreeMap<NodeId, TracedValue>,
}

impl TraceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a computed value.
    ///
    /// # Errors
    ///
    /// [`TraceError::UnknownInput`] if an input has not been recorded yet,
    /// [`TraceError::DuplicateNode`] if `source.key` already exists.
    pub fn record<'a>(
        &mut self,
        source: &str,
        key: &str,
        value: Money,
        inputs: impl IntoIterator<Item = &'a NodeId>,
        label: impl Into<String>,
    ) -> Result<Line, TraceError> {
        let id = NodeId::new(source, key);
        if self.nodes.contains_key(&id) {
            return Err(TraceError::DuplicateNode(id));
        }

        let mut seen = BTreeSet::new();
        let mut input_ids = Vec::new();
        for input in inputs {
            if !self.nodes.contains_key(input) {
                return Err(TraceError::UnknownInput {
                    node: id,
                    input: input.clone(),
                });
            }
            if seen.insert(input) {
                input_ids.push(input.clone());
            }
        }

        self.nodes.insert(
            id.clone(),
            TracedValue {
                id: id.clone(),
                value,
                label: label.into(),
                inputs: input_ids,
            },
        );
        Ok(Line {
            amount: value,
            trace_id: id,
        })
    }

    /// Records a value taken straight from an input document.
    pub fn input(
        &mut self,
        source: &str,
        key: &str,
        value: Money,
        label: impl Into<String>,
    ) -> Result<Line, TraceError> {
        self.record(source, key, value, std::iter::empty::<&NodeId>(), label)
    }

    /// A view that records every node under `prefix`.
    pub fn scope<'b>(
        &'b mut self,
        prefix: &'b str,
    ) -> TraceScope<'b> {
        TraceScope {
            builder: self,
            prefix,
        }
    }

    pub fn contains(
        &self,
        id: &NodeId,
    ) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn finish(self) -> TraceGraph {
        TraceGraph { nodes: self.nodes }
    }
}

/// Records nodes under one fixed source prefix, e.g. `form540`.
///
/// Inputs may come from any prefix already in the builder.
#[derive(Debug)]
pub struct TraceScope<'b> {
    builder: &'b mut TraceBuilder,
    prefix: &'b str,
}

impl TraceScope<'_> {
    pub fn prefix(&self) -> &str {
        self.prefix
    }

    pub fn record<'a>(
        &mut self,
        key: &str,
        value: Money,
        inputs: impl IntoIterator<Item = &'a NodeId>,
        label: impl Into<String>,
    ) -> Result<Line, TraceError> {
        self.builder.record(self.prefix, key, value, inputs, label)
    }

    pub fn input(
        &mut self,
        key: &str,
        value: Money,
        label: impl Into<String>,
    ) -> Result<Line, TraceError> {
        self.builder.input(self.prefix, key, value, label)
    }

    /// Sum of `lines`, recorded as one node.
    pub fn sum<'a>(
        &mut self,
        key: &str,
        lines: impl IntoIterator<Item = &'a Line> + Clone,
        label: impl Into<String>,
    ) -> Result<Line, TraceError> {
        let total = lines.clone().into_iter().map(|line| line.amount).sum();
        self.record(key, total, lines.into_iter().map(Line::id), label)
    }

    pub fn contains(
        &self,
        key: &str,
    ) -> bool {
        self.builder.contains(&NodeId::new(self.prefix, key))
    }
}

/// One row of a derivation trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainStep<'g> {
    pub depth: usize,
    pub node: &'g TracedValue,
    /// The node was already expanded earlier in the trail.
    pub repeated: bool,
}

/// The finished, immutable graph of one computation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceGraph {
    nodes: BTreeMap<NodeId, TracedValue>,
}

impl TraceGraph {
    pub fn get(
        &self,
        id: &NodeId,
    ) -> Option<&TracedValue> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &TracedValue> {
        self.nodes.values()
    }

    /// Depth-first derivation trail rooted at `id`.
    ///
    /// A node reached a second time is listed with `repeated` set and is
    /// not expanded again.
    pub fn explain(
        &self,
        id: &NodeId,
    ) -> Option<Vec<ExplainStep<'_>>> {
        let root = self.nodes.get(id)?;
        let mut steps = Vec::new();
        let mut expanded = BTreeSet::new();
        let mut stack = vec![(root, 0)];

        while let Some((node, depth)) = stack.pop() {
            let repeated = !expanded.insert(&node.id);
            steps.push(ExplainStep {
                depth,
                node,
                repeated,
            });
            if repeated {
                continue;
            }
            for input in node.inputs.iter().rev() {
                if let Some(child) = self.nodes.get(input) {
                    stack.push((child, depth + 1));
                }
            }
        }
        Some(steps)
    }

    /// Every node `id` transitively depends on, excluding itself.
    pub fn upstream(
        &self,
        id: &NodeId,
    ) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut pending: Vec<&NodeId> = self
            .nodes
            .get(id)
            .map(|node| node.inputs.iter().collect())
            .unwrap_or_default();

        while let Some(next) = pending.pop() {
            if seen.insert(next.clone())
                && let Some(node) = self.nodes.get(next)
            {
                pending.extend(node.inputs.iter());
            }
        }
        seen
    }

    /// True when every input exists and no node depends on itself.
    pub fn is_acyclic(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: BTreeMap<&NodeId, Mark> = BTreeMap::new();
        for start in self.nodes.keys() {
            if marks.contains_key(start) {
                continue;
            }
            // (node, index of next input to visit)
            let mut stack = vec![(start, 0usize)];
            marks.insert(start, Mark::Visiting);

            while let Some((id, next_input)) = stack.pop() {
                let Some(node) = self.nodes.get(id) else {
                    return false;
                };
                match node.inputs.get(next_input) {
                    Some(input) => {
                        stack.push((id, next_input + 1));
                        match marks.get(input) {
                            Some(Mark::Visiting) => return false,
                            Some(Mark::Done) => {}
                            None => {
                                if !self.nodes.contains_key(input) {
                                    return false;
                                }
                                marks.insert(input, Mark::Visiting);
                                stack.push((input, 0));
                            }
                        }
                    }
                    None => {
                        marks.insert(id, Mark::Done);
                    }
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample() -> TraceGraph {
        let mut builder = TraceBuilder::new();
        let wages = builder
            .input("w2", "1.box1", Money::dollars(50_000), "Wages")
            .unwrap();
        let interest = builder
            .input("int", "1.box1", Money::dollars(100), "Interest")
            .unwrap();
        let mut form = builder.scope("form1040");
        let line1z = form
            .record("line1z", wages.amount, [wages.id()], "Total wages")
            .unwrap();
        form.sum("line9", [&line1z, &interest], "Total income")
            .unwrap();
        builder.finish()
    }

    // =========================================================================
    // TraceBuilder tests
    // =========================================================================

    #[test]
    fn record_rejects_unknown_input() {
        let mut builder = TraceBuilder::new();
        let missing = NodeId::from("w2.9.box1");

        let result = builder.record("form1040", "line1a", Money::ZERO, [&missing], "Wages");

        assert_eq!(
            result,
            Err(TraceError::UnknownInput {
                node: NodeId::from("form1040.line1a"),
                input: missing,
            })
        );
    }

    #[test]
    fn record_rejects_duplicate_node() {
        let mut builder = TraceBuilder::new();
        builder.input("w2", "1.box1", Money::ZERO, "Wages").unwrap();

        let result = builder.input("w2", "1.box1", Money::ZERO, "Wages");

        assert_eq!(result, Err(TraceError::DuplicateNode(NodeId::from("w2.1.box1"))));
    }

    #[test]
    fn repeated_inputs_are_kept_once() {
        let mut builder = TraceBuilder::new();
        let a = builder.input("x", "a", Money::dollars(1), "A").unwrap();

        builder.record("x", "b", Money::dollars(2), [a.id(), a.id()], "B").unwrap();

        let graph = builder.finish();
        assert_eq!(graph.get(&NodeId::from("x.b")).unwrap().inputs, vec![a.trace_id]);
    }

    #[test]
    fn scope_sum_records_total_and_inputs() {
        let graph = sample();

        let line9 = graph.get(&NodeId::from("form1040.line9")).unwrap();

        assert_eq!(line9.value, Money::dollars(50_100));
        assert_eq!(
            line9.inputs,
            vec![NodeId::from("form1040.line1z"), NodeId::from("int.1.box1")]
        );
    }

    // =========================================================================
    // TraceGraph tests
    // =========================================================================

    #[test]
    fn explain_walks_depth_first() {
        let graph = sample();

        let steps = graph.explain(&NodeId::from("form1040.line9")).unwrap();
        let trail: Vec<(usize, &str)> = steps
            .iter()
            .map(|step| (step.depth, step.node.id.as_str()))
            .collect();

        assert_eq!(
            trail,
            vec![
                (0, "form1040.line9"),
                (1, "form1040.line1z"),
                (2, "w2.1.box1"),
                (1, "int.1.box1"),
            ]
        );
    }

    #[test]
    fn explain_marks_shared_inputs_as_repeated() {
        let mut builder = TraceBuilder::new();
        let a = builder.input("x", "a", Money::dollars(1), "A").unwrap();
        let b = builder.record("x", "b", a.amount, [a.id()], "B").unwrap();
        builder
            .record("x", "c", Money::dollars(2), [a.id(), b.id()], "C")
            .unwrap();
        let graph = builder.finish();

        let steps = graph.explain(&NodeId::from("x.c")).unwrap();
        let repeated: Vec<bool> = steps.iter().map(|step| step.repeated).collect();

        assert_eq!(repeated, vec![false, false, false, true]);
    }

    #[test]
    fn explain_unknown_node_is_none() {
        assert!(sample().explain(&NodeId::from("form1040.line99")).is_none());
    }

    #[test]
    fn upstream_collects_transitive_inputs() {
        let graph = sample();

        let upstream = graph.upstream(&NodeId::from("form1040.line9"));

        assert_eq!(
            upstream.into_iter().collect::<Vec<_>>(),
            vec![
                NodeId::from("form1040.line1z"),
                NodeId::from("int.1.box1"),
                NodeId::from("w2.1.box1"),
            ]
        );
    }

    #[test]
    fn built_graph_is_acyclic() {
        assert!(sample().is_acyclic());
    }

    #[test]
    fn hand_built_cycle_is_detected() {
        let node = |id: &str, inputs: &[&str]| TracedValue {
            id: NodeId::from(id),
            value: Money::ZERO,
            label: String::new(),
            inputs: inputs.iter().map(|input| NodeId::from(*input)).collect(),
        };
        let graph = TraceGraph {
            nodes: [node("x.a", &["x.b"]), node("x.b", &["x.a"])]
                .into_iter()
                .map(|n| (n.id.clone(), n))
                .collect(),
        };

        assert!(!graph.is_acyclic());
    }

    #[test]
    fn node_source_is_first_segment() {
        assert_eq!(NodeId::from("form540.caAgi").source(), "form540");
    }
}
