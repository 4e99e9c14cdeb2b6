//! Scoped composition of parameter overrides.
//!
//! Suites are described by pushing a frame when entering a group, emitting
//! cases, and popping the frame on the way out. [`create_case`] folds the
//! active frames into a [`Case`].

use super::baseline::baseline;
use super::case::Case;
use super::params::ParameterSet;

/// Separator between lineage labels in a case trace.
pub const TRACE_SEPARATOR: &str = " -> ";

/// One composition scope: a lineage label and the overrides it introduces.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub label: String,
    pub overrides: ParameterSet,
}

/// LIFO stack of composition frames.
#[derive(Debug, Clone, Default)]
pub struct CompositionStack {
    frames: Vec<Frame>,
}

impl CompositionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active composition scopes.
    pub fn size(&self) -> usize {
        self.frames.len()
    }

    /// Enter a scope. The stack takes ownership of `overrides`.
    pub fn push(&mut self, label: impl Into<String>, overrides: ParameterSet) {
        self.frames.push(Frame {
            label: label.into(),
            overrides,
        });
    }

    /// Leave the innermost scope. Returns `None` on an unbalanced pop.
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

/// Compose a case from every active frame plus its own label and overrides.
///
/// The baseline deck is overridden by frames outermost first and by
/// `overrides` last, so the closest scope wins. Blank labels are kept on the
/// stack but omitted from the trace.
pub fn create_case(
    stack: &CompositionStack,
    label: &str,
    overrides: ParameterSet,
    parallelism: Option<u32>,
) -> Case {
    let mut merged = baseline();
    for frame in stack.frames() {
        merged.apply(&frame.overrides);
    }
    merged.apply(&overrides);

    let trace = stack
        .frames()
        .iter()
        .map(|frame| frame.label.as_str())
        .chain(std::iter::once(label))
        .filter(|label| !label.trim().is_empty())
        .collect::<Vec<_>>()
        .join(TRACE_SEPARATOR);

    Case::new(trace, merged, parallelism)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::Scalar;
    use crate::params;

    #[test]
    fn push_pop_balances_size() {
        let mut stack = CompositionStack::new();
        assert_eq!(stack.size(), 0);

        stack.push("1D", params! { "m" => 299 });
        stack.push("", params! {});
        stack.push("   ", params! {});
        assert_eq!(stack.size(), 3);

        stack.pop();
        stack.pop();
        stack.pop();
        assert_eq!(stack.size(), 0);
        assert!(stack.pop().is_none());
    }

    #[test]
    fn pop_returns_most_recent_frame() {
        let mut stack = CompositionStack::new();
        stack.push("outer", params! { "a" => 1 });
        stack.push("inner", params! { "b" => 2 });

        let frame = stack.pop().expect("frame");
        assert_eq!(frame.label, "inner");
        assert_eq!(frame.overrides, params! { "b" => 2 });
        assert_eq!(stack.size(), 1);
    }

    #[test]
    fn closest_scope_wins() {
        let mut stack = CompositionStack::new();
        stack.push("suite", params! { "a" => 1, "b" => 1, "c" => 1 });
        stack.push("group", params! { "b" => 2, "c" => 2 });

        let case = create_case(&stack, "variant", params! { "c" => 3 }, None);
        assert_eq!(case.get("a").expect("a"), &Scalar::Int(1));
        assert_eq!(case.get("b").expect("b"), &Scalar::Int(2));
        assert_eq!(case.get("c").expect("c"), &Scalar::Int(3));
    }

    #[test]
    fn blank_labels_are_dropped_from_trace() {
        let mut stack = CompositionStack::new();
        stack.push("", params! {});
        stack.push("2D", params! {});
        stack.push(" \t", params! {});

        let case = create_case(&stack, "weno_order=3", params! {}, None);
        assert_eq!(case.trace(), "2D -> weno_order=3");
    }

    #[test]
    fn blank_case_label_keeps_ancestor_trace() {
        let mut stack = CompositionStack::new();
        stack.push("3D", params! {});
        let case = create_case(&stack, "", params! {}, None);
        assert_eq!(case.trace(), "3D");
    }

    #[test]
    fn pushed_overrides_are_snapshotted() {
        let mut stack = CompositionStack::new();
        let mut overrides = params! { "a" => 1 };
        stack.push("suite", overrides.clone());
        overrides.insert("a", 99);

        let case = create_case(&stack, "leaf", params! {}, None);
        assert_eq!(case.get("a").expect("a"), &Scalar::Int(1));
    }
}
