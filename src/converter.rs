//! Converters: one CSS selector bound to one action
//!
//! The variant set is closed. Each variant decides how many times its action
//! runs from the number of nodes its selector matches under the root.

use std::fmt;

use scraper::Selector;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::node::Node;

type NodeAction<V> = Box<dyn Fn(Option<Node<'_>>, &mut V) + Send + Sync>;
type MatchAction<V> = Box<dyn Fn(Node<'_>, &mut V) + Send + Sync>;
type SelectionAction<V> = Box<dyn Fn(&[Node<'_>], &mut V) + Send + Sync>;

/// Match cardinality of a converter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Act on the first match only; the action also runs when nothing matches
    FirstOnly,
    /// Act once per match; nothing runs when nothing matches
    All,
}

pub(crate) enum ConverterKind<V> {
    Scalar {
        policy: MatchPolicy,
        action: NodeAction<V>,
    },
    /// Every match handed over at once
    WholeSelection(SelectionAction<V>),
    /// Per-node transform composed with a merge into the target
    Collection(SelectionAction<V>),
    /// Key/value extraction composed with a merge into the target
    Map(SelectionAction<V>),
    Nested {
        policy: MatchPolicy,
        action: MatchAction<V>,
    },
}

impl<V> ConverterKind<V> {
    pub(crate) fn scalar<F>(policy: MatchPolicy, action: F) -> Self
    where
        F: Fn(Option<Node<'_>>, &mut V) + Send + Sync + 'static,
    {
        Self::Scalar {
            policy,
            action: Box::new(action),
        }
    }

    pub(crate) fn whole_selection<F>(action: F) -> Self
    where
        F: Fn(&[Node<'_>], &mut V) + Send + Sync + 'static,
    {
        Self::WholeSelection(Box::new(action))
    }

    pub(crate) fn collection<F>(action: F) -> Self
    where
        F: Fn(&[Node<'_>], &mut V) + Send + Sync + 'static,
    {
        Self::Collection(Box::new(action))
    }

    pub(crate) fn map<F>(action: F) -> Self
    where
        F: Fn(&[Node<'_>], &mut V) + Send + Sync + 'static,
    {
        Self::Map(Box::new(action))
    }

    pub(crate) fn nested<F>(policy: MatchPolicy, action: F) -> Self
    where
        F: Fn(Node<'_>, &mut V) + Send + Sync + 'static,
    {
        Self::Nested {
            policy,
            action: Box::new(action),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Scalar { .. } => "scalar",
            Self::WholeSelection(_) => "whole_selection",
            Self::Collection(_) => "collection",
            Self::Map(_) => "map",
            Self::Nested { .. } => "nested",
        }
    }
}

/// A single extraction rule. Immutable once built.
pub struct Converter<V> {
    css: String,
    /// `None` for an empty selector
    selector: Option<Selector>,
    kind: ConverterKind<V>,
}

impl<V> Converter<V> {
    pub(crate) fn new(css: &str, kind: ConverterKind<V>) -> Result<Self> {
        let trimmed = css.trim();
        let selector = if trimmed.is_empty() {
            warn!(converter = kind.name(), "converter registered with an empty selector");
            None
        } else {
            let selector =
                Selector::parse(trimmed).map_err(|e| Error::invalid_selector(css, e))?;
            Some(selector)
        };

        Ok(Self {
            css: css.to_string(),
            selector,
            kind,
        })
    }

    /// Selector source as registered
    pub fn selector(&self) -> &str {
        &self.css
    }

    pub fn policy(&self) -> MatchPolicy {
        match &self.kind {
            ConverterKind::Scalar { policy, .. } | ConverterKind::Nested { policy, .. } => *policy,
            _ => MatchPolicy::All,
        }
    }

    /// Run this rule against `root`, writing into `instance`
    pub fn apply(&self, root: Node<'_>, instance: &mut V) {
        let Some(selector) = &self.selector else {
            debug!(converter = self.kind.name(), "empty selector, treating as no match");
            self.apply_unmatched(instance);
            return;
        };

        match &self.kind {
            ConverterKind::Scalar {
                policy: MatchPolicy::FirstOnly,
                action,
            } => action(root.select_first(selector), instance),
            ConverterKind::Scalar {
                policy: MatchPolicy::All,
                action,
            } => {
                for node in root.select(selector) {
                    action(Some(node), instance);
                }
            }
            ConverterKind::WholeSelection(action)
            | ConverterKind::Collection(action)
            | ConverterKind::Map(action) => {
                let nodes: Vec<Node<'_>> = root.select(selector).collect();
                action(&nodes, instance);
            }
            ConverterKind::Nested {
                policy: MatchPolicy::FirstOnly,
                action,
            } => {
                if let Some(node) = root.select_first(selector) {
                    action(node, instance);
                }
            }
            ConverterKind::Nested {
                policy: MatchPolicy::All,
                action,
            } => {
                for node in root.select(selector) {
                    action(node, instance);
                }
            }
        }
    }

    fn apply_unmatched(&self, instance: &mut V) {
        match &self.kind {
            ConverterKind::Scalar {
                policy: MatchPolicy::FirstOnly,
                action,
            } => action(None, instance),
            ConverterKind::WholeSelection(action)
            | ConverterKind::Collection(action)
            | ConverterKind::Map(action) => action(&[], instance),
            ConverterKind::Scalar { .. } | ConverterKind::Nested { .. } => {}
        }
    }
}

impl<V> fmt::Debug for Converter<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("selector", &self.css)
            .field("kind", &self.kind.name())
            .field("policy", &self.policy())
            .finish()
    }
}
