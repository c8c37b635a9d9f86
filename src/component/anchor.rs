//! Render-target resolution: `placement@target` anchor specs.
//!
//! An anchor names where a component's content goes. Either half may be
//! omitted; the placement defaults to `beforeend` (after existing content)
//! and the target to `self`. The `self` and `parent` targets render in place,
//! so they carry no placement.

use std::fmt;

use crate::dom::{Dom, NodeId, Placement, Selector, SelectorError};

/// Errors from parsing an anchor attribute.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnchorError {
    #[error("unknown placement '{0}'")]
    UnknownPlacement(String),
    #[error("invalid anchor target '{target}': {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: SelectorError,
    },
}

/// Errors from resolving a parsed anchor against the tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("anchor target '{0}' matched no node")]
    NoMatch(String),
    #[error("instance node {0:?} has no parent to render into")]
    NoParent(NodeId),
    #[error("instance node {0:?} is not in the tree")]
    Detached(NodeId),
}

/// The target half of an anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorTarget {
    SelfNode,
    Parent,
    Locator(Selector),
}

impl fmt::Display for AnchorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfNode => f.write_str("self"),
            Self::Parent => f.write_str("parent"),
            Self::Locator(selector) => write!(f, "{selector}"),
        }
    }
}

/// A parsed, normalized anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorSpec {
    /// `None` exactly when the target is `self` or `parent`.
    pub placement: Option<Placement>,
    pub target: AnchorTarget,
}

impl Default for AnchorSpec {
    fn default() -> Self {
        Self {
            placement: None,
            target: AnchorTarget::SelfNode,
        }
    }
}

/// The concrete mount location an anchor resolved to. Fixed for the
/// instance's lifetime once computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub node: NodeId,
    pub placement: Option<Placement>,
    /// The node is neither the instance nor its structural parent.
    pub is_proxy: bool,
}

impl AnchorSpec {
    /// Parse an anchor attribute value.
    ///
    /// A value without `@` is read as a placement when it is a placement
    /// keyword and as a target otherwise.
    pub fn parse(input: &str) -> Result<Self, AnchorError> {
        let input = input.trim();
        let (placement, target) = match input.split_once('@') {
            Some((placement, target)) => (placement.trim(), target.trim()),
            None if Placement::parse(input).is_some() => (input, ""),
            None => ("", input),
        };

        let target = match target.to_ascii_lowercase().as_str() {
            "" | "self" => AnchorTarget::SelfNode,
            "parent" => AnchorTarget::Parent,
            _ => AnchorTarget::Locator(Selector::parse(target).map_err(|source| {
                AnchorError::InvalidTarget {
                    target: target.to_owned(),
                    source,
                }
            })?),
        };

        let placement = match target {
            AnchorTarget::SelfNode | AnchorTarget::Parent => None,
            AnchorTarget::Locator(_) if placement.is_empty() => Some(Placement::BeforeEnd),
            AnchorTarget::Locator(_) => Some(
                Placement::parse(placement)
                    .ok_or_else(|| AnchorError::UnknownPlacement(placement.to_owned()))?,
            ),
        };

        Ok(Self { placement, target })
    }

    /// Resolve against the tree for the instance living at `instance`.
    ///
    /// Locators search from the document root and pierce isolated scopes.
    pub fn resolve(&self, dom: &Dom, instance: NodeId) -> Result<ResolvedTarget, ResolveError> {
        if !dom.contains(instance) {
            return Err(ResolveError::Detached(instance));
        }
        let parent = dom.parent(instance);
        let node = match &self.target {
            AnchorTarget::SelfNode => instance,
            AnchorTarget::Parent => parent.ok_or(ResolveError::NoParent(instance))?,
            AnchorTarget::Locator(selector) => dom
                .root()
                .and_then(|root| dom.query_selector(root, selector, true))
                .ok_or_else(|| ResolveError::NoMatch(selector.to_string()))?,
        };
        Ok(ResolvedTarget {
            node,
            placement: self.placement,
            is_proxy: node != instance && Some(node) != parent,
        })
    }

    /// Whether this anchor's locator would select `node`. `self`/`parent`
    /// anchors never select foreign nodes.
    pub fn selects(&self, dom: &Dom, node: NodeId) -> bool {
        match &self.target {
            AnchorTarget::Locator(selector) => {
                dom.root().and_then(|root| dom.query_selector(root, selector, true)) == Some(node)
            }
            _ => false,
        }
    }
}

impl fmt::Display for AnchorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.placement {
            Some(placement) => write!(f, "{}@{}", placement.as_str(), self.target),
            None => write!(f, "{}", self.target),
        }
    }
}
