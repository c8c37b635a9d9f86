//! Node types: NodeId, NodeKind, NodeData.

use slotmap::new_key_type;

new_key_type! {
    /// Unique identifier for a DOM node. Copy, lightweight (u64).
    ///
    /// Keys of removed nodes never resolve again, which is how the runtime
    /// recognises a disposed node.
    pub struct NodeId;
}

/// What a node represents in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A regular element, possibly upgraded to a component.
    Element,
    /// The root of an isolated rendering scope attached to a host element.
    Scope,
    /// Opaque materialized template content.
    Content,
}

/// Data associated with a single DOM node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub kind: NodeKind,
    /// Tag name (e.g. "x-dialog", "div"). Matched by type selectors and used to
    /// look up component definitions.
    pub tag: String,
    /// Optional unique id (`#id` locator).
    pub id: Option<String>,
    /// Classes (for `.class` locators).
    pub classes: Vec<String>,
    /// Attributes other than `id` and `class`, in insertion order.
    pub attributes: Vec<(String, String)>,
    /// Opaque text payload. Set on content nodes and inline template holders.
    pub text: Option<String>,
    /// Whether this node is visible.
    pub visible: bool,
}

impl NodeData {
    /// Create an element with the given tag and sensible defaults.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Element,
            tag: tag.into(),
            id: None,
            classes: Vec::new(),
            attributes: Vec::new(),
            text: None,
            visible: true,
        }
    }

    /// Create the root node of an isolated scope.
    pub fn scope() -> Self {
        Self {
            kind: NodeKind::Scope,
            ..Self::new("#scope")
        }
    }

    /// Create a content node carrying an opaque template string.
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Content,
            text: Some(text.into()),
            ..Self::new("#content")
        }
    }

    /// Set the id (builder).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a single class (builder).
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if !self.classes.contains(&class) {
            self.classes.push(class);
        }
        self
    }

    /// Set an attribute (builder). `id` and `class` are routed to their fields.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(&name.into(), value.into());
        self
    }

    /// Set the text payload (builder).
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Check whether this node has a given class.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Read an attribute. `id` and `class` are answered from their fields.
    pub fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.clone(),
            "class" if !self.classes.is_empty() => Some(self.classes.join(" ")),
            "class" => None,
            _ => self
                .attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone()),
        }
    }

    /// Whether an attribute is present (boolean attributes have any value).
    pub fn has_attribute(&self, name: &str) -> bool {
        match name {
            "id" => self.id.is_some(),
            "class" => !self.classes.is_empty(),
            _ => self.attributes.iter().any(|(n, _)| n == name),
        }
    }

    /// Write an attribute and return the previous value.
    pub fn set_attribute(&mut self, name: &str, value: String) -> Option<String> {
        match name {
            "id" => self.id.replace(value),
            "class" => {
                let old = self.attribute("class");
                self.classes = value.split_whitespace().map(str::to_owned).collect();
                old
            }
            _ => match self.attributes.iter_mut().find(|(n, _)| n == name) {
                Some((_, slot)) => Some(std::mem::replace(slot, value)),
                None => {
                    self.attributes.push((name.to_owned(), value));
                    None
                }
            },
        }
    }

    /// Remove an attribute and return the previous value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.take(),
            "class" => {
                let old = self.attribute("class");
                self.classes.clear();
                old
            }
            _ => {
                let pos = self.attributes.iter().position(|(n, _)| n == name)?;
                Some(self.attributes.remove(pos).1)
            }
        }
    }
}
