use crate::instance::InstanceId;

/// Output of a render body, handed unchanged to [`Host::commit`](crate::Host::commit).
///
/// The runtime only inspects [`Element::Child`] placeholders; everything else
/// is opaque host markup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Element {
    #[default]
    Empty,
    Text(String),
    Node {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<Element>,
    },
    /// Output of a child instance, committed separately.
    Child(InstanceId),
    Fragment(Vec<Element>),
}

impl Element {
    pub fn text(value: impl Into<String>) -> Self {
        Element::Text(value.into())
    }

    pub fn node(tag: impl Into<String>) -> Self {
        Element::Node {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn fragment(children: impl IntoIterator<Item = Element>) -> Self {
        Element::Fragment(children.into_iter().collect())
    }

    /// Adds an attribute; no-op on anything but [`Element::Node`].
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Element::Node { attrs, .. } = &mut self {
            attrs.push((name.into(), value.into()));
        }
        self
    }

    /// Appends a child; no-op on anything but [`Element::Node`] and [`Element::Fragment`].
    pub fn child(mut self, child: Element) -> Self {
        match &mut self {
            Element::Node { children, .. } | Element::Fragment(children) => children.push(child),
            _ => {}
        }
        self
    }

    pub fn children(self, children: impl IntoIterator<Item = Element>) -> Self {
        children.into_iter().fold(self, Element::child)
    }

    /// Child instances referenced by this output, in document order.
    pub fn child_instances(&self) -> Vec<InstanceId> {
        let mut out = Vec::new();
        self.collect_children(&mut out);
        out
    }

    fn collect_children(&self, out: &mut Vec<InstanceId>) {
        match self {
            Element::Child(id) => out.push(*id),
            Element::Node { children, .. } | Element::Fragment(children) => {
                for child in children {
                    child.collect_children(out);
                }
            }
            Element::Empty | Element::Text(_) => {}
        }
    }

    /// Concatenated text of this element, skipping child instances.
    pub fn text_content(&self) -> String {
        match self {
            Element::Text(text) => text.clone(),
            Element::Node { children, .. } | Element::Fragment(children) => {
                children.iter().map(Element::text_content).collect()
            }
            Element::Empty | Element::Child(_) => String::new(),
        }
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Element::text(value)
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Element::Text(value)
    }
}
