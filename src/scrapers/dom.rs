//! Typed queries over a parsed HTML tree.
//!
//! Every lookup returns an `Option`, so each extraction step has to say what
//! happens when the node is missing. Tag and class comparisons are ASCII
//! case-insensitive.

use crate::utils::collapse_whitespace;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag and/or class an element must carry. An empty matcher matches any element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Matcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

impl Matcher {
    pub fn tag(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            class: None,
        }
    }

    pub fn class(class: &str) -> Self {
        Self {
            tag: None,
            class: Some(class.to_string()),
        }
    }

    pub fn tag_and_class(tag: &str, class: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            class: Some(class.to_string()),
        }
    }

    pub fn matches(&self, node: Node<'_>) -> bool {
        self.tag.as_deref().is_none_or(|t| node.is_tag(t))
            && self.class.as_deref().is_none_or(|c| node.has_class(c))
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.tag, &self.class) {
            (Some(t), Some(c)) => write!(f, "{t}.{c}"),
            (Some(t), None) => write!(f, "{t}"),
            (None, Some(c)) => write!(f, ".{c}"),
            (None, None) => write!(f, "*"),
        }
    }
}

/// An element in a parsed document.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a>(ElementRef<'a>);

impl<'a> Node<'a> {
    /// The `<html>` element of a parsed document or fragment.
    pub fn root(doc: &'a Html) -> Self {
        Node(doc.root_element())
    }

    pub fn tag_name(&self) -> &'a str {
        self.0.value().name()
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name().eq_ignore_ascii_case(tag)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.0
            .value()
            .classes()
            .any(|c| c.eq_ignore_ascii_case(class))
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }

    /// Text content with whitespace collapsed.
    pub fn text(&self) -> String {
        collapse_whitespace(&self.raw_text())
    }

    /// Text content exactly as stored in the tree.
    pub fn raw_text(&self) -> String {
        self.0.text().collect()
    }

    pub fn same_node(&self, other: &Node<'_>) -> bool {
        self.0.id() == other.0.id()
    }

    /// Direct element children, in document order.
    pub fn children(self) -> impl Iterator<Item = Node<'a>> {
        self.0.children().filter_map(ElementRef::wrap).map(Node)
    }

    /// All element descendants (excluding `self`), in document order.
    pub fn descendants(self) -> impl Iterator<Item = Node<'a>> {
        self.0
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .map(Node)
    }

    pub fn first_child_of_tag(self, tag: &str) -> Option<Node<'a>> {
        self.children().find(|n| n.is_tag(tag))
    }

    pub fn first_descendant_of_tag(self, tag: &str) -> Option<Node<'a>> {
        self.descendants().find(|n| n.is_tag(tag))
    }

    pub fn first_descendant_with_class(self, class: &str) -> Option<Node<'a>> {
        self.descendants().find(|n| n.has_class(class))
    }

    pub fn first_descendant_matching(self, matcher: &Matcher) -> Option<Node<'a>> {
        self.descendants().find(|n| matcher.matches(*n))
    }

    /// First descendant whose tag is any of `tags`, in document order.
    pub fn first_descendant_in(self, tags: &[String]) -> Option<Node<'a>> {
        self.descendants()
            .find(|n| tags.iter().any(|t| n.is_tag(t)))
    }

    pub fn descendants_of_tag(self, tag: &str) -> impl Iterator<Item = Node<'a>> {
        self.descendants().filter(move |n| n.is_tag(tag))
    }

    pub fn descendants_matching(self, matcher: &Matcher) -> impl Iterator<Item = Node<'a>> {
        self.descendants().filter(move |n| matcher.matches(*n))
    }
}

/// Reduce a markup fragment to plain text, decoding entities.
pub fn fragment_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    Node::root(&fragment).text()
}
