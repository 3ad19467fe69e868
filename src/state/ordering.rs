//! Ordered sibling elements

use serde::{Deserialize, Serialize};

/// Kind of element that can be reordered within its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Question,
    Section,
    Choice,
}

impl ElementKind {
    /// Path segment used by the form server
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Question => "questions",
            Self::Section => "sections",
            Self::Choice => "choices",
        }
    }
}

/// One sibling set: questions or sections under a form, or choices under a question
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiblingSet {
    pub kind: ElementKind,
    pub parent_id: String,
}

impl SiblingSet {
    pub fn new(kind: ElementKind, parent_id: &str) -> Self {
        Self {
            kind,
            parent_id: parent_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedElement {
    pub id: String,
    /// 1-based, dense within the sibling set
    pub order_sequence: u32,
}

impl OrderedElement {
    pub fn new(id: &str, order_sequence: u32) -> Self {
        Self {
            id: id.to_string(),
            order_sequence,
        }
    }
}

/// Renumbers elements 1..N by their position
pub fn renumber(elements: &mut [OrderedElement]) {
    for (index, element) in elements.iter_mut().enumerate() {
        element.order_sequence = index as u32 + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renumber_is_dense() {
        let mut elements = vec![
            OrderedElement::new("a", 4),
            OrderedElement::new("b", 9),
            OrderedElement::new("c", 2),
        ];
        renumber(&mut elements);
        let seqs: Vec<_> = elements.iter().map(|e| e.order_sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(ElementKind::Question.collection(), "questions");
        assert_eq!(ElementKind::Section.collection(), "sections");
        assert_eq!(ElementKind::Choice.collection(), "choices");
    }
}
