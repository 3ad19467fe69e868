//! Reordering coordinator
//!
//! Repositions elements within one sibling set. A move is applied locally
//! right away, then one remote update is sent per element whose position
//! actually changed. Any failed update rolls the local ordering back to the
//! last committed one.

use crate::error::ReorderError;
use crate::remote::FormRemote;
use crate::state::{renumber, OrderedElement, SiblingSet};
use futures::future::join_all;
use tracing::{debug, info, warn};

pub struct ReorderCoordinator {
    siblings: SiblingSet,
    /// Last ordering known to match the server
    committed: Vec<OrderedElement>,
    /// Ordering shown locally, possibly ahead of `committed`
    current: Vec<OrderedElement>,
}

impl ReorderCoordinator {
    /// Elements are sorted by their sequence. The committed ordering keeps
    /// the server's sequences; the local one is renumbered densely, so gaps
    /// or duplicates on the server show up as changes on the next commit.
    pub fn new(siblings: SiblingSet, mut elements: Vec<OrderedElement>) -> Self {
        elements.sort_by_key(|e| e.order_sequence);
        let mut current = elements.clone();
        renumber(&mut current);
        Self {
            siblings,
            committed: elements,
            current,
        }
    }

    pub fn siblings(&self) -> &SiblingSet {
        &self.siblings
    }

    pub fn elements(&self) -> &[OrderedElement] {
        &self.current
    }

    pub fn committed(&self) -> &[OrderedElement] {
        &self.committed
    }

    pub fn position_of(&self, element_id: &str) -> Option<usize> {
        self.current.iter().position(|e| e.id == element_id)
    }

    /// Whether the local ordering is ahead of the server
    pub fn is_dirty(&self) -> bool {
        self.current != self.committed
    }

    /// Move an element to `new_index` locally, without contacting the server
    pub fn move_local(
        &mut self,
        element_id: &str,
        new_index: usize,
    ) -> Result<&[OrderedElement], ReorderError> {
        let from = self
            .position_of(element_id)
            .ok_or_else(|| ReorderError::UnknownElement(element_id.to_string()))?;
        if new_index >= self.current.len() {
            return Err(ReorderError::IndexOutOfRange {
                index: new_index,
                len: self.current.len(),
            });
        }

        let element = self.current.remove(from);
        self.current.insert(new_index, element);
        renumber(&mut self.current);
        Ok(&self.current)
    }

    /// Elements whose position differs from the committed ordering, carrying
    /// their new 1-based sequence
    pub fn changed_elements(&self) -> Vec<OrderedElement> {
        self.current
            .iter()
            .filter(|element| {
                self.committed
                    .iter()
                    .find(|c| c.id == element.id)
                    .map_or(true, |c| c.order_sequence != element.order_sequence)
            })
            .cloned()
            .collect()
    }

    /// Send the local ordering to the server. Updates for one gesture are
    /// issued concurrently; on any failure the local ordering reverts.
    pub async fn commit(&mut self, remote: &dyn FormRemote) -> Result<(), ReorderError> {
        let changed = self.changed_elements();
        if changed.is_empty() {
            debug!(parent = %self.siblings.parent_id, "Ordering unchanged, nothing to send");
            self.committed = self.current.clone();
            return Ok(());
        }

        debug!(
            parent = %self.siblings.parent_id,
            kind = ?self.siblings.kind,
            updates = changed.len(),
            "Sending reorder updates"
        );
        let siblings = &self.siblings;
        let results = join_all(changed.iter().map(|element| async move {
            remote
                .reorder_element(siblings, &element.id, element.order_sequence)
                .await
                .map_err(|cause| ReorderError::Network {
                    element_id: element.id.clone(),
                    cause,
                })
        }))
        .await;

        if let Some(err) = results.into_iter().find_map(Result::err) {
            warn!(parent = %self.siblings.parent_id, error = %err, "Reorder failed, rolling back");
            self.rollback();
            return Err(err);
        }

        info!(parent = %self.siblings.parent_id, updates = changed.len(), "Reorder committed");
        self.committed = self.current.clone();
        Ok(())
    }

    /// Move an element and commit the result
    pub async fn reorder(
        &mut self,
        remote: &dyn FormRemote,
        element_id: &str,
        new_index: usize,
    ) -> Result<Vec<OrderedElement>, ReorderError> {
        self.move_local(element_id, new_index)?;
        self.commit(remote).await?;
        Ok(self.current.clone())
    }

    /// Restore the last committed ordering
    pub fn rollback(&mut self) {
        self.current = self.committed.clone();
    }

    /// Register a newly created element at the end of the set
    pub fn push(&mut self, element_id: &str) -> OrderedElement {
        let next = self.committed.last().map_or(1, |e| e.order_sequence + 1);
        let element = OrderedElement::new(element_id, next);
        self.committed.push(element.clone());
        self.current
            .push(OrderedElement::new(element_id, self.current.len() as u32 + 1));
        element
    }

    /// Forget a deleted element; remaining siblings are renumbered densely.
    /// The server renumbers on its side, so no updates are sent.
    pub fn remove(&mut self, element_id: &str) -> Option<OrderedElement> {
        let removed = self
            .committed
            .iter()
            .position(|e| e.id == element_id)
            .map(|index| self.committed.remove(index));
        renumber(&mut self.committed);

        self.current.retain(|e| e.id != element_id);
        renumber(&mut self.current);
        removed
    }
}
