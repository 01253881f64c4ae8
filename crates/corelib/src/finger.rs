//! Finger table of the Chord ring.

use crate::node::NodeAddress;

/// Routing table of one node.
///
/// Row `i` should point at the successor of `owner + 2^i`; row 0 is the
/// immediate successor. The table itself does no locking, owners wrap it in
/// a mutex.
#[derive(Clone, Debug)]
pub struct FingerTable {
    owner: NodeAddress,
    finger: Vec<NodeAddress>,
    fix_finger_index: usize,
}

impl FingerTable {
    /// A table with every row pointing back at `owner`.
    pub fn new(owner: NodeAddress) -> Self {
        Self::with_entries(owner, Vec::new())
    }

    /// A table seeded with `given` rows; rows past the end of `given` point
    /// at `owner`. Extra entries beyond the ring width are ignored.
    pub fn with_entries(owner: NodeAddress, given: Vec<NodeAddress>) -> Self {
        let size = owner.id.width();
        let mut finger: Vec<NodeAddress> = given.into_iter().take(size).collect();
        finger.resize(size, owner.clone());
        Self {
            owner,
            finger,
            fix_finger_index: 0,
        }
    }

    pub fn owner(&self) -> &NodeAddress {
        &self.owner
    }

    /// Number of rows, equal to the identifier width.
    pub fn len(&self) -> usize {
        self.finger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finger.is_empty()
    }

    /// Row 0.
    pub fn successor(&self) -> &NodeAddress {
        &self.finger[0]
    }

    /// getter
    pub fn get(&self, row: usize) -> Option<&NodeAddress> {
        self.finger.get(row)
    }

    /// setter; rows out of range are ignored
    pub fn set(&mut self, row: usize, addr: NodeAddress) {
        if let Some(slot) = self.finger.get_mut(row) {
            *slot = addr;
        }
    }

    /// Advance the repair cursor and return the row to fix next.
    ///
    /// Cycles through `1..len`, never returning row 0: the successor is
    /// maintained by stabilization instead.
    pub fn next_fix_row(&mut self) -> usize {
        if self.finger.len() < 2 {
            return 0;
        }
        self.fix_finger_index = (self.fix_finger_index + 1) % self.finger.len();
        if self.fix_finger_index == 0 {
            self.fix_finger_index = 1;
        }
        self.fix_finger_index
    }

    pub fn list(&self) -> &[NodeAddress] {
        &self.finger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Identifier;

    fn addr(port: u16, b: u8) -> NodeAddress {
        NodeAddress::new("localhost", port, Identifier::from_le_bytes(&[b], 8))
    }

    #[test]
    fn test_defaults_to_owner() {
        let owner = addr(1, 1);
        let table = FingerTable::with_entries(owner.clone(), vec![addr(2, 5)]);
        assert_eq!(table.len(), 8);
        assert_eq!(table.successor(), &addr(2, 5));
        for row in 1..8 {
            assert_eq!(table.get(row), Some(&owner));
        }
        assert_eq!(table.get(8), None);
    }

    #[test]
    fn test_fix_cursor_skips_successor_row() {
        let mut table = FingerTable::new(addr(1, 1));
        let rows: Vec<usize> = (0..16).map(|_| table.next_fix_row()).collect();
        assert_eq!(&rows[..8], &[1, 2, 3, 4, 5, 6, 7, 1]);
        assert!(!rows.contains(&0));
    }
}
