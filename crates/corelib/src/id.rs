//! Ring identifiers.
//!
//! An [`Identifier`] is an N-bit position on a ring of 2^N points. Bits are
//! addressed least significant first and stored as a little-endian byte
//! vector; bits above the width are always zero.
//!
//! Two relations are defined over identifiers:
//!
//! - [`Identifier::greater_than`]: plain magnitude order, no wraparound. Only
//!   used as a tie-break primitive.
//! - [`Identifier::is_between`]: membership in the clockwise arc that starts
//!   just after `a` and ends at `b`. Every routing decision goes through it.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::partitioner::{Partitioner, RawPartitioner, Sha256Partitioner};

/// Default identifier width in bits.
pub const DEFAULT_ID_BITS: usize = 32;

/// A fixed-width position on the ring.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    width: usize,
    bytes: Vec<u8>,
}

fn byte_len(width: usize) -> usize {
    (width + 7) / 8
}

impl Identifier {
    /// The all-zero identifier of the given width.
    pub fn zero(width: usize) -> Self {
        Self {
            width,
            bytes: vec![0; byte_len(width)],
        }
    }

    /// Read `bytes` least significant bit first, truncating or zero-padding
    /// to `width` bits.
    pub fn from_le_bytes(bytes: &[u8], width: usize) -> Self {
        let mut id = Self::zero(width);
        let n = id.bytes.len().min(bytes.len());
        id.bytes[..n].copy_from_slice(&bytes[..n]);
        id.mask();
        id
    }

    /// Hash an arbitrary string into the default-width ring.
    pub fn from_string(s: &str) -> Self {
        Sha256Partitioner::default().partition(s.as_bytes())
    }

    /// Hash an `address:port` pair into the default-width ring.
    pub fn from_address_and_port(host: &str, port: u16) -> Self {
        Sha256Partitioner::default().partition_address(host, port)
    }

    /// The `salt`-th placement of `key` on the default-width ring.
    pub fn salted(key: &str, salt: usize) -> Self {
        Sha256Partitioner::default().partition_salted(key, salt)
    }

    /// Build an identifier directly from raw bytes. Intended for tests, where
    /// ring positions are assigned by hand.
    pub fn from_bytes(b: &[u8]) -> Self {
        RawPartitioner::default().partition(b)
    }

    /// Width of this identifier in bits.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Little-endian backing bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Value of bit `index` (0 is least significant). Out of range reads as unset.
    pub fn bit(&self, index: usize) -> bool {
        if index >= self.width {
            return false;
        }
        self.bytes
            .get(index / 8)
            .map_or(false, |b| b & (1 << (index % 8)) != 0)
    }

    fn set_bit(&mut self, index: usize, value: bool) {
        let mask = 1u8 << (index % 8);
        if value {
            self.bytes[index / 8] |= mask;
        } else {
            self.bytes[index / 8] &= !mask;
        }
    }

    fn mask(&mut self) {
        let spare = self.bytes.len() * 8 - self.width;
        if spare > 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= 0xff >> spare;
            }
        }
    }

    /// Reject identifiers that do not belong to a `width`-bit ring, or whose
    /// encoding is malformed (as can happen with values decoded off the wire).
    pub fn check_width(&self, width: usize) -> Result<()> {
        if self.width != width {
            return Err(Error::InvalidArgument(format!(
                "identifier has {} bits, ring uses {}",
                self.width, width
            )));
        }
        if self.bytes.len() != byte_len(width) {
            return Err(Error::InvalidArgument(format!(
                "identifier carries {} bytes for {} bits",
                self.bytes.len(),
                width
            )));
        }
        let mut masked = self.clone();
        masked.mask();
        if masked.bytes != self.bytes {
            return Err(Error::InvalidArgument(
                "identifier has bits set above its width".into(),
            ));
        }
        Ok(())
    }

    /// Strict magnitude comparison. Ties are `false`.
    pub fn greater_than(&self, other: &Identifier) -> bool {
        debug_assert_eq!(self.width, other.width, "mixed identifier widths");
        self.magnitude_cmp(other) == Ordering::Greater
    }

    fn magnitude_cmp(&self, other: &Identifier) -> Ordering {
        let len = self.bytes.len().max(other.bytes.len());
        for i in (0..len).rev() {
            let a = self.bytes.get(i).copied().unwrap_or(0);
            let b = other.bytes.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }

    /// Whether `self` lies on the clockwise arc from `a` (exclusive) to `b`
    /// (inclusive iff `end_inclusive`).
    ///
    /// `self == a` is never between; `self == b` answers `end_inclusive`. If
    /// `b > a` the arc does not wrap and this is `a < self < b`, otherwise it
    /// wraps through zero and this is `self > a || self < b`.
    pub fn is_between(&self, a: &Identifier, b: &Identifier, end_inclusive: bool) -> bool {
        if self == a {
            return false;
        }
        if self == b {
            return end_inclusive;
        }
        if b.greater_than(a) {
            self.greater_than(a) && b.greater_than(self)
        } else {
            self.greater_than(a) || b.greater_than(self)
        }
    }

    /// The identifier `self + 2^row (mod 2^N)`, the target of finger table
    /// row `row`.
    ///
    /// Ripple carry from bit `row`: clear the run of set bits, then set the
    /// first unset bit. A carry out of the top bit wraps around the ring.
    pub fn finger_target(&self, row: usize) -> Identifier {
        let mut next = self.clone();
        let mut index = row;
        while index < self.width && self.bit(index) {
            next.set_bit(index, false);
            index += 1;
        }
        if index < self.width {
            next.set_bit(index, true);
        }
        next
    }

    /// Binary digits, least significant first, up to the highest set bit.
    pub fn display(&self) -> String {
        let last = (0..self.width).rev().find(|&i| self.bit(i)).unwrap_or(0);
        (0..=last)
            .map(|i| if self.bit(i) { '1' } else { '0' })
            .collect()
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.width
            .cmp(&other.width)
            .then_with(|| self.magnitude_cmp(other))
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.display())
    }
}
