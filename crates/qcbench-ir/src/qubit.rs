//! Qubit, classical bit and register types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a qubit within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl QubitId {
    /// The qubit index as `usize`, for bit-mask arithmetic.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

/// Index of a classical bit within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClbitId(pub u32);

impl ClbitId {
    /// The bit index as `usize`.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClbitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<u32> for ClbitId {
    fn from(id: u32) -> Self {
        ClbitId(id)
    }
}

/// A named, contiguous block of qubits or classical bits.
///
/// Registers are laid out back to back in declaration order, so the bit
/// `name[i]` has the flat index `offset + i`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Register {
    /// Register name as declared.
    pub name: String,
    /// Number of bits.
    pub size: u32,
    /// Flat index of the first bit.
    pub offset: u32,
}

impl Register {
    /// Create a register.
    pub fn new(name: impl Into<String>, size: u32, offset: u32) -> Self {
        Self {
            name: name.into(),
            size,
            offset,
        }
    }

    /// Flat index of element `i`, if it is in range.
    pub fn bit(&self, i: u32) -> Option<u32> {
        (i < self.size).then(|| self.offset + i)
    }

    /// Check whether a flat index belongs to this register.
    pub fn contains(&self, flat: u32) -> bool {
        flat >= self.offset && flat < self.offset + self.size
    }

    /// Iterate the flat indices of this register.
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.offset..self.offset + self.size
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.size)
    }
}
