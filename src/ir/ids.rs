//! Newtype class identifier.
//!
//! Class ids are the only link between an annotation and the class
//! registry; keeping them in a newtype stops vertex indices or list
//! positions from being passed where a class is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-negative class identifier, as written in the first field of a
/// label line.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClassId(pub u32);

impl ClassId {
    /// Creates a new ClassId.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying u32 value.
    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ClassId {
    fn from(id: u32) -> Self {
        ClassId::new(id)
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_equality_and_ordering() {
        assert_eq!(ClassId(1), ClassId(1));
        assert_ne!(ClassId(1), ClassId(2));
        assert!(ClassId(10) > ClassId(5));
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&ClassId(3)).unwrap();
        assert_eq!(json, "3");
    }
}
