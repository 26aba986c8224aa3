use std::fmt;

use crate::primitives::Primitive;

/// Index into the cell arena. This is the GC handle: compaction renumbers
/// these, so a CellId is only meaningful against the arena that issued it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(pub u32);

/// The fundamental expression value. 8 bytes: discriminant + payload.
/// Copy semantics — atom text and pair slots live in the arena.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// The unique empty list. Not arena-resident; compared by identity.
    Nil,
    /// An immutable text leaf. Numeral atoms self-evaluate; all others
    /// are symbols. Atoms are never interned: two equal-content atoms
    /// made independently are distinct cells.
    Atom(CellId),
    /// A two-slot cell (car/cdr).
    Pair(CellId),
    /// A built-in procedure. Immortal — never swept.
    Primitive(Primitive),
}

impl Value {
    pub fn is_nil(self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_atom(self) -> bool {
        matches!(self, Value::Atom(_))
    }

    pub fn is_pair(self) -> bool {
        matches!(self, Value::Pair(_))
    }

    pub fn is_primitive(self) -> bool {
        matches!(self, Value::Primitive(_))
    }

    pub fn as_atom(self) -> Option<CellId> {
        match self {
            Value::Atom(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_pair(self) -> Option<CellId> {
        match self {
            Value::Pair(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Atom(id) => write!(f, "Atom({})", id.0),
            Value::Pair(id) => write!(f, "Pair({})", id.0),
            Value::Primitive(p) => write!(f, "Primitive({})", p.name()),
        }
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellId({})", self.0)
    }
}
