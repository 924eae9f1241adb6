//! Statement positions and the rotations used to key them.
//!
//! A single-unknown permutation `p` names the rotation `(p, p+1, p+2) mod 3`:
//! the unknown position first, then the two positions that form the lookup
//! key, in that order.
//!
//! | permutation | unknown   | key (M, N)            |
//! |-------------|-----------|-----------------------|
//! | `Subject`   | subject   | (predicate, object)   |
//! | `Predicate` | predicate | (object, subject)     |
//! | `Object`    | object    | (subject, predicate)  |
//!
//! The three pair permutations tag a variable repeated in two positions; the
//! remaining position is the one constant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute position within a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Subject = 0,
    Predicate = 1,
    Object = 2,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::Subject, Position::Predicate, Position::Object];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(i: usize) -> Self {
        match i % 3 {
            0 => Position::Subject,
            1 => Position::Predicate,
            _ => Position::Object,
        }
    }

    /// The position `k` steps further along the rotation.
    pub const fn rotate(self, k: usize) -> Self {
        Self::from_index(self.index() + k)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Position::Subject => "subject",
            Position::Predicate => "predicate",
            Position::Object => "object",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permutation {
    Subject = 0,
    Predicate = 1,
    Object = 2,
    SubjectPredicate = 3,
    PredicateObject = 4,
    ObjectSubject = 5,
    Constant = 6,
}

impl Permutation {
    /// Permutation whose unknown sits at `position`.
    pub const fn single(position: Position) -> Self {
        match position {
            Position::Subject => Permutation::Subject,
            Position::Predicate => Permutation::Predicate,
            Position::Object => Permutation::Object,
        }
    }

    /// Pair permutation for a variable repeated at `a` and `b`.
    ///
    /// Returns `None` when `a == b`.
    pub fn pair(a: Position, b: Position) -> Option<Self> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        match (lo, hi) {
            (Position::Subject, Position::Predicate) => Some(Permutation::SubjectPredicate),
            (Position::Predicate, Position::Object) => Some(Permutation::PredicateObject),
            (Position::Subject, Position::Object) => Some(Permutation::ObjectSubject),
            _ => None,
        }
    }

    /// Position of the unknown, for the three single-unknown permutations.
    pub const fn unknown(self) -> Option<Position> {
        match self {
            Permutation::Subject => Some(Position::Subject),
            Permutation::Predicate => Some(Position::Predicate),
            Permutation::Object => Some(Position::Object),
            _ => None,
        }
    }

    /// Absolute positions of the two key slots `(M, N)`.
    pub const fn key_positions(self) -> Option<(Position, Position)> {
        match self.unknown() {
            Some(u) => Some((u.rotate(1), u.rotate(2))),
            None => None,
        }
    }

    /// The constant position of a pair permutation.
    pub const fn constant_position(self) -> Option<Position> {
        match self {
            Permutation::SubjectPredicate => Some(Position::Object),
            Permutation::PredicateObject => Some(Position::Subject),
            Permutation::ObjectSubject => Some(Position::Predicate),
            _ => None,
        }
    }

    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Permutation::Subject => "S",
            Permutation::Predicate => "P",
            Permutation::Object => "O",
            Permutation::SubjectPredicate => "SP",
            Permutation::PredicateObject => "PO",
            Permutation::ObjectSubject => "OS",
            Permutation::Constant => "const",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotations_follow_the_table() {
        assert_eq!(
            Permutation::Subject.key_positions(),
            Some((Position::Predicate, Position::Object))
        );
        assert_eq!(
            Permutation::Predicate.key_positions(),
            Some((Position::Object, Position::Subject))
        );
        assert_eq!(
            Permutation::Object.key_positions(),
            Some((Position::Subject, Position::Predicate))
        );
        assert_eq!(Permutation::Constant.key_positions(), None);
    }

    #[test]
    fn pair_is_order_insensitive() {
        assert_eq!(
            Permutation::pair(Position::Object, Position::Subject),
            Some(Permutation::ObjectSubject)
        );
        assert_eq!(
            Permutation::pair(Position::Predicate, Position::Subject),
            Some(Permutation::SubjectPredicate)
        );
        assert_eq!(Permutation::pair(Position::Object, Position::Object), None);
        assert_eq!(
            Permutation::PredicateObject.constant_position(),
            Some(Position::Subject)
        );
    }
}
