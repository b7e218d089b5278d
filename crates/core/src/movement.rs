//! Stock movement kinds and their quantity arithmetic.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Kind of a stock movement.
///
/// The stored quantity of a movement is a *magnitude* for `Entry`/`Exit` and
/// an already-signed difference for `Count` (counted minus previous stock).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Stock received into the warehouse.
    Entry,
    /// Stock issued out of the warehouse.
    Exit,
    /// Physical count correcting the stock level.
    Count,
}

impl MovementKind {
    /// Stable storage name (database column value).
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "entry",
            MovementKind::Exit => "exit",
            MovementKind::Count => "count",
        }
    }

    /// Label used in payloads sent to the remote platform.
    pub fn remote_label(&self) -> &'static str {
        match self {
            MovementKind::Entry => "added",
            MovementKind::Exit => "removed",
            MovementKind::Count => "count",
        }
    }

    /// Signed effect of a movement with the given stored quantity on the
    /// owning part.
    pub fn signed_delta(&self, quantity: i64) -> i64 {
        match self {
            MovementKind::Entry => quantity,
            MovementKind::Exit => -quantity,
            MovementKind::Count => quantity,
        }
    }

    /// Quantity adjustment that exactly undoes this movement.
    ///
    /// Deleting a movement must reverse its original effect regardless of
    /// what happened to the part since.
    pub fn reversal_delta(&self, quantity: i64) -> i64 {
        -self.signed_delta(quantity)
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(MovementKind::Entry),
            "exit" => Ok(MovementKind::Exit),
            "count" => Ok(MovementKind::Count),
            other => Err(DomainError::invalid_id(format!(
                "MovementKind: unknown kind '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_delta_matches_kind() {
        assert_eq!(MovementKind::Entry.signed_delta(10), 10);
        assert_eq!(MovementKind::Exit.signed_delta(10), -10);
        assert_eq!(MovementKind::Count.signed_delta(-4), -4);
    }

    #[test]
    fn reversal_undoes_signed_delta() {
        for kind in [MovementKind::Entry, MovementKind::Exit, MovementKind::Count] {
            for qty in [-7i64, 0, 3, 25] {
                assert_eq!(kind.signed_delta(qty) + kind.reversal_delta(qty), 0);
            }
        }
    }

    #[test]
    fn kind_round_trips_through_storage_name() {
        for kind in [MovementKind::Entry, MovementKind::Exit, MovementKind::Count] {
            assert_eq!(kind.as_str().parse::<MovementKind>().unwrap(), kind);
        }
    }
}
