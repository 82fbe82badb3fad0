//! Per-register busy-bit scoreboard (spec.md §4.1).
//!
//! A fixed-length array of `{free, busy}` entries, one per register file
//! (8 scalar, 8 vector). A bit is set while exactly one in-flight
//! instruction has that register as its destination, and cleared when
//! that instruction releases its functional unit.

use crate::error::{Result, SimError};
use crate::register::{RegFile, REGISTER_FILE_SIZE};

/// Busy-bit status of a single register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No in-flight instruction writes this register.
    Free,
    /// An in-flight instruction has this register as its destination.
    Busy,
}

/// The combined scalar and vector register-busy scoreboard.
#[derive(Debug, Clone)]
pub struct Scoreboard {
    scalar: [Status; REGISTER_FILE_SIZE],
    vector: [Status; REGISTER_FILE_SIZE],
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Scoreboard {
    /// Creates a scoreboard with every register free.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scalar: [Status::Free; REGISTER_FILE_SIZE],
            vector: [Status::Free; REGISTER_FILE_SIZE],
        }
    }

    fn file_mut(&mut self, file: RegFile) -> &mut [Status; REGISTER_FILE_SIZE] {
        match file {
            RegFile::Scalar => &mut self.scalar,
            RegFile::Vector => &mut self.vector,
        }
    }

    fn file(&self, file: RegFile) -> &[Status; REGISTER_FILE_SIZE] {
        match file {
            RegFile::Scalar => &self.scalar,
            RegFile::Vector => &self.vector,
        }
    }

    /// Marks register `index` in `file` as busy.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RegisterOutOfRange`] if `index` is out of
    /// bounds, or [`SimError::ScoreboardDoubleSet`] if the bit was already
    /// busy (an invariant violation — well-formed programs never hit
    /// this because the hazard check gates every bind).
    pub fn set_busy(&mut self, index: usize, file: RegFile) -> Result<()> {
        if index >= REGISTER_FILE_SIZE {
            return Err(SimError::RegisterOutOfRange {
                index,
                file: file.label(),
                size: REGISTER_FILE_SIZE,
            });
        }
        if self.file(file)[index] == Status::Busy {
            return Err(SimError::ScoreboardDoubleSet {
                file: file.label(),
                index,
            });
        }
        self.file_mut(file)[index] = Status::Busy;
        Ok(())
    }

    /// Clears the busy bit for register `index` in `file`. Clearing an
    /// already-free register is a no-op, matching the original busy-board
    /// semantics.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RegisterOutOfRange`] if `index` is out of
    /// bounds.
    pub fn clear(&mut self, index: usize, file: RegFile) -> Result<()> {
        if index >= REGISTER_FILE_SIZE {
            return Err(SimError::RegisterOutOfRange {
                index,
                file: file.label(),
                size: REGISTER_FILE_SIZE,
            });
        }
        self.file_mut(file)[index] = Status::Free;
        Ok(())
    }

    /// Reads the current status of register `index` in `file`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RegisterOutOfRange`] if `index` is out of
    /// bounds.
    pub fn status(&self, index: usize, file: RegFile) -> Result<Status> {
        if index >= REGISTER_FILE_SIZE {
            return Err(SimError::RegisterOutOfRange {
                index,
                file: file.label(),
                size: REGISTER_FILE_SIZE,
            });
        }
        Ok(self.file(file)[index])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn starts_all_free() {
        let sb = Scoreboard::new();
        assert_eq!(sb.status(0, RegFile::Scalar).unwrap(), Status::Free);
        assert_eq!(sb.status(7, RegFile::Vector).unwrap(), Status::Free);
    }

    #[test]
    fn set_then_clear_round_trips() {
        let mut sb = Scoreboard::new();
        sb.set_busy(3, RegFile::Vector).unwrap();
        assert_eq!(sb.status(3, RegFile::Vector).unwrap(), Status::Busy);
        sb.clear(3, RegFile::Vector).unwrap();
        assert_eq!(sb.status(3, RegFile::Vector).unwrap(), Status::Free);
    }

    #[test]
    fn scalar_and_vector_files_are_independent() {
        let mut sb = Scoreboard::new();
        sb.set_busy(2, RegFile::Scalar).unwrap();
        assert_eq!(sb.status(2, RegFile::Scalar).unwrap(), Status::Busy);
        assert_eq!(sb.status(2, RegFile::Vector).unwrap(), Status::Free);
    }

    #[test]
    fn double_set_is_an_error() {
        let mut sb = Scoreboard::new();
        sb.set_busy(0, RegFile::Scalar).unwrap();
        let err = sb.set_busy(0, RegFile::Scalar).unwrap_err();
        assert!(matches!(err, SimError::ScoreboardDoubleSet { .. }));
    }

    #[test]
    fn out_of_range_is_an_error() {
        let sb = Scoreboard::new();
        let err = sb.status(8, RegFile::Scalar).unwrap_err();
        assert!(matches!(err, SimError::RegisterOutOfRange { .. }));
    }

    #[test]
    fn clearing_a_free_register_is_a_no_op() {
        let mut sb = Scoreboard::new();
        sb.clear(5, RegFile::Vector).unwrap();
        assert_eq!(sb.status(5, RegFile::Vector).unwrap(), Status::Free);
    }
}
