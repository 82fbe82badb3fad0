//! Functional unit state machine (spec.md §4.2).
//!
//! Each of the six functional units is either free or busy executing a
//! bound instruction with a remaining-cycle counter. Binding is the
//! issue stage's job; ticking and completion detection is the execute
//! stage's job (spec.md §4.7).

use crate::error::{Result, SimError};
use crate::instruction::{Instruction, UnitKind};

/// A single functional unit's execution state.
#[derive(Debug, Clone)]
pub struct FunctionalUnit {
    kind: UnitKind,
    busy: Option<Busy>,
}

#[derive(Debug, Clone)]
struct Busy {
    instr: Instruction,
    remaining: i64,
}

impl FunctionalUnit {
    /// Creates a free unit of the given kind.
    #[must_use]
    pub fn new(kind: UnitKind) -> Self {
        Self { kind, busy: None }
    }

    /// Which unit kind this is.
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Whether this unit currently holds a bound instruction.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.is_some()
    }

    /// Binds `instr` to this unit for its full latency.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::BindWhileBusy`] if the unit is already
    /// occupied — always a driver defect, since the issue stage must
    /// check [`FunctionalUnit::is_busy`] first.
    pub fn bind(&mut self, instr: Instruction) -> Result<()> {
        if self.busy.is_some() {
            return Err(SimError::BindWhileBusy(self.kind.label()));
        }
        let remaining = instr.cycles;
        self.busy = Some(Busy { instr, remaining });
        Ok(())
    }

    /// Advances this unit by one cycle. Returns the completed
    /// instruction once its remaining-cycle counter reaches zero,
    /// freeing the unit for the next bind.
    pub fn tick(&mut self) -> Option<Instruction> {
        let done = match &mut self.busy {
            Some(busy) => {
                busy.remaining -= 1;
                busy.remaining <= 0
            }
            None => false,
        };
        if done {
            self.busy.take().map(|busy| busy.instr)
        } else {
            None
        }
    }

    /// The instruction currently bound to this unit, if any.
    #[must_use]
    pub fn bound(&self) -> Option<&Instruction> {
        self.busy.as_ref().map(|busy| &busy.instr)
    }
}
