//! In-flight hazard check (spec.md §4.6).
//!
//! Before an instruction at the head of a dispatch queue can issue, every
//! register it touches — source and destination alike — must be free on
//! the scoreboard. Checking destinations guards against WAW; checking
//! sources guards against RAW, since a source register stays busy until
//! the in-flight writer that targets it completes. Because issue is
//! strictly in program order per queue, this single busy-bit scan is
//! sufficient: there is never an older, already-issued instruction whose
//! hazard this check would miss.

use crate::instruction::Instruction;
use crate::scoreboard::{Scoreboard, Status};

/// Returns `true` if `instr` cannot yet issue because one of its
/// registers is busy on `scoreboard`.
#[must_use]
pub fn is_blocked(instr: &Instruction, scoreboard: &Scoreboard) -> bool {
    instr.operands.iter().any(|reg| {
        scoreboard
            .status(reg.index, reg.file)
            .map(|status| status == Status::Busy)
            .unwrap_or(false)
    })
}
