//! The cycle-accurate pipeline driver (spec.md §4.7).
//!
//! Each call to [`Pipeline::tick`] advances the machine by exactly one
//! cycle, running sub-stages in an order chosen so every stage only ever
//! reads state already settled this cycle: execute first (it consumes
//! bindings made last cycle), then decode/dispatch, issue, and fetch,
//! which produce the bindings *next* cycle's execute will consume. This
//! avoids needing to double-buffer queue or unit state.

use crate::config::Config;
use crate::error::Result;
use crate::hazards;
use crate::instruction::{self, Instruction, UnitKind};
use crate::queue::DispatchQueue;
use crate::scoreboard::Scoreboard;
use crate::unit::FunctionalUnit;

/// Default Vector Length Register value at reset (spec.md §3).
pub const MAX_VECTOR_LENGTH: i64 = 64;

/// Owns every piece of architectural state and drives the simulation to
/// completion.
pub struct Pipeline {
    config: Config,
    program: Vec<Vec<String>>,
    pc: usize,
    vl: i64,
    next_seq: u64,
    strict_decode: bool,

    scoreboard: Scoreboard,
    vdq: DispatchQueue,
    vcq: DispatchQueue,
    scq: DispatchQueue,
    units: [FunctionalUnit; 6],

    fetched: Option<Instruction>,
    fetch_halted: bool,
    decode_halted: bool,
    execute_halted: bool,

    cycle: i64,
}

impl Pipeline {
    /// Builds a fresh pipeline over `program` (already tokenised by
    /// [`crate::loader::load_instructions`]) with VL reset to
    /// [`MAX_VECTOR_LENGTH`].
    #[must_use]
    pub fn new(config: Config, program: Vec<Vec<String>>, strict_decode: bool) -> Self {
        let vdq = DispatchQueue::new(config.data_queue_depth.max(0) as usize);
        let vcq = DispatchQueue::new(config.compute_queue_depth.max(0) as usize);
        let scq = DispatchQueue::new(config.compute_queue_depth.max(0) as usize);
        let units = UnitKind::all().map(FunctionalUnit::new);
        Self {
            config,
            program,
            pc: 0,
            vl: MAX_VECTOR_LENGTH,
            next_seq: 0,
            strict_decode,
            scoreboard: Scoreboard::new(),
            vdq,
            vcq,
            scq,
            units,
            fetched: None,
            fetch_halted: false,
            decode_halted: false,
            execute_halted: false,
            cycle: 0,
        }
    }

    /// Runs the pipeline to completion and returns the total cycle count.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding a program line fails (only possible
    /// with `strict_decode`, or on a malformed register operand).
    pub fn run(&mut self) -> Result<i64> {
        self.fetch_stage()?;
        loop {
            self.execute_stage();
            if self.is_done() {
                break;
            }
            self.decode_dispatch_stage();
            self.issue_stage()?;
            self.fetch_stage()?;
            self.cycle += 1;
        }
        tracing::debug!(cycles = self.cycle, "pipeline drained");
        Ok(self.cycle)
    }

    fn is_done(&self) -> bool {
        self.fetch_halted
            && self.decode_halted
            && self.execute_halted
            && self.fetched.is_none()
            && self.vdq.is_empty()
            && self.vcq.is_empty()
            && self.scq.is_empty()
            && self.units.iter().all(|u| !u.is_busy())
    }

    fn queue_for(&mut self, kind: UnitKind) -> &mut DispatchQueue {
        match kind {
            UnitKind::VectorLs => &mut self.vdq,
            UnitKind::ScalarU => &mut self.scq,
            UnitKind::VectorAdd | UnitKind::VectorMul | UnitKind::VectorDiv | UnitKind::VectorShuf => {
                &mut self.vcq
            }
        }
    }

    const fn unit_index(kind: UnitKind) -> usize {
        match kind {
            UnitKind::VectorLs => 0,
            UnitKind::VectorAdd => 1,
            UnitKind::VectorMul => 2,
            UnitKind::VectorDiv => 3,
            UnitKind::VectorShuf => 4,
            UnitKind::ScalarU => 5,
        }
    }

    fn fetch_stage(&mut self) -> Result<()> {
        if self.fetch_halted || self.fetched.is_some() {
            return Ok(());
        }
        let Some(tokens) = self.program.get(self.pc).cloned() else {
            return Ok(());
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        let instr = instruction::decode(&tokens, seq, &self.config, &mut self.vl, self.strict_decode)?;
        tracing::trace!(seq, word = %instr.word, pc = self.pc, "fetched");
        self.pc += 1;
        if instr.is_halt() {
            self.fetch_halted = true;
        }
        self.fetched = Some(instr);
        Ok(())
    }

    fn decode_dispatch_stage(&mut self) {
        let Some(instr) = self.fetched.take() else {
            return;
        };
        let is_halt = instr.is_halt();
        let queue = self.queue_for(instr.unit);
        if queue.is_full() {
            self.fetched = Some(instr);
            return;
        }
        tracing::trace!(seq = instr.seq, word = %instr.word, "dispatched");
        queue.push_tail(instr);
        if is_halt {
            self.decode_halted = true;
        }
    }

    fn issue_stage(&mut self) -> Result<()> {
        self.try_issue(QueueId::Vdq)?;
        self.try_issue(QueueId::Vcq)?;
        self.try_issue(QueueId::Scq)?;
        Ok(())
    }

    fn try_issue(&mut self, which: QueueId) -> Result<()> {
        let queue = match which {
            QueueId::Vdq => &self.vdq,
            QueueId::Vcq => &self.vcq,
            QueueId::Scq => &self.scq,
        };
        let Some(head) = queue.peek_head() else {
            return Ok(());
        };
        if hazards::is_blocked(head, &self.scoreboard) {
            return Ok(());
        }
        let unit_idx = Self::unit_index(head.unit);
        if self.units[unit_idx].is_busy() {
            return Ok(());
        }

        let queue = match which {
            QueueId::Vdq => &mut self.vdq,
            QueueId::Vcq => &mut self.vcq,
            QueueId::Scq => &mut self.scq,
        };
        // The head was just peeked with no intervening mutation, so it is
        // still there; nothing to do if a future refactor breaks that.
        let Some(instr) = queue.pop_head() else {
            return Ok(());
        };
        if let Some(dest) = instr.dest {
            self.scoreboard.set_busy(dest.index, dest.file)?;
        }
        tracing::trace!(seq = instr.seq, word = %instr.word, unit = instr.unit.label(), "issued");
        self.units[unit_idx].bind(instr)?;
        Ok(())
    }

    fn execute_stage(&mut self) {
        for unit in &mut self.units {
            if let Some(done) = unit.tick() {
                tracing::trace!(seq = done.seq, word = %done.word, "completed");
                if let Some(dest) = done.dest {
                    if let Err(err) = self.scoreboard.clear(dest.index, dest.file) {
                        tracing::error!(%err, "scoreboard clear failed for a register that was set at issue");
                    }
                }
                if done.is_halt() {
                    self.execute_halted = true;
                }
            }
        }
    }
}

enum QueueId {
    Vdq,
    Vcq,
    Scq,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(data_q: i64, compute_q: i64) -> Config {
        let text = format!(
            "dataQueueDepth = {data_q}\ncomputeQueueDepth = {compute_q}\npipelineDepthAdd = 6\npipelineDepthMul = 7\npipelineDepthDiv = 20\npipelineDepthShuffle = 4\nvlsPipelineDepth = 11\nvdmNumBanks = 4\nvdmBankBusyTime = 2\nnumLanes = 4\n"
        );
        Config::parse(&text, &PathBuf::from("Config.txt")).unwrap()
    }

    fn program(lines: &[&str]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn halt_only_program_runs_for_exactly_one_cycle() {
        let mut pipeline = Pipeline::new(config(4, 8), program(&["HALT"]), true);
        let cycles = pipeline.run().unwrap();
        pretty_assertions::assert_eq!(cycles, 1);
    }

    #[test]
    fn addvv_then_halt_takes_chime_latency_plus_halt() {
        let mut pipeline = Pipeline::new(
            config(4, 8),
            program(&["ADDVV VR1 VR2 VR3", "HALT"]),
            true,
        );
        let cycles = pipeline.run().unwrap();
        // 6 + (64/4) - 1 = 21 cycles for ADDVV to clear VectorADD, plus the
        // HALT that issues the cycle after and completes one cycle later.
        assert!(cycles >= 21);
    }

    #[test]
    fn raw_hazard_blocks_dependent_add_until_load_completes() {
        let mut pipeline = Pipeline::new(
            config(4, 8),
            program(&["LV VR1 (0,1,2,3)", "ADDVV VR2 VR1 VR3", "HALT"]),
            true,
        );
        let cycles = pipeline.run().unwrap();
        // The ADDVV cannot issue until VR1's busy bit clears when LV
        // completes, so total cycles must exceed the LV latency alone.
        let lv_only = Pipeline::new(config(4, 8), program(&["LV VR1 (0,1,2,3)", "HALT"]), true)
            .run_copy();
        assert!(cycles > lv_only);
    }

    #[test]
    fn back_to_back_addvv_serialize_on_the_shared_unit() {
        let mut pipeline = Pipeline::new(
            config(4, 8),
            program(&[
                "ADDVV VR1 VR2 VR3",
                "ADDVV VR4 VR5 VR6",
                "HALT",
            ]),
            true,
        );
        let cycles = pipeline.run().unwrap();
        let mut single = Pipeline::new(config(4, 8), program(&["ADDVV VR1 VR2 VR3", "HALT"]), true);
        let single_cycles = single.run().unwrap();
        assert!(cycles > single_cycles);
    }

    #[test]
    fn unreachable_register_is_a_fatal_decode_error() {
        let mut pipeline = Pipeline::new(config(4, 8), program(&["ADDVV VR9 VR2 VR3", "HALT"]), true);
        assert!(pipeline.run().is_err());
    }

    impl Pipeline {
        fn run_copy(mut self) -> i64 {
            self.run().unwrap()
        }
    }
}
