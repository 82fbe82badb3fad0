//! Bank-conflict latency model for vector loads/stores (spec.md §4.5).
//!
//! Computes the number of cycles a vector load/store descriptor occupies
//! the `VectorLS` functional unit, given the ordered address list it
//! touches and the vector-data-memory bank parameters. Addresses are
//! issued one per simulated cycle regardless of `numLanes` — the model
//! always treats lanes as 1 for conflict counting (spec.md §4.5 step 3).

/// Parameters of the vector data memory's bank-conflict model.
#[derive(Debug, Clone, Copy)]
pub struct BankParams {
    /// Front-end pipeline depth of the vector load/store unit.
    pub vls_pipeline_depth: i64,
    /// Number of banks in vector data memory.
    pub num_banks: i64,
    /// Cycles a bank remains busy after a single access.
    pub bank_busy_time: i64,
}

/// Computes the cycle count for a vector load/store touching `addresses`,
/// following the six-step algorithm of spec.md §4.5 exactly, including the
/// intentional empty trailing wave that models the issue-pipeline drain
/// after the last real address.
#[must_use]
pub fn latency(addresses: &[i64], params: BankParams) -> i64 {
    let num_banks = params.num_banks.max(1) as usize;
    let mut cycles = params.vls_pipeline_depth;
    let mut banks = vec![0i64; num_banks];

    // One address issues per wave (lanes = 1 for conflict counting); the
    // `+ 1` includes the empty trailing wave that drains the pipeline.
    let wave_count = addresses.len() + 1;

    for wave in 0..wave_count {
        if wave < addresses.len() {
            let addr = addresses[wave];
            let bank = addr.rem_euclid(num_banks as i64) as usize;
            if banks[bank] != 0 {
                banks[bank] += 1;
            }
            banks[bank] += params.bank_busy_time;
        }
        for slot in &mut banks {
            if *slot > 0 {
                *slot -= 1;
            }
        }
        cycles += 1;
    }

    let max_remaining = banks.into_iter().max().unwrap_or(0);
    cycles + max_remaining
}
