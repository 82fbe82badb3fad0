//! Instruction descriptors and the token-stream decoder (spec.md §4.4).
//!
//! Decoding turns a whitespace-tokenised instruction line into an
//! immutable [`Instruction`] descriptor: which functional unit it binds
//! to, how many cycles it occupies that unit, and the ordered list of
//! register operands used by the hazard check. Register and memory
//! *contents* are never modeled — only the shape of the instruction
//! matters to the timing core.

use crate::bank::{self, BankParams};
use crate::config::Config;
use crate::error::{Result, SimError};
use crate::register::{RegFile, RegRef};

/// The six functional-unit kinds a descriptor can bind to (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// Vector load/store.
    VectorLs,
    /// Vector add/subtract.
    VectorAdd,
    /// Vector multiply.
    VectorMul,
    /// Vector divide.
    VectorDiv,
    /// Vector shuffle/pack.
    VectorShuf,
    /// Scalar unit (includes `HALT` and `MTCL`).
    ScalarU,
}

impl UnitKind {
    /// Stable name used in diagnostics and error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            UnitKind::VectorLs => "VectorLS",
            UnitKind::VectorAdd => "VectorADD",
            UnitKind::VectorMul => "VectorMUL",
            UnitKind::VectorDiv => "VectorDIV",
            UnitKind::VectorShuf => "VectorSHUF",
            UnitKind::ScalarU => "ScalarU",
        }
    }

    /// All six unit kinds, in the fixed order the driver iterates them for
    /// the execute sub-stage.
    #[must_use]
    pub const fn all() -> [UnitKind; 6] {
        [
            UnitKind::VectorLs,
            UnitKind::VectorAdd,
            UnitKind::VectorMul,
            UnitKind::VectorDiv,
            UnitKind::VectorShuf,
            UnitKind::ScalarU,
        ]
    }
}

/// An immutable, decoded instruction ready for dispatch.
#[derive(Debug, Clone)]
pub struct Instruction {
    /// The mnemonic, kept for diagnostics.
    pub word: String,
    /// Monotonically increasing program-order index assigned at decode
    /// time; the tie-breaker for in-flight hazard checks.
    pub seq: u64,
    /// The functional unit this instruction binds to.
    pub unit: UnitKind,
    /// Latency in cycles once bound to its unit.
    pub cycles: i64,
    /// Every register this instruction reads or writes; the full set
    /// participates in the hazard check, regardless of direction.
    pub operands: Vec<RegRef>,
    /// The single register this instruction writes, if any. `None` for
    /// stores (`SV*`) and `HALT`, which touch registers only as sources.
    pub dest: Option<RegRef>,
    /// Address list for vector loads/stores (empty for every other unit).
    pub addresses: Vec<i64>,
}

impl Instruction {
    /// Whether this descriptor is the terminal `HALT`.
    #[must_use]
    pub fn is_halt(&self) -> bool {
        self.word == "HALT"
    }
}

/// One operand token's parsed shape.
enum Token {
    Register(i64),
    Address(Vec<i64>),
    Immediate(i64),
}

/// Parses a single operand token per spec.md §4.4:
/// - two letters followed by digits -> a register index,
/// - `(` prefixed -> a comma-separated address list,
/// - purely numeric -> an immediate.
fn parse_token(token: &str) -> Option<Token> {
    if let Some(stripped) = token.strip_prefix('(') {
        let inner = stripped.strip_suffix(')').unwrap_or(stripped);
        let mut addrs = Vec::new();
        for part in inner.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            addrs.push(part.parse::<i64>().ok()?);
        }
        return Some(Token::Address(addrs));
    }

    if token.len() > 2 {
        let (prefix, rest) = token.split_at(2);
        if prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            if let Ok(idx) = rest.parse::<i64>() {
                return Some(Token::Register(idx));
            }
        }
    }

    token.parse::<i64>().ok().map(Token::Immediate)
}

fn register_ref(idx: i64, file: RegFile, word: &str) -> Result<RegRef> {
    if idx < 0 || idx as usize >= crate::register::REGISTER_FILE_SIZE {
        return Err(SimError::RegisterOutOfRange {
            index: idx.max(0) as usize,
            file: file.label(),
            size: crate::register::REGISTER_FILE_SIZE,
        });
    }
    let _ = word;
    Ok(RegRef::new(idx as usize, file))
}

fn chime_latency(pipeline_depth: i64, vl: i64, num_lanes: i64) -> i64 {
    let lanes = num_lanes.max(1);
    pipeline_depth + vl.div_euclid(lanes) - 1
}

/// Three-operand vector instruction shape: `(V_d, V_s1, op2)` where `op2`
/// is either a vector or scalar register depending on the `VS`/`VV` form.
fn decode_vector_triple(
    word: &str,
    tokens: &[&str],
    op2_file: RegFile,
) -> Result<Vec<RegRef>> {
    if tokens.len() != 4 {
        return Err(SimError::Decode {
            tokens: tokens.iter().map(|t| (*t).to_string()).collect(),
            reason: format!("{word} expects exactly 3 register operands"),
        });
    }
    let d = match parse_token(tokens[1]) {
        Some(Token::Register(i)) => register_ref(i, RegFile::Vector, word)?,
        _ => {
            return Err(SimError::Decode {
                tokens: tokens.iter().map(|t| (*t).to_string()).collect(),
                reason: "destination operand is not a register".to_string(),
            });
        }
    };
    let s1 = match parse_token(tokens[2]) {
        Some(Token::Register(i)) => register_ref(i, RegFile::Vector, word)?,
        _ => {
            return Err(SimError::Decode {
                tokens: tokens.iter().map(|t| (*t).to_string()).collect(),
                reason: "first source operand is not a register".to_string(),
            });
        }
    };
    let s2 = match parse_token(tokens[3]) {
        Some(Token::Register(i)) => register_ref(i, op2_file, word)?,
        Some(Token::Immediate(_)) => return Ok(vec![d, s1]),
        _ => {
            return Err(SimError::Decode {
                tokens: tokens.iter().map(|t| (*t).to_string()).collect(),
                reason: "second source operand is not a register or immediate".to_string(),
            });
        }
    };
    Ok(vec![d, s1, s2])
}

/// Decodes one whitespace-tokenised instruction line.
///
/// `seq` is the program-order index to stamp on the resulting descriptor.
/// `vl` is the current Vector Length Register; `MTCL` mutates it in
/// place as a decode-time side effect (spec.md §4.4/§4.7). `strict`
/// selects the fail-fast resolution of the unknown-mnemonic Open Question
/// (spec.md §9) instead of the default warn-and-no-op fallback.
///
/// # Errors
///
/// Returns [`SimError::Decode`] or [`SimError::RegisterOutOfRange`] for a
/// malformed instruction; the latter is always fatal regardless of
/// `strict`.
pub fn decode(
    tokens: &[String],
    seq: u64,
    config: &Config,
    vl: &mut i64,
    strict: bool,
) -> Result<Instruction> {
    let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
    let word = refs.first().copied().unwrap_or_default();

    if word == "HALT" {
        return Ok(Instruction {
            word: word.to_string(),
            seq,
            unit: UnitKind::ScalarU,
            cycles: 1,
            operands: Vec::new(),
            dest: None,
            addresses: Vec::new(),
        });
    }

    if word == "ADDVV" || word == "SUBVV" || (word.starts_with('S') && word.ends_with("VV")) {
        let operands = decode_vector_triple(word, &refs, RegFile::Vector)?;
        let cycles = chime_latency(config.pipeline_depth_add, *vl, config.num_lanes);
        return Ok(Instruction {
            word: word.to_string(),
            seq,
            unit: UnitKind::VectorAdd,
            cycles,
            dest: operands.first().copied(),
            operands,
            addresses: Vec::new(),
        });
    }

    if word == "ADDVS" || word == "SUBVS" || (word.starts_with('S') && word.ends_with("VS")) {
        let operands = decode_vector_triple(word, &refs, RegFile::Scalar)?;
        let cycles = chime_latency(config.pipeline_depth_add, *vl, config.num_lanes);
        return Ok(Instruction {
            word: word.to_string(),
            seq,
            unit: UnitKind::VectorAdd,
            cycles,
            dest: operands.first().copied(),
            operands,
            addresses: Vec::new(),
        });
    }

    if word == "MULVV" {
        let operands = decode_vector_triple(word, &refs, RegFile::Vector)?;
        let cycles = chime_latency(config.pipeline_depth_mul, *vl, config.num_lanes);
        return Ok(Instruction {
            word: word.to_string(),
            seq,
            unit: UnitKind::VectorMul,
            cycles,
            dest: operands.first().copied(),
            operands,
            addresses: Vec::new(),
        });
    }

    if word == "MULVS" {
        let operands = decode_vector_triple(word, &refs, RegFile::Scalar)?;
        let cycles = chime_latency(config.pipeline_depth_mul, *vl, config.num_lanes);
        return Ok(Instruction {
            word: word.to_string(),
            seq,
            unit: UnitKind::VectorMul,
            cycles,
            dest: operands.first().copied(),
            operands,
            addresses: Vec::new(),
        });
    }

    if word == "DIVVV" {
        let operands = decode_vector_triple(word, &refs, RegFile::Vector)?;
        let cycles = chime_latency(config.pipeline_depth_div, *vl, config.num_lanes);
        return Ok(Instruction {
            word: word.to_string(),
            seq,
            unit: UnitKind::VectorDiv,
            cycles,
            dest: operands.first().copied(),
            operands,
            addresses: Vec::new(),
        });
    }

    if word == "DIVVS" {
        let operands = decode_vector_triple(word, &refs, RegFile::Scalar)?;
        let cycles = chime_latency(config.pipeline_depth_div, *vl, config.num_lanes);
        return Ok(Instruction {
            word: word.to_string(),
            seq,
            unit: UnitKind::VectorDiv,
            cycles,
            dest: operands.first().copied(),
            operands,
            addresses: Vec::new(),
        });
    }

    if word.contains("PACK") {
        let operands = decode_vector_triple(word, &refs, RegFile::Vector)?;
        let cycles = chime_latency(config.pipeline_depth_shuffle, *vl, config.num_lanes);
        return Ok(Instruction {
            word: word.to_string(),
            seq,
            unit: UnitKind::VectorShuf,
            cycles,
            dest: operands.first().copied(),
            operands,
            addresses: Vec::new(),
        });
    }

    if word.starts_with("LV") || word.starts_with("SV") {
        if refs.len() != 3 {
            return Err(SimError::Decode {
                tokens: tokens.to_vec(),
                reason: format!("{word} expects a destination register and an address list"),
            });
        }
        let dest = match parse_token(refs[1]) {
            Some(Token::Register(i)) => register_ref(i, RegFile::Vector, word)?,
            _ => {
                return Err(SimError::Decode {
                    tokens: tokens.to_vec(),
                    reason: "destination operand is not a register".to_string(),
                });
            }
        };
        let addresses = match parse_token(refs[2]) {
            Some(Token::Address(list)) => list,
            _ => {
                return Err(SimError::Decode {
                    tokens: tokens.to_vec(),
                    reason: "second operand is not an address list".to_string(),
                });
            }
        };
        let cycles = bank::latency(
            &addresses,
            BankParams {
                vls_pipeline_depth: config.vls_pipeline_depth,
                num_banks: config.vdm_num_banks,
                bank_busy_time: config.vdm_bank_busy_time,
            },
        );
        // LV writes its vector register; SV only reads it to spill to
        // memory, so it never sets the destination the scoreboard tracks.
        let writer = if word.starts_with("LV") { Some(dest) } else { None };
        return Ok(Instruction {
            word: word.to_string(),
            seq,
            unit: UnitKind::VectorLs,
            cycles,
            dest: writer,
            operands: vec![dest],
            addresses,
        });
    }

    if word == "MTCL" {
        if refs.len() != 3 {
            return Err(SimError::Decode {
                tokens: tokens.to_vec(),
                reason: "MTCL expects a destination register and an immediate".to_string(),
            });
        }
        let dest = match parse_token(refs[1]) {
            Some(Token::Register(i)) => register_ref(i, RegFile::Scalar, word)?,
            _ => {
                return Err(SimError::Decode {
                    tokens: tokens.to_vec(),
                    reason: "MTCL destination is not a scalar register".to_string(),
                });
            }
        };
        // Safe-parse the VL immediate as a signed integer; the original
        // source's `eval()` of arbitrary expressions is rejected outright
        // (spec.md §9 design note).
        let imm: i64 = refs[2].parse().map_err(|_| SimError::Decode {
            tokens: tokens.to_vec(),
            reason: format!("MTCL immediate {:?} is not a plain signed integer", refs[2]),
        })?;
        *vl = imm;
        // MTCL reads its scalar register as the VL source; it writes the
        // Vector Length Register, which has no scoreboard entry of its
        // own, so this instruction has no tracked destination.
        return Ok(Instruction {
            word: word.to_string(),
            seq,
            unit: UnitKind::ScalarU,
            cycles: 1,
            dest: None,
            operands: vec![dest],
            addresses: Vec::new(),
        });
    }

    // Fallback class: spec.md §4.4's "any other mnemonic" row, decoded as
    // scalar operands. If a token genuinely fails to parse, this is the
    // ill-defined case from spec.md §9 — either fail fast (`strict`) or
    // fall back to a no-op ScalarU of latency 1 with a logged warning.
    let mut operands = Vec::new();
    for tok in &refs[1..] {
        match parse_token(tok) {
            Some(Token::Register(i)) => operands.push(register_ref(i, RegFile::Scalar, word)?),
            Some(Token::Immediate(_) | Token::Address(_)) => {
                // Immediates and address lists are not register references
                // and never participate in the hazard check.
            }
            None => {
                if strict {
                    return Err(SimError::Decode {
                        tokens: tokens.to_vec(),
                        reason: format!("unrecognised operand token {tok:?}"),
                    });
                }
                tracing::warn!(mnemonic = word, token = tok, "unrecognised operand token; treating instruction as a ScalarU no-op");
                return Ok(Instruction {
                    word: word.to_string(),
                    seq,
                    unit: UnitKind::ScalarU,
                    cycles: 1,
                    operands: Vec::new(),
                    dest: None,
                    addresses: Vec::new(),
                });
            }
        }
    }
    // Conventional three-operand scalar form: the first operand is the
    // destination, matching the ADD/SUB/mul scalar mnemonics this
    // fallback also has to cover.
    let dest = operands.first().copied();
    Ok(Instruction {
        word: word.to_string(),
        seq,
        unit: UnitKind::ScalarU,
        cycles: 1,
        operands,
        dest,
        addresses: Vec::new(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> Config {
        let text = [
            "dataQueueDepth = 4",
            "computeQueueDepth = 8",
            "pipelineDepthAdd = 6",
            "pipelineDepthMul = 7",
            "pipelineDepthDiv = 20",
            "pipelineDepthShuffle = 4",
            "vlsPipelineDepth = 11",
            "vdmNumBanks = 4",
            "vdmBankBusyTime = 2",
            "numLanes = 4",
        ]
        .join("\n");
        Config::parse(&text, &PathBuf::from("Config.txt")).unwrap()
    }

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn halt_decodes_with_no_operands() {
        let cfg = config();
        let mut vl = 64;
        let instr = decode(&toks("HALT"), 0, &cfg, &mut vl, true).unwrap();
        assert!(instr.is_halt());
        assert_eq!(instr.unit, UnitKind::ScalarU);
        assert_eq!(instr.cycles, 1);
        assert!(instr.operands.is_empty());
    }

    #[test]
    fn addvv_uses_vector_add_chime_formula() {
        let cfg = config();
        let mut vl = 64;
        let instr = decode(&toks("ADDVV VR1 VR2 VR3"), 1, &cfg, &mut vl, true).unwrap();
        assert_eq!(instr.unit, UnitKind::VectorAdd);
        // 6 + (64 / 4) - 1 = 21
        assert_eq!(instr.cycles, 21);
        assert_eq!(instr.operands.len(), 3);
        assert_eq!(instr.operands[0], RegRef::vector(1));
    }

    #[test]
    fn subvv_matches_s_star_vv_family() {
        let cfg = config();
        let mut vl = 64;
        let instr = decode(&toks("SUBVV VR1 VR2 VR3"), 1, &cfg, &mut vl, true).unwrap();
        assert_eq!(instr.unit, UnitKind::VectorAdd);
    }

    #[rstest::rstest]
    #[case("ADDVV VR1 VR2 VR3", UnitKind::VectorAdd)]
    #[case("SUBVV VR1 VR2 VR3", UnitKind::VectorAdd)]
    #[case("ADDVS VR1 VR2 SR3", UnitKind::VectorAdd)]
    #[case("MULVV VR1 VR2 VR3", UnitKind::VectorMul)]
    #[case("MULVS VR1 VR2 SR3", UnitKind::VectorMul)]
    #[case("DIVVV VR1 VR2 VR3", UnitKind::VectorDiv)]
    #[case("DIVVS VR1 VR2 SR3", UnitKind::VectorDiv)]
    #[case("VPACKL VR1 VR2 VR3", UnitKind::VectorShuf)]
    #[case("LV VR1 (0,1,2,3)", UnitKind::VectorLs)]
    #[case("SV VR1 (0,1,2,3)", UnitKind::VectorLs)]
    #[case("MTCL SR0 4", UnitKind::ScalarU)]
    #[case("HALT", UnitKind::ScalarU)]
    fn mnemonic_family_dispatches_to_the_expected_unit(#[case] line: &str, #[case] expected: UnitKind) {
        let cfg = config();
        let mut vl = 64;
        let instr = decode(&toks(line), 0, &cfg, &mut vl, true).unwrap();
        assert_eq!(instr.unit, expected);
    }

    #[test]
    fn addvs_second_source_is_scalar() {
        let cfg = config();
        let mut vl = 64;
        let instr = decode(&toks("ADDVS VR1 VR2 SR3"), 1, &cfg, &mut vl, true).unwrap();
        assert_eq!(instr.operands[2], RegRef::scalar(3));
    }

    #[test]
    fn mulvv_uses_multiply_depth() {
        let cfg = config();
        let mut vl = 64;
        let instr = decode(&toks("MULVV VR1 VR2 VR3"), 1, &cfg, &mut vl, true).unwrap();
        assert_eq!(instr.unit, UnitKind::VectorMul);
        // 7 + 16 - 1 = 22
        assert_eq!(instr.cycles, 22);
    }

    #[test]
    fn pack_mnemonic_maps_to_shuffle_unit() {
        let cfg = config();
        let mut vl = 64;
        let instr = decode(&toks("VPACKL VR1 VR2 VR3"), 1, &cfg, &mut vl, true).unwrap();
        assert_eq!(instr.unit, UnitKind::VectorShuf);
    }

    #[test]
    fn mtcl_sets_vl_and_decodes_to_scalaru() {
        let cfg = config();
        let mut vl = 64;
        let instr = decode(&toks("MTCL SR0 4"), 1, &cfg, &mut vl, true).unwrap();
        assert_eq!(instr.unit, UnitKind::ScalarU);
        assert_eq!(vl, 4);
        assert_eq!(instr.operands[0], RegRef::scalar(0));
    }

    #[test]
    fn mtcl_with_minimum_vl_yields_minimum_chime_latency() {
        let cfg = config();
        let mut vl = 64;
        decode(&toks("MTCL SR0 4"), 1, &cfg, &mut vl, true).unwrap();
        let add = decode(&toks("ADDVV VR1 VR2 VR3"), 2, &cfg, &mut vl, true).unwrap();
        // VL == numLanes -> pipelineDepth + 1 - 1 == pipelineDepth.
        assert_eq!(add.cycles, cfg.pipeline_depth_add);
    }

    #[test]
    fn mtcl_rejects_expression_forms() {
        let cfg = config();
        let mut vl = 64;
        let err = decode(&toks("MTCL SR0 4+1"), 1, &cfg, &mut vl, true).unwrap_err();
        assert!(matches!(err, SimError::Decode { .. }));
    }

    #[test]
    fn load_vector_uses_bank_conflict_model() {
        let cfg = config();
        let mut vl = 64;
        let instr = decode(&toks("LV VR1 (0,1,2,3,4,5,6,7)"), 1, &cfg, &mut vl, true).unwrap();
        assert_eq!(instr.unit, UnitKind::VectorLs);
        assert_eq!(instr.addresses.len(), 8);
        assert_eq!(instr.operands, vec![RegRef::vector(1)]);
    }

    #[test]
    fn store_vector_also_uses_vectorls() {
        let cfg = config();
        let mut vl = 64;
        let instr = decode(&toks("SV VR1 (0,1,2,3)"), 1, &cfg, &mut vl, true).unwrap();
        assert_eq!(instr.unit, UnitKind::VectorLs);
    }

    #[test]
    fn unknown_mnemonic_falls_back_to_scalar_noop_when_lenient() {
        let cfg = config();
        let mut vl = 64;
        let instr = decode(&toks("FROB !!!"), 1, &cfg, &mut vl, false).unwrap();
        assert_eq!(instr.unit, UnitKind::ScalarU);
        assert_eq!(instr.cycles, 1);
        assert!(instr.operands.is_empty());
    }

    #[test]
    fn unknown_mnemonic_fails_fast_when_strict() {
        let cfg = config();
        let mut vl = 64;
        let err = decode(&toks("FROB !!!"), 1, &cfg, &mut vl, true).unwrap_err();
        assert!(matches!(err, SimError::Decode { .. }));
    }

    #[test]
    fn generic_scalar_instruction_decodes_register_operands() {
        let cfg = config();
        let mut vl = 64;
        let instr = decode(&toks("ADD SR1 SR2 SR3"), 1, &cfg, &mut vl, true).unwrap();
        assert_eq!(instr.unit, UnitKind::ScalarU);
        assert_eq!(instr.operands.len(), 3);
        assert_eq!(instr.operands[0], RegRef::scalar(1));
    }

    #[test]
    fn out_of_range_register_is_always_fatal() {
        let cfg = config();
        let mut vl = 64;
        let err = decode(&toks("ADDVV VR9 VR2 VR3"), 1, &cfg, &mut vl, false).unwrap_err();
        assert!(matches!(err, SimError::RegisterOutOfRange { .. }));
    }

    proptest::proptest! {
        #[test]
        fn chime_latency_is_monotonic_in_vector_length(
            depth in 1i64..20,
            lanes in 1i64..8,
            vl_a in 1i64..64,
            vl_b in 1i64..64,
        ) {
            let (lo, hi) = if vl_a <= vl_b { (vl_a, vl_b) } else { (vl_b, vl_a) };
            proptest::prop_assert!(chime_latency(depth, lo, lanes) <= chime_latency(depth, hi, lanes));
        }

        #[test]
        fn register_token_round_trips_through_parse_token(index in 0i64..8) {
            let token = format!("VR{index}");
            match parse_token(&token) {
                Some(Token::Register(parsed)) => proptest::prop_assert_eq!(parsed, index),
                other => proptest::prop_assert!(false, "expected a register token, got {:?}", other.is_some()),
            }
        }
    }
}
