//! Error types for the vector timing simulator.
//!
//! This module defines the failure modes laid out by the simulator's error
//! handling design: fatal configuration/instruction-memory errors at
//! startup, decode errors when strict decoding is requested, and invariant
//! violations that indicate a defect in the timing model itself rather than
//! a malformed input program.

use std::path::PathBuf;

/// All fallible outcomes the simulator can produce.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// `Config.txt` could not be opened or read.
    #[error("could not read config file {path}: {source}")]
    ConfigUnreadable {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A line in `Config.txt` did not parse as `key = value`.
    #[error("malformed config line in {path}: {line:?}")]
    ConfigMalformedLine {
        /// Path of the offending file.
        path: PathBuf,
        /// The raw line that failed to parse.
        line: String,
    },

    /// A config value was not a valid signed integer.
    #[error("config key {key:?} has non-integer value {value:?}")]
    ConfigNotInteger {
        /// The offending key.
        key: String,
        /// The raw value string.
        value: String,
    },

    /// A key required by the timing model was absent from `Config.txt`.
    #[error("config is missing required key {0:?}")]
    ConfigMissingKey(String),

    /// `Resolved_Code.txt` could not be opened or read.
    #[error("could not read instruction file {path}: {source}")]
    ImemUnreadable {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The instruction stream exceeded the instruction-memory capacity.
    #[error("instruction stream has {count} lines, exceeding the {limit} instruction-memory capacity")]
    ImemOverflow {
        /// Number of instruction lines found.
        count: usize,
        /// Instruction-memory capacity.
        limit: usize,
    },

    /// `Resolved_Code.txt` did not end with a terminal `HALT`.
    #[error("instruction stream does not contain a terminal HALT")]
    ImemMissingHalt,

    /// An optional data file (`SDMEM.txt`/`VDMEM.txt`) could not be parsed.
    #[error("could not parse data file {path}: {reason}")]
    DataFileMalformed {
        /// Path of the offending file.
        path: PathBuf,
        /// Human-readable reason the line failed to parse.
        reason: String,
    },

    /// An instruction token stream did not match any known mnemonic shape
    /// and `--strict-decode` was requested.
    #[error("could not decode instruction {tokens:?}: {reason}")]
    Decode {
        /// The raw whitespace-separated tokens of the offending line.
        tokens: Vec<String>,
        /// Human-readable reason decoding failed.
        reason: String,
    },

    /// An operation referenced a register index outside the register
    /// file's bounds. Well-formed programs never trigger this.
    #[error("register index {index} out of range for {file} file (size {size})")]
    RegisterOutOfRange {
        /// The offending index.
        index: usize,
        /// Which register file (`"scalar"` or `"vector"`).
        file: &'static str,
        /// The register file's size.
        size: usize,
    },

    /// The driver attempted to bind a descriptor to a functional unit that
    /// was already busy. This is always a defect in the driver, never a
    /// consequence of program input.
    #[error("attempted to bind a descriptor to functional unit {0:?} while it was already busy")]
    BindWhileBusy(&'static str),

    /// The driver attempted to set a scoreboard bit that was already set
    /// for the same register. Always a driver defect.
    #[error("scoreboard double-set for {file} register {index}")]
    ScoreboardDoubleSet {
        /// Which register file (`"scalar"` or `"vector"`).
        file: &'static str,
        /// The offending index.
        index: usize,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SimError>;
