//! Instruction- and data-memory loaders (spec.md §4, supplemented by the
//! IMEM capacity cap and DMEM pass-through validation described in
//! SPEC_FULL.md's supplemented-features section).
//!
//! Loading never decodes instructions: the token lists returned here are
//! handed to [`crate::instruction::decode`] lazily, one per fetch, since
//! decoding is stateful (`MTCL` mutates the Vector Length Register as a
//! side effect of being fetched, not of being loaded).

use std::fs;
use std::path::Path;

use crate::error::{Result, SimError};

/// Instruction memory capacity: programs longer than this cannot be
/// addressed by the simulator (supplemented feature, SPEC_FULL.md A.3).
pub const MAX_INSTRUCTIONS: usize = 1 << 16;

/// Reads and tokenises `Resolved_Code.txt`.
///
/// Each non-blank line is whitespace-tokenised; a leading pure-address
/// token (decimal or `0x`-prefixed hex) is stripped so every returned
/// entry begins with its mnemonic. Enforces the [`MAX_INSTRUCTIONS`] cap
/// and that the final instruction is a terminal `HALT`.
///
/// # Errors
///
/// Returns [`SimError::ImemUnreadable`] if the file cannot be read,
/// [`SimError::ImemOverflow`] if it holds more than [`MAX_INSTRUCTIONS`]
/// lines, or [`SimError::ImemMissingHalt`] if the last instruction is not
/// `HALT`.
pub fn load_instructions(path: &Path) -> Result<Vec<Vec<String>>> {
    let text = fs::read_to_string(path).map_err(|source| SimError::ImemUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut lines = Vec::new();
    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if is_address_token(&tokens[0]) {
            tokens.remove(0);
        }
        if tokens.is_empty() {
            continue;
        }
        lines.push(tokens);
    }

    if lines.len() > MAX_INSTRUCTIONS {
        return Err(SimError::ImemOverflow {
            count: lines.len(),
            limit: MAX_INSTRUCTIONS,
        });
    }

    match lines.last() {
        Some(last) if last.first().map(String::as_str) == Some("HALT") => {}
        _ => return Err(SimError::ImemMissingHalt),
    }

    Ok(lines)
}

fn is_address_token(token: &str) -> bool {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// Parse-only validation of a plain integer-per-line data file
/// (`SDMEM.txt` / `VDMEM.txt`). The timing model never reads register or
/// memory contents, so the values themselves are discarded; only the
/// file's shape is checked.
///
/// # Errors
///
/// Returns [`SimError::DataFileMalformed`] if a non-blank, non-comment
/// line fails to parse as a signed integer.
pub fn load_data_file(path: &Path) -> Result<Vec<i64>> {
    let text = fs::read_to_string(path).map_err(|source| SimError::ImemUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut values = Vec::new();
    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let value = line.parse::<i64>().map_err(|_| SimError::DataFileMalformed {
            path: path.to_path_buf(),
            reason: format!("line {line:?} is not a signed integer"),
        })?;
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn strips_leading_address_tokens() {
        let file = write_temp("0 MTCL SR0 4\n4 ADDVV VR1 VR2 VR3\n8 HALT\n");
        let lines = load_instructions(file.path()).unwrap();
        assert_eq!(lines[0], vec!["MTCL", "SR0", "4"]);
        assert_eq!(lines[2], vec!["HALT"]);
    }

    #[test]
    fn tolerates_missing_address_prefix() {
        let file = write_temp("MTCL SR0 4\nHALT\n");
        let lines = load_instructions(file.path()).unwrap();
        assert_eq!(lines[0], vec!["MTCL", "SR0", "4"]);
        assert_eq!(lines[1], vec!["HALT"]);
    }

    #[test]
    fn missing_terminal_halt_is_fatal() {
        let file = write_temp("0 MTCL SR0 4\n");
        let err = load_instructions(file.path()).unwrap_err();
        assert!(matches!(err, SimError::ImemMissingHalt));
    }

    #[test]
    fn unreadable_path_is_fatal() {
        let err = load_instructions(Path::new("/nonexistent/Resolved_Code.txt")).unwrap_err();
        assert!(matches!(err, SimError::ImemUnreadable { .. }));
    }

    #[test]
    fn data_file_accepts_signed_integers_per_line() {
        let file = write_temp("1\n-2\n0\n\n3\n");
        let values = load_data_file(file.path()).unwrap();
        assert_eq!(values, vec![1, -2, 0, 3]);
    }

    #[test]
    fn data_file_rejects_non_integer_lines() {
        let file = write_temp("1\nnotanumber\n");
        let err = load_data_file(file.path()).unwrap_err();
        assert!(matches!(err, SimError::DataFileMalformed { .. }));
    }
}
