//! Configuration loader for the vector timing simulator.
//!
//! Parses `Config.txt`: lines of `key = value`, `#` introducing a comment,
//! blank and comment-only lines ignored, all values signed integers. This
//! module never reads from the default `--iodir` itself — that plumbing
//! lives in the CLI — it only turns file contents (or an in-memory string,
//! for tests) into a validated [`Config`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, SimError};

/// Recognised configuration keys (spec.md §3). Every one of these must be
/// present in `Config.txt` or loading fails with
/// [`SimError::ConfigMissingKey`].
const REQUIRED_KEYS: &[&str] = &[
    "dataQueueDepth",
    "computeQueueDepth",
    "pipelineDepthAdd",
    "pipelineDepthMul",
    "pipelineDepthDiv",
    "pipelineDepthShuffle",
    "vlsPipelineDepth",
    "vdmNumBanks",
    "vdmBankBusyTime",
    "numLanes",
];

/// A fully validated VMIPS-style configuration.
///
/// Every [`REQUIRED_KEYS`] entry is guaranteed to be present; any
/// additional keys found in the file are preserved in `extra` for
/// forward-compatible lookup but are not otherwise interpreted.
#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of the vector data queue (VDQ).
    pub data_queue_depth: i64,
    /// Capacity of the vector compute queue (VCQ) and scalar queue (SCQ).
    pub compute_queue_depth: i64,
    /// Pipeline depth of the vector add/subtract unit.
    pub pipeline_depth_add: i64,
    /// Pipeline depth of the vector multiply unit.
    pub pipeline_depth_mul: i64,
    /// Pipeline depth of the vector divide unit.
    pub pipeline_depth_div: i64,
    /// Pipeline depth of the vector shuffle/pack unit.
    pub pipeline_depth_shuffle: i64,
    /// Front-end pipeline depth of the vector load/store unit.
    pub vls_pipeline_depth: i64,
    /// Number of banks in vector data memory.
    pub vdm_num_banks: i64,
    /// Cycles a bank remains busy after a single access.
    pub vdm_bank_busy_time: i64,
    /// Number of vector lanes.
    pub num_lanes: i64,
    /// Any keys present in the file beyond [`REQUIRED_KEYS`].
    pub extra: HashMap<String, i64>,
}

impl Config {
    /// Loads and validates a `Config.txt`-formatted file from disk.
    pub fn load_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| SimError::ConfigUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parses `Config.txt`-formatted text already in memory.
    ///
    /// `origin` is used only to annotate error messages (it need not be a
    /// real path — tests pass a synthetic one).
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let mut values: HashMap<String, i64> = HashMap::new();

        for raw_line in text.lines() {
            let without_comment = match raw_line.find('#') {
                Some(idx) => &raw_line[..idx],
                None => raw_line,
            };
            let line = without_comment.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.splitn(2, '=');
            let key = parts.next().unwrap_or_default().trim();
            let value_str = parts.next().ok_or_else(|| SimError::ConfigMalformedLine {
                path: origin.to_path_buf(),
                line: raw_line.to_string(),
            })?;
            let value_str = value_str.trim();
            if key.is_empty() || value_str.is_empty() {
                return Err(SimError::ConfigMalformedLine {
                    path: origin.to_path_buf(),
                    line: raw_line.to_string(),
                });
            }
            let value: i64 = value_str
                .parse()
                .map_err(|_| SimError::ConfigNotInteger {
                    key: key.to_string(),
                    value: value_str.to_string(),
                })?;
            values.insert(key.to_string(), value);
        }

        let mut take = |key: &str| -> Result<i64> {
            values
                .remove(key)
                .ok_or_else(|| SimError::ConfigMissingKey(key.to_string()))
        };

        let data_queue_depth = take("dataQueueDepth")?;
        let compute_queue_depth = take("computeQueueDepth")?;
        let pipeline_depth_add = take("pipelineDepthAdd")?;
        let pipeline_depth_mul = take("pipelineDepthMul")?;
        let pipeline_depth_div = take("pipelineDepthDiv")?;
        let pipeline_depth_shuffle = take("pipelineDepthShuffle")?;
        let vls_pipeline_depth = take("vlsPipelineDepth")?;
        let vdm_num_banks = take("vdmNumBanks")?;
        let vdm_bank_busy_time = take("vdmBankBusyTime")?;
        let num_lanes = take("numLanes")?;

        Ok(Self {
            data_queue_depth,
            compute_queue_depth,
            pipeline_depth_add,
            pipeline_depth_mul,
            pipeline_depth_div,
            pipeline_depth_shuffle,
            vls_pipeline_depth,
            vdm_num_banks,
            vdm_bank_busy_time,
            num_lanes,
            extra: values,
        })
    }

    /// Looks up a key by name, checking both the named fields and `extra`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<i64> {
        match key {
            "dataQueueDepth" => Some(self.data_queue_depth),
            "computeQueueDepth" => Some(self.compute_queue_depth),
            "pipelineDepthAdd" => Some(self.pipeline_depth_add),
            "pipelineDepthMul" => Some(self.pipeline_depth_mul),
            "pipelineDepthDiv" => Some(self.pipeline_depth_div),
            "pipelineDepthShuffle" => Some(self.pipeline_depth_shuffle),
            "vlsPipelineDepth" => Some(self.vls_pipeline_depth),
            "vdmNumBanks" => Some(self.vdm_num_banks),
            "vdmBankBusyTime" => Some(self.vdm_bank_busy_time),
            "numLanes" => Some(self.num_lanes),
            other => self.extra.get(other).copied(),
        }
    }

    /// Logs a single structured summary line for this configuration.
    ///
    /// Reimplements the original simulator's `printConfig` banner as a
    /// `tracing` event instead of raw stdout prints.
    pub fn log_summary(&self) {
        tracing::info!(
            data_queue_depth = self.data_queue_depth,
            compute_queue_depth = self.compute_queue_depth,
            pipeline_depth_add = self.pipeline_depth_add,
            pipeline_depth_mul = self.pipeline_depth_mul,
            pipeline_depth_div = self.pipeline_depth_div,
            pipeline_depth_shuffle = self.pipeline_depth_shuffle,
            vls_pipeline_depth = self.vls_pipeline_depth,
            vdm_num_banks = self.vdm_num_banks,
            vdm_bank_busy_time = self.vdm_bank_busy_time,
            num_lanes = self.num_lanes,
            "loaded VMIPS configuration"
        );
    }
}
