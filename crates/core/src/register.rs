//! Register file identifiers shared across the decoder, scoreboard, and
//! hazard check.

/// Which register file an operand belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegFile {
    /// The 8-entry scalar register file.
    Scalar,
    /// The 8-entry vector register file.
    Vector,
}

impl RegFile {
    /// Name used in diagnostics (`"scalar"` / `"vector"`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            RegFile::Scalar => "scalar",
            RegFile::Vector => "vector",
        }
    }
}

/// Number of entries in each register file's scoreboard (spec.md §4.1).
pub const REGISTER_FILE_SIZE: usize = 8;

/// A single register reference: an index into one of the two register
/// files. The first entry of an instruction's operand list is the
/// destination (writer) by convention when the instruction has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegRef {
    /// Index into the named register file.
    pub index: usize,
    /// Which register file this index is in.
    pub file: RegFile,
}

impl RegRef {
    /// Creates a new register reference.
    #[must_use]
    pub const fn new(index: usize, file: RegFile) -> Self {
        Self { index, file }
    }

    /// Creates a scalar register reference.
    #[must_use]
    pub const fn scalar(index: usize) -> Self {
        Self::new(index, RegFile::Scalar)
    }

    /// Creates a vector register reference.
    #[must_use]
    pub const fn vector(index: usize) -> Self {
        Self::new(index, RegFile::Vector)
    }
}
