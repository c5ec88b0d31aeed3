use std::fmt;

/// Every failure kind the crate can surface, gathered in one enum with a
/// hand-written `Display` rather than a derive-macro error crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WfcError {
    /// Weight <= 0, duplicate module id, or adjacency referencing an unknown id.
    InvalidCatalog(String),
    /// Dimensions are zero, or a coordinate from a public API call falls outside the grid.
    InvalidDimensions { width: usize, height: usize },
    InvalidCoordinate { x: usize, y: usize },
    NoModulesDefined,
    /// Internal, transient: a cell's possibility set emptied out. Always
    /// resolved by backtrack or escalated to `UnsatisfiableAfterBacktracking`.
    Contradiction,
    /// The entire search space was exhausted. Final, user-visible.
    UnsatisfiableAfterBacktracking,
    /// A cell's only remaining candidates are all at their global cap.
    CapExhausted,
    /// Snapshot stack depth exceeded a caller-configured budget.
    OutOfBudget,
    JsonParseError(String),
}

impl fmt::Display for WfcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WfcError::InvalidCatalog(reason) => write!(f, "invalid catalog: {}", reason),
            WfcError::InvalidDimensions { width, height } => {
                write!(f, "invalid dimensions: {}x{}", width, height)
            }
            WfcError::InvalidCoordinate { x, y } => {
                write!(f, "coordinate ({}, {}) is outside the grid", x, y)
            }
            WfcError::NoModulesDefined => write!(f, "no modules defined in the catalog"),
            WfcError::Contradiction => write!(f, "contradiction reached, generation failed"),
            WfcError::UnsatisfiableAfterBacktracking => {
                write!(f, "search space exhausted, no satisfying grid exists")
            }
            WfcError::CapExhausted => write!(f, "global module cap exhausted for this cell"),
            WfcError::OutOfBudget => write!(f, "snapshot stack exceeded its configured budget"),
            WfcError::JsonParseError(msg) => write!(f, "JSON parse error: {}", msg),
        }
    }
}

impl std::error::Error for WfcError {}
