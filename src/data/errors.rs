//! Errors raised while assembling or querying a [`DMLData`](super::DMLData).
//!
//! All variants are structural: they describe malformed inputs (shapes,
//! names, non-finite values) and are raised eagerly at construction.

/// Result alias for data-container operations.
pub type DataResult<T> = Result<T, DataError>;

#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    // ---- Shapes ----
    /// A block does not have the expected number of rows.
    LengthMismatch { what: &'static str, expected: usize, found: usize },

    /// Number of names supplied for a block differs from its column count.
    ColumnCountMismatch { what: &'static str, names: usize, columns: usize },

    /// Dataset has no observations.
    NoObservations,

    /// At least one treatment column is required.
    NoTreatment,

    /// Treatment index outside `0..n_treat`.
    TreatmentIndexOutOfRange { index: usize, n_treat: usize },

    /// ndarray refused to stack blocks.
    Shape { reason: String },

    // ---- Values ----
    /// Non-finite entry in a numeric column.
    NonFiniteValue { column: String, row: usize, value: f64 },

    /// Cluster identifiers must be integral.
    NonIntegerClusterId { column: String, row: usize, value: f64 },

    /// Cluster identifier does not fit in an `i64`.
    ClusterIdOutOfRange { column: String, row: usize, value: f64 },

    // ---- Column roles ----
    /// Column name appears more than once.
    DuplicateColumn { name: String },

    /// Role refers to a column that does not exist.
    UnknownColumn { name: String },

    /// Column assigned to two roles at once.
    OverlappingRoles { name: String, first: &'static str, second: &'static str },
}

impl std::error::Error for DataError {}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Shapes ----
            DataError::LengthMismatch { what, expected, found } => {
                write!(f, "Data Error: {what} has {found} rows, expected {expected}")
            }
            DataError::ColumnCountMismatch { what, names, columns } => {
                write!(f, "Data Error: {names} names supplied for {columns} {what} columns")
            }
            DataError::NoObservations => write!(f, "Data Error: dataset has no observations"),
            DataError::NoTreatment => write!(f, "Data Error: at least one treatment is required"),
            DataError::TreatmentIndexOutOfRange { index, n_treat } => {
                write!(f, "Data Error: treatment index {index} out of range for {n_treat} treatments")
            }
            DataError::Shape { reason } => write!(f, "Data Error: {reason}"),

            // ---- Values ----
            DataError::NonFiniteValue { column, row, value } => {
                write!(f, "Data Error: column '{column}' has non-finite value {value} at row {row}")
            }
            DataError::NonIntegerClusterId { column, row, value } => write!(
                f,
                "Data Error: cluster column '{column}' has non-integer id {value} at row {row}"
            ),
            DataError::ClusterIdOutOfRange { column, row, value } => write!(
                f,
                "Data Error: cluster column '{column}' has id {value} at row {row}, outside the 64-bit integer range"
            ),

            // ---- Column roles ----
            DataError::DuplicateColumn { name } => {
                write!(f, "Data Error: column '{name}' is defined more than once")
            }
            DataError::UnknownColumn { name } => {
                write!(f, "Data Error: column '{name}' does not exist")
            }
            DataError::OverlappingRoles { name, first, second } => write!(
                f,
                "Data Error: column '{name}' cannot be both {first} and {second}"
            ),
        }
    }
}
