use std::path::PathBuf;

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum SpindleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid disk geometry: {0}")]
    InvalidGeometry(String),

    #[error("no disk found at {0}")]
    DiskNotFound(PathBuf),

    #[error("table {0} does not exist")]
    TableNotFound(String),

    #[error("csv file {0} not found")]
    CsvNotFound(PathBuf),

    #[error("malformed csv: {0}")]
    Csv(String),

    #[error("unknown column type `{0}`")]
    UnknownType(String),

    #[error("schema does not fit in the header sector")]
    SchemaTooLarge,

    #[error("catalog sector is full")]
    CatalogFull,

    #[error("table header is corrupted")]
    CorruptHeader,

    #[error("no free sector available")]
    OutOfSpace,

    #[error("all frames are pinned, cannot evict")]
    AllPinned,

    #[error("cannot parse predicate: {0}")]
    Parse(String),

    #[error("invalid operands for `{op}`: {lhs} and {rhs}")]
    BadOperands {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("division by zero while evaluating predicate")]
    DivisionByZero,

    #[error("predicate did not evaluate to a boolean")]
    NotABoolean,

    #[error("unrecognized command: {0}")]
    UnknownCommand(String),
}

pub type Result<T> = std::result::Result<T, SpindleError>;
