mod records;

pub use records::*;

/// Maximum rows bound into a single multi-row INSERT.
///
/// SQLite caps bound parameters at 32766 and PostgreSQL at 65535; two columns
/// per row keeps well below both.
pub const INSERT_CHUNK_SIZE: usize = 1000;
