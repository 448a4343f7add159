mod records;

pub use records::SqliteRecordRepo;
