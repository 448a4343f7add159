mod records;

pub use records::PostgresRecordRepo;
