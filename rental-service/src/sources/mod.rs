pub mod bill_csv_file;
pub mod bill_ndjson_file;

pub use bill_csv_file::BillCsvFileSource;
pub use bill_ndjson_file::BillNdjsonFileSource;
