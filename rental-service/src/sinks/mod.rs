pub mod bill_store;

pub use bill_store::BillStoreSink;
