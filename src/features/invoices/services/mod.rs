mod invoice_service;

pub use invoice_service::{storage_key, CompensationPolicy, InvoiceService};
