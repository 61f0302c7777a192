mod invoice_handler;
mod upload_handler;

pub use invoice_handler::*;
pub use upload_handler::*;
