mod invoice_dto;
mod upload_dto;

pub use invoice_dto::{ClassifyInvoiceDto, InvoiceDto};
pub use upload_dto::{content_type_for, UploadRequestDto, UploadResponseDto, ValidatedUpload};
