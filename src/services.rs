pub mod numbering;
pub mod pdf_service;
pub mod tax_authority;
pub mod tax_document_service;
pub mod totals;

pub use numbering::DocumentNumberingService;
pub use pdf_service::PdfService;
pub use tax_authority::{SimulatedTaxAuthority, TaxAuthorityGateway};
pub use tax_document_service::TaxDocumentService;
