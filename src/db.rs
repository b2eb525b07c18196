pub mod tax_document_repo;
pub use tax_document_repo::TaxDocumentRepository;
pub mod sequence_repo;
pub use sequence_repo::SequenceRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
