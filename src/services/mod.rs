//! Service layer: all business rules live here, each service owning a slice
//! of the document workflow and talking to the database through sea-orm.

pub mod invoices;
pub mod pricing;
pub mod profit_sharing;
pub mod quotes;
pub mod sequence;

pub use invoices::InvoiceService;
pub use profit_sharing::ProfitSharingService;
pub use quotes::QuoteService;
pub use sequence::SequenceService;
