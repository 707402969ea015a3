pub mod counter;
pub mod invoice;
pub mod invoice_line;
pub mod lead;
pub mod member;
pub mod quote;
pub mod quote_line;
pub mod share_gp;
