pub mod invoice;

pub use invoice::{Correlation, CustomerInfo, Invoice, LineItem, ParseError};
