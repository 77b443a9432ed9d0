pub mod ledger;
pub mod seat_catalog;
pub mod ticket;

pub use ledger::{LedgerError, SeatLedger, ValidationResult};
pub use seat_catalog::SeatCatalog;
pub use ticket::{TicketCodeGenerator, TicketPayload};
