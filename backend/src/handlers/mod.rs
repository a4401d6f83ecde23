//! HTTP request handlers for the StockLedger API

pub mod adjustment;
pub mod health;
pub mod ledger;
pub mod product;
pub mod purchase;
pub mod reporting;
pub mod sale;
pub mod stock;
pub mod supplier;
pub mod transfer;
pub mod warehouse;

pub use adjustment::*;
pub use health::*;
pub use ledger::*;
pub use product::*;
pub use purchase::*;
pub use reporting::*;
pub use sale::*;
pub use stock::*;
pub use supplier::*;
pub use transfer::*;
pub use warehouse::*;
