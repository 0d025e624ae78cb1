pub mod account;
pub mod audit;
pub mod cashout;
pub mod fee;
pub mod ports;
pub mod reference;
pub mod transaction;
