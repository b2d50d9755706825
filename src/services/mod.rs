pub mod cart;
pub mod checkout;
pub mod database;
pub mod expiration;
pub mod orders;
pub mod programs;
