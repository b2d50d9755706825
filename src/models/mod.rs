pub mod cart;
pub mod checkout;
pub mod common;
pub mod program;
