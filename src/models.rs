pub mod payment;
pub mod session;
