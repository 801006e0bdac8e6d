pub mod confirmation;
pub mod jwt;
