//! Database query functions organized by domain.

pub mod campaigns;
pub mod distributions;
pub mod revenue;
pub mod royalties;
pub mod settings;
