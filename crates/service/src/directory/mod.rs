pub mod country;
pub mod currency;
