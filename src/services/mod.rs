pub mod catalog;
pub mod discounts;
