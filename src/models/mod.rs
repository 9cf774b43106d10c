pub mod discount;

pub use discount::DiscountRule;
