pub mod client;
pub mod code;
pub mod error;
pub mod types;

pub use client::{IssuedDiscount, ShopifyDiscountClient};
pub use code::generate_discount_code;
pub use error::ShopifyError;
pub use types::{DiscountCode, PriceRule};
