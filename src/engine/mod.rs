pub mod lifecycle;
pub mod order_code;
pub mod pricing;
