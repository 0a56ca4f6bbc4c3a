pub mod access;
pub mod expression;
