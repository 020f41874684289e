//! Keyword-to-bullet semantic matching module

pub mod bullets;
pub mod keywords;
pub mod similarity;
