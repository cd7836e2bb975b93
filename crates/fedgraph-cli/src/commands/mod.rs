pub mod compose;
pub mod resolve;
pub mod validate;
