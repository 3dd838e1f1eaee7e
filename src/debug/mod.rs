pub mod inspect;
pub mod runtime;
