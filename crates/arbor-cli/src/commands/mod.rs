pub mod access;
pub mod inspect;
