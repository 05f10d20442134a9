// Crypto module declarations

pub mod convert;
pub mod hash;
pub mod keys;
pub mod secretbox;
