//! Row structs shared by the repositories and the store traits.

pub mod character;
pub mod status;
