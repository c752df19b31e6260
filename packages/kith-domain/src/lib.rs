pub mod consent;
pub mod fusion;
pub mod hash;
pub mod reasons;
pub mod text;
