pub mod asset;
pub mod roster;
