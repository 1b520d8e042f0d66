pub mod aggregate;
pub mod motivation;
pub mod ratchet;
pub mod streak;
pub mod strength;
