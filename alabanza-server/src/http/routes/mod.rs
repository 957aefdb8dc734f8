//! Route handlers organized by resource

pub mod alerts;
pub mod health;
pub mod mixes;
pub mod songs;
