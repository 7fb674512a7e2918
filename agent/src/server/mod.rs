//! Local HTTP trigger

pub mod handlers;
pub mod serve;
pub mod state;
