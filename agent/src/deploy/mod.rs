//! Deployment pipeline and its stages

pub mod command;
pub mod docker;
pub mod error;
pub mod fsm;
pub mod git;
pub mod image;
pub mod locator;
pub mod pipeline;
pub mod replace;
pub mod workspace;
