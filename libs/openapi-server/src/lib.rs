//! Wire models served by the deploy agent HTTP API

pub mod models;
