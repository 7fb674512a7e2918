//! Unit tests for the deploy agent components

mod support;

mod test_fsm;
mod test_locator;
mod test_replace;
