//! Unit test modules.

mod balance_test;
mod smoothing_test;
