//! Integration test modules.

mod oxygenation_pipeline_test;
mod power_pipeline_test;
