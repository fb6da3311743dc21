#[path = "../fixtures/mod.rs"]
mod fixtures;

mod sync_engine_test;
