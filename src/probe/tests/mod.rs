mod engine;
mod engine_proptest;
