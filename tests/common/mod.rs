//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use std::sync::{Arc, Mutex};
use vispipe::pipeline::{DataSource, MemorySource, NodeId, Observer};

/// Observer that records every update it receives, in order.
#[derive(Default)]
pub struct RecordingObserver {
    seen: Mutex<Vec<NodeId>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<NodeId> {
        self.seen.lock().unwrap().clone()
    }
}

impl Observer for RecordingObserver {
    fn update(&self, node: NodeId) {
        self.seen.lock().unwrap().push(node);
    }
}

/// Single-channel in-memory source.
pub fn series_source(samples: &[f64]) -> Arc<dyn DataSource> {
    Arc::new(MemorySource::new("mem://test").with_channel(samples.to_vec()))
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
