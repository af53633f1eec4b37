//! Inputs from the animation side: key time and per-block influence.

use std::borrow::Cow;

use crate::key::KeyBlock;

/// Supplies the key time for a frame and the influence of each block.
pub trait KeyDriver {
    /// Key time at `frame`. Defaults to a hundred-frame ramp over `[0, 1]`.
    fn key_time(&self, frame: f64) -> f64 {
        (frame / 100.0).clamp(0.0, 1.0)
    }

    /// Influence of `block` in relative mode. Defaults to the stored value.
    fn block_value(&self, block: &KeyBlock) -> f64 {
        block.value
    }
}

/// Driver that uses the default ramp and stored values.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredValues;

impl KeyDriver for StoredValues {}

/// Driver mapping frames to key time through a closure.
pub struct TimeCurve<F>(pub F);

impl<F: Fn(f64) -> f64> KeyDriver for TimeCurve<F> {
    fn key_time(&self, frame: f64) -> f64 {
        (self.0)(frame)
    }
}

/// Per-element weights looked up by vertex-group name.
pub trait VertexGroupSource {
    fn weights(&self, name: &str) -> Option<Cow<'_, [f64]>>;
}

impl VertexGroupSource for std::collections::HashMap<String, Vec<f64>> {
    fn weights(&self, name: &str) -> Option<Cow<'_, [f64]>> {
        self.get(name).map(|w| Cow::Borrowed(w.as_slice()))
    }
}
