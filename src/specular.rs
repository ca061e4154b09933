//! Cache of specular falloff tables.
//!
//! Evaluating `pow(cos, shininess)` for every lit vertex is expensive. Instead, the falloff is
//! tabulated once per (quantized) shininess value, and lighting does a table lookup. Only a few
//! distinct shininess values are typically in use at once, so a small pool with least recently
//! used eviction is enough.

use alloc::{boxed::Box, vec::Vec};

/// Number of intervals in a specular table. Tables hold one more sample than this.
pub const SPECULAR_BUFFER_SIZE: usize = 1024;

/// Number of quantization steps across the `[0; 128]` shininess range.
pub const SPECULAR_BUFFER_RESOLUTION: usize = 1024;

/// Largest shininess value accepted by materials.
pub const MAX_SHININESS: f32 = 128.0;

/// Quantizes a shininess exponent into a cache key.
///
/// This is monotonic in `shininess`, and every value in a key's bucket maps to the same table.
pub fn quantize_shininess(shininess: f32) -> i32 {
    libm::roundf(shininess / MAX_SHININESS * SPECULAR_BUFFER_RESOLUTION as f32) as i32
}

/// Returns the shininess that tables of the given key are computed from.
pub fn dequantize_shininess(key: i32) -> f32 {
    key as f32 * MAX_SHININESS / SPECULAR_BUFFER_RESOLUTION as f32
}

/// A tabulated specular falloff.
#[derive(Debug, Clone)]
pub struct SpecularBuffer {
    key: i32,
    last_used: u64,
    buf: Box<[f32; SPECULAR_BUFFER_SIZE + 1]>,
}

impl SpecularBuffer {
    fn new(key: i32, last_used: u64) -> Self {
        let mut ret = Self {
            key,
            last_used,
            buf: Box::new([0.0; SPECULAR_BUFFER_SIZE + 1]),
        };
        ret.fill(key);
        ret
    }

    fn fill(&mut self, key: i32) {
        let shininess = dequantize_shininess(key);
        let inc = 1.0 / SPECULAR_BUFFER_SIZE as f32;

        self.key = key;
        for (i, v) in self.buf.iter_mut().enumerate() {
            *v = libm::powf(i as f32 * inc, shininess);
        }
    }

    pub fn key(&self) -> i32 {
        self.key
    }

    pub fn last_used(&self) -> u64 {
        self.last_used
    }

    pub fn samples(&self) -> &[f32] {
        &self.buf[..]
    }

    /// Looks up the falloff for a cosine in `[0; 1]`. Values outside are clamped.
    pub fn lookup(&self, cos: f32) -> f32 {
        let idx = (cos.max(0.0) * SPECULAR_BUFFER_SIZE as f32) as usize;
        self.buf[idx.min(SPECULAR_BUFFER_SIZE)]
    }
}

/// Bounded pool of [`SpecularBuffer`]s.
///
/// The pool never fails to produce a buffer: once it holds `capacity` buffers, the one that was
/// used the longest time ago is refilled for the new key.
#[derive(Debug, Clone)]
pub struct SpecularCache {
    buffers: Vec<SpecularBuffer>,
    capacity: usize,
    used_counter: u64,
    computations: usize,
}

impl SpecularCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: Vec::new(),
            capacity: capacity.max(1),
            used_counter: 0,
            computations: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffers currently alive.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Number of tables computed so far. Cache hits do not increase this.
    pub fn computations(&self) -> usize {
        self.computations
    }

    /// Whether a table for this shininess is currently cached. Does not touch usage stamps.
    pub fn contains(&self, shininess: f32) -> bool {
        let key = quantize_shininess(shininess);
        self.buffers.iter().any(|b| b.key == key)
    }

    pub fn get_buffer(&mut self, shininess: f32) -> &SpecularBuffer {
        let key = quantize_shininess(shininess);
        let stamp = self.used_counter;
        self.used_counter += 1;

        let idx = if let Some(idx) = self.buffers.iter().position(|b| b.key == key) {
            self.buffers[idx].last_used = stamp;
            idx
        } else if self.buffers.len() < self.capacity {
            self.computations += 1;
            self.buffers.push(SpecularBuffer::new(key, stamp));
            self.buffers.len() - 1
        } else {
            // Capacity is at least one, so the pool cannot be empty here.
            let idx = self
                .buffers
                .iter()
                .enumerate()
                .min_by_key(|(_, b)| b.last_used)
                .map(|(i, _)| i)
                .unwrap_or(0);

            log::debug!(
                "evicting specular table {} for {}",
                self.buffers[idx].key,
                key
            );

            self.computations += 1;
            let buf = &mut self.buffers[idx];
            buf.last_used = stamp;
            buf.fill(key);
            idx
        };

        &self.buffers[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::approx;

    #[test]
    fn repeated_lookup_is_a_hit() {
        let mut cache = SpecularCache::new(4);
        let first: Vec<f32> = cache.get_buffer(10.0).samples().to_vec();
        assert_eq!(cache.computations(), 1);

        let second = cache.get_buffer(10.0).samples();
        assert_eq!(first.as_slice(), second);
        assert_eq!(cache.computations(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_least_recently_used() {
        let n = 4;
        let mut cache = SpecularCache::new(n);
        let keys: Vec<f32> = (1..=n + 1).map(|i| i as f32 * 8.0).collect();

        for k in &keys[..n] {
            cache.get_buffer(*k);
        }
        assert_eq!(cache.computations(), n);

        cache.get_buffer(keys[n]);
        assert_eq!(cache.len(), n);
        assert_eq!(cache.computations(), n + 1);
        assert!(!cache.contains(keys[0]));

        for k in &keys[1..=n] {
            cache.get_buffer(*k);
        }
        assert_eq!(cache.computations(), n + 1);

        cache.get_buffer(keys[0]);
        assert_eq!(cache.computations(), n + 2);
    }

    #[test]
    fn hit_refreshes_stamp() {
        let mut cache = SpecularCache::new(2);
        cache.get_buffer(1.0);
        cache.get_buffer(2.0);
        // Touch 1.0 so 2.0 becomes the oldest.
        cache.get_buffer(1.0);
        cache.get_buffer(3.0);

        assert!(cache.contains(1.0));
        assert!(!cache.contains(2.0));
        assert!(cache.contains(3.0));
    }

    #[test]
    fn table_samples_pow() {
        let mut cache = SpecularCache::new(1);
        let buf = cache.get_buffer(2.0);
        assert_eq!(buf.samples().len(), SPECULAR_BUFFER_SIZE + 1);
        assert!(approx(buf.samples()[0], 0.0));
        assert!(approx(buf.samples()[SPECULAR_BUFFER_SIZE], 1.0));
        assert!(approx(buf.lookup(0.5), 0.25));
        assert!(approx(buf.lookup(2.0), 1.0));
    }

    #[test]
    fn quantization_is_monotonic() {
        let mut last = i32::MIN;
        for i in 0..=1280 {
            let key = quantize_shininess(i as f32 * 0.1);
            assert!(key >= last);
            last = key;
        }
        assert_eq!(quantize_shininess(128.0), SPECULAR_BUFFER_RESOLUTION as i32);
    }
}
