//! Content-based hashing of geometric state
//!
//! Warped meshes are reused across incremental rebuilds when the geometric
//! state that generated them hashes identically. Floats are snapped to a
//! fixed 1/8192 grid before mixing so floating point noise does not defeat
//! reuse. Two interchangeable strategies exist for backward compatibility
//! with previously persisted registries: a classic multiplicative hash and
//! an MD5 digest folded down to 32 bits. The method tag is stored alongside
//! any persisted registry; mixing records from different methods is refused
//! rather than silently invalidating them.

use glam::{Mat4, Vec3};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Grid granularity used to absorb floating point noise before hashing.
pub const ROUNDING_GRID: f32 = 1.0 / 8192.0;

/// Snap a value to the hashing grid.
pub fn round_to_grid(value: f32) -> f32 {
    (value * 8192.0).round() / 8192.0
}

/// Which hashing strategy a track (and any registry persisted from it) uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashMethod {
    /// Classic multiplicative accumulator. Matches registries produced by
    /// older project versions.
    Simple,
    /// MD5 digest XOR-folded to 32 bits.
    #[default]
    Md5,
}

impl HashMethod {
    /// Create a fresh hasher for this method.
    pub fn hasher(&self) -> Box<dyn GeometryHasher> {
        match self {
            HashMethod::Simple => Box::new(SimpleHasher::new()),
            HashMethod::Md5 => Box::new(Md5Hasher::new()),
        }
    }
}

/// Accumulator for hashing mixed-type geometric state.
///
/// Equal sequences of mixed-in values must produce equal hashes; the result
/// is a pure function of the values written.
pub trait GeometryHasher {
    fn write_i32(&mut self, value: i32);

    /// Mix in a float's exact bit pattern.
    fn write_f32(&mut self, value: f32);

    fn write_bool(&mut self, value: bool) {
        self.write_i32(value as i32);
    }

    /// Mix in a float snapped to the 1/8192 grid.
    fn write_rounded_f32(&mut self, value: f32) {
        self.write_f32(round_to_grid(value));
    }

    fn write_vec3(&mut self, value: Vec3) {
        self.write_rounded_f32(value.x);
        self.write_rounded_f32(value.y);
        self.write_rounded_f32(value.z);
    }

    fn write_mat4(&mut self, value: &Mat4) {
        for component in value.to_cols_array() {
            self.write_rounded_f32(component);
        }
    }

    /// Finalize to a 32-bit hash. Does not reset the accumulator.
    fn finish(&self) -> i32;
}

/// Distinguishes negative floats from their mirror-positive twins, which
/// would otherwise collide once the sign is stripped.
const NEGATIVE_MARKER: i32 = 486_187_739;

/// Classic multiplicative hash (`hash = hash * 23 + value`, wrapping).
pub struct SimpleHasher {
    hash: i32,
}

impl SimpleHasher {
    pub fn new() -> Self {
        Self { hash: 17 }
    }
}

impl Default for SimpleHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryHasher for SimpleHasher {
    fn write_i32(&mut self, value: i32) {
        self.hash = self.hash.wrapping_mul(23).wrapping_add(value);
    }

    fn write_f32(&mut self, value: f32) {
        // Hash the magnitude's bit pattern; negatives mix a marker first so
        // +x and -x land in different buckets.
        let magnitude = if value < 0.0 {
            self.write_i32(NEGATIVE_MARKER);
            -value
        } else {
            value
        };
        self.write_i32(magnitude.to_bits() as i32);
    }

    fn finish(&self) -> i32 {
        self.hash
    }
}

/// MD5-based hasher: accumulates raw little-endian bytes, finalizes via the
/// digest, XOR-folds the 16 bytes down to a 32-bit value.
pub struct Md5Hasher {
    digest: Md5,
}

impl Md5Hasher {
    pub fn new() -> Self {
        Self { digest: Md5::new() }
    }
}

impl Default for Md5Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryHasher for Md5Hasher {
    fn write_i32(&mut self, value: i32) {
        self.digest.update(value.to_le_bytes());
    }

    fn write_f32(&mut self, value: f32) {
        self.digest.update(value.to_bits().to_le_bytes());
    }

    fn finish(&self) -> i32 {
        let bytes = self.digest.clone().finalize();
        let mut folded = 0i32;
        for word in bytes.chunks_exact(4) {
            folded ^= i32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        }
        folded
    }
}
