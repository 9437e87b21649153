//! Quantization codec
//!
//! Fixed-point conversion shared by the kernel, the host and the references:
//! - Q, K and V are `i8` values scaled by the geometry's `QK_SCALE` / `V_SCALE`
//! - softmax numerators come from a 256-entry `u8` table approximating
//!   `exp(x / 32)`
//! - probabilities are `u8` values summing to roughly [`PROB_SCALE`]

pub mod codec;
pub mod lut;

pub use codec::{dequantize, dequantize_output, quantize, quantize_slice};
pub use lut::{build_exp_lut, lut_index, ExpLut};

/// Entries in the exponential lookup table
pub const LUT_SIZE: usize = 256;

/// Table index of a zero score delta
pub const LUT_BIAS: i32 = 128;

/// Exponent divisor: `LUT[i] ~ exp((i - 128) / 32)`
pub const LUT_EXP_SCALE: f64 = 32.0;

/// Probabilities in a row are renormalized to sum to this value
pub const PROB_SCALE: i32 = 255;
