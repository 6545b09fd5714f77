//! Morton encoding (Z-order curve) used for packed chunk keys

/// Bits available per axis in a 64-bit 3D Morton code
pub const AXIS_BITS: u32 = 21;

/// Largest value a single axis can hold
pub const AXIS_MAX: u32 = (1 << AXIS_BITS) - 1;

/// Spread the low 21 bits of `v` into every third bit of a u64
fn spread_bits(v: u32) -> u64 {
    let mut x = v as u64 & AXIS_MAX as u64;
    x = (x | (x << 32)) & 0x001f_0000_0000_ffff;
    x = (x | (x << 16)) & 0x001f_0000_ff00_00ff;
    x = (x | (x << 8)) & 0x100f_00f0_0f00_f00f;
    x = (x | (x << 4)) & 0x10c3_0c30_c30c_30c3;
    x = (x | (x << 2)) & 0x1249_2492_4924_9249;
    x
}

/// Inverse of [`spread_bits`]
fn compact_bits(code: u64) -> u32 {
    let mut x = code & 0x1249_2492_4924_9249;
    x = (x | (x >> 2)) & 0x10c3_0c30_c30c_30c3;
    x = (x | (x >> 4)) & 0x100f_00f0_0f00_f00f;
    x = (x | (x >> 8)) & 0x001f_0000_ff00_00ff;
    x = (x | (x >> 16)) & 0x001f_0000_0000_ffff;
    x = (x | (x >> 32)) & AXIS_MAX as u64;
    x as u32
}

/// Interleave three axes into one code, or `None` if any axis exceeds [`AXIS_MAX`].
pub fn encode(x: u32, y: u32, z: u32) -> Option<u64> {
    if x > AXIS_MAX || y > AXIS_MAX || z > AXIS_MAX {
        return None;
    }
    Some(spread_bits(x) | (spread_bits(y) << 1) | (spread_bits(z) << 2))
}

/// Split a code produced by [`encode`] back into its axes
pub fn decode(code: u64) -> (u32, u32, u32) {
    (
        compact_bits(code),
        compact_bits(code >> 1),
        compact_bits(code >> 2),
    )
}
