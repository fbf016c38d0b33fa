//! Integer fixed-point helpers.
//!
//! Every division in the allocator floors. Products that may not fit in
//! 128 bits go through [`mul_div`], which keeps a 256-bit intermediate and
//! floors exactly once.

/// Number of options on the grid.
pub const GRID_SIZE: usize = 25;

/// Basis-point denominator for `pool_skim_bps`.
pub const BPS_SCALE: u128 = 10_000;

/// Fixed-point scale for the shadow price λ and for marginal values.
pub const LAMBDA_SCALE: u128 = 1_000_000_000;

/// Upper bound on `existing pool + bankroll + reward value`.
/// Keeps every intermediate product of the value model inside u128.
pub const MAX_POOL_AMOUNT: u128 = 1 << 53;

const LOW_MASK: u128 = u64::MAX as u128;

/// Full 256-bit product of two u128 values as `(high, low)`.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    let (a_hi, a_lo) = (a >> 64, a & LOW_MASK);
    let (b_hi, b_lo) = (b >> 64, b & LOW_MASK);

    let lo_lo = a_lo * b_lo;
    let lo_hi = a_lo * b_hi;
    let hi_lo = a_hi * b_lo;
    let hi_hi = a_hi * b_hi;

    // < 3 * 2^64, cannot overflow
    let mid = (lo_lo >> 64) + (lo_hi & LOW_MASK) + (hi_lo & LOW_MASK);
    let low = (lo_lo & LOW_MASK) | ((mid & LOW_MASK) << 64);
    let high = hi_hi + (lo_hi >> 64) + (hi_lo >> 64) + (mid >> 64);
    (high, low)
}

/// `floor(a * b / d)` without intermediate overflow.
///
/// Returns `None` when `d == 0` or when the quotient does not fit in u128.
pub fn checked_mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    let (high, low) = widening_mul(a, b);
    if high == 0 {
        return Some(low / d);
    }
    if high >= d {
        return None;
    }

    // Restoring long division of the 256-bit numerator; `rem < d` on entry.
    let mut rem = high;
    let mut quotient: u128 = 0;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((low >> bit) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1;
        }
    }
    Some(quotient)
}

/// Saturating form of [`checked_mul_div`]: overflow and a zero divisor both
/// yield `u128::MAX`. Inputs validated against [`MAX_POOL_AMOUNT`] never
/// reach either case.
pub fn mul_div(a: u128, b: u128, d: u128) -> u128 {
    checked_mul_div(a, b, d).unwrap_or(u128::MAX)
}

/// Floor square root.
pub fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let bits = 128 - n.leading_zeros();
    // Start above the root; Newton's iteration then decreases monotonically.
    let mut x: u128 = 1 << ((bits + 1) / 2);
    loop {
        let y = (x + n / x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Round `amount` down to a multiple of `tick`.
pub fn floor_to_tick(amount: u64, tick: u64) -> u64 {
    if tick == 0 {
        return amount;
    }
    amount - amount % tick
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
