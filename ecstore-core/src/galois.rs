//! GF(2^8) arithmetic
//!
//! The field is generated by the primitive polynomial
//! `x^8 + x^4 + x^3 + x^2 + 1` (0x11D) with generator 2. Exponent and
//! logarithm tables are built at compile time.

/// Primitive polynomial used to reduce products.
const POLYNOMIAL: u16 = 0x11D;

/// Order of the multiplicative group.
const GROUP_ORDER: usize = 255;

/// `EXP[i] = 2^i`, doubled in length so `LOG[a] + LOG[b]` never needs a modulo.
static EXP: [u8; 2 * GROUP_ORDER] = build_exp_table();

/// `LOG[2^i] = i`. `LOG[0]` is never read.
static LOG: [u8; 256] = build_log_table();

const fn build_exp_table() -> [u8; 2 * GROUP_ORDER] {
    let mut table = [0u8; 2 * GROUP_ORDER];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < GROUP_ORDER {
        table[i] = x as u8;
        table[i + GROUP_ORDER] = x as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= POLYNOMIAL;
        }
        i += 1;
    }
    table
}

const fn build_log_table() -> [u8; 256] {
    let exp = build_exp_table();
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < GROUP_ORDER {
        table[exp[i] as usize] = i as u8;
        i += 1;
    }
    table
}

/// Field addition (and subtraction).
#[inline]
pub fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Field multiplication.
#[inline]
pub fn mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    EXP[LOG[a as usize] as usize + LOG[b as usize] as usize]
}

/// Field division.
///
/// # Panics
/// Panics when `b` is zero.
#[inline]
pub fn div(a: u8, b: u8) -> u8 {
    assert!(b != 0, "division by zero in GF(2^8)");
    if a == 0 {
        return 0;
    }
    EXP[LOG[a as usize] as usize + GROUP_ORDER - LOG[b as usize] as usize]
}

/// Multiplicative inverse.
///
/// # Panics
/// Panics when `a` is zero.
#[inline]
pub fn inv(a: u8) -> u8 {
    div(1, a)
}

/// `a` raised to the power `n`.
pub fn exp(a: u8, n: usize) -> u8 {
    if n == 0 {
        return 1;
    }
    if a == 0 {
        return 0;
    }
    EXP[(LOG[a as usize] as usize * n) % GROUP_ORDER]
}

/// Row of the multiplication table for a fixed coefficient.
fn mul_row(c: u8) -> [u8; 256] {
    let mut row = [0u8; 256];
    for (x, out) in row.iter_mut().enumerate() {
        *out = mul(c, x as u8);
    }
    row
}

/// `dst[i] = c * src[i]`
pub fn mul_slice(c: u8, src: &[u8], dst: &mut [u8]) {
    debug_assert_eq!(src.len(), dst.len());
    match c {
        0 => dst.fill(0),
        1 => dst.copy_from_slice(src),
        _ => {
            let row = mul_row(c);
            for (d, s) in dst.iter_mut().zip(src) {
                *d = row[*s as usize];
            }
        }
    }
}

/// `dst[i] ^= c * src[i]`
pub fn mul_slice_add(c: u8, src: &[u8], dst: &mut [u8]) {
    debug_assert_eq!(src.len(), dst.len());
    match c {
        0 => {}
        1 => {
            for (d, s) in dst.iter_mut().zip(src) {
                *d ^= *s;
            }
        }
        _ => {
            let row = mul_row(c);
            for (d, s) in dst.iter_mut().zip(src) {
                *d ^= row[*s as usize];
            }
        }
    }
}
