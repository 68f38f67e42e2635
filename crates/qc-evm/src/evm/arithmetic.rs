//! # Word Arithmetic
//!
//! 256-bit operations with EVM semantics: modular wraparound, two's
//! complement for the signed family and zero (not a trap) for division by
//! zero.

use crate::domain::value_objects::U256;
use primitive_types::U512;

/// Two's complement negation.
#[inline]
fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

#[inline]
fn is_negative(value: U256) -> bool {
    value.bit(255)
}

#[inline]
fn abs(value: U256) -> U256 {
    if is_negative(value) {
        negate(value)
    } else {
        value
    }
}

/// Signed less than (SLT).
#[must_use]
pub fn signed_lt(a: U256, b: U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

/// Unsigned division (DIV).
#[must_use]
pub fn div(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        U256::zero()
    } else {
        a / b
    }
}

/// Unsigned modulo (MOD).
#[must_use]
pub fn rem(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        U256::zero()
    } else {
        a % b
    }
}

/// Signed division (SDIV). `MIN / -1` wraps to `MIN`.
#[must_use]
pub fn signed_div(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let result = abs(a) / abs(b);
    if is_negative(a) == is_negative(b) {
        result
    } else {
        negate(result)
    }
}

/// Signed modulo (SMOD). The result takes the sign of the dividend.
#[must_use]
pub fn signed_mod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let result = abs(a) % abs(b);
    if is_negative(a) {
        negate(result)
    } else {
        result
    }
}

fn u256_to_u512(value: U256) -> U512 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes[32..]);
    U512::from_big_endian(&bytes)
}

fn u512_to_u256(value: U512) -> U256 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes);
    U256::from_big_endian(&bytes[32..])
}

/// `(a + b) % n` without intermediate overflow (ADDMOD).
#[must_use]
pub fn add_mod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    u512_to_u256((u256_to_u512(a) + u256_to_u512(b)) % u256_to_u512(n))
}

/// `(a * b) % n` without intermediate overflow (MULMOD).
#[must_use]
pub fn mul_mod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    u512_to_u256(a.full_mul(b) % u256_to_u512(n))
}

/// Exponentiation by squaring, modulo 2^256 (EXP).
#[must_use]
pub fn exp(base: U256, mut exponent: U256) -> U256 {
    let mut result = U256::one();
    let mut base = base;
    while !exponent.is_zero() {
        if exponent.bit(0) {
            result = result.overflowing_mul(base).0;
        }
        exponent >>= 1;
        base = base.overflowing_mul(base).0;
    }
    result
}

/// Sign-extends `value` from byte `byte_index` (0 = lowest byte).
#[must_use]
pub fn sign_extend(byte_index: U256, value: U256) -> U256 {
    if byte_index >= U256::from(31) {
        return value;
    }
    let bit = byte_index.low_u64() as usize * 8 + 7;
    let mask = (U256::one() << bit) - 1;
    if value.bit(bit) {
        value | !mask
    } else {
        value & mask
    }
}

/// BYTE: the `index`-th byte counting from the most significant.
#[must_use]
pub fn byte(index: U256, value: U256) -> U256 {
    if index >= U256::from(32) {
        return U256::zero();
    }
    U256::from(value.byte(31 - index.low_u64() as usize))
}

/// SHL.
#[must_use]
pub fn shl(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        U256::zero()
    } else {
        value << shift.low_u64() as usize
    }
}

/// SHR.
#[must_use]
pub fn shr(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        U256::zero()
    } else {
        value >> shift.low_u64() as usize
    }
}

/// Arithmetic shift right (SAR).
#[must_use]
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(value);
    if shift >= U256::from(256) {
        return if negative { U256::MAX } else { U256::zero() };
    }
    let shift = shift.low_u64() as usize;
    let shifted = value >> shift;
    if negative && shift > 0 {
        shifted | (U256::MAX << (256 - shift))
    } else {
        shifted
    }
}

/// Count leading zeros (CLZ); 256 for zero.
#[must_use]
pub fn clz(value: U256) -> U256 {
    U256::from(value.leading_zeros())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn neg(n: u64) -> U256 {
        negate(U256::from(n))
    }

    #[test]
    fn test_signed_lt() {
        let neg_one = U256::MAX;
        let one = U256::one();

        assert!(signed_lt(neg_one, one));
        assert!(!signed_lt(one, neg_one));
        assert!(!signed_lt(one, one));
        assert!(signed_lt(neg(5), neg(2)));
    }

    #[test]
    fn test_division_by_zero_is_zero() {
        assert_eq!(div(U256::from(7), U256::zero()), U256::zero());
        assert_eq!(rem(U256::from(7), U256::zero()), U256::zero());
        assert_eq!(signed_div(neg(7), U256::zero()), U256::zero());
        assert_eq!(signed_mod(neg(7), U256::zero()), U256::zero());
        assert_eq!(add_mod(U256::one(), U256::one(), U256::zero()), U256::zero());
        assert_eq!(mul_mod(U256::one(), U256::one(), U256::zero()), U256::zero());
    }

    #[test]
    fn test_signed_div_and_mod() {
        assert_eq!(signed_div(neg(10), U256::from(3)), neg(3));
        assert_eq!(signed_div(neg(10), neg(3)), U256::from(3));
        assert_eq!(signed_mod(neg(10), U256::from(3)), neg(1));
        assert_eq!(signed_mod(U256::from(10), neg(3)), U256::one());

        let min = U256::one() << 255;
        assert_eq!(signed_div(min, U256::MAX), min);
    }

    #[test]
    fn test_modular_arithmetic() {
        assert_eq!(add_mod(U256::MAX, U256::from(2), U256::from(2)), U256::one());
        assert_eq!(mul_mod(U256::MAX, U256::MAX, U256::from(12)), U256::from(9));
    }

    #[test]
    fn test_exp() {
        assert_eq!(exp(U256::from(2), U256::zero()), U256::one());
        assert_eq!(exp(U256::from(2), U256::from(10)), U256::from(1024));
        assert_eq!(exp(U256::from(3), U256::from(3)), U256::from(27));
        assert_eq!(exp(U256::from(2), U256::from(256)), U256::zero());
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(U256::zero(), U256::from(0xFF)), U256::MAX);
        assert_eq!(sign_extend(U256::zero(), U256::from(0x7F)), U256::from(0x7F));
        assert_eq!(sign_extend(U256::one(), U256::from(0x01FF)), U256::from(0x01FF));
        assert_eq!(sign_extend(U256::from(40), U256::from(0xFF)), U256::from(0xFF));
    }

    #[test]
    fn test_byte() {
        let value = U256::from(0x1234);
        assert_eq!(byte(U256::from(31), value), U256::from(0x34));
        assert_eq!(byte(U256::from(30), value), U256::from(0x12));
        assert_eq!(byte(U256::zero(), value), U256::zero());
        assert_eq!(byte(U256::from(32), value), U256::zero());
    }

    #[test]
    fn test_shifts() {
        assert_eq!(shl(U256::one(), U256::one()), U256::from(2));
        assert_eq!(shl(U256::from(256), U256::one()), U256::zero());
        assert_eq!(shr(U256::one(), U256::from(4)), U256::from(2));
        assert_eq!(sar(U256::one(), neg(4)), neg(2));
        assert_eq!(sar(U256::from(300), neg(4)), U256::MAX);
        assert_eq!(sar(U256::from(300), U256::from(4)), U256::zero());
        assert_eq!(sar(U256::zero(), neg(4)), neg(4));
    }

    #[test]
    fn test_clz() {
        assert_eq!(clz(U256::zero()), U256::from(256));
        assert_eq!(clz(U256::one()), U256::from(255));
        assert_eq!(clz(U256::MAX), U256::zero());
    }

    proptest! {
        #[test]
        fn prop_signed_div_mod_identity(a in any::<u64>(), b in 1u64..) {
            // a = b * (a sdiv b) + (a smod b) for negative dividends too
            let a = negate(U256::from(a));
            let b = U256::from(b);
            let q = signed_div(a, b);
            let r = signed_mod(a, b);
            prop_assert_eq!(b.overflowing_mul(q).0.overflowing_add(r).0, a);
        }
    }
}
