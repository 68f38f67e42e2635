//! # Domain Services
//!
//! Pure functions used by the interpreter: hashing, contract address
//! derivation and the fork-indexed precompile address set.

use crate::domain::hardfork::Hardfork;
use crate::domain::value_objects::{Address, Hash};
use sha3::{Digest, Keccak256};

// =============================================================================
// CONTRACT ADDRESS COMPUTATION
// =============================================================================

/// Computes the contract address for CREATE opcode.
///
/// Address = keccak256(rlp(\[sender, nonce\]))\[12:\]
///
/// Per Ethereum Yellow Paper, section 7.
#[must_use]
pub fn compute_contract_address(sender: Address, nonce: u64) -> Address {
    let mut content = Vec::with_capacity(30);

    // RLP encode address (20 bytes, 0x80 + 20 = 0x94)
    content.push(0x94);
    content.extend_from_slice(sender.as_bytes());

    // RLP encode nonce as a minimal big-endian integer
    let nonce_bytes = nonce.to_be_bytes();
    let significant = &nonce_bytes[(nonce.leading_zeros() / 8) as usize..];
    match significant {
        [] => content.push(0x80),
        [byte] if *byte < 0x80 => content.push(*byte),
        bytes => {
            content.push(0x80 + bytes.len() as u8);
            content.extend_from_slice(bytes);
        }
    }

    // Payload never exceeds 30 bytes, so the short list header applies
    let mut rlp_data = Vec::with_capacity(content.len() + 1);
    rlp_data.push(0xc0 + content.len() as u8);
    rlp_data.extend_from_slice(&content);

    // Hash and take last 20 bytes
    let hash = Keccak256::digest(&rlp_data);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..32]);
    Address::new(addr)
}

/// Computes the contract address for CREATE2 opcode.
///
/// Address = keccak256(0xff ++ sender ++ salt ++ `keccak256(init_code)`)\[12:\]
///
/// Per EIP-1014.
#[must_use]
pub fn compute_contract_address_create2(sender: Address, salt: Hash, init_code: &[u8]) -> Address {
    let code_hash = Keccak256::digest(init_code);

    let mut data = Vec::with_capacity(85);
    data.push(0xff);
    data.extend_from_slice(sender.as_bytes());
    data.extend_from_slice(salt.as_bytes());
    data.extend_from_slice(&code_hash);

    let hash = Keccak256::digest(&data);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..32]);
    Address::new(addr)
}

// =============================================================================
// KECCAK256 UTILITY
// =============================================================================

/// Computes keccak256 hash of data.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let hash = Keccak256::digest(data);
    Hash::new(hash.into())
}

/// Hash of code, short-circuiting the empty case.
#[must_use]
pub fn code_hash(code: &[u8]) -> Hash {
    if code.is_empty() {
        crate::domain::entities::Account::EMPTY_CODE_HASH
    } else {
        keccak256(code)
    }
}

// =============================================================================
// PRECOMPILE ADDRESSES
// =============================================================================

/// Standard Ethereum precompile addresses.
pub mod precompiles {
    use super::{Address, Hardfork};

    /// ecrecover (0x01)
    pub const ECRECOVER: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);

    /// SHA256 (0x02)
    pub const SHA256: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);

    /// RIPEMD160 (0x03)
    pub const RIPEMD160: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3]);

    /// Identity / data copy (0x04)
    pub const IDENTITY: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 4]);

    /// Blake2f (0x09)
    pub const BLAKE2F: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 9]);

    /// KZG point evaluation (0x0a)
    pub const POINT_EVALUATION: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x0a]);

    /// Highest precompile number active at `fork`.
    ///
    /// | Fork | Range |
    /// |------|-------|
    /// | Frontier | 0x01-0x04 |
    /// | Byzantium | + modexp, bn254 add/mul/pairing (0x05-0x08) |
    /// | Istanbul | + blake2f (0x09) |
    /// | Cancun | + point evaluation (0x0a) |
    /// | Prague | + BLS12-381 (0x0b-0x11) |
    #[must_use]
    pub const fn highest(fork: Hardfork) -> u8 {
        if fork.is_enabled_in(Hardfork::Prague) {
            0x11
        } else if fork.is_enabled_in(Hardfork::Cancun) {
            0x0a
        } else if fork.is_enabled_in(Hardfork::Istanbul) {
            0x09
        } else if fork.is_enabled_in(Hardfork::Byzantium) {
            0x08
        } else {
            0x04
        }
    }

    /// Returns true if `address` is a precompile at `fork`.
    #[must_use]
    pub fn is_active(address: &Address, fork: Hardfork) -> bool {
        let bytes = address.as_bytes();
        bytes[..19] == [0u8; 19] && (1..=highest(fork)).contains(&bytes[19])
    }

    /// All precompile addresses active at `fork`, in ascending order.
    pub fn active(fork: Hardfork) -> impl Iterator<Item = Address> {
        (1..=highest(fork)).map(|n| Address::from_low_u64(u64::from(n)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Account;

    fn addr(hex: &str) -> Address {
        let bytes: Vec<u8> = (0..40)
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
            .collect();
        Address::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_compute_contract_address_known_vectors() {
        let sender = addr("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");
        assert_eq!(
            compute_contract_address(sender, 0),
            addr("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d")
        );
        assert_eq!(
            compute_contract_address(sender, 1),
            addr("343c43a37d37dff08ae8c4a11544c718abb4fcf8")
        );
    }

    #[test]
    fn test_compute_contract_address_large_nonce() {
        let sender = Address::new([1u8; 20]);
        let a = compute_contract_address(sender, 0x7f);
        let b = compute_contract_address(sender, 0x80);
        let c = compute_contract_address(sender, u64::MAX);
        assert_ne!(a, b);
        assert_ne!(b, c);
    }

    #[test]
    fn test_create2_eip1014_example() {
        // EIP-1014 example 0: zero sender, zero salt, init code 0x00
        let computed = compute_contract_address_create2(Address::ZERO, Hash::ZERO, &[0x00]);
        assert_eq!(computed, addr("4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38"));
    }

    #[test]
    fn test_create2_deterministic() {
        let sender = Address::new([1u8; 20]);
        let salt = Hash::new([42u8; 32]);
        let init_code = vec![0x00];

        let addr1 = compute_contract_address_create2(sender, salt, &init_code);
        let addr2 = compute_contract_address_create2(sender, salt, &init_code);
        assert_eq!(addr1, addr2);

        let other = compute_contract_address_create2(sender, Hash::new([2u8; 32]), &init_code);
        assert_ne!(addr1, other);
    }

    #[test]
    fn test_keccak256_empty_matches_constant() {
        assert_eq!(keccak256(&[]), Account::EMPTY_CODE_HASH);
        assert_eq!(code_hash(&[]), Account::EMPTY_CODE_HASH);
    }

    #[test]
    fn test_precompile_set_grows_with_forks() {
        assert!(precompiles::is_active(&precompiles::IDENTITY, Hardfork::Frontier));
        assert!(!precompiles::is_active(&Address::from_low_u64(5), Hardfork::Homestead));
        assert!(precompiles::is_active(&Address::from_low_u64(5), Hardfork::Byzantium));
        assert!(!precompiles::is_active(&precompiles::BLAKE2F, Hardfork::Petersburg));
        assert!(precompiles::is_active(&precompiles::POINT_EVALUATION, Hardfork::Cancun));
        assert!(!precompiles::is_active(&Address::from_low_u64(0x0b), Hardfork::Cancun));
        assert!(!precompiles::is_active(&Address::ZERO, Hardfork::Osaka));
        assert_eq!(precompiles::active(Hardfork::Berlin).count(), 9);
    }
}
