//! # Hardforks
//!
//! Total order over the protocol upgrades the interpreter understands.
//! Fork-dependent behavior is expressed as "is `X` active", i.e. a
//! comparison against the activating fork, never as a per-fork match.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocol upgrade selecting opcode availability and gas pricing.
#[repr(u8)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Hardfork {
    /// Genesis rules.
    Frontier = 0,
    /// EIP-2, EIP-7 (DELEGATECALL).
    Homestead = 1,
    /// EIP-150 gas repricing and the 63/64 rule.
    TangerineWhistle = 2,
    /// EIP-160 EXP repricing, EIP-161 empty accounts, EIP-170 code size.
    SpuriousDragon = 3,
    /// REVERT, RETURNDATA, STATICCALL.
    Byzantium = 4,
    /// Shifts, CREATE2, EXTCODEHASH.
    Constantinople = 5,
    /// Constantinople without EIP-1283.
    Petersburg = 6,
    /// EIP-1884, EIP-2200, CHAINID, SELFBALANCE.
    Istanbul = 7,
    /// EIP-2929 warm/cold access, EIP-2930 access lists.
    Berlin = 8,
    /// BASEFEE, EIP-3529 refunds, EIP-3541.
    London = 9,
    /// PREVRANDAO replaces DIFFICULTY.
    Merge = 10,
    /// PUSH0, EIP-3860 init code metering, EIP-3651 warm coinbase.
    Shanghai = 11,
    /// Transient storage, MCOPY, blobs, EIP-6780.
    #[default]
    Cancun = 12,
    /// BLS12-381 precompiles.
    Prague = 13,
    /// CLZ.
    Osaka = 14,
}

impl Hardfork {
    /// Every fork in activation order.
    pub const ALL: [Self; 15] = [
        Self::Frontier,
        Self::Homestead,
        Self::TangerineWhistle,
        Self::SpuriousDragon,
        Self::Byzantium,
        Self::Constantinople,
        Self::Petersburg,
        Self::Istanbul,
        Self::Berlin,
        Self::London,
        Self::Merge,
        Self::Shanghai,
        Self::Cancun,
        Self::Prague,
        Self::Osaka,
    ];

    /// Returns true if `other` is active when running under `self`.
    #[inline]
    #[must_use]
    pub const fn is_enabled_in(self, other: Self) -> bool {
        self as u8 >= other as u8
    }

    /// Upper-case identifier, e.g. `"TANGERINE"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Frontier => "FRONTIER",
            Self::Homestead => "HOMESTEAD",
            Self::TangerineWhistle => "TANGERINE",
            Self::SpuriousDragon => "SPURIOUS",
            Self::Byzantium => "BYZANTIUM",
            Self::Constantinople => "CONSTANTINOPLE",
            Self::Petersburg => "PETERSBURG",
            Self::Istanbul => "ISTANBUL",
            Self::Berlin => "BERLIN",
            Self::London => "LONDON",
            Self::Merge => "MERGE",
            Self::Shanghai => "SHANGHAI",
            Self::Cancun => "CANCUN",
            Self::Prague => "PRAGUE",
            Self::Osaka => "OSAKA",
        }
    }

    /// EIP-150: all-but-one-64th forwarding.
    #[must_use]
    pub const fn has_call_gas_cap(self) -> bool {
        self.is_enabled_in(Self::TangerineWhistle)
    }

    /// EIP-161: emptiness, not existence, decides new-account charges.
    #[must_use]
    pub const fn has_empty_account_semantics(self) -> bool {
        self.is_enabled_in(Self::SpuriousDragon)
    }

    /// EIP-2200: net gas metering with the 2300 sentry.
    #[must_use]
    pub const fn has_net_sstore_metering(self) -> bool {
        self.is_enabled_in(Self::Istanbul)
    }

    /// EIP-2929: warm/cold access pricing.
    #[must_use]
    pub const fn has_access_lists(self) -> bool {
        self.is_enabled_in(Self::Berlin)
    }

    /// EIP-3529: reduced refunds, no SELFDESTRUCT refund, `used/5` cap.
    #[must_use]
    pub const fn has_reduced_refunds(self) -> bool {
        self.is_enabled_in(Self::London)
    }

    /// EIP-6780: SELFDESTRUCT only deletes same-transaction creations.
    #[must_use]
    pub const fn has_restricted_selfdestruct(self) -> bool {
        self.is_enabled_in(Self::Cancun)
    }
}

impl fmt::Display for Hardfork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Hardfork {
    type Err = ConfigError;

    /// Accepts the upper-case identifiers plus the usual spellings
    /// (`"TangerineWhistle"`, `"spurious_dragon"`, `"Paris"`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let fork = match normalized.as_str() {
            "FRONTIER" => Self::Frontier,
            "HOMESTEAD" => Self::Homestead,
            "TANGERINE" | "TANGERINEWHISTLE" | "EIP150" => Self::TangerineWhistle,
            "SPURIOUS" | "SPURIOUSDRAGON" | "EIP158" => Self::SpuriousDragon,
            "BYZANTIUM" => Self::Byzantium,
            "CONSTANTINOPLE" => Self::Constantinople,
            "PETERSBURG" | "CONSTANTINOPLEFIX" => Self::Petersburg,
            "ISTANBUL" => Self::Istanbul,
            "BERLIN" => Self::Berlin,
            "LONDON" => Self::London,
            "MERGE" | "PARIS" => Self::Merge,
            "SHANGHAI" => Self::Shanghai,
            "CANCUN" => Self::Cancun,
            "PRAGUE" => Self::Prague,
            "OSAKA" => Self::Osaka,
            _ => return Err(ConfigError::UnknownHardfork(s.to_string())),
        };
        Ok(fork)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order() {
        for pair in Hardfork::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[1].is_enabled_in(pair[0]));
            assert!(!pair[0].is_enabled_in(pair[1]));
        }
    }

    #[test]
    fn test_feature_gates() {
        assert!(!Hardfork::Istanbul.has_access_lists());
        assert!(Hardfork::Berlin.has_access_lists());
        assert!(!Hardfork::Berlin.has_reduced_refunds());
        assert!(Hardfork::London.has_reduced_refunds());
        assert!(!Hardfork::Homestead.has_call_gas_cap());
        assert!(Hardfork::Shanghai.has_call_gas_cap());
        assert!(Hardfork::Cancun.has_restricted_selfdestruct());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("TANGERINE".parse::<Hardfork>().unwrap(), Hardfork::TangerineWhistle);
        assert_eq!("spurious_dragon".parse::<Hardfork>().unwrap(), Hardfork::SpuriousDragon);
        assert_eq!("Paris".parse::<Hardfork>().unwrap(), Hardfork::Merge);
        assert!(matches!(
            "Glacier".parse::<Hardfork>(),
            Err(ConfigError::UnknownHardfork(_))
        ));
    }

    #[test]
    fn test_display_round_trip() {
        for fork in Hardfork::ALL {
            assert_eq!(fork.to_string().parse::<Hardfork>().unwrap(), fork);
        }
    }
}
