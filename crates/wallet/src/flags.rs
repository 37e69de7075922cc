//! Wallet feature versions and flags.

/// Version of this software as recorded in the `version` record.
pub const CLIENT_VERSION: i32 = 230000;

pub const FEATURE_BASE: i32 = 10500;
pub const FEATURE_WALLETCRYPT: i32 = 40000;
pub const FEATURE_COMPRPUBKEY: i32 = 60000;
pub const FEATURE_HD: i32 = 130000;
pub const FEATURE_HD_SPLIT: i32 = 139900;
pub const FEATURE_NO_DEFAULT_KEY: i32 = 159900;
pub const FEATURE_PRE_SPLIT_KEYPOOL: i32 = 169900;
/// Highest `minversion` this build can open.
pub const FEATURE_LATEST: i32 = FEATURE_PRE_SPLIT_KEYPOOL;

/// Client versions that wrote encrypted wallets needing a rewrite.
pub const REWRITE_CLIENT_VERSIONS: [i32; 2] = [40000, 50000];

pub const WALLET_FLAG_AVOID_REUSE: u64 = 1 << 0;
pub const WALLET_FLAG_KEY_ORIGIN_METADATA: u64 = 1 << 1;
pub const WALLET_FLAG_DISABLE_PRIVATE_KEYS: u64 = 1 << 32;
pub const WALLET_FLAG_BLANK_WALLET: u64 = 1 << 33;
pub const WALLET_FLAG_DESCRIPTORS: u64 = 1 << 34;

pub const KNOWN_WALLET_FLAGS: u64 = WALLET_FLAG_AVOID_REUSE
    | WALLET_FLAG_KEY_ORIGIN_METADATA
    | WALLET_FLAG_DISABLE_PRIVATE_KEYS
    | WALLET_FLAG_BLANK_WALLET
    | WALLET_FLAG_DESCRIPTORS;

/// Unknown flags in the upper 32 bits change how the wallet must be
/// interpreted; unknown lower bits are optional and may be ignored.
pub fn has_unknown_mandatory_flags(flags: u64) -> bool {
    (flags & !KNOWN_WALLET_FLAGS) >> 32 != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_flags_are_fine() {
        assert!(!has_unknown_mandatory_flags(0));
        assert!(!has_unknown_mandatory_flags(KNOWN_WALLET_FLAGS));
    }

    #[test]
    fn test_unknown_lower_bits_tolerated() {
        assert!(!has_unknown_mandatory_flags(1 << 20));
    }

    #[test]
    fn test_unknown_upper_bits_rejected() {
        assert!(has_unknown_mandatory_flags(1 << 40));
        assert!(has_unknown_mandatory_flags(WALLET_FLAG_DESCRIPTORS | (1 << 63)));
    }

    #[test]
    fn test_feature_order() {
        assert!(FEATURE_BASE < FEATURE_WALLETCRYPT);
        assert!(FEATURE_HD < FEATURE_HD_SPLIT);
        assert!(FEATURE_LATEST < CLIENT_VERSION);
    }
}
