//! Supported token catalog.
//!
//! Maps the currency symbol authored in a policy document to the token's
//! contract address and decimals. Sepolia testnet addresses.

use crate::types::Address;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: u8,
}

const fn addr(bytes: [u8; 20]) -> Address {
    Address::new(bytes)
}

/// Tokens the transfer automation understands.
pub const SUPPORTED_TOKENS: &[TokenInfo] = &[
    TokenInfo {
        symbol: "USDC",
        address: addr([
            0x1c, 0x7d, 0x4b, 0x19, 0x6c, 0xb0, 0xc7, 0xb0, 0x1d, 0x74, 0x3f, 0xbc, 0x61, 0x16,
            0xa9, 0x02, 0x37, 0x9c, 0x72, 0x38,
        ]),
        decimals: 6,
    },
    TokenInfo {
        symbol: "WETH",
        address: addr([
            0xff, 0xf9, 0x97, 0x67, 0x82, 0xd4, 0x6c, 0xc0, 0x56, 0x30, 0xd1, 0xf6, 0xeb, 0xab,
            0x18, 0xb2, 0x32, 0x4d, 0x6b, 0x14,
        ]),
        decimals: 18,
    },
    TokenInfo {
        symbol: "DAI",
        address: addr([
            0x3e, 0x62, 0x23, 0x17, 0xf8, 0xc9, 0x3f, 0x73, 0x28, 0x35, 0x0c, 0xf0, 0xb5, 0x6d,
            0x9e, 0xd4, 0xc6, 0x20, 0xc5, 0xd6,
        ]),
        decimals: 18,
    },
];

/// Lookup by symbol, case-insensitive.
pub fn token_info(symbol: &str) -> Option<&'static TokenInfo> {
    SUPPORTED_TOKENS
        .iter()
        .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
}

pub fn is_supported(symbol: &str) -> bool {
    token_info(symbol).is_some()
}

/// Decimals for a currency symbol. Unknown currencies fall back to 6 so a
/// schema-valid document always compiles.
pub fn decimals_for(symbol: &str) -> u8 {
    token_info(symbol).map(|t| t.decimals).unwrap_or(6)
}
