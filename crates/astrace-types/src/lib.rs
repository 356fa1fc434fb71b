use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Polygon mainnet, the chain minting happens on.
pub const POLYGON_MAINNET: ChainId = ChainId(137);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    /// `0x`-prefixed lowercase hex, the form EIP-1193 providers speak.
    pub fn to_hex(self) -> String {
        format!("0x{:x}", self.0)
    }

    /// Parses `0x89`-style hex, falling back to plain decimal.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok().map(ChainId),
            None => raw.parse().ok().map(ChainId),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serde adapter for chain ids carried as hex strings on the wire.
pub mod hex_chain_id {
    use super::*;

    pub fn serialize<S: Serializer>(id: &ChainId, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&id.to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ChainId, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ChainId::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid chain id: {raw}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    /// Display form used on buttons: `0x1234…abcd`.
    pub fn short(&self) -> String {
        let addr = self.0.as_str();
        match (addr.get(..6), addr.get(38..42)) {
            (Some(head), Some(tail)) => format!("{head}\u{2026}{tail}"),
            _ => addr.to_owned(),
        }
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connection state shared by everything that gates on the wallet.
///
/// Address and chain are present exactly when the session is connected;
/// the constructors are the only way to build one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    link: Option<(WalletAddress, ChainId)>,
}

impl Session {
    pub fn disconnected() -> Self {
        Self { link: None }
    }

    pub fn connected(address: WalletAddress, chain_id: ChainId) -> Self {
        Self {
            link: Some((address, chain_id)),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn address(&self) -> Option<&WalletAddress> {
        self.link.as_ref().map(|(address, _)| address)
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        self.link.as_ref().map(|(_, chain)| *chain)
    }

    /// Replaces the account of a connected session. No-op when disconnected.
    pub fn with_address(self, address: WalletAddress) -> Self {
        match self.link {
            Some((_, chain)) => Self::connected(address, chain),
            None => self,
        }
    }

    /// Replaces the chain of a connected session. No-op when disconnected.
    pub fn with_chain(self, chain_id: ChainId) -> Self {
        match self.link {
            Some((address, _)) => Self::connected(address, chain_id),
            None => self,
        }
    }

    pub fn phase(&self, required: ChainId) -> SessionPhase {
        match self.chain_id() {
            None => SessionPhase::Disconnected,
            Some(chain) if chain == required => SessionPhase::ConnectedRightChain,
            Some(_) => SessionPhase::ConnectedWrongChain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    ConnectedWrongChain,
    ConnectedRightChain,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    #[default]
    Home,
    Form,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// EIP-3085 chain definition, sent with `wallet_addEthereumChain`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChainParameters {
    #[serde(with = "hex_chain_id")]
    pub chain_id: ChainId,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    #[serde(default)]
    pub block_explorer_urls: Vec<String>,
    #[serde(default)]
    pub icon_urls: Vec<String>,
}

impl ChainParameters {
    pub fn polygon_mainnet() -> Self {
        Self {
            chain_id: POLYGON_MAINNET,
            chain_name: "Polygon Mainnet".to_owned(),
            rpc_urls: vec!["https://rpc.ankr.com/polygon".to_owned()],
            native_currency: NativeCurrency {
                name: "Matic".to_owned(),
                symbol: "MATIC".to_owned(),
                decimals: 18,
            },
            block_explorer_urls: vec!["https://polygonscan.com".to_owned()],
            icon_urls: vec![
                "https://polygon.technology/_nuxt/img/polygon-logo-2023.2dfe51d.svg".to_owned(),
            ],
        }
    }
}

impl Default for ChainParameters {
    fn default() -> Self {
        Self::polygon_mainnet()
    }
}
