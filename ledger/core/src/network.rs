//! Target networks and the genesis ids their nodes report.

use std::fmt;
use std::str::FromStr;

/// Target network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Network {
    /// Production network.
    #[default]
    MainNet,
    /// Public test network.
    TestNet,
    /// Network with the newest protocol features.
    BetaNet,
    /// Private or local network; always needs an explicit node URL.
    DevNet,
}

impl Network {
    /// Genesis id the node must report, or `None` when any is accepted.
    pub fn genesis_id(&self) -> Option<&'static str> {
        match self {
            Network::MainNet => Some("mainnet-v1.0"),
            Network::TestNet => Some("testnet-v1.0"),
            Network::BetaNet => Some("betanet-v1.0"),
            Network::DevNet => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Network::MainNet => "mainnet",
            Network::TestNet => "testnet",
            Network::BetaNet => "betanet",
            Network::DevNet => "devnet",
        })
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "mainnet" => Ok(Network::MainNet),
            "testnet" => Ok(Network::TestNet),
            "betanet" => Ok(Network::BetaNet),
            "devnet" => Ok(Network::DevNet),
            other => Err(format!(
                "unknown network {other:?} (valid: mainnet, testnet, betanet, devnet)"
            )),
        }
    }
}
