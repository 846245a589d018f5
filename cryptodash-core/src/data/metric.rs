//! The closed set of dashboard metrics.
//!
//! Every series, table column and chart panel is keyed by one of these four
//! names. The declaration order is the canonical column and panel order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "Stablecoin_Market_Cap")]
    StablecoinMarketCap,
    #[serde(rename = "ETF_Volume_Proxy")]
    EtfVolumeProxy,
    #[serde(rename = "BTC_Realized_Cap")]
    BtcRealizedCap,
    #[serde(rename = "Binance_BTC_OI")]
    BinanceBtcOi,
}

impl Metric {
    /// All metrics in canonical column order.
    pub const ALL: [Metric; 4] = [
        Metric::StablecoinMarketCap,
        Metric::EtfVolumeProxy,
        Metric::BtcRealizedCap,
        Metric::BinanceBtcOi,
    ];

    /// Column header used in the persisted table.
    pub fn column_name(self) -> &'static str {
        match self {
            Metric::StablecoinMarketCap => "Stablecoin_Market_Cap",
            Metric::EtfVolumeProxy => "ETF_Volume_Proxy",
            Metric::BtcRealizedCap => "BTC_Realized_Cap",
            Metric::BinanceBtcOi => "Binance_BTC_OI",
        }
    }

    /// Position of this metric in [`Metric::ALL`].
    pub fn index(self) -> usize {
        match self {
            Metric::StablecoinMarketCap => 0,
            Metric::EtfVolumeProxy => 1,
            Metric::BtcRealizedCap => 2,
            Metric::BinanceBtcOi => 3,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.column_name() == s)
            .ok_or_else(|| format!("unknown metric column: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_canonical_order() {
        for (i, metric) in Metric::ALL.iter().enumerate() {
            assert_eq!(metric.index(), i);
        }
    }

    #[test]
    fn column_name_round_trips_through_from_str() {
        for metric in Metric::ALL {
            assert_eq!(metric.column_name().parse::<Metric>().unwrap(), metric);
        }
        assert!("Gold_Price".parse::<Metric>().is_err());
    }

    #[test]
    fn serde_uses_column_names() {
        let json = serde_json::to_string(&Metric::BinanceBtcOi).unwrap();
        assert_eq!(json, "\"Binance_BTC_OI\"");
    }
}
