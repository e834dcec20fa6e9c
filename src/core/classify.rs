use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::locale::LocalizedText;

pub const PERCENTILE_LEVELS: [u8; 10] = [10, 20, 30, 40, 50, 60, 70, 80, 90, 99];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncomePercentiles {
    pub p10: f64,
    pub p20: f64,
    pub p30: f64,
    pub p40: f64,
    pub p50: f64,
    pub p60: f64,
    pub p70: f64,
    pub p80: f64,
    pub p90: f64,
    pub p99: f64,
}

impl IncomePercentiles {
    pub fn threshold(&self, percentile: u8) -> Option<f64> {
        match percentile {
            10 => Some(self.p10),
            20 => Some(self.p20),
            30 => Some(self.p30),
            40 => Some(self.p40),
            50 => Some(self.p50),
            60 => Some(self.p60),
            70 => Some(self.p70),
            80 => Some(self.p80),
            90 => Some(self.p90),
            99 => Some(self.p99),
            _ => None,
        }
    }

    pub fn thresholds(&self) -> [(u8, f64); 10] {
        PERCENTILE_LEVELS.map(|level| (level, self.threshold(level).unwrap_or(f64::NAN)))
    }

    pub fn is_strictly_increasing(&self) -> bool {
        let values = self.thresholds();
        values.iter().all(|(_, v)| v.is_finite())
            && values.windows(2).all(|pair| pair[0].1 < pair[1].1)
    }
}

/// Key of a wealth tier: `<N>%+` or the fallback `default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TierLabel {
    Percentile(u8),
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tier label '{0}', expected '<N>%+' or 'default'")]
pub struct TierLabelError(pub String);

impl fmt::Display for TierLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierLabel::Percentile(n) => write!(f, "{n}%+"),
            TierLabel::Default => f.write_str("default"),
        }
    }
}

impl FromStr for TierLabel {
    type Err = TierLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "default" {
            return Ok(TierLabel::Default);
        }
        s.strip_suffix("%+")
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=100).contains(n))
            .map(TierLabel::Percentile)
            .ok_or_else(|| TierLabelError(s.to_string()))
    }
}

impl Serialize for TierLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TierLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WealthStatus {
    pub level: LocalizedText,
    pub description: LocalizedText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WealthTierTable {
    tiers: BTreeMap<u8, WealthStatus>,
    fallback: WealthStatus,
}

impl WealthTierTable {
    pub fn new(fallback: WealthStatus) -> Self {
        Self {
            tiers: BTreeMap::new(),
            fallback,
        }
    }

    pub fn with_tier(mut self, percentile: u8, status: WealthStatus) -> Self {
        self.tiers.insert(percentile, status);
        self
    }

    /// Builds a table from labelled entries; `None` when `default` is absent.
    pub fn from_entries(entries: impl IntoIterator<Item = (TierLabel, WealthStatus)>) -> Option<Self> {
        let mut tiers = BTreeMap::new();
        let mut fallback = None;
        for (label, status) in entries {
            match label {
                TierLabel::Percentile(n) => {
                    tiers.insert(n, status);
                }
                TierLabel::Default => fallback = Some(status),
            }
        }
        fallback.map(|fallback| Self { tiers, fallback })
    }

    pub fn percentiles_descending(&self) -> impl Iterator<Item = u8> + '_ {
        self.tiers.keys().rev().copied()
    }

    pub fn status(&self, label: TierLabel) -> Option<&WealthStatus> {
        match label {
            TierLabel::Percentile(n) => self.tiers.get(&n),
            TierLabel::Default => Some(&self.fallback),
        }
    }
}

/// Highest tier whose income threshold is at or below `spending_level`;
/// `TierLabel::Default` when no threshold is met. Tiers without a matching
/// percentile threshold are skipped.
pub fn classify(
    spending_level: f64,
    percentiles: &IncomePercentiles,
    tiers: &WealthTierTable,
) -> TierLabel {
    tiers
        .percentiles_descending()
        .find(|n| {
            percentiles
                .threshold(*n)
                .is_some_and(|threshold| spending_level >= threshold)
        })
        .map(TierLabel::Percentile)
        .unwrap_or(TierLabel::Default)
}
