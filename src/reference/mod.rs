mod pension;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{
    IncomePercentiles, Locale, LocalizedText, TierLabel, WealthStatus, WealthTierTable, classify,
};

pub use pension::{
    DEFAULT_CLOSEST_PENSIONS, PensionBenchmark, builtin_pensions, closest_pensions,
    parse_pensions,
};

const CITY_DATASETS: &[(&str, &str)] = &[
    (
        "chiang-mai",
        include_str!("../../data/cities/chiang-mai.json"),
    ),
    ("vientiane", include_str!("../../data/cities/vientiane.json")),
];

static BUILTIN_CITIES: OnceLock<Result<CityRegistry, ReferenceError>> = OnceLock::new();

#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseholdType {
    Single,
    Dink,
    TwoChildren,
}

impl HouseholdType {
    pub const ALL: [HouseholdType; 3] = [
        HouseholdType::Single,
        HouseholdType::Dink,
        HouseholdType::TwoChildren,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HouseholdType::Single => "single",
            HouseholdType::Dink => "dink",
            HouseholdType::TwoChildren => "two_children",
        }
    }
}

impl fmt::Display for HouseholdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HouseholdType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HouseholdType::ALL
            .into_iter()
            .find(|h| h.as_str() == s)
            .ok_or_else(|| format!("unknown household type '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("dataset '{key}' is malformed: {reason}")]
    MalformedDataset { key: String, reason: String },
    #[error("duplicate city key '{0}'")]
    DuplicateCity(String),
    #[error("unknown city '{0}'")]
    UnknownCity(String),
    #[error("city '{city}' has no data for household '{household}'")]
    MissingHousehold {
        city: String,
        household: HouseholdType,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityNote {
    pub author: String,
    pub date: String,
    pub content: LocalizedText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdTables {
    pub percentiles: IncomePercentiles,
    pub tiers: WealthTierTable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityData {
    pub key: String,
    pub name: LocalizedText,
    pub households: BTreeMap<HouseholdType, HouseholdTables>,
    pub notes: Vec<CityNote>,
}

impl CityData {
    pub fn tables(&self, household: HouseholdType) -> Result<&HouseholdTables, ReferenceError> {
        self.households
            .get(&household)
            .ok_or_else(|| ReferenceError::MissingHousehold {
                city: self.key.clone(),
                household,
            })
    }

    pub fn classify(
        &self,
        household: HouseholdType,
        spending_level: f64,
    ) -> Result<Classification, ReferenceError> {
        let tables = self.tables(household)?;
        let tier = classify(spending_level, &tables.percentiles, &tables.tiers);
        let status = tables
            .tiers
            .status(tier)
            .cloned()
            .ok_or_else(|| ReferenceError::MalformedDataset {
                key: self.key.clone(),
                reason: format!("tier {tier} has no description"),
            })?;
        Ok(Classification {
            city: self.key.clone(),
            household,
            tier,
            status,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub city: String,
    pub household: HouseholdType,
    pub tier: TierLabel,
    pub status: WealthStatus,
}

#[derive(Debug, Clone, Default)]
pub struct CityRegistry {
    cities: BTreeMap<String, CityData>,
}

impl CityRegistry {
    pub fn builtin() -> Result<&'static CityRegistry, ReferenceError> {
        BUILTIN_CITIES
            .get_or_init(|| CityRegistry::from_sources(CITY_DATASETS))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Builds a registry from `(dataset name, json)` pairs. City keys are the
    /// dataset names with '-' replaced by '_'.
    pub fn from_sources(sources: &[(&str, &str)]) -> Result<Self, ReferenceError> {
        let mut cities = BTreeMap::new();
        for (name, json) in sources {
            let key = name.replace('-', "_");
            let city = match parse_city(&key, json) {
                Ok(city) => city,
                Err(e) => {
                    log::warn!("Rejected city dataset {name}: {e}");
                    return Err(e);
                }
            };
            if cities.contains_key(&key) {
                return Err(ReferenceError::DuplicateCity(key));
            }
            log::info!("Loaded city {key} ({})", city.name.resolve(&Locale::en()));
            cities.insert(key, city);
        }
        Ok(Self { cities })
    }

    pub fn cities(&self) -> impl Iterator<Item = &CityData> {
        self.cities.values()
    }

    pub fn get(&self, key: &str) -> Result<&CityData, ReferenceError> {
        self.cities
            .get(key)
            .ok_or_else(|| ReferenceError::UnknownCity(key.to_string()))
    }

    /// Wealth tier of an annual spending level in a city. Missing city or
    /// household data is an error, never a silent default.
    pub fn classify_spending(
        &self,
        key: &str,
        household: HouseholdType,
        spending_level: f64,
    ) -> Result<Classification, ReferenceError> {
        self.get(key)?.classify(household, spending_level)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawCity {
    name: LocalizedText,
    income_percentiles: BTreeMap<String, IncomePercentiles>,
    wealth_mapping: BTreeMap<String, BTreeMap<String, WealthStatus>>,
    descriptions: Vec<CityNote>,
}

fn parse_city(key: &str, json: &str) -> Result<CityData, ReferenceError> {
    let malformed = |reason: String| ReferenceError::MalformedDataset {
        key: key.to_string(),
        reason,
    };

    let raw: RawCity = serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;

    if raw.name.is_blank() {
        return Err(malformed("name is empty".to_string()));
    }
    if raw.descriptions.is_empty() {
        return Err(malformed("at least one description is required".to_string()));
    }
    if raw.income_percentiles.is_empty() {
        return Err(malformed("no household data".to_string()));
    }

    let mut percentiles_by_household = BTreeMap::new();
    for (name, percentiles) in raw.income_percentiles {
        let household = name.parse::<HouseholdType>().map_err(&malformed)?;
        if !percentiles.is_strictly_increasing() {
            return Err(malformed(format!(
                "income percentiles for {household} must be finite and strictly increasing"
            )));
        }
        percentiles_by_household.insert(household, percentiles);
    }

    let mut households = BTreeMap::new();
    for (name, mapping) in raw.wealth_mapping {
        let household = name.parse::<HouseholdType>().map_err(&malformed)?;
        let Some(percentiles) = percentiles_by_household.remove(&household) else {
            return Err(malformed(format!(
                "wealth tiers for {household} have no income percentiles"
            )));
        };

        let mut entries = Vec::with_capacity(mapping.len());
        for (label, status) in mapping {
            let tier = label
                .parse::<TierLabel>()
                .map_err(|e| malformed(e.to_string()))?;
            if let TierLabel::Percentile(n) = tier {
                if percentiles.threshold(n).is_none() {
                    return Err(malformed(format!(
                        "tier {tier} for {household} has no p{n} threshold"
                    )));
                }
            }
            if status.level.is_blank() || status.description.is_blank() {
                return Err(malformed(format!(
                    "tier {tier} for {household} needs a level and a description"
                )));
            }
            entries.push((tier, status));
        }

        let tiers = WealthTierTable::from_entries(entries)
            .ok_or_else(|| malformed(format!("wealth tiers for {household} lack 'default'")))?;
        households.insert(household, HouseholdTables { percentiles, tiers });
    }

    if let Some(household) = percentiles_by_household.keys().next() {
        return Err(malformed(format!(
            "income percentiles for {household} have no wealth tiers"
        )));
    }

    Ok(CityData {
        key: key.to_string(),
        name: raw.name,
        households,
        notes: raw.descriptions,
    })
}
