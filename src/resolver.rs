//! Code resolution: canonical entity names → provider series codes.
//!
//! The scope is "all members of a named group, minus an exclusion list,
//! plus explicit additions" — additions are handled separately because
//! their provider codes do not follow the group's naming templates
//! (Ireland's GDP series, the Eurozone aggregates).
//!
//! Provider code drift is per-series, not per-entity: Greece is "EL" in
//! the GDP naming scheme but "GR" in the HICP one. All such exceptions
//! live in indicator-scoped lookup tables here; nothing mutates a shared
//! mapping at fetch time.

use std::collections::HashMap;

use crate::types::{Entity, Indicator, PipelineError};

// ---------------------------------------------------------------------------
// Membership tables
// ---------------------------------------------------------------------------

struct Member {
    name: &'static str,
    alpha2: &'static str,
}

/// EU-27 membership, canonical display names with alpha-2 codes.
const EUROPEAN_UNION: &[Member] = &[
    Member { name: "Austria", alpha2: "AT" },
    Member { name: "Belgium", alpha2: "BE" },
    Member { name: "Bulgaria", alpha2: "BG" },
    Member { name: "Croatia", alpha2: "HR" },
    Member { name: "Cyprus", alpha2: "CY" },
    Member { name: "Czechia", alpha2: "CZ" },
    Member { name: "Denmark", alpha2: "DK" },
    Member { name: "Estonia", alpha2: "EE" },
    Member { name: "Finland", alpha2: "FI" },
    Member { name: "France", alpha2: "FR" },
    Member { name: "Germany", alpha2: "DE" },
    Member { name: "Greece", alpha2: "GR" },
    Member { name: "Hungary", alpha2: "HU" },
    Member { name: "Ireland", alpha2: "IE" },
    Member { name: "Italy", alpha2: "IT" },
    Member { name: "Latvia", alpha2: "LV" },
    Member { name: "Lithuania", alpha2: "LT" },
    Member { name: "Luxembourg", alpha2: "LU" },
    Member { name: "Malta", alpha2: "MT" },
    Member { name: "Netherlands", alpha2: "NL" },
    Member { name: "Poland", alpha2: "PL" },
    Member { name: "Portugal", alpha2: "PT" },
    Member { name: "Romania", alpha2: "RO" },
    Member { name: "Slovakia", alpha2: "SK" },
    Member { name: "Slovenia", alpha2: "SI" },
    Member { name: "Spain", alpha2: "ES" },
    Member { name: "Sweden", alpha2: "SE" },
];

/// Aggregate pseudo-entities resolvable by name.
const REGIONS: &[Member] = &[
    Member { name: "Eurozone", alpha2: "EZ" },
    Member { name: "United States", alpha2: "US" },
];

// ---------------------------------------------------------------------------
// Override tables (indicator-scoped)
// ---------------------------------------------------------------------------

/// Country-code overrides: the entity keeps its template but swaps the
/// embedded code for this indicator only.
const CODE_OVERRIDES: &[(Indicator, &str, &str)] = &[
    // Greece's code under the GDP naming scheme is EL, not GR.
    (Indicator::Gdp, "Greece", "EL"),
];

/// Full series-id overrides: the entity's series for this indicator does
/// not follow the template at all.
const SERIES_OVERRIDES: &[(Indicator, &str, &str)] = &[
    (Indicator::Gdp, "Ireland", "CPMNACSAB1GQIE"),
    (Indicator::Hicp, "Ireland", "CP0000IEM086NEST"),
    (Indicator::Hicp, "Romania", "CP0000ROM086NEST"),
];

/// Region series ids. A (region, indicator) pair absent from this table is
/// unsupported — region aggregates exist only for some indicators.
const REGION_SERIES: &[(&str, Indicator, &str)] = &[
    ("Eurozone", Indicator::Gdp, "EUNNGDP"),
    ("Eurozone", Indicator::Hicp, "CP0000EZ19M086NEST"),
    ("Eurozone", Indicator::PolicyRate, "ECBMRRFR"),
    ("Eurozone", Indicator::BondYield10Y, "IRLTLT01EZM156N"),
    ("United States", Indicator::BondYield10Y, "DGS10"),
];

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// The set of entities a run operates over.
#[derive(Debug, Clone)]
pub struct EntityScope {
    entities: Vec<Entity>,
}

impl EntityScope {
    /// Build the scope: group members minus exclusions, plus additions.
    ///
    /// Exclusions must name group members and additions must be known
    /// countries or regions — a typo here is a configuration error and
    /// aborts before any network call.
    pub fn build(
        group: &str,
        exclude: &[String],
        include: &[String],
    ) -> Result<Self, PipelineError> {
        let members: &[Member] = match group {
            "european-union" => EUROPEAN_UNION,
            other => {
                return Err(PipelineError::Config(format!(
                    "unknown entity group {other:?}"
                )))
            }
        };

        for name in exclude {
            if !members.iter().any(|m| m.name == name.as_str()) {
                return Err(PipelineError::Config(format!(
                    "exclusion {name:?} is not a member of group {group:?}"
                )));
            }
        }

        let mut entities: Vec<Entity> = members
            .iter()
            .filter(|m| !exclude.iter().any(|e| e == m.name))
            .map(|m| Entity::country(m.name, m.alpha2))
            .collect();

        for name in include {
            let entity = EUROPEAN_UNION
                .iter()
                .find(|m| m.name == name.as_str())
                .map(|m| Entity::country(m.name, m.alpha2))
                .or_else(|| {
                    REGIONS
                        .iter()
                        .find(|m| m.name == name.as_str())
                        .map(|m| Entity::region(m.name, m.alpha2))
                })
                .ok_or_else(|| PipelineError::UnknownEntity(name.clone()))?;
            if !entities.contains(&entity) {
                entities.push(entity);
            }
        }

        Ok(EntityScope { entities })
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Look up an in-scope entity by canonical name.
    pub fn get(&self, name: &str) -> Result<&Entity, PipelineError> {
        self.entities
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| PipelineError::UnknownEntity(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Maps (entity, indicator) to the provider series id to fetch.
///
/// Pure lookup — the override tables are fixed at construction.
pub struct CodeResolver {
    scope: EntityScope,
    code_overrides: HashMap<(Indicator, String), String>,
    series_overrides: HashMap<(Indicator, String), String>,
}

impl CodeResolver {
    pub fn new(scope: EntityScope) -> Self {
        let code_overrides = CODE_OVERRIDES
            .iter()
            .map(|(i, name, code)| ((*i, name.to_string()), code.to_string()))
            .collect();
        let series_overrides = SERIES_OVERRIDES
            .iter()
            .map(|(i, name, code)| ((*i, name.to_string()), code.to_string()))
            .collect();
        CodeResolver {
            scope,
            code_overrides,
            series_overrides,
        }
    }

    pub fn scope(&self) -> &EntityScope {
        &self.scope
    }

    /// Resolve an in-scope entity name to the series id for `indicator`.
    pub fn resolve_name(
        &self,
        name: &str,
        indicator: Indicator,
    ) -> Result<String, PipelineError> {
        let entity = self.scope.get(name)?;
        self.resolve(entity, indicator)
    }

    /// Resolve an entity to the series id for `indicator`.
    pub fn resolve(
        &self,
        entity: &Entity,
        indicator: Indicator,
    ) -> Result<String, PipelineError> {
        if entity.is_region {
            return REGION_SERIES
                .iter()
                .find(|(name, i, _)| *name == entity.name && *i == indicator)
                .map(|(_, _, code)| code.to_string())
                .ok_or_else(|| PipelineError::UnsupportedIndicatorForEntity {
                    entity: entity.name.clone(),
                    indicator,
                });
        }

        let key = (indicator, entity.name.clone());
        if let Some(series) = self.series_overrides.get(&key) {
            return Ok(series.clone());
        }

        let code = self
            .code_overrides
            .get(&key)
            .map(String::as_str)
            .unwrap_or(&entity.base_code);

        Self::template(indicator, code).ok_or_else(|| {
            PipelineError::UnsupportedIndicatorForEntity {
                entity: entity.name.clone(),
                indicator,
            }
        })
    }

    /// Naming template per indicator. Single-entity financial series
    /// (FX, policy rate, yields) have no per-country template.
    fn template(indicator: Indicator, code: &str) -> Option<String> {
        match indicator {
            Indicator::Gdp => Some(format!("CPMNACSCAB1GQ{code}")),
            Indicator::Hicp => Some(format!("CPHPTT01{code}M659N")),
            Indicator::Unemployment => Some(format!("LRHUTTTT{code}M156S")),
            Indicator::ConsumerConfidence => Some(format!("CSCICP03{code}M665S")),
            Indicator::BusinessConfidence => Some(format!("BSCICP03{code}M665S")),
            Indicator::ExchangeRate
            | Indicator::PolicyRate
            | Indicator::BondYield10Y => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
