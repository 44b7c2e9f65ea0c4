//! Game catalog: gameId -> validated `GameConfig`.
//!
//! Populated once at startup. Lookups of an id that is not in the table
//! fail with `UnknownGame` instead of handing downstream math a hole.

use crate::errors::{CasinoError, CasinoResult, ConfigurationError};
use crate::games::types::{GameConfig, PaylineMask, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

const EMBEDDED_CATALOG: &str = include_str!("../../config/games.toml");

/// Catalog file layout (`[[games]]` entries)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub games: Vec<GameDefinition>,
}

/// One game entry as written in the catalog file.
///
/// Accepts both snake_case (TOML) and the camelCase field names used by
/// the JSON game-data contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDefinition {
    pub id: String,
    #[serde(alias = "reelsCount")]
    pub reels_count: usize,
    #[serde(alias = "reelPositions")]
    pub reel_positions: usize,
    #[serde(alias = "symbolsCount")]
    pub symbols_count: u32,
    #[serde(alias = "linesPositions")]
    pub paylines: Vec<Vec<Vec<u8>>>,
    /// Symbol ids are table keys, so they arrive as strings
    #[serde(alias = "symbolsMultipliers")]
    pub multipliers: BTreeMap<String, Vec<f64>>,
    #[serde(alias = "defaultBet")]
    pub default_bet: f64,
    #[serde(alias = "defaultCoinValue")]
    pub default_coin_value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct GameCatalog {
    games: HashMap<String, Arc<GameConfig>>,
}

impl GameCatalog {
    /// Catalog compiled into the binary (`config/games.toml`)
    pub fn embedded() -> Result<Self, ConfigurationError> {
        Self::from_toml_str(EMBEDDED_CATALOG)
    }

    /// Load from a TOML file, or JSON when the extension is `.json`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigurationError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::from_definitions(file.games)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigurationError> {
        let file: CatalogFile = serde_json::from_str(content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse JSON: {}", e)))?;
        Self::from_definitions(file.games)
    }

    pub fn from_definitions(definitions: Vec<GameDefinition>) -> Result<Self, ConfigurationError> {
        let mut games = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            let config = validate_definition(definition)?;
            if games.contains_key(&config.id) {
                return Err(ConfigurationError::InvalidCatalog(format!(
                    "duplicate game id '{}'",
                    config.id
                )));
            }
            games.insert(config.id.clone(), Arc::new(config));
        }
        Ok(Self { games })
    }

    pub fn get(&self, game_id: &str) -> CasinoResult<Arc<GameConfig>> {
        self.games
            .get(game_id)
            .cloned()
            .ok_or_else(|| CasinoError::UnknownGame(game_id.to_string()))
    }

    pub fn contains(&self, game_id: &str) -> bool {
        self.games.contains_key(game_id)
    }

    /// Sorted game ids
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.games.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

fn invalid(game_id: &str, reason: impl std::fmt::Display) -> ConfigurationError {
    ConfigurationError::InvalidCatalog(format!("game '{}': {}", game_id, reason))
}

fn validate_definition(def: GameDefinition) -> Result<GameConfig, ConfigurationError> {
    let id = def.id.trim().to_string();
    if id.is_empty() {
        return Err(ConfigurationError::MissingRequired("games.id".to_string()));
    }
    if def.reels_count == 0 || def.reel_positions == 0 || def.symbols_count == 0 {
        return Err(invalid(&id, "reels_count, reel_positions and symbols_count must be > 0"));
    }
    if def.paylines.is_empty() {
        return Err(invalid(&id, "at least one payline is required"));
    }

    let rows_per_reel = def.reel_positions + 1;
    let mut paylines = Vec::with_capacity(def.paylines.len());
    for (index, mask) in def.paylines.into_iter().enumerate() {
        let number = index + 1;
        if mask.len() != def.reels_count {
            return Err(invalid(
                &id,
                format!("payline {} covers {} reels, expected {}", number, mask.len(), def.reels_count),
            ));
        }
        for rows in &mask {
            if rows.len() > rows_per_reel {
                return Err(invalid(&id, format!("payline {} has more than {} rows", number, rows_per_reel)));
            }
            if rows.iter().any(|&cell| cell > 1) {
                return Err(invalid(&id, format!("payline {} must contain only 0 and 1", number)));
            }
        }
        let mask = PaylineMask(mask);
        if mask.active_cells().next().is_none() {
            return Err(invalid(&id, format!("payline {} has no active cells", number)));
        }
        paylines.push(mask);
    }

    let mut multipliers: HashMap<Symbol, Vec<f64>> = HashMap::with_capacity(def.multipliers.len());
    for (key, table) in def.multipliers {
        let symbol: Symbol = key
            .trim()
            .parse()
            .map_err(|_| invalid(&id, format!("multiplier key '{}' is not a symbol id", key)))?;
        if symbol == 0 || symbol > def.symbols_count {
            return Err(invalid(&id, format!("multiplier for symbol {} is out of range", symbol)));
        }
        if table.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(invalid(&id, format!("symbol {} has a negative or non-finite multiplier", symbol)));
        }
        multipliers.insert(symbol, table);
    }
    for symbol in 1..=def.symbols_count {
        match multipliers.get(&symbol) {
            Some(table) if !table.is_empty() => {}
            _ => return Err(invalid(&id, format!("symbol {} has no multipliers", symbol))),
        }
    }

    for (field, value) in [("default_bet", def.default_bet), ("default_coin_value", def.default_coin_value)] {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigurationError::InvalidValue {
                field: format!("{}.{}", id, field),
                value: value.to_string(),
                reason: "must be a finite, non-negative number".to_string(),
            });
        }
    }

    Ok(GameConfig {
        id,
        reels_count: def.reels_count,
        reel_positions: def.reel_positions,
        symbols_count: def.symbols_count,
        paylines,
        multipliers,
        default_bet: def.default_bet,
        default_coin_value: def.default_coin_value,
    })
}
