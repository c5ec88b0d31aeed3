//! `serde` types mirroring the persisted project/module JSON shapes. These
//! types parse from and serialize to an in-memory `&str`/`String` only;
//! reading them from (or writing them to) disk is the caller's job, not
//! this crate's.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{Module, ModuleCatalog};
use crate::error::WfcError;
use crate::{Direction, ModuleId};

fn default_grid_width() -> u32 {
    10
}
fn default_grid_height() -> u32 {
    10
}
fn default_seed() -> u32 {
    12345
}
fn default_module_source() -> String {
    "wfc_modules.json".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConstraint {
    pub id: ModuleId,
    pub limit: u32,
}

/// Project file: `{ "grid_width", "grid_height", "seed", "module_source",
/// "global_constraints" }`, every field defaulted per §6.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_grid_width")]
    pub grid_width: u32,
    #[serde(default = "default_grid_height")]
    pub grid_height: u32,
    #[serde(default = "default_seed")]
    pub seed: u32,
    #[serde(default = "default_module_source")]
    pub module_source: String,
    #[serde(default)]
    pub global_constraints: Vec<GlobalConstraint>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            grid_width: default_grid_width(),
            grid_height: default_grid_height(),
            seed: default_seed(),
            module_source: default_module_source(),
            global_constraints: Vec::new(),
        }
    }
}

impl ProjectConfig {
    pub fn from_json(json: &str) -> Result<Self, WfcError> {
        serde_json::from_str(json).map_err(|e| WfcError::JsonParseError(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String, WfcError> {
        serde_json::to_string(self).map_err(|e| WfcError::JsonParseError(e.to_string()))
    }
}

fn default_weight() -> f64 {
    1.0
}
fn default_tile_size() -> u32 {
    32
}
fn default_tileset_path() -> String {
    "assets/tileset.png".to_string()
}

/// One module entry in a module file: `{ "id", "weight", "tile_index",
/// "adjacency" }`. `adjacency` keys are the upper-case direction names
/// (`TOP`/`BOTTOM`/`LEFT`/`RIGHT`); unknown keys are ignored by virtue of
/// `Direction`'s own `Deserialize` impl only accepting those four.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub id: ModuleId,
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub tile_index: (u32, u32),
    #[serde(default)]
    pub adjacency: HashMap<Direction, Vec<ModuleId>>,
}

/// Module file: `{ "tile_size", "tileset_path", "modules" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleFileConfig {
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    #[serde(default = "default_tileset_path")]
    pub tileset_path: String,
    pub modules: Vec<ModuleConfig>,
}

impl ModuleFileConfig {
    pub fn from_json(json: &str) -> Result<Self, WfcError> {
        serde_json::from_str(json).map_err(|e| WfcError::JsonParseError(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String, WfcError> {
        serde_json::to_string(self).map_err(|e| WfcError::JsonParseError(e.to_string()))
    }

    /// Validate and convert into a `ModuleCatalog`. Surfaces
    /// `WfcError::InvalidCatalog` for a non-positive weight, a duplicate id,
    /// or an adjacency entry referencing a module id that isn't defined.
    pub fn into_catalog(self) -> Result<ModuleCatalog, WfcError> {
        let mut modules = Vec::with_capacity(self.modules.len());
        for entry in self.modules {
            let mut module = Module::new(entry.id, entry.weight)
                .with_tile_index(entry.tile_index.0, entry.tile_index.1);
            for (direction, partners) in entry.adjacency {
                for partner in partners {
                    module = module.allow(direction, partner);
                }
            }
            modules.push(module);
        }
        ModuleCatalog::new(modules)
    }
}
