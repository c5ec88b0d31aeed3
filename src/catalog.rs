use std::collections::{HashMap, HashSet};

use crate::error::WfcError;
use crate::{Direction, ModuleId};

/// Position of a module's tile within the rendering atlas. Pure rendering
/// hint; the solver never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex {
    pub row: u32,
    pub col: u32,
}

/// A single module ("tile") definition, as supplied by a catalog's caller.
#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    pub weight: f64,
    pub tile_index: TileIndex,
    pub adjacency_rules: HashMap<Direction, HashSet<ModuleId>>,
}

impl Module {
    pub fn new(id: impl Into<ModuleId>, weight: f64) -> Self {
        Module {
            id: id.into(),
            weight,
            tile_index: TileIndex { row: 0, col: 0 },
            adjacency_rules: HashMap::new(),
        }
    }

    pub fn with_tile_index(mut self, row: u32, col: u32) -> Self {
        self.tile_index = TileIndex { row, col };
        self
    }

    pub fn allow(mut self, direction: Direction, neighbor: impl Into<ModuleId>) -> Self {
        self.adjacency_rules
            .entry(direction)
            .or_insert_with(HashSet::new)
            .insert(neighbor.into());
        self
    }

    fn allowed_in(&self, direction: Direction) -> &HashSet<ModuleId> {
        static EMPTY: std::sync::OnceLock<HashSet<ModuleId>> = std::sync::OnceLock::new();
        self.adjacency_rules
            .get(&direction)
            .unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }
}

/// Immutable, O(1)-lookup table of modules, built once and shared read-only
/// by every other component.
#[derive(Debug, Clone)]
pub struct ModuleCatalog {
    modules: Vec<Module>,
    index: HashMap<ModuleId, usize>,
    /// Precomputed id -> direction -> compatible partner ids, the symmetric
    /// intersection described in the compatibility predicate. Computed once
    /// so propagation's hot path never re-derives it, and keyed so a lookup
    /// never needs to allocate.
    compatible: HashMap<ModuleId, HashMap<Direction, HashSet<ModuleId>>>,
}

impl ModuleCatalog {
    pub fn new(modules: Vec<Module>) -> Result<Self, WfcError> {
        if modules.is_empty() {
            return Err(WfcError::NoModulesDefined);
        }

        let mut index = HashMap::with_capacity(modules.len());
        for (i, m) in modules.iter().enumerate() {
            if m.weight <= 0.0 {
                return Err(WfcError::InvalidCatalog(format!(
                    "module '{}' has non-positive weight {}",
                    m.id, m.weight
                )));
            }
            if index.insert(m.id.clone(), i).is_some() {
                return Err(WfcError::InvalidCatalog(format!(
                    "duplicate module id '{}'",
                    m.id
                )));
            }
        }

        for m in &modules {
            for (_, partners) in &m.adjacency_rules {
                for partner in partners {
                    if !index.contains_key(partner) {
                        return Err(WfcError::InvalidCatalog(format!(
                            "module '{}' references unknown adjacent id '{}'",
                            m.id, partner
                        )));
                    }
                }
            }
        }

        let mut compatible = HashMap::new();
        for a in &modules {
            let mut per_direction = HashMap::new();
            for direction in Direction::ALL {
                let opp = direction.opposite();
                let mut partners = HashSet::new();
                for b_id in a.allowed_in(direction) {
                    let b = &modules[index[b_id]];
                    if b.allowed_in(opp).contains(&a.id) {
                        partners.insert(b.id.clone());
                    }
                }
                per_direction.insert(direction, partners);
            }
            compatible.insert(a.id.clone(), per_direction);
        }

        Ok(ModuleCatalog {
            modules,
            index,
            compatible,
        })
    }

    pub fn get(&self, id: &str) -> Option<&Module> {
        self.index.get(id).map(|&i| &self.modules[i])
    }

    pub fn all(&self) -> &[Module] {
        &self.modules
    }

    pub fn all_ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.iter().map(|m| &m.id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// True iff `b` may sit on the `direction` side of `a` (and, by
    /// construction, `a` may symmetrically sit on the opposite side of `b`).
    pub fn is_compatible(&self, a_id: &str, direction: Direction, b_id: &str) -> bool {
        self.compatible_partners(a_id, direction).contains(b_id)
    }

    /// All ids compatible with `a_id` on the given side. Used by the
    /// propagator so it never has to loop over the whole catalog; the lookup
    /// is a plain borrowed-key traversal, no allocation per call.
    pub fn compatible_partners(&self, a_id: &str, direction: Direction) -> &HashSet<ModuleId> {
        static EMPTY: std::sync::OnceLock<HashSet<ModuleId>> = std::sync::OnceLock::new();
        self.compatible
            .get(a_id)
            .and_then(|per_direction| per_direction.get(&direction))
            .unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }
}
