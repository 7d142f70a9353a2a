//! Composite entity types
//!
//! Every node (or edge) carries a set of atomic types, read from boolean
//! "type" columns. Each distinct set gets one dense [`EntityTypeId`]:
//!
//! - id 0 is the empty set ("unknown / no type")
//! - atomic types take ids `1..=A` in name order
//! - composite sets observed in the data follow, in sorted set order
//!
//! so ids are deterministic for the same input. Every id maps to the
//! bitset of atomic ids it decomposes into.

use crate::error::{RdgError, RdgResult};
use crate::property::Column;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use samyama_topology::{DynamicBitset, EntityTypeId, Executor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Id of entities that have no type
pub const UNKNOWN_ENTITY_TYPE: EntityTypeId = 0;

/// Id assignment and atomic decomposition of entity types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeManager {
    /// Atomic type name -> id
    atomic_ids: BTreeMap<String, EntityTypeId>,
    /// Atomic id -> name
    atomic_names: BTreeMap<EntityTypeId, String>,
    /// Sorted atomic ids -> composite id
    sets: BTreeMap<Vec<EntityTypeId>, EntityTypeId>,
    /// Id -> atomic subtypes, one bit per id
    subtypes: Vec<DynamicBitset>,
}

impl Default for EntityTypeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityTypeManager {
    /// Manager holding only the unknown type
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// Empty manager whose bitsets are sized for `num_types` ids
    fn with_capacity(num_types: usize) -> Self {
        Self {
            atomic_ids: BTreeMap::new(),
            atomic_names: BTreeMap::new(),
            sets: BTreeMap::new(),
            subtypes: vec![DynamicBitset::new(num_types.max(1))],
        }
    }

    /// Assign ids for the atomic types named by `columns` and every type
    /// combination present in their rows. Returns the manager and the
    /// type id of each row.
    pub fn build(
        exec: &Executor,
        columns: &[(&str, &Column)],
        num_rows: usize,
    ) -> RdgResult<(Self, Vec<EntityTypeId>)> {
        // 1. Validate and order the type-defining columns by name
        let mut sorted: Vec<(&str, &Column)> = columns.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        if let Some(pair) = sorted.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(RdgError::InvalidArgument(format!("type column {:?} listed twice", pair[0].0)));
        }
        for (name, column) in &sorted {
            if !column.is_flag_column() {
                return Err(RdgError::Column(format!(
                    "type column {:?} is {:?}, expected Bool or UInt8",
                    name,
                    column.column_type()
                )));
            }
            if column.len() != num_rows {
                return Err(RdgError::InvalidArgument(format!(
                    "type column {:?} has {} rows, expected {}",
                    name,
                    column.len(),
                    num_rows
                )));
            }
        }
        if sorted.len() >= EntityTypeId::MAX as usize {
            return Err(RdgError::InvalidArgument(format!("too many atomic types: {}", sorted.len())));
        }

        let type_columns: Vec<&Column> = sorted.iter().map(|(_, c)| *c).collect();
        let row_set = |row: usize| -> Vec<EntityTypeId> {
            type_columns
                .iter()
                .enumerate()
                .filter(|(_, c)| c.flag(row).unwrap_or(false))
                .map(|(i, _)| (i + 1) as EntityTypeId)
                .collect()
        };

        // 2. Per-worker distinct sets, merged through one ordered pass
        let local_sets: Vec<FxHashSet<Vec<EntityTypeId>>> = exec.install(|| {
            (0..num_rows)
                .into_par_iter()
                .fold(FxHashSet::default, |mut set, row| {
                    let types = row_set(row);
                    if types.len() > 1 {
                        set.insert(types);
                    }
                    set
                })
                .collect()
        });
        let composites: BTreeSet<Vec<EntityTypeId>> = local_sets.into_iter().flatten().collect();

        // 3. Atomic ids in name order, then composite ids in set order
        let mut manager = Self::with_capacity(1 + sorted.len() + composites.len());
        for (name, _) in &sorted {
            let id = manager.next_id()?;
            manager.push_type(vec![id], Some(name.to_string()))?;
        }
        for set in composites {
            manager.push_type(set, None)?;
        }

        // 4. Per-row ids
        let manager_ref = &manager;
        let ids: Vec<EntityTypeId> = exec.install(|| {
            (0..num_rows)
                .into_par_iter()
                .map(|row| manager_ref.id_of_set(&row_set(row)).unwrap_or(UNKNOWN_ENTITY_TYPE))
                .collect()
        });

        debug!(
            "Built {} entity types ({} atomic) over {} rows",
            manager.num_entity_types(),
            manager.num_atomic_types(),
            num_rows
        );
        Ok((manager, ids))
    }

    fn next_id(&self) -> RdgResult<EntityTypeId> {
        EntityTypeId::try_from(self.subtypes.len())
            .map_err(|_| RdgError::InvalidArgument("entity type id space exhausted".to_string()))
    }

    /// Register `set` (sorted atomic ids) under the next id
    fn push_type(&mut self, set: Vec<EntityTypeId>, atomic_name: Option<String>) -> RdgResult<EntityTypeId> {
        let id = self.next_id()?;
        let needed = self.subtypes.len() + 1;
        let width = self.bit_width();
        let len = if width < needed {
            for bits in &mut self.subtypes {
                bits.resize(needed);
            }
            needed
        } else {
            width
        };
        self.subtypes
            .push(DynamicBitset::from_ones(len, set.iter().map(|&a| a as usize)));
        if let Some(name) = atomic_name {
            self.atomic_ids.insert(name.clone(), id);
            self.atomic_names.insert(id, name);
        }
        self.sets.insert(set, id);
        Ok(id)
    }

    /// Bits per subtype set; every set has the same width
    fn bit_width(&self) -> usize {
        self.subtypes.first().map_or(0, DynamicBitset::len)
    }

    fn id_of_set(&self, set: &[EntityTypeId]) -> Option<EntityTypeId> {
        if set.is_empty() {
            return Some(UNKNOWN_ENTITY_TYPE);
        }
        self.sets.get(set).copied()
    }

    /// Number of ids, including the unknown type
    pub fn num_entity_types(&self) -> usize {
        self.subtypes.len()
    }

    pub fn num_atomic_types(&self) -> usize {
        self.atomic_names.len()
    }

    pub fn is_atomic(&self, id: EntityTypeId) -> bool {
        self.atomic_names.contains_key(&id)
    }

    /// Id of an atomic type; `None` when no such type exists
    pub fn get_entity_type_id(&self, name: &str) -> Option<EntityTypeId> {
        self.atomic_ids.get(name).copied()
    }

    pub fn atomic_type_name(&self, id: EntityTypeId) -> Option<&str> {
        self.atomic_names.get(&id).map(String::as_str)
    }

    /// Atomic type names in id order
    pub fn atomic_type_names(&self) -> Vec<&str> {
        self.atomic_names.values().map(String::as_str).collect()
    }

    /// Atomic ids that `id` decomposes into
    pub fn get_atomic_subtypes(&self, id: EntityTypeId) -> Option<&DynamicBitset> {
        self.subtypes.get(id as usize)
    }

    /// True if an entity of type `entity_type` also has type `ty`. For a
    /// composite `ty` every one of its atomic types must be present.
    pub fn has_type(&self, entity_type: EntityTypeId, ty: EntityTypeId) -> bool {
        match (self.get_atomic_subtypes(entity_type), self.get_atomic_subtypes(ty)) {
            (Some(have), Some(want)) => !want.none() && want.is_subset_of(have),
            _ => false,
        }
    }

    /// Id of the combination of atomic types `names`, adding a composite
    /// id if the combination was never seen. Unknown names are
    /// `TypeNotFound`; an empty list is the unknown type.
    pub fn get_or_add_entity_type_id<S: AsRef<str>>(&mut self, names: &[S]) -> RdgResult<EntityTypeId> {
        let mut set = names
            .iter()
            .map(|n| {
                self.get_entity_type_id(n.as_ref())
                    .ok_or_else(|| RdgError::TypeNotFound(n.as_ref().to_string()))
            })
            .collect::<RdgResult<Vec<_>>>()?;
        set.sort_unstable();
        set.dedup();
        match self.id_of_set(&set) {
            Some(id) => Ok(id),
            None => self.push_type(set, None),
        }
    }
}

/// Per-row entity types of one table plus the columns they came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypes {
    manager: EntityTypeManager,
    type_ids: Vec<EntityTypeId>,
    columns: Vec<String>,
}

impl EntityTypes {
    /// Derive types from the named flag columns
    pub fn build(exec: &Executor, columns: &[(&str, &Column)], num_rows: usize) -> RdgResult<Self> {
        let (manager, type_ids) = EntityTypeManager::build(exec, columns, num_rows)?;
        let mut names: Vec<String> = columns.iter().map(|(n, _)| n.to_string()).collect();
        names.sort();
        Ok(Self { manager, type_ids, columns: names })
    }

    /// Every row untyped
    pub fn unknown(num_rows: usize) -> Self {
        Self {
            manager: EntityTypeManager::new(),
            type_ids: vec![UNKNOWN_ENTITY_TYPE; num_rows],
            columns: Vec::new(),
        }
    }

    pub fn manager(&self) -> &EntityTypeManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut EntityTypeManager {
        &mut self.manager
    }

    /// Type-defining column names, sorted
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn defines(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn num_rows(&self) -> usize {
        self.type_ids.len()
    }

    pub fn type_ids(&self) -> &[EntityTypeId] {
        &self.type_ids
    }

    pub fn entity_type_id(&self, row: usize) -> EntityTypeId {
        self.type_ids[row]
    }

    /// True if row `row` has (atomic or composite) type `ty`
    pub fn does_have_type(&self, row: usize, ty: EntityTypeId) -> bool {
        self.manager.has_type(self.type_ids[row], ty)
    }
}
