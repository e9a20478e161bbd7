//! Shadow matrix: per-user difficulty overrides and level resolution.
//!
//! Precedence, highest first:
//! 1. Global level, when enabled
//! 2. Program override
//! 3. Movement-group override
//! 4. Muscle-group override
//! 5. Default level (10)
//!
//! Programs and muscle groups are sparse; a missing entry reads as
//! [`LevelOverride::INACTIVE`] through [`ShadowMatrix::program_entry`] and
//! [`ShadowMatrix::muscle_entry`].

use crate::{Error, Level, MovementGroup, MuscleGroup, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// One granular entry of the matrix
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelOverride {
    pub level: Level,
    /// `false` means "use the computed default", `true` means "use `level`"
    #[serde(rename = "override")]
    pub active: bool,
}

impl LevelOverride {
    /// The implied value of every missing sparse entry
    pub const INACTIVE: LevelOverride = LevelOverride {
        level: Level::DEFAULT,
        active: false,
    };

    pub fn active(level: Level) -> Self {
        Self {
            level,
            active: true,
        }
    }

    fn value(&self) -> Option<Level> {
        self.active.then_some(self.level)
    }
}

impl Default for LevelOverride {
    fn default() -> Self {
        Self::INACTIVE
    }
}

/// What a slot is tied to, for level resolution
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelTarget<'a> {
    pub program: Option<&'a str>,
    pub movement_group: Option<MovementGroup>,
    pub muscle_group: Option<MuscleGroup>,
}

/// Per-user override table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShadowMatrix {
    #[serde(default)]
    pub use_global_level: bool,
    #[serde(default)]
    pub global_level: Level,
    #[serde(default = "all_movement_groups")]
    movement_groups: BTreeMap<MovementGroup, LevelOverride>,
    #[serde(default)]
    muscle_groups: BTreeMap<MuscleGroup, LevelOverride>,
    #[serde(default)]
    programs: BTreeMap<String, LevelOverride>,
}

fn all_movement_groups() -> BTreeMap<MovementGroup, LevelOverride> {
    MovementGroup::ALL
        .iter()
        .map(|g| (*g, LevelOverride::INACTIVE))
        .collect()
}

impl Default for ShadowMatrix {
    fn default() -> Self {
        Self {
            use_global_level: false,
            global_level: Level::DEFAULT,
            movement_groups: all_movement_groups(),
            muscle_groups: BTreeMap::new(),
            programs: BTreeMap::new(),
        }
    }
}

impl ShadowMatrix {
    /// Resolve the level for a slot; pure lookup
    pub fn resolve_level(&self, target: &LevelTarget<'_>) -> Level {
        if self.use_global_level {
            return self.global_level;
        }

        let program = target
            .program
            .and_then(|p| self.program_entry(p).value());
        let movement = target
            .movement_group
            .and_then(|g| self.movement_entry(g).value());
        let muscle = target
            .muscle_group
            .and_then(|m| self.muscle_entry(m).value());

        program
            .or(movement)
            .or(muscle)
            .unwrap_or(Level::DEFAULT)
    }

    pub fn movement_entry(&self, group: MovementGroup) -> LevelOverride {
        self.movement_groups
            .get(&group)
            .copied()
            .unwrap_or(LevelOverride::INACTIVE)
    }

    pub fn muscle_entry(&self, group: MuscleGroup) -> LevelOverride {
        self.muscle_groups
            .get(&group)
            .copied()
            .unwrap_or(LevelOverride::INACTIVE)
    }

    pub fn program_entry(&self, program: &str) -> LevelOverride {
        self.programs
            .get(program)
            .copied()
            .unwrap_or(LevelOverride::INACTIVE)
    }

    pub fn movement_groups(&self) -> &BTreeMap<MovementGroup, LevelOverride> {
        &self.movement_groups
    }

    pub fn muscle_groups(&self) -> &BTreeMap<MuscleGroup, LevelOverride> {
        &self.muscle_groups
    }

    pub fn programs(&self) -> &BTreeMap<String, LevelOverride> {
        &self.programs
    }

    // ------------------------------------------------------------------------
    // Edits. Every level passes through `Level`, which clamps.
    // ------------------------------------------------------------------------

    pub fn set_global_level(&mut self, level: i64) {
        self.global_level = Level::new(level);
        self.use_global_level = true;
    }

    pub fn disable_global_level(&mut self) {
        self.use_global_level = false;
    }

    pub fn set_movement_override(&mut self, group: MovementGroup, level: i64) {
        self.movement_groups
            .insert(group, LevelOverride::active(Level::new(level)));
    }

    /// Movement groups stay populated; clearing only drops the flag
    pub fn clear_movement_override(&mut self, group: MovementGroup) {
        self.movement_groups
            .entry(group)
            .or_insert(LevelOverride::INACTIVE)
            .active = false;
    }

    pub fn set_muscle_override(&mut self, group: MuscleGroup, level: i64) {
        self.muscle_groups.insert(group, LevelOverride::active(Level::new(level)));
    }

    pub fn clear_muscle_override(&mut self, group: MuscleGroup) {
        self.muscle_groups.remove(&group);
    }

    pub fn set_program_override(&mut self, program: impl Into<String>, level: i64) {
        self.programs
            .insert(program.into(), LevelOverride::active(Level::new(level)));
    }

    pub fn clear_program_override(&mut self, program: &str) {
        self.programs.remove(program);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Re-populate movement groups missing from older stored matrices
    pub(crate) fn normalize(&mut self) {
        for group in MovementGroup::ALL {
            self.movement_groups
                .entry(group)
                .or_insert(LevelOverride::INACTIVE);
        }
    }
}

/// Live, editable matrix shared between an editor and the generator
///
/// Generation must work on [`SharedMatrix::snapshot`], never on the live
/// value, so one session never mixes two override configurations.
#[derive(Clone, Debug, Default)]
pub struct SharedMatrix {
    inner: Arc<RwLock<ShadowMatrix>>,
}

impl SharedMatrix {
    pub fn new(matrix: ShadowMatrix) -> Self {
        Self {
            inner: Arc::new(RwLock::new(matrix)),
        }
    }

    /// Copy of the current matrix
    pub fn snapshot(&self) -> Result<ShadowMatrix> {
        self.inner
            .read()
            .map(|m| (*m).clone())
            .map_err(|_| Error::State("shadow matrix lock poisoned".into()))
    }

    /// Apply an edit under the write lock
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut ShadowMatrix),
    {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| Error::State("shadow matrix lock poisoned".into()))?;
        f(&mut guard);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_chest_program() -> LevelTarget<'static> {
        LevelTarget {
            program: Some("calisthenics"),
            movement_group: Some(MovementGroup::Push),
            muscle_group: Some(MuscleGroup::Chest),
        }
    }

    #[test]
    fn test_default_resolves_to_ten() {
        let matrix = ShadowMatrix::default();
        assert_eq!(matrix.resolve_level(&push_chest_program()).get(), 10);
        assert_eq!(matrix.resolve_level(&LevelTarget::default()).get(), 10);
    }

    #[test]
    fn test_default_populates_every_movement_group() {
        let matrix = ShadowMatrix::default();
        assert_eq!(matrix.movement_groups().len(), MovementGroup::ALL.len());
        assert!(matrix.muscle_groups().is_empty());
        assert!(matrix.programs().is_empty());
    }

    #[test]
    fn test_sparse_lookup_falls_back_to_inactive() {
        let matrix = ShadowMatrix::default();
        assert_eq!(matrix.muscle_entry(MuscleGroup::Quads), LevelOverride::INACTIVE);
        assert_eq!(matrix.program_entry("unknown"), LevelOverride::INACTIVE);
        assert_eq!(LevelOverride::INACTIVE.level.get(), 10);
        assert!(!LevelOverride::INACTIVE.active);
    }

    #[test]
    fn test_precedence_order() {
        let mut matrix = ShadowMatrix::default();
        let target = push_chest_program();

        matrix.set_muscle_override(MuscleGroup::Chest, 4);
        assert_eq!(matrix.resolve_level(&target).get(), 4);

        matrix.set_movement_override(MovementGroup::Push, 7);
        assert_eq!(matrix.resolve_level(&target).get(), 7);

        matrix.set_program_override("calisthenics", 12);
        assert_eq!(matrix.resolve_level(&target).get(), 12);

        matrix.set_global_level(18);
        assert_eq!(matrix.resolve_level(&target).get(), 18);

        matrix.disable_global_level();
        assert_eq!(matrix.resolve_level(&target).get(), 12);
    }

    #[test]
    fn test_inactive_entries_are_skipped() {
        let mut matrix = ShadowMatrix::default();
        matrix.set_movement_override(MovementGroup::Push, 15);
        matrix.clear_movement_override(MovementGroup::Push);

        assert_eq!(matrix.movement_entry(MovementGroup::Push).level.get(), 15);
        assert_eq!(matrix.resolve_level(&push_chest_program()).get(), 10);
    }

    #[test]
    fn test_global_dominates_every_granular_entry() {
        let mut matrix = ShadowMatrix::default();
        matrix.set_global_level(6);
        let target = push_chest_program();
        let before = matrix.resolve_level(&target);

        matrix.set_program_override("calisthenics", 20);
        matrix.set_movement_override(MovementGroup::Push, 1);
        matrix.set_muscle_override(MuscleGroup::Chest, 17);

        assert_eq!(matrix.resolve_level(&target), before);
        assert_eq!(before.get(), 6);
    }

    #[test]
    fn test_out_of_range_levels_are_clamped_on_entry() {
        let mut matrix = ShadowMatrix::default();
        matrix.set_movement_override(MovementGroup::Legs, 25);
        matrix.set_program_override("rings", 0);

        assert_eq!(matrix.movement_entry(MovementGroup::Legs).level.get(), 20);
        assert_eq!(matrix.program_entry("rings").level.get(), 1);
    }

    #[test]
    fn test_deserialize_clamps_and_repopulates() {
        let json = r#"{
            "use_global_level": false,
            "global_level": 40,
            "movement_groups": { "push": { "level": 0, "override": true } }
        }"#;
        let mut matrix: ShadowMatrix = serde_json::from_str(json).unwrap();
        matrix.normalize();

        assert_eq!(matrix.global_level.get(), 20);
        assert_eq!(matrix.movement_entry(MovementGroup::Push).level.get(), 1);
        assert_eq!(matrix.movement_groups().len(), MovementGroup::ALL.len());
    }

    #[test]
    fn test_shared_snapshot_is_isolated_from_later_edits() {
        let shared = SharedMatrix::default();
        let snapshot = shared.snapshot().unwrap();

        shared.update(|m| m.set_global_level(3)).unwrap();

        assert!(!snapshot.use_global_level);
        assert!(shared.snapshot().unwrap().use_global_level);
    }
}
