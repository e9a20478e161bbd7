//! Slot filler: turns blueprint slots into concrete exercises.
//!
//! Each slot is tried against a fixed relaxation ladder:
//! 1. Strict: exact pattern, muscle refinement, equipment within what the
//!    user has plus the slot's preferred gear, level within tolerance
//! 2. Muscle refinement dropped, compatible patterns accepted
//! 3. Equipment tolerance widened to improvised gear, level band lifted
//! 4. Designated generic exercise for the slot type
//!
//! Injury exclusions and the slot's sweat ceiling are never relaxed, apart
//! from the sweat ceiling at the generic-exercise step. A slot that survives
//! none of the steps is left unfilled with a warning; only a catalog failure
//! aborts.

use crate::catalog::{default_fallback_id, ExerciseCatalog, ExerciseFilter};
use crate::config::FillerConfig;
use crate::matrix::LevelTarget;
use crate::types::*;
use crate::Result;
use std::collections::BTreeSet;

const MIN_REPS: i64 = 1;
const MAX_REPS: i64 = 30;

/// Result of filling every slot of a blueprint
#[derive(Clone, Debug, PartialEq)]
pub struct FillOutcome {
    pub slots: Vec<FilledSlot>,
    pub warnings: Vec<SlotWarning>,
}

/// What a slot is tied to for level resolution
pub fn level_target(slot: &BlueprintSlot) -> LevelTarget<'_> {
    LevelTarget {
        program: slot.program.as_deref(),
        movement_group: Some(slot.movement_pattern.group()),
        muscle_group: slot.target_muscle,
    }
}

/// Fill every slot of `blueprint`, in order
pub fn fill_slots<C: ExerciseCatalog + ?Sized>(
    catalog: &C,
    blueprint: &WorkoutBlueprint,
    context: &GenerationContext,
    config: &FillerConfig,
) -> Result<FillOutcome> {
    let mut slots = Vec::with_capacity(blueprint.slots.len());
    let mut warnings = Vec::new();

    for (index, slot) in blueprint.slots.iter().enumerate() {
        let filled = fill_slot(catalog, index, slot, context, config)?;
        if !filled.is_filled() {
            warnings.push(SlotWarning {
                slot_index: index,
                message: format!(
                    "No exercise fits {} slot {} ({:?}) even after relaxing constraints",
                    slot.slot_type, index, slot.movement_pattern
                ),
            });
        }
        slots.push(filled);
    }

    Ok(FillOutcome { slots, warnings })
}

/// Fill one slot
pub fn fill_slot<C: ExerciseCatalog + ?Sized>(
    catalog: &C,
    index: usize,
    slot: &BlueprintSlot,
    context: &GenerationContext,
    config: &FillerConfig,
) -> Result<FilledSlot> {
    let level = context.shadow_matrix().resolve_level(&level_target(slot));

    let candidates = catalog.query_exercises(&ExerciseFilter::by_patterns(
        slot.movement_pattern.compatible(),
        slot.slot_type.role(),
    ))?;

    let selector = Selector::new(slot, context, config, level);

    for stage in [
        SelectionStage::Strict,
        SelectionStage::WithoutMuscleTarget,
        SelectionStage::WidenedEquipment,
    ] {
        if let Some(exercise) = selector.pick(stage, &candidates) {
            if stage != SelectionStage::Strict {
                tracing::warn!(
                    "Slot {} ({}) relaxed to {:?}: {}",
                    index,
                    slot.slot_type,
                    stage,
                    exercise.id
                );
            } else {
                tracing::debug!("Slot {} ({}) filled with {}", index, slot.slot_type, exercise.id);
            }
            return Ok(filled(index, slot, Some(exercise.clone()), level, Some(stage)));
        }
    }

    let fallback_id = config
        .fallback_exercises
        .get(&slot.slot_type)
        .map(String::as_str)
        .unwrap_or_else(|| default_fallback_id(slot.slot_type));

    let fallback = catalog
        .query_exercises(&ExerciseFilter::by_id(fallback_id))?
        .into_iter()
        .find(|e| selector.fallback_ok(e));

    match fallback {
        Some(exercise) => {
            tracing::warn!(
                "Slot {} ({}) fell back to generic exercise {}",
                index,
                slot.slot_type,
                exercise.id
            );
            Ok(filled(index, slot, Some(exercise), level, Some(SelectionStage::Fallback)))
        }
        None => {
            tracing::warn!("Slot {} ({}) left unfilled", index, slot.slot_type);
            Ok(filled(index, slot, None, level, None))
        }
    }
}

/// Reps for an exercise at a resolved level
///
/// Base reps move by one step per level of difference between the resolved
/// level and the exercise's own level.
pub fn reps_at_level(exercise: &Exercise, level: Level) -> u32 {
    let step = i64::from((exercise.base_reps / 10).max(1));
    let gap = i64::from(level.get()) - i64::from(exercise.level.get());
    (i64::from(exercise.base_reps) + gap * step).clamp(MIN_REPS, MAX_REPS) as u32
}

fn filled(
    index: usize,
    slot: &BlueprintSlot,
    exercise: Option<Exercise>,
    level: Level,
    stage: Option<SelectionStage>,
) -> FilledSlot {
    let reps = exercise
        .as_ref()
        .map(|e| reps_at_level(e, level))
        .unwrap_or(0);
    FilledSlot {
        index,
        slot: slot.clone(),
        exercise,
        level,
        sets: slot.sets,
        reps,
        stage,
    }
}

/// Constraint checks for one slot
struct Selector<'a> {
    slot: &'a BlueprintSlot,
    injuries: &'a BTreeSet<BodyArea>,
    available: BTreeSet<&'a str>,
    widened: BTreeSet<&'a str>,
    level: Level,
    tolerance: u8,
}

impl<'a> Selector<'a> {
    fn new(
        slot: &'a BlueprintSlot,
        context: &'a GenerationContext,
        config: &'a FillerConfig,
        level: Level,
    ) -> Self {
        // The slot's own preferred gear is tolerated on top of what the
        // user has declared
        let available: BTreeSet<&str> = context
            .equipment_available()
            .iter()
            .chain(slot.preferred_equipment.iter())
            .map(String::as_str)
            .collect();
        let widened = available
            .iter()
            .copied()
            .chain(config.improvised_equipment.iter().map(String::as_str))
            .collect();

        Self {
            slot,
            injuries: context.injuries(),
            available,
            widened,
            level,
            tolerance: config.level_tolerance,
        }
    }

    fn pick<'e>(&self, stage: SelectionStage, candidates: &'e [Exercise]) -> Option<&'e Exercise> {
        candidates
            .iter()
            .filter(|e| self.accepts(stage, e))
            .min_by_key(|e| self.rank(*e))
    }

    fn accepts(&self, stage: SelectionStage, exercise: &Exercise) -> bool {
        if exercise.conflicts_with(self.injuries) || !self.within_sweat(exercise) {
            return false;
        }

        match stage {
            SelectionStage::Strict => {
                exercise.movement_pattern == self.slot.movement_pattern
                    && self
                        .slot
                        .target_muscle
                        .map_or(true, |m| exercise.muscle_groups.contains(&m))
                    && has_equipment(exercise, &self.available)
                    && self.within_level(exercise)
            }
            SelectionStage::WithoutMuscleTarget => {
                has_equipment(exercise, &self.available) && self.within_level(exercise)
            }
            SelectionStage::WidenedEquipment => has_equipment(exercise, &self.widened),
            SelectionStage::Fallback => self.fallback_ok(exercise),
        }
    }

    fn fallback_ok(&self, exercise: &Exercise) -> bool {
        !exercise.conflicts_with(self.injuries) && has_equipment(exercise, &self.widened)
    }

    /// Warm-up and cool-down work is not graded by difficulty
    fn within_level(&self, exercise: &Exercise) -> bool {
        self.slot.slot_type.needs_prep_time()
            || exercise.level.distance(self.level) <= self.tolerance
    }

    fn within_sweat(&self, exercise: &Exercise) -> bool {
        self.slot
            .max_sweat_level
            .map_or(true, |max| exercise.sweat_level <= max)
    }

    /// Lower is better; the id makes the order total
    fn rank<'e>(&self, exercise: &'e Exercise) -> (usize, bool, u8, &'e str) {
        let pattern_rank = self
            .slot
            .movement_pattern
            .compatible()
            .iter()
            .position(|p| *p == exercise.movement_pattern)
            .unwrap_or(usize::MAX);
        let misses_preferred = self.slot.needs_equipment()
            && !exercise
                .equipment
                .iter()
                .any(|e| self.slot.preferred_equipment.contains(e));

        (
            pattern_rank,
            misses_preferred,
            exercise.level.distance(self.level),
            exercise.id.as_str(),
        )
    }
}

fn has_equipment(exercise: &Exercise, allowed: &BTreeSet<&str>) -> bool {
    exercise
        .equipment
        .iter()
        .all(|e| allowed.contains(e.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{get_default_catalog, InMemoryCatalog, UnavailableCatalog};
    use crate::{Error, ShadowMatrix};

    fn home_context() -> GenerationContext {
        GenerationContext::new(Location::Home, 60, ShadowMatrix::default())
    }

    fn context_at_level(level: i64) -> GenerationContext {
        let mut matrix = ShadowMatrix::default();
        matrix.set_global_level(level);
        GenerationContext::new(Location::Home, 60, matrix)
    }

    fn fill(slot: &BlueprintSlot, context: &GenerationContext) -> FilledSlot {
        fill_slot(get_default_catalog(), 0, slot, context, &FillerConfig::default()).unwrap()
    }

    fn exercise_id(filled: &FilledSlot) -> &str {
        filled.exercise.as_ref().map(|e| e.id.as_str()).unwrap_or("")
    }

    #[test]
    fn test_strict_fill_matches_pattern_and_level() {
        crate::logging::init_test();
        let slot = BlueprintSlot::new(SlotType::Compound, MovementPattern::HorizontalPush, 3);
        let filled = fill(&slot, &context_at_level(8));

        assert_eq!(filled.stage, Some(SelectionStage::Strict));
        let exercise = filled.exercise.unwrap();
        assert_eq!(exercise.movement_pattern, MovementPattern::HorizontalPush);
        assert!(exercise.is_bodyweight());
        // push_up sits exactly at level 8
        assert_eq!(exercise.id, "push_up");
        assert_eq!(filled.sets, 3);
    }

    #[test]
    fn test_equipment_must_be_available() {
        let slot = BlueprintSlot::new(SlotType::Compound, MovementPattern::Hinge, 3);

        let without = fill(&slot, &context_at_level(9));
        assert_ne!(exercise_id(&without), "kettlebell_swing");

        let with = fill(&slot, &context_at_level(9).with_equipment(["kettlebell"]));
        assert_eq!(exercise_id(&with), "kettlebell_swing");
    }

    #[test]
    fn test_preferred_equipment_counts_as_available() {
        let mut slot = BlueprintSlot::new(SlotType::Compound, MovementPattern::Hinge, 3);
        slot.preferred_equipment.insert("kettlebell".into());

        // No declared equipment at all; the slot brings its own
        let filled = fill(&slot, &context_at_level(9));
        assert_eq!(filled.stage, Some(SelectionStage::Strict));
        assert_eq!(exercise_id(&filled), "kettlebell_swing");

        // Gear preferred by one slot does not leak into another
        let plain = BlueprintSlot::new(SlotType::Compound, MovementPattern::Hinge, 3);
        let filled = fill(&plain, &context_at_level(9));
        assert!(filled.exercise.unwrap().is_bodyweight());
    }

    #[test]
    fn test_preferred_equipment_ranks_first() {
        let mut slot = BlueprintSlot::new(SlotType::Compound, MovementPattern::HorizontalPull, 3);
        slot.preferred_equipment.insert("band".into());

        let context = context_at_level(6).with_equipment(["band", "low_bar"]);
        let filled = fill(&slot, &context);

        // inverted_row matches the level exactly but band_row uses the preferred band
        assert_eq!(exercise_id(&filled), "band_row");
    }

    #[test]
    fn test_injuries_are_never_relaxed() {
        let slot = BlueprintSlot::new(SlotType::Compound, MovementPattern::Squat, 3);
        let context = home_context().with_injuries([BodyArea::Knee]);
        let filled = fill(&slot, &context);

        if let Some(exercise) = &filled.exercise {
            assert!(!exercise.stresses.contains(&BodyArea::Knee));
        }
    }

    #[test]
    fn test_muscle_refinement_dropped_first() {
        let mut slot = BlueprintSlot::new(SlotType::Compound, MovementPattern::HorizontalPush, 3);
        slot.target_muscle = Some(MuscleGroup::Hamstrings);

        let filled = fill(&slot, &context_at_level(8));
        assert_eq!(filled.stage, Some(SelectionStage::WithoutMuscleTarget));
        assert_eq!(exercise_id(&filled), "push_up");
    }

    #[test]
    fn test_widened_equipment_accepts_improvised_gear() {
        // With reverse lunges and squats gone, only the bench-bound split
        // squat is left.
        let slot = BlueprintSlot::new(SlotType::Compound, MovementPattern::Lunge, 3);
        let catalog = InMemoryCatalog::new(
            get_default_catalog()
                .query_exercises(&ExerciseFilter::default())
                .unwrap()
                .into_iter()
                .filter(|e| e.id != "reverse_lunge" && e.movement_pattern != MovementPattern::Squat),
        );
        let filled = fill_slot(
            &catalog,
            0,
            &slot,
            &context_at_level(11),
            &FillerConfig::default(),
        )
        .unwrap();

        assert_eq!(filled.stage, Some(SelectionStage::WidenedEquipment));
        assert_eq!(exercise_id(&filled), "bulgarian_split_squat");
    }

    #[test]
    fn test_falls_back_to_generic_exercise() {
        let mut slot = BlueprintSlot::new(SlotType::Golden, MovementPattern::Balance, 3);
        slot.max_sweat_level = Some(0);

        // crow_pose is too sweaty and loads the wrist; single_leg_stand is
        // too far from level 20 until the level band is lifted
        let filled = fill(&slot, &context_at_level(20).with_injuries([BodyArea::Wrist]));
        assert_eq!(filled.stage, Some(SelectionStage::WidenedEquipment));
        assert_eq!(exercise_id(&filled), "single_leg_stand");

        let catalog = InMemoryCatalog::new(
            get_default_catalog()
                .query_exercises(&ExerciseFilter::default())
                .unwrap()
                .into_iter()
                .filter(|e| {
                    e.id == "box_breathing"
                        || !matches!(
                            e.movement_pattern,
                            MovementPattern::Balance | MovementPattern::MobilityLower
                        )
                }),
        );
        let mut config = FillerConfig::default();
        config
            .fallback_exercises
            .insert(SlotType::Golden, "box_breathing".into());

        let filled = fill_slot(&catalog, 0, &slot, &context_at_level(20), &config).unwrap();
        assert_eq!(filled.stage, Some(SelectionStage::Fallback));
        assert_eq!(exercise_id(&filled), "box_breathing");
    }

    #[test]
    fn test_unfillable_slot_is_a_warning() {
        let blueprint = WorkoutBlueprint {
            id: "knee_trouble".into(),
            name: "Knee Trouble".into(),
            slots: vec![
                BlueprintSlot::new(SlotType::Compound, MovementPattern::Conditioning, 3),
                BlueprintSlot::new(SlotType::Cooldown, MovementPattern::MobilityLower, 1),
            ],
            min_duration: 10,
            target_duration: 15,
            can_fragment: false,
        };
        let catalog = InMemoryCatalog::new(
            get_default_catalog()
                .query_exercises(&ExerciseFilter::default())
                .unwrap()
                .into_iter()
                .filter(|e| e.movement_pattern != MovementPattern::Conditioning),
        );
        let context = home_context().with_injuries([BodyArea::Knee]);

        let outcome =
            fill_slots(&catalog, &blueprint, &context, &FillerConfig::default()).unwrap();

        assert_eq!(outcome.slots.len(), 2);
        assert!(!outcome.slots[0].is_filled());
        assert_eq!(outcome.slots[0].reps, 0);
        assert!(outcome.slots[1].is_filled());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].slot_index, 0);
    }

    #[test]
    fn test_catalog_failure_aborts() {
        let slot = BlueprintSlot::new(SlotType::Warmup, MovementPattern::MobilityUpper, 1);
        let result = fill_slot(
            &UnavailableCatalog,
            0,
            &slot,
            &home_context(),
            &FillerConfig::default(),
        );
        assert!(matches!(result, Err(Error::CatalogUnavailable(_))));
    }

    #[test]
    fn test_selection_is_deterministic() {
        let slot = BlueprintSlot::new(SlotType::Warmup, MovementPattern::MobilityUpper, 2);
        let first = fill(&slot, &home_context());
        for _ in 0..10 {
            assert_eq!(fill(&slot, &home_context()), first);
        }
    }

    #[test]
    fn test_reps_scale_with_level() {
        let catalog = get_default_catalog();
        let air_squat = catalog.get("air_squat").unwrap();

        assert_eq!(reps_at_level(air_squat, Level::new(4)), 15);
        assert_eq!(reps_at_level(air_squat, Level::new(10)), 21);
        assert_eq!(reps_at_level(air_squat, Level::new(1)), 12);

        let high_knees = catalog.get("high_knees").unwrap();
        assert_eq!(reps_at_level(high_knees, Level::new(20)), 30);
    }

    #[test]
    fn test_resolved_level_recorded_on_slot() {
        let mut matrix = ShadowMatrix::default();
        matrix.set_movement_override(MovementGroup::Push, 14);
        let context = GenerationContext::new(Location::Home, 30, matrix);

        let slot = BlueprintSlot::new(SlotType::Compound, MovementPattern::HorizontalPush, 3);
        let filled = fill(&slot, &context);

        assert_eq!(filled.level.get(), 14);
        assert_eq!(exercise_id(&filled), "archer_push_up");
    }
}
