//! Exercise catalog: the query interface and the built-in exercise set.
//!
//! The engine only ever talks to [`ExerciseCatalog`]; a database or network
//! backed catalog implements the same trait and reports outages as
//! [`Error::CatalogUnavailable`].

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Query filter understood by every catalog
///
/// Empty lists mean "no restriction".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExerciseFilter {
    pub patterns: Vec<MovementPattern>,
    pub role: Option<ExerciseRole>,
    pub ids: Vec<String>,
}

impl ExerciseFilter {
    pub fn by_patterns(patterns: &[MovementPattern], role: ExerciseRole) -> Self {
        Self {
            patterns: patterns.to_vec(),
            role: Some(role),
            ids: Vec::new(),
        }
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            ids: vec![id.into()],
            ..Self::default()
        }
    }

    pub fn matches(&self, exercise: &Exercise) -> bool {
        (self.patterns.is_empty() || self.patterns.contains(&exercise.movement_pattern))
            && self.role.map_or(true, |r| exercise.roles.contains(&r))
            && (self.ids.is_empty() || self.ids.iter().any(|id| id == &exercise.id))
    }
}

/// Read-only source of exercise records
pub trait ExerciseCatalog {
    /// Return every exercise matching the filter, ordered by id
    fn query_exercises(&self, filter: &ExerciseFilter) -> Result<Vec<Exercise>>;
}

/// Catalog held entirely in memory, keyed (and therefore ordered) by id
#[derive(Clone, Debug, Default)]
pub struct InMemoryCatalog {
    exercises: BTreeMap<String, Exercise>,
    /// Ids seen more than once; the first record is kept
    duplicates: Vec<String>,
}

impl InMemoryCatalog {
    pub fn new(exercises: impl IntoIterator<Item = Exercise>) -> Self {
        let mut catalog = Self::default();
        for exercise in exercises {
            if catalog.exercises.contains_key(&exercise.id) {
                tracing::error!("Duplicate exercise ID '{}', keeping the first", exercise.id);
                catalog.duplicates.push(exercise.id);
                continue;
            }
            catalog.exercises.insert(exercise.id.clone(), exercise);
        }
        catalog
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.get(id)
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors: Vec<String> = self
            .duplicates
            .iter()
            .map(|id| format!("Duplicate exercise ID '{}'", id))
            .collect();

        for (id, exercise) in &self.exercises {
            if id.is_empty() {
                errors.push("Exercise has empty ID".to_string());
            }
            if exercise.name.is_empty() {
                errors.push(format!("Exercise '{}' has empty name", id));
            }
            if exercise.roles.is_empty() {
                errors.push(format!("Exercise '{}' has no roles", id));
            }
            if exercise.base_reps == 0 {
                errors.push(format!("Exercise '{}' has zero base reps", id));
            }
        }

        for slot_type in SlotType::ALL {
            let id = default_fallback_id(slot_type);
            match self.exercises.get(id) {
                None => errors.push(format!(
                    "Fallback exercise '{}' for {} slots is missing",
                    id, slot_type
                )),
                Some(exercise) if !exercise.is_bodyweight() => errors.push(format!(
                    "Fallback exercise '{}' for {} slots needs equipment",
                    id, slot_type
                )),
                Some(_) => {}
            }
        }

        errors
    }
}

impl ExerciseCatalog for InMemoryCatalog {
    fn query_exercises(&self, filter: &ExerciseFilter) -> Result<Vec<Exercise>> {
        Ok(self
            .exercises
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }
}

impl<C: ExerciseCatalog + ?Sized> ExerciseCatalog for &C {
    fn query_exercises(&self, filter: &ExerciseFilter) -> Result<Vec<Exercise>> {
        (**self).query_exercises(filter)
    }
}

/// Catalog that always fails; stands in for an unreachable backend
#[derive(Clone, Debug, Default)]
pub struct UnavailableCatalog;

impl ExerciseCatalog for UnavailableCatalog {
    fn query_exercises(&self, _filter: &ExerciseFilter) -> Result<Vec<Exercise>> {
        Err(Error::CatalogUnavailable("catalog backend offline".into()))
    }
}

/// Generic bodyweight exercise used when nothing else fits a slot type
pub fn default_fallback_id(slot_type: SlotType) -> &'static str {
    match slot_type {
        SlotType::Warmup => "arm_circles",
        SlotType::Cooldown => "box_breathing",
        SlotType::Accessory => "bird_dog",
        SlotType::Compound => "air_squat",
        SlotType::Isolation => "dead_bug",
        SlotType::Golden => "single_leg_stand",
        SlotType::Conditioning => "high_knees",
    }
}

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<InMemoryCatalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static InMemoryCatalog {
    &DEFAULT_CATALOG
}

#[allow(clippy::too_many_arguments)]
fn exercise(
    id: &str,
    name: &str,
    movement_pattern: MovementPattern,
    muscle_groups: &[MuscleGroup],
    equipment: &[&str],
    sweat_level: u8,
    roles: &[ExerciseRole],
    level: i64,
    stresses: &[BodyArea],
    base_reps: u32,
) -> Exercise {
    Exercise {
        id: id.into(),
        name: name.into(),
        movement_pattern,
        muscle_groups: muscle_groups.to_vec(),
        equipment: equipment.iter().map(|e| e.to_string()).collect(),
        sweat_level,
        roles: roles.to_vec(),
        level: Level::new(level),
        stresses: stresses.to_vec(),
        base_reps,
    }
}

/// Builds the default catalog with the built-in exercises
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference.
#[rustfmt::skip]
pub fn build_default_catalog() -> InMemoryCatalog {
    use BodyArea::*;
    use ExerciseRole::{Cooldown as Cool, Main, Warmup as Warm};
    use MovementPattern::*;
    use MuscleGroup::*;

    InMemoryCatalog::new([
        // ====================================================================
        // Warm-up / cool-down
        // ====================================================================
        exercise("arm_circles", "Arm Circles", MobilityUpper, &[Shoulders], &[], 0, &[Warm, Cool], 1, &[], 10),
        exercise("jumping_jacks", "Jumping Jacks", MovementPattern::Conditioning, &[Calves], &[], 2, &[Warm], 2, &[Ankle], 20),
        exercise("leg_swings", "Leg Swings", MobilityLower, &[Glutes, Hamstrings], &[], 0, &[Warm], 1, &[], 10),
        exercise("cat_cow", "Cat-Cow", MobilityUpper, &[Back], &[], 0, &[Warm, Cool], 1, &[], 8),
        exercise("worlds_greatest_stretch", "World's Greatest Stretch", MobilityLower, &[Glutes, Hamstrings], &[], 1, &[Warm, Cool], 4, &[Hip], 5),
        exercise("band_pull_apart", "Band Pull-Apart", MobilityUpper, &[Shoulders, Back], &["band"], 1, &[Warm], 3, &[Shoulder], 15),
        exercise("hamstring_stretch", "Standing Hamstring Stretch", MobilityLower, &[Hamstrings], &[], 0, &[Cool], 1, &[], 2),
        exercise("doorway_chest_stretch", "Doorway Chest Stretch", MobilityUpper, &[Chest, Shoulders], &[], 0, &[Cool], 1, &[Shoulder], 2),
        exercise("box_breathing", "Box Breathing", Balance, &[MuscleGroup::Core], &[], 0, &[Warm, Cool], 1, &[], 5),
        exercise("hip_cars", "Hip CARs", MobilityLower, &[Glutes], &[], 0, &[Warm, Main, Cool], 3, &[], 3),
        exercise("shoulder_cars", "Shoulder CARs", MobilityUpper, &[Shoulders], &[], 0, &[Warm, Main, Cool], 3, &[], 3),
        // ====================================================================
        // Push
        // ====================================================================
        exercise("wall_push_up", "Wall Push-up", HorizontalPush, &[Chest, Triceps], &[], 1, &[Main], 2, &[Wrist], 15),
        exercise("incline_push_up", "Incline Push-up", HorizontalPush, &[Chest, Triceps], &[], 2, &[Main], 5, &[Wrist], 12),
        exercise("push_up", "Push-up", HorizontalPush, &[Chest, Triceps, Shoulders], &[], 2, &[Main], 8, &[Wrist, Shoulder], 10),
        exercise("archer_push_up", "Archer Push-up", HorizontalPush, &[Chest, Triceps], &[], 2, &[Main], 14, &[Wrist, Shoulder], 6),
        exercise("dumbbell_bench_press", "Dumbbell Bench Press", HorizontalPush, &[Chest, Triceps], &["bench", "dumbbell"], 2, &[Main], 8, &[Shoulder], 10),
        exercise("pike_push_up", "Pike Push-up", VerticalPush, &[Shoulders, Triceps], &[], 2, &[Main], 9, &[Shoulder, Wrist], 8),
        exercise("dumbbell_overhead_press", "Dumbbell Overhead Press", VerticalPush, &[Shoulders, Triceps], &["dumbbell"], 2, &[Main], 7, &[Shoulder], 10),
        exercise("handstand_push_up", "Handstand Push-up", VerticalPush, &[Shoulders, Triceps], &[], 3, &[Main], 18, &[Shoulder, Wrist, Neck], 4),
        // ====================================================================
        // Pull
        // ====================================================================
        exercise("band_row", "Band Row", HorizontalPull, &[Back, Biceps], &["band"], 1, &[Main], 3, &[], 15),
        exercise("inverted_row", "Inverted Row", HorizontalPull, &[Back, Biceps], &["low_bar"], 2, &[Main], 6, &[Elbow], 10),
        exercise("dumbbell_row", "One-arm Dumbbell Row", HorizontalPull, &[Back, Biceps], &["dumbbell"], 2, &[Main], 7, &[LowerBack], 10),
        exercise("band_assisted_pull_up", "Band-assisted Pull-up", VerticalPull, &[Back, Biceps], &["band", "pullup_bar"], 2, &[Main], 8, &[Shoulder, Elbow], 6),
        exercise("pull_up", "Pull-up", VerticalPull, &[Back, Biceps], &["pullup_bar"], 3, &[Main], 12, &[Shoulder, Elbow], 6),
        // ====================================================================
        // Legs
        // ====================================================================
        exercise("air_squat", "Air Squat", Squat, &[Quads, Glutes], &[], 2, &[Main], 4, &[Knee], 15),
        exercise("goblet_squat", "Goblet Squat", Squat, &[Quads, Glutes], &["kettlebell"], 2, &[Main], 8, &[Knee], 10),
        exercise("pistol_squat", "Pistol Squat", Squat, &[Quads, Glutes], &[], 2, &[Main], 17, &[Knee, Ankle], 4),
        exercise("reverse_lunge", "Reverse Lunge", Lunge, &[Quads, Glutes], &[], 2, &[Main], 6, &[Knee], 10),
        exercise("bulgarian_split_squat", "Bulgarian Split Squat", Lunge, &[Quads, Glutes], &["bench"], 2, &[Main], 11, &[Knee], 8),
        exercise("glute_bridge", "Glute Bridge", Hinge, &[Glutes, Hamstrings], &[], 1, &[Main], 3, &[], 15),
        exercise("single_leg_rdl", "Single-leg Romanian Deadlift", Hinge, &[Hamstrings, Glutes], &[], 1, &[Main], 8, &[Ankle], 8),
        exercise("kettlebell_swing", "Kettlebell Swing", Hinge, &[Glutes, Hamstrings], &["kettlebell"], 3, &[Main], 9, &[LowerBack], 15),
        exercise("farmer_carry", "Farmer Carry", Carry, &[MuscleGroup::Core, Back], &["kettlebell"], 2, &[Main], 6, &[], 1),
        // ====================================================================
        // Core
        // ====================================================================
        exercise("dead_bug", "Dead Bug", CoreAntiExtension, &[MuscleGroup::Core], &[], 1, &[Main], 3, &[], 10),
        exercise("plank", "Forearm Plank", CoreAntiExtension, &[MuscleGroup::Core], &[], 1, &[Main], 4, &[], 1),
        exercise("ab_wheel_rollout", "Ab Wheel Rollout", CoreAntiExtension, &[MuscleGroup::Core], &["ab_wheel"], 2, &[Main], 13, &[LowerBack], 8),
        exercise("bird_dog", "Bird Dog", CoreAntiRotation, &[MuscleGroup::Core, Glutes], &[], 1, &[Main], 2, &[], 10),
        exercise("side_plank", "Side Plank", CoreAntiRotation, &[MuscleGroup::Core], &[], 1, &[Main], 6, &[Shoulder], 1),
        exercise("pallof_press", "Pallof Press", CoreAntiRotation, &[MuscleGroup::Core], &["band"], 1, &[Main], 5, &[], 10),
        exercise("crunch", "Crunch", CoreFlexion, &[MuscleGroup::Core], &[], 1, &[Main], 2, &[Neck], 15),
        exercise("hollow_body_hold", "Hollow Body Hold", CoreFlexion, &[MuscleGroup::Core], &[], 1, &[Main], 9, &[], 1),
        exercise("hanging_knee_raise", "Hanging Knee Raise", CoreFlexion, &[MuscleGroup::Core], &["pullup_bar"], 2, &[Main], 10, &[Shoulder], 10),
        // ====================================================================
        // Skill
        // ====================================================================
        exercise("single_leg_stand", "Single-leg Stand", Balance, &[Calves], &[], 0, &[Main], 1, &[], 1),
        exercise("crow_pose", "Crow Pose", Balance, &[Shoulders, MuscleGroup::Core], &[], 1, &[Main], 12, &[Wrist], 1),
        // ====================================================================
        // Conditioning
        // ====================================================================
        exercise("high_knees", "High Knees", MovementPattern::Conditioning, &[Quads, Calves], &[], 3, &[Main], 3, &[], 30),
        exercise("mountain_climber", "Mountain Climber", MovementPattern::Conditioning, &[MuscleGroup::Core, Quads], &[], 3, &[Main], 5, &[Wrist], 20),
        exercise("jump_rope", "Jump Rope", MovementPattern::Conditioning, &[Calves], &["jump_rope"], 3, &[Main], 6, &[Ankle], 50),
        exercise("burpee", "Burpee", MovementPattern::Conditioning, &[Chest, Quads], &[], 3, &[Main], 8, &[Wrist, Knee], 10),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_query_is_ordered_by_id() {
        let catalog = get_default_catalog();
        let results = catalog
            .query_exercises(&ExerciseFilter::by_patterns(
                &[MovementPattern::HorizontalPush],
                ExerciseRole::Main,
            ))
            .unwrap();

        assert!(results.len() >= 4);
        let ids: Vec<_> = results.iter().map(|e| e.id.clone()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_query_filters_by_role() {
        let catalog = get_default_catalog();
        let warmups = catalog
            .query_exercises(&ExerciseFilter::by_patterns(
                &[MovementPattern::MobilityLower],
                ExerciseRole::Warmup,
            ))
            .unwrap();

        assert!(!warmups.is_empty());
        assert!(warmups
            .iter()
            .all(|e| e.roles.contains(&ExerciseRole::Warmup)));
        assert!(warmups.iter().all(|e| e.id != "hamstring_stretch"));
    }

    #[test]
    fn test_query_by_id() {
        let catalog = get_default_catalog();
        let found = catalog
            .query_exercises(&ExerciseFilter::by_id("air_squat"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Air Squat");
    }

    #[test]
    fn test_validate_reports_missing_fallback() {
        let catalog = InMemoryCatalog::new(
            build_default_catalog()
                .query_exercises(&ExerciseFilter::default())
                .unwrap()
                .into_iter()
                .filter(|e| e.id != "bird_dog"),
        );
        let errors = catalog.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("bird_dog"));
    }

    #[test]
    fn test_duplicate_ids_are_reported() {
        let exercises = build_default_catalog()
            .query_exercises(&ExerciseFilter::default())
            .unwrap();
        let mut imposter = exercises[0].clone();
        imposter.name = "Imposter".into();
        let original_name = exercises[0].name.clone();
        let id = imposter.id.clone();

        let catalog = InMemoryCatalog::new(exercises.into_iter().chain([imposter]));

        assert_eq!(catalog.get(&id).unwrap().name, original_name);
        let errors = catalog.validate();
        assert_eq!(errors, vec![format!("Duplicate exercise ID '{}'", id)]);
    }

    #[test]
    fn test_unavailable_catalog_errors() {
        let err = UnavailableCatalog
            .query_exercises(&ExerciseFilter::default())
            .unwrap_err();
        assert!(matches!(err, Error::CatalogUnavailable(_)));
        assert!(err.is_retryable());
    }
}
