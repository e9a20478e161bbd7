//! Blueprint catalog: named session templates and their load-time validation.
//!
//! Authoring mistakes are caught here, when a library is built or loaded,
//! so that generation never has to second-guess a blueprint.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::path::Path;

/// Source of blueprints keyed by archetype id
pub trait BlueprintCatalog {
    fn load_blueprint(&self, archetype_id: &str) -> Result<WorkoutBlueprint>;
}

/// Validate a single blueprint
///
/// Returns a list of validation errors, or empty Vec if valid.
pub fn validate_blueprint(blueprint: &WorkoutBlueprint) -> Vec<String> {
    let mut errors = Vec::new();
    let id = &blueprint.id;

    if id.is_empty() {
        errors.push("Blueprint has empty ID".to_string());
    }
    if blueprint.name.is_empty() {
        errors.push(format!("Blueprint '{}' has empty name", id));
    }
    if blueprint.slots.is_empty() {
        errors.push(format!("Blueprint '{}' has no slots", id));
    }
    if blueprint.min_duration > blueprint.target_duration {
        errors.push(format!(
            "Blueprint '{}': min duration {} > target duration {}",
            id, blueprint.min_duration, blueprint.target_duration
        ));
    }

    for (index, slot) in blueprint.slots.iter().enumerate() {
        if slot.sets == 0 {
            errors.push(format!("Blueprint '{}': slot {} has zero sets", id, index));
        }
        if !blueprint.can_fragment {
            if let Some(part) = slot.fragment_part {
                errors.push(format!(
                    "Blueprint '{}': slot {} is tagged for part {} but the blueprint cannot fragment",
                    id, index, part
                ));
            }
        }
    }

    errors
}

/// In-memory set of validated blueprints
#[derive(Clone, Debug, Default)]
pub struct BlueprintLibrary {
    blueprints: BTreeMap<String, WorkoutBlueprint>,
}

impl BlueprintLibrary {
    /// Build a library, rejecting it if any blueprint is inconsistent
    pub fn new(blueprints: impl IntoIterator<Item = WorkoutBlueprint>) -> Result<Self> {
        let mut library = BTreeMap::new();
        let mut errors = Vec::new();

        for blueprint in blueprints {
            let problems = validate_blueprint(&blueprint);
            if !problems.is_empty() {
                for problem in &problems {
                    tracing::error!("{}", problem);
                }
                errors.extend(problems);
                continue;
            }
            if library.contains_key(&blueprint.id) {
                errors.push(format!("Duplicate blueprint ID '{}'", blueprint.id));
                continue;
            }
            library.insert(blueprint.id.clone(), blueprint);
        }

        if !errors.is_empty() {
            return Err(Error::BlueprintValidation(errors.join("; ")));
        }

        Ok(Self {
            blueprints: library,
        })
    }

    /// Load a library from a JSON array of blueprints
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let blueprints: Vec<WorkoutBlueprint> = serde_json::from_str(&contents)?;
        let library = Self::new(blueprints)?;
        tracing::info!(
            "Loaded {} blueprints from {:?}",
            library.blueprints.len(),
            path
        );
        Ok(library)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.blueprints.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkoutBlueprint> {
        self.blueprints.values()
    }

    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }
}

impl BlueprintCatalog for BlueprintLibrary {
    fn load_blueprint(&self, archetype_id: &str) -> Result<WorkoutBlueprint> {
        self.blueprints
            .get(archetype_id)
            .cloned()
            .ok_or_else(|| Error::UnknownBlueprint(archetype_id.to_string()))
    }
}

/// Cached default library
static DEFAULT_LIBRARY: Lazy<BlueprintLibrary> = Lazy::new(|| {
    BlueprintLibrary::new(default_blueprints()).unwrap_or_else(|e| {
        tracing::error!("Built-in blueprints failed validation: {}", e);
        BlueprintLibrary::default()
    })
});

/// Get a reference to the cached default blueprint library
pub fn get_default_library() -> &'static BlueprintLibrary {
    &DEFAULT_LIBRARY
}

fn slot(slot_type: SlotType, pattern: MovementPattern, sets: u32) -> BlueprintSlot {
    BlueprintSlot::new(slot_type, pattern, sets)
}

fn with_equipment(mut slot: BlueprintSlot, equipment: &[&str]) -> BlueprintSlot {
    slot.preferred_equipment = equipment.iter().map(|e| e.to_string()).collect();
    slot
}

/// The built-in blueprints
pub fn default_blueprints() -> Vec<WorkoutBlueprint> {
    use MovementPattern::*;
    use SlotType::*;

    let core_low_sweat = |pattern| BlueprintSlot {
        max_sweat_level: Some(1),
        target_muscle: Some(MuscleGroup::Core),
        ..slot(Isolation, pattern, 2)
    };

    vec![
        WorkoutBlueprint {
            id: "full_body_strength".into(),
            name: "Full Body Strength".into(),
            min_duration: 35,
            target_duration: 45,
            can_fragment: true,
            slots: vec![
                slot(Warmup, MobilityLower, 2),
                with_equipment(
                    BlueprintSlot {
                        target_muscle: Some(MuscleGroup::Quads),
                        ..slot(Compound, Squat, 3)
                    },
                    &["kettlebell"],
                ),
                slot(Compound, HorizontalPush, 3),
                with_equipment(slot(Compound, HorizontalPull, 3), &["band"]),
                core_low_sweat(CoreAntiExtension),
                BlueprintSlot {
                    is_optional: true,
                    ..slot(Accessory, Hinge, 2)
                },
                slot(Cooldown, MobilityUpper, 1),
            ],
        },
        WorkoutBlueprint {
            id: "calisthenics_skill".into(),
            name: "Calisthenics Skill Day".into(),
            min_duration: 30,
            target_duration: 40,
            can_fragment: true,
            slots: vec![
                slot(Warmup, MobilityUpper, 2),
                BlueprintSlot {
                    program: Some("calisthenics".into()),
                    ..slot(Golden, Balance, 3)
                },
                with_equipment(
                    BlueprintSlot {
                        program: Some("calisthenics".into()),
                        ..slot(Compound, VerticalPull, 3)
                    },
                    &["pullup_bar"],
                ),
                BlueprintSlot {
                    program: Some("calisthenics".into()),
                    ..slot(Compound, VerticalPush, 3)
                },
                core_low_sweat(CoreFlexion),
                slot(Cooldown, MobilityUpper, 1),
            ],
        },
        WorkoutBlueprint {
            id: "office_reset".into(),
            name: "Office Reset".into(),
            min_duration: 10,
            target_duration: 12,
            can_fragment: false,
            slots: vec![
                slot(Warmup, MobilityUpper, 1),
                core_low_sweat(CoreAntiRotation),
                slot(Accessory, MobilityLower, 2),
                slot(Cooldown, Balance, 1),
            ],
        },
        WorkoutBlueprint {
            id: "hiit_express".into(),
            name: "HIIT Express".into(),
            min_duration: 20,
            target_duration: 25,
            can_fragment: true,
            slots: vec![
                slot(Warmup, MovementPattern::Conditioning, 2),
                slot(SlotType::Conditioning, MovementPattern::Conditioning, 4),
                slot(Compound, Lunge, 3),
                BlueprintSlot {
                    fragment_part: Some(FragmentPart::B),
                    ..with_equipment(
                        slot(SlotType::Conditioning, MovementPattern::Conditioning, 3),
                        &["jump_rope"],
                    )
                },
                slot(Cooldown, MobilityLower, 1),
            ],
        },
        WorkoutBlueprint {
            id: "park_pull_day".into(),
            name: "Park Pull Day".into(),
            min_duration: 30,
            target_duration: 40,
            can_fragment: true,
            slots: vec![
                slot(Warmup, MobilityUpper, 2),
                BlueprintSlot {
                    fragment_part: Some(FragmentPart::B),
                    target_muscle: Some(MuscleGroup::Back),
                    ..with_equipment(slot(Compound, VerticalPull, 4), &["pullup_bar"])
                },
                with_equipment(slot(Compound, HorizontalPull, 3), &["low_bar"]),
                with_equipment(slot(Isolation, CoreFlexion, 3), &["pullup_bar"]),
                BlueprintSlot {
                    fragment_part: Some(FragmentPart::A),
                    is_optional: true,
                    ..slot(Accessory, MobilityUpper, 2)
                },
                slot(Cooldown, MobilityUpper, 1),
            ],
        },
    ]
}
