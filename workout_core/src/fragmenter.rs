//! Fragmenter: decides whether a session must be split in two and how.
//!
//! ## Decision
//!
//! `should_fragment = can_fragment && (time_constrained || location_mismatch)`
//!
//! - `time_constrained`: less time available than the blueprint's minimum
//! - `location_mismatch`: at a restrictive location (the office by default)
//!   with a blueprint that needs equipment
//!
//! ## Classification
//!
//! Slots are classified by [`ClassificationRule::ORDER`], first match wins.
//! Part A is the short, low-intensity, equipment-free fragment; part B holds
//! the main, equipment-dependent work.

use crate::config::FragmentationConfig;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Why a session was, or was not, split
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentationReason {
    FullWorkout,
    TimeConstraint,
    LocationMismatch,
}

/// The boolean inputs the decision was taken from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentationInputs {
    pub time_constrained: bool,
    pub at_restrictive_location: bool,
    pub blueprint_needs_equipment: bool,
    pub location_mismatch: bool,
    pub can_fragment: bool,
}

impl FragmentationInputs {
    pub fn evaluate(
        blueprint: &WorkoutBlueprint,
        context: &GenerationContext,
        config: &FragmentationConfig,
    ) -> Self {
        let time_constrained = context.time_available() < blueprint.min_duration;
        let at_restrictive_location = config.restrictive_locations.contains(&context.location());
        let blueprint_needs_equipment = blueprint.needs_equipment();

        Self {
            time_constrained,
            at_restrictive_location,
            blueprint_needs_equipment,
            location_mismatch: at_restrictive_location && blueprint_needs_equipment,
            can_fragment: blueprint.can_fragment,
        }
    }

    pub fn should_fragment(&self) -> bool {
        self.can_fragment && (self.time_constrained || self.location_mismatch)
    }

    pub fn reason(&self) -> FragmentationReason {
        if !self.should_fragment() {
            FragmentationReason::FullWorkout
        } else if self.time_constrained {
            FragmentationReason::TimeConstraint
        } else {
            FragmentationReason::LocationMismatch
        }
    }
}

/// One step of the slot classification precedence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationRule {
    ExplicitTag,
    LowImpactType,
    LowSweatPattern,
    SweatCeiling,
    NeedsEquipment,
    Optional,
    Default,
}

impl ClassificationRule {
    /// Precedence, highest first
    pub const ORDER: [ClassificationRule; 7] = [
        ClassificationRule::ExplicitTag,
        ClassificationRule::LowImpactType,
        ClassificationRule::LowSweatPattern,
        ClassificationRule::SweatCeiling,
        ClassificationRule::NeedsEquipment,
        ClassificationRule::Optional,
        ClassificationRule::Default,
    ];

    /// The partition this rule assigns, if it applies to the slot
    pub fn apply(self, slot: &BlueprintSlot, config: &FragmentationConfig) -> Option<FragmentPart> {
        match self {
            ClassificationRule::ExplicitTag => slot.fragment_part,
            ClassificationRule::LowImpactType => {
                slot.slot_type.is_low_impact().then_some(FragmentPart::A)
            }
            ClassificationRule::LowSweatPattern => {
                slot.movement_pattern.is_low_sweat().then_some(FragmentPart::A)
            }
            ClassificationRule::SweatCeiling => slot
                .max_sweat_level
                .filter(|max| *max <= config.part_a_sweat_ceiling)
                .map(|_| FragmentPart::A),
            ClassificationRule::NeedsEquipment => slot.needs_equipment().then_some(FragmentPart::B),
            ClassificationRule::Optional => slot.is_optional.then_some(FragmentPart::A),
            ClassificationRule::Default => Some(FragmentPart::B),
        }
    }
}

/// Partition assigned to one slot, and the rule that decided it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotClassification {
    pub index: usize,
    pub part: FragmentPart,
    pub rule: ClassificationRule,
}

/// Outcome of [`analyze`], kept for "why was this split" diagnostics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FragmentationResult {
    pub should_fragment: bool,
    pub reason: FragmentationReason,
    pub inputs: FragmentationInputs,
    pub part_a_slots: Vec<BlueprintSlot>,
    pub part_b_slots: Vec<BlueprintSlot>,
    /// Minutes
    pub part_a_duration: u32,
    /// Minutes
    pub part_b_duration: u32,
    /// Empty unless fragmenting
    pub classifications: Vec<SlotClassification>,
}

impl FragmentationResult {
    /// Partition of the blueprint slot at `index`; everything is part B
    /// when the session is not split
    pub fn part_of(&self, index: usize) -> FragmentPart {
        self.classifications
            .iter()
            .find(|c| c.index == index)
            .map(|c| c.part)
            .unwrap_or(FragmentPart::B)
    }
}

/// Classify one slot
pub fn classify_slot(
    slot: &BlueprintSlot,
    config: &FragmentationConfig,
) -> (FragmentPart, ClassificationRule) {
    ClassificationRule::ORDER
        .iter()
        .find_map(|rule| rule.apply(slot, config).map(|part| (part, *rule)))
        .unwrap_or((FragmentPart::B, ClassificationRule::Default))
}

/// Minutes one slot contributes to its fragment, before rounding
pub fn slot_minutes(slot: &BlueprintSlot, config: &FragmentationConfig) -> f64 {
    let per_set = match slot.slot_type {
        SlotType::Golden => config.golden_minutes_per_set,
        SlotType::Warmup
        | SlotType::Cooldown
        | SlotType::Accessory
        | SlotType::Compound
        | SlotType::Isolation
        | SlotType::Conditioning => config.minutes_per_set,
    };
    let prep = if slot.slot_type.needs_prep_time() {
        config.prep_minutes
    } else {
        0.0
    };
    f64::from(slot.sets) * per_set + prep
}

/// Estimated minutes for a set of slots, rounded to the nearest minute
pub fn estimate_duration<'a, I>(slots: I, config: &FragmentationConfig) -> u32
where
    I: IntoIterator<Item = &'a BlueprintSlot>,
{
    let total: f64 = slots.into_iter().map(|s| slot_minutes(s, config)).sum();
    total.round() as u32
}

/// Decide whether and how to split `blueprint` for `context`
pub fn analyze(
    blueprint: &WorkoutBlueprint,
    context: &GenerationContext,
    config: &FragmentationConfig,
) -> FragmentationResult {
    let inputs = FragmentationInputs::evaluate(blueprint, context, config);
    let reason = inputs.reason();

    if !inputs.should_fragment() {
        tracing::info!("Blueprint {}: full workout", blueprint.id);
        return FragmentationResult {
            should_fragment: false,
            reason,
            inputs,
            part_a_slots: Vec::new(),
            part_b_slots: blueprint.slots.clone(),
            part_a_duration: 0,
            part_b_duration: blueprint.target_duration,
            classifications: Vec::new(),
        };
    }

    let classifications: Vec<SlotClassification> = blueprint
        .slots
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            let (part, rule) = classify_slot(slot, config);
            tracing::debug!("Slot {} ({}) -> part {} by {:?}", index, slot.slot_type, part, rule);
            SlotClassification { index, part, rule }
        })
        .collect();

    let (part_a_slots, part_b_slots): (Vec<_>, Vec<_>) = blueprint
        .slots
        .iter()
        .zip(&classifications)
        .partition(|(_, c)| c.part == FragmentPart::A);
    let part_a_slots: Vec<BlueprintSlot> = part_a_slots.into_iter().map(|(s, _)| s.clone()).collect();
    let part_b_slots: Vec<BlueprintSlot> = part_b_slots.into_iter().map(|(s, _)| s.clone()).collect();

    let part_a_duration = estimate_duration(&part_a_slots, config);
    let part_b_duration = estimate_duration(&part_b_slots, config);

    tracing::info!(
        "Blueprint {}: fragmenting ({:?}), part A {} min / {} slots, part B {} min / {} slots",
        blueprint.id,
        reason,
        part_a_duration,
        part_a_slots.len(),
        part_b_duration,
        part_b_slots.len()
    );

    FragmentationResult {
        should_fragment: true,
        reason,
        inputs,
        part_a_slots,
        part_b_slots,
        part_a_duration,
        part_b_duration,
        classifications,
    }
}

/// Build the session body from filled slots and the analysis
///
/// An empty fragment is created already completed so it never holds up
/// completion of the day.
pub fn assemble(
    blueprint: &WorkoutBlueprint,
    result: &FragmentationResult,
    filled: Vec<FilledSlot>,
) -> SessionBody {
    if !result.should_fragment {
        return SessionBody::Single {
            slots: filled,
            is_completed: false,
        };
    }

    let (part_a, part_b): (Vec<_>, Vec<_>) = filled
        .into_iter()
        .partition(|s| result.part_of(s.index) == FragmentPart::A);

    let fragment = |part: FragmentPart, slots: Vec<FilledSlot>, estimated_duration: u32| {
        WorkoutFragment {
            part,
            name: format!("{} (Part {})", blueprint.name, part),
            is_completed: slots.is_empty(),
            slots,
            estimated_duration,
        }
    };

    SessionBody::Fragmented {
        fragments: vec![
            fragment(FragmentPart::A, part_a, result.part_a_duration),
            fragment(FragmentPart::B, part_b, result.part_b_duration),
        ],
    }
}
