//! Core domain types for the workout generation engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Closed tag sets (slot types, movement patterns, groups, body areas)
//! - Exercises as returned by the catalog
//! - Blueprints and their slots
//! - The generation context and the generated session

use crate::matrix::ShadowMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Difficulty Level
// ============================================================================

/// Difficulty level in the range 1..=20
///
/// Every way of building a `Level` clamps into range, including
/// deserialization, so an out-of-range value can never reach exercise
/// selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Level(u8);

impl Level {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 20;
    pub const DEFAULT: Level = Level(10);

    /// Build a level, clamping into [1, 20]
    pub fn new(value: i64) -> Self {
        let clamped = value.clamp(Self::MIN as i64, Self::MAX as i64);
        if clamped != value {
            tracing::warn!("Level {} out of range, clamped to {}", value, clamped);
        }
        Level(clamped as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Absolute distance between two levels
    pub fn distance(self, other: Level) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<i64> for Level {
    fn from(value: i64) -> Self {
        Level::new(value)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tag Sets
// ============================================================================

/// Role of a slot within a blueprint
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Warmup,
    Cooldown,
    Accessory,
    Compound,
    Isolation,
    /// Skill work; needs the most rest between sets
    Golden,
    Conditioning,
}

impl SlotType {
    pub const ALL: [SlotType; 7] = [
        SlotType::Warmup,
        SlotType::Cooldown,
        SlotType::Accessory,
        SlotType::Compound,
        SlotType::Isolation,
        SlotType::Golden,
        SlotType::Conditioning,
    ];

    /// Warm-up, cool-down and accessory work can go into the short fragment
    pub fn is_low_impact(self) -> bool {
        match self {
            SlotType::Warmup | SlotType::Cooldown | SlotType::Accessory => true,
            SlotType::Compound
            | SlotType::Isolation
            | SlotType::Golden
            | SlotType::Conditioning => false,
        }
    }

    /// Slots that carry extra movement-prep time on top of their sets
    pub fn needs_prep_time(self) -> bool {
        match self {
            SlotType::Warmup | SlotType::Cooldown => true,
            SlotType::Accessory
            | SlotType::Compound
            | SlotType::Isolation
            | SlotType::Golden
            | SlotType::Conditioning => false,
        }
    }

    /// Catalog role an exercise must carry to fill a slot of this type
    pub fn role(self) -> ExerciseRole {
        match self {
            SlotType::Warmup => ExerciseRole::Warmup,
            SlotType::Cooldown => ExerciseRole::Cooldown,
            SlotType::Accessory
            | SlotType::Compound
            | SlotType::Isolation
            | SlotType::Golden
            | SlotType::Conditioning => ExerciseRole::Main,
        }
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlotType::Warmup => "warmup",
            SlotType::Cooldown => "cooldown",
            SlotType::Accessory => "accessory",
            SlotType::Compound => "compound",
            SlotType::Isolation => "isolation",
            SlotType::Golden => "golden",
            SlotType::Conditioning => "conditioning",
        };
        f.write_str(s)
    }
}

/// Role tag on a catalog exercise
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseRole {
    Warmup,
    Main,
    Cooldown,
}

/// Broad movement group, the granularity of the shadow matrix
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementGroup {
    Push,
    Pull,
    Legs,
    Core,
    Mobility,
    Skill,
    Conditioning,
}

impl MovementGroup {
    pub const ALL: [MovementGroup; 7] = [
        MovementGroup::Push,
        MovementGroup::Pull,
        MovementGroup::Legs,
        MovementGroup::Core,
        MovementGroup::Mobility,
        MovementGroup::Skill,
        MovementGroup::Conditioning,
    ];
}

/// Movement pattern of a slot or an exercise
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementPattern {
    HorizontalPush,
    VerticalPush,
    HorizontalPull,
    VerticalPull,
    Squat,
    Hinge,
    Lunge,
    Carry,
    CoreAntiExtension,
    CoreAntiRotation,
    CoreFlexion,
    MobilityUpper,
    MobilityLower,
    Balance,
    Conditioning,
}

impl MovementPattern {
    /// Movement group used for level resolution
    pub fn group(self) -> MovementGroup {
        match self {
            MovementPattern::HorizontalPush | MovementPattern::VerticalPush => MovementGroup::Push,
            MovementPattern::HorizontalPull | MovementPattern::VerticalPull => MovementGroup::Pull,
            MovementPattern::Squat
            | MovementPattern::Hinge
            | MovementPattern::Lunge
            | MovementPattern::Carry => MovementGroup::Legs,
            MovementPattern::CoreAntiExtension
            | MovementPattern::CoreAntiRotation
            | MovementPattern::CoreFlexion => MovementGroup::Core,
            MovementPattern::MobilityUpper | MovementPattern::MobilityLower => {
                MovementGroup::Mobility
            }
            MovementPattern::Balance => MovementGroup::Skill,
            MovementPattern::Conditioning => MovementGroup::Conditioning,
        }
    }

    /// Low-sweat patterns: core stability, mobility and balance skill work
    pub fn is_low_sweat(self) -> bool {
        match self {
            MovementPattern::CoreAntiExtension
            | MovementPattern::CoreAntiRotation
            | MovementPattern::CoreFlexion
            | MovementPattern::MobilityUpper
            | MovementPattern::MobilityLower
            | MovementPattern::Balance => true,
            MovementPattern::HorizontalPush
            | MovementPattern::VerticalPush
            | MovementPattern::HorizontalPull
            | MovementPattern::VerticalPull
            | MovementPattern::Squat
            | MovementPattern::Hinge
            | MovementPattern::Lunge
            | MovementPattern::Carry
            | MovementPattern::Conditioning => false,
        }
    }

    /// Patterns accepted as a substitute once the strict match is relaxed
    ///
    /// The pattern itself always comes first.
    pub fn compatible(self) -> &'static [MovementPattern] {
        use MovementPattern::*;
        match self {
            HorizontalPush => &[HorizontalPush, VerticalPush],
            VerticalPush => &[VerticalPush, HorizontalPush],
            HorizontalPull => &[HorizontalPull, VerticalPull],
            VerticalPull => &[VerticalPull, HorizontalPull],
            Squat => &[Squat, Lunge],
            Hinge => &[Hinge, Squat],
            Lunge => &[Lunge, Squat],
            Carry => &[Carry, CoreAntiRotation],
            CoreAntiExtension => &[CoreAntiExtension, CoreAntiRotation, CoreFlexion],
            CoreAntiRotation => &[CoreAntiRotation, CoreAntiExtension],
            CoreFlexion => &[CoreFlexion, CoreAntiExtension],
            MobilityUpper => &[MobilityUpper, MobilityLower],
            MobilityLower => &[MobilityLower, MobilityUpper],
            Balance => &[Balance, MobilityLower],
            Conditioning => &[Conditioning],
        }
    }
}

/// Muscle group targeted by an exercise
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Core,
    Glutes,
    Quads,
    Hamstrings,
    Calves,
}

/// Body area used for injury exclusions
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyArea {
    Neck,
    Shoulder,
    Elbow,
    Wrist,
    LowerBack,
    Hip,
    Knee,
    Ankle,
}

/// Where the user is going to train
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Home,
    Park,
    Gym,
    Office,
    Street,
}

/// One of the two mini-sessions of a fragmented workout
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FragmentPart {
    A,
    B,
}

impl fmt::Display for FragmentPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentPart::A => f.write_str("A"),
            FragmentPart::B => f.write_str("B"),
        }
    }
}

// ============================================================================
// Exercise Catalog Types
// ============================================================================

/// An exercise record as returned by the catalog
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub movement_pattern: MovementPattern,
    pub muscle_groups: Vec<MuscleGroup>,
    /// Required equipment; empty means bodyweight
    pub equipment: Vec<String>,
    pub sweat_level: u8,
    pub roles: Vec<ExerciseRole>,
    pub level: Level,
    /// Joints and areas loaded by the movement
    pub stresses: Vec<BodyArea>,
    pub base_reps: u32,
}

impl Exercise {
    pub fn is_bodyweight(&self) -> bool {
        self.equipment.is_empty()
    }

    pub fn conflicts_with(&self, injuries: &BTreeSet<BodyArea>) -> bool {
        self.stresses.iter().any(|area| injuries.contains(area))
    }
}

// ============================================================================
// Blueprint Types
// ============================================================================

/// One planned exercise position within a blueprint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlueprintSlot {
    #[serde(rename = "type")]
    pub slot_type: SlotType,
    pub movement_pattern: MovementPattern,
    pub sets: u32,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub max_sweat_level: Option<u8>,
    /// Empty means bodyweight
    #[serde(default)]
    pub preferred_equipment: BTreeSet<String>,
    /// Explicit fragment assignment, wins over every heuristic
    #[serde(default)]
    pub fragment_part: Option<FragmentPart>,
    /// Muscle refinement, dropped first when the slot cannot be filled
    #[serde(default)]
    pub target_muscle: Option<MuscleGroup>,
    #[serde(default)]
    pub program: Option<String>,
}

impl BlueprintSlot {
    /// Minimal slot; the remaining fields default to "unconstrained"
    pub fn new(slot_type: SlotType, movement_pattern: MovementPattern, sets: u32) -> Self {
        Self {
            slot_type,
            movement_pattern,
            sets,
            is_optional: false,
            max_sweat_level: None,
            preferred_equipment: BTreeSet::new(),
            fragment_part: None,
            target_muscle: None,
            program: None,
        }
    }

    pub fn needs_equipment(&self) -> bool {
        !self.preferred_equipment.is_empty()
    }
}

/// Static template describing the slot composition of a workout archetype
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkoutBlueprint {
    pub id: String,
    pub name: String,
    pub slots: Vec<BlueprintSlot>,
    /// Minutes
    pub min_duration: u32,
    /// Minutes
    pub target_duration: u32,
    pub can_fragment: bool,
}

impl WorkoutBlueprint {
    pub fn needs_equipment(&self) -> bool {
        self.slots.iter().any(BlueprintSlot::needs_equipment)
    }
}

// ============================================================================
// Generation Context
// ============================================================================

/// Immutable input snapshot for one generation request
///
/// Owns its shadow matrix by value so that later edits to the user's live
/// matrix cannot leak into a generation already in flight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationContext {
    location: Location,
    time_available: u32,
    equipment_available: BTreeSet<String>,
    injuries: BTreeSet<BodyArea>,
    shadow_matrix: ShadowMatrix,
}

impl GenerationContext {
    pub fn new(location: Location, time_available: u32, shadow_matrix: ShadowMatrix) -> Self {
        Self {
            location,
            time_available,
            equipment_available: BTreeSet::new(),
            injuries: BTreeSet::new(),
            shadow_matrix,
        }
    }

    pub fn with_equipment<I, S>(mut self, equipment: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.equipment_available
            .extend(equipment.into_iter().map(Into::into));
        self
    }

    pub fn with_injuries<I>(mut self, injuries: I) -> Self
    where
        I: IntoIterator<Item = BodyArea>,
    {
        self.injuries.extend(injuries);
        self
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Minutes
    pub fn time_available(&self) -> u32 {
        self.time_available
    }

    pub fn equipment_available(&self) -> &BTreeSet<String> {
        &self.equipment_available
    }

    pub fn injuries(&self) -> &BTreeSet<BodyArea> {
        &self.injuries
    }

    pub fn shadow_matrix(&self) -> &ShadowMatrix {
        &self.shadow_matrix
    }
}

// ============================================================================
// Generated Session Types
// ============================================================================

/// Which selection stage produced a slot's exercise
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStage {
    /// Every hard constraint satisfied
    Strict,
    /// Muscle refinement dropped, compatible patterns accepted
    WithoutMuscleTarget,
    /// Improvised equipment accepted, level band lifted
    WidenedEquipment,
    /// Designated generic exercise for the slot type
    Fallback,
}

/// A blueprint slot paired with its concrete exercise
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilledSlot {
    /// Position of the slot in its blueprint
    pub index: usize,
    pub slot: BlueprintSlot,
    /// `None` when every relaxation failed; see the session warnings
    pub exercise: Option<Exercise>,
    pub level: Level,
    pub sets: u32,
    pub reps: u32,
    pub stage: Option<SelectionStage>,
}

impl FilledSlot {
    pub fn is_filled(&self) -> bool {
        self.exercise.is_some()
    }
}

/// Non-fatal problem recorded while generating a session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotWarning {
    pub slot_index: usize,
    pub message: String,
}

/// One independently-completable mini-session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkoutFragment {
    pub part: FragmentPart,
    pub name: String,
    pub slots: Vec<FilledSlot>,
    /// Minutes
    pub estimated_duration: u32,
    pub is_completed: bool,
}

/// Shape of a generated session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionBody {
    Single {
        slots: Vec<FilledSlot>,
        is_completed: bool,
    },
    Fragmented {
        fragments: Vec<WorkoutFragment>,
    },
}

/// Output of one generation call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSession {
    /// Derived from the inputs, identical across regenerations
    pub id: Uuid,
    pub blueprint_id: String,
    pub body: SessionBody,
    pub warnings: Vec<SlotWarning>,
}

impl GeneratedSession {
    pub fn is_fragmented(&self) -> bool {
        matches!(self.body, SessionBody::Fragmented { .. })
    }

    pub fn fragments(&self) -> &[WorkoutFragment] {
        match &self.body {
            SessionBody::Fragmented { fragments } => fragments,
            SessionBody::Single { .. } => &[],
        }
    }

    pub fn fragment(&self, part: FragmentPart) -> Option<&WorkoutFragment> {
        self.fragments().iter().find(|f| f.part == part)
    }

    /// All filled slots in blueprint order, regardless of fragmentation
    pub fn slots(&self) -> Vec<&FilledSlot> {
        let mut slots: Vec<&FilledSlot> = match &self.body {
            SessionBody::Single { slots, .. } => slots.iter().collect(),
            SessionBody::Fragmented { fragments } => {
                fragments.iter().flat_map(|f| f.slots.iter()).collect()
            }
        };
        slots.sort_by_key(|s| s.index);
        slots
    }

    /// A fragmented session is done only when every fragment is done
    pub fn is_completed(&self) -> bool {
        match &self.body {
            SessionBody::Single { is_completed, .. } => *is_completed,
            SessionBody::Fragmented { fragments } => {
                !fragments.is_empty() && fragments.iter().all(|f| f.is_completed)
            }
        }
    }

    /// Mark one fragment as done; returns false if the session has no such part
    pub fn complete_fragment(&mut self, part: FragmentPart) -> bool {
        match &mut self.body {
            SessionBody::Fragmented { fragments } => {
                match fragments.iter_mut().find(|f| f.part == part) {
                    Some(fragment) => {
                        fragment.is_completed = true;
                        true
                    }
                    None => false,
                }
            }
            SessionBody::Single { .. } => false,
        }
    }

    /// Mark the whole session as done
    pub fn mark_completed(&mut self) {
        match &mut self.body {
            SessionBody::Single { is_completed, .. } => *is_completed = true,
            SessionBody::Fragmented { fragments } => {
                for fragment in fragments {
                    fragment.is_completed = true;
                }
            }
        }
    }
}
