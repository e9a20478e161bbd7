use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use workout_core::blueprint::BlueprintLibrary;
use workout_core::fragmenter::FragmentationResult;
use workout_core::*;

#[derive(Parser)]
#[command(name = "wgen")]
#[command(about = "Personalized workout session generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Load blueprints from a JSON file instead of the built-in library
    #[arg(long, global = true)]
    blueprints: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a session from a blueprint
    Generate {
        /// Blueprint archetype id
        #[arg(long)]
        blueprint: String,

        /// Profile to read equipment, injuries and shadow matrix from
        #[arg(long, default_value = "default")]
        user: String,

        /// Where the session happens (home, park, gym, office, street)
        #[arg(long, value_parser = parse_tag::<Location>)]
        location: Option<Location>,

        /// Minutes available
        #[arg(long)]
        time: Option<u32>,

        /// Extra equipment on hand (repeatable)
        #[arg(long)]
        equipment: Vec<String>,

        /// Extra injured body area (repeatable)
        #[arg(long, value_parser = parse_tag::<BodyArea>)]
        injury: Vec<BodyArea>,

        /// Print the session as JSON
        #[arg(long)]
        json: bool,

        /// Show why the session was or was not split
        #[arg(long)]
        explain: bool,
    },

    /// List available blueprints
    Blueprints,

    /// Edit a user's equipment and injuries
    Profile {
        #[arg(long, default_value = "default")]
        user: String,

        /// Equipment to add (repeatable)
        #[arg(long)]
        equipment: Vec<String>,

        /// Injured body area to add (repeatable)
        #[arg(long, value_parser = parse_tag::<BodyArea>)]
        injury: Vec<BodyArea>,

        /// Clear equipment and injuries before adding
        #[arg(long)]
        clear: bool,
    },

    /// Show or edit a user's shadow matrix
    Matrix {
        #[arg(long, default_value = "default")]
        user: String,

        #[command(subcommand)]
        action: MatrixAction,
    },
}

#[derive(Subcommand)]
enum MatrixAction {
    /// Print the matrix as JSON
    Show,
    /// Use one level for everything
    Global { level: i64 },
    /// Go back to granular levels
    GlobalOff,
    /// Set (or, without a level, clear) a movement-group override
    Movement {
        #[arg(value_parser = parse_tag::<MovementGroup>)]
        group: MovementGroup,
        level: Option<i64>,
    },
    /// Set (or, without a level, clear) a muscle-group override
    Muscle {
        #[arg(value_parser = parse_tag::<MuscleGroup>)]
        group: MuscleGroup,
        level: Option<i64>,
    },
    /// Set (or, without a level, clear) a program override
    Program { id: String, level: Option<i64> },
    /// Restore all defaults
    Reset,
}

/// Parse a snake_case tag into one of the core enums
fn parse_tag<T: DeserializeOwned>(s: &str) -> std::result::Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_lowercase().replace('-', "_")))
        .map_err(|_| format!("unknown value '{}'", s))
}

fn main() -> Result<()> {
    workout_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data dir {:?}", data_dir);
    let store = ProfileStore::new(&data_dir);

    let library = match &cli.blueprints {
        Some(path) => BlueprintLibrary::load_from(path)?,
        None => get_default_library().clone(),
    };

    match cli.command {
        Commands::Generate {
            blueprint,
            user,
            location,
            time,
            equipment,
            injury,
            json,
            explain,
        } => {
            let profile = store.get_user_profile(&user)?;
            let context = profile
                .context(
                    location.unwrap_or(config.defaults.location),
                    time.unwrap_or(config.defaults.time_available),
                )
                .with_equipment(equipment)
                .with_injuries(injury);
            cmd_generate(&library, &blueprint, &context, &config, json, explain)
        }
        Commands::Blueprints => cmd_blueprints(&library),
        Commands::Profile {
            user,
            equipment,
            injury,
            clear,
        } => {
            let profile = store.update(&user, |profile| {
                if clear {
                    profile.equipment.clear();
                    profile.injuries.clear();
                }
                profile.equipment.extend(equipment);
                profile.injuries.extend(injury);
                Ok(())
            })?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }
        Commands::Matrix { user, action } => cmd_matrix(&store, &user, action),
    }
}

fn cmd_generate(
    library: &BlueprintLibrary,
    archetype: &str,
    context: &GenerationContext,
    config: &Config,
    json: bool,
    explain: bool,
) -> Result<()> {
    let generation = match generate(library, get_default_catalog(), archetype, context, config) {
        Ok(generation) => generation,
        Err(e) if e.is_retryable() => {
            eprintln!("Generation failed, please try again: {}", e);
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    if json {
        let output = if explain {
            serde_json::json!({
                "session": generation.session,
                "fragmentation": generation.fragmentation,
            })
        } else {
            serde_json::to_value(&generation.session)?
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    display_session(&generation.session, library, context);
    if explain {
        display_explanation(&generation.fragmentation, context);
    }
    Ok(())
}

fn cmd_blueprints(library: &BlueprintLibrary) -> Result<()> {
    for blueprint in library.iter() {
        println!(
            "{:<22} {:<26} {:>2}-{:>2} min  {} slots{}",
            blueprint.id,
            blueprint.name,
            blueprint.min_duration,
            blueprint.target_duration,
            blueprint.slots.len(),
            if blueprint.can_fragment { "  (splittable)" } else { "" }
        );
    }
    Ok(())
}

fn cmd_matrix(store: &ProfileStore, user: &str, action: MatrixAction) -> Result<()> {
    let profile = match action {
        MatrixAction::Show => store.get_user_profile(user)?,
        action => store.update(user, |profile| {
            let matrix = &mut profile.shadow_matrix;
            match action {
                MatrixAction::Show => {}
                MatrixAction::Global { level } => matrix.set_global_level(level),
                MatrixAction::GlobalOff => matrix.disable_global_level(),
                MatrixAction::Movement { group, level } => match level {
                    Some(level) => matrix.set_movement_override(group, level),
                    None => matrix.clear_movement_override(group),
                },
                MatrixAction::Muscle { group, level } => match level {
                    Some(level) => matrix.set_muscle_override(group, level),
                    None => matrix.clear_muscle_override(group),
                },
                MatrixAction::Program { id, level } => match level {
                    Some(level) => matrix.set_program_override(id, level),
                    None => matrix.clear_program_override(&id),
                },
                MatrixAction::Reset => matrix.reset(),
            }
            Ok(())
        })?,
    };

    println!("{}", serde_json::to_string_pretty(&profile.shadow_matrix)?);
    Ok(())
}

fn display_session(
    session: &GeneratedSession,
    library: &BlueprintLibrary,
    context: &GenerationContext,
) {
    let name = library
        .load_blueprint(&session.blueprint_id)
        .map(|b| b.name)
        .unwrap_or_else(|_| session.blueprint_id.clone());

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", name);
    println!("╰─────────────────────────────────────────╯");
    println!(
        "  {:?}, {} min available",
        context.location(),
        context.time_available()
    );

    match &session.body {
        SessionBody::Single { slots, .. } => {
            println!();
            for slot in slots {
                display_slot(slot);
            }
        }
        SessionBody::Fragmented { fragments } => {
            println!("  Split into {} parts", fragments.len());
            for fragment in fragments {
                println!();
                println!("  {} (~{} min)", fragment.name, fragment.estimated_duration);
                for slot in &fragment.slots {
                    display_slot(slot);
                }
            }
        }
    }

    if !session.warnings.is_empty() {
        println!();
        for warning in &session.warnings {
            println!("  ⚠ {}", warning.message);
        }
    }
    println!();
}

fn display_slot(slot: &FilledSlot) {
    match &slot.exercise {
        Some(exercise) => println!(
            "  → {:<32} {} × {}  (L{}, {})",
            exercise.name, slot.sets, slot.reps, slot.level, slot.slot.slot_type
        ),
        None => println!("  → {:<32} unfilled", format!("[{}]", slot.slot.slot_type)),
    }
}

fn display_explanation(result: &FragmentationResult, context: &GenerationContext) {
    let inputs = &result.inputs;
    println!("─────────────────────────────────────────");
    println!("Decision: {:?}", result.reason);
    println!("  can fragment:          {}", inputs.can_fragment);
    println!(
        "  time constrained:      {} ({} min available)",
        inputs.time_constrained,
        context.time_available()
    );
    println!("  restrictive location:  {}", inputs.at_restrictive_location);
    println!("  needs equipment:       {}", inputs.blueprint_needs_equipment);
    for c in &result.classifications {
        println!("  slot {} → part {} ({:?})", c.index, c.part, c.rule);
    }
    println!(
        "  Part A: {} min, Part B: {} min",
        result.part_a_duration, result.part_b_duration
    );
}
