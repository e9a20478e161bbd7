//! Generation engine: blueprint + context → session.
//!
//! The pipeline is pure and synchronous:
//! 1. Analyze the *unfilled* blueprint to decide splitting and partitions
//! 2. Resolve levels and fill every slot from the catalog
//! 3. Assemble the single or fragmented session
//!
//! The session id is derived from the inputs, so regenerating with the same
//! blueprint, context and settings yields an identical session.
//!
//! [`GenerationTracker`] enforces last-request-wins when the caller
//! regenerates repeatedly.

use crate::blueprint::BlueprintCatalog;
use crate::catalog::ExerciseCatalog;
use crate::config::Config;
use crate::filler::fill_slots;
use crate::fragmenter::{analyze, assemble, FragmentationResult};
use crate::{Error, GeneratedSession, GenerationContext, Result, WorkoutBlueprint};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Namespace for deterministic session ids
const SESSION_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a8e_93d4_4b57_a0e1_5c3b_7d92_e418);

/// A generated session together with the analysis that shaped it
#[derive(Clone, Debug, PartialEq)]
pub struct Generation {
    pub session: GeneratedSession,
    pub fragmentation: FragmentationResult,
}

/// Generate a session for an already loaded blueprint
pub fn generate_session<C: ExerciseCatalog + ?Sized>(
    catalog: &C,
    blueprint: &WorkoutBlueprint,
    context: &GenerationContext,
    config: &Config,
) -> Result<Generation> {
    let fragmentation = analyze(blueprint, context, &config.fragmentation);

    let outcome = fill_slots(catalog, blueprint, context, &config.filler)?;
    for warning in &outcome.warnings {
        tracing::warn!("Blueprint {}: {}", blueprint.id, warning.message);
    }

    let id = session_id(blueprint, context, config)?;
    let body = assemble(blueprint, &fragmentation, outcome.slots);

    tracing::info!(
        "Generated session {} from {} ({} warnings)",
        id,
        blueprint.id,
        outcome.warnings.len()
    );

    Ok(Generation {
        session: GeneratedSession {
            id,
            blueprint_id: blueprint.id.clone(),
            body,
            warnings: outcome.warnings,
        },
        fragmentation,
    })
}

/// Look up a blueprint by archetype id and generate a session from it
pub fn generate<B, C>(
    blueprints: &B,
    catalog: &C,
    archetype_id: &str,
    context: &GenerationContext,
    config: &Config,
) -> Result<Generation>
where
    B: BlueprintCatalog + ?Sized,
    C: ExerciseCatalog + ?Sized,
{
    let blueprint = blueprints.load_blueprint(archetype_id)?;
    generate_session(catalog, &blueprint, context, config)
}

/// Deterministic id over every input that shapes the session
fn session_id(
    blueprint: &WorkoutBlueprint,
    context: &GenerationContext,
    config: &Config,
) -> Result<Uuid> {
    let canonical = serde_json::to_vec(&(
        blueprint,
        context,
        &config.fragmentation,
        &config.filler,
    ))?;
    Ok(Uuid::new_v5(&SESSION_NAMESPACE, &canonical))
}

/// Ordinal of one generation request
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// Last-request-wins bookkeeping for repeated regeneration
///
/// Every request takes a token from [`GenerationTracker::begin`]. A result is
/// only published if no newer request has started since, so a slow, stale
/// generation can never overwrite a newer one.
#[derive(Debug, Default)]
pub struct GenerationTracker {
    issued: AtomicU64,
    latest: Mutex<Option<(RequestToken, Generation)>>,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request; supersedes every earlier token
    pub fn begin(&self) -> RequestToken {
        RequestToken(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.issued.load(Ordering::SeqCst) == token.0
    }

    /// Publish a result; returns false and drops it if the token is stale
    pub fn publish(&self, token: RequestToken, generation: Generation) -> Result<bool> {
        let mut latest = self
            .latest
            .lock()
            .map_err(|_| Error::State("generation tracker lock poisoned".into()))?;

        if !self.is_current(token) {
            tracing::debug!("Discarding stale generation {:?}", token);
            return Ok(false);
        }
        if matches!(&*latest, Some((stored, _)) if *stored > token) {
            return Ok(false);
        }

        *latest = Some((token, generation));
        Ok(true)
    }

    /// Run one request end to end; `None` means it was superseded
    pub fn run<F>(&self, f: F) -> Result<Option<Generation>>
    where
        F: FnOnce() -> Result<Generation>,
    {
        let token = self.begin();
        let generation = f()?;
        if self.publish(token, generation.clone())? {
            Ok(Some(generation))
        } else {
            Ok(None)
        }
    }

    /// Most recent published generation
    pub fn latest(&self) -> Result<Option<Generation>> {
        let latest = self
            .latest
            .lock()
            .map_err(|_| Error::State("generation tracker lock poisoned".into()))?;
        Ok(latest.as_ref().map(|(_, g)| g.clone()))
    }
}
