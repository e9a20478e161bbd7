//! User profile persistence with file locking.
//!
//! A profile holds what a generation request needs from the user: owned
//! equipment, injuries and the shadow matrix. Profiles live as JSON files
//! under `<data_dir>/profiles/`, one per user.

use crate::{BodyArea, Error, GenerationContext, Location, Result, ShadowMatrix};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Per-user inputs to generation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub equipment: BTreeSet<String>,
    #[serde(default)]
    pub injuries: BTreeSet<BodyArea>,
    #[serde(default)]
    pub shadow_matrix: ShadowMatrix,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Build a generation context from this profile
    ///
    /// The matrix is copied, so later profile edits do not affect it.
    pub fn context(&self, location: Location, time_available: u32) -> GenerationContext {
        GenerationContext::new(location, time_available, self.shadow_matrix.clone())
            .with_equipment(self.equipment.iter().cloned())
            .with_injuries(self.injuries.iter().copied())
    }

    /// Load a profile from a file with shared locking
    ///
    /// Returns the default profile if the file doesn't exist.
    /// If the file is corrupted, logs a warning and returns the default.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No profile file found at {:?}, using default profile", path);
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open profile {:?}: {}. Using defaults.", path, e);
                return Ok(Self::default());
            }
        };

        // Acquire shared lock for reading
        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock profile {:?}: {}. Using defaults.", path, e);
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read profile {:?}: {}. Using defaults.", path, e);
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<UserProfile>(&contents) {
            Ok(mut profile) => {
                profile.shadow_matrix.normalize();
                tracing::debug!("Loaded profile from {:?}", path);
                Ok(profile)
            }
            Err(e) => {
                tracing::warn!("Failed to parse profile {:?}: {}. Using defaults.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Save the profile
    ///
    /// Readers never see a partial file. Concurrent writers are serialized
    /// by [`ProfileStore::update`], not here.
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::State(format!("profile path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved profile to {:?}", path);
        Ok(())
    }
}

/// Directory of per-user profile files
#[derive(Clone, Debug)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    /// Store rooted at `<data_dir>/profiles`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join("profiles"),
        }
    }

    pub fn path_for(&self, user_id: &str) -> Result<PathBuf> {
        let valid = !user_id.is_empty()
            && user_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::State(format!("invalid user id '{}'", user_id)));
        }
        Ok(self.dir.join(format!("{}.json", user_id)))
    }

    pub fn get_user_profile(&self, user_id: &str) -> Result<UserProfile> {
        UserProfile::load(&self.path_for(user_id)?)
    }

    pub fn save_user_profile(&self, user_id: &str, profile: &UserProfile) -> Result<()> {
        profile.save(&self.path_for(user_id)?)
    }

    /// Load a profile, modify it, and save it back with a fresh timestamp
    ///
    /// The whole read-modify-write holds an exclusive lock on
    /// `<user>.lock`, so concurrent updates of one user never drop edits.
    pub fn update<F>(&self, user_id: &str, f: F) -> Result<UserProfile>
    where
        F: FnOnce(&mut UserProfile) -> Result<()>,
    {
        let path = self.path_for(user_id)?;
        std::fs::create_dir_all(&self.dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path.with_extension("lock"))?;
        lock.lock_exclusive()?;

        let result = UserProfile::load(&path).and_then(|mut profile| {
            f(&mut profile)?;
            profile.updated_at = Some(Utc::now());
            profile.save(&path)?;
            Ok(profile)
        });

        lock.unlock()?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MovementGroup, MuscleGroup};

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(temp_dir.path());

        let mut profile = UserProfile::default();
        profile.equipment.insert("kettlebell".into());
        profile.injuries.insert(BodyArea::Knee);
        profile
            .shadow_matrix
            .set_muscle_override(MuscleGroup::Glutes, 13);

        store.save_user_profile("alex", &profile).unwrap();
        let loaded = store.get_user_profile("alex").unwrap();

        assert_eq!(loaded, profile);
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(temp_dir.path());

        let profile = store.get_user_profile("nobody").unwrap();
        assert_eq!(profile, UserProfile::default());
    }

    #[test]
    fn test_corrupted_profile_returns_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(temp_dir.path());
        let path = store.path_for("broken").unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ invalid json }").unwrap();

        let profile = store.get_user_profile("broken").unwrap();
        assert_eq!(profile, UserProfile::default());
    }

    #[test]
    fn test_stored_levels_are_clamped_on_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(temp_dir.path());
        let path = store.path_for("edited").unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{ "shadow_matrix": { "use_global_level": true, "global_level": 99 } }"#,
        )
        .unwrap();

        let profile = store.get_user_profile("edited").unwrap();
        assert_eq!(profile.shadow_matrix.global_level.get(), 20);
        assert_eq!(
            profile.shadow_matrix.movement_groups().len(),
            MovementGroup::ALL.len()
        );
    }

    #[test]
    fn test_update_pattern() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(temp_dir.path());

        store
            .update("sam", |profile| {
                profile.shadow_matrix.set_global_level(7);
                Ok(())
            })
            .unwrap();

        let loaded = store.get_user_profile("sam").unwrap();
        assert!(loaded.shadow_matrix.use_global_level);
        assert!(loaded.updated_at.is_some());
    }

    #[test]
    fn test_concurrent_updates_keep_every_edit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(temp_dir.path());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store
                        .update("shared", |profile| {
                            profile.equipment.insert(format!("item_{}", i));
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let profile = store.get_user_profile("shared").unwrap();
        assert_eq!(profile.equipment.len(), 8);
    }

    #[test]
    fn test_failed_update_leaves_profile_untouched() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(temp_dir.path());

        let result = store.update("sam", |profile| {
            profile.shadow_matrix.set_global_level(4);
            Err(Error::State("rejected".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.get_user_profile("sam").unwrap(), UserProfile::default());

        // The lock was released
        store.update("sam", |_| Ok(())).unwrap();
    }

    #[test]
    fn test_rejects_path_like_user_ids() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(temp_dir.path());
        assert!(store.path_for("../etc/passwd").is_err());
        assert!(store.path_for("").is_err());
    }

    #[test]
    fn test_atomic_save() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("profile.json");

        UserProfile::default().save(&path).unwrap();

        assert!(path.exists());
        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "profile.json")
            .collect();
        assert!(extras.is_empty(), "Expected only profile.json, found extras: {:?}", extras);
    }

    #[test]
    fn test_context_copies_profile() {
        let mut profile = UserProfile::default();
        profile.equipment.insert("band".into());
        profile.injuries.insert(BodyArea::Wrist);

        let context = profile.context(Location::Park, 20);
        profile.shadow_matrix.set_global_level(3);

        assert!(context.equipment_available().contains("band"));
        assert!(context.injuries().contains(&BodyArea::Wrist));
        assert!(!context.shadow_matrix().use_global_level);
    }
}
