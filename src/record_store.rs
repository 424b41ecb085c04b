use crate::auth::{AuthManager, CURRENT_USER_KEY, profile_key};
use crate::clock::Clock;
use crate::errors::StoreError;
use crate::models::{
    HabitDraft, HabitPatch, HabitRecord, ProfilePatch, RemoteHabit, Statistics, UserProfile,
};
use crate::stats::build_statistics;
use crate::storage::{KeyValueStore, read_json, write_json};
use tracing::{debug, info, warn};

pub fn habits_key(user_id: &str) -> String {
    format!("habitos_{user_id}")
}

/// Resolves the signed-in profile from the persisted pointer. `None` when the
/// pointer or the profile snapshot is missing.
pub fn current_user(storage: &dyn KeyValueStore) -> Result<Option<UserProfile>, StoreError> {
    let Some(user_id) = storage.get(CURRENT_USER_KEY) else {
        return Ok(None);
    };
    let key = profile_key(&user_id);
    read_json(storage, &key).map_err(|source| StoreError::Corrupted { key, source })
}

/// Profile and habit list of the signed-in user. Habits are loaded lazily on
/// first access; every mutation rewrites the whole list.
pub struct UserRecordStore<'a> {
    storage: &'a mut dyn KeyValueStore,
    clock: &'a dyn Clock,
    user: UserProfile,
    habits: Option<Vec<HabitRecord>>,
}

impl<'a> UserRecordStore<'a> {
    pub fn open(storage: &'a mut dyn KeyValueStore, clock: &'a dyn Clock) -> Result<Self, StoreError> {
        let user = current_user(&*storage)?.ok_or(StoreError::NoCurrentUser)?;
        Ok(Self {
            storage,
            clock,
            user,
            habits: None,
        })
    }

    pub fn current_user(&self) -> &UserProfile {
        &self.user
    }

    pub fn list_habits(&mut self) -> Result<&[HabitRecord], StoreError> {
        Ok(self.habits_mut()?.as_slice())
    }

    pub fn find_habit(&mut self, id: i64) -> Result<Option<HabitRecord>, StoreError> {
        let owner = self.user.id.clone();
        Ok(self
            .habits_mut()?
            .iter()
            .find(|habit| habit.id == id && habit.user_id == owner)
            .cloned())
    }

    pub fn add_habit(&mut self, draft: HabitDraft) -> Result<HabitRecord, StoreError> {
        let now = self.clock.now();
        let owner = self.user.id.clone();
        let habit = HabitRecord {
            id: now.timestamp_millis(),
            user_id: owner,
            name: draft.name,
            category: draft.category,
            frequency: draft.frequency,
            time: draft.time,
            target_date: draft.target_date,
            description: draft.description,
            completed: false,
            created_at: now,
            remote_id: None,
        };

        let habits = self.habits_mut()?;
        if habits.iter().any(|existing| existing.id == habit.id) {
            warn!(habit_id = habit.id, "habit id collides with an existing habit created in the same millisecond");
        }
        habits.push(habit.clone());
        self.save_habits()?;

        info!(habit_id = habit.id, user_id = %habit.user_id, "added habit {}", habit.name);
        Ok(habit)
    }

    pub fn update_habit(&mut self, id: i64, patch: HabitPatch) -> Result<Option<HabitRecord>, StoreError> {
        let owner = self.user.id.clone();
        let habits = self.habits_mut()?;
        let Some(habit) = habits
            .iter_mut()
            .find(|habit| habit.id == id && habit.user_id == owner)
        else {
            debug!(habit_id = id, "update skipped, habit not found");
            return Ok(None);
        };

        patch.apply(habit);
        let updated = habit.clone();
        self.save_habits()?;
        Ok(Some(updated))
    }

    pub fn toggle_completion(&mut self, id: i64) -> Result<Option<HabitRecord>, StoreError> {
        match self.find_habit(id)? {
            Some(habit) => self.update_habit(id, HabitPatch::completed(!habit.completed)),
            None => Ok(None),
        }
    }

    /// Replaces a habit by deleting it and adding `draft` as a new one. The
    /// result carries a fresh id and creation time, and completion resets.
    /// The link to the backend habit is kept.
    pub fn edit_habit(&mut self, id: i64, draft: HabitDraft) -> Result<Option<HabitRecord>, StoreError> {
        let Some(previous) = self.find_habit(id)? else {
            return Ok(None);
        };
        self.delete_habit(id)?;
        let created = self.add_habit(draft)?;
        match previous.remote_id {
            Some(remote_id) => self.update_habit(created.id, HabitPatch::linked(remote_id)),
            None => Ok(Some(created)),
        }
    }

    /// Adds backend habits that no local habit is linked to yet. Returns how
    /// many were added.
    pub fn import_remote_habits(&mut self, remote: &[RemoteHabit]) -> Result<usize, StoreError> {
        let mut imported = 0;
        for habit in remote {
            let (Some(remote_id), Some(draft)) = (habit.id, habit.to_draft()) else {
                continue;
            };
            let linked = self
                .habits_mut()?
                .iter()
                .any(|local| local.remote_id == Some(remote_id));
            if linked {
                continue;
            }
            let created = self.add_habit(draft)?;
            self.update_habit(created.id, HabitPatch::linked(remote_id))?;
            imported += 1;
        }
        Ok(imported)
    }

    pub fn delete_habit(&mut self, id: i64) -> Result<(), StoreError> {
        let owner = self.user.id.clone();
        let habits = self.habits_mut()?;
        let before = habits.len();
        habits.retain(|habit| !(habit.id == id && habit.user_id == owner));
        let removed = before - habits.len();
        self.save_habits()?;

        if removed > 0 {
            info!(habit_id = id, "deleted habit");
        }
        Ok(())
    }

    pub fn update_profile(&mut self, patch: ProfilePatch) -> Result<&UserProfile, StoreError> {
        patch.apply(&mut self.user);
        write_json(&mut *self.storage, &profile_key(&self.user.id), &self.user)?;

        let mut auth = AuthManager::load(&mut *self.storage, self.clock)?;
        auth.refresh_user(&self.user)?;

        info!(user_id = %self.user.id, "updated profile");
        Ok(&self.user)
    }

    pub fn statistics(&mut self) -> Result<Statistics, StoreError> {
        Ok(build_statistics(self.habits_mut()?))
    }

    fn habits_mut(&mut self) -> Result<&mut Vec<HabitRecord>, StoreError> {
        if self.habits.is_none() {
            let key = habits_key(&self.user.id);
            let loaded = read_json::<Vec<HabitRecord>>(&*self.storage, &key)
                .map_err(|source| StoreError::Corrupted {
                    key: key.clone(),
                    source,
                })?;
            let first_access = loaded.is_none();
            self.habits = Some(loaded.unwrap_or_default());
            if first_access {
                self.save_habits()?;
            }
            debug!(user_id = %self.user.id, "loaded habits");
        }
        Ok(self.habits.get_or_insert_with(Vec::new))
    }

    fn save_habits(&mut self) -> Result<(), StoreError> {
        let key = habits_key(&self.user.id);
        let habits = self.habits.as_deref().unwrap_or_default();
        write_json(&mut *self.storage, &key, habits)?;
        Ok(())
    }
}
