use crate::clock::Clock;
use crate::errors::{AuthError, StorageError};
use crate::models::{DEFAULT_AVATAR, UserProfile};
use crate::storage::{KeyValueStore, read_json, write_json};
use tracing::{info, warn};

pub const USERS_KEY: &str = "habitTrackerUsers";
pub const CURRENT_USER_KEY: &str = "usuarioActualId";
pub const TOKEN_KEY: &str = "token";

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn profile_key(user_id: &str) -> String {
    format!("usuario_{user_id}")
}

/// Registry of local accounts plus the "who is signed in" pointer.
pub struct AuthManager<'a> {
    storage: &'a mut dyn KeyValueStore,
    clock: &'a dyn Clock,
    users: Vec<UserProfile>,
}

impl<'a> AuthManager<'a> {
    pub fn load(storage: &'a mut dyn KeyValueStore, clock: &'a dyn Clock) -> Result<Self, AuthError> {
        let users = read_json::<Vec<UserProfile>>(&*storage, USERS_KEY)
            .map_err(|source| AuthError::Corrupted {
                key: USERS_KEY.to_string(),
                source,
            })?
            .unwrap_or_default();

        Ok(Self {
            storage,
            clock,
            users,
        })
    }

    pub fn users(&self) -> &[UserProfile] {
        &self.users
    }

    pub fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
        avatar: Option<&str>,
    ) -> Result<UserProfile, AuthError> {
        let username = username.trim();
        let email = email.trim();
        let password = password.trim();

        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(AuthError::UsernameTooShort(MIN_USERNAME_LEN));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort(MIN_PASSWORD_LEN));
        }

        // Linear scan only; two writers racing here could both pass.
        if self
            .users
            .iter()
            .any(|user| user.username == username || user.email == email)
        {
            return Err(AuthError::AlreadyRegistered);
        }

        let now = self.clock.now();
        let user = UserProfile {
            id: format!("user-{}", now.timestamp_millis()),
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            avatar: avatar
                .map(str::trim)
                .filter(|avatar| !avatar.is_empty())
                .unwrap_or(DEFAULT_AVATAR)
                .to_string(),
            registered_at: now,
            settings: None,
        };

        self.users.push(user.clone());
        if let Err(err) = self.save_users() {
            self.users.pop();
            return Err(err.into());
        }

        info!(user_id = %user.id, "registered user {}", user.username);
        Ok(user)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<UserProfile, AuthError> {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        self.users
            .iter()
            .find(|user| user.username == username && user.password == password)
            .cloned()
            .ok_or_else(|| {
                warn!("failed login for {username}");
                AuthError::InvalidCredentials
            })
    }

    /// Points the session at `user`. A backend token left by the previous
    /// session is dropped.
    pub fn set_current_user(&mut self, user: &UserProfile) -> Result<(), StorageError> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.set(CURRENT_USER_KEY, user.id.clone())?;
        write_json(&mut *self.storage, &profile_key(&user.id), user)
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.storage.get(CURRENT_USER_KEY)
    }

    pub fn logout(&mut self) -> Result<(), StorageError> {
        if let Some(user_id) = self.current_user_id() {
            info!(%user_id, "signed out");
        }
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(CURRENT_USER_KEY)
    }

    pub fn store_token(&mut self, token: &str) -> Result<(), StorageError> {
        self.storage.set(TOKEN_KEY, token.to_string())
    }

    /// Replaces the registry entry with the same id, so later logins see
    /// profile edits.
    pub fn refresh_user(&mut self, profile: &UserProfile) -> Result<(), StorageError> {
        match self.users.iter_mut().find(|user| user.id == profile.id) {
            Some(user) => {
                *user = profile.clone();
                self.save_users()
            }
            None => Ok(()),
        }
    }

    fn save_users(&mut self) -> Result<(), StorageError> {
        write_json(&mut *self.storage, USERS_KEY, &self.users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStorage;
    use chrono::{Duration, TimeZone, Utc};

    fn clock() -> ManualClock {
        ManualClock::with_step(
            Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap(),
            Duration::milliseconds(5),
        )
    }

    #[test]
    fn register_persists_user_with_defaults() {
        let mut storage = MemoryStorage::new();
        let clock = clock();
        let mut auth = AuthManager::load(&mut storage, &clock).unwrap();

        let user = auth.register("ana", "ana@example.com", "secret1", None).unwrap();
        assert!(user.id.starts_with("user-"));
        assert_eq!(user.avatar, DEFAULT_AVATAR);
        assert_eq!(auth.users().len(), 1);

        drop(auth);
        let reloaded = AuthManager::load(&mut storage, &clock).unwrap();
        assert_eq!(reloaded.users(), &[user]);
    }

    #[test]
    fn register_validates_fields() {
        let mut storage = MemoryStorage::new();
        let clock = clock();
        let mut auth = AuthManager::load(&mut storage, &clock).unwrap();

        assert!(matches!(
            auth.register("", "a@b.c", "secret1", None),
            Err(AuthError::MissingFields)
        ));
        assert!(matches!(
            auth.register("al", "a@b.c", "secret1", None),
            Err(AuthError::UsernameTooShort(3))
        ));
        assert!(matches!(
            auth.register("alice", "a@b.c", "12345", None),
            Err(AuthError::PasswordTooShort(6))
        ));
        assert!(auth.users().is_empty());
    }

    #[test]
    fn duplicate_username_or_email_leaves_registry_unchanged() {
        let mut storage = MemoryStorage::new();
        let clock = clock();
        let mut auth = AuthManager::load(&mut storage, &clock).unwrap();
        auth.register("ana", "ana@example.com", "secret1", Some("buho.png"))
            .unwrap();
        let before = auth.users().to_vec();

        assert!(matches!(
            auth.register("ana", "other@example.com", "secret1", None),
            Err(AuthError::AlreadyRegistered)
        ));
        assert!(matches!(
            auth.register("bruno", "ana@example.com", "secret1", None),
            Err(AuthError::AlreadyRegistered)
        ));
        assert_eq!(auth.users(), before.as_slice());

        drop(auth);
        let stored: Vec<UserProfile> = read_json(&storage, USERS_KEY).unwrap().unwrap();
        assert_eq!(stored, before);
    }

    #[test]
    fn bad_login_does_not_set_pointer() {
        let mut storage = MemoryStorage::new();
        let clock = clock();
        let mut auth = AuthManager::load(&mut storage, &clock).unwrap();
        auth.register("ana", "ana@example.com", "secret1", None).unwrap();

        assert!(matches!(
            auth.login("ana", "wrong-pass"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody", "secret1"),
            Err(AuthError::InvalidCredentials)
        ));
        assert_eq!(auth.current_user_id(), None);
    }

    #[test]
    fn login_then_logout_moves_pointer() {
        let mut storage = MemoryStorage::new();
        let clock = clock();
        let mut auth = AuthManager::load(&mut storage, &clock).unwrap();
        let registered = auth.register("ana", "ana@example.com", "secret1", None).unwrap();

        let user = auth.login(" ana ", "secret1").unwrap();
        assert_eq!(user, registered);
        auth.set_current_user(&user).unwrap();
        assert_eq!(auth.current_user_id(), Some(user.id.clone()));

        auth.logout().unwrap();
        assert_eq!(auth.current_user_id(), None);
        drop(auth);
        assert!(storage.get(&profile_key(&user.id)).is_some());
    }

    #[test]
    fn backend_token_does_not_outlive_the_session() {
        let mut storage = MemoryStorage::new();
        let clock = clock();
        let mut auth = AuthManager::load(&mut storage, &clock).unwrap();
        let alice = auth.register("alice", "alice@example.com", "secret1", None).unwrap();
        auth.set_current_user(&alice).unwrap();
        auth.store_token("token-of-alice").unwrap();

        auth.logout().unwrap();
        let bruno = auth.register("bruno", "bruno@example.com", "secret1", None).unwrap();
        auth.set_current_user(&bruno).unwrap();
        drop(auth);
        assert_eq!(storage.get(TOKEN_KEY), None);

        let mut auth = AuthManager::load(&mut storage, &clock).unwrap();
        auth.store_token("token-of-bruno").unwrap();
        auth.set_current_user(&alice).unwrap();
        drop(auth);
        assert_eq!(storage.get(TOKEN_KEY), None);
    }

    #[test]
    fn corrupted_registry_is_reported() {
        let mut storage = MemoryStorage::new();
        storage.set(USERS_KEY, "[{".to_string()).unwrap();
        let clock = clock();
        let result = AuthManager::load(&mut storage, &clock);
        assert!(matches!(result, Err(AuthError::Corrupted { .. })));
    }
}
