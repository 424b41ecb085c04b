use crate::clock::Clock;
use crate::errors::StoreError;
use crate::models::{HabitRecord, Notification, NotificationDraft};
use crate::storage::{KeyValueStore, read_json, write_json};
use chrono::{FixedOffset, NaiveTime};
use serde_json::Value;
use tracing::{debug, info};

pub fn notifications_key(user_id: &str) -> String {
    format!("notificaciones_{user_id}")
}

/// Local notification list of one user, newest first.
pub struct NotificationStore<'a> {
    storage: &'a mut dyn KeyValueStore,
    clock: &'a dyn Clock,
    key: String,
    items: Vec<Notification>,
}

impl<'a> NotificationStore<'a> {
    pub fn load(
        storage: &'a mut dyn KeyValueStore,
        clock: &'a dyn Clock,
        user_id: &str,
    ) -> Result<Self, StoreError> {
        let key = notifications_key(user_id);
        let items = read_json::<Vec<Notification>>(&*storage, &key)
            .map_err(|source| StoreError::Corrupted {
                key: key.clone(),
                source,
            })?
            .unwrap_or_default();

        Ok(Self {
            storage,
            clock,
            key,
            items,
        })
    }

    pub fn list(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|item| !item.read).count()
    }

    pub fn push(&mut self, draft: NotificationDraft) -> Result<Notification, StoreError> {
        let notification = self.build(draft);
        self.items.insert(0, notification.clone());
        self.save()?;
        debug!(notification_id = notification.id, "pushed notification");
        Ok(notification)
    }

    /// Returns whether a notification with that id exists.
    pub fn mark_read(&mut self, id: i64) -> Result<bool, StoreError> {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return Ok(false);
        };
        if !item.read {
            item.read = true;
            self.save()?;
        }
        Ok(true)
    }

    /// Returns how many notifications changed state.
    pub fn mark_all_read(&mut self) -> Result<usize, StoreError> {
        let mut changed = 0;
        for item in self.items.iter_mut().filter(|item| !item.read) {
            item.read = true;
            changed += 1;
        }
        if changed > 0 {
            self.save()?;
        }
        Ok(changed)
    }

    pub fn delete(&mut self, id: i64) -> Result<bool, StoreError> {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        let removed = self.items.len() != before;
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Copies entries fetched from the remote notifications endpoint. Entries
    /// without a message, or already present with the same title and message,
    /// are skipped.
    pub fn import_remote(&mut self, entries: &[Value]) -> Result<usize, StoreError> {
        let mut imported = 0;
        for entry in entries.iter().rev() {
            let (title, message, habit_id) = match entry {
                Value::String(text) => (None, Some(text.trim().to_string()), None),
                _ => (
                    text_field(entry, &["titulo", "title"]),
                    text_field(entry, &["mensaje", "message"]),
                    entry
                        .get("habitId")
                        .or_else(|| entry.get("habitoId"))
                        .and_then(Value::as_i64),
                ),
            };
            let Some(message) = message.filter(|message| !message.is_empty()) else {
                continue;
            };
            let title = title.unwrap_or_else(|| "Reminder".to_string());
            if self
                .items
                .iter()
                .any(|item| item.title == title && item.message == message)
            {
                continue;
            }

            let notification = self.build(NotificationDraft {
                title,
                message,
                habit_id,
            });
            self.items.insert(0, notification);
            imported += 1;
        }

        if imported > 0 {
            self.save()?;
            info!(imported, "imported remote notifications");
        }
        Ok(imported)
    }

    /// Adds one reminder per pending habit whose time of day has passed,
    /// unless that habit already got a notification today. Both the time and
    /// the day are read in the zone given by `offset`.
    pub fn remind_pending(
        &mut self,
        habits: &[HabitRecord],
        offset: FixedOffset,
    ) -> Result<Vec<Notification>, StoreError> {
        let local_now = self.clock.now().with_timezone(&offset);
        let local_time = local_now.time();
        let today = local_now.date_naive();
        let mut created = Vec::new();

        for habit in habits.iter().filter(|habit| !habit.completed) {
            let Some(due) = habit.time.as_deref().and_then(parse_time_of_day) else {
                continue;
            };
            if due > local_time {
                continue;
            }
            let already_reminded = self.items.iter().any(|item| {
                item.habit_id == Some(habit.id)
                    && item.timestamp.with_timezone(&offset).date_naive() == today
            });
            if already_reminded {
                continue;
            }

            let notification = self.build(NotificationDraft {
                title: format!("Time for {}", habit.name),
                message: format!("\"{}\" is still pending today.", habit.name),
                habit_id: Some(habit.id),
            });
            self.items.insert(0, notification.clone());
            created.push(notification);
        }

        if !created.is_empty() {
            self.save()?;
            info!(count = created.len(), "created habit reminders");
        }
        Ok(created)
    }

    fn build(&self, draft: NotificationDraft) -> Notification {
        let timestamp = self.clock.now();
        let mut id = timestamp.timestamp_millis();
        if let Some(max) = self.items.iter().map(|item| item.id).max() {
            if id <= max {
                id = max + 1;
            }
        }

        Notification {
            id,
            title: draft.title,
            message: draft.message,
            read: false,
            timestamp,
            habit_id: draft.habit_id,
        }
    }

    fn save(&mut self) -> Result<(), StoreError> {
        write_json(&mut *self.storage, &self.key, &self.items)?;
        Ok(())
    }
}

fn text_field(entry: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| entry.get(*name))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::Frequency;
    use crate::storage::MemoryStorage;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn clock() -> ManualClock {
        ManualClock::with_step(
            Utc.with_ymd_and_hms(2026, 1, 5, 18, 0, 0).unwrap(),
            Duration::seconds(1),
        )
    }

    fn draft(title: &str) -> NotificationDraft {
        NotificationDraft {
            title: title.to_string(),
            message: format!("{title} message"),
            habit_id: None,
        }
    }

    fn habit(id: i64, time: Option<&str>, completed: bool) -> HabitRecord {
        HabitRecord {
            id,
            user_id: "user-1".to_string(),
            name: format!("habit {id}"),
            category: None,
            frequency: Frequency::Daily,
            time: time.map(str::to_string),
            target_date: None,
            description: None,
            completed,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            remote_id: None,
        }
    }

    #[test]
    fn push_lists_newest_first_and_persists() {
        let mut storage = MemoryStorage::new();
        let clock = clock();
        {
            let mut store = NotificationStore::load(&mut storage, &clock, "user-1").unwrap();
            store.push(draft("first")).unwrap();
            store.push(draft("second")).unwrap();
            assert_eq!(store.unread_count(), 2);
        }

        let store = NotificationStore::load(&mut storage, &clock, "user-1").unwrap();
        let titles: Vec<&str> = store.list().iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[test]
    fn ids_stay_unique_within_the_same_instant() {
        let mut storage = MemoryStorage::new();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 5, 18, 0, 0).unwrap());
        let mut store = NotificationStore::load(&mut storage, &clock, "user-1").unwrap();
        let a = store.push(draft("a")).unwrap();
        let b = store.push(draft("b")).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn mark_read_and_delete() {
        let mut storage = MemoryStorage::new();
        let clock = clock();
        let mut store = NotificationStore::load(&mut storage, &clock, "user-1").unwrap();
        let first = store.push(draft("first")).unwrap();
        let second = store.push(draft("second")).unwrap();

        assert!(store.mark_read(first.id).unwrap());
        assert!(!store.mark_read(999).unwrap());
        assert_eq!(store.unread_count(), 1);

        assert_eq!(store.mark_all_read().unwrap(), 1);
        assert_eq!(store.mark_all_read().unwrap(), 0);

        assert!(store.delete(second.id).unwrap());
        assert!(!store.delete(second.id).unwrap());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn namespaces_are_per_user() {
        let mut storage = MemoryStorage::new();
        let clock = clock();
        NotificationStore::load(&mut storage, &clock, "user-1")
            .unwrap()
            .push(draft("mine"))
            .unwrap();

        let other = NotificationStore::load(&mut storage, &clock, "user-2").unwrap();
        assert!(other.list().is_empty());
    }

    #[test]
    fn import_remote_skips_blank_and_duplicates() {
        let mut storage = MemoryStorage::new();
        let clock = clock();
        let mut store = NotificationStore::load(&mut storage, &clock, "user-1").unwrap();
        let entries = vec![
            json!({ "id": 1, "mensaje": "Drink water", "habitId": 7 }),
            json!({ "id": 2, "titulo": "Weekly", "mensaje": "Review goals" }),
            json!({ "id": 3, "mensaje": "  " }),
            json!("Plain text"),
        ];

        assert_eq!(store.import_remote(&entries).unwrap(), 3);
        assert_eq!(store.import_remote(&entries).unwrap(), 0);

        let water = store
            .list()
            .iter()
            .find(|n| n.message == "Drink water")
            .unwrap();
        assert_eq!(water.title, "Reminder");
        assert_eq!(water.habit_id, Some(7));
        assert_eq!(store.list()[0].message, "Drink water");
    }

    #[test]
    fn reminders_fire_once_per_day_for_due_pending_habits() {
        let mut storage = MemoryStorage::new();
        let clock = clock();
        let mut store = NotificationStore::load(&mut storage, &clock, "user-1").unwrap();
        let habits = vec![
            habit(1, Some("07:30"), false),
            habit(2, Some("23:00"), false),
            habit(3, Some("06:00"), true),
            habit(4, None, false),
            habit(5, Some("bogus"), false),
        ];
        let utc = FixedOffset::east_opt(0).unwrap();

        let created = store.remind_pending(&habits, utc).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].habit_id, Some(1));

        assert!(store.remind_pending(&habits, utc).unwrap().is_empty());
    }

    #[test]
    fn reminders_repeat_on_the_next_day() {
        let mut storage = MemoryStorage::new();
        let clock = clock();
        let habits = vec![habit(1, Some("07:30"), false)];
        let utc = FixedOffset::east_opt(0).unwrap();

        {
            let mut store = NotificationStore::load(&mut storage, &clock, "user-1").unwrap();
            assert_eq!(store.remind_pending(&habits, utc).unwrap().len(), 1);
        }

        clock.advance(Duration::days(1));
        let mut store = NotificationStore::load(&mut storage, &clock, "user-1").unwrap();
        assert_eq!(store.remind_pending(&habits, utc).unwrap().len(), 1);
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn reminder_day_follows_the_local_zone_west_of_utc() {
        let mut storage = MemoryStorage::new();
        // 08:00 local at UTC-5.
        let clock = ManualClock::with_step(
            Utc.with_ymd_and_hms(2026, 1, 5, 13, 0, 0).unwrap(),
            Duration::seconds(1),
        );
        let habits = vec![habit(1, Some("07:30"), false)];
        let west = FixedOffset::west_opt(5 * 3600).unwrap();

        {
            let mut store = NotificationStore::load(&mut storage, &clock, "user-1").unwrap();
            assert_eq!(store.remind_pending(&habits, west).unwrap().len(), 1);
        }

        // 20:00 local on the same day, already past midnight UTC.
        clock.advance(Duration::hours(12));
        {
            let mut store = NotificationStore::load(&mut storage, &clock, "user-1").unwrap();
            assert!(store.remind_pending(&habits, west).unwrap().is_empty());
        }

        // 08:00 local the next day.
        clock.advance(Duration::hours(12));
        let mut store = NotificationStore::load(&mut storage, &clock, "user-1").unwrap();
        assert_eq!(store.remind_pending(&habits, west).unwrap().len(), 1);
    }
}
