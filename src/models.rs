use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_AVATAR: &str = "ardilla.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    #[serde(alias = "diaria")]
    Daily,
    #[serde(alias = "semanal")]
    Weekly,
    #[serde(alias = "mensual")]
    Monthly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Spelling used by the remote backend.
    pub fn remote_name(self) -> &'static str {
        match self {
            Self::Daily => "diaria",
            Self::Weekly => "semanal",
            Self::Monthly => "mensual",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" | "diaria" => Ok(Self::Daily),
            "weekly" | "semanal" => Ok(Self::Weekly),
            "monthly" | "mensual" => Ok(Self::Monthly),
            other => Err(format!("unknown frequency '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub reminders: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            push_notifications: true,
            reminders: true,
        }
    }
}

/// A registered account. The password is stored and compared in plaintext,
/// which is a known defect kept for behavioral parity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar: String,
    pub registered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<UserSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitRecord {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    /// Id of the same habit on the remote backend, once synced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<i64>,
}

/// The user-supplied fields of a new habit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HabitDraft {
    pub name: String,
    pub category: Option<String>,
    pub frequency: Frequency,
    pub time: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub description: Option<String>,
}

/// Fields of a habit that may change after creation. `None` leaves a field
/// untouched; `Some(None)` clears an optional one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HabitPatch {
    pub name: Option<String>,
    pub category: Option<Option<String>>,
    pub frequency: Option<Frequency>,
    pub time: Option<Option<String>>,
    pub target_date: Option<Option<NaiveDate>>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub remote_id: Option<i64>,
}

impl HabitPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn linked(remote_id: i64) -> Self {
        Self {
            remote_id: Some(remote_id),
            ..Self::default()
        }
    }

    pub fn apply(self, habit: &mut HabitRecord) {
        if let Some(name) = self.name {
            habit.name = name;
        }
        if let Some(category) = self.category {
            habit.category = category;
        }
        if let Some(frequency) = self.frequency {
            habit.frequency = frequency;
        }
        if let Some(time) = self.time {
            habit.time = time;
        }
        if let Some(target_date) = self.target_date {
            habit.target_date = target_date;
        }
        if let Some(description) = self.description {
            habit.description = description;
        }
        if let Some(completed) = self.completed {
            habit.completed = completed;
        }
        if let Some(remote_id) = self.remote_id {
            habit.remote_id = Some(remote_id);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub avatar: Option<String>,
    pub password: Option<String>,
    pub settings: Option<UserSettings>,
}

impl ProfilePatch {
    pub fn apply(self, profile: &mut UserProfile) {
        if let Some(username) = self.username {
            profile.username = username;
        }
        if let Some(avatar) = self.avatar {
            profile.avatar = avatar;
        }
        if let Some(password) = self.password {
            profile.password = password;
        }
        if let Some(settings) = self.settings {
            profile.settings = Some(settings);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub habit_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub habit_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Statistics {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub percent_complete: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A transient message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Info,
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HabitForm {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub target_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Set when the form edits an existing habit.
    #[serde(default)]
    pub replace_id: Option<String>,
}

impl HabitForm {
    pub fn replace_id(&self) -> Option<i64> {
        self.replace_id
            .as_deref()
            .and_then(|value| value.trim().parse().ok())
    }

    pub fn into_draft(self) -> Result<HabitDraft, String> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("Habit name is required".to_string());
        }

        let frequency = match non_empty(self.frequency) {
            Some(value) => value.parse()?,
            None => Frequency::default(),
        };

        let target_date = match non_empty(self.target_date) {
            Some(value) => Some(
                NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                    .map_err(|_| format!("invalid target date '{value}'"))?,
            ),
            None => None,
        };

        Ok(HabitDraft {
            name,
            category: non_empty(self.category),
            frequency,
            time: non_empty(self.time),
            target_date,
            description: non_empty(self.description),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
    #[serde(default)]
    pub email_notifications: Option<String>,
    #[serde(default)]
    pub push_notifications: Option<String>,
    #[serde(default)]
    pub reminders: Option<String>,
}

impl SettingsForm {
    /// Builds the profile patch; fails when the password confirmation differs.
    pub fn into_patch(self) -> Result<ProfilePatch, String> {
        let new_password = non_empty(self.new_password);
        if let Some(password) = &new_password {
            if non_empty(self.confirm_password).as_deref() != Some(password.as_str()) {
                return Err("Passwords do not match".to_string());
            }
        }

        Ok(ProfilePatch {
            username: non_empty(self.username),
            avatar: non_empty(self.avatar),
            password: new_password,
            settings: Some(UserSettings {
                email_notifications: self.email_notifications.is_some(),
                push_notifications: self.push_notifications.is_some(),
                reminders: self.reminders.is_some(),
            }),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    #[serde(default)]
    pub tab: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PanelQuery {
    #[serde(default)]
    pub panel: Option<String>,
}

impl PanelQuery {
    pub fn is_open(&self) -> bool {
        self.panel.as_deref() == Some("open")
    }
}

/// Habit payload understood by the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteHabit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub nombre: String,
    #[serde(default)]
    pub categoria: Option<String>,
    #[serde(default)]
    pub frecuencia: Option<String>,
    #[serde(default)]
    pub hora: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub fecha_objetivo: Option<NaiveDate>,
}

impl From<&HabitDraft> for RemoteHabit {
    fn from(draft: &HabitDraft) -> Self {
        Self {
            id: None,
            nombre: draft.name.clone(),
            categoria: draft.category.clone(),
            frecuencia: Some(draft.frequency.remote_name().to_string()),
            hora: draft.time.clone(),
            descripcion: draft.description.clone(),
            fecha_objetivo: draft.target_date,
        }
    }
}

impl From<&HabitRecord> for RemoteHabit {
    fn from(habit: &HabitRecord) -> Self {
        Self {
            id: habit.remote_id,
            nombre: habit.name.clone(),
            categoria: habit.category.clone(),
            frecuencia: Some(habit.frequency.remote_name().to_string()),
            hora: habit.time.clone(),
            descripcion: habit.description.clone(),
            fecha_objetivo: habit.target_date,
        }
    }
}

impl RemoteHabit {
    /// Local draft for a habit pulled from the backend; `None` when it has no name.
    pub fn to_draft(&self) -> Option<HabitDraft> {
        let name = self.nombre.trim();
        if name.is_empty() {
            return None;
        }
        Some(HabitDraft {
            name: name.to_string(),
            category: non_empty(self.categoria.clone()),
            frequency: self
                .frecuencia
                .as_deref()
                .and_then(|value| value.parse().ok())
                .unwrap_or_default(),
            time: non_empty(self.hora.clone()),
            target_date: self.fecha_objetivo,
            description: non_empty(self.descripcion.clone()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressMark {
    pub fecha: NaiveDate,
    pub cumplido: bool,
}

/// Completion counters the backend reports for a day, week or month.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    #[serde(default)]
    pub total_habitos: u64,
    #[serde(default)]
    pub habitos_cumplidos: u64,
    #[serde(default, alias = "porcentaje")]
    pub porcentaje_cumplimiento: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressDay {
    pub date: String,
    pub completed: u64,
}

/// What the dashboard shows from the backend. Each part is `None` when its
/// request failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteSummary {
    pub today: Option<PeriodStats>,
    pub week: Option<PeriodStats>,
    pub month: Option<PeriodStats>,
    pub progress: Option<Vec<ProgressDay>>,
}

pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
