use crate::api::{ApiClient, token_from};
use crate::auth::{AuthManager, TOKEN_KEY};
use crate::clock::Clock;
use crate::errors::{ApiError, AppError, AuthError, StoreError};
use crate::models::{
    AuthQuery, HabitForm, HabitPatch, HabitRecord, LoginForm, Notification, PanelQuery,
    PeriodStats, RegisterForm, RemoteHabit, RemoteSummary, SettingsForm, Statistics, Toast,
};
use crate::notifications::NotificationStore;
use crate::record_store::{UserRecordStore, current_user};
use crate::stats::progress_by_day;
use crate::state::{AppData, AppState};
use crate::ui::{self, AuthTab, DashboardView};
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{Local, Offset};
use serde_json::json;
use tracing::{error, info, warn};

pub async fn index(State(state): State<AppState>) -> Redirect {
    let data = state.data.lock().await;
    match current_user(data.storage.as_ref()) {
        Ok(Some(_)) => Redirect::to("/dashboard"),
        Ok(None) => Redirect::to("/auth"),
        Err(err) => {
            warn!("current user unreadable: {err}");
            Redirect::to("/auth")
        }
    }
}

pub async fn auth_page(State(state): State<AppState>, Query(query): Query<AuthQuery>) -> Response {
    let data = state.data.lock().await;
    if matches!(current_user(data.storage.as_ref()), Ok(Some(_))) {
        return Redirect::to("/dashboard").into_response();
    }

    let tab = match query.tab.as_deref() {
        Some("register") => AuthTab::Register,
        _ => AuthTab::Login,
    };
    Html(ui::render_auth(tab, None)).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = {
        let mut data = state.data.lock().await;
        let mut auth = AuthManager::load(data.storage.as_mut(), state.clock.as_ref())?;
        match auth.login(&form.username, &form.password) {
            Ok(user) => {
                auth.set_current_user(&user)?;
                user
            }
            Err(err) if err.is_user_facing() => return Ok(auth_failure(AuthTab::Login, &err)),
            Err(err) => return Err(err.into()),
        }
    };
    info!(user_id = %user.id, "signed in");

    let mut toast = Toast::success(format!("Welcome back, {}", user.username));
    if let Some(api) = &state.api {
        let outcome = api.login(&user.username, form.password.trim()).await;
        let offline =
            remember_remote_token(&state, outcome.map_err(|err| err.to_string())).await?;
        if let Some(offline) = offline {
            toast = offline;
        }
    }

    state.data.lock().await.toast = Some(toast);
    Ok(Redirect::to("/dashboard").into_response())
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let user = {
        let mut data = state.data.lock().await;
        let mut auth = AuthManager::load(data.storage.as_mut(), state.clock.as_ref())?;
        match auth.register(
            &form.username,
            &form.email,
            &form.password,
            form.avatar.as_deref(),
        ) {
            Ok(user) => {
                auth.set_current_user(&user)?;
                user
            }
            Err(err) if err.is_user_facing() => return Ok(auth_failure(AuthTab::Register, &err)),
            Err(err) => return Err(err.into()),
        }
    };

    let mut toast = Toast::success(format!("Welcome, {}", user.username));
    if let Some(api) = &state.api {
        let body = json!({
            "username": user.username,
            "email": user.email,
            "password": user.password,
            "avatar": user.avatar,
        });
        let outcome = api.register(&body).await;
        let offline =
            remember_remote_token(&state, outcome.map_err(|err| err.to_string())).await?;
        if let Some(offline) = offline {
            toast = offline;
        }
    }

    state.data.lock().await.toast = Some(toast);
    Ok(Redirect::to("/dashboard").into_response())
}

pub async fn logout(State(state): State<AppState>) -> Result<Redirect, AppError> {
    let mut data = state.data.lock().await;
    let mut auth = AuthManager::load(data.storage.as_mut(), state.clock.as_ref())?;
    auth.logout()?;
    Ok(Redirect::to("/auth"))
}

pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<PanelQuery>,
) -> Result<Response, AppError> {
    let remote = {
        let data = state.data.lock().await;
        if !matches!(current_user(data.storage.as_ref()), Ok(Some(_))) {
            return Ok(Redirect::to("/auth").into_response());
        }
        remote_client(&state, &data)
    };

    let summary = match remote {
        Some(api) => Some(fetch_remote_summary(&api).await),
        None => None,
    };

    let mut data = state.data.lock().await;
    dashboard_page(&state, &mut data, query.is_open(), None, summary.as_ref())
}

pub async fn edit_habit_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let mut data = state.data.lock().await;
    dashboard_page(&state, &mut data, false, Some(id), None)
}

/// Creates a habit, or replaces the one named by `replace_id` when the form
/// was opened for editing.
pub async fn save_habit(
    State(state): State<AppState>,
    Form(form): Form<HabitForm>,
) -> Redirect {
    let replace_id = form.replace_id();
    let (saved, remote) = {
        let mut data = state.data.lock().await;

        let draft = match form.into_draft() {
            Ok(draft) => draft,
            Err(message) => {
                data.toast = Some(Toast::error(message));
                return Redirect::to("/dashboard");
            }
        };

        let outcome = with_records(&mut data, state.clock.as_ref(), |store| match replace_id {
            Some(id) => Ok(match store.edit_habit(id, draft)? {
                Some(habit) => (Toast::success("Habit updated"), Some(habit)),
                None => (Toast::info("That habit no longer exists"), None),
            }),
            None => Ok((Toast::success("Habit added"), Some(store.add_habit(draft)?))),
        });
        let saved = match outcome {
            Ok((toast, saved)) => {
                data.toast = Some(toast);
                saved
            }
            Err(err) => return after_mutation(&mut data, Err(err), "/dashboard"),
        };
        (saved, remote_client(&state, &data))
    };

    if let (Some(habit), Some(api)) = (saved, remote) {
        if let Err(err) = sync_saved_habit(&state, &api, &habit).await {
            warn!(habit_id = habit.id, "remote habit sync failed: {err}");
            let mut data = state.data.lock().await;
            data.toast = Some(Toast::error(format!(
                "Habit saved locally, remote sync failed: {err}"
            )));
        }
    }
    Redirect::to("/dashboard")
}

/// Pulls the backend's habits into the local list, once per remote id.
pub async fn sync_habits(State(state): State<AppState>) -> Redirect {
    let remote = {
        let mut data = state.data.lock().await;
        match current_user(data.storage.as_ref()) {
            Ok(Some(_)) => {}
            Ok(None) => return Redirect::to("/auth"),
            Err(err) => return after_mutation(&mut data, Err(err), "/dashboard"),
        }
        match remote_client(&state, &data) {
            Some(api) => api,
            None => {
                data.toast = Some(Toast::info("Remote sync is not configured"));
                return Redirect::to("/dashboard");
            }
        }
    };

    let fetched = remote.list_habits().await;
    let mut data = state.data.lock().await;
    let habits = match fetched {
        Ok(habits) => habits,
        Err(err) => {
            data.toast = Some(Toast::error(format!("Could not load habits: {err}")));
            return Redirect::to("/dashboard");
        }
    };

    let outcome = with_records(&mut data, state.clock.as_ref(), |store| {
        let imported = store.import_remote_habits(&habits)?;
        Ok(Some(Toast::info(match imported {
            0 => "No new habits".to_string(),
            1 => "1 habit imported".to_string(),
            count => format!("{count} habits imported"),
        })))
    });
    after_mutation(&mut data, outcome, "/dashboard")
}

pub async fn toggle_habit(State(state): State<AppState>, Path(id): Path<i64>) -> Redirect {
    let (toggled, remote) = {
        let mut data = state.data.lock().await;
        let outcome = with_records(&mut data, state.clock.as_ref(), |store| {
            store.toggle_completion(id)
        });
        let toggled = match outcome {
            Ok(toggled) => toggled,
            Err(err) => return after_mutation(&mut data, Err(err), "/dashboard"),
        };
        data.toast = toggled.as_ref().map(|habit| {
            Toast::success(if habit.completed {
                "Habit marked as completed"
            } else {
                "Habit marked as pending"
            })
        });
        (toggled, remote_client(&state, &data))
    };

    if let (Some(habit), Some(api)) = (toggled, remote) {
        let Some(remote_id) = habit.remote_id else {
            return Redirect::to("/dashboard");
        };
        let today = state.clock.now().with_timezone(&Local).date_naive();
        if let Err(err) = api.mark_completion(remote_id, today, habit.completed).await {
            let mut data = state.data.lock().await;
            data.toast = Some(Toast::error(format!("Progress not synced: {err}")));
        }
    }
    Redirect::to("/dashboard")
}

pub async fn delete_habit(State(state): State<AppState>, Path(id): Path<i64>) -> Redirect {
    let (remote_id, remote) = {
        let mut data = state.data.lock().await;
        let outcome = with_records(&mut data, state.clock.as_ref(), |store| {
            let existing = store.find_habit(id)?;
            store.delete_habit(id)?;
            Ok(existing)
        });
        let existing = match outcome {
            Ok(existing) => existing,
            Err(err) => return after_mutation(&mut data, Err(err), "/dashboard"),
        };
        if existing.is_some() {
            data.toast = Some(Toast::success("Habit deleted"));
        }
        (
            existing.and_then(|habit| habit.remote_id),
            remote_client(&state, &data),
        )
    };

    if let (Some(remote_id), Some(api)) = (remote_id, remote) {
        if let Err(err) = api.delete_habit(remote_id).await {
            warn!(remote_id, "remote delete failed: {err}");
            let mut data = state.data.lock().await;
            data.toast = Some(Toast::error(format!(
                "Habit deleted locally, remote sync failed: {err}"
            )));
        }
    }
    Redirect::to("/dashboard")
}

pub async fn save_settings(
    State(state): State<AppState>,
    Form(form): Form<SettingsForm>,
) -> Redirect {
    let mut data = state.data.lock().await;
    let patch = match form.into_patch() {
        Ok(patch) => patch,
        Err(message) => {
            data.toast = Some(Toast::error(message));
            return Redirect::to("/dashboard");
        }
    };

    let outcome = with_records(&mut data, state.clock.as_ref(), |store| {
        store.update_profile(patch)?;
        Ok(Some(Toast::success("Settings saved")))
    });
    after_mutation(&mut data, outcome, "/dashboard")
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PanelQuery>,
) -> Redirect {
    let mut data = state.data.lock().await;
    let outcome = with_notifications(&mut data, state.clock.as_ref(), |store| {
        store.mark_read(id)?;
        Ok(None)
    });
    after_mutation(&mut data, outcome, panel_target(query.is_open()))
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    Query(query): Query<PanelQuery>,
) -> Redirect {
    let mut data = state.data.lock().await;
    let outcome = with_notifications(&mut data, state.clock.as_ref(), |store| {
        store.mark_all_read()?;
        Ok(None)
    });
    after_mutation(&mut data, outcome, panel_target(query.is_open()))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PanelQuery>,
) -> Redirect {
    let mut data = state.data.lock().await;
    let outcome = with_notifications(&mut data, state.clock.as_ref(), |store| {
        store.delete(id)?;
        Ok(None)
    });
    after_mutation(&mut data, outcome, panel_target(query.is_open()))
}

/// Pulls the backend's notifications into the local list.
pub async fn sync_notifications(State(state): State<AppState>) -> Redirect {
    let remote = {
        let mut data = state.data.lock().await;
        match current_user(data.storage.as_ref()) {
            Ok(Some(_)) => {}
            Ok(None) => return Redirect::to("/auth"),
            Err(err) => return after_mutation(&mut data, Err(err), "/dashboard"),
        }
        match remote_client(&state, &data) {
            Some(api) => api,
            None => {
                data.toast = Some(Toast::info("Remote sync is not configured"));
                return Redirect::to("/dashboard?panel=open");
            }
        }
    };

    let fetched = remote.notifications().await;
    let mut data = state.data.lock().await;
    let entries = match fetched {
        Ok(entries) => entries,
        Err(err) => {
            data.toast = Some(Toast::error(format!("Could not load notifications: {err}")));
            return Redirect::to("/dashboard?panel=open");
        }
    };

    let outcome = with_notifications(&mut data, state.clock.as_ref(), |store| {
        let imported = store.import_remote(&entries)?;
        Ok(Some(Toast::info(match imported {
            0 => "No new notifications".to_string(),
            1 => "1 new notification".to_string(),
            count => format!("{count} new notifications"),
        })))
    });
    after_mutation(&mut data, outcome, "/dashboard?panel=open")
}

pub async fn api_habits(State(state): State<AppState>) -> Result<Json<Vec<HabitRecord>>, AppError> {
    let mut data = state.data.lock().await;
    let habits = with_records(&mut data, state.clock.as_ref(), |store| {
        Ok(store.list_habits()?.to_vec())
    })
    .map_err(api_failure)?;
    Ok(Json(habits))
}

pub async fn api_stats(State(state): State<AppState>) -> Result<Json<Statistics>, AppError> {
    let mut data = state.data.lock().await;
    let stats = with_records(&mut data, state.clock.as_ref(), |store| store.statistics())
        .map_err(api_failure)?;
    Ok(Json(stats))
}

pub async fn api_notifications(
    State(state): State<AppState>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let mut data = state.data.lock().await;
    let items = with_notifications(&mut data, state.clock.as_ref(), |store| {
        Ok(store.list().to_vec())
    })
    .map_err(api_failure)?;
    Ok(Json(items))
}

fn dashboard_page(
    state: &AppState,
    data: &mut AppData,
    panel_open: bool,
    editing_id: Option<i64>,
    remote: Option<&RemoteSummary>,
) -> Result<Response, AppError> {
    let clock = state.clock.as_ref();
    let (user, habits, stats, editing) = {
        let mut store = match UserRecordStore::open(data.storage.as_mut(), clock) {
            Ok(store) => store,
            Err(StoreError::NoCurrentUser) => return Ok(Redirect::to("/auth").into_response()),
            Err(err) => return Err(err.into()),
        };
        let habits = store.list_habits()?.to_vec();
        let editing = match editing_id {
            Some(id) => store.find_habit(id)?,
            None => None,
        };
        let stats = store.statistics()?;
        (store.current_user().clone(), habits, stats, editing)
    };

    if editing_id.is_some() && editing.is_none() {
        return Ok(Redirect::to("/dashboard").into_response());
    }

    let now = clock.now();
    let reminders_on = user
        .settings
        .as_ref()
        .is_none_or(|settings| settings.reminders);
    let notifications = {
        let mut store = NotificationStore::load(data.storage.as_mut(), clock, &user.id)?;
        if reminders_on {
            let offset = now.with_timezone(&Local).offset().fix();
            if let Err(err) = store.remind_pending(&habits, offset) {
                warn!("could not create reminders: {err}");
            }
        }
        store.list().to_vec()
    };

    let toast = data.toast.take();
    let html = ui::render_dashboard(&DashboardView {
        user: &user,
        habits: &habits,
        stats,
        notifications: &notifications,
        panel_open,
        editing: editing.as_ref(),
        toast: toast.as_ref(),
        remote_enabled: state.api.is_some(),
        remote,
        now,
    });
    Ok(Html(html).into_response())
}

/// Creates the habit on the backend and links it, or updates the linked copy.
async fn sync_saved_habit(
    state: &AppState,
    api: &ApiClient,
    habit: &HabitRecord,
) -> Result<(), String> {
    let payload = RemoteHabit::from(habit);
    if let Some(remote_id) = habit.remote_id {
        api.update_habit(remote_id, &payload)
            .await
            .map_err(|err| err.to_string())?;
        return Ok(());
    }

    let created = api.create_habit(&payload).await.map_err(|err| err.to_string())?;
    let Some(remote_id) = created.get("id").and_then(|id| id.as_i64()) else {
        return Err("backend returned no habit id".to_string());
    };

    let mut data = state.data.lock().await;
    with_records(&mut data, state.clock.as_ref(), |store| {
        store.update_habit(habit.id, HabitPatch::linked(remote_id))
    })
    .map_err(|err| err.to_string())?;
    Ok(())
}

/// Each backend figure is fetched on its own; a failed one renders as unavailable.
async fn fetch_remote_summary(api: &ApiClient) -> RemoteSummary {
    let (daily, weekly, monthly, progress) = tokio::join!(
        api.daily_progress(),
        api.weekly_stats(),
        api.monthly_stats(),
        api.progress(),
    );

    let period = |label: &str, outcome: Result<serde_json::Value, ApiError>| {
        match outcome.map_err(|err| err.to_string()).and_then(|value| {
            serde_json::from_value::<PeriodStats>(value).map_err(|err| err.to_string())
        }) {
            Ok(stats) => Some(stats),
            Err(err) => {
                warn!("remote {label} stats unavailable: {err}");
                None
            }
        }
    };

    RemoteSummary {
        today: period("daily", daily),
        week: period("weekly", weekly),
        month: period("monthly", monthly),
        progress: match progress {
            Ok(entries) => Some(progress_by_day(&entries)),
            Err(err) => {
                warn!("remote progress unavailable: {err}");
                None
            }
        },
    }
}

fn with_records<T>(
    data: &mut AppData,
    clock: &dyn Clock,
    action: impl FnOnce(&mut UserRecordStore<'_>) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let mut store = UserRecordStore::open(data.storage.as_mut(), clock)?;
    action(&mut store)
}

fn with_notifications<T>(
    data: &mut AppData,
    clock: &dyn Clock,
    action: impl FnOnce(&mut NotificationStore<'_>) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let user = current_user(data.storage.as_ref())?.ok_or(StoreError::NoCurrentUser)?;
    let mut store = NotificationStore::load(data.storage.as_mut(), clock, &user.id)?;
    action(&mut store)
}

/// Stores the outcome toast and picks the redirect after a form post.
fn after_mutation(
    data: &mut AppData,
    outcome: Result<Option<Toast>, StoreError>,
    target: &str,
) -> Redirect {
    match outcome {
        Ok(toast) => {
            if toast.is_some() {
                data.toast = toast;
            }
            Redirect::to(target)
        }
        Err(StoreError::NoCurrentUser) => Redirect::to("/auth"),
        Err(err) => {
            error!("update failed: {err}");
            data.toast = Some(Toast::error("Something went wrong, please try again"));
            Redirect::to(target)
        }
    }
}

fn auth_failure(tab: AuthTab, err: &AuthError) -> Response {
    let status = match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Html(ui::render_auth(tab, Some(err.to_string().as_str())))).into_response()
}

fn api_failure(err: StoreError) -> AppError {
    match err {
        StoreError::NoCurrentUser => AppError::unauthorized("not signed in"),
        other => other.into(),
    }
}

fn panel_target(open: bool) -> &'static str {
    if open { "/dashboard?panel=open" } else { "/dashboard" }
}

fn remote_client(state: &AppState, data: &AppData) -> Option<ApiClient> {
    let api = state.api.as_ref()?;
    Some(api.clone().with_token(data.storage.get(TOKEN_KEY)))
}

/// The local session stands even when the backend refuses or is unreachable;
/// the returned toast tells the user so.
async fn remember_remote_token(
    state: &AppState,
    outcome: Result<serde_json::Value, String>,
) -> Result<Option<Toast>, AppError> {
    match outcome {
        Ok(response) => {
            if let Some(token) = token_from(&response) {
                let mut data = state.data.lock().await;
                let mut auth = AuthManager::load(data.storage.as_mut(), state.clock.as_ref())?;
                auth.store_token(&token)?;
            }
            Ok(None)
        }
        Err(err) => {
            warn!("remote sign-in failed: {err}");
            Ok(Some(Toast::info("Working offline, remote sync unavailable")))
        }
    }
}
