use crate::format::{long_date, plural, relative_time};
use crate::models::{
    DEFAULT_AVATAR, HabitRecord, Notification, PeriodStats, RemoteSummary, Statistics, Toast,
    UserProfile, UserSettings,
};
use crate::stats::build_planner;
use chrono::{DateTime, Utc};

pub const AVATARS: [(&str, &str); 6] = [
    ("ardilla.png", "🐿️"),
    ("buho.png", "🦉"),
    ("zorro.png", "🦊"),
    ("gato.png", "🐱"),
    ("perro.png", "🐶"),
    ("tortuga.png", "🐢"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTab {
    Login,
    Register,
}

pub struct DashboardView<'a> {
    pub user: &'a UserProfile,
    pub habits: &'a [HabitRecord],
    pub stats: Statistics,
    pub notifications: &'a [Notification],
    pub panel_open: bool,
    pub editing: Option<&'a HabitRecord>,
    pub toast: Option<&'a Toast>,
    pub remote_enabled: bool,
    /// Backend progress, fetched only when remote sync is on.
    pub remote: Option<&'a RemoteSummary>,
    pub now: DateTime<Utc>,
}

pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
        .replace('{', "&#123;")
        .replace('}', "&#125;")
}

pub fn avatar_icon(avatar: &str) -> &'static str {
    AVATARS
        .iter()
        .find(|(name, _)| *name == avatar)
        .map(|(_, icon)| *icon)
        .unwrap_or("🙂")
}

pub fn render_auth(tab: AuthTab, error: Option<&str>) -> String {
    let message = error
        .map(|message| format!(r#"<div class="error-message" role="alert">{}</div>"#, escape_html(message)))
        .unwrap_or_default();
    let (login_message, register_message) = match tab {
        AuthTab::Login => (message, String::new()),
        AuthTab::Register => (String::new(), message),
    };
    let active = |wanted: AuthTab| if tab == wanted { " active" } else { "" };

    let avatars: String = AVATARS
        .iter()
        .enumerate()
        .map(|(index, (name, icon))| {
            format!(
                r#"<label class="avatar-option"><input type="radio" name="avatar" value="{name}"{checked} /><span>{icon}</span></label>"#,
                checked = if index == 0 { " checked" } else { "" },
            )
        })
        .collect();

    AUTH_HTML
        .replace("{{STYLE}}", BASE_STYLE)
        .replace("{{LOGIN_ACTIVE}}", active(AuthTab::Login))
        .replace("{{REGISTER_ACTIVE}}", active(AuthTab::Register))
        .replace("{{LOGIN_MESSAGE}}", &login_message)
        .replace("{{REGISTER_MESSAGE}}", &register_message)
        .replace("{{AVATARS}}", &avatars)
}

pub fn render_dashboard(view: &DashboardView<'_>) -> String {
    let unread = view.notifications.iter().filter(|n| !n.read).count();
    let badge = if unread > 0 {
        format!(r#"<span class="badge">{unread}</span>"#)
    } else {
        String::new()
    };
    let sync_button = if view.remote_enabled {
        r#"<form method="post" action="/notifications/sync"><button class="ghost" type="submit">Sync</button></form>"#
    } else {
        ""
    };

    DASHBOARD_HTML
        .replace("{{STYLE}}", BASE_STYLE)
        .replace("{{AVATAR}}", avatar_icon(&view.user.avatar))
        .replace("{{USERNAME}}", &escape_html(&view.user.username))
        .replace("{{BADGE}}", &badge)
        .replace("{{SYNC}}", sync_button)
        .replace("{{TOAST}}", &render_toast(view.toast))
        .replace("{{HABIT_FORM}}", &render_habit_form(view.editing))
        .replace("{{SETTINGS}}", &render_settings(view.user))
        .replace("{{STATS}}", &render_stats(&view.stats))
        .replace("{{REMOTE}}", &render_remote_summary(view.remote))
        .replace("{{HABITS}}", &render_habit_list(view.habits))
        .replace("{{PLANNER}}", &render_planner(view.habits, &view.stats))
        .replace(
            "{{NOTIFICATIONS}}",
            &render_notifications(view.notifications, view.now, view.panel_open),
        )
}

pub fn render_toast(toast: Option<&Toast>) -> String {
    match toast {
        Some(toast) => format!(
            r#"<div class="toast toast-{}" role="status">{}</div>"#,
            toast.kind.as_str(),
            escape_html(&toast.message)
        ),
        None => String::new(),
    }
}

pub fn render_stats(stats: &Statistics) -> String {
    format!(
        r#"<div class="stats-grid">
  <div class="stat"><span class="value">{total}</span><span class="label">Total habits</span></div>
  <div class="stat"><span class="value done">{completed}</span><span class="label">Completed</span></div>
  <div class="stat"><span class="value pending">{pending}</span><span class="label">Pending</span></div>
  <div class="stat"><span class="value">{percent}%</span><span class="label">Progress</span></div>
</div>
<div class="progress-bar"><div class="progress-fill" style="width: {percent}%"></div></div>"#,
        total = stats.total,
        completed = stats.completed,
        pending = stats.pending,
        percent = stats.percent_complete,
    )
}

pub fn render_remote_summary(summary: Option<&RemoteSummary>) -> String {
    let Some(summary) = summary else {
        return String::new();
    };

    let period = |label: &str, stats: Option<&PeriodStats>| match stats {
        Some(stats) => format!(
            r#"<div class="stat"><span class="value">{}/{}</span><span class="label">{label} · {:.0}%</span></div>"#,
            stats.habitos_cumplidos, stats.total_habitos, stats.porcentaje_cumplimiento,
        ),
        None => format!(
            r#"<div class="stat"><span class="value">–</span><span class="label">{label} · unavailable</span></div>"#
        ),
    };

    let history = match &summary.progress {
        None => r#"<p class="hint">Progress history unavailable</p>"#.to_string(),
        Some(days) if days.is_empty() => r#"<p class="hint">No progress recorded yet</p>"#.to_string(),
        Some(days) => {
            let max = days.iter().map(|day| day.completed).max().unwrap_or(0).max(1);
            let rows: String = days
                .iter()
                .map(|day| {
                    format!(
                        r#"<li><span class="day">{date}</span><span class="bar"><span class="bar-fill" style="width: {width}%"></span></span><span class="count">{count}</span></li>"#,
                        date = escape_html(&day.date),
                        width = day.completed * 100 / max,
                        count = day.completed,
                    )
                })
                .collect();
            format!(r#"<ul class="progress-days">{rows}</ul>"#)
        }
    };

    format!(
        r#"<section id="remote-progress">
  <h2>☁️ Completed habits</h2>
  <div class="stats-grid">{today}{week}{month}</div>
  {history}
  <form method="post" action="/habits/sync"><button class="ghost" type="submit">Pull habits from backend</button></form>
</section>"#,
        today = period("Today", summary.today.as_ref()),
        week = period("This week", summary.week.as_ref()),
        month = period("This month", summary.month.as_ref()),
    )
}

pub fn render_habit_list(habits: &[HabitRecord]) -> String {
    if habits.is_empty() {
        return r#"<li class="no-habits"><div class="empty-state"><span class="empty-icon">🎯</span><p>No habits yet</p><small>Start by adding your first habit!</small></div></li>"#
            .to_string();
    }

    habits
        .iter()
        .map(|habit| {
            let mut meta = String::new();
            if let Some(category) = &habit.category {
                meta.push_str(&format!(r#"<span class="habit-category">{}</span>"#, escape_html(category)));
            }
            meta.push_str(&format!(r#"<span class="habit-frequency">{}</span>"#, habit.frequency.label()));
            if let Some(time) = &habit.time {
                meta.push_str(&format!(r#"<span class="habit-time">{}</span>"#, escape_html(time)));
            }
            if let Some(date) = habit.target_date {
                meta.push_str(&format!(r#"<span class="habit-date">{}</span>"#, long_date(date)));
            }
            let description = habit
                .description
                .as_deref()
                .map(|text| format!(r#"<p class="habit-description">{}</p>"#, escape_html(text)))
                .unwrap_or_default();

            format!(
                r#"<li class="habit-item{completed}" data-habit-id="{id}">
  <div class="habit-info"><h4 class="habit-name">{name}</h4><div class="habit-meta">{meta}</div>{description}</div>
  <div class="habit-actions">
    {toggle}
    <a class="btn-edit" href="/habits/{id}/edit#habit-form">✏️</a>
    <form method="post" action="/habits/{id}/delete" onsubmit="return confirm('Delete this habit?')"><button class="btn-delete" type="submit">🗑️</button></form>
  </div>
</li>"#,
                completed = if habit.completed { " completed" } else { "" },
                id = habit.id,
                name = escape_html(&habit.name),
                toggle = toggle_button(habit, "btn-toggle-complete"),
            )
        })
        .collect()
}

pub fn render_planner(habits: &[HabitRecord], stats: &Statistics) -> String {
    let planner = build_planner(habits);
    let mut html = String::from(r#"<div class="planner-content">"#);

    if !planner.scheduled.is_empty() {
        html.push_str(r#"<div class="planner-dates"><h4>🗓️ Scheduled habits</h4>"#);
        for (date, day_habits) in &planner.scheduled {
            html.push_str(&format!(
                r#"<div class="date-item"><div class="date-header"><span class="date-title">{}</span><span class="date-count">{}</span></div>"#,
                long_date(*date),
                plural(day_habits.len(), "habit", "habits"),
            ));
            for habit in day_habits {
                html.push_str(&planner_entry(habit, false));
            }
            html.push_str("</div>");
        }
        html.push_str("</div>");
    }

    if !planner.unscheduled.is_empty() {
        html.push_str(r#"<div class="planner-undated"><h4>📝 Habits without a date</h4>"#);
        for habit in &planner.unscheduled {
            html.push_str(&planner_entry(habit, true));
        }
        html.push_str("</div>");
    }

    if habits.is_empty() {
        html.push_str(
            r#"<div class="planner-empty"><span class="empty-icon">🎯</span><h4>No habits yet</h4><p>Add your first habit with the form.</p></div>"#,
        );
    }

    html.push_str(&format!(
        r#"</div>
<div class="planner-summary">
  <span><strong>{}</strong> Total</span>
  <span class="done"><strong>{}</strong> Completed</span>
  <span class="pending"><strong>{}</strong> Pending</span>
  <span><strong>{}%</strong> Progress</span>
  <p class="legend">✅ Completed | ⏳ Pending</p>
</div>"#,
        stats.total, stats.completed, stats.pending, stats.percent_complete
    ));
    html
}

pub fn render_notifications(notifications: &[Notification], now: DateTime<Utc>, open: bool) -> String {
    if !open {
        return String::new();
    }

    let body = if notifications.is_empty() {
        r#"<div class="notifications-empty"><div class="empty-icon">🔔</div><div>No notifications</div><small>Reminders will show up here</small></div>"#
            .to_string()
    } else {
        let (unread, read): (Vec<&Notification>, Vec<&Notification>) =
            notifications.iter().partition(|notification| !notification.read);
        let mut html = String::new();
        for (title, group) in [("New", unread), ("Earlier", read)] {
            if group.is_empty() {
                continue;
            }
            html.push_str(&format!(r#"<h4 class="notification-group">{title}</h4>"#));
            for notification in group {
                html.push_str(&notification_item(notification, now));
            }
        }
        html
    };

    format!(
        r#"<a class="notifications-overlay" href="/dashboard" aria-label="Close notifications"></a>
<aside class="notifications-panel open" id="notifications-panel">
  <div class="notifications-header">
    <h3>Notifications</h3>
    <form method="post" action="/notifications/read-all?panel=open"><button class="ghost" type="submit">Mark all read</button></form>
    <a class="close" href="/dashboard">✕</a>
  </div>
  <div class="notifications-list">{body}</div>
</aside>"#
    )
}

pub fn render_habit_form(editing: Option<&HabitRecord>) -> String {
    let value = |field: Option<&str>| escape_html(field.unwrap_or_default());
    let name = editing.map(|habit| habit.name.as_str());
    let category = editing.and_then(|habit| habit.category.as_deref());
    let time = editing.and_then(|habit| habit.time.as_deref());
    let description = editing.and_then(|habit| habit.description.as_deref());
    let target_date = editing
        .and_then(|habit| habit.target_date)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let frequency = editing.map(|habit| habit.frequency.as_str()).unwrap_or("daily");

    let options: String = ["daily", "weekly", "monthly"]
        .iter()
        .map(|option| {
            format!(
                r#"<option value="{option}"{selected}>{label}</option>"#,
                selected = if *option == frequency { " selected" } else { "" },
                label = match *option {
                    "weekly" => "Weekly",
                    "monthly" => "Monthly",
                    _ => "Daily",
                },
            )
        })
        .collect();

    let (heading, submit, replace) = match editing {
        Some(habit) => (
            "Edit habit",
            "Save changes",
            format!(r#"<input type="hidden" name="replace_id" value="{}" />"#, habit.id),
        ),
        None => ("New habit", "Add habit", String::new()),
    };

    format!(
        r#"<h2>{heading}</h2>
<form id="habit-form" class="habit-form" method="post" action="/habits">
  {replace}
  <label>Name<input name="name" required value="{name}" /></label>
  <label>Category<input name="category" value="{category}" /></label>
  <label>Frequency<select name="frequency">{options}</select></label>
  <label>Time<input type="time" name="time" value="{time}" /></label>
  <label>Target date<input type="date" name="target_date" value="{target_date}" /></label>
  <label>Description<textarea name="description">{description}</textarea></label>
  <button class="primary" type="submit">{submit}</button>
</form>"#,
        name = value(name),
        category = value(category),
        time = value(time),
        description = value(description),
    )
}

pub fn render_settings(user: &UserProfile) -> String {
    let settings = user.settings.unwrap_or_default();
    let current_avatar = if user.avatar.is_empty() {
        DEFAULT_AVATAR
    } else {
        user.avatar.as_str()
    };
    let avatars: String = AVATARS
        .iter()
        .map(|(name, icon)| {
            format!(
                r#"<label class="avatar-option"><input type="radio" name="avatar" value="{name}"{checked} /><span>{icon}</span></label>"#,
                checked = if *name == current_avatar { " checked" } else { "" },
            )
        })
        .collect();
    let checkbox = |name: &str, label: &str, on: bool| {
        format!(
            r#"<label class="check"><input type="checkbox" name="{name}"{checked} /> {label}</label>"#,
            checked = if on { " checked" } else { "" },
        )
    };
    let UserSettings {
        email_notifications,
        push_notifications,
        reminders,
    } = settings;

    format!(
        r#"<details class="settings">
  <summary>⚙️ Settings</summary>
  <form method="post" action="/settings">
    <label>Username<input name="username" value="{username}" /></label>
    <div class="avatar-grid">{avatars}</div>
    <label>New password<input type="password" name="new_password" /></label>
    <label>Confirm password<input type="password" name="confirm_password" /></label>
    {email}{push}{remind}
    <button class="primary" type="submit">Save settings</button>
  </form>
</details>"#,
        username = escape_html(&user.username),
        email = checkbox("email_notifications", "Email notifications", email_notifications),
        push = checkbox("push_notifications", "Push notifications", push_notifications),
        remind = checkbox("reminders", "Reminders", reminders),
    )
}

fn toggle_button(habit: &HabitRecord, class: &str) -> String {
    let (modifier, label) = if habit.completed {
        ("btn-undo", "↶")
    } else {
        ("btn-complete", "✓")
    };
    format!(
        r#"<form method="post" action="/habits/{id}/toggle"><button class="{class} {modifier}" type="submit">{label}</button></form>"#,
        id = habit.id,
    )
}

fn planner_entry(habit: &HabitRecord, show_frequency: bool) -> String {
    let (icon, state) = if habit.completed {
        ("✅", "completed")
    } else {
        ("⏳", "pending")
    };
    let frequency = if show_frequency {
        format!(r#"<span class="habit-frequency">{}</span>"#, habit.frequency.label())
    } else {
        String::new()
    };
    let category = habit
        .category
        .as_deref()
        .map(|category| format!(r#"<span class="habit-category">{}</span>"#, escape_html(category)))
        .unwrap_or_default();
    let edit = if show_frequency {
        format!(r#"<a class="btn-edit" href="/habits/{}/edit#habit-form">✏️</a>"#, habit.id)
    } else {
        String::new()
    };

    format!(
        r#"<div class="planner-habit {state}" data-habit-id="{id}"><span class="habit-icon">{icon}</span><span class="habit-name">{name}</span>{frequency}{category}<div class="habit-actions">{toggle}{edit}</div></div>"#,
        id = habit.id,
        name = escape_html(&habit.name),
        toggle = toggle_button(habit, "btn-planner-toggle"),
    )
}

fn notification_item(notification: &Notification, now: DateTime<Utc>) -> String {
    let mark_read = if notification.read {
        String::new()
    } else {
        format!(
            r#"<form method="post" action="/notifications/{}/read?panel=open"><button class="notification-action" type="submit">Mark as read</button></form>"#,
            notification.id
        )
    };

    format!(
        r#"<div class="notification-item{unread}" data-notification-id="{id}">
  <div class="notification-item-header"><div class="notification-item-title">{title}</div><div class="notification-item-time">{time}</div></div>
  <div class="notification-item-message">{message}</div>
  <div class="notification-item-actions">{mark_read}<form method="post" action="/notifications/{id}/delete?panel=open"><button class="notification-action" type="submit">Delete</button></form></div>
</div>"#,
        unread = if notification.read { "" } else { " unread" },
        id = notification.id,
        title = escape_html(&notification.title),
        time = relative_time(notification.timestamp, now),
        message = escape_html(&notification.message),
    )
}

const BASE_STYLE: &str = r#"
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --done: #10b981;
      --pending: #3b82f6;
      --danger: #ef4444;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      padding: 32px 18px 48px;
    }

    h1, h2, h3 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      margin: 0 0 12px;
    }

    .app {
      width: min(1100px, 100%);
      margin: 0 auto;
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 32px;
      display: grid;
      gap: 24px;
      animation: rise 600ms ease;
    }

    .auth {
      width: min(460px, 100%);
    }

    header {
      display: flex;
      align-items: center;
      justify-content: space-between;
      gap: 12px;
    }

    .user {
      display: flex;
      align-items: center;
      gap: 10px;
      font-weight: 600;
    }

    .user .avatar {
      font-size: 2rem;
    }

    .header-actions {
      display: flex;
      gap: 8px;
      align-items: center;
    }

    .layout {
      display: grid;
      grid-template-columns: minmax(260px, 1fr) 2fr;
      gap: 24px;
    }

    @media (max-width: 820px) {
      .layout {
        grid-template-columns: 1fr;
      }
    }

    section, .settings {
      background: white;
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
    }

    form label {
      display: grid;
      gap: 4px;
      margin-bottom: 10px;
      font-size: 0.9rem;
      color: #5f5c57;
    }

    input, select, textarea {
      font: inherit;
      padding: 8px 10px;
      border-radius: 10px;
      border: 1px solid rgba(47, 72, 88, 0.2);
    }

    button, .button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 8px 14px;
      font: inherit;
      font-weight: 600;
      cursor: pointer;
      background: #f1ece4;
      color: var(--ink);
      text-decoration: none;
    }

    button.primary {
      background: var(--accent);
      color: white;
      box-shadow: 0 10px 24px rgba(255, 107, 74, 0.3);
    }

    button.ghost {
      background: transparent;
      border: 1px solid rgba(47, 72, 88, 0.2);
    }

    form {
      margin: 0;
    }

    .tabs {
      display: flex;
      gap: 8px;
    }

    .tab {
      flex: 1;
      text-align: center;
      padding: 10px;
      border-radius: 999px;
      background: #f1ece4;
      color: var(--ink);
      text-decoration: none;
      font-weight: 600;
    }

    .tab.active {
      background: var(--accent-2);
      color: white;
    }

    .auth-form {
      display: none;
    }

    .auth-form.active {
      display: block;
    }

    .error-message {
      background: #fde8e8;
      color: var(--danger);
      border-radius: 12px;
      padding: 10px 12px;
      margin-bottom: 12px;
      animation: fade 5s forwards;
    }

    .avatar-grid {
      display: flex;
      flex-wrap: wrap;
      gap: 8px;
      margin-bottom: 10px;
    }

    .avatar-option input {
      display: none;
    }

    .avatar-option span {
      display: inline-block;
      font-size: 1.6rem;
      padding: 6px;
      border-radius: 12px;
      border: 2px solid transparent;
      cursor: pointer;
    }

    .avatar-option input:checked + span {
      border-color: var(--accent);
    }

    .stats-grid {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(120px, 1fr));
      gap: 12px;
    }

    .stat {
      display: grid;
      gap: 4px;
    }

    .stat .label {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .stat .value {
      font-size: 1.6rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .done, .value.done {
      color: var(--done);
    }

    .pending, .value.pending {
      color: var(--pending);
    }

    .progress-bar {
      margin-top: 12px;
      height: 10px;
      border-radius: 999px;
      background: #f1ece4;
      overflow: hidden;
    }

    .progress-fill {
      height: 100%;
      background: linear-gradient(90deg, var(--accent), var(--done));
    }

    .progress-days {
      list-style: none;
      margin: 12px 0;
      padding: 0;
      display: grid;
      gap: 6px;
    }

    .progress-days li {
      display: grid;
      grid-template-columns: 96px 1fr 32px;
      align-items: center;
      gap: 8px;
      font-size: 0.85rem;
    }

    .progress-days .bar {
      height: 8px;
      border-radius: 999px;
      background: #f1ece4;
      overflow: hidden;
    }

    .progress-days .bar-fill {
      display: block;
      height: 100%;
      background: var(--done);
    }

    .habit-list {
      list-style: none;
      margin: 0;
      padding: 0;
      display: grid;
      gap: 10px;
    }

    .habit-item {
      display: flex;
      justify-content: space-between;
      gap: 12px;
      padding: 12px;
      border-radius: 14px;
      border: 1px solid rgba(47, 72, 88, 0.08);
    }

    .habit-item.completed .habit-name {
      text-decoration: line-through;
      color: #8b857d;
    }

    .habit-name {
      margin: 0 0 4px;
    }

    .habit-meta {
      display: flex;
      flex-wrap: wrap;
      gap: 6px;
      font-size: 0.8rem;
    }

    .habit-meta span, .planner-habit span {
      background: #f1ece4;
      border-radius: 999px;
      padding: 2px 8px;
    }

    .habit-actions {
      display: flex;
      gap: 6px;
      align-items: center;
    }

    .empty-state, .planner-empty, .notifications-empty {
      text-align: center;
      color: #8b857d;
      padding: 18px;
    }

    .empty-icon {
      font-size: 2.4rem;
    }

    .date-item {
      margin-bottom: 12px;
    }

    .date-header {
      display: flex;
      justify-content: space-between;
      font-weight: 600;
      margin-bottom: 6px;
    }

    .planner-habit {
      display: flex;
      align-items: center;
      gap: 8px;
      padding: 6px 0;
    }

    .planner-habit .habit-actions {
      margin-left: auto;
    }

    .planner-summary {
      display: flex;
      flex-wrap: wrap;
      gap: 16px;
      margin-top: 12px;
      border-top: 1px solid rgba(47, 72, 88, 0.08);
      padding-top: 12px;
    }

    .legend {
      width: 100%;
      margin: 0;
      font-size: 0.85rem;
      color: #8b857d;
    }

    .bell {
      position: relative;
      font-size: 1.4rem;
      text-decoration: none;
    }

    .badge {
      position: absolute;
      top: -6px;
      right: -10px;
      background: var(--danger);
      color: white;
      border-radius: 999px;
      font-size: 0.7rem;
      padding: 1px 6px;
    }

    .notifications-overlay {
      position: fixed;
      inset: 0;
      background: rgba(43, 42, 40, 0.35);
    }

    .notifications-panel {
      position: fixed;
      top: 0;
      right: 0;
      bottom: 0;
      width: min(380px, 100%);
      background: white;
      box-shadow: var(--shadow);
      padding: 20px;
      overflow-y: auto;
    }

    .notifications-header {
      display: flex;
      align-items: center;
      gap: 8px;
    }

    .notifications-header h3 {
      margin: 0;
      flex: 1;
    }

    .notifications-header .close {
      text-decoration: none;
      color: var(--ink);
    }

    .notification-item {
      border-radius: 12px;
      padding: 10px;
      margin-bottom: 8px;
      border: 1px solid rgba(47, 72, 88, 0.08);
    }

    .notification-item.unread {
      background: #fff4ee;
      border-color: var(--accent);
    }

    .notification-item-header {
      display: flex;
      justify-content: space-between;
      font-weight: 600;
    }

    .notification-item-time {
      font-size: 0.75rem;
      color: #8b857d;
    }

    .notification-item-actions {
      display: flex;
      gap: 6px;
      margin-top: 6px;
    }

    .notification-action {
      font-size: 0.8rem;
      padding: 4px 10px;
    }

    .toast {
      position: fixed;
      top: 20px;
      right: 20px;
      padding: 12px 20px;
      border-radius: 8px;
      color: white;
      z-index: 1000;
      font-weight: 500;
      box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1);
      animation: fade 3s forwards;
    }

    .toast-success {
      background: var(--done);
    }

    .toast-error {
      background: var(--danger);
    }

    .toast-info {
      background: var(--pending);
    }

    @keyframes rise {
      from {
        opacity: 0;
        transform: translateY(12px);
      }
      to {
        opacity: 1;
        transform: translateY(0);
      }
    }

    @keyframes fade {
      0%, 85% {
        opacity: 1;
      }
      100% {
        opacity: 0;
        visibility: hidden;
      }
    }
"#;

const AUTH_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Habit Tracker · Sign in</title>
  <style>{{STYLE}}</style>
</head>
<body>
  <main class="app auth">
    <header>
      <div>
        <h1>Habit Tracker</h1>
        <p class="subtitle">Build habits one day at a time.</p>
      </div>
    </header>

    <nav class="tabs">
      <a class="tab{{LOGIN_ACTIVE}}" id="login-tab" href="/auth">Sign in</a>
      <a class="tab{{REGISTER_ACTIVE}}" id="register-tab" href="/auth?tab=register">Register</a>
    </nav>

    <form class="auth-form{{LOGIN_ACTIVE}}" id="login-form" method="post" action="/auth/login">
      {{LOGIN_MESSAGE}}
      <label>Username<input name="username" autocomplete="username" /></label>
      <label>Password<input type="password" name="password" autocomplete="current-password" /></label>
      <button class="primary auth-btn" type="submit">Sign in</button>
    </form>

    <form class="auth-form{{REGISTER_ACTIVE}}" id="register-form" method="post" action="/auth/register">
      {{REGISTER_MESSAGE}}
      <label>Username<input name="username" autocomplete="username" /></label>
      <label>Email<input type="email" name="email" autocomplete="email" /></label>
      <label>Password<input type="password" name="password" autocomplete="new-password" /></label>
      <div class="avatar-grid" id="avatar-grid">{{AVATARS}}</div>
      <button class="primary auth-btn" type="submit">Create account</button>
      <p>Already registered? <a href="/auth">Sign in</a></p>
    </form>
  </main>
</body>
</html>
"#;

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Habit Tracker</title>
  <style>{{STYLE}}</style>
</head>
<body>
  {{TOAST}}
  <main class="app">
    <header>
      <div class="user"><span class="avatar" id="user-avatar">{{AVATAR}}</span><span id="user-name">{{USERNAME}}</span></div>
      <div class="header-actions">
        {{SYNC}}
        <a class="bell" id="notification-bell" href="/dashboard?panel=open">🔔{{BADGE}}</a>
        <form method="post" action="/logout" onsubmit="return confirm('Sign out?')"><button class="ghost" id="logout-btn" type="submit">Sign out</button></form>
      </div>
    </header>

    <div class="layout">
      <div>
        <section id="habit-form-section">{{HABIT_FORM}}</section>
        {{SETTINGS}}
      </div>
      <div>
        <section id="stats-container">
          <h2>Progress</h2>
          {{STATS}}
        </section>
        {{REMOTE}}
        <section>
          <h2>My habits</h2>
          <ul class="habit-list" id="habit-list">{{HABITS}}</ul>
        </section>
        <section id="planner">
          <h2>📅 Habit planner</h2>
          {{PLANNER}}
        </section>
      </div>
    </div>
  </main>
  {{NOTIFICATIONS}}
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Frequency, ProgressDay, ToastKind};
    use crate::stats::build_statistics;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn habit(id: i64, name: &str) -> HabitRecord {
        HabitRecord {
            id,
            user_id: "user-1".to_string(),
            name: name.to_string(),
            category: None,
            frequency: Frequency::Weekly,
            time: None,
            target_date: None,
            description: None,
            completed: false,
            created_at: now(),
            remote_id: None,
        }
    }

    fn user() -> UserProfile {
        UserProfile {
            id: "user-1".to_string(),
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            password: "secret1".to_string(),
            avatar: "buho.png".to_string(),
            registered_at: now(),
            settings: None,
        }
    }

    #[test]
    fn escape_html_neutralizes_markup() {
        assert_eq!(
            escape_html(r#"<b onclick="x">&'"#),
            "&lt;b onclick=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn escape_html_keeps_template_slots_out_of_user_text() {
        assert_eq!(escape_html("{{HABITS}}"), "&#123;&#123;HABITS&#125;&#125;");
    }

    #[test]
    fn empty_habit_list_has_empty_state() {
        let html = render_habit_list(&[]);
        assert!(html.contains("empty-state"));
        assert!(html.contains("No habits yet"));
    }

    #[test]
    fn habit_list_omits_missing_optionals() {
        let html = render_habit_list(&[habit(1, "Read")]);
        assert!(html.contains("Read"));
        assert!(html.contains("Weekly"));
        assert!(!html.contains("habit-category"));
        assert!(!html.contains("habit-description"));
        assert!(!html.contains("habit-date"));
        assert!(!html.contains("undefined"));
        assert!(!html.contains("None"));
    }

    #[test]
    fn habit_list_escapes_and_shows_optionals() {
        let mut item = habit(7, "<script>alert(1)</script>");
        item.category = Some("Health".to_string());
        item.description = Some("Twice & more".to_string());
        item.target_date = NaiveDate::from_ymd_opt(2026, 3, 2);
        item.completed = true;

        let html = render_habit_list(&[item]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Health"));
        assert!(html.contains("Twice &amp; more"));
        assert!(html.contains("March 2, 2026"));
        assert!(html.contains("habit-item completed"));
        assert!(html.contains("btn-undo"));
        assert!(html.contains(r#"action="/habits/7/toggle""#));
    }

    #[test]
    fn stats_cards_show_percentage_bar() {
        let html = render_stats(&Statistics {
            total: 4,
            completed: 1,
            pending: 3,
            percent_complete: 25,
        });
        assert!(html.contains(">4<"));
        assert!(html.contains("width: 25%"));
    }

    #[test]
    fn planner_orders_dated_groups_before_remainder() {
        let mut late = habit(1, "Late");
        late.target_date = NaiveDate::from_ymd_opt(2026, 5, 1);
        let mut early = habit(2, "Early");
        early.target_date = NaiveDate::from_ymd_opt(2026, 4, 1);
        let loose = habit(3, "Loose");
        let habits = vec![late, loose, early];

        let html = render_planner(&habits, &build_statistics(&habits));
        let early_at = html.find("Early").unwrap();
        let late_at = html.find("Late").unwrap();
        let loose_at = html.find("Loose").unwrap();
        assert!(early_at < late_at);
        assert!(late_at < loose_at);
        assert!(!html.contains("planner-empty"));
    }

    #[test]
    fn planner_empty_state() {
        let html = render_planner(&[], &Statistics::default());
        assert!(html.contains("planner-empty"));
        assert!(html.contains("<strong>0%</strong>"));
    }

    #[test]
    fn notifications_hidden_when_closed() {
        assert!(render_notifications(&[], now(), false).is_empty());
        assert!(render_notifications(&[], now(), true).contains("No notifications"));
    }

    #[test]
    fn notifications_group_unread_first() {
        let items = vec![
            Notification {
                id: 1,
                title: "Old one".to_string(),
                message: "done".to_string(),
                read: true,
                timestamp: now() - Duration::hours(2),
                habit_id: None,
            },
            Notification {
                id: 2,
                title: "Fresh one".to_string(),
                message: "todo".to_string(),
                read: false,
                timestamp: now() - Duration::minutes(3),
                habit_id: Some(5),
            },
        ];

        let html = render_notifications(&items, now(), true);
        assert!(html.find("Fresh one").unwrap() < html.find("Old one").unwrap());
        assert!(html.contains("3 min ago"));
        assert!(html.contains("2 h ago"));
        assert_eq!(html.matches("Mark as read").count(), 1);
        assert_eq!(html.matches(">Delete<").count(), 2);
    }

    #[test]
    fn auth_page_marks_active_tab_and_error() {
        let html = render_auth(AuthTab::Register, Some("Username or email is already registered"));
        assert!(html.contains(r#"class="tab active" id="register-tab""#));
        assert!(html.contains(r#"class="auth-form active" id="register-form""#));
        assert!(html.contains("already registered"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn dashboard_fills_every_slot() {
        let user = user();
        let habits = vec![habit(1, "Read")];
        let toast = Toast {
            kind: ToastKind::Success,
            message: "Habit added".to_string(),
        };
        let notifications = vec![Notification {
            id: 9,
            title: "Ping".to_string(),
            message: "hello".to_string(),
            read: false,
            timestamp: now(),
            habit_id: None,
        }];
        let view = DashboardView {
            user: &user,
            habits: &habits,
            stats: build_statistics(&habits),
            notifications: &notifications,
            panel_open: false,
            editing: Some(&habits[0]),
            toast: Some(&toast),
            remote_enabled: false,
            remote: None,
            now: now(),
        };

        let html = render_dashboard(&view);
        assert!(!html.contains("{{"));
        assert!(html.contains("🦉"));
        assert!(html.contains("toast-success"));
        assert!(html.contains(r#"<span class="badge">1</span>"#));
        assert!(html.contains(r#"name="replace_id" value="1""#));
        assert!(html.contains(r#"<option value="weekly" selected>"#));
        assert!(!html.contains(r#"id="notifications-panel""#));
        assert!(!html.contains("/notifications/sync"));
        assert!(!html.contains("remote-progress"));
    }

    #[test]
    fn open_panel_is_rendered_in_dashboard() {
        let user = user();
        let view = DashboardView {
            user: &user,
            habits: &[],
            stats: build_statistics(&[]),
            notifications: &[],
            panel_open: true,
            editing: None,
            toast: None,
            remote_enabled: true,
            remote: None,
            now: now(),
        };

        let html = render_dashboard(&view);
        assert!(html.contains(r#"<aside class="notifications-panel open" id="notifications-panel">"#));
        assert!(html.contains("/notifications/sync"));
    }

    #[test]
    fn remote_summary_shows_periods_and_daily_bars() {
        let summary = RemoteSummary {
            today: Some(PeriodStats {
                total_habitos: 4,
                habitos_cumplidos: 3,
                porcentaje_cumplimiento: 75.0,
            }),
            week: None,
            month: None,
            progress: Some(vec![
                ProgressDay { date: "2026-01-05".to_string(), completed: 2 },
                ProgressDay { date: "2026-01-06".to_string(), completed: 4 },
            ]),
        };

        let html = render_remote_summary(Some(&summary));
        assert!(html.contains("3/4"));
        assert!(html.contains("Today · 75%"));
        assert!(html.contains("This week · unavailable"));
        assert!(html.contains(r#"<span class="day">2026-01-05</span><span class="bar"><span class="bar-fill" style="width: 50%">"#));
        assert!(html.contains(r#"style="width: 100%""#));
        assert!(html.contains(r#"action="/habits/sync""#));

        let empty = RemoteSummary {
            progress: Some(Vec::new()),
            ..RemoteSummary::default()
        };
        assert!(render_remote_summary(Some(&empty)).contains("No progress recorded yet"));
        assert!(render_remote_summary(Some(&RemoteSummary::default())).contains("Progress history unavailable"));
        assert_eq!(render_remote_summary(None), "");
    }
}
