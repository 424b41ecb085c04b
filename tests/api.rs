use chrono::NaiveDate;
use habit_tracker::ApiClient;
use habit_tracker::api::token_from;
use habit_tracker::errors::ApiError;
use habit_tracker::models::{Frequency, HabitDraft, RemoteHabit};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn delete_with_no_content_reports_success() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/habits/42"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let value = client(&server).delete_habit(42).await.unwrap();
    assert_eq!(value, json!({ "success": true }));
}

#[tokio::test]
async fn create_habit_sends_remote_fields_and_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/habits"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 7 })))
        .expect(1)
        .mount(&server)
        .await;

    let draft = HabitDraft {
        name: "Meditar".to_string(),
        category: Some("Mente".to_string()),
        frequency: Frequency::Weekly,
        time: Some("07:30".to_string()),
        target_date: NaiveDate::from_ymd_opt(2024, 6, 1),
        description: None,
    };
    let api = client(&server).with_token(Some("tok-1".to_string()));
    let value = api.create_habit(&RemoteHabit::from(&draft)).await.unwrap();
    assert_eq!(value["id"], 7);

    let requests = server.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["nombre"], "Meditar");
    assert_eq!(sent["categoria"], "Mente");
    assert_eq!(sent["frecuencia"], "semanal");
    assert_eq!(sent["hora"], "07:30");
    assert_eq!(sent["fechaObjetivo"], "2024-06-01");
}

#[tokio::test]
async fn error_message_surfaces_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/habits"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "El nombre es obligatorio" })),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .create_habit(&RemoteHabit::from(&HabitDraft::default()))
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status, message, .. } => {
            assert_eq!(status, 400);
            assert_eq!(message, "El nombre es obligatorio");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn login_returns_token_or_error_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "username": "ana", "password": "secret123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "abc.def" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "Credenciales inválidas" })),
        )
        .mount(&server)
        .await;

    let api = client(&server);
    let value = api.login("ana", "secret123").await.unwrap();
    assert_eq!(token_from(&value).as_deref(), Some("abc.def"));

    let err = api.login("ana", "nope").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("Credenciales inválidas"));
}

#[tokio::test]
async fn list_habits_decodes_remote_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/habits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "nombre": "Leer", "frecuencia": "diaria" },
            { "id": 2, "nombre": "Correr", "categoria": "Salud", "frecuencia": "semanal" }
        ])))
        .mount(&server)
        .await;

    let habits = client(&server).list_habits().await.unwrap();
    assert_eq!(habits.len(), 2);
    assert_eq!(habits[0].id, Some(1));
    assert_eq!(habits[0].nombre, "Leer");
    assert_eq!(habits[1].categoria.as_deref(), Some("Salud"));
}

#[tokio::test]
async fn mark_completion_posts_date_and_flag() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/progress/5"))
        .and(body_json(json!({ "fecha": "2024-03-09", "cumplido": true })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 11 })))
        .expect(1)
        .mount(&server)
        .await;

    let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    let value = client(&server).mark_completion(5, date, true).await.unwrap();
    assert_eq!(value["id"], 11);
}

#[tokio::test]
async fn notifications_are_returned_as_raw_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            "Recuerda beber agua",
            { "titulo": "Racha", "mensaje": "3 días seguidos" }
        ])))
        .mount(&server)
        .await;

    let entries = client(&server).notifications().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], json!("Recuerda beber agua"));
    assert_eq!(entries[1]["titulo"], "Racha");
}

#[tokio::test]
async fn stats_and_progress_pass_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/progress/stats/weekly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "porcentaje": 75.0 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/progress"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "habitId": 1, "fecha": "2024-03-09", "cumplido": true }])),
        )
        .mount(&server)
        .await;

    let api = client(&server);
    assert_eq!(api.weekly_stats().await.unwrap()["porcentaje"], 75.0);

    let entries = api.progress().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["cumplido"], true);
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/progress/diario"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let api = ApiClient::new(format!("{}/api", server.uri()), Duration::from_millis(200)).unwrap();
    let err = api.daily_progress().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(ref inner) if inner.is_timeout()));
}
