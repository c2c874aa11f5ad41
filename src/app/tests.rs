use super::*;
use crate::config::AppConfig;
use crate::db::{
    Method, Outcome, Record, RecordRepository, RecordingRouter, TABLE_SELECTION_ROUTE,
};
use crate::error::CrudError;
use crate::testing::{MemoryServer, ScriptedBackend};
use serde_json::{json, Value};
use std::sync::Arc;

fn employees_columns() -> Value {
    json!([
        {"name": "id", "type": "serial", "nullable": false, "autoIncrement": true, "primaryKey": true},
        {"name": "name", "type": "varchar", "nullable": false},
        {"name": "hire_date", "type": "date", "nullable": true},
        {"name": "created_by", "type": "varchar", "nullable": true}
    ])
}

fn employees_server() -> MemoryServer {
    MemoryServer::new().with_table("public", "employees", "id", employees_columns())
}

fn session_over(client: Arc<dyn crate::db::HttpClient>) -> (Session, Arc<RecordingRouter>) {
    let router = Arc::new(RecordingRouter::default());
    let session = Session::new(client, router.clone(), AppConfig::default());
    (session, router)
}

fn rec(v: Value) -> Record {
    v.as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_repository_end_to_end() {
    let server = employees_server();
    let repo = RecordRepository::new(Arc::new(server.clone()));

    let created = repo
        .create("public", "employees", &rec(json!({"name": "Ann", "hire_date": "2024-01-15"})))
        .await;
    assert!(created.is_success());

    let rows = repo.list("public", "employees").await.unwrap();
    assert_eq!(rows.len(), 1);
    let id = rows[0]["id"].to_string();
    assert_eq!(id, "1");

    let updated = repo
        .update("public", "employees", &id, &rec(json!({"name": "Anne"})))
        .await;
    assert!(updated.is_success());
    let rows = repo.list("public", "employees").await.unwrap();
    assert_eq!(rows[0]["name"], json!("Anne"));

    assert!(repo.remove("public", "employees", &id).await.is_success());
    let rows = repo.list("public", "employees").await.unwrap();
    assert!(rows.iter().all(|r| r["id"].to_string() != id));
}

#[tokio::test]
async fn test_session_end_to_end() {
    let server = employees_server();
    let (mut session, _) = session_over(Arc::new(server.clone()));

    session.load_schemas().await.unwrap();
    assert_eq!(session.schemas, vec!["public"]);
    session.select_schema("public").await.unwrap();
    session.select_table("public", "employees").await.unwrap();

    assert!(session.is_form_ready);
    assert_eq!(session.grid.displayed_columns, vec!["id", "name", "hire_date", "actions"]);
    assert!(session.form.field("created_by").is_none());
    assert!(!session.form.field("id").unwrap().enabled);

    session.set_field("name", "Ann").unwrap();
    session.set_field("hire_date", "2024-01-15").unwrap();
    let outcome = session.submit().await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(session.message.as_deref(), Some("Row inserted successfully"));
    assert_eq!(session.grid.rows.len(), 1);
    assert_eq!(session.grid.rows[0]["id"], json!(1));
    assert_eq!(session.form.value("name"), Some(""));

    let row = session.grid.rows[0].clone();
    session.edit_row(&row).unwrap();
    assert_eq!(session.form.editing.as_ref().unwrap().row_id, "1");
    session.set_field("name", "Anne").unwrap();
    let outcome = session.submit().await.unwrap();
    assert!(outcome.is_success());
    assert!(!session.form.is_edit());
    assert_eq!(session.grid.rows[0]["name"], json!("Anne"));

    let row = session.grid.rows[0].clone();
    let outcome = session.delete_row(&row).await.unwrap();
    assert!(outcome.is_success());
    assert!(session.grid.rows.is_empty());
    assert!(server.rows("public", "employees").is_empty());
}

#[tokio::test]
async fn test_application_error_keeps_form_and_rows() {
    let columns = json!([
        {"name": "id", "type": "serial", "nullable": false, "autoIncrement": true, "primaryKey": true},
        {"name": "code", "type": "varchar", "nullable": false}
    ]);
    let server = MemoryServer::new()
        .with_table("inv", "items", "id", columns)
        .with_unique_violation("code", "C223");
    let (mut session, _) = session_over(Arc::new(server.clone()));
    session.select_table("inv", "items").await.unwrap();

    session.set_field("code", "C100").unwrap();
    assert!(session.submit().await.unwrap().is_success());
    let before = session.grid.rows.clone();

    let row = before[0].clone();
    session.edit_row(&row).unwrap();
    session.set_field("code", "C223").unwrap();
    let gets_before = server.count(Method::Get);
    let outcome = session.submit().await.unwrap();

    assert_eq!(outcome, Outcome::ApplicationError("code already exists: C223".to_string()));
    assert_eq!(session.error.as_deref(), Some("code already exists: C223"));
    // no reload, form untouched
    assert_eq!(server.count(Method::Get), gets_before);
    assert_eq!(session.grid.rows, before);
    assert!(session.form.is_edit());
    assert_eq!(session.form.value("code"), Some("C223"));
}

#[tokio::test]
async fn test_transport_error_keeps_form() {
    let backend = ScriptedBackend::new()
        .route("/hr/people/columns", 200, json!([
            {"name": "id", "type": "int4", "primaryKey": true, "nullable": false},
            {"name": "name", "type": "text", "nullable": false}
        ]))
        .route_method(Method::Get, "/hr/people", 200, json!([]))
        .route_method(Method::Post, "/hr/people", 500, json!({"message": "insert failed: db offline"}));
    let (mut session, _) = session_over(Arc::new(backend.clone()));
    session.select_table("hr", "people").await.unwrap();

    session.set_field("name", "Ann").unwrap();
    let gets_before = backend.count(Method::Get);
    let outcome = session.submit().await.unwrap();

    assert_eq!(outcome, Outcome::TransportError("insert failed: db offline".to_string()));
    assert_eq!(session.error.as_deref(), Some("insert failed: db offline"));
    assert_eq!(session.form.value("name"), Some("Ann"));
    assert_eq!(backend.count(Method::Get), gets_before);
}

#[tokio::test]
async fn test_validation_blocks_dispatch() {
    let server = employees_server();
    let (mut session, _) = session_over(Arc::new(server.clone()));
    session.select_table("public", "employees").await.unwrap();

    let err = session.submit().await.unwrap_err();
    assert!(matches!(err, CrudError::Validation(_)));
    assert_eq!(session.error.as_deref(), Some("required: name"));
    assert_eq!(server.count(Method::Post), 0);
}

#[tokio::test]
async fn test_keyless_table_rejects_update_and_delete() {
    let backend = ScriptedBackend::new()
        .route("/log/events/columns", 200, json!([{"name": "msg", "type": "text"}]))
        .route_method(Method::Get, "/log/events", 200, json!([{"msg": "hello"}]));
    let (mut session, _) = session_over(Arc::new(backend.clone()));
    session.select_table("log", "events").await.unwrap();

    let row = session.grid.rows[0].clone();
    assert!(matches!(session.edit_row(&row), Err(CrudError::Validation(_))));
    assert!(matches!(session.delete_row(&row).await, Err(CrudError::Validation(_))));
    assert_eq!(backend.count(Method::Delete), 0);
    assert_eq!(backend.count(Method::Put), 0);
}

#[tokio::test]
async fn test_stale_selection_is_discarded() {
    let backend = ScriptedBackend::new()
        .route("/a/t1/columns", 200, json!([{"name": "x", "type": "int4", "isForeignKey": true}]))
        .route("/a/t1/fk-values/x", 200, json!([{"id": 1, "value": "one"}]))
        .route("/a/t2/columns", 200, json!([{"name": "y", "type": "text"}]));
    let (mut session, _) = session_over(Arc::new(backend));

    let first = session.begin_selection("a", "t1").unwrap();
    let second = session.begin_selection("a", "t2").unwrap();
    assert!(second.generation > first.generation);

    // the older request resolves last
    let t2 = session.catalog.load_table("a", "t2", second.generation).await.unwrap();
    let t1 = session.catalog.load_table("a", "t1", first.generation).await.unwrap();
    assert!(session.install_snapshot(t2));
    assert!(!session.install_snapshot(t1));
    assert!(!session.install_records(first.generation, vec![rec(json!({"x": 1}))]));

    let snap = session.snapshot.as_ref().unwrap();
    assert_eq!(snap.table, "t2");
    assert!(snap.fk_options.is_empty());
    assert_eq!(session.grid.displayed_columns, vec!["y", "actions"]);
    assert!(session.grid.rows.is_empty());
}

#[tokio::test]
async fn test_table_switch_does_not_bleed_options() {
    let backend = ScriptedBackend::new()
        .route("/a/t1/columns", 200, json!([{"name": "x", "type": "int4", "isForeignKey": true}]))
        .route("/a/t1/fk-values/x", 200, json!([{"id": 1, "value": "one"}]))
        .route("/a/t1", 200, json!([]))
        .route("/a/t2/columns", 200, json!([{"name": "x", "type": "int4"}]))
        .route("/a/t2", 200, json!([]));
    let (mut session, _) = session_over(Arc::new(backend));

    session.select_table("a", "t1").await.unwrap();
    assert_eq!(session.filtered_options("x", "o").len(), 1);

    session.select_table("a", "t2").await.unwrap();
    assert!(session.snapshot.as_ref().unwrap().fk_options.get("x").is_none());
    assert!(session.filtered_options("x", "").is_empty());
}

#[tokio::test]
async fn test_unknown_selection_is_not_found() {
    let (mut session, _) = session_over(Arc::new(employees_server()));
    session.load_schemas().await.unwrap();

    assert!(matches!(session.select_schema("nope").await, Err(CrudError::NotFound(_))));
    session.select_schema("public").await.unwrap();
    let err = session.select_table("public", "ghosts").await.unwrap_err();
    assert!(matches!(err, CrudError::NotFound(_)));
    assert!(session.selected_table.is_none());
}

#[tokio::test]
async fn test_go_back_discards_selection() {
    let (mut session, router) = session_over(Arc::new(employees_server()));
    session.select_table("public", "employees").await.unwrap();
    let generation = session.generation;

    session.go_back();

    assert!(session.snapshot.is_none());
    assert!(!session.is_form_ready);
    assert!(session.selection_label().is_none());
    assert!(session.generation > generation);
    assert_eq!(router.last_route().as_deref(), Some(TABLE_SELECTION_ROUTE));
}

#[tokio::test]
async fn test_repeated_submission_is_not_deduplicated() {
    // No dedup or cancellation: two identical in-flight creates both land
    let server = employees_server();
    let repo = RecordRepository::new(Arc::new(server.clone()));
    let row = rec(json!({"name": "Ann"}));

    let (a, b) = futures::join!(
        repo.create("public", "employees", &row),
        repo.create("public", "employees", &row)
    );

    assert!(a.is_success() && b.is_success());
    assert_eq!(server.count(Method::Post), 2);
    assert_eq!(server.rows("public", "employees").len(), 2);
}

#[tokio::test]
async fn test_export_csv_file() {
    let server = employees_server();
    let dir = std::env::temp_dir().join(format!("dyn_crud_export_{}", std::process::id()));
    let config = AppConfig {
        export_dir: Some(dir.clone()),
        ..AppConfig::default()
    };
    let mut session = Session::new(Arc::new(server), Arc::new(RecordingRouter::default()), config);
    session.select_table("public", "employees").await.unwrap();

    assert!(session.export_csv(ExportScope::Visible).is_err());

    session.set_field("name", "A, \"B\"").unwrap();
    session.submit().await.unwrap();
    let path = session.export_csv(ExportScope::Filtered).unwrap();

    assert!(path.ends_with("employees_data.csv"));
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "id,name,hire_date\n\"1\",\"A, \"\"B\"\"\",\"\"\n");
    let _ = std::fs::remove_dir_all(&dir);

#[tokio::test]
async fn test_export_json_file() {
    let server = employees_server();
    let dir = std::env::temp_dir().join(format!("dyn_crud_json_{}", std::process::id()));
    let config = AppConfig {
        export_dir: Some(dir.clone()),
        ..AppConfig::default()
    };
    let mut session = Session::new(Arc::new(server), Arc::new(RecordingRouter::default()), config);
    session.select_table("public", "employees").await.unwrap();

    let err = session.export_json(ExportScope::Filtered).unwrap_err();
    assert!(matches!(err, CrudError::Validation(_)));
    assert_eq!(session.error.as_deref(), Some("no rows to export"));
    assert!(!dir.join("employees_data.json").exists());

    session.set_field("name", "Ann").unwrap();
    session.set_field("hire_date", "2024-01-15").unwrap();
    session.submit().await.unwrap();
    let path = session.export_json(ExportScope::Visible).unwrap();

    assert!(path.ends_with("employees_data.json"));
    let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed, json!([{"id": "1", "name": "Ann", "hire_date": "2024-01-15"}]));
    assert_eq!(
        session.message,
        Some(format!("Exported 1 row(s) to {}", path.display()))
    );
    let _ = std::fs::remove_dir_all(&dir);
}
}
