use detantic::{Config, Detantic, Error, ListFilesRequest, Record, Schema, UploadFile};
use httptest::{matchers::*, responders::*, Expectation, Server};
use serde::{Deserialize, Serialize};
use serde_json::json;

type Result = anyhow::Result<()>;

const KEY: &str = "proj_secretkey";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct User {
    #[serde(default)]
    id: String,
    name: String,
    age: i64,
}

impl Record for User {
    fn schema() -> Schema {
        Schema::new()
            .field("name", |f| f.is_string().is_not_empty())
            .field("age", |f| f.is_int().min(0.0))
    }
}

fn deta(server: &Server) -> Detantic {
    let config = Config::new(KEY)
        .unwrap()
        .with_database_url(format!("http://{}/v1/{{project}}/{{name}}", server.addr()))
        .unwrap()
        .with_drive_url(format!("http://{}/drive/v1/{{project}}/{{name}}", server.addr()))
        .unwrap();
    Detantic::new(config).unwrap()
}

fn json_response(status: u16, body: serde_json::Value) -> impl Responder {
    status_code(status)
        .insert_header("content-type", "application/json")
        .body(body.to_string())
}

#[tokio::test]
async fn insert_renames_id_and_authenticates() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/v1/proj/users/items"),
            request::headers(contains(("x-api-key", KEY))),
            request::body(json_decoded(eq(json!({
                "item": { "key": "u1", "name": "Alice", "age": 30 }
            })))),
        ])
        .respond_with(json_response(201, json!({ "key": "u1", "name": "Alice", "age": 30 }))),
    );

    let users = deta(&server).model::<User>("users")?;
    let alice = User { id: String::new(), name: "Alice".into(), age: 30 };
    let created = users.insert(&alice, Some("u1")).await?;
    assert_eq!(created, User { id: "u1".into(), ..alice });
    Ok(())
}

#[tokio::test]
async fn insert_conflict_is_duplicate_key() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/v1/proj/users/items"))
            .respond_with(json_response(409, json!({ "errors": ["Key already exists"] }))),
    );

    let users = deta(&server).model::<User>("users")?;
    let err = users
        .insert(&User { id: String::new(), name: "Bob".into(), age: 1 }, Some("taken"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateKey(ref k) if k == "taken"));
    Ok(())
}

#[tokio::test]
async fn invalid_input_sends_no_request() -> Result {
    // No expectations: any request reaching the server fails the test.
    let server = Server::run();
    let deta = deta(&server);
    let users = deta.model::<User>("users")?;

    let bad = User { id: String::new(), name: String::new(), age: -3 };
    assert!(matches!(users.insert(&bad, None).await, Err(Error::Validation(_))));
    assert!(matches!(users.find_many(&json!({ "age": "x" }), None).await, Err(Error::Validation(_))));
    assert!(users.find_one(&json!({})).await?.is_none());

    let files = deta.storage("photos")?;
    let err = files.upload_small_file(UploadFile::new("a/b.txt", vec![1]).in_directory("docs")).await;
    assert!(matches!(err, Err(Error::InvalidFileName(_))));
    let err = files.upload_small_file(UploadFile::new("big.bin", vec![0; 10_000_001])).await;
    assert!(matches!(err, Err(Error::FileTooLarge { .. })));
    Ok(())
}

#[tokio::test]
async fn find_one_sends_limited_query() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/v1/proj/users/query"),
            request::body(json_decoded(eq(json!({ "query": [{ "key": "u1" }], "limit": 1 })))),
        ])
        .respond_with(json_encoded(json!({
            "paging": { "size": 1 },
            "items": [{ "key": "u1", "name": "Alice", "age": 30 }]
        }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/v1/proj/users/query"),
            request::body(json_decoded(eq(json!({ "query": [{ "name": "Nobody" }], "limit": 1 })))),
        ])
        .respond_with(json_encoded(json!({ "paging": { "size": 0 }, "items": [] }))),
    );

    let users = deta(&server).model::<User>("users")?;
    let found = users.find_one(&json!({ "id": "u1" })).await?.expect("user u1");
    assert_eq!(found.id, "u1");
    assert!(users.find_one(&json!({ "name": "Nobody" })).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn find_many_follows_paging() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/v1/proj/users/query"),
            request::body(json_decoded(eq(json!({ "query": [{ "age": 5 }] })))),
        ])
        .respond_with(json_encoded(json!({
            "paging": { "size": 1, "last": "a" },
            "items": [{ "key": "a", "name": "A", "age": 5 }]
        }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/v1/proj/users/query"),
            request::body(json_decoded(eq(json!({ "query": [{ "age": 5 }], "last": "a" })))),
        ])
        .respond_with(json_encoded(json!({
            "paging": { "size": 1 },
            "items": [{ "key": "b", "name": "B", "age": 5 }]
        }))),
    );

    let users = deta(&server).model::<User>("users")?;
    let found = users.find_many(&json!({ "age": 5 }), None).await?;
    let ids: Vec<_> = found.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    Ok(())
}

#[tokio::test]
async fn update_by_id_patches_and_merges() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/v1/proj/users/items/u1"))
            .respond_with(json_encoded(json!({ "key": "u1", "name": "Alice", "age": 30 }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("PATCH", "/v1/proj/users/items/u1"),
            request::body(json_decoded(eq(json!({ "set": { "age": 31 } })))),
        ])
        .respond_with(json_encoded(json!({ "key": "u1", "set": { "age": 31 } }))),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/v1/proj/users/items/gone"))
            .respond_with(json_response(404, json!({ "key": "gone" }))),
    );

    let users = deta(&server).model::<User>("users")?;
    let updated = users.update_by_id(&json!({ "age": 31 }), "u1").await?.expect("user u1");
    assert_eq!(updated, User { id: "u1".into(), name: "Alice".into(), age: 31 });
    assert!(users.update_by_id(&json!({ "age": 2 }), "gone").await?.is_none());
    Ok(())
}

#[derive(Serialize, Default)]
struct UserPatch {
    name: Option<String>,
    age: Option<i64>,
}

#[tokio::test]
async fn unset_patch_fields_stay_off_the_wire() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/v1/proj/users/query"),
            request::body(json_decoded(eq(json!({ "query": [{ "age": 31 }], "limit": 1 })))),
        ])
        .respond_with(json_encoded(json!({
            "paging": { "size": 1 },
            "items": [{ "key": "u1", "name": "Alice", "age": 31 }]
        }))),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/v1/proj/users/items/u1"))
            .respond_with(json_encoded(json!({ "key": "u1", "name": "Alice", "age": 30 }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("PATCH", "/v1/proj/users/items/u1"),
            request::body(json_decoded(eq(json!({ "set": { "age": 31 } })))),
        ])
        .respond_with(json_encoded(json!({ "key": "u1", "set": { "age": 31 } }))),
    );

    let users = deta(&server).model::<User>("users")?;
    let found = users.find_one(&UserPatch { age: Some(31), ..Default::default() }).await?;
    assert_eq!(found.map(|u| u.id).as_deref(), Some("u1"));

    let patch = UserPatch { name: None, age: Some(31) };
    let updated = users.update_by_id(&patch, "u1").await?.expect("user u1");
    assert_eq!(updated, User { id: "u1".into(), name: "Alice".into(), age: 31 });
    Ok(())
}

#[tokio::test]
async fn delete_by_id_returns_deleted_record() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/v1/proj/users/items/u1"))
            .respond_with(json_encoded(json!({ "key": "u1", "name": "Alice", "age": 30 }))),
    );
    server.expect(
        Expectation::matching(request::method_path("DELETE", "/v1/proj/users/items/u1"))
            .respond_with(json_encoded(json!({ "key": "u1" }))),
    );

    let users = deta(&server).model::<User>("users")?;
    let deleted = users.delete_by_id("u1").await?.expect("user u1");
    assert_eq!(deleted.name, "Alice");
    Ok(())
}

#[tokio::test]
async fn insert_many_uses_bulk_put() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("PUT", "/v1/proj/users/items"),
            request::body(json_decoded(|body: &serde_json::Value| {
                body["items"].as_array().map_or(false, |items| {
                    items.len() == 2 && items.iter().all(|i| i["key"].is_string() && i.get("id").is_none())
                })
            })),
        ])
        .respond_with(json_encoded(json!({
            "processed": { "items": [
                { "key": "k1", "name": "A", "age": 1 },
                { "key": "k2", "name": "B", "age": 2 }
            ] }
        }))),
    );

    let users = deta(&server).model::<User>("users")?;
    let batch = vec![
        User { id: String::new(), name: "A".into(), age: 1 },
        User { id: String::new(), name: "B".into(), age: 2 },
    ];
    let created = users.insert_many(&batch).await?;
    let ids: Vec<_> = created.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["k1", "k2"]);
    Ok(())
}

#[tokio::test]
async fn server_errors_surface_as_status() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/v1/proj/users/query"))
            .respond_with(status_code(500).body("boom")),
    );

    let users = deta(&server).model::<User>("users")?;
    let err = users.find_many(&json!({}), None).await.unwrap_err();
    match err {
        Error::Status { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {}", other),
    }
    Ok(())
}

#[tokio::test]
async fn small_upload_posts_file() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/drive/v1/proj/photos/files"),
            request::query(url_decoded(contains(("name", "docs/2024/a.txt")))),
            request::headers(contains(("x-api-key", KEY))),
        ])
        .respond_with(json_response(201, json!({ "name": "docs/2024/a.txt" }))),
    );

    let files = deta(&server).storage("photos")?;
    let name = files
        .upload_small_file(UploadFile::new("a.txt", b"hello".to_vec()).in_directory("/docs/2024"))
        .await?;
    assert_eq!(name, "docs/2024/a.txt");
    Ok(())
}

#[tokio::test]
async fn chunked_upload_sends_three_parts() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/drive/v1/proj/photos/uploads"),
            request::query(url_decoded(contains(("name", "big.bin")))),
        ])
        .respond_with(json_response(202, json!({ "upload_id": "up1", "name": "big.bin" }))),
    );
    for part in ["1", "2", "3"] {
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/drive/v1/proj/photos/uploads/up1/parts"),
                request::query(url_decoded(contains(("name", "big.bin")))),
                request::query(url_decoded(contains(("part", part)))),
            ])
            .respond_with(status_code(200)),
        );
    }
    server.expect(
        Expectation::matching(all_of![
            request::method_path("PATCH", "/drive/v1/proj/photos/uploads/up1"),
            request::query(url_decoded(contains(("name", "big.bin")))),
        ])
        .respond_with(status_code(200)),
    );

    let files = deta(&server).storage("photos")?;
    let name = files.upload_file(UploadFile::new("big.bin", vec![1u8; 12 * 1024 * 1024])).await?;
    assert_eq!(name, "big.bin");
    Ok(())
}

#[tokio::test]
async fn chunked_upload_aborts_on_failure() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/drive/v1/proj/photos/uploads"))
            .respond_with(json_response(202, json!({ "upload_id": "up2", "name": "x.bin" }))),
    );
    server.expect(
        Expectation::matching(request::method_path("POST", "/drive/v1/proj/photos/uploads/up2/parts"))
            .respond_with(status_code(400).body("bad part")),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("DELETE", "/drive/v1/proj/photos/uploads/up2"),
            request::query(url_decoded(contains(("name", "x.bin")))),
        ])
        .respond_with(status_code(200)),
    );

    let files = deta(&server).storage("photos")?;
    let err = files.upload_file(UploadFile::new("x.bin", vec![0u8; 10])).await.unwrap_err();
    assert!(matches!(err, Error::Status { .. }));
    Ok(())
}

#[tokio::test]
async fn download_list_and_delete() -> Result {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/drive/v1/proj/photos/files/download"),
            request::query(url_decoded(contains(("name", "a.txt")))),
        ])
        .respond_with(status_code(200).body("content")),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/drive/v1/proj/photos/files/download"),
            request::query(url_decoded(contains(("name", "missing.txt")))),
        ])
        .respond_with(status_code(404)),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/drive/v1/proj/photos/files"),
            request::query(url_decoded(contains(("prefix", "docs/")))),
            request::query(url_decoded(contains(("limit", "10")))),
            request::query(url_decoded(not(contains(key("last"))))),
        ])
        .respond_with(json_encoded(json!({
            "paging": { "size": 2, "last": "docs/b" },
            "names": ["docs/a", "docs/b"]
        }))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("DELETE", "/drive/v1/proj/photos/files"),
            request::body(json_decoded(eq(json!({ "names": ["a.txt", "b.txt"] })))),
        ])
        .respond_with(json_encoded(json!({
            "deleted": ["a.txt"],
            "failed": { "b.txt": "internal error" }
        }))),
    );

    let files = deta(&server).storage("photos")?;
    assert_eq!(files.get_file("a.txt").await?.expect("a.txt").as_ref(), b"content");
    assert!(files.get_file("missing.txt").await?.is_none());

    let req = ListFilesRequest { limit: Some(10), prefix: Some("docs/".into()), last: None };
    let page = files.list_files_with_paging(&req).await?;
    assert_eq!(page.names, vec!["docs/a", "docs/b"]);
    assert_eq!(page.paging.last.as_deref(), Some("docs/b"));

    let resp = files.delete_files_detailed(&["a.txt", "b.txt"]).await?;
    assert_eq!(resp.deleted, vec!["a.txt"]);
    assert_eq!(resp.failed.get("b.txt").map(String::as_str), Some("internal error"));
    Ok(())
}
