mod common;

use anyhow::Result;
use axum::http::{header, Method, StatusCode};
use serde_json::json;

use shopdesk_api::types::Role;

#[tokio::test]
async fn tree_self_heals_namespace_on_first_access() -> Result<()> {
    let app = common::offline()?;
    let token = app.token(3, Role::User);

    let res = app.get("/api/files/tree", Some(&token)).await?;
    assert_eq!(res.status, StatusCode::OK);
    let names: Vec<String> = res.json()["data"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|e| e["name"].as_str().map(str::to_string))
        .collect();
    assert_eq!(names, vec!["archive", "images-products", "invoices", "data.json"]);

    let base = app.storage_root().join("tenant_3");
    std::fs::remove_dir_all(base.join("invoices"))?;
    std::fs::write(base.join("images-products").join("lamp.png"), b"png")?;

    let res = app.get("/api/files/tree", Some(&token)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert!(base.join("invoices").is_dir());
    assert_eq!(std::fs::read(base.join("images-products").join("lamp.png"))?, b"png");
    Ok(())
}

#[tokio::test]
async fn paths_cannot_escape_the_tenant_root() -> Result<()> {
    let app = common::offline()?;
    let token = app.token(4, Role::User);
    app.get("/api/files/tree", Some(&token)).await?;

    for uri in [
        "/api/files/preview?path=../tenant_5/data.json",
        "/api/files/download?path=%2Fetc%2Fpasswd",
        "/api/files/download?path=invoices/../../x",
    ] {
        let res = app.get(uri, Some(&token)).await?;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", uri);
    }

    let res = app
        .request(
            Method::POST,
            "/api/files/archive",
            Some(&token),
            Some(json!({"fileName": "../tenant_5/data.json"})),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn settings_are_isolated_per_tenant() -> Result<()> {
    let app = common::offline()?;
    let first = app.token(10, Role::User);
    let second = app.token(11, Role::User);

    let res = app
        .request(
            Method::PATCH,
            "/api/files/settings",
            Some(&first),
            Some(json!({"storeInfo": {"name": "Corner Shop"}, "settings": {"currency": "EUR"}})),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["data"]["storeInfo"]["name"], "Corner Shop");

    let res = app.get("/api/files/settings", Some(&second)).await?;
    assert_eq!(res.status, StatusCode::OK);
    let data = &res.json()["data"];
    assert_eq!(data["userId"], 11);
    assert_eq!(data["storeInfo"]["name"], "");
    assert_eq!(data["settings"]["currency"], "USD");
    Ok(())
}

#[tokio::test]
async fn preview_download_and_archive_flow() -> Result<()> {
    let app = common::offline()?;
    let token = app.token(6, Role::User);
    app.get("/api/files/tree", Some(&token)).await?;
    let base = app.storage_root().join("tenant_6");
    std::fs::write(base.join("invoices").join("inv-7.txt"), "total: 42")?;

    let res = app.get("/api/files/preview?path=invoices/inv-7.txt", Some(&token)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["data"]["content"], "total: 42");

    let res = app.get("/api/files/download?path=invoices/inv-7.txt", Some(&token)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, b"total: 42");
    let disposition = res.headers[header::CONTENT_DISPOSITION].to_str()?;
    assert_eq!(disposition, "attachment; filename=\"inv-7.txt\"");

    let res = app
        .request(
            Method::POST,
            "/api/files/archive",
            Some(&token),
            Some(json!({"fileName": "invoices/inv-7.txt"})),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["data"]["archived"], "archive/inv-7.txt");
    assert!(base.join("archive").join("inv-7.txt").is_file());

    let res = app.get("/api/files/download?path=invoices/inv-7.txt", Some(&token)).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn binary_files_are_not_previewable() -> Result<()> {
    let app = common::offline()?;
    let token = app.token(8, Role::User);
    app.get("/api/files/tree", Some(&token)).await?;
    std::fs::write(
        app.storage_root().join("tenant_8").join("images-products").join("a.png"),
        [0u8, 1, 2],
    )?;

    let res = app.get("/api/files/preview?path=images-products/a.png", Some(&token)).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}
