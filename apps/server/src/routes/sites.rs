use actix_web::{HttpResponse, delete, get, post, web};
use serde::Deserialize;
use sitewatch_service::database::Database;
use sitewatch_service::validation::validate_new_site;
use tracing::info;

use crate::error::AppError;

macros_utils::routes! {
    route list_sites,
    route register_site,
    route toggle_site,
    route delete_site,
}

/// Registration payload; `interval` in seconds
#[derive(Debug, Deserialize)]
pub struct RegisterSite {
    pub url: String,
    pub interval: Option<u64>,
    pub text: Option<String>,
}

/// Every site with its latest result and uptime
#[get("/api/sites")]
pub async fn list_sites(database: web::Data<dyn Database>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(database.list_site_overviews().await?))
}

#[post("/api/sites")]
pub async fn register_site(
    database: web::Data<dyn Database>,
    body: web::Json<RegisterSite>,
) -> Result<HttpResponse, AppError> {
    let new_site = validate_new_site(&body.url, body.interval, body.text.as_deref())?;
    let site = database.add_site(&new_site).await?;
    info!(site_id = site.id, "Registered {} (interval {}s)", site.url, site.check_interval);

    Ok(HttpResponse::Created().json(site))
}

#[post("/api/sites/{id}/toggle")]
pub async fn toggle_site(
    database: web::Data<dyn Database>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let site = database.toggle_site(id.into_inner()).await?;
    info!(site_id = site.id, "{} {}", site.url, if site.enabled { "enabled" } else { "disabled" });

    Ok(HttpResponse::Ok().json(site))
}

/// Removes the site together with its history
#[delete("/api/sites/{id}")]
pub async fn delete_site(
    database: web::Data<dyn Database>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    database.delete_site(id).await?;
    info!(site_id = id, "Site deleted");

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing::test_database;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn test_register_then_list() {
        let (data, _database, _dir) = test_database().await;
        let app = test::init_service(App::new().app_data(data).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/sites")
            .set_json(json!({"url": " https://ok.example ", "interval": 5, "text": "  "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let site: Value = test::read_body_json(resp).await;
        assert_eq!(site["url"], "https://ok.example");
        assert_eq!(site["check_interval"], 10);
        assert_eq!(site["expected_text"], Value::Null);
        assert_eq!(site["enabled"], true);

        let req = test::TestRequest::get().uri("/api/sites").to_request();
        let sites: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0]["status"], Value::Null);
    }

    #[actix_web::test]
    async fn test_invalid_url_is_rejected() {
        let (data, database, _dir) = test_database().await;
        let app = test::init_service(App::new().app_data(data).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/sites")
            .set_json(json!({"url": "ftp://files.example"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(database.list_sites().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_toggle_and_delete() {
        let (data, _database, _dir) = test_database().await;
        let app = test::init_service(App::new().app_data(data).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/sites")
            .set_json(json!({"url": "http://a.example"}))
            .to_request();
        let site: Value = test::call_and_read_body_json(&app, req).await;
        let id = site["id"].as_i64().unwrap();

        let req = test::TestRequest::post().uri(&format!("/api/sites/{id}/toggle")).to_request();
        let toggled: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(toggled["enabled"], false);

        let req = test::TestRequest::delete().uri(&format!("/api/sites/{id}")).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::post().uri(&format!("/api/sites/{id}/toggle")).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete().uri(&format!("/api/sites/{id}")).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
