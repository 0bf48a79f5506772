use actix_web::{HttpResponse, get, web};
use chrono::{Duration, Utc};
use serde::Deserialize;
use sitewatch_service::Error;
use sitewatch_service::database::{ChartPoint, Database};

use crate::error::AppError;

const DEFAULT_DAYS: i64 = 7;

macros_utils::routes! {
    route site_logs,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub days: Option<i64>,
}

/// Response-time history of one site, oldest first
#[get("/api/logs/{site_id}")]
pub async fn site_logs(
    database: web::Data<dyn Database>,
    site_id: web::Path<i64>,
    query: web::Query<LogsQuery>,
) -> Result<HttpResponse, AppError> {
    let site_id = site_id.into_inner();
    let days = query.days.unwrap_or(DEFAULT_DAYS);
    if days < 1 {
        return Err(Error::Validation(format!("days must be positive, got {days}")).into());
    }

    let since = Duration::try_days(days)
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .ok_or_else(|| Error::Validation(format!("days out of range: {days}")))?;

    if database.get_site(site_id).await?.is_none() {
        return Err(Error::NotFound(site_id).into());
    }

    let points: Vec<ChartPoint> =
        database.get_logs_since(site_id, since).await?.iter().map(ChartPoint::from).collect();
    Ok(HttpResponse::Ok().json(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing::test_database;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::Value;
    use sitewatch_service::database::NewSite;
    use sitewatch_service::monitoring::ProbeResult;
    use std::time::Duration as StdDuration;

    #[actix_web::test]
    async fn test_chart_points_window() {
        let (data, database, _dir) = test_database().await;
        let site = database
            .add_site(&NewSite { url: "https://a.example".into(), check_interval: 60, expected_text: None })
            .await
            .unwrap();

        let mut stale = ProbeResult::success(site.id, site.url.clone(), StdDuration::from_millis(100));
        stale.timestamp = Utc::now() - Duration::days(10);
        database.save_result(&stale).await.unwrap();

        let up = ProbeResult::success(site.id, site.url.clone(), StdDuration::from_micros(123_456));
        database.save_result(&up).await.unwrap();
        let down = ProbeResult::failure(
            site.id,
            site.url.clone(),
            Error::NetworkFault("connection refused".into()),
        );
        database.save_result(&down).await.unwrap();

        let app = test::init_service(App::new().app_data(data).configure(routes)).await;

        let req = test::TestRequest::get().uri(&format!("/api/logs/{}", site.id)).to_request();
        let points: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(points.len(), 2);
        assert_eq!(points[0]["y"], 0.123);
        assert_eq!(points[1]["y"], Value::Null);
        assert_eq!(points[0]["x"].as_str().unwrap().len(), 19);

        let req = test::TestRequest::get().uri(&format!("/api/logs/{}?days=30", site.id)).to_request();
        let points: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(points.len(), 3);
    }

    #[actix_web::test]
    async fn test_unknown_site_and_bad_window() {
        let (data, _database, _dir) = test_database().await;
        let app = test::init_service(App::new().app_data(data).configure(routes)).await;

        let req = test::TestRequest::get().uri("/api/logs/99").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/logs/99?days=0").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
