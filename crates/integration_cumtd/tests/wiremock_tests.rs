//! Integration tests for the MTD client (wiremock-based)

use std::sync::Arc;
use std::time::Duration;

use integration_cumtd::{CumtdClient, CumtdConfig, CumtdError, MtdClient};
use secrecy::SecretString;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for_mock(server: &MockServer) -> MtdClient {
    let config = CumtdConfig {
        base_url: server.uri(),
        timeout_secs: 2,
    };
    MtdClient::new(&config, SecretString::from("test-key"))
}

fn sample_departures_json() -> serde_json::Value {
    serde_json::json!({
        "time": "2024-01-15T10:00:00-06:00",
        "status": { "code": 200, "msg": "ok" },
        "departures": [
            {
                "stop_id": "IU:2",
                "headsign": "22N Illini",
                "route": { "route_id": "ILLINI", "route_short_name": "22" },
                "trip": { "trip_id": "T1", "direction": "North" },
                "expected": "2024-01-15T10:03:00-06:00",
                "expected_mins": 3,
                "scheduled": "2024-01-15T10:02:00-06:00",
                "is_monitored": true
            },
            {
                "stop_id": "IU:1",
                "headsign": "5E Green",
                "route": { "route_id": "GREEN", "route_short_name": "5" },
                "trip": { "trip_id": "T2", "direction": "East" },
                "expected": "2024-01-15T10:07:00-06:00",
                "expected_mins": 7,
                "scheduled": "2024-01-15T10:07:00-06:00",
                "is_monitored": false
            }
        ]
    })
}

fn sample_stops_json() -> serde_json::Value {
    serde_json::json!({
        "time": "2024-01-15T10:00:00-06:00",
        "status": { "code": 200, "msg": "ok" },
        "stops": [
            { "stop_id": "SPFLDPINE", "stop_name": "Springfield & Pine" },
            { "stop_id": "IT", "stop_name": "Illinois Terminal" },
            { "stop_id": "SPFLDMAIN", "stop_name": "springfield & Main" }
        ]
    })
}

#[tokio::test]
async fn test_get_departures_by_stop_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getdeparturesbystop"))
        .and(query_param("stop_id", "IU"))
        .and(query_param("count", "5"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_departures_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    let response = client
        .get_departures_by_stop("IU", None, Some(5))
        .await
        .unwrap();

    assert_eq!(response.departures.len(), 2);
    let first = &response.departures[0];
    assert_eq!(first.headsign, "22N Illini");
    assert_eq!(first.expected_mins, 3);
    assert_eq!(first.trip_id(), Some("T1"));
    assert!(!response.departures[1].is_monitored);
}

#[tokio::test]
async fn test_get_departures_omits_absent_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getdeparturesbystop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_departures_json()))
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    client
        .get_departures_by_stop("IU", None, None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let keys: Vec<String> = requests[0]
        .url
        .query_pairs()
        .map(|(k, _)| k.into_owned())
        .collect();
    assert!(keys.contains(&"stop_id".to_string()));
    assert!(keys.contains(&"key".to_string()));
    assert!(!keys.contains(&"route_id".to_string()));
    assert!(!keys.contains(&"count".to_string()));
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_get_departures_passes_route_filter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getdeparturesbystop"))
        .and(query_param("route_id", "GREEN"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_departures_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    let response = client
        .get_departures_by_stop("IU", Some("GREEN"), Some(5))
        .await
        .unwrap();

    // The server-side filter is not re-applied locally.
    assert_eq!(response.departures.len(), 2);
}

#[tokio::test]
async fn test_get_departures_missing_key_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getdeparturesbystop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "time": "2024-01-15T10:00:00-06:00",
            "status": { "code": 200, "msg": "ok" }
        })))
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    let response = client
        .get_departures_by_stop("IU", None, Some(5))
        .await
        .unwrap();
    assert!(response.departures.is_empty());
}

#[tokio::test]
async fn test_get_departures_in_band_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getdeparturesbystop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "time": "2024-01-15T10:00:00-06:00",
            "status": { "code": 500, "msg": "Internal server error" }
        })))
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    let err = client
        .get_departures_by_stop("IU", None, Some(5))
        .await
        .unwrap_err();

    assert!(matches!(err, CumtdError::Api { code: 500, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unauthorized_is_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getdeparturesbystop"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    let err = client
        .get_departures_by_stop("IU", None, Some(5))
        .await
        .unwrap_err();
    assert!(err.is_authentication());
}

#[tokio::test]
async fn test_malformed_departure_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getdeparturesbystop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "time": "2024-01-15T10:00:00-06:00",
            "departures": [{ "headsign": "missing everything else" }]
        })))
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    let err = client
        .get_departures_by_stop("IU", None, Some(5))
        .await
        .unwrap_err();
    assert!(matches!(err, CumtdError::ParseError(_)));
}

#[tokio::test]
async fn test_http_error_with_json_body_is_request_failed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getdeparturesbystop"))
        .respond_with(ResponseTemplate::new(502).set_body_json(serde_json::json!({
            "error": "Bad Gateway"
        })))
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    let err = client
        .get_departures_by_stop("IU", None, Some(5))
        .await
        .unwrap_err();
    assert!(matches!(&err, CumtdError::RequestFailed(msg) if msg.contains("502")));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_validate_credential_http_error_is_not_valid() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getstops"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "message": "Not Found"
        })))
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    let err = client.validate_credential().await.unwrap_err();
    assert!(matches!(err, CumtdError::RequestFailed(_)));
}

#[tokio::test]
async fn test_timeout_is_classified() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getdeparturesbystop"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(sample_departures_json())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = CumtdConfig {
        base_url: server.uri(),
        timeout_secs: 1,
    };
    let client = MtdClient::new(&config, SecretString::from("test-key"));
    let err = client
        .get_departures_by_stop("IU", None, Some(5))
        .await
        .unwrap_err();
    assert!(matches!(err, CumtdError::Timeout { timeout_secs: 1 }));
}

#[tokio::test]
async fn test_connection_refused_is_connection_failed() {
    let config = CumtdConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 2,
    };
    let client = MtdClient::new(&config, SecretString::from("test-key"));
    let err = client.get_routes_by_stop("IT").await.unwrap_err();
    assert!(matches!(
        err,
        CumtdError::ConnectionFailed(_) | CumtdError::Timeout { .. }
    ));
}

#[tokio::test]
async fn test_validate_credential_valid() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getstops"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_stops_json()))
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    assert!(client.validate_credential().await.unwrap());
}

#[tokio::test]
async fn test_validate_credential_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getstops"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    let err = client.validate_credential().await.unwrap_err();
    assert!(matches!(err, CumtdError::Authentication(_)));
}

#[tokio::test]
async fn test_validate_credential_tolerates_other_api_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getstops"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "time": "2024-01-15T10:00:00-06:00",
            "status": { "code": 503, "msg": "Service temporarily unavailable" }
        })))
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    assert!(client.validate_credential().await.unwrap());
}

#[tokio::test]
async fn test_get_stops_by_search_case_insensitive() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getstops"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_stops_json()))
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    let response = client.get_stops_by_search("SPRINGFIELD").await.unwrap();

    assert_eq!(response.stops.len(), 2);
    assert!(
        response
            .stops
            .iter()
            .all(|s| s.stop_name.to_lowercase().contains("springfield"))
    );
}

#[tokio::test]
async fn test_get_stops_by_search_no_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getstops"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_stops_json()))
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    let response = client
        .get_stops_by_search("ThisStopDoesNotExist12345")
        .await
        .unwrap();
    assert!(response.stops.is_empty());
}

#[tokio::test]
async fn test_get_routes_by_stop() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getroutesbystop"))
        .and(query_param("stop_id", "IT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "time": "2024-01-15T10:00:00-06:00",
            "status": { "code": 200, "msg": "ok" },
            "routes": [
                { "route_id": "GREEN", "route_short_name": "5", "route_color": "008063" },
                { "route_id": "ILLINI" }
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for_mock(&server);
    let response = client.get_routes_by_stop("IT").await.unwrap();
    assert_eq!(response.routes.len(), 2);
    assert_eq!(response.routes[0].display_name(), "5");
    assert_eq!(response.routes[1].display_name(), "ILLINI");
}

#[tokio::test]
async fn test_concurrent_first_use_opens_one_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getdeparturesbystop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_departures_json()))
        .mount(&server)
        .await;

    let client = Arc::new(client_for_mock(&server));
    assert!(!client.is_open().await);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            client.get_departures_by_stop("IU", None, Some(5)).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert!(client.is_open().await);
    assert_eq!(client.sessions_opened(), 1);

    client.close().await;
    client.close().await;
    assert!(!client.is_open().await);
    assert!(matches!(
        client.get_departures_by_stop("IU", None, Some(5)).await,
        Err(CumtdError::SessionClosed)
    ));
}
