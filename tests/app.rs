//! End-to-end sessions against mocked HTTP services.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use transparency::{
    app::App,
    capabilities::ScriptedCapabilities,
    config::Config,
    core::{Capability, GeoCoordinates},
    formatting::{JsonFormatter, ViewFormatter},
    lookup::{LookupError, TemperatureConversion},
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PARIS: GeoCoordinates = GeoCoordinates {
    latitude: 48.8566,
    longitude: 2.3522,
};

const ONE_CALL: &str = r#"{
    "timezone": "Europe/Paris",
    "current": {
        "temp": 300.15,
        "feels_like": 298.15,
        "weather": [{"id": 802, "main": "Clouds", "description": "scattered clouds", "icon": "03d"}]
    }
}"#;

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.endpoints.ip_echo_url = format!("{}/ip", server.uri());
    config.endpoints.reverse_geocode_url = format!("{}/reverse", server.uri());
    config.endpoints.weather_url = format!("{}/onecall", server.uri());
    config.endpoints.timeout_ms = 2_000;
    config.weather.api_key = Some("test-key".to_string());
    config
}

async fn mount_ip_and_address(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/ip"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ip":"198.51.100.23"}"#))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("format", "jsonv2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"display_name":"Paris, Île-de-France, France"}"#),
        )
        .mount(server)
        .await;
}

async fn start(config: Config) -> (App, watch::Sender<bool>) {
    let device = ScriptedCapabilities::browser().with_position(Capability::Available(PARIS));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut app = App::builder(config)
        .device_override(Arc::new(device))
        .build(shutdown_rx)
        .await
        .unwrap();
    app.wait_for_initial_probes().await;
    (app, shutdown_tx)
}

async fn stop(app: App, shutdown_tx: watch::Sender<bool>) {
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), app.run())
        .await
        .expect("App failed to shut down within the timeout")
        .unwrap();
}

#[tokio::test]
async fn test_full_session_against_mock_services() {
    let server = MockServer::start().await;
    mount_ip_and_address(&server).await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .and(query_param("appid", "test-key"))
        .and(query_param("lat", "48.8566"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ONE_CALL))
        .expect(1)
        .mount(&server)
        .await;

    let (app, shutdown_tx) = start(config_for(&server)).await;
    let report = app.locate().await.unwrap();
    assert!(report.address.is_ok());
    assert!(report.weather.is_ok());

    let view = app.snapshot().await.unwrap();
    assert_eq!(view.device.public_ip, Some("198.51.100.23".parse().unwrap()));
    assert_eq!(view.address.as_deref(), Some("Paris, Île-de-France, France"));
    let weather = view.weather.clone().unwrap();
    assert_eq!(weather.timezone_name, "Europe/Paris");
    assert_eq!(weather.temperature_f, 80);
    assert_eq!(weather.feels_like_f, 77);
    assert_eq!(weather.main_category, "Clouds");
    assert_eq!(weather.coordinates_label, "48.8566, 2.3522");

    let json: serde_json::Value = serde_json::from_str(&JsonFormatter.format(&view)).unwrap();
    assert_eq!(json["weather"]["icon_code"], "03d");
    assert_eq!(
        json["weather"]["icon_url"],
        "https://openweathermap.org/img/w/03d.png"
    );
    assert_eq!(json["battery"]["value"]["level_percent"], 76);

    stop(app, shutdown_tx).await;
}

#[tokio::test]
async fn test_malformed_weather_leaves_weather_unset() {
    let server = MockServer::start().await;
    mount_ip_and_address(&server).await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"cod": 200, "current": "#))
        .mount(&server)
        .await;

    let (app, shutdown_tx) = start(config_for(&server)).await;
    let report = app.locate().await.unwrap();
    assert!(matches!(report.weather, Err(LookupError::Parse { .. })));

    let view = app.snapshot().await.unwrap();
    assert_eq!(view.weather, None);
    assert_eq!(view.location, Some(PARIS));
    assert!(view.address.is_some());
    assert!(view.device.public_ip.is_some());
    assert!(view.device.user_agent.is_some());

    stop(app, shutdown_tx).await;
}

#[tokio::test]
async fn test_missing_api_key_disables_weather_requests() {
    let server = MockServer::start().await;
    mount_ip_and_address(&server).await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ONE_CALL))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.weather.api_key = None;
    let (app, shutdown_tx) = start(config).await;

    let report = app.locate().await.unwrap();
    assert!(matches!(report.weather, Err(LookupError::NotConfigured)));
    assert!(report.address.is_ok());
    assert_eq!(app.snapshot().await.unwrap().weather, None);

    stop(app, shutdown_tx).await;
}

#[tokio::test]
async fn test_legacy_conversion_reproduces_older_figures() {
    let server = MockServer::start().await;
    mount_ip_and_address(&server).await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ONE_CALL))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.weather.conversion = TemperatureConversion::Legacy;
    let (app, shutdown_tx) = start(config).await;

    let weather = app.locate().await.unwrap().weather.unwrap();
    // (300.15 - 273) * 9/5 + 32 = 80.87, (298.15 - 273) * 9/5 + 32 = 77.27
    assert_eq!(weather.temperature_f, 80);
    assert_eq!(weather.feels_like_f, 77);

    stop(app, shutdown_tx).await;
}

#[tokio::test]
async fn test_ip_echo_outage_does_not_block_other_signals() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ip"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let (app, shutdown_tx) = start(config_for(&server)).await;
    let view = app.snapshot().await.unwrap();
    assert_eq!(view.device.public_ip, None);
    assert!(view.device.platform.is_some());
    assert!(view.battery.present().is_some());

    stop(app, shutdown_tx).await;
}
