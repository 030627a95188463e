//! Integration tests for the provider adapters using wiremock.
//!
//! These tests verify request shapes, normalization, caching and the
//! One Call fallback against a mock HTTP server.

use tempfile::TempDir;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wxdash::cache::ExpiringCache;
use wxdash::data::{
    IpLocator, OpenWeatherProvider, ProviderError, Source, TimeZoneRef, UnitSystem,
    WeatherApiProvider, WeatherProvider,
};

/// Minimal WeatherAPI forecast body with `days` forecast days
fn weatherapi_body(days: usize) -> serde_json::Value {
    let forecastday: Vec<serde_json::Value> = (0..days)
        .map(|i| {
            serde_json::json!({
                "date": format!("2024-07-{:02}", 15 + i),
                "day": {
                    "maxtemp_c": 27.0, "maxtemp_f": 80.6,
                    "mintemp_c": 20.0, "mintemp_f": 68.0,
                    "avgtemp_c": 23.0, "avgtemp_f": 73.4,
                    "maxwind_kph": 18.0, "maxwind_mph": 11.2,
                    "avghumidity": 80,
                    "condition": {"text": "Patchy rain nearby", "icon": "//cdn.weatherapi.com/weather/64x64/day/176.png"}
                },
                "astro": {"sunrise": "05:59 AM", "sunset": "06:49 PM", "moonrise": "02:03 PM", "moonset": "01:12 AM"},
                "hour": []
            })
        })
        .collect();

    serde_json::json!({
        "location": {"name": "Bengaluru", "country": "India", "tz_id": "Asia/Kolkata"},
        "current": {
            "last_updated_epoch": 1721044800,
            "temp_c": 23.6, "temp_f": 74.5,
            "feelslike_c": 25.1, "feelslike_f": 77.2,
            "humidity": 78, "pressure_mb": 1012.0,
            "vis_km": 6.0, "vis_miles": 3.0,
            "wind_kph": 15.1, "wind_mph": 9.4,
            "uv": 5.0,
            "condition": {"text": "Partly cloudy", "icon": "//cdn.weatherapi.com/weather/64x64/day/116.png"}
        },
        "forecast": {"forecastday": forecastday}
    })
}

/// 5 day / 3 hour body with two samples per day for `days` days
fn five_day_body(days: usize) -> serde_json::Value {
    let mut list = Vec::new();
    for d in 0..days {
        for (hour, temp, icon) in [(9, 18.0, "04d"), (15, 24.0, "10d")] {
            list.push(serde_json::json!({
                "dt": 1721001600 + (d as i64) * 86400 + hour * 3600,
                "main": {"temp": temp, "feels_like": temp, "pressure": 1010, "humidity": 70},
                "weather": [{"description": "some weather", "icon": icon}],
                "wind": {"speed": 3.0},
                "visibility": 10000,
                "dt_txt": format!("2024-07-{:02} {:02}:00:00", 15 + d, hour)
            }));
        }
    }
    serde_json::json!({
        "list": list,
        "city": {"name": "Bengaluru", "country": "IN", "timezone": 19800}
    })
}

fn create_test_cache() -> (ExpiringCache, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let cache = ExpiringCache::with_dir(temp_dir.path().to_path_buf());
    (cache, temp_dir)
}

#[tokio::test]
async fn test_weatherapi_fetch_weather() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .and(query_param("key", "secret"))
        .and(query_param("q", "12.97,77.59"))
        .and(query_param("days", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weatherapi_body(7)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = WeatherApiProvider::new("secret")
        .with_base_urls(mock_server.uri(), mock_server.uri());

    let weather = provider
        .fetch_weather(12.97, 77.59, UnitSystem::Metric)
        .await
        .unwrap();

    assert_eq!(weather.source, Source::WeatherApi);
    assert_eq!(weather.daily.len(), 7);
    assert_eq!(
        weather.location.zone,
        TimeZoneRef::TzId("Asia/Kolkata".to_string())
    );
    assert!(weather.current.weather[0].icon.starts_with("https://cdn.weatherapi.com/"));
    assert!(weather.daily.windows(2).all(|w| w[0].dt < w[1].dt));
}

#[tokio::test]
async fn test_weatherapi_weather_is_cached() {
    let mock_server = MockServer::start().await;
    let (cache, _dir) = create_test_cache();

    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weatherapi_body(3)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = WeatherApiProvider::new("secret")
        .with_base_urls(mock_server.uri(), mock_server.uri())
        .with_cache(cache);

    let first = provider.fetch_weather(1.0, 2.0, UnitSystem::Metric).await.unwrap();
    let second = provider.fetch_weather(1.001, 2.001, UnitSystem::Metric).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_weatherapi_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let provider = WeatherApiProvider::new("bad")
        .with_base_urls(mock_server.uri(), mock_server.uri());

    let result = provider.fetch_weather(1.0, 2.0, UnitSystem::Metric).await;

    assert!(matches!(result, Err(ProviderError::Status { .. })));
}

#[tokio::test]
async fn test_nominatim_geocode_sends_user_agent() {
    let mock_server = MockServer::start().await;
    let (cache, _dir) = create_test_cache();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "London"))
        .and(query_param("limit", "8"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"display_name": "London, Greater London, England, United Kingdom",
             "lat": "51.5073219", "lon": "-0.1276474",
             "address": {"city": "London", "state": "England", "country_code": "gb"}}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = WeatherApiProvider::new("secret")
        .with_base_urls(mock_server.uri(), mock_server.uri())
        .with_cache(cache);

    let places = provider.geocode("London", 8).await.unwrap();
    // served from the geocode cache; the query is normalized
    let again = provider.geocode("  london ", 8).await.unwrap();

    assert_eq!(places.len(), 1);
    assert_eq!(places[0].display_name(), "London, England, GB");
    assert_eq!(places, again);
}

#[tokio::test]
async fn test_nominatim_reverse_geocode() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "address": {"village": "Hampi", "state": "Karnataka", "country_code": "in"}
        })))
        .mount(&mock_server)
        .await;

    let provider = WeatherApiProvider::new("secret")
        .with_base_urls(mock_server.uri(), mock_server.uri());

    let place = provider.reverse_geocode(15.33, 76.46).await.unwrap();

    assert_eq!(place.name, "Hampi");
    assert_eq!(place.country, "IN");
}

#[tokio::test]
async fn test_openweather_uses_onecall_when_available() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .and(query_param("exclude", "minutely,hourly,alerts"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "timezone_offset": -25200,
            "current": {"dt": 1721044800, "temp": 68.0, "feels_like": 67.0, "pressure": 1015,
                        "humidity": 55, "uvi": 6.3, "visibility": 10000, "wind_speed": 5.0,
                        "weather": [{"description": "clear sky", "icon": "01d"}]},
            "daily": [
                {"dt": 1721070000, "temp": {"day": 70.0, "min": 58.0, "max": 75.0},
                 "pressure": 1015, "humidity": 50, "wind_speed": 6.0,
                 "weather": [{"description": "clear sky", "icon": "01d"}]}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(five_day_body(5)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let provider = OpenWeatherProvider::new("key").with_base_url(mock_server.uri());

    let weather = provider
        .fetch_weather(49.28, -123.12, UnitSystem::Imperial)
        .await
        .unwrap();

    assert_eq!(weather.source, Source::OneCall);
    assert_eq!(weather.location.zone, TimeZoneRef::Offset(-25200));
    assert!((weather.current.temp.f - 68.0).abs() < 1e-9);
    assert!((weather.current.temp.c - 20.0).abs() < 1e-9);
    assert_eq!(
        weather.current.weather[0].icon,
        "https://openweathermap.org/img/wn/01d@2x.png"
    );
}

#[tokio::test]
async fn test_openweather_falls_back_to_five_day() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key."
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(five_day_body(5)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OpenWeatherProvider::new("key").with_base_url(mock_server.uri());

    let weather = provider
        .fetch_weather(12.97, 77.59, UnitSystem::Metric)
        .await
        .unwrap();

    assert_eq!(weather.source, Source::FiveDay);
    assert_eq!(weather.daily.len(), 5, "five days in, five days out, no padding");
    assert_eq!(weather.current.uvi, 0.0);
    assert!(weather.astro.is_none());
    let first = &weather.daily[0];
    assert!((first.temp.min.c - 18.0).abs() < 1e-9);
    assert!((first.temp.max.c - 24.0).abs() < 1e-9);
    assert!((first.temp.day.c - 21.0).abs() < 1e-9);
    // 04d and 10d tie; the first seen wins
    assert!(first.weather[0].icon.contains("04d"));
}

#[tokio::test]
async fn test_openweather_fallback_failure_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let provider = OpenWeatherProvider::new("key").with_base_url(mock_server.uri());

    let result = provider.fetch_weather(12.97, 77.59, UnitSystem::Metric).await;

    match result {
        Err(ProviderError::Status { endpoint, status }) => {
            assert_eq!(endpoint, "5 day forecast");
            assert_eq!(status.as_u16(), 500);
        }
        other => panic!("Expected fallback status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_openweather_malformed_onecall_does_not_fall_back() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(five_day_body(1)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let provider = OpenWeatherProvider::new("key").with_base_url(mock_server.uri());

    let result = provider.fetch_weather(1.0, 2.0, UnitSystem::Metric).await;

    assert!(matches!(result, Err(ProviderError::ParseError(_))));
}

#[tokio::test]
async fn test_openweather_empty_daily_is_rejected_and_not_cached() {
    let mock_server = MockServer::start().await;
    let (cache, _dir) = create_test_cache();

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "timezone_offset": 0,
            "current": {"dt": 1, "temp": 10.0, "feels_like": 9.0},
            "daily": []
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let provider = OpenWeatherProvider::new("key")
        .with_base_url(mock_server.uri())
        .with_cache(cache);

    for _ in 0..2 {
        let result = provider.fetch_weather(1.0, 2.0, UnitSystem::Metric).await;
        assert!(matches!(result, Err(ProviderError::MissingField(_))));
    }
}

#[tokio::test]
async fn test_openweather_geocode_and_reverse() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Springfield"))
        .and(query_param("limit", "8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "Springfield", "state": "Illinois", "country": "US", "lat": 39.8, "lon": -89.64},
            {"name": "Springfield", "state": "Missouri", "country": "US", "lat": 37.2, "lon": -93.29}
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/reverse"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let provider = OpenWeatherProvider::new("key").with_base_url(mock_server.uri());

    let places = provider.geocode("Springfield", 8).await.unwrap();
    assert_eq!(places.len(), 2);
    assert_eq!(places[0].display_name(), "Springfield, Illinois, US");
    assert_eq!(places[1].state, "Missouri");

    let unknown = provider.reverse_geocode(0.0, -140.0).await.unwrap();
    assert_eq!(unknown.name, "Unknown");
    assert_eq!(unknown.lon, -140.0);
}

#[tokio::test]
async fn test_invalid_coordinates_are_rejected_without_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let provider = OpenWeatherProvider::new("key").with_base_url(mock_server.uri());

    let result = provider.fetch_weather(120.0, 0.0, UnitSystem::Metric).await;

    assert!(matches!(
        result,
        Err(ProviderError::InvalidCoordinates { .. })
    ));
}

#[tokio::test]
async fn test_ip_locator() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "city": "Vancouver",
            "region": "British Columbia",
            "country_code": "CA",
            "latitude": 49.2827,
            "longitude": -123.1207
        })))
        .mount(&mock_server)
        .await;

    let locator = IpLocator::new().with_url(format!("{}/json/", mock_server.uri()));

    let place = locator.locate().await.unwrap();

    assert_eq!(place.display_name(), "Vancouver, British Columbia, CA");
}

#[tokio::test]
async fn test_ip_locator_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let locator = IpLocator::new().with_url(format!("{}/json/", mock_server.uri()));

    assert!(locator.locate().await.is_err());
}
