use loadcycle::cycle::Cycle;
use loadcycle::errors::LoadError;
use loadcycle::metrics::MetricsRegistry;
use loadcycle::scenario::{self, Scenario};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run_scenario_json(json: &str) -> Result<(), LoadError> {
    let scenario: Scenario = serde_json::from_str(json).unwrap();
    scenario.preload().unwrap();
    let variables = scenario::variables_for_replace(&scenario.variables);
    let client = loadcycle::client::build_client().unwrap();
    let metrics = Arc::new(MetricsRegistry::new());
    let mut cycle = Cycle::new(scenario.cycle);
    cycle
        .execute(&client, &variables, 1, 1, &metrics, None, None)
        .await
}

#[tokio::test]
async fn s1_echo_chain_passes_path_between_steps() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/echo/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"n": 42})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sink"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let uri = server.uri();
    let json = format!(
        r#"{{
            "loops": 1,
            "parallel": 1,
            "log": "",
            "variables": [],
            "cycle": [
                {{ "url": "{uri}/echo/42" }},
                {{ "url": "{uri}/sink?x={{%PATH[0]:n:ENDPATH%}}" }}
            ]
        }}"#
    );

    let result = run_scenario_json(&json).await;
    assert!(result.is_ok(), "{result:?}");

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().any(|r| r.url.path() == "/sink" && r.url.query() == Some("x=42")));
}

#[tokio::test]
async fn s2_conditional_skip_fails_with_false_condition() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let uri = server.uri();
    let json = format!(
        r#"{{
            "loops": 1,
            "parallel": 1,
            "variables": [],
            "cycle": [
                {{ "url": "{uri}/status" }},
                {{ "url": "{uri}/status", "if": "== {{%RESP[0]:STATUS_CODE:ENDRESP%}} 500" }}
            ]
        }}"#
    );

    let err = run_scenario_json(&json).await.unwrap_err();
    assert!(err.to_string().contains("(200 == 500) -> false"));
}

#[tokio::test]
async fn s3_missing_env_var_fails_before_any_request() {
    std::env::remove_var("LOADCYCLE_S3_UNSET");
    let json = r#"{
        "loops": 1,
        "parallel": 1,
        "variables": [],
        "cycle": [
            { "url": "https://example.invalid/{%ENV:LOADCYCLE_S3_UNSET:ENDENV%}" }
        ]
    }"#;

    let err = run_scenario_json(json).await.unwrap_err();
    assert!(err.to_string().contains("environment variable (LOADCYCLE_S3_UNSET) not found"));
}

#[tokio::test]
async fn s6_condition_with_spaces_on_right_passes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let uri = server.uri();
    let json = format!(
        r#"{{
            "loops": 1,
            "parallel": 1,
            "variables": [],
            "cycle": [
                {{ "url": "{uri}/a" }},
                {{ "url": "{uri}/b", "if": "== hello hello" }}
            ]
        }}"#
    );

    let result = run_scenario_json(&json).await;
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test]
async fn empty_cycle_fails_with_no_cycle_provided() {
    let json = r#"{ "loops": 1, "parallel": 1, "variables": [], "cycle": [] }"#;
    let err = run_scenario_json(json).await.unwrap_err();
    assert!(err.to_string().contains("no cycle provided"));
}

#[tokio::test]
async fn metrics_record_only_successful_steps() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let uri = server.uri();
    let json = format!(
        r#"{{
            "loops": 1,
            "parallel": 1,
            "variables": [],
            "cycle": [ {{ "url": "{uri}/ok" }} ]
        }}"#
    );

    let scenario: Scenario = serde_json::from_str(&json).unwrap();
    let variables = scenario::variables_for_replace(&scenario.variables);
    let client = loadcycle::client::build_client().unwrap();
    let metrics = Arc::new(MetricsRegistry::new());
    let mut cycle = Cycle::new(scenario.cycle);
    cycle
        .execute(&client, &variables, 1, 1, &metrics, None, None)
        .await
        .unwrap();

    let per_step = metrics.averages_of_steps();
    assert_eq!(per_step.len(), 1);
    assert_eq!(per_step[0].index, 0);
}
