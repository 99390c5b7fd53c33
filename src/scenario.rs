//! Scenario document and per-step data model.
//!
//! Deserialised straight off the JSON the CLI is pointed at. A `Scenario`
//! is loaded twice: once by the orchestrator to read `loops`/`parallel`/
//! `variables`, and once per worker (from the same original bytes) so each
//! worker owns an independent, mutable `cycle` of steps.

use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;

use crate::condition::{self, Condition};
use crate::errors::LoadError;
use crate::template::{self, ResponseCycle, StaticVariable, StepResponses};
use crate::types::{ConfigStr, KeyValue};

/// A static `{key, value}` pair declared in the scenario's `variables` list.
#[derive(Debug, Clone, Deserialize)]
pub struct Variable {
    key: ConfigStr,
    value: ConfigStr,
}

impl Variable {
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    pub fn value(&self) -> &str {
        self.value.as_str()
    }
}

impl KeyValue for Variable {
    fn key(&self) -> &str {
        self.key.as_str()
    }
    fn value(&self) -> &str {
        self.value.as_str()
    }
}

fn validate_variables(variables: &[Variable]) -> Result<(), LoadError> {
    for (i, v) in variables.iter().enumerate() {
        if v.key.trimmed().is_empty() {
            return Err(LoadError::configuration(format!(
                "variables[{i}].key does not have a valid value"
            )));
        }
    }
    Ok(())
}

/// Build the `{%VAR:key:ENDVAR%}` substitution tokens from the scenario's
/// declared variables, ready to hand to the template resolver.
pub fn variables_for_replace(variables: &[Variable]) -> Vec<StaticVariable> {
    variables
        .iter()
        .map(|v| StaticVariable {
            key: v.key().to_string(),
            value: v.value().to_string(),
        })
        .collect()
}

/// A single header entry; both the key and value are plain strings run
/// through the template resolver at execution time.
#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    key: ConfigStr,
    value: ConfigStr,
}

impl Header {
    pub fn key(&self) -> &str {
        self.key.as_str()
    }
    pub fn value(&self) -> &str {
        self.value.as_str()
    }
}

/// The root scenario document: run shape plus the static variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub loops: i64,
    #[serde(default)]
    pub parallel: i64,
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub cycle: Vec<Step>,
}

impl Scenario {
    /// Validate the top-level fields. Does not touch individual steps —
    /// those are validated lazily by `Step::preload` as the cycle runs.
    pub fn preload(&self) -> Result<(), LoadError> {
        if self.loops < 0 {
            return Err(LoadError::configuration("\"loops\" must not be negative"));
        }
        if self.parallel < 0 {
            return Err(LoadError::configuration(
                "\"parallel\" must not be negative",
            ));
        }
        validate_variables(&self.variables)?;
        Ok(())
    }

    /// `loops` clamped to a minimum of one; zero means "run once".
    pub fn total_loops(&self) -> i64 {
        if self.loops <= 0 {
            1
        } else {
            self.loops
        }
    }

    /// `parallel` clamped to a minimum of one.
    pub fn workers_per_loop(&self) -> i64 {
        if self.parallel <= 0 {
            1
        } else {
            self.parallel
        }
    }

    pub fn log_enabled(&self) -> bool {
        !self.log.trim().is_empty()
    }
}

/// One HTTP request within a cycle, plus its recorded response once it has
/// run.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(rename = "if", default)]
    condition_raw: Option<String>,
    #[serde(default)]
    url: ConfigStr,
    #[serde(default)]
    content_type: ConfigStr,
    #[serde(default)]
    method: ConfigStr,
    #[serde(default)]
    header: Vec<Header>,
    #[serde(default)]
    timeout: Option<u64>,
    #[serde(default)]
    body_json: Option<Value>,
    #[serde(default)]
    body: ConfigStr,
    #[serde(default)]
    body_load_file: Option<String>,

    #[serde(skip)]
    index: usize,
    #[serde(skip)]
    condition: Option<Condition>,
    #[serde(skip)]
    preloaded_body: String,
    #[serde(skip)]
    pub response: Option<ResponseCycle>,
    #[serde(skip)]
    pub response_content_type: Option<String>,
}

impl Step {
    pub fn method(&self) -> String {
        let m = self.method.trimmed_upper();
        if m.is_empty() {
            "GET".to_string()
        } else {
            m
        }
    }

    fn content_type(&self) -> String {
        self.content_type.to_uppercase()
    }

    fn preload_body(&mut self) -> Result<(), LoadError> {
        let body = self.body.trimmed();
        if !body.is_empty() {
            self.preloaded_body = body;
        } else if let Some(json) = &self.body_json {
            self.preloaded_body = serde_json::to_string(json)?;
        } else if let Some(path) = &self.body_load_file {
            self.preloaded_body = std::fs::read_to_string(path)
                .map_err(|e| LoadError::configuration(format!("{path}: {e}")))?;
        }
        Ok(())
    }

    /// Assign this step's position, parse its condition, validate the URL,
    /// default the method/content-type, and resolve the body source.
    pub fn preload(&mut self, index: usize) -> Result<(), LoadError> {
        self.index = index;

        if let Some(raw) = &self.condition_raw {
            self.condition = Some(condition::parse(raw, index)?);
        }

        if self.url.trimmed().is_empty() {
            return Err(LoadError::configuration(format!(
                "cycle[{index}].url cannot be empty"
            )));
        }

        if self.method() != "GET" && self.body_json.is_none() && self.content_type().is_empty() {
            return Err(LoadError::configuration(
                "for your request type it is necessary to inform the content_type",
            ));
        } else if self.content_type().is_empty() && self.body_json.is_some() {
            self.content_type = ConfigStr::new("application/json");
        }

        self.preload_body()?;

        Ok(())
    }

    /// Resolve `data` through all four template dialects, using `cycle` for
    /// PATH/RESP cross-step lookups.
    fn apply_variables(
        &self,
        variables: &[StaticVariable],
        steps: &dyn StepResponses,
        data: &str,
    ) -> Result<String, LoadError> {
        template::resolve(data, variables, self.index, steps)
    }

    fn resolved_url(
        &self,
        variables: &[StaticVariable],
        steps: &dyn StepResponses,
    ) -> Result<String, LoadError> {
        self.apply_variables(variables, steps, &self.url.trimmed())
    }

    fn resolved_body(
        &self,
        variables: &[StaticVariable],
        steps: &dyn StepResponses,
    ) -> Result<String, LoadError> {
        self.apply_variables(variables, steps, &self.preloaded_body)
    }

    fn resolved_headers(
        &self,
        variables: &[StaticVariable],
        steps: &dyn StepResponses,
    ) -> Result<Vec<(String, String)>, LoadError> {
        self.header
            .iter()
            .map(|h| {
                let key = self.apply_variables(variables, steps, h.key())?;
                let value = self.apply_variables(variables, steps, h.value())?;
                Ok((key, value))
            })
            .collect()
    }

    /// Evaluate this step's guard (if any), then perform the HTTP exchange
    /// and record its response.
    pub async fn execute(
        &mut self,
        client: &reqwest::Client,
        variables: &[StaticVariable],
        steps: &dyn StepResponses,
    ) -> Result<(), LoadError> {
        if let Some(cond) = &self.condition {
            condition::evaluate(cond, variables, self.index, steps).map_err(|e| {
                LoadError::ConditionNotSatisfied(format!(
                    "condition ({}) is not satisfied: {}",
                    self.condition_raw.clone().unwrap_or_default(),
                    e
                ))
            })?;
        }

        let url = self.resolved_url(variables, steps)?;
        let body = self.resolved_body(variables, steps)?;
        let headers = self.resolved_headers(variables, steps)?;

        let method: reqwest::Method = self
            .method()
            .parse()
            .map_err(|_| LoadError::configuration(format!("invalid HTTP method: {}", self.method())))?;

        let mut builder = client.request(method, url.as_str()).body(body);

        if !self.content_type().is_empty() {
            builder = builder.header("Content-Type", self.content_type());
        }
        for (k, v) in headers {
            builder = builder.header(k, v);
        }
        if let Some(secs) = self.timeout {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }

        let started = Instant::now();
        let resp = builder.send().await?;
        let status_code = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body_bytes = resp.bytes().await?.to_vec();
        let duration = started.elapsed();

        self.response = Some(ResponseCycle {
            status_code,
            body: body_bytes,
            duration,
        });
        self.response_content_type = Some(content_type);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_loops() {
        let s = Scenario {
            loops: -1,
            parallel: 1,
            log: String::new(),
            variables: vec![],
            cycle: vec![],
        };
        assert!(s.preload().is_err());
    }

    #[test]
    fn zero_loops_clamps_to_one() {
        let s = Scenario {
            loops: 0,
            parallel: 0,
            log: String::new(),
            variables: vec![],
            cycle: vec![],
        };
        assert_eq!(s.total_loops(), 1);
        assert_eq!(s.workers_per_loop(), 1);
    }

    #[test]
    fn rejects_empty_variable_key() {
        let s = Scenario {
            loops: 1,
            parallel: 1,
            log: String::new(),
            variables: vec![Variable {
                key: ConfigStr::new("  "),
                value: ConfigStr::new("x"),
            }],
            cycle: vec![],
        };
        assert!(s.preload().is_err());
    }

    fn blank_step() -> Step {
        Step {
            condition_raw: None,
            url: ConfigStr::new(""),
            content_type: ConfigStr::new(""),
            method: ConfigStr::new(""),
            header: vec![],
            timeout: None,
            body_json: None,
            body: ConfigStr::new(""),
            body_load_file: None,
            index: 0,
            condition: None,
            preloaded_body: String::new(),
            response: None,
            response_content_type: None,
        }
    }

    #[test]
    fn preload_rejects_empty_url() {
        let mut step = blank_step();
        assert!(step.preload(0).is_err());
    }

    #[test]
    fn preload_defaults_method_to_get() {
        let mut step = blank_step();
        step.url = ConfigStr::new("https://example.com");
        step.preload(0).unwrap();
        assert_eq!(step.method(), "GET");
    }

    #[test]
    fn preload_requires_content_type_for_non_get_body() {
        let mut step = blank_step();
        step.url = ConfigStr::new("https://example.com");
        step.method = ConfigStr::new("POST");
        assert!(step.preload(0).is_err());
    }

    #[test]
    fn preload_defaults_content_type_for_body_json() {
        let mut step = blank_step();
        step.url = ConfigStr::new("https://example.com");
        step.method = ConfigStr::new("POST");
        step.body_json = Some(serde_json::json!({"a": 1}));
        step.preload(0).unwrap();
        assert_eq!(step.content_type(), "APPLICATION/JSON");
        assert_eq!(step.preloaded_body, "{\"a\":1}");
    }

    #[test]
    fn body_precedence_prefers_body_over_body_json() {
        let mut step = blank_step();
        step.url = ConfigStr::new("https://example.com");
        step.method = ConfigStr::new("POST");
        step.content_type = ConfigStr::new("text/plain");
        step.body = ConfigStr::new("direct");
        step.body_json = Some(serde_json::json!({"a": 1}));
        step.preload(0).unwrap();
        assert_eq!(step.preloaded_body, "direct");
    }

    #[test]
    fn condition_rejected_on_first_step() {
        let mut step = blank_step();
        step.url = ConfigStr::new("https://example.com");
        step.condition_raw = Some("== a b".to_string());
        assert!(step.preload(0).is_err());
    }
}
