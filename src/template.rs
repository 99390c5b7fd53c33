//! The four template dialects resolved before a step runs: `VAR`, `ENV`,
//! `PATH` and `RESP`, always in that order.
//!
//! `VAR` is a straight key/value substitution using the scenario's static
//! variables. The other three are regex-scanned tokens: `ENV` reads the
//! process environment, `PATH` and `RESP` reach into an earlier step's
//! response by index. Resolution is a single left-to-right pass per
//! dialect — a value substituted by an earlier dialect is never rescanned
//! by a later one, so a response body can safely contain `{%...%}`-shaped
//! text without being misinterpreted.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::errors::LoadError;
use crate::jsonpath;
use crate::types::KeyValue;

/// A step's own recorded response, the thing `PATH`/`RESP` tokens read from.
#[derive(Debug, Clone)]
pub struct ResponseCycle {
    pub status_code: u16,
    pub body: Vec<u8>,
    pub duration: Duration,
}

impl ResponseCycle {
    /// Resolve a `RESP` variable name. `STATUS_CODE` is the only one the
    /// format defines today.
    fn get_response_variable(&self, name: &str) -> Result<String, LoadError> {
        match name {
            "STATUS_CODE" => Ok(self.status_code.to_string()),
            other => Err(LoadError::template(format!(
                "the variable is not valid: {other}"
            ))),
        }
    }

    /// Resolve a `PATH` token against this response's parsed JSON body.
    fn get_path_value(&self, path: &str) -> Result<String, LoadError> {
        let segments: Vec<&str> = path.split('.').collect();
        let value = jsonpath::parse_body(&self.body);
        match value {
            Some(v) => jsonpath::get_by_path(&v, &segments)
                .map_err(|e| LoadError::template(format!("{e}: {segments:?}"))),
            None => Err(LoadError::template(format!(
                "the path was not found: {segments:?}"
            ))),
        }
    }
}

/// Lookup of already-executed steps' responses, keyed by step index.
/// `Cycle` is the real implementor; tests can use a `HashMap`.
pub trait StepResponses: Send + Sync {
    fn response_at(&self, index: usize) -> Option<&ResponseCycle>;
}

impl StepResponses for std::collections::HashMap<usize, ResponseCycle> {
    fn response_at(&self, index: usize) -> Option<&ResponseCycle> {
        self.get(&index)
    }
}

impl StepResponses for Vec<Option<ResponseCycle>> {
    fn response_at(&self, index: usize) -> Option<&ResponseCycle> {
        self.get(index).and_then(|r| r.as_ref())
    }
}

/// A static `key -> value` substitution, the source for `VAR` tokens.
#[derive(Debug, Clone)]
pub struct StaticVariable {
    pub key: String,
    pub value: String,
}

impl KeyValue for StaticVariable {
    fn key(&self) -> &str {
        &self.key
    }
    fn value(&self) -> &str {
        &self.value
    }
}

struct RawToken<'a> {
    whole: &'a str,
    index: usize,
    operand: &'a str,
}

fn env_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{%ENV:([^ ]+):ENDENV%\}").unwrap())
}

fn path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{%PATH\[([0-9]+)\]:([^{%}]+):ENDPATH%\}").unwrap())
}

fn resp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{%RESP\[([0-9]+)\]:([A-Z_]+):ENDRESP%\}").unwrap())
}

fn scan_indexed<'a>(re: &Regex, data: &'a str) -> Vec<RawToken<'a>> {
    re.captures_iter(data)
        .map(|c| {
            let whole = c.get(0).unwrap().as_str();
            let index: usize = c.get(1).unwrap().as_str().parse().unwrap();
            let operand = c.get(2).unwrap().as_str();
            RawToken { whole, index, operand }
        })
        .collect()
}

/// Replace `{%VAR:key:ENDVAR%}` occurrences with the scenario's static
/// variable values. Unknown keys are left untouched: the scenario loader
/// already validated every declared variable has a non-empty key, and a
/// literal `{%VAR:...%}` that doesn't match one is not this dialect's job.
fn resolve_var(data: &str, variables: &[StaticVariable]) -> String {
    let tokens: Vec<StaticVariable> = variables
        .iter()
        .map(|v| StaticVariable {
            key: format!("{{%VAR:{}:ENDVAR%}}", v.key),
            value: v.value.clone(),
        })
        .collect();
    crate::types::replace_key_by_value(&tokens, data)
}

/// Replace `{%ENV:NAME:ENDENV%}` occurrences with `std::env::var(NAME)`.
fn resolve_env(data: &str) -> Result<String, LoadError> {
    let re = env_regex();
    let mut out = data.to_string();

    for cap in re.captures_iter(data) {
        let whole = cap.get(0).unwrap().as_str();
        let name = cap.get(1).unwrap().as_str();
        let value = std::env::var(name).map_err(|_| {
            LoadError::template(format!("environment variable ({name}) not found"))
        })?;
        out = out.replace(whole, &value);
    }

    Ok(out)
}

/// Replace `{%PATH[i]:a.b.c:ENDPATH%}` occurrences by navigating step `i`'s
/// parsed response body. Rejects references to the current step or any
/// step after it.
fn resolve_path(
    data: &str,
    current_index: usize,
    steps: &dyn StepResponses,
) -> Result<String, LoadError> {
    let re = path_regex();
    let tokens = scan_indexed(re, data);
    let mut out = data.to_string();

    for token in tokens {
        if token.index >= current_index {
            return Err(LoadError::template(format!(
                "cannot use a variable that does not yet exist: {}",
                token.operand
            )));
        }

        let response = steps.response_at(token.index).ok_or_else(|| {
            LoadError::template(format!("step at index {} was not found", token.index))
        })?;

        let value = response.get_path_value(token.operand)?;
        out = out.replace(token.whole, &value);
    }

    Ok(out)
}

/// Replace `{%RESP[i]:NAME:ENDRESP%}` occurrences with step `i`'s response
/// variable (currently only `STATUS_CODE`). Same forward-reference rule as
/// `PATH`.
fn resolve_resp(
    data: &str,
    current_index: usize,
    steps: &dyn StepResponses,
) -> Result<String, LoadError> {
    let re = resp_regex();
    let tokens = scan_indexed(re, data);
    let mut out = data.to_string();

    for token in tokens {
        if token.index >= current_index {
            return Err(LoadError::template(format!(
                "cannot use a variable that does not yet exist: {}",
                token.operand
            )));
        }

        let response = steps.response_at(token.index).ok_or_else(|| {
            LoadError::template(format!("step at index {} was not found", token.index))
        })?;

        let value = response.get_response_variable(token.operand)?;
        out = out.replace(token.whole, &value);
    }

    Ok(out)
}

/// Run all four dialects, in order, over `data`.
pub fn resolve(
    data: &str,
    variables: &[StaticVariable],
    current_index: usize,
    steps: &dyn StepResponses,
) -> Result<String, LoadError> {
    let data = resolve_var(data, variables);
    let data = resolve_env(&data)?;
    let data = resolve_path(&data, current_index, steps)?;
    let data = resolve_resp(&data, current_index, steps)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn var(key: &str, value: &str) -> StaticVariable {
        StaticVariable {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn resolves_static_variable() {
        let vars = vec![var("host", "example.com")];
        let out = resolve_var("https://{%VAR:host:ENDVAR%}/ping", &vars);
        assert_eq!(out, "https://example.com/ping");
    }

    #[test]
    #[serial]
    fn resolves_environment_variable() {
        std::env::set_var("LOADCYCLE_TEST_TOKEN", "abc123");
        let out = resolve_env("Bearer {%ENV:LOADCYCLE_TEST_TOKEN:ENDENV%}").unwrap();
        assert_eq!(out, "Bearer abc123");
        std::env::remove_var("LOADCYCLE_TEST_TOKEN");
    }

    #[test]
    #[serial]
    fn missing_environment_variable_errors() {
        std::env::remove_var("LOADCYCLE_TEST_MISSING");
        let err = resolve_env("{%ENV:LOADCYCLE_TEST_MISSING:ENDENV%}").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    fn sample_steps() -> Vec<Option<ResponseCycle>> {
        vec![Some(ResponseCycle {
            status_code: 201,
            body: br#"{"id": "xyz"}"#.to_vec(),
            duration: Duration::from_millis(5),
        })]
    }

    #[test]
    fn resolves_path_from_earlier_step() {
        let steps = sample_steps();
        let out = resolve_path("id={%PATH[0]:id:ENDPATH%}", 1, &steps).unwrap();
        assert_eq!(out, "id=xyz");
    }

    #[test]
    fn resolves_status_code_from_earlier_step() {
        let steps = sample_steps();
        let out = resolve_resp("code={%RESP[0]:STATUS_CODE:ENDRESP%}", 1, &steps).unwrap();
        assert_eq!(out, "code=201");
    }

    #[test]
    fn rejects_forward_reference_in_path() {
        let steps = sample_steps();
        let err = resolve_path("{%PATH[1]:id:ENDPATH%}", 1, &steps).unwrap_err();
        assert!(err.to_string().contains("does not yet exist"));
    }

    #[test]
    fn rejects_forward_reference_in_resp() {
        let steps = sample_steps();
        let err = resolve_resp("{%RESP[1]:STATUS_CODE:ENDRESP%}", 1, &steps).unwrap_err();
        assert!(err.to_string().contains("does not yet exist"));
    }

    #[test]
    fn rejects_self_reference() {
        let steps = sample_steps();
        let err = resolve_path("{%PATH[0]:id:ENDPATH%}", 0, &steps).unwrap_err();
        assert!(err.to_string().contains("does not yet exist"));
    }

    #[test]
    fn unknown_resp_variable_is_an_error() {
        let steps = sample_steps();
        let err = resolve_resp("{%RESP[0]:BOGUS:ENDRESP%}", 1, &steps).unwrap_err();
        assert!(err.to_string().contains("the variable is not valid"));
    }

    #[test]
    #[serial]
    fn full_resolve_runs_all_dialects_in_order() {
        std::env::set_var("LOADCYCLE_TEST_HOST", "api.test");
        let vars = vec![var("scheme", "https")];
        let steps = sample_steps();
        let out = resolve(
            "{%VAR:scheme:ENDVAR%}://{%ENV:LOADCYCLE_TEST_HOST:ENDENV%}/{%PATH[0]:id:ENDPATH%}",
            &vars,
            1,
            &steps,
        )
        .unwrap();
        assert_eq!(out, "https://api.test/xyz");
        std::env::remove_var("LOADCYCLE_TEST_HOST");
    }
}
