//! # NavigationGuard Tests: Single Navigation and Same-Origin Checks
//!
//! Validates the per-response URL lock, target validation and the
//! encoded navigation intent.

use patchwire::{Body, Engine, NavigateOptions, PatchwireError, RequestContext, Response};
use patchwire_codec::parse_events;
use patchwire_transport::NavigationValidator;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;

fn protocol_request(host: &str) -> Arc<RequestContext> {
    Arc::new(RequestContext::new("/todos", host).with_protocol())
}

fn markups(response: Response) -> Vec<String> {
    let Body::Full(bytes) = response.body else {
        panic!("expected a batch body");
    };
    parse_events(std::str::from_utf8(&bytes).unwrap())
        .events
        .iter()
        .map(|e| e.markup())
        .collect()
}

/// Verifies a second navigate() fails even though the first one succeeded.
#[test]
fn test_second_navigate_is_usage_error() {
    let t = Instant::now();

    let engine = Engine::default();
    let mut response = engine.begin(protocol_request("app.test"));
    response.navigate("/a", None, NavigateOptions::default()).unwrap();
    assert!(response.is_url_locked());

    let err = response.navigate("/b", None, NavigateOptions::default()).unwrap_err();
    assert!(matches!(err, PatchwireError::Usage(_)), "got {err:?}");
    assert_eq!(markups(response.finalize().unwrap()).len(), 1);

    let overhead = t.elapsed();
    println!("test_second_navigate_is_usage_error: Testing Overhead = {:?}", overhead);
}

/// Verifies a foreign absolute URL is rejected and emits nothing.
#[test]
fn test_foreign_host_is_validation_error() {
    let engine = Engine::default();
    let mut response = engine.begin(protocol_request("app.test"));
    let err = response
        .navigate("https://evil.com/steal", None, NavigateOptions::default())
        .unwrap_err();
    assert!(matches!(err, PatchwireError::Validation(_)), "got {err:?}");
    assert!(markups(response.finalize().unwrap()).is_empty());
}

/// Verifies a failed validation leaves the lock open for a valid retry.
#[test]
fn test_failed_validation_does_not_lock() {
    let engine = Engine::default();
    let mut response = engine.begin(protocol_request("app.test"));
    assert!(response.navigate("//evil.com/x", None, NavigateOptions::default()).is_err());
    assert!(!response.is_url_locked());
    response.navigate("/ok", None, NavigateOptions::default()).unwrap();
    assert!(response.is_url_locked());
}

#[test]
fn test_relative_targets_always_pass() {
    let request = RequestContext::new("/todos", "app.test");
    let validator = NavigationValidator::new(&request);
    for target in ["/dashboard", "?page=2", "#top", "next/page", "../up"] {
        assert!(validator.check_url(target).is_ok(), "{target} should pass");
    }
}

/// Verifies host comparison ignores case and ports, and only http(s) is allowed.
#[test]
fn test_absolute_target_rules() {
    let request = RequestContext::new("/todos", "App.Test:8080");
    let validator = NavigationValidator::new(&request);

    assert!(validator.check_url("https://app.test/x").is_ok());
    assert!(validator.check_url("http://APP.TEST:9000/x").is_ok());
    assert!(validator.check_url("//app.test/x").is_ok());

    for bad in ["https://evil.com", "//evil.com/x", "javascript:alert(1)", "mailto:a@app.test", "", "   "] {
        assert!(
            matches!(validator.check_url(bad), Err(PatchwireError::Validation(_))),
            "{bad:?} should be rejected"
        );
    }
}

#[test]
fn test_ipv6_host_with_port() {
    let request = RequestContext::new("/", "[::1]:8080");
    let validator = NavigationValidator::new(&request);
    assert!(validator.check_url("http://[::1]/x").is_ok());
    assert!(validator.check_url("http://127.0.0.1/x").is_err());
}

/// Verifies a query map resolves against the current path.
#[test]
fn test_query_target_uses_current_path() {
    let engine = Engine::default();
    let mut response = engine.begin(protocol_request("app.test"));
    let mut query = Map::new();
    query.insert("page".into(), json!(2));
    query.insert("tag".into(), json!(["a", "b"]));
    query.insert("skip".into(), Value::Null);
    response.navigate(query, None, NavigateOptions::default()).unwrap();

    let markup = &markups(response.finalize().unwrap())[0];
    assert!(markup.contains("\"url\":\"/todos?page=2&tag=a&tag=b\""), "got {markup}");
}

/// Verifies the dispatched intent carries the key and the option flags.
#[test]
fn test_intent_detail() {
    let engine = Engine::default();
    let mut response = engine.begin(protocol_request("app.test"));
    response.navigate_except(&["page"], Some("filters")).unwrap();

    let markup = &markups(response.finalize().unwrap())[0];
    assert!(markup.contains("new CustomEvent(\"patchwire:navigate\""));
    assert!(markup.contains("\"key\":\"filters\""));
    assert!(markup.contains("\"except\":[\"page\"]"));
    assert!(markup.contains("\"merge\":true"));
    assert!(markup.contains("\"url\":\"/todos\""));
    assert!(markup.contains("\"nonce\":\""));
}

#[test]
fn test_default_key_and_presets() {
    let engine = Engine::default();

    let mut response = engine.begin(protocol_request("app.test"));
    response.navigate_replace("/inbox", None).unwrap();
    let markup = &markups(response.finalize().unwrap())[0];
    assert!(markup.contains("\"key\":\"true\""));
    assert!(markup.contains("\"replace\":true"));
    assert!(markup.contains("\"merge\":false"));

    let mut response = engine.begin(protocol_request("app.test"));
    response.reset_pagination("page", Some("search")).unwrap();
    let markup = &markups(response.finalize().unwrap())[0];
    assert!(markup.contains("\"except\":[\"page\"]"));
    assert!(markup.contains("\"key\":\"search\""));

    let only = NavigateOptions::only_params(&["q", "sort"]);
    assert!(only.merge);
    assert_eq!(only.only, vec!["q", "sort"]);
}

/// Verifies every navigation gets a fresh nonce so repeated targets still fire.
#[test]
fn test_nonce_differs_per_navigation() {
    let engine = Engine::default();
    let nonce = |markup: &str| -> String {
        let start = markup.find("\"nonce\":\"").unwrap() + 9;
        markup[start..start + 32].to_string()
    };

    let mut first = engine.begin(protocol_request("app.test"));
    first.navigate("/same", None, NavigateOptions::default()).unwrap();
    let mut second = engine.begin(protocol_request("app.test"));
    second.navigate("/same", None, NavigateOptions::default()).unwrap();

    let a = nonce(&markups(first.finalize().unwrap())[0]);
    let b = nonce(&markups(second.finalize().unwrap())[0]);
    assert_ne!(a, b);
}

/// Verifies the lock and validation still apply to non-protocol requests.
#[test]
fn test_non_protocol_still_enforces_lock() {
    let engine = Engine::default();
    let mut response = engine.begin(Arc::new(RequestContext::new("/todos", "app.test")));
    assert!(response.navigate("https://evil.com", None, NavigateOptions::default()).is_err());
    response.navigate("/a", None, NavigateOptions::default()).unwrap();
    assert!(matches!(
        response.navigate("/b", None, NavigateOptions::default()),
        Err(PatchwireError::Usage(_))
    ));
    assert_eq!(response.finalize().unwrap().status, 204);
}

/// Verifies backslashes and stripped whitespace cannot smuggle a foreign host.
#[test]
fn test_backslash_and_whitespace_targets_are_absolute() {
    let request = RequestContext::new("/todos", "app.test");
    let validator = NavigationValidator::new(&request);

    for bad in [
        "/\\evil.example/x",
        "\\\\evil.example/x",
        "/\t/evil.example/x",
        "/\n/evil.example/x",
        " //evil.example",
        "///evil.example",
        "https:\\\\evil.example",
    ] {
        assert!(
            matches!(validator.check_url(bad), Err(PatchwireError::Validation(_))),
            "{bad:?} should be rejected"
        );
    }
    assert!(validator.check_url("/\\app.test/x").is_ok());
    assert!(validator.check_url("/docs\\intro").is_ok());
}

#[test]
fn test_backslash_target_rejected_by_navigate_and_redirect() {
    let engine = Engine::default();
    let mut response = engine.begin(protocol_request("app.test"));
    assert!(matches!(
        response.navigate("/\\evil.example/x", None, NavigateOptions::default()),
        Err(PatchwireError::Validation(_))
    ));
    assert!(matches!(
        response.redirect("\\\\evil.example/x"),
        Err(PatchwireError::Validation(_))
    ));
    assert!(response.pending_redirect().is_none());
    assert!(!response.is_url_locked());
}
