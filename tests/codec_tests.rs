//! # Codec Layer Tests: Patch Operations and Wire Format
//!
//! Validates block encoding for every event type, envelope stamping,
//! script carriers and the client-side decoder / merge model.

use patchwire_codec::script::{self, DispatchOptions};
use patchwire_codec::wire::parse_events;
use patchwire_codec::{apply_merge_patch, ElementPatch, EventEnvelope, PatchMode, PatchOperation, ScrollEdge};
use patchwire_core::{Fault, PatchwireError};
use serde_json::{json, Map, Value};
use std::time::Instant;

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn encode(op: &PatchOperation) -> String {
    String::from_utf8(op.encode(&EventEnvelope::default()).unwrap().to_vec()).unwrap()
}

/// Verifies the exact bytes of a single state patch block.
#[test]
fn test_state_patch_block_layout() {
    let t = Instant::now();

    let op = PatchOperation::State {
        patch: object(json!({"count": 5})),
        only_if_missing: false,
    };
    assert_eq!(encode(&op), "event: state-patch\ndata: state {\"count\":5}\n\n");

    let overhead = t.elapsed();
    println!("test_state_patch_block_layout: Testing Overhead = {:?}", overhead);
}

/// Verifies that `onlyIfMissing` travels as a flag line ahead of the payload.
#[test]
fn test_state_patch_only_if_missing_flag() {
    let op = PatchOperation::State {
        patch: object(json!({"theme": "dark"})),
        only_if_missing: true,
    };
    assert_eq!(
        encode(&op),
        "event: state-patch\ndata: onlyIfMissing true\ndata: state {\"theme\":\"dark\"}\n\n"
    );
}

/// Verifies `id` and `retry` precede `event` when the envelope is set.
#[test]
fn test_envelope_fields_lead_the_block() {
    let envelope = EventEnvelope {
        id: Some("evt-7".into()),
        retry_ms: Some(2500),
    };
    let op = PatchOperation::State {
        patch: object(json!({"a": 1})),
        only_if_missing: false,
    };
    let raw = String::from_utf8(op.encode(&envelope).unwrap().to_vec()).unwrap();
    assert!(raw.starts_with("id: evt-7\nretry: 2500\nevent: state-patch\n"), "got {raw:?}");
}

/// Verifies selector, mode and markup lines of an append patch.
#[test]
fn test_element_patch_append() {
    let op = PatchOperation::Elements {
        markup: "<li>x</li>".into(),
        target: ElementPatch::at("#list", PatchMode::Append),
    };
    assert_eq!(
        encode(&op),
        "event: element-patch\ndata: selector #list\ndata: mode append\ndata: elements <li>x</li>\n\n"
    );
}

/// Verifies the default outerReplace mode is implied and not written.
#[test]
fn test_element_patch_default_mode_omitted() {
    let op = PatchOperation::Elements {
        markup: "<div id=\"card\">hi</div>".into(),
        target: ElementPatch::new(),
    };
    let raw = encode(&op);
    assert!(!raw.contains("mode "));
    assert!(!raw.contains("selector "));
    assert!(raw.contains("data: elements <div id=\"card\">hi</div>\n"));
}

/// Verifies every viewport hint and its wire spelling, in order.
#[test]
fn test_element_patch_viewport_hints() {
    let target = ElementPatch::at("#feed", PatchMode::Prepend)
        .with_view_transition()
        .settle(300)
        .limit(2)
        .scroll(ScrollEdge::Bottom)
        .show(ScrollEdge::Top)
        .focus_scroll();
    let op = PatchOperation::Elements {
        markup: "<p>new</p>".into(),
        target,
    };
    let stream = parse_events(&encode(&op));
    assert_eq!(stream.events.len(), 1);
    assert_eq!(
        stream.events[0].data,
        vec![
            "selector #feed",
            "mode prepend",
            "useViewTransition true",
            "settle 300",
            "limit 2",
            "scroll bottom",
            "show top",
            "focusScroll true",
            "elements <p>new</p>",
        ]
    );
}

/// Verifies multi-line markup becomes one `elements` line per line.
#[test]
fn test_multiline_markup_is_split() {
    let op = PatchOperation::Elements {
        markup: "<ul>\r\n  <li>a</li>\n</ul>".into(),
        target: ElementPatch::at("#menu", PatchMode::InnerReplace),
    };
    let stream = parse_events(&encode(&op));
    let event = &stream.events[0];
    assert_eq!(event.values("elements").count(), 3);
    assert_eq!(event.markup(), "<ul>\n  <li>a</li>\n</ul>");
}

/// Verifies a bare carriage return also splits markup, as it ends an SSE line.
#[test]
fn test_bare_carriage_return_is_split() {
    let op = PatchOperation::Elements {
        markup: "<b>a\rb</b>\r\n<i>c</i>\n".into(),
        target: ElementPatch::at("#x", PatchMode::InnerReplace),
    };
    let raw = encode(&op);
    assert!(!raw.contains("a\rb"));
    let stream = parse_events(&raw);
    assert_eq!(
        stream.events[0].values("elements").collect::<Vec<_>>(),
        vec!["<b>a", "b</b>", "<i>c</i>"]
    );
}

/// Verifies line breaks in the event id and selector cannot inject fields.
#[test]
fn test_id_and_selector_stay_on_one_line() {
    let envelope = EventEnvelope {
        id: Some("v1\ndata: state {}\r".into()),
        retry_ms: None,
    };
    let op = PatchOperation::Elements {
        markup: "<p>x</p>".into(),
        target: ElementPatch::at("#a,\r\nevent: evil", PatchMode::Append),
    };
    let raw = String::from_utf8(op.encode(&envelope).unwrap().to_vec()).unwrap();
    let stream = parse_events(&raw);
    let event = &stream.events[0];
    assert_eq!(event.event, "element-patch");
    assert_eq!(event.id.as_deref(), Some("v1data: state {}"));
    assert_eq!(event.value("selector"), Some("#a, event: evil"));
    assert_eq!(event.data.len(), 3);
}

#[test]
fn test_component_ops_layout() {
    let state = PatchOperation::ComponentState {
        component: "cart".into(),
        patch: object(json!({"items": 3})),
        only_if_missing: true,
    };
    assert_eq!(
        encode(&state),
        "event: component-state-patch\ndata: component cart\ndata: onlyIfMissing true\ndata: state {\"items\":3}\n\n"
    );

    let call = PatchOperation::MethodInvocation {
        component: "cart".into(),
        method: "refresh".into(),
        args: vec![json!(1), json!("two")],
    };
    assert_eq!(
        encode(&call),
        "event: method-invoke\ndata: component cart\ndata: method refresh\ndata: args [1,\"two\"]\n\n"
    );
}

/// Verifies the script carrier removes itself and cannot close its own tag early.
#[test]
fn test_script_carrier_escapes_closing_tag() {
    let op = script::script_operation("alert('</script><b>')");
    let PatchOperation::Elements { markup, target } = &op else {
        panic!("script must be an element patch");
    };
    assert_eq!(target.selector.as_deref(), Some("body"));
    assert_eq!(target.mode, PatchMode::Append);
    assert!(markup.contains("alert('<\\/script><b>')"));
    assert!(markup.contains("document.currentScript.remove()"));
    assert_eq!(markup.matches("</script>").count(), 1);
}

#[test]
fn test_dispatch_script_targets() {
    let global = script::dispatch_script("saved", &json!({"id": 1}), &DispatchOptions::global()).unwrap();
    assert!(global.starts_with("window.dispatchEvent(new CustomEvent(\"saved\""));
    assert!(global.contains("\"detail\":{\"id\":1}"));

    let first = script::dispatch_script("ping", &Value::Null, &DispatchOptions::first(".row")).unwrap();
    assert!(first.starts_with("document.querySelector(\".row\")?.dispatchEvent("));

    let all = script::dispatch_script("ping", &Value::Null, &DispatchOptions::all(".row")).unwrap();
    assert!(all.starts_with("document.querySelectorAll(\".row\").forEach("));
}

/// Verifies an empty event name fails immediately.
#[test]
fn test_dispatch_empty_name_is_usage_error() {
    let err = script::dispatch_script("  ", &Value::Null, &DispatchOptions::global()).unwrap_err();
    assert!(matches!(err, PatchwireError::Usage(_)), "got {err:?}");
}

#[test]
fn test_terminal_documents_escape_content() {
    let dump = script::dump_document(&json!({"html": "<b>"})).unwrap();
    assert!(dump.contains("&lt;b&gt;"));
    assert!(!dump.contains("<b>"));

    let fault = Fault {
        kind: "RenderError".into(),
        message: "template `<x>` not found".into(),
        trace: vec!["inner cause".into()],
    };
    let page = script::fault_document(&fault);
    assert!(page.contains("<h1>RenderError</h1>"));
    assert!(page.contains("template `&lt;x&gt;` not found"));
    assert!(page.contains("<li>inner cause</li>"));

    let replace = script::replace_document_script("<html></html>").unwrap();
    assert!(replace.starts_with("document.open();"));
    assert!(replace.ends_with("document.close();"));
    assert!(replace.contains("<\\/html>"));
}

/// Verifies the decoder on a payload with comments, CRLF and an unterminated tail.
#[test]
fn test_wire_decoder() {
    let raw = ": keepalive\n\nid: 1\r\nevent: state-patch\r\ndata: state {}\r\n\r\nevent: element-patch\ndata: elements <p>";
    let stream = parse_events(raw);
    assert_eq!(stream.comments, vec!["keepalive"]);
    assert_eq!(stream.events.len(), 1);
    assert_eq!(stream.events[0].id.as_deref(), Some("1"));
    assert_eq!(stream.events[0].value("state"), Some("{}"));
}

/// Verifies RFC 7386 semantics of the client merge model.
#[test]
fn test_merge_patch_semantics() {
    let mut state = json!({"user": {"name": "a", "tags": [1, 2]}, "count": 1});
    apply_merge_patch(&mut state, &json!({"user": {"tags": [3], "age": 4}, "count": null}));
    assert_eq!(state, json!({"user": {"name": "a", "tags": [3], "age": 4}}));

    apply_merge_patch(&mut state, &json!({"user": "flat"}));
    assert_eq!(state, json!({"user": "flat"}));
}
