/// Integration tests for the recursive value decoder
/// Covers plain values, JSON nesting, base64 layers and termination
use base64::{engine::general_purpose, Engine as _};
use reflector::decoder::{Decoder, TextFilter, DEFAULT_MAX_DEPTH};
use reflector::models::{KeyPath, Leaf, ParamSource};

fn query(name: &str) -> KeyPath {
    KeyPath::param(ParamSource::Query, name)
}

#[test]
fn test_plain_string_yields_itself_only() {
    let decoder = Decoder::default();
    for value in ["hello world", "http://evil.com", "a<b>c", "42abc!"] {
        let leaves = decoder.decode(query("q"), value);
        assert_eq!(leaves, vec![Leaf::new(query("q"), value)], "value {:?}", value);
    }
}

#[test]
fn test_json_object_recurses_into_every_key() {
    let decoder = Decoder::default();
    let raw = r#"{"b":[1,2],"a":"x y"}"#;
    let leaves = decoder.decode(query("q"), raw);

    let mut expected = vec![Leaf::new(query("q"), raw)];
    expected.extend(decoder.decode(query("q").key("a"), r#""x y""#));
    expected.extend(decoder.decode(query("q").key("b"), "[1,2]"));

    assert_eq!(leaves.len(), expected.len());
    for leaf in &expected {
        assert!(leaves.contains(leaf), "missing {:?}", leaf);
    }
}

#[test]
fn test_json_array_elements_get_indices() {
    let leaves = Decoder::default().decode(query("ids"), r#"["first", "second"]"#);
    assert!(leaves.contains(&Leaf::new(query("ids").index(0), "first")));
    assert!(leaves.contains(&Leaf::new(query("ids").index(1), "second")));
}

#[test]
fn test_base64_round_trip() {
    let original = "<script>alert(1)</script>";
    let encoded = general_purpose::STANDARD.encode(original);
    for filter in [TextFilter::Printable, TextFilter::Lossy] {
        let leaves = Decoder::new(filter).decode(query("q"), encoded.as_str());
        assert!(leaves.contains(&Leaf::new(query("q"), encoded.as_str())));
        assert!(leaves.contains(&Leaf::new(query("q"), original)));
    }
}

#[test]
fn test_base64_wrapped_json_in_json_string() {
    // "<base64 of {"q":"needle"}>" as a quoted JSON string
    let value = r#""eyJxIjoibmVlZGxlIn0=""#;
    let leaves = Decoder::default().decode(query("state"), value);
    assert!(leaves.contains(&Leaf::new(query("state"), "eyJxIjoibmVlZGxlIn0=")));
    assert!(leaves.contains(&Leaf::new(query("state"), r#"{"q":"needle"}"#)));
    assert!(leaves.contains(&Leaf::new(query("state").key("q"), "needle")));
}

#[test]
fn test_empty_value_terminates_with_single_leaf() {
    let leaves = Decoder::default().decode(query("q"), "");
    assert_eq!(leaves, vec![Leaf::new(query("q"), "")]);

    let leaves = Decoder::default().decode(query("q"), r#""""#);
    assert!(leaves.contains(&Leaf::new(query("q"), "")));
    assert_eq!(leaves.len(), 2);
}

#[test]
fn test_deep_nesting_bounded_by_max_depth() {
    let depth = 100;
    let value = format!("{}\"x\"{}", "[".repeat(depth), "]".repeat(depth));
    let leaves = Decoder::default().decode(query("q"), value);
    assert_eq!(leaves.len(), DEFAULT_MAX_DEPTH + 1);
}

#[test]
fn test_consumer_can_stop_early() {
    let decoder = Decoder::default();
    let first: Vec<Leaf> = decoder
        .leaves(KeyPath::root(ParamSource::Body), r#"{"a":"1","b":"2","c":"3"}"#)
        .take(1)
        .collect();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].key, KeyPath::root(ParamSource::Body));
}

#[test]
fn test_non_printable_base64_depends_on_filter() {
    let encoded = general_purpose::STANDARD.encode("line1\nline2");
    let strict = Decoder::new(TextFilter::Printable).decode(query("q"), encoded.as_str());
    let lossy = Decoder::new(TextFilter::Lossy).decode(query("q"), encoded.as_str());
    assert_eq!(strict.len(), 1);
    assert!(lossy.contains(&Leaf::new(query("q"), "line1\nline2")));
}
