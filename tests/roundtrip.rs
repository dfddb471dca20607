use proptest::prelude::*;
use std::fs;
use ucikit::export::{to_string, ExportOptions};
use ucikit::{is_valid_text, parse_packages, Package};

fn load_fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/fixtures/{name}"))
        .unwrap_or_else(|err| panic!("failed to load fixture {name}: {err}"))
}

fn parse_one(text: &str) -> Package {
    let mut packages = parse_packages(text.as_bytes(), Some("test"), true).expect("parse");
    assert_eq!(packages.len(), 1);
    packages.remove(0)
}

const HEADER: ExportOptions = ExportOptions {
    header: true,
    names: false,
};

#[test]
fn export_normalizes_fixture() {
    let input = load_fixture("network.input");
    let expected = load_fixture("network.expected");

    let package = parse_one(&input);
    assert_eq!(package.name(), "network");
    assert_eq!(to_string(&package, HEADER), expected);
}

#[test]
fn export_is_a_fixed_point() {
    let package = parse_one(&load_fixture("network.input"));
    let first = to_string(&package, HEADER);
    let second = to_string(&parse_one(&first), HEADER);
    assert_eq!(first, second);
}

#[test]
fn anonymous_name_tracks_content() {
    let first = parse_one("config 'iface'\n\toption 'proto' 'static'\n");
    let second = parse_one("config 'iface'\n\toption 'proto' 'dhcp'\n");
    assert_ne!(first.sections()[0].name(), second.sections()[0].name());
    assert_eq!(&first.sections()[0].name()[..5], "cfg01");
}

#[test]
fn anonymous_names_survive_reparse() {
    let package = parse_one(&load_fixture("network.input"));
    let reparsed = parse_one(&to_string(&package, HEADER));
    let before: Vec<_> = package.sections().iter().map(|s| s.name()).collect();
    let after: Vec<_> = reparsed.sections().iter().map(|s| s.name()).collect();
    assert_eq!(before, after);
    assert!(reparsed.sections()[2].is_anonymous());
}

fn text_value() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[\t -~\u{a0}-\u{17f}]{0,40}").expect("regex")
}

fn name() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z_][a-z0-9_]{0,8}").expect("regex")
}

proptest! {
    #[test]
    fn escaped_values_parse_back(value in text_value()) {
        prop_assume!(is_valid_text(&value));
        let mut package = Package::new("test");
        package.set("s", None, "t").unwrap();
        package.set("s", Some("o"), &value).unwrap();

        let reparsed = parse_one(&to_string(&package, HEADER));
        prop_assert_eq!(reparsed.get("s", "o"), Some(value.as_str()));
    }

    #[test]
    fn build_export_parse_export(
        sections in proptest::collection::vec(
            (name(), proptest::option::of(name()), proptest::collection::vec((name(), text_value(), any::<bool>()), 0..5)),
            0..6,
        )
    ) {
        let mut package = Package::new("test");
        for (section_type, section_name, options) in &sections {
            let target = match section_name {
                Some(section_name) => {
                    package.set(section_name, None, section_type).unwrap();
                    section_name.clone()
                }
                None => package.add_section(section_type).unwrap().name().to_string(),
            };
            for (option, value, is_list) in options {
                if *is_list {
                    package.add_list(&target, option, value).unwrap();
                } else {
                    package.set(&target, Some(option), value).unwrap();
                }
            }
        }

        let first = to_string(&package, HEADER);
        let second = to_string(&parse_one(&first), HEADER);
        prop_assert_eq!(first, second);
    }
}
