//! End-to-end behaviour of built configs, driven from INI text

use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use zyconf_core::{
    Config, ConfigLevel, ConfigOptions, Entry, ErrorKind, InterpolationErrorKind, Item, Value,
    MAX_CONFIG_LEVEL, MAX_INTERPOLATION_DEPTH,
};

const PROFILE: &str = r#"
; developer profile
[tuns@profile]
nick = tuns
name = Nguyen Sinh Tu with nick = ${tuns.profile.nick}
school = ${tuns.profile.university}
university = ${tuns.profile.nick} university
age = 28
height = 1.72
married = False
pets = None
langs = ['rust', 'python']

[tuns@work]
nick = tuns
title = engineer
"#;

fn text_mapping(entries: &[(&str, &str, &str, &str)]) -> IndexMap<String, Value> {
    let mut root: IndexMap<String, Value> = IndexMap::new();
    for (section, subsection, option, text) in entries {
        let sec = root
            .entry(section.to_string())
            .or_insert_with(|| Value::Mapping(IndexMap::new()));
        let Value::Mapping(sec) = sec else { unreachable!() };
        let sub = sec
            .entry(subsection.to_string())
            .or_insert_with(|| Value::Mapping(IndexMap::new()));
        let Value::Mapping(sub) = sub else { unreachable!() };
        sub.insert(option.to_string(), Value::String(text.to_string()));
    }
    root
}

#[test]
fn stored_values_read_back_as_inferred_text() {
    let entries = [
        ("s", "a", "int", "42"),
        ("s", "a", "neg", "-7"),
        ("s", "a", "hex", "0x1F"),
        ("s", "a", "float", "2.5e3"),
        ("s", "a", "bool", "True"),
        ("s", "a", "none", "None"),
        ("s", "b", "word", "hello"),
        ("s", "b", "lower_bool", "true"),
        ("s", "b", "quoted", "'quoted'"),
        ("s", "b", "quoted_int", "'42'"),
        ("s", "b", "quoted_bool", "'True'"),
        ("s", "b", "list", "[1, 'two', 3.0]"),
        ("t", "c", "zero_lead", "007"),
        ("t", "c", "huge", "99999999999999999999"),
        ("t", "c", "tuple", "(1, 2)"),
        ("t", "c", "blank", ""),
    ];
    let config = Config::from_mapping(&text_mapping(&entries), ConfigOptions::default()).unwrap();

    for (section, subsection, option, text) in entries {
        let path = format!("{}.{}.{}", section, subsection, option);
        assert_eq!(
            config.lookup_value(&path).unwrap(),
            Value::infer(text),
            "value at {}",
            path
        );
    }

    assert_eq!(config.lookup_value("s.a.hex").unwrap(), Value::Integer(31));
    assert_eq!(config.lookup_value("s.b.lower_bool").unwrap(), Value::String("true".into()));
    assert_eq!(config.lookup_value("t.c.zero_lead").unwrap(), Value::String("007".into()));
    assert_eq!(config.lookup_value("s.b.quoted_int").unwrap(), Value::String("42".into()));
    assert_eq!(config.lookup_value("s.b.quoted_bool").unwrap(), Value::String("True".into()));
    assert_eq!(
        config.lookup_value("t.c.tuple").unwrap(),
        Value::Sequence(vec![Value::Integer(1), Value::Integer(2)])
    );
}

#[test]
fn option_holding_a_mapping_exceeds_max_level() {
    let mut deep = text_mapping(&[("s", "sub", "opt", "1")]);
    if let Some(Value::Mapping(sec)) = deep.get_mut("s") {
        if let Some(Value::Mapping(sub)) = sec.get_mut("sub") {
            sub.insert("nested".into(), Value::Mapping(text_mapping(&[])));
        }
    }

    let err = Config::from_mapping(&deep, ConfigOptions::default()).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::MaxLevelExceeded {
            header: "s.sub.nested".into(),
            max_level: MAX_CONFIG_LEVEL,
        }
    );

    let err = Config::from_ini("[a@b@c]\nx = 1\n").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MaxLevelExceeded { .. }));
}

#[test]
fn case_insensitive_duplicates_rejected_in_any_order() {
    for (first, second) in [("Host", "host"), ("host", "HOST")] {
        let mapping = text_mapping(&[("db", "main", first, "a"), ("db", "main", second, "b")]);
        let err = Config::from_mapping(&mapping, ConfigOptions::default()).unwrap_err();
        assert!(
            matches!(err.kind, ErrorKind::DuplicateKey { level: ConfigLevel::Option, .. }),
            "{} then {} should collide, got {}",
            first,
            second,
            err
        );
    }

    let err = Config::from_ini("[Db]\nx = 1\n[DB]\ny = 2\n").unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::DuplicateKey { level: ConfigLevel::Section, .. }
    ));
}

#[test]
fn built_tree_rejects_every_mutation() {
    let config = Config::from_ini(PROFILE).unwrap();
    let root = config.root();
    let profile = root.node("tuns").unwrap().node("profile").unwrap();
    let before = config.to_value(false).unwrap();

    assert_eq!(profile.set("nick", "other").unwrap_err().kind, ErrorKind::ReadOnly);
    assert_eq!(profile.set("brand_new", 1).unwrap_err().kind, ErrorKind::ReadOnly);
    assert_eq!(profile.delete("nick").unwrap_err().kind, ErrorKind::ReadOnly);
    assert_eq!(profile.set_parent(None).unwrap_err().kind, ErrorKind::ReadOnly);
    assert_eq!(root.set_parent(Some(profile)).unwrap_err().kind, ErrorKind::ReadOnly);

    assert_eq!(config.to_value(false).unwrap(), before);
    assert_eq!(profile.parent().unwrap().parent(), Some(root));
    assert_eq!(root.parent(), None);
}

#[test]
fn reference_resolves_to_stored_value() {
    let config = Config::from_ini(PROFILE).unwrap();
    assert_eq!(
        config.lookup_value("tuns.profile.name").unwrap(),
        Value::String("Nguyen Sinh Tu with nick = tuns".into())
    );
}

#[test]
fn chains_longer_than_one_hop_fail() {
    let config = Config::from_ini(PROFILE).unwrap();

    assert_eq!(
        config.lookup_value("tuns.profile.university").unwrap(),
        Value::String("tuns university".into())
    );

    let err = config.lookup_value("tuns.profile.school").unwrap_err();
    assert!(err.is_interpolation());
    assert_eq!(
        err.kind,
        ErrorKind::Interpolation(InterpolationErrorKind::Depth {
            option: "nick".into(),
            requested_by: "tuns.profile.school".into(),
            max_depth: MAX_INTERPOLATION_DEPTH,
        })
    );
}

#[test]
fn escaped_dollar_is_literal() {
    let config = Config::from_ini("[a]\nprice = $$5\nboth = $$${a.main.price}$$\n").unwrap();
    assert_eq!(config.lookup_value("a.main.price").unwrap(), Value::String("$5".into()));
    assert_eq!(config.lookup_value("a.main.both").unwrap(), Value::String("$$5$".into()));
}

#[test]
fn missing_reference_names_the_path() {
    let config = Config::from_ini("[a]\nx = ${missing.sect.opt}\n").unwrap();
    let err = config.lookup_value("a.main.x").unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::Interpolation(InterpolationErrorKind::Missing {
            reference: "missing.sect.opt".into(),
        })
    );
    assert!(!err.is_not_found());
}

#[test]
fn full_key_follows_identity_not_equality() {
    let config = Config::from_ini(PROFILE).unwrap();
    let root = config.root();
    let tuns = root.node("tuns").unwrap();

    let profile = tuns.node("profile").unwrap();
    let work = tuns.node("work").unwrap();
    assert_eq!(
        profile.get("nick").unwrap(),
        work.get("nick").unwrap(),
        "sibling options share a value"
    );
    assert_ne!(profile, work);

    assert_eq!(profile.full_key("nick"), vec!["tuns", "profile", "nick"]);
    assert_eq!(work.full_key("nick"), vec!["tuns", "work", "nick"]);
    assert_eq!(tuns.full_key("work"), vec!["tuns", "work"]);
}

#[test]
fn read_surface_over_profile() {
    let config = Config::from_ini(PROFILE).unwrap();
    let profile = match config.lookup("tuns.profile").unwrap() {
        Item::Node(node) => node,
        Item::Value(v) => panic!("expected node, got {:?}", v),
    };

    assert_eq!(profile.level(), ConfigLevel::Option);
    assert_eq!(profile.len(), 9);
    assert!(profile.contains_key("NICK"));
    assert!(!profile.contains_key("missing"));
    assert_eq!(profile.keys().next(), Some("nick"));

    assert_eq!(profile.get_int("age").unwrap(), 28);
    assert_eq!(profile.get_float("height").unwrap(), 1.72);
    assert!(!profile.get_bool("married").unwrap());
    assert_eq!(profile.value("pets").unwrap(), Value::Null);
    assert_eq!(
        profile.value("langs").unwrap(),
        Value::Sequence(vec![Value::String("rust".into()), Value::String("python".into())])
    );

    let raw: Vec<(&str, bool)> = profile
        .iter()
        .map(|(k, e)| (k, matches!(e, Entry::Value(Value::String(_)))))
        .take(3)
        .collect();
    assert_eq!(raw, vec![("nick", true), ("name", true), ("school", true)]);

    assert_eq!(
        profile.get_or("nope", Item::Value(Value::Integer(1))).unwrap(),
        Item::Value(Value::Integer(1))
    );
    assert!(profile.get_or("school", Item::Value(Value::Null)).is_err());
}

#[test]
fn config_file_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.cfg");
    std::fs::write(&path, PROFILE).unwrap();

    let config = Config::read(&path).unwrap();
    assert_eq!(config.get_string("tuns.work.title").unwrap(), "engineer");

    let err = config.resolve_all().unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::Interpolation(InterpolationErrorKind::Depth { .. })
    ));
}
