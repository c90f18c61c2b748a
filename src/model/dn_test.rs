use std::collections::BTreeMap;

use super::*;
use crate::ConfigurationError;
use crate::Error;

#[test]
fn parse_splits_rdns_leaf_first() {
    let dn = Dn::parse("cn=worker-1, cn=pool,cn=config").unwrap();

    assert_eq!(dn.depth(), 3);
    assert_eq!(dn.rdn().unwrap().attribute(), "cn");
    assert_eq!(dn.rdn().unwrap().value(), "worker-1");
    assert_eq!(dn.to_string(), "cn=worker-1,cn=pool,cn=config");
}

#[test]
fn empty_string_is_the_root() {
    let dn = Dn::parse("  ").unwrap();
    assert!(dn.is_root());
    assert_eq!(dn.parent(), None);
    assert_eq!(dn.ancestors().count(), 0);
}

#[test]
fn malformed_rdn_is_rejected() {
    for raw in ["config", "cn=", "=config", "cn=a,,cn=b"] {
        let result = Dn::parse(raw);
        assert!(
            matches!(result, Err(Error::Configuration(ConfigurationError::InvalidDn { .. }))),
            "{raw} should not parse"
        );
    }
}

#[test]
fn escaped_separators_stay_in_the_value() {
    let dn = Dn::parse(r"cn=a\,b,cn=config").unwrap();

    assert_eq!(dn.depth(), 2);
    assert_eq!(dn.rdn().unwrap().value(), "a,b");
    assert_eq!(dn.to_string(), r"cn=a\,b,cn=config");
}

#[test]
fn comparison_ignores_case_and_spacing() {
    let a = Dn::parse("CN=Pool,cn=Config").unwrap();
    let b = Dn::parse("cn=pool , cn=config").unwrap();

    assert_eq!(a, b);
    assert_eq!(a.to_string(), "CN=Pool,cn=Config");
}

#[test]
fn parent_child_and_ancestors() {
    let root = Dn::parse("cn=config").unwrap();
    let pool = root.child(Rdn::new("cn", "pool"));
    let worker = pool.child(Rdn::new("cn", "w1"));

    assert_eq!(worker.to_string(), "cn=w1,cn=pool,cn=config");
    assert_eq!(worker.parent(), Some(pool.clone()));
    assert_eq!(root.parent(), Some(Dn::root()));

    let ancestors: Vec<String> = worker.ancestors().map(|d| d.to_string()).collect();
    assert_eq!(ancestors, vec!["cn=pool,cn=config", "cn=config", ""]);
}

#[test]
fn concat_appends_relative_dn_below() {
    let base = Dn::parse("cn=config").unwrap();
    let relative = Dn::parse("cn=w1,cn=pool").unwrap();

    assert_eq!(base.concat(&relative).to_string(), "cn=w1,cn=pool,cn=config");
}

#[test]
fn descendant_excludes_self_and_siblings() {
    let pool = Dn::parse("cn=pool,cn=config").unwrap();
    let worker = Dn::parse("cn=w1,cn=pool,cn=config").unwrap();
    let sibling = Dn::parse("cn=backends,cn=config").unwrap();

    assert!(worker.is_descendant_of(&pool));
    assert!(!pool.is_descendant_of(&pool));
    assert!(!sibling.is_descendant_of(&pool));
    assert!(pool.is_descendant_of(&Dn::root()));
}

#[test]
fn ordering_keeps_subtrees_contiguous() {
    let mut map = BTreeMap::new();
    for raw in [
        "cn=config",
        "cn=w2,cn=pool,cn=config",
        "cn=backends,cn=config",
        "cn=pool,cn=config",
        "cn=a,cn=backends,cn=config",
        "cn=w1,cn=pool,cn=config",
    ] {
        map.insert(Dn::parse(raw).unwrap(), ());
    }
    let pool = Dn::parse("cn=pool,cn=config").unwrap();

    let subtree: Vec<String> = map
        .range(pool.clone()..)
        .map(|(k, _)| k)
        .take_while(|k| *k == &pool || k.is_descendant_of(&pool))
        .map(|k| k.to_string())
        .collect();

    assert_eq!(
        subtree,
        vec!["cn=pool,cn=config", "cn=w1,cn=pool,cn=config", "cn=w2,cn=pool,cn=config"]
    );
}

#[test]
fn from_str_matches_parse() {
    let dn: Dn = "cn=global,cn=config".parse().unwrap();
    assert_eq!(dn, Dn::parse("cn=global,cn=config").unwrap());
}
