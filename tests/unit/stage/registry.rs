use super::*;

fn config() -> StageConfig {
    StageConfig::from_json(
        r#"{
          "rig": "rig.json",
          "expressions": ["happy"],
          "actions": [
            {"name": "yes", "animation": {"path": "yes.json"}},
            {"name": "idle", "animation": {"path": "idle.json"}},
            {"name": "no", "animation": {"path": "no.json"}}
          ]
        }"#,
    )
    .unwrap()
}

#[test]
fn ids_follow_configuration_order() {
    let table = ActionTable::from_config(&config()).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.id("yes"), Some(ActionId(0)));
    assert_eq!(table.id("no"), Some(ActionId(2)));
    assert_eq!(table.idle(), ActionId(1));
    assert_eq!(table.name(ActionId(2)), "no");
    assert_eq!(table.id("maybe"), None);
    assert!(table.get(ActionId(9)).is_none());
    let names: Vec<&str> = table.iter().map(|(_, a)| a.name.as_str()).collect();
    assert_eq!(names, ["yes", "idle", "no"]);
}

#[test]
fn missing_idle_yields_none() {
    let mut cfg = config();
    cfg.idle = "rest".to_owned();
    assert!(ActionTable::from_config(&cfg).is_none());
}
