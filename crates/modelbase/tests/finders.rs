use std::sync::{Arc, Mutex};

use modelbase::prelude::*;

const NAMES: [&str; 5] = ["apple", "bannana", "cantaloupe", "date", "x"];

fn finder_test() -> Arc<ModelDefinition> {
    ModelDefinition::builder("FinderTest")
        .attribute("value", AttributeOptions::integer().identity(true))
        .attribute("name", AttributeOptions::string().identity(true))
        .attribute("description", AttributeOptions::new())
        .build()
}

/// Registers `FinderTest` and seeds the store with one record per
/// (value, name) pair.
fn seeded(store: Arc<dyn Store>, seed: impl Fn(RecordHandle)) -> (Arc<Registry>, Arc<Model>) {
    let registry = Registry::builder()
        .model_with_store(finder_test(), store)
        .build()
        .expect("build registry");
    let model = registry.model("FinderTest").expect("registered model");
    for value in 0..NAMES.len() {
        for name in NAMES {
            let description = if value % 2 == 0 {
                "this is an even description"
            } else {
                "this is an odd description"
            };
            let record = model
                .new_record([
                    ("value", Value::from(value)),
                    ("name", Value::from(name)),
                    ("description", Value::from(description)),
                ])
                .unwrap();
            seed(record);
        }
    }
    (registry, model)
}

fn memory() -> (Arc<MemoryStore>, Arc<Registry>, Arc<Model>) {
    let store = Arc::new(MemoryStore::new());
    let seed_store = Arc::clone(&store);
    let (registry, model) = seeded(store.clone(), move |r| seed_store.insert(r));
    (store, registry, model)
}

#[test]
fn count_first_last() {
    let (store, _registry, model) = memory();
    assert_eq!(model.count(), NAMES.len() * NAMES.len());

    let all = store.records();
    assert!(model.first().unwrap().ptr_eq(&all[0]));
    assert!(model.last().unwrap().ptr_eq(&all[all.len() - 1]));
    assert_eq!(model.all().len(), all.len());
}

#[test]
fn random_records_vary() {
    let (_store, _registry, model) = memory();
    let x = model.random().unwrap();
    let mut tries = 0;
    let mut y = x.clone();
    while tries < 1000 && y.ptr_eq(&x) {
        tries += 1;
        y = model.random().unwrap();
    }
    assert!(!y.ptr_eq(&x));
}

#[test]
fn random_on_an_empty_store() {
    let registry = Registry::builder()
        .model(finder_test(), MemoryStore::new())
        .build()
        .unwrap();
    let model = registry.model("FinderTest").unwrap();
    assert!(model.random().is_none());
    assert!(model.first().is_none());
    assert_eq!(model.count(), 0);
}

#[test]
fn responds_to_declared_finders() {
    let (_store, _registry, model) = memory();
    assert!(model.responds_to("find_by_id"));
    assert!(model.responds_to("find_all_by_name_and_description"));
    assert!(model.responds_to("find_last_by_value"));
    assert!(!model.responds_to("find_by_colour"));
    assert!(!model.responds_to("count_by_name"));
    assert!(model.dispatch("find_by_colour", &[Value::from("red")]).unwrap().is_none());
}

#[test]
fn finds_by_id() {
    let (_store, _registry, model) = memory();
    let found = model.find(Value::from("bannana_3")).unwrap();
    let record = found.into_one().unwrap();
    assert_eq!(record.get("name").unwrap(), Value::from("bannana"));
    assert_eq!(record.get("value").unwrap(), Value::Int(3));
}

#[test]
fn find_raises_when_the_id_is_missing() {
    let (_store, _registry, model) = memory();
    let err = model.find(Value::from("rasberry_12")).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Couldn't find FinderTest with ID=rasberry_12");

    let err = model
        .dispatch("find", &[Value::from("rasberry_12")])
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn find_by_id_does_not_raise() {
    let (_store, _registry, model) = memory();
    let found = model
        .dispatch("find_by_id", &[Value::from("rasberry_12")])
        .unwrap();
    assert_eq!(found, Some(Found::One(None)));
}

#[test]
fn finds_many_ids_in_requested_order() {
    let (_store, _registry, model) = memory();
    let found = model
        .find(vec![Value::from("x_4"), Value::from("apple_0")])
        .unwrap()
        .into_vec();
    let ids: Vec<Value> = found.iter().map(RecordHandle::id).collect();
    assert_eq!(ids, vec![Value::from("x_4"), Value::from("apple_0")]);

    let err = model
        .find(vec![Value::from("x_4"), Value::from("zed_9")])
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Couldn't find all FinderTests with IDs (x_4, zed_9) \
         (found 1 results, but was looking for 2)"
    );

    let listed = model
        .dispatch("find", &[Value::Array(vec![Value::from("date_2")])])
        .unwrap()
        .unwrap();
    assert!(matches!(listed, Found::Many(ref records) if records.len() == 1));
}

#[test]
fn finds_by_a_single_attribute() {
    let (_store, _registry, model) = memory();

    let first = model
        .dispatch("find_by_name", &[Value::from("bannana")])
        .unwrap()
        .unwrap()
        .into_one()
        .unwrap();
    assert_eq!(first.id(), Value::from("bannana_0"));

    let last = model
        .find_last_by(&Filters::new().equals("name", "bannana"))
        .unwrap()
        .unwrap();
    assert_eq!(last.id(), Value::from("bannana_4"));

    let all = model
        .dispatch("find_all_by_name", &[Value::from("bannana")])
        .unwrap()
        .unwrap();
    assert!(matches!(all, Found::Many(_)));
    assert_eq!(all.len(), NAMES.len());
}

#[test]
fn finds_by_multiple_attributes() {
    let (_store, _registry, model) = memory();
    let args = [Value::from("bannana"), Value::from("this is an even description")];

    let one = model
        .dispatch("find_by_name_and_description", &args)
        .unwrap()
        .unwrap()
        .into_one();
    assert!(one.is_some());

    let all = model
        .dispatch("find_all_by_name_and_description", &args)
        .unwrap()
        .unwrap()
        .into_vec();
    assert_eq!(all.len(), 3);
    let values: Vec<Value> = all.iter().map(|r| r.get("value").unwrap()).collect();
    assert_eq!(values, vec![Value::Int(0), Value::Int(2), Value::Int(4)]);
}

#[test]
fn finder_arguments_are_coerced() {
    let (_store, _registry, model) = memory();
    let all = model
        .find_all_by(&Filters::new().equals("value", "3"))
        .unwrap();
    assert_eq!(all.len(), NAMES.len());

    let any = model
        .find_all_by(&Filters::new().any_of("name", ["apple", "x"]).equals("value", 1))
        .unwrap();
    let ids: Vec<Value> = any.iter().map(RecordHandle::id).collect();
    assert_eq!(ids, vec![Value::from("apple_1"), Value::from("x_1")]);
}

#[test]
fn unconvertible_arguments_match_blank_values() {
    let definition = ModelDefinition::builder("Counter")
        .attribute("label", AttributeOptions::string().identity(true))
        .attribute("value", AttributeOptions::integer())
        .build();
    let store = Arc::new(MemoryStore::new());
    let registry = Registry::builder()
        .model_with_store(definition, store.clone())
        .build()
        .unwrap();
    let model = registry.model("Counter").unwrap();
    store.insert(model.new_record([("label", "blank")]).unwrap());
    store.insert(
        model
            .new_record([("label", Value::from("three")), ("value", Value::Int(3))])
            .unwrap(),
    );

    let found = model
        .find_all_by(&Filters::new().equals("value", "abc"))
        .unwrap();
    let ids: Vec<Value> = found.iter().map(RecordHandle::id).collect();
    assert_eq!(ids, vec![Value::from("blank")]);

    let first = model
        .dispatch("find_by_value", &[Value::from("abc")])
        .unwrap()
        .unwrap()
        .into_one()
        .unwrap();
    assert_eq!(first.id(), Value::from("blank"));
}

#[test]
fn missing_arguments_find_nothing() {
    let (_store, _registry, model) = memory();
    let all = model
        .dispatch("find_all_by_name_and_value", &[Value::from("apple")])
        .unwrap();
    assert_eq!(all, Some(Found::Many(Vec::new())));
    let first = model.dispatch("find_by_name", &[]).unwrap();
    assert_eq!(first, Some(Found::One(None)));
}

#[test]
fn find_all_without_attributes_matches_everything() {
    let (_store, _registry, model) = memory();
    let all = model.dispatch("find_all", &[]).unwrap().unwrap();
    assert_eq!(all.len(), NAMES.len() * NAMES.len());
}

#[test]
fn undeclared_filter_attributes_are_errors() {
    let (_store, _registry, model) = memory();
    let err = model
        .find_by(&Filters::new().equals("colour", "red"))
        .unwrap_err();
    assert!(err.is_unknown_attribute());
}

/// Records every hint it receives and narrows candidates by name itself.
struct HintedStore {
    records: Mutex<Vec<RecordHandle>>,
    hints: Mutex<Vec<(FinderKind, Filters)>>,
}

impl Store for HintedStore {
    fn all(&self, _model: &Model) -> Vec<RecordHandle> {
        self.records.lock().unwrap().clone()
    }

    fn all_for(&self, model: &Model, hint: &Filters, kind: FinderKind) -> Vec<RecordHandle> {
        self.hints.lock().unwrap().push((kind, hint.clone()));
        let all = self.all(model);
        match hint.get("name") {
            Some(FilterValue::Eq(name)) => all
                .into_iter()
                .filter(|r| r.get("name").is_ok_and(|n| n == *name))
                .collect(),
            _ => all,
        }
    }
}

#[test]
fn stores_receive_hints() {
    let store = Arc::new(HintedStore {
        records: Mutex::new(Vec::new()),
        hints: Mutex::new(Vec::new()),
    });
    let seed_store = Arc::clone(&store);
    let (_registry, model) = seeded(store.clone(), move |r| {
        seed_store.records.lock().unwrap().push(r);
    });

    let found = model
        .dispatch("find_last_by_name", &[Value::from("date")])
        .unwrap()
        .unwrap()
        .into_one()
        .unwrap();
    assert_eq!(found.id(), Value::from("date_4"));

    model.find(Value::from("x_0")).unwrap();

    let hints = store.hints.lock().unwrap();
    assert_eq!(hints.len(), 2);
    assert_eq!(hints[0].0, FinderKind::Last);
    assert_eq!(hints[0].1, Filters::new().equals("name", "date"));
    assert_eq!(hints[1].0, FinderKind::Id);
    assert_eq!(hints[1].1.get("id"), Some(&FilterValue::Eq(Value::from("x_0"))));
}

#[test]
fn finder_aids_are_hints_only() {
    let definition = ModelDefinition::builder("Scoped")
        .attribute("name", AttributeOptions::string())
        .attribute("tenant", AttributeOptions::string().finder_aid(true))
        .build();
    let store = Arc::new(MemoryStore::new());
    let registry = Registry::builder()
        .model_with_store(definition, store.clone())
        .build()
        .unwrap();
    let model = registry.model("Scoped").unwrap();
    store.insert(model.new_record([("name", "a"), ("tenant", "one")]).unwrap());
    store.insert(model.new_record([("name", "a"), ("tenant", "two")]).unwrap());

    let found = model
        .dispatch("find_all_by_name_and_tenant", &[Value::from("a"), Value::from("three")])
        .unwrap()
        .unwrap();
    assert_eq!(found.len(), 2);
}
