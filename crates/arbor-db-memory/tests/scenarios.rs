use std::sync::Arc;

use arbor_core::{Context, Resource, User};
use arbor_db_memory::InMemoryPolicyStore;
use arbor_policy::builtin::{PassThroughRule, PurposeRule, SerialisedFormatRule};
use arbor_policy::{AccessEvaluator, Policy, PolicyStore, RecordLevel, ResourceLevel, predicate_fn};

fn owner() -> User {
    User::new("policy-owner")
}

fn file_system() -> (Resource, Resource) {
    let system = Resource::system("/file");
    let temp = Resource::directory("/file/temp", &system).expect("directory");
    (system, temp)
}

fn test_file(parent: &Resource, name: &str, resource_type: &str) -> Resource {
    Resource::leaf(format!("{}/{name}", parent.id()), parent)
        .resource_type(resource_type)
        .serialised_format("txt")
        .build()
        .expect("leaf")
}

#[test]
fn system_and_file_rules_merge_root_first() {
    let store = Arc::new(InMemoryPolicyStore::new());
    let evaluator = AccessEvaluator::new(store.clone());
    let (system, temp) = file_system();
    let file = test_file(&temp, "TestObj_001.txt", "TestObj1");

    evaluator
        .set_resource_policy(
            &system,
            Policy::new(owner())
                .resource_level_rule("Resource serialised format is txt", SerialisedFormatRule::new("txt")),
        )
        .expect("set system policy");
    evaluator
        .set_resource_policy(
            &file,
            Policy::new(owner()).resource_level_rule("Input is not null", PassThroughRule),
        )
        .expect("set file policy");

    let rules = evaluator
        .resolver()
        .applicable_rules::<ResourceLevel>(&file, "TestObj1")
        .expect("resolve")
        .expect("policy found");

    assert_eq!(rules.len(), 2);
    assert_eq!(
        rules.message(),
        "Resource serialised format is txt, Input is not null"
    );

    let visible = evaluator
        .can_access(&User::new("alice"), &Context::new("fun"), vec![file.clone()])
        .expect("can_access");
    assert_eq!(visible, vec![file]);
}

#[test]
fn resource_without_policy_is_invisible() {
    let evaluator = AccessEvaluator::new(Arc::new(InMemoryPolicyStore::new()));
    let (_, temp) = file_system();
    let file = test_file(&temp, "orphan.txt", "Unpoliced");

    let rules = evaluator
        .resolver()
        .applicable_rules::<ResourceLevel>(&file, "Unpoliced")
        .expect("resolve");
    assert!(rules.is_none());

    let visible = evaluator
        .can_access(&User::new("alice"), &Context::new("fun"), vec![file])
        .expect("can_access");
    assert!(visible.is_empty());
}

#[test]
fn type_policy_restricts_only_its_type() {
    let evaluator = AccessEvaluator::new(Arc::new(InMemoryPolicyStore::new()));
    let (system, temp) = file_system();
    let file1 = test_file(&temp, "one.txt", "TestObj1");
    let file2 = test_file(&temp, "two.txt", "TestObj2");
    let user = User::new("alice");
    let fun = Context::new("fun");

    evaluator
        .set_resource_policy(&system, Policy::new(owner()))
        .expect("set system policy");

    let before = evaluator
        .can_access(&user, &fun, vec![file1.clone(), file2.clone()])
        .expect("can_access");
    assert_eq!(before, vec![file1.clone(), file2.clone()]);

    evaluator
        .set_type_policy(
            "TestObj2",
            Policy::new(owner()).resource_level_rule("purpose is testing", PurposeRule::new("testing")),
        )
        .expect("set type policy");

    let after = evaluator
        .can_access(&user, &fun, vec![file1.clone(), file2.clone()])
        .expect("can_access");
    assert_eq!(after, vec![file1.clone()]);

    let testing = evaluator
        .can_access(&user, &Context::new("testing"), vec![file1.clone(), file2.clone()])
        .expect("can_access");
    assert_eq!(testing, vec![file1, file2]);
}

#[test]
fn directory_record_rules_precede_file_record_rules() {
    let store = Arc::new(InMemoryPolicyStore::new());
    let evaluator = AccessEvaluator::new(store.clone());
    let (_, temp) = file_system();
    let file = test_file(&temp, "employees.txt", "Employee");

    store
        .set_by_resource(
            &temp,
            Policy::new(owner()).record_level_rule(
                "redact salary",
                predicate_fn(|_: &serde_json::Value, _: &User, _: &Context| true),
            ),
        )
        .expect("set directory policy");
    store
        .set_by_resource(
            &file,
            Policy::new(owner()).record_level_rule(
                "redact name",
                predicate_fn(|_: &serde_json::Value, _: &User, _: &Context| true),
            ),
        )
        .expect("set file policy");

    let rules = evaluator
        .resolver()
        .applicable_rules::<RecordLevel>(&file, "Employee")
        .expect("resolve")
        .expect("policy found");
    let names: Vec<&str> = rules.names().collect();
    assert_eq!(names, vec!["redact salary", "redact name"]);

    let policies = evaluator
        .get_policy(vec![file.clone()], &User::new("alice"), &Context::new("fun"))
        .expect("get_policy");
    assert_eq!(policies[&file].message(), "redact salary, redact name");
}
