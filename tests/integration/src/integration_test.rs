//! End-to-end integration tests
//!
//! These exercise the complete flow: context document on disk -> overrides
//! -> stage resolution -> typed context -> deployment plan.

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use telemetry_context::{
    ContextResolver, ContextStore, Error, ResolverOptions, ServiceKind, has_errors,
};
use telemetry_plan::{PipelinePlan, StackRole};
use telemetry_test_utils::{TestProject, sample_document};

/// Write the sample document in the format implied by `name`
fn write_sample(project: &TestProject, name: &str) -> std::path::PathBuf {
    let doc = sample_document();
    match name.rsplit('.').next() {
        Some("json") => project.write_json(name, &doc),
        Some("toml") => project.write(name, &toml::to_string(&doc).unwrap()),
        Some("yaml") | Some("yml") => project.write(name, &serde_yaml::to_string(&doc).unwrap()),
        other => panic!("unexpected extension {:?}", other),
    }
}

fn plan_from(path: &std::path::Path, stage: &str) -> PipelinePlan {
    let store = ContextStore::load(path)
        .unwrap()
        .with_overrides([format!("stage={}", stage)])
        .unwrap();
    let resolved = ContextResolver::new().resolve(&store).unwrap();
    PipelinePlan::build(&resolved.to_app_context().unwrap()).unwrap()
}

#[rstest]
#[case("cdk.json")]
#[case("context.toml")]
#[case("context.yaml")]
fn document_format_does_not_change_the_plan(#[case] name: &str) {
    let project = TestProject::new();
    let reference = plan_from(&write_sample(&project, "cdk.json"), "prod");

    let plan = plan_from(&write_sample(&project, name), "prod");
    assert_eq!(plan.stack_ids(), reference.stack_ids());
    assert_eq!(plan.fingerprint().unwrap(), reference.fingerprint().unwrap());
}

#[test]
fn stage_values_flow_into_the_plan() {
    let project = TestProject::with_sample();
    let dev = plan_from(&project.path("cdk.json"), "dev");
    let prod = plan_from(&project.path("cdk.json"), "prod");

    assert_eq!(dev.environment.account, "111111111111");
    assert_eq!(prod.environment.account, "222222222222");

    let dev_processor = dev.service("processor").unwrap();
    let prod_processor = prod.service("processor").unwrap();
    assert_eq!(dev_processor.desired_count, 1);
    assert_eq!(prod_processor.desired_count, 2);
    assert_eq!(dev_processor.memory_mib, 2048);
    assert_eq!(prod_processor.memory_mib, 4096);

    // Inbound services are untouched by prod and so identical in shape
    let names = |plan: &PipelinePlan| -> Vec<(String, ServiceKind)> {
        plan.services()
            .filter(|s| s.name != "processor")
            .map(|s| (s.name.clone(), s.kind))
            .collect()
    };
    assert_eq!(names(&dev), names(&prod));
}

#[test]
fn command_line_desired_count_reaches_services() {
    let project = TestProject::with_sample();
    let store = ContextStore::load(&project.path("cdk.json"))
        .unwrap()
        .with_overrides(["stage=prod", "desired_count=3"])
        .unwrap();
    let resolved = ContextResolver::new().resolve(&store).unwrap();
    let plan = PipelinePlan::build(&resolved.to_app_context().unwrap()).unwrap();

    assert_eq!(plan.service("beats").unwrap().desired_count, 3);
    // An explicit per-service count still wins
    assert_eq!(plan.service("processor").unwrap().desired_count, 2);
}

#[test]
fn custom_selector_and_branch_names() {
    let project = TestProject::new();
    let path = project.write_json(
        "cdk.json",
        &json!({
            "context": {
                "env": "qa",
                "common": {"aws_region": "eu-west-1", "tags": {"team": "observability"}},
                "qa": {"account_id": "333333333333", "tags": {"cost_centre": "42"}}
            }
        }),
    );

    let resolver = ContextResolver::with_options(ResolverOptions {
        stage_selector: "env".into(),
        shared_branch: "common".into(),
        default_desired_count: 2,
        ..ResolverOptions::default()
    });
    let resolved = resolver.resolve(&ContextStore::load(&path).unwrap()).unwrap();

    assert_eq!(resolved.stage(), "qa");
    assert_eq!(resolved.default_desired_count(), 2);
    let view = resolved.view();
    assert_eq!(view.require("tags").unwrap().keys(), vec!["cost_centre", "team"]);
    assert_eq!(view.require("stage").unwrap().as_str(), Some("qa"));
    assert!(view.get("env").is_none());
}

#[test]
fn custom_selector_still_yields_a_typed_context() {
    let mut doc = sample_document();
    let context = doc["context"].as_object_mut().unwrap();
    let shared = context.remove("shared").unwrap();
    context.insert("common".into(), shared);
    let project = TestProject::new();
    let path = project.write_json("cdk.json", &doc);

    let store = ContextStore::load(&path)
        .unwrap()
        .with_overrides(["env=prod", "instances=3"])
        .unwrap();
    let resolver = ContextResolver::with_options(ResolverOptions {
        stage_selector: "env".into(),
        desired_count_selector: "instances".into(),
        shared_branch: "common".into(),
        ..ResolverOptions::default()
    });
    let ctx = resolver.resolve(&store).unwrap().to_app_context().unwrap();

    assert_eq!(ctx.stage, "prod");
    assert_eq!(ctx.default_desired_count, 3);
    assert_eq!(ctx.account_id, "222222222222");

    let plan = PipelinePlan::build(&ctx).unwrap();
    assert_eq!(plan.stack_ids()[0], "prod-telemetry-logstash-queue");
}

#[test]
fn unresolvable_context_yields_none_from_try_resolve() {
    let project = TestProject::with_sample();
    let store = ContextStore::load(&project.path("cdk.json")).unwrap();

    let resolver = ContextResolver::new();
    assert!(resolver.try_resolve(&store).is_none());
    assert!(matches!(
        resolver.resolve(&store),
        Err(Error::MissingSelector { .. })
    ));
}

#[test]
fn broken_stage_is_caught_before_planning() {
    let mut doc = sample_document();
    doc["context"]["shared"]
        .as_object_mut()
        .unwrap()
        .remove("ingress_cidr");
    let project = TestProject::new();
    let path = project.write_json("cdk.json", &doc);

    let store = ContextStore::load(&path)
        .unwrap()
        .with_overrides(["stage=dev"])
        .unwrap();
    let ctx = ContextResolver::new()
        .resolve(&store)
        .unwrap()
        .to_app_context()
        .unwrap();

    assert!(has_errors(&ctx.validate()));
    match PipelinePlan::build(&ctx) {
        Err(telemetry_plan::Error::Invalid { issues }) => {
            assert_eq!(issues[0].path, "ingress_cidr");
        }
        other => panic!("expected invalid context, got {:?}", other.map(|p| p.stage)),
    }
}

#[test]
fn every_stack_shares_the_stage_environment() {
    let project = TestProject::with_sample();
    let plan = plan_from(&project.path("cdk.json"), "prod");

    for role in StackRole::ALL {
        let stack = plan.stack(role).unwrap();
        assert_eq!(stack.id, role.stack_id("prod"));
        assert_eq!(stack.environment, plan.environment);
    }
}
