//! Startup-time decorations, the process-wide storage, and configuration-driven registration.

use cds_routing::prelude::*;
use cds_routing::{
    collect_decorators, combined_handler, metadata_storage, reset_container, RoutingConfig,
    SubscriptionPhase, ALL_EVENTS,
};
use cds_routing_testkit::*;
use serde_json::{json, Value};
use serial_test::serial;
use std::io::Write;

mod app {
    pub mod handlers {
        use cds_routing::prelude::*;
        use serde_json::{json, Value};

        #[derive(Default)]
        pub struct GreeterHandler;

        impl GreeterHandler {
            async fn read(self: Arc<Self>, args: Arguments) -> anyhow::Result<Value> {
                let name = args.param::<String>(0)?.unwrap_or_default();
                Ok(json!({ "greeting": format!("Hello {name}") }))
            }
        }

        #[derive(Default)]
        pub struct Farewell;

        fn decorate(storage: &MetadataStorage) {
            Handler::<GreeterHandler>::new()
                .entity("Greeter")
                .uses::<super::middlewares::Audit>()
                .method(Method::new("read", GreeterHandler::read).on_read().param(0, "name"))
                .apply(storage);
            Handler::<Farewell>::new()
                .method(
                    Method::new("bye", |_this: Arc<Farewell>, _args: Arguments| async move {
                        Ok("bye")
                    })
                    .func("sayGoodbye"),
                )
                .apply(storage);
        }

        cds_routing::inventory::submit!(Decorators::new(decorate));
    }

    pub mod middlewares {
        use cds_routing::prelude::*;

        #[derive(Default)]
        pub struct Audit;

        #[derive(Default)]
        pub struct Tenant;

        fn decorate(storage: &MetadataStorage) {
            Middleware::<Audit>::new()
                .handle(|_this: Arc<Audit>, _args: Arguments| async move { Ok(()) })
                .apply(storage);
            Middleware::<Tenant>::new()
                .global(true)
                .priority(1)
                .handle(|_this: Arc<Tenant>, _args: Arguments| async move { Ok(()) })
                .apply(storage);
        }

        cds_routing::inventory::submit!(Decorators::new(decorate));
    }
}

fn fresh_storage() -> Arc<MetadataStorage> {
    let storage = metadata_storage();
    storage.reset();
    collect_decorators(&storage);
    reset_container();
    storage
}

#[test]
#[serial]
fn test_submitted_decorations_reach_global_storage() {
    let storage = fresh_storage();
    assert_eq!(storage.handlers().len(), 2);
    assert_eq!(storage.middlewares().len(), 2);

    storage.reset();
    assert!(storage.annotated_classes().is_empty());
    assert_eq!(collect_decorators(&storage), 2);
    assert_eq!(storage.annotated_classes().len(), 4);
}

#[tokio::test]
#[serial]
async fn test_register_by_glob_on_global_storage() {
    fresh_storage();
    let service = RecordingService::new("GreeterService");

    let report = register(
        service.as_host(),
        &RegisterOptions::new().handler("**/app/handlers/*"),
    )
    .unwrap();

    assert!(report.is_complete());
    assert_eq!(
        service.calls(),
        vec![
            RecordedCall::new(SubscriptionPhase::Before, ALL_EVENTS, None),
            RecordedCall::new(SubscriptionPhase::Before, ALL_EVENTS, Some("Greeter")),
            RecordedCall::new(SubscriptionPhase::On, "READ", Some("Greeter")),
            RecordedCall::new(SubscriptionPhase::On, "sayGoodbye", None),
        ]
    );

    let result = service
        .dispatch(
            SubscriptionPhase::On,
            "READ",
            Some("Greeter"),
            entity_request("READ", "Greeter", json!({"name": "Ann"})),
            None,
        )
        .await
        .unwrap();
    assert_eq!(result, Some(json!({"greeting": "Hello Ann"})));
}

#[tokio::test]
#[serial]
async fn test_combined_handler_from_config_file() {
    fresh_storage();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "handlers = [\"**/app/handlers/Farewell\"]\nmiddlewares = [\"**/app/middlewares/Tenant\"]"
    )
    .unwrap();

    let config = RoutingConfig::load_from_file(file.path()).unwrap();
    let options = RegisterOptions::from_config(&config).unwrap();
    let handler = combined_handler(options);

    let service = RecordingService::new("FarewellService");
    let report = handler(service.as_host()).unwrap();
    assert_eq!(report.subscriptions.len(), 2);
    assert_eq!(
        service.calls(),
        vec![
            RecordedCall::new(SubscriptionPhase::Before, ALL_EVENTS, None),
            RecordedCall::new(SubscriptionPhase::On, "sayGoodbye", None),
        ]
    );

    let result = service
        .dispatch(
            SubscriptionPhase::On,
            "sayGoodbye",
            None,
            Request::builder("sayGoodbye").build(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(result, Some(Value::String("bye".into())));
}

#[test]
#[serial]
fn test_unmatched_glob_registers_only_middlewares() {
    // Entity scoping comes from every declared handler, not just the matched ones.
    fresh_storage();
    let service = RecordingService::new("EmptyService");
    let report = register(
        service.as_host(),
        &RegisterOptions::new().handler("**/nothing/here/*"),
    )
    .unwrap();

    assert_eq!(service.count(SubscriptionPhase::On, "READ"), 0);
    let sources: Vec<_> = report
        .subscriptions
        .iter()
        .map(|subscription| subscription.source.as_str())
        .collect();
    assert_eq!(sources, ["Tenant::use", "Audit::use"]);
}
