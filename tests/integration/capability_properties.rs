use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;
use switchboard::capability::{CapabilityRegistry, ToolDescriptor};
use switchboard::ApiError;

fn tool_returning(name: &str, marker: usize) -> ToolDescriptor {
    ToolDescriptor::builder(name)
        .description("Return a marker")
        .handler(move |_| async move { Ok(json!(marker)) })
        .build()
        .unwrap()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn duplicate_names_leave_one_entry_last_wins(
        names in prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d"]), 1..20)
    ) {
        let registry = CapabilityRegistry::new();
        for (marker, name) in names.iter().enumerate() {
            registry.register_tool(tool_returning(name, marker)).unwrap();
        }

        let distinct: HashSet<&str> = names.iter().copied().collect();
        prop_assert_eq!(registry.list_tools().len(), distinct.len());

        let rt = runtime();
        for name in distinct {
            let last = names.iter().rposition(|n| *n == name).unwrap();
            let outcome = rt.block_on(registry.invoke_tool(name, json!({}))).unwrap();
            prop_assert_eq!(outcome.content, json!(last));
        }
    }

    #[test]
    fn registered_tools_never_fail_invocation(fail in any::<bool>(), panic in any::<bool>()) {
        let registry = CapabilityRegistry::new();
        registry
            .register_tool(
                ToolDescriptor::builder("flaky")
                    .description("Fails on request")
                    .handler(move |params| async move {
                        if panic {
                            panic!("boom");
                        }
                        if fail {
                            return Err(ApiError::handler("requested failure"));
                        }
                        Ok(params)
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let outcome = runtime()
            .block_on(registry.invoke_tool("flaky", json!({"ok": true})))
            .unwrap();
        prop_assert_eq!(outcome.is_error, fail || panic);
        if outcome.is_error {
            prop_assert!(outcome.error_message().is_some());
        } else {
            prop_assert_eq!(outcome.content, json!({"ok": true}));
        }
    }
}

#[tokio::test]
async fn unknown_tool_and_resource_are_not_found() {
    let registry = CapabilityRegistry::new();
    assert!(matches!(
        registry.invoke_tool("nope", json!({})).await,
        Err(ApiError::ToolNotFound(_))
    ));
    assert!(matches!(
        registry.get_resource("nope", json!({})).await,
        Err(ApiError::ResourceNotFound(_))
    ));
}
