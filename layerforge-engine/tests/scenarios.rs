//! End-to-end scenarios driving `Orchestrator` through its public surface
//! with small hand-written transformers standing in for the caller's real
//! rewrite rules.

use std::collections::HashMap;
use std::sync::Arc;

use layerforge_core::{EngineConfig, LayerId};
use layerforge_engine::{
    ExecuteOptions, LayerTransformers, Orchestrator, Parser, StructuralTransformer, Transformer,
    TransformError, TreeSitterParser,
};

fn textual(f: impl Fn(&str) -> Result<String, TransformError> + Send + Sync + 'static) -> LayerTransformers {
    LayerTransformers { textual: Arc::new(f), structural: None }
}

fn refusing_structural() -> Arc<dyn StructuralTransformer> {
    Arc::new(|_code: &str, _tree: &tree_sitter::Tree| -> Result<String, TransformError> {
        Err(TransformError::new("structural rewrite not attempted in this fixture"))
    })
}

fn orchestrator_with(transformers: HashMap<LayerId, LayerTransformers>) -> Orchestrator {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut map = rustc_hash::FxHashMap::default();
    for (layer, t) in transformers {
        map.insert(layer, t);
    }
    Orchestrator::new(EngineConfig::default(), Arc::new(TreeSitterParser::new()), map)
}

/// S2 — Components: a `.map` callback returns markup with no `key`
/// attribute; the registered layer adds one via its textual fallback
/// (the structural transformer in this fixture always declines).
#[tokio::test]
async fn missing_key_is_added_by_the_components_layer() {
    let mut transformers = HashMap::new();
    transformers.insert(LayerId::Configuration, textual(|code| Ok(code.to_string())));
    transformers.insert(LayerId::Patterns, textual(|code| Ok(code.to_string())));
    transformers.insert(
        LayerId::Components,
        LayerTransformers {
            textual: Arc::new(|code: &str| {
                Ok(code.replace("<li>{i.name}</li>", "<li key={i.id}>{i.name}</li>"))
            }),
            structural: Some(refusing_structural()),
        },
    );

    let orchestrator = orchestrator_with(transformers);
    let source = "function L({items}){return (<ul>{items.map(i => <li>{i.name}</li>)}</ul>);}";

    let result = orchestrator
        .execute(source, &[3], ExecuteOptions::default())
        .await
        .expect("execute succeeds");

    assert!(result.success);
    assert!(result.final_code.contains("key={i.id}"));
    let components = result
        .per_layer
        .iter()
        .find(|l| l.layer_id == LayerId::Components)
        .expect("components layer ran");
    assert_eq!(components.outcome, "accepted");
}

/// S3 — Hydration: a browser-only API call has no `typeof window` guard;
/// the registered layer wraps it. Requesting layer 4 alone pulls in its
/// full dependency closure (1-3) rather than running in isolation.
#[tokio::test]
async fn unguarded_browser_api_gets_a_typeof_window_guard() {
    let mut transformers = HashMap::new();
    transformers.insert(LayerId::Configuration, textual(|code| Ok(code.to_string())));
    transformers.insert(LayerId::Patterns, textual(|code| Ok(code.to_string())));
    transformers.insert(LayerId::Components, textual(|code| Ok(code.to_string())));
    transformers.insert(
        LayerId::Hydration,
        textual(|code| {
            Ok(code.replace(
                "localStorage.getItem(\"k\")",
                "typeof window !== \"undefined\" ? localStorage.getItem(\"k\") : null",
            ))
        }),
    );

    let orchestrator = orchestrator_with(transformers);
    let source = r#"const v = localStorage.getItem("k");"#;

    let result = orchestrator
        .execute(source, &[4], ExecuteOptions::default())
        .await
        .expect("execute succeeds");

    assert!(result.success);
    assert!(result.final_code.contains("typeof window"));
    assert!(result.per_layer.iter().any(|l| l.layer_id == LayerId::Configuration));
    assert!(result.per_layer.iter().any(|l| l.layer_id == LayerId::Patterns));
    assert!(result.per_layer.iter().any(|l| l.layer_id == LayerId::Components));
    assert!(result.per_layer.iter().any(|l| l.layer_id == LayerId::Hydration && l.outcome == "accepted"));
}

/// S6 — Recommendation: `analyse` surfaces the minimal dependency-closed
/// layer set plus evidence, without running any transformer.
#[tokio::test]
async fn analyse_recommends_layers_without_executing_them() {
    let orchestrator = orchestrator_with(HashMap::new());
    let source = "function L({items}){return (<ul>{items.map(i => <li>{i.name}</li>)}</ul>);}";

    let recommendation = orchestrator.analyse(source);

    assert_eq!(
        recommendation.layers,
        vec![LayerId::Configuration, LayerId::Patterns, LayerId::Components]
    );
    assert!(recommendation.confidence > 0.0);
    assert!(recommendation.evidence.iter().any(|issue| issue.kind == "map_without_key"));
}

/// A syntactically invalid `before` does not, by itself, force a revert —
/// `SyntaxValidator` reports the same parse failure on both sides and the
/// orchestrator records a category on whatever layer raised the failure,
/// rather than forcing every layer that touches the text to Revert.
#[tokio::test]
async fn already_invalid_source_is_not_force_reverted_by_syntax_alone() {
    let parser = TreeSitterParser::new();
    let source = "function broken( {";
    assert!(matches!(parser.parse(source), layerforge_engine::TreeOrError::Err(_)));

    let mut transformers = HashMap::new();
    transformers.insert(LayerId::Configuration, textual(|code| Ok(format!("{code} // touched"))));
    let orchestrator = orchestrator_with(transformers);

    let result = orchestrator
        .execute(source, &[1], ExecuteOptions::default())
        .await
        .expect("execute succeeds");

    let configuration = result
        .per_layer
        .iter()
        .find(|l| l.layer_id == LayerId::Configuration)
        .expect("configuration layer ran");
    assert_eq!(configuration.outcome, "accepted");
}
