//! Vergleich aller Strategien auf demselben Item-Satz.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::model::Item;
use crate::packer::{PackingConfig, Strategy, run_to_completion};
use crate::types::Dimensions;

/// Ergebnis einer Strategie im Vergleich.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StrategyBenchmark {
    pub strategy: Strategy,
    pub label: String,
    pub utilization_percent: f64,
    pub packed: usize,
    pub unpacked: usize,
    /// Laufzeit in Millisekunden
    pub elapsed_ms: f64,
}

fn run_one(
    strategy: Strategy,
    items: &[Item],
    container: Dimensions,
    config: &PackingConfig,
) -> StrategyBenchmark {
    let started = Instant::now();
    let state = run_to_completion(
        strategy,
        items.to_vec(),
        container,
        config.support_ratio,
        Some(config.heuristic),
    );
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    info!(
        strategy = strategy.label(),
        utilization_percent = state.utilization_percent(),
        elapsed_ms,
        "📊 benchmark run"
    );

    StrategyBenchmark {
        strategy,
        label: strategy.label().to_string(),
        utilization_percent: state.utilization_percent(),
        packed: state.packed.len(),
        unpacked: state.unpacked.len(),
        elapsed_ms,
    }
}

/// Packt die Items mit jeder Strategie und liefert die Ergebnisse in der
/// Reihenfolge von `Strategy::ALL`.
///
/// # Parameter
/// * `items` - Item-Satz, für jede Strategie unverändert übernommen
/// * `container` - Containerabmessungen
/// * `config` - Stützrate und Raumheuristik
pub fn benchmark_strategies(
    items: &[Item],
    container: Dimensions,
    config: &PackingConfig,
) -> Vec<StrategyBenchmark> {
    Strategy::ALL
        .iter()
        .map(|&strategy| run_one(strategy, items, container, config))
        .collect()
}

/// Wie `benchmark_strategies`, gibt aber nach jedem Lauf die Kontrolle an
/// den Scheduler zurück.
pub async fn benchmark_strategies_cooperative(
    items: &[Item],
    container: Dimensions,
    config: &PackingConfig,
) -> Vec<StrategyBenchmark> {
    let mut results = Vec::with_capacity(Strategy::ALL.len());
    for strategy in Strategy::ALL {
        results.push(run_one(strategy, items, container, config));
        tokio::task::yield_now().await;
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GeneratorConfig, generate_items};
    use crate::types::Vec3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fixture() -> (Vec3, Vec<Item>) {
        let container = Vec3::new(100.0, 80.0, 60.0);
        let config = GeneratorConfig {
            item_count: 15,
            min_side: 8.0,
            ..GeneratorConfig::default()
        };
        let items = generate_items(container, &config, &mut StdRng::seed_from_u64(4));
        (container, items)
    }

    #[test]
    fn covers_every_strategy() {
        let (container, items) = fixture();
        let results = benchmark_strategies(&items, container, &PackingConfig::default());

        let strategies: Vec<Strategy> = results.iter().map(|r| r.strategy).collect();
        assert_eq!(strategies, Strategy::ALL.to_vec());
        for r in &results {
            assert_eq!(r.packed + r.unpacked, items.len());
            assert!(r.utilization_percent > 0.0 && r.utilization_percent <= 100.0 + 1e-9);
            assert!(r.elapsed_ms >= 0.0);
            assert_eq!(r.label, r.strategy.label());
        }
    }

    #[test]
    fn conflict_graph_matches_first_fit() {
        let (container, items) = fixture();
        let results = benchmark_strategies(&items, container, &PackingConfig::default());
        let first_fit = &results[0];
        let conflict = &results[3];
        assert_eq!(first_fit.packed, conflict.packed);
        assert!((first_fit.utilization_percent - conflict.utilization_percent).abs() < 1e-9);
    }

    #[tokio::test]
    async fn cooperative_loop_reports_the_same_numbers() {
        let (container, items) = fixture();
        let config = PackingConfig::default();
        let blocking = benchmark_strategies(&items, container, &config);
        let cooperative = benchmark_strategies_cooperative(&items, container, &config).await;

        assert_eq!(blocking.len(), cooperative.len());
        for (a, b) in blocking.iter().zip(&cooperative) {
            assert_eq!(a.strategy, b.strategy);
            assert_eq!(a.packed, b.packed);
            assert!((a.utilization_percent - b.utilization_percent).abs() < 1e-9);
        }
    }
}
