// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! ForEach over road traffic locations, sequential and parallel

#[path = "testutils/mod.rs"]
mod testutils;

#[cfg(test)]
mod for_each {
    use super::testutils::road_traffic_graph;
    use graphchain::plan::{FailurePolicy, ForEach, GetAdjacentIds, ToVertices};
    use graphchain::{
        Context, EntitySeed, GraphError, Item, Operation, OperationChain, User, Value, View, ViewElementDefinition,
    };

    fn roads_of_location() -> OperationChain {
        OperationChain::builder()
            .first(Operation::ToSingletonList)
            .then(GetAdjacentIds::new().view(View::new().edge("LocationContainsRoad", ViewElementDefinition::new())))
            .then(ToVertices::new())
            .build()
            .expect("Failed to build sub-chain")
    }

    fn roads_by_location(parallel: bool) -> OperationChain {
        OperationChain::builder()
            .first(
                GetAdjacentIds::new()
                    .input([EntitySeed::new("South West")])
                    .view(View::new().edge("RegionContainsLocation", ViewElementDefinition::new())),
            )
            .then(ForEach::new(roads_of_location()).parallel(parallel))
            .build()
            .expect("Failed to build chain")
    }

    fn strings(values: Vec<Value>) -> Vec<String> {
        values.into_iter().map(|v| v.to_string()).collect()
    }

    fn mixed_input() -> Vec<Item> {
        vec![
            EntitySeed::new("Swindon").into(),
            Value::Long(5).into(),
            EntitySeed::new("Plymouth").into(),
        ]
    }

    #[test]
    fn runs_sub_chain_per_location() {
        let graph = road_traffic_graph();
        let roads = graph
            .execute(&roads_by_location(false), &User::new("user01"))
            .expect("Execution failed")
            .into_values()
            .expect("Results were not values");
        assert_eq!(strings(roads), vec!["M4", "M32", "M5", "M4", "A38"]);
        assert_eq!(graph.stats().open_cursors, 0);
    }

    #[test]
    fn parallel_keeps_outer_order() {
        let graph = road_traffic_graph();
        let roads = graph
            .execute(&roads_by_location(true), &User::new("user01"))
            .expect("Execution failed")
            .into_values()
            .expect("Results were not values");
        assert_eq!(strings(roads), vec!["M4", "M32", "M5", "M4", "A38"]);
        assert_eq!(graph.stats().open_cursors, 0);
    }

    #[test]
    fn continue_records_failed_iterations() {
        let graph = road_traffic_graph();
        let chain = OperationChain::of(
            ForEach::new(roads_of_location())
                .input(mixed_input())
                .failure_policy(FailurePolicy::Continue),
        )
        .expect("Failed to build chain");
        let ctx = Context::new(User::new("user01"));
        let roads = graph
            .execute_with(&chain, &ctx)
            .expect("Execution failed")
            .into_values()
            .expect("Results were not values");
        assert_eq!(strings(roads), vec!["M4", "A38"]);
        assert_eq!(ctx.failed_iterations(), vec![1]);
        assert_eq!(graph.stats().open_cursors, 0);
    }

    #[test]
    fn fail_fast_stops_at_first_failure() {
        let graph = road_traffic_graph();
        let chain = OperationChain::of(ForEach::new(roads_of_location()).input(mixed_input()))
            .expect("Failed to build chain");
        let ctx = Context::new(User::new("user01"));
        let err = graph
            .execute_with(&chain, &ctx)
            .and_then(|output| output.into_values())
            .unwrap_err();
        assert_eq!(err.position(), Some(0));
        assert!(matches!(err.root_cause(), GraphError::InvalidOperation(_)));
        assert_eq!(ctx.failure_count(), 0);
        assert_eq!(graph.stats().open_cursors, 0);
    }

    #[test]
    fn empty_input_runs_nothing() {
        let graph = road_traffic_graph();
        let before = graph.stats();
        let chain = OperationChain::of(ForEach::new(roads_of_location())).expect("Failed to build chain");
        let output = graph
            .execute(&chain, &User::new("user01"))
            .expect("Execution failed")
            .into_items()
            .expect("Failed to collect items");
        assert!(output.is_empty());
        assert_eq!(graph.stats(), before);
    }
}
