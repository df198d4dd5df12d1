// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Operation chains loaded from JSON

#[path = "testutils/mod.rs"]
mod testutils;

#[cfg(test)]
mod chain_json {
    use super::testutils::road_traffic_graph;
    use graphchain::plan::{GetAdjacentIds, GetElements, Limit, ToVertices};
    use graphchain::{EntitySeed, GraphError, Operation, OperationChain, User, Value, View, ViewElementDefinition};
    use std::io::Write;

    fn junctions_of_m4() -> OperationChain {
        OperationChain::builder()
            .first(
                GetAdjacentIds::new()
                    .input([EntitySeed::new("M4")])
                    .view(View::new().edge("RoadHasJunction", ViewElementDefinition::new())),
            )
            .then(ToVertices::new())
            .then(Operation::ToSet)
            .then(Limit::new(10))
            .build()
            .expect("Failed to build chain")
    }

    #[test]
    fn json_chain_runs_like_the_built_one() {
        let graph = road_traffic_graph();
        let chain = junctions_of_m4();
        let loaded = OperationChain::from_json(&chain.to_json().expect("Failed to serialize chain"))
            .expect("Failed to parse chain");
        assert_eq!(loaded, chain);

        let user = User::new("user01");
        let expected = graph
            .execute(&chain, &user)
            .expect("Execution failed")
            .into_values()
            .expect("Results were not values");
        let actual = graph
            .execute(&loaded, &user)
            .expect("Execution failed")
            .into_values()
            .expect("Results were not values");
        assert_eq!(actual, expected);
        assert_eq!(expected.len(), 4);
    }

    #[test]
    fn hand_written_chain() {
        let graph = road_traffic_graph();
        let chain = OperationChain::from_json(r#"{"operations":[{"class":"GetAllElements"},{"class":"Count"}]}"#)
            .expect("Failed to parse chain");
        assert_eq!(chain.len(), 2);
        let count = graph
            .execute(&chain, &User::new("user01"))
            .expect("Execution failed")
            .into_values()
            .expect("Count was not a value");
        assert_eq!(count.len(), 1);
        assert!(matches!(count[0], Value::Long(n) if n > 0));
    }

    #[test]
    fn chain_file_with_seeds() {
        let graph = road_traffic_graph();
        let chain = OperationChain::of(
            GetElements::new()
                .input([EntitySeed::new("M4:LA Boundary")])
                .view(View::new().entity("JunctionUse", ViewElementDefinition::new())),
        )
        .expect("Failed to build chain");
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(chain.to_json().expect("Failed to serialize chain").as_bytes())
            .expect("Failed to write chain");

        let loaded = OperationChain::from_json_file(file.path()).expect("Failed to load chain");
        let elements = graph
            .execute(&loaded, &User::new("user01"))
            .expect("Execution failed")
            .into_elements()
            .expect("Results were not elements");
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn mismatched_json_chain_is_rejected() {
        let err = OperationChain::from_json(r#"{"operations":[{"class":"Count"},{"class":"GetAdjacentIds"}]}"#)
            .unwrap_err();
        match err {
            GraphError::InvalidOperation(message) => assert!(message.contains("GetAdjacentIds"), "{}", message),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn empty_and_unknown_chains_are_rejected() {
        assert!(OperationChain::from_json(r#"{"operations":[]}"#).is_err());
        assert!(OperationChain::from_json(r#"{"operations":[{"class":"DropEverything"}]}"#).is_err());
    }
}
