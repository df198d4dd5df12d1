// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! End-to-end road traffic queries: generate and load the sample data, then
//! walk from a region down to its busiest junctions.

#[path = "testutils/mod.rs"]
mod testutils;

#[cfg(test)]
mod road_traffic_walkthrough {
    use super::testutils::{road_traffic_graph, road_traffic_graph_with};
    use graphchain::plan::{ElementPropertyComparator, GetAdjacentIds, GetElements, Sort, ToCsv};
    use graphchain::storage::IncludeIncomingOutgoing;
    use graphchain::{
        CsvGenerator, ElementFilter, ElementTransformer, EntitySeed, Function, GraphError, Item, Operation,
        OperationChain, Predicate, StoreProperties, User, ValueClass, View, ViewElementDefinition,
    };

    fn busy_junctions_chain() -> OperationChain {
        let junction_use = ViewElementDefinition::new()
            .pre_aggregation_filter(ElementFilter::new().with(
                ["startDate", "endDate"],
                Predicate::in_date_range_dual("2000/01/01", "2001/01/01").expect("Invalid date range"),
            ))
            .post_aggregation_filter(ElementFilter::new().with(
                ["countByVehicleType"],
                Predicate::predicate_map("BUS", Predicate::is_more_than(1000i64)),
            ))
            .transient_property("busCount", ValueClass::Long)
            .transformer(ElementTransformer::new().with(
                ["countByVehicleType"],
                Function::freq_map_extractor("BUS"),
                ["busCount"],
            ));

        OperationChain::builder()
            .first(
                GetAdjacentIds::new()
                    .input([EntitySeed::new("South West")])
                    .view(View::new().edge("RegionContainsLocation", ViewElementDefinition::new())),
            )
            .then(GetAdjacentIds::new().view(View::new().edge("LocationContainsRoad", ViewElementDefinition::new())))
            .then(Operation::ToSet)
            .then(GetAdjacentIds::new().view(View::new().edge("RoadHasJunction", ViewElementDefinition::new())))
            .then(
                GetElements::new()
                    .view(
                        View::new()
                            .global(ViewElementDefinition::new().group_by(Vec::<String>::new()))
                            .entity("JunctionUse", junction_use),
                    )
                    .in_out_type(IncludeIncomingOutgoing::Outgoing),
            )
            .then(
                Sort::new(vec![ElementPropertyComparator::new(["JunctionUse"], "busCount").reverse(true)])
                    .result_limit(2)
                    .deduplicate(true),
            )
            .then(ToCsv::new(
                CsvGenerator::new().vertex("Junction").property("busCount", "Bus Count"),
            ))
            .build()
            .expect("Failed to build walkthrough chain")
    }

    #[test]
    fn busiest_south_west_junctions_in_2000() {
        let graph = road_traffic_graph();
        let lines = graph
            .execute(&busy_junctions_chain(), &User::new("user01"))
            .expect("Execution failed")
            .into_strings()
            .expect("Results were not strings");
        assert_eq!(lines, vec!["Junction,Bus Count", "M4:LA Boundary,1958", "M32:2,1411"]);
        assert_eq!(graph.stats().open_cursors, 0);
    }

    #[test]
    fn results_do_not_depend_on_page_size() {
        let graph = road_traffic_graph_with(StoreProperties {
            page_size: 1,
            ..Default::default()
        });
        let lines = graph
            .execute(&busy_junctions_chain(), &User::new("user01"))
            .expect("Execution failed")
            .into_strings()
            .expect("Results were not strings");
        assert_eq!(lines, vec!["Junction,Bus Count", "M4:LA Boundary,1958", "M32:2,1411"]);
        let stats = graph.stats();
        assert_eq!(stats.open_cursors, 0);
        assert!(stats.pages_fetched > 10);
    }

    #[test]
    fn roads_in_region_are_deduplicated() {
        let graph = road_traffic_graph();
        let chain = OperationChain::builder()
            .first(
                GetAdjacentIds::new()
                    .input([EntitySeed::new("South West")])
                    .view(View::new().edge("RegionContainsLocation", ViewElementDefinition::new())),
            )
            .then(GetAdjacentIds::new().view(View::new().edge("LocationContainsRoad", ViewElementDefinition::new())))
            .then(Operation::ToSet)
            .build()
            .expect("Failed to build chain");
        let roads = graph
            .execute(&chain, &User::new("user01"))
            .expect("Execution failed")
            .into_items()
            .expect("Failed to collect roads");
        let expected: Vec<Item> = ["M4", "M32", "M5", "A38"]
            .into_iter()
            .map(|road| Item::from(EntitySeed::new(road)))
            .collect();
        assert_eq!(roads.len(), 4);
        for road in expected {
            assert!(roads.contains(&road), "missing {}", road);
        }
    }

    #[test]
    fn stored_junction_use_is_aggregated_per_hour() {
        let graph = road_traffic_graph();
        let chain = OperationChain::of(
            GetElements::new()
                .input([EntitySeed::new("M4:LA Boundary")])
                .view(View::new().entity("JunctionUse", ViewElementDefinition::new())),
        )
        .expect("Failed to build chain");
        let elements = graph
            .execute(&chain, &User::new("user01"))
            .expect("Execution failed")
            .into_elements()
            .expect("Results were not elements");
        // Two hours in 2000 and one in 1999
        assert_eq!(elements.len(), 3);
        let buses: i64 = elements
            .iter()
            .filter_map(|e| e.property("countByVehicleType"))
            .filter_map(|v| v.as_freq_map().and_then(|m| m.get("BUS").copied()))
            .sum();
        assert_eq!(buses, 2458);
    }

    #[test]
    fn filters_drop_late_and_quiet_junction_use() {
        let graph = road_traffic_graph();
        let chain = OperationChain::of(
            GetElements::new()
                .input([EntitySeed::new("M32:2"), EntitySeed::new("M5:19")])
                .view(View::new().entity("JunctionUse", ViewElementDefinition::new())),
        )
        .expect("Failed to build chain");
        let elements = graph
            .execute(&chain, &User::new("user01"))
            .expect("Execution failed")
            .into_elements()
            .expect("Results were not elements");
        // 2001 traffic on M32:2 and a quiet hour on M5:19 are stored
        assert_eq!(elements.len(), 3);

        let lines = graph
            .execute(&busy_junctions_chain(), &User::new("user01"))
            .expect("Execution failed")
            .into_strings()
            .expect("Results were not strings");
        assert!(lines.contains(&"M32:2,1411".to_string()));
        assert!(lines.iter().all(|line| !line.starts_with("M5:19")));
    }

    #[test]
    fn unknown_view_group_is_rejected_before_reading() {
        let graph = road_traffic_graph();
        let chain = OperationChain::of(
            GetElements::new()
                .input([EntitySeed::new("M4:LA Boundary")])
                .view(View::new().entity("NoSuchGroup", ViewElementDefinition::new())),
        )
        .expect("Failed to build chain");
        let before = graph.stats();
        let err = graph.execute(&chain, &User::new("user01")).unwrap_err();
        assert_eq!(err.position(), Some(0));
        assert!(matches!(err.root_cause(), GraphError::Schema(_)));
        assert_eq!(graph.stats(), before);
    }
}
