// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared helpers for integration tests: logging, fixture paths and the
//! road-traffic graph
//!
//! `data/road_traffic.csv` is a small hand-made sample in the column layout of
//! the public road traffic counts. Some rows exist only to be rejected: a
//! 2001 count outside the date range, a quiet hour under the bus threshold and
//! a region outside the South West.

#![allow(dead_code)]

use chrono::Duration;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use graphchain::plan::{AddElements, GenerateElements};
use graphchain::{
    records_from_csv, Edge, Element, Entity, FunctionError, Graph, GraphConfig, OperationChain, Record,
    StoreProperties, User, Value,
};

pub const ROAD_TRAFFIC_GENERATOR: &str = "roadTraffic";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data").join(name)
}

pub fn road_traffic_schema_files() -> Vec<PathBuf> {
    vec![data_path("schema/elements.json"), data_path("schema/types.json")]
}

pub fn road_traffic_records() -> Vec<Record> {
    let file = File::open(data_path("road_traffic.csv")).expect("Failed to open road traffic data");
    records_from_csv(file).expect("Failed to parse road traffic data")
}

fn vehicle_counts(record: &Record) -> Result<(BTreeMap<String, i64>, i64), FunctionError> {
    let mut counts = BTreeMap::new();
    let mut total = 0;
    for vehicle in ["BUS", "CAR", "HGV"] {
        let count: i64 = record
            .require(vehicle)?
            .parse()
            .map_err(|_| FunctionError::Generator(format!("bad {} count in {}", vehicle, record)))?;
        counts.insert(vehicle.to_string(), count);
        total += count;
    }
    Ok((counts, total))
}

/// One CSV row becomes the containment edges, a road use edge and a
/// junction use entity for the A junction
pub fn road_traffic_elements(record: &Record) -> Result<Vec<Element>, FunctionError> {
    let region = record.require("Region Name (GO)")?;
    let location = record.require("ONS LA Name")?;
    let road = record.require("Road")?;
    let a_junction = format!("{}:{}", road, record.require("A-Junction")?);
    let b_junction = format!("{}:{}", road, record.require("B-Junction")?);

    let day = Value::parse_date(record.require("dCount")?)
        .ok_or_else(|| FunctionError::Generator(format!("bad dCount in {}", record)))?;
    let hour: i64 = record
        .require("Hour")?
        .parse()
        .map_err(|_| FunctionError::Generator(format!("bad Hour in {}", record)))?;
    let start = day + Duration::hours(hour);
    let end = start + Duration::hours(1);
    let (counts, total) = vehicle_counts(record)?;

    Ok(vec![
        Edge::new("RegionContainsLocation", region, location, true).into(),
        Edge::new("LocationContainsRoad", location, road, true).into(),
        Edge::new("RoadHasJunction", road, a_junction.as_str(), true).into(),
        Edge::new("RoadHasJunction", road, b_junction.as_str(), true).into(),
        Edge::new("RoadUse", a_junction.as_str(), b_junction.as_str(), true)
            .with_property("startDate", start)
            .with_property("endDate", end)
            .with_property("count", total)
            .with_property("countByVehicleType", counts.clone())
            .into(),
        Entity::new("JunctionUse", a_junction.as_str())
            .with_property("startDate", start)
            .with_property("endDate", end)
            .with_property("count", total)
            .with_property("countByVehicleType", counts)
            .into(),
    ])
}

pub fn road_traffic_graph_with(properties: StoreProperties) -> Graph {
    init_logging();
    let graph = Graph::builder()
        .config(GraphConfig::new("roadTraffic"))
        .schema_files(&road_traffic_schema_files())
        .expect("Failed to load road traffic schema")
        .store_properties(properties)
        .register_generator(ROAD_TRAFFIC_GENERATOR, Arc::new(road_traffic_elements))
        .build()
        .expect("Failed to build road traffic graph");

    let load = OperationChain::builder()
        .first(GenerateElements::new(ROAD_TRAFFIC_GENERATOR).input(road_traffic_records()))
        .then(AddElements::new())
        .build()
        .expect("Failed to build load chain");
    let output = graph.execute(&load, &User::new("loader")).expect("Failed to load road traffic data");
    assert!(output.is_void());
    graph
}

pub fn road_traffic_graph() -> Graph {
    road_traffic_graph_with(StoreProperties::default())
}
