// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! View pipeline over element streams
//!
//! Each element is processed with its own group's definition only:
//! pre-aggregation filter, query-time aggregation, post-aggregation filter,
//! transformer, post-transform filter, then property projection. Groups
//! without aggregation stream straight through; aggregated groups are held
//! back until the input is exhausted and then released in first-seen order.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::{ResolvedGroupView, ResolvedView};
use crate::error::GraphError;
use crate::functions::FunctionError;
use crate::storage::{Element, Value};

/// Lazy stream of elements
pub type ElementStream = Box<dyn Iterator<Item = Result<Element, GraphError>> + Send>;

type AggregationKey = (String, Vec<Value>, Vec<Value>);

/// Applies a resolved view to element streams
pub struct ViewEngine;

impl ViewEngine {
    pub fn apply(view: Arc<ResolvedView>, input: ElementStream) -> ElementStream {
        Box::new(ViewIter {
            view,
            input: Some(input),
            keys: HashMap::new(),
            aggregated: Vec::new(),
            drained: VecDeque::new(),
        })
    }

    /// Stages after aggregation; `None` when the element is filtered out
    fn finish(group: &ResolvedGroupView, mut element: Element) -> Result<Option<Element>, FunctionError> {
        if let Some(filter) = &group.post_aggregation_filter {
            if !filter.test(&element)? {
                return Ok(None);
            }
        }
        if !group.transformer.is_empty() {
            group.transformer.apply(&mut element)?;
            for (name, class) in &group.transient_properties {
                if let Some(value) = element.property(name) {
                    if !class.accepts(value) {
                        return Err(FunctionError::InvalidInput {
                            function: "transformer".to_string(),
                            message: format!("transient property '{}' expects {} but got {}", name, class, value),
                        });
                    }
                }
            }
        }
        if let Some(filter) = &group.post_transform_filter {
            if !filter.test(&element)? {
                return Ok(None);
            }
        }
        if let Some(keep) = &group.properties {
            element.properties_mut().retain(|name, _| keep.contains(name));
        }
        if !group.exclude_properties.is_empty() {
            element
                .properties_mut()
                .retain(|name, _| !group.exclude_properties.contains(name));
        }
        Ok(Some(element))
    }

    fn merge(group: &ResolvedGroupView, existing: &mut Element, incoming: Element) -> Result<(), FunctionError> {
        let properties = match incoming {
            Element::Entity(e) => e.properties,
            Element::Edge(e) => e.properties,
        };
        let mut merged = Vec::with_capacity(properties.len());
        for (name, value) in properties {
            match group.aggregators.get(&name) {
                Some(aggregator) => {
                    let current = existing.property(&name).cloned().unwrap_or_default();
                    merged.push((name, aggregator.apply(current, value)?));
                }
                // groupBy columns are equal within a key
                None => {
                    if existing.property(&name).is_none() {
                        merged.push((name, value));
                    }
                }
            }
        }
        for (name, value) in merged {
            existing.set_property(name, value);
        }
        Ok(())
    }
}

struct ViewIter {
    view: Arc<ResolvedView>,
    input: Option<ElementStream>,
    keys: HashMap<AggregationKey, usize>,
    aggregated: Vec<Element>,
    drained: VecDeque<Element>,
}

impl ViewIter {
    /// Run one input element through the pre-aggregation stages.
    /// Returns an element ready for the post stages, or `None` if it was
    /// dropped or absorbed into an aggregate.
    fn take(&mut self, element: Element) -> Result<Option<Element>, GraphError> {
        let Some(group) = self.view.group(element.group()) else {
            return Ok(None);
        };
        if let Some(filter) = &group.pre_aggregation_filter {
            if !filter.test(&element)? {
                return Ok(None);
            }
        }
        let Some(columns) = &group.group_by else {
            return Ok(Some(element));
        };
        let (name, identity) = element.identity_key();
        let key = (name, identity, columns.iter().map(|c| element.selection(c)).collect());
        match self.keys.get(&key) {
            Some(&index) => {
                ViewEngine::merge(group, &mut self.aggregated[index], element)?;
            }
            None => {
                self.keys.insert(key, self.aggregated.len());
                self.aggregated.push(element);
            }
        }
        Ok(None)
    }

    fn post(&self, element: Element) -> Result<Option<Element>, GraphError> {
        match self.view.group(element.group()) {
            Some(group) => Ok(ViewEngine::finish(group, element)?),
            None => Ok(None),
        }
    }
}

impl Iterator for ViewIter {
    type Item = Result<Element, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(input) = self.input.as_mut() {
            match input.next() {
                Some(Ok(element)) => match self.take(element) {
                    Ok(Some(ready)) => match self.post(ready) {
                        Ok(Some(out)) => return Some(Ok(out)),
                        Ok(None) => continue,
                        Err(e) => return Some(Err(e)),
                    },
                    Ok(None) => continue,
                    Err(e) => return Some(Err(e)),
                },
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    self.input = None;
                    self.keys.clear();
                    self.drained = std::mem::take(&mut self.aggregated).into();
                }
            }
        }
        while let Some(element) = self.drained.pop_front() {
            match self.post(element) {
                Ok(Some(out)) => return Some(Ok(out)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{AggregateFunction, Function, FunctionRegistry, Predicate};
    use crate::schema::{ElementDefinition, Schema, TypeDefinition};
    use crate::storage::{Entity, ValueClass};
    use crate::user::User;
    use crate::view::{ElementFilter, ElementTransformer, View, ViewElementDefinition};
    use parking_lot::Mutex;

    fn schema() -> Schema {
        Schema::new()
            .type_definition("junction", TypeDefinition::new(ValueClass::String))
            .type_definition("count", TypeDefinition::new(ValueClass::Long).aggregated_by(AggregateFunction::Sum))
            .type_definition("hour", TypeDefinition::new(ValueClass::Long).aggregated_by(AggregateFunction::Min))
            .entity(
                "JunctionUse",
                ElementDefinition::entity("junction")
                    .property("count", "count")
                    .property("hour", "hour")
                    .group_by(["hour"]),
            )
            .entity("Other", ElementDefinition::entity("junction").property("count", "count"))
            .validate(&FunctionRegistry::new())
            .unwrap()
    }

    fn junction(vertex: &str, hour: i64, count: i64) -> Result<Element, GraphError> {
        Ok(Entity::new("JunctionUse", vertex)
            .with_property("hour", hour)
            .with_property("count", count)
            .into())
    }

    fn run(view: View, input: Vec<Result<Element, GraphError>>) -> Vec<Element> {
        let resolved = view
            .resolve(&schema(), &FunctionRegistry::new(), &User::new("u"), 0)
            .unwrap();
        ViewEngine::apply(Arc::new(resolved), Box::new(input.into_iter()))
            .map(|e| e.unwrap())
            .collect()
    }

    #[test]
    fn aggregates_with_empty_group_by() {
        let view = View::new().entity("JunctionUse", ViewElementDefinition::new().group_by(Vec::<String>::new()));
        let out = run(
            view,
            vec![junction("A", 7, 10), junction("B", 8, 1), junction("A", 8, 5)],
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].property("count"), Some(&Value::Long(15)));
        assert_eq!(out[0].property("hour"), Some(&Value::Long(7)));
    }

    #[test]
    fn drops_groups_outside_the_view_and_projects() {
        let view = View::new().entity(
            "JunctionUse",
            ViewElementDefinition::new().exclude_properties(["hour"]),
        );
        let other: Result<Element, GraphError> = Ok(Entity::new("Other", "A").into());
        let out = run(view, vec![junction("A", 7, 10), other]);
        assert_eq!(out.len(), 1);
        assert!(out[0].property("hour").is_none());
        assert!(out[0].property("count").is_some());
    }

    #[test]
    fn failed_merge_leaves_aggregate_untouched() {
        let view = View::new().entity("JunctionUse", ViewElementDefinition::new().group_by(Vec::<String>::new()));
        let resolved = view
            .resolve(&schema(), &FunctionRegistry::new(), &User::new("u"), 0)
            .unwrap();
        let group = resolved.group("JunctionUse").unwrap();

        let mut existing = junction("A", 7, 5).unwrap();
        let incoming: Element = Entity::new("JunctionUse", "A")
            .with_property("count", 1i64)
            .with_property("hour", "late")
            .into();
        assert!(ViewEngine::merge(group, &mut existing, incoming).is_err());
        assert_eq!(existing.property("count"), Some(&Value::Long(5)));
        assert_eq!(existing.property("hour"), Some(&Value::Long(7)));
    }

    #[test]
    fn post_aggregation_filter_sees_merged_values() {
        let view = View::new().entity(
            "JunctionUse",
            ViewElementDefinition::new()
                .group_by(Vec::<String>::new())
                .post_aggregation_filter(ElementFilter::new().with(["count"], Predicate::is_more_than(12i64))),
        );
        let out = run(view, vec![junction("A", 7, 10), junction("A", 9, 5), junction("B", 9, 11)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].selection("VERTEX"), Value::from("A"));
    }

    #[test]
    fn stage_order_is_fixed() {
        #[derive(Debug)]
        struct Spy(Arc<Mutex<Vec<i64>>>);
        impl crate::functions::TransformFunction for Spy {
            fn apply(&self, inputs: &[Value]) -> Result<Value, FunctionError> {
                self.0.lock().push(inputs[0].as_long().unwrap_or(-1));
                Ok(Value::Long(inputs[0].as_long().unwrap_or(0) * 2))
            }
        }
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = FunctionRegistry::new();
        registry.register_function("spy", Arc::new(Spy(Arc::clone(&seen))));

        let view = View::new().entity(
            "JunctionUse",
            ViewElementDefinition::new()
                .pre_aggregation_filter(ElementFilter::new().with(["doubled"], Predicate::Not {
                    predicate: Box::new(Predicate::Exists),
                }))
                .post_aggregation_filter(ElementFilter::new().with(["count"], Predicate::is_more_than(3i64)))
                .transient_property("doubled", ValueClass::Long)
                .transformer(ElementTransformer::new().with(
                    ["count"],
                    Function::Custom { name: "spy".to_string() },
                    ["doubled"],
                ))
                .post_transform_filter(ElementFilter::new().with(["doubled"], Predicate::is_less_than(30i64))),
        );
        let resolved = view.resolve(&schema(), &registry, &User::new("u"), 0).unwrap();
        let input: Vec<Result<Element, GraphError>> = vec![junction("A", 1, 2), junction("B", 1, 10), junction("C", 1, 20)];
        let out: Vec<Element> = ViewEngine::apply(Arc::new(resolved), Box::new(input.into_iter()))
            .map(|e| e.unwrap())
            .collect();

        // the transform never saw the element dropped by the post-aggregation filter
        assert_eq!(*seen.lock(), vec![10, 20]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].property("doubled"), Some(&Value::Long(20)));
    }

    #[test]
    fn input_errors_pass_through() {
        let view = View::all();
        let failure = Err(GraphError::InvalidOperation("boom".to_string()));
        let resolved = view
            .resolve(&schema(), &FunctionRegistry::new(), &User::new("u"), 0)
            .unwrap();
        let mut out = ViewEngine::apply(Arc::new(resolved), Box::new(vec![failure].into_iter()));
        assert!(matches!(out.next(), Some(Err(GraphError::InvalidOperation(_)))));
        assert!(out.next().is_none());
    }
}
