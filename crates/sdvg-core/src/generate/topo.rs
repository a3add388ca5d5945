//! Intra-row column ordering.
//!
//! String templates reference other columns of the same row, so a row must
//! be generated in the topological order of those references. Non-template
//! columns keep their declaration order; cycles and unknown references are
//! validation errors.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::BTreeSet;

use crate::config::Model;
use crate::error::{Result, SdvgError};
use crate::generate::strings::template::template_refs;

/// The order in which the columns of one row must be evaluated, as indices
/// into `model.columns`.
pub fn intra_row_order(model: &Model) -> Result<Vec<usize>> {
    let mut graph = DiGraph::<usize, ()>::new();
    let nodes: Vec<NodeIndex> = (0..model.columns.len())
        .map(|i| graph.add_node(i))
        .collect();

    for (idx, column) in model.columns.iter().enumerate() {
        for template in column.templates() {
            for referenced in template_refs(template) {
                let Some(dep) = model.columns.iter().position(|c| c.name == referenced) else {
                    return Err(SdvgError::Config {
                        message: format!(
                            "column '{}' template references unknown column '{}'",
                            column.name, referenced
                        ),
                    });
                };
                if dep == idx {
                    return Err(SdvgError::Config {
                        message: format!(
                            "column '{}' template references itself (dependency cycle)",
                            column.name
                        ),
                    });
                }
                graph.add_edge(nodes[dep], nodes[idx], ());
            }
        }
    }

    // Kahn's algorithm with a smallest-declaration-index ready set, so
    // unconstrained columns come out in declaration order.
    let mut indegree: Vec<usize> = nodes
        .iter()
        .map(|&n| {
            graph
                .neighbors_directed(n, petgraph::Direction::Incoming)
                .count()
        })
        .collect();
    let mut ready: BTreeSet<usize> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(&idx) = ready.iter().next() {
        ready.remove(&idx);
        order.push(idx);
        for neighbor in graph.neighbors(nodes[idx]) {
            let ni = graph[neighbor];
            indegree[ni] -= 1;
            if indegree[ni] == 0 {
                ready.insert(ni);
            }
        }
    }

    if order.len() != model.columns.len() {
        let stuck = (0..model.columns.len())
            .find(|i| !order.contains(i))
            .map(|i| model.columns[i].name.clone())
            .unwrap_or_default();
        return Err(SdvgError::Config {
            message: format!(
                "template dependency cycle involving column '{}'",
                stuck
            ),
        });
    }
    Ok(order)
}
