//! The execution graph: a DAG of nodes with typed outputs, evaluated
//! in dependency order. Inputs must already be in the graph when a
//! node is added, so insertion order is a topological order.

use crate::table::TableRef;

#[derive(Clone)]
pub enum NodeOutput {
    Table(TableRef),
    Double(f64),
    Int(i64),
    None,
}

impl NodeOutput {
    /// The table payload; anything else is a wiring bug.
    pub fn table(&self) -> TableRef {
        match self {
            NodeOutput::Table(t) => t.clone(),
            _ => panic!("node output is not a table"),
        }
    }

    pub fn double(&self) -> f64 {
        match self {
            NodeOutput::Double(v) => *v,
            _ => panic!("node output is not a double"),
        }
    }

    pub fn int(&self) -> i64 {
        match self {
            NodeOutput::Int(v) => *v,
            _ => panic!("node output is not an int"),
        }
    }
}

pub trait ExecNode: Send {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput;
}

/// Wraps a pre-existing table as a source node.
pub struct TableNode {
    table: TableRef,
}

impl TableNode {
    pub fn new(table: TableRef) -> Self {
        Self { table }
    }
}

impl ExecNode for TableNode {
    fn execute(&mut self, _inputs: &[&NodeOutput]) -> NodeOutput {
        NodeOutput::Table(self.table.clone())
    }
}

/// Lets an outer stage parameterize an inner operator before running
/// it, e.g. a global aggregate gating a per-group aggregation.
pub struct NestedNode<T> {
    inner: T,
    run: Box<dyn FnMut(&mut T, &[&NodeOutput]) -> NodeOutput + Send>,
}

impl<T: Send> NestedNode<T> {
    pub fn new(
        inner: T,
        run: impl FnMut(&mut T, &[&NodeOutput]) -> NodeOutput + Send + 'static,
    ) -> Self {
        Self {
            inner,
            run: Box::new(run),
        }
    }
}

impl<T: Send> ExecNode for NestedNode<T> {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput {
        (self.run)(&mut self.inner, inputs)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NodeId(usize);

struct GraphNode {
    node: Box<dyn ExecNode>,
    inputs: Vec<NodeId>,
    output: Option<NodeOutput>,
}

#[derive(Default)]
pub struct ExecutionGraph {
    nodes: Vec<GraphNode>,
}

impl ExecutionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Box<dyn ExecNode>, inputs: Vec<NodeId>) -> NodeId {
        for input in &inputs {
            assert!(input.0 < self.nodes.len(), "input node not in the graph");
        }
        self.nodes.push(GraphNode {
            node,
            inputs,
            output: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn execute(&mut self) {
        for index in 0..self.nodes.len() {
            let inputs: Vec<NodeOutput> = self.nodes[index]
                .inputs
                .clone()
                .iter()
                .map(|id| {
                    self.nodes[id.0]
                        .output
                        .clone()
                        .expect("input executed before use")
                })
                .collect();
            let input_refs: Vec<&NodeOutput> = inputs.iter().collect();
            let output = self.nodes[index].node.execute(&input_refs);
            self.nodes[index].output = Some(output);
        }
    }

    pub fn output(&self, id: NodeId) -> &NodeOutput {
        self.nodes[id.0]
            .output
            .as_ref()
            .expect("graph not executed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataRow, DataRowMut};
    use crate::ops::agg::{AggField, IntSum, SimpleAgg};
    use crate::ops::filter::{simple_pred, ColFilter};
    use crate::table::{MemTable, Table};
    use std::sync::Arc;

    fn source() -> TableRef {
        let mut table = MemTable::make(2, false);
        {
            let block = table.allocate(5);
            let mut writer = block.rows_mut();
            for i in 0..5usize {
                let mut row = writer.row(i);
                row.field_mut(0).set_int(i as i32);
                row.field_mut(1).set_int(10 * i as i32);
            }
        }
        Arc::new(table)
    }

    #[test]
    fn test_linear_graph() {
        let mut graph = ExecutionGraph::new();
        let table = graph.add(Box::new(TableNode::new(source())), vec![]);
        let filtered = graph.add(
            Box::new(ColFilter::new(vec![simple_pred(0, |f| f.as_int() >= 2)])),
            vec![table],
        );
        let agged = graph.add(
            Box::new(SimpleAgg::new(|| {
                vec![Box::new(IntSum::new(1)) as Box<dyn AggField>]
            })),
            vec![filtered],
        );
        graph.execute();
        let result = graph.output(agged).table();
        let blocks = result.blocks().collect();
        let mut rows = blocks[0].rows();
        assert_eq!(rows.row(0).field(0).as_long(), 90);
    }

    #[test]
    fn test_nested_node_parameterizes_inner() {
        use crate::ops::agg::{GroupKey, HashAgg};

        let mut graph = ExecutionGraph::new();
        let table = graph.add(Box::new(TableNode::new(source())), vec![]);
        // stage one: global sum
        let total = graph.add(
            Box::new(NestedNode::new(
                SimpleAgg::new(|| vec![Box::new(IntSum::new(1)) as Box<dyn AggField>]),
                |agg: &mut SimpleAgg, inputs: &[&NodeOutput]| {
                    let result = agg.agg(inputs[0].table());
                    let blocks = result.blocks().collect();
                    let mut rows = blocks[0].rows();
                    NodeOutput::Int(rows.row(0).field(0).as_long())
                },
            )),
            vec![table],
        );
        // stage two: keep groups above a fraction of the total
        let gated = graph.add(
            Box::new(NestedNode::new(
                HashAgg::by_columns(&[GroupKey::Col(0)], || {
                    vec![Box::new(IntSum::new(1)) as Box<dyn AggField>]
                }),
                |agg: &mut HashAgg, inputs: &[&NodeOutput]| {
                    let threshold = inputs[0].int() / 4;
                    agg.set_predicate(move |row| row.field(1).as_long() > threshold);
                    NodeOutput::Table(agg.agg(inputs[1].table()))
                },
            )),
            vec![total, table],
        );
        graph.execute();
        let result = graph.output(gated).table();
        // total = 100; groups 3 (30) and 4 (40) beat 25
        assert_eq!(result.total_rows(), 2);
    }
}
