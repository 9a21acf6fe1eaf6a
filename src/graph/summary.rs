//! Layer-by-layer description of a graph.
//!
//! The summary names layers the way Keras does (`conv1d`, `conv1d_1`, ...),
//! reports per-sample output shapes and parameter counts, and serializes to
//! JSON.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use super::buffer::{BufferId, DataBuffer};
use super::core::ModelGraph;
use super::operation::{LayerKind, OpId};
use crate::errors::ModelError;

/// One row of a graph summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummary {
    pub name: String,
    pub kind: LayerKind,
    pub output_shape: Vec<usize>,
    pub params: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inbound: Vec<String>,
}

/// Description of a complete graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    pub name: String,
    pub input_shape: Vec<usize>,
    pub output_shape: Vec<usize>,
    pub layers: Vec<LayerSummary>,
    pub total_params: usize,
}

/// Tracks names assigned while walking the graph.
#[derive(Default)]
struct SummaryContext {
    names: HashMap<BufferId, String>,
    kind_counts: HashMap<LayerKind, usize>,
    counted_ops: HashSet<OpId>,
    layers: Vec<LayerSummary>,
}

impl SummaryContext {
    fn next_name(&mut self, kind: LayerKind) -> String {
        let count = self.kind_counts.entry(kind).or_insert(0);
        let name = match *count {
            0 => kind.name().to_string(),
            n => format!("{}_{}", kind.name(), n),
        };
        *count += 1;
        name
    }

    fn add(&mut self, buffer: &DataBuffer) {
        let (kind, params) = match buffer.producer() {
            Some(op) => {
                // reapplied operations share weights
                if !self.counted_ops.insert(op.id()) {
                    (op.kind(), 0)
                } else {
                    let input_shapes: Vec<&[usize]> =
                        buffer.inputs().iter().map(|b| b.shape()).collect();
                    (op.kind(), op.param_count(&input_shapes))
                }
            }
            None => (LayerKind::Input, 0),
        };

        let name = self.next_name(kind);
        let inbound = buffer
            .inputs()
            .iter()
            .filter_map(|b| self.names.get(&b.id()).cloned())
            .collect();

        self.names.insert(buffer.id(), name.clone());
        self.layers.push(LayerSummary {
            name,
            kind,
            output_shape: buffer.shape().to_vec(),
            params,
            inbound,
        });
    }
}

impl GraphSummary {
    /// Builds the summary of a graph.
    pub fn from_graph(graph: &ModelGraph) -> Self {
        let mut ctx = SummaryContext::default();
        for buffer in graph.nodes() {
            ctx.add(buffer);
        }

        let total_params = ctx.layers.iter().map(|l| l.params).sum();
        Self {
            name: graph.name().to_string(),
            input_shape: graph.input_shape().to_vec(),
            output_shape: graph.output_shape().to_vec(),
            layers: ctx.layers,
            total_params,
        }
    }

    /// Counts the layers of the given kind.
    pub fn count(&self, kind: LayerKind) -> usize {
        self.layers.iter().filter(|l| l.kind == kind).count()
    }

    /// Finds a layer by name.
    pub fn layer(&self, name: &str) -> Option<&LayerSummary> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Serializes the summary to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn format_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    format!("(None, {})", dims.join(", "))
}

impl fmt::Display for GraphSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(72);
        writeln!(f, "Model: \"{}\"", self.name)?;
        writeln!(f, "{:<40}{:<22}{:>10}", "Layer (type)", "Output Shape", "Param #")?;
        writeln!(f, "{rule}")?;
        for layer in &self.layers {
            let label = format!("{} ({})", layer.name, layer.kind);
            writeln!(
                f,
                "{:<40}{:<22}{:>10}",
                label,
                format_shape(&layer.output_shape),
                layer.params
            )?;
        }
        writeln!(f, "{rule}")?;
        write!(f, "Total params: {}", self.total_params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::buffer::InputBuffer;
    use crate::graph::operation::ops;
    use crate::layers::{Activation, Padding};

    fn residual_graph() -> ModelGraph {
        let input = InputBuffer::new(vec![16, 1]);
        let x = ops::conv1d(4, 3, Activation::Relu, Padding::Same, input.buffer()).unwrap();
        let x = ops::conv1d(4, 3, Activation::Relu, Padding::Same, x).unwrap();
        let skip = ops::reshape(vec![16, 1], input.buffer()).unwrap();
        let x = ops::concat(vec![x, skip]).unwrap();
        let x = ops::flatten(x).unwrap();
        let output = ops::dense(2, Activation::Softmax, x).unwrap();
        ModelGraph::new("residual", input, output).unwrap()
    }

    #[test]
    fn test_keras_style_names() {
        let summary = residual_graph().summary();
        let names: Vec<&str> = summary.layers.iter().map(|l| l.name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "input",
                "conv1d",
                "conv1d_1",
                "reshape",
                "concatenate",
                "flatten",
                "dense"
            ]
        );
    }

    #[test]
    fn test_inbound_links() {
        let summary = residual_graph().summary();
        let concat = summary.layer("concatenate").unwrap();

        assert_eq!(concat.inbound, vec!["conv1d_1".to_string(), "reshape".to_string()]);
        assert_eq!(concat.output_shape, vec![16, 5]);
        assert_eq!(summary.layer("reshape").unwrap().inbound, vec!["input".to_string()]);
    }

    #[test]
    fn test_param_totals() {
        let summary = residual_graph().summary();

        // conv1d: 3*1*4+4, conv1d_1: 3*4*4+4, dense: 80*2+2
        assert_eq!(summary.layer("conv1d").unwrap().params, 16);
        assert_eq!(summary.layer("conv1d_1").unwrap().params, 52);
        assert_eq!(summary.layer("dense").unwrap().params, 162);
        assert_eq!(summary.total_params, 230);
    }

    #[test]
    fn test_shared_layer_params_counted_once() {
        let input = InputBuffer::new(vec![4]);
        let shared = crate::graph::Operation::dense(4, Activation::Relu);
        let a = shared.apply(input.buffer()).unwrap();
        let b = shared.apply(a.clone()).unwrap();
        let joined = ops::concat(vec![a, b]).unwrap();
        let output = ops::dense(1, Activation::Linear, joined).unwrap();
        let summary = ModelGraph::new("shared", input, output).unwrap().summary();

        assert_eq!(summary.layer("dense").unwrap().params, 20);
        assert_eq!(summary.layer("dense_1").unwrap().params, 0);
        assert_eq!(summary.total_params, 20 + 9);
    }

    #[test]
    fn test_count_by_kind() {
        let summary = residual_graph().summary();

        assert_eq!(summary.count(LayerKind::Conv1d), 2);
        assert_eq!(summary.count(LayerKind::Input), 1);
        assert_eq!(summary.count(LayerKind::MaxPooling1d), 0);
    }

    #[test]
    fn test_json_export() {
        let json = residual_graph().to_json().unwrap();

        assert!(json.contains("\"name\": \"residual\""));
        assert!(json.contains("\"kind\": \"concatenate\""));
        assert!(json.contains("\"total_params\": 230"));
    }

    #[test]
    fn test_display_table() {
        let text = residual_graph().summary().to_string();

        assert!(text.starts_with("Model: \"residual\""));
        assert!(text.contains("conv1d_1 (conv1d)"));
        assert!(text.contains("(None, 16, 5)"));
        assert!(text.ends_with("Total params: 230"));
    }
}
