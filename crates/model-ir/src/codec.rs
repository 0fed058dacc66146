// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Conversion between the protobuf messages and the in-memory IR.

use crate::model::{Loaded, ModelState};
use crate::proto::{
    self, attribute_type, tensor_shape_proto::dimension, tensor_shape_proto::Dimension,
    AttributeProto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto, StringStringEntryProto,
    TensorProto, TensorShapeProto, TensorTypeProto, TypeProto, ValueInfoProto,
};
use crate::{
    AttributeValue, Attributes, Graph, Initializer, ModelDescriptor, ModelError, Node, OpsetId,
    TensorData, TensorType, ValueInfo,
};
use std::marker::PhantomData;
use tensor_meta::{Dim, ElemType, Shape};

// ── Decoding ───────────────────────────────────────────────────────

pub(crate) fn model_from_proto(proto: ModelProto) -> Result<ModelDescriptor<Loaded>, ModelError> {
    let graph = proto
        .graph
        .ok_or_else(|| ModelError::Deserialization("model has no graph".into()))?;
    let graph = graph_from_proto(graph)?;

    Ok(ModelDescriptor {
        ir_version: proto.ir_version,
        opset_import: proto
            .opset_import
            .into_iter()
            .map(|op| OpsetId::new(op.domain, op.version))
            .collect(),
        producer_name: proto.producer_name,
        producer_version: proto.producer_version,
        domain: proto.domain,
        model_version: proto.model_version,
        doc_string: proto.doc_string,
        metadata_props: proto
            .metadata_props
            .into_iter()
            .map(|e| (e.key, e.value))
            .collect(),
        graph,
        functions: proto.functions,
        training_info: proto.training_info,
        _state: PhantomData,
    })
}

fn graph_from_proto(proto: GraphProto) -> Result<Graph, ModelError> {
    let mut builder = Graph::builder(proto.name).doc_string(proto.doc_string);
    for init in proto.initializer {
        builder = builder.initializer(tensor_from_proto(init)?);
    }
    for vi in proto.input {
        builder = builder.input(value_info_from_proto(vi));
    }
    for vi in proto.output {
        builder = builder.output(value_info_from_proto(vi));
    }
    for vi in proto.value_info {
        builder = builder.value_info(value_info_from_proto(vi));
    }
    for node in proto.node {
        builder = builder.node(node_from_proto(node)?);
    }
    for sparse in proto.sparse_initializer {
        builder = builder.sparse_initializer(sparse);
    }
    for annotation in proto.quantization_annotation {
        builder = builder.quantization_annotation(annotation);
    }
    builder.build()
}

fn value_info_from_proto(proto: ValueInfoProto) -> ValueInfo {
    let mut info = ValueInfo::new(proto.name, TensorType::unknown());
    info.doc_string = proto.doc_string;
    let Some(ty) = proto.r#type else {
        return info;
    };
    let unrecognized = ty
        .tensor_type
        .as_ref()
        .is_some_and(|tt| tt.elem_type != 0 && ElemType::from_code(tt.elem_type).is_none());
    if ty.is_non_tensor() || unrecognized {
        info.opaque_type = Some(ty);
        return info;
    }
    if let Some(tt) = ty.tensor_type {
        info.ty = TensorType {
            elem_type: ElemType::from_code(tt.elem_type),
            shape: tt.shape.map(shape_from_proto),
        };
    }
    info
}

fn shape_from_proto(proto: TensorShapeProto) -> Shape {
    proto
        .dim
        .into_iter()
        .map(|d| match d.value {
            Some(dimension::Value::DimValue(v)) if v >= 0 => Dim::Known(v as u64),
            Some(dimension::Value::DimParam(p)) if !p.is_empty() => Dim::Param(p),
            _ => Dim::Unknown,
        })
        .collect()
}

fn tensor_from_proto(proto: TensorProto) -> Result<Initializer, ModelError> {
    let dims = proto
        .dims
        .iter()
        .map(|&d| {
            u64::try_from(d).map_err(|_| {
                ModelError::Deserialization(format!(
                    "tensor '{}' has negative dimension {d}",
                    proto.name
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let data = if proto.data_location == proto::DATA_LOCATION_EXTERNAL {
        TensorData::External(
            proto
                .external_data
                .into_iter()
                .map(|e| (e.key, e.value))
                .collect(),
        )
    } else if !proto.raw_data.is_empty() {
        TensorData::Raw(proto.raw_data)
    } else if !proto.float_data.is_empty() {
        TensorData::Float(proto.float_data)
    } else if !proto.int32_data.is_empty() {
        TensorData::Int32(proto.int32_data)
    } else if !proto.int64_data.is_empty() {
        TensorData::Int64(proto.int64_data)
    } else if !proto.double_data.is_empty() {
        TensorData::Double(proto.double_data)
    } else if !proto.uint64_data.is_empty() {
        TensorData::Uint64(proto.uint64_data)
    } else if !proto.string_data.is_empty() {
        TensorData::Strings(proto.string_data)
    } else {
        TensorData::Empty
    };

    let elem_type = ElemType::from_code(proto.data_type);
    Ok(Initializer {
        name: proto.name,
        elem_type,
        dims,
        data,
        doc_string: proto.doc_string,
        unrecognized_elem: (elem_type.is_none() && proto.data_type != 0).then_some(proto.data_type),
    })
}

fn node_from_proto(proto: NodeProto) -> Result<Node, ModelError> {
    let mut attributes = Attributes::new();
    for attr in proto.attribute {
        let label = if proto.name.is_empty() {
            &proto.op_type
        } else {
            &proto.name
        };
        let name = attr.name.clone();
        let value = attribute_from_proto(attr).map_err(|detail| {
            ModelError::Deserialization(format!("node '{label}' attribute '{name}': {detail}"))
        })?;
        attributes.insert(name, value);
    }
    Ok(Node {
        name: proto.name,
        op_type: proto.op_type,
        domain: proto.domain,
        inputs: proto.input,
        outputs: proto.output,
        attributes,
        doc_string: proto.doc_string,
    })
}

/// Older exporters leave `type` unset; infer it from the populated field.
fn attribute_kind(attr: &AttributeProto) -> i32 {
    if attr.r#type != attribute_type::UNDEFINED {
        return attr.r#type;
    }
    if !attr.ints.is_empty() {
        attribute_type::INTS
    } else if !attr.floats.is_empty() {
        attribute_type::FLOATS
    } else if !attr.strings.is_empty() {
        attribute_type::STRINGS
    } else if !attr.tensors.is_empty() {
        attribute_type::TENSORS
    } else if !attr.graphs.is_empty() {
        attribute_type::GRAPHS
    } else if attr.t.is_some() {
        attribute_type::TENSOR
    } else if attr.g.is_some() {
        attribute_type::GRAPH
    } else if !attr.s.is_empty() {
        attribute_type::STRING
    } else if attr.f != 0.0 {
        attribute_type::FLOAT
    } else {
        attribute_type::INT
    }
}

fn attribute_from_proto(attr: AttributeProto) -> Result<AttributeValue, String> {
    let kind = attribute_kind(&attr);
    let value = match kind {
        attribute_type::FLOAT => AttributeValue::Float(attr.f),
        attribute_type::INT => AttributeValue::Int(attr.i),
        attribute_type::STRING => AttributeValue::String(lossy(attr.s)),
        attribute_type::TENSOR => {
            let t = attr.t.ok_or("tensor attribute without a tensor")?;
            AttributeValue::Tensor(tensor_from_proto(t).map_err(|e| e.to_string())?)
        }
        attribute_type::GRAPH => {
            AttributeValue::Graph(attr.g.ok_or("graph attribute without a graph")?)
        }
        attribute_type::FLOATS => AttributeValue::Floats(attr.floats),
        attribute_type::INTS => AttributeValue::Ints(attr.ints),
        attribute_type::STRINGS => {
            AttributeValue::Strings(attr.strings.into_iter().map(lossy).collect())
        }
        attribute_type::TENSORS => AttributeValue::Tensors(
            attr.tensors
                .into_iter()
                .map(tensor_from_proto)
                .collect::<Result<_, _>>()
                .map_err(|e| e.to_string())?,
        ),
        attribute_type::GRAPHS => AttributeValue::Graphs(attr.graphs),
        other => return Err(format!("unsupported attribute type {other}")),
    };
    Ok(value)
}

fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

// ── Encoding ───────────────────────────────────────────────────────

pub(crate) fn model_to_proto<S: ModelState>(model: &ModelDescriptor<S>) -> ModelProto {
    ModelProto {
        ir_version: model.ir_version,
        producer_name: model.producer_name.clone(),
        producer_version: model.producer_version.clone(),
        domain: model.domain.clone(),
        model_version: model.model_version,
        doc_string: model.doc_string.clone(),
        graph: Some(graph_to_proto(&model.graph)),
        opset_import: model
            .opset_import
            .iter()
            .map(|op| OperatorSetIdProto {
                domain: op.domain.clone(),
                version: op.version,
            })
            .collect(),
        metadata_props: model
            .metadata_props
            .iter()
            .map(|(k, v)| StringStringEntryProto {
                key: k.clone(),
                value: v.clone(),
            })
            .collect(),
        training_info: model.training_info.clone(),
        functions: model.functions.clone(),
    }
}

fn graph_to_proto(graph: &Graph) -> GraphProto {
    GraphProto {
        node: graph.nodes().iter().map(node_to_proto).collect(),
        name: graph.name().to_string(),
        initializer: graph.initializers().iter().map(tensor_to_proto).collect(),
        doc_string: graph.doc_string().to_string(),
        input: graph.inputs().iter().map(value_info_to_proto).collect(),
        output: graph.outputs().iter().map(value_info_to_proto).collect(),
        value_info: graph.value_info().iter().map(value_info_to_proto).collect(),
        quantization_annotation: graph.quantization_annotation().to_vec(),
        sparse_initializer: graph.sparse_initializers().to_vec(),
    }
}

fn value_info_to_proto(vi: &ValueInfo) -> ValueInfoProto {
    let r#type = match &vi.opaque_type {
        Some(ty) => Some(ty.clone()),
        None => (!vi.ty.is_unknown()).then(|| TypeProto {
            tensor_type: Some(TensorTypeProto {
                elem_type: vi.ty.elem_type.map_or(0, ElemType::code),
                shape: vi.ty.shape.as_ref().map(shape_to_proto),
            }),
            ..TypeProto::default()
        }),
    };
    ValueInfoProto {
        name: vi.name.clone(),
        r#type,
        doc_string: vi.doc_string.clone(),
    }
}

fn shape_to_proto(shape: &Shape) -> TensorShapeProto {
    TensorShapeProto {
        dim: shape
            .dims()
            .iter()
            .map(|d| Dimension {
                value: match d {
                    Dim::Known(v) => Some(dimension::Value::DimValue(*v as i64)),
                    Dim::Param(p) => Some(dimension::Value::DimParam(p.clone())),
                    Dim::Unknown => None,
                },
                denotation: String::new(),
            })
            .collect(),
    }
}

fn tensor_to_proto(init: &Initializer) -> TensorProto {
    let mut proto = TensorProto {
        dims: init.dims.iter().map(|&d| d as i64).collect(),
        data_type: init
            .elem_type
            .map(ElemType::code)
            .or(init.unrecognized_elem)
            .unwrap_or(0),
        name: init.name.clone(),
        doc_string: init.doc_string.clone(),
        ..TensorProto::default()
    };
    match &init.data {
        TensorData::Raw(b) => proto.raw_data = b.clone(),
        TensorData::Float(v) => proto.float_data = v.clone(),
        TensorData::Int32(v) => proto.int32_data = v.clone(),
        TensorData::Int64(v) => proto.int64_data = v.clone(),
        TensorData::Double(v) => proto.double_data = v.clone(),
        TensorData::Uint64(v) => proto.uint64_data = v.clone(),
        TensorData::Strings(v) => proto.string_data = v.clone(),
        TensorData::External(entries) => {
            proto.data_location = proto::DATA_LOCATION_EXTERNAL;
            proto.external_data = entries
                .iter()
                .map(|(k, v)| StringStringEntryProto {
                    key: k.clone(),
                    value: v.clone(),
                })
                .collect();
        }
        TensorData::Empty => {}
    }
    proto
}

fn node_to_proto(node: &Node) -> NodeProto {
    NodeProto {
        input: node.inputs.clone(),
        output: node.outputs.clone(),
        name: node.name.clone(),
        op_type: node.op_type.clone(),
        attribute: node
            .attributes
            .iter()
            .map(|(name, value)| attribute_to_proto(name, value))
            .collect(),
        doc_string: node.doc_string.clone(),
        domain: node.domain.clone(),
    }
}

fn attribute_to_proto(name: &str, value: &AttributeValue) -> AttributeProto {
    let mut attr = AttributeProto {
        name: name.to_string(),
        ..AttributeProto::default()
    };
    match value {
        AttributeValue::Int(v) => {
            attr.r#type = attribute_type::INT;
            attr.i = *v;
        }
        AttributeValue::Float(v) => {
            attr.r#type = attribute_type::FLOAT;
            attr.f = *v;
        }
        AttributeValue::Ints(v) => {
            attr.r#type = attribute_type::INTS;
            attr.ints = v.clone();
        }
        AttributeValue::Floats(v) => {
            attr.r#type = attribute_type::FLOATS;
            attr.floats = v.clone();
        }
        AttributeValue::String(s) => {
            attr.r#type = attribute_type::STRING;
            attr.s = s.as_bytes().to_vec();
        }
        AttributeValue::Strings(v) => {
            attr.r#type = attribute_type::STRINGS;
            attr.strings = v.iter().map(|s| s.as_bytes().to_vec()).collect();
        }
        AttributeValue::Tensor(t) => {
            attr.r#type = attribute_type::TENSOR;
            attr.t = Some(tensor_to_proto(t));
        }
        AttributeValue::Tensors(v) => {
            attr.r#type = attribute_type::TENSORS;
            attr.tensors = v.iter().map(tensor_to_proto).collect();
        }
        AttributeValue::Graph(g) => {
            attr.r#type = attribute_type::GRAPH;
            attr.g = Some(g.clone());
        }
        AttributeValue::Graphs(v) => {
            attr.r#type = attribute_type::GRAPHS;
            attr.graphs = v.clone();
        }
    }
    attr
}
