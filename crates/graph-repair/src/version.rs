// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! IR version floor.

use model_ir::{Loaded, ModelDescriptor};

/// Previous and resulting `ir_version` of one enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct VersionChange {
    pub from: i64,
    pub to: i64,
}

impl VersionChange {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Raises `ir_version` to `min` if it is lower. Never lowers it.
pub fn enforce_min_version(model: &mut ModelDescriptor<Loaded>, min: i64) -> VersionChange {
    let from = model.ir_version();
    if from < min {
        model.set_ir_version(min);
        tracing::debug!("ir_version raised from {from} to {min}");
    }
    VersionChange {
        from,
        to: model.ir_version(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::{Graph, Node, OpsetId, ValueInfo};
    use proptest::prelude::*;

    fn model(ir_version: i64) -> ModelDescriptor<Loaded> {
        let graph = Graph::builder("g")
            .input(ValueInfo::untyped("x"))
            .node(Node::new("Relu", &["x"], &["y"]))
            .output(ValueInfo::untyped("y"))
            .build()
            .unwrap();
        ModelDescriptor::new(ir_version, vec![OpsetId::onnx(13)], graph)
    }

    #[test]
    fn test_raises_old_version() {
        let mut m = model(3);
        let change = enforce_min_version(&mut m, 4);
        assert_eq!(change, VersionChange { from: 3, to: 4 });
        assert!(change.changed());
        assert_eq!(m.ir_version(), 4);
    }

    #[test]
    fn test_keeps_newer_version() {
        let mut m = model(8);
        let change = enforce_min_version(&mut m, 4);
        assert!(!change.changed());
        assert_eq!(m.ir_version(), 8);
    }

    proptest! {
        #[test]
        fn prop_monotonic_and_idempotent(ir in 0i64..12, min in 1i64..12) {
            let mut m = model(ir);
            let first = enforce_min_version(&mut m, min);
            prop_assert!(first.to >= first.from);
            prop_assert_eq!(first.to, ir.max(min));

            let second = enforce_min_version(&mut m, min);
            prop_assert!(!second.changed());
            prop_assert_eq!(second.to, first.to);
        }
    }
}
