//! Catalog pruning.

use autoclass_capabilities::Catalog;
use serde_json::Value;

use crate::descriptor::{PipelineClass, PipelineDescriptor, PipelineMethod};
use crate::selection::Selection;

/// Reduce the catalog to the selected classes and methods.
///
/// The selection is a filter: unknown class or method names are ignored and
/// classes left without methods are dropped. Descriptions and raw docs are
/// not carried over; inputs start unfilled (null) with their declared types
/// kept alongside.
pub fn prune(catalog: &Catalog, selection: &Selection) -> PipelineDescriptor {
    let classes = catalog
        .classes
        .iter()
        .filter_map(|class| {
            let methods: Vec<PipelineMethod> = class
                .methods
                .iter()
                .filter(|m| selection.allows(&class.class_name, &m.method))
                .map(|m| PipelineMethod {
                    method: m.method.clone(),
                    inputs: m.inputs.keys().map(|k| (k.clone(), Value::Null)).collect(),
                    output: m.output.clone(),
                    input_types: m.inputs.clone(),
                })
                .collect();

            (!methods.is_empty()).then(|| PipelineClass {
                class_name: class.class_name.clone(),
                methods,
            })
        })
        .collect();

    PipelineDescriptor { classes }
}
