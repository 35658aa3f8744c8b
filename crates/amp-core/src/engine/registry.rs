use crate::core::models::layer::Layer;
use crate::core::workspace::Workspace;
use std::collections::HashMap;

/// The registered workspace and layers, keyed by layer file name.
///
/// When two layers share a file name the one registered last wins the lookup; both stay in
/// the ordered list.
#[derive(Debug, Clone)]
pub struct LayerRegistry {
    workspace: Workspace,
    layers: Vec<Layer>,
    by_filename: HashMap<String, Layer>,
}

impl LayerRegistry {
    pub fn new(workspace: Workspace, layers: &[Layer]) -> Self {
        let by_filename = layers
            .iter()
            .map(|l| (l.name().to_string(), l.clone()))
            .collect();
        Self {
            workspace,
            layers: layers.to_vec(),
            by_filename,
        }
    }

    pub fn get(&self, filename: &str) -> Option<&Layer> {
        self.by_filename.get(filename)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}
