//! Label builder
//!
//! Builds the recommended Kubernetes labels shared by every object a role
//! generates. The same label set is used for object metadata and for
//! workload/service selectors, so the two can never diverge.

use std::collections::BTreeMap;

pub const NAME_LABEL_KEY: &str = "app.kubernetes.io/name";
pub const MANAGED_BY_LABEL_KEY: &str = "app.kubernetes.io/managed-by";
pub const INSTANCE_LABEL_KEY: &str = "app.kubernetes.io/instance";
pub const COMPONENT_LABEL_KEY: &str = "app.kubernetes.io/component";

pub const NAME_LABEL_VALUE: &str = "nebula-graph";
pub const MANAGED_BY_LABEL_VALUE: &str = "nebula-cluster-operator";

/// Builder for the operator-managed label set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label(BTreeMap<String, String>);

impl Default for Label {
    fn default() -> Self {
        Self::new()
    }
}

impl Label {
    /// Base label set carried by every generated object
    pub fn new() -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(NAME_LABEL_KEY.to_string(), NAME_LABEL_VALUE.to_string());
        labels.insert(
            MANAGED_BY_LABEL_KEY.to_string(),
            MANAGED_BY_LABEL_VALUE.to_string(),
        );
        Label(labels)
    }

    /// Tag with the owning cluster instance
    pub fn cluster(mut self, cluster_name: &str) -> Self {
        self.0
            .insert(INSTANCE_LABEL_KEY.to_string(), cluster_name.to_string());
        self
    }

    /// Tag with the role the object belongs to
    pub fn component(mut self, component_type: &str) -> Self {
        self.0
            .insert(COMPONENT_LABEL_KEY.to_string(), component_type.to_string());
        self
    }

    /// Finish building, yielding the plain label map
    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_builder() {
        let labels = Label::new().cluster("nebula").component("graphd").into_map();
        assert_eq!(labels[NAME_LABEL_KEY], NAME_LABEL_VALUE);
        assert_eq!(labels[MANAGED_BY_LABEL_KEY], MANAGED_BY_LABEL_VALUE);
        assert_eq!(labels[INSTANCE_LABEL_KEY], "nebula");
        assert_eq!(labels[COMPONENT_LABEL_KEY], "graphd");
    }

    #[test]
    fn test_labels_distinguish_components() {
        let graphd = Label::new().cluster("nebula").component("graphd").into_map();
        let metad = Label::new().cluster("nebula").component("metad").into_map();
        assert_ne!(graphd, metad);
    }
}
