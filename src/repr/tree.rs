//! Structure-of-Arrays decision tree storage.

/// Node index within one tree; the root is node 0.
pub type NodeId = u32;

/// Immutable SoA tree.
///
/// Internal nodes split numerically (`value < threshold` goes left); NaN
/// follows the node's default direction. Leaves carry a scalar value: a
/// margin contribution for boosted trees, or a class index for the
/// importance forest.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    split_features: Vec<u32>,
    thresholds: Vec<f32>,
    left_children: Vec<u32>,
    right_children: Vec<u32>,
    default_left: Vec<bool>,
    is_leaf: Vec<bool>,
    leaf_values: Vec<f32>,
}

impl Tree {
    /// Number of nodes (splits + leaves).
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    /// Number of leaf nodes.
    pub fn n_leaves(&self) -> usize {
        self.is_leaf.iter().filter(|&&leaf| leaf).count()
    }

    /// Route one sample from the root to a leaf and return its value.
    ///
    /// `sample` maps a feature index to that sample's value.
    #[inline]
    pub fn predict_row(&self, sample: impl Fn(usize) -> f32) -> f32 {
        let mut node = 0usize;
        while !self.is_leaf[node] {
            let value = sample(self.split_features[node] as usize);
            let go_left = if value.is_nan() {
                self.default_left[node]
            } else {
                value < self.thresholds[node]
            };
            node = if go_left {
                self.left_children[node] as usize
            } else {
                self.right_children[node] as usize
            };
        }
        self.leaf_values[node]
    }

    /// Feature indices used by split nodes (duplicates included).
    pub fn split_feature_usage(&self) -> impl Iterator<Item = usize> + '_ {
        self.is_leaf
            .iter()
            .zip(&self.split_features)
            .filter(|&(&leaf, _)| !leaf)
            .map(|(_, &feature)| feature as usize)
    }

    // =========================================================================
    // Persistence access
    // =========================================================================

    pub fn split_features(&self) -> &[u32] {
        &self.split_features
    }

    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    pub fn left_children(&self) -> &[u32] {
        &self.left_children
    }

    pub fn right_children(&self) -> &[u32] {
        &self.right_children
    }

    pub fn default_left(&self) -> &[bool] {
        &self.default_left
    }

    pub fn leaf_flags(&self) -> &[bool] {
        &self.is_leaf
    }

    pub fn leaf_values(&self) -> &[f32] {
        &self.leaf_values
    }

    /// Rebuild a tree from its flat arrays (model loading).
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        split_features: Vec<u32>,
        thresholds: Vec<f32>,
        left_children: Vec<u32>,
        right_children: Vec<u32>,
        default_left: Vec<bool>,
        is_leaf: Vec<bool>,
        leaf_values: Vec<f32>,
    ) -> Self {
        let n = is_leaf.len();
        debug_assert_eq!(split_features.len(), n);
        debug_assert_eq!(thresholds.len(), n);
        debug_assert_eq!(left_children.len(), n);
        debug_assert_eq!(right_children.len(), n);
        debug_assert_eq!(default_left.len(), n);
        debug_assert_eq!(leaf_values.len(), n);
        Self {
            split_features,
            thresholds,
            left_children,
            right_children,
            default_left,
            is_leaf,
            leaf_values,
        }
    }
}

/// Mutable tree under construction; [`TreeBuilder::build`] freezes it.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    split_features: Vec<u32>,
    thresholds: Vec<f32>,
    left_children: Vec<u32>,
    right_children: Vec<u32>,
    default_left: Vec<bool>,
    is_leaf: Vec<bool>,
    leaf_values: Vec<f32>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a leaf node.
    pub fn push_leaf(&mut self, value: f32) -> NodeId {
        let id = self.is_leaf.len() as NodeId;
        self.split_features.push(0);
        self.thresholds.push(0.0);
        self.left_children.push(0);
        self.right_children.push(0);
        self.default_left.push(true);
        self.is_leaf.push(true);
        self.leaf_values.push(value);
        id
    }

    /// Append a split node; children are wired up afterwards via
    /// [`TreeBuilder::set_children`].
    pub fn push_split(&mut self, feature: u32, threshold: f32, default_left: bool) -> NodeId {
        let id = self.is_leaf.len() as NodeId;
        self.split_features.push(feature);
        self.thresholds.push(threshold);
        self.left_children.push(0);
        self.right_children.push(0);
        self.default_left.push(default_left);
        self.is_leaf.push(false);
        self.leaf_values.push(0.0);
        id
    }

    /// Wire a split node to its children.
    pub fn set_children(&mut self, node: NodeId, left: NodeId, right: NodeId) {
        self.left_children[node as usize] = left;
        self.right_children[node as usize] = right;
    }

    /// Freeze into an immutable tree.
    pub fn build(self) -> Tree {
        debug_assert!(!self.is_leaf.is_empty(), "tree must have at least one node");
        Tree {
            split_features: self.split_features,
            thresholds: self.thresholds,
            left_children: self.left_children,
            right_children: self.right_children,
            default_left: self.default_left,
            is_leaf: self.is_leaf,
            leaf_values: self.leaf_values,
        }
    }
}
