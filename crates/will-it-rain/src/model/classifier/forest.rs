use serde::{Deserialize, Serialize};
use will_it_rain_preprocessing::NormalizedVector;

use super::{Classifier, argmax, check_dimensions};
use crate::error::{InferenceError, InvalidArtifactError};

/// A node of a fitted decision tree, stored in a flat array.
///
/// Children always sit after their parent, so traversal from node 0 is
/// bounded by the tree size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Goes `left` when `x[feature] <= threshold`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { probabilities: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestTree {
    nodes: Vec<TreeNode>,
}

impl ForestTree {
    #[must_use]
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    fn leaf(&self, vector: &NormalizedVector) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if vector[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { probabilities } => return probabilities,
            }
        }
    }

    /// Checks the invariants `leaf` relies on and normalizes leaf
    /// distributions to sum to 1.
    fn validate(
        mut self,
        tree: usize,
        n_features: usize,
        n_classes: usize,
    ) -> Result<Self, InvalidArtifactError> {
        let invalid = |node: usize, reason: String| {
            InvalidArtifactError(format!("tree {tree}, node {node}: {reason}"))
        };

        if self.nodes.is_empty() {
            return Err(InvalidArtifactError(format!("tree {tree} has no nodes")));
        }
        let n_nodes = self.nodes.len();
        for (index, node) in self.nodes.iter_mut().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(invalid(index, format!("feature {feature} out of range")));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(index, "threshold is not finite".into()));
                    }
                    for child in [*left, *right] {
                        if child <= index || child >= n_nodes {
                            return Err(invalid(index, format!("invalid child {child}")));
                        }
                    }
                }
                TreeNode::Leaf { probabilities } => {
                    if probabilities.len() != n_classes {
                        return Err(invalid(
                            index,
                            format!("{} leaf values for {n_classes} classes", probabilities.len()),
                        ));
                    }
                    if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
                        return Err(invalid(index, "leaf values must be finite and non-negative".into()));
                    }
                    let total: f64 = probabilities.iter().sum();
                    if total <= 0.0 {
                        return Err(invalid(index, "leaf has no weight".into()));
                    }
                    probabilities.iter_mut().for_each(|p| *p /= total);
                }
            }
        }
        Ok(self)
    }
}

/// Averaged ensemble of decision trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ForestParams", into = "ForestParams")]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<ForestTree>,
}

#[derive(Serialize, Deserialize)]
struct ForestParams {
    n_features: usize,
    n_classes: usize,
    trees: Vec<ForestTree>,
}

impl RandomForest {
    pub fn new(
        n_features: usize,
        n_classes: usize,
        trees: Vec<ForestTree>,
    ) -> Result<Self, InvalidArtifactError> {
        if n_features == 0 {
            return Err(InvalidArtifactError("random forest has no features".into()));
        }
        if n_classes < 2 {
            return Err(InvalidArtifactError(format!(
                "random forest needs at least 2 classes, got {n_classes}"
            )));
        }
        if trees.is_empty() {
            return Err(InvalidArtifactError("random forest has no trees".into()));
        }

        let trees = trees
            .into_iter()
            .enumerate()
            .map(|(index, tree)| tree.validate(index, n_features, n_classes))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            n_features,
            n_classes,
            trees,
        })
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn predict(&self, vector: &NormalizedVector) -> Result<usize, InferenceError> {
        let probabilities = self.predict_probability(vector)?;
        argmax(&probabilities).ok_or(InferenceError::EmptyProbabilities)
    }

    #[allow(clippy::cast_precision_loss)]
    fn predict_probability(&self, vector: &NormalizedVector) -> Result<Vec<f64>, InferenceError> {
        check_dimensions(self.n_features, vector)?;

        let mut totals = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (total, p) in totals.iter_mut().zip(tree.leaf(vector)) {
                *total += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        Ok(totals.into_iter().map(|total| total / n_trees).collect())
    }
}

impl TryFrom<ForestParams> for RandomForest {
    type Error = InvalidArtifactError;

    fn try_from(params: ForestParams) -> Result<Self, Self::Error> {
        Self::new(params.n_features, params.n_classes, params.trees)
    }
}

impl From<RandomForest> for ForestParams {
    fn from(model: RandomForest) -> Self {
        Self {
            n_features: model.n_features,
            n_classes: model.n_classes,
            trees: model.trees,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(probabilities: &[f64]) -> TreeNode {
        TreeNode::Leaf {
            probabilities: probabilities.to_vec(),
        }
    }

    fn stump(feature: usize, threshold: f64, left: &[f64], right: &[f64]) -> ForestTree {
        ForestTree::new(vec![
            TreeNode::Split {
                feature,
                threshold,
                left: 1,
                right: 2,
            },
            leaf(left),
            leaf(right),
        ])
    }

    fn forest() -> RandomForest {
        RandomForest::new(
            2,
            2,
            vec![
                stump(0, 0.0, &[0.9, 0.1], &[0.2, 0.8]),
                stump(1, 1.0, &[6.0, 4.0], &[0.0, 10.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_averages_tree_distributions() {
        let model = forest();
        let probabilities = model
            .predict_probability(&NormalizedVector::from_scaled(vec![-1.0, 2.0]))
            .unwrap();

        assert!((probabilities[0] - 0.45).abs() < 1e-12);
        assert!((probabilities[1] - 0.55).abs() < 1e-12);
        assert_eq!(model.predict(&NormalizedVector::from_scaled(vec![-1.0, 2.0])).unwrap(), 1);
    }

    #[test]
    fn test_threshold_is_inclusive_on_the_left() {
        let model = RandomForest::new(1, 2, vec![stump(0, 0.5, &[1.0, 0.0], &[0.0, 1.0])]).unwrap();
        assert_eq!(model.predict(&NormalizedVector::from_scaled(vec![0.5])).unwrap(), 0);
        assert_eq!(model.predict(&NormalizedVector::from_scaled(vec![0.51])).unwrap(), 1);
    }

    #[test]
    fn test_leaf_counts_are_normalized() {
        let model = RandomForest::new(1, 2, vec![ForestTree::new(vec![leaf(&[3.0, 1.0])])]).unwrap();
        let probabilities = model
            .predict_probability(&NormalizedVector::from_scaled(vec![0.0]))
            .unwrap();
        assert_eq!(probabilities, vec![0.75, 0.25]);
    }

    #[test]
    fn test_rejects_backward_children() {
        let tree = ForestTree::new(vec![
            leaf(&[1.0, 0.0]),
            TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 0,
                right: 0,
            },
        ]);
        let err = RandomForest::new(1, 2, vec![tree]).unwrap_err();
        assert!(err.to_string().contains("node 1"));
    }

    #[test]
    fn test_rejects_out_of_range_feature_and_bad_leaves() {
        assert!(RandomForest::new(1, 2, vec![stump(3, 0.0, &[1.0, 0.0], &[0.0, 1.0])]).is_err());
        assert!(RandomForest::new(1, 2, vec![stump(0, 0.0, &[1.0], &[0.0, 1.0])]).is_err());
        assert!(RandomForest::new(1, 2, vec![stump(0, 0.0, &[-1.0, 2.0], &[0.0, 1.0])]).is_err());
        assert!(RandomForest::new(1, 2, vec![]).is_err());
    }

    #[test]
    fn test_json_layout() {
        let json = r#"{
            "n_features": 1,
            "n_classes": 2,
            "trees": [{"nodes": [
                {"split": {"feature": 0, "threshold": 0.0, "left": 1, "right": 2}},
                {"leaf": {"probabilities": [1.0, 0.0]}},
                {"leaf": {"probabilities": [0.0, 1.0]}}
            ]}]
        }"#;
        let model: RandomForest = serde_json::from_str(json).unwrap();
        assert_eq!(model.n_trees(), 1);
        assert_eq!(model.predict(&NormalizedVector::from_scaled(vec![1.0])).unwrap(), 1);
    }
}
