//! Classifier backed by an XGBoost JSON booster (`Booster.save_model("*.json")`).
//!
//! Only the `gbtree` booster with a three-class softmax objective is supported.
//! The artifact is validated completely at load time so prediction cannot
//! fail on a malformed tree. Scoring mirrors XGBoost's own inference:
//! features and thresholds are compared as `f32`, a node goes left when
//! `x < split_condition`, missing (NaN) values follow `default_left`, and the
//! per-class margins are the base score plus the leaf values of that class's
//! trees. The predicted class is the first maximal margin.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::domain::error::ModelError;
use crate::domain::features::{FeatureVector, FEATURE_NAMES};
use crate::domain::signal::Signal;
use crate::ports::classifier_port::SignalClassifier;

const NUM_CLASSES: usize = 3;
const NUM_FEATURES: usize = FEATURE_NAMES.len();

#[derive(Debug, Deserialize)]
struct ModelFile {
    learner: Learner,
}

#[derive(Debug, Deserialize)]
struct Learner {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBooster,
    learner_model_param: LearnerModelParam,
}

#[derive(Debug, Deserialize)]
struct GradientBooster {
    #[serde(default)]
    name: Option<String>,
    model: BoosterModel,
}

#[derive(Debug, Deserialize)]
struct BoosterModel {
    trees: Vec<RawTree>,
    tree_info: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    base_score: String,
    num_class: String,
    #[serde(default)]
    num_feature: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    default_left: Vec<Flag>,
}

/// Older writers emit `default_left` as 0/1, newer ones as booleans.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(i) => *i != 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
    Leaf(f32),
}

#[derive(Debug, Clone, PartialEq)]
struct Tree {
    class: usize,
    nodes: Vec<Node>,
}

impl Tree {
    fn leaf_value(&self, x: &[f32; NUM_FEATURES]) -> f32 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let v = x[*feature];
                    index = if v.is_nan() {
                        if *default_left { *left } else { *right }
                    } else if v < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct XgboostClassifier {
    name: String,
    base_score: [f32; NUM_CLASSES],
    trees: Vec<Tree>,
}

impl XgboostClassifier {
    /// Load and validate a booster file. Unreadable or non-JSON files are
    /// `Load` errors; structurally invalid boosters are `Invalid`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let load_err = |reason: String| ModelError::Load {
            path: path.display().to_string(),
            reason,
        };
        let content = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let file: ModelFile =
            serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))?;

        let mut classifier = Self::from_model(file)?;
        classifier.name = format!("xgboost:{}", path.display());
        debug!(
            path = %path.display(),
            trees = classifier.tree_count(),
            "loaded booster"
        );
        Ok(classifier)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ModelError> {
        let file: ModelFile = serde_json::from_str(content).map_err(|e| ModelError::Invalid {
            reason: e.to_string(),
        })?;
        Self::from_model(file)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn from_model(file: ModelFile) -> Result<Self, ModelError> {
        let learner = file.learner;
        let params = &learner.learner_model_param;

        let num_class = parse_count(&params.num_class, "num_class")?;
        if num_class != NUM_CLASSES {
            return Err(invalid(format!(
                "expected a {}-class model, found num_class = {}",
                NUM_CLASSES, num_class
            )));
        }
        if let Some(raw) = &params.num_feature {
            let num_feature = parse_count(raw, "num_feature")?;
            if num_feature != NUM_FEATURES {
                return Err(invalid(format!(
                    "expected {} features, found num_feature = {}",
                    NUM_FEATURES, num_feature
                )));
            }
        }
        if !learner.feature_names.is_empty() && learner.feature_names != FEATURE_NAMES {
            return Err(invalid(format!(
                "feature names {:?} do not match {:?}",
                learner.feature_names, FEATURE_NAMES
            )));
        }
        if let Some(name) = &learner.gradient_booster.name {
            if name != "gbtree" {
                return Err(invalid(format!("unsupported booster '{}'", name)));
            }
        }

        let base_score = parse_base_score(&params.base_score)?;

        let model = learner.gradient_booster.model;
        if model.trees.is_empty() {
            return Err(invalid("model has no trees".into()));
        }
        if model.trees.len() != model.tree_info.len() {
            return Err(invalid(format!(
                "{} trees but {} tree_info entries",
                model.trees.len(),
                model.tree_info.len()
            )));
        }

        let trees = model
            .trees
            .iter()
            .zip(&model.tree_info)
            .enumerate()
            .map(|(i, (raw, &class))| validate_tree(i, raw, class))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: "xgboost".to_string(),
            base_score,
            trees,
        })
    }

    fn margins(&self, features: &FeatureVector) -> [f32; NUM_CLASSES] {
        let x = features.to_array().map(|v| v as f32);
        let mut margins = self.base_score;
        for tree in &self.trees {
            margins[tree.class] += tree.leaf_value(&x);
        }
        margins
    }
}

impl SignalClassifier for XgboostClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &FeatureVector) -> Result<Signal, ModelError> {
        let margins = self.margins(features);
        if margins.iter().any(|m| !m.is_finite()) {
            return Err(ModelError::Prediction {
                reason: format!("non-finite class margins {:?}", margins),
            });
        }

        let mut best = 0;
        for (class, margin) in margins.iter().enumerate().skip(1) {
            if *margin > margins[best] {
                best = class;
            }
        }
        Signal::try_from(best as i64)
    }
}

fn invalid(reason: String) -> ModelError {
    ModelError::Invalid { reason }
}

fn parse_count(raw: &str, field: &str) -> Result<usize, ModelError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| invalid(format!("{} '{}' is not a count", field, raw)))
}

/// `base_score` is a scalar string ("5E-1") or, in newer writers, a bracketed
/// per-class list ("[5E-1,5E-1,5E-1]").
fn parse_base_score(raw: &str) -> Result<[f32; NUM_CLASSES], ModelError> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let values = trimmed
        .split(',')
        .map(|s| s.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid(format!("base_score '{}' is not numeric", raw)))?;

    if values.iter().any(|v| !v.is_finite()) {
        return Err(invalid(format!("base_score '{}' is not finite", raw)));
    }
    match values.as_slice() {
        [v] => Ok([*v; NUM_CLASSES]),
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(invalid(format!(
            "base_score has {} values, expected 1 or {}",
            values.len(),
            NUM_CLASSES
        ))),
    }
}

fn validate_tree(index: usize, raw: &RawTree, class: i64) -> Result<Tree, ModelError> {
    let tree_err = |reason: String| invalid(format!("tree {}: {}", index, reason));

    let class = usize::try_from(class)
        .ok()
        .filter(|c| *c < NUM_CLASSES)
        .ok_or_else(|| tree_err(format!("class {} out of range", class)))?;

    let n = raw.left_children.len();
    if n == 0 {
        return Err(tree_err("no nodes".into()));
    }
    if raw.right_children.len() != n
        || raw.split_indices.len() != n
        || raw.split_conditions.len() != n
        || raw.default_left.len() != n
    {
        return Err(tree_err("node arrays have different lengths".into()));
    }

    let mut nodes = Vec::with_capacity(n);
    for i in 0..n {
        let (left, right) = (raw.left_children[i], raw.right_children[i]);
        let condition = raw.split_conditions[i];
        if !condition.is_finite() {
            return Err(tree_err(format!("node {} has a non-finite value", i)));
        }

        if left == -1 && right == -1 {
            nodes.push(Node::Leaf(condition as f32));
            continue;
        }

        // children must point forward so every walk terminates
        let child = |c: i64| {
            usize::try_from(c)
                .ok()
                .filter(|c| *c > i && *c < n)
                .ok_or_else(|| tree_err(format!("node {} has invalid child {}", i, c)))
        };
        let left = child(left)?;
        let right = child(right)?;
        let feature = usize::try_from(raw.split_indices[i])
            .ok()
            .filter(|f| *f < NUM_FEATURES)
            .ok_or_else(|| {
                tree_err(format!(
                    "node {} splits on feature {}",
                    i, raw.split_indices[i]
                ))
            })?;

        nodes.push(Node::Split {
            feature,
            threshold: condition as f32,
            left,
            right,
            default_left: raw.default_left[i].is_set(),
        });
    }

    Ok(Tree { class, nodes })
}
