//! Single decision-tree growers.
//!
//! Both growers emit the flat [`Tree`] layout used by artifacts: a node is
//! pushed before its children, so every child index is larger than its
//! parent's. A split sends a row left when `x[feature] < threshold`, with
//! the threshold placed halfway between two adjacent distinct values.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::{Node, Tree};

/// How many features a classification split may consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxFeatures {
    All,
    Sqrt,
    Count(usize),
}

impl MaxFeatures {
    /// Concrete count for a dataset with `n_features` columns.
    #[must_use]
    pub fn resolve(self, n_features: usize) -> usize {
        let k = match self {
            Self::All => n_features,
            Self::Sqrt => (n_features as f64).sqrt() as usize,
            Self::Count(k) => k,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Stopping rules for a classification tree.
#[derive(Debug, Clone)]
pub struct ClassificationTreeParams {
    /// `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for ClassificationTreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
        }
    }
}

/// Split gain and leaf weight settings for a gradient tree.
#[derive(Debug, Clone)]
pub struct RegressionTreeParams {
    pub max_depth: usize,
    /// L2 regularization on leaf weights (lambda)
    pub reg_lambda: f64,
    /// Minimum hessian sum in each child
    pub min_child_weight: f64,
    /// Minimum gain for a split to be kept (gamma)
    pub min_gain: f64,
    /// Shrinkage applied to every leaf weight
    pub learning_rate: f64,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

/// Threshold between two adjacent sorted values `a < b` such that `a` goes
/// left and `b` goes right.
fn midpoint(a: f64, b: f64) -> f64 {
    let mid = a + (b - a) / 2.0;
    if mid > a && mid <= b {
        mid
    } else {
        b
    }
}

fn sorted_by_feature(x: &[Vec<f64>], sample: &[usize], feature: usize) -> Vec<usize> {
    let mut order = sample.to_vec();
    order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));
    order
}

fn partition(x: &[Vec<f64>], sample: Vec<usize>, split: Candidate) -> (Vec<usize>, Vec<usize>) {
    sample
        .into_iter()
        .partition(|&i| x[i][split.feature] < split.threshold)
}

/// Grow a CART classification tree on `sample` (row indices, repeats
/// allowed for bootstrap draws).
///
/// Leaves hold the class distribution of the rows that reach them. Splits
/// minimize weighted Gini impurity over a random subset of features.
pub fn grow_classification_tree<R: Rng + ?Sized>(
    x: &[Vec<f64>],
    y: &[usize],
    n_classes: usize,
    sample: Vec<usize>,
    params: &ClassificationTreeParams,
    rng: &mut R,
) -> Tree {
    let n_features = x.first().map_or(0, Vec::len);
    let mut grower = ClassificationGrower {
        x,
        y,
        n_classes,
        params,
        n_features,
        max_features: params.max_features.resolve(n_features),
        nodes: Vec::new(),
    };
    grower.grow(sample, 0, rng);
    Tree {
        nodes: grower.nodes,
    }
}

struct ClassificationGrower<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    params: &'a ClassificationTreeParams,
    n_features: usize,
    max_features: usize,
    nodes: Vec<Node>,
}

impl ClassificationGrower<'_> {
    fn class_counts(&self, sample: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in sample {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn grow<R: Rng + ?Sized>(&mut self, sample: Vec<usize>, depth: usize, rng: &mut R) -> usize {
        let id = self.nodes.len();
        let counts = self.class_counts(&sample);
        let total = sample.len().max(1) as f64;
        self.nodes.push(Node::Leaf {
            value: counts.iter().map(|&c| c as f64 / total).collect(),
        });

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let too_deep = self.params.max_depth.is_some_and(|d| depth >= d);
        let too_small = sample.len() < self.params.min_samples_split
            || sample.len() < 2 * self.params.min_samples_leaf;
        if pure || too_deep || too_small {
            return id;
        }

        let Some(split) = self.best_split(&sample, &counts, rng) else {
            return id;
        };
        let (left, right) = partition(self.x, sample, split);
        let left = self.grow(left, depth + 1, rng);
        let right = self.grow(right, depth + 1, rng);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    /// Visit features in random order until `max_features` non-constant
    /// ones have been scored and a split has been found.
    fn best_split<R: Rng + ?Sized>(
        &self,
        sample: &[usize],
        counts: &[usize],
        rng: &mut R,
    ) -> Option<Candidate> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(rng);

        let mut best: Option<Candidate> = None;
        let mut visited = 0;
        for feature in features {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            let order = sorted_by_feature(self.x, sample, feature);
            let (first, last) = (order[0], order[order.len() - 1]);
            if self.x[first][feature] >= self.x[last][feature] {
                continue;
            }
            visited += 1;

            if let Some(candidate) = self.scan(feature, &order, counts) {
                if best.map_or(true, |b| candidate.score > b.score) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    /// Best threshold on one feature. The score is `Σ l²/n_l + Σ r²/n_r`
    /// over class counts, which is maximal where weighted Gini is minimal.
    fn scan(&self, feature: usize, order: &[usize], total: &[usize]) -> Option<Candidate> {
        let n = order.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut left = vec![0usize; self.n_classes];
        let mut best: Option<Candidate> = None;

        for pos in 0..n - 1 {
            left[self.y[order[pos]]] += 1;
            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }
            let a = self.x[order[pos]][feature];
            let b = self.x[order[pos + 1]][feature];
            if a >= b {
                continue;
            }

            let mut sq_left = 0.0;
            let mut sq_right = 0.0;
            for (l, t) in left.iter().zip(total) {
                let r = t - l;
                sq_left += (*l * *l) as f64;
                sq_right += (r * r) as f64;
            }
            let score = sq_left / n_left as f64 + sq_right / n_right as f64;
            if best.map_or(true, |c| score > c.score) {
                best = Some(Candidate {
                    feature,
                    threshold: midpoint(a, b),
                    score,
                });
            }
        }
        best
    }
}

/// Grow one boosting tree over per-row gradients and hessians.
///
/// Splits maximize `0.5 * (G_L²/(H_L+λ) + G_R²/(H_R+λ) - G²/(H+λ))` and
/// leaves hold `-G/(H+λ)` scaled by the learning rate.
pub fn grow_regression_tree(
    x: &[Vec<f64>],
    grad: &[f64],
    hess: &[f64],
    sample: Vec<usize>,
    params: &RegressionTreeParams,
) -> Tree {
    let mut grower = RegressionGrower {
        x,
        grad,
        hess,
        params,
        n_features: x.first().map_or(0, Vec::len),
        nodes: Vec::new(),
    };
    grower.grow(sample, 0);
    Tree {
        nodes: grower.nodes,
    }
}

struct RegressionGrower<'a> {
    x: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a RegressionTreeParams,
    n_features: usize,
    nodes: Vec<Node>,
}

impl RegressionGrower<'_> {
    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.reg_lambda)
    }

    fn grow(&mut self, sample: Vec<usize>, depth: usize) -> usize {
        let id = self.nodes.len();
        let g: f64 = sample.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = sample.iter().map(|&i| self.hess[i]).sum();
        let weight = -g / (h + self.params.reg_lambda) * self.params.learning_rate;
        self.nodes.push(Node::Leaf {
            value: vec![weight],
        });

        if depth >= self.params.max_depth || sample.len() < 2 {
            return id;
        }
        let Some(split) = self.best_split(&sample, g, h) else {
            return id;
        };
        let (left, right) = partition(self.x, sample, split);
        let left = self.grow(left, depth + 1);
        let right = self.grow(right, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn best_split(&self, sample: &[usize], g: f64, h: f64) -> Option<Candidate> {
        let parent = self.score(g, h);
        let mut best: Option<Candidate> = None;

        for feature in 0..self.n_features {
            let order = sorted_by_feature(self.x, sample, feature);
            let (mut g_left, mut h_left) = (0.0, 0.0);

            for pos in 0..order.len() - 1 {
                let i = order[pos];
                g_left += self.grad[i];
                h_left += self.hess[i];
                let (g_right, h_right) = (g - g_left, h - h_left);
                if h_left < self.params.min_child_weight || h_right < self.params.min_child_weight {
                    continue;
                }
                let a = self.x[i][feature];
                let b = self.x[order[pos + 1]][feature];
                if a >= b {
                    continue;
                }

                let gain = 0.5 * (self.score(g_left, h_left) + self.score(g_right, h_right) - parent)
                    - self.params.min_gain;
                if gain > 0.0 && best.map_or(true, |c| gain > c.score) {
                    best = Some(Candidate {
                        feature,
                        threshold: midpoint(a, b),
                        score: gain,
                    });
                }
            }
        }
        best
    }
}
