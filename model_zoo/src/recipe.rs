//! Training recipes attached to each model by the factory.
//!
//! A recipe names the loss applied to each graph output, the relative
//! weight of every term, the optimizer, and the metric to report. For
//! single-headed models the recipe is a single unit-weight term on the
//! primary output; multi-headed models (GoogLeNet) weight their
//! auxiliary heads strictly below the primary head.

use net_core::loss::{CategoricalCrossentropy, LossFn};
use net_core::optim::{Adam, Optimizer, Sgd};

use crate::arch::OUTPUT;
use crate::error::{Result, ZooErr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    CategoricalCrossentropy,
}

impl Loss {
    pub fn instantiate(&self) -> Box<dyn LossFn> {
        match self {
            Loss::CategoricalCrossentropy => Box::new(CategoricalCrossentropy::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizerSpec {
    Adam { learning_rate: f32 },
    Sgd { learning_rate: f32, momentum: f32 },
}

impl OptimizerSpec {
    pub fn instantiate(&self) -> Box<dyn Optimizer> {
        match *self {
            OptimizerSpec::Adam { learning_rate } => Box::new(Adam::new(learning_rate)),
            OptimizerSpec::Sgd {
                learning_rate,
                momentum,
            } => Box::new(Sgd::new(learning_rate, momentum)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Accuracy,
}

/// One loss applied to one named graph output.
#[derive(Debug, Clone)]
pub struct LossTerm {
    pub output: String,
    pub loss: Loss,
    pub weight: f32,
}

#[derive(Debug, Clone)]
pub struct LossRecipe {
    terms: Vec<LossTerm>,
    pub optimizer: OptimizerSpec,
    pub metric: Metric,
}

impl LossRecipe {
    /// A single unit-weight loss on the primary output.
    pub fn single(loss: Loss, optimizer: OptimizerSpec) -> Self {
        LossRecipe {
            terms: vec![LossTerm {
                output: OUTPUT.to_string(),
                loss,
                weight: 1.0,
            }],
            optimizer,
            metric: Metric::Accuracy,
        }
    }

    /// A weighted multi-head recipe. The first term must target the
    /// primary output, weights must be non-negative, and every other
    /// term must weigh strictly less than the first.
    pub fn weighted(terms: Vec<LossTerm>, optimizer: OptimizerSpec) -> Result<Self> {
        let primary = terms.first().ok_or(ZooErr::BadRecipe {
            what: "recipe has no loss terms",
        })?;
        if primary.output != OUTPUT {
            return Err(ZooErr::BadRecipe {
                what: "first loss term must target the primary output",
            });
        }
        if terms.iter().any(|t| t.weight < 0.0) {
            return Err(ZooErr::BadRecipe {
                what: "loss weights must be non-negative",
            });
        }
        for term in &terms[1..] {
            if term.weight >= primary.weight {
                return Err(ZooErr::BadRecipe {
                    what: "auxiliary loss weight must be below the primary weight",
                });
            }
        }
        Ok(LossRecipe {
            terms,
            optimizer,
            metric: Metric::Accuracy,
        })
    }

    pub fn terms(&self) -> &[LossTerm] {
        &self.terms
    }

    /// Weight of the term targeting `output`, if the recipe has one.
    pub fn weight_of(&self, output: &str) -> Option<f32> {
        self.terms
            .iter()
            .find(|t| t.output == output)
            .map(|t| t.weight)
    }
}
