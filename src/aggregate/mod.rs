mod mode;

pub use mode::{mode, mode_partitioned};

use crate::error::{Error, Result};
use crate::frame::Frame;
use ndarray::{ArrayView1, ArrayView3, Axis, Zip};
use std::fmt;
use std::str::FromStr;

/// Statistic used to reduce a sample stack into one background frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMethod {
    /// Most frequent value per pixel, single thread
    Mode,
    /// Most frequent value per pixel, rows split across `partitions` workers
    ModePartitioned { partitions: usize },
    Mean,
    Median,
}

const METHOD_NAMES: [&str; 4] = ["mode", "mode_parallel", "mean", "median"];

impl Default for AggregationMethod {
    fn default() -> Self {
        AggregationMethod::ModePartitioned {
            partitions: default_partitions(),
        }
    }
}

fn default_partitions() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl AggregationMethod {
    /// Reduce a (height, width, samples) stack along the sample axis
    pub fn aggregate(&self, stack: ArrayView3<'_, f32>) -> Result<Frame> {
        if stack.len_of(Axis(2)) == 0 {
            return Err(Error::EmptyStack);
        }
        let _span = tracing::debug_span!("aggregate", method = %self).entered();

        let background = match *self {
            AggregationMethod::Mode => mode(stack)?,
            AggregationMethod::ModePartitioned { partitions } => {
                mode_partitioned(stack, partitions)?
            }
            AggregationMethod::Mean => stack
                .mean_axis(Axis(2))
                .ok_or(Error::EmptyStack)?,
            AggregationMethod::Median => {
                Zip::from(stack.lanes(Axis(2))).par_map_collect(median_of)
            }
        };
        Ok(background)
    }
}

/// Median of one pixel's samples; even counts average the two middle values
fn median_of(samples: ArrayView1<'_, f32>) -> f32 {
    let mut values = samples.to_vec();
    values.sort_unstable_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregationMethod::Mode => "mode",
            AggregationMethod::ModePartitioned { .. } => "mode_parallel",
            AggregationMethod::Mean => "mean",
            AggregationMethod::Median => "median",
        };
        f.write_str(name)
    }
}

impl FromStr for AggregationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mode" => Ok(AggregationMethod::Mode),
            "mode_parallel" => Ok(AggregationMethod::default()),
            "mean" => Ok(AggregationMethod::Mean),
            "median" => Ok(AggregationMethod::Median),
            other => Err(Error::Config(format!(
                "unknown aggregation method '{other}', valid methods are {}",
                METHOD_NAMES.join(", ")
            ))),
        }
    }
}
