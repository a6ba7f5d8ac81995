//! Values exchanged through the data-request protocol.
//!
//! `DataValue` is what a node hands back for a capability; `RequestParams`
//! carries capability-specific arguments (an index into a sequence, a column
//! name, ...) that the engine routes without interpreting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary statistics over a numeric series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl SeriesStats {
    /// Compute statistics, ignoring NaN samples. `None` when nothing is left.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut count = 0usize;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &v in values.iter().filter(|v| !v.is_nan()) {
            count += 1;
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        if count == 0 {
            return None;
        }
        Some(Self {
            count,
            min,
            max,
            mean: sum / count as f64,
        })
    }
}

/// Data produced by a node for one capability.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Uri(String),
    Series(Vec<f64>),
    Table(Vec<Vec<f64>>),
    Selection(Vec<usize>),
    Statistics(SeriesStats),
    Text(String),
}

impl DataValue {
    pub fn as_uri(&self) -> Option<&str> {
        match self {
            DataValue::Uri(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            DataValue::Series(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_series(self) -> Option<Vec<f64>> {
        match self {
            DataValue::Series(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&[Vec<f64>]> {
        match self {
            DataValue::Table(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_selection(&self) -> Option<&[usize]> {
        match self {
            DataValue::Selection(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_statistics(&self) -> Option<&SeriesStats> {
        match self {
            DataValue::Statistics(v) => Some(v),
            _ => None,
        }
    }
}

/// A single request parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(v) => Some(v),
            _ => None,
        }
    }
}

/// Capability-specific request arguments, opaque to the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    values: BTreeMap<String, ParamValue>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for the common "index into a sequence" parameter.
    pub fn index(index: usize) -> Self {
        Self::new().with("index", ParamValue::Int(index as i64))
    }

    pub fn with(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// The `"index"` parameter, if present and non-negative.
    pub fn get_index(&self) -> Option<usize> {
        self.get("index")
            .and_then(ParamValue::as_int)
            .and_then(|i| usize::try_from(i).ok())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
