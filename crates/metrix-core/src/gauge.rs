//! Pull-based instantaneous readings.
//!
//! A gauge owns nothing but its evaluator. Copies share the evaluator, so a
//! "snapshot" of a gauge reads the live value whenever it is rendered.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Static classification of a gauge's reading type, used by output adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeShape {
    Numeric,
    Boolean,
    Text,
}

/// A single gauge reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GaugeValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for GaugeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GaugeValue::Int(v) => write!(f, "{v}"),
            GaugeValue::UInt(v) => write!(f, "{v}"),
            GaugeValue::Float(v) => write!(f, "{v}"),
            GaugeValue::Bool(v) => write!(f, "{v}"),
            GaugeValue::Text(v) => f.write_str(v),
        }
    }
}

/// Types a gauge evaluator may return.
pub trait GaugeReading: Send + 'static {
    const SHAPE: GaugeShape;

    fn into_value(self) -> GaugeValue;
}

macro_rules! numeric_reading {
    ($variant:ident, $as:ty: $($t:ty),*) => {
        $(impl GaugeReading for $t {
            const SHAPE: GaugeShape = GaugeShape::Numeric;
            fn into_value(self) -> GaugeValue {
                GaugeValue::$variant(self as $as)
            }
        })*
    };
}

numeric_reading!(Int, i64: i8, i16, i32, i64, isize);
numeric_reading!(UInt, u64: u8, u16, u32, u64, usize);
numeric_reading!(Float, f64: f32, f64);

impl GaugeReading for bool {
    const SHAPE: GaugeShape = GaugeShape::Boolean;
    fn into_value(self) -> GaugeValue {
        GaugeValue::Bool(self)
    }
}

impl GaugeReading for String {
    const SHAPE: GaugeShape = GaugeShape::Text;
    fn into_value(self) -> GaugeValue {
        GaugeValue::Text(self)
    }
}

impl GaugeReading for &'static str {
    const SHAPE: GaugeShape = GaugeShape::Text;
    fn into_value(self) -> GaugeValue {
        GaugeValue::Text(self.to_string())
    }
}

type Evaluator = Arc<dyn Fn() -> GaugeValue + Send + Sync>;

#[derive(Clone)]
pub struct Gauge {
    evaluator: Evaluator,
    shape: GaugeShape,
}

impl Gauge {
    pub fn new<T, F>(evaluator: F) -> Self
    where
        T: GaugeReading,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            evaluator: Arc::new(move || evaluator().into_value()),
            shape: T::SHAPE,
        }
    }

    pub fn value(&self) -> GaugeValue {
        (self.evaluator)()
    }

    pub fn shape(&self) -> GaugeShape {
        self.shape
    }

    pub fn is_numeric(&self) -> bool {
        self.shape == GaugeShape::Numeric
    }

    pub fn is_boolean(&self) -> bool {
        self.shape == GaugeShape::Boolean
    }

    /// True when both gauges read through the same evaluator.
    pub fn shares_evaluator(&self, other: &Gauge) -> bool {
        Arc::ptr_eq(&self.evaluator, &other.evaluator)
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge").field("shape", &self.shape).finish()
    }
}
