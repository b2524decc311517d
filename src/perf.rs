//! Performance marks and measures

use std::cell::RefCell;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// A named point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerfMark {
    pub tag: String,
    pub at: DateTime<Utc>,
}

/// Elapsed time between two marks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerfMeasure {
    pub name: String,
    pub start_tag: String,
    pub end_tag: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_micros: i64,
}

/// Records marks and measures for one runtime
#[derive(Debug, Default)]
pub struct PerfRecorder {
    marks: RefCell<Vec<PerfMark>>,
    measures: RefCell<Vec<PerfMeasure>>,
}

impl PerfRecorder {
    pub fn mark(&self, tag: &str) {
        let at = Utc::now();
        debug!(tag, %at, "perf mark");
        self.marks.borrow_mut().push(PerfMark {
            tag: tag.to_string(),
            at,
        });
    }

    /// Measure from the latest `start_tag` mark to the latest `end_tag` mark.
    ///
    /// Returns `None` if either mark was never recorded.
    pub fn measure(&self, name: &str, start_tag: &str, end_tag: &str) -> Option<PerfMeasure> {
        let (start, end) = {
            let marks = self.marks.borrow();
            let latest = |tag: &str| marks.iter().rev().find(|m| m.tag == tag).map(|m| m.at);
            (latest(start_tag)?, latest(end_tag)?)
        };
        let measure = PerfMeasure {
            name: name.to_string(),
            start_tag: start_tag.to_string(),
            end_tag: end_tag.to_string(),
            start,
            end,
            duration_micros: (end - start).num_microseconds().unwrap_or(i64::MAX),
        };
        debug!(name, duration_micros = measure.duration_micros, "perf measure");
        self.measures.borrow_mut().push(measure.clone());
        Some(measure)
    }

    pub fn marks(&self) -> Vec<PerfMark> {
        self.marks.borrow().clone()
    }

    pub fn measures(&self) -> Vec<PerfMeasure> {
        self.measures.borrow().clone()
    }

    pub fn clear(&self) {
        self.marks.borrow_mut().clear();
        self.measures.borrow_mut().clear();
    }
}
