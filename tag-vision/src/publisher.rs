use std::convert::TryFrom;
use std::sync::Arc;

use crate::pipeline::{PipelineResult, NO_TARGET};
use crate::table::{TableSink, TableValue};

pub const NUM_TARGETS_KEY: &str = "/datatable/num_targets_detected";
pub const AMP_CENTER_X_KEY: &str = "/datatable/center_of_amp_X";
pub const AMP_CENTER_Y_KEY: &str = "/datatable/center_of_amp_Y";

/// Writes the per-frame scalar outputs to the shared table.
#[derive(Clone)]
pub struct ResultPublisher {
    sink: Arc<dyn TableSink>,
}

impl ResultPublisher {
    /// Establishes the pre-first-frame values: no targets, no amp center.
    pub fn new(sink: Arc<dyn TableSink>) -> ResultPublisher {
        sink.set_default(NUM_TARGETS_KEY, TableValue::Integer(0));
        sink.set_default(AMP_CENTER_X_KEY, TableValue::Double(NO_TARGET));
        sink.set_default(AMP_CENTER_Y_KEY, TableValue::Double(NO_TARGET));
        ResultPublisher { sink }
    }

    pub fn publish(&self, result: &PipelineResult) {
        let count = i64::try_from(result.target_count).unwrap_or(i64::MAX);
        self.sink.set(NUM_TARGETS_KEY, TableValue::Integer(count));
        self.sink
            .set(AMP_CENTER_X_KEY, TableValue::Double(result.amp_center_x));
        self.sink
            .set(AMP_CENTER_Y_KEY, TableValue::Double(result.amp_center_y));
    }
}
