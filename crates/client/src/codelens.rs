use crate::error::Result;
use crate::service::ModelService;
use lmrisk_protocol::{CodelensQuery, CodelensStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodelensOptions {
    pub days: u32,
    pub bars: u32,
    pub sparkline: bool,
}

impl Default for CodelensOptions {
    fn default() -> Self {
        Self {
            days: 30,
            bars: 15,
            sparkline: true,
        }
    }
}

impl CodelensOptions {
    /// History bars to request: never more than one per day, none without a sparkline.
    #[must_use]
    pub fn effective_bars(&self) -> u32 {
        if self.sparkline {
            self.bars.min(self.days)
        } else {
            0
        }
    }

    #[must_use]
    pub fn query(&self, subject: &str) -> CodelensQuery {
        CodelensQuery {
            days: self.days,
            bars: self.effective_bars(),
            subject: subject.to_string(),
        }
    }
}

pub async fn fetch_stats(
    service: &dyn ModelService,
    options: CodelensOptions,
    subject: &str,
) -> Result<Option<CodelensStats>> {
    service.codelens(&options.query(subject)).await
}
