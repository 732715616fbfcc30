use std::time::Instant;

use crate::context::AppContext;

#[derive(Clone)]
pub struct HttpState {
    context: AppContext,
    started_at: Instant,
}

impl HttpState {
    pub fn new(context: AppContext) -> Self {
        Self {
            context,
            started_at: Instant::now(),
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn uptime_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}
