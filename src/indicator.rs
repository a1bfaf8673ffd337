use std::time::Duration;

use async_trait::async_trait;

use crate::service::SharedState;

/// Alert output, a LED on the meter board
#[async_trait]
pub trait Indicator: Send + Sync {
    async fn set_on(&self);

    async fn set_off(&self);

    async fn is_on(&self) -> bool;

    /// Toggle `cycles` times, `interval` per half period, then restore the
    /// state found on entry. A zero interval does nothing.
    async fn blink(&self, cycles: u32, interval: Duration) {
        if interval.is_zero() {
            return;
        }

        let was_on = self.is_on().await;

        for _ in 0..cycles {
            self.set_on().await;
            tokio::time::sleep(interval).await;
            self.set_off().await;
            tokio::time::sleep(interval).await;
        }

        if was_on {
            self.set_on().await;
        }
    }
}

/// Indicator mirrored into the shared state, reported by `/meter/status`
pub struct StateIndicator {
    state: SharedState,
}

impl StateIndicator {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    async fn set(&self, on: bool) {
        let mut state = self.state.write().await;
        if state.alert_on != on {
            tracing::debug!("Alert indicator {}", if on { "on" } else { "off" });
            state.alert_on = on;
        }
    }
}

#[async_trait]
impl Indicator for StateIndicator {
    async fn set_on(&self) {
        self.set(true).await;
    }

    async fn set_off(&self) {
        self.set(false).await;
    }

    async fn is_on(&self) -> bool {
        self.state.read().await.alert_on
    }
}
