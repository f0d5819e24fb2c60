//! Task watchdog for the command loop.
//!
//! The loop task subscribes to the ESP-IDF TWDT and feeds it once per
//! iteration; a loop stuck for [`WATCHDOG_TIMEOUT_MS`] panics and resets the
//! board. Feeding also paces the loop's heartbeat log line.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{
    ESP_OK, esp_err_t, esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure,
    esp_task_wdt_reset,
};
use log::{info, warn};

/// Stall budget for the command loop.
pub const WATCHDOG_TIMEOUT_MS: u32 = 10_000;

/// Period of the heartbeat reported by [`Watchdog::feed`].
pub const HEARTBEAT_MS: u32 = 60_000;

pub struct Watchdog {
    subscribed: bool,
    feeds: u64,
    heartbeat_every: u64,
}

impl Watchdog {
    /// Subscribe the calling task. `loop_interval_ms` is the sleep between
    /// feeds and sets how many feeds make one heartbeat.
    pub fn new(loop_interval_ms: u32) -> Self {
        let subscribed = subscribe_current_task();
        if subscribed {
            info!(
                "Watchdog: subscribed ({}ms timeout, panic on trigger)",
                WATCHDOG_TIMEOUT_MS
            );
        } else {
            warn!("Watchdog: not subscribed, loop stalls go undetected");
        }

        Self {
            subscribed,
            feeds: 0,
            heartbeat_every: u64::from((HEARTBEAT_MS / loop_interval_ms.max(1)).max(1)),
        }
    }

    /// Feed the watchdog. Returns `true` once every heartbeat period.
    pub fn feed(&mut self) -> bool {
        if self.subscribed {
            reset_current_task();
        }
        self.feeds = self.feeds.wrapping_add(1);
        self.feeds % self.heartbeat_every == 0
    }

    /// Feeds since subscription, i.e. completed loop iterations.
    pub fn feed_count(&self) -> u64 {
        self.feeds
    }
}

#[cfg(target_os = "espidf")]
fn subscribe_current_task() -> bool {
    let cfg = esp_task_wdt_config_t {
        timeout_ms: WATCHDOG_TIMEOUT_MS,
        idle_core_mask: 0,
        trigger_panic: true,
    };
    // SAFETY: plain ESP-IDF calls; a null handle means the calling task.
    unsafe {
        let ret = esp_task_wdt_reconfigure(&cfg);
        if ret != ESP_OK as esp_err_t {
            warn!("Watchdog: reconfigure returned {} (already configured?)", ret);
        }
        let ret = esp_task_wdt_add(core::ptr::null_mut());
        if ret != ESP_OK as esp_err_t {
            warn!("Watchdog: esp_task_wdt_add failed ({})", ret);
            return false;
        }
    }
    true
}

#[cfg(target_os = "espidf")]
fn reset_current_task() {
    // SAFETY: only reached after the task subscribed.
    unsafe {
        esp_task_wdt_reset();
    }
}

#[cfg(not(target_os = "espidf"))]
fn subscribe_current_task() -> bool {
    true
}

#[cfg(not(target_os = "espidf"))]
fn reset_current_task() {}
