//! Long-poll event loop. Updates are handled on their own threads so a
//! slow publication pipeline never stalls the poll cycle.

pub mod events;
pub mod handlers;

use std::sync::{
    atomic::{AtomicBool, AtomicU16, Ordering},
    Arc,
};
use std::thread::sleep;
use std::time::Duration;

use crate::archive::CatalogSource;
use crate::auth::AccessGate;
use crate::config::Config;
use crate::tmdb::MovieEnricher;
use crate::transport::{BotApi, ChannelTransport};

#[derive(Clone)]
pub struct BotContext {
    pub config: Arc<Config>,
    pub gate: Arc<AccessGate>,
    pub archive: Arc<dyn CatalogSource>,
    pub tmdb: Arc<dyn MovieEnricher>,
    pub transport: Arc<dyn ChannelTransport>,
    pub http: reqwest::blocking::Client,
}

fn throttle(counter: &AtomicU16, max_threads: u16) {
    while counter.load(Ordering::Relaxed) >= max_threads {
        sleep(Duration::from_millis(100));
    }
}

/// Decrements the in-flight counter when the handler thread ends,
/// unwinding included, so a panic never wedges the throttle.
struct InFlightGuard(Arc<AtomicU16>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            log::error!("handler thread panicked");
        }
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub fn run(ctx: BotContext, api: Arc<BotApi>, stop: Arc<AtomicBool>) {
    let thread_ctr = Arc::new(AtomicU16::new(0));
    let mut offset: i64 = 0;

    log::info!("polling for updates");
    while !stop.load(Ordering::Relaxed) {
        let updates = match api.get_updates(offset, ctx.config.poll_timeout_secs) {
            Ok(updates) => updates,
            Err(e) => {
                log::error!("update poll failed: {e}");
                sleep(Duration::from_secs(3));
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            throttle(&thread_ctr, ctx.config.max_handler_threads);
            thread_ctr.fetch_add(1, Ordering::Relaxed);

            let ctx = ctx.clone();
            let guard = InFlightGuard(thread_ctr.clone());
            std::thread::spawn(move || {
                let _guard = guard;
                handlers::dispatch(&ctx, update);
            });
        }
    }

    // graceful shutdown: drain in-flight handlers
    log::info!("stopping, {} handler(s) in flight", thread_ctr.load(Ordering::Relaxed));
    while thread_ctr.load(Ordering::Relaxed) > 0 {
        sleep(Duration::from_millis(100));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_decrements_on_normal_exit() {
        let counter = Arc::new(AtomicU16::new(1));
        let guard = InFlightGuard(counter.clone());
        std::thread::spawn(move || {
            let _guard = guard;
        })
        .join()
        .unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_guard_decrements_when_handler_panics() {
        let counter = Arc::new(AtomicU16::new(1));
        let guard = InFlightGuard(counter.clone());
        let result = std::thread::spawn(move || {
            let _guard = guard;
            panic!("boom");
        })
        .join();
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }
}
