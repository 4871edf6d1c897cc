// =====================================================================================
// BACKGROUND HOUSEKEEPING
// =====================================================================================
//
// Two periodic tasks owned by a single handle:
// - system health snapshot (memory ratio + datastore probe), logged
// - purge of samples older than the retention window
//
// Dropping the handle aborts both tasks; `shutdown` stops them cleanly.
// =====================================================================================

use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use sysinfo::System;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::models::SystemHealthSnapshot;
use crate::services::PerformanceMonitor;
use shared_config::AppConfig;
use shared_database::DatabaseProbe;

pub struct Housekeeping {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Housekeeping {
    /// Starts housekeeping only for long-running server processes.
    pub fn for_environment(
        config: &AppConfig,
        monitor: Arc<PerformanceMonitor>,
        probe: Arc<dyn DatabaseProbe>,
    ) -> Option<Self> {
        if config.is_production() {
            Some(Self::start(config, monitor, probe))
        } else {
            info!(environment = %config.environment, "Background housekeeping disabled");
            None
        }
    }

    pub fn start(
        config: &AppConfig,
        monitor: Arc<PerformanceMonitor>,
        probe: Arc<dyn DatabaseProbe>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        let probe_timeout = config.connection_timeout;

        let health_task = spawn_periodic(config.health_check_interval, shutdown.subscribe(), move || {
            let probe = probe.clone();
            async move {
                let snapshot = collect_system_health(probe.as_ref(), probe_timeout).await;
                info!(
                    memory_usage = ?snapshot.memory_usage,
                    database_response_time_ms = ?snapshot.database_response_time_ms,
                    "System health"
                );
            }
        });

        let purge_task = spawn_periodic(config.purge_interval, shutdown.subscribe(), move || {
            let monitor = monitor.clone();
            async move {
                monitor.purge_expired().await;
            }
        });

        info!(
            health_check_interval_ms = config.health_check_interval.as_millis() as u64,
            purge_interval_ms = config.purge_interval.as_millis() as u64,
            "Background housekeeping started"
        );

        Self {
            shutdown,
            handles: vec![health_task, purge_task],
        }
    }

    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!("Housekeeping task ended abnormally: {}", e);
            }
        }
        info!("Background housekeeping stopped");
    }
}

impl Drop for Housekeeping {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

fn spawn_periodic<F, Fut>(
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let period = period.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => tick().await,
                // Fires on shutdown and when the handle is gone.
                _ = shutdown.changed() => break,
            }
        }
    })
}

/// Memory ratio plus one timed probe. Probe failures leave the response time empty.
pub async fn collect_system_health(probe: &dyn DatabaseProbe, timeout: Duration) -> SystemHealthSnapshot {
    let mut system = System::new();
    system.refresh_memory();
    let total = system.total_memory();
    let memory_usage = (total > 0).then(|| system.used_memory() as f64 / total as f64);

    let start = Instant::now();
    let database_response_time_ms = match tokio::time::timeout(timeout, probe.ping()).await {
        Ok(Ok(())) => Some(start.elapsed().as_millis() as u64),
        Ok(Err(e)) => {
            error!("Database health check failed: {}", e);
            None
        }
        Err(_) => {
            error!("Database health check timed out after {}ms", timeout.as_millis());
            None
        }
    };

    SystemHealthSnapshot {
        timestamp: Utc::now(),
        memory_usage,
        database_response_time_ms,
    }
}
