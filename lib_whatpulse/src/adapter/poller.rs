//! # Sensor Poller
//!
//! A self-scheduling loop that drives every sensor of one adapter. Each
//! cycle refreshes the shared data client once, resolves every sensor
//! against that one snapshot, publishes their state, then sleeps for the
//! scan interval. A source that is down costs one attempt per cycle, not one
//! per sensor.
//!
//! Fetch failures are already absorbed by the data client, so a cycle never
//! fails; the loop only ends on the shutdown signal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::adapter::entity::{EntitySink, MetricSensor};
use crate::stats::client::StatsClient;

pub struct SensorPoller {
    client: Arc<StatsClient>,
    sensors: Vec<MetricSensor>,
    sink: Arc<dyn EntitySink>,
    interval: Duration,
}

impl SensorPoller {
    pub fn new(
        client: Arc<StatsClient>,
        sensors: Vec<MetricSensor>,
        sink: Arc<dyn EntitySink>,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            sensors,
            sink,
            interval,
        }
    }

    /// Publishes every sensor's current (possibly empty) state without
    /// touching the network, so the host knows about them from the start.
    pub fn register_all(&self) {
        for sensor in &self.sensors {
            self.sink.publish_sensor(sensor.state());
        }
    }

    /// One refresh, then an update-and-publish pass over all sensors.
    pub async fn poll_once(&mut self) {
        let ts_in = Instant::now();
        let snapshot = self.client.refresh().await;
        if snapshot.is_empty() {
            debug!("No WhatPulse data available yet, publishing empty sensors");
        }
        for sensor in &mut self.sensors {
            sensor.update(&snapshot);
            self.sink.publish_sensor(sensor.state());
        }
        debug!(
            sensors = self.sensors.len(),
            elapsed_ms = ts_in.elapsed().as_millis() as u64,
            "Poll cycle finished"
        );
    }

    /// Polls until `shutdown` fires (or its sender is dropped).
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            sensors = self.sensors.len(),
            interval_secs = self.interval.as_secs(),
            "WhatPulse poller started"
        );

        loop {
            self.poll_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.recv() => {
                    info!("WhatPulse poller shutting down");
                    break;
                }
            }
        }
    }
}
