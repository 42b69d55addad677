use super::{Config, Discovery, Health, Logs, Supervisor};
use std::time::Duration;

/// Creates a configuration with short timings suitable for tests.
pub fn new_test_config() -> Config {
    let mut supervisor = Supervisor {
        env: super::TEST.to_string(),
        logs: Logs {
            level: "debug".to_string(),
        },
        ..Supervisor::default()
    };
    supervisor.proxy.stop_timeout = Duration::from_millis(500);
    supervisor.proxy.health = Health {
        interval: Duration::from_millis(200),
        timeout: Duration::from_millis(100),
        retries: 2,
        start_period: Duration::from_millis(50),
        start_interval: Duration::from_millis(50),
    };
    supervisor.service.stop_timeout = Duration::from_millis(500);
    supervisor.discovery = Discovery {
        node_id: "edgeward-test".to_string(),
        port: 0,
        publish_timeout: Duration::from_secs(1),
    };
    Config { supervisor }
}
