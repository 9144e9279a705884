//! Health check module
//! Reports whether the console can reach the finance API it fronts

use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Health status response
#[derive(Debug, Serialize, Clone)]
pub struct HealthStatus {
    pub status: HealthState,
    pub checks: HashMap<String, ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Overall health state
#[derive(Debug, Serialize, Clone)]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health status
#[derive(Debug, Serialize, Clone)]
pub struct ComponentHealth {
    pub status: ComponentState,
    pub response_time_ms: Option<u128>,
    pub details: Option<String>,
}

/// Component state
#[derive(Debug, Serialize, Clone)]
pub enum ComponentState {
    Up,
    Down,
    Warning,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthStatus {
    pub fn new() -> Self {
        Self {
            status: HealthState::Healthy,
            checks: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        !matches!(self.status, HealthState::Unhealthy)
    }
}

impl ComponentHealth {
    pub fn up(response_time_ms: Option<u128>) -> Self {
        Self {
            status: ComponentState::Up,
            response_time_ms,
            details: None,
        }
    }

    pub fn down(details: Option<String>) -> Self {
        Self {
            status: ComponentState::Down,
            response_time_ms: None,
            details,
        }
    }

    pub fn warning(response_time_ms: Option<u128>, details: Option<String>) -> Self {
        Self {
            status: ComponentState::Warning,
            response_time_ms,
            details,
        }
    }
}

const FINANCE_API_COMPONENT: &str = "finance_api";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Health checker for the console's dependencies
#[derive(Clone)]
pub struct HealthChecker {
    client: reqwest::Client,
    finance_base_url: String,
}

impl HealthChecker {
    pub fn new(client: reqwest::Client, finance_base_url: impl Into<String>) -> Self {
        Self {
            client,
            finance_base_url: finance_base_url.into(),
        }
    }

    pub async fn check_health(&self) -> HealthStatus {
        let mut health_status = HealthStatus::new();

        let component = match timeout(
            PROBE_TIMEOUT,
            check_finance_api_health(&self.client, &self.finance_base_url),
        )
        .await
        {
            Ok(Ok(response_time)) => {
                info!("Finance API health check: OK ({}ms)", response_time);
                ComponentHealth::up(Some(response_time))
            }
            Ok(Err(FinanceProbe::ServerError { status, elapsed })) => {
                warn!(status, "Finance API health check: degraded");
                ComponentHealth::warning(Some(elapsed), Some(format!("HTTP {}", status)))
            }
            Ok(Err(FinanceProbe::Unreachable(message))) => {
                error!("Finance API health check failed: {}", message);
                ComponentHealth::down(Some(message))
            }
            Err(_) => {
                error!("Finance API health check timed out");
                ComponentHealth::down(Some("Timeout".to_string()))
            }
        };

        health_status.status = match component.status {
            ComponentState::Up => HealthState::Healthy,
            ComponentState::Warning => HealthState::Degraded,
            ComponentState::Down => HealthState::Unhealthy,
        };
        health_status
            .checks
            .insert(FINANCE_API_COMPONENT.to_string(), component);

        health_status
    }
}

#[derive(Debug)]
pub enum FinanceProbe {
    ServerError { status: u16, elapsed: u128 },
    Unreachable(String),
}

/// Any HTTP answer below 500 counts as reachable; the root path need not exist.
pub async fn check_finance_api_health(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<u128, FinanceProbe> {
    let start = Instant::now();

    match client.get(base_url).send().await {
        Ok(response) if response.status().is_server_error() => Err(FinanceProbe::ServerError {
            status: response.status().as_u16(),
            elapsed: start.elapsed().as_millis(),
        }),
        Ok(_) => Ok(start.elapsed().as_millis()),
        Err(e) => Err(FinanceProbe::Unreachable(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_status_creation() {
        let health_status = HealthStatus::new();
        assert!(matches!(health_status.status, HealthState::Healthy));
        assert!(health_status.checks.is_empty());
        assert!(health_status.timestamp <= chrono::Utc::now());
    }

    #[test]
    fn test_component_health_states() {
        let up_health = ComponentHealth::up(Some(100));
        assert!(matches!(up_health.status, ComponentState::Up));
        assert_eq!(up_health.response_time_ms, Some(100));

        let down_health = ComponentHealth::down(Some("connection refused".to_string()));
        assert!(matches!(down_health.status, ComponentState::Down));
        assert_eq!(down_health.details, Some("connection refused".to_string()));

        let warning_health = ComponentHealth::warning(Some(500), Some("HTTP 503".to_string()));
        assert!(matches!(warning_health.status, ComponentState::Warning));
    }

    #[tokio::test]
    async fn test_unreachable_finance_api_is_unhealthy() {
        // Port 9 (discard) on localhost is closed in test environments.
        let checker = HealthChecker::new(reqwest::Client::new(), "http://127.0.0.1:9/");
        let status = checker.check_health().await;
        assert!(matches!(status.status, HealthState::Unhealthy));
        assert!(!status.is_healthy());
        assert!(status.checks.contains_key(FINANCE_API_COMPONENT));
    }
}
