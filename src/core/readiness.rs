use crate::config::ReadinessPolicy;
use crate::domain::ports::{ConsoleProbe, ContainerRuntime};
use crate::utils::error::{ProvisionError, Result};
use std::future::Future;
use url::Url;

/// Bounded polling for both services. Each check gets `policy.attempts`
/// tries with `policy.interval()` between them.
pub struct ReadinessGate<'a, R: ContainerRuntime + ?Sized, C: ConsoleProbe + ?Sized> {
    runtime: &'a R,
    console: &'a C,
    policy: &'a ReadinessPolicy,
}

impl<'a, R: ContainerRuntime + ?Sized, C: ConsoleProbe + ?Sized> ReadinessGate<'a, R, C> {
    pub fn new(runtime: &'a R, console: &'a C, policy: &'a ReadinessPolicy) -> Self {
        Self {
            runtime,
            console,
            policy,
        }
    }

    pub async fn wait_for_database(&self, container: &str, probe: &[String]) -> Result<()> {
        tracing::info!("⏳ Waiting for database container '{}'", container);
        let runtime = self.runtime;
        self.poll(container, move || async move {
            match runtime.probe_health(container, probe).await {
                Ok(healthy) => healthy,
                Err(e) => {
                    tracing::debug!("Readiness probe for {} failed: {}", container, e);
                    false
                }
            }
        })
        .await
    }

    pub async fn wait_for_console(&self, service: &str, url: &Url) -> Result<()> {
        tracing::info!("⏳ Waiting for {} at {}", service, url);
        let console = self.console;
        self.poll(service, move || console.responds(url)).await
    }

    async fn poll<F, Fut>(&self, service: &str, mut check: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        for attempt in 1..=self.policy.attempts {
            if check().await {
                tracing::info!("✅ {} is ready (attempt {})", service, attempt);
                return Ok(());
            }

            tracing::debug!(
                "{} not ready yet (attempt {}/{})",
                service,
                attempt,
                self.policy.attempts
            );

            if attempt < self.policy.attempts {
                tokio::time::sleep(self.policy.interval()).await;
            }
        }

        Err(ProvisionError::ReadinessTimeout {
            service: service.to_string(),
            attempts: self.policy.attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http::HttpConsoleProbe;
    use crate::adapters::memory::{InMemoryRuntime, RuntimeCall, ScriptedConsoleProbe};
    use crate::domain::model::ResourceKind;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn fast_policy(attempts: u32) -> ReadinessPolicy {
        ReadinessPolicy {
            attempts,
            interval_ms: 5,
            request_timeout_ms: 500,
        }
    }

    fn probe() -> Vec<String> {
        vec!["pg_isready".to_string()]
    }

    #[tokio::test]
    async fn test_database_ready_after_a_few_attempts() {
        let runtime = InMemoryRuntime::new()
            .with_existing(ResourceKind::Container, "postgres_db")
            .healthy_after(3);
        let console = ScriptedConsoleProbe::always();
        let policy = fast_policy(5);

        let gate = ReadinessGate::new(&runtime, &console, &policy);
        tokio_test::assert_ok!(gate.wait_for_database("postgres_db", &probe()).await);

        let probes = runtime
            .calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, RuntimeCall::ProbeHealth(_)))
            .count();
        assert_eq!(probes, 3);
    }

    #[tokio::test]
    async fn test_database_timeout_names_the_container() {
        let runtime = InMemoryRuntime::new()
            .with_existing(ResourceKind::Container, "postgres_db")
            .never_healthy();
        let console = ScriptedConsoleProbe::always();
        let policy = fast_policy(4);

        let gate = ReadinessGate::new(&runtime, &console, &policy);
        let err = gate.wait_for_database("postgres_db", &probe()).await.unwrap_err();

        match err {
            ProvisionError::ReadinessTimeout { service, attempts } => {
                assert_eq!(service, "postgres_db");
                assert_eq!(attempts, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_policy_waits_thirty_seconds() {
        let runtime = InMemoryRuntime::new().never_healthy();
        let console = ScriptedConsoleProbe::never();
        let policy = ReadinessPolicy::default();

        let gate = ReadinessGate::new(&runtime, &console, &policy);
        let url = Url::parse("http://localhost:5050/").unwrap();
        let started = tokio::time::Instant::now();
        assert!(gate.wait_for_console("pgadmin", &url).await.is_err());

        // 30 次嘗試之間共 29 次間隔
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(29) && elapsed < Duration::from_secs(30));
        assert_eq!(console.attempts(), 30);
    }

    #[tokio::test]
    async fn test_console_any_status_counts_as_ready() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(503);
        });

        let runtime = InMemoryRuntime::new();
        let console = HttpConsoleProbe::new(Duration::from_millis(500)).unwrap();
        let policy = fast_policy(3);
        let url = Url::parse(&server.url("/")).unwrap();

        let gate = ReadinessGate::new(&runtime, &console, &policy);
        tokio_test::assert_ok!(gate.wait_for_console("pgadmin", &url).await);
        mock.assert();
    }

    #[tokio::test]
    async fn test_console_unreachable_times_out() {
        // 綁定後立即釋放，取得一個沒有人監聽的埠
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let runtime = InMemoryRuntime::new();
        let console = HttpConsoleProbe::new(Duration::from_millis(200)).unwrap();
        let policy = fast_policy(2);
        let url = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();

        let gate = ReadinessGate::new(&runtime, &console, &policy);
        let err = gate.wait_for_console("pgadmin", &url).await.unwrap_err();
        assert!(matches!(err, ProvisionError::ReadinessTimeout { ref service, .. } if service == "pgadmin"));
    }
}
