// Parallel fan-out of remote commands across a host set

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::debug;

use super::{CommandSpec, HostResult, RemoteExecutor};

/// Run every command spec and collect one result per host.
///
/// Parallel mode dispatches all specs at once, bounded by `limit` concurrent
/// units, and waits for the full batch (join-all, no streaming, no early
/// exit). Sequential mode iterates hosts one at a time with the identical
/// per-host contract. Either way a host that fails to connect contributes a
/// failure-tagged result instead of aborting its siblings.
pub async fn fan_out(
    executor: Arc<dyn RemoteExecutor>,
    specs: Vec<CommandSpec>,
    parallel: bool,
    limit: usize,
) -> Vec<HostResult> {
    debug!(hosts = specs.len(), parallel, limit, "dispatching fan-out");

    if !parallel {
        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            let result = executor.execute(&spec.host, &spec.command).await;
            results.push(HostResult {
                host: spec.host,
                result,
            });
        }
        return results;
    }

    let semaphore = Arc::new(Semaphore::new(limit.max(1)));

    let futures: Vec<_> = specs
        .into_iter()
        .map(|spec| {
            let sem = semaphore.clone();
            let executor = executor.clone();

            async move {
                let _permit = sem.acquire().await.unwrap();
                let result = executor.execute(&spec.host, &spec.command).await;
                HostResult {
                    host: spec.host,
                    result,
                }
            }
        })
        .collect();

    join_all(futures).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted executor: fixed result per host, connection failure otherwise
    struct ScriptedExecutor {
        responses: HashMap<String, RemoteResult>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedExecutor {
        fn new(responses: Vec<(&str, RemoteResult)>) -> Self {
            ScriptedExecutor {
                responses: responses
                    .into_iter()
                    .map(|(h, r)| (h.to_string(), r))
                    .collect(),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RemoteExecutor for ScriptedExecutor {
        async fn execute(&self, host: &str, _command: &str) -> RemoteResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.responses
                .get(host)
                .cloned()
                .unwrap_or_else(|| RemoteResult::connection_failed("connection timed out"))
        }
    }

    fn hosts(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_every_host_yields_exactly_one_result() {
        // node2 has no scripted response and will report a connection failure
        let executor = Arc::new(ScriptedExecutor::new(vec![
            ("node1", RemoteResult::completed(0, "active\n", "")),
            ("node3", RemoteResult::completed(1, "", "error")),
        ]));

        let specs = CommandSpec::for_hosts(&hosts(&["node1", "node2", "node3"]), |_| {
            "service meshtarget status".to_string()
        });
        let results = fan_out(executor, specs, true, 8).await;

        assert_eq!(results.len(), 3);
        let mut seen: Vec<&str> = results.iter().map(|r| r.host.as_str()).collect();
        seen.sort();
        assert_eq!(seen, vec!["node1", "node2", "node3"]);
    }

    #[tokio::test]
    async fn test_connection_failure_does_not_corrupt_siblings() {
        let executor = Arc::new(ScriptedExecutor::new(vec![(
            "good",
            RemoteResult::completed(0, "active", ""),
        )]));

        let specs = CommandSpec::for_hosts(&hosts(&["good", "bad"]), |_| "true".to_string());
        let results = fan_out(executor, specs, true, 8).await;

        let good = results.iter().find(|r| r.host == "good").unwrap();
        let bad = results.iter().find(|r| r.host == "bad").unwrap();

        assert_eq!(good.result, RemoteResult::completed(0, "active", ""));
        assert!(matches!(bad.result, RemoteResult::ConnectionFailed { .. }));
    }

    #[tokio::test]
    async fn test_sequential_and_parallel_agree() {
        let responses = vec![
            ("a", RemoteResult::completed(0, "x", "")),
            ("b", RemoteResult::completed(3, "", "")),
            ("c", RemoteResult::completed(127, "", "")),
        ];

        let parallel_exec = Arc::new(ScriptedExecutor::new(responses.clone()));
        let sequential_exec = Arc::new(ScriptedExecutor::new(responses));

        let specs = CommandSpec::for_hosts(&hosts(&["a", "b", "c"]), |_| "status".to_string());

        let mut parallel = fan_out(parallel_exec, specs.clone(), true, 8).await;
        let mut sequential = fan_out(sequential_exec, specs, false, 8).await;

        parallel.sort_by(|x, y| x.host.cmp(&y.host));
        sequential.sort_by(|x, y| x.host.cmp(&y.host));
        assert_eq!(parallel, sequential);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_by_limit() {
        let executor = Arc::new(ScriptedExecutor::new(
            (0..16)
                .map(|_| ("unused", RemoteResult::completed(0, "", "")))
                .collect(),
        ));

        let host_names: Vec<String> = (0..16).map(|i| format!("h{}", i)).collect();
        let specs = CommandSpec::for_hosts(&host_names, |_| "true".to_string());

        fan_out(executor.clone(), specs, true, 4).await;

        assert_eq!(executor.calls.load(Ordering::SeqCst), 16);
        assert!(executor.max_in_flight.load(Ordering::SeqCst) <= 4);
    }
}
