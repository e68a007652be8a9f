//! Reachability polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::remote::ReachabilityProbe;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityConfig {
    pub interval: Duration,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Polls a [`ReachabilityProbe`] and publishes the result on a watch channel.
///
/// Every reading is published, repeated ones included, so a follower can
/// restore `online` after something else marked the client offline.
pub struct ConnectivityMonitor<P> {
    probe: Arc<P>,
    sender: watch::Sender<bool>,
    config: ConnectivityConfig,
}

impl<P: ReachabilityProbe> ConnectivityMonitor<P> {
    /// The channel starts at `false` until the first probe completes.
    pub fn new(probe: Arc<P>, config: ConnectivityConfig) -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            probe,
            sender,
            config,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }

    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Probe once and publish the reading; returns it.
    pub async fn check_once(&self) -> bool {
        let reachable = self.probe.is_reachable().await;
        if self.sender.send_replace(reachable) != reachable {
            tracing::debug!("Reachability probe now reports {reachable}");
        }
        reachable
    }
}

impl<P: ReachabilityProbe + 'static> ConnectivityMonitor<P> {
    /// Probe immediately and then on every interval until the task is aborted.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                monitor.check_once().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRemote;

    #[tokio::test]
    async fn publishes_every_reading() {
        let probe = Arc::new(MockRemote::default());
        let monitor = ConnectivityMonitor::new(Arc::clone(&probe), ConnectivityConfig::default());
        let mut receiver = monitor.subscribe();

        assert!(!monitor.check_once().await);
        assert!(receiver.has_changed().unwrap());
        assert!(!*receiver.borrow_and_update());

        probe.set_reachable(true);
        assert!(monitor.check_once().await);
        assert!(receiver.has_changed().unwrap());
        assert!(*receiver.borrow_and_update());
        assert!(monitor.is_online());

        monitor.check_once().await;
        assert!(receiver.has_changed().unwrap());
        assert!(*receiver.borrow_and_update());

        probe.set_reachable(false);
        monitor.check_once().await;
        assert!(!*receiver.borrow_and_update());
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_monitor_polls_on_interval() {
        let probe = Arc::new(MockRemote::default());
        let monitor = Arc::new(ConnectivityMonitor::new(
            Arc::clone(&probe),
            ConnectivityConfig {
                interval: Duration::from_secs(5),
            },
        ));
        let mut receiver = monitor.subscribe();
        probe.set_reachable(true);
        let task = monitor.spawn();

        tokio::time::timeout(Duration::from_secs(6), receiver.changed())
            .await
            .expect("reading within one interval")
            .unwrap();
        assert!(*receiver.borrow());
        task.abort();
    }
}
