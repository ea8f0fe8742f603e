//! MQTT message bus.
//!
//! Wraps a `rumqttc` client. A background task drives the event loop:
//! it re-subscribes on every CONNACK, feeds inbound publishes to the command
//! queue, and keeps polling after transport errors so the client reconnects.
//!
//! While the broker is unreachable the event loop does not drain the client's
//! request queue, so publishes are bounded by `publish_timeout` and
//! `disconnect` never waits on the queue.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use barrier_core::{BusError, BusResult, CommandSender, MessageBus, MqttSettings};
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, QoS,
};
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pause between failed polls once the session is established.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// How long `disconnect` lets the event loop flush the DISCONNECT packet.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

type Subscriptions = Arc<RwLock<HashSet<String>>>;

/// Message bus backed by an MQTT broker.
pub struct MqttBus {
    client: AsyncClient,
    broker_addr: String,
    subscriptions: Subscriptions,
    publish_timeout: Duration,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MqttBus {
    /// Connect to the broker and wait for its CONNACK.
    ///
    /// Fails if the broker refuses the connection, the transport fails before
    /// the first CONNACK, or no CONNACK arrives within the connect timeout.
    pub async fn connect(settings: &MqttSettings, commands: CommandSender) -> BusResult<Self> {
        let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
        options.set_keep_alive(settings.keep_alive);
        options.set_clean_session(true);

        let (client, eventloop) = AsyncClient::new(options, 10);
        let subscriptions: Subscriptions = Arc::new(RwLock::new(HashSet::new()));
        let cancel = CancellationToken::new();
        let (ready_tx, ready_rx) = oneshot::channel();

        let task = tokio::spawn(run_event_loop(
            eventloop,
            client.clone(),
            subscriptions.clone(),
            commands,
            cancel.clone(),
            ready_tx,
        ));

        let broker_addr = settings.broker_addr();
        let timeout_ms = settings.connect_timeout.as_millis() as u64;
        let outcome = match tokio::time::timeout(settings.connect_timeout, ready_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BusError::Connection(
                "event loop ended before CONNACK".to_string(),
            )),
            Err(_) => Err(BusError::Timeout(timeout_ms)),
        };

        if let Err(e) = outcome {
            cancel.cancel();
            let _ = task.await;
            return Err(e);
        }

        info!("Connected to MQTT broker {}", broker_addr);
        Ok(Self {
            client,
            broker_addr,
            subscriptions,
            publish_timeout: settings.publish_timeout,
            cancel,
            task: Mutex::new(Some(task)),
        })
    }

}

#[async_trait]
impl MessageBus for MqttBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<()> {
        let request = self.client.publish(topic, QoS::AtLeastOnce, false, payload);
        match tokio::time::timeout(self.publish_timeout, request).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(BusError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(BusError::Publish {
                topic: topic.to_string(),
                reason: format!(
                    "request queue full for {}ms",
                    self.publish_timeout.as_millis()
                ),
            }),
        }
    }

    async fn subscribe(&self, topic: &str) -> BusResult<()> {
        self.subscriptions.write().await.insert(topic.to_string());
        let request = self.client.subscribe(topic, QoS::AtLeastOnce);
        let reason = match tokio::time::timeout(self.publish_timeout, request).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some("request queue full".to_string()),
        };
        if let Some(reason) = reason {
            return Err(BusError::Subscribe {
                topic: topic.to_string(),
                reason,
            });
        }
        info!("Subscribed to topic {}", topic);
        Ok(())
    }

    async fn disconnect(&self) -> BusResult<()> {
        // Must not wait on the request queue.
        if let Err(e) = self.client.try_disconnect() {
            debug!("MQTT disconnect request not queued: {}", e);
        }

        if let Some(mut task) = self.task.lock().await.take() {
            let flushed = tokio::time::timeout(DISCONNECT_TIMEOUT, &mut task).await;
            self.cancel.cancel();
            if flushed.is_err() {
                let _ = task.await;
            }
        }
        self.cancel.cancel();
        info!("Disconnected from MQTT broker {}", self.broker_addr);
        Ok(())
    }
}

async fn run_event_loop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    subscriptions: Subscriptions,
    commands: CommandSender,
    cancel: CancellationToken,
    ready_tx: oneshot::Sender<BusResult<()>>,
) {
    let mut ready_tx = Some(ready_tx);

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = eventloop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code != ConnectReturnCode::Success {
                    // Refusals normally surface as ConnectionRefused below.
                    warn!("MQTT broker answered CONNACK with {:?}", ack.code);
                    continue;
                }
                info!("Connected to MQTT Broker");

                for topic in subscriptions.read().await.iter() {
                    match client.try_subscribe(topic.as_str(), QoS::AtLeastOnce) {
                        Ok(()) => info!("Subscribed to topic {}", topic),
                        Err(e) => warn!("Failed to re-subscribe to {}: {}", topic, e),
                    }
                }

                if let Some(tx) = ready_tx.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(
                    "Received {} bytes on {}",
                    publish.payload.len(),
                    publish.topic
                );
                commands.enqueue(&publish.payload);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("MQTT disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                // Before the first CONNACK every failure is fatal to `connect`.
                if let Some(tx) = ready_tx.take() {
                    let err = match e {
                        ConnectionError::ConnectionRefused(code) => BusError::Connection(
                            format!("Failed to connect, return code {:?}", code),
                        ),
                        other => BusError::Connection(other.to_string()),
                    };
                    error!("{}", err);
                    let _ = tx.send(Err(err));
                    break;
                }

                warn!("MQTT connection error, retrying: {}", e);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => {}
                }
            }
        }
    }

    debug!("MQTT event loop stopped");
}
