use std::{
    future::Future,
    io::{self, ErrorKind},
    net::SocketAddr,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::Context;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use tokio::{
    net::TcpListener,
    sync::{mpsc, watch},
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use relay_thermostat_common::{
    Appliance, ByteStore, Clock, ControllerStatus, FixedStatus, NetworkConfig, RelayAction,
    RuntimeConfig, SettingsError, TickReport, TOPIC_CMD_HYSTERESIS, TOPIC_CMD_MODE,
    TOPIC_CMD_PROTECTION_TIME, TOPIC_CMD_SETPOINT, TOPIC_SENSOR_TEMP, TOPIC_STATE,
    TOPIC_STATE_CURRENT_TEMP,
};

use crate::{
    http::{self, HttpState, RemoteRequest},
    remote::RemoteCommand,
    sensor::SensorFeed,
    storage::FileByteStore,
};

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;
const MQTT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Milliseconds since the controller process started.
#[derive(Debug, Clone, Copy)]
pub struct HostClock {
    start: Instant,
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for HostClock {
    fn now_ms(&self) -> u64 {
        self.start
            .elapsed()
            .as_millis()
            .try_into()
            .unwrap_or(u64::MAX)
    }
}

/// Relay driver seam. The GPIO write itself belongs to the board support
/// layer; here the commanded level is tracked and logged.
#[derive(Debug, Default)]
struct RelayOutput {
    energized: bool,
}

impl RelayOutput {
    fn apply(&mut self, action: RelayAction) {
        self.energized = action.energized();
        info!("relay action: {action:?}");
    }
}

#[derive(Debug, Default)]
struct DisplaySink {
    shown: Option<FixedStatus>,
}

impl DisplaySink {
    fn show(&mut self, status: FixedStatus) {
        if self.shown == Some(status) {
            return;
        }
        debug!(segments = ?status.segments(), "display: [{status}]");
        self.shown = Some(status);
    }
}

/// A publish received from the broker, handed to the control loop.
#[derive(Debug)]
struct MqttMessage {
    topic: String,
    payload: Vec<u8>,
}

struct ControlLoop<B, C> {
    appliance: Appliance<B, C>,
    config: RuntimeConfig,
    sensor: SensorFeed,
    relay: RelayOutput,
    display: DisplaySink,
    mqtt: AsyncClient,
    status_tx: watch::Sender<ControllerStatus>,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let data_dir = std::env::var("THERMOSTAT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.thermostat"));

    let mut config = load_runtime_config(&data_dir.join("runtime.json"))
        .await
        .unwrap_or_else(|err| {
            warn!("failed to load runtime config: {err:#}");
            RuntimeConfig::default()
        });
    apply_env_overrides(&mut config);
    config.sanitize();

    let backend = FileByteStore::new(data_dir.join("settings.bin"));
    info!("settings store at {}", backend.path().display());
    let (appliance, fault) = Appliance::start(backend, HostClock::new());
    if let Some(err) = fault {
        warn!("settings store unavailable, running on defaults: {err}");
    }
    let settings = appliance.settings();
    info!(
        setpoint = settings.setpoint,
        hysteresis = settings.hysteresis,
        mode = settings.mode.as_str(),
        protection_time_s = settings.protection_time_s,
        "settings loaded"
    );

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options(&config.network), 64);
    let inbound = spawn_mqtt_loop(mqtt.clone(), eventloop);

    let (status_tx, status_rx) = watch::channel(appliance.status());
    let (command_tx, command_rx) = mpsc::channel(16);

    let app = http::router(HttpState {
        commands: command_tx,
        status: status_rx,
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;
    info!("controller listening on http://{addr}");
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!("http server stopped: {err}");
        }
    });

    let control = ControlLoop::new(appliance, config, mqtt, status_tx);
    control
        .run(inbound, command_rx, tokio::signal::ctrl_c())
        .await
}

fn mqtt_options(network: &NetworkConfig) -> MqttOptions {
    let mut options = MqttOptions::new(
        network.mqtt_client_id.clone(),
        network.mqtt_host.clone(),
        network.mqtt_port,
    );
    if !network.mqtt_user.is_empty() {
        options.set_credentials(network.mqtt_user.clone(), network.mqtt_pass.clone());
    }
    options
}

/// Drives the MQTT connection on its own task. `poll` owns the connect
/// handshake and must not be dropped half way, so it never sits in the
/// control loop's `select!`.
fn spawn_mqtt_loop(
    client: AsyncClient,
    mut eventloop: EventLoop,
) -> mpsc::Receiver<MqttMessage> {
    let (inbound_tx, inbound_rx) = mpsc::channel(32);
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    let message = MqttMessage {
                        topic: message.topic,
                        payload: message.payload.to_vec(),
                    };
                    if inbound_tx.send(message).await.is_err() {
                        debug!("control loop stopped, closing mqtt loop");
                        return;
                    }
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                    subscribe_topics(&client);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(MQTT_RETRY_DELAY).await;
                }
            }
        }
    });
    inbound_rx
}

impl<B: ByteStore, C: Clock> ControlLoop<B, C> {
    fn new(
        appliance: Appliance<B, C>,
        config: RuntimeConfig,
        mqtt: AsyncClient,
        status_tx: watch::Sender<ControllerStatus>,
    ) -> Self {
        Self {
            appliance,
            config,
            sensor: SensorFeed::new(),
            relay: RelayOutput::default(),
            display: DisplaySink::default(),
            mqtt,
            status_tx,
        }
    }

    async fn run(
        mut self,
        mut inbound: mpsc::Receiver<MqttMessage>,
        mut commands: mpsc::Receiver<RemoteRequest>,
        shutdown: impl Future<Output = io::Result<()>>,
    ) -> anyhow::Result<()> {
        let thermostat = self.config.thermostat.clone();
        let mut sample = interval_ms(thermostat.sample_interval_ms);
        let mut pass = interval_ms(thermostat.scheduler_pass_ms);
        let mut publish = interval_ms(thermostat.state_publish_interval_ms);

        tokio::pin!(shutdown);

        info!(
            "control loop started: sampling every {} ms",
            thermostat.sample_interval_ms
        );

        loop {
            tokio::select! {
                _ = pass.tick() => {
                    self.appliance.poll();
                    self.display.show(self.appliance.status_line());
                    self.status_tx.send_replace(self.appliance.status());
                }
                _ = sample.tick() => {
                    self.on_sample();
                }
                _ = publish.tick() => {
                    self.publish_state();
                }
                Some(message) = inbound.recv() => {
                    self.on_mqtt_message(&message.topic, &message.payload);
                }
                Some(request) = commands.recv() => {
                    self.on_remote_request(request);
                }
                result = &mut shutdown => {
                    result.context("failed to listen for shutdown signal")?;
                    info!(relay_energized = self.relay.energized, "shutdown requested");
                    return Ok(());
                }
            }
        }
    }

    fn on_sample(&mut self) {
        let now_ms = self.appliance.clock().now_ms();
        let reading = self.sensor.sample(now_ms, &self.config.thermostat);
        let TickReport {
            action,
            status,
            current_temp,
        } = self.appliance.tick(reading);

        if let Some(action) = action {
            self.relay.apply(action);
        }
        self.display.show(status);

        match current_temp {
            Some(temp) => {
                debug!("sample {temp:.1} C");
                self.try_publish(TOPIC_STATE_CURRENT_TEMP, format!("{temp:.1}").into_bytes());
            }
            None => warn!("sensor failure, holding relay state"),
        }
        self.status_tx.send_replace(self.appliance.status());
    }

    fn on_mqtt_message(&mut self, topic: &str, payload: &[u8]) {
        if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
            warn!(
                "dropping oversized MQTT payload on topic {} ({} bytes)",
                topic,
                payload.len()
            );
            return;
        }
        let Ok(message) = std::str::from_utf8(payload) else {
            warn!("dropping non utf8 MQTT payload on topic {topic}");
            return;
        };

        if topic == TOPIC_SENSOR_TEMP {
            let now_ms = self.appliance.clock().now_ms();
            if !self
                .sensor
                .record_payload(message, now_ms, &self.config.thermostat)
            {
                warn!("sensor reported failure: {message:?}");
            }
            return;
        }

        match RemoteCommand::from_topic(topic, message) {
            Ok(Some(command)) => {
                if let Err(err) = self.apply_command(command) {
                    warn!("failed to persist {command:?}: {err}");
                }
            }
            Ok(None) => {}
            Err(err) => warn!("ignoring command on {topic}: {err}"),
        }
    }

    fn on_remote_request(&mut self, request: RemoteRequest) {
        let command = request.command;
        let result = match self.apply_command(command) {
            Ok(()) => Ok(self.appliance.status()),
            Err(err) => {
                warn!("failed to persist {command:?}: {err}");
                Err(format!("Failed to persist settings: {err}"))
            }
        };
        // The client may have hung up; the setting stands either way.
        let _ = request.reply.send(result);
    }

    fn apply_command(&mut self, command: RemoteCommand) -> Result<(), SettingsError> {
        let result = command.apply(&mut self.appliance);
        info!("remote update: {command:?}");
        self.display.show(self.appliance.status_line());
        self.status_tx.send_replace(self.appliance.status());
        result
    }

    fn publish_state(&self) {
        match serde_json::to_vec(&self.appliance.status()) {
            Ok(body) => self.try_publish(TOPIC_STATE, body),
            Err(err) => warn!("controller state serialization failed: {err}"),
        }
    }

    fn try_publish(&self, topic: &str, payload: Vec<u8>) {
        // Never await the request queue here: the same loop drains it.
        if let Err(err) = self.mqtt.try_publish(topic, QoS::AtLeastOnce, true, payload) {
            warn!("publish to {topic} failed: {err}");
        }
    }
}

/// Called on every CONNACK; a clean session forgets earlier subscriptions.
fn subscribe_topics(mqtt: &AsyncClient) {
    let topics = [
        TOPIC_SENSOR_TEMP,
        TOPIC_CMD_SETPOINT,
        TOPIC_CMD_HYSTERESIS,
        TOPIC_CMD_MODE,
        TOPIC_CMD_PROTECTION_TIME,
    ];

    for topic in topics {
        // Awaiting here would stall the task that drains the request queue.
        if let Err(err) = mqtt.try_subscribe(topic, QoS::AtMostOnce) {
            warn!("failed to subscribe to {topic}: {err}");
        }
    }
}

async fn load_runtime_config(path: &Path) -> anyhow::Result<RuntimeConfig> {
    match tokio::fs::read(path).await {
        Ok(raw) => RuntimeConfig::from_json(&raw)
            .with_context(|| format!("invalid runtime config at {}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn apply_env_overrides(config: &mut RuntimeConfig) {
    if let Ok(host) = std::env::var("MQTT_HOST") {
        config.network.mqtt_host = host;
    }
    if let Some(port) = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        config.network.mqtt_port = port;
    }
    if let Ok(user) = std::env::var("MQTT_USER") {
        config.network.mqtt_user = user;
    }
    if let Ok(pass) = std::env::var("MQTT_PASS") {
        config.network.mqtt_pass = pass;
    }
    if let Some(port) = std::env::var("CONTROLLER_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        config.http_port = port;
    }
}

fn interval_ms(period_ms: u64) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(Duration::from_millis(period_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
