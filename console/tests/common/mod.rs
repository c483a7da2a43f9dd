#![allow(dead_code)]

use async_trait::async_trait;
use forge_console::StatusLine;
use forge_core::{
    ClientError, ClientFactory, ClientOptions, CopilotClient, CopilotSession, EventHandler, SessionConfig,
    SessionEvent,
};
use std::sync::{Arc, Mutex};

/// Ordered record of everything the fakes saw
#[derive(Default)]
pub struct Log {
    entries: Mutex<Vec<String>>,
}

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }
}

/// How scripted events reach the handlers after `send`
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Synchronously inside `send`
    Inline,
    /// From a spawned task after `send` returns
    Spawned,
}

#[derive(Clone)]
pub struct Script {
    pub events: Vec<SessionEvent>,
    pub delivery: Delivery,
    pub fail_start: Option<ClientError>,
    pub fail_send: Option<ClientError>,
    pub fail_stop: Option<ClientError>,
}

impl Script {
    pub fn new(events: Vec<SessionEvent>) -> Self {
        Self {
            events,
            delivery: Delivery::Spawned,
            fail_start: None,
            fail_send: None,
            fail_stop: None,
        }
    }

    pub fn inline(mut self) -> Self {
        self.delivery = Delivery::Inline;
        self
    }
}

pub struct FakeFactory {
    pub log: Arc<Log>,
    pub script: Script,
    pub options: Mutex<Vec<ClientOptions>>,
    pub configs: Arc<Mutex<Vec<SessionConfig>>>,
}

impl FakeFactory {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            log: Arc::new(Log::default()),
            script,
            options: Mutex::new(Vec::new()),
            configs: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn options(&self) -> Vec<ClientOptions> {
        self.options.lock().unwrap().clone()
    }

    pub fn configs(&self) -> Vec<SessionConfig> {
        self.configs.lock().unwrap().clone()
    }
}

impl ClientFactory for FakeFactory {
    fn create(&self, options: ClientOptions) -> Result<Arc<dyn CopilotClient>, ClientError> {
        self.options.lock().unwrap().push(options);
        Ok(Arc::new(FakeClient {
            log: self.log.clone(),
            script: self.script.clone(),
            configs: self.configs.clone(),
        }))
    }
}

pub struct FakeClient {
    log: Arc<Log>,
    script: Script,
    configs: Arc<Mutex<Vec<SessionConfig>>>,
}

#[async_trait]
impl CopilotClient for FakeClient {
    async fn start(&self) -> Result<(), ClientError> {
        self.log.push("start");
        match &self.script.fail_start {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn create_session(&self, config: &SessionConfig) -> Result<Arc<dyn CopilotSession>, ClientError> {
        self.log.push("create");
        self.configs.lock().unwrap().push(config.clone());
        Ok(Arc::new(FakeSession {
            log: self.log.clone(),
            script: self.script.clone(),
            handlers: Arc::new(Mutex::new(Vec::new())),
        }))
    }

    async fn stop(&self) -> Result<(), ClientError> {
        self.log.push("stop");
        match &self.script.fail_stop {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

pub struct FakeSession {
    log: Arc<Log>,
    script: Script,
    handlers: Arc<Mutex<Vec<Arc<dyn EventHandler>>>>,
}

fn deliver(handlers: &Mutex<Vec<Arc<dyn EventHandler>>>, events: &[SessionEvent]) {
    let handlers = handlers.lock().unwrap().clone();
    for event in events {
        for handler in &handlers {
            handler.handle(event);
        }
    }
}

#[async_trait]
impl CopilotSession for FakeSession {
    fn id(&self) -> &str {
        "fake-session"
    }

    fn on(&self, handler: Arc<dyn EventHandler>) {
        self.log.push("on");
        self.handlers.lock().unwrap().push(handler);
    }

    async fn send(&self, prompt: &str) -> Result<(), ClientError> {
        self.log.push(format!("send:{}", prompt));
        if let Some(error) = &self.script.fail_send {
            return Err(error.clone());
        }

        match self.script.delivery {
            Delivery::Inline => deliver(&self.handlers, &self.script.events),
            Delivery::Spawned => {
                let handlers = self.handlers.clone();
                let events = self.script.events.clone();
                tokio::spawn(async move {
                    for event in events {
                        tokio::task::yield_now().await;
                        deliver(&handlers, std::slice::from_ref(&event));
                    }
                });
            }
        }
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ClientError> {
        self.log.push("destroy");
        Ok(())
    }
}

/// Status line that writes its calls into a [`Log`]
pub struct RecordingStatus {
    log: Arc<Log>,
    active: Mutex<bool>,
}

impl RecordingStatus {
    pub fn new(log: Arc<Log>) -> Arc<Self> {
        Arc::new(Self {
            log,
            active: Mutex::new(false),
        })
    }
}

impl StatusLine for RecordingStatus {
    fn start(&self, message: &str) {
        *self.active.lock().unwrap() = true;
        self.log.push(format!("status.start:{}", message));
    }

    fn update(&self, message: &str) {
        self.log.push(format!("status.update:{}", message));
    }

    fn stop(&self) {
        let mut active = self.active.lock().unwrap();
        if *active {
            self.log.push("status.stop");
        } else {
            self.log.push("status.stop:idle");
        }
        *active = false;
    }

    fn is_active(&self) -> bool {
        *self.active.lock().unwrap()
    }
}
