
pub mod worker_settings;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::channel::{Channel, Internal};
use crate::entity_state::{EntityState, Lifecycle};
use crate::error::Result;
use crate::event::{Event, EventEmitter};
use crate::ortc;
use crate::router::{Router, RouterOptions};
use worker_settings::WorkerSettings;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerDump {
    pub pid: u32,
    pub router_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Died fires when the link to the worker goes down without `close`.
    Died,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorkerEventKind {
    Died,
}

impl Event for WorkerEvent {
    type Kind = WorkerEventKind;

    fn kind(&self) -> Self::Kind {
        WorkerEventKind::Died
    }
}

#[derive(Debug, Clone)]
pub enum WorkerObserverEvent {
    Close,
    NewRouter(Arc<Router>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorkerObserverEventKind {
    Close,
    NewRouter,
}

impl Event for WorkerObserverEvent {
    type Kind = WorkerObserverEventKind;

    fn kind(&self) -> Self::Kind {
        match self {
            WorkerObserverEvent::Close => WorkerObserverEventKind::Close,
            WorkerObserverEvent::NewRouter(_) => WorkerObserverEventKind::NewRouter,
        }
    }
}

/// Worker is the handle to one media worker reached over a byte stream
/// pair, typically the pipes of a child process.
pub struct Worker {
    channel: Channel,
    settings: WorkerSettings,
    weak_self: Weak<Worker>,
    lifecycle: Lifecycle,
    routers: Mutex<HashMap<String, Arc<Router>>>,

    events: EventEmitter<WorkerEvent>,
    observer: EventEmitter<WorkerObserverEvent>,
}

impl Worker {
    /// new starts the channel over the given streams. Must be called from
    /// within a tokio runtime.
    pub async fn new<R, W>(reader: R, writer: W, settings: WorkerSettings) -> Arc<Worker>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let channel = Channel::new(reader, writer, &settings);
        let worker = Arc::new_cyclic(|weak_self| Worker {
            channel: channel.clone(),
            settings,
            weak_self: weak_self.clone(),
            lifecycle: Lifecycle::new(),
            routers: Mutex::new(HashMap::new()),
            events: EventEmitter::new(),
            observer: EventEmitter::new(),
        });

        let weak_worker = Arc::downgrade(&worker);
        channel
            .on_close(Box::new(move || {
                Box::pin(async move {
                    if let Some(worker) = weak_worker.upgrade() {
                        worker.died().await;
                    }
                })
            }))
            .await;

        worker
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn state(&self) -> EntityState {
        self.lifecycle.state()
    }

    pub fn closed(&self) -> bool {
        self.lifecycle.state() == EntityState::Closed
    }

    pub fn events(&self) -> &EventEmitter<WorkerEvent> {
        &self.events
    }

    pub fn observer(&self) -> &EventEmitter<WorkerObserverEvent> {
        &self.observer
    }

    pub async fn router(&self, id: &str) -> Option<Arc<Router>> {
        self.routers.lock().await.get(id).cloned()
    }

    pub async fn dump(&self) -> Result<WorkerDump> {
        self.lifecycle.ensure_open()?;
        self.channel
            .request_typed("worker.dump", &Internal::default(), &())
            .await
    }

    /// create_router validates the media codecs, assigns their payload
    /// types and asks the worker for a new router.
    pub async fn create_router(&self, options: RouterOptions) -> Result<Arc<Router>> {
        self.lifecycle.ensure_open()?;

        let rtp_capabilities = ortc::generate_router_rtp_capabilities(&options.media_codecs)?;
        let id = Uuid::new_v4().to_string();
        self.channel
            .request("worker.createRouter", &Internal::router(&id), &())
            .await?;

        let router = Router::new(
            id.clone(),
            rtp_capabilities,
            options.app_data,
            self.channel.clone(),
            self.weak_self.clone(),
        );
        self.routers
            .lock()
            .await
            .insert(id.clone(), Arc::clone(&router));

        log::debug!("new router [router_id:{id}]");
        self.observer
            .emit(WorkerObserverEvent::NewRouter(Arc::clone(&router)))
            .await;

        Ok(router)
    }

    pub(crate) async fn remove_router(&self, id: &str) {
        self.routers.lock().await.remove(id);
    }

    /// close closes every router and then the channel.
    pub async fn close(&self) -> Result<()> {
        self.lifecycle.begin_close()?;
        log::debug!("close worker");

        if let Err(err) = self
            .channel
            .request("worker.close", &Internal::default(), &())
            .await
        {
            log::warn!("worker.close failed: {err}");
        }

        self.close_routers().await;
        self.channel.close().await;
        self.lifecycle.finish_close();

        self.observer.emit(WorkerObserverEvent::Close).await;
        self.clear_handlers().await;
        Ok(())
    }

    async fn died(&self) {
        if self.lifecycle.begin_close().is_err() {
            return;
        }
        log::error!("worker died, closing routers");

        self.close_routers().await;
        self.lifecycle.finish_close();

        self.events.emit(WorkerEvent::Died).await;
        self.observer.emit(WorkerObserverEvent::Close).await;
        self.clear_handlers().await;
    }

    async fn close_routers(&self) {
        let routers: Vec<Arc<Router>> = self
            .routers
            .lock()
            .await
            .drain()
            .map(|(_, router)| router)
            .collect();
        for router in routers {
            router.worker_closed().await;
        }
    }

    async fn clear_handlers(&self) {
        self.events.clear().await;
        self.observer.clear().await;
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("state", &self.lifecycle.state())
            .finish()
    }
}
