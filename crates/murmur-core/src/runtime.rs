//! Process-wide service wiring.
//!
//! Every service is constructed once here and handed out explicitly; there
//! is no ambient global state. The runtime also bridges connectivity into
//! the outbound queue: coming back online re-triggers the drain loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::ai::{ChatRelayClient, SpeechClient};
use crate::chat::ChatService;
use crate::config::CoreConfig;
use crate::error::Result;
use crate::events::{CoreEvent, EventBus};
use crate::queue::{QueueSubscription, RequestQueue};
use crate::sandbox::SandboxClient;
use crate::store::{CollectionStore, ConversationStore, HttpStore, SettingsStore};
use crate::websearch::WebSearchClient;

pub struct CoreRuntime {
    config: CoreConfig,
    bus: EventBus,
    queue: RequestQueue,
    conversations: Arc<Mutex<ConversationStore>>,
    settings: Arc<Mutex<SettingsStore>>,
    chat: ChatService,
    speech: SpeechClient,
    sandbox: SandboxClient,
    websearch: WebSearchClient,
    online: AtomicBool,
    // Keeps queue mutations flowing onto the bus for the runtime's lifetime.
    _queue_events: QueueSubscription,
}

impl CoreRuntime {
    pub fn new(config: CoreConfig) -> Result<Self> {
        let client = reqwest::Client::new();
        let store: Arc<dyn CollectionStore> = Arc::new(HttpStore::new(
            client.clone(),
            config.backend_url.clone(),
            config.backend_key.clone(),
            config.access_token.clone(),
        ));
        Self::with_store(config, client, store)
    }

    /// Wire the runtime around an externally supplied store. Tests inject
    /// in-memory stores here.
    pub fn with_store(
        config: CoreConfig,
        client: reqwest::Client,
        store: Arc<dyn CollectionStore>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let bus = EventBus::new();
        let queue = RequestQueue::new();
        let queue_events = {
            let bus = bus.clone();
            queue.subscribe(move |snapshot| bus.emit(CoreEvent::QueueChanged(snapshot.to_vec())))
        };

        let conversations = Arc::new(Mutex::new(ConversationStore::new(
            Arc::clone(&store),
            config.user_id.clone(),
        )));

        let settings_user = config.is_authenticated().then(|| config.user_id.clone());
        let settings = Arc::new(Mutex::new(SettingsStore::new(
            Arc::clone(&store),
            &config.data_dir,
            settings_user,
        )));

        let bearer = config
            .access_token
            .clone()
            .unwrap_or_else(|| config.backend_key.clone());
        let relay = ChatRelayClient::new(client.clone(), config.backend_url.clone(), bearer);
        let chat = ChatService::new(
            Arc::clone(&conversations),
            Arc::clone(&store),
            relay,
            queue.clone(),
            config.user_id.clone(),
        );

        Ok(Self {
            bus,
            queue,
            conversations,
            settings,
            chat,
            speech: SpeechClient::new(client.clone()),
            sandbox: SandboxClient::new(client.clone()),
            websearch: WebSearchClient::new(client),
            online: AtomicBool::new(true),
            _queue_events: queue_events,
            config,
        })
    }

    /// Record a connectivity change. Going online re-triggers the outbound
    /// queue; repeated reports of the same state are no-ops.
    pub fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::SeqCst);
        if was == online {
            return;
        }
        tracing::info!(online, "connectivity changed");
        self.bus.emit(CoreEvent::ConnectivityChanged { online });
        if online {
            self.queue.retry_queue();
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn conversations(&self) -> Arc<Mutex<ConversationStore>> {
        Arc::clone(&self.conversations)
    }

    pub fn settings(&self) -> Arc<Mutex<SettingsStore>> {
        Arc::clone(&self.settings)
    }

    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    pub fn speech(&self) -> &SpeechClient {
        &self.speech
    }

    pub fn sandbox(&self) -> &SandboxClient {
        &self.sandbox
    }

    pub fn websearch(&self) -> &WebSearchClient {
        &self.websearch
    }
}
