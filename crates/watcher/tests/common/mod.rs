//! In-memory fakes shared by the pipeline and broadcast tests.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use breakwire_common::error::AppError;
use breakwire_common::store::SubscriberStore;
use breakwire_watcher::broadcast::{Courier, DeliveryOutcome, OutboundMessage};

/// Record of one attempted send.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub has_button: bool,
}

/// Courier fake that records every send. Outcomes can be scripted per chat
/// id; unscripted sends succeed.
#[derive(Default)]
pub struct RecordingCourier {
    sent: Mutex<Vec<SentMessage>>,
    scripts: Mutex<HashMap<i64, VecDeque<DeliveryOutcome>>>,
}

impl RecordingCourier {
    pub fn script(&self, chat_id: i64, outcomes: Vec<DeliveryOutcome>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(chat_id, outcomes.into());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<SentMessage> {
        self.sent()
            .into_iter()
            .filter(|message| message.chat_id == chat_id)
            .collect()
    }
}

#[async_trait]
impl Courier for RecordingCourier {
    async fn deliver(&self, chat_id: i64, message: &OutboundMessage) -> DeliveryOutcome {
        self.sent.lock().unwrap().push(SentMessage {
            chat_id,
            text: message.text.clone(),
            has_button: message.button_url.is_some(),
        });
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&chat_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(DeliveryOutcome::Delivered)
    }
}

/// In-memory subscriber set.
#[derive(Default)]
pub struct MemorySubscribers {
    chats: Mutex<BTreeSet<i64>>,
}

impl MemorySubscribers {
    pub fn with(ids: &[i64]) -> Self {
        Self {
            chats: Mutex::new(ids.iter().copied().collect()),
        }
    }

    /// Current contents in ascending order.
    pub fn snapshot(&self) -> Vec<i64> {
        self.chats.lock().unwrap().iter().copied().collect()
    }
}

#[async_trait]
impl SubscriberStore for MemorySubscribers {
    async fn create(&self, chat_id: i64) -> Result<(), AppError> {
        self.chats.lock().unwrap().insert(chat_id);
        Ok(())
    }

    async fn delete(&self, chat_id: i64) -> Result<(), AppError> {
        self.chats.lock().unwrap().remove(&chat_id);
        Ok(())
    }

    async fn exists(&self, chat_id: i64) -> Result<bool, AppError> {
        Ok(self.chats.lock().unwrap().contains(&chat_id))
    }

    async fn list_all(&self) -> Result<Vec<i64>, AppError> {
        Ok(self.snapshot())
    }
}
