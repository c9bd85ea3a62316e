//! In-memory `ResourceApi` used by unit tests

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::api::{ApiError, ResourceApi};
use crate::models::{EntityId, Resource};

#[derive(Default)]
struct Failures {
    list: VecDeque<(u16, String)>,
    create: VecDeque<(u16, String)>,
    delete: VecDeque<(u16, String)>,
}

pub(crate) struct MemoryApi<R> {
    items: Mutex<Vec<R>>,
    next_id: AtomicU64,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    failures: Mutex<Failures>,
}

impl<R> Default for MemoryApi<R> {
    fn default() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1000),
            list_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            failures: Mutex::new(Failures::default()),
        }
    }
}

impl<R: Resource> MemoryApi<R> {
    pub fn with_items(items: Vec<R>) -> Self {
        let api = Self::default();
        *api.items.lock().unwrap() = items;
        api
    }

    pub fn items(&self) -> Vec<R> {
        self.items.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_list(&self, status: u16, body: &str) {
        self.failures.lock().unwrap().list.push_back((status, body.to_string()));
    }

    pub fn fail_next_create(&self, status: u16, body: &str) {
        self.failures.lock().unwrap().create.push_back((status, body.to_string()));
    }

    pub fn fail_next_delete(&self, status: u16, body: &str) {
        self.failures.lock().unwrap().delete.push_back((status, body.to_string()));
    }

    fn build(&self, base: Value, payload: &Value, id: &EntityId) -> Result<R, ApiError> {
        let mut object = match base {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        if let Value::Object(fields) = payload {
            for (key, value) in fields {
                object.insert(key.clone(), value.clone());
            }
        }
        object.insert("id".to_string(), Value::String(id.to_string()));
        serde_json::from_value(Value::Object(object))
            .map_err(|e| ApiError::from_response(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()))
    }
}

fn failure(entry: Option<(u16, String)>) -> Result<(), ApiError> {
    match entry {
        Some((status, body)) => Err(ApiError::from_response(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            &body,
        )),
        None => Ok(()),
    }
}

#[async_trait]
impl<R: Resource> ResourceApi<R> for MemoryApi<R> {
    async fn list(&self) -> Result<Vec<R>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        failure(self.failures.lock().unwrap().list.pop_front())?;
        Ok(self.items())
    }

    async fn get(&self, id: &EntityId) -> Result<R, ApiError> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|item| item.id() == id)
            .cloned()
            .ok_or_else(|| ApiError::from_response(StatusCode::NOT_FOUND, ""))
    }

    async fn create(&self, payload: &Value) -> Result<R, ApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        failure(self.failures.lock().unwrap().create.pop_front())?;
        let id = EntityId::new(self.next_id.fetch_add(1, Ordering::SeqCst).to_string());
        let created = self.build(Value::Null, payload, &id)?;
        self.items.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &EntityId, payload: &Value) -> Result<R, ApiError> {
        let existing = self.get(id).await?;
        let base = serde_json::to_value(&existing).unwrap_or(Value::Null);
        let updated = self.build(base, payload, id)?;
        let mut items = self.items.lock().unwrap();
        if let Some(slot) = items.iter_mut().find(|item| item.id() == id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    async fn delete(&self, id: &EntityId) -> Result<(), ApiError> {
        failure(self.failures.lock().unwrap().delete.pop_front())?;
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|item| item.id() != id);
        if items.len() == before {
            return Err(ApiError::from_response(StatusCode::NOT_FOUND, ""));
        }
        Ok(())
    }
}
