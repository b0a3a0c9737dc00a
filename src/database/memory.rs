//! In-process store used by the test suite. Mirrors the unique indexes the
//! MongoDB store creates so duplicate handling behaves the same way.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{AshaWorkerRepository, ChatRepository, PatientRepository, UserRepository};
use crate::models::{AshaWorker, Chat, Patient, Section, User};
use crate::utils::{AppError, AppResult};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    asha_workers: Mutex<Vec<AshaWorker>>,
    patients: Mutex<Vec<Patient>>,
    chats: Mutex<Vec<Chat>>,
    sections: Mutex<Vec<Section>>,
    fail_user_writes: AtomicBool,
}

fn duplicate() -> AppError {
    AppError::Duplicate("Record already exists".to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patient_count(&self) -> usize {
        self.patients.lock().unwrap().len()
    }

    pub fn section_count(&self) -> usize {
        self.sections.lock().unwrap().len()
    }

    pub fn asha_worker_count(&self) -> usize {
        self.asha_workers.lock().unwrap().len()
    }

    /// Makes every later `UserRepository::replace` fail.
    pub fn fail_user_writes(&self, fail: bool) {
        self.fail_user_writes.store(fail, Ordering::SeqCst);
    }

    /// Direct write access for tests that need to age a record.
    pub fn update_user<F: FnOnce(&mut User)>(&self, email: &str, f: F) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.email == email) {
            f(user);
        }
    }
}

fn matches_search(patient: &Patient, search: Option<&str>) -> bool {
    match search.map(str::trim).filter(|t| !t.is_empty()) {
        None => true,
        Some(term) => {
            let term = term.to_lowercase();
            patient.name.to_lowercase().contains(&term)
                || patient
                    .village
                    .as_deref()
                    .map(|v| v.to_lowercase().contains(&term))
                    .unwrap_or(false)
                || patient.aadhar_number.contains(&term)
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == Some(*id)).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_google_id(&self, google_id: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.google_id.as_deref() == Some(google_id))
            .cloned())
    }

    async fn insert(&self, user: &User) -> AppResult<ObjectId> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(duplicate());
        }
        let id = ObjectId::new();
        let mut stored = user.clone();
        stored.id = Some(id);
        users.push(stored);
        Ok(id)
    }

    async fn replace(&self, user: &User) -> AppResult<()> {
        if self.fail_user_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("users write failed".to_string()));
        }
        let mut users = self.users.lock().unwrap();
        let slot = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        *slot = user.clone();
        Ok(())
    }
}

#[async_trait]
impl AshaWorkerRepository for MemoryStore {
    async fn find_by_user(&self, user_id: &ObjectId) -> AppResult<Option<AshaWorker>> {
        Ok(self
            .asha_workers
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.user_id == *user_id)
            .cloned())
    }

    async fn find_by_asha_id(&self, asha_id: &str) -> AppResult<Option<AshaWorker>> {
        Ok(self
            .asha_workers
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.asha_id == asha_id)
            .cloned())
    }

    async fn insert(&self, worker: &AshaWorker) -> AppResult<ObjectId> {
        let mut workers = self.asha_workers.lock().unwrap();
        if workers
            .iter()
            .any(|w| w.asha_id == worker.asha_id || w.user_id == worker.user_id)
        {
            return Err(duplicate());
        }
        let id = ObjectId::new();
        let mut stored = worker.clone();
        stored.id = Some(id);
        workers.push(stored);
        Ok(id)
    }

    async fn delete(&self, id: &ObjectId) -> AppResult<bool> {
        let mut workers = self.asha_workers.lock().unwrap();
        let before = workers.len();
        workers.retain(|w| w.id != Some(*id));
        Ok(workers.len() != before)
    }
}

#[async_trait]
impl PatientRepository for MemoryStore {
    async fn insert(&self, patient: &Patient) -> AppResult<ObjectId> {
        let mut patients = self.patients.lock().unwrap();
        if patients.iter().any(|p| p.aadhar_number == patient.aadhar_number) {
            return Err(duplicate());
        }
        let id = ObjectId::new();
        let mut stored = patient.clone();
        stored.id = Some(id);
        patients.push(stored);
        Ok(id)
    }

    async fn find_by_aadhar(&self, aadhar: &str) -> AppResult<Option<Patient>> {
        Ok(self
            .patients
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.aadhar_number == aadhar)
            .cloned())
    }

    async fn find_owned(&self, id: &ObjectId, owner: &ObjectId) -> AppResult<Option<Patient>> {
        Ok(self
            .patients
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == Some(*id) && p.registered_by == *owner)
            .cloned())
    }

    async fn list_owned(
        &self,
        owner: &ObjectId,
        search: Option<&str>,
        skip: u64,
        limit: i64,
    ) -> AppResult<Vec<Patient>> {
        let patients = self.patients.lock().unwrap();
        // Newest first: later inserts sit at the end of the vector
        Ok(patients
            .iter()
            .rev()
            .filter(|p| p.registered_by == *owner && matches_search(p, search))
            .skip(skip as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_owned(&self, owner: &ObjectId, search: Option<&str>) -> AppResult<u64> {
        Ok(self
            .patients
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.registered_by == *owner && matches_search(p, search))
            .count() as u64)
    }

    async fn replace(&self, patient: &Patient) -> AppResult<()> {
        let mut patients = self.patients.lock().unwrap();
        if patients
            .iter()
            .any(|p| p.id != patient.id && p.aadhar_number == patient.aadhar_number)
        {
            return Err(duplicate());
        }
        let slot = patients
            .iter_mut()
            .find(|p| p.id == patient.id && p.registered_by == patient.registered_by)
            .ok_or_else(|| AppError::not_found("Patient not found"))?;
        *slot = patient.clone();
        Ok(())
    }

    async fn delete_owned(&self, id: &ObjectId, owner: &ObjectId) -> AppResult<bool> {
        let mut patients = self.patients.lock().unwrap();
        let before = patients.len();
        patients.retain(|p| !(p.id == Some(*id) && p.registered_by == *owner));
        Ok(patients.len() < before)
    }
}

#[async_trait]
impl ChatRepository for MemoryStore {
    async fn insert_chat(&self, chat: &Chat) -> AppResult<ObjectId> {
        let id = ObjectId::new();
        let mut stored = chat.clone();
        stored.id = Some(id);
        self.chats.lock().unwrap().push(stored);
        Ok(id)
    }

    async fn find_chat(&self, id: &ObjectId, owner: &ObjectId) -> AppResult<Option<Chat>> {
        Ok(self
            .chats
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == Some(*id) && c.user_id == *owner)
            .cloned())
    }

    async fn list_chats(&self, owner: &ObjectId) -> AppResult<Vec<Chat>> {
        let mut chats: Vec<Chat> = self
            .chats
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == *owner)
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(chats)
    }

    async fn replace_chat(&self, chat: &Chat) -> AppResult<()> {
        let mut chats = self.chats.lock().unwrap();
        if let Some(slot) = chats.iter_mut().find(|c| c.id == chat.id) {
            *slot = chat.clone();
        }
        Ok(())
    }

    async fn delete_chat(&self, id: &ObjectId, owner: &ObjectId) -> AppResult<bool> {
        let mut chats = self.chats.lock().unwrap();
        let before = chats.len();
        chats.retain(|c| !(c.id == Some(*id) && c.user_id == *owner));
        if chats.len() == before {
            return Ok(false);
        }
        self.sections.lock().unwrap().retain(|s| s.chat_id != *id);
        Ok(true)
    }

    async fn insert_section(&self, section: &Section) -> AppResult<ObjectId> {
        let id = ObjectId::new();
        let mut stored = section.clone();
        stored.id = Some(id);
        self.sections.lock().unwrap().push(stored);
        Ok(id)
    }

    async fn list_sections(&self, chat_id: &ObjectId) -> AppResult<Vec<Section>> {
        Ok(self
            .sections
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.chat_id == *chat_id)
            .cloned()
            .collect())
    }
}
