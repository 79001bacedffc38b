use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;

use crate::domain::principal::errors::PrincipalError;
use crate::domain::principal::models::Identifier;
use crate::domain::principal::models::NewPrincipal;
use crate::domain::principal::models::Principal;
use crate::domain::principal::models::PrincipalId;
use crate::domain::principal::ports::PrincipalRepository;

/// Process-local principal store.
///
/// Same contract as the Postgres adapter, including the version check on
/// save. Used for `storage.backend = "memory"` and in tests.
#[derive(Default)]
pub struct InMemoryPrincipalRepository {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    principals: HashMap<PrincipalId, Principal>,
    last_id: i64,
}

impl InMemoryPrincipalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, PrincipalError> {
        self.state
            .lock()
            .map_err(|_| PrincipalError::Unknown("principal store lock poisoned".to_string()))
    }
}

#[async_trait]
impl PrincipalRepository for InMemoryPrincipalRepository {
    async fn create(&self, principal: NewPrincipal) -> Result<Principal, PrincipalError> {
        let mut state = self.lock()?;

        if state
            .principals
            .values()
            .any(|existing| existing.identifier == principal.identifier)
        {
            return Err(PrincipalError::AlreadyExists(
                principal.identifier.to_string(),
            ));
        }

        state.last_id += 1;
        let created = Principal {
            id: PrincipalId(state.last_id),
            identifier: principal.identifier,
            password_hash: principal.password_hash,
            role: principal.role,
            failed_attempts: 0,
            lock_until: None,
            is_locked: false,
            version: 0,
        };
        state.principals.insert(created.id, created.clone());

        Ok(created)
    }

    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, PrincipalError> {
        Ok(self.lock()?.principals.get(&id).cloned())
    }

    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Principal>, PrincipalError> {
        Ok(self
            .lock()?
            .principals
            .values()
            .find(|principal| &principal.identifier == identifier)
            .cloned())
    }

    async fn save(&self, principal: &Principal) -> Result<Principal, PrincipalError> {
        let mut state = self.lock()?;

        let stored = state
            .principals
            .get_mut(&principal.id)
            .ok_or_else(|| PrincipalError::NotFound(principal.id.to_string()))?;

        if stored.version != principal.version {
            return Err(PrincipalError::Conflict(principal.id.to_string()));
        }

        let mut saved = principal.clone();
        saved.identifier = stored.identifier.clone();
        saved.version += 1;
        *stored = saved.clone();

        Ok(saved)
    }
}
