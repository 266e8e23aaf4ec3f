use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::super::domain::{
    BusinessTripApplication, ExpenseApplication, ExpenseItem, TravelRegulation, UserId,
    UserProfile,
};
use super::{
    IdentityProvider, Record, RecordFilter, RecordOrder, RecordStore, StoreBundle, StoreError,
};

/// Process-local table. Updates are applied under one lock, so a patch's
/// status precondition is checked and written atomically. Rows keep insertion
/// order, which breaks ties between equal timestamps.
#[derive(Debug)]
pub struct MemoryStore<R: Record> {
    table: Arc<Mutex<Table<R>>>,
}

#[derive(Debug)]
struct Table<R: Record> {
    rows: Vec<R>,
    index: HashMap<R::Id, usize>,
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                rows: Vec::new(),
                index: HashMap::new(),
            })),
        }
    }
}

impl<R: Record> Clone for MemoryStore<R> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<R: Record> MemoryStore<R> {
    fn lock(&self) -> Result<MutexGuard<'_, Table<R>>, StoreError> {
        self.table
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Number of rows currently held. Rows survive a poisoned lock, so the
    /// count is read through it.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryStore<R> {
    async fn list(&self, filter: &RecordFilter, order: RecordOrder) -> Result<Vec<R>, StoreError> {
        let mut rows: Vec<R> = {
            let table = self.lock()?;
            table
                .rows
                .iter()
                .filter(|record| record.matches(filter))
                .cloned()
                .collect()
        };

        match order {
            RecordOrder::CreatedDesc => rows.sort_by_key(|r| std::cmp::Reverse(r.created_at())),
            RecordOrder::CreatedAsc => rows.sort_by_key(|r| r.created_at()),
            RecordOrder::SubmittedAsc => {
                rows.sort_by_key(|r| (r.submitted_at().is_none(), r.submitted_at()))
            }
        }
        Ok(rows)
    }

    async fn get(&self, id: &R::Id) -> Result<Option<R>, StoreError> {
        let table = self.lock()?;
        Ok(table.index.get(id).map(|&slot| table.rows[slot].clone()))
    }

    async fn create(&self, record: R) -> Result<R, StoreError> {
        let mut table = self.lock()?;
        if table.index.contains_key(record.id()) {
            return Err(StoreError::Conflict);
        }
        let slot = table.rows.len();
        table.index.insert(record.id().clone(), slot);
        table.rows.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &R::Id, patch: R::Patch) -> Result<(), StoreError> {
        let mut table = self.lock()?;
        let slot = *table.index.get(id).ok_or(StoreError::NotFound)?;
        table.rows[slot].apply(patch)
    }
}

/// In-memory stores for every table the engine uses.
pub type MemoryStores = StoreBundle<
    MemoryStore<BusinessTripApplication>,
    MemoryStore<ExpenseApplication>,
    MemoryStore<ExpenseItem>,
    MemoryStore<TravelRegulation>,
>;

/// Identity collaborator backed by a fixed set of profiles.
#[derive(Debug, Default, Clone)]
pub struct MemoryDirectory {
    profiles: Arc<Mutex<HashMap<UserId, UserProfile>>>,
}

impl MemoryDirectory {
    pub fn with_profiles(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|profile| (profile.id.clone(), profile))
            .collect();
        Self {
            profiles: Arc::new(Mutex::new(profiles)),
        }
    }

    /// Add or replace a profile.
    pub fn insert(&self, profile: UserProfile) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        guard.insert(profile.id.clone(), profile);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<UserId, UserProfile>>, StoreError> {
        self.profiles
            .lock()
            .map_err(|_| StoreError::Unavailable("directory lock poisoned".to_string()))
    }
}

#[async_trait]
impl IdentityProvider for MemoryDirectory {
    async fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.lock()?.get(user_id).cloned())
    }
}
