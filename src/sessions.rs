// Saved sessions and the in-progress cart, both persisted through a KeyValueStore

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};

use crate::catalog::Catalog;
use crate::error::{AppError, StoreError};
use crate::model::SessionRecord;
use crate::store::KeyValueStore;

pub const SESSIONS_KEY: &str = "savedSessions";
pub const SESSION_ID_HIGH_WATER_KEY: &str = "sessionIdHighWater";
pub const CART_KEY: &str = "selectedDrills";

type Listener = Box<dyn Fn(&[SessionRecord])>;

/// Saved sessions stored as one JSON list under `savedSessions`.
///
/// The list is only ever replaced whole: saving appends and rewrites, deleting
/// filters and rewrites.
pub struct SessionStore<S: KeyValueStore> {
    store: S,
    listeners: Vec<Listener>,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            listeners: Vec::new(),
        }
    }

    pub fn list(&self) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.store.get_json(SESSIONS_KEY)?.unwrap_or_default())
    }

    pub fn get(&self, id: u64) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.list()?.into_iter().find(|s| s.id == id))
    }

    pub fn save(&self, name: &str, drills: &[u32]) -> Result<SessionRecord, AppError> {
        self.save_at(name, drills, Utc::now())
    }

    pub fn save_at(
        &self,
        name: &str,
        drills: &[u32],
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::SessionError("a session needs a name".to_string()));
        }

        let record = SessionRecord {
            id: self.next_id(now)?,
            name: name.to_string(),
            drills: drills.to_vec(),
            created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let mut sessions = self.list()?;
        sessions.push(record.clone());
        self.store.set_json(SESSIONS_KEY, &sessions)?;
        log::info!("Saved session {} ({} drills)", record.id, record.drills.len());
        self.notify(&sessions);
        Ok(record)
    }

    /// Returns whether a session was removed.
    pub fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let sessions = self.list()?;
        let before = sessions.len();
        let remaining: Vec<SessionRecord> = sessions.into_iter().filter(|s| s.id != id).collect();
        if remaining.len() == before {
            return Ok(false);
        }
        self.store.set_json(SESSIONS_KEY, &remaining)?;
        self.notify(&remaining);
        Ok(true)
    }

    /// How often each drill appears across all saved sessions.
    pub fn drill_usage(&self) -> Result<HashMap<u32, usize>, StoreError> {
        let mut usage = HashMap::new();
        for session in self.list()? {
            for id in session.drills {
                *usage.entry(id).or_insert(0) += 1;
            }
        }
        Ok(usage)
    }

    pub fn subscribe(&mut self, listener: impl Fn(&[SessionRecord]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&self, sessions: &[SessionRecord]) {
        for listener in &self.listeners {
            listener(sessions);
        }
    }

    /// Millisecond timestamp, bumped past the persisted high-water mark so two
    /// saves in the same millisecond still get distinct ids.
    fn next_id(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let high_water: u64 = self.store.get_json(SESSION_ID_HIGH_WATER_KEY)?.unwrap_or(0);
        let existing_max = self.list()?.iter().map(|s| s.id).max().unwrap_or(0);
        let floor = high_water.max(existing_max);
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = millis.max(floor + 1);
        self.store.set_json(SESSION_ID_HIGH_WATER_KEY, &id)?;
        Ok(id)
    }
}

/// `Training - DD/MM/YY` for the day after `today`.
pub fn default_session_name(today: NaiveDate) -> String {
    let tomorrow = today + Duration::days(1);
    format!("Training - {}", tomorrow.format("%d/%m/%y"))
}

/// The unsaved selection being assembled. Holds drill ids in running order.
pub struct Cart<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Cart<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn ids(&self) -> Result<Vec<u32>, StoreError> {
        Ok(self.store.get_json(CART_KEY)?.unwrap_or_default())
    }

    pub fn contains(&self, id: u32) -> Result<bool, StoreError> {
        Ok(self.ids()?.contains(&id))
    }

    /// Returns false when the drill was already in the cart.
    pub fn add(&self, id: u32) -> Result<bool, StoreError> {
        let mut ids = self.ids()?;
        if ids.contains(&id) {
            return Ok(false);
        }
        ids.push(id);
        self.store.set_json(CART_KEY, &ids)?;
        Ok(true)
    }

    pub fn remove(&self, id: u32) -> Result<bool, StoreError> {
        let ids = self.ids()?;
        let before = ids.len();
        let ids: Vec<u32> = ids.into_iter().filter(|d| *d != id).collect();
        if ids.len() == before {
            return Ok(false);
        }
        self.store.set_json(CART_KEY, &ids)?;
        Ok(true)
    }

    /// Move the drill at `from` to position `to`, shifting the rest.
    pub fn reorder(&self, from: usize, to: usize) -> Result<(), AppError> {
        let mut ids = self.ids()?;
        if from >= ids.len() || to >= ids.len() {
            return Err(AppError::SessionError(format!(
                "position out of range (cart holds {} drills)",
                ids.len()
            )));
        }
        if from != to {
            let moved = ids.remove(from);
            ids.insert(to, moved);
            self.store.set_json(CART_KEY, &ids)?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.set_json(CART_KEY, &Vec::<u32>::new())
    }

    pub fn total_duration(&self, catalog: &Catalog) -> Result<u32, StoreError> {
        Ok(catalog
            .resolve(&self.ids()?)
            .iter()
            .map(|d| d.duration_minutes)
            .sum())
    }

    /// Replace the cart with a saved session's drills. Ids already added are
    /// skipped, as with `add`.
    pub fn load_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        self.clear()?;
        for id in &session.drills {
            self.add(*id)?;
        }
        Ok(())
    }
}
