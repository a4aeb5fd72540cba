//! Registry of ad-hoc SQL addressed by small integer ids.
//!
//! SQL that no model operation generates (joins, aggregates, bulk updates)
//! is registered once as a builder closure and executed by id. The closure
//! receives the active [`Driver`] so it can render dialect specific text.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::driver::Driver;
use crate::fieldset::SqlType;

type SqlCreator = Box<dyn Fn(&dyn Driver) -> String + Send + Sync>;

static NEXT_REGISTRY: AtomicU32 = AtomicU32::new(1);

/// Handle returned by [`SqlRegistry::register`].
///
/// An id carries the token of the registry that issued it, so it only
/// resolves there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SqlId {
    registry: u32,
    index: u32,
}

impl SqlId {
    /// Cache identity of this id, disjoint from every model operation.
    #[must_use]
    pub fn identity(self) -> u64 {
        SqlType::ById.bits() | u64::from(self.index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for SqlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sql#{}.{}", self.registry, self.index)
    }
}

pub struct SqlRegistry {
    token: u32,
    creators: RwLock<Vec<SqlCreator>>,
}

impl Default for SqlRegistry {
    fn default() -> Self {
        Self {
            token: NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed),
            creators: RwLock::new(Vec::new()),
        }
    }
}

impl fmt::Debug for SqlRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl SqlRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a SQL builder; ids are handed out sequentially from 0.
    ///
    /// # Panics
    /// After `u32::MAX` registrations.
    pub fn register<F>(&self, create: F) -> SqlId
    where
        F: Fn(&dyn Driver) -> String + Send + Sync + 'static,
    {
        let mut creators = self.creators.write().unwrap_or_else(PoisonError::into_inner);
        let index = u32::try_from(creators.len()).unwrap_or_else(|_| panic!("sql registry is full"));
        creators.push(Box::new(create));
        SqlId {
            registry: self.token,
            index,
        }
    }

    /// Register fixed SQL text.
    pub fn register_sql(&self, sql: impl Into<String>) -> SqlId {
        let sql = sql.into();
        self.register(move |_| sql.clone())
    }

    /// Whether `id` was issued by this registry.
    #[must_use]
    pub fn contains(&self, id: SqlId) -> bool {
        id.registry == self.token && id.index() < self.len()
    }

    /// Render the SQL registered under `id`; `None` for ids of other
    /// registries.
    #[must_use]
    pub fn sql(&self, id: SqlId, driver: &dyn Driver) -> Option<String> {
        if id.registry != self.token {
            return None;
        }
        let creators = self.creators.read().unwrap_or_else(PoisonError::into_inner);
        creators.get(id.index()).map(|create| create(driver))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.creators.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
