//! Realtime Reconciler
//!
//! Watches the change-notification feed for one list and forces a silent
//! reload of the [`ListStore`] whenever another client touches the list,
//! its groups, or any item.
//!
//! The feed cannot filter item rows by list, so item bindings are global;
//! the reload only re-reads rows of this list, which absorbs the noise.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::datastore::Datastore;
use crate::models::{TodoGroup, TodoItem, TodoList};
use crate::store::ListStore;

// ========================
// Feed types
// ========================

/// Watched record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Lists,
    Groups,
    Items,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Lists => "todo_lists",
            Table::Groups => "todo_groups",
            Table::Items => "todo_items",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row carried by a change event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "table", content = "row", rename_all = "snake_case")]
pub enum Record {
    List(TodoList),
    Group(TodoGroup),
    Item(TodoItem),
}

impl Record {
    pub fn table(&self) -> Table {
        match self {
            Record::List(_) => Table::Lists,
            Record::Group(_) => Table::Groups,
            Record::Item(_) => Table::Items,
        }
    }

    /// Value of an identifier column, as text
    pub fn column(&self, name: &str) -> Option<String> {
        let value = match (self, name) {
            (Record::List(l), "id") => l.id,
            (Record::Group(g), "id") => g.id,
            (Record::Group(g), "list_id") => g.list_id,
            (Record::Item(i), "id") => i.id,
            (Record::Item(i), "list_id") => i.list_id,
            (Record::Item(i), "group_id") => i.group_id,
            _ => return None,
        };
        Some(value.to_string())
    }
}

/// One insert, update or delete observed on a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub table: Table,
    /// Row after the change; absent for deletes
    pub new: Option<Record>,
    /// Row before the change; absent for inserts
    pub old: Option<Record>,
}

impl ChangeEvent {
    pub fn insert(record: Record) -> Self {
        Self {
            kind: ChangeKind::Insert,
            table: record.table(),
            new: Some(record),
            old: None,
        }
    }

    pub fn update(old: Record, new: Record) -> Self {
        Self {
            kind: ChangeKind::Update,
            table: new.table(),
            new: Some(new),
            old: Some(old),
        }
    }

    pub fn delete(old: Record) -> Self {
        Self {
            kind: ChangeKind::Delete,
            table: old.table(),
            new: None,
            old: Some(old),
        }
    }
}

/// Equality predicate on one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

impl RowFilter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }
}

/// Which events a handler wants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBinding {
    pub table: Table,
    pub filter: Option<RowFilter>,
}

impl ChangeBinding {
    pub fn table(table: Table) -> Self {
        Self { table, filter: None }
    }

    pub fn filtered(table: Table, filter: RowFilter) -> Self {
        Self {
            table,
            filter: Some(filter),
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }
        let Some(filter) = &self.filter else {
            return true;
        };
        // Deletes only carry the old row
        event
            .new
            .as_ref()
            .or(event.old.as_ref())
            .and_then(|row| row.column(&filter.column))
            .is_some_and(|value| value == filter.value)
    }
}

pub type ChangeHandler = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;
pub type StatusHandler = Arc<dyn Fn(ChannelStatus) + Send + Sync>;

/// Subscription state reported by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Subscribed,
    Closed,
    ChannelError,
}

/// A topic and the handlers bound on it
pub struct ChannelSpec {
    pub topic: String,
    pub bindings: Vec<(ChangeBinding, ChangeHandler)>,
}

impl ChannelSpec {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            bindings: Vec::new(),
        }
    }

    pub fn on(mut self, binding: ChangeBinding, handler: ChangeHandler) -> Self {
        self.bindings.push((binding, handler));
        self
    }

    /// Run every handler whose binding matches
    pub fn dispatch(&self, event: &ChangeEvent) -> usize {
        let mut delivered = 0;
        for (binding, handler) in &self.bindings {
            if binding.matches(event) {
                handler(event);
                delivered += 1;
            }
        }
        delivered
    }
}

/// Push channel of row changes.
///
/// Reconnection policy belongs to the implementation.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, spec: ChannelSpec, on_status: StatusHandler) -> Box<dyn Subscription>;
}

/// Live subscription; handlers stop firing once unsubscribed
pub trait Subscription: Send {
    fn unsubscribe(&mut self);
}

// ========================
// List sync
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Connecting,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Connecting => "connecting",
        }
    }
}

pub fn list_topic(list_id: Uuid) -> String {
    format!("list:{}", list_id)
}

/// Handlers to wire for one list; `None` skips that table
#[derive(Clone)]
pub struct SyncOptions {
    pub list_id: Uuid,
    pub on_list_change: Option<ChangeHandler>,
    pub on_group_change: Option<ChangeHandler>,
    pub on_item_change: Option<ChangeHandler>,
}

impl SyncOptions {
    fn into_spec(self) -> ChannelSpec {
        let mut spec = ChannelSpec::new(list_topic(self.list_id));
        if let Some(handler) = self.on_list_change {
            spec = spec.on(
                ChangeBinding::filtered(Table::Lists, RowFilter::eq("id", self.list_id)),
                handler,
            );
        }
        if let Some(handler) = self.on_group_change {
            spec = spec.on(
                ChangeBinding::filtered(Table::Groups, RowFilter::eq("list_id", self.list_id)),
                handler,
            );
        }
        if let Some(handler) = self.on_item_change {
            spec = spec.on(ChangeBinding::table(Table::Items), handler);
        }
        spec
    }
}

/// Subscription to one list's topic with a binary connection status
pub struct TodoSync {
    list_id: Uuid,
    connected: Arc<AtomicBool>,
    subscription: Option<Box<dyn Subscription>>,
}

impl TodoSync {
    pub fn subscribe<F: ChangeFeed + ?Sized>(feed: &F, options: SyncOptions) -> Self {
        let list_id = options.list_id;
        let connected = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&connected);
        let on_status: StatusHandler = Arc::new(move |status: ChannelStatus| {
            log::debug!("Channel {} status: {:?}", list_topic(list_id), status);
            flag.store(status == ChannelStatus::Subscribed, Ordering::SeqCst);
        });

        let subscription = feed.subscribe(options.into_spec(), on_status);
        Self {
            list_id,
            connected,
            subscription: Some(subscription),
        }
    }

    pub fn list_id(&self) -> Uuid {
        self.list_id
    }

    pub fn status(&self) -> ConnectionStatus {
        if self.connected.load(Ordering::SeqCst) {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Connecting
        }
    }

    /// Drop the subscription; safe to call more than once
    pub fn unsubscribe(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Replace the subscription after the list id or handlers changed
    pub fn resubscribe<F: ChangeFeed + ?Sized>(&mut self, feed: &F, options: SyncOptions) {
        self.unsubscribe();
        *self = Self::subscribe(feed, options);
    }
}

impl Drop for TodoSync {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Keeps a [`ListStore`] in step with changes made elsewhere.
///
/// Every matching event requests a silent reload; requests arriving while
/// one is pending collapse into it.
pub struct Reconciler {
    sync: TodoSync,
    worker: Option<JoinHandle<()>>,
}

impl Reconciler {
    /// Subscribe and start the reload worker. Must run inside a tokio runtime.
    pub fn start<F, D>(feed: &F, store: ListStore<D>) -> Self
    where
        F: ChangeFeed + ?Sized,
        D: Datastore + ?Sized + 'static,
    {
        let pending = Arc::new(Notify::new());

        let trigger: ChangeHandler = {
            let pending = Arc::clone(&pending);
            Arc::new(move |event: &ChangeEvent| {
                log::trace!("{:?} on {}", event.kind, event.table.as_str());
                pending.notify_one();
            })
        };

        let sync = TodoSync::subscribe(
            feed,
            SyncOptions {
                list_id: store.list_id(),
                on_list_change: Some(Arc::clone(&trigger)),
                on_group_change: Some(Arc::clone(&trigger)),
                on_item_change: Some(trigger),
            },
        );

        let worker = tokio::spawn(async move {
            loop {
                pending.notified().await;
                if let Err(e) = store.load_list(true).await {
                    log::warn!("Background reload of list {} failed: {}", store.list_id(), e);
                }
            }
        });

        Self {
            sync,
            worker: Some(worker),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.sync.status()
    }

    pub fn stop(&mut self) {
        self.sync.unsubscribe();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.stop();
    }
}
