//! Process-wide extension registration service.
//!
//! # Responsibility
//! - Map extensible owner type keys to the ordered registrations that apply
//!   to their instances.
//! - Validate registrations at registration time, not at dispatch time.
//! - Serve read-mostly snapshot lookups to concurrently running owners.
//!
//! # Invariants
//! - Entry vectors are copy-on-write: writers clone-and-swap under the
//!   write lock, readers clone `Arc`s and never hold the lock while
//!   instantiating hooks.
//! - A registration is visible to owner materializations that start after
//!   `register` returns; already-materialized owners keep their list.
//! - Snapshot ordering is deterministic: ascending order value, then
//!   registration sequence for equal orders.

use crate::extension::owner::Extensible;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type RegistryResult<T> = Result<T, RegistrationError>;

static SHARED_REGISTRY: Lazy<Arc<ExtensionRegistry>> =
    Lazy::new(|| Arc::new(ExtensionRegistry::new()));

/// Returns the process-wide registry used for application wiring.
///
/// Tests and embedders that need isolation should construct their own
/// [`ExtensionRegistry`] and inject it instead.
pub fn shared_registry() -> Arc<ExtensionRegistry> {
    Arc::clone(&SHARED_REGISTRY)
}

/// Typed hook factory for one extension registration.
///
/// The factory is invoked once per owner instance, with the owner as
/// argument, when the owner materializes its hook list.
pub struct ExtensionFactory<O: Extensible> {
    create: Arc<dyn Fn(&O) -> Rc<O::Hooks> + Send + Sync>,
}

impl<O: Extensible> ExtensionFactory<O> {
    pub fn new(create: impl Fn(&O) -> Rc<O::Hooks> + Send + Sync + 'static) -> Self {
        Self {
            create: Arc::new(create),
        }
    }
}

impl<O: Extensible> Clone for ExtensionFactory<O> {
    fn clone(&self) -> Self {
        Self {
            create: Arc::clone(&self.create),
        }
    }
}

/// Typed factory for one contribution registration.
///
/// Contributions add new objects to a container owner instead of overriding
/// its behavior; instances are filtered by concrete type at lookup.
pub struct ContributionFactory<O: Extensible> {
    create: Arc<dyn Fn(&O) -> Rc<dyn Any> + Send + Sync>,
}

impl<O: Extensible> ContributionFactory<O> {
    pub fn new(create: impl Fn(&O) -> Rc<dyn Any> + Send + Sync + 'static) -> Self {
        Self {
            create: Arc::new(create),
        }
    }
}

impl<O: Extensible> Clone for ContributionFactory<O> {
    fn clone(&self) -> Self {
        Self {
            create: Arc::clone(&self.create),
        }
    }
}

/// One extension registration for owner type `O`.
pub struct ExtensionRegistration<O: Extensible> {
    /// Stable extension id, e.g. `demo.validation.uppercase`.
    pub extension_id: String,
    /// Registry type key the registration targets; must be a member of
    /// `O::type_lineage()`. Defaults to the most specific lineage key.
    pub owner_key: String,
    /// Chain position weight; lower orders run earlier (further from base).
    pub order: f64,
    /// Disabled registrations are kept but excluded from snapshots.
    pub enabled: bool,
    /// Optional container anchor restricting the registration to owners
    /// nested inside that anchor.
    pub scope_anchor: Option<String>,
    pub factory: ExtensionFactory<O>,
}

impl<O: Extensible> ExtensionRegistration<O> {
    pub fn new(extension_id: impl Into<String>, order: f64, factory: ExtensionFactory<O>) -> Self {
        Self {
            extension_id: extension_id.into(),
            owner_key: O::type_lineage().first().copied().unwrap_or_default().to_string(),
            order,
            enabled: true,
            scope_anchor: None,
            factory,
        }
    }
}

/// One contribution registration for container owner type `O`.
pub struct ContributionRegistration<O: Extensible> {
    pub contribution_id: String,
    pub owner_key: String,
    pub order: f64,
    pub enabled: bool,
    pub scope_anchor: Option<String>,
    pub factory: ContributionFactory<O>,
}

impl<O: Extensible> ContributionRegistration<O> {
    pub fn new(
        contribution_id: impl Into<String>,
        order: f64,
        factory: ContributionFactory<O>,
    ) -> Self {
        Self {
            contribution_id: contribution_id.into(),
            owner_key: O::type_lineage().first().copied().unwrap_or_default().to_string(),
            order,
            enabled: true,
            scope_anchor: None,
            factory,
        }
    }
}

/// Ordered snapshot element returned by [`ExtensionRegistry::snapshot_for`].
pub struct ResolvedExtension<O: Extensible> {
    pub extension_id: String,
    pub order: f64,
    seq: u64,
    create: Arc<dyn Fn(&O) -> Rc<O::Hooks> + Send + Sync>,
}

impl<O: Extensible> ResolvedExtension<O> {
    /// Instantiates the extension's hook object for one owner instance.
    pub fn instantiate(&self, owner: &O) -> Rc<O::Hooks> {
        (self.create)(owner)
    }
}

#[derive(Clone)]
struct RegistryEntry {
    id: String,
    owner_key: String,
    order: f64,
    seq: u64,
    enabled: bool,
    scope_anchor: Option<String>,
    factory: Arc<dyn Any + Send + Sync>,
}

type EntryTable = HashMap<String, Arc<Vec<Arc<RegistryEntry>>>>;

/// Process-wide directory of extension and contribution registrations.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: RwLock<EntryTable>,
    contributions: RwLock<EntryTable>,
    registration_seq: AtomicU64,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one extension for owner type `O`.
    ///
    /// Validation happens here, not at dispatch time. Re-registering the
    /// same `(extension_id, owner_key)` replaces the previous entry.
    ///
    /// # Errors
    /// - Malformed extension id, owner key, or scope anchor.
    /// - Owner key outside `O::type_lineage()`.
    /// - Non-finite order value.
    pub fn register<O: Extensible>(
        &self,
        registration: ExtensionRegistration<O>,
    ) -> RegistryResult<()> {
        validate_registration::<O>(
            &registration.extension_id,
            &registration.owner_key,
            registration.order,
            registration.scope_anchor.as_deref(),
        )?;

        let entry = RegistryEntry {
            id: registration.extension_id,
            owner_key: registration.owner_key,
            order: registration.order,
            seq: self.next_seq(),
            enabled: registration.enabled,
            scope_anchor: registration.scope_anchor,
            factory: Arc::new(registration.factory),
        };
        info!(
            "event=extension_registered module=extension id={} owner={} order={} enabled={} scoped={}",
            entry.id,
            entry.owner_key,
            entry.order,
            entry.enabled,
            entry.scope_anchor.is_some()
        );
        insert_entry(&self.extensions, entry);
        Ok(())
    }

    /// Registers one contribution for container owner type `O`.
    ///
    /// # Errors
    /// Same validation rules as [`ExtensionRegistry::register`].
    pub fn register_contribution<O: Extensible>(
        &self,
        registration: ContributionRegistration<O>,
    ) -> RegistryResult<()> {
        validate_registration::<O>(
            &registration.contribution_id,
            &registration.owner_key,
            registration.order,
            registration.scope_anchor.as_deref(),
        )?;

        let entry = RegistryEntry {
            id: registration.contribution_id,
            owner_key: registration.owner_key,
            order: registration.order,
            seq: self.next_seq(),
            enabled: registration.enabled,
            scope_anchor: registration.scope_anchor,
            factory: Arc::new(registration.factory),
        };
        info!(
            "event=contribution_registered module=extension id={} owner={} order={}",
            entry.id, entry.owner_key, entry.order
        );
        insert_entry(&self.contributions, entry);
        Ok(())
    }

    /// Removes every extension and contribution entry registered under `id`.
    ///
    /// Returns false when no entry matched; an absent id is not an error.
    /// Owners that already materialized their hook list are unaffected.
    pub fn unregister(&self, id: &str) -> bool {
        let mut changed = false;
        for table in [&self.extensions, &self.contributions] {
            let mut table = write_table(table);
            table.retain(|_, entries| {
                let next: Vec<Arc<RegistryEntry>> = entries
                    .iter()
                    .filter(|entry| entry.id != id)
                    .cloned()
                    .collect();
                if next.len() != entries.len() {
                    changed = true;
                    *entries = Arc::new(next);
                }
                !entries.is_empty()
            });
        }
        if changed {
            info!("event=extension_deregistered module=extension id={id}");
        }
        changed
    }

    /// Toggles the enabled flag on every entry registered under `id`.
    ///
    /// Visible only to snapshots taken after the call returns.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        let mut changed = false;
        for table in [&self.extensions, &self.contributions] {
            let mut table = write_table(table);
            for entries in table.values_mut() {
                if !entries
                    .iter()
                    .any(|entry| entry.id == id && entry.enabled != enabled)
                {
                    continue;
                }
                let next: Vec<Arc<RegistryEntry>> = entries
                    .iter()
                    .map(|entry| {
                        if entry.id == id {
                            let mut updated = (**entry).clone();
                            updated.enabled = enabled;
                            Arc::new(updated)
                        } else {
                            Arc::clone(entry)
                        }
                    })
                    .collect();
                *entries = Arc::new(next);
                changed = true;
            }
        }
        if changed {
            info!("event=extension_toggled module=extension id={id} enabled={enabled}");
        }
        changed
    }

    /// Returns the ordered, filtered extension view for owner type `O`.
    ///
    /// Walks `O::type_lineage()` most specific to least, keeps enabled
    /// entries whose scope anchor (if any) appears in `container_path`, and
    /// sorts by (order, registration sequence). An entry registered under
    /// several lineage keys appears once per matching key. Entries whose
    /// factory was built for a different concrete owner type sharing a
    /// lineage key are skipped with a warn event.
    pub fn snapshot_for<O: Extensible>(&self, container_path: &[String]) -> Vec<ResolvedExtension<O>> {
        let entries = collect_entries(
            &read_table(&self.extensions),
            O::type_lineage(),
            container_path,
        );

        let mut resolved = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.factory.downcast_ref::<ExtensionFactory<O>>() {
                Some(factory) => resolved.push(ResolvedExtension {
                    extension_id: entry.id.clone(),
                    order: entry.order,
                    seq: entry.seq,
                    create: Arc::clone(&factory.create),
                }),
                None => warn!(
                    "event=factory_type_mismatch module=extension status=skipped id={} owner={}",
                    entry.id, entry.owner_key
                ),
            }
        }
        resolved.sort_by(|a, b| a.order.total_cmp(&b.order).then(a.seq.cmp(&b.seq)));
        debug!(
            "event=extension_snapshot module=extension owner={} count={}",
            O::type_lineage().first().copied().unwrap_or_default(),
            resolved.len()
        );
        resolved
    }

    /// Instantiates the contributions of concrete type `T` for one owner.
    ///
    /// Entries producing other types are skipped silently; type filtering
    /// is a normal lookup outcome, not an error.
    pub fn contributions_for<O: Extensible, T: Any>(&self, owner: &O) -> Vec<Rc<T>> {
        let entries = collect_entries(
            &read_table(&self.contributions),
            O::type_lineage(),
            owner.container_path(),
        );

        let mut matched: Vec<(f64, u64, ContributionFactory<O>)> = Vec::new();
        for entry in entries {
            match entry.factory.downcast_ref::<ContributionFactory<O>>() {
                Some(factory) => matched.push((entry.order, entry.seq, factory.clone())),
                None => warn!(
                    "event=factory_type_mismatch module=extension status=skipped id={} owner={}",
                    entry.id, entry.owner_key
                ),
            }
        }
        matched.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        matched
            .into_iter()
            .filter_map(|(_, _, factory)| (factory.create)(owner).downcast::<T>().ok())
            .collect()
    }

    /// Total extension entries across all owner keys.
    pub fn extension_count(&self) -> usize {
        read_table(&self.extensions).values().map(|entries| entries.len()).sum()
    }

    /// Total contribution entries across all owner keys.
    pub fn contribution_count(&self) -> usize {
        read_table(&self.contributions).values().map(|entries| entries.len()).sum()
    }

    /// Serializable diagnostics snapshot of the registration table.
    pub fn report(&self) -> RegistryReport {
        let mut owners: BTreeMap<String, Vec<(f64, u64, EntryReport)>> = BTreeMap::new();
        for (table, kind) in [(&self.extensions, "extension"), (&self.contributions, "contribution")] {
            let table = read_table(table);
            for (owner_key, entries) in table.iter() {
                let slot = owners.entry(owner_key.clone()).or_default();
                for entry in entries.iter() {
                    slot.push((
                        entry.order,
                        entry.seq,
                        EntryReport {
                            id: entry.id.clone(),
                            kind: kind.to_string(),
                            order: entry.order,
                            enabled: entry.enabled,
                            scope_anchor: entry.scope_anchor.clone(),
                        },
                    ));
                }
            }
        }

        RegistryReport {
            extension_count: self.extension_count(),
            contribution_count: self.contribution_count(),
            owners: owners
                .into_iter()
                .map(|(owner_key, mut entries)| {
                    entries.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                    OwnerReport {
                        owner_key,
                        entries: entries.into_iter().map(|(_, _, report)| report).collect(),
                    }
                })
                .collect(),
        }
    }

    fn next_seq(&self) -> u64 {
        self.registration_seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Registration table diagnostics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryReport {
    pub extension_count: usize,
    pub contribution_count: usize,
    pub owners: Vec<OwnerReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerReport {
    pub owner_key: String,
    pub entries: Vec<EntryReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub id: String,
    pub kind: String,
    pub order: f64,
    pub enabled: bool,
    pub scope_anchor: Option<String>,
}

/// Registration validation errors, reported at `register()` time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    InvalidExtensionId(String),
    InvalidOwnerKey(String),
    OwnerOutsideLineage { extension_id: String, owner_key: String },
    NonFiniteOrder(String),
    InvalidScopeAnchor(String),
}

impl Display for RegistrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidExtensionId(value) => write!(f, "extension id is invalid: {value}"),
            Self::InvalidOwnerKey(value) => write!(f, "owner type key is invalid: {value}"),
            Self::OwnerOutsideLineage {
                extension_id,
                owner_key,
            } => write!(
                f,
                "owner key `{owner_key}` of registration `{extension_id}` is outside the owner type lineage"
            ),
            Self::NonFiniteOrder(value) => {
                write!(f, "registration `{value}` has a non-finite order value")
            }
            Self::InvalidScopeAnchor(value) => write!(f, "scope anchor is invalid: {value}"),
        }
    }
}

impl Error for RegistrationError {}

fn validate_registration<O: Extensible>(
    id: &str,
    owner_key: &str,
    order: f64,
    scope_anchor: Option<&str>,
) -> RegistryResult<()> {
    if !is_valid_registry_id(id) {
        return Err(RegistrationError::InvalidExtensionId(id.to_string()));
    }
    if !is_valid_registry_id(owner_key) {
        return Err(RegistrationError::InvalidOwnerKey(owner_key.to_string()));
    }
    if !O::type_lineage().iter().any(|key| *key == owner_key) {
        return Err(RegistrationError::OwnerOutsideLineage {
            extension_id: id.to_string(),
            owner_key: owner_key.to_string(),
        });
    }
    if !order.is_finite() {
        return Err(RegistrationError::NonFiniteOrder(id.to_string()));
    }
    if let Some(anchor) = scope_anchor {
        if !is_valid_registry_id(anchor) {
            return Err(RegistrationError::InvalidScopeAnchor(anchor.to_string()));
        }
    }
    Ok(())
}

fn insert_entry(table: &RwLock<EntryTable>, entry: RegistryEntry) {
    let mut table = write_table(table);
    let entries = table
        .entry(entry.owner_key.clone())
        .or_insert_with(|| Arc::new(Vec::new()));
    // Re-registration of the same id replaces the previous entry.
    let mut next: Vec<Arc<RegistryEntry>> = entries
        .iter()
        .filter(|existing| existing.id != entry.id)
        .cloned()
        .collect();
    next.push(Arc::new(entry));
    *entries = Arc::new(next);
}

fn collect_entries(
    table: &EntryTable,
    lineage: &[&str],
    container_path: &[String],
) -> Vec<Arc<RegistryEntry>> {
    let mut collected = Vec::new();
    for key in lineage {
        let Some(entries) = table.get(*key) else {
            continue;
        };
        for entry in entries.iter() {
            if !entry.enabled {
                continue;
            }
            if let Some(anchor) = &entry.scope_anchor {
                if !container_path.iter().any(|segment| segment == anchor) {
                    continue;
                }
            }
            collected.push(Arc::clone(entry));
        }
    }
    collected
}

fn read_table(table: &RwLock<EntryTable>) -> RwLockReadGuard<'_, EntryTable> {
    table.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_table(table: &RwLock<EntryTable>) -> RwLockWriteGuard<'_, EntryTable> {
    table.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn is_valid_registry_id(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }

    let mut prev_separator = false;
    for c in chars {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            prev_separator = false;
            continue;
        }
        if c == '.' || c == '_' || c == '-' {
            if prev_separator {
                return false;
            }
            prev_separator = true;
            continue;
        }
        return false;
    }
    !prev_separator
}
