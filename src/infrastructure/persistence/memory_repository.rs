//! In-memory catalog repository
//!
//! A transaction holds the catalog lock for its whole lifetime. Reads borrow
//! the locked state; the first write takes a private copy. Commit audits the
//! copy and swaps it in; dropping the transaction leaves the shared state
//! untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error};
use uuid::Uuid;

use crate::application::ports::outbound::{
    CatalogRepositoryPort, CatalogTransaction, ListQuery, Page, SortDirection, SortField,
};
use crate::domain::entities::{Character, Clan, DomainExpansion, Technique};
use crate::domain::errors::CatalogError;
use crate::domain::services::integrity::{self, Violation};
use crate::domain::value_objects::{
    name_key, CharacterId, ClanId, DomainExpansionId, Rank, TechniqueId,
};

#[derive(Debug, Clone, Default)]
struct CatalogState {
    characters: BTreeMap<CharacterId, Character>,
    clans: BTreeMap<ClanId, Clan>,
    techniques: BTreeMap<TechniqueId, Technique>,
    expansions: BTreeMap<DomainExpansionId, DomainExpansion>,
}

/// Process-local catalog storage
#[derive(Clone)]
pub struct InMemoryCatalogRepository {
    state: Arc<Mutex<CatalogState>>,
    sentinel_clan: String,
}

impl InMemoryCatalogRepository {
    pub fn new(sentinel_clan: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CatalogState::default())),
            sentinel_clan: sentinel_clan.into(),
        }
    }
}

#[async_trait]
impl CatalogRepositoryPort for InMemoryCatalogRepository {
    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, CatalogError> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(InMemoryTransaction {
            guard,
            working: None,
            sentinel_clan: self.sentinel_clan.clone(),
        }))
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<CatalogState>,
    /// Private copy, taken on first write
    working: Option<CatalogState>,
    sentinel_clan: String,
}

impl InMemoryTransaction {
    fn view(&self) -> &CatalogState {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    fn edit(&mut self) -> &mut CatalogState {
        let guard = &self.guard;
        self.working
            .get_or_insert_with(|| CatalogState::clone(guard))
    }
}

/// Uniform access for filtering and sorting list queries
trait Listable: Clone {
    fn list_id(&self) -> Uuid;
    fn list_name(&self) -> &str;
    fn list_rank(&self) -> Option<Rank> {
        None
    }
}

impl Listable for Character {
    fn list_id(&self) -> Uuid {
        self.id.into()
    }
    fn list_name(&self) -> &str {
        &self.name
    }
    fn list_rank(&self) -> Option<Rank> {
        Some(self.rank)
    }
}

impl Listable for Clan {
    fn list_id(&self) -> Uuid {
        self.id.into()
    }
    fn list_name(&self) -> &str {
        &self.name
    }
}

impl Listable for Technique {
    fn list_id(&self) -> Uuid {
        self.id.into()
    }
    fn list_name(&self) -> &str {
        &self.name
    }
}

impl Listable for DomainExpansion {
    fn list_id(&self) -> Uuid {
        self.id.into()
    }
    fn list_name(&self) -> &str {
        &self.name
    }
}

fn list<'a, T: Listable + 'a>(items: impl Iterator<Item = &'a T>, query: &ListQuery) -> Page<T> {
    let mut matched: Vec<T> = items
        .filter(|item| {
            query
                .name_contains
                .as_deref()
                .map_or(true, |term| name_key(item.list_name()).contains(term))
        })
        .filter(|item| query.rank.is_none() || item.list_rank() == query.rank)
        .cloned()
        .collect();

    let request = &query.page;
    matched.sort_by(|a, b| {
        let by_id = a.list_id().cmp(&b.list_id());
        let ordering = match request.sort {
            SortField::Id => by_id,
            SortField::Name => name_key(a.list_name())
                .cmp(&name_key(b.list_name()))
                .then(by_id),
            SortField::Rank => a.list_rank().cmp(&b.list_rank()).then(by_id),
        };
        match request.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });

    request.slice(matched)
}

fn by_name<'a, T: Listable + 'a>(mut items: impl Iterator<Item = &'a T>, name: &str) -> Option<T> {
    let key = name_key(name);
    items.find(|item| name_key(item.list_name()) == key).cloned()
}

#[async_trait]
impl CatalogTransaction for InMemoryTransaction {
    async fn character(&mut self, id: CharacterId) -> Result<Option<Character>, CatalogError> {
        Ok(self.view().characters.get(&id).cloned())
    }

    async fn clan(&mut self, id: ClanId) -> Result<Option<Clan>, CatalogError> {
        Ok(self.view().clans.get(&id).cloned())
    }

    async fn technique(&mut self, id: TechniqueId) -> Result<Option<Technique>, CatalogError> {
        Ok(self.view().techniques.get(&id).cloned())
    }

    async fn domain_expansion(
        &mut self,
        id: DomainExpansionId,
    ) -> Result<Option<DomainExpansion>, CatalogError> {
        Ok(self.view().expansions.get(&id).cloned())
    }

    async fn clan_by_name(&mut self, name: &str) -> Result<Option<Clan>, CatalogError> {
        Ok(by_name(self.view().clans.values(), name))
    }

    async fn technique_by_name(&mut self, name: &str) -> Result<Option<Technique>, CatalogError> {
        Ok(by_name(self.view().techniques.values(), name))
    }

    async fn domain_expansion_by_name(
        &mut self,
        name: &str,
    ) -> Result<Option<DomainExpansion>, CatalogError> {
        Ok(by_name(self.view().expansions.values(), name))
    }

    async fn clan_members(&mut self, clan_id: ClanId) -> Result<Vec<Character>, CatalogError> {
        Ok(self
            .view()
            .characters
            .values()
            .filter(|c| c.clan_id == clan_id)
            .cloned()
            .collect())
    }

    async fn technique_users(
        &mut self,
        technique_id: TechniqueId,
    ) -> Result<Vec<Character>, CatalogError> {
        Ok(self
            .view()
            .characters
            .values()
            .filter(|c| c.uses_technique(technique_id))
            .cloned()
            .collect())
    }

    async fn list_characters(&mut self, query: &ListQuery) -> Result<Page<Character>, CatalogError> {
        Ok(list(self.view().characters.values(), query))
    }

    async fn list_clans(&mut self, query: &ListQuery) -> Result<Page<Clan>, CatalogError> {
        Ok(list(self.view().clans.values(), query))
    }

    async fn list_techniques(&mut self, query: &ListQuery) -> Result<Page<Technique>, CatalogError> {
        Ok(list(self.view().techniques.values(), query))
    }

    async fn list_domain_expansions(
        &mut self,
        query: &ListQuery,
    ) -> Result<Page<DomainExpansion>, CatalogError> {
        Ok(list(self.view().expansions.values(), query))
    }

    async fn save_character(&mut self, character: &Character) -> Result<(), CatalogError> {
        self.edit()
            .characters
            .insert(character.id, character.clone());
        Ok(())
    }

    async fn save_clan(&mut self, clan: &Clan) -> Result<(), CatalogError> {
        self.edit().clans.insert(clan.id, clan.clone());
        Ok(())
    }

    async fn save_technique(&mut self, technique: &Technique) -> Result<(), CatalogError> {
        self.edit()
            .techniques
            .insert(technique.id, technique.clone());
        Ok(())
    }

    async fn save_domain_expansion(
        &mut self,
        expansion: &DomainExpansion,
    ) -> Result<(), CatalogError> {
        self.edit()
            .expansions
            .insert(expansion.id, expansion.clone());
        Ok(())
    }

    async fn delete_character(&mut self, id: CharacterId) -> Result<(), CatalogError> {
        self.edit().characters.remove(&id);
        Ok(())
    }

    async fn delete_clan(&mut self, id: ClanId) -> Result<(), CatalogError> {
        self.edit().clans.remove(&id);
        Ok(())
    }

    async fn delete_technique(&mut self, id: TechniqueId) -> Result<(), CatalogError> {
        self.edit().techniques.remove(&id);
        Ok(())
    }

    async fn delete_domain_expansion(
        &mut self,
        id: DomainExpansionId,
    ) -> Result<(), CatalogError> {
        self.edit().expansions.remove(&id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), CatalogError> {
        let InMemoryTransaction {
            mut guard,
            working,
            sentinel_clan,
        } = *self;

        let Some(working) = working else {
            debug!("Read-only transaction, nothing to commit");
            return Ok(());
        };

        let had_sentinel = guard.clans.values().any(|c| c.is_sentinel(&sentinel_clan));
        let characters: Vec<_> = working.characters.values().cloned().collect();
        let clans: Vec<_> = working.clans.values().cloned().collect();
        let techniques: Vec<_> = working.techniques.values().cloned().collect();
        let expansions: Vec<_> = working.expansions.values().cloned().collect();
        // An unseeded catalog may stay unseeded; a seeded one may not lose its sentinel
        let violations: Vec<Violation> =
            integrity::audit(&characters, &clans, &techniques, &expansions, &sentinel_clan)
                .into_iter()
                .filter(|v| had_sentinel || *v != Violation::MissingSentinel)
                .collect();

        if !violations.is_empty() {
            error!(?violations, "Rejecting commit that breaks catalog invariants");
            return Err(CatalogError::Storage(format!(
                "commit rejected: {} catalog invariant violation(s)",
                violations.len()
            )));
        }

        *guard = working;
        Ok(())
    }
}
