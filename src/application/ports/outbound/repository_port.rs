//! Repository ports - Interfaces for catalog persistence
//!
//! Every catalog operation runs inside one [`CatalogTransaction`]. Writes made
//! through a transaction become visible to other transactions only after
//! [`CatalogTransaction::commit`]; dropping the transaction discards them.
//! Application services depend on these traits, not on a storage backend.

use async_trait::async_trait;

use crate::domain::entities::{Character, Clan, DomainExpansion, Technique};
use crate::domain::errors::CatalogError;
use crate::domain::value_objects::{CharacterId, ClanId, DomainExpansionId, Rank, TechniqueId};

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size when none is given
pub const DEFAULT_PAGE_SIZE: u32 = 10;

// =============================================================================
// Paging
// =============================================================================

/// Sort key accepted by list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    Name,
    /// Characters only
    Rank,
}

impl SortField {
    /// Unknown or disallowed keys fall back to `Id`
    pub fn parse(value: Option<&str>, allow_rank: bool) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("name") => SortField::Name,
            Some(v) if allow_rank && v.eq_ignore_ascii_case("rank") => SortField::Rank,
            _ => SortField::Id,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Rank => "rank",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

impl PageRequest {
    /// Pages below 1 mean the first page; size is clamped to `1..=MAX_PAGE_SIZE`
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page: page.max(1),
            size: size.clamp(1, MAX_PAGE_SIZE),
            sort: SortField::Id,
            direction: SortDirection::Asc,
        }
    }

    pub fn sorted(mut self, sort: SortField, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.size as usize
    }

    /// Page over an already materialized collection
    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(self.offset())
            .take(self.size as usize)
            .collect();
        Page::new(items, total, self)
    }
}

/// One page of results plus the total count
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: &PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            size: request.size,
        }
    }

    pub fn total_pages(&self) -> u32 {
        self.total.div_ceil(u64::from(self.size.max(1))) as u32
    }

    pub fn has_more(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
        }
    }
}

/// Filter and paging for list/search queries
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Case-insensitive substring of the name
    pub name_contains: Option<String>,
    /// Characters only
    pub rank: Option<Rank>,
    pub page: PageRequest,
}

impl ListQuery {
    pub fn all(page: PageRequest) -> Self {
        Self {
            name_contains: None,
            rank: None,
            page,
        }
    }

    pub fn search(term: Option<&str>, page: PageRequest) -> Self {
        Self {
            name_contains: term
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_lowercase),
            rank: None,
            page,
        }
    }

    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = Some(rank);
        self
    }
}

// =============================================================================
// Unit of work
// =============================================================================

/// One atomic unit of work over the whole catalog.
///
/// Name lookups are exact and case-insensitive.
#[async_trait]
pub trait CatalogTransaction: Send {
    async fn character(&mut self, id: CharacterId) -> Result<Option<Character>, CatalogError>;

    async fn clan(&mut self, id: ClanId) -> Result<Option<Clan>, CatalogError>;

    async fn technique(&mut self, id: TechniqueId) -> Result<Option<Technique>, CatalogError>;

    async fn domain_expansion(
        &mut self,
        id: DomainExpansionId,
    ) -> Result<Option<DomainExpansion>, CatalogError>;

    async fn clan_by_name(&mut self, name: &str) -> Result<Option<Clan>, CatalogError>;

    async fn technique_by_name(&mut self, name: &str) -> Result<Option<Technique>, CatalogError>;

    async fn domain_expansion_by_name(
        &mut self,
        name: &str,
    ) -> Result<Option<DomainExpansion>, CatalogError>;

    /// Characters whose clan is `clan_id`, in id order
    async fn clan_members(&mut self, clan_id: ClanId) -> Result<Vec<Character>, CatalogError>;

    /// Characters using `technique_id`, in id order
    async fn technique_users(
        &mut self,
        technique_id: TechniqueId,
    ) -> Result<Vec<Character>, CatalogError>;

    async fn list_characters(&mut self, query: &ListQuery) -> Result<Page<Character>, CatalogError>;

    async fn list_clans(&mut self, query: &ListQuery) -> Result<Page<Clan>, CatalogError>;

    async fn list_techniques(&mut self, query: &ListQuery) -> Result<Page<Technique>, CatalogError>;

    async fn list_domain_expansions(
        &mut self,
        query: &ListQuery,
    ) -> Result<Page<DomainExpansion>, CatalogError>;

    /// Insert or replace
    async fn save_character(&mut self, character: &Character) -> Result<(), CatalogError>;

    async fn save_clan(&mut self, clan: &Clan) -> Result<(), CatalogError>;

    async fn save_technique(&mut self, technique: &Technique) -> Result<(), CatalogError>;

    async fn save_domain_expansion(
        &mut self,
        expansion: &DomainExpansion,
    ) -> Result<(), CatalogError>;

    async fn delete_character(&mut self, id: CharacterId) -> Result<(), CatalogError>;

    async fn delete_clan(&mut self, id: ClanId) -> Result<(), CatalogError>;

    async fn delete_technique(&mut self, id: TechniqueId) -> Result<(), CatalogError>;

    async fn delete_domain_expansion(&mut self, id: DomainExpansionId)
        -> Result<(), CatalogError>;

    /// Make every write of this transaction visible at once
    async fn commit(self: Box<Self>) -> Result<(), CatalogError>;
}

/// Entry point to catalog storage
#[async_trait]
pub trait CatalogRepositoryPort: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, CatalogError>;
}
