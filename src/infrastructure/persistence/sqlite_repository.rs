//! SQLite catalog repository
//!
//! Names are matched through a `name_key` column holding the lowercased name.
//! Relationships are plain id columns; consistency is kept by the integrity
//! rules in the service layer, not by the schema.

use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::application::ports::outbound::{
    CatalogRepositoryPort, CatalogTransaction, ListQuery, Page, PageRequest, SortDirection,
    SortField,
};
use crate::domain::entities::{Character, Clan, DomainExpansion, Technique};
use crate::domain::errors::CatalogError;
use crate::domain::value_objects::{
    name_key, CharacterId, ClanId, DomainExpansionId, Rank, TechniqueId,
};

const SCHEMA: [&str; 9] = [
    r#"
    CREATE TABLE IF NOT EXISTS clans (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        name_key TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS techniques (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        name_key TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS domain_expansions (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        name_key TEXT NOT NULL,
        effect TEXT NOT NULL DEFAULT '',
        owner_id TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS characters (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        name_key TEXT NOT NULL,
        rank INTEGER NOT NULL,
        clan_id TEXT NOT NULL,
        domain_expansion_id TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS character_techniques (
        character_id TEXT NOT NULL,
        technique_id TEXT NOT NULL,
        PRIMARY KEY (character_id, technique_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_clans_name_key ON clans (name_key)",
    "CREATE INDEX IF NOT EXISTS idx_techniques_name_key ON techniques (name_key)",
    "CREATE INDEX IF NOT EXISTS idx_domain_expansions_name_key ON domain_expansions (name_key)",
    "CREATE INDEX IF NOT EXISTS idx_characters_clan ON characters (clan_id)",
];

type CharacterRow = (String, String, i64, String, Option<String>);
type NamedRow = (String, String, String);
type ExpansionRow = (String, String, String, Option<String>);

fn storage(e: sqlx::Error) -> CatalogError {
    CatalogError::Storage(e.to_string())
}

fn decode<T>(raw: &str, parse: fn(&str) -> Option<T>) -> Result<T, CatalogError> {
    parse(raw).ok_or_else(|| CatalogError::Storage(format!("malformed id in catalog: {raw}")))
}

/// `name_key LIKE ?` pattern matching `term` literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn where_clause(query: &ListQuery) -> String {
    let mut conditions = Vec::new();
    if query.name_contains.is_some() {
        conditions.push("name_key LIKE ? ESCAPE '\\'");
    }
    if query.rank.is_some() {
        conditions.push("rank = ?");
    }
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

fn order_clause(page: &PageRequest) -> String {
    let direction = match page.direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    match page.sort {
        SortField::Id => format!(" ORDER BY id {direction}"),
        SortField::Name => format!(" ORDER BY name_key {direction}, id {direction}"),
        SortField::Rank => format!(" ORDER BY rank {direction}, id {direction}"),
    }
}

/// SQLite-backed catalog storage
#[derive(Clone)]
pub struct SqliteCatalogRepository {
    pool: SqlitePool,
}

impl SqliteCatalogRepository {
    /// Wrap `pool`, creating the catalog tables when missing
    pub async fn new(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }
}

#[async_trait]
impl CatalogRepositoryPort for SqliteCatalogRepository {
    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, CatalogError> {
        let tx = self.pool.begin().await.map_err(storage)?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl SqliteTransaction {
    async fn technique_ids_of(&mut self, character_id: &str) -> Result<Vec<TechniqueId>, CatalogError> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT technique_id FROM character_techniques WHERE character_id = ? ORDER BY technique_id",
        )
        .bind(character_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(storage)?;

        rows.iter().map(|raw| decode(raw, TechniqueId::parse)).collect()
    }

    async fn hydrate(&mut self, row: CharacterRow) -> Result<Character, CatalogError> {
        let (id, name, rank, clan_id, domain_expansion_id) = row;
        let technique_ids = self.technique_ids_of(&id).await?;
        Ok(Character {
            id: decode(&id, CharacterId::parse)?,
            name,
            rank: Rank::from_ordinal(rank)
                .ok_or_else(|| CatalogError::Storage(format!("unknown rank ordinal {rank}")))?,
            clan_id: decode(&clan_id, ClanId::parse)?,
            technique_ids: technique_ids.into_iter().collect(),
            domain_expansion_id: domain_expansion_id
                .as_deref()
                .map(|raw| decode(raw, DomainExpansionId::parse))
                .transpose()?,
        })
    }

    async fn hydrate_all(&mut self, rows: Vec<CharacterRow>) -> Result<Vec<Character>, CatalogError> {
        let mut characters = Vec::with_capacity(rows.len());
        for row in rows {
            characters.push(self.hydrate(row).await?);
        }
        Ok(characters)
    }

    async fn count(&mut self, table: &str, query: &ListQuery) -> Result<u64, CatalogError> {
        let sql = format!("SELECT COUNT(*) FROM {table}{}", where_clause(query));
        let mut count = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(term) = &query.name_contains {
            count = count.bind(like_pattern(term));
        }
        if let Some(rank) = query.rank {
            count = count.bind(rank.ordinal());
        }
        let total = count.fetch_one(&mut *self.tx).await.map_err(storage)?;
        Ok(total.max(0) as u64)
    }

    async fn named_page(
        &mut self,
        table: &str,
        text_column: &str,
        query: &ListQuery,
    ) -> Result<(Vec<NamedRow>, u64), CatalogError> {
        let total = self.count(table, query).await?;
        let sql = format!(
            "SELECT id, name, {text_column} FROM {table}{}{} LIMIT ? OFFSET ?",
            where_clause(query),
            order_clause(&query.page)
        );
        let mut select = sqlx::query_as::<_, NamedRow>(&sql);
        if let Some(term) = &query.name_contains {
            select = select.bind(like_pattern(term));
        }
        let rows = select
            .bind(i64::from(query.page.size))
            .bind(query.page.offset() as i64)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(storage)?;
        Ok((rows, total))
    }

    async fn upsert_named(
        &mut self,
        table: &str,
        text_column: &str,
        id: String,
        name: &str,
        text: &str,
    ) -> Result<(), CatalogError> {
        let sql = format!(
            "INSERT INTO {table} (id, name, name_key, {text_column}) VALUES (?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, name_key = excluded.name_key, \
             {text_column} = excluded.{text_column}"
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(name)
            .bind(name_key(name))
            .bind(text)
            .execute(&mut *self.tx)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn delete_by_id(&mut self, table: &str, id: String) -> Result<(), CatalogError> {
        sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(storage)?;
        Ok(())
    }
}

fn clan_from(row: NamedRow) -> Result<Clan, CatalogError> {
    let (id, name, description) = row;
    Ok(Clan {
        id: decode(&id, ClanId::parse)?,
        name,
        description,
    })
}

fn technique_from(row: NamedRow) -> Result<Technique, CatalogError> {
    let (id, name, description) = row;
    Ok(Technique {
        id: decode(&id, TechniqueId::parse)?,
        name,
        description,
    })
}

fn expansion_from(row: ExpansionRow) -> Result<DomainExpansion, CatalogError> {
    let (id, name, effect, owner_id) = row;
    Ok(DomainExpansion {
        id: decode(&id, DomainExpansionId::parse)?,
        name,
        effect,
        owner_id: owner_id
            .as_deref()
            .map(|raw| decode(raw, CharacterId::parse))
            .transpose()?,
    })
}

const CHARACTER_COLUMNS: &str = "id, name, rank, clan_id, domain_expansion_id";

#[async_trait]
impl CatalogTransaction for SqliteTransaction {
    async fn character(&mut self, id: CharacterId) -> Result<Option<Character>, CatalogError> {
        let row: Option<CharacterRow> = sqlx::query_as(&format!(
            "SELECT {CHARACTER_COLUMNS} FROM characters WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn clan(&mut self, id: ClanId) -> Result<Option<Clan>, CatalogError> {
        let row: Option<NamedRow> =
            sqlx::query_as("SELECT id, name, description FROM clans WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(storage)?;
        row.map(clan_from).transpose()
    }

    async fn technique(&mut self, id: TechniqueId) -> Result<Option<Technique>, CatalogError> {
        let row: Option<NamedRow> =
            sqlx::query_as("SELECT id, name, description FROM techniques WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(storage)?;
        row.map(technique_from).transpose()
    }

    async fn domain_expansion(
        &mut self,
        id: DomainExpansionId,
    ) -> Result<Option<DomainExpansion>, CatalogError> {
        let row: Option<ExpansionRow> =
            sqlx::query_as("SELECT id, name, effect, owner_id FROM domain_expansions WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(storage)?;
        row.map(expansion_from).transpose()
    }

    async fn clan_by_name(&mut self, name: &str) -> Result<Option<Clan>, CatalogError> {
        let row: Option<NamedRow> = sqlx::query_as(
            "SELECT id, name, description FROM clans WHERE name_key = ? ORDER BY id LIMIT 1",
        )
        .bind(name_key(name))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage)?;
        row.map(clan_from).transpose()
    }

    async fn technique_by_name(&mut self, name: &str) -> Result<Option<Technique>, CatalogError> {
        let row: Option<NamedRow> = sqlx::query_as(
            "SELECT id, name, description FROM techniques WHERE name_key = ? ORDER BY id LIMIT 1",
        )
        .bind(name_key(name))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage)?;
        row.map(technique_from).transpose()
    }

    async fn domain_expansion_by_name(
        &mut self,
        name: &str,
    ) -> Result<Option<DomainExpansion>, CatalogError> {
        let row: Option<ExpansionRow> = sqlx::query_as(
            "SELECT id, name, effect, owner_id FROM domain_expansions \
             WHERE name_key = ? ORDER BY id LIMIT 1",
        )
        .bind(name_key(name))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(storage)?;
        row.map(expansion_from).transpose()
    }

    async fn clan_members(&mut self, clan_id: ClanId) -> Result<Vec<Character>, CatalogError> {
        let rows: Vec<CharacterRow> = sqlx::query_as(&format!(
            "SELECT {CHARACTER_COLUMNS} FROM characters WHERE clan_id = ? ORDER BY id"
        ))
        .bind(clan_id.to_string())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(storage)?;
        self.hydrate_all(rows).await
    }

    async fn technique_users(
        &mut self,
        technique_id: TechniqueId,
    ) -> Result<Vec<Character>, CatalogError> {
        let rows: Vec<CharacterRow> = sqlx::query_as(
            "SELECT c.id, c.name, c.rank, c.clan_id, c.domain_expansion_id FROM characters c \
             JOIN character_techniques ct ON ct.character_id = c.id \
             WHERE ct.technique_id = ? ORDER BY c.id",
        )
        .bind(technique_id.to_string())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(storage)?;
        self.hydrate_all(rows).await
    }

    async fn list_characters(&mut self, query: &ListQuery) -> Result<Page<Character>, CatalogError> {
        let total = self.count("characters", query).await?;
        let sql = format!(
            "SELECT {CHARACTER_COLUMNS} FROM characters{}{} LIMIT ? OFFSET ?",
            where_clause(query),
            order_clause(&query.page)
        );
        let mut select = sqlx::query_as::<_, CharacterRow>(&sql);
        if let Some(term) = &query.name_contains {
            select = select.bind(like_pattern(term));
        }
        if let Some(rank) = query.rank {
            select = select.bind(rank.ordinal());
        }
        let rows = select
            .bind(i64::from(query.page.size))
            .bind(query.page.offset() as i64)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(storage)?;

        let characters = self.hydrate_all(rows).await?;
        Ok(Page::new(characters, total, &query.page))
    }

    async fn list_clans(&mut self, query: &ListQuery) -> Result<Page<Clan>, CatalogError> {
        let (rows, total) = self.named_page("clans", "description", query).await?;
        let clans = rows.into_iter().map(clan_from).collect::<Result<_, _>>()?;
        Ok(Page::new(clans, total, &query.page))
    }

    async fn list_techniques(&mut self, query: &ListQuery) -> Result<Page<Technique>, CatalogError> {
        let (rows, total) = self.named_page("techniques", "description", query).await?;
        let techniques = rows
            .into_iter()
            .map(technique_from)
            .collect::<Result<_, _>>()?;
        Ok(Page::new(techniques, total, &query.page))
    }

    async fn list_domain_expansions(
        &mut self,
        query: &ListQuery,
    ) -> Result<Page<DomainExpansion>, CatalogError> {
        let total = self.count("domain_expansions", query).await?;
        let sql = format!(
            "SELECT id, name, effect, owner_id FROM domain_expansions{}{} LIMIT ? OFFSET ?",
            where_clause(query),
            order_clause(&query.page)
        );
        let mut select = sqlx::query_as::<_, ExpansionRow>(&sql);
        if let Some(term) = &query.name_contains {
            select = select.bind(like_pattern(term));
        }
        let rows = select
            .bind(i64::from(query.page.size))
            .bind(query.page.offset() as i64)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(storage)?;

        let expansions = rows
            .into_iter()
            .map(expansion_from)
            .collect::<Result<_, _>>()?;
        Ok(Page::new(expansions, total, &query.page))
    }

    async fn save_character(&mut self, character: &Character) -> Result<(), CatalogError> {
        let id = character.id.to_string();
        sqlx::query(
            "INSERT INTO characters (id, name, name_key, rank, clan_id, domain_expansion_id) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, name_key = excluded.name_key, \
             rank = excluded.rank, clan_id = excluded.clan_id, \
             domain_expansion_id = excluded.domain_expansion_id",
        )
        .bind(id.as_str())
        .bind(character.name.as_str())
        .bind(name_key(&character.name))
        .bind(character.rank.ordinal())
        .bind(character.clan_id.to_string())
        .bind(character.domain_expansion_id.map(|d| d.to_string()))
        .execute(&mut *self.tx)
        .await
        .map_err(storage)?;

        sqlx::query("DELETE FROM character_techniques WHERE character_id = ?")
            .bind(id.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(storage)?;
        for technique_id in &character.technique_ids {
            sqlx::query("INSERT INTO character_techniques (character_id, technique_id) VALUES (?, ?)")
                .bind(id.as_str())
                .bind(technique_id.to_string())
                .execute(&mut *self.tx)
                .await
                .map_err(storage)?;
        }
        Ok(())
    }

    async fn save_clan(&mut self, clan: &Clan) -> Result<(), CatalogError> {
        self.upsert_named("clans", "description", clan.id.to_string(), &clan.name, &clan.description)
            .await
    }

    async fn save_technique(&mut self, technique: &Technique) -> Result<(), CatalogError> {
        self.upsert_named(
            "techniques",
            "description",
            technique.id.to_string(),
            &technique.name,
            &technique.description,
        )
        .await
    }

    async fn save_domain_expansion(
        &mut self,
        expansion: &DomainExpansion,
    ) -> Result<(), CatalogError> {
        sqlx::query(
            "INSERT INTO domain_expansions (id, name, name_key, effect, owner_id) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, name_key = excluded.name_key, \
             effect = excluded.effect, owner_id = excluded.owner_id",
        )
        .bind(expansion.id.to_string())
        .bind(expansion.name.as_str())
        .bind(name_key(&expansion.name))
        .bind(expansion.effect.as_str())
        .bind(expansion.owner_id.map(|c| c.to_string()))
        .execute(&mut *self.tx)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn delete_character(&mut self, id: CharacterId) -> Result<(), CatalogError> {
        sqlx::query("DELETE FROM character_techniques WHERE character_id = ?")
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(storage)?;
        self.delete_by_id("characters", id.to_string()).await
    }

    async fn delete_clan(&mut self, id: ClanId) -> Result<(), CatalogError> {
        self.delete_by_id("clans", id.to_string()).await
    }

    async fn delete_technique(&mut self, id: TechniqueId) -> Result<(), CatalogError> {
        sqlx::query("DELETE FROM character_techniques WHERE technique_id = ?")
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(storage)?;
        self.delete_by_id("techniques", id.to_string()).await
    }

    async fn delete_domain_expansion(
        &mut self,
        id: DomainExpansionId,
    ) -> Result<(), CatalogError> {
        self.delete_by_id("domain_expansions", id.to_string()).await
    }

    async fn commit(self: Box<Self>) -> Result<(), CatalogError> {
        self.tx.commit().await.map_err(storage)
    }
}
