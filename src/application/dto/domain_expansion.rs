use serde::{Deserialize, Serialize};

use crate::application::dto::hypermedia::{encode, LinkDto, PageInfo};
use crate::application::ports::outbound::{Page, PageRequest};
use crate::application::services::DomainExpansionInput;
use crate::domain::entities::DomainExpansion;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainExpansionRequestDto {
    #[serde(default)]
    pub name: String,
    pub effect: Option<String>,
}

impl From<DomainExpansionRequestDto> for DomainExpansionInput {
    fn from(dto: DomainExpansionRequestDto) -> Self {
        Self {
            name: dto.name,
            effect: dto.effect,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainExpansionDto {
    pub id: String,
    pub name: String,
    pub effect: String,
    pub owner_id: Option<String>,
    pub links: Vec<LinkDto>,
}

impl From<DomainExpansion> for DomainExpansionDto {
    fn from(expansion: DomainExpansion) -> Self {
        let base = format!("/domain-expansions/{}", expansion.id);
        let mut links = LinkDto::crud(&base);
        if let Some(owner) = expansion.owner_id {
            links.push(LinkDto::get("owner", format!("/characters/{owner}")));
        }
        links.push(LinkDto::get("all-expansions", "/domain-expansions"));
        links.push(LinkDto::get(
            "search",
            format!("/domain-expansions/search?q={}", encode(&expansion.name)),
        ));

        Self {
            id: expansion.id.to_string(),
            name: expansion.name,
            effect: expansion.effect,
            owner_id: expansion.owner_id.map(|id| id.to_string()),
            links,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainExpansionPageDto {
    pub domain_expansions: Vec<DomainExpansionDto>,
    pub total_domain_expansions: u64,
    pub total_pages: u32,
    pub has_more: bool,
    pub next_page: String,
}

impl DomainExpansionPageDto {
    pub fn new(
        page: Page<DomainExpansion>,
        request: &PageRequest,
        path: &str,
        q: Option<&str>,
    ) -> Self {
        let info = PageInfo::of(&page, request, path, q);
        Self {
            domain_expansions: page
                .items
                .into_iter()
                .map(DomainExpansionDto::from)
                .collect(),
            total_domain_expansions: info.total,
            total_pages: info.total_pages,
            has_more: info.has_more,
            next_page: info.next_page,
        }
    }
}
