use serde::{Deserialize, Serialize};

use crate::application::dto::hypermedia::{encode, LinkDto, PageInfo};
use crate::application::ports::outbound::{Page, PageRequest};
use crate::application::services::{ClanInput, ClanView};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanRequestDto {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

impl From<ClanRequestDto> for ClanInput {
    fn from(dto: ClanRequestDto) -> Self {
        Self {
            name: dto.name,
            description: dto.description,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub member_ids: Vec<String>,
    pub links: Vec<LinkDto>,
}

impl From<ClanView> for ClanDto {
    fn from(view: ClanView) -> Self {
        let ClanView { clan, member_ids } = view;

        let base = format!("/clans/{}", clan.id);
        let mut links = LinkDto::crud(&base);
        links.push(LinkDto::get("members", format!("{base}/members")));
        links.push(LinkDto::get("all-clans", "/clans"));
        links.push(LinkDto::get(
            "search",
            format!("/clans/search?q={}", encode(&clan.name)),
        ));

        Self {
            id: clan.id.to_string(),
            name: clan.name,
            description: clan.description,
            member_ids: member_ids.iter().map(ToString::to_string).collect(),
            links,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanPageDto {
    pub clans: Vec<ClanDto>,
    pub total_clans: u64,
    pub total_pages: u32,
    pub has_more: bool,
    pub next_page: String,
}

impl ClanPageDto {
    pub fn new(page: Page<ClanView>, request: &PageRequest, path: &str, q: Option<&str>) -> Self {
        let info = PageInfo::of(&page, request, path, q);
        Self {
            clans: page.items.into_iter().map(ClanDto::from).collect(),
            total_clans: info.total,
            total_pages: info.total_pages,
            has_more: info.has_more,
            next_page: info.next_page,
        }
    }
}
