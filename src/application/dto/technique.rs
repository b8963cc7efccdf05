use serde::{Deserialize, Serialize};

use crate::application::dto::hypermedia::{encode, LinkDto, PageInfo};
use crate::application::ports::outbound::{Page, PageRequest};
use crate::application::services::{TechniqueInput, TechniqueView};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniqueRequestDto {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

impl From<TechniqueRequestDto> for TechniqueInput {
    fn from(dto: TechniqueRequestDto) -> Self {
        Self {
            name: dto.name,
            description: dto.description,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniqueDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub user_ids: Vec<String>,
    pub links: Vec<LinkDto>,
}

impl From<TechniqueView> for TechniqueDto {
    fn from(view: TechniqueView) -> Self {
        let TechniqueView {
            technique,
            user_ids,
        } = view;

        let base = format!("/techniques/{}", technique.id);
        let mut links = LinkDto::crud(&base);
        links.push(LinkDto::get("users", format!("{base}/users")));
        links.push(LinkDto::get("all-techniques", "/techniques"));
        links.push(LinkDto::get(
            "search",
            format!("/techniques/search?q={}", encode(&technique.name)),
        ));

        Self {
            id: technique.id.to_string(),
            name: technique.name,
            description: technique.description,
            user_ids: user_ids.iter().map(ToString::to_string).collect(),
            links,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniquePageDto {
    pub techniques: Vec<TechniqueDto>,
    pub total_techniques: u64,
    pub total_pages: u32,
    pub has_more: bool,
    pub next_page: String,
}

impl TechniquePageDto {
    pub fn new(page: Page<TechniqueView>, request: &PageRequest, path: &str, q: Option<&str>) -> Self {
        let info = PageInfo::of(&page, request, path, q);
        Self {
            techniques: page.items.into_iter().map(TechniqueDto::from).collect(),
            total_techniques: info.total,
            total_pages: info.total_pages,
            has_more: info.has_more,
            next_page: info.next_page,
        }
    }
}
