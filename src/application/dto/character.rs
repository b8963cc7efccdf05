use serde::{Deserialize, Serialize};

use crate::application::dto::hypermedia::{encode, LinkDto, PageInfo};
use crate::application::ports::outbound::{Page, PageRequest};
use crate::application::services::{CharacterInput, CharacterView};

/// Body of character create and update requests
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRequestDto {
    #[serde(default)]
    pub name: String,
    pub rank: Option<String>,
    pub clan_name: Option<String>,
    pub technique_names: Option<Vec<String>>,
    pub domain_expansion_name: Option<String>,
    pub domain_expansion_effect: Option<String>,
}

impl From<CharacterRequestDto> for CharacterInput {
    fn from(dto: CharacterRequestDto) -> Self {
        Self {
            name: dto.name,
            rank: dto.rank,
            clan_name: dto.clan_name,
            technique_names: dto.technique_names.unwrap_or_default(),
            domain_expansion_name: dto.domain_expansion_name,
            domain_expansion_effect: dto.domain_expansion_effect,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDto {
    pub id: String,
    pub name: String,
    pub rank: String,
    pub clan_name: Option<String>,
    pub techniques: Vec<String>,
    pub domain_expansion_name: Option<String>,
    pub links: Vec<LinkDto>,
}

impl From<CharacterView> for CharacterDto {
    fn from(view: CharacterView) -> Self {
        let CharacterView {
            character,
            clan,
            techniques,
            domain_expansion,
        } = view;

        let base = format!("/characters/{}", character.id);
        let mut links = LinkDto::crud(&base);
        links.push(LinkDto::get("techniques", format!("{base}/techniques")));
        links.push(LinkDto::get(
            "domain-expansion",
            format!("/domain-expansions/by-character/{}", character.id),
        ));
        links.push(LinkDto::get("all-characters", "/characters"));
        links.push(LinkDto::get(
            "search",
            format!("/characters/search?q={}", encode(&character.name)),
        ));
        links.push(LinkDto::get(
            "by-rank",
            format!("/characters/rank/{}", character.rank),
        ));
        if let Some(clan) = &clan {
            links.push(LinkDto::get(
                "by-clan",
                format!("/characters/clan/{}", encode(&clan.name)),
            ));
        }

        Self {
            id: character.id.to_string(),
            name: character.name,
            rank: character.rank.to_string(),
            clan_name: clan.map(|c| c.name),
            techniques: techniques.into_iter().map(|t| t.name).collect(),
            domain_expansion_name: domain_expansion.map(|d| d.name),
            links,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterPageDto {
    pub characters: Vec<CharacterDto>,
    pub total_characters: u64,
    pub total_pages: u32,
    pub has_more: bool,
    pub next_page: String,
}

impl CharacterPageDto {
    pub fn new(page: Page<CharacterView>, request: &PageRequest, path: &str, q: Option<&str>) -> Self {
        let info = PageInfo::of(&page, request, path, q);
        Self {
            characters: page.items.into_iter().map(CharacterDto::from).collect(),
            total_characters: info.total,
            total_pages: info.total_pages,
            has_more: info.has_more,
            next_page: info.next_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Character, Clan};
    use crate::domain::value_objects::Rank;

    #[test]
    fn test_representation_uses_camel_case_and_links() {
        let clan = Clan::new("Gojo Clan", "");
        let character = Character::new("Satoru", Rank::SpecialGrade, clan.id);
        let id = character.id;
        let dto = CharacterDto::from(CharacterView {
            character,
            clan: Some(clan),
            techniques: Vec::new(),
            domain_expansion: None,
        });

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["rank"], "SPECIAL_GRADE");
        assert_eq!(json["clanName"], "Gojo Clan");
        assert!(json["domainExpansionName"].is_null());

        let by_clan = dto.links.iter().find(|l| l.rel == "by-clan").unwrap();
        assert_eq!(by_clan.href, "/characters/clan/Gojo%20Clan");
        assert_eq!(dto.links[0], LinkDto::get("self", format!("/characters/{id}")));
    }

    #[test]
    fn test_request_accepts_null_technique_list() {
        let dto: CharacterRequestDto =
            serde_json::from_str(r#"{"name":"Toji","techniqueNames":null}"#).unwrap();
        let input = CharacterInput::from(dto);
        assert!(input.technique_names.is_empty());
        assert!(input.clan_name.is_none());
    }
}
