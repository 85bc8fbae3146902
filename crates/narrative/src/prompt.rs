use catalog::CatalogEntry;

use crate::schema::NarrativePrompt;

pub const SYSTEM_PROMPT: &str = "Você é um escritor criativo no universo Star Wars.";

pub const NO_CHARACTERS: &str = "Não informados";
pub const NO_STARSHIPS: &str = "Não informadas";
pub const NO_PLANETS: &str = "Não informados";
pub const NO_EXTRA_IDEAS: &str = "Nenhuma";

pub fn build_story_prompt(
    characters: &[CatalogEntry],
    starships: &[CatalogEntry],
    planets: &[CatalogEntry],
    extra_ideas: &str,
) -> NarrativePrompt {
    let extra_ideas = if extra_ideas.trim().is_empty() {
        NO_EXTRA_IDEAS
    } else {
        extra_ideas
    };

    let user = format!(
        r#"Crie uma história envolvente no universo Star Wars considerando:
- Personagens: {}
- Naves: {}
- Planetas: {}
- Ideias extras: {}
"#,
        render_entries(characters, NO_CHARACTERS),
        render_entries(starships, NO_STARSHIPS),
        render_entries(planets, NO_PLANETS),
        extra_ideas
    );

    NarrativePrompt::new(SYSTEM_PROMPT, user)
}

/// One compact JSON line per entry, or the marker when there are none
fn render_entries(entries: &[CatalogEntry], empty_marker: &str) -> String {
    if entries.is_empty() {
        return empty_marker.to_string();
    }

    let mut rendered = format!("{} item(s)", entries.len());
    for entry in entries {
        rendered.push_str("\n  * ");
        rendered.push_str(&entry.as_value().to_string());
    }
    rendered
}
