//! Decoding of extraction service replies.
//!
//! Services are asked for `{"recipes": [...]}` but real replies drift: Spanish
//! keys, a single legacy object flagged `is_recipe`, or JSON wrapped in prose
//! or code fences. All of these are accepted.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{ExtractError, Extraction};
use crate::core::models::ExtractedRecipe;

static EMBEDDED_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid embedded object pattern"));

const LIST_KEYS: [&str; 2] = ["recipes", "recetas"];
const FLAG_KEYS: [&str; 2] = ["is_recipe", "es_receta"];
const NOTE_KEYS: [&str; 2] = ["warning", "error"];

/// Decodes a service reply into an [`Extraction`].
///
/// # Errors
///
/// Returns [`ExtractError::MalformedReply`] when no JSON can be found or the
/// JSON does not describe recipes.
///
/// # Example
///
/// ```
/// use recipack::extractor::parse_reply;
///
/// let reply = "Claro:\n```json\n{\"recetas\": [{\"creador\": \"Ana\", \"ingredientes\": \"harina\"}]}\n```";
/// let extraction = parse_reply(reply).unwrap();
/// assert_eq!(extraction.recipes[0].creator, "Ana");
/// ```
pub fn parse_reply(reply: &str) -> Result<Extraction, ExtractError> {
    let trimmed = reply.trim();
    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value,
        Err(_) => {
            let embedded = EMBEDDED_OBJECT
                .find(trimmed)
                .ok_or_else(|| ExtractError::MalformedReply(snippet(trimmed)))?;
            serde_json::from_str(embedded.as_str())
                .map_err(|e| ExtractError::MalformedReply(e.to_string()))?
        }
    };
    interpret(value)
}

fn interpret(value: Value) -> Result<Extraction, ExtractError> {
    match value {
        Value::Array(items) => Ok(Extraction::new(decode_recipes(items)?)),
        Value::Object(mut map) => {
            let note = NOTE_KEYS
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str).map(str::to_string));

            if let Some(list) = LIST_KEYS.iter().find_map(|k| map.remove(*k)) {
                let Value::Array(items) = list else {
                    return Err(ExtractError::MalformedReply(
                        "recipe list is not an array".to_string(),
                    ));
                };
                let mut extraction = Extraction::new(decode_recipes(items)?);
                extraction.warning = note;
                return Ok(extraction);
            }

            let flagged = FLAG_KEYS
                .iter()
                .any(|k| map.get(*k).and_then(Value::as_bool).unwrap_or(false));
            if flagged {
                let recipe = decode_recipe(Value::Object(map))?;
                Ok(Extraction::new(vec![recipe]))
            } else {
                Ok(Extraction {
                    recipes: Vec::new(),
                    warning: note,
                })
            }
        }
        other => Err(ExtractError::MalformedReply(snippet(&other.to_string()))),
    }
}

fn decode_recipes(items: Vec<Value>) -> Result<Vec<ExtractedRecipe>, ExtractError> {
    items.into_iter().map(decode_recipe).collect()
}

fn decode_recipe(mut item: Value) -> Result<ExtractedRecipe, ExtractError> {
    if let Value::Object(map) = &mut item {
        for key in FLAG_KEYS {
            map.remove(key);
        }
        // Services sometimes answer `null` for strings they could not fill.
        map.retain(|_, v| !v.is_null());
    }
    serde_json::from_value(item).map_err(|e| ExtractError::MalformedReply(e.to_string()))
}

fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_list() {
        let reply = r#"{"recipes": [{"creator": "Ana", "name": "Flan", "ingredients": "4 huevos", "steps": "Hornear", "has_photo": false}]}"#;
        let extraction = parse_reply(reply).unwrap();
        assert_eq!(extraction.recipes.len(), 1);
        assert_eq!(extraction.recipes[0].name.as_deref(), Some("Flan"));
        assert_eq!(extraction.warning, None);
    }

    #[test]
    fn test_spanish_list_with_nulls() {
        let reply = r#"{"recetas": [{"creador": "Marta", "nombre_receta": "Gazpacho", "ingredientes": "1 kg tomates", "pasos_preparacion": null, "tiene_foto": true, "fecha_mensaje": "2025-10-02T12:10:01+00:00"}]}"#;
        let extraction = parse_reply(reply).unwrap();
        let recipe = &extraction.recipes[0];
        assert_eq!(recipe.creator, "Marta");
        assert_eq!(recipe.steps, None);
        assert!(recipe.has_photo);
        assert_eq!(
            recipe.message_date.as_deref(),
            Some("2025-10-02T12:10:01+00:00")
        );
    }

    #[test]
    fn test_empty_list() {
        assert!(parse_reply(r#"{"recetas": []}"#).unwrap().recipes.is_empty());
    }

    #[test]
    fn test_legacy_single_object() {
        let reply = r#"{"es_receta": true, "creador": "Ana", "ingredientes": "harina"}"#;
        assert_eq!(parse_reply(reply).unwrap().recipes.len(), 1);

        let not_recipe = r#"{"es_receta": false, "creador": "Ana"}"#;
        assert!(parse_reply(not_recipe).unwrap().recipes.is_empty());
    }

    #[test]
    fn test_embedded_in_prose() {
        let reply = "Aquí tienes:\n{\"recipes\": [{\"creator\": \"Luis\", \"ingredients\": \"arroz\"}]}\nSaludos";
        assert_eq!(parse_reply(reply).unwrap().recipes[0].creator, "Luis");
    }

    #[test]
    fn test_error_note_kept() {
        let reply = r#"{"recetas": [], "error": "sin ingredientes"}"#;
        assert_eq!(
            parse_reply(reply).unwrap().warning.as_deref(),
            Some("sin ingredientes")
        );
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            parse_reply("no JSON here"),
            Err(ExtractError::MalformedReply(_))
        ));
        assert!(matches!(
            parse_reply("{broken"),
            Err(ExtractError::MalformedReply(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"recipes": "none"}"#),
            Err(ExtractError::MalformedReply(_))
        ));
        assert!(matches!(parse_reply("42"), Err(ExtractError::MalformedReply(_))));
    }
}
