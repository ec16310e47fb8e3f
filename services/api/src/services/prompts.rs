//! services/api/src/services/prompts.rs
//!
//! Prompt text sent to the model. The product's audience writes in Spanish, so
//! the prompts (and therefore the generated text) are in Spanish.

use analista_core::domain::{AnalysisType, Topic};
use analista_core::trends::TREND_COUNT;

/// The region value meaning "no particular country".
pub const GLOBAL_REGION: &str = "Global";
/// The topic value meaning "all news".
pub const ALL_TOPICS: &str = "Todos";

/// Asks for exactly [`TREND_COUNT`] trends from the last 24 hours.
pub fn trend_prompt(region: &str, topic: &str) -> String {
    let place = if region == GLOBAL_REGION {
        "en el mundo".to_string()
    } else {
        format!("en {}", region)
    };
    let scope = if topic == ALL_TOPICS {
        "de noticias generales".to_string()
    } else {
        format!("específicamente sobre {}", topic)
    };

    format!(
        "IMPORTANTE: usa la búsqueda de Google. Identifica las {count} tendencias de noticias \
         más importantes {place} {scope} de las últimas 24 horas.\n\
         Responde con exactamente {count} líneas con este formato: \
         CATEGORIA | TITULO | IMPACTO (Alto, Medio o Bajo).\n\
         Consulta y cita al menos {count} fuentes web distintas, una por noticia.",
        count = TREND_COUNT,
    )
}

fn format_instruction(format: AnalysisType) -> &'static str {
    match format {
        AnalysisType::Deep => {
            "Escribe un análisis profundo, estructurado y crítico. Usa subtítulos y puntos clave."
        }
        AnalysisType::Brief => {
            "Escribe un comentario breve, directo y contundente de máximo 2 párrafos."
        }
        AnalysisType::Script => {
            "Escribe un guion profesional para radio o TV con marcas de tiempo [00:00], tono sugerido y ganchos para la audiencia."
        }
        AnalysisType::Anecdote => {
            "Relata una anécdota histórica o curiosa que funcione como analogía del tema."
        }
        AnalysisType::BookRef => {
            "Cita un libro fundamental que explique el trasfondo del tema y resume su relevancia actual."
        }
    }
}

/// The system instruction for a streamed analysis.
pub fn analysis_system_instruction(topic: Topic, format: AnalysisType, prompt: &str) -> String {
    format!(
        "Eres un productor de noticias de élite. Tu trabajo es ayudar a un analista a \
         destacar con información EN TIEMPO REAL.\n\n\
         CONTEXTO:\n\
         - Tema: {topic}\n\
         - Formato: {format}\n\
         - Instrucción: {instruction}\n\n\
         REGLA CRÍTICA: usa la búsqueda de Google para obtener los datos más recientes sobre \"{prompt}\". \
         No te apoyes en tu conocimiento previo si hay noticias de las últimas 48 horas.\n\n\
         FORMATO DE RESPUESTA:\n\
         - Responde solo en Markdown.\n\
         - No uses iconos, emojis ni símbolos decorativos.\n\
         - Usa asteriscos solo para negritas (**texto**).\n\
         - Estructura con títulos (#) y subtítulos (##, ###).\n\
         - Tono profesional y directo.",
        topic = topic.as_str(),
        format = format.as_str(),
        instruction = format_instruction(format),
        prompt = prompt,
    )
}

/// The user turn for a streamed analysis.
pub fn analysis_user_prompt(prompt: &str) -> String {
    format!(
        "Analiza lo siguiente a partir de los últimos acontecimientos: {}",
        prompt
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_prompt_scopes_region_and_topic() {
        let global = trend_prompt(GLOBAL_REGION, ALL_TOPICS);
        assert!(global.contains("en el mundo"));
        assert!(global.contains("de noticias generales"));
        assert!(global.contains("CATEGORIA | TITULO | IMPACTO"));

        let local = trend_prompt("Chile", "Economía");
        assert!(local.contains("en Chile"));
        assert!(local.contains("específicamente sobre Economía"));
    }

    #[test]
    fn system_instruction_carries_format_and_rules() {
        let text = analysis_system_instruction(Topic::Sports, AnalysisType::Script, "final de copa");
        assert!(text.contains("SPORTS"));
        assert!(text.contains("SCRIPT"));
        assert!(text.contains("[00:00]"));
        assert!(text.contains("\"final de copa\""));
        assert!(text.contains("48 horas"));
        assert!(text.contains("emojis"));
    }
}
