//! crates/analista_core/src/references.rs
//!
//! Static reference material offered alongside the ANECDOTE and BOOK_REF formats.

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Anecdote {
    #[schema(value_type = String)]
    pub title: &'static str,
    #[schema(value_type = String)]
    pub content: &'static str,
    #[schema(value_type = String)]
    pub era: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BookReference {
    #[schema(value_type = String)]
    pub title: &'static str,
    #[schema(value_type = String)]
    pub author: &'static str,
    #[schema(value_type = String)]
    pub context: &'static str,
    #[schema(value_type = String)]
    pub summary: &'static str,
}

pub const SEED_ANECDOTES: &[Anecdote] = &[
    Anecdote {
        title: "El Churchill Oculto",
        content: "Durante la Segunda Guerra Mundial, Churchill despachaba desde la cama hasta el mediodía: dictaba discursos y leía informes en pijama.",
        era: "Segunda Guerra Mundial",
    },
    Anecdote {
        title: "La Diplomacia del Ping Pong",
        content: "En 1971 un cruce casual entre jugadores de tenis de mesa de EE.UU. y China abrió la puerta a una visita histórica entre ambas potencias.",
        era: "Guerra Fría",
    },
];

pub const SEED_BOOKS: &[BookReference] = &[
    BookReference {
        title: "El Príncipe",
        author: "Nicolás Maquiavelo",
        context: "Clave para leer la realpolitik moderna.",
        summary: "Cómo un gobernante equilibra virtud y dureza para conservar el poder y la estabilidad del Estado.",
    },
    BookReference {
        title: "La Riqueza de las Naciones",
        author: "Adam Smith",
        context: "Punto de partida del análisis económico liberal.",
        summary: "La división del trabajo, la productividad y los mercados libres como motores de prosperidad.",
    },
];
