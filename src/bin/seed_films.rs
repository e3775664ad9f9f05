//! Seed data script - populates the film catalog with demo titles
//!
//! Run with: cargo run --bin seed-films
//!
//! Existing titles are left untouched, so the script is safe to re-run.

use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectOptions, Database, EntityTrait, QueryFilter, Set};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use framevault_api::entities::film::{self, Entity as FilmEntity};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("=== FrameVault Catalog Seed ===");

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://framevault.db?mode=rwc".to_string());

    let mut options = ConnectOptions::new(database_url.clone());
    options
        .max_connections(5)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10));

    info!("Connecting to database: {}", database_url);
    let db = Database::connect(options).await?;

    let created = seed_films(&db).await?;
    info!("Seeded {} films", created);
    info!("");
    info!("Try it:");
    info!("  curl http://localhost:8080/api/v1/films");
    info!("  curl 'http://localhost:8080/api/v1/films?featured=true'");
    info!("");
    info!("Or explore interactively at: http://localhost:8080/swagger-ui");

    Ok(())
}

struct SeedFilm {
    title: &'static str,
    director: &'static str,
    release_year: i32,
    price: rust_decimal::Decimal,
    stock: i32,
    description: &'static str,
    country: &'static str,
    runtime_minutes: i32,
    genres: &'static [&'static str],
    criterion_number: Option<i32>,
    awards: &'static [&'static str],
    cast: &'static [&'static str],
    format: &'static str,
    language: &'static str,
    featured: bool,
}

async fn seed_films(db: &sea_orm::DatabaseConnection) -> anyhow::Result<usize> {
    let films = vec![
        SeedFilm {
            title: "Seven Samurai",
            director: "Akira Kurosawa",
            release_year: 1954,
            price: dec!(39.99),
            stock: 25,
            description: "A village of farmers hires seven masterless samurai to defend their harvest from marauding bandits.",
            country: "Japan",
            runtime_minutes: 207,
            genres: &["Drama", "Action"],
            criterion_number: Some(2),
            awards: &["Venice Silver Lion"],
            cast: &["Toshiro Mifune", "Takashi Shimura"],
            format: "Blu-ray",
            language: "Japanese",
            featured: true,
        },
        SeedFilm {
            title: "Bicycle Thieves",
            director: "Vittorio De Sica",
            release_year: 1948,
            price: dec!(29.99),
            stock: 18,
            description: "A man and his son search postwar Rome for the stolen bicycle his job depends on.",
            country: "Italy",
            runtime_minutes: 89,
            genres: &["Drama"],
            criterion_number: Some(374),
            awards: &["Academy Honorary Award"],
            cast: &["Lamberto Maggiorani", "Enzo Staiola"],
            format: "Blu-ray",
            language: "Italian",
            featured: true,
        },
        SeedFilm {
            title: "The 400 Blows",
            director: "Francois Truffaut",
            release_year: 1959,
            price: dec!(27.99),
            stock: 30,
            description: "A neglected Parisian boy drifts into petty delinquency in Truffaut's semi-autobiographical debut.",
            country: "France",
            runtime_minutes: 99,
            genres: &["Drama", "Coming-of-age"],
            criterion_number: Some(5),
            awards: &["Cannes Best Director"],
            cast: &["Jean-Pierre Leaud"],
            format: "Blu-ray",
            language: "French",
            featured: false,
        },
        SeedFilm {
            title: "Persona",
            director: "Ingmar Bergman",
            release_year: 1966,
            price: dec!(31.99),
            stock: 12,
            description: "An actress who has fallen silent and the nurse caring for her find their identities dissolving into one another.",
            country: "Sweden",
            runtime_minutes: 83,
            genres: &["Drama", "Psychological"],
            criterion_number: Some(701),
            awards: &[],
            cast: &["Bibi Andersson", "Liv Ullmann"],
            format: "Blu-ray",
            language: "Swedish",
            featured: false,
        },
        SeedFilm {
            title: "Tokyo Story",
            director: "Yasujiro Ozu",
            release_year: 1953,
            price: dec!(34.99),
            stock: 20,
            description: "An elderly couple visit their grown children in Tokyo and find them too busy for more than polite attention.",
            country: "Japan",
            runtime_minutes: 136,
            genres: &["Drama", "Family"],
            criterion_number: Some(217),
            awards: &[],
            cast: &["Chishu Ryu", "Setsuko Hara"],
            format: "Blu-ray",
            language: "Japanese",
            featured: true,
        },
        SeedFilm {
            title: "8 1/2",
            director: "Federico Fellini",
            release_year: 1963,
            price: dec!(33.99),
            stock: 15,
            description: "A celebrated director retreats into memory and fantasy while his next film collapses around him.",
            country: "Italy",
            runtime_minutes: 138,
            genres: &["Drama", "Fantasy"],
            criterion_number: Some(140),
            awards: &["Academy Award for Best Foreign Language Film"],
            cast: &["Marcello Mastroianni", "Claudia Cardinale"],
            format: "Blu-ray",
            language: "Italian",
            featured: false,
        },
        SeedFilm {
            title: "Breathless",
            director: "Jean-Luc Godard",
            release_year: 1960,
            price: dec!(28.99),
            stock: 22,
            description: "A small-time crook on the run and an American student drift through Paris in the jump-cut landmark of the New Wave.",
            country: "France",
            runtime_minutes: 90,
            genres: &["Crime", "Drama"],
            criterion_number: Some(408),
            awards: &["Berlin Silver Bear"],
            cast: &["Jean-Paul Belmondo", "Jean Seberg"],
            format: "DVD",
            language: "French",
            featured: false,
        },
        SeedFilm {
            title: "Stalker",
            director: "Andrei Tarkovsky",
            release_year: 1979,
            price: dec!(36.99),
            stock: 8,
            description: "A guide leads a writer and a professor into the Zone, toward a room said to grant one's innermost wish.",
            country: "Soviet Union",
            runtime_minutes: 162,
            genres: &["Science Fiction", "Drama"],
            criterion_number: Some(888),
            awards: &[],
            cast: &["Alexander Kaidanovsky", "Anatoly Solonitsyn"],
            format: "4K UHD",
            language: "Russian",
            featured: true,
        },
        SeedFilm {
            title: "In the Mood for Love",
            director: "Wong Kar-wai",
            release_year: 2000,
            price: dec!(32.99),
            stock: 28,
            description: "Two neighbors in 1962 Hong Kong, each betrayed by a spouse, form a restrained and aching bond.",
            country: "Hong Kong",
            runtime_minutes: 98,
            genres: &["Romance", "Drama"],
            criterion_number: Some(147),
            awards: &["Cannes Best Actor"],
            cast: &["Tony Leung", "Maggie Cheung"],
            format: "4K UHD",
            language: "Cantonese",
            featured: true,
        },
        SeedFilm {
            title: "Wild Strawberries",
            director: "Ingmar Bergman",
            release_year: 1957,
            price: dec!(26.99),
            stock: 0,
            description: "An aging professor revisits the disappointments of his life on a day-long drive to receive an honorary degree.",
            country: "Sweden",
            runtime_minutes: 91,
            genres: &["Drama"],
            criterion_number: Some(139),
            awards: &["Berlin Golden Bear"],
            cast: &["Victor Sjostrom", "Bibi Andersson"],
            format: "DVD",
            language: "Swedish",
            featured: false,
        },
    ];

    let now = Utc::now();
    let mut created = 0;

    for seed in films {
        let exists = FilmEntity::find()
            .filter(film::Column::Title.eq(seed.title))
            .one(db)
            .await?
            .is_some();
        if exists {
            info!("  Skipping existing title: {}", seed.title);
            continue;
        }

        let model = film::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(seed.title.to_string()),
            director: Set(Some(seed.director.to_string())),
            release_year: Set(Some(seed.release_year)),
            price: Set(seed.price),
            stock: Set(seed.stock),
            description: Set(Some(seed.description.to_string())),
            country: Set(Some(seed.country.to_string())),
            runtime_minutes: Set(Some(seed.runtime_minutes)),
            genres: Set(serde_json::json!(seed.genres)),
            image_url: Set(None),
            criterion_number: Set(seed.criterion_number),
            awards: Set(serde_json::json!(seed.awards)),
            cast: Set(serde_json::json!(seed.cast)),
            format: Set(Some(seed.format.to_string())),
            language: Set(Some(seed.language.to_string())),
            featured: Set(seed.featured),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model.insert(db).await?;
        info!("  Created: {}", seed.title);
        created += 1;
    }

    Ok(created)
}
