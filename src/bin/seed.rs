use clap::Parser;
use fake::{
    faker::{lorem::en::{Paragraph, Words}, name::en::Name},
    Fake,
};
use scholarmart::{
    domain::CreateProjectRequest,
    repository::{ProjectRepository, SqliteProjectRepository},
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use uuid::Uuid;

/// Seeds a development database with creators and their projects.
#[derive(Parser, Debug)]
#[command(name = "seed")]
struct Args {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://scholarmart.db")]
    database_url: String,

    /// Number of projects to create
    #[arg(long, default_value_t = 12)]
    projects: usize,

    /// Number of creators the projects are spread across
    #[arg(long, default_value_t = 3)]
    creators: usize,
}

const SUBJECTS: &[&str] = &[
    "Computer Science",
    "Economics",
    "Mechanical Engineering",
    "Biochemistry",
    "Mass Communication",
    "Accounting",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    println!("🌱 Starting database seeding...");

    // Initialize database connection
    let options = SqliteConnectOptions::from_str(&args.database_url)?.create_if_missing(true);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run migrations first
    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let project_repo = SqliteProjectRepository::new(db_pool.clone());

    println!("👥 Creating {} creators...", args.creators.max(1));
    let creators: Vec<(Uuid, String)> = (0..args.creators.max(1))
        .map(|_| (Uuid::new_v4(), Name().fake::<String>()))
        .collect();

    println!("📚 Creating {} projects...", args.projects);
    for i in 0..args.projects {
        let (creator_id, creator_name) = &creators[i % creators.len()];
        let subject = SUBJECTS[i % SUBJECTS.len()];
        let words: Vec<String> = Words(2..5).fake();
        let title = format!("{}: {}", subject, words.join(" "));

        // Alternate USD and NGN listings
        let (price_minor, currency) = if i % 2 == 0 {
            ((5..80).fake::<i64>() * 100, "USD")
        } else {
            ((5_000..60_000).fake::<i64>() * 100, "NGN")
        };

        let project = project_repo
            .create(
                *creator_id,
                CreateProjectRequest {
                    title,
                    description: Paragraph(2..4).fake(),
                    creator_name: creator_name.clone(),
                    price_minor,
                    currency: currency.to_string(),
                },
            )
            .await?;

        println!("  ✅ {} ({} {})", project.title, project.currency, project.price_minor);
    }

    println!();
    println!("Creator ids (send as X-User-Id):");
    for (id, name) in &creators {
        println!("  {}  {}", id, name);
    }
    println!("✨ Seeding complete!");

    Ok(())
}
