mod importer;

use clap::{ArgGroup, Parser};
use importer::{delete_sentences, parse_records, upload_sentences};
use sqlx::SqlitePool;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seed", about = "Upload or delete the sentence collection")]
#[command(group(ArgGroup::new("action").required(true).args(["upload", "delete"])))]
struct Args {
    /// Insert every valid sentence from --file
    #[arg(long)]
    upload: bool,

    /// Delete all sentences
    #[arg(long)]
    delete: bool,

    /// Path to the sentences JSON file
    #[arg(short, long, default_value = "backend/data/sentences.json")]
    file: PathBuf,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Connecting to database...");
    let pool = SqlitePool::connect(&args.database_url).await?;

    // Run migrations to ensure schema exists
    sqlx::migrate!("../../backend/migrations").run(&pool).await?;

    if args.delete {
        let deleted = delete_sentences(&pool).await?;
        println!("{} sentences deleted.", deleted);
        return Ok(());
    }

    println!("Reading sentences: {:?}", args.file);
    let raw = std::fs::read_to_string(&args.file)?;
    let records = parse_records(&raw)?;
    println!("Found {} records", records.len());

    let stats = upload_sentences(&pool, records).await?;

    println!();
    println!("Upload complete:");
    println!("  Parsed:   {}", stats.parsed);
    println!("  Inserted: {}", stats.inserted);
    println!("  Skipped:  {}", stats.skipped);

    Ok(())
}
