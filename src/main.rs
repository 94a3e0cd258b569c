use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use vectordb_client::{
    Chunk, ChunkMetadata, Document, DocumentMetadata, JsonObject, Library, LibraryMetadata,
    MetadataFilters, VectorDbApi, VectorDbClient,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage libraries
    #[command(subcommand)]
    Library(LibraryCommand),
    /// Manage documents within a library
    #[command(subcommand)]
    Document(DocumentCommand),
    /// Manage chunks within a document
    #[command(subcommand)]
    Chunk(ChunkCommand),
    /// Search across all libraries
    Search {
        query: String,
        /// Metadata filters as key=value pairs
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, Value)>,
    },
}

#[derive(Subcommand)]
enum LibraryCommand {
    /// Create a library
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Fetch a library by id
    Get { id: String },
    /// Replace a library's name and metadata
    Update {
        id: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a library
    Delete { id: String },
}

#[derive(Subcommand)]
enum DocumentCommand {
    /// Add a document to a library
    Add { library_id: String, name: String },
    /// Fetch a document by id
    Get { library_id: String, id: String },
    /// Replace a document's metadata
    Update {
        library_id: String,
        id: String,
        name: String,
    },
    /// Delete a document
    Delete { library_id: String, id: String },
}

#[derive(Subcommand)]
enum ChunkCommand {
    /// Add a chunk to a document
    Add {
        library_id: String,
        document_id: String,
        name: String,
        text: String,
    },
    /// Fetch a chunk by id
    Get { id: String },
    /// Replace a chunk's text and metadata
    Update {
        id: String,
        name: String,
        text: String,
    },
    /// Delete a chunk
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if dotenv::dotenv().is_err() {
        warn!("didn't load a .env file")
    }

    let args = Cli::parse();
    let client = VectorDbClient::from_env().context("failed to create client")?;

    match args.command {
        Commands::Library(command) => match command {
            LibraryCommand::Create { name, description } => {
                print_json(&client.create_library(&library(&name, description)).await?)?
            }
            LibraryCommand::Get { id } => print_json(&client.get_library(&id).await?)?,
            LibraryCommand::Update {
                id,
                name,
                description,
            } => print_json(
                &client
                    .update_library(&id, &library(&name, description))
                    .await?,
            )?,
            LibraryCommand::Delete { id } => print_json(&client.delete_library(&id).await?)?,
        },
        Commands::Document(command) => match command {
            DocumentCommand::Add { library_id, name } => {
                print_json(&client.add_document(&library_id, &document(&name)).await?)?
            }
            DocumentCommand::Get { library_id, id } => {
                print_json(&client.get_document(&library_id, &id).await?)?
            }
            DocumentCommand::Update {
                library_id,
                id,
                name,
            } => print_json(
                &client
                    .update_document(&library_id, &id, &document(&name))
                    .await?,
            )?,
            DocumentCommand::Delete { library_id, id } => {
                print_json(&client.delete_document(&library_id, &id).await?)?
            }
        },
        Commands::Chunk(command) => match command {
            ChunkCommand::Add {
                library_id,
                document_id,
                name,
                text,
            } => print_json(
                &client
                    .add_chunk(&library_id, &document_id, &chunk(&name, &text))
                    .await?,
            )?,
            ChunkCommand::Get { id } => print_json(&client.get_chunk(&id).await?)?,
            ChunkCommand::Update { id, name, text } => {
                print_json(&client.update_chunk(&id, &chunk(&name, &text)).await?)?
            }
            ChunkCommand::Delete { id } => print_json(&client.delete_chunk(&id).await?)?,
        },
        Commands::Search { query, filters } => {
            let filters: MetadataFilters = filters.into_iter().collect();
            let results = client.search_all_libraries(&query, filters).await?;
            println!("{results}");
        }
    }

    Ok(())
}

fn library(name: &str, description: Option<String>) -> Library {
    Library {
        id: None,
        name: name.to_string(),
        metadata: LibraryMetadata {
            name: name.to_string(),
            created_at: Utc::now().to_rfc3339(),
            description,
        },
    }
}

fn document(name: &str) -> Document {
    Document {
        id: None,
        metadata: DocumentMetadata {
            name: name.to_string(),
            created_at: Utc::now().to_rfc3339(),
        },
    }
}

fn chunk(name: &str, text: &str) -> Chunk {
    Chunk {
        id: None,
        text: text.to_string(),
        metadata: ChunkMetadata {
            name: name.to_string(),
            created_at: Utc::now().to_rfc3339(),
        },
        embedding: None,
    }
}

fn parse_filter(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    Ok((key.to_string(), Value::String(value.to_string())))
}

fn print_json(object: &JsonObject) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(object)?);
    Ok(())
}
