pub mod agent;
pub mod models;
pub mod config;
pub mod llm;
pub mod cli;
pub mod history;
pub mod cache;

use agent::{ Assistant, AssistantOptions };
use cli::{ render, Args, Command };
use config::AppConfig;
use log::{ info, warn };
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = AppConfig::from_args(&args)?;

    info!("--- Core Configuration ---");
    info!("Account: {}", config.account_id);
    info!("Base URL: {}", config.base_url);
    info!("Default Model: {}", config.default_model.as_deref().unwrap_or("first listed"));
    info!("Request Timeout: {:?}", config.request_timeout);
    info!("Max History Chats: {}", config.max_history_chats);
    info!("History Store Type: {}", config.history_type);
    info!("-------------------------");

    let client = llm::chat::new_client(&config)?;
    let blobs = history::create_blob_store(&config)?;
    let assistant = Assistant::new(client, blobs, AssistantOptions::from(&config)).await?;
    if let Some(warning) = assistant.load_warning() {
        warn!("{}", warning);
        eprintln!("{}", warning);
    }

    match args.command {
        Command::Ask { model, prompt } => {
            let model = assistant.resolve_model(model.as_deref()).await?;
            let exchange = assistant.ask(&Command::join_words(&prompt), &model).await?;
            if let Some(answer) = exchange.conversation.last_answer() {
                println!("{}", answer);
            }
            if let Some(e) = exchange.save_error {
                return Err(e.into());
            }
            eprintln!("\nconversation {} ({})", exchange.conversation.id, llm::format_model_name(&model));
        }
        Command::FollowUp { id, question } => {
            let exchange = assistant.follow_up(&id, &Command::join_words(&question)).await?;
            if let Some(answer) = exchange.conversation.last_answer() {
                println!("{}", answer);
            }
            if let Some(e) = exchange.save_error {
                return Err(e.into());
            }
        }
        Command::Models => {
            let list = assistant.load_models().await;
            if let Some(e) = &list.fetch_error {
                eprintln!("{}", e);
            }
            let selected = models::catalog::pick_default(&list.options, config.default_model.as_deref());
            print!("{}", render::render_models(&list, selected));
        }
        Command::List => {
            print!("{}", render::render_conversation_list(&assistant.conversations().await));
        }
        Command::Show { id, plain } => {
            let conversation = assistant.find(&id).await?;
            if plain {
                println!("{}", render::render_plain(&conversation));
            } else {
                print!("{}", render::render_transcript(&conversation));
            }
        }
        Command::Pin { id } => {
            let conversation = assistant.toggle_pin(&id).await?;
            let state = if conversation.pinned { "Conversation pinned" } else { "Conversation unpinned" };
            println!("{}: {}", state, render::conversation_title(&conversation));
        }
        Command::Delete { id } => {
            let conversation = assistant.delete(&id).await?;
            println!("Conversation removed: {}", render::conversation_title(&conversation));
        }
        Command::Clear => {
            assistant.clear().await?;
            println!("Conversations cleared");
        }
    }

    Ok(())
}
