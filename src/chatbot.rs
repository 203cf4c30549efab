use std::sync::Arc;
use tracing::{error, info};

use medical_chatbot::application::{ChatService, ChatSummary, EXIT_COMMAND};
use medical_chatbot::domain::{ports::VectorIndex, DomainError};
use medical_chatbot::infrastructure::{
    telemetry, HuggingFaceChat, HuggingFaceEmbedding, PromptedLines, QdrantVectorIndex, Settings,
};

async fn run() -> Result<ChatSummary, DomainError> {
    let settings = Settings::load()?;
    let token = settings.require_token(|key| std::env::var(key).ok())?;

    let embedding = Arc::new(
        HuggingFaceEmbedding::new(&settings.embedding, settings.collection.dimension)
            .with_token(Some(token.clone())),
    );
    let index = QdrantVectorIndex::connect(&settings.qdrant.url)?;
    let collection = index.get_collection(&settings.collection.name).await?;
    let llm = Arc::new(HuggingFaceChat::new(&settings.llm, token));

    let service = ChatService::new(embedding, collection, llm)
        .with_system_prompt(&settings.prompts.system)
        .with_top_k(settings.rag.top_k)
        .with_generation(settings.generation());
    service.ensure_compatible()?;
    info!(collection = %settings.collection.name, model = %settings.llm.model, "chatbot ready");

    println!("Medical Chatbot ready! (type '{EXIT_COMMAND}' to quit)\n");
    let mut stdout = std::io::stdout();
    service.run(PromptedLines::stdin("You: "), &mut stdout).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("warn,chatbot=info,medical_chatbot=info");

    if let Err(e) = run().await {
        error!(error = %e, "chatbot stopped");
        return Err(e.into());
    }
    Ok(())
}
