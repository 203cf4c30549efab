use std::sync::Arc;
use tracing::{error, info, warn};

use medical_chatbot::application::{IngestReport, IngestService};
use medical_chatbot::domain::{DomainError, TextSplitter};
use medical_chatbot::infrastructure::{
    telemetry, HuggingFaceEmbedding, PdfDirectoryLoader, QdrantVectorIndex, Settings,
};

async fn run() -> Result<IngestReport, DomainError> {
    let settings = Settings::load()?;

    let token = settings.token(|key| std::env::var(key).ok());
    if token.is_none() {
        warn!(
            token_env = %settings.auth.token_env,
            "no inference token set; embedding requests are anonymous and rate limited"
        );
    }

    let embedding = Arc::new(
        HuggingFaceEmbedding::new(&settings.embedding, settings.collection.dimension)
            .with_token(token),
    );
    let index = Arc::new(QdrantVectorIndex::connect(&settings.qdrant.url)?);
    info!(url = %settings.qdrant.url, "vector index client ready");

    let splitter = TextSplitter::new(settings.chunking.size, settings.chunking.overlap)?;
    let service = IngestService::new(embedding, index, settings.collection_spec(), splitter)
        .with_batch_size(settings.ingest.batch_size)
        .with_failure_policy(settings.ingest.on_failure);

    let loader = PdfDirectoryLoader::new(&settings.data_dir);
    service.run(&loader).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("warn,ingest=info,medical_chatbot=info");

    match run().await {
        Ok(report) => {
            info!(
                pages = report.pages,
                chunks = report.chunks,
                records = report.records_written,
                "index rebuilt"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "ingestion failed; re-run to rebuild the index from scratch");
            Err(e.into())
        }
    }
}
