use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use medical_chatbot::application::{ChatService, IngestService};
use medical_chatbot::domain::ports::{DocumentLoader, EmbeddingService, LlmService, VectorIndex};
use medical_chatbot::domain::{
    CollectionSpec, Document, DomainError, Embedding, GenerationParams, Message, TextSplitter,
};
use medical_chatbot::infrastructure::{InMemoryVectorIndex, PromptedLines};

const COLLECTION: &str = "medical_chatbot";
const DIM: usize = 384;
const TOPICS: [&str; 4] = ["diabetes", "asthma", "migraine", "anemia"];

struct Pages(Vec<Document>);

impl DocumentLoader for Pages {
    fn load(&self) -> Result<Vec<Document>, DomainError> {
        Ok(self.0.clone())
    }
}

/// One axis per topic keyword, plus a small constant so no vector is zero.
struct TopicEmbedding;

#[async_trait]
impl EmbeddingService for TopicEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        let lower = text.to_lowercase();
        let mut v = vec![0.001; DIM];
        for (axis, topic) in TOPICS.iter().enumerate() {
            v[axis] += lower.matches(topic).count() as f32;
        }
        Ok(Embedding::new(v))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Echoes the first context block so tests can see what was retrieved.
#[derive(Default)]
struct EchoLlm {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmService for EchoLlm {
    async fn chat_completion(
        &self,
        messages: &[Message],
        _params: GenerationParams,
    ) -> Result<String, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let context = messages[1]
            .content
            .trim_start_matches("Context:\n")
            .split("\n\n")
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(context)
    }
}

fn corpus() -> Vec<Document> {
    let long_asthma = "Asthma narrows the airways and inflames them. ".repeat(30);
    vec![
        Document::new("Diabetes is managed with insulin and diet.", "data/endocrine.pdf")
            .with_page(1),
        Document::new(long_asthma, "data/respiratory.pdf").with_page(1),
        Document::new("", "data/respiratory.pdf").with_page(2),
        Document::new("Migraine attacks respond to triptans.", "data/neuro.pdf").with_page(4),
    ]
}

fn ingest_service(index: Arc<InMemoryVectorIndex>) -> IngestService {
    IngestService::new(
        Arc::new(TopicEmbedding),
        index,
        CollectionSpec::cosine(COLLECTION, DIM),
        TextSplitter::new(500, 50).unwrap(),
    )
}

#[tokio::test]
async fn ingest_then_chat_answers_from_the_closest_chunk() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let report = ingest_service(index.clone())
        .run(&Pages(corpus()))
        .await
        .unwrap();

    assert_eq!(report.pages, 4);
    assert_eq!(report.chunks, report.records_written);
    assert!(report.chunks >= 5, "asthma page should span several chunks");

    let llm = Arc::new(EchoLlm::default());
    let service = ChatService::new(
        Arc::new(TopicEmbedding),
        index.get_collection(COLLECTION).await.unwrap(),
        llm.clone(),
    );
    service.ensure_compatible().unwrap();

    let mut out = Vec::new();
    let summary = service
        .run(
            PromptedLines::new(
                "How is diabetes treated?\nexit\nWhat about migraine?\n".as_bytes(),
                std::io::sink(),
                "You: ",
            ),
            &mut out,
        )
        .await
        .unwrap();

    assert_eq!(summary.turns, 1);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "\nBot: Diabetes is managed with insulin and diet.\n\n"
    );
}

#[tokio::test]
async fn rebuilding_twice_yields_the_same_index() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let service = ingest_service(index.clone());

    let first_report = service.run(&Pages(corpus())).await.unwrap();
    let first = index.records(COLLECTION).unwrap();
    let second_report = service.run(&Pages(corpus())).await.unwrap();
    let second = index.records(COLLECTION).unwrap();

    assert_eq!(first_report, second_report);
    assert_eq!(first, second);
    assert_eq!(first.first().unwrap().id.to_string(), "chunk_0");
}

#[tokio::test]
async fn empty_corpus_leaves_an_empty_collection() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let report = ingest_service(index.clone())
        .run(&Pages(Vec::new()))
        .await
        .unwrap();

    assert_eq!(report.records_written, 0);
    assert_eq!(index.record_count(COLLECTION), Some(0));

    let collection = index.get_collection(COLLECTION).await.unwrap();
    let service = ChatService::new(Arc::new(TopicEmbedding), collection, Arc::new(EchoLlm::default()));
    let answer = service.answer("anything on anemia?").await.unwrap();
    assert_eq!(answer, "");
}
