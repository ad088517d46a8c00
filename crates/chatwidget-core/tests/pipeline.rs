use async_trait::async_trait;
use chatwidget_core::completion::CompletionMessage;
use chatwidget_core::{
    ChatError, ChatSession, Completer, CompletionError, Config, FaqEntry, KnowledgeEntry,
    Message, Pacing, ReplySource, TrainingCorpus, ValidationError,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

/// Completer that returns a fixed result and records what it was sent.
struct ScriptedCompleter {
    reply: Result<String, CompletionError>,
    calls: Arc<Mutex<Vec<Vec<CompletionMessage>>>>,
}

impl ScriptedCompleter {
    fn new(reply: Result<String, CompletionError>) -> (Self, Arc<Mutex<Vec<Vec<CompletionMessage>>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                reply,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl Completer for ScriptedCompleter {
    async fn complete(
        &self,
        instructions: &str,
        recent: &[Message],
        user_message: &str,
        _timeout: Duration,
    ) -> Result<String, CompletionError> {
        let messages =
            chatwidget_core::completion::build_messages(instructions, recent, user_message);
        self.calls.lock().unwrap().push(messages);
        self.reply.clone()
    }
}

fn session() -> ChatSession {
    ChatSession::new(&Config::new()).with_pacing(Pacing::Instant)
}

fn corpus() -> TrainingCorpus {
    TrainingCorpus {
        faqs: vec![FaqEntry {
            question: "what are your hours".to_string(),
            keywords: "hours,open".to_string(),
            answer: "9am-5pm".to_string(),
        }],
        knowledge: vec![KnowledgeEntry {
            title: "International shipping".to_string(),
            content: "We ship to 40 countries.".to_string(),
        }],
        instructions: "You answer questions about the store.".to_string(),
    }
}

#[tokio::test]
async fn test_question_with_trailing_punctuation_hits_faq() {
    let mut session = session();
    let outcome = session
        .resolve("What are your hours?", &corpus())
        .await
        .unwrap();
    assert_eq!(outcome.text, "9am-5pm");
    assert_eq!(outcome.source, ReplySource::Faq);
}

#[tokio::test]
async fn test_knowledge_consulted_after_faq_miss() {
    let (completer, calls) = ScriptedCompleter::new(Ok("unused".to_string()));
    let mut session = session().with_completer(Box::new(completer));

    let outcome = session
        .resolve("do you offer shipping abroad", &corpus())
        .await
        .unwrap();
    assert_eq!(outcome.text, "We ship to 40 countries.");
    assert_eq!(outcome.source, ReplySource::Knowledge);
    assert!(calls.lock().unwrap().is_empty(), "completion must be skipped on a match");
}

#[tokio::test]
async fn test_completion_used_when_corpus_misses() {
    let (completer, calls) = ScriptedCompleter::new(Ok("Our cafe serves espresso.".to_string()));
    let mut session = session().with_completer(Box::new(completer));

    let outcome = session
        .resolve("do you sell coffee", &corpus())
        .await
        .unwrap();
    assert_eq!(outcome.text, "Our cafe serves espresso.");
    assert_eq!(outcome.source, ReplySource::Completion);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let sent = &calls[0];
    assert_eq!(sent[0].role, "system");
    assert_eq!(sent[0].content, "You answer questions about the store.");
    assert_eq!(sent.last().unwrap().content, "do you sell coffee");
    // the current message is not duplicated in the context
    assert_eq!(sent.len(), 2);
}

#[tokio::test]
async fn test_completion_context_carries_recent_turns() {
    let (completer, calls) = ScriptedCompleter::new(Ok("sure".to_string()));
    let mut session = session().with_completer(Box::new(completer));
    let corpus = corpus();

    for text in ["one", "two", "three", "four"] {
        session.resolve(text, &corpus).await.unwrap();
    }

    let calls = calls.lock().unwrap();
    let last = calls.last().unwrap();
    // system + 5 recent + current
    assert_eq!(last.len(), 7);
    let contents: Vec<&str> = last.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(&contents[1..], &["sure", "two", "sure", "three", "sure", "four"]);
    assert_eq!(last[1].role, "assistant");
    assert_eq!(last[2].role, "user");
}

#[tokio::test]
async fn test_completion_failure_falls_back() {
    let (completer, _) = ScriptedCompleter::new(Err(CompletionError::Service {
        status: 500,
        body: "boom".to_string(),
    }));
    let mut session = session().with_completer(Box::new(completer));

    let outcome = session
        .resolve("hello there", &TrainingCorpus::default())
        .await
        .unwrap();
    assert_eq!(outcome.source, ReplySource::Fallback);
    assert_eq!(outcome.text, chatwidget_core::fallback::GREETING_REPLY);
}

#[tokio::test]
async fn test_completion_timeout_falls_back() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hold = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let mut config = Config::new();
    config.completion.enabled = true;
    config.completion.api_key = "sk-live-test".to_string();
    config.completion.endpoint = format!("http://{}/v1/chat/completions", addr);
    config.completion.timeout_ms = 100;

    let mut session = ChatSession::new(&config).with_pacing(Pacing::Instant);
    assert!(session.has_completer());

    let started = Instant::now();
    let outcome = session
        .resolve("tell me a story", &TrainingCorpus::default())
        .await
        .unwrap();

    assert_eq!(outcome.source, ReplySource::Fallback);
    assert!(!outcome.text.is_empty());
    assert!(started.elapsed() < Duration::from_secs(5));
    hold.abort();
}

#[tokio::test]
async fn test_oversized_message_appends_nothing() {
    let mut session = session();
    let long = "a".repeat(2001);

    let err = session.resolve(&long, &corpus()).await.unwrap_err();
    assert_eq!(
        err,
        ChatError::Validation(ValidationError::TooLong {
            len: 2001,
            max: 2000
        })
    );
    assert_eq!(err.to_string(), "Message too long. Maximum 2000 characters.");
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_rate_limit_then_recovery() {
    let mut session = session();
    let corpus = corpus();
    let start = Instant::now();

    for i in 0..10 {
        session
            .resolve_at(&format!("message {}", i), &corpus, start)
            .await
            .unwrap();
    }
    assert_eq!(session.history().len(), 20);

    let err = session
        .resolve_at("one too many", &corpus, start)
        .await
        .unwrap_err();
    assert_eq!(err.retry_after_secs(), Some(30));
    assert_eq!(session.history().len(), 20, "throttled message must not be recorded");

    let later = start + Duration::from_millis(30_000);
    let outcome = session.resolve_at("hours", &corpus, later).await.unwrap();
    assert_eq!(outcome.text, "9am-5pm");
}

#[tokio::test]
async fn test_every_accepted_message_gets_a_reply() {
    let mut session = session();
    let corpus = corpus();
    let long = "long words ".repeat(150);
    let inputs: [&str; 8] = [
        "hi",
        "SELECT * FROM users; --",
        "<script>alert('x')</script>",
        "' or 1=1",
        "???",
        "what are your hours",
        "ünïcödé message",
        long.as_str(),
    ];

    for (i, input) in inputs.iter().enumerate() {
        let now = Instant::now() + Duration::from_secs(60 * i as u64);
        let outcome = session.resolve_at(input, &corpus, now).await.unwrap();
        assert!(!outcome.text.is_empty(), "empty reply for {:?}", input);
        assert!(outcome.text.chars().count() <= 500);
    }
}

#[tokio::test]
async fn test_long_completion_is_shaped() {
    let long_reply = "This is a sentence. ".repeat(60);
    let (completer, _) = ScriptedCompleter::new(Ok(long_reply));
    let mut session = session().with_completer(Box::new(completer));

    let outcome = session
        .resolve("do you sell coffee", &corpus())
        .await
        .unwrap();
    assert!(outcome.text.chars().count() <= 500);
    assert!(outcome.text.ends_with('.'));
    assert_eq!(session.history().messages()[1].text, outcome.text);
}

#[tokio::test]
async fn test_user_messages_stored_sanitized() {
    let mut session = session();
    session
        .resolve("<b>hello</b>", &TrainingCorpus::default())
        .await
        .unwrap();
    assert_eq!(
        session.history().messages()[0].text,
        "&lt;b&gt;hello&lt;&#x2F;b&gt;"
    );
}

#[tokio::test]
async fn test_accepted_faq_beats_stronger_knowledge() {
    let corpus = TrainingCorpus {
        faqs: vec![FaqEntry {
            question: "how do I send an item back".to_string(),
            keywords: "return".to_string(),
            answer: "Use the prepaid label.".to_string(),
        }],
        knowledge: vec![KnowledgeEntry {
            title: "Return policy".to_string(),
            content: "Returns are accepted within 30 days.".to_string(),
        }],
        ..TrainingCorpus::default()
    };

    let faq = chatwidget_core::match_faq("return policy", &corpus.faqs).unwrap();
    let knowledge = chatwidget_core::match_knowledge("return policy", &corpus.knowledge).unwrap();
    assert_eq!(faq.score, 50);
    assert_eq!(knowledge.score, 100);

    let mut session = session();
    let outcome = session.resolve("return policy", &corpus).await.unwrap();
    assert_eq!(outcome.source, ReplySource::Faq);
    assert_eq!(outcome.text, "Use the prepaid label.");
}

#[tokio::test]
async fn test_zero_length_limit_still_replies() {
    let mut config = Config::new();
    config.response.max_length = 0;
    let mut session = ChatSession::new(&config).with_pacing(Pacing::Instant);

    let outcome = session.resolve("hours", &corpus()).await.unwrap();
    assert!(!outcome.text.is_empty());
    assert!(outcome.text.chars().count() <= chatwidget_core::shaper::MIN_MAX_LENGTH);
}
