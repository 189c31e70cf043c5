use crate::config::{OnExhausted, SummarizerConfig};
use crate::summary::client::{ChatMessage, ChatRequest, CompletionClient};
use crate::summary::fallback::extractive_summary;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

const SYSTEM_PROMPT: &str = "你是新闻总结机器人。你只会输出最终的新闻总结文本。你被禁止输出任何其他内容。";

const PRIMING_REPLY: &str = "明白。我只会用<summary>标签包裹最终总结，不会输出任何其他内容。";

fn user_prompt(content: &str) -> String {
    format!(
        "新闻内容如下：\n\n{content}\n\n[格式要求]\n输出格式：<summary>你的总结</summary>\n\n\
         [输出要求]\n1. 字数限制：100字以内\n2. 只允许输出<summary>标签内的内容\n\
         3. 禁止输出任何标签外的文字\n4. 禁止输出思考过程"
    )
}

/// Terminal state of one [`Summarizer::summarize`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    /// Raw model output. Still needs normalizing before anyone sees it.
    Generated(String),
    /// Extractive summary built locally from the content.
    Fallback(String),
    /// No summary could be produced.
    Unavailable,
}

impl Summary {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Summary::Unavailable)
    }
}

/// Produces a summary for article text.
///
/// With a [`CompletionClient`] every call goes to the provider, retried on
/// transport and HTTP errors with a fixed delay. Without one, summaries are
/// extracted from the leading sentences and nothing touches the network.
pub struct Summarizer {
    client: Option<Arc<dyn CompletionClient>>,
    limiter: Option<Arc<Semaphore>>,
    config: SummarizerConfig,
}

impl Summarizer {
    pub fn new(client: Option<Arc<dyn CompletionClient>>, config: SummarizerConfig) -> Self {
        let limiter = match config.max_concurrent_requests {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };
        Self {
            client,
            limiter,
            config,
        }
    }

    /// Extractive summaries only.
    pub fn offline(config: SummarizerConfig) -> Self {
        Self::new(None, config)
    }

    pub fn is_online(&self) -> bool {
        self.client.is_some()
    }

    pub fn build_request(&self, content: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(user_prompt(content)),
                ChatMessage::assistant(PRIMING_REPLY),
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
        }
    }

    pub async fn summarize(&self, content: &str) -> Summary {
        let content = content.trim();
        if content.is_empty() {
            return Summary::Unavailable;
        }

        let Some(client) = &self.client else {
            return self.fallback(content);
        };

        let request = self.build_request(content);
        let delay = Duration::from_millis(self.config.retry_delay_ms);
        let mut retry_count = 0;

        loop {
            let result = {
                let _permit = match &self.limiter {
                    Some(limiter) => limiter.acquire().await.ok(),
                    None => None,
                };
                client.complete(&request).await
            };

            match result {
                Ok(raw) => return Summary::Generated(raw),
                Err(e) if e.is_retryable() && retry_count < self.config.max_retries => {
                    tracing::debug!(
                        error = %e,
                        retry = retry_count + 1,
                        delay_ms = self.config.retry_delay_ms,
                        "Retrying completion after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        error = %e,
                        attempts = retry_count + 1,
                        on_exhausted = ?self.config.on_exhausted,
                        "Completion retries exhausted"
                    );
                    return match self.config.on_exhausted {
                        OnExhausted::Fallback => self.fallback(content),
                        OnExhausted::Drop => Summary::Unavailable,
                    };
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Completion response unusable");
                    return Summary::Unavailable;
                }
            }
        }
    }

    fn fallback(&self, content: &str) -> Summary {
        let text = extractive_summary(
            content,
            self.config.fallback_sentences,
            self.config.fallback_char_budget,
        );
        if text.is_empty() {
            Summary::Unavailable
        } else {
            Summary::Fallback(text)
        }
    }
}
