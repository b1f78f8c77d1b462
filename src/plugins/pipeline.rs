//! Ordered plugin execution with per-plugin fault isolation.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use tracing::{debug, warn};

use super::{Plugin, PluginContext};
use crate::common::messages::InboundMessage;
use crate::common::types::Contact;

/// Result of running a message through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    /// Text to mirror: the last rewrite, or the original text.
    pub text: String,
    /// First non-empty reply, if any.
    pub reply: Option<String>,
}

/// Plugins in execution order.
pub struct Pipeline {
    plugins: Vec<Box<dyn Plugin>>,
}

impl Pipeline {
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Run every matching plugin against the original message.
    ///
    /// A plugin that errors or panics is logged and skipped; the others
    /// still run.
    pub async fn run(
        &self,
        message: &InboundMessage,
        contact: &Contact,
        ctx: &PluginContext,
    ) -> PipelineResult {
        let mut result = PipelineResult {
            text: message.text.clone(),
            reply: None,
        };

        for plugin in &self.plugins {
            let name = plugin.name();

            let matched =
                match panic::catch_unwind(AssertUnwindSafe(|| plugin.matches(message, contact))) {
                    Ok(matched) => matched,
                    Err(payload) => {
                        warn!(plugin = name, "Plugin panicked in matches: {}", panic_message(&*payload));
                        continue;
                    }
                };
            if !matched {
                continue;
            }

            debug!(plugin = name, remote_id = %contact.remote_id, "Running plugin");
            let output = match AssertUnwindSafe(plugin.handle(message, contact, ctx))
                .catch_unwind()
                .await
            {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    warn!(plugin = name, "{}", e);
                    continue;
                }
                Err(payload) => {
                    warn!(plugin = name, "Plugin panicked in handle: {}", panic_message(&*payload));
                    continue;
                }
            };

            if let Some(text) = output.rewritten_text {
                result.text = text;
            }
            if result.reply.is_none() {
                result.reply = output.reply_text.filter(|r| !r.trim().is_empty());
            }
        }

        result
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::common::error::PluginError;
    use crate::plugins::test_support::{contact, context, message};
    use crate::plugins::PluginOutput;
    use crate::whatsapp::lifecycle::ConnectionState;

    enum Behavior {
        Reply(&'static str),
        Rewrite(&'static str),
        Fail,
        PanicInHandle,
        PanicInMatches,
        Skip,
    }

    struct TestPlugin {
        name: &'static str,
        behavior: Behavior,
    }

    fn plugin(name: &'static str, behavior: Behavior) -> Box<dyn Plugin> {
        Box::new(TestPlugin { name, behavior })
    }

    #[async_trait]
    impl Plugin for TestPlugin {
        fn name(&self) -> &'static str {
            self.name
        }

        fn matches(&self, _message: &InboundMessage, _contact: &Contact) -> bool {
            match self.behavior {
                Behavior::PanicInMatches => panic!("matches exploded"),
                Behavior::Skip => false,
                _ => true,
            }
        }

        async fn handle(
            &self,
            message: &InboundMessage,
            _contact: &Contact,
            _ctx: &PluginContext,
        ) -> Result<PluginOutput, PluginError> {
            match self.behavior {
                Behavior::Reply(text) => Ok(PluginOutput::reply(text)),
                Behavior::Rewrite(suffix) => {
                    Ok(PluginOutput::rewrite(format!("{}{}", message.text, suffix)))
                }
                Behavior::Fail => Err(PluginError::new(self.name, "always fails")),
                Behavior::PanicInHandle => panic!("handle exploded"),
                _ => Ok(PluginOutput::default()),
            }
        }
    }

    async fn run(pipeline: &Pipeline, text: &str) -> PipelineResult {
        pipeline
            .run(&message(text), &contact(), &context(ConnectionState::Connected))
            .await
    }

    #[tokio::test]
    async fn test_no_plugins_is_identity() {
        let result = run(&Pipeline::empty(), "hello").await;
        assert_eq!(result.text, "hello");
        assert!(result.reply.is_none());
    }

    #[tokio::test]
    async fn test_first_reply_wins() {
        let pipeline = Pipeline::new(vec![
            plugin("a", Behavior::Reply("first")),
            plugin("b", Behavior::Reply("second")),
        ]);
        assert_eq!(run(&pipeline, "x").await.reply.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_empty_reply_does_not_win() {
        let pipeline = Pipeline::new(vec![
            plugin("a", Behavior::Reply("  ")),
            plugin("b", Behavior::Reply("real")),
        ]);
        assert_eq!(run(&pipeline, "x").await.reply.as_deref(), Some("real"));
    }

    #[tokio::test]
    async fn test_rewrites_see_original_and_last_wins() {
        let pipeline = Pipeline::new(vec![
            plugin("a", Behavior::Rewrite("-a")),
            plugin("b", Behavior::Rewrite("-b")),
        ]);
        assert_eq!(run(&pipeline, "x").await.text, "x-b");
    }

    #[tokio::test]
    async fn test_faulty_plugins_are_isolated() {
        let pipeline = Pipeline::new(vec![
            plugin("fails", Behavior::Fail),
            plugin("panics", Behavior::PanicInHandle),
            plugin("bad-match", Behavior::PanicInMatches),
            plugin("skip", Behavior::Skip),
            plugin("rewrite", Behavior::Rewrite("!")),
            plugin("reply", Behavior::Reply("ok")),
        ]);
        let result = run(&pipeline, "hi").await;
        assert_eq!(result.text, "hi!");
        assert_eq!(result.reply.as_deref(), Some("ok"));
    }

    #[test]
    fn test_names() {
        let pipeline = Pipeline::new(vec![
            plugin("a", Behavior::Skip),
            plugin("b", Behavior::Skip),
        ]);
        assert_eq!(pipeline.names(), vec!["a", "b"]);
        assert_eq!(pipeline.len(), 2);
    }
}
