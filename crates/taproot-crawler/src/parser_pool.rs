//! Thread-safe pool of tree-sitter JavaScript parsers
//!
//! Tree-sitter parsers are not Send + Sync, so parsing runs on dedicated
//! worker threads behind a channel, which lets async code await parses
//! without holding a parser across an await point.

use anyhow::Result;
use tree_sitter::Parser;

/// A parsing request with its reply channel.
#[derive(Debug)]
struct WorkerRequest {
    content: String,
    reply: std::sync::mpsc::Sender<Result<tree_sitter::Tree>>,
}

/// Thread-safe parser pool. Cheap to clone; clones share the workers.
pub struct ParserPool {
    sender: std::sync::mpsc::Sender<WorkerRequest>,
}

impl ParserPool {
    /// Create a pool with the specified number of worker threads.
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = std::sync::mpsc::channel::<WorkerRequest>();
        let receiver = std::sync::Arc::new(std::sync::Mutex::new(receiver));

        for i in 0..num_workers {
            let receiver = receiver.clone();
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender }
    }

    /// Worker loop: one parser per thread, language set once.
    fn worker_thread(
        worker_id: usize,
        receiver: std::sync::Arc<std::sync::Mutex<std::sync::mpsc::Receiver<WorkerRequest>>>,
    ) {
        tracing::debug!("Parser worker {} started", worker_id);

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&tree_sitter_javascript::LANGUAGE.into()) {
            tracing::error!("Parser worker {} failed to set language: {}", worker_id, e);
            return;
        }

        loop {
            let request = match receiver.lock().unwrap().recv() {
                Ok(req) => req,
                Err(_) => {
                    tracing::debug!("Parser worker {} shutting down", worker_id);
                    break;
                }
            };

            let result = match parser.parse(&request.content, None) {
                Some(tree) => Ok(tree),
                None => Err(anyhow::anyhow!("Failed to parse content")),
            };

            if request.reply.send(result).is_err() {
                tracing::warn!("Failed to send parse result back to caller");
            }
        }
    }

    /// Parse synchronously, blocking the current thread.
    pub fn parse_blocking(&self, content: String) -> Result<tree_sitter::Tree> {
        let (reply, response) = std::sync::mpsc::channel();

        self.sender
            .send(WorkerRequest { content, reply })
            .map_err(|_| anyhow::anyhow!("Parser pool is shut down"))?;

        response
            .recv()
            .map_err(|_| anyhow::anyhow!("Parser worker died"))?
    }

    /// Parse asynchronously; the blocking hand-off runs on the blocking
    /// thread pool.
    pub async fn parse(&self, content: String) -> Result<tree_sitter::Tree> {
        let sender = self.sender.clone();
        tokio::task::spawn_blocking(move || {
            let (reply, response) = std::sync::mpsc::channel();

            sender
                .send(WorkerRequest { content, reply })
                .map_err(|_| anyhow::anyhow!("Parser pool is shut down"))?;

            response
                .recv()
                .map_err(|_| anyhow::anyhow!("Parser worker died"))?
        })
        .await
        .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }
}

impl Clone for ParserPool {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Pool sized to the machine, with at least 2 workers.
pub fn create_parser_pool() -> ParserPool {
    let num_workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);

    ParserPool::new(num_workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_javascript() {
        let pool = create_parser_pool();
        let content = r#"const a = require("./a");"#.to_string();

        let tree = pool.parse(content).await.unwrap();
        assert_eq!(tree.root_node().kind(), "program");
    }

    #[test]
    fn test_parse_blocking() {
        let pool = ParserPool::new(1);
        let tree = pool.parse_blocking("import x from './x';".to_string()).unwrap();
        assert_eq!(tree.root_node().kind(), "program");
    }
}
